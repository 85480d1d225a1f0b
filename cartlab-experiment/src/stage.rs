use cartlab_core::{EnvironmentParams, ShelfSlot, Transform};

/// The host scene as the trial machine sees it: shelf anchors, price
/// labels and the lighting environment.
pub trait Stage {
    /// World transform of a shelf anchor, `None` when it is not assigned.
    fn shelf_anchor(&self, slot: ShelfSlot) -> Option<Transform>;

    /// Sets a shelf's price label. Returns `false` when the label target is
    /// missing.
    fn set_label(&mut self, slot: ShelfSlot, text: &str) -> bool;

    fn apply_environment(&mut self, params: EnvironmentParams);
}

/// A stage with fixed anchors that records what it was told to show.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticStage {
    pub anchors: [Option<Transform>; 4],
    /// `None` marks a shelf without a label target.
    pub labels: [Option<String>; 4],
    pub environment: Option<EnvironmentParams>,
}

impl StaticStage {
    /// Four anchors, all with label targets.
    #[must_use]
    pub fn with_anchors(anchors: [Transform; 4]) -> Self {
        Self {
            anchors: anchors.map(Some),
            labels: std::array::from_fn(|_| Some(String::new())),
            environment: None,
        }
    }

    #[must_use]
    pub fn label(&self, slot: ShelfSlot) -> Option<&str> {
        self.labels[slot.index()].as_deref()
    }
}

impl Stage for StaticStage {
    fn shelf_anchor(&self, slot: ShelfSlot) -> Option<Transform> {
        self.anchors[slot.index()]
    }

    fn set_label(&mut self, slot: ShelfSlot, text: &str) -> bool {
        match self.labels[slot.index()].as_mut() {
            Some(label) => {
                text.clone_into(label);
                true
            }
            None => false,
        }
    }

    fn apply_environment(&mut self, params: EnvironmentParams) {
        self.environment = Some(params);
    }
}
