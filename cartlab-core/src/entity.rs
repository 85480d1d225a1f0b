use std::collections::BTreeSet;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::geometry::{Aabb, Transform};
use crate::product::ProductId;

/// Host-assigned handle for a scene entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// Interaction capabilities a product can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    /// The root grab target.
    Grabbable,
    /// Hand-tracking grab interactable.
    HandGrab,
    /// Controller grab interactable.
    ControllerGrab,
}

impl Capability {
    /// Everything a shelved product needs to be picked up.
    pub const GRAB: [Capability; 3] = [
        Capability::Grabbable,
        Capability::HandGrab,
        Capability::ControllerGrab,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionDetection {
    Discrete,
    ContinuousDynamic,
}

/// The slice of a physics body the trial machine reads and writes.
///
/// Velocities are written by the host physics step; everything else is
/// toggled by the trial machine and the cart pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    pub kinematic: bool,
    pub use_gravity: bool,
    pub collision: CollisionDetection,
    pub linear_velocity: Vector3<f32>,
    pub angular_velocity: Vector3<f32>,
    /// Velocity magnitude at or below which the body counts as asleep.
    pub sleep_threshold: f32,
}

impl RigidBody {
    /// A body in the state products are authored in: kinematic, no gravity.
    #[must_use]
    pub fn authored() -> Self {
        Self {
            kinematic: true,
            use_gravity: false,
            collision: CollisionDetection::Discrete,
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            sleep_threshold: 0.005,
        }
    }

    /// Native rest detection. Kinematic bodies are driven externally (for
    /// example while held) and never report rest.
    #[must_use]
    pub fn is_sleeping(&self) -> bool {
        let limit = self.sleep_threshold * self.sleep_threshold;
        !self.kinematic
            && self.linear_velocity.norm_squared() <= limit
            && self.angular_velocity.norm_squared() <= limit
    }

    /// Full dynamic simulation with continuous collision detection.
    pub fn make_dynamic(&mut self) {
        self.kinematic = false;
        self.use_gravity = true;
        self.collision = CollisionDetection::ContinuousDynamic;
    }

    /// Locks the body where it is.
    pub fn freeze(&mut self) {
        self.kinematic = true;
        self.use_gravity = false;
        self.linear_velocity = Vector3::zeros();
        self.angular_velocity = Vector3::zeros();
    }
}

impl Default for RigidBody {
    fn default() -> Self {
        Self::authored()
    }
}

/// A persistent product entity. One exists per product ID for the whole
/// session; it is shown and hidden, never recreated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneProduct {
    pub id: EntityId,
    pub product_id: ProductId,
    pub transform: Transform,
    pub body: Option<RigidBody>,
    pub capabilities: BTreeSet<Capability>,
    pub active: bool,
    /// Local-space bounds of each renderer under the product.
    pub render_bounds: Vec<Aabb>,
}

impl SceneProduct {
    #[must_use]
    pub fn new(id: EntityId, product_id: ProductId) -> Self {
        Self {
            id,
            product_id,
            transform: Transform::default(),
            body: Some(RigidBody::authored()),
            capabilities: Capability::GRAB.into_iter().collect(),
            active: true,
            render_bounds: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_render_bounds(mut self, bounds: impl IntoIterator<Item = Aabb>) -> Self {
        self.render_bounds.extend(bounds);
        self
    }

    #[must_use]
    pub fn without_body(mut self) -> Self {
        self.body = None;
        self
    }

    /// Combined bounds of every renderer, `None` when nothing renders.
    #[must_use]
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::enclosing(&self.render_bounds)
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Shows the product at `anchor`, ready to be picked up.
    pub fn activate_at(&mut self, anchor: Transform) {
        self.transform = anchor;
        self.active = true;
        if let Some(body) = self.body.as_mut() {
            body.linear_velocity = Vector3::zeros();
            body.angular_velocity = Vector3::zeros();
            body.make_dynamic();
        }
        self.enable_interaction();
    }

    pub fn enable_interaction(&mut self) {
        self.capabilities.extend(Capability::GRAB);
    }

    pub fn disable_interaction(&mut self) {
        self.capabilities.clear();
    }

    #[must_use]
    pub fn is_grabbable(&self) -> bool {
        self.capabilities.contains(&Capability::Grabbable)
    }
}

/// A static copy of a purchased product laid out in the cart.
///
/// Copies carry no body and no capabilities, and hold no link back to the
/// product they were made from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: EntityId,
    pub product_id: ProductId,
    pub transform: Transform,
    /// Footprint in cart-surface space.
    pub bounds: Aabb,
}
