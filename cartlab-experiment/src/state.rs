use std::collections::BTreeSet;

use cartlab_core::{
    ConditionTable, EnvironmentParams, PriceTable, ProductId, SessionPhase, ShelfSlot, TrialKey,
    TrialRecord,
};
use cartlab_timing::Clock;
use tracing::{debug, error, info, warn};

use super::config::ExperimentConfig;
use super::inventory::Inventory;
use super::log::TrialLog;
use super::prefs::{PARTICIPANT_ID_KEY, Preferences, TRIAL_NUMBER_KEY};
use super::schedule::Schedule;
use super::stage::Stage;
use super::trial::TrialRun;

/// Label shown when a shelf's product is not in the scene.
pub const MISSING_LABEL: &str = "---";
/// Label shown when a shelf's product has already been bought.
pub const SOLD_LABEL: &str = "SOLD";

/// Pointers into the schedule plus which products are out.
///
/// After every trial transition `active` and `purchased` are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrialState {
    pub participant_id: i32,
    pub trial_number: i32,
    pub block: i32,
    pub condition: i32,
    pub active: BTreeSet<ProductId>,
    pub purchased: BTreeSet<ProductId>,
}

impl TrialState {
    #[must_use]
    pub fn is_active(&self, product_id: ProductId) -> bool {
        self.active.contains(&product_id)
    }

    #[must_use]
    pub fn is_purchased(&self, product_id: ProductId) -> bool {
        self.purchased.contains(&product_id)
    }

    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.active.is_disjoint(&self.purchased)
    }
}

/// Drives the trial schedule: stocks shelves, tracks purchases, advances
/// and logs trials.
///
/// Nothing here returns an error. Missing data, anchors or labels are
/// logged and skipped so a session can always reach the end of its
/// schedule.
pub struct TrialController<P, L, C>
where
    P: Preferences,
    L: TrialLog,
    C: Clock,
{
    state: TrialState,
    phase: SessionPhase,
    schedule: Schedule,
    prices: PriceTable,
    conditions: ConditionTable,
    prefs: P,
    log: L,
    clock: C,
    current: Option<TrialRun>,
    generation: u64,
}

impl<P, L, C> TrialController<P, L, C>
where
    P: Preferences,
    L: TrialLog,
    C: Clock,
{
    /// Builds the controller and seeds participant and trial from `prefs`
    /// or the config overrides.
    pub fn new(
        config: &ExperimentConfig,
        schedule: Schedule,
        prices: PriceTable,
        prefs: P,
        log: L,
        clock: C,
    ) -> Self {
        let mut controller = Self {
            state: TrialState::default(),
            phase: SessionPhase::Setup,
            schedule,
            prices,
            conditions: config.conditions,
            prefs,
            log,
            clock,
            current: None,
            generation: 0,
        };
        controller.initialize(config.override_participant_id, config.override_trial_number);
        controller
    }

    /// Seeds participant and trial. Overrides above zero win and are
    /// persisted straight away; otherwise the persisted values (default 1)
    /// are used.
    pub fn initialize(&mut self, participant_override: i32, trial_override: i32) {
        self.state.participant_id = if participant_override > 0 {
            warn!(participant = participant_override, "override: using participant ID");
            self.persist(PARTICIPANT_ID_KEY, participant_override);
            participant_override
        } else {
            self.prefs.get_int_or(PARTICIPANT_ID_KEY, 1)
        };

        self.state.trial_number = if trial_override > 0 {
            warn!(trial = trial_override, "override: using trial number");
            self.persist(TRIAL_NUMBER_KEY, trial_override);
            trial_override
        } else {
            self.prefs.get_int_or(TRIAL_NUMBER_KEY, 1)
        };

        info!(
            participant = self.state.participant_id,
            trial = self.state.trial_number,
            "trial controller initialised"
        );
    }

    /// Runs the trial the controller currently points at.
    pub fn run_current<S: Stage>(&mut self, inventory: &mut Inventory, stage: &mut S) {
        self.run_trial(inventory, stage, self.state.participant_id, self.state.trial_number);
    }

    /// Clears the shelves and stocks them for `(participant_id, trial_number)`.
    ///
    /// A key missing from the schedule blanks every label and leaves the
    /// session complete.
    pub fn run_trial<S: Stage>(
        &mut self,
        inventory: &mut Inventory,
        stage: &mut S,
        participant_id: i32,
        trial_number: i32,
    ) {
        self.finish_current_run();
        self.generation += 1;

        // Purchased products from the previous trial go too, not just the
        // ones left on the shelves.
        for product_id in self.state.active.iter().chain(&self.state.purchased) {
            inventory.deactivate(*product_id);
        }
        self.state.active.clear();
        self.state.purchased.clear();

        self.point_at(participant_id, trial_number);

        let key = TrialKey {
            participant_id,
            trial_number,
        };
        let Some(record) = self.schedule.find(key).cloned() else {
            info!(
                participant = participant_id,
                trial = trial_number,
                "no trial scheduled, experiment complete"
            );
            for slot in ShelfSlot::ALL {
                stage.set_label(slot, "");
            }
            self.phase = SessionPhase::Complete;
            return;
        };

        info!(
            participant = participant_id,
            trial = trial_number,
            block = record.block,
            condition = record.condition,
            "running trial"
        );
        self.state.block = record.block;
        self.state.condition = record.condition;
        stage.apply_environment(self.environment_for(record.condition));

        for slot in ShelfSlot::ALL {
            self.stock_shelf(inventory, stage, slot, record.product_on(slot));
        }

        self.current = Some(TrialRun::new(record, self.clock.now()));
        self.phase = SessionPhase::Running;
    }

    fn environment_for(&self, condition: i32) -> EnvironmentParams {
        match self.conditions.params(condition) {
            Some(params) => params,
            None if condition == 0 => {
                debug!("trial has no condition, using neutral environment");
                self.conditions.neutral
            }
            None => {
                warn!(condition, "unknown condition, using neutral environment");
                self.conditions.neutral
            }
        }
    }

    fn stock_shelf<S: Stage>(
        &mut self,
        inventory: &mut Inventory,
        stage: &mut S,
        slot: ShelfSlot,
        product_id: ProductId,
    ) {
        let label = match inventory.get_mut(product_id) {
            None => {
                error!(product_id, shelf = slot.number(), "product missing from scene inventory");
                MISSING_LABEL.to_owned()
            }
            Some(_) if self.state.is_purchased(product_id) => {
                debug!(product_id, "product already purchased, leaving shelf empty");
                SOLD_LABEL.to_owned()
            }
            Some(product) => match stage.shelf_anchor(slot) {
                None => {
                    warn!(product_id, shelf = slot.number(), "shelf anchor not assigned, skipping");
                    String::new()
                }
                Some(anchor) => {
                    product.deactivate();
                    product.activate_at(anchor);
                    if product.body.is_none() {
                        warn!(product_id, "shelved product has no physics body");
                    }
                    self.state.active.insert(product_id);
                    self.prices.label(product_id)
                }
            },
        };

        if !stage.set_label(slot, &label) {
            warn!(shelf = slot.number(), "shelf label target missing");
        }
    }

    /// Moves a product from the shelves to the purchased set. Calling it
    /// again for the same product changes nothing.
    pub fn mark_purchased(&mut self, product_id: ProductId) -> bool {
        if !self.state.purchased.insert(product_id) {
            return false;
        }
        self.state.active.remove(&product_id);
        if let Some(run) = self.current.as_mut() {
            run.record_purchase(product_id);
        }
        info!(product_id, "product marked as purchased");
        true
    }

    /// Advances to the next trial number, persists it, and runs it.
    pub fn next_trial<S: Stage>(&mut self, inventory: &mut Inventory, stage: &mut S) {
        let next = self.state.trial_number + 1;
        self.run_trial(inventory, stage, self.state.participant_id, next);
    }

    /// Hides and forgets every purchased product.
    pub fn reset_purchased(&mut self, inventory: &mut Inventory) {
        for product_id in &self.state.purchased {
            inventory.deactivate(*product_id);
        }
        self.state.purchased.clear();
        info!("purchased products reset");
    }

    /// Logs the trial in progress, if any. Call once when the session stops.
    pub fn end_session(&mut self) {
        self.finish_current_run();
    }

    fn finish_current_run(&mut self) {
        if let Some(run) = self.current.take() {
            let entry = run.finish(self.clock.now());
            if let Err(err) = self.log.append(&entry) {
                error!(error = %err, trial = entry.trial_number, "failed to log trial");
            }
        }
    }

    fn point_at(&mut self, participant_id: i32, trial_number: i32) {
        if self.state.participant_id != participant_id {
            self.state.participant_id = participant_id;
            self.persist(PARTICIPANT_ID_KEY, participant_id);
        }
        if self.state.trial_number != trial_number {
            self.state.trial_number = trial_number;
            self.persist(TRIAL_NUMBER_KEY, trial_number);
        }
    }

    fn persist(&mut self, key: &str, value: i32) {
        if let Err(err) = self.prefs.set_int(key, value) {
            error!(error = %err, key, value, "failed to persist session state");
        }
    }

    pub fn state(&self) -> &TrialState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Bumped by every trial transition.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current_record(&self) -> Option<&TrialRecord> {
        self.current.as_ref().map(|run| &run.record)
    }

    pub fn current_run(&self) -> Option<&TrialRun> {
        self.current.as_ref()
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    pub fn prefs(&self) -> &P {
        &self.prefs
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn is_active(&self, product_id: ProductId) -> bool {
        self.state.is_active(product_id)
    }

    /// Remaining trials for the current participant, including the one
    /// running now.
    pub fn trial_progress(&self) -> Option<(i32, usize)> {
        self.phase.is_running().then(|| {
            (
                self.state.trial_number,
                self.schedule.trials_for(self.state.participant_id),
            )
        })
    }
}
