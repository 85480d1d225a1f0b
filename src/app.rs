use std::collections::BTreeSet;

use anyhow::Result;
use cartlab_cart::{CartEvent, CartPipeline, Contact, PlacementMode, PurchaseOutcome, VolumeId};
use cartlab_core::{EntityId, ProductId, SceneProduct, Transform};
use cartlab_experiment::{
    CsvTrialLog, Inventory, JsonPreferences, Schedule, StaticStage, TrialController, load_products,
    load_trials, read_source,
};
use cartlab_timing::{SystemClock, TickTimer, Timer};
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;

const CART_TRIGGER: VolumeId = VolumeId(1);

/// What the simulated participant is doing.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Participant {
    Browsing { ticks_left: u64 },
    /// A product is on its way into the cart.
    Dropped { product_id: ProductId },
}

/// Totals reported when a session ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSummary {
    pub trials: u64,
    pub purchases: u64,
    pub skipped: u64,
    pub stacked: u64,
    pub ticks: u64,
}

/// A headless session: the trial machine and cart pipeline driven by a
/// simulated participant at the physics tick rate.
pub struct App {
    config: SessionConfig,
    controller: TrialController<JsonPreferences, CsvTrialLog, SystemClock>,
    inventory: Inventory,
    stage: StaticStage,
    cart: CartPipeline,
    timer: TickTimer,
    rng: StdRng,
}

impl App {
    pub fn new(config: SessionConfig) -> Result<Self> {
        let products = load_products(&read_source(&config.products_csv));
        let trials = load_trials(&read_source(&config.trials_csv));
        info!(
            products = products.data.len(),
            trials = trials.data.len(),
            skipped = products.rows_skipped + trials.rows_skipped,
            "session data loaded"
        );

        // One scene product per ID the session can ask for.
        let ids: BTreeSet<ProductId> = products
            .data
            .ids()
            .chain(trials.data.iter().flat_map(|t| t.shelves))
            .filter(|id| *id != 0)
            .collect();
        let inventory = Inventory::index(ids.into_iter().enumerate().map(|(i, id)| {
            SceneProduct::new(EntityId(i as u64 + 1), id).with_render_bounds([config.product_bounds])
        }));

        let prefs = JsonPreferences::open(&config.preferences)?;
        let log = CsvTrialLog::open(&config.trial_log)?;
        let controller = TrialController::new(
            &config.experiment,
            Schedule::new(trials.data),
            products.data,
            prefs,
            log,
            SystemClock,
        );

        let rng = match config.simulation.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            stage: StaticStage::with_anchors(config.shelf_anchors),
            cart: CartPipeline::new(config.cart, CART_TRIGGER),
            timer: TickTimer::new(config.tick_hz),
            controller,
            inventory,
            rng,
            config,
        })
    }

    pub fn run(mut self) -> Result<SessionSummary> {
        println!("=== CART LAB SESSION ===");
        println!("Platform: {}", std::env::consts::OS);
        println!("Tick rate: {:.1} Hz", self.config.tick_hz);

        self.controller.run_current(&mut self.inventory, &mut self.stage);
        let mut summary = SessionSummary::default();
        let mut block = self.controller.state().block;
        let mut participant = self.browse();
        if self.controller.phase().is_running() {
            summary.trials += 1;
        }

        while self.controller.phase().is_running() {
            if !self.config.simulation.unpaced {
                self.timer.wait_for_tick();
            }
            summary.ticks += 1;

            let trial_before = self.controller.generation();
            participant = self.step_participant(participant);
            self.settle_dropped(participant);

            for event in self.cart.tick(&mut self.controller, &mut self.inventory, &mut self.stage) {
                match event {
                    CartEvent::Purchased { product_id, outcome } => {
                        summary.purchases += 1;
                        if let PurchaseOutcome::Placed { stacked: true, .. } = outcome {
                            summary.stacked += 1;
                        }
                        debug!(product_id, ?outcome, "purchase");
                        if self.cart.config().mode == PlacementMode::NaturalDrop {
                            self.controller.next_trial(&mut self.inventory, &mut self.stage);
                        }
                    }
                    CartEvent::Abandoned { product_id } => {
                        debug!(product_id, "drop abandoned by trial change");
                    }
                }
            }

            if let Participant::Browsing { ticks_left: 0 } = participant {
                // Walked away without buying.
                summary.skipped += 1;
                self.controller.next_trial(&mut self.inventory, &mut self.stage);
            }

            if self.controller.generation() != trial_before {
                participant = self.browse();
                if self.controller.phase().is_running() {
                    summary.trials += 1;
                    self.on_trial_started(&mut block);
                }
            }
        }

        self.controller.end_session();
        let stats = self.timer.stats();
        info!(
            trials = summary.trials,
            purchases = summary.purchases,
            skipped = summary.skipped,
            ticks = summary.ticks,
            average_tick_ms = stats.average_tick_ns / 1e6,
            jitter_ms = stats.jitter_ns / 1e6,
            overruns = stats.overruns,
            "session complete"
        );
        Ok(summary)
    }

    fn on_trial_started(&mut self, block: &mut i32) {
        let state = self.controller.state();
        if state.block != *block {
            info!(from = *block, to = state.block, "new block, emptying cart");
            *block = state.block;
            self.cart.clear_cart();
            self.controller.reset_purchased(&mut self.inventory);
        }
        if let Some((trial, total)) = self.controller.trial_progress() {
            info!(trial, total, "trial started");
        }
    }

    fn browse(&self) -> Participant {
        Participant::Browsing {
            ticks_left: self.config.simulation.browse_ticks.max(1),
        }
    }

    /// Counts down browsing and, when it runs out, either drops a random
    /// shelved product into the cart or gives up.
    fn step_participant(&mut self, participant: Participant) -> Participant {
        let Participant::Browsing { ticks_left } = participant else {
            return participant;
        };
        if ticks_left > 1 {
            return Participant::Browsing { ticks_left: ticks_left - 1 };
        }

        let shelved: Vec<ProductId> = self.controller.state().active.iter().copied().collect();
        if shelved.is_empty() || self.rng.random_bool(self.config.simulation.skip_probability.clamp(0.0, 1.0)) {
            return Participant::Browsing { ticks_left: 0 };
        }
        let product_id = shelved[self.rng.random_range(0..shelved.len())];

        let surface = self.config.cart.surface;
        let jitter = Point3::new(
            self.rng.random_range(-0.1..0.1),
            surface.top() + 0.3,
            self.rng.random_range(-0.1..0.1),
        );
        let Some(product) = self.inventory.get_mut(product_id) else {
            warn!(product_id, "shelved product vanished from inventory");
            return Participant::Browsing { ticks_left: 0 };
        };
        product.transform = Transform::new(surface.transform.transform_point(&jitter), surface.transform.rotation);
        if let Some(body) = product.body.as_mut() {
            body.linear_velocity = Vector3::new(0.0, -self.config.simulation.drop_speed, 0.0);
        }

        let contact = Contact {
            volume: CART_TRIGGER,
            own: None,
            ancestors: vec![product_id],
        };
        if !self.cart.on_overlap_enter(&contact, &self.controller, &self.inventory) {
            return Participant::Browsing { ticks_left: 0 };
        }
        debug!(product_id, "participant dropped product into cart");
        Participant::Dropped { product_id }
    }

    /// Stands in for the physics step: damps the dropped product until it
    /// falls asleep.
    fn settle_dropped(&mut self, participant: Participant) {
        let Participant::Dropped { product_id } = participant else {
            return;
        };
        let damping = self.config.simulation.damping.clamp(0.0, 1.0);
        if let Some(body) = self.inventory.get_mut(product_id).and_then(|p| p.body.as_mut()) {
            if body.kinematic {
                return;
            }
            body.linear_velocity *= damping;
            body.angular_velocity *= damping;
            if body.linear_velocity.norm() < body.sleep_threshold {
                body.linear_velocity = Vector3::zeros();
                body.angular_velocity = Vector3::zeros();
            }
        }
    }
}
