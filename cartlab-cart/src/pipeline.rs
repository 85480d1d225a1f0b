//! Cart trigger handling: from a product entering the cart volume to a
//! recorded purchase and, in organized mode, a packed copy in the cart.

use std::collections::HashMap;

use cartlab_core::{Aabb, CartItem, EntityId, ProductId, Surface, Transform};
use cartlab_experiment::{Inventory, Preferences, Stage, TrialController, TrialLog};
use cartlab_timing::Clock;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::packer::{self, PlacementKind};
use crate::settlement::{Settlement, SettlementPoll};

/// Copies get entity IDs from here up so they never collide with scene
/// products.
const COPY_ENTITY_BASE: u64 = 1 << 32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementMode {
    /// Purchases are packed as static copies and the trial advances.
    #[default]
    Organized,
    /// Purchases stay where they fell and are frozen there.
    NaturalDrop,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartConfig {
    pub mode: PlacementMode,
    pub surface: Surface,
    /// Clearance kept between items and the surface edge.
    pub margin: f32,
    /// Gap between neighbouring items.
    pub spacing: f32,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            mode: PlacementMode::Organized,
            surface: Surface {
                transform: Transform::from_position(Point3::new(0.0, 0.8, 1.2)),
                size: Vector3::new(0.5, 0.02, 0.35),
            },
            margin: 0.02,
            spacing: 0.02,
        }
    }
}

/// A trigger volume registered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VolumeId(pub u32);

/// An overlap-enter event as the host reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub volume: VolumeId,
    /// Product data on the collider itself.
    pub own: Option<ProductId>,
    /// Product data on the collider's ancestors, nearest first.
    pub ancestors: Vec<ProductId>,
}

impl Contact {
    /// The product the collider belongs to.
    #[must_use]
    pub fn product(&self) -> Option<ProductId> {
        self.own.or_else(|| self.ancestors.first().copied())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseOutcome {
    Placed {
        item: EntityId,
        center: Point3<f32>,
        stacked: bool,
    },
    /// Bounds were unusable; the purchase still counts.
    CopySkipped,
    FrozenInPlace,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CartEvent {
    Purchased {
        product_id: ProductId,
        outcome: PurchaseOutcome,
    },
    Abandoned {
        product_id: ProductId,
    },
}

/// Watches the cart trigger and turns settled products into purchases.
#[derive(Debug)]
pub struct CartPipeline {
    config: CartConfig,
    trigger: VolumeId,
    /// Product ID to the trial generation it was accepted in.
    processed: HashMap<ProductId, u64>,
    pending: Vec<Settlement>,
    copies: Vec<CartItem>,
    placed: Vec<Aabb>,
    next_entity: u64,
}

impl CartPipeline {
    #[must_use]
    pub fn new(config: CartConfig, trigger: VolumeId) -> Self {
        Self {
            config,
            trigger,
            processed: HashMap::new(),
            pending: Vec::new(),
            copies: Vec::new(),
            placed: Vec::new(),
            next_entity: COPY_ENTITY_BASE,
        }
    }

    /// Handles an overlap-enter event. Returns `true` when a settlement
    /// wait was started.
    pub fn on_overlap_enter<P, L, C>(
        &mut self,
        contact: &Contact,
        controller: &TrialController<P, L, C>,
        inventory: &Inventory,
    ) -> bool
    where
        P: Preferences,
        L: TrialLog,
        C: Clock,
    {
        if contact.volume != self.trigger {
            return false;
        }
        let Some(product_id) = contact.product() else {
            return false;
        };
        if !controller.is_active(product_id) {
            debug!(product_id, "entered cart but is not on the shelves, ignoring");
            return false;
        }
        let generation = controller.generation();
        if self.processed.get(&product_id) == Some(&generation)
            || self.pending.iter().any(|w| w.product_id == product_id)
        {
            debug!(product_id, "already handled this trial, ignoring");
            return false;
        }
        self.processed.insert(product_id, generation);

        let Some(product) = inventory.get(product_id) else {
            warn!(product_id, "product entered cart but is not in the scene inventory");
            return false;
        };
        if product.body.is_none() {
            warn!(product_id, "product entered cart without a physics body");
            return false;
        }

        debug!(product_id, generation, "waiting for product to settle");
        self.pending.push(Settlement::begin(product, generation));
        true
    }

    /// Polls every pending wait once. Call once per physics tick.
    ///
    /// Waits are handled in the order they started; a purchase that
    /// advances the trial abandons the waits behind it.
    pub fn tick<P, L, C, S>(
        &mut self,
        controller: &mut TrialController<P, L, C>,
        inventory: &mut Inventory,
        stage: &mut S,
    ) -> Vec<CartEvent>
    where
        P: Preferences,
        L: TrialLog,
        C: Clock,
        S: Stage,
    {
        let mut events = Vec::new();
        let mut still_pending = Vec::with_capacity(self.pending.len());

        for mut wait in std::mem::take(&mut self.pending) {
            let product_id = wait.product_id;
            let poll = wait.poll(
                inventory.get(product_id),
                controller.is_active(product_id),
                controller.generation(),
            );
            match poll {
                SettlementPoll::StillWaiting => still_pending.push(wait),
                SettlementPoll::Abandoned => {
                    debug!(product_id, "settlement abandoned");
                    events.push(CartEvent::Abandoned { product_id });
                }
                SettlementPoll::Settled => {
                    debug!(product_id, ticks = wait.ticks_waited, "product settled");
                    let outcome = self.purchase(product_id, controller, inventory, stage);
                    events.push(CartEvent::Purchased { product_id, outcome });
                }
            }
        }

        self.pending = still_pending;
        events
    }

    fn purchase<P, L, C, S>(
        &mut self,
        product_id: ProductId,
        controller: &mut TrialController<P, L, C>,
        inventory: &mut Inventory,
        stage: &mut S,
    ) -> PurchaseOutcome
    where
        P: Preferences,
        L: TrialLog,
        C: Clock,
        S: Stage,
    {
        controller.mark_purchased(product_id);

        match self.config.mode {
            PlacementMode::NaturalDrop => {
                if let Some(product) = inventory.get_mut(product_id) {
                    product.disable_interaction();
                    if let Some(body) = product.body.as_mut() {
                        body.freeze();
                    }
                }
                info!(product_id, "purchase left in place");
                PurchaseOutcome::FrozenInPlace
            }
            PlacementMode::Organized => {
                let outcome = match inventory.get(product_id).and_then(|p| p.bounds()) {
                    Some(bounds) if !bounds.is_degenerate() => self.place_copy(product_id, &bounds),
                    bounds => {
                        warn!(product_id, ?bounds, "purchase has no usable bounds, skipping cart copy");
                        PurchaseOutcome::CopySkipped
                    }
                };
                inventory.deactivate(product_id);
                controller.next_trial(inventory, stage);
                outcome
            }
        }
    }

    fn place_copy(&mut self, product_id: ProductId, bounds: &Aabb) -> PurchaseOutcome {
        let surface = self.config.surface;
        let size = bounds.size();
        let placement = packer::find_position(
            size,
            surface.size,
            self.config.margin,
            self.config.spacing,
            &self.placed,
        );

        // Bounds are relative to the product pivot, which need not be its centre.
        let pivot = placement.center - bounds.center().coords;
        let transform = Transform::new(
            surface.transform.transform_point(&pivot),
            surface.transform.rotation,
        );

        let item = EntityId(self.next_entity);
        self.next_entity += 1;
        let footprint = placement.bounds(size);
        self.placed.push(footprint);
        self.copies.push(CartItem {
            id: item,
            product_id,
            transform,
            bounds: footprint,
        });

        let stacked = placement.kind == PlacementKind::Stacked;
        info!(
            product_id,
            x = placement.center.x,
            y = placement.center.y,
            z = placement.center.z,
            stacked,
            "purchase placed in cart"
        );
        PurchaseOutcome::Placed {
            item,
            center: placement.center,
            stacked,
        }
    }

    /// Removes every copy and forgets what was bought.
    pub fn clear_cart(&mut self) {
        info!(copies = self.copies.len(), "clearing cart");
        self.copies.clear();
        self.placed.clear();
        self.processed.clear();
    }

    #[must_use]
    pub fn config(&self) -> &CartConfig {
        &self.config
    }

    #[must_use]
    pub fn copies(&self) -> &[CartItem] {
        &self.copies
    }

    /// Footprints of placed copies in cart-surface space.
    #[must_use]
    pub fn placed(&self) -> &[Aabb] {
        &self.placed
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_processed(&self, product_id: ProductId) -> bool {
        self.processed.contains_key(&product_id)
    }
}
