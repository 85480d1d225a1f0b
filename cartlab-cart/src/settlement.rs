//! Waiting for a product dropped into the cart to come to rest.

use cartlab_core::{EntityId, ProductId, SceneProduct};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementStage {
    Idle,
    AwaitingSettlement,
    Processed,
}

/// Outcome of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementPoll {
    StillWaiting,
    Settled,
    /// The product left the trial while we waited. Nothing else happens.
    Abandoned,
}

/// A pending wait for one product.
///
/// There is no timeout: a product held in the cart forever keeps the wait
/// alive until a trial transition abandons it.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub product_id: ProductId,
    pub entity: EntityId,
    /// Trial generation the wait started in.
    pub generation: u64,
    pub ticks_waited: u64,
    stage: SettlementStage,
}

impl Settlement {
    #[must_use]
    pub fn begin(product: &SceneProduct, generation: u64) -> Self {
        Self {
            product_id: product.product_id,
            entity: product.id,
            generation,
            ticks_waited: 0,
            stage: SettlementStage::AwaitingSettlement,
        }
    }

    #[must_use]
    pub fn stage(&self) -> SettlementStage {
        self.stage
    }

    /// Advances the wait by one physics tick.
    ///
    /// `product` is the current scene entity for the product ID, if any.
    /// `still_active` is the trial machine's view of membership and
    /// `generation` its current trial generation; both are checked on
    /// every poll. Polling a finished wait returns `Abandoned`.
    pub fn poll(&mut self, product: Option<&SceneProduct>, still_active: bool, generation: u64) -> SettlementPoll {
        if self.stage != SettlementStage::AwaitingSettlement {
            return SettlementPoll::Abandoned;
        }
        let Some(product) = product.filter(|p| p.id == self.entity && p.active) else {
            self.stage = SettlementStage::Idle;
            return SettlementPoll::Abandoned;
        };
        if !still_active || generation != self.generation {
            self.stage = SettlementStage::Idle;
            return SettlementPoll::Abandoned;
        }

        self.ticks_waited += 1;
        match &product.body {
            Some(body) if body.is_sleeping() => {
                self.stage = SettlementStage::Processed;
                SettlementPoll::Settled
            }
            Some(_) => SettlementPoll::StillWaiting,
            None => {
                self.stage = SettlementStage::Idle;
                SettlementPoll::Abandoned
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn moving(speed: f32) -> SceneProduct {
        let mut product = SceneProduct::new(EntityId(7), 3);
        let body = product.body.as_mut().unwrap();
        body.make_dynamic();
        body.linear_velocity = Vector3::new(0.0, -speed, 0.0);
        product
    }

    #[test]
    fn settles_once_the_body_rests() {
        let mut product = moving(1.0);
        let mut wait = Settlement::begin(&product, 4);

        assert_eq!(wait.poll(Some(&product), true, 4), SettlementPoll::StillWaiting);
        assert_eq!(wait.poll(Some(&product), true, 4), SettlementPoll::StillWaiting);
        product.body.as_mut().unwrap().linear_velocity = Vector3::zeros();
        assert_eq!(wait.poll(Some(&product), true, 4), SettlementPoll::Settled);
        assert_eq!(wait.stage(), SettlementStage::Processed);
        assert_eq!(wait.ticks_waited, 3);
    }

    #[test]
    fn held_product_never_settles() {
        let mut product = moving(0.0);
        product.body.as_mut().unwrap().kinematic = true;
        let mut wait = Settlement::begin(&product, 1);
        for _ in 0..1000 {
            assert_eq!(wait.poll(Some(&product), true, 1), SettlementPoll::StillWaiting);
        }
    }

    #[test]
    fn trial_transition_abandons_the_wait() {
        let mut product = moving(1.0);
        let mut wait = Settlement::begin(&product, 1);
        assert_eq!(wait.poll(Some(&product), true, 2), SettlementPoll::Abandoned);
        assert_eq!(wait.stage(), SettlementStage::Idle);

        let mut wait = Settlement::begin(&product, 1);
        assert_eq!(wait.poll(Some(&product), false, 1), SettlementPoll::Abandoned);

        let mut wait = Settlement::begin(&product, 1);
        product.deactivate();
        assert_eq!(wait.poll(Some(&product), true, 1), SettlementPoll::Abandoned);
        assert_eq!(wait.poll(None, true, 1), SettlementPoll::Abandoned);
    }
}
