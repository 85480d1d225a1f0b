use approx::assert_relative_eq;
use cartlab_cart::{
    CartConfig, CartEvent, CartPipeline, Contact, PlacementMode, PurchaseOutcome, VolumeId,
};
use cartlab_core::{Aabb, EntityId, SceneProduct, Surface, Transform};
use cartlab_experiment::{
    ExperimentConfig, Inventory, MemoryPreferences, MemoryTrialLog, Schedule, StaticStage,
    TrialController, load_products, load_trials,
};
use cartlab_timing::ManualClock;
use chrono::{Local, TimeZone};
use nalgebra::{Point3, Vector3};

const CART: VolumeId = VolumeId(3);

type Controller = TrialController<MemoryPreferences, MemoryTrialLog, ManualClock>;

fn controller(trials: &str) -> Controller {
    TrialController::new(
        &ExperimentConfig::default(),
        Schedule::new(load_trials(trials).data),
        load_products("id,name,price\n1,A,1\n2,B,2\n3,C,3\n4,D,4\n5,E,5\n").data,
        MemoryPreferences::new(),
        MemoryTrialLog::default(),
        ManualClock::new(Local.with_ymd_and_hms(2025, 3, 3, 10, 0, 0).unwrap()),
    )
}

fn inventory() -> Inventory {
    let cube = Aabb::new(Point3::new(-0.05, 0.0, -0.05), Point3::new(0.05, 0.1, 0.05));
    Inventory::index((1..=5).map(|id| SceneProduct::new(EntityId(id as u64), id).with_render_bounds([cube])))
}

fn stage() -> StaticStage {
    StaticStage::with_anchors(std::array::from_fn(|i| {
        Transform::from_position(Point3::new(i as f32, 1.0, -2.0))
    }))
}

fn drop_into_cart(product: i32) -> Contact {
    Contact {
        volume: CART,
        own: Some(product),
        ancestors: vec![],
    }
}

#[test]
fn five_purchases_fill_a_two_by_two_cart_then_stack() {
    let trials = "p,t,s1,s2,s3,s4\n1,1,1,0,0,0\n1,2,2,0,0,0\n1,3,3,0,0,0\n1,4,4,0,0,0\n1,5,5,0,0,0\n";
    let mut controller = controller(trials);
    let mut inventory = inventory();
    let mut stage = stage();
    let mut cart = CartPipeline::new(
        CartConfig {
            mode: PlacementMode::Organized,
            surface: Surface {
                transform: Transform::default(),
                size: Vector3::new(0.24, 0.0, 0.24),
            },
            margin: 0.02,
            spacing: 0.02,
        },
        CART,
    );

    controller.run_current(&mut inventory, &mut stage);
    let mut outcomes = Vec::new();
    for product in 1..=5 {
        assert!(cart.on_overlap_enter(&drop_into_cart(product), &controller, &inventory));
        let events = cart.tick(&mut controller, &mut inventory, &mut stage);
        match events.as_slice() {
            [CartEvent::Purchased { product_id, outcome }] if *product_id == product => {
                outcomes.push(outcome.clone());
            }
            other => panic!("unexpected events for {product}: {other:?}"),
        }
    }

    let stacked: Vec<bool> = outcomes
        .iter()
        .map(|o| matches!(o, PurchaseOutcome::Placed { stacked: true, .. }))
        .collect();
    assert_eq!(stacked, [false, false, false, false, true]);

    let copies = cart.copies();
    assert_eq!(copies.len(), 5);
    assert_relative_eq!(copies[0].transform.position, Point3::new(-0.05, 0.0, -0.05), epsilon = 1e-5);
    assert_relative_eq!(copies[3].transform.position, Point3::new(0.07, 0.0, 0.07), epsilon = 1e-5);
    assert_relative_eq!(copies[4].transform.position, Point3::new(0.0, 0.1, 0.0), epsilon = 1e-5);
    assert!(copies.iter().all(|c| c.id.0 > 5));

    assert!(controller.phase().is_complete());
    assert_eq!(inventory.active().count(), 0);
    let logged: Vec<(i32, i32)> = controller
        .log()
        .entries
        .iter()
        .map(|e| (e.product_purchased, e.shelf_location))
        .collect();
    assert_eq!(logged, [(1, 1), (2, 1), (3, 1), (4, 1), (5, 1)]);
}

#[test]
fn held_product_waits_until_the_trial_moves_on() {
    let mut controller = controller("p,t,s1,s2,s3,s4\n1,1,1,2,3,4\n1,2,1,2,3,4\n");
    let mut inventory = inventory();
    let mut stage = stage();
    let mut cart = CartPipeline::new(
        CartConfig {
            mode: PlacementMode::NaturalDrop,
            ..CartConfig::default()
        },
        CART,
    );
    controller.run_current(&mut inventory, &mut stage);

    // Still in the participant's hand.
    inventory.get_mut(2).unwrap().body.as_mut().unwrap().kinematic = true;
    assert!(cart.on_overlap_enter(&drop_into_cart(2), &controller, &inventory));
    for _ in 0..500 {
        assert!(cart.tick(&mut controller, &mut inventory, &mut stage).is_empty());
    }
    assert_eq!(cart.pending(), 1);

    controller.next_trial(&mut inventory, &mut stage);
    let events = cart.tick(&mut controller, &mut inventory, &mut stage);
    // Product 2 is back on a shelf, but the trial it was dropped in is over.
    assert_eq!(events, [CartEvent::Abandoned { product_id: 2 }]);
    assert!(controller.state().purchased.is_empty());

    // The new trial accepts the same product again.
    inventory.get_mut(2).unwrap().body.as_mut().unwrap().kinematic = false;
    assert!(cart.on_overlap_enter(&drop_into_cart(2), &controller, &inventory));
    let events = cart.tick(&mut controller, &mut inventory, &mut stage);
    assert_eq!(
        events,
        [CartEvent::Purchased { product_id: 2, outcome: PurchaseOutcome::FrozenInPlace }]
    );
    assert_eq!(controller.state().trial_number, 2);
}

#[test]
fn clearing_the_cart_between_blocks_restarts_the_grid() {
    let trials = "participant,block,trial,condition,s1,s2,s3,s4\n\
                  1,1,1,1,1,0,0,0\n\
                  1,2,2,2,2,0,0,0\n";
    let mut controller = controller(trials);
    let mut inventory = inventory();
    let mut stage = stage();
    let mut cart = CartPipeline::new(CartConfig::default(), CART);
    controller.run_current(&mut inventory, &mut stage);

    cart.on_overlap_enter(&drop_into_cart(1), &controller, &inventory);
    let first = cart.tick(&mut controller, &mut inventory, &mut stage);
    assert_eq!(controller.state().block, 2);
    cart.clear_cart();
    controller.reset_purchased(&mut inventory);

    cart.on_overlap_enter(&drop_into_cart(2), &controller, &inventory);
    let second = cart.tick(&mut controller, &mut inventory, &mut stage);
    let center = |events: &[CartEvent]| match events {
        [CartEvent::Purchased { outcome: PurchaseOutcome::Placed { center, .. }, .. }] => *center,
        other => panic!("expected a placement, got {other:?}"),
    };
    assert_eq!(center(first.as_slice()), center(second.as_slice()));
    assert_eq!(cart.copies().len(), 1);
}
