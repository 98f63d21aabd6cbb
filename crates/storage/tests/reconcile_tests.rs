//! Storage reconciliation tests
//!
//! Planning is checked on plain slot snapshots; the async passes run against
//! the simulated world, or a mock where the exact calls matter.

use async_trait::async_trait;
use mockall::mock;
use std::sync::Arc;
use tokio_test::assert_ok;
use tokio_util::sync::CancellationToken;

use fieldhand_config::{StorageConfig, WorkerConfig};
use fieldhand_field::Coord;
use fieldhand_storage::{
    plan_deposit, select_withdraw_slot, DepositOutcome, Reconciler, WithdrawOutcome,
};
use fieldhand_world::sim::{seed_name, SimWorld};
use fieldhand_world::{
    Actor, CarriedItem, CropType, Granary, InstantClock, ItemId, ItemInfo, Meters, Pacer, Result,
    SlotView, StorageSite,
};

const GRANARY: StorageSite = StorageSite {
    id: 1,
    position: Coord::new(-100, 0),
};

mock! {
    pub Storehouse {}

    #[async_trait]
    impl Actor for Storehouse {
        async fn position(&self) -> Result<Coord>;
        async fn is_idle(&self) -> Result<bool>;
        async fn meters(&self) -> Result<Meters>;
        async fn free_slots(&self) -> Result<usize>;
        async fn carried_items(&self) -> Result<Vec<CarriedItem>>;
        async fn release_hand(&self) -> Result<()>;
    }

    #[async_trait]
    impl Granary for Storehouse {
        async fn open_storage(&self, site: &StorageSite) -> Result<()>;
        async fn storage_slots(&self) -> Result<Vec<SlotView>>;
        async fn take(&self, slot: usize) -> Result<()>;
        async fn deposit(&self, item: ItemId, slot: usize) -> Result<()>;
    }
}

fn reconciler() -> Reconciler {
    Reconciler::new(
        StorageConfig::default(),
        &WorkerConfig::default(),
        Pacer::new(Arc::new(InstantClock::new()), CancellationToken::new()),
    )
}

fn carrot_seeds(id: u64, quality: f64, amount: u32) -> CarriedItem {
    CarriedItem {
        id: ItemId(id),
        resource: CropType::Carrot.seed_resource().to_string(),
        info: Some(ItemInfo::new(seed_name(CropType::Carrot), quality, amount)),
    }
}

fn filled(crop: CropType, quality: f64, amount: u32) -> SlotView {
    SlotView::Filled(ItemInfo::new(seed_name(crop), quality, amount))
}

/// Nine slots holding other crops, then one empty slot
fn nine_mismatched_one_empty() -> Vec<SlotView> {
    let mut slots: Vec<SlotView> = (0..9).map(|q| filled(CropType::Wheat, q as f64, 100)).collect();
    slots.push(SlotView::Empty);
    slots
}

// ============================================================================
// Deposit planning
// ============================================================================

#[test]
fn test_new_item_lands_in_the_only_empty_slot() {
    let plan = plan_deposit(
        &[carrot_seeds(1, 10.0, 50)],
        &nine_mismatched_one_empty(),
        CropType::Carrot,
        200_000,
    );

    assert_eq!(plan.moves.len(), 1);
    assert_eq!(plan.moves[0].slot, 9);
    assert!(!plan.is_full());
}

#[test]
fn test_matching_slot_is_preferred_over_empty() {
    let mut slots = vec![SlotView::Empty; 10];
    slots[6] = filled(CropType::Carrot, 10.0, 500);

    let plan = plan_deposit(&[carrot_seeds(1, 10.0, 50)], &slots, CropType::Carrot, 200_000);

    assert_eq!(plan.moves[0].slot, 6);
}

#[test]
fn test_quality_must_match_exactly() {
    let mut slots = vec![SlotView::Empty; 10];
    slots[0] = filled(CropType::Carrot, 10.5, 500);

    let plan = plan_deposit(&[carrot_seeds(1, 10.0, 50)], &slots, CropType::Carrot, 200_000);

    assert_eq!(plan.moves[0].slot, 1);
}

#[test]
fn test_capacity_ceiling_is_never_exceeded() {
    let mut slots = vec![SlotView::Empty; 10];
    slots[0] = filled(CropType::Carrot, 10.0, 199_990);

    let plan = plan_deposit(&[carrot_seeds(1, 10.0, 50)], &slots, CropType::Carrot, 200_000);
    assert_eq!(plan.moves[0].slot, 1);

    slots[0] = filled(CropType::Carrot, 10.0, 199_950);
    let plan = plan_deposit(&[carrot_seeds(1, 10.0, 50)], &slots, CropType::Carrot, 200_000);
    assert_eq!(plan.moves[0].slot, 0);
}

#[test]
fn test_overflow_stops_planning() {
    let mut slots: Vec<SlotView> = (0..9).map(|_| filled(CropType::Wheat, 1.0, 1)).collect();
    slots.push(SlotView::Empty);
    let items = [
        carrot_seeds(1, 10.0, 50),
        carrot_seeds(2, 11.0, 50),
        carrot_seeds(3, 10.0, 50),
    ];

    let plan = plan_deposit(&items, &slots, CropType::Carrot, 200_000);

    // the first item takes the empty slot, the second has nowhere to go
    assert_eq!(plan.moves.len(), 1);
    assert_eq!(plan.overflow, Some(ItemId(2)));
}

#[test]
fn test_loading_items_are_skipped() {
    let mut loading = carrot_seeds(1, 10.0, 50);
    loading.info = None;

    let plan = plan_deposit(&[loading], &[SlotView::Empty], CropType::Carrot, 200_000);

    assert_eq!(plan.skipped, 1);
    assert!(plan.moves.is_empty());
    assert!(plan.must_wait());
}

// ============================================================================
// Withdraw selection
// ============================================================================

#[test]
fn test_positive_quality_beats_larger_zero_quality_stock() {
    let mut slots = vec![SlotView::Empty; 10];
    slots[0] = filled(CropType::Carrot, 0.0, 100_000);
    slots[3] = filled(CropType::Carrot, 4.0, 20);

    assert_eq!(select_withdraw_slot(&slots, CropType::Carrot, 16, 50), Some(3));
}

#[test]
fn test_highest_quality_with_enough_stock_wins() {
    let mut slots = vec![SlotView::Empty; 10];
    slots[1] = filled(CropType::Carrot, 30.0, 100);
    slots[2] = filled(CropType::Carrot, 12.0, 5000);
    slots[4] = filled(CropType::Carrot, 18.0, 5000);

    // 16 free slots need 800 units: slot 1 is best but too small
    assert_eq!(select_withdraw_slot(&slots, CropType::Carrot, 16, 50), Some(4));
    // one free slot needs 50 units: slot 1 qualifies
    assert_eq!(select_withdraw_slot(&slots, CropType::Carrot, 1, 50), Some(1));
}

#[test]
fn test_falls_back_to_best_quality_when_nothing_is_enough() {
    let mut slots = vec![SlotView::Empty; 10];
    slots[5] = filled(CropType::Carrot, 7.0, 10);
    slots[8] = filled(CropType::Carrot, 9.0, 10);

    assert_eq!(select_withdraw_slot(&slots, CropType::Carrot, 16, 50), Some(8));
}

// ============================================================================
// Deposit passes
// ============================================================================

#[tokio::test]
async fn test_deposit_opens_storage_then_deposits() {
    let world = SimWorld::new(Coord::new(0, 0))
        .with_storage(nine_mismatched_one_empty())
        .with_seeds(CropType::Carrot, 10.0, 40);
    let reconciler = reconciler();

    let first = assert_ok!(reconciler.deposit(&world, &GRANARY, CropType::Carrot).await);
    assert_eq!(first, DepositOutcome::Opening);

    let second = assert_ok!(reconciler.deposit(&world, &GRANARY, CropType::Carrot).await);
    assert_eq!(second, DepositOutcome::Deposited { moves: 1 });

    let slots = world.slots().await;
    assert_eq!(slots[9].contents().unwrap().amount, 40);
    assert_eq!(world.seed_units(CropType::Carrot).await, 0);

    let third = assert_ok!(reconciler.deposit(&world, &GRANARY, CropType::Carrot).await);
    assert_eq!(third, DepositOutcome::Empty);
}

#[tokio::test]
async fn test_full_storage_issues_no_transfers() {
    let mut mock = MockStorehouse::new();
    let slots: Vec<SlotView> = (0..10).map(|q| filled(CropType::Wheat, q as f64, 9)).collect();

    mock.expect_carried_items()
        .returning(|| Ok(vec![carrot_seeds(1, 10.0, 50), carrot_seeds(2, 10.0, 50)]));
    mock.expect_storage_slots()
        .times(1)
        .returning(move || Ok(slots.clone()));
    mock.expect_deposit().times(0);
    mock.expect_open_storage().times(0);

    let outcome = reconciler()
        .deposit(&mock, &GRANARY, CropType::Carrot)
        .await
        .unwrap();

    assert_eq!(outcome, DepositOutcome::StorageFull { moves: 0 });
}

#[tokio::test]
async fn test_partially_visible_storage_waits() {
    let mut mock = MockStorehouse::new();
    mock.expect_carried_items()
        .returning(|| Ok(vec![carrot_seeds(1, 10.0, 50)]));
    mock.expect_storage_slots()
        .returning(|| Ok(vec![SlotView::Empty; 4]));
    mock.expect_open_storage().times(0);
    mock.expect_deposit().times(0);

    let outcome = reconciler()
        .deposit(&mock, &GRANARY, CropType::Carrot)
        .await
        .unwrap();

    assert_eq!(outcome, DepositOutcome::AwaitingSlots);
}

// ============================================================================
// Withdraw passes
// ============================================================================

#[tokio::test]
async fn test_withdraw_fills_inventory() {
    let mut slots = vec![SlotView::Empty; 10];
    slots[2] = filled(CropType::Wheat, 25.0, 1000);
    let world = SimWorld::new(Coord::new(0, 0))
        .with_inventory(16)
        .with_storage(slots);
    world.open_storage(&GRANARY).await.unwrap();

    let outcome = reconciler()
        .withdraw(&world, &GRANARY, CropType::Wheat)
        .await
        .unwrap();

    assert_eq!(outcome, WithdrawOutcome::Withdrew { slot: 2, units: 800 });
    assert_eq!(world.free_slots().await.unwrap(), 0);
    assert_eq!(world.slots().await[2].contents().unwrap().amount, 200);
}

#[tokio::test]
async fn test_withdraw_stops_when_slot_is_emptied() {
    let mut slots = vec![SlotView::Empty; 10];
    slots[0] = filled(CropType::Leek, 3.0, 70);
    let world = SimWorld::new(Coord::new(0, 0)).with_storage(slots);
    world.open_storage(&GRANARY).await.unwrap();

    let outcome = reconciler()
        .withdraw(&world, &GRANARY, CropType::Leek)
        .await
        .unwrap();

    assert_eq!(outcome, WithdrawOutcome::Withdrew { slot: 0, units: 70 });
    assert!(world.slots().await[0].is_empty());
    assert_eq!(world.seed_units(CropType::Leek).await, 70);
}

#[tokio::test]
async fn test_withdraw_without_stock() {
    let world = SimWorld::new(Coord::new(0, 0)).with_storage(nine_mismatched_one_empty());
    world.open_storage(&GRANARY).await.unwrap();

    let outcome = reconciler()
        .withdraw(&world, &GRANARY, CropType::Carrot)
        .await
        .unwrap();

    assert_eq!(outcome, WithdrawOutcome::NoSeeds);
}

#[tokio::test]
async fn test_withdraw_with_full_inventory() {
    let mut slots = vec![SlotView::Empty; 10];
    slots[0] = filled(CropType::Carrot, 3.0, 70);
    let world = SimWorld::new(Coord::new(0, 0))
        .with_inventory(1)
        .with_item("gfx/invobjs/stone", None)
        .with_storage(slots);
    world.open_storage(&GRANARY).await.unwrap();

    let outcome = reconciler()
        .withdraw(&world, &GRANARY, CropType::Carrot)
        .await
        .unwrap();

    assert_eq!(outcome, WithdrawOutcome::InventoryFull);
}

#[tokio::test]
async fn test_stalled_take_rounds_end_the_pass() {
    let mut mock = MockStorehouse::new();
    let mut slots = vec![SlotView::Empty; 10];
    slots[1] = filled(CropType::Carrot, 3.0, 500);

    mock.expect_storage_slots()
        .returning(move || Ok(slots.clone()));
    mock.expect_free_slots().returning(|| Ok(2));
    // one round of two takes, then the unchanged slot ends the pass
    mock.expect_take().withf(|slot| *slot == 1).times(2).returning(|_| Ok(()));

    let outcome = reconciler()
        .withdraw(&mock, &GRANARY, CropType::Carrot)
        .await
        .unwrap();

    assert_eq!(outcome, WithdrawOutcome::Stalled { slot: 1 });
}

#[tokio::test]
async fn test_withdraw_is_cancelled_by_stop() {
    let stop = CancellationToken::new();
    let reconciler = Reconciler::new(
        StorageConfig::default(),
        &WorkerConfig::default(),
        Pacer::new(Arc::new(InstantClock::new()), stop.clone()),
    );
    let mut slots = vec![SlotView::Empty; 10];
    slots[0] = filled(CropType::Carrot, 3.0, 500);
    let world = SimWorld::new(Coord::new(0, 0)).with_storage(slots);
    world.open_storage(&GRANARY).await.unwrap();

    stop.cancel();
    let outcome = reconciler
        .withdraw(&world, &GRANARY, CropType::Carrot)
        .await
        .unwrap();

    assert_eq!(outcome, WithdrawOutcome::Cancelled);
}
