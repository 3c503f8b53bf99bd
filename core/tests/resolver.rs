//! Card dependency resolver: unlock chains, cooldowns and budget tracking.

mod common;

use common::{card, locked_card, Call, FakeGame, Harness, NOW};
use tsubasa_core::{
    event::AccountEvent,
    resolver::CardResolver,
    snapshot::CardSnapshot,
    types::{CardId, Coins},
    upgrade::CooldownSet,
};

/// Resolve card `id` against the harness catalogue as it stands now.
fn resolve(h: &mut Harness, id: i64, budget: Coins, cooldowns: &mut CooldownSet) -> (Coins, Vec<AccountEvent>) {
    let snapshot = CardSnapshot::new(h.game.cards.clone(), None);
    let target = snapshot.find(&CardId::from(id)).cloned().expect("target in catalogue");
    let resolver = CardResolver::new();
    let (result, events) = h.with_ctx(|ctx| resolver.resolve(ctx, &target, None, &snapshot, budget, cooldowns));
    (result.expect("resolve is not fatal"), events)
}

#[test]
fn locked_target_upgrades_prerequisite_once_and_stays_locked() {
    // A: cost 3000, level 0, unlocked. B: locked behind A at level 2.
    let game = FakeGame::with_cards(
        vec![card(1, "A", 3000), locked_card(2, "B", 500, 1, 2)],
        5000,
    );
    let mut h = Harness::new(game);
    let mut cooldowns = CooldownSet::new();

    let (budget, events) = resolve(&mut h, 2, 5000, &mut cooldowns);

    assert_eq!(budget, 2000);
    assert_eq!(h.game.upgrade_calls(), vec![CardId::from(1)]);
    assert!(!h.game.card(2).unlocked, "B needs A at level 2");
    assert!(events.iter().any(|e| matches!(e, AccountEvent::CardUnaffordable { budget: 2000, .. })));
}

#[test]
fn future_cooldown_skips_without_calling_the_server() {
    let mut a = card(1, "A", 100);
    a.level_up_available_date = Some(NOW + 3_725);
    let mut h = Harness::new(FakeGame::with_cards(vec![a], 1000));
    let mut cooldowns = CooldownSet::new();

    let (budget, events) = resolve(&mut h, 1, 1000, &mut cooldowns);

    assert_eq!(budget, 1000);
    assert!(h.game.upgrade_calls().is_empty());
    assert_eq!(
        events,
        vec![AccountEvent::CardCooldown { card_id: CardId::from(1), seconds_left: Some(3_725) }]
    );
}

#[test]
fn past_cooldown_date_does_not_block() {
    let mut a = card(1, "A", 100);
    a.level_up_available_date = Some(NOW - 10);
    let mut h = Harness::new(FakeGame::with_cards(vec![a], 1000));

    let (budget, _) = resolve(&mut h, 1, 1000, &mut CooldownSet::new());

    assert_eq!(budget, 900);
    assert_eq!(h.game.card(1).level, 1);
}

#[test]
fn cooldown_rejection_joins_set_and_keeps_budget() {
    let mut game = FakeGame::with_cards(vec![card(1, "A", 100)], 1000);
    game.server_cooldown.insert(CardId::from(1));
    let mut h = Harness::new(game);
    let mut cooldowns = CooldownSet::new();

    let (budget, events) = resolve(&mut h, 1, 1000, &mut cooldowns);

    assert_eq!(budget, 1000);
    assert!(cooldowns.contains(&CardId::from(1)));
    assert!(events.contains(&AccountEvent::CardCooldown { card_id: CardId::from(1), seconds_left: None }));

    // Already in the set: the next resolution does not ask again.
    let (budget, _) = resolve(&mut h, 1, budget, &mut cooldowns);
    assert_eq!(budget, 1000);
    assert_eq!(h.game.count(&Call::CardLevelUp(CardId::from(1))), 1);
}

#[test]
fn unlocked_target_without_parent_gets_exactly_one_level() {
    let mut h = Harness::new(FakeGame::with_cards(vec![card(1, "A", 100)], 10_000));

    let (budget, events) = resolve(&mut h, 1, 10_000, &mut CooldownSet::new());

    assert_eq!(budget, 9_900);
    assert_eq!(h.game.card(1).level, 1);
    assert_eq!(events.len(), 1);
}

#[test]
fn prerequisite_is_raised_to_the_required_level() {
    let game = FakeGame::with_cards(
        vec![card(1, "A", 1000), locked_card(2, "B", 500, 1, 3)],
        10_000,
    );
    let mut h = Harness::new(game);

    let (budget, _) = resolve(&mut h, 2, 10_000, &mut CooldownSet::new());

    assert_eq!(budget, 7_000);
    assert_eq!(h.game.card(1).level, 3);
    assert!(h.game.card(2).unlocked);
    // B itself is left for the next snapshot.
    assert_eq!(h.game.card(2).level, 0);
}

#[test]
fn zero_unlock_level_means_one_upgrade() {
    let game = FakeGame::with_cards(
        vec![card(1, "A", 1000), locked_card(2, "B", 500, 1, 0)],
        10_000,
    );
    let mut h = Harness::new(game);

    let (budget, _) = resolve(&mut h, 2, 10_000, &mut CooldownSet::new());

    assert_eq!(budget, 9_000);
    assert_eq!(h.game.upgrade_calls(), vec![CardId::from(1)]);
}

#[test]
fn walks_multi_hop_chains() {
    // C needs B, B needs A.
    let game = FakeGame::with_cards(
        vec![
            card(1, "A", 100),
            locked_card(2, "B", 200, 1, 1),
            locked_card(3, "C", 300, 2, 1),
        ],
        1000,
    );
    let mut h = Harness::new(game);

    let (budget, _) = resolve(&mut h, 3, 1000, &mut CooldownSet::new());

    assert_eq!(budget, 900);
    assert_eq!(h.game.upgrade_calls(), vec![CardId::from(1)]);
    assert!(h.game.card(2).unlocked);
    assert!(!h.game.card(3).unlocked);
}

#[test]
fn cyclic_unlock_chain_stops_with_an_event() {
    let game = FakeGame::with_cards(
        vec![locked_card(1, "A", 100, 2, 1), locked_card(2, "B", 100, 1, 1)],
        1000,
    );
    let mut h = Harness::new(game);

    let (budget, events) = resolve(&mut h, 1, 1000, &mut CooldownSet::new());

    assert_eq!(budget, 1000);
    assert!(h.game.upgrade_calls().is_empty());
    assert_eq!(events, vec![AccountEvent::UnlockCycleDetected { card_id: CardId::from(1) }]);
}

#[test]
fn missing_prerequisite_is_a_no_op() {
    let mut h = Harness::new(FakeGame::with_cards(vec![locked_card(2, "B", 100, 99, 1)], 1000));

    let (budget, events) = resolve(&mut h, 2, 1000, &mut CooldownSet::new());

    assert_eq!(budget, 1000);
    assert!(h.game.calls.is_empty());
    assert_eq!(
        events,
        vec![AccountEvent::PrerequisiteMissing {
            card_id:      CardId::from(2),
            prerequisite: CardId::from(99),
        }]
    );
}

#[test]
fn unaffordable_card_is_never_called() {
    let mut h = Harness::new(FakeGame::with_cards(vec![card(1, "A", 5000)], 4999));

    let (budget, events) = resolve(&mut h, 1, 4999, &mut CooldownSet::new());

    assert_eq!(budget, 4999);
    assert!(h.game.upgrade_calls().is_empty());
    assert!(matches!(events[0], AccountEvent::CardUnaffordable { cost: 5000, budget: 4999, .. }));
}

/// The tracked budget charges every level the pre-upgrade snapshot cost.
/// With per-level price growth the server balance ends up lower than the
/// tracked budget, and the server's own refusal ends the chain.
#[test]
fn multi_level_chain_charges_the_snapshot_cost() {
    let mut game = FakeGame::with_cards(
        vec![card(1, "A", 1000), locked_card(2, "B", 500, 1, 3)],
        4000,
    );
    game.cost_growth = 1000;
    let mut h = Harness::new(game);

    let (budget, events) = resolve(&mut h, 2, 4000, &mut CooldownSet::new());

    // Two successes at 1000 and 2000 on the server; the third (3000) is refused.
    assert_eq!(h.game.card(1).level, 2);
    assert_eq!(h.game.balance, 1000);
    assert_eq!(budget, 2000);
    assert_eq!(h.game.upgrade_calls().len(), 3);
    assert!(events.iter().any(|e| matches!(e, AccountEvent::CardUnaffordable { .. })));
}

#[test]
fn budget_equals_initial_minus_costs_and_never_goes_negative() {
    for initial in [0, 99, 100, 250, 1000, 3333] {
        let game = FakeGame::with_cards(
            vec![card(1, "A", 100), locked_card(2, "B", 100, 1, 7)],
            initial,
        );
        let mut h = Harness::new(game);

        let (budget, events) = resolve(&mut h, 2, initial, &mut CooldownSet::new());

        let spent: Coins = events
            .iter()
            .map(|e| match e {
                AccountEvent::CardUpgraded { cost, .. } => *cost,
                _ => 0,
            })
            .sum();
        assert_eq!(budget, initial - spent, "initial={initial}");
        assert!(budget >= 0, "initial={initial}");
    }
}

#[test]
fn pauses_one_second_after_each_upgrade_call() {
    let game = FakeGame::with_cards(
        vec![card(1, "A", 10), locked_card(2, "B", 10, 1, 4)],
        1000,
    );
    let mut h = Harness::new(game);

    resolve(&mut h, 2, 1000, &mut CooldownSet::new());

    assert_eq!(h.game.upgrade_calls().len(), 4);
    assert_eq!(h.elapsed_secs(), 4);
}
