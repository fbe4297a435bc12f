use chrono::NaiveDate;
use sea_orm::Database;

use engine::{Engine, EngineError, MoneyCents};
use migration::MigratorTrait;

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

/// A group with members alice, bob, carol. Returns (group_id, alice, bob,
/// carol) where the user values are ids.
async fn three_member_group(engine: &Engine) -> (String, String, String, String) {
    let alice = engine.new_user("alice", "password").await.unwrap();
    let bob = engine.new_user("bob", "password").await.unwrap();
    let carol = engine.new_user("carol", "password").await.unwrap();

    let group_id = engine.new_group("Trip", None, &alice).await.unwrap();
    engine
        .add_group_member(&group_id, &bob, &alice)
        .await
        .unwrap();
    engine
        .add_group_member(&group_id, &carol, &alice)
        .await
        .unwrap();

    (group_id, alice, bob, carol)
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

#[tokio::test]
async fn new_group_enrolls_the_creator() {
    let engine = engine_with_db().await;
    let alice = engine.new_user("alice", "password").await.unwrap();

    let group_id = engine
        .new_group("Flat", Some("Rent and groceries"), &alice)
        .await
        .unwrap();

    let members = engine.group_members(&group_id, &alice).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, alice);
    assert_eq!(members[0].username, "alice");
}

#[tokio::test]
async fn adding_a_member_twice_is_an_error() {
    let engine = engine_with_db().await;
    let (group_id, alice, bob, _carol) = three_member_group(&engine).await;

    let err = engine
        .add_group_member(&group_id, &bob, &alice)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
}

#[tokio::test]
async fn non_members_cannot_see_the_group() {
    let engine = engine_with_db().await;
    let (group_id, _alice, _bob, _carol) = three_member_group(&engine).await;
    let mallory = engine.new_user("mallory", "password").await.unwrap();

    let err = engine.group(&group_id, &mallory).await.unwrap_err();
    assert!(matches!(err, EngineError::GroupNotFound(_)));

    let err = engine
        .all_balances(&group_id, &mallory)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::GroupNotFound(_)));
}

#[tokio::test]
async fn unknown_group_is_not_found() {
    let engine = engine_with_db().await;
    let alice = engine.new_user("alice", "password").await.unwrap();

    let err = engine
        .record_expense(
            "no-such-group",
            "Dinner",
            MoneyCents::new(10_00),
            &alice,
            date("2026-08-01"),
            None,
            &alice,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::GroupNotFound(_)));
}

#[tokio::test]
async fn equal_split_balances_sum_to_zero() {
    let engine = engine_with_db().await;
    let (group_id, alice, _bob, _carol) = three_member_group(&engine).await;

    engine
        .record_expense(
            &group_id,
            "Hotel",
            MoneyCents::new(100_00),
            &alice,
            date("2026-08-01"),
            None,
            &alice,
        )
        .await
        .unwrap();

    let balances = engine.all_balances(&group_id, &alice).await.unwrap();
    assert_eq!(balances.len(), 3);

    let total: i64 = balances.iter().map(|b| b.balance.cents()).sum();
    assert_eq!(total, 0);

    // 100.00 / 3: the payer nets +66.66 or +66.67 depending on who absorbs
    // the rounding remainder; the others owe a third each.
    let alice_balance = balances
        .iter()
        .find(|b| b.user_id == alice)
        .unwrap()
        .balance
        .cents();
    assert!(alice_balance == 66_66 || alice_balance == 66_67);
    for balance in balances.iter().filter(|b| b.user_id != alice) {
        let cents = balance.balance.cents();
        assert!(cents == -33_33 || cents == -33_34);
    }
}

#[tokio::test]
async fn custom_split_can_exclude_the_payer() {
    let engine = engine_with_db().await;
    let (group_id, alice, bob, carol) = three_member_group(&engine).await;

    let participants = vec![bob.clone(), carol.clone()];
    engine
        .record_expense(
            &group_id,
            "Taxi",
            MoneyCents::new(50_00),
            &alice,
            date("2026-08-02"),
            Some(&participants),
            &alice,
        )
        .await
        .unwrap();

    assert_eq!(
        engine.user_balance(&group_id, &alice, &alice).await.unwrap(),
        MoneyCents::new(50_00)
    );
    assert_eq!(
        engine.user_balance(&group_id, &bob, &alice).await.unwrap(),
        MoneyCents::new(-25_00)
    );
    assert_eq!(
        engine.user_balance(&group_id, &carol, &alice).await.unwrap(),
        MoneyCents::new(-25_00)
    );
}

#[tokio::test]
async fn splits_always_sum_to_the_expense_amount() {
    let engine = engine_with_db().await;
    let (group_id, alice, _bob, _carol) = three_member_group(&engine).await;

    let expense = engine
        .record_expense(
            &group_id,
            "Breakfast",
            MoneyCents::new(10_00),
            &alice,
            date("2026-08-03"),
            None,
            &alice,
        )
        .await
        .unwrap();

    let splits = engine
        .expense_splits(&group_id, &expense.id, &alice)
        .await
        .unwrap();
    assert_eq!(splits.len(), 3);
    let total: i64 = splits.iter().map(|s| s.amount_owed.cents()).sum();
    assert_eq!(total, 10_00);
}

#[tokio::test]
async fn settlement_shifts_both_balances_by_the_amount() {
    let engine = engine_with_db().await;
    let (group_id, alice, bob, carol) = three_member_group(&engine).await;

    // Explicit participant order keeps the shares deterministic:
    // alice +60.00, bob -30.00, carol -30.00.
    let participants = vec![bob.clone(), carol.clone()];
    engine
        .record_expense(
            &group_id,
            "Groceries",
            MoneyCents::new(60_00),
            &alice,
            date("2026-08-04"),
            Some(&participants),
            &alice,
        )
        .await
        .unwrap();

    engine
        .record_settlement(&group_id, &bob, &alice, MoneyCents::new(30_00), &bob)
        .await
        .unwrap();

    assert_eq!(
        engine.user_balance(&group_id, &alice, &alice).await.unwrap(),
        MoneyCents::new(30_00)
    );
    assert_eq!(
        engine.user_balance(&group_id, &bob, &alice).await.unwrap(),
        MoneyCents::ZERO
    );
    assert_eq!(
        engine.user_balance(&group_id, &carol, &alice).await.unwrap(),
        MoneyCents::new(-30_00)
    );

    let total: i64 = engine
        .all_balances(&group_id, &alice)
        .await
        .unwrap()
        .iter()
        .map(|b| b.balance.cents())
        .sum();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn settlement_is_recorded_as_an_expense() {
    let engine = engine_with_db().await;
    let (group_id, alice, bob, _carol) = three_member_group(&engine).await;

    engine
        .record_settlement(&group_id, &bob, &alice, MoneyCents::new(5_00), &bob)
        .await
        .unwrap();

    let expenses = engine.group_expenses(&group_id, &alice).await.unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].description, "Settlement");
    assert_eq!(expenses[0].paid_by, bob);
    assert_eq!(expenses[0].amount, MoneyCents::new(5_00));

    let splits = engine
        .expense_splits(&group_id, &expenses[0].id, &alice)
        .await
        .unwrap();
    assert_eq!(splits.len(), 1);
    assert_eq!(splits[0].user_id, alice);
    assert_eq!(splits[0].amount_owed, MoneyCents::new(5_00));
}

#[tokio::test]
async fn self_settlement_is_rejected() {
    let engine = engine_with_db().await;
    let (group_id, alice, _bob, _carol) = three_member_group(&engine).await;

    let err = engine
        .record_settlement(&group_id, &alice, &alice, MoneyCents::new(5_00), &alice)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSplit(_)));
}

#[tokio::test]
async fn balance_reads_are_idempotent() {
    let engine = engine_with_db().await;
    let (group_id, alice, bob, _carol) = three_member_group(&engine).await;

    engine
        .record_expense(
            &group_id,
            "Museum",
            MoneyCents::new(33_33),
            &alice,
            date("2026-08-05"),
            None,
            &alice,
        )
        .await
        .unwrap();

    let first = engine.user_balance(&group_id, &bob, &alice).await.unwrap();
    let second = engine.user_balance(&group_id, &bob, &alice).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn settlements_zero_out_the_group() {
    let engine = engine_with_db().await;
    let (group_id, alice, _bob, _carol) = three_member_group(&engine).await;

    engine
        .record_expense(
            &group_id,
            "Hotel",
            MoneyCents::new(100_00),
            &alice,
            date("2026-08-06"),
            None,
            &alice,
        )
        .await
        .unwrap();

    let settlements = engine.settlements(&group_id, &alice).await.unwrap();
    assert_eq!(settlements.len(), 2);
    assert!(settlements.iter().all(|s| s.to_user_id == alice));
    assert!(settlements.iter().all(|s| s.amount.is_positive()));

    let positive: i64 = engine
        .all_balances(&group_id, &alice)
        .await
        .unwrap()
        .iter()
        .map(|b| b.balance.cents().max(0))
        .sum();
    let emitted: i64 = settlements.iter().map(|s| s.amount.cents()).sum();
    assert_eq!(emitted, positive);

    // Recording every suggested transfer settles the group completely.
    for settlement in &settlements {
        engine
            .record_settlement(
                &group_id,
                &settlement.from_user_id,
                &settlement.to_user_id,
                settlement.amount,
                &alice,
            )
            .await
            .unwrap();
    }

    let balances = engine.all_balances(&group_id, &alice).await.unwrap();
    assert!(balances.iter().all(|b| b.balance.is_zero()));
    assert!(engine.settlements(&group_id, &alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_participant_list_is_rejected() {
    let engine = engine_with_db().await;
    let (group_id, alice, _bob, _carol) = three_member_group(&engine).await;

    let err = engine
        .record_expense(
            &group_id,
            "Nothing",
            MoneyCents::new(10_00),
            &alice,
            date("2026-08-07"),
            Some(&[]),
            &alice,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSplit(_)));
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let engine = engine_with_db().await;
    let (group_id, alice, _bob, _carol) = three_member_group(&engine).await;

    for cents in [0, -10_00] {
        let err = engine
            .record_expense(
                &group_id,
                "Bogus",
                MoneyCents::new(cents),
                &alice,
                date("2026-08-08"),
                None,
                &alice,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }

    // Nothing was written.
    assert!(engine.group_expenses(&group_id, &alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn payer_and_participants_must_be_members() {
    let engine = engine_with_db().await;
    let (group_id, alice, bob, _carol) = three_member_group(&engine).await;
    let dave = engine.new_user("dave", "password").await.unwrap();

    let err = engine
        .record_expense(
            &group_id,
            "Dinner",
            MoneyCents::new(40_00),
            &dave,
            date("2026-08-09"),
            None,
            &alice,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let participants = vec![bob.clone(), dave.clone()];
    let err = engine
        .record_expense(
            &group_id,
            "Dinner",
            MoneyCents::new(40_00),
            &alice,
            date("2026-08-09"),
            Some(&participants),
            &alice,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn expenses_are_listed_most_recent_first() {
    let engine = engine_with_db().await;
    let (group_id, alice, _bob, _carol) = three_member_group(&engine).await;

    for (description, day) in [("Older", "2026-08-01"), ("Newer", "2026-08-10")] {
        engine
            .record_expense(
                &group_id,
                description,
                MoneyCents::new(9_00),
                &alice,
                date(day),
                None,
                &alice,
            )
            .await
            .unwrap();
    }

    let expenses = engine.group_expenses(&group_id, &alice).await.unwrap();
    assert_eq!(expenses.len(), 2);
    assert_eq!(expenses[0].description, "Newer");
    assert_eq!(expenses[1].description, "Older");
}

#[tokio::test]
async fn the_creator_cannot_be_removed() {
    let engine = engine_with_db().await;
    let (group_id, alice, bob, _carol) = three_member_group(&engine).await;

    let err = engine
        .remove_group_member(&group_id, &alice, &bob)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidArgument(_)));

    engine
        .remove_group_member(&group_id, &bob, &alice)
        .await
        .unwrap();
    let members = engine.group_members(&group_id, &alice).await.unwrap();
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn removing_a_non_member_is_an_error() {
    let engine = engine_with_db().await;
    let (group_id, alice, _bob, _carol) = three_member_group(&engine).await;
    let dave = engine.new_user("dave", "password").await.unwrap();

    let err = engine
        .remove_group_member(&group_id, &dave, &alice)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn deleting_a_group_cascades() {
    let engine = engine_with_db().await;
    let (group_id, alice, bob, _carol) = three_member_group(&engine).await;

    engine
        .record_expense(
            &group_id,
            "Dinner",
            MoneyCents::new(30_00),
            &alice,
            date("2026-08-11"),
            None,
            &alice,
        )
        .await
        .unwrap();

    // Only the creator may delete.
    let err = engine.delete_group(&group_id, &bob).await.unwrap_err();
    assert!(matches!(err, EngineError::GroupNotFound(_)));

    engine.delete_group(&group_id, &alice).await.unwrap();
    let err = engine.group(&group_id, &alice).await.unwrap_err();
    assert!(matches!(err, EngineError::GroupNotFound(_)));
    assert!(engine.groups_for_user(&alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_usernames_are_rejected() {
    let engine = engine_with_db().await;
    engine.new_user("alice", "password").await.unwrap();

    let err = engine.new_user("alice", "other").await.unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
}
