mod common;

use anyhow::Result;
use common::{Household, parse_date, test_service};
use controla::application::AppError;
use controla::domain::{
    EntryKind, IncentiveKind, NewReminder, NewTransaction, Recurrence, TransactionChanges,
    TransactionFilter,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[tokio::test]
async fn test_create_transaction_posts_effect() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let home = Household::create(&service).await?;

    home.spend(&service, 4590, "2025-03-01").await?;
    assert_eq!(home.balance_of(&service, "Bank").await?, 100000 - 4590);

    home.earn(&service, 250000, "2025-03-02").await?;
    assert_eq!(home.balance_of(&service, "Bank").await?, 100000 - 4590 + 250000);

    // Unpaid transactions count towards the balance as well.
    let pending = NewTransaction::new(
        home.groceries.id,
        home.cash.id,
        EntryKind::Expense,
        1000,
        parse_date("2025-03-03"),
    );
    service.create_transaction(home.owner, pending).await?;
    assert_eq!(home.balance_of(&service, "Cash").await?, 49000);

    Ok(())
}

#[tokio::test]
async fn test_update_transaction_posts_difference() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let home = Household::create(&service).await?;

    let tx = home.spend(&service, 10000, "2025-03-01").await?;
    assert_eq!(home.balance_of(&service, "Bank").await?, 90000);

    // Amount change: only the difference is posted.
    service
        .update_transaction(
            home.owner,
            tx.id,
            TransactionChanges {
                amount_cents: Some(15000),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(home.balance_of(&service, "Bank").await?, 85000);

    // Kind flip: the expense becomes an income.
    service
        .update_transaction(
            home.owner,
            tx.id,
            TransactionChanges {
                kind: Some(EntryKind::Income),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(home.balance_of(&service, "Bank").await?, 115000);

    // Description-only edits leave balances alone.
    service
        .update_transaction(
            home.owner,
            tx.id,
            TransactionChanges {
                description: Some("refund".to_string()),
                paid: Some(false),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(home.balance_of(&service, "Bank").await?, 115000);

    Ok(())
}

#[tokio::test]
async fn test_update_transaction_moves_between_accounts() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let home = Household::create(&service).await?;

    let tx = home.spend(&service, 20000, "2025-03-01").await?;
    service
        .update_transaction(
            home.owner,
            tx.id,
            TransactionChanges {
                account_id: Some(home.cash.id),
                amount_cents: Some(5000),
                ..Default::default()
            },
        )
        .await?;

    assert_eq!(home.balance_of(&service, "Bank").await?, 100000);
    assert_eq!(home.balance_of(&service, "Cash").await?, 45000);

    let stored = service.get_transaction(home.owner, tx.id).await?;
    assert_eq!(stored.account_id, home.cash.id);
    assert_eq!(stored.amount_cents, 5000);

    Ok(())
}

#[tokio::test]
async fn test_delete_transaction_reverses_effect() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let home = Household::create(&service).await?;

    let tx = home.earn(&service, 30000, "2025-03-01").await?;
    assert_eq!(home.balance_of(&service, "Bank").await?, 130000);

    let deleted = service.delete_transaction(home.owner, tx.id).await?;
    assert_eq!(deleted.id, tx.id);
    assert_eq!(home.balance_of(&service, "Bank").await?, 100000);

    let result = service.get_transaction(home.owner, tx.id).await;
    assert!(matches!(result, Err(AppError::TransactionNotFound(_))));

    // A second delete finds nothing and changes nothing.
    let result = service.delete_transaction(home.owner, tx.id).await;
    assert!(matches!(result, Err(AppError::TransactionNotFound(_))));
    assert_eq!(home.balance_of(&service, "Bank").await?, 100000);

    Ok(())
}

#[tokio::test]
async fn test_delete_then_recreate_restores_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let home = Household::create(&service).await?;

    let tx = home.spend(&service, 12345, "2025-03-01").await?;
    let before = home.balance_of(&service, "Bank").await?;

    service.delete_transaction(home.owner, tx.id).await?;
    home.spend(&service, 12345, "2025-03-01").await?;

    assert_eq!(home.balance_of(&service, "Bank").await?, before);

    Ok(())
}

#[tokio::test]
async fn test_invalid_transaction_is_rejected_without_effect() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let home = Household::create(&service).await?;

    let zero = NewTransaction::new(
        home.groceries.id,
        home.bank.id,
        EntryKind::Expense,
        0,
        parse_date("2025-03-01"),
    );
    let result = service.create_transaction(home.owner, zero).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let tx = home.spend(&service, 1000, "2025-03-01").await?;
    let result = service
        .update_transaction(
            home.owner,
            tx.id,
            TransactionChanges {
                amount_cents: Some(-5),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(home.balance_of(&service, "Bank").await?, 99000);

    Ok(())
}

#[tokio::test]
async fn test_random_operations_keep_balances_consistent() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let home = Household::create(&service).await?;
    let accounts = [home.bank.id, home.cash.id];
    let mut rng = StdRng::seed_from_u64(7);
    let mut live = Vec::new();

    for step in 0..120 {
        match rng.gen_range(0..4) {
            0 | 1 => {
                let (category, kind) = if rng.gen_bool(0.5) {
                    (home.salary.id, EntryKind::Income)
                } else {
                    (home.groceries.id, EntryKind::Expense)
                };
                let mut new = NewTransaction::new(
                    category,
                    accounts[rng.gen_range(0..2)],
                    kind,
                    rng.gen_range(1..50000),
                    parse_date("2025-03-01"),
                );
                if rng.gen_bool(0.5) {
                    new = new.settled();
                }
                let tx = service.create_transaction(home.owner, new).await?;
                live.push(tx.id);
            }
            2 if !live.is_empty() => {
                let id = live[rng.gen_range(0..live.len())];
                let changes = TransactionChanges {
                    account_id: Some(accounts[rng.gen_range(0..2)]),
                    kind: rng.gen_bool(0.3).then_some(EntryKind::Income),
                    amount_cents: Some(rng.gen_range(1..50000)),
                    paid: Some(rng.gen_bool(0.5)),
                    ..Default::default()
                };
                service.update_transaction(home.owner, id, changes).await?;
            }
            3 if !live.is_empty() => {
                let id = live.swap_remove(rng.gen_range(0..live.len()));
                service.delete_transaction(home.owner, id).await?;
            }
            _ => {}
        }

        let report = service.check_integrity(home.owner).await?;
        assert!(report.is_healthy(), "step {}: drifts: {:?}", step, report.drifts);
        assert_eq!(report.account_count, 2);
        assert_eq!(report.transaction_count, live.len());
    }

    Ok(())
}

#[tokio::test]
async fn test_list_transactions_filters() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let home = Household::create(&service).await?;

    home.spend(&service, 1000, "2025-01-15").await?;
    home.spend(&service, 2000, "2025-02-15").await?;
    home.earn(&service, 3000, "2025-02-20").await?;
    let unpaid = NewTransaction::new(
        home.groceries.id,
        home.cash.id,
        EntryKind::Expense,
        4000,
        parse_date("2025-03-01"),
    );
    service.create_transaction(home.owner, unpaid).await?;

    let all = service
        .list_transactions(home.owner, &TransactionFilter::default())
        .await?;
    assert_eq!(all.len(), 4);
    assert_eq!(all[0].date, parse_date("2025-03-01"));
    assert_eq!(all[3].date, parse_date("2025-01-15"));

    let february = service
        .list_transactions(
            home.owner,
            &TransactionFilter {
                from: Some(parse_date("2025-02-01")),
                to: Some(parse_date("2025-02-28")),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(february.len(), 2);

    let expenses_on_bank = service
        .list_transactions(
            home.owner,
            &TransactionFilter {
                account_id: Some(home.bank.id),
                kind: Some(EntryKind::Expense),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(expenses_on_bank.len(), 2);

    let pending = service
        .list_transactions(
            home.owner,
            &TransactionFilter {
                paid: Some(false),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].amount_cents, 4000);

    let limited = service
        .list_transactions(
            home.owner,
            &TransactionFilter {
                limit: Some(2),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(limited.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_accounts_and_categories_in_use_cannot_be_deleted() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let home = Household::create(&service).await?;

    let tx = home.spend(&service, 1000, "2025-03-01").await?;

    let result = service.delete_account(home.owner, home.bank.id).await;
    assert!(matches!(
        result,
        Err(AppError::AccountInUse {
            transactions: 1,
            goals: 0,
            ..
        })
    ));

    let result = service.delete_category(home.owner, home.groceries.id).await;
    assert!(matches!(
        result,
        Err(AppError::CategoryInUse {
            transactions: 1,
            ..
        })
    ));

    // A goal's dedicated account is in use by the goal.
    let goal = service.create_goal(home.owner, "Bike", 50000, None).await?;
    let savings = service.find_account(home.owner, "Savings: Bike").await?;
    assert_eq!(goal.account_id, Some(savings.id));
    let result = service.delete_account(home.owner, savings.id).await;
    assert!(matches!(result, Err(AppError::AccountInUse { goals: 1, .. })));

    service.delete_transaction(home.owner, tx.id).await?;
    service.delete_category(home.owner, home.groceries.id).await?;
    service.delete_account(home.owner, home.cash.id).await?;

    let accounts = service.list_accounts(home.owner).await?;
    let names: Vec<&str> = accounts.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Bank", "Savings: Bike"]);

    Ok(())
}

#[tokio::test]
async fn test_account_opening_balance_change_shifts_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let home = Household::create(&service).await?;

    home.spend(&service, 2500, "2025-03-01").await?;
    let updated = service
        .update_account(home.owner, home.bank.id, Some("Main Bank"), Some(120000))
        .await?;
    assert_eq!(updated.name, "Main Bank");
    assert_eq!(updated.opening_balance, 120000);
    assert_eq!(updated.balance, 120000 - 2500);

    let report = service.check_integrity(home.owner).await?;
    assert!(report.is_healthy());

    let result = service
        .update_account(home.owner, home.cash.id, Some("Main Bank"), None)
        .await;
    assert!(matches!(result, Err(AppError::AccountAlreadyExists(_))));

    Ok(())
}

#[tokio::test]
async fn test_duplicate_names_are_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let home = Household::create(&service).await?;

    let result = service.create_user("ana").await;
    assert!(matches!(result, Err(AppError::UserAlreadyExists(_))));

    let result = service.create_account(home.owner, "Bank", 0).await;
    assert!(matches!(result, Err(AppError::AccountAlreadyExists(_))));

    let result = service
        .create_category(home.owner, "Salary", EntryKind::Income)
        .await;
    assert!(matches!(result, Err(AppError::CategoryAlreadyExists(_))));

    let result = service.create_account(home.owner, "   ", 0).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    // Names are unique per owner only.
    let other = Household::create_for(&service, "ben").await?;
    assert_eq!(other.bank.name, "Bank");

    Ok(())
}

#[tokio::test]
async fn test_other_owners_data_is_invisible() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let ana = Household::create_for(&service, "ana").await?;
    let ben = Household::create_for(&service, "ben").await?;

    let tx = ana.spend(&service, 1000, "2025-03-01").await?;

    let result = service.get_transaction(ben.owner, tx.id).await;
    assert!(matches!(result, Err(AppError::TransactionNotFound(_))));

    let result = service.delete_transaction(ben.owner, tx.id).await;
    assert!(matches!(result, Err(AppError::TransactionNotFound(_))));

    let result = service.get_account(ben.owner, ana.bank.id).await;
    assert!(matches!(result, Err(AppError::AccountNotFound(_))));

    // Posting onto someone else's account or category is refused.
    let foreign = NewTransaction::new(
        ben.groceries.id,
        ana.bank.id,
        EntryKind::Expense,
        500,
        parse_date("2025-03-01"),
    );
    let result = service.create_transaction(ben.owner, foreign).await;
    assert!(matches!(result, Err(AppError::AccountNotFound(_))));

    let listed = service
        .list_transactions(ben.owner, &TransactionFilter::default())
        .await?;
    assert!(listed.is_empty());
    assert_eq!(ana.balance_of(&service, "Bank").await?, 99000);

    Ok(())
}

#[tokio::test]
async fn test_deleting_transaction_removes_incentive_and_unlinks_reminders() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let home = Household::create(&service).await?;

    let posting = service.grant_exam_incentive(home.owner, None, Some(2025)).await?;
    let reminder = service
        .create_reminder(
            home.owner,
            NewReminder {
                title: "Check exam payout".to_string(),
                description: String::new(),
                remind_on: Some(parse_date("2025-04-01")),
                days_before: 0,
                recurrence: Recurrence::None,
                transaction_id: Some(posting.transaction.id),
            },
        )
        .await?;
    let notification = service
        .create_notification(
            home.owner,
            "Exam incentive paid",
            Some(posting.transaction.id),
            None,
        )
        .await?;

    service
        .delete_transaction(home.owner, posting.transaction.id)
        .await?;

    let incentives = service
        .list_incentives(home.owner, Some(IncentiveKind::Exam))
        .await?;
    assert!(incentives.is_empty());

    let reminder = service.get_reminder(home.owner, reminder.id).await?;
    assert_eq!(reminder.transaction_id, None);

    let notifications = service.list_notifications(home.owner, false).await?;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].id, notification.id);
    assert_eq!(notifications[0].transaction_id, None);

    assert_eq!(home.balance_of(&service, "Bank").await?, 100000);

    Ok(())
}

#[tokio::test]
async fn test_editing_incentive_transaction_syncs_incentive() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let home = Household::create(&service).await?;

    let posting = service.grant_exam_incentive(home.owner, None, Some(2025)).await?;
    service
        .update_transaction(
            home.owner,
            posting.transaction.id,
            TransactionChanges {
                amount_cents: Some(25000),
                account_id: Some(home.cash.id),
                ..Default::default()
            },
        )
        .await?;

    let incentive = service.get_incentive(home.owner, posting.incentive.id).await?;
    assert_eq!(incentive.amount_cents, 25000);
    assert_eq!(incentive.account_id, Some(home.cash.id));

    assert_eq!(home.balance_of(&service, "Bank").await?, 100000);
    assert_eq!(home.balance_of(&service, "Cash").await?, 75000);

    Ok(())
}
