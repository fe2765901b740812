use super::Store;
use crate::models::{LeadStatus, TxCategory};

async fn test_store() -> Store {
    Store::open_in_memory().await.unwrap()
}

async fn test_user(store: &Store) -> String {
    let (user, _) = store
        .ensure_user("telegram", "chat-1", Some("Thandi"))
        .await
        .unwrap();
    user.id
}

#[tokio::test]
async fn test_ensure_user_is_idempotent() {
    let store = test_store().await;
    let (first, created) = store
        .ensure_user("telegram", "chat-1", Some("Thandi"))
        .await
        .unwrap();
    assert!(created);
    let (second, created) = store
        .ensure_user("telegram", "chat-1", None)
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn test_same_chat_id_on_different_platforms_is_two_users() {
    let store = test_store().await;
    let (tg, _) = store.ensure_user("telegram", "42", None).await.unwrap();
    let (wa, _) = store.ensure_user("whatsapp", "42", None).await.unwrap();
    assert_ne!(tg.id, wa.id);
}

#[tokio::test]
async fn test_lead_crud() {
    let store = test_store().await;
    let uid = test_user(&store).await;

    let lead = store
        .create_lead(
            &uid,
            "Sipho Dlamini",
            Some("+27821234567"),
            None,
            LeadStatus::New,
            Some("met at expo"),
        )
        .await
        .unwrap();
    assert_eq!(lead.status, LeadStatus::New);

    let updated = store
        .update_lead(
            &uid,
            &lead.id,
            None,
            None,
            Some("sipho@example.com"),
            Some(LeadStatus::Contacted),
            None,
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, LeadStatus::Contacted);
    assert_eq!(updated.email.as_deref(), Some("sipho@example.com"));
    // Untouched fields survive the partial update.
    assert_eq!(updated.phone.as_deref(), Some("+27821234567"));
    assert_eq!(updated.notes.as_deref(), Some("met at expo"));

    assert!(store.delete_lead(&uid, &lead.id).await.unwrap());
    assert!(store.get_lead(&uid, &lead.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_leads_are_scoped_to_owner() {
    let store = test_store().await;
    let uid = test_user(&store).await;
    let (other, _) = store.ensure_user("whatsapp", "chat-2", None).await.unwrap();

    let lead = store
        .create_lead(&uid, "Naledi", None, None, LeadStatus::New, None)
        .await
        .unwrap();

    assert!(store.get_lead(&other.id, &lead.id).await.unwrap().is_none());
    assert!(!store.delete_lead(&other.id, &lead.id).await.unwrap());
}

#[tokio::test]
async fn test_count_leads_by_status() {
    let store = test_store().await;
    let uid = test_user(&store).await;
    for name in ["a", "b"] {
        store
            .create_lead(&uid, name, None, None, LeadStatus::New, None)
            .await
            .unwrap();
    }
    store
        .create_lead(&uid, "c", None, None, LeadStatus::ClosedWon, None)
        .await
        .unwrap();

    let counts = store.count_leads_by_status(&uid).await.unwrap();
    let new = counts.iter().find(|(s, _)| *s == LeadStatus::New).unwrap();
    assert_eq!(new.1, 2);
}

#[tokio::test]
async fn test_transaction_aggregates() {
    let store = test_store().await;
    let uid = test_user(&store).await;
    store
        .add_transaction(&uid, "salary", 15000.0, TxCategory::Income, None)
        .await
        .unwrap();
    store
        .add_transaction(&uid, "groceries at spar", -850.0, TxCategory::Groceries, None)
        .await
        .unwrap();
    store
        .add_transaction(&uid, "taxi fare", -120.0, TxCategory::Transport, None)
        .await
        .unwrap();

    let (income, spend) = store.income_and_spend(&uid, 30).await.unwrap();
    assert_eq!(income, 15000.0);
    assert_eq!(spend, 970.0);

    let totals = store.totals_by_category(&uid, 30).await.unwrap();
    let groceries = totals
        .iter()
        .find(|(c, _)| *c == TxCategory::Groceries)
        .unwrap();
    assert_eq!(groceries.1, -850.0);
}

#[tokio::test]
async fn test_account_upsert_keeps_unset_fields() {
    let store = test_store().await;
    let uid = test_user(&store).await;

    let acct = store
        .upsert_account(&uid, "Emergency Fund", Some(1000.0), Some(5000.0))
        .await
        .unwrap();
    assert_eq!(acct.balance, 1000.0);

    // Balance-only update keeps the target.
    let acct = store
        .upsert_account(&uid, "Emergency Fund", Some(1500.0), None)
        .await
        .unwrap();
    assert_eq!(acct.balance, 1500.0);
    assert_eq!(acct.target, Some(5000.0));

    // One row, not two.
    assert_eq!(store.list_accounts(&uid).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_account_lookup_is_case_insensitive() {
    let store = test_store().await;
    let uid = test_user(&store).await;
    store
        .upsert_account(&uid, "Savings", Some(200.0), None)
        .await
        .unwrap();
    assert!(store.get_account(&uid, "savings").await.unwrap().is_some());
    assert!(store.delete_account(&uid, "SAVINGS").await.unwrap());
}

#[tokio::test]
async fn test_notified_on_counts_failures_for_the_local_date() {
    let store = test_store().await;
    let uid = test_user(&store).await;
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    assert!(!store.notified_on(&uid, "digest", &today).await.unwrap());
    store
        .record_notification(&uid, "digest", "failed", Some("send timeout"))
        .await
        .unwrap();
    assert!(store.notified_on(&uid, "digest", &today).await.unwrap());
    // A different date never matches, whatever the timezone offset.
    assert!(!store.notified_on(&uid, "digest", "2020-01-01").await.unwrap());
}

#[tokio::test]
async fn test_recent_notifications_newest_first() {
    let store = test_store().await;
    let uid = test_user(&store).await;
    store
        .record_notification(&uid, "digest", "failed", Some("send timeout"))
        .await
        .unwrap();
    sqlx::query("UPDATE notifications SET sent_at = datetime('now', '-1 day') WHERE user_id = ?")
        .bind(&uid)
        .execute(store.pool())
        .await
        .unwrap();
    store
        .record_notification(&uid, "digest", "sent", None)
        .await
        .unwrap();

    let recent = store.recent_notifications(&uid, 10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].status, "sent");
    assert_eq!(recent[1].status, "failed");
    assert_eq!(recent[1].error.as_deref(), Some("send timeout"));
}

#[tokio::test]
async fn test_migrations_are_recorded_once() {
    let store = test_store().await;
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM _migrations")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count, 2);
}
