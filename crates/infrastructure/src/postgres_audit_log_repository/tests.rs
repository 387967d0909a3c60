use chrono::{Duration, Utc};
use hrdesk_application::{AuditLogQuery, AuditLogRepository, AuditRepository, NewAuditLogEntry};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::PostgresAuditLogRepository;
use crate::{MIGRATOR, PostgresAuditRepository};

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres audit log tests: {error}");
    }

    Some(pool)
}

fn entry(user_id: &str, action: &str) -> NewAuditLogEntry {
    let (entity, _) = action.rsplit_once('.').unwrap_or(("", action));
    NewAuditLogEntry {
        user_id: Some(user_id.to_owned()),
        action: action.to_owned(),
        entity: entity.to_owned(),
        payload: r#"{"id":1}"#.to_owned(),
        request: format!(r#"{{"operation":"{action}"}}"#),
        response: "null".to_owned(),
    }
}

#[tokio::test]
async fn entries_are_filtered_and_listed_newest_first() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let writer = PostgresAuditRepository::new(pool.clone());
    let reader = PostgresAuditLogRepository::new(pool.clone());
    let user_id = format!("audit-test-{}", uuid::Uuid::new_v4());

    for action in ["user.delete", "department.create", "user.delete"] {
        let appended = writer.append_entry(entry(user_id.as_str(), action)).await;
        assert!(appended.is_ok());
    }

    let backdated = sqlx::query(
        r#"
            UPDATE audit_log
            SET created_at = now() - interval '3 days'
            WHERE user_id = $1 AND action = 'department.create'
            "#,
    )
    .bind(user_id.as_str())
    .execute(&pool)
    .await;
    assert!(backdated.is_ok());

    let all = reader
        .list_entries(AuditLogQuery {
            limit: 50,
            user_id: Some(user_id.clone()),
            ..AuditLogQuery::default()
        })
        .await;
    assert!(all.is_ok());
    let all = all.unwrap_or_default();
    assert_eq!(all.len(), 3);
    assert_eq!(all[2].action, "department.create");
    assert!(all[0].created_at >= all[1].created_at);

    let deletes = reader
        .list_entries(AuditLogQuery {
            limit: 50,
            user_id: Some(user_id.clone()),
            entity: Some("user".to_owned()),
            ..AuditLogQuery::default()
        })
        .await;
    assert!(matches!(deletes, Ok(entries) if entries.len() == 2
        && entries.iter().all(|entry| entry.action == "user.delete")));

    let recent = reader
        .list_entries(AuditLogQuery {
            limit: 50,
            user_id: Some(user_id.clone()),
            created_from: Some(Utc::now() - Duration::days(1)),
            ..AuditLogQuery::default()
        })
        .await;
    assert!(matches!(recent, Ok(entries) if entries.len() == 2));

    let paged = reader
        .list_entries(AuditLogQuery {
            limit: 1,
            offset: 2,
            user_id: Some(user_id),
            ..AuditLogQuery::default()
        })
        .await;
    assert!(matches!(paged, Ok(entries) if entries.len() == 1
        && entries[0].action == "department.create"));
}
