use async_trait::async_trait;
use carpool_core::repository::NotificationRepository;
use carpool_core::{CoreError, CoreResult, Notification};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::storage;

pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    #[sqlx(rename = "type")]
    kind: String,
    message: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = CoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            kind: row.kind.parse()?,
            message: row.message,
            is_read: row.is_read,
            created_at: row.created_at,
        })
    }
}

/// Inserts inside the caller's transaction so the notification commits
/// together with the booking change that produced it.
pub(crate) async fn insert_notification(conn: &mut PgConnection, notification: &Notification) -> CoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO notifications (id, user_id, type, message, is_read, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(notification.id)
    .bind(notification.user_id)
    .bind(notification.kind.as_str())
    .bind(&notification.message)
    .bind(notification.is_read)
    .bind(notification.created_at)
    .execute(conn)
    .await
    .map_err(storage)?;
    Ok(())
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn list_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, user_id, type, message, is_read, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> CoreResult<Option<Notification>> {
        let row = sqlx::query_as::<_, NotificationRow>(
            "SELECT id, user_id, type, message, is_read, created_at FROM notifications WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        row.map(Notification::try_from).transpose()
    }

    async fn set_read(&self, id: Uuid, user_id: Uuid, is_read: bool) -> CoreResult<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = $3 WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .bind(is_read)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(result.rows_affected() > 0)
    }
}
