use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::models::notification::Notification;
use crate::repository::{NotificationRepository, Repositories};
use crate::{CoreError, CoreResult};

/// Read side of the inbox. Every lookup is scoped to the owning user, so a
/// foreign id behaves exactly like a missing one.
pub struct NotificationService {
    notifications: Arc<dyn NotificationRepository>,
}

impl NotificationService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            notifications: repos.notifications.clone(),
        }
    }

    pub async fn list(&self, user_id: Uuid) -> CoreResult<Vec<Notification>> {
        self.notifications.list_for_user(user_id).await
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> CoreResult<Notification> {
        self.notifications
            .find_for_user(id, user_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("Not found".to_string()))
    }

    pub async fn mark_read(&self, user_id: Uuid, id: Uuid, is_read: bool) -> CoreResult<()> {
        if !self.notifications.set_read(id, user_id, is_read).await? {
            return Err(CoreError::NotFound("Not found".to_string()));
        }
        debug!(notification_id = %id, is_read, "Notification updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::models::notification::NotificationKind;
    use crate::models::booking::Booking;
    use crate::repository::BookingRepository;

    async fn seeded() -> (NotificationService, Uuid, Uuid) {
        let store = Arc::new(InMemoryStore::new());
        let owner = Uuid::new_v4();
        let first = Notification::new(owner, NotificationKind::BookingSent, "first".to_string());
        let second = Notification::new(owner, NotificationKind::BookingAccepted, "second".to_string());
        let booking = Booking::new(Uuid::new_v4(), owner, 1);
        store.create_booking(&booking, &[first, second.clone()]).await.unwrap();

        let service = NotificationService::new(&Repositories::from_store(store));
        (service, owner, second.id)
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let (service, owner, _) = seeded().await;
        let list = service.list(owner).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].message, "second");
        assert!(service.list(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent() {
        let (service, owner, id) = seeded().await;
        service.mark_read(owner, id, true).await.unwrap();
        service.mark_read(owner, id, true).await.unwrap();
        assert!(service.get(owner, id).await.unwrap().is_read);
    }

    #[tokio::test]
    async fn test_foreign_notification_is_not_found() {
        let (service, owner, id) = seeded().await;
        let stranger = Uuid::new_v4();

        let err = service.mark_read(stranger, id, true).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
        assert!(matches!(service.get(stranger, id).await, Err(CoreError::NotFound(_))));
        assert!(!service.get(owner, id).await.unwrap().is_read);
    }
}
