//! Per-user notifications.

use super::{Registry, optional, required};
use crate::error::CoreResult;
use crate::storage::{Batch, Store, StoreExt};
use crate::types::{Notification, NotificationId, User, UserId};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::info;

impl<S: Store> Registry<S> {
    pub fn notify(
        &self,
        user_id: UserId,
        title: &str,
        message: Option<&str>,
        metadata: BTreeMap<String, String>,
        now: DateTime<Utc>,
    ) -> CoreResult<Notification> {
        let title = required(title, "Title is required")?;
        let _guard = self.lock_writer()?;
        self.require::<User>(user_id.as_bytes(), "User")?;

        let notification = Notification {
            id: NotificationId::new(),
            user_id,
            title,
            message: optional(message),
            metadata,
            is_read: false,
            created_at: now,
            read_at: None,
        };
        self.save(&notification)?;
        info!(user_id = %user_id, notification_id = %notification.id, "Notification created");
        Ok(notification)
    }

    /// A user's notifications, newest first. Opening the list reads them
    /// all: every unread one is marked read at `now`.
    pub fn notifications_for(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<Notification>> {
        let _guard = self.lock_writer()?;
        let mut notifications: Vec<Notification> = self.store.all()?;
        notifications.retain(|n| n.user_id == user_id);
        notifications.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let mut batch = Batch::new();
        for notification in &mut notifications {
            if notification.mark_read(now) {
                batch.put(&*notification)?;
            }
        }
        if !batch.is_empty() {
            self.commit(batch)?;
        }
        Ok(notifications)
    }

    pub fn unread_count(&self, user_id: UserId) -> CoreResult<usize> {
        let notifications: Vec<Notification> = self.store.all()?;
        Ok(notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use crate::error::CoreError;
    use crate::types::UserId;
    use std::collections::BTreeMap;

    #[test]
    fn listing_marks_everything_read() {
        let registry = registry();
        let user = registry.login_user("0711111111", at(1, 9)).unwrap();
        registry
            .notify(user.id, "Bienvenue", Some("Hello"), BTreeMap::new(), at(1, 9))
            .unwrap();
        registry
            .notify(user.id, "Nouveau scan", None, BTreeMap::new(), at(1, 10))
            .unwrap();
        assert_eq!(registry.unread_count(user.id).unwrap(), 2);

        let listed = registry.notifications_for(user.id, at(1, 11)).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].title, "Nouveau scan");
        assert!(listed.iter().all(|n| n.is_read && n.read_at == Some(at(1, 11))));
        assert_eq!(registry.unread_count(user.id).unwrap(), 0);

        // Already read ones keep their first read time.
        let again = registry.notifications_for(user.id, at(2, 9)).unwrap();
        assert!(again.iter().all(|n| n.read_at == Some(at(1, 11))));
    }

    #[test]
    fn notifications_are_per_user() {
        let registry = registry();
        let a = registry.login_user("0711111111", at(1, 9)).unwrap();
        let b = registry.login_user("0722222222", at(1, 9)).unwrap();
        registry.notify(a.id, "Pour A", None, BTreeMap::new(), at(1, 9)).unwrap();

        assert_eq!(registry.unread_count(b.id).unwrap(), 0);
        assert!(registry.notifications_for(b.id, at(1, 9)).unwrap().is_empty());
        assert_eq!(registry.unread_count(a.id).unwrap(), 1);
    }

    #[test]
    fn notify_checks_input() {
        let registry = registry();
        assert!(matches!(
            registry.notify(UserId::new(), "Hi", None, BTreeMap::new(), at(1, 9)),
            Err(CoreError::NotFound(_))
        ));
        let user = registry.login_user("0711111111", at(1, 9)).unwrap();
        assert!(matches!(
            registry.notify(user.id, " ", None, BTreeMap::new(), at(1, 9)),
            Err(CoreError::Validation(_))
        ));
    }
}
