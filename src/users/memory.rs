use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo::{StoreError, UserStore};
use super::repo_types::{NewUser, User};

/// In-process store with the same uniqueness rules as the `users` table.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.username == new.username || u.email == new.email)
        {
            return Err(StoreError::Duplicate);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            full_name: new.full_name,
            email: new.email,
            username: new.username,
            password_hash: new.password_hash,
            avatar: new.avatar,
            cover_image: new.cover_image,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| {
                username.is_some_and(|n| n == u.username) || email.is_some_and(|e| e == u.email)
            })
            .cloned())
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> anyhow::Result<()> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.refresh_token = token.map(str::to_owned);
            user.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            full_name: "Test User".into(),
            email: email.into(),
            username: username.into(),
            password_hash: "hash".into(),
            avatar: "https://cdn.local/a.png".into(),
            cover_image: None,
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_username_or_email() {
        let store = MemoryUserStore::default();
        store.create(new_user("ada", "ada@x.io")).await.unwrap();

        let same_name = store.create(new_user("ada", "other@x.io")).await;
        assert!(matches!(same_name, Err(StoreError::Duplicate)));

        let same_email = store.create(new_user("bob", "ada@x.io")).await;
        assert!(matches!(same_email, Err(StoreError::Duplicate)));
    }

    #[tokio::test]
    async fn lookup_ignores_absent_identifiers() {
        let store = MemoryUserStore::default();
        let ada = store.create(new_user("ada", "ada@x.io")).await.unwrap();

        let none = store.find_by_username_or_email(None, None).await.unwrap();
        assert!(none.is_none());

        let by_email = store
            .find_by_username_or_email(None, Some("ada@x.io"))
            .await
            .unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(ada.id));

        let by_name = store
            .find_by_username_or_email(Some("ada"), None)
            .await
            .unwrap();
        assert_eq!(by_name.map(|u| u.id), Some(ada.id));
    }

    #[tokio::test]
    async fn refresh_token_set_and_cleared() {
        let store = MemoryUserStore::default();
        let ada = store.create(new_user("ada", "ada@x.io")).await.unwrap();

        store.set_refresh_token(ada.id, Some("tok")).await.unwrap();
        let stored = store.find_by_id(ada.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some("tok"));

        store.set_refresh_token(ada.id, None).await.unwrap();
        let stored = store.find_by_id(ada.id).await.unwrap().unwrap();
        assert!(stored.refresh_token.is_none());
    }
}
