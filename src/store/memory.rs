use super::{User, UserService};
use anyhow::Result;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug)]
struct Account {
    id: String,
    name: String,
    email: String,
    password: SecretString,
}

impl Account {
    fn view(&self) -> User {
        User {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }

    fn password_matches(&self, candidate: &SecretString) -> bool {
        self.password.expose_secret() == candidate.expose_secret()
    }
}

/// Process-local store. Accounts are listed in creation order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: RwLock<Vec<Account>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserService for MemoryStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.iter().map(Account::view).collect())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.iter().find(|a| a.id == id).map(Account::view))
    }

    async fn email_taken(&self, email: &str, except_id: Option<&str>) -> Result<bool> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .iter()
            .any(|a| a.email == email && Some(a.id.as_str()) != except_id))
    }

    async fn create_user(&self, name: &str, email: &str, password: &SecretString) -> Result<bool> {
        let mut accounts = self.accounts.write().await;
        if accounts.iter().any(|a| a.email == email) {
            return Ok(false);
        }

        let id = Uuid::new_v4().to_string();
        debug!(%id, "account created");
        accounts.push(Account {
            id,
            name: name.to_string(),
            email: email.to_string(),
            password: password.clone(),
        });
        Ok(true)
    }

    async fn update_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        password: Option<&SecretString>,
    ) -> Result<bool> {
        let mut accounts = self.accounts.write().await;
        if accounts.iter().any(|a| a.email == email && a.id != id) {
            return Ok(false);
        }

        let Some(account) = accounts.iter_mut().find(|a| a.id == id) else {
            return Ok(false);
        };

        account.name = name.to_string();
        account.email = email.to_string();
        if let Some(password) = password {
            account.password = password.clone();
        }
        Ok(true)
    }

    async fn verify_credential(&self, id: &str, password: &SecretString) -> Result<bool> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .iter()
            .find(|a| a.id == id)
            .is_some_and(|a| a.password_matches(password)))
    }

    async fn patch_password(
        &self,
        id: &str,
        old_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<bool> {
        let mut accounts = self.accounts.write().await;
        match accounts
            .iter_mut()
            .find(|a| a.id == id && a.password_matches(old_password))
        {
            Some(account) => {
                account.password = new_password.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, id: &str) -> Result<bool> {
        let mut accounts = self.accounts.write().await;
        let before = accounts.len();
        accounts.retain(|a| a.id != id);
        Ok(accounts.len() < before)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    async fn seeded() -> (MemoryStore, String) {
        let store = MemoryStore::new();
        assert!(store
            .create_user("Alice", "a@x.com", &secret("secret1"))
            .await
            .unwrap());
        let id = store.list_users().await.unwrap()[0].id.clone();
        (store, id)
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let (store, _) = seeded().await;
        let created = store
            .create_user("Other", "a@x.com", &secret("secret2"))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn email_taken_ignores_own_account() {
        let (store, id) = seeded().await;
        assert!(store.email_taken("a@x.com", None).await.unwrap());
        assert!(!store.email_taken("a@x.com", Some(&id)).await.unwrap());
        assert!(!store.email_taken("b@x.com", None).await.unwrap());
    }

    #[tokio::test]
    async fn verify_credential_matches_only_stored_password() {
        let (store, id) = seeded().await;
        assert!(store.verify_credential(&id, &secret("secret1")).await.unwrap());
        assert!(!store.verify_credential(&id, &secret("secret2")).await.unwrap());
        assert!(!store
            .verify_credential("missing", &secret("secret1"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn patch_password_requires_old_password() {
        let (store, id) = seeded().await;
        assert!(!store
            .patch_password(&id, &secret("wrong11"), &secret("secret9"))
            .await
            .unwrap());
        assert!(store
            .patch_password(&id, &secret("secret1"), &secret("secret9"))
            .await
            .unwrap());
        assert!(store.verify_credential(&id, &secret("secret9")).await.unwrap());
    }

    #[tokio::test]
    async fn update_and_delete_unknown_id() {
        let (store, id) = seeded().await;
        assert!(!store
            .update_user("missing", "Bob", "b@x.com", None)
            .await
            .unwrap());
        assert!(store
            .update_user(&id, "Alicia", "alicia@x.com", None)
            .await
            .unwrap());
        assert_eq!(
            store.get_user(&id).await.unwrap().map(|u| u.email),
            Some("alicia@x.com".to_string())
        );
        assert!(!store.delete_user("missing").await.unwrap());
        assert!(store.delete_user(&id).await.unwrap());
        assert!(store.get_user(&id).await.unwrap().is_none());
    }
}
