use anyhow::Context;
use tokio::sync::mpsc;

use crate::{
    api::{now, AuthUser, NewAccount, User},
    Backend,
};

#[derive(Clone)]
pub struct AuthRepository(Backend);

impl AuthRepository {
    pub fn new(backend: Backend) -> AuthRepository {
        AuthRepository(backend)
    }

    /// Creates the account, asks for email verification and returns the user
    /// document to store. Verification failures are only logged.
    pub async fn sign_up(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
    ) -> anyhow::Result<User> {
        let account = NewAccount {
            email: String::from(email),
            password: String::from(password),
            display_name: format!("{first_name} {last_name}"),
            photo_uri: String::new(),
        };
        let created = self
            .0
            .auth
            .create_account(account)
            .await
            .with_context(|| format!("creating account for {email:?}"))?;
        if let Err(error) = self.0.auth.send_email_verification().await {
            tracing::warn!(%error, email, "failed sending verification email");
        }
        tracing::info!(user=%created.uid, "signed up");
        Ok(User {
            uid: created.uid,
            first_name: String::from(first_name),
            last_name: String::from(last_name),
            email: created.email,
            is_verified: created.email_verified,
            created_at: now(),
            ..User::default()
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> anyhow::Result<AuthUser> {
        self.0
            .auth
            .sign_in(email, password)
            .await
            .with_context(|| format!("signing in as {email:?}"))
    }

    pub async fn send_password_reset(&self, email: &str) -> anyhow::Result<()> {
        self.0
            .auth
            .send_password_reset(email)
            .await
            .with_context(|| format!("sending password reset to {email:?}"))
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.0.auth.current_user()
    }

    pub fn auth_state_changes(&self) -> mpsc::UnboundedReceiver<Option<AuthUser>> {
        self.0.auth.subscribe_state()
    }

    pub async fn sign_out(&self) -> anyhow::Result<()> {
        self.0.auth.sign_out().await.context("signing out")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{api::Error, repo::test_util};

    #[tokio::test]
    async fn sign_up_then_in() {
        let (srv, backend) = test_util::backend();
        let repo = AuthRepository::new(backend);
        let user = repo
            .sign_up("Ada", "Lovelace", "ada@example.org", "hunter22")
            .await
            .unwrap();
        assert!(!user.uid.is_empty());
        assert!(!user.is_verified);
        assert_eq!(srv.test_verification_emails(), vec!["ada@example.org"]);
        assert_eq!(repo.current_user().map(|u| u.uid), Some(user.uid.clone()));

        repo.sign_out().await.unwrap();
        assert!(repo.current_user().is_none());
        let err = repo.sign_in("ada@example.org", "nope").await.unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::InvalidCredentials));
        let again = repo.sign_in("ada@example.org", "hunter22").await.unwrap();
        assert_eq!(again.uid, user.uid);
    }

    #[tokio::test]
    async fn weak_password() {
        let (_srv, backend) = test_util::backend();
        let repo = AuthRepository::new(backend);
        let err = repo
            .sign_up("Ada", "Lovelace", "ada@example.org", "123")
            .await
            .unwrap_err();
        assert!(err
            .downcast_ref::<Error>()
            .map_or(false, |e| e.is_auth_failure()));
    }
}
