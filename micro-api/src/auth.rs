use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{Error, UserId};

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Identity as known to the auth provider
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuthUser {
    pub uid: UserId,
    pub email: String,
    pub display_name: String,
    pub photo_uri: String,
    pub email_verified: bool,
}

#[derive(Clone, Debug)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub photo_uri: String,
}

impl NewAccount {
    pub fn validate(&self) -> Result<(), Error> {
        validate_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(Error::WeakPassword(MIN_PASSWORD_LENGTH));
        }
        Ok(())
    }
}

pub(crate) fn validate_email(email: &str) -> Result<(), Error> {
    match email.split_once('@') {
        Some((user, domain)) if !user.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(Error::InvalidEmail(String::from(email))),
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    fn current_user(&self) -> Option<AuthUser>;

    /// Creates the account and signs it in
    async fn create_account(&self, account: NewAccount) -> Result<AuthUser, Error>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, Error>;
    async fn sign_out(&self) -> Result<(), Error>;
    async fn send_email_verification(&self) -> Result<(), Error>;
    async fn send_password_reset(&self, email: &str) -> Result<(), Error>;

    /// Receives the current state right away, then every sign-in and sign-out
    fn subscribe_state(&self) -> mpsc::UnboundedReceiver<Option<AuthUser>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(email: &str, password: &str) -> NewAccount {
        NewAccount {
            email: String::from(email),
            password: String::from(password),
            display_name: String::from("Ada Lovelace"),
            photo_uri: String::new(),
        }
    }

    #[test]
    fn account_validation() {
        assert_eq!(account("ada@example.org", "hunter22").validate(), Ok(()));
        assert_eq!(
            account("ada.example.org", "hunter22").validate(),
            Err(Error::InvalidEmail(String::from("ada.example.org")))
        );
        assert_eq!(
            account("@example.org", "hunter22").validate(),
            Err(Error::InvalidEmail(String::from("@example.org")))
        );
        assert_eq!(
            account("ada@example.org", "short").validate(),
            Err(Error::WeakPassword(MIN_PASSWORD_LENGTH))
        );
    }
}
