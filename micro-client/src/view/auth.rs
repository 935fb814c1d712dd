use anyhow::Context;
use tokio::sync::mpsc;

use crate::{
    api::{AuthUser, Error, User},
    repo::{AuthRepository, UserRepository},
    view::UiState,
    Backend,
};

pub struct AuthViewModel {
    auth: AuthRepository,
    users: UserRepository,
    states: mpsc::UnboundedReceiver<Option<AuthUser>>,

    /// Auth-provider view of the session
    pub session: Option<AuthUser>,

    /// User document of the signed-in user
    pub user: Option<User>,
    pub ui_state: UiState,
}

impl AuthViewModel {
    pub fn new(backend: Backend) -> AuthViewModel {
        let auth = AuthRepository::new(backend.clone());
        let states = auth.auth_state_changes();
        let mut res = AuthViewModel {
            users: UserRepository::new(backend),
            session: auth.current_user(),
            auth,
            states,
            user: None,
            ui_state: UiState::Empty,
        };
        res.apply_pending();
        res
    }

    /// Applies sign-in and sign-out notifications received so far
    pub fn apply_pending(&mut self) -> usize {
        let mut num = 0;
        while let Ok(state) = self.states.try_recv() {
            self.on_state(state);
            num += 1;
        }
        num
    }

    pub async fn next_update(&mut self) -> Option<Option<AuthUser>> {
        let state = self.states.recv().await?;
        self.on_state(state.clone());
        Some(state)
    }

    fn on_state(&mut self, state: Option<AuthUser>) {
        if state.is_none() {
            self.user = None;
        }
        self.session = state;
    }

    fn settle<T>(&mut self, res: anyhow::Result<T>) -> anyhow::Result<T> {
        match &res {
            Ok(_) => self.ui_state = UiState::Success,
            Err(e) => {
                tracing::error!("auth operation failed: {e:#}");
                self.ui_state = UiState::from_error(e);
            }
        }
        res
    }

    /// Creates the account, then the user document
    pub async fn sign_up(
        &mut self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
    ) -> anyhow::Result<()> {
        self.ui_state = UiState::Loading;
        let res = async {
            let user = self
                .auth
                .sign_up(first_name, last_name, email, password)
                .await?;
            self.users.add_user(&user).await?;
            Ok::<_, anyhow::Error>(user)
        }
        .await;
        let user = self.settle(res)?;
        self.user = Some(user);
        self.apply_pending();
        Ok(())
    }

    /// Signs in and loads the user document, recording a verified email
    pub async fn sign_in(&mut self, email: &str, password: &str) -> anyhow::Result<()> {
        self.ui_state = UiState::Loading;
        let res = async {
            let session = self.auth.sign_in(email, password).await?;
            let mut user = self
                .users
                .user_by_id(&session.uid)
                .await?
                .ok_or_else(|| Error::NotFound(format!("user document of {}", session.uid)))
                .context("loading signed-in user")?;
            if session.email_verified && !user.is_verified {
                user.is_verified = true;
                self.users.update_user(&user).await?;
            }
            Ok::<_, anyhow::Error>(user)
        }
        .await;
        let user = self.settle(res)?;
        self.user = Some(user);
        self.apply_pending();
        Ok(())
    }

    pub async fn reset_password(&mut self, email: &str) -> anyhow::Result<()> {
        self.ui_state = UiState::Loading;
        let res = self.auth.send_password_reset(email).await;
        self.settle(res)
    }

    pub async fn sign_out(&mut self) -> anyhow::Result<()> {
        self.auth.sign_out().await?;
        self.user = None;
        self.ui_state = UiState::Empty;
        self.apply_pending();
        Ok(())
    }

    pub fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::test_util;

    #[tokio::test]
    async fn sign_up_and_verify() {
        let (srv, backend) = test_util::backend();
        let mut vm = AuthViewModel::new(backend.clone());
        assert!(!vm.is_signed_in());

        vm.sign_up("Ada", "Lovelace", "ada@example.org", "hunter22")
            .await
            .unwrap();
        assert_eq!(vm.ui_state, UiState::Success);
        assert!(vm.is_signed_in());
        let uid = vm.current_user().unwrap().uid.clone();
        assert_eq!(vm.current_user().unwrap().display_name(), "Ada Lovelace");

        vm.sign_out().await.unwrap();
        assert!(!vm.is_signed_in());
        assert!(vm.current_user().is_none());

        srv.test_verify_email("ada@example.org");
        vm.sign_in("ada@example.org", "hunter22").await.unwrap();
        let user = vm.current_user().unwrap();
        assert_eq!(user.uid, uid);
        assert!(user.is_verified);
        let stored = UserRepository::new(backend)
            .user_by_id(&uid)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_verified);
    }

    #[tokio::test]
    async fn failures_surface_in_ui_state() {
        let (_srv, backend) = test_util::backend();
        let mut vm = AuthViewModel::new(backend);
        assert!(vm.sign_in("ghost@example.org", "whatever").await.is_err());
        assert_eq!(
            vm.ui_state,
            UiState::Error(Error::InvalidCredentials.to_string())
        );

        assert!(vm
            .sign_up("Ada", "Lovelace", "not-an-email", "hunter22")
            .await
            .is_err());
        assert!(vm.ui_state.is_error());
        assert!(vm.reset_password("ghost@example.org").await.is_err());
        assert!(vm.ui_state.is_error());
    }
}
