use std::path::Path;

use crate::{
    api::{FriendId, Lesson, MediaCategory, MediaType, Snapshot, User, UserFriend, UserId},
    reconcile::{self, Policy},
    repo::{MediaRepository, UserRepository},
    subscription::Subscriptions,
    view::UiState,
    Backend,
};

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum UserSlot {
    Profile,
    Friends,
    LearningList,
}

pub struct UserViewModel {
    users: UserRepository,
    media: MediaRepository,
    subs: Subscriptions<UserSlot>,
    uid: UserId,

    pub user: Option<User>,
    pub friends: Vec<UserFriend>,
    pub learning_list: Vec<Lesson>,
    pub ui_state: UiState,
}

impl UserViewModel {
    pub async fn new(backend: Backend) -> anyhow::Result<UserViewModel> {
        let uid = backend.current_uid()?;
        let mut subs = Subscriptions::new(backend.store.clone());
        subs.subscribe(
            UserSlot::Profile,
            crate::api::collections::users().doc(&uid),
        )
        .await?;
        subs.subscribe(UserSlot::Friends, UserRepository::friends_query(&uid))
            .await?;
        subs.subscribe(
            UserSlot::LearningList,
            UserRepository::learning_list_query(&uid),
        )
        .await?;
        Ok(UserViewModel {
            users: UserRepository::new(backend.clone()),
            media: MediaRepository::new(backend),
            subs,
            uid,
            user: None,
            friends: Vec::new(),
            learning_list: Vec::new(),
            ui_state: UiState::Empty,
        })
    }

    pub async fn apply_pending(&mut self) -> usize {
        let mut num = 0;
        while let Some((slot, snap)) = self.subs.try_next() {
            self.handle(slot, snap);
            num += 1;
        }
        num
    }

    pub async fn next_update(&mut self) -> Option<UserSlot> {
        let (slot, snap) = self.subs.next().await?;
        self.handle(slot.clone(), snap);
        Some(slot)
    }

    fn handle(&mut self, slot: UserSlot, snap: Snapshot) {
        let res = match slot {
            UserSlot::Profile => snap
                .decode_one::<User>()
                .map(|u| self.user = u)
                .map_err(anyhow::Error::from),
            UserSlot::Friends => {
                reconcile::apply_snapshot(Policy::ReplaceAll, &mut self.friends, &snap)
            }
            UserSlot::LearningList => {
                reconcile::apply_snapshot(Policy::ReplaceAll, &mut self.learning_list, &snap)
            }
        };
        if let Err(error) = res {
            tracing::warn!(?slot, "ignoring snapshot: {error:#}");
        }
    }

    pub async fn add_friend(&mut self, email: &str) -> anyhow::Result<FriendId> {
        self.users.add_friend(&self.uid, email).await
    }

    pub async fn remove_friend(&mut self, friend: &FriendId) -> anyhow::Result<()> {
        self.users.remove_friend(&self.uid, friend).await
    }

    pub async fn add_to_learning_list(&mut self, lesson: &Lesson) -> anyhow::Result<()> {
        self.users.add_to_learning_list(&self.uid, lesson).await
    }

    /// Saves the profile. When `local_photo_uri` changed the photo is
    /// uploaded afterwards, and a failed upload only gets logged.
    pub async fn update_profile(&mut self, mut user: User) -> anyhow::Result<()> {
        user.uid = self.uid.clone();
        let previous_photo = self.user.as_ref().map(|u| u.local_photo_uri.clone());
        let photo_changed = !user.local_photo_uri.is_empty()
            && previous_photo.as_deref() != Some(user.local_photo_uri.as_str());
        if photo_changed {
            user.profile_photo_name = MediaRepository::generate_media_file_name(
                &crate::repo::local_file_name(Path::new(&user.local_photo_uri)),
                MediaType::Image,
            );
        }
        self.ui_state = UiState::Loading;
        if let Err(e) = self.users.update_user(&user).await {
            self.ui_state = UiState::from_error(&e);
            return Err(e);
        }
        self.ui_state = UiState::Success;
        if photo_changed {
            let res = async {
                let uri = self
                    .media
                    .upload(
                        MediaCategory::ProfilePhotos,
                        &user.profile_photo_name,
                        Path::new(&user.local_photo_uri),
                    )
                    .await?;
                self.users.update_profile_photo_uri(&self.uid, &uri).await
            };
            if let Err(e) = res.await {
                tracing::warn!(user=%self.uid, "profile photo upload failed: {e:#}");
            }
        }
        Ok(())
    }

    pub async fn send_feedback(&mut self, message: &str) -> anyhow::Result<()> {
        self.users.send_feedback(&self.uid, message).await
    }
}
