use std::path::Path;

use crate::{
    api::{now, GroupId, MediaCategory, MediaType, StudyGroup},
    repo::{local_file_name, MediaRepository, StudyGroupRepository, UserRepository},
    view::UiState,
    Backend,
};

/// Create-or-update flow of a study group and its members
pub struct StudyGroupEditor {
    backend: Backend,
    groups: StudyGroupRepository,
    users: UserRepository,
    media: MediaRepository,
    pub ui_state: UiState,
}

impl StudyGroupEditor {
    pub fn new(backend: Backend) -> StudyGroupEditor {
        StudyGroupEditor {
            groups: StudyGroupRepository::new(backend.clone()),
            users: UserRepository::new(backend.clone()),
            media: MediaRepository::new(backend.clone()),
            backend,
            ui_state: UiState::Empty,
        }
    }

    pub async fn save(&mut self, group: StudyGroup, image: Option<&Path>) -> anyhow::Result<GroupId> {
        self.ui_state = UiState::Loading;
        let res = self.write(group, image).await;
        match &res {
            Ok(_) => self.ui_state = UiState::Success,
            Err(e) => {
                tracing::error!("saving study group failed: {e:#}");
                self.ui_state = UiState::from_error(e);
            }
        }
        res
    }

    async fn write(&self, mut group: StudyGroup, image: Option<&Path>) -> anyhow::Result<GroupId> {
        let author = self.backend.signed_in()?;
        if !group.members_emails.contains(&author.email) {
            group.members_emails.push(author.email.clone());
        }
        let t = now();
        group.author_id = author.uid;
        group.updated_at = t;
        if let Some(path) = image {
            group.display_image_name =
                MediaRepository::generate_media_file_name(&local_file_name(path), MediaType::Image);
            group.local_image_uri = path.to_string_lossy().into_owned();
        }
        let id = match group.id.is_empty() {
            true => {
                group.created_at = t;
                self.groups.add_group(&group).await?
            }
            false => {
                self.groups.update_group(&group).await?;
                group.id.clone()
            }
        };
        if let Some(path) = image {
            let uploaded = self
                .media
                .upload_or_log(MediaCategory::StudyGroupImages, &group.display_image_name, path)
                .await;
            if let Some(uri) = uploaded {
                if let Err(e) = self.groups.update_online_image_uri(&id, &uri).await {
                    tracing::warn!(group=%id, "failed recording image uri: {e:#}");
                }
            }
        }

        let mut emails = group.members_emails;
        emails.sort();
        emails.dedup();
        futures::future::join_all(emails.iter().map(|e| self.add_member(&id, e))).await;
        Ok(id)
    }

    async fn add_member(&self, group: &GroupId, email: &str) {
        match self.users.add_group_member_by_email(email, group).await {
            Ok(true) => {
                if let Err(e) = self.groups.increment_members_count(group, 1).await {
                    tracing::warn!(%group, "failed counting new member: {e:#}");
                }
            }
            Ok(false) => tracing::debug!(%group, email, "no new membership"),
            Err(e) => tracing::warn!(%group, email, "failed adding member: {e:#}"),
        }
    }
}
