use std::path::Path;

use crate::{
    api::{now, Channel, ChannelId, MediaCategory, MediaType},
    repo::{local_file_name, ChannelRepository, MediaRepository, UserRepository},
    view::UiState,
    Backend,
};

/// Create-or-update flow of a channel and its members
pub struct ChannelEditor {
    backend: Backend,
    channels: ChannelRepository,
    users: UserRepository,
    media: MediaRepository,
    pub ui_state: UiState,
}

impl ChannelEditor {
    pub fn new(backend: Backend) -> ChannelEditor {
        ChannelEditor {
            channels: ChannelRepository::new(backend.clone()),
            users: UserRepository::new(backend.clone()),
            media: MediaRepository::new(backend.clone()),
            backend,
            ui_state: UiState::Empty,
        }
    }

    /// Writes the channel with its creator among the members, then adds a
    /// membership for every member email that belongs to a known user
    pub async fn save(&mut self, channel: Channel, image: Option<&Path>) -> anyhow::Result<ChannelId> {
        self.ui_state = UiState::Loading;
        let res = self.write(channel, image).await;
        match &res {
            Ok(_) => self.ui_state = UiState::Success,
            Err(e) => {
                tracing::error!("saving channel failed: {e:#}");
                self.ui_state = UiState::from_error(e);
            }
        }
        res
    }

    async fn write(&self, mut channel: Channel, image: Option<&Path>) -> anyhow::Result<ChannelId> {
        let author = self.backend.signed_in()?;
        if !channel.members_emails.contains(&author.email) {
            channel.members_emails.push(author.email.clone());
        }
        let t = now();
        channel.author_id = author.uid;
        channel.updated_at = t;
        if let Some(path) = image {
            channel.display_image_name =
                MediaRepository::generate_media_file_name(&local_file_name(path), MediaType::Image);
            channel.local_image_uri = path.to_string_lossy().into_owned();
        }
        let id = match channel.id.is_empty() {
            true => {
                channel.created_at = t;
                self.channels.add_channel(&channel).await?
            }
            false => {
                self.channels.update_channel(&channel).await?;
                channel.id.clone()
            }
        };
        if let Some(path) = image {
            let uploaded = self
                .media
                .upload_or_log(MediaCategory::ChannelImages, &channel.display_image_name, path)
                .await;
            if let Some(uri) = uploaded {
                if let Err(e) = self.channels.update_online_image_uri(&id, &uri).await {
                    tracing::warn!(channel=%id, "failed recording image uri: {e:#}");
                }
            }
        }

        let mut emails = channel.members_emails;
        emails.sort();
        emails.dedup();
        let added = futures::future::join_all(emails.iter().map(|e| self.add_member(&id, e))).await;
        tracing::debug!(
            channel=%id,
            num_added = added.iter().filter(|a| **a).count(),
            "added channel members"
        );
        Ok(id)
    }

    async fn add_member(&self, channel: &ChannelId, email: &str) -> bool {
        match self.users.add_channel_member_by_email(email, channel).await {
            Ok(true) => {
                if let Err(e) = self.channels.increment_members_count(channel, 1).await {
                    tracing::warn!(%channel, "failed counting new member: {e:#}");
                }
                true
            }
            Ok(false) => false,
            Err(e) => {
                tracing::warn!(%channel, email, "failed adding member: {e:#}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::{User, UserId},
        repo::test_util,
    };

    async fn register(backend: &Backend, uid: &str, email: &str) {
        UserRepository::new(backend.clone())
            .add_user(&User {
                uid: UserId::from(uid),
                email: String::from(email),
                ..User::default()
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn members_are_counted_once() {
        let (_srv, backend, uid) = test_util::signed_in("ada@example.org").await;
        register(&backend, uid.as_str(), "ada@example.org").await;
        register(&backend, "bob", "bob@example.org").await;

        let mut editor = ChannelEditor::new(backend.clone());
        let channel = Channel {
            channel_name: String::from("news"),
            members_emails: vec![
                String::from("bob@example.org"),
                String::from("nobody@example.org"),
            ],
            ..Channel::default()
        };
        let id = editor.save(channel, None).await.unwrap();
        let repo = ChannelRepository::new(backend.clone());
        let stored = repo.channel_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.members_count, 2);
        assert!(stored.members_emails.contains(&String::from("ada@example.org")));
        assert_eq!(stored.author_id, uid);

        // saving again finds every membership already there
        editor.save(stored, None).await.unwrap();
        let stored = repo.channel_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.members_count, 2);
        assert_eq!(stored.members_emails.len(), 3);
    }
}
