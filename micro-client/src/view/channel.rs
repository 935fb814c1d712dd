use std::path::Path;

use anyhow::anyhow;

use crate::{
    api::{
        now, Channel, ChannelId, Lesson, LessonId, MediaCategory, MemberOfChannels, Snapshot,
        UserId,
    },
    composite::{self, Composite},
    repo::{ChannelRepository, LessonRepository, MediaRepository, UserRepository},
    subscription::Subscriptions,
    view::UiState,
    Backend,
};

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ChannelSlot {
    MemberIds,
    Channel(ChannelId),
    Open,
    Lesson(LessonId),
}

pub struct ChannelViewModel {
    channels: ChannelRepository,
    lessons: LessonRepository,
    users: UserRepository,
    media: MediaRepository,
    subs: Subscriptions<ChannelSlot>,
    uid: UserId,
    member_channels: Composite<ChannelId>,
    open_lessons: Composite<LessonId>,

    /// Channels the user is a member of, in no particular order
    pub user_channels: Vec<Channel>,
    pub open_channel: Option<Channel>,
    pub channel_lessons: Vec<Lesson>,
    pub ui_state: UiState,
}

impl ChannelViewModel {
    pub async fn new(backend: Backend) -> anyhow::Result<ChannelViewModel> {
        let uid = backend.current_uid()?;
        let mut subs = Subscriptions::new(backend.store.clone());
        subs.subscribe(ChannelSlot::MemberIds, UserRepository::channel_ids_query(&uid))
            .await?;
        Ok(ChannelViewModel {
            channels: ChannelRepository::new(backend.clone()),
            lessons: LessonRepository::new(backend.clone()),
            users: UserRepository::new(backend.clone()),
            media: MediaRepository::new(backend),
            subs,
            uid,
            member_channels: Composite::new(),
            open_lessons: Composite::new(),
            user_channels: Vec::new(),
            open_channel: None,
            channel_lessons: Vec::new(),
            ui_state: UiState::Empty,
        })
    }

    pub async fn apply_pending(&mut self) -> usize {
        let mut num = 0;
        while let Some((slot, snap)) = self.subs.try_next() {
            self.handle(slot, snap).await;
            num += 1;
        }
        num
    }

    pub async fn next_update(&mut self) -> Option<ChannelSlot> {
        let (slot, snap) = self.subs.next().await?;
        self.handle(slot.clone(), snap).await;
        Some(slot)
    }

    async fn handle(&mut self, slot: ChannelSlot, snap: Snapshot) {
        let res = match &slot {
            ChannelSlot::MemberIds => self.on_member_ids(&snap).await,
            ChannelSlot::Channel(_) => composite::fold(&mut self.user_channels, &snap),
            ChannelSlot::Open => self.on_open_channel(&snap).await,
            ChannelSlot::Lesson(_) => composite::fold(&mut self.channel_lessons, &snap),
        };
        if let Err(error) = res {
            tracing::warn!(?slot, "ignoring snapshot: {error:#}");
        }
    }

    async fn on_member_ids(&mut self, snap: &Snapshot) -> anyhow::Result<()> {
        let ids = snap
            .decode_all::<MemberOfChannels>()?
            .into_iter()
            .map(|m| m.channel_id)
            .collect::<Vec<_>>();
        self.member_channels
            .assemble(
                &mut self.subs,
                &mut self.user_channels,
                ids,
                |id| ChannelSlot::Channel(id.clone()),
                ChannelRepository::channel_target,
            )
            .await
    }

    async fn on_open_channel(&mut self, snap: &Snapshot) -> anyhow::Result<()> {
        let Some(channel) = snap.decode_one::<Channel>()? else {
            tracing::debug!("open channel is gone, keeping its last state");
            return Ok(());
        };
        let lessons = channel.lessons_ids.clone();
        self.open_channel = Some(channel);
        if lessons.as_slice() == self.open_lessons.keys() {
            return Ok(());
        }
        self.open_lessons
            .assemble(
                &mut self.subs,
                &mut self.channel_lessons,
                lessons,
                |id| ChannelSlot::Lesson(id.clone()),
                LessonRepository::lesson_target,
            )
            .await
    }

    pub async fn open_channel(&mut self, channel: &ChannelId) -> anyhow::Result<()> {
        self.close_channel();
        self.subs
            .subscribe(ChannelSlot::Open, ChannelRepository::channel_target(channel))
            .await
    }

    pub fn close_channel(&mut self) {
        self.subs.unsubscribe(&ChannelSlot::Open);
        self.open_lessons
            .release(&mut self.subs, |id| ChannelSlot::Lesson(id.clone()));
        self.open_channel = None;
        self.channel_lessons.clear();
    }

    pub fn is_author(&self) -> bool {
        self.open_channel
            .as_ref()
            .map_or(false, |c| c.is_author(&self.uid))
    }

    /// Creates the lesson and appends it to the open channel. The media
    /// upload happens afterwards and its failure does not undo the lesson.
    pub async fn add_lesson_to_channel(
        &mut self,
        mut lesson: Lesson,
        media: Option<&Path>,
    ) -> anyhow::Result<LessonId> {
        let channel = self
            .open_channel
            .as_ref()
            .map(|c| c.id.clone())
            .ok_or_else(|| anyhow!("no channel is open"))?;
        lesson.validate()?;
        let t = now();
        lesson.author_id = self.uid.clone();
        lesson.created_at = t;
        lesson.updated_at = t;
        if let Some(path) = media {
            lesson.media_name = MediaRepository::generate_media_file_name(
                &crate::repo::local_file_name(path),
                lesson.media_type,
            );
            lesson.local_media_uri = path.to_string_lossy().into_owned();
        }
        self.ui_state = UiState::Loading;
        let id = match self.lessons.add_lesson(&lesson).await {
            Ok(id) => id,
            Err(e) => {
                self.ui_state = UiState::from_error(&e);
                return Err(e);
            }
        };
        if let Err(e) = self.channels.add_lesson_id(&channel, &id).await {
            self.ui_state = UiState::from_error(&e);
            return Err(e);
        }
        self.ui_state = UiState::Success;
        if let Some(path) = media {
            self.upload_lesson_media(&id, &lesson.media_name, path).await;
        }
        Ok(id)
    }

    async fn upload_lesson_media(&self, lesson: &LessonId, name: &str, path: &Path) {
        let res = async {
            let uri = self
                .media
                .upload(MediaCategory::LessonMedia, name, path)
                .await?;
            self.lessons.update_online_media_uri(lesson, &uri).await
        };
        if let Err(e) = res.await {
            tracing::warn!(%lesson, "lesson media upload failed: {e:#}");
        }
    }

    /// Removes the membership; the channel list follows through its listener
    pub async fn unsubscribe_channel(&mut self, channel: &ChannelId) -> anyhow::Result<()> {
        self.users.unsubscribe_channel(&self.uid, channel).await?;
        if self.open_channel.as_ref().map(|c| &c.id) == Some(channel) {
            self.close_channel();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::{
        api::{BlobPath, MediaType, User},
        repo::test_util,
    };

    async fn setup() -> (
        std::sync::Arc<micro_mock_server::MockServer>,
        Backend,
        UserId,
        ChannelId,
    ) {
        let (srv, backend, uid) = test_util::signed_in("ada@example.org").await;
        UserRepository::new(backend.clone())
            .add_user(&User {
                uid: uid.clone(),
                email: String::from("ada@example.org"),
                ..User::default()
            })
            .await
            .unwrap();
        let channel = ChannelRepository::new(backend.clone())
            .add_channel(&Channel {
                channel_name: String::from("news"),
                author_id: uid.clone(),
                ..Channel::default()
            })
            .await
            .unwrap();
        (srv, backend, uid, channel)
    }

    #[tokio::test]
    async fn member_channels_are_assembled() {
        let (srv, backend, _uid, channel) = setup().await;
        let mut vm = ChannelViewModel::new(backend.clone()).await.unwrap();
        vm.apply_pending().await;
        assert!(vm.user_channels.is_empty());

        let users = UserRepository::new(backend.clone());
        assert!(users
            .add_channel_member_by_email("ada@example.org", &channel)
            .await
            .unwrap());
        vm.apply_pending().await;
        assert_eq!(vm.user_channels.len(), 1);
        assert_eq!(vm.user_channels[0].channel_name, "news");

        let channels = ChannelRepository::new(backend.clone());
        channels.increment_members_count(&channel, 1).await.unwrap();
        vm.apply_pending().await;
        assert_eq!(vm.user_channels.len(), 1);
        assert_eq!(vm.user_channels[0].members_count, 1);

        vm.unsubscribe_channel(&channel).await.unwrap();
        vm.apply_pending().await;
        assert!(vm.user_channels.is_empty());
        assert_eq!(srv.test_num_listeners(), 1);
    }

    #[tokio::test]
    async fn open_channel_tracks_its_lessons() {
        let (srv, backend, _uid, channel) = setup().await;
        let mut vm = ChannelViewModel::new(backend.clone()).await.unwrap();
        vm.open_channel(&channel).await.unwrap();
        vm.apply_pending().await;
        assert!(vm.is_author());
        assert!(vm.channel_lessons.is_empty());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"png").unwrap();
        let lesson = Lesson {
            title: String::from("Borrowing"),
            media_type: MediaType::Image,
            ..Lesson::default()
        };
        let id = vm
            .add_lesson_to_channel(lesson, Some(file.path()))
            .await
            .unwrap();
        vm.apply_pending().await;
        assert_eq!(vm.open_channel.as_ref().unwrap().lessons_ids, vec![id.clone()]);
        assert_eq!(vm.channel_lessons.len(), 1);
        let stored = &vm.channel_lessons[0];
        assert_eq!(stored.title, "Borrowing");
        assert!(stored.online_media_uri.starts_with("mock://"));
        let blob = BlobPath::new(MediaCategory::LessonMedia, &stored.media_name);
        assert_eq!(srv.test_blob(&blob).unwrap(), b"png");

        vm.close_channel();
        assert!(vm.open_channel.is_none());
        assert_eq!(srv.test_num_listeners(), 1);
    }

    #[tokio::test]
    async fn counter_updates_keep_lesson_listeners() {
        let (srv, backend, _uid, channel) = setup().await;
        let mut vm = ChannelViewModel::new(backend.clone()).await.unwrap();
        vm.open_channel(&channel).await.unwrap();
        vm.apply_pending().await;
        vm.add_lesson_to_channel(
            Lesson {
                title: String::from("Traits"),
                ..Lesson::default()
            },
            None,
        )
        .await
        .unwrap();
        vm.apply_pending().await;
        assert_eq!(vm.channel_lessons.len(), 1);
        let listeners = srv.test_num_listeners();

        ChannelRepository::new(backend)
            .increment_members_count(&channel, 1)
            .await
            .unwrap();
        // only the channel snapshot, no fresh lesson snapshot
        assert_eq!(vm.apply_pending().await, 1);
        assert_eq!(vm.open_channel.as_ref().unwrap().members_count, 1);
        assert_eq!(vm.channel_lessons.len(), 1);
        assert_eq!(srv.test_num_listeners(), listeners);
    }

    #[tokio::test]
    async fn failed_upload_keeps_the_lesson() {
        let (srv, backend, _uid, channel) = setup().await;
        let mut vm = ChannelViewModel::new(backend).await.unwrap();
        vm.open_channel(&channel).await.unwrap();
        vm.apply_pending().await;
        srv.test_set_storage_unavailable(true);

        let file = tempfile::NamedTempFile::new().unwrap();
        let lesson = Lesson {
            title: String::from("Lifetimes"),
            media_type: MediaType::Video,
            ..Lesson::default()
        };
        vm.add_lesson_to_channel(lesson, Some(file.path()))
            .await
            .unwrap();
        vm.apply_pending().await;
        assert_eq!(vm.ui_state, UiState::Success);
        assert_eq!(vm.channel_lessons.len(), 1);
        assert!(vm.channel_lessons[0].online_media_uri.is_empty());
    }

    #[tokio::test]
    async fn adding_without_open_channel_fails() {
        let (_srv, backend, _uid, _channel) = setup().await;
        let mut vm = ChannelViewModel::new(backend).await.unwrap();
        assert!(vm
            .add_lesson_to_channel(Lesson::default(), None)
            .await
            .is_err());
    }
}
