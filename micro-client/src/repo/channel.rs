use crate::{
    api::{collections, Channel, ChannelId, FieldUpdate, LessonId, ListenTarget},
    Backend,
};

#[derive(Clone)]
pub struct ChannelRepository(Backend);

impl ChannelRepository {
    pub fn new(backend: Backend) -> ChannelRepository {
        ChannelRepository(backend)
    }

    pub async fn add_channel(&self, channel: &Channel) -> anyhow::Result<ChannelId> {
        let id = ChannelId::from(self.0.add(&collections::channels(), channel).await?);
        tracing::info!(channel=%id, name=%channel.channel_name, "created channel");
        Ok(id)
    }

    pub async fn update_channel(&self, channel: &Channel) -> anyhow::Result<()> {
        anyhow::ensure!(!channel.id.is_empty(), "updating a channel that was never created");
        self.0
            .set(&collections::channels().doc(&channel.id), channel)
            .await
    }

    pub fn channel_target(channel: &ChannelId) -> ListenTarget {
        ListenTarget::Document(collections::channels().doc(channel))
    }

    pub async fn channel_by_id(&self, channel: &ChannelId) -> anyhow::Result<Option<Channel>> {
        self.0.get(&collections::channels().doc(channel)).await
    }

    pub async fn add_lesson_id(&self, channel: &ChannelId, lesson: &LessonId) -> anyhow::Result<()> {
        self.0
            .update(
                &collections::channels().doc(channel),
                vec![FieldUpdate::array_union("lessons_ids", lesson)],
            )
            .await
    }

    pub async fn delete_channel(&self, channel: &ChannelId) -> anyhow::Result<()> {
        self.0.delete(&collections::channels().doc(channel)).await
    }

    pub async fn increment_members_count(&self, channel: &ChannelId, by: i64) -> anyhow::Result<()> {
        self.0
            .update(
                &collections::channels().doc(channel),
                vec![FieldUpdate::increment("members_count", by)],
            )
            .await
    }

    pub async fn update_online_image_uri(&self, channel: &ChannelId, uri: &str) -> anyhow::Result<()> {
        self.0
            .update(
                &collections::channels().doc(channel),
                vec![FieldUpdate::set("online_image_uri", uri)],
            )
            .await
    }
}
