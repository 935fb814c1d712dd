use crate::{LessonId, Time, UserId};

doc_id!(ChannelId);

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Channel {
    #[serde(skip)]
    pub id: ChannelId,
    pub channel_name: String,
    pub channel_description: String,
    pub members_count: i64,
    pub author_id: UserId,
    pub members_emails: Vec<String>,
    pub lessons_ids: Vec<LessonId>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: Time,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: Time,
    pub display_image_name: String,
    pub online_image_uri: String,
    pub local_image_uri: String,
}

entity!(Channel, id: ChannelId);

impl Channel {
    pub fn is_author(&self, user: &UserId) -> bool {
        &self.author_id == user
    }
}
