use crate::{LessonId, Time, UserId};

doc_id!(GroupId);
doc_id!(MessageId);

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct StudyGroup {
    #[serde(skip)]
    pub id: GroupId,
    pub group_name: String,
    pub group_description: String,
    pub author_id: UserId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: Time,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: Time,
    pub members_count: i64,
    pub display_image_name: String,
    pub local_image_uri: String,
    pub online_image_uri: String,
    pub last_message: Option<GroupMessage>,
    pub members_emails: Vec<String>,
}

entity!(StudyGroup, id: GroupId);

impl StudyGroup {
    /// Time of the latest activity: the last message, or the creation
    pub fn last_activity(&self) -> Time {
        self.last_message
            .as_ref()
            .map(|m| m.created_at)
            .unwrap_or(self.created_at)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum MessageKind {
    #[default]
    Text,

    /// A shared lesson, `lesson_id` and `lesson_title` are set
    Lesson,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct GroupMessage {
    #[serde(skip)]
    pub id: MessageId,
    pub group_id: GroupId,
    pub author_id: UserId,
    pub author_name: String,
    pub text: String,
    pub kind: MessageKind,
    pub lesson_title: String,
    pub lesson_id: LessonId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: Time,
    #[serde(skip)]
    pub is_mine: bool,
}

entity!(GroupMessage, id: MessageId);
