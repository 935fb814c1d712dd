use crate::{ChannelId, CourseId, GroupId, Time};

doc_id!(
    /// Auth uid, also the key of the user document
    UserId
);
doc_id!(FriendId);

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct User {
    #[serde(skip)]
    pub uid: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub bio: String,
    pub is_verified: bool,
    pub profile_photo_name: String,
    pub online_photo_uri: String,
    pub local_photo_uri: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: Time,
}

entity!(User, uid: UserId);

impl User {
    pub fn username(&self) -> &str {
        match self.email.split_once('@') {
            Some((name, _)) => name,
            None => &self.email,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct UserFriend {
    #[serde(skip)]
    pub id: FriendId,
    pub friend_email: String,
}

entity!(UserFriend, id: FriendId);

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct CourseStudy {
    #[serde(skip)]
    pub id: crate::RecordId,
    pub course_id: CourseId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: Time,
}

entity!(CourseStudy, id: crate::RecordId);

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct MemberOfStudyGroup {
    #[serde(skip)]
    pub id: crate::RecordId,
    pub group_id: GroupId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: Time,
}

entity!(MemberOfStudyGroup, id: crate::RecordId);

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct MemberOfChannels {
    #[serde(skip)]
    pub id: crate::RecordId,
    pub channel_id: ChannelId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: Time,
}

entity!(MemberOfChannels, id: crate::RecordId);

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct FeedbackMessage {
    #[serde(skip)]
    pub id: crate::RecordId,
    pub uid: UserId,
    pub message: String,
}

entity!(FeedbackMessage, id: crate::RecordId);
