use chrono::{SubsecRound, Utc};

pub use uuid::Uuid;
pub type Time = chrono::DateTime<Utc>;

/// Declares a typed document key. Keys are empty until the backend assigned
/// a document id, and never change afterwards.
macro_rules! doc_id {
    ( $(#[$meta:meta])* $name:ident ) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Debug,
            Default,
            Eq,
            Hash,
            Ord,
            PartialEq,
            PartialOrd,
            serde::Deserialize,
            serde::Serialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub crate::DocId);

        impl $name {
            pub fn empty() -> $name {
                $name(crate::DocId::empty())
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl From<crate::DocId> for $name {
            fn from(id: crate::DocId) -> $name {
                $name(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> $name {
                $name(crate::DocId::from(id))
            }
        }

        impl AsRef<crate::DocId> for $name {
            fn as_ref(&self) -> &crate::DocId {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

/// Wires an entity to the key field filled in from its document path.
macro_rules! entity {
    ( $typ:ty, $field:ident: $key:ty ) => {
        impl crate::Keyed for $typ {
            type Key = $key;

            fn key(&self) -> &$key {
                &self.$field
            }
        }

        impl crate::Entity for $typ {
            fn set_key(&mut self, id: crate::DocId) {
                self.$field = <$key>::from(id);
            }
        }
    };
}

mod auth;
pub use auth::{AuthProvider, AuthUser, NewAccount, MIN_PASSWORD_LENGTH};

mod channel;
pub use channel::{Channel, ChannelId};

pub mod collections;

mod course;
pub use course::{CommentId, Course, CourseCategory, CourseComment, CourseId, CourseLike};

mod db;
pub use db::{DocumentStore, ListenerId, SnapshotSink};

mod document;
pub use document::{CollectionPath, DocId, DocPath, Document, Entity, Keyed, RecordId};

mod error;
pub use error::Error;

mod group;
pub use group::{GroupId, GroupMessage, MessageId, MessageKind, StudyGroup};

mod lesson;
pub use lesson::{Lesson, LessonId, MediaType};

mod query;
pub use query::{Direction, FieldUpdate, Filter, ListenTarget, OrderBy, Query, Snapshot};

mod storage;
pub use storage::{media_file_name, BlobPath, BlobStorage, MediaCategory};

mod user;
pub use user::{
    CourseStudy, FeedbackMessage, FriendId, MemberOfChannels, MemberOfStudyGroup, User,
    UserFriend, UserId,
};

pub const COURSE_TITLE_MAX_LENGTH: usize = 50;
pub const COURSE_DESCRIPTION_MAX_LENGTH: usize = 1000;
pub const LESSON_TITLE_MAX_LENGTH: usize = 50;
pub const LESSON_CONTENT_MAX_LENGTH: usize = 2000;
pub const LESSON_VIDEO_MAX_DURATION_SECONDS: u32 = 5 * 60;
pub const MIN_LESSONS_PER_COURSE: usize = 1;
pub const MAX_LESSONS_PER_COURSE: usize = 10;

/// Current time, truncated to what survives a round-trip through a document
pub fn now() -> Time {
    Utc::now().trunc_subsecs(3)
}

fn validate_length(what: &'static str, s: &str, max: usize) -> Result<(), Error> {
    if s.chars().count() > max {
        return Err(Error::ContentTooLong { what, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_survives_millisecond_encoding() {
        let t = now();
        assert_eq!(t.timestamp_nanos_opt().map(|n| n % 1_000_000), Some(0));
    }

    #[test]
    fn length_is_counted_in_chars() {
        assert!(validate_length("title", &"é".repeat(50), 50).is_ok());
        assert_eq!(
            validate_length("title", &"é".repeat(51), 50),
            Err(Error::ContentTooLong {
                what: "title",
                max: 50
            })
        );
    }

    #[test]
    fn length_limit_is_inclusive() {
        bolero::check!()
            .with_type::<(String, u8)>()
            .cloned()
            .for_each(|(s, max)| {
                let max = usize::from(max);
                let res = validate_length("content", &s, max);
                assert_eq!(res.is_ok(), s.chars().count() <= max);
            })
    }
}
