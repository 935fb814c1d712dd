use crate::{
    validate_length, CourseId, Error, Time, UserId, LESSON_CONTENT_MAX_LENGTH,
    LESSON_TITLE_MAX_LENGTH,
};

doc_id!(LessonId);

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum MediaType {
    #[default]
    None,
    Image,
    Video,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Lesson {
    #[serde(skip)]
    pub id: LessonId,
    pub title: String,
    pub content: String,
    pub course_id: CourseId,

    /// Position in the course, -1 until placed
    pub lesson_index: i64,
    pub media_name: String,
    pub online_media_uri: String,
    pub local_media_uri: String,
    pub media_type: MediaType,
    pub visited: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: Time,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: Time,
    pub author_id: UserId,
}

entity!(Lesson, id: LessonId);

impl Default for Lesson {
    fn default() -> Lesson {
        Lesson {
            id: LessonId::empty(),
            title: String::new(),
            content: String::new(),
            course_id: CourseId::empty(),
            lesson_index: -1,
            media_name: String::new(),
            online_media_uri: String::new(),
            local_media_uri: String::new(),
            media_type: MediaType::None,
            visited: false,
            created_at: Time::default(),
            updated_at: Time::default(),
            author_id: UserId::empty(),
        }
    }
}

impl Lesson {
    pub fn validate(&self) -> Result<(), Error> {
        validate_length("lesson title", &self.title, LESSON_TITLE_MAX_LENGTH)?;
        validate_length("lesson content", &self.content, LESSON_CONTENT_MAX_LENGTH)?;
        Ok(())
    }

    pub fn has_media(&self) -> bool {
        self.media_type != MediaType::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CollectionPath, DocId, Document, Entity};
    use serde_json::json;

    #[test]
    fn unplaced_by_default() {
        assert_eq!(Lesson::default().lesson_index, -1);
        let doc = Document {
            path: CollectionPath::root("lessons").doc(DocId::from("l1")),
            data: json!({ "title": "Intro" }),
        };
        let lesson = Lesson::from_document(&doc).unwrap();
        assert_eq!(lesson.lesson_index, -1);
        assert_eq!(lesson.media_type, MediaType::None);
        assert_eq!(lesson.id, LessonId::from("l1"));
    }

    #[test]
    fn content_limit() {
        let lesson = Lesson {
            content: "x".repeat(LESSON_CONTENT_MAX_LENGTH + 1),
            ..Lesson::default()
        };
        assert_eq!(
            lesson.validate(),
            Err(Error::ContentTooLong {
                what: "lesson content",
                max: LESSON_CONTENT_MAX_LENGTH
            })
        );
    }
}
