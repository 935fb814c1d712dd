use crate::{
    validate_length, Error, LessonId, RecordId, Time, UserId, COURSE_DESCRIPTION_MAX_LENGTH,
    COURSE_TITLE_MAX_LENGTH, MAX_LESSONS_PER_COURSE, MIN_LESSONS_PER_COURSE,
};

doc_id!(CourseId);
doc_id!(CommentId);

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Course {
    #[serde(skip)]
    pub id: CourseId,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub lessons_ids: Vec<LessonId>,
    pub display_image_name: String,
    pub online_image_uri: String,
    pub local_image_uri: String,
    pub category: String,
    pub visits: i64,
    pub likes: i64,
    pub studied: i64,
    pub author_id: UserId,
    pub author_name: String,
    pub author_image_uri: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: Time,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: Time,
}

entity!(Course, id: CourseId);

impl Course {
    pub fn validate(&self) -> Result<(), Error> {
        validate_length("course title", &self.title, COURSE_TITLE_MAX_LENGTH)?;
        validate_length(
            "course description",
            &self.description,
            COURSE_DESCRIPTION_MAX_LENGTH,
        )?;
        Ok(())
    }

    pub fn validate_lesson_count(got: usize) -> Result<(), Error> {
        if !(MIN_LESSONS_PER_COURSE..=MAX_LESSONS_PER_COURSE).contains(&got) {
            return Err(Error::LessonCount {
                min: MIN_LESSONS_PER_COURSE,
                max: MAX_LESSONS_PER_COURSE,
                got,
            });
        }
        Ok(())
    }
}

/// Join record: `user_id` liked `course_id`
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct CourseLike {
    #[serde(skip)]
    pub id: RecordId,
    pub user_id: UserId,
    pub course_id: CourseId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: Time,
}

entity!(CourseLike, id: RecordId);

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct CourseComment {
    #[serde(skip)]
    pub id: CommentId,
    pub author_id: UserId,
    pub author_name: String,
    pub course_id: CourseId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: Time,
    pub text: String,

    /// Whether the signed-in user wrote it, recomputed on every snapshot
    #[serde(skip)]
    pub is_mine: bool,
}

entity!(CourseComment, id: CommentId);

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct CourseCategory {
    #[serde(skip)]
    pub id: RecordId,
    pub category: String,
}

entity!(CourseCategory, id: RecordId);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CollectionPath, DocId, Document, Entity};
    use serde_json::json;

    #[test]
    fn key_comes_from_the_path() {
        let course = Course {
            id: CourseId::from("ignored"),
            title: String::from("Rust 101"),
            likes: 3,
            created_at: crate::now(),
            ..Course::default()
        };
        let data = course.to_data().unwrap();
        assert!(data.get("id").is_none());
        assert_eq!(data["likes"], json!(3));

        let doc = Document {
            path: CollectionPath::root("courses").doc(DocId::from("c1")),
            data,
        };
        let back = Course::from_document(&doc).unwrap();
        assert_eq!(back.id, CourseId::from("c1"));
        assert_eq!(back.title, "Rust 101");
        assert_eq!(back.created_at, course.created_at);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let doc = Document {
            path: CollectionPath::root("courses").doc(DocId::from("c2")),
            data: json!({ "title": "partial" }),
        };
        let course = Course::from_document(&doc).unwrap();
        assert_eq!(course.title, "partial");
        assert!(course.lessons_ids.is_empty());
        assert_eq!(course.visits, 0);
    }

    #[test]
    fn validation() {
        let mut course = Course {
            title: "t".repeat(COURSE_TITLE_MAX_LENGTH),
            ..Course::default()
        };
        assert_eq!(course.validate(), Ok(()));
        course.description = "d".repeat(COURSE_DESCRIPTION_MAX_LENGTH + 1);
        assert_eq!(
            course.validate(),
            Err(Error::ContentTooLong {
                what: "course description",
                max: COURSE_DESCRIPTION_MAX_LENGTH
            })
        );
        assert!(Course::validate_lesson_count(0).is_err());
        assert!(Course::validate_lesson_count(1).is_ok());
        assert!(Course::validate_lesson_count(10).is_ok());
        assert!(Course::validate_lesson_count(11).is_err());
    }

    #[test]
    fn comment_ownership_is_never_stored() {
        let comment = CourseComment {
            is_mine: true,
            ..CourseComment::default()
        };
        assert!(comment.to_data().unwrap().get("is_mine").is_none());
    }
}
