use std::path::{Path, PathBuf};

use crate::{
    api::{now, Course, CourseId, Lesson, MediaCategory, MediaType},
    repo::{local_file_name, CourseRepository, LessonRepository, MediaRepository},
    view::UiState,
    Backend,
};

/// A lesson as edited, with the local media file to upload if any
#[derive(Clone, Debug, Default)]
pub struct LessonDraft {
    pub lesson: Lesson,
    pub media: Option<PathBuf>,
}

/// Create-or-update flow of a course and its lessons
pub struct CourseEditor {
    backend: Backend,
    courses: CourseRepository,
    lessons: LessonRepository,
    media: MediaRepository,
    pub ui_state: UiState,
}

impl CourseEditor {
    pub fn new(backend: Backend) -> CourseEditor {
        CourseEditor {
            courses: CourseRepository::new(backend.clone()),
            lessons: LessonRepository::new(backend.clone()),
            media: MediaRepository::new(backend.clone()),
            backend,
            ui_state: UiState::Empty,
        }
    }

    /// Validates everything, then writes the course and its lessons in order.
    /// Lessons without a key are created and appended to the course.
    pub async fn save(
        &mut self,
        course: Course,
        image: Option<&Path>,
        lessons: Vec<LessonDraft>,
    ) -> anyhow::Result<CourseId> {
        self.ui_state = UiState::Loading;
        let res = self.write(course, image, lessons).await;
        match &res {
            Ok(_) => self.ui_state = UiState::Success,
            Err(e) => {
                tracing::error!("saving course failed: {e:#}");
                self.ui_state = UiState::from_error(e);
            }
        }
        res
    }

    async fn write(
        &self,
        mut course: Course,
        image: Option<&Path>,
        lessons: Vec<LessonDraft>,
    ) -> anyhow::Result<CourseId> {
        course.validate()?;
        Course::validate_lesson_count(lessons.len())?;
        for d in lessons.iter() {
            d.lesson.validate()?;
        }

        let author = self.backend.signed_in()?;
        let t = now();
        course.author_id = author.uid.clone();
        course.author_name = author.display_name.clone();
        course.author_image_uri = author.photo_uri.clone();
        course.updated_at = t;
        if let Some(path) = image {
            course.display_image_name =
                MediaRepository::generate_media_file_name(&local_file_name(path), MediaType::Image);
            course.local_image_uri = path.to_string_lossy().into_owned();
        }
        let id = match course.id.is_empty() {
            true => {
                course.created_at = t;
                self.courses.add_course(&course).await?
            }
            false => {
                self.courses.update_course(&course).await?;
                course.id.clone()
            }
        };
        if let Some(path) = image {
            let uploaded = self
                .media
                .upload_or_log(MediaCategory::CourseImages, &course.display_image_name, path)
                .await;
            if let Some(uri) = uploaded {
                if let Err(e) = self.courses.update_online_image_uri(&id, &uri).await {
                    tracing::warn!(course=%id, "failed recording image uri: {e:#}");
                }
            }
        }

        for (index, draft) in lessons.into_iter().enumerate() {
            let mut lesson = draft.lesson;
            lesson.course_id = id.clone();
            lesson.lesson_index = index as i64;
            lesson.author_id = author.uid.clone();
            lesson.updated_at = t;
            if let Some(path) = &draft.media {
                lesson.media_name = MediaRepository::generate_media_file_name(
                    &local_file_name(path),
                    lesson.media_type,
                );
                lesson.local_media_uri = path.to_string_lossy().into_owned();
            }
            let lesson_id = match lesson.id.is_empty() {
                true => {
                    lesson.created_at = t;
                    let lesson_id = self.lessons.add_lesson(&lesson).await?;
                    self.courses.add_lesson_id_to_course(&id, &lesson_id).await?;
                    lesson_id
                }
                false => {
                    self.lessons.update_lesson(&lesson).await?;
                    lesson.id.clone()
                }
            };
            if let Some(path) = &draft.media {
                let uploaded = self
                    .media
                    .upload_or_log(MediaCategory::LessonMedia, &lesson.media_name, path)
                    .await;
                if let Some(uri) = uploaded {
                    if let Err(e) = self.lessons.update_online_media_uri(&lesson_id, &uri).await {
                        tracing::warn!(lesson=%lesson_id, "failed recording media uri: {e:#}");
                    }
                }
            }
        }
        Ok(id)
    }

    /// Deletes the course, its lessons and their media. Likes, studies and
    /// comments are left behind.
    pub async fn delete_course(&mut self, course: &Course) -> anyhow::Result<()> {
        for lesson in self.lessons.lessons_by_ids(&course.lessons_ids).await? {
            if !lesson.media_name.is_empty() {
                if let Err(e) = self
                    .media
                    .delete(MediaCategory::LessonMedia, &lesson.media_name)
                    .await
                {
                    tracing::warn!(lesson=%lesson.id, "failed deleting lesson media: {e:#}");
                }
            }
            self.lessons.delete_lesson(&lesson.id).await?;
        }
        if !course.display_image_name.is_empty() {
            if let Err(e) = self
                .media
                .delete(MediaCategory::CourseImages, &course.display_image_name)
                .await
            {
                tracing::warn!(course=%course.id, "failed deleting course image: {e:#}");
            }
        }
        self.courses.delete_course(&course.id).await
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::{
        api::{collections, BlobPath, Error, COURSE_TITLE_MAX_LENGTH},
        repo::test_util,
    };

    fn draft(title: &str) -> LessonDraft {
        LessonDraft {
            lesson: Lesson {
                title: String::from(title),
                ..Lesson::default()
            },
            media: None,
        }
    }

    fn course(title: &str) -> Course {
        Course {
            title: String::from(title),
            ..Course::default()
        }
    }

    #[tokio::test]
    async fn create_with_lessons() {
        let (srv, backend, uid) = test_util::signed_in("ada@example.org").await;
        let mut editor = CourseEditor::new(backend.clone());
        let mut video = tempfile::NamedTempFile::new().unwrap();
        video.write_all(b"mp4").unwrap();
        let mut with_video = draft("two");
        with_video.lesson.media_type = MediaType::Video;
        with_video.media = Some(video.path().to_path_buf());

        let id = editor
            .save(course("Rust"), None, vec![draft("one"), with_video])
            .await
            .unwrap();
        assert_eq!(editor.ui_state, UiState::Success);

        let courses = CourseRepository::new(backend.clone());
        let stored = courses.course_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.author_id, uid);
        assert_eq!(stored.lessons_ids.len(), 2);

        let lessons = LessonRepository::new(backend.clone())
            .lessons_by_ids(&stored.lessons_ids)
            .await
            .unwrap();
        let mut placed = lessons
            .iter()
            .map(|l| (l.lesson_index, l.title.as_str()))
            .collect::<Vec<_>>();
        placed.sort();
        assert_eq!(placed, vec![(0, "one"), (1, "two")]);
        let video_lesson = lessons.iter().find(|l| l.title == "two").unwrap();
        assert!(video_lesson.online_media_uri.starts_with("mock://"));
        let blob = BlobPath::new(MediaCategory::LessonMedia, &video_lesson.media_name);
        assert_eq!(srv.test_blob(&blob).unwrap(), b"mp4");

        // editing keeps the key and appends new lessons
        let mut existing = lessons
            .iter()
            .map(|l| LessonDraft {
                lesson: l.clone(),
                media: None,
            })
            .collect::<Vec<_>>();
        existing.sort_by_key(|d| d.lesson.lesson_index);
        existing.push(draft("three"));
        let again = editor.save(stored, None, existing).await.unwrap();
        assert_eq!(again, id);
        let stored = courses.course_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.lessons_ids.len(), 3);
        assert_eq!(srv.test_num_docs(&collections::lessons()), 3);
    }

    #[tokio::test]
    async fn shared_local_file_gets_one_blob_per_lesson() {
        let (srv, backend, _uid) = test_util::signed_in("ada@example.org").await;
        let mut image = tempfile::NamedTempFile::new().unwrap();
        image.write_all(b"png").unwrap();
        let drafts = ["one", "two"]
            .into_iter()
            .map(|title| {
                let mut d = draft(title);
                d.lesson.media_type = MediaType::Image;
                d.media = Some(image.path().to_path_buf());
                d
            })
            .collect::<Vec<_>>();
        let mut editor = CourseEditor::new(backend.clone());
        let id = editor.save(course("Rust"), None, drafts).await.unwrap();

        let stored = CourseRepository::new(backend.clone())
            .course_by_id(&id)
            .await
            .unwrap()
            .unwrap();
        let lessons = LessonRepository::new(backend)
            .lessons_by_ids(&stored.lessons_ids)
            .await
            .unwrap();
        assert_eq!(lessons.len(), 2);
        assert_ne!(lessons[0].media_name, lessons[1].media_name);
        assert_ne!(lessons[0].online_media_uri, lessons[1].online_media_uri);
        for l in lessons.iter() {
            let blob = BlobPath::new(MediaCategory::LessonMedia, &l.media_name);
            assert_eq!(srv.test_blob(&blob).unwrap(), b"png");
        }
    }

    #[tokio::test]
    async fn validation_happens_before_writing() {
        let (srv, backend, _uid) = test_util::signed_in("ada@example.org").await;
        let mut editor = CourseEditor::new(backend);

        let err = editor.save(course("Rust"), None, vec![]).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::LessonCount {
                min: 1,
                max: 10,
                got: 0
            })
        );
        assert!(editor.ui_state.is_error());

        let long = "x".repeat(COURSE_TITLE_MAX_LENGTH + 1);
        assert!(editor
            .save(course(&long), None, vec![draft("one")])
            .await
            .is_err());
        assert_eq!(srv.test_num_docs(&collections::courses()), 0);
        assert_eq!(srv.test_num_docs(&collections::lessons()), 0);
    }

    #[tokio::test]
    async fn image_upload_is_best_effort() {
        let (srv, backend, _uid) = test_util::signed_in("ada@example.org").await;
        srv.test_set_storage_unavailable(true);
        let image = tempfile::NamedTempFile::new().unwrap();
        let mut editor = CourseEditor::new(backend.clone());
        let id = editor
            .save(course("Rust"), Some(image.path()), vec![draft("one")])
            .await
            .unwrap();
        let stored = CourseRepository::new(backend)
            .course_by_id(&id)
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.display_image_name.is_empty());
        assert!(stored.online_image_uri.is_empty());
    }

    #[tokio::test]
    async fn delete_leaves_join_records() {
        let (srv, backend, uid) = test_util::signed_in("ada@example.org").await;
        let mut editor = CourseEditor::new(backend.clone());
        let id = editor
            .save(course("Rust"), None, vec![draft("one"), draft("two")])
            .await
            .unwrap();
        let courses = CourseRepository::new(backend.clone());
        courses.toggle_like(&id, &uid).await.unwrap();
        let stored = courses.course_by_id(&id).await.unwrap().unwrap();

        editor.delete_course(&stored).await.unwrap();
        assert!(courses.course_by_id(&id).await.unwrap().is_none());
        assert_eq!(srv.test_num_docs(&collections::lessons()), 0);
        assert_eq!(srv.test_num_docs(&collections::course_likes()), 1);
    }
}
