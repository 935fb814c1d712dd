use crate::{
    api::{collections, FieldUpdate, Lesson, LessonId, ListenTarget, Query},
    Backend,
};

#[derive(Clone)]
pub struct LessonRepository(Backend);

impl LessonRepository {
    pub fn new(backend: Backend) -> LessonRepository {
        LessonRepository(backend)
    }

    pub async fn add_lesson(&self, lesson: &Lesson) -> anyhow::Result<LessonId> {
        let id = LessonId::from(self.0.add(&collections::lessons(), lesson).await?);
        tracing::info!(lesson=%id, course=%lesson.course_id, "created lesson");
        Ok(id)
    }

    pub async fn update_lesson(&self, lesson: &Lesson) -> anyhow::Result<()> {
        anyhow::ensure!(!lesson.id.is_empty(), "updating a lesson that was never created");
        self.0.set(&collections::lessons().doc(&lesson.id), lesson).await
    }

    pub async fn delete_lesson(&self, lesson: &LessonId) -> anyhow::Result<()> {
        self.0.delete(&collections::lessons().doc(lesson)).await
    }

    pub async fn lesson_by_id(&self, lesson: &LessonId) -> anyhow::Result<Option<Lesson>> {
        self.0.get(&collections::lessons().doc(lesson)).await
    }

    /// Lessons with these ids, in backend order
    pub async fn lessons_by_ids(&self, ids: &[LessonId]) -> anyhow::Result<Vec<Lesson>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.0
            .query(&Query::all(collections::lessons()).where_id_in(ids))
            .await
    }

    pub fn lesson_target(lesson: &LessonId) -> ListenTarget {
        ListenTarget::Document(collections::lessons().doc(lesson))
    }

    pub fn lesson_targets(ids: &[LessonId]) -> Vec<ListenTarget> {
        ids.iter().map(Self::lesson_target).collect()
    }

    pub async fn update_online_media_uri(&self, lesson: &LessonId, uri: &str) -> anyhow::Result<()> {
        self.0
            .update(
                &collections::lessons().doc(lesson),
                vec![FieldUpdate::set("online_media_uri", uri)],
            )
            .await
    }
}
