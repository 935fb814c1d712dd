use anyhow::Context;

use crate::{
    api::{
        collections, CommentId, Course, CourseCategory, CourseComment, CourseId, CourseLike,
        Direction, FieldUpdate, LessonId, ListenTarget, Query, UserId,
    },
    Backend,
};

#[derive(Clone)]
pub struct CourseRepository(Backend);

impl CourseRepository {
    pub fn new(backend: Backend) -> CourseRepository {
        CourseRepository(backend)
    }

    pub async fn categories(&self) -> anyhow::Result<Vec<CourseCategory>> {
        self.0
            .query(&Query::all(collections::course_categories()))
            .await
    }

    pub async fn add_course(&self, course: &Course) -> anyhow::Result<CourseId> {
        let id = CourseId::from(self.0.add(&collections::courses(), course).await?);
        tracing::info!(course=%id, title=%course.title, "created course");
        Ok(id)
    }

    pub async fn update_course(&self, course: &Course) -> anyhow::Result<()> {
        anyhow::ensure!(!course.id.is_empty(), "updating a course that was never created");
        self.0.set(&collections::courses().doc(&course.id), course).await
    }

    pub async fn update_online_image_uri(&self, course: &CourseId, uri: &str) -> anyhow::Result<()> {
        self.0
            .update(
                &collections::courses().doc(course),
                vec![FieldUpdate::set("online_image_uri", uri)],
            )
            .await
    }

    pub async fn add_lesson_id_to_course(
        &self,
        course: &CourseId,
        lesson: &LessonId,
    ) -> anyhow::Result<()> {
        self.0
            .update(
                &collections::courses().doc(course),
                vec![FieldUpdate::array_union("lessons_ids", lesson)],
            )
            .await
    }

    /// Likes, studies and comments of the course stay behind
    pub async fn delete_course(&self, course: &CourseId) -> anyhow::Result<()> {
        self.0.delete(&collections::courses().doc(course)).await?;
        tracing::info!(course=%course, "deleted course");
        Ok(())
    }

    pub async fn increment_visits(&self, course: &CourseId) -> anyhow::Result<()> {
        self.0
            .update(
                &collections::courses().doc(course),
                vec![FieldUpdate::increment("visits", 1)],
            )
            .await
    }

    pub async fn increment_studies(&self, course: &CourseId) -> anyhow::Result<()> {
        self.0
            .update(
                &collections::courses().doc(course),
                vec![FieldUpdate::increment("studied", 1)],
            )
            .await
    }

    fn like_query(course: &CourseId, user: &UserId) -> Query {
        Query::all(collections::course_likes())
            .where_eq("user_id", user)
            .where_eq("course_id", course)
            .limit(1)
    }

    /// Likes the course, or removes the like if there was one. Returns
    /// whether the course is now liked.
    pub async fn toggle_like(&self, course: &CourseId, user: &UserId) -> anyhow::Result<bool> {
        let existing = self
            .0
            .query::<CourseLike>(&Self::like_query(course, user))
            .await
            .with_context(|| format!("looking up like of {course} by {user}"))?;
        let course_path = collections::courses().doc(course);
        match existing.into_iter().next() {
            Some(like) => {
                self.0
                    .delete(&collections::course_likes().doc(&like.id))
                    .await?;
                self.0
                    .update(&course_path, vec![FieldUpdate::increment("likes", -1)])
                    .await?;
                Ok(false)
            }
            None => {
                let like = CourseLike {
                    user_id: user.clone(),
                    course_id: course.clone(),
                    created_at: crate::api::now(),
                    ..CourseLike::default()
                };
                self.0.add(&collections::course_likes(), &like).await?;
                self.0
                    .update(&course_path, vec![FieldUpdate::increment("likes", 1)])
                    .await?;
                Ok(true)
            }
        }
    }

    pub async fn is_liked(&self, course: &CourseId, user: &UserId) -> anyhow::Result<bool> {
        let likes = self
            .0
            .query::<CourseLike>(&Self::like_query(course, user))
            .await?;
        Ok(!likes.is_empty())
    }

    pub async fn course_by_id(&self, course: &CourseId) -> anyhow::Result<Option<Course>> {
        self.0.get(&collections::courses().doc(course)).await
    }

    pub async fn all_courses(&self) -> anyhow::Result<Vec<Course>> {
        self.0.query(&Self::all_courses_query()).await
    }

    pub fn all_courses_query() -> Query {
        Query::all(collections::courses())
    }

    pub fn course_target(course: &CourseId) -> ListenTarget {
        ListenTarget::Document(collections::courses().doc(course))
    }

    fn feed(&self, field: &str) -> Query {
        Query::all(collections::courses())
            .order_by(field, Direction::Desc)
            .limit(self.0.config.feed_limit)
    }

    pub fn recent_courses_query(&self) -> Query {
        self.feed("created_at")
    }

    pub fn top_liked_query(&self) -> Query {
        self.feed("likes")
    }

    pub fn top_visited_query(&self) -> Query {
        self.feed("visits")
    }

    pub fn by_author_query(author: &UserId) -> Query {
        Query::all(collections::courses()).where_eq("author_id", author)
    }

    pub fn by_ids_query(ids: &[CourseId]) -> Query {
        Query::all(collections::courses()).where_id_in(ids)
    }

    pub async fn add_comment(&self, comment: &CourseComment) -> anyhow::Result<CommentId> {
        let id = self
            .0
            .add(&collections::course_comments(&comment.course_id), comment)
            .await?;
        Ok(CommentId::from(id))
    }

    pub fn comments_query(course: &CourseId) -> Query {
        Query::all(collections::course_comments(course)).order_by("created_at", Direction::Asc)
    }
}
