use anyhow::anyhow;

use crate::{
    api::{
        now, CommentId, Course, CourseComment, CourseId, CourseStudy, Error, Lesson, LessonId,
        Snapshot, UserId,
    },
    reconcile::{self, Policy},
    repo::{CourseRepository, LessonRepository, UserRepository},
    subscription::Subscriptions,
    view::UiState,
    Backend,
};

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum CourseSlot {
    Recent,
    TopLiked,
    TopVisited,
    Created,
    StudyingIds,
    Studying,
    Comments,
}

/// The course currently being studied
#[derive(Clone, Debug, Default)]
pub struct StudyCourse {
    pub course: Course,

    /// Sorted by `lesson_index`
    pub lessons: Vec<Lesson>,
    pub comments: Vec<CourseComment>,
    pub is_liked: bool,
    pub is_studying: bool,
    pub lesson_index: usize,
}

pub struct CourseViewModel {
    backend: Backend,
    courses: CourseRepository,
    lessons: LessonRepository,
    users: UserRepository,
    subs: Subscriptions<CourseSlot>,
    uid: UserId,

    pub recent_courses: Vec<Course>,
    pub top_liked: Vec<Course>,
    pub top_visited: Vec<Course>,
    pub created_courses: Vec<Course>,
    pub studying_courses: Vec<Course>,
    pub current: Option<StudyCourse>,
    pub ui_state: UiState,
}

impl CourseViewModel {
    pub async fn new(backend: Backend) -> anyhow::Result<CourseViewModel> {
        let uid = backend.current_uid()?;
        let courses = CourseRepository::new(backend.clone());
        let mut subs = Subscriptions::new(backend.store.clone());
        subs.subscribe(CourseSlot::Recent, courses.recent_courses_query())
            .await?;
        subs.subscribe(CourseSlot::TopLiked, courses.top_liked_query())
            .await?;
        subs.subscribe(CourseSlot::TopVisited, courses.top_visited_query())
            .await?;
        subs.subscribe(CourseSlot::Created, CourseRepository::by_author_query(&uid))
            .await?;
        subs.subscribe(
            CourseSlot::StudyingIds,
            UserRepository::studying_ids_query(&uid),
        )
        .await?;
        Ok(CourseViewModel {
            lessons: LessonRepository::new(backend.clone()),
            users: UserRepository::new(backend.clone()),
            courses,
            backend,
            subs,
            uid,
            recent_courses: Vec::new(),
            top_liked: Vec::new(),
            top_visited: Vec::new(),
            created_courses: Vec::new(),
            studying_courses: Vec::new(),
            current: None,
            ui_state: UiState::Empty,
        })
    }

    /// Applies every snapshot received so far, returns how many
    pub async fn apply_pending(&mut self) -> usize {
        let mut num = 0;
        while let Some((slot, snap)) = self.subs.try_next() {
            self.handle(slot, snap).await;
            num += 1;
        }
        num
    }

    /// Waits for one snapshot and applies it
    pub async fn next_update(&mut self) -> Option<CourseSlot> {
        let (slot, snap) = self.subs.next().await?;
        self.handle(slot.clone(), snap).await;
        Some(slot)
    }

    async fn handle(&mut self, slot: CourseSlot, snap: Snapshot) {
        let res = match slot {
            CourseSlot::Recent => {
                reconcile::apply_snapshot(Policy::ReplaceAll, &mut self.recent_courses, &snap)
            }
            CourseSlot::TopLiked => {
                reconcile::apply_snapshot(Policy::ReplaceAll, &mut self.top_liked, &snap)
            }
            CourseSlot::TopVisited => {
                reconcile::apply_snapshot(Policy::ReplaceAll, &mut self.top_visited, &snap)
            }
            CourseSlot::Created => {
                reconcile::apply_snapshot(Policy::ReplaceAll, &mut self.created_courses, &snap)
            }
            CourseSlot::StudyingIds => self.on_studying_ids(&snap).await,
            CourseSlot::Studying => {
                reconcile::apply_snapshot(Policy::ReplaceAll, &mut self.studying_courses, &snap)
            }
            CourseSlot::Comments => self.on_comments(&snap),
        };
        if let Err(error) = res {
            tracing::warn!(?slot, "ignoring snapshot: {error:#}");
        }
    }

    /// The studied courses are re-queried whenever the set of ids changes
    async fn on_studying_ids(&mut self, snap: &Snapshot) -> anyhow::Result<()> {
        let ids = snap
            .decode_all::<CourseStudy>()?
            .into_iter()
            .map(|r| r.course_id)
            .collect::<Vec<_>>();
        if ids.is_empty() {
            self.subs.unsubscribe(&CourseSlot::Studying);
            self.studying_courses.clear();
            return Ok(());
        }
        self.subs
            .subscribe(CourseSlot::Studying, CourseRepository::by_ids_query(&ids))
            .await
    }

    fn on_comments(&mut self, snap: &Snapshot) -> anyhow::Result<()> {
        let Some(cur) = self.current.as_mut() else {
            return Ok(());
        };
        let mut comments = snap.decode_all::<CourseComment>()?;
        for c in comments.iter_mut() {
            c.is_mine = c.author_id == self.uid;
        }
        reconcile::replace_all(&mut cur.comments, comments);
        Ok(())
    }

    pub async fn open_course(&mut self, course: &CourseId) -> anyhow::Result<()> {
        self.close_course();
        self.ui_state = UiState::Loading;
        match self.load_course(course).await {
            Ok(c) => {
                self.current = Some(c);
                self.ui_state = UiState::Success;
                self.subs
                    .subscribe(CourseSlot::Comments, CourseRepository::comments_query(course))
                    .await
            }
            Err(e) => {
                tracing::error!(%course, "failed opening course: {e:#}");
                self.ui_state = UiState::from_error(&e);
                Err(e)
            }
        }
    }

    async fn load_course(&self, id: &CourseId) -> anyhow::Result<StudyCourse> {
        let mut course = self
            .courses
            .course_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("course {id}")))?;
        let is_liked = self.courses.is_liked(id, &self.uid).await?;
        let is_studying = self.users.is_studying(&self.uid, id).await?;
        match self.courses.increment_visits(id).await {
            Ok(()) => course.visits += 1,
            Err(e) => tracing::warn!(course=%id, "failed counting visit: {e:#}"),
        }
        let mut lessons = self.lessons.lessons_by_ids(&course.lessons_ids).await?;
        lessons.sort_by_key(|l| l.lesson_index);
        Ok(StudyCourse {
            course,
            lessons,
            comments: Vec::new(),
            is_liked,
            is_studying,
            lesson_index: 0,
        })
    }

    pub fn close_course(&mut self) {
        self.subs.unsubscribe(&CourseSlot::Comments);
        self.current = None;
    }

    fn current_mut(&mut self) -> anyhow::Result<&mut StudyCourse> {
        self.current
            .as_mut()
            .ok_or_else(|| anyhow!("no course is open"))
    }

    /// Flips the like state right away, then settles on what the backend says
    pub async fn toggle_like(&mut self) -> anyhow::Result<bool> {
        let uid = self.uid.clone();
        let courses = self.courses.clone();
        let cur = self.current_mut()?;
        cur.is_liked = !cur.is_liked;
        match courses.toggle_like(&cur.course.id, &uid).await {
            Ok(liked) => {
                cur.is_liked = liked;
                cur.course.likes += if liked { 1 } else { -1 };
                Ok(liked)
            }
            Err(e) => {
                cur.is_liked = !cur.is_liked;
                Err(e)
            }
        }
    }

    /// Returns `false` if the course was already being studied
    pub async fn study_course(&mut self) -> anyhow::Result<bool> {
        let uid = self.uid.clone();
        let (courses, users) = (self.courses.clone(), self.users.clone());
        let cur = self.current_mut()?;
        if cur.is_studying {
            return Ok(false);
        }
        let added = users.add_studying_course(&uid, &cur.course.id).await?;
        if added {
            courses.increment_studies(&cur.course.id).await?;
            cur.course.studied += 1;
        }
        cur.is_studying = true;
        Ok(added)
    }

    pub async fn add_comment(&mut self, text: &str) -> anyhow::Result<CommentId> {
        let author = self.backend.signed_in()?;
        let cur = self
            .current
            .as_ref()
            .ok_or_else(|| anyhow!("no course is open"))?;
        let comment = CourseComment {
            author_id: author.uid,
            author_name: author.display_name,
            course_id: cur.course.id.clone(),
            created_at: now(),
            text: String::from(text),
            ..CourseComment::default()
        };
        self.courses.add_comment(&comment).await
    }

    pub async fn remove_studying_course(&mut self, course: &CourseId) -> anyhow::Result<()> {
        self.users.remove_studying_course(&self.uid, course).await?;
        if let Some(cur) = self.current.as_mut() {
            if &cur.course.id == course {
                cur.is_studying = false;
            }
        }
        Ok(())
    }

    pub fn current_lesson(&self) -> Option<&Lesson> {
        let cur = self.current.as_ref()?;
        cur.lessons.get(cur.lesson_index)
    }

    /// Returns `false` if there is no such lesson
    pub fn select_lesson(&mut self, index: usize) -> bool {
        match self.current.as_mut() {
            Some(cur) if index < cur.lessons.len() => {
                cur.lesson_index = index;
                true
            }
            _ => false,
        }
    }

    pub fn lesson_by_id(&self, lesson: &LessonId) -> Option<&Lesson> {
        self.current
            .as_ref()?
            .lessons
            .iter()
            .find(|l| &l.id == lesson)
    }
}
