use crate::{
    api::{Course, Snapshot},
    reconcile::{self, Policy},
    repo::CourseRepository,
    subscription::Subscriptions,
    Backend,
};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SearchFilter {
    Title,
    Author,
    Tags,
    Category,
}

impl SearchFilter {
    /// Title, author and category match case-insensitive substrings, tags
    /// must match exactly
    pub fn matches(&self, course: &Course, text: &str) -> bool {
        let contains = |field: &str| field.to_lowercase().contains(&text.to_lowercase());
        match self {
            SearchFilter::Title => contains(&course.title),
            SearchFilter::Author => contains(&course.author_name),
            SearchFilter::Tags => course.tags.iter().any(|t| t == text),
            SearchFilter::Category => contains(&course.category),
        }
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum SearchSlot {
    Courses,
}

/// Local search over the whole live course collection
pub struct SearchViewModel {
    subs: Subscriptions<SearchSlot>,
    text: String,

    pub courses: Vec<Course>,
    pub filters: Vec<SearchFilter>,
    pub results: Vec<Course>,
}

impl SearchViewModel {
    pub async fn new(backend: Backend) -> anyhow::Result<SearchViewModel> {
        let mut subs = Subscriptions::new(backend.store.clone());
        subs.subscribe(SearchSlot::Courses, CourseRepository::all_courses_query())
            .await?;
        Ok(SearchViewModel {
            subs,
            text: String::new(),
            courses: Vec::new(),
            filters: vec![SearchFilter::Title],
            results: Vec::new(),
        })
    }

    /// Applies pending snapshots, re-running the current search if the
    /// courses changed
    pub async fn apply_pending(&mut self) -> usize {
        let mut num = 0;
        while let Some((slot, snap)) = self.subs.try_next() {
            self.handle(slot, snap);
            num += 1;
        }
        num
    }

    pub async fn next_update(&mut self) -> Option<SearchSlot> {
        let (slot, snap) = self.subs.next().await?;
        self.handle(slot.clone(), snap);
        Some(slot)
    }

    fn handle(&mut self, slot: SearchSlot, snap: Snapshot) {
        match reconcile::apply_snapshot(Policy::ReplaceAll, &mut self.courses, &snap) {
            Ok(()) => self.refresh(),
            Err(error) => tracing::warn!(?slot, "ignoring snapshot: {error:#}"),
        }
    }

    /// Toggles a filter; newly selected filters go last
    pub fn toggle_filter(&mut self, filter: SearchFilter) {
        match self.filters.iter().position(|f| *f == filter) {
            Some(i) => {
                self.filters.remove(i);
            }
            None => self.filters.push(filter),
        }
        self.refresh();
    }

    /// Results of each selected filter, concatenated in filter order. A
    /// course matching several filters shows up once per filter.
    pub fn search(&mut self, text: &str) {
        self.text = String::from(text);
        self.refresh();
    }

    fn refresh(&mut self) {
        self.results.clear();
        if self.text.is_empty() {
            return;
        }
        for f in self.filters.iter() {
            self.results.extend(
                self.courses
                    .iter()
                    .filter(|c| f.matches(c, &self.text))
                    .cloned(),
            );
        }
    }
}
