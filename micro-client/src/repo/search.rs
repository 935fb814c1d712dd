use crate::{
    api::{collections, Course, Query},
    Backend,
};

/// Server-side course search, one field per query
#[derive(Clone)]
pub struct SearchRepository(Backend);

impl SearchRepository {
    pub fn new(backend: Backend) -> SearchRepository {
        SearchRepository(backend)
    }

    fn base(&self) -> Query {
        Query::all(collections::courses()).limit(self.0.config.search_limit)
    }

    /// Courses whose author name sorts at or after `name`
    pub async fn by_author_name(&self, name: &str) -> anyhow::Result<Vec<Course>> {
        self.0.query(&self.base().where_gte("author_name", name)).await
    }

    pub async fn by_title(&self, title: &str) -> anyhow::Result<Vec<Course>> {
        self.0.query(&self.base().where_eq("title", title)).await
    }

    pub async fn by_tag(&self, tag: &str) -> anyhow::Result<Vec<Course>> {
        self.0
            .query(&self.base().where_array_contains("tags", tag))
            .await
    }

    pub async fn by_category(&self, category: &str) -> anyhow::Result<Vec<Course>> {
        self.0.query(&self.base().where_eq("category", category)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::{test_util, CourseRepository};

    #[tokio::test]
    async fn server_side_filters() {
        let (_srv, backend) = test_util::backend();
        let courses = CourseRepository::new(backend.clone());
        for (title, author, tag) in [("Rust", "Ada", "systems"), ("Go", "Bob", "web")] {
            courses
                .add_course(&Course {
                    title: String::from(title),
                    author_name: String::from(author),
                    tags: vec![String::from(tag)],
                    category: String::from("programming"),
                    ..Course::default()
                })
                .await
                .unwrap();
        }
        let search = SearchRepository::new(backend);
        assert_eq!(search.by_title("Rust").await.unwrap().len(), 1);
        assert_eq!(search.by_tag("web").await.unwrap()[0].title, "Go");
        assert_eq!(search.by_author_name("B").await.unwrap()[0].title, "Go");
        assert_eq!(search.by_category("programming").await.unwrap().len(), 2);
    }
}
