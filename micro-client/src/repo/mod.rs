mod auth;
pub use auth::AuthRepository;

mod channel;
pub use channel::ChannelRepository;

mod course;
pub use course::CourseRepository;

mod group;
pub use group::StudyGroupRepository;

mod lesson;
pub use lesson::LessonRepository;

mod media;
pub use media::MediaRepository;
pub(crate) use media::local_file_name;

mod search;
pub use search::SearchRepository;

mod user;
pub use user::UserRepository;

#[cfg(test)]
pub(crate) mod test_util {
    use std::sync::Arc;

    use micro_mock_server::MockServer;

    use crate::{
        api::{AuthProvider, NewAccount, UserId},
        Backend, Config,
    };

    pub fn init_tracing() {
        if std::env::var("RUST_LOG").is_ok() {
            let _ = tracing_subscriber::fmt::try_init();
        }
    }

    pub fn backend() -> (Arc<MockServer>, Backend) {
        init_tracing();
        let srv = Arc::new(MockServer::new());
        let backend = Backend::single(srv.clone(), Config::default());
        (srv, backend)
    }

    /// Backend with `email` signed in
    pub async fn signed_in(email: &str) -> (Arc<MockServer>, Backend, UserId) {
        let (srv, backend) = backend();
        let user = srv
            .create_account(NewAccount {
                email: String::from(email),
                password: String::from("password"),
                display_name: String::from("Test User"),
                photo_uri: String::new(),
            })
            .await
            .unwrap();
        (srv, backend, user.uid)
    }
}
