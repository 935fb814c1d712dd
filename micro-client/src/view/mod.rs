mod ui_state;
pub use ui_state::UiState;

mod auth;
pub use auth::AuthViewModel;

mod channel;
pub use channel::{ChannelSlot, ChannelViewModel};

mod channel_editor;
pub use channel_editor::ChannelEditor;

mod course;
pub use course::{CourseSlot, CourseViewModel, StudyCourse};

mod course_editor;
pub use course_editor::{CourseEditor, LessonDraft};

mod group;
pub use group::{GroupSlot, StudyGroupViewModel};

mod group_editor;
pub use group_editor::StudyGroupEditor;

mod search;
pub use search::{SearchFilter, SearchSlot, SearchViewModel};

mod user;
pub use user::{UserSlot, UserViewModel};
