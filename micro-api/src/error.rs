#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("No user is signed in")]
    NotAuthenticated,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email already used {0:?}")]
    EmailAlreadyUsed(String),

    #[error("Invalid email address {0:?}")]
    InvalidEmail(String),

    #[error("Password must be at least {0} characters long")]
    WeakPassword(usize),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Document could not be decoded: {0}")]
    InvalidDocument(String),

    #[error("The {what} is longer than {max} characters")]
    ContentTooLong { what: &'static str, max: usize },

    #[error("A course must have between {min} and {max} lessons, got {got}")]
    LessonCount { min: usize, max: usize, got: usize },

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl Error {
    /// Errors that come from the auth provider refusing the user, as opposed
    /// to the backend failing
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Error::NotAuthenticated
                | Error::InvalidCredentials
                | Error::EmailAlreadyUsed(_)
                | Error::InvalidEmail(_)
                | Error::WeakPassword(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::InvalidDocument(e.to_string())
    }
}
