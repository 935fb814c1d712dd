/// Progress of the last user-visible operation of a screen
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum UiState {
    #[default]
    Empty,
    Loading,
    Success,
    Error(String),
}

impl UiState {
    pub fn from_error(err: &anyhow::Error) -> UiState {
        // show the root cause, the context chain is for logs
        UiState::Error(err.root_cause().to_string())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, UiState::Error(_))
    }
}
