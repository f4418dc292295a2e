/// What a data view currently shows
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ViewState<T> {
    /// No location committed
    #[default]
    Empty,
    Loading,
    Ready(T),
    /// Message to show in place of the data
    Failed(String),
}

impl<T> ViewState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ViewState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ViewState::Failed(message) => Some(message.as_str()),
            _ => None,
        }
    }

    /// True once a request has finished, successfully or not.
    pub fn is_settled(&self) -> bool {
        matches!(self, ViewState::Ready(_) | ViewState::Failed(_))
    }
}
