//! Type-state machine for a single in-flight range load.
//!
//! Replaces an `is_loading`/`has_error` boolean pair with one enum so a gap's load
//! status can't be in two states at once — mirrors the pattern the rest of the
//! pack uses for async fetch bookkeeping.

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Pending,
    Loading,
    Loaded(T),
    Error(String),
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, LoadState::Error(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            LoadState::Loaded(data) => Some(data),
            _ => None,
        }
    }
}

impl<T> Default for LoadState<T> {
    fn default() -> Self {
        LoadState::Pending
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for LoadState<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => LoadState::Loaded(data),
            Err(err) => LoadState::Error(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions() {
        let state: LoadState<i32> = LoadState::default();
        assert!(!state.is_loading());

        let state = LoadState::Loading;
        assert!(state.is_loading());

        let state = LoadState::Loaded(42);
        assert!(state.is_loaded());
        assert_eq!(state.data(), Some(&42));

        let state: LoadState<i32> = LoadState::Error("boom".to_string());
        assert!(state.is_error());
    }

    #[test]
    fn from_result() {
        let ok: Result<i32, String> = Ok(7);
        let state: LoadState<i32> = ok.into();
        assert_eq!(state.data(), Some(&7));

        let err: Result<i32, String> = Err("nope".to_string());
        let state: LoadState<i32> = err.into();
        assert!(state.is_error());
    }
}
