//! QueryState: Async state enum for a named query

/// Represents the state of a query
#[derive(Clone, PartialEq, Debug)]
pub enum QueryState<T, E> {
    /// No result yet, a fetch is pending
    Loading,
    /// The fetch completed successfully with data
    Success(T),
    /// The fetch failed with an error
    Error(E),
}

impl<T, E> Default for QueryState<T, E> {
    fn default() -> Self {
        QueryState::Loading
    }
}

impl<T, E> QueryState<T, E> {
    /// Returns true if the state is currently loading
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    /// Returns true if the state contains successful data
    pub fn is_success(&self) -> bool {
        matches!(self, QueryState::Success(_))
    }

    /// Returns true if the state contains an error
    pub fn is_error(&self) -> bool {
        matches!(self, QueryState::Error(_))
    }

    /// Returns the data if successful, None otherwise
    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Success(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the error if failed, None otherwise
    pub fn error(&self) -> Option<&E> {
        match self {
            QueryState::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Maps a QueryState<T, E> to QueryState<U, E> by applying a function to the contained data if successful.
    pub fn map<U, F>(self, op: F) -> QueryState<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            QueryState::Success(data) => QueryState::Success(op(data)),
            QueryState::Error(e) => QueryState::Error(e),
            QueryState::Loading => QueryState::Loading,
        }
    }

    /// Maps a QueryState<T, E> to QueryState<T, F> by applying a function to the contained error if failed.
    pub fn map_err<F, O>(self, op: O) -> QueryState<T, F>
    where
        O: FnOnce(E) -> F,
    {
        match self {
            QueryState::Success(data) => QueryState::Success(data),
            QueryState::Error(e) => QueryState::Error(op(e)),
            QueryState::Loading => QueryState::Loading,
        }
    }
}

impl<T, E> From<Result<T, E>> for QueryState<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => QueryState::Success(data),
            Err(error) => QueryState::Error(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_loading() {
        let state: QueryState<u32, String> = QueryState::default();
        assert!(state.is_loading());
        assert_eq!(state.data(), None);
        assert_eq!(state.error(), None);
    }

    #[test]
    fn test_from_result() {
        let ok: QueryState<u32, String> = Ok(7).into();
        assert_eq!(ok.data(), Some(&7));
        assert!(!ok.is_error());

        let err: QueryState<u32, String> = Err("boom".to_string()).into();
        assert_eq!(err.error().map(String::as_str), Some("boom"));
        assert_eq!(err.data(), None);
    }

    #[test]
    fn test_map_keeps_loading_and_error() {
        let loading: QueryState<u32, String> = QueryState::Loading;
        assert!(loading.map(|n| n * 2).is_loading());

        let error: QueryState<u32, String> = QueryState::Error("e".into());
        assert_eq!(error.map_err(|e| e.len()), QueryState::Error(1));

        let success: QueryState<u32, String> = QueryState::Success(2);
        assert_eq!(success.map(|n| n * 2), QueryState::Success(4));
    }
}
