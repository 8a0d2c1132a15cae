//! # Query Client Configuration

use std::time::Duration;

/// Default stale time: cached data never goes stale on its own
pub const DEFAULT_STALE_TIME: Option<Duration> = None;

/// Settings shared by every query registered with a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryClientConfig {
    /// How long a successful result counts as fresh.
    ///
    /// `None` keeps cached data until it is refetched, invalidated or removed.
    /// With `Some(duration)`, older data is still served to observers while
    /// the next `ensure` revalidates it in the background.
    pub stale_time: Option<Duration>,
}

impl Default for QueryClientConfig {
    fn default() -> Self {
        Self {
            stale_time: DEFAULT_STALE_TIME,
        }
    }
}

impl QueryClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_never_stale() {
        assert_eq!(QueryClientConfig::default().stale_time, None);
    }

    #[test]
    fn test_with_stale_time() {
        let config = QueryClientConfig::new().with_stale_time(Duration::from_secs(60));
        assert_eq!(config.stale_time, Some(Duration::from_secs(60)));
    }
}
