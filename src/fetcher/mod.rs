pub mod github;

use crate::error::Result;

/// Minimal HTTP GET capability used by the branch lister.
pub trait Transport {
    /// Fetches `url` and returns the response body.
    ///
    /// Connection failures, timeouts and non-success statuses map to
    /// `ManagerError::Network`; an unreadable body maps to `ManagerError::Fetch`.
    fn get(&self, url: &str) -> Result<String>;
}
