use std::path::PathBuf;

/// Errors raised by the addon lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// A required base directory could not be determined.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The settings file exists but is not valid JSON.
    #[error("failed to parse settings {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Transport-level failure on the branch listing request.
    #[error("network error: {0}")]
    Network(String),

    /// Any other failure while listing branches.
    #[error("failed to fetch branches: {0}")]
    Fetch(String),

    #[error("{0}")]
    NotFound(String),

    #[error("git clone failed: {stderr}")]
    Clone { stderr: String },

    #[error("git pull failed: {stderr}")]
    Pull { stderr: String },

    #[error("no installation found at {}", .0.display())]
    NotInstalled(PathBuf),

    #[error("{} is not a git checkout - switch to a branch first", .0.display())]
    NotAVcsCheckout(PathBuf),

    #[error("could not open {}: {source}", path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ManagerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ManagerError>;
