//! resumable-upload library - resumable chunked uploads with adaptive chunk sizing

pub mod config;
pub mod error;
pub mod http_logger;
pub mod protocol;
pub mod session;
pub mod strategy;
pub mod target;

// Re-export commonly used types
pub use config::{Config, ConfigOptions};
pub use error::{OffsetParseError, UploadError};
pub use session::{PauseToken, ProgressSnapshot, SessionOutcome, SessionState, UploadSession};
pub use target::UploadTarget;
