//! Resumable upload protocol modules

pub mod common;
pub(crate) mod initiator;
pub(crate) mod retry;
pub(crate) mod transfer;

// Re-export commonly used items
pub use common::{
    build_client, parse_upload_offset, resource_id_from_location, HEADER_TUS_RESUMABLE,
    HEADER_UPLOAD_LENGTH, HEADER_UPLOAD_OFFSET, OFFSET_OCTET_STREAM, TUS_VERSION,
};
pub use initiator::SessionInitiator;
pub use retry::{RetryOutcome, RetryPolicy};
pub use transfer::{ChunkResult, ChunkTransferClient};
