//! Imaging-archive collaborator contracts.
//!
//! The real archive (connection, authentication, resource transfer) lives
//! outside this crate; the pipeline consumes it through the narrow
//! [`ArchiveClient`] and [`Instance`] traits. Mock implementations for tests
//! live in [`crate::testing`].

mod traits;
mod types;

pub use traits::{ArchiveClient, Instance};
pub use types::{ArchiveError, ScanKey, ScanListing, TagValue};
