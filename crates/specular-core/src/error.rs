//! Error taxonomy for a mirror run.

use std::path::PathBuf;

use thiserror::Error;

/// Any failure a mirror run can surface.
///
/// File-level and channel-level values of this type are routed through the
/// caller's error classifier (see [`crate::MirrorOptions::on_error`]), which
/// decides whether the run aborts or continues. [`MirrorError::Cancelled`]
/// is never classified; it always aborts the run.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// The channel metadata had no version ID line.
    #[error("version ID not found in channel metadata")]
    MetadataNotFound,

    /// A version ID line was present but could not be tokenized.
    #[error("parsing channel metadata: {0}")]
    MetadataParse(String),

    /// The version value is unusable as a path or URL segment.
    #[error("invalid version ID {value:?}: {reason}")]
    InvalidVersionValue {
        /// The offending value as extracted from the metadata.
        value: String,
        /// Which invariant it violates.
        reason: &'static str,
    },

    /// An HTTP request failed or returned a non-success status.
    #[error("HTTP error: {0}")]
    Network(#[from] reqwest::Error),

    /// The directory listing ended inside an HTML construct.
    #[error("parsing directory listing: {0}")]
    ListingParse(String),

    /// The detached signature did not validate against the trust anchor.
    #[error("signature verification failed for {name}")]
    SignatureVerification {
        /// Base name of the rejected file.
        name: String,
    },

    /// A filesystem operation failed.
    #[error("IO error: {0}")]
    Filesystem(#[from] std::io::Error),

    /// A URL could not be built from the configured origin parts.
    #[error("invalid URL: {0}")]
    Url(String),

    /// Every scratch name tried for an atomic install already existed.
    #[error("scratch name collisions exhausted installing {dest}")]
    NameCollisionExhausted {
        /// The pointer that could not be installed.
        dest: PathBuf,
    },

    /// The run's cancellation token fired.
    #[error("mirror run cancelled")]
    Cancelled,
}
