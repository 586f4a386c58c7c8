//! Trust-verified mirroring of remote release channels.
//!
//! For every configured [`Channel`] the mirror resolves the channel's current
//! immutable version, crawls that version's directory listing, and downloads
//! only files whose detached signature validates against the embedded release
//! key. Files and the per-channel `current` pointer are installed atomically,
//! so a consumer can read the mirror straight off the filesystem without
//! seeing tampered or half-written content.

pub mod atomic;
pub mod channel;
mod download;
pub mod error;
pub mod filters;
pub mod links;
pub mod listing;
pub mod mirror;
pub mod verify;
pub mod versionfile;

pub use channel::Channel;
pub use error::MirrorError;
pub use mirror::{ChannelAddressing, ErrorVerdict, Mirror, MirrorOptions, Origin};
pub use versionfile::Version;

/// User Agent string for outbound requests
pub const USER_AGENT: &str = concat!("specular/", env!("CARGO_PKG_VERSION"));
