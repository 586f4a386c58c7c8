//! Orchestrates channels, versions, listings, and verified files.

use std::path::{Path, PathBuf};

use ed25519_dalek::VerifyingKey;
use reqwest::{Client, Url};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::channel::Channel;
use crate::error::MirrorError;
use crate::listing::HrefExtractor;
use crate::{atomic, download, links, verify, versionfile};

/// How per-channel resource URLs are derived from the origin base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAddressing {
    /// `https://<channel>.<base-host>/<base-path>/` -- the upstream layout.
    Subdomain,
    /// `<base>/<channel>/` -- for mirrors-of-mirrors and test servers that
    /// cannot fan out per-channel hosts.
    PathSegment,
}

/// Where releases are fetched from.
///
/// Immutable once built; the orchestrator derives every channel, metadata,
/// listing, and file URL from it.
#[derive(Debug, Clone)]
pub struct Origin {
    base: Url,
    addressing: ChannelAddressing,
}

impl Origin {
    /// The upstream release tree.
    pub const DEFAULT_BASE: &'static str = "https://release.core-os.net/amd64-usr/";

    /// An origin with per-channel subdomains, the upstream layout.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Url`] when `base` is not an absolute URL with
    /// a host.
    pub fn new(base: &str) -> Result<Self, MirrorError> {
        Self::with_addressing(base, ChannelAddressing::Subdomain)
    }

    /// An origin with channels as path segments under `base`.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Url`] when `base` is not an absolute URL with
    /// a host.
    pub fn path_style(base: &str) -> Result<Self, MirrorError> {
        Self::with_addressing(base, ChannelAddressing::PathSegment)
    }

    /// An origin with explicit channel addressing.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Url`] when `base` is not an absolute URL with
    /// a host.
    pub fn with_addressing(
        base: &str,
        addressing: ChannelAddressing,
    ) -> Result<Self, MirrorError> {
        let mut base = Url::parse(base).map_err(|err| MirrorError::Url(err.to_string()))?;
        if base.host_str().is_none() {
            return Err(MirrorError::Url(format!("origin {base} has no host")));
        }
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        Ok(Self { base, addressing })
    }

    /// The URL all of `channel`'s resources live under.
    fn channel_base(&self, channel: Channel) -> Result<Url, MirrorError> {
        match self.addressing {
            ChannelAddressing::Subdomain => {
                let mut url = self.base.clone();
                let host = self
                    .base
                    .host_str()
                    .ok_or_else(|| MirrorError::Url(format!("origin {} has no host", self.base)))?;
                url.set_host(Some(&format!("{channel}.{host}")))
                    .map_err(|err| MirrorError::Url(err.to_string()))?;
                Ok(url)
            }
            ChannelAddressing::PathSegment => self
                .base
                .join(&format!("{channel}/"))
                .map_err(|err| MirrorError::Url(err.to_string())),
        }
    }
}

impl Default for Origin {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE).expect("default origin URL is valid")
    }
}

/// What the error classifier decided about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorVerdict {
    /// Abort the whole run.
    Fatal,
    /// Log, skip the failed unit, and keep going.
    Skip,
}

/// Configuration for one mirror run, constructed once before it begins.
pub struct MirrorOptions {
    /// Channels to mirror, in order. Defaults to every channel.
    pub channels: Vec<Channel>,
    /// Inclusion predicate over suffix-stripped file base names. Defaults
    /// to including everything.
    pub filter: Box<dyn Fn(&str) -> bool + Send + Sync>,
    /// Classifies file- and channel-level failures as fatal or skippable.
    /// Defaults to treating everything as fatal.
    pub on_error: Box<dyn Fn(&MirrorError) -> ErrorVerdict + Send + Sync>,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            channels: Channel::all(),
            filter: Box::new(|_| true),
            on_error: Box::new(|_| ErrorVerdict::Fatal),
        }
    }
}

impl std::fmt::Debug for MirrorOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorOptions")
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

/// Drives one mirror run: channels to versions to listings to verified
/// files, finishing each channel by atomically repointing its `current`
/// link.
pub struct Mirror {
    client: Client,
    origin: Origin,
    dest: PathBuf,
    options: MirrorOptions,
    anchor: VerifyingKey,
}

impl std::fmt::Debug for Mirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mirror")
            .field("origin", &self.origin)
            .field("dest", &self.dest)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Mirror {
    /// A mirror of `origin` into `dest`, verifying against the embedded
    /// trust anchor.
    pub fn new(origin: Origin, dest: impl Into<PathBuf>, options: MirrorOptions) -> Self {
        Self::with_trust_anchor(origin, dest, options, verify::trust_anchor())
    }

    /// Test seam: like [`Mirror::new`] with an explicit trust anchor.
    #[doc(hidden)]
    pub fn with_trust_anchor(
        origin: Origin,
        dest: impl Into<PathBuf>,
        options: MirrorOptions,
        anchor: VerifyingKey,
    ) -> Self {
        Self {
            client: Client::new(),
            origin,
            dest: dest.into(),
            options,
            anchor,
        }
    }

    /// Mirror every configured channel.
    ///
    /// Channel failures are routed through the error classifier: a `Skip`
    /// verdict logs and moves on to the next channel. Cancellation is never
    /// classified and always aborts.
    ///
    /// # Errors
    ///
    /// The first failure classified [`ErrorVerdict::Fatal`], or
    /// [`MirrorError::Cancelled`] once the token fires.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<(), MirrorError> {
        for &channel in &self.options.channels {
            match self.mirror_channel(channel, cancel).await {
                Ok(()) => {}
                Err(err @ MirrorError::Cancelled) => return Err(err),
                Err(err) => match (self.options.on_error)(&err) {
                    ErrorVerdict::Fatal => return Err(err),
                    ErrorVerdict::Skip => warn!(%channel, error = %err, "skipping channel"),
                },
            }
        }
        Ok(())
    }

    async fn mirror_channel(
        &self,
        channel: Channel,
        cancel: &CancellationToken,
    ) -> Result<(), MirrorError> {
        let channel_base = self.origin.channel_base(channel)?;
        let metadata_url = channel_base
            .join("current/version.txt")
            .map_err(|err| MirrorError::Url(err.to_string()))?;
        let metadata = download::fetch_bytes(&self.client, metadata_url, cancel).await?;
        let version = versionfile::parse_version_id(metadata.as_slice())?;

        // every channel shares one content area, keyed by version
        let all_path = self.dest.join("all");
        ensure_dir(&all_path).await?;
        let version_path = all_path.join(version.as_str());
        ensure_dir(&version_path).await?;

        info!(%channel, %version, "channel resolved");
        let version_url = channel_base
            .join(&format!("{version}/"))
            .map_err(|err| MirrorError::Url(err.to_string()))?;
        self.mirror_version(&version_path, &version_url, cancel)
            .await?;

        let channel_path = self.dest.join(channel.as_str());
        ensure_dir(&channel_path).await?;
        atomic::symlink(
            Path::new(&format!("../all/{version}")),
            &channel_path.join("current"),
        )?;
        Ok(())
    }

    /// Crawl one version's listing and mirror every accepted file into
    /// `dst`. File failures are classified; a listing that cannot be
    /// fetched or parsed fails the channel.
    async fn mirror_version(
        &self,
        dst: &Path,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<(), MirrorError> {
        info!(%url, "mirroring version listing");
        let listing = download::fetch_bytes(&self.client, url.clone(), cancel).await?;
        for link in HrefExtractor::new(&listing) {
            let link = link?;
            let Some(name) = links::candidate(&link, &*self.options.filter) else {
                continue;
            };
            match self.mirror_file(dst, url, &name, cancel).await {
                Ok(()) => {}
                Err(err @ MirrorError::Cancelled) => return Err(err),
                Err(err) => match (self.options.on_error)(&err) {
                    ErrorVerdict::Fatal => return Err(err),
                    ErrorVerdict::Skip => warn!(name, error = %err, "skipping file"),
                },
            }
        }
        Ok(())
    }

    /// Mirror a single named file unless it is already present.
    ///
    /// Versions are immutable, so an existing content file is proof the
    /// pair was installed by a previous verified download.
    async fn mirror_file(
        &self,
        dst: &Path,
        base_url: &Url,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<(), MirrorError> {
        let final_path = dst.join(name);
        match tokio::fs::symlink_metadata(&final_path).await {
            Ok(_) => return Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        info!(name, "downloading");
        let url = base_url
            .join(&links::percent_encode(name))
            .map_err(|err| MirrorError::Url(err.to_string()))?;
        download::fetch_signed(&self.client, &self.anchor, dst, url, name, cancel).await
    }
}

/// Create `path` if it does not already exist.
async fn ensure_dir(path: &Path) -> Result<(), MirrorError> {
    match tokio::fs::create_dir(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(err) => Err(err.into()),
    }
}
