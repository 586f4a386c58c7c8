//! Declarative description of what to mirror.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use specular_core::Channel;
use specular_core::filters::FilterSet;

/// On-disk mirror configuration.
///
/// ```json
/// {
///     "channels": ["stable", "beta"],
///     "filters": ["- *.torrent", "+ *.bin", "- *"]
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Channels to mirror; every channel when absent.
    #[serde(default)]
    pub channels: Option<Vec<Channel>>,
    /// First-match-wins include/exclude rules; everything when empty.
    #[serde(default)]
    pub filters: FilterSet,
}

impl Config {
    /// Load a config from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("loading config {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("loading config {}", path.display()))
    }
}
