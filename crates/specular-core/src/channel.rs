//! Release channels.

use serde::{Deserialize, Serialize};

/// A named release track.
///
/// Channels form a small closed set and are used only as lookup keys when
/// building origin URLs and destination subpaths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// The promoted, production-ready track.
    Stable,
    /// The release-candidate track.
    Beta,
    /// The freshest, least-tested track.
    Alpha,
}

impl Channel {
    /// All release channels, in promotion order.
    pub fn all() -> Vec<Self> {
        vec![Self::Stable, Self::Beta, Self::Alpha]
    }

    /// The lowercase name used in URLs, paths, and configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Beta => "beta",
            Self::Alpha => "alpha",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stable" => Ok(Self::Stable),
            "beta" => Ok(Self::Beta),
            "alpha" => Ok(Self::Alpha),
            _ => Err(format!("unknown channel: {s:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_through_str() {
        for channel in Channel::all() {
            assert_eq!(channel.as_str().parse::<Channel>(), Ok(channel));
        }
        assert!("nightly".parse::<Channel>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&vec![Channel::Stable, Channel::Alpha]).unwrap();
        assert_eq!(json, r#"["stable","alpha"]"#);
        let parsed: Vec<Channel> = serde_json::from_str(r#"["beta"]"#).unwrap();
        assert_eq!(parsed, vec![Channel::Beta]);
    }
}
