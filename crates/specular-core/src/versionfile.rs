//! Release metadata (`version.txt`) parsing.
//!
//! Channel metadata is a newline-delimited `KEY=VALUE` file in the style of
//! os-release(5). The value may be shell-quoted, so adjacent quoted segments
//! concatenate: `"12"".0"` parses to `12.0`.

use std::io::BufRead;

use crate::error::MirrorError;

/// The metadata key whose value names the channel's current version.
pub const VERSION_ID_KEY: &str = "COREOS_VERSION_ID";

/// An immutable release version identifier.
///
/// The inner string is validated to be safe for direct use as a filesystem
/// and URL path segment: non-empty, no leading `.`, no `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(String);

impl Version {
    /// Validate `value` as a version identifier.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::InvalidVersionValue`] if the value is empty,
    /// begins with a dot, or contains a slash.
    pub fn parse(value: String) -> Result<Self, MirrorError> {
        let reason = if value.is_empty() {
            Some("must not be empty")
        } else if value.starts_with('.') {
            Some("must not begin with a dot")
        } else if value.contains('/') {
            Some("must not contain a slash")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(MirrorError::InvalidVersionValue { value, reason }),
            None => Ok(Self(value)),
        }
    }

    /// The version as a path/URL segment.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the version ID from channel metadata.
///
/// Scans for the first line whose key is [`VERSION_ID_KEY`] and returns its
/// shell-dequoted value; later duplicates are ignored. Lines without a `=`
/// or with a different key are skipped.
///
/// # Errors
///
/// Returns [`MirrorError::MetadataNotFound`] if no matching line exists,
/// [`MirrorError::MetadataParse`] if the value cannot be tokenized,
/// [`MirrorError::InvalidVersionValue`] if the value is unusable as a path
/// segment, and [`MirrorError::Filesystem`] for read errors from `r`.
pub fn parse_version_id<R: BufRead>(r: R) -> Result<Version, MirrorError> {
    for line in r.lines() {
        let line = line?;
        let Some((key, rest)) = line.split_once('=') else {
            continue;
        };
        if key != VERSION_ID_KEY {
            continue;
        }
        let tokens = split_quoted(rest)?;
        return Version::parse(tokens.join(" "));
    }
    Err(MirrorError::MetadataNotFound)
}

/// Tokenize `input` with shell-style quoting rules.
///
/// Whitespace separates tokens. Single quotes are literal, double quotes
/// honor backslash escapes, and a backslash outside quotes escapes the next
/// character. A `#` at the start of a token begins a comment that runs to
/// the end of the input.
fn split_quoted(input: &str) -> Result<Vec<String>, MirrorError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.peek() {
            None => break,
            Some('#') => break,
            Some(_) => {}
        }

        let mut token = String::new();
        loop {
            let Some(c) = chars.next() else { break };
            match c {
                c if c.is_whitespace() => break,
                '\'' => loop {
                    match chars.next() {
                        None => {
                            return Err(MirrorError::MetadataParse(
                                "unterminated single-quoted string".to_string(),
                            ));
                        }
                        Some('\'') => break,
                        Some(c) => token.push(c),
                    }
                },
                '"' => loop {
                    match chars.next() {
                        None => {
                            return Err(MirrorError::MetadataParse(
                                "unterminated double-quoted string".to_string(),
                            ));
                        }
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            None => {
                                return Err(MirrorError::MetadataParse(
                                    "escape at end of input".to_string(),
                                ));
                            }
                            Some(c) => token.push(c),
                        },
                        Some(c) => token.push(c),
                    }
                },
                '\\' => match chars.next() {
                    None => {
                        return Err(MirrorError::MetadataParse(
                            "escape at end of input".to_string(),
                        ));
                    }
                    Some(c) => token.push(c),
                },
                c => token.push(c),
            }
        }
        tokens.push(token);
    }

    Ok(tokens)
}
