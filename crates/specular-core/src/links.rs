//! Classification of listing links into download candidates.
//!
//! Only signature links trigger downloads; the matching content link is
//! derived from the candidate name, never discovered independently.

/// Suffix that marks a detached-signature resource.
pub const SIG_SUFFIX: &str = ".sig";

/// Decide whether `link` names a downloadable signed file.
///
/// Returns the suffix-stripped, percent-decoded base name when the link is a
/// simple same-directory reference to a signature file and the name passes
/// `filter`. Every rejection is silent:
///
/// 1. scheme, host, or absolute path — not a relative reference
/// 2. internal path separator — points outside the listing directory
/// 3. leading dot — hidden file, `.`, or `..`
/// 4. query string or fragment — not a static file reference
/// 5. missing the `.sig` suffix — unsigned, so never downloaded
/// 6. failing the caller's inclusion predicate
pub fn candidate(link: &str, filter: impl Fn(&str) -> bool) -> Option<String> {
    if link.starts_with('/') || has_scheme(link) {
        return None;
    }
    let (body, fragment) = match link.split_once('#') {
        Some((body, fragment)) => (body, Some(fragment)),
        None => (link, None),
    };
    let (raw_path, query) = match body.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (body, None),
    };
    let path = percent_decode(raw_path)?;
    if path.contains('/') || path.starts_with('.') {
        return None;
    }
    if query.is_some() || fragment.is_some() {
        return None;
    }
    let base = path.strip_suffix(SIG_SUFFIX)?;
    if !filter(base) {
        return None;
    }
    Some(base.to_string())
}

/// Whether `s` begins with a URI scheme (`alpha *(alnum / + / - / .) ":"`).
fn has_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    for c in chars {
        match c {
            ':' => return true,
            c if c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.') => {}
            _ => return false,
        }
    }
    false
}

/// Decode percent-escapes; `None` for malformed escapes or invalid UTF-8.
fn percent_decode(s: &str) -> Option<String> {
    if !s.contains('%') {
        return Some(s.to_string());
    }
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = char::from(*bytes.get(i + 1)?).to_digit(16)?;
            let lo = char::from(*bytes.get(i + 2)?).to_digit(16)?;
            out.push(u8::try_from(hi * 16 + lo).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Percent-encode a decoded name for use as a single URL path segment.
pub(crate) fn percent_encode(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for b in name.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(char::from(b));
            }
            _ => {
                out.push('%');
                out.push_str(&format!("{b:02X}"));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accept_all(link: &str) -> Option<String> {
        candidate(link, |_| true)
    }

    #[test]
    fn test_only_simple_signature_links_survive() {
        let links = [
            "foo.bin.sig",
            "bar/baz.sig",
            ".hidden.sig",
            "http://x/y.sig",
            "plain.txt",
        ];
        let candidates: Vec<_> = links.iter().filter_map(|l| accept_all(l)).collect();
        assert_eq!(candidates, ["foo.bin"]);
    }

    #[test]
    fn test_rejects_absolute_and_protocol_relative() {
        assert_eq!(accept_all("/abs/foo.sig"), None);
        assert_eq!(accept_all("//host/foo.sig"), None);
        assert_eq!(accept_all("mailto:a@b.sig"), None);
    }

    #[test]
    fn test_rejects_parent_and_self_references() {
        assert_eq!(accept_all("."), None);
        assert_eq!(accept_all(".."), None);
        assert_eq!(accept_all("..sig"), None);
    }

    #[test]
    fn test_rejects_query_and_fragment() {
        assert_eq!(accept_all("foo.sig?C=M;O=D"), None);
        assert_eq!(accept_all("foo.sig#frag"), None);
    }

    #[test]
    fn test_rejects_encoded_separator() {
        assert_eq!(accept_all("a%2Fb.sig"), None);
        assert_eq!(accept_all("%2e%2e.sig"), None);
    }

    #[test]
    fn test_decodes_escapes_in_name() {
        assert_eq!(accept_all("a%20b.bin.sig"), Some("a b.bin".to_string()));
    }

    #[test]
    fn test_malformed_escape_is_rejected() {
        assert_eq!(accept_all("a%2.sig"), None);
        assert_eq!(accept_all("a%.sig"), None);
    }

    #[test]
    fn test_filter_rejection_is_silent() {
        assert_eq!(candidate("foo.bin.sig", |_| false), None);
        assert_eq!(
            candidate("foo.bin.sig", |base| base == "foo.bin"),
            Some("foo.bin".to_string())
        );
    }

    #[test]
    fn test_encode_round_trips_decoded_names() {
        assert_eq!(percent_encode("a b.bin"), "a%20b.bin");
        assert_eq!(percent_encode("update.bin"), "update.bin");
    }
}
