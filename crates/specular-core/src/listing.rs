//! Anchor `href` extraction from HTML directory listings.
//!
//! Listing pages are plain index HTML; the only thing the mirror needs from
//! them is every `<a href=...>` value, in document order. The scanner below
//! is a forward-only tokenizer over the raw bytes: it understands comments,
//! declarations, end tags, and quoted/unquoted attributes, and nothing more.

use crate::error::MirrorError;

/// A fused, forward-only iterator over anchor `href` values.
///
/// Yields one `Ok` item per `<a>` start tag carrying a non-namespaced `href`
/// attribute. Truncated markup (end of document inside a tag or comment)
/// yields a single terminal [`MirrorError::ListingParse`]; after any error or
/// normal exhaustion the iterator stays empty. Re-scanning requires a fresh
/// buffer.
#[derive(Debug)]
pub struct HrefExtractor<'a> {
    rest: &'a [u8],
    done: bool,
}

impl<'a> HrefExtractor<'a> {
    /// Scan `html` for anchor hrefs.
    pub fn new(html: &'a [u8]) -> Self {
        Self {
            rest: html,
            done: false,
        }
    }

    fn scan(&mut self) -> Result<Option<String>, MirrorError> {
        loop {
            let Some(open) = self.rest.iter().position(|&b| b == b'<') else {
                self.rest = &[];
                return Ok(None);
            };
            self.rest = &self.rest[open..];

            if self.rest.starts_with(b"<!--") {
                self.skip_past(b"-->", "unterminated comment")?;
            } else if self.rest.starts_with(b"<!") || self.rest.starts_with(b"<?") {
                self.skip_past(b">", "unterminated declaration")?;
            } else if self.rest.starts_with(b"</") {
                self.skip_past(b">", "unterminated end tag")?;
            } else if let Some(href) = self.start_tag()? {
                return Ok(Some(href));
            }
        }
    }

    /// Drop everything up to and including the next `needle`.
    fn skip_past(&mut self, needle: &[u8], truncated: &str) -> Result<(), MirrorError> {
        let hay = &self.rest[1..];
        match hay.windows(needle.len()).position(|w| w == needle) {
            Some(at) => {
                self.rest = &hay[at + needle.len()..];
                Ok(())
            }
            None => {
                self.done = true;
                Err(MirrorError::ListingParse(truncated.to_string()))
            }
        }
    }

    /// Parse one start tag; returns its href when it is an anchor.
    fn start_tag(&mut self) -> Result<Option<String>, MirrorError> {
        let tag = &self.rest[1..];
        let name_len = tag
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric())
            .count();
        if name_len == 0 {
            // stray '<' in text, not markup
            self.rest = tag;
            return Ok(None);
        }
        let is_anchor = tag[..name_len].eq_ignore_ascii_case(b"a");
        let mut cursor = &tag[name_len..];
        let mut href = None;

        loop {
            while let Some((&b, rest)) = cursor.split_first() {
                if b.is_ascii_whitespace() || b == b'/' {
                    cursor = rest;
                } else {
                    break;
                }
            }
            match cursor.first() {
                None => {
                    self.done = true;
                    return Err(MirrorError::ListingParse("unterminated tag".to_string()));
                }
                Some(b'>') => {
                    self.rest = &cursor[1..];
                    return Ok(if is_anchor { href } else { None });
                }
                Some(_) => {}
            }

            let name_end = cursor
                .iter()
                .position(|&b| b.is_ascii_whitespace() || matches!(b, b'=' | b'>' | b'/'))
                .unwrap_or(cursor.len());
            let attr_name = &cursor[..name_end];
            cursor = &cursor[name_end..];

            while let Some((&b, rest)) = cursor.split_first() {
                if b.is_ascii_whitespace() {
                    cursor = rest;
                } else {
                    break;
                }
            }

            let mut value: &[u8] = b"";
            if cursor.first() == Some(&b'=') {
                cursor = &cursor[1..];
                while let Some((&b, rest)) = cursor.split_first() {
                    if b.is_ascii_whitespace() {
                        cursor = rest;
                    } else {
                        break;
                    }
                }
                match cursor.first() {
                    Some(&(quote @ (b'"' | b'\''))) => {
                        let body = &cursor[1..];
                        let Some(end) = body.iter().position(|&b| b == quote) else {
                            self.done = true;
                            return Err(MirrorError::ListingParse(
                                "unterminated attribute value".to_string(),
                            ));
                        };
                        value = &body[..end];
                        cursor = &body[end + 1..];
                    }
                    _ => {
                        let end = cursor
                            .iter()
                            .position(|&b| b.is_ascii_whitespace() || b == b'>')
                            .unwrap_or(cursor.len());
                        value = &cursor[..end];
                        cursor = &cursor[end..];
                    }
                }
            }

            // namespaced attributes (e.g. xlink:href) never count
            if href.is_none()
                && attr_name.eq_ignore_ascii_case(b"href")
                && !attr_name.contains(&b':')
            {
                href = Some(decode_entities(&String::from_utf8_lossy(value)));
            }
        }
    }
}

impl Iterator for HrefExtractor<'_> {
    type Item = Result<String, MirrorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.scan() {
            Ok(Some(href)) => Some(Ok(href)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => Some(Err(err)),
        }
    }
}

/// Decode the common HTML character entities.
///
/// Named forms cover the five predefined XML entities; numeric forms handle
/// `&#NN;` and `&#xHH;`. Anything unrecognized is kept literally.
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        if let Some(semi) = rest[1..].find(';').map(|i| i + 1) {
            let body = &rest[1..semi];
            let decoded = match body {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => body.strip_prefix('#').and_then(|num| {
                    let parsed = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16),
                        None => num.parse(),
                    };
                    parsed.ok().and_then(char::from_u32)
                }),
            };
            if let Some(c) = decoded {
                out.push(c);
                rest = &rest[semi + 1..];
                continue;
            }
        }
        out.push('&');
        rest = &rest[1..];
    }
    out.push_str(rest);
    out
}
