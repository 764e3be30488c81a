//! # URL Components
//!
//! Lenient splitting of a URL string into `(scheme, netloc, path, query,
//! fragment)`, per-component percent-encoding, and reassembly. The rules
//! are the permissive ones of classic `urlsplit`/`urlunsplit`: nothing is
//! validated except bracket balance in the network location, and any
//! string splits into some set of components.
//!
//! Quoting escapes every byte outside `A-Za-z0-9_.-/`. It is applied to
//! each component separately, so `:` and `@` inside the network location
//! and `=`/`&` inside the query are escaped too.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;

/// Bytes left unescaped by [`quote_component`]: alphanumerics plus `_ . - /`.
const COMPONENT_QUOTE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'/');

/// Schemes whose reassembled form carries a `//` network-location marker.
const USES_NETLOC: &[&str] = &[
    "ftp", "http", "gopher", "nntp", "telnet", "imap", "wais", "file", "mms", "https", "shttp",
    "snews", "prospero", "rtsp", "rtspu", "rsync", "svn", "svn+ssh", "sftp", "nfs", "git",
    "git+ssh",
];

/// A URL that cannot be split.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlSplitError {
    #[error("Invalid IPv6 URL")]
    UnbalancedBrackets,
}

/// The five components of a URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParts {
    pub scheme: String,
    pub netloc: String,
    pub path: String,
    pub query: String,
    pub fragment: String,
}

impl UrlParts {
    /// Percent-encode every component with [`quote_component`].
    pub fn quoted(&self) -> UrlParts {
        UrlParts {
            scheme: quote_component(&self.scheme),
            netloc: quote_component(&self.netloc),
            path: quote_component(&self.path),
            query: quote_component(&self.query),
            fragment: quote_component(&self.fragment),
        }
    }

    /// Reassemble the components into a URL string.
    pub fn unsplit(&self) -> String {
        let mut url = self.path.clone();
        let wants_netloc = !self.scheme.is_empty()
            && USES_NETLOC.contains(&self.scheme.as_str())
            && !url.starts_with("//");
        if !self.netloc.is_empty() || wants_netloc {
            if !url.is_empty() && !url.starts_with('/') {
                url.insert(0, '/');
            }
            url = format!("//{}{url}", self.netloc);
        }
        if !self.scheme.is_empty() {
            url = format!("{}:{url}", self.scheme);
        }
        if !self.query.is_empty() {
            url.push('?');
            url.push_str(&self.query);
        }
        if !self.fragment.is_empty() {
            url.push('#');
            url.push_str(&self.fragment);
        }
        url
    }
}

/// Percent-encode `component`, leaving `A-Za-z0-9_.-/` as is.
pub fn quote_component(component: &str) -> String {
    utf8_percent_encode(component, COMPONENT_QUOTE_SET).to_string()
}

fn is_scheme_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')
}

/// Split `url` into its components.
///
/// A scheme is recognized when the text before the first `:` is non-empty,
/// made only of scheme characters, and what follows is not a bare port
/// number. The scheme is lowercased; nothing else is altered.
///
/// # Errors
///
/// [`UrlSplitError::UnbalancedBrackets`] if the network location has a `[`
/// without `]` or the reverse.
pub fn split_url(url: &str) -> Result<UrlParts, UrlSplitError> {
    let mut parts = UrlParts::default();
    let mut rest = url;

    if let Some(colon) = url.find(':').filter(|&i| i > 0) {
        let candidate = &url[..colon];
        let after = &url[colon + 1..];
        if candidate == "http" {
            parts.scheme = candidate.to_string();
            rest = after;
        } else if candidate.chars().all(is_scheme_char)
            && (after.is_empty() || !after.chars().all(|c| c.is_ascii_digit()))
        {
            parts.scheme = candidate.to_ascii_lowercase();
            rest = after;
        }
    }

    if let Some(body) = rest.strip_prefix("//") {
        let end = body.find(['/', '?', '#']).unwrap_or(body.len());
        let netloc = &body[..end];
        if netloc.contains('[') != netloc.contains(']') {
            return Err(UrlSplitError::UnbalancedBrackets);
        }
        parts.netloc = netloc.to_string();
        rest = &body[end..];
    }

    if let Some((before, fragment)) = rest.split_once('#') {
        parts.fragment = fragment.to_string();
        rest = before;
    }
    if let Some((before, query)) = rest.split_once('?') {
        parts.query = query.to_string();
        rest = before;
    }
    parts.path = rest.to_string();
    Ok(parts)
}
