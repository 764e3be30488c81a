//! # HTML and Link Collaborators
//!
//! The engine hands `html` values to an [`HtmlSanitizer`] and asks a
//! [`LinkPolicy`] whether a raw URL may be used as a link target. Both are
//! traits so callers can plug in their own; the defaults here are
//! deliberately small.
//!
//! ## Default link policy
//!
//! [`HttpLinkPolicy`] accepts any `title` or `target` attribute. An `href`
//! is accepted only when its scheme is `http` or `https` and it contains
//! no ASCII control characters. Nothing else about the URL is checked.
//! Every other attribute is refused.
//!
//! ## Default sanitizer
//!
//! [`AllowlistSanitizer`] is a single-pass tag filter:
//!
//! - allowed tags are re-emitted in lowercase with only the attributes the
//!   link policy accepts (and only on `<a>`);
//! - `script` and `style` elements are dropped with their content;
//! - comments, declarations and processing instructions are dropped;
//! - any other tag is removed and its content kept;
//! - a `<` that does not open a well-formed tag becomes `&lt;`.
//!
//! Text is never entity-decoded or re-encoded, so the output is a fixed
//! point: sanitizing it again returns it unchanged.

use std::collections::BTreeSet;

use crate::url::split_url;

/// Decides whether an attribute value may be used as a link target.
pub trait LinkPolicy: Send + Sync {
    /// `attribute` is the attribute name (for example `href`); `value` is
    /// the raw, unescaped attribute value.
    fn is_acceptable(&self, attribute: &str, value: &str) -> bool;
}

/// Link policy restricting `href` targets to the http(s) schemes.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpLinkPolicy;

impl HttpLinkPolicy {
    fn is_acceptable_href(value: &str) -> bool {
        if value.chars().any(|c| c.is_ascii_control()) {
            return false;
        }
        split_url(value)
            .map(|parts| matches!(parts.scheme.as_str(), "http" | "https"))
            .unwrap_or(false)
    }
}

impl LinkPolicy for HttpLinkPolicy {
    fn is_acceptable(&self, attribute: &str, value: &str) -> bool {
        match attribute {
            "title" | "target" => true,
            "href" => {
                let ok = Self::is_acceptable_href(value);
                if !ok {
                    tracing::warn!(href = %value, "rejected link target");
                }
                ok
            }
            _ => false,
        }
    }
}

/// Cleans untrusted HTML.
pub trait HtmlSanitizer: Send + Sync {
    /// Return a cleaned version of `html`, or a message describing why it
    /// cannot be cleaned.
    fn sanitize(&self, html: &str) -> Result<String, String>;
}

/// Tags kept by [`AllowlistSanitizer::default`].
pub const DEFAULT_ALLOWED_TAGS: &[&str] = &[
    "a", "b", "blockquote", "br", "code", "div", "em", "hr", "i", "li", "ol", "p", "pre", "span",
    "strong", "sub", "sup", "u", "ul",
];

const VOID_TAGS: &[&str] = &["br", "hr"];
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

/// Tag allow-list sanitizer.
pub struct AllowlistSanitizer {
    allowed_tags: BTreeSet<String>,
    links: Box<dyn LinkPolicy>,
}

impl Default for AllowlistSanitizer {
    fn default() -> Self {
        Self::with_tags(DEFAULT_ALLOWED_TAGS.iter().copied())
    }
}

impl std::fmt::Debug for AllowlistSanitizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllowlistSanitizer")
            .field("allowed_tags", &self.allowed_tags)
            .finish_non_exhaustive()
    }
}

impl AllowlistSanitizer {
    /// Sanitizer keeping exactly `tags` (case-insensitive), with the
    /// default [`HttpLinkPolicy`] for link attributes.
    pub fn with_tags<S: AsRef<str>>(tags: impl IntoIterator<Item = S>) -> Self {
        Self {
            allowed_tags: tags
                .into_iter()
                .map(|t| t.as_ref().to_ascii_lowercase())
                .filter(|t| !RAW_TEXT_TAGS.contains(&t.as_str()))
                .collect(),
            links: Box::new(HttpLinkPolicy),
        }
    }

    pub fn with_link_policy(mut self, links: impl LinkPolicy + 'static) -> Self {
        self.links = Box::new(links);
        self
    }

    pub fn allowed_tags(&self) -> impl Iterator<Item = &str> {
        self.allowed_tags.iter().map(String::as_str)
    }

    fn emit_tag(&self, tag: &Tag<'_>, out: &mut String) {
        if tag.closing {
            if !VOID_TAGS.contains(&tag.name.as_str()) {
                out.push_str("</");
                out.push_str(&tag.name);
                out.push('>');
            }
            return;
        }
        out.push('<');
        out.push_str(&tag.name);
        if tag.name == "a" {
            for (name, value) in &tag.attributes {
                if self.links.is_acceptable(name, value) {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value));
                    out.push('"');
                }
            }
        }
        out.push('>');
    }
}

impl HtmlSanitizer for AllowlistSanitizer {
    fn sanitize(&self, html: &str) -> Result<String, String> {
        let mut out = String::with_capacity(html.len());
        let mut rest = html;

        while let Some(open) = rest.find('<') {
            out.push_str(&rest[..open]);
            rest = &rest[open..];

            if let Some(after) = rest.strip_prefix("<!--") {
                // `<!-->` and `<!--->` are complete, empty comments.
                rest = if let Some(tail) = after.strip_prefix('>') {
                    tail
                } else if let Some(tail) = after.strip_prefix("->") {
                    tail
                } else {
                    after.find("-->").map_or("", |end| &after[end + 3..])
                };
                continue;
            }
            if rest.starts_with("<!") || rest.starts_with("<?") {
                match rest.find('>') {
                    Some(end) => rest = &rest[end + 1..],
                    None => {
                        out.push_str("&lt;");
                        rest = &rest[1..];
                    }
                }
                continue;
            }

            let Some((tag, consumed)) = parse_tag(rest) else {
                out.push_str("&lt;");
                rest = &rest[1..];
                continue;
            };
            rest = &rest[consumed..];

            if RAW_TEXT_TAGS.contains(&tag.name.as_str()) {
                if !tag.closing {
                    rest = skip_raw_text(rest, &tag.name);
                }
                tracing::debug!(tag = %tag.name, "dropped raw text element");
                continue;
            }
            if self.allowed_tags.contains(&tag.name) {
                self.emit_tag(&tag, &mut out);
            } else {
                tracing::debug!(tag = %tag.name, "removed disallowed tag");
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}

struct Tag<'a> {
    name: String,
    closing: bool,
    attributes: Vec<(String, &'a str)>,
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Skip past the `</name ...>` that closes a raw text element. Without one,
/// the rest of the input is dropped.
fn skip_raw_text<'a>(input: &'a str, name: &str) -> &'a str {
    let needle = format!("</{name}");
    let lower = input.to_ascii_lowercase();
    match lower.find(&needle) {
        Some(start) => match input[start..].find('>') {
            Some(end) => &input[start + end + 1..],
            None => "",
        },
        None => "",
    }
}

/// Parse a start or end tag at the beginning of `input` (which starts with
/// `<`). Returns the tag and the number of bytes it spans, or `None` when
/// the text is not a well-formed tag.
fn parse_tag(input: &str) -> Option<(Tag<'_>, usize)> {
    let bytes = input.as_bytes();
    let mut pos = 1;
    let closing = bytes.get(pos) == Some(&b'/');
    if closing {
        pos += 1;
    }

    let name_start = pos;
    if !bytes.get(pos).is_some_and(u8::is_ascii_alphabetic) {
        return None;
    }
    while bytes.get(pos).is_some_and(u8::is_ascii_alphanumeric) {
        pos += 1;
    }
    let name = input[name_start..pos].to_ascii_lowercase();

    let mut attributes = Vec::new();
    loop {
        while bytes.get(pos).is_some_and(u8::is_ascii_whitespace) {
            pos += 1;
        }
        match bytes.get(pos)? {
            b'>' => {
                pos += 1;
                break;
            }
            b'/' => {
                pos += 1;
                continue;
            }
            _ => {}
        }

        let attr_start = pos;
        while bytes
            .get(pos)
            .is_some_and(|b| !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/'))
        {
            pos += 1;
        }
        let attr_name = input[attr_start..pos].to_ascii_lowercase();

        while bytes.get(pos).is_some_and(u8::is_ascii_whitespace) {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b'=') {
            attributes.push((attr_name, ""));
            continue;
        }
        pos += 1;
        while bytes.get(pos).is_some_and(u8::is_ascii_whitespace) {
            pos += 1;
        }
        let value = match bytes.get(pos)? {
            quote @ (b'"' | b'\'') => {
                let start = pos + 1;
                let len = input[start..].find(*quote as char)?;
                pos = start + len + 1;
                &input[start..start + len]
            }
            _ => {
                let start = pos;
                while bytes
                    .get(pos)
                    .is_some_and(|b| !b.is_ascii_whitespace() && *b != b'>')
                {
                    pos += 1;
                }
                &input[start..pos]
            }
        };
        attributes.push((attr_name, value));
    }

    Some((
        Tag {
            name,
            closing,
            attributes,
        },
        pos,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(html: &str) -> String {
        AllowlistSanitizer::default().sanitize(html).unwrap()
    }

    #[test]
    fn test_link_policy_href() {
        let policy = HttpLinkPolicy;
        assert!(policy.is_acceptable("href", "http://example.com/a b"));
        assert!(policy.is_acceptable("href", "https://example.com"));
        assert!(!policy.is_acceptable("href", "javascript:alert(1)"));
        assert!(!policy.is_acceptable("href", "ftp://example.com"));
        assert!(!policy.is_acceptable("href", "//example.com"));
        assert!(!policy.is_acceptable("href", "mailto:a@example.com"));
        assert!(!policy.is_acceptable("href", "http://exa\nmple.com"));
    }

    #[test]
    fn test_link_policy_checks_scheme_only() {
        let policy = HttpLinkPolicy;
        assert!(policy.is_acceptable("href", "http://exa mple.com/"));
        assert!(policy.is_acceptable("href", "HTTPS://example.com"));
        assert!(policy.is_acceptable("href", "http://"));
    }

    #[test]
    fn test_link_policy_other_attributes() {
        let policy = HttpLinkPolicy;
        assert!(policy.is_acceptable("title", "anything"));
        assert!(policy.is_acceptable("target", "_blank"));
        assert!(!policy.is_acceptable("onclick", "alert(1)"));
    }

    #[test]
    fn test_allowed_markup_unchanged() {
        assert_eq!(clean("Some <b>HTML</b>"), "Some <b>HTML</b>");
        assert_eq!(clean("<span><b>d</b>ef</span>"), "<span><b>d</b>ef</span>");
        assert_eq!(clean("<p>a<br>b</p>"), "<p>a<br>b</p>");
    }

    #[test]
    fn test_tags_lowercased_and_attributes_dropped() {
        assert_eq!(clean("<B class=\"x\">t</B>"), "<b>t</b>");
        assert_eq!(clean("<br/>"), "<br>");
    }

    #[test]
    fn test_disallowed_tags_unwrapped() {
        assert_eq!(clean("<font color=red>hi</font>"), "hi");
        assert_eq!(clean("<img src=\"x.png\" onerror=\"alert(1)\">"), "");
    }

    #[test]
    fn test_script_and_style_removed_with_content() {
        assert_eq!(clean("a<script>alert('<b>')</script>b"), "ab");
        assert_eq!(clean("a<STYLE>p{}</Style >b"), "ab");
        assert_eq!(clean("a<script>never closed"), "a");
    }

    #[test]
    fn test_comments_and_declarations_removed() {
        assert_eq!(clean("a<!-- hidden -->b"), "ab");
        assert_eq!(clean("<!DOCTYPE html>x"), "x");
        assert_eq!(clean("a<!-- unterminated"), "a");
    }

    #[test]
    fn test_empty_comments_end_at_first_close() {
        assert_eq!(clean("a<!-->b <b>c</b>"), "ab <b>c</b>");
        assert_eq!(clean("a<!--->b"), "ab");
        assert_eq!(clean("a<!---->b"), "ab");
    }

    #[test]
    fn test_stray_angle_brackets_escaped() {
        assert_eq!(clean("1 < 2"), "1 &lt; 2");
        assert_eq!(clean("a <b"), "a &lt;b");
    }

    #[test]
    fn test_link_attributes_filtered() {
        assert_eq!(
            clean("<a href=\"https://example.com\" title='t' onclick=\"x()\">l</a>"),
            "<a href=\"https://example.com\" title=\"t\">l</a>"
        );
        assert_eq!(clean("<a href=\"javascript:alert(1)\">l</a>"), "<a>l</a>");
    }

    #[test]
    fn test_quoted_attribute_may_contain_angle_bracket() {
        assert_eq!(
            clean("<a title=\"1 > 0\">x</a>"),
            "<a title=\"1 &gt; 0\">x</a>"
        );
    }

    #[test]
    fn test_output_is_fixed_point() {
        let inputs = [
            "Some <b>HTML</b>",
            "<a title='say \"hi\"' href=http://example.com/x>go</a> <i>x</i> < 3",
            "<div><script>bad()</script><ul><li>one<li>two</ul></div>",
            "<p onclick=x>1 &amp; 2</p><!-- c -->",
        ];
        for input in inputs {
            let once = clean(input);
            assert_eq!(clean(&once), once, "not a fixed point for {input:?}");
        }
    }

    #[test]
    fn test_custom_allow_list() {
        let sanitizer = AllowlistSanitizer::with_tags(["P", "script"]);
        assert_eq!(sanitizer.allowed_tags().collect::<Vec<_>>(), vec!["p"]);
        assert_eq!(sanitizer.sanitize("<p><b>x</b></p>").unwrap(), "<p>x</p>");
    }
}
