//! Search-box keyword extraction.
//!
//! Operators type a single line into the search box. Four keywords can be
//! mixed with ordinary free text:
//!
//! | Keyword | Field | Example |
//! |---------|-------|---------|
//! | `http:` | HTTP status | `http:500` |
//! | `ip:` | client address | `ip:10.0.0.7` |
//! | `url:` | request URL | `url:/api/orders` or `url:'/a path/with spaces'` |
//! | `service:` | service name | `service:'billing api'` |
//!
//! # Rules
//!
//! - A keyword only counts at the start of the text or right after
//!   whitespace, so `ghttp:500` or `testurl:x` are plain words.
//! - The value follows the colon directly. A leading `'` starts a quoted
//!   value that runs to the next `'`; without a closing quote nothing is
//!   extracted. Otherwise the value is the run of non-whitespace characters.
//! - An empty value (`url:`, `url: x`, `url:''`) is not a match.
//! - Each keyword is taken once; later occurrences stay in the free text.
//! - A matched span, plus at most one whitespace character right after it,
//!   is cut out of the text. Everything else is kept byte for byte.
//!
//! Parsing is total: every input, including `None`, produces a value.
//!
//! ```rust
//! use logsift_fts::ParsedQuery;
//!
//! let parsed = ParsedQuery::parse("http:500 timeout url:'/orders/new' retry");
//! assert_eq!(parsed.http_status(), Some("500"));
//! assert_eq!(parsed.url(), Some("/orders/new"));
//! assert_eq!(parsed.free_text(), "timeout retry");
//! ```

use std::fmt;
use std::ops::Range;

use serde::Serialize;

const QUOTE: char = '\'';

/// A search-box keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    /// `http:`: HTTP status code.
    Http,
    /// `ip:`: client IP address.
    Ip,
    /// `url:`: request URL.
    Url,
    /// `service:`: service name.
    Service,
}

impl Keyword {
    /// All keywords, in the order they are tried at a given position.
    pub const ALL: [Keyword; 4] = [Keyword::Http, Keyword::Ip, Keyword::Url, Keyword::Service];

    /// Keyword name as typed, without the colon.
    pub fn name(self) -> &'static str {
        match self {
            Keyword::Http => "http",
            Keyword::Ip => "ip",
            Keyword::Url => "url",
            Keyword::Service => "service",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.name())
    }
}

/// Structured result of interpreting a search-box string.
///
/// Built once by [`ParsedQuery::parse`] and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    http_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    service: Option<String>,
    free_text: String,
    #[serde(skip)]
    consumed: Vec<Range<usize>>,
}

impl ParsedQuery {
    /// Parse a search-box string.
    pub fn parse(text: &str) -> Self {
        let mut parsed = ParsedQuery::default();
        let mut free_text = String::with_capacity(text.len());
        let mut copied_up_to = 0;
        let mut pos = 0;
        let mut at_boundary = true;

        while pos < text.len() {
            if at_boundary {
                if let Some((keyword, value, end)) = parsed.match_at(text, pos) {
                    let separator = separator_len(&text[end..]);
                    let span_end = end + separator;

                    free_text.push_str(&text[copied_up_to..pos]);
                    parsed.set(keyword, value.to_string());
                    parsed.consumed.push(pos..span_end);

                    copied_up_to = span_end;
                    pos = span_end;
                    at_boundary = separator > 0;
                    continue;
                }
            }

            let Some(ch) = text[pos..].chars().next() else {
                break;
            };
            at_boundary = ch.is_whitespace();
            pos += ch.len_utf8();
        }

        free_text.push_str(&text[copied_up_to..]);
        parsed.free_text = free_text;
        parsed
    }

    /// Parse an optional string; `None` behaves like the empty string.
    pub fn parse_optional(text: Option<&str>) -> Self {
        text.map(Self::parse).unwrap_or_default()
    }

    /// Value of the `http:` keyword.
    pub fn http_status(&self) -> Option<&str> {
        self.http_status.as_deref()
    }

    /// Value of the `ip:` keyword.
    pub fn client_ip(&self) -> Option<&str> {
        self.client_ip.as_deref()
    }

    /// Value of the `url:` keyword.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Value of the `service:` keyword.
    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    /// Text left over once the matched keyword spans are removed.
    pub fn free_text(&self) -> &str {
        &self.free_text
    }

    /// Value extracted for `keyword`, if any.
    pub fn get(&self, keyword: Keyword) -> Option<&str> {
        match keyword {
            Keyword::Http => self.http_status(),
            Keyword::Ip => self.client_ip(),
            Keyword::Url => self.url(),
            Keyword::Service => self.service(),
        }
    }

    /// Byte ranges of the original text that were removed, in order.
    pub fn consumed_spans(&self) -> &[Range<usize>] {
        &self.consumed
    }

    /// True when no keyword matched and the free text is blank.
    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty() && self.free_text.trim().is_empty()
    }

    fn set(&mut self, keyword: Keyword, value: String) {
        let slot = match keyword {
            Keyword::Http => &mut self.http_status,
            Keyword::Ip => &mut self.client_ip,
            Keyword::Url => &mut self.url,
            Keyword::Service => &mut self.service,
        };
        *slot = Some(value);
    }

    /// Try every still-unmatched keyword at `pos`.
    ///
    /// Returns the keyword, its value and the byte offset just past the
    /// value (past the closing quote for quoted values).
    fn match_at<'t>(&self, text: &'t str, pos: usize) -> Option<(Keyword, &'t str, usize)> {
        let rest = &text[pos..];
        Keyword::ALL
            .into_iter()
            .filter(|keyword| self.get(*keyword).is_none())
            .find_map(|keyword| {
                let after = rest.strip_prefix(keyword.name())?.strip_prefix(':')?;
                let value_start = pos + keyword.name().len() + 1;
                let (value, len) = read_value(after)?;
                Some((keyword, value, value_start + len))
            })
    }
}

/// Read a keyword value from the text right after the colon.
///
/// Returns the value and how many bytes it occupies in `s`.
fn read_value(s: &str) -> Option<(&str, usize)> {
    let first = s.chars().next()?;

    if first == QUOTE {
        let body = &s[QUOTE.len_utf8()..];
        let close = body.find(QUOTE)?;
        if close == 0 {
            return None;
        }
        return Some((&body[..close], close + 2 * QUOTE.len_utf8()));
    }

    if first.is_whitespace() {
        return None;
    }

    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    Some((&s[..end], end))
}

/// Length of the single whitespace separator at the start of `s`, if any.
fn separator_len(s: &str) -> usize {
    s.chars()
        .next()
        .filter(|c| c.is_whitespace())
        .map_or(0, char::len_utf8)
}

// ============================================================================
// Tests
// ============================================================================
