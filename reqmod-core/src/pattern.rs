//! URL filter patterns
//!
//! Compact wildcard/anchor syntax for matching URLs without regular
//! expressions:
//! - `*` matches any run of characters, including none
//! - a leading `||` anchors the match at a domain boundary of the URL's host
//! - a leading `|` anchors at the exact start, a trailing `|` at the exact end
//! - `^` matches one separator (anything but a letter, digit, `_`, `-`, `.`
//!   or `%`) or the end of the URL
//!
//! Matching is ASCII case-insensitive over the full request URL.

use crate::error::EngineError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    None,
    Start,
    Domain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Wildcard,
    Separator,
}

/// A parsed URL filter pattern
#[derive(Debug, Clone)]
pub struct UrlFilter {
    raw: String,
    anchor: Anchor,
    end_anchored: bool,
    tokens: Vec<Token>,
}

impl UrlFilter {
    /// Parse a pattern, rejecting shapes that cannot be evaluated
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(EngineError::invalid_filter(pattern, "empty pattern"));
        }

        let (anchor, body) = if let Some(rest) = pattern.strip_prefix("||") {
            (Anchor::Domain, rest)
        } else if let Some(rest) = pattern.strip_prefix('|') {
            (Anchor::Start, rest)
        } else {
            (Anchor::None, pattern)
        };

        let (body, end_anchored) = match body.strip_suffix('|') {
            Some(rest) => (rest, true),
            None => (body, false),
        };

        if body.contains('|') {
            return Err(EngineError::invalid_filter(
                pattern,
                "'|' is only valid as a leading or trailing anchor",
            ));
        }

        let mut tokens = Vec::new();
        let mut literal = String::new();
        for c in body.chars() {
            match c {
                '*' => {
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    // consecutive wildcards collapse into one
                    if tokens.last() != Some(&Token::Wildcard) {
                        tokens.push(Token::Wildcard);
                    }
                }
                '^' => {
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    tokens.push(Token::Separator);
                }
                c => literal.push(c.to_ascii_lowercase()),
            }
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Ok(Self {
            raw: pattern.to_string(),
            anchor,
            end_anchored,
            tokens,
        })
    }

    /// The original pattern text
    pub fn pattern(&self) -> &str {
        &self.raw
    }

    /// Check whether this filter matches the given URL
    pub fn matches(&self, target: &str) -> bool {
        if target.is_empty() {
            return false;
        }
        let lowered = target.to_ascii_lowercase();
        let url = lowered.as_bytes();

        match self.anchor {
            Anchor::Start => self.match_from(url, 0),
            Anchor::Domain => {
                domain_boundaries(&lowered).any(|start| self.match_from(url, start))
            }
            Anchor::None => (0..=url.len()).any(|start| self.match_from(url, start)),
        }
    }

    fn match_from(&self, url: &[u8], start: usize) -> bool {
        match_tokens(&self.tokens, url, start, self.end_anchored)
    }
}

fn match_tokens(tokens: &[Token], url: &[u8], pos: usize, end_anchored: bool) -> bool {
    let Some((first, rest)) = tokens.split_first() else {
        return !end_anchored || pos == url.len();
    };

    match first {
        Token::Literal(lit) => {
            let lit = lit.as_bytes();
            url.len() - pos >= lit.len()
                && &url[pos..pos + lit.len()] == lit
                && match_tokens(rest, url, pos + lit.len(), end_anchored)
        }
        Token::Separator => {
            if pos == url.len() {
                // end of URL counts as a separator and consumes nothing
                match_tokens(rest, url, pos, end_anchored)
            } else if is_separator(url[pos]) {
                match_tokens(rest, url, pos + 1, end_anchored)
            } else {
                false
            }
        }
        Token::Wildcard => (pos..=url.len()).any(|next| match_tokens(rest, url, next, end_anchored)),
    }
}

fn is_separator(byte: u8) -> bool {
    !(byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'-' | b'.' | b'%'))
}

/// Candidate match positions for a `||` anchor: the start of the host and
/// the position after every `.` inside it
fn domain_boundaries(url: &str) -> impl Iterator<Item = usize> + '_ {
    let host_span = url.find("://").map(|idx| {
        let host_start = idx + 3;
        let host_end = url[host_start..]
            .find(['/', '?', '#'])
            .map(|offset| host_start + offset)
            .unwrap_or(url.len());
        (host_start, host_end)
    });

    host_span
        .into_iter()
        .flat_map(move |(host_start, host_end)| {
            std::iter::once(host_start).chain(
                url.as_bytes()[host_start..host_end]
                    .iter()
                    .enumerate()
                    .filter(|(_, b)| **b == b'.')
                    .map(move |(i, _)| host_start + i + 1),
            )
        })
}
