//! Data-binding token lexer
//!
//! Tokens are written directly into slide text by template authors:
//! `{{name}}` for a scalar, `{{#name}}` to open a repeated section and
//! `{{/name}}` to close it. Identifiers may contain letters, digits,
//! underscore, dot and hyphen.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

const TOKEN_PATTERN: &str = r"\{\{([#/]?)([A-Za-z0-9_.\-]+)\}\}";

fn token_regex() -> &'static Regex {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    TOKEN_RE.get_or_init(|| Regex::new(TOKEN_PATTERN).expect("token pattern is a valid regex"))
}

/// A lexical unit recognized in part text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Scalar(String),
    LoopOpen(String),
    LoopClose(String),
}

impl Token {
    pub fn name(&self) -> &str {
        match self {
            Token::Scalar(n) | Token::LoopOpen(n) | Token::LoopClose(n) => n,
        }
    }
}

/// A token together with its byte span in the scanned text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedToken {
    pub token: Token,
    pub start: usize,
    pub end: usize,
}

/// Deduplicated field names found in one or more texts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub scalars: BTreeSet<String>,
    pub loops: BTreeSet<String>,
}

impl TokenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set union with another token set
    pub fn merge(&mut self, other: TokenSet) {
        self.scalars.extend(other.scalars);
        self.loops.extend(other.loops);
    }

    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty() && self.loops.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scalars.contains(name) || self.loops.contains(name)
    }
}

/// Scan text and return every token with its position, in document order
pub fn scan(text: &str) -> Vec<LocatedToken> {
    token_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(2)?.as_str().to_string();
            let token = match caps.get(1).map(|m| m.as_str()) {
                Some("#") => Token::LoopOpen(name),
                Some("/") => Token::LoopClose(name),
                _ => Token::Scalar(name),
            };
            Some(LocatedToken { token, start: whole.start(), end: whole.end() })
        })
        .collect()
}

/// Extract scalar field names and loop names from text.
///
/// Closing tags are not part of the advertised field surface and are dropped.
pub fn extract(text: &str) -> TokenSet {
    let mut set = TokenSet::new();
    for located in scan(text) {
        match located.token {
            Token::Scalar(name) => {
                set.scalars.insert(name);
            }
            Token::LoopOpen(name) => {
                set.loops.insert(name);
            }
            Token::LoopClose(_) => {}
        }
    }
    set
}

/// Where the healing scan is in the markup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Markup {
    Text,
    /// Inside a tag, with the open attribute quote if any
    Tag(Option<u8>),
    /// Comment or processing instruction, skipped up to the terminator
    Until(&'static str),
    /// CDATA content counts as text
    CData,
}

/// Rejoin tokens that an editor split across several text runs.
///
/// Only character data is considered; markup between the pieces is kept in
/// place and the complete token is moved to where its first piece started.
/// Returns the input unchanged when nothing was split.
pub fn heal_split_tokens(xml: &str) -> Cow<'_, str> {
    if !xml.contains('{') {
        return Cow::Borrowed(xml);
    }

    let bytes = xml.as_bytes();
    let mut text = String::with_capacity(xml.len() / 2);
    let mut origin: Vec<usize> = Vec::with_capacity(xml.len() / 2);
    let mut state = Markup::Text;
    let mut skip_to = 0;

    for (i, ch) in xml.char_indices() {
        if i < skip_to {
            continue;
        }
        let b = bytes[i];
        match state {
            Markup::Text | Markup::CData => {
                let rest = &xml[i..];
                if state == Markup::CData {
                    if rest.starts_with("]]>") {
                        state = Markup::Text;
                        skip_to = i + 3;
                        continue;
                    }
                } else if b == b'<' {
                    (state, skip_to) = if rest.starts_with("<!--") {
                        (Markup::Until("-->"), i + 4)
                    } else if rest.starts_with("<![CDATA[") {
                        (Markup::CData, i + 9)
                    } else if rest.starts_with("<?") {
                        (Markup::Until("?>"), i + 2)
                    } else {
                        (Markup::Tag(None), i + 1)
                    };
                    continue;
                }
                text.push(ch);
                for offset in 0..ch.len_utf8() {
                    origin.push(i + offset);
                }
            }
            Markup::Tag(quote) => match quote {
                Some(q) if b == q => state = Markup::Tag(None),
                Some(_) => {}
                None if b == b'"' || b == b'\'' => state = Markup::Tag(Some(b)),
                None if b == b'>' => state = Markup::Text,
                None => {}
            },
            Markup::Until(end) => {
                if xml[i..].starts_with(end) {
                    state = Markup::Text;
                    skip_to = i + end.len();
                }
            }
        }
    }

    // original byte -> replacement text, for each split token's first byte
    let mut inserts: BTreeMap<usize, &str> = BTreeMap::new();
    let mut dropped = vec![false; xml.len()];
    let mut healed_any = false;

    for m in token_regex().find_iter(&text) {
        let (s, e) = (m.start(), m.end());
        let contiguous = origin[e - 1] - origin[s] == e - 1 - s;
        if contiguous {
            continue;
        }
        healed_any = true;
        inserts.insert(origin[s], m.as_str());
        for &pos in &origin[s..e] {
            dropped[pos] = true;
        }
    }

    if !healed_any {
        return Cow::Borrowed(xml);
    }

    let mut out = String::with_capacity(xml.len());
    for (i, ch) in xml.char_indices() {
        if let Some(token) = inserts.get(&i) {
            out.push_str(token);
        }
        if !dropped[i] {
            out.push(ch);
        }
    }
    tracing::debug!(healed = inserts.len(), "rejoined split tokens");
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_extract_kinds() {
        let set = extract("<a:t>{{project_name}}</a:t>{{#workstations}}{{name}}{{/workstations}}");
        assert!(set.scalars.contains("project_name"));
        assert!(set.scalars.contains("name"));
        assert!(set.loops.contains("workstations"));
        assert_eq!(set.scalars.len(), 2);
        assert_eq!(set.loops.len(), 1);
    }

    #[test]
    fn test_extract_deduplicates() {
        let set = extract("{{a}} {{a}} {{#l}}{{/l}}{{#l}}{{/l}}");
        assert_eq!(set.scalars.len(), 1);
        assert_eq!(set.loops.len(), 1);
    }

    #[test]
    fn test_identifier_characters() {
        let set = extract("{{camera.model}} {{lens-mount}} {{ws_2}}");
        assert!(set.scalars.contains("camera.model"));
        assert!(set.scalars.contains("lens-mount"));
        assert!(set.scalars.contains("ws_2"));
    }

    #[test]
    fn test_rejects_malformed() {
        let set = extract("{{ spaced }} {single} {{}} {{a b}} {{#}}");
        assert!(set.is_empty());
    }

    #[test]
    fn test_scan_positions() {
        let text = "ab{{x}}cd{{/y}}";
        let tokens = scan(text);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].token, Token::Scalar("x".into()));
        assert_eq!(&text[tokens[0].start..tokens[0].end], "{{x}}");
        assert_eq!(tokens[1].token, Token::LoopClose("y".into()));
    }

    #[test]
    fn test_heal_split_token() {
        let xml = "<a:r><a:t>Hello {{na</a:t></a:r><a:r><a:t>me}}!</a:t></a:r>";
        let healed = heal_split_tokens(xml);
        assert_eq!(
            healed,
            "<a:r><a:t>Hello {{name}}</a:t></a:r><a:r><a:t>!</a:t></a:r>"
        );
    }

    #[test]
    fn test_heal_split_braces() {
        let xml = r#"<a:t>{</a:t><a:t b="}">{#ws}</a:t><a:t>}</a:t>"#;
        let healed = heal_split_tokens(xml);
        assert_eq!(healed, r#"<a:t>{{#ws}}</a:t><a:t b="}"></a:t><a:t></a:t>"#);
        assert!(extract(&healed).loops.contains("ws"));
    }

    #[test]
    fn test_heal_leaves_intact_text_borrowed() {
        let xml = "<a:t>{{name}}</a:t><a:t>{{other}}</a:t>";
        assert!(matches!(heal_split_tokens(xml), Cow::Borrowed(_)));
        assert!(matches!(heal_split_tokens("<a:t>plain</a:t>"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_heal_ignores_quotes_in_comments() {
        let xml = "<!-- don't --><a:t>{{na</a:t><a:t>me}}</a:t><?mso-app it's?><a:t>{{x</a:t><a:t>}}</a:t>";
        let healed = heal_split_tokens(xml);
        assert_eq!(
            healed,
            "<!-- don't --><a:t>{{name}}</a:t><a:t></a:t><?mso-app it's?><a:t>{{x}}</a:t><a:t></a:t>"
        );
    }

    #[test]
    fn test_heal_cdata_content_is_text() {
        let xml = "<a:t><![CDATA[it's {{na]]></a:t><a:t>me}}</a:t><a:t>'{{a</a:t><a:t>b}}</a:t>";
        let healed = heal_split_tokens(xml);
        assert_eq!(
            healed,
            "<a:t><![CDATA[it's {{name}}]]></a:t><a:t></a:t><a:t>'{{ab}}</a:t><a:t></a:t>"
        );
    }

    #[test]
    fn test_heal_multibyte_text() {
        let xml = "<a:t>Größe: {{gr</a:t><a:t>oesse}} µm</a:t>";
        let healed = heal_split_tokens(xml);
        assert_eq!(healed, "<a:t>Größe: {{groesse}}</a:t><a:t> µm</a:t>");
    }

    proptest! {
        #[test]
        fn prop_extract_is_deterministic(text in ".{0,200}") {
            prop_assert_eq!(extract(&text), extract(&text));
        }

        #[test]
        fn prop_extract_finds_generated_names(names in proptest::collection::vec("[a-z][a-z0-9_]{0,8}", 1..6)) {
            let text: String = names.iter().map(|n| format!("<a:t>{{{{{}}}}}</a:t>", n)).collect();
            let set = extract(&text);
            for name in &names {
                prop_assert!(set.scalars.contains(name));
            }
        }
    }
}
