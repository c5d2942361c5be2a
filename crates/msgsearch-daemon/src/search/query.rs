//! Turning user input into FTS5 match expressions.

use std::fmt;

use tracing::debug;

/// Wraps a literal phrase in the FTS5 query language.
const PHRASE_DELIMITER: char = '"';

/// Suffix making a phrase match any token it is a prefix of.
const PREFIX_MARKER: char = '*';

/// Quote `token` as an FTS5 phrase, doubling embedded quotes.
///
/// The result is matched literally: operators such as `AND`, `NEAR`, `-`
/// or column filters typed by the user lose their meaning.
pub fn full_text_search_escape(token: &str) -> String {
    let mut escaped = String::with_capacity(token.len() + 2);
    escaped.push(PHRASE_DELIMITER);
    for c in token.chars() {
        if c == PHRASE_DELIMITER {
            escaped.push(PHRASE_DELIMITER);
        }
        escaped.push(c);
    }
    escaped.push(PHRASE_DELIMITER);
    escaped
}

/// Inverse of [`full_text_search_escape`]. `None` if `escaped` is not a
/// well-formed phrase.
pub fn unescape_phrase(escaped: &str) -> Option<String> {
    let inner = escaped
        .strip_prefix(PHRASE_DELIMITER)?
        .strip_suffix(PHRASE_DELIMITER)?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == PHRASE_DELIMITER && chars.next() != Some(PHRASE_DELIMITER) {
            return None;
        }
        out.push(c);
    }
    Some(out)
}

/// A non-empty match expression built from user input.
///
/// Each whitespace-separated term becomes a quoted prefix phrase; FTS5 ANDs
/// adjacent phrases together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtsQuery {
    expression: String,
    tokens: Vec<String>,
}

impl FtsQuery {
    /// Build the expression for `raw`, or `None` if it has no terms.
    pub fn parse(raw: &str) -> Option<Self> {
        let tokens: Vec<String> = raw
            .split_whitespace()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();

        if tokens.is_empty() {
            debug!("Search input has no terms");
            return None;
        }

        let expression = tokens
            .iter()
            .map(|token| {
                let mut phrase = full_text_search_escape(token);
                phrase.push(PREFIX_MARKER);
                phrase
            })
            .collect::<Vec<_>>()
            .join(" ");

        debug!("Built match expression {}", expression);
        Some(Self { expression, tokens })
    }

    /// The expression to bind to `MATCH`.
    pub fn as_str(&self) -> &str {
        &self.expression
    }

    /// Terms as typed, in order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl fmt::Display for FtsQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_two_words() {
        let query = FtsQuery::parse("hello world").unwrap();
        assert_eq!(query.tokens(), ["hello", "world"]);
        assert_eq!(query.as_str(), r#""hello"* "world"*"#);
    }

    #[test]
    fn test_embedded_quotes_are_doubled() {
        let query = FtsQuery::parse(r#"say "hi""#).unwrap();
        assert_eq!(query.tokens(), ["say", r#""hi""#]);
        assert_eq!(query.as_str(), r#""say"* """hi"""*"#);
    }

    #[test]
    fn test_lone_delimiter_token() {
        assert_eq!(full_text_search_escape("\""), "\"\"\"\"");
        assert_eq!(full_text_search_escape("\"\""), "\"\"\"\"\"\"");
        assert_eq!(
            FtsQuery::parse(" \" ").unwrap().as_str(),
            "\"\"\"\"*"
        );
    }

    #[test]
    fn test_query_syntax_is_neutralized() {
        let query = FtsQuery::parse("body:x NEAR(a b) -c").unwrap();
        assert_eq!(
            query.as_str(),
            r#""body:x"* "NEAR(a"* "b)"* "-c"*"#
        );
    }

    #[test]
    fn test_empty_input_has_no_query() {
        assert_eq!(FtsQuery::parse(""), None);
        assert_eq!(FtsQuery::parse("   "), None);
        assert_eq!(FtsQuery::parse(" \t\n  "), None);
    }

    #[test]
    fn test_repeated_spaces_collapse() {
        let query = FtsQuery::parse("  pizza    party ").unwrap();
        assert_eq!(query.as_str(), r#""pizza"* "party"*"#);
        assert_eq!(query.to_string(), query.as_str());
    }

    #[test]
    fn test_unescape_rejects_malformed() {
        assert_eq!(unescape_phrase("abc"), None);
        assert_eq!(unescape_phrase("\"a\"b\""), None);
        assert_eq!(unescape_phrase("\""), None);
        assert_eq!(unescape_phrase("\"\""), Some(String::new()));
    }

    proptest! {
        #[test]
        fn prop_escape_round_trips(token in "[a-z\" *:()-]{0,16}") {
            let escaped = full_text_search_escape(&token);
            prop_assert_eq!(unescape_phrase(&escaped), Some(token));
        }

        #[test]
        fn prop_surrounding_whitespace_is_ignored(
            words in proptest::collection::vec("[a-z\"]{1,6}", 1..5),
            lead in "[ \t]{0,3}",
            trail in "[ \t]{0,3}",
        ) {
            let normalized = words.join(" ");
            let padded = format!("{}{}{}", lead, normalized, trail);

            let a = FtsQuery::parse(&normalized).unwrap();
            let b = FtsQuery::parse(&padded).unwrap();
            prop_assert_eq!(a.tokens(), b.tokens());
            prop_assert_eq!(a.as_str(), b.as_str());
        }
    }
}
