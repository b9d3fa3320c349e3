//! Route pattern matching.
//!
//! A pattern is a `/`-separated list of segments. Each segment is one of:
//!
//! | Segment | Matches |
//! |---|---|
//! | `users` | exactly `users` |
//! | `:id` | any non-empty segment |
//! | `:id([0-9]+)` | any non-empty segment the expression finds a match in |
//! | `:id()` | same as `:id` |
//!
//! The expression is not anchored: `:id([0-9]+)` accepts `a1b`. Anchor it
//! yourself (`:id(^[0-9]+$)`) when you need a full match. The expression runs
//! from the first `(` to the first `)` after it, so it cannot contain `)`.
//!
//! Segment counts must agree: `/users/:id` never matches `/users/1/posts`.

use std::fmt;

use regex::Regex;

use crate::error::Error;

const PARAM: char = ':';

#[derive(Clone, Debug)]
enum Segment {
    Literal(String),
    Param { name: String, constraint: Option<Regex> },
}

impl Segment {
    fn parse(raw: &str) -> Result<Self, regex::Error> {
        let Some(rest) = raw.strip_prefix(PARAM) else {
            return Ok(Self::Literal(raw.to_owned()));
        };

        let Some(open) = rest.find('(') else {
            return Ok(Self::Param { name: rest.to_owned(), constraint: None });
        };
        let Some(len) = rest[open + 1..].find(')') else {
            return Ok(Self::Param { name: rest.to_owned(), constraint: None });
        };

        let expr = &rest[open + 1..open + 1 + len];
        let constraint = if expr.is_empty() { None } else { Some(Regex::new(expr)?) };
        Ok(Self::Param { name: rest[..open].to_owned(), constraint })
    }

    fn accepts(&self, incoming: &str) -> bool {
        match self {
            Self::Literal(lit) => lit == incoming,
            Self::Param { constraint, .. } => {
                !incoming.is_empty() && constraint.as_ref().is_none_or(|re| re.is_match(incoming))
            }
        }
    }
}

/// A parsed route pattern.
///
/// Parsing compiles every inline constraint once, so matching on the request
/// path never touches the regex compiler.
#[derive(Clone, Debug)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parses `raw`, compiling any `:name(expr)` constraints.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let segments = split(raw)
            .map(Segment::parse)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| Error::Pattern { pattern: raw.to_owned(), source })?;
        Ok(Self { raw: raw.to_owned(), segments })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Reports whether `path` satisfies every segment of this pattern.
    ///
    /// Every segment is evaluated before the results are combined.
    pub fn matches(&self, path: &str) -> bool {
        let incoming: Vec<&str> = split(path).collect();
        if incoming.len() != self.segments.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(&incoming)
            .map(|(segment, value)| segment.accepts(value))
            .fold(true, |all, ok| all & ok)
    }

    /// Extracts parameter values from `path`, in pattern order.
    ///
    /// - no names: every parameter value
    /// - one name: only the values bound to that name
    /// - more than one name: nothing (grouping by name is not supported)
    ///
    /// Returns nothing when `path` does not match.
    pub fn params<'p>(&self, path: &'p str, names: &[&str]) -> Vec<&'p str> {
        if names.len() > 1 || !self.matches(path) {
            return Vec::new();
        }
        let wanted = names.first();
        self.segments
            .iter()
            .zip(split(path))
            .filter_map(|(segment, value)| match segment {
                Segment::Param { name, .. } if wanted.is_none_or(|w| *w == name.as_str()) => Some(value),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Splits a path on `/`, dropping the empty segment a leading slash produces.
///
/// `/` and the empty string both yield a single empty segment.
pub(crate) fn split(path: &str) -> std::str::Split<'_, char> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn matches(pattern: &str, path: &str) -> bool {
        Pattern::parse(pattern).unwrap().matches(path)
    }

    #[rstest]
    #[case("/view/user/:id/view/:name", "/view/user/6/view/agus", true)]
    #[case("/view/user/:id/view", "/view/user/6/view", true)]
    #[case("/:id", "/x", true)]
    #[case("/view/:id", "/x", false)]
    #[case("/view/", "/x", false)]
    #[case("/", "/x", false)]
    #[case("/", "/", true)]
    #[case("/user/:id([0-9]+)", "/user/9", true)]
    #[case("/user/:id([0-9]+)", "/user/agus", false)]
    #[case("/user/:id()", "/user/agus", true)]
    #[case("/user/:id", "/user/", false)]
    #[case("/user/:id()", "/user/", false)]
    fn segment_rules(#[case] pattern: &str, #[case] path: &str, #[case] want: bool) {
        assert_eq!(matches(pattern, path), want, "{pattern} vs {path}");
    }

    #[test]
    fn differing_segment_counts_never_match() {
        assert!(!matches("/a/:b", "/a"));
        assert!(!matches("/a/:b", "/a/b/c"));
        assert!(!matches("/:a/:b", "/x/y/z"));
    }

    #[test]
    fn literal_patterns_match_only_themselves() {
        assert!(matches("/users/list", "/users/list"));
        assert!(!matches("/users/list", "/users/lists"));
        assert!(!matches("/users/list", "/Users/list"));
        assert!(!matches("/users/list", "/users/list/"));
    }

    #[test]
    fn constraint_is_a_substring_search() {
        assert!(matches("/item/:id([0-9]+)", "/item/ab12"));
        assert!(!matches("/item/:id(^[0-9]+$)", "/item/ab12"));
    }

    #[test]
    fn extracts_all_params_in_order() {
        let pattern = Pattern::parse("/user/:name/:address").unwrap();
        assert_eq!(pattern.params("/user/agus/jakarta", &[]), ["agus", "jakarta"]);
    }

    #[test]
    fn extracts_named_param() {
        let pattern = Pattern::parse("/user/:name/:address").unwrap();
        assert_eq!(pattern.params("/user/agus/jakarta", &["name"]), ["agus"]);
        assert_eq!(pattern.params("/user/agus/jakarta", &["address"]), ["jakarta"]);
        assert!(pattern.params("/user/agus/jakarta", &["missing"]).is_empty());
    }

    #[test]
    fn named_lookup_ignores_constraint_text() {
        let pattern = Pattern::parse("/user/:id([0-9]+)").unwrap();
        assert_eq!(pattern.params("/user/42", &["id"]), ["42"]);
    }

    #[test]
    fn several_names_yield_nothing() {
        let pattern = Pattern::parse("/user/:name/:address").unwrap();
        assert!(pattern.params("/user/agus/jakarta", &["name", "address"]).is_empty());
    }

    #[test]
    fn non_matching_path_yields_no_params() {
        let pattern = Pattern::parse("/user/:name").unwrap();
        assert!(pattern.params("/post/agus", &[]).is_empty());
    }

    #[test]
    fn invalid_constraint_is_a_parse_error() {
        let err = Pattern::parse("/user/:id([0-9)").unwrap_err();
        assert!(matches!(err, Error::Pattern { ref pattern, .. } if pattern == "/user/:id([0-9)"));
    }
}
