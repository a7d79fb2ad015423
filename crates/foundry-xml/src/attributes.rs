//! Decoded attributes of one start tag.

use std::str::FromStr;

use crate::error::ParseError;

/// Attributes of a start tag in document order, with entity references
/// already decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute. Later duplicates are shadowed by earlier ones.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// True when every key in `keys` is present.
    pub fn contains_all(&self, keys: &[&str]) -> bool {
        keys.iter().all(|k| self.contains(k))
    }

    /// Like [`Attributes::get`], but a missing key rejects `element`.
    pub fn require(&self, element: &str, key: &str) -> Result<&str, ParseError> {
        self.get(key).ok_or_else(|| {
            ParseError::rejected(element, format!("missing attribute '{key}'"))
        })
    }

    /// Parse the value of `key`. Missing or unparsable values yield `None`.
    pub fn parse<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    /// Whitespace-separated words of `key`, empty when the key is missing.
    pub fn words<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.get(key).unwrap_or_default().split_whitespace()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.push(k, v);
        }
        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ware_attrs() -> Attributes {
        [
            ("id", "energycells"),
            ("volume", " 6 "),
            ("tags", "container  economy stationbuilding"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn get_and_contains() {
        let attrs = ware_attrs();
        assert_eq!(attrs.get("id"), Some("energycells"));
        assert!(attrs.contains("tags"));
        assert!(!attrs.contains("group"));
        assert!(attrs.contains_all(&["id", "volume"]));
        assert!(!attrs.contains_all(&["id", "group"]));
    }

    #[test]
    fn parse_trims_and_rejects_garbage() {
        let attrs = ware_attrs();
        assert_eq!(attrs.parse::<u32>("volume"), Some(6));
        assert_eq!(attrs.parse::<u32>("id"), None);
        assert_eq!(attrs.parse::<u32>("missing"), None);
    }

    #[test]
    fn words_split_on_any_whitespace() {
        let attrs = ware_attrs();
        let tags: Vec<&str> = attrs.words("tags").collect();
        assert_eq!(tags, vec!["container", "economy", "stationbuilding"]);
        assert_eq!(attrs.words("missing").count(), 0);
    }

    #[test]
    fn require_missing_is_rejection() {
        let attrs = ware_attrs();
        assert_eq!(attrs.require("ware", "id").unwrap(), "energycells");
        let err = attrs.require("ware", "group").unwrap_err();
        assert!(matches!(err, ParseError::Rejected { ref element, .. } if element == "ware"));
    }

    #[test]
    fn first_duplicate_wins() {
        let mut attrs = Attributes::new();
        attrs.push("id", "a");
        attrs.push("id", "b");
        assert_eq!(attrs.get("id"), Some("a"));
        assert_eq!(attrs.len(), 2);
    }
}
