//! Location token resolution.
//!
//! Turns the raw `loc` parameter into the ordered list of data-source
//! suffixes to query. A named region in first position replaces the whole
//! list with its fixed expansion; anything else is passed through verbatim.

use crate::error::QueryError;

// ---

/// Suffix of the weather-service source, which has its own reading table.
pub const WEATHER_SERVICE: &str = "meteoit";

/// Named regions and their fixed expansions.
const REGIONS: &[(&str, &[&str])] = &[
    ("veneto", &["vicenza"]),
    ("trentino", &["merano", "bolzano"]),
    ("lombardia", &["milano"]),
    (
        "tutto",
        &["milano", "merano", "bolzano", "vicenza", WEATHER_SERVICE],
    ),
];

/// Ordered, non-empty sequence of canonical location identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationSet(Vec<String>);

impl LocationSet {
    // ---
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// First location; the `tempo` window is sized on it.
    pub fn primary(&self) -> &str {
        &self.0[0]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Resolve a comma-separated `loc` value into a [`LocationSet`].
///
/// Only the first token is checked against the named regions; trailing
/// tokens after a region name are ignored. Unknown tokens are not validated
/// here and reach the data layer as they are.
pub fn resolve(raw: &str) -> Result<LocationSet, QueryError> {
    // ---
    if raw.is_empty() {
        return Err(QueryError::InvalidLocation);
    }

    let tokens: Vec<String> = raw.split(',').map(str::to_string).collect();

    let expanded = REGIONS
        .iter()
        .find(|(name, _)| *name == tokens[0])
        .map(|(_, sources)| sources.iter().map(|s| s.to_string()).collect());

    Ok(LocationSet(expanded.unwrap_or(tokens)))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn names(set: &LocationSet) -> Vec<&str> {
        set.iter().collect()
    }

    #[test]
    fn test_plain_tokens_pass_through_in_order() {
        // ---
        let set = resolve("bolzano,milano,vicenza").unwrap();
        assert_eq!(names(&set), vec!["bolzano", "milano", "vicenza"]);

        let single = resolve("atlantide").unwrap();
        assert_eq!(names(&single), vec!["atlantide"]);
    }

    #[test]
    fn test_region_expansions() {
        // ---
        assert_eq!(names(&resolve("veneto").unwrap()), vec!["vicenza"]);
        assert_eq!(
            names(&resolve("trentino").unwrap()),
            vec!["merano", "bolzano"]
        );
        assert_eq!(names(&resolve("lombardia").unwrap()), vec!["milano"]);
        assert_eq!(
            names(&resolve("tutto").unwrap()),
            vec!["milano", "merano", "bolzano", "vicenza", "meteoit"]
        );
    }

    #[test]
    fn test_region_ignores_trailing_tokens() {
        // ---
        assert_eq!(
            names(&resolve("trentino,milano,roma").unwrap()),
            vec!["merano", "bolzano"]
        );
    }

    #[test]
    fn test_region_only_matches_first_token() {
        // ---
        assert_eq!(
            names(&resolve("milano,veneto").unwrap()),
            vec!["milano", "veneto"]
        );
    }

    #[test]
    fn test_empty_location_is_rejected() {
        // ---
        assert!(matches!(resolve(""), Err(QueryError::InvalidLocation)));
    }

    #[test]
    fn test_primary_is_first_location() {
        // ---
        assert_eq!(resolve("trentino").unwrap().primary(), "merano");
    }
}
