//! Resource ids taken from a path segment.
//!
//! Ids are kept as raw (percent-decoded) strings; parsing them into the id
//! type of the resource happens once the resource information is known.

use smallvec::SmallVec;

/// Maximum number of ids stored inline (stack allocated).
const INLINE_IDS: usize = 4;

/// Ids from the `{id}[,{id}...]` segment of a path.
///
/// # Example
///
/// ```rust
/// use meridian_router::PathIds;
///
/// let ids = PathIds::parse("1,2,3");
/// assert_eq!(ids.len(), 3);
/// assert_eq!(ids.first(), Some("1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathIds {
    inner: SmallVec<[String; INLINE_IDS]>,
}

impl PathIds {
    /// Creates an empty id list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits a comma-separated segment, percent-decoding each id.
    ///
    /// Empty entries are skipped.
    #[must_use]
    pub fn parse(segment: &str) -> Self {
        segment
            .split(',')
            .filter(|raw| !raw.is_empty())
            .map(|raw| {
                urlencoding::decode(raw)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or_else(|_| raw.to_string())
            })
            .collect()
    }

    /// Adds an id.
    pub fn push(&mut self, id: impl Into<String>) {
        self.inner.push(id.into());
    }

    /// The first id.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.inner.first().map(String::as_str)
    }

    /// Returns true if there are no ids.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns an iterator over the ids.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.inner.iter().map(String::as_str)
    }
}

impl FromIterator<String> for PathIds {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

impl std::fmt::Display for PathIds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, id) in self.inner.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(&urlencoding::encode(id))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_id() {
        let ids = PathIds::parse("42");
        assert_eq!(ids.len(), 1);
        assert_eq!(ids.first(), Some("42"));
    }

    #[test]
    fn test_empty_entries_are_skipped() {
        let ids = PathIds::parse("1,,2,");
        assert_eq!(ids.iter().collect::<Vec<_>>(), vec!["1", "2"]);
    }

    #[test]
    fn test_percent_decoding() {
        let ids = PathIds::parse("a%2Fb,c%20d");
        assert_eq!(ids.iter().collect::<Vec<_>>(), vec!["a/b", "c d"]);
    }

    #[test]
    fn test_display_round_trip() {
        let ids = PathIds::parse("a%2Fb,7");
        assert_eq!(PathIds::parse(&ids.to_string()), ids);
    }

    #[test]
    fn test_many_ids() {
        let segment = (0..10).map(|i| i.to_string()).collect::<Vec<_>>().join(",");
        let ids = PathIds::parse(&segment);
        assert_eq!(ids.len(), 10);
        assert_eq!(ids.iter().last(), Some("9"));
    }
}
