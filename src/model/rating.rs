//! Star rating definitions for book records

use std::fmt;

/// Ordinal words used by the catalog's `star-rating` class, in rating order
const RATING_WORDS: [&str; 5] = ["One", "Two", "Three", "Four", "Five"];

/// A book's star rating
///
/// Genuine ratings are 1 through 5. Tokens that do not map onto that range
/// become [`Rating::UNRATED`], which is written as `0` and is never equal to a
/// real rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rating(u8);

impl Rating {
    /// Marker for a rating token that could not be mapped
    pub const UNRATED: Rating = Rating(0);

    /// Maps an ordinal rating word ("One" .. "Five") to its rating
    ///
    /// Matching ignores ASCII case and surrounding whitespace. Anything else
    /// yields [`Rating::UNRATED`].
    ///
    /// # Example
    ///
    /// ```
    /// use bookshelf_crawl::Rating;
    ///
    /// assert_eq!(Rating::from_token("Three").value(), 3);
    /// assert!(!Rating::from_token("Zero").is_rated());
    /// ```
    pub fn from_token(token: &str) -> Self {
        let token = token.trim();
        RATING_WORDS
            .iter()
            .position(|word| word.eq_ignore_ascii_case(token))
            .map(|index| Rating(index as u8 + 1))
            .unwrap_or(Self::UNRATED)
    }

    /// Builds a rating from a star count, rejecting values outside 1-5
    pub fn from_stars(stars: u8) -> Option<Self> {
        (1..=5).contains(&stars).then_some(Rating(stars))
    }

    /// Numeric value; 0 for unrated
    pub fn value(self) -> u8 {
        self.0
    }

    /// Returns true for a genuine 1-5 rating
    pub fn is_rated(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_tokens_are_bijective() {
        let values: Vec<u8> = RATING_WORDS
            .iter()
            .map(|word| Rating::from_token(word).value())
            .collect();
        assert_eq!(values, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_token_case_and_whitespace() {
        assert_eq!(Rating::from_token(" four "), Rating(4));
        assert_eq!(Rating::from_token("FIVE"), Rating(5));
    }

    #[test]
    fn test_unknown_token_is_unrated() {
        for token in ["", "Zero", "Six", "star-rating", "3"] {
            let rating = Rating::from_token(token);
            assert!(!rating.is_rated(), "{token:?} should be unrated");
            assert_eq!(rating.value(), 0);
            assert!(Rating::from_stars(rating.value()).is_none());
        }
    }

    #[test]
    fn test_from_stars() {
        assert_eq!(Rating::from_stars(1), Some(Rating(1)));
        assert_eq!(Rating::from_stars(5), Some(Rating(5)));
        assert_eq!(Rating::from_stars(0), None);
        assert_eq!(Rating::from_stars(6), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Rating::from_token("Two").to_string(), "2");
        assert_eq!(Rating::UNRATED.to_string(), "0");
    }
}
