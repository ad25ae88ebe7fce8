use crate::normalize::SearchableString;

/// Substring matcher for one query.
///
/// Case-insensitive matching lower-cases both sides with
/// [`str::to_lowercase`]; the folded query is computed once up front.
///
/// ```
/// use findit_scanner::Matcher;
/// let matcher = Matcher::new("Error", true);
/// assert!(matcher.is_match("fatal ERROR at boot"));
/// assert!(!Matcher::new("Error", false).is_match("fatal ERROR at boot"));
/// ```
#[derive(Debug, Clone)]
pub struct Matcher {
    needle: String,
    ignore_case: bool,
}

impl Matcher {
    pub fn new(query: &str, ignore_case: bool) -> Self {
        let needle = if ignore_case { query.to_lowercase() } else { query.to_string() };
        Self { needle, ignore_case }
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        if self.ignore_case {
            candidate.to_lowercase().contains(&self.needle)
        } else {
            candidate.contains(&self.needle)
        }
    }

    /// Keep the candidates that contain the query, in their original order.
    pub fn filter(&self, candidates: impl IntoIterator<Item = SearchableString>) -> Vec<SearchableString> {
        candidates.into_iter().filter(|candidate| self.is_match(candidate)).collect()
    }
}

/// Shorthand for [`Matcher::new`] followed by [`Matcher::filter`].
pub fn find_matches(
    candidates: impl IntoIterator<Item = SearchableString>,
    query: &str,
    ignore_case: bool,
) -> Vec<SearchableString> {
    Matcher::new(query, ignore_case).filter(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn candidates(values: &[&str]) -> Vec<SearchableString> {
        values.iter().filter_map(|v| SearchableString::new(*v)).collect()
    }

    #[rstest]
    #[case("Hello World", "World", false, true)]
    #[case("Hello World", "world", false, false)]
    #[case("Hello World", "world", true, true)]
    #[case("HELLO", "hello", true, true)]
    #[case("abc", "abcd", true, false)]
    #[case("Straße", "STRASSE", true, false)]
    #[case("ÉCOLE", "école", true, true)]
    fn test_is_match(#[case] candidate: &str, #[case] query: &str, #[case] ignore_case: bool, #[case] expected: bool) {
        assert_eq!(Matcher::new(query, ignore_case).is_match(candidate), expected);
    }

    #[test]
    fn test_filter_preserves_order() {
        let input = candidates(&["hello one", "nope", "two hello", "also nope", "hello three"]);
        let found = find_matches(input, "hello", false);
        assert_eq!(found, vec!["hello one", "two hello", "hello three"]);
    }

    #[test]
    fn test_filter_is_subsequence() {
        let input = candidates(&["a1", "b", "a2", "a3", "c"]);
        let found = find_matches(input.clone(), "a", false);
        let mut rest = input.iter();
        for item in &found {
            assert!(rest.any(|candidate| candidate == item), "{item} out of order");
        }
    }

    #[rstest]
    #[case("error")]
    #[case("Error")]
    #[case("eRRoR")]
    fn test_ignore_case_symmetry(#[case] query: &str) {
        let input = candidates(&["ERROR: disk", "error: net", "warning", "An Error"]);
        let lower = find_matches(input.clone(), query, true);
        let upper = find_matches(input, &query.to_uppercase(), true);
        assert_eq!(lower, upper);
        assert_eq!(lower.len(), 3);
    }

    #[test]
    fn test_no_candidates() {
        assert!(find_matches(Vec::new(), "anything", true).is_empty());
    }
}
