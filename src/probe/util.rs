#![forbid(unsafe_code)]

use crate::locator::LocatorOptions;

/// What a probe requires of a named collection (tables, topics).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    /// At least one entry must exist.
    Any,
    /// Every listed entry must exist. Sorted and deduplicated.
    AllOf(Vec<String>),
}

impl Presence {
    /// Reads a comma-separated requirement from `key`, if the option is present.
    ///
    /// An empty value means "any"; empty list items are ignored.
    pub fn from_options(options: &LocatorOptions, key: &str) -> Option<Self> {
        if !options.contains(key) {
            return None;
        }
        let names: Vec<String> = options
            .first(key)
            .unwrap_or_default()
            .split(',')
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        if names.is_empty() {
            Some(Presence::Any)
        } else {
            Some(Presence::AllOf(unique_sorted(names)))
        }
    }

    /// Checks `existing` against the requirement, returning the missing names.
    pub fn missing(&self, existing: Vec<String>) -> Result<(), Vec<String>> {
        match self {
            Presence::Any if existing.is_empty() => Err(Vec::new()),
            Presence::Any => Ok(()),
            Presence::AllOf(required) => {
                let (found, missing) = contains_all(&unique_sorted(existing), required);
                if found {
                    Ok(())
                } else {
                    Err(missing)
                }
            }
        }
    }
}

/// Returns the values sorted with duplicates removed.
pub fn unique_sorted<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut values: Vec<String> = values.into_iter().map(Into::into).collect();
    values.sort();
    values.dedup();
    values
}

/// Exact-match containment over two sorted, deduplicated lists.
///
/// Returns whether every needle is in the haystack, plus the needles that are not.
pub fn contains_all(haystack: &[String], needles: &[String]) -> (bool, Vec<String>) {
    let mut missing = Vec::new();
    let mut hay = haystack.iter().peekable();

    for needle in needles {
        while hay.next_if(|candidate| *candidate < needle).is_some() {}
        match hay.peek() {
            Some(candidate) if *candidate == needle => {
                hay.next();
            }
            _ => missing.push(needle.clone()),
        }
    }

    (missing.is_empty(), missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::parse_options;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn unique_sorted_removes_duplicates() {
        assert_eq!(unique_sorted(["b", "a", "a"]), strings(&["a", "b"]));
        assert!(unique_sorted(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn contains_all_reports_missing() {
        assert_eq!(
            contains_all(&strings(&["a", "b", "c"]), &strings(&["a", "c"])),
            (true, Vec::new())
        );
        assert_eq!(
            contains_all(&strings(&["a", "b"]), &strings(&["a", "c"])),
            (false, strings(&["c"]))
        );
        assert_eq!(
            contains_all(&[], &strings(&["x", "y"])),
            (false, strings(&["x", "y"]))
        );
        assert_eq!(contains_all(&strings(&["a"]), &[]), (true, Vec::new()));
    }

    #[test]
    fn presence_reads_options() {
        let options = parse_options("topics");
        assert_eq!(Presence::from_options(&options, "topics"), Some(Presence::Any));

        let options = parse_options("topics=t2,t1,t2");
        assert_eq!(
            Presence::from_options(&options, "topics"),
            Some(Presence::AllOf(strings(&["t1", "t2"])))
        );

        let options = parse_options("tls=skip-verify");
        assert_eq!(Presence::from_options(&options, "topics"), None);
    }

    #[test]
    fn presence_partial_match_is_missing() {
        let required = Presence::AllOf(strings(&["t1", "t2"]));
        assert_eq!(required.missing(strings(&["t1"])), Err(strings(&["t2"])));
        assert_eq!(required.missing(strings(&["t2", "t1", "t3"])), Ok(()));
        assert_eq!(Presence::Any.missing(Vec::new()), Err(Vec::new()));
        assert_eq!(Presence::Any.missing(strings(&["orders"])), Ok(()));
    }
}
