//! Diff between the fresh fetch and the checkpoint.
//!
//! Only additions matter here: a competition is announced the first time its
//! identity shows up, and field changes on a known identity are ignored.

use std::collections::HashSet;

use crate::models::CompetitionRecord;

/// Records of `current` whose identity is absent from `previous`, in `current` order.
pub fn new_records(
    current: &[CompetitionRecord],
    previous: &[CompetitionRecord],
) -> Vec<CompetitionRecord> {
    let known: HashSet<&str> = previous.iter().map(|r| r.identity.as_str()).collect();

    current
        .iter()
        .filter(|record| !known.contains(record.identity.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Platform;

    fn make_record(url: &str, title: &str) -> CompetitionRecord {
        CompetitionRecord::new(Platform::Kaggle, url, title)
    }

    fn identities(records: &[CompetitionRecord]) -> Vec<&str> {
        records.iter().map(|r| r.identity.as_str()).collect()
    }

    #[test]
    fn test_empty_previous_returns_current() {
        let curr = vec![make_record("https://x/a", "A"), make_record("https://x/b", "B")];
        assert_eq!(new_records(&curr, &[]), curr);
    }

    #[test]
    fn test_no_changes() {
        let curr = vec![make_record("https://x/a", "A"), make_record("https://x/b", "B")];
        assert!(new_records(&curr, &curr).is_empty());
    }

    #[test]
    fn test_additions_keep_current_order() {
        let prev = vec![make_record("https://x/b", "B")];
        let curr = vec![
            make_record("https://x/d", "D"),
            make_record("https://x/b", "B"),
            make_record("https://x/a", "A"),
            make_record("https://x/c", "C"),
        ];

        let added = new_records(&curr, &prev);
        assert_eq!(identities(&added), vec!["https://x/d", "https://x/a", "https://x/c"]);
    }

    #[test]
    fn test_identity_alone_decides() {
        let prev = vec![make_record("https://x/a", "Old Title")];
        let curr = vec![make_record("https://x/a", "New Title")];
        assert!(new_records(&curr, &prev).is_empty());
    }

    #[test]
    fn test_removals_are_not_reported() {
        let prev = vec![make_record("https://x/a", "A"), make_record("https://x/gone", "Gone")];
        let curr = vec![make_record("https://x/a", "A")];
        assert!(new_records(&curr, &prev).is_empty());
    }

    #[test]
    fn test_identity_is_not_platform_scoped() {
        let prev = vec![CompetitionRecord::new(Platform::Dacon, "https://x/a", "A")];
        let curr = vec![make_record("https://x/a", "A")];
        assert!(new_records(&curr, &prev).is_empty());
    }

    #[test]
    fn test_sound_and_complete() {
        let prev = vec![
            make_record("https://x/1", "1"),
            make_record("https://x/3", "3"),
            make_record("https://x/5", "5"),
        ];
        let curr: Vec<_> = (1..=6)
            .map(|i| make_record(&format!("https://x/{i}"), &i.to_string()))
            .collect();

        let added = new_records(&curr, &prev);
        let prev_ids = identities(&prev);

        assert!(added.iter().all(|r| !prev_ids.contains(&r.identity.as_str())));
        for record in &curr {
            let is_added = added.iter().any(|a| a.identity == record.identity);
            assert_eq!(is_added, !prev_ids.contains(&record.identity.as_str()));
        }
    }
}
