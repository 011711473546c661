//! Digest payload construction: grouping by scanner-set and display
//! tokens.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// Fixed subject prefix for every digest.
pub const SUBJECT_PREFIX: &str = "[kamerwacht alert] ";

/// The structure handed to the templates.
#[derive(Debug, Clone, Serialize)]
pub struct DigestPayload {
    pub payload: Vec<DigestGroup>,
}

/// One stanza: the scanners that matched, and what they matched.
#[derive(Debug, Clone, Serialize)]
pub struct DigestGroup {
    pub scannernames: Vec<String>,
    pub hits: Vec<DigestHit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DigestHit {
    pub nummer: String,
    pub dispnummer: String,
    pub description: String,
}

/// Short display token for a record identifier.
///
/// Compound keys like `76423359-0db5-4503-8e41-b8440ab71faf` are cut to
/// their first 8 characters; short identifiers pass through verbatim.
pub fn display_token(identifier: &str) -> String {
    if identifier.len() > 11 {
        identifier.chars().take(8).collect()
    } else {
        identifier.to_string()
    }
}

/// Partition one user's `identifier → scanner-set` map by scanner-set
/// equality. A record matched by scanners A and B lands in the `{A,B}`
/// group, distinct from records matched by A alone.
pub fn group_by_scanner_set(
    content: &BTreeMap<String, BTreeSet<usize>>,
) -> BTreeMap<BTreeSet<usize>, BTreeSet<String>> {
    let mut grouped: BTreeMap<BTreeSet<usize>, BTreeSet<String>> = BTreeMap::new();
    for (identifier, scanner_set) in content {
        grouped
            .entry(scanner_set.clone())
            .or_default()
            .insert(identifier.clone());
    }
    grouped
}

/// Digest subject: fixed prefix plus the comma-joined labels of every
/// scanner that matched for this user.
pub fn subject(labels: &[String]) -> String {
    format!("{SUBJECT_PREFIX}{}", labels.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_token_truncates_long_identifiers() {
        assert_eq!(
            display_token("76423359-0db5-4503-8e41-b8440ab71faf"),
            "76423359"
        );
        assert_eq!(display_token("ABC123"), "ABC123");
        // Exactly 11 characters passes through
        assert_eq!(display_token("2024D001234"), "2024D001234");
        assert_eq!(display_token("2024D0012345"), "2024D001");
    }

    #[test]
    fn test_grouping_by_scanner_set_equality() {
        let mut content: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
        content.insert("X".to_string(), BTreeSet::from([0, 1]));
        content.insert("Y".to_string(), BTreeSet::from([0]));
        content.insert("Z".to_string(), BTreeSet::from([0, 1]));

        let grouped = group_by_scanner_set(&content);
        assert_eq!(grouped.len(), 2);
        assert_eq!(
            grouped[&BTreeSet::from([0, 1])],
            BTreeSet::from(["X".to_string(), "Z".to_string()])
        );
        assert_eq!(
            grouped[&BTreeSet::from([0])],
            BTreeSet::from(["Y".to_string()])
        );
    }

    #[test]
    fn test_subject_joins_labels() {
        let labels = vec!["Zoekterm 'stikstof'".to_string(), "Dossier 36200".to_string()];
        assert_eq!(
            subject(&labels),
            "[kamerwacht alert] Zoekterm 'stikstof', Dossier 36200"
        );
    }
}
