//! Last-write-wins merge of remote quotes into the local collection
//!
//! A remote record matches the first local record with the same id *or*
//! the same text.
//! Timestamps are compared as parsed instants; anything that doesn't parse
//! never wins, so ties and bad data keep the local record.

use crate::models::{Quote, QuoteOrigin};

/// Result of a merge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// The merged collection
    pub quotes: Vec<Quote>,
    /// Remote records appended because nothing matched
    pub added: usize,
    /// Local records replaced by a newer remote record
    pub resolved: usize,
    /// Replacements that changed id, text or category
    pub conflicts: usize,
}

/// Merge `remote` into a copy of `local`
pub fn merge(local: &[Quote], remote: &[Quote]) -> MergeOutcome {
    let mut outcome = MergeOutcome {
        quotes: local.to_vec(),
        ..MergeOutcome::default()
    };

    for incoming in remote {
        let existing = outcome
            .quotes
            .iter()
            .position(|q| q.id == incoming.id || q.text == incoming.text);

        match existing {
            Some(index) => {
                let current = &outcome.quotes[index];
                if !is_newer(incoming, current) {
                    continue;
                }
                if current.id != incoming.id
                    || current.text != incoming.text
                    || current.category != incoming.category
                {
                    outcome.conflicts += 1;
                }
                outcome.quotes[index] = incoming
                    .clone()
                    .with_origin(QuoteOrigin::ResolvedFromConflict { synced: false });
                outcome.resolved += 1;
            }
            None => {
                outcome
                    .quotes
                    .push(incoming.clone().with_origin(QuoteOrigin::ServerOriginated));
                outcome.added += 1;
            }
        }
    }

    outcome
}

/// Whether `incoming` is strictly later than `current`
fn is_newer(incoming: &Quote, current: &Quote) -> bool {
    match (incoming.parsed_timestamp(), current.parsed_timestamp()) {
        (Some(remote), Some(local)) => remote > local,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuoteId;

    const EARLY: &str = "2024-01-01T00:00:00.000Z";
    const LATE: &str = "2024-06-01T00:00:00.000Z";

    fn local_quotes() -> Vec<Quote> {
        vec![
            Quote::with_id(1i64, "Local one", "life", EARLY),
            Quote::with_id(2i64, "Local two", "work", EARLY),
        ]
    }

    fn remote(id: &str, text: &str, timestamp: &str) -> Quote {
        Quote::with_id(id, text, "server", timestamp)
    }

    #[test]
    fn test_merge_empty_remote_is_identity() {
        let local = local_quotes();
        let outcome = merge(&local, &[]);

        assert_eq!(outcome.quotes, local);
        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.resolved, 0);
    }

    #[test]
    fn test_merge_appends_unmatched() {
        let local = local_quotes();
        let incoming = vec![
            remote("server_1", "Remote one", LATE),
            remote("server_2", "Remote two", LATE),
        ];

        let outcome = merge(&local, &incoming);

        assert_eq!(outcome.quotes.len(), local.len() + 2);
        assert_eq!(outcome.added, 2);
        assert!(outcome.quotes[2..].iter().all(Quote::is_from_server));
        assert_eq!(outcome.quotes[..2], local[..]);
    }

    #[test]
    fn test_merge_newer_remote_replaces_by_id() {
        let local = vec![Quote::with_id("server_1", "Old text", "server", EARLY)];
        let incoming = vec![remote("server_1", "New text", LATE)];

        let outcome = merge(&local, &incoming);

        assert_eq!(outcome.quotes.len(), 1);
        assert_eq!(outcome.resolved, 1);
        assert_eq!(outcome.conflicts, 1);
        let merged = &outcome.quotes[0];
        assert!(merged.is_resolved());
        assert!(merged.is_unsynced());
        assert_eq!(
            merged.clone().with_origin(QuoteOrigin::default()),
            incoming[0]
        );
    }

    #[test]
    fn test_merge_matches_by_text() {
        let local = local_quotes();
        let incoming = vec![remote("server_9", "Local two", LATE)];

        let outcome = merge(&local, &incoming);

        assert_eq!(outcome.quotes.len(), 2);
        assert_eq!(outcome.quotes[1].id, QuoteId::from("server_9"));
        assert!(outcome.quotes[1].is_resolved());
    }

    #[test]
    fn test_merge_tie_keeps_local() {
        let local = local_quotes();
        let incoming = vec![Quote::with_id(1i64, "Changed", "server", EARLY)];

        let outcome = merge(&local, &incoming);

        assert_eq!(outcome.quotes, local);
        assert_eq!(outcome.resolved, 0);
    }

    #[test]
    fn test_merge_older_remote_keeps_local() {
        let local = vec![Quote::with_id(1i64, "Local", "life", LATE)];
        let incoming = vec![Quote::with_id(1i64, "Older", "server", EARLY)];

        let outcome = merge(&local, &incoming);
        assert_eq!(outcome.quotes, local);
    }

    #[test]
    fn test_merge_unparseable_timestamp_keeps_local() {
        let local = vec![Quote::with_id(1i64, "Local", "life", "not a date")];
        let incoming = vec![Quote::with_id(1i64, "Remote", "server", LATE)];

        let outcome = merge(&local, &incoming);
        assert_eq!(outcome.quotes, local);
    }

    #[test]
    fn test_merge_identical_replacement_is_not_a_conflict() {
        let local = vec![remote("server_1", "Same", EARLY)];
        let incoming = vec![remote("server_1", "Same", LATE)];

        let outcome = merge(&local, &incoming);
        assert_eq!(outcome.resolved, 1);
        assert_eq!(outcome.conflicts, 0);
    }

    #[test]
    fn test_merge_is_idempotent_with_unchanged_remote() {
        let local = local_quotes();
        let incoming = vec![
            remote("server_1", "Remote one", LATE),
            remote("server_2", "Local one", LATE),
        ];

        let once = merge(&local, &incoming);
        let twice = merge(&once.quotes, &incoming);

        assert_eq!(twice.quotes, once.quotes);
        assert_eq!(twice.added, 0);
        assert_eq!(twice.resolved, 0);
    }

    #[test]
    fn test_merge_duplicate_remote_in_batch_appends_once() {
        let incoming = vec![
            remote("server_1", "Same", LATE),
            remote("server_1", "Same", LATE),
        ];

        let outcome = merge(&[], &incoming);
        assert_eq!(outcome.quotes.len(), 1);
        assert_eq!(outcome.added, 1);
    }
}
