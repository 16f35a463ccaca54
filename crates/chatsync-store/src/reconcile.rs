//! Merge of a remote snapshot with the locally cached view of one thread.
//!
//! Remote entries are authoritative. Local entries (optimistic writes, replies not yet
//! seen in a snapshot) survive until a remote entry supersedes them, either by echoing
//! the local id as `client_message_id` or by matching the content signature.

use chatsync_types::Message;
use chrono::Duration;
use std::collections::HashSet;

/// How the remote sequence is ordered before local entries are woven in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderPolicy {
    /// Stable sort by `created_at` ascending
    #[default]
    SortByTimestamp,
    /// Keep the backend's query order as delivered
    TrustRemote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeReport {
    /// Remote entries dropped because an earlier entry had the same id
    pub duplicates_dropped: usize,
    /// Local entries replaced by their remote copy
    pub superseded: usize,
    /// Local entries kept because no remote copy exists yet
    pub kept_local: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged {
    pub messages: Vec<Message>,
    pub report: MergeReport,
}

pub fn merge(local: &[Message], remote: Vec<Message>, policy: OrderPolicy, tolerance: Duration) -> Merged {
    let mut report = MergeReport::default();

    let mut seen = HashSet::with_capacity(remote.len());
    let mut merged: Vec<Message> = Vec::with_capacity(remote.len() + local.len());
    for msg in remote {
        if seen.insert(msg.id.clone()) {
            merged.push(msg);
        } else {
            report.duplicates_dropped += 1;
        }
    }
    if policy == OrderPolicy::SortByTimestamp {
        merged.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    }

    // Previously synced entries are replaced by the new snapshot; an entry with the
    // same id as a remote one is the remote one.
    let candidates: Vec<&Message> = local
        .iter()
        .filter(|m| m.delivery.is_local() && !seen.contains(&m.id))
        .collect();

    let mut claimed = vec![false; merged.len()];
    let mut superseded = vec![false; candidates.len()];

    for (ci, candidate) in candidates.iter().enumerate() {
        let echo = merged.iter().enumerate().position(|(ri, remote)| {
            !claimed[ri] && remote.client_message_id.as_deref() == Some(candidate.id.as_str())
        });
        if let Some(ri) = echo {
            claimed[ri] = true;
            superseded[ci] = true;
        }
    }

    for (ci, candidate) in candidates.iter().enumerate() {
        if superseded[ci] {
            continue;
        }
        let signature = candidate.signature();
        let closest = merged
            .iter()
            .enumerate()
            .filter(|(ri, remote)| {
                !claimed[*ri]
                    // An entry echoing some other client id belongs to that message
                    && remote.client_message_id.is_none()
                    && signature.matches(&remote.signature(), tolerance)
            })
            .min_by_key(|(_, remote)| (remote.created_at - candidate.created_at).abs())
            .map(|(ri, _)| ri);
        if let Some(ri) = closest {
            claimed[ri] = true;
            superseded[ci] = true;
        }
    }

    for (ci, candidate) in candidates.into_iter().enumerate() {
        if superseded[ci] {
            report.superseded += 1;
            continue;
        }
        report.kept_local += 1;
        let at = merged
            .iter()
            .rposition(|m| m.created_at <= candidate.created_at)
            .map_or(0, |i| i + 1);
        merged.insert(at, candidate.clone());
    }

    Merged { messages: merged, report }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatsync_types::{Delivery, Role};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn remote(id: &str, author: Role, text: &str, secs: i64) -> Message {
        Message::synced(id, "t1", author, text, at(secs))
    }

    fn pending(id: &str, text: &str, secs: i64) -> Message {
        Message {
            id: id.to_string(),
            thread_id: "t1".to_string(),
            author: Role::User,
            text: text.to_string(),
            created_at: at(secs),
            client_message_id: None,
            delivery: Delivery::Pending,
        }
    }

    fn ids(merged: &Merged) -> Vec<&str> {
        merged.messages.iter().map(|m| m.id.as_str()).collect()
    }

    fn tol() -> Duration {
        Duration::seconds(10)
    }

    #[test]
    fn test_remote_duplicates_dropped() {
        let merged = merge(
            &[],
            vec![
                remote("a", Role::User, "x", 0),
                remote("b", Role::Assistant, "y", 1),
                remote("a", Role::User, "x", 0),
            ],
            OrderPolicy::SortByTimestamp,
            tol(),
        );
        assert_eq!(ids(&merged), vec!["a", "b"]);
        assert_eq!(merged.report.duplicates_dropped, 1);
    }

    #[test]
    fn test_sorted_by_timestamp_with_stable_ties() {
        let merged = merge(
            &[],
            vec![
                remote("late", Role::User, "x", 5),
                remote("tie-1", Role::User, "x", 1),
                remote("tie-2", Role::Assistant, "y", 1),
            ],
            OrderPolicy::SortByTimestamp,
            tol(),
        );
        assert_eq!(ids(&merged), vec!["tie-1", "tie-2", "late"]);
    }

    #[test]
    fn test_trust_remote_keeps_order() {
        let merged = merge(
            &[],
            vec![remote("b", Role::User, "x", 5), remote("a", Role::User, "y", 1)],
            OrderPolicy::TrustRemote,
            tol(),
        );
        assert_eq!(ids(&merged), vec!["b", "a"]);
    }

    #[test]
    fn test_optimistic_entry_superseded_by_signature() {
        let local = vec![pending("local-1", "Hello", 0)];
        let merged = merge(
            &local,
            vec![remote("srv-1", Role::User, "Hello", 2)],
            OrderPolicy::SortByTimestamp,
            tol(),
        );
        assert_eq!(ids(&merged), vec!["srv-1"]);
        assert_eq!(merged.report.superseded, 1);
    }

    #[test]
    fn test_optimistic_entry_superseded_by_echoed_client_id() {
        let local = vec![pending("local-1", "Hello", 0)];
        let echoed = remote("srv-1", Role::User, "Hello", 120).with_client_message_id("local-1");
        let merged = merge(&local, vec![echoed], OrderPolicy::SortByTimestamp, tol());
        assert_eq!(ids(&merged), vec!["srv-1"]);
    }

    #[test]
    fn test_unconfirmed_optimistic_entry_kept_at_tail() {
        let local = vec![
            remote("srv-0", Role::Assistant, "Welcome", 0),
            pending("local-1", "Hello", 5),
        ];
        let merged = merge(
            &local,
            vec![remote("srv-0", Role::Assistant, "Welcome", 0)],
            OrderPolicy::SortByTimestamp,
            tol(),
        );
        assert_eq!(ids(&merged), vec!["srv-0", "local-1"]);
        assert_eq!(merged.report.kept_local, 1);
        assert_eq!(merged.messages[1].delivery, Delivery::Pending);
    }

    #[test]
    fn test_stale_synced_entries_are_replaced() {
        let local = vec![remote("gone", Role::User, "x", 0)];
        let merged = merge(&local, vec![remote("a", Role::User, "y", 1)], OrderPolicy::SortByTimestamp, tol());
        assert_eq!(ids(&merged), vec!["a"]);
    }

    #[test]
    fn test_one_remote_copy_supersedes_one_local_entry() {
        let local = vec![pending("local-1", "ok", 0), pending("local-2", "ok", 1)];
        let merged = merge(
            &local,
            vec![remote("srv-1", Role::User, "ok", 0)],
            OrderPolicy::SortByTimestamp,
            tol(),
        );
        assert_eq!(ids(&merged), vec!["srv-1", "local-2"]);
    }

    #[test]
    fn test_foreign_echo_is_not_signature_matched() {
        let local = vec![pending("local-2", "ok", 3)];
        let first_send = remote("srv-1", Role::User, "ok", 0).with_client_message_id("local-1");
        let merged = merge(&local, vec![first_send], OrderPolicy::SortByTimestamp, tol());
        assert_eq!(ids(&merged), vec!["srv-1", "local-2"]);
    }

    #[test]
    fn test_local_with_remote_id_prefers_remote_copy() {
        let mut reply = remote("srv-9", Role::Assistant, "draft", 3);
        reply.delivery = Delivery::Sent;
        let merged = merge(
            &[reply],
            vec![remote("srv-9", Role::Assistant, "final", 3)],
            OrderPolicy::SortByTimestamp,
            tol(),
        );
        assert_eq!(merged.messages.len(), 1);
        assert_eq!(merged.messages[0].text, "final");
        assert_eq!(merged.messages[0].delivery, Delivery::Synced);
    }

    #[test]
    fn test_outside_tolerance_is_kept() {
        let local = vec![pending("local-1", "Hello", 0)];
        let merged = merge(
            &local,
            vec![remote("srv-1", Role::User, "Hello", 60)],
            OrderPolicy::SortByTimestamp,
            tol(),
        );
        assert_eq!(ids(&merged), vec!["local-1", "srv-1"]);
    }
}
