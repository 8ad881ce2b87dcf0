//! Shared in-process state behind the repositories.
//!
//! Lock order: a request's entry guard is always taken before a ledger row's
//! entry guard, and the chronology map is only locked last. No code path
//! holds a guard on one map while waiting on a map earlier in that order.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use leavewise_core::ledger::{BalanceKey, LeaveBalance};
use leavewise_core::lifecycle::{ChronologyEntry, LeaveRequest};
use leavewise_shared::LeaveRequestId;

use crate::persistence::StoreSnapshot;

/// Live and archived leave records.
#[derive(Debug, Default)]
pub struct LeaveStore {
    pub(crate) requests: DashMap<LeaveRequestId, LeaveRequest>,
    pub(crate) chronology: DashMap<LeaveRequestId, Vec<ChronologyEntry>>,
    pub(crate) balances: DashMap<BalanceKey, LeaveBalance>,
    archived_requests: DashMap<LeaveRequestId, LeaveRequest>,
    archived_chronology: DashMap<LeaveRequestId, Vec<ChronologyEntry>>,
}

impl LeaveStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live requests.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.len()
    }

    /// Number of archived requests.
    #[must_use]
    pub fn archived_count(&self) -> usize {
        self.archived_requests.len()
    }

    /// Looks up an archived request.
    #[must_use]
    pub fn archived_request(&self, id: LeaveRequestId) -> Option<LeaveRequest> {
        self.archived_requests.get(&id).map(|r| r.clone())
    }

    /// Stores a new request together with its first chronology entry.
    ///
    /// The entry is written first so a visible request always has history.
    pub(crate) fn insert_request(&self, request: LeaveRequest, first_entry: ChronologyEntry) {
        self.chronology
            .entry(request.id)
            .or_default()
            .push(first_entry);
        self.requests.insert(request.id, request);
    }

    /// Appends a chronology entry. Caller holds the request's guard.
    pub(crate) fn append_chronology(&self, entry: ChronologyEntry) {
        self.chronology
            .entry(entry.request_id)
            .or_default()
            .push(entry);
    }

    /// Snapshot of the live requests matching `predicate`.
    pub(crate) fn requests_where(&self, predicate: impl Fn(&LeaveRequest) -> bool) -> Vec<LeaveRequest> {
        self.requests
            .iter()
            .filter(|r| predicate(r.value()))
            .map(|r| r.value().clone())
            .collect()
    }

    /// Copies every live and archived record, ordered so two snapshots of the
    /// same state serialize identically.
    ///
    /// Maps are read one after another, so a snapshot taken while requests
    /// are being decided may catch a request before its ledger debit. Take it
    /// when the store is quiet (startup, after a job, at shutdown).
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        fn chronology(map: &DashMap<LeaveRequestId, Vec<ChronologyEntry>>) -> Vec<ChronologyEntry> {
            let mut entries: Vec<ChronologyEntry> =
                map.iter().flat_map(|e| e.value().clone()).collect();
            entries.sort_by(|a, b| {
                a.request_id
                    .cmp(&b.request_id)
                    .then_with(|| a.recorded_at.cmp(&b.recorded_at))
            });
            entries
        }
        fn requests(map: &DashMap<LeaveRequestId, LeaveRequest>) -> Vec<LeaveRequest> {
            let mut requests: Vec<LeaveRequest> = map.iter().map(|r| r.value().clone()).collect();
            requests.sort_by_key(|r| r.id);
            requests
        }

        let mut balances: Vec<LeaveBalance> =
            self.balances.iter().map(|r| r.value().clone()).collect();
        balances.sort_by_key(LeaveBalance::key);

        StoreSnapshot {
            requests: requests(&self.requests),
            chronology: chronology(&self.chronology),
            balances,
            archived_requests: requests(&self.archived_requests),
            archived_chronology: chronology(&self.archived_chronology),
        }
    }

    /// Rebuilds a store from a snapshot.
    #[must_use]
    pub fn restore(snapshot: StoreSnapshot) -> Self {
        fn group(
            entries: Vec<ChronologyEntry>,
            into: &DashMap<LeaveRequestId, Vec<ChronologyEntry>>,
        ) {
            for entry in entries {
                into.entry(entry.request_id).or_default().push(entry);
            }
        }

        let store = Self::new();
        for request in snapshot.requests {
            store.requests.insert(request.id, request);
        }
        for request in snapshot.archived_requests {
            store.archived_requests.insert(request.id, request);
        }
        for row in snapshot.balances {
            store.balances.insert(row.key(), row);
        }
        group(snapshot.chronology, &store.chronology);
        group(snapshot.archived_chronology, &store.archived_chronology);
        store
    }

    /// Moves closed requests created before `cutoff`, with their chronology,
    /// out of the live maps. Returns how many moved.
    pub fn archive_closed_before(&self, cutoff: DateTime<Utc>) -> u64 {
        let candidates: Vec<LeaveRequestId> = self
            .requests
            .iter()
            .filter(|r| r.status.is_terminal() && r.created_at < cutoff)
            .map(|r| *r.key())
            .collect();

        let mut moved = 0;
        for id in candidates {
            let Some((_, request)) = self
                .requests
                .remove_if(&id, |_, r| r.status.is_terminal() && r.created_at < cutoff)
            else {
                continue;
            };
            if let Some((_, entries)) = self.chronology.remove(&id) {
                self.archived_chronology.insert(id, entries);
            }
            self.archived_requests.insert(id, request);
            moved += 1;
        }
        moved
    }
}
