//! Job label index and series limit.
//!
//! Tracks which job labels currently own series and which target hosts each
//! job has send-stage series for. The index is sharded so writers for
//! different jobs do not contend on a single lock.

use std::collections::BTreeSet;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::{ExporterError, ExporterResult};
use crate::stage::JobKey;

/// Bounds the number of distinct job labels and remembers their hosts.
///
/// The limit is soft under concurrency: two brand-new labels admitted at the
/// same instant may both pass the check when only one slot is left.
pub(crate) struct SeriesIndex {
    jobs: DashMap<String, BTreeSet<String>>,
    max_jobs: Option<usize>,
}

impl SeriesIndex {
    /// Create an index. `max_jobs == 0` means unlimited.
    pub(crate) fn new(max_jobs: usize) -> Self {
        Self {
            jobs: DashMap::new(),
            max_jobs: (max_jobs > 0).then_some(max_jobs),
        }
    }

    /// Run `write` for `key` while holding the label's entry.
    ///
    /// Known labels are always admitted. A new label is refused once the
    /// limit is reached. `host_scoped` writes also record the key's host.
    /// The entry stays locked until `write` returns, so a concurrent
    /// [`SeriesIndex::release_with`] on the same label sees either none or
    /// all of it.
    pub(crate) fn admit_with<R>(
        &self,
        key: &JobKey,
        host_scoped: bool,
        write: impl FnOnce() -> R,
    ) -> ExporterResult<R> {
        if !self.jobs.contains_key(key.label()) {
            if let Some(limit) = self.max_jobs {
                // len() visits every shard; no entry guard may be held here.
                if self.jobs.len() >= limit {
                    return Err(ExporterError::SeriesLimitExceeded {
                        job: key.label().to_string(),
                        limit,
                    });
                }
            }
        }

        let mut hosts = self.jobs.entry(key.label().to_string()).or_default();
        if host_scoped && !hosts.contains(key.target_host_label()) {
            hosts.insert(key.target_host_label().to_string());
        }
        let written = write();
        drop(hosts);
        Ok(written)
    }

    /// Run `remove` with the hosts whose send series must go, then drop
    /// `key` from the index, all under the label's entry.
    ///
    /// With a host only that host is forgotten, and the label is released
    /// once no host remains. Without a host the whole label is released.
    pub(crate) fn release_with(&self, key: &JobKey, remove: impl FnOnce(&[String])) {
        match self.jobs.entry(key.label().to_string()) {
            Entry::Occupied(mut entry) => {
                let Some(host) = key.target_host() else {
                    let hosts: Vec<String> = entry.get().iter().cloned().collect();
                    remove(&hosts);
                    entry.remove();
                    return;
                };
                remove(&[host.to_string()]);
                let hosts = entry.get_mut();
                hosts.remove(host);
                if hosts.is_empty() {
                    entry.remove();
                }
            }
            Entry::Vacant(_vacant) => {
                let hosts: Vec<String> = key.target_host().map(str::to_string).into_iter().collect();
                remove(&hosts);
            }
        }
    }

    /// Number of labels currently owning series.
    pub(crate) fn job_count(&self) -> usize {
        self.jobs.len()
    }
}
