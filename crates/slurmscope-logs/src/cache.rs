use slurmscope_types::JobLogEntry;

/// Time-bucketed memo of discovery results.
///
/// The owner holds the cache value directly instead of hiding it in process
/// globals; recomputation happens only when the bucket key changes, so one
/// walk serves every request inside the same refresh window.
#[derive(Debug, Default)]
pub struct RecentCache {
    bucket: Option<u64>,
    entries: Vec<JobLogEntry>,
}

impl RecentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached entries for `bucket`, refreshing them via `refresh`
    /// if the bucket key has changed since the last call.
    pub fn get_or_refresh<F>(&mut self, bucket: u64, refresh: F) -> &[JobLogEntry]
    where
        F: FnOnce() -> Vec<JobLogEntry>,
    {
        if self.bucket != Some(bucket) {
            self.entries = refresh();
            self.bucket = Some(bucket);
        }
        &self.entries
    }

    /// Drop the cached value, forcing the next call to refresh.
    pub fn invalidate(&mut self) {
        self.bucket = None;
        self.entries.clear();
    }
}

/// Bucket key for a refresh interval: one bucket per `refresh_secs` window.
pub fn bucket_key(now_unix: u64, refresh_secs: u64) -> u64 {
    now_unix / refresh_secs.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(id: &str) -> JobLogEntry {
        JobLogEntry::new("job".to_string(), id.to_string(), Utc::now(), 0)
    }

    #[test]
    fn test_cache_refreshes_only_on_bucket_change() {
        let mut cache = RecentCache::new();
        let mut calls = 0;

        let got = cache.get_or_refresh(1, || {
            calls += 1;
            vec![entry("1")]
        });
        assert_eq!(got.len(), 1);

        // same bucket, closure must not run
        let got = cache.get_or_refresh(1, || {
            calls += 1;
            vec![entry("2")]
        });
        assert_eq!(got[0].id, "1");

        // new bucket, recompute
        let got = cache.get_or_refresh(2, || {
            calls += 1;
            vec![entry("2")]
        });
        assert_eq!(got[0].id, "2");
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_cache_invalidate() {
        let mut cache = RecentCache::new();
        cache.get_or_refresh(1, || vec![entry("1")]);
        cache.invalidate();

        let mut calls = 0;
        cache.get_or_refresh(1, || {
            calls += 1;
            Vec::new()
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_bucket_key() {
        assert_eq!(bucket_key(100, 20), 5);
        assert_eq!(bucket_key(119, 20), 5);
        assert_eq!(bucket_key(120, 20), 6);
        // zero interval degrades to per-second buckets instead of dividing by zero
        assert_eq!(bucket_key(42, 0), 42);
    }
}
