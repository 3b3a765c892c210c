//! SeriesStore — the in-memory catalogue mirrored into the durable store.
//!
//! Every mutation commits to redb first and only then updates the map, so a
//! failed write leaves memory matching what a restart would load.

use std::collections::BTreeMap;

use tracing::debug;

use metricgate_core::{Catalogue, MetricRecord};
use metricgate_state::StateStore;

use crate::error::AggregatorResult;

pub struct SeriesStore {
    state: StateStore,
    records: BTreeMap<String, MetricRecord>,
}

impl SeriesStore {
    /// Read every persisted record into memory.
    pub fn load(state: StateStore) -> AggregatorResult<Self> {
        let records = state
            .list_records()?
            .into_iter()
            .map(|record| (record.name.clone(), record))
            .collect::<BTreeMap<_, _>>();
        debug!(records = records.len(), "series store loaded");
        Ok(Self { state, records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&MetricRecord> {
        self.records.get(name)
    }

    /// Clone the whole catalogue.
    pub fn get_all(&self) -> Catalogue {
        self.records.clone()
    }

    /// Replace the record stored under `record.name`.
    pub fn put(&mut self, record: MetricRecord) -> AggregatorResult<()> {
        self.state.put_record(&record)?;
        self.records.insert(record.name.clone(), record);
        Ok(())
    }

    /// Remove one record. Returns true if it existed.
    pub fn delete(&mut self, name: &str) -> AggregatorResult<bool> {
        self.state.delete_record(name)?;
        Ok(self.records.remove(name).is_some())
    }

    /// Remove every record. Returns how many were held.
    pub fn delete_all(&mut self) -> AggregatorResult<usize> {
        self.state.delete_all()?;
        let count = self.records.len();
        self.records.clear();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metricgate_core::{Labels, Sample};
    use redb::StorageBackend;
    use redb::backends::InMemoryBackend;
    use std::io;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// In-memory backend whose fsync can be made to fail.
    #[derive(Debug)]
    struct FailingBackend {
        inner: InMemoryBackend,
        fail: Arc<AtomicBool>,
    }

    impl StorageBackend for FailingBackend {
        fn len(&self) -> Result<u64, io::Error> {
            self.inner.len()
        }

        fn read(&self, offset: u64, out: &mut [u8]) -> Result<(), io::Error> {
            self.inner.read(offset, out)
        }

        fn set_len(&self, len: u64) -> Result<(), io::Error> {
            self.inner.set_len(len)
        }

        fn sync_data(&self) -> Result<(), io::Error> {
            if self.fail.load(Ordering::SeqCst) {
                Err(io::Error::other("disk gone"))
            } else {
                self.inner.sync_data()
            }
        }

        fn write(&self, offset: u64, data: &[u8]) -> Result<(), io::Error> {
            self.inner.write(offset, data)
        }
    }

    #[test]
    fn put_is_visible_after_reload() {
        let state = StateStore::open_in_memory().unwrap();
        let mut store = SeriesStore::load(state.clone()).unwrap();
        assert!(store.is_empty());

        store.put(MetricRecord::new("up", "gauge")).unwrap();
        store.put(MetricRecord::new("jobs", "counter")).unwrap();

        let reloaded = SeriesStore::load(state).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("up").unwrap().metric_type, "gauge");
        let names: Vec<_> = reloaded.get_all().into_keys().collect();
        assert_eq!(names, vec!["jobs", "up"]);
    }

    #[test]
    fn delete_and_delete_all_reach_the_durable_store() {
        let state = StateStore::open_in_memory().unwrap();
        let mut store = SeriesStore::load(state.clone()).unwrap();
        store.put(MetricRecord::new("a", "gauge")).unwrap();
        store.put(MetricRecord::new("b", "gauge")).unwrap();
        store.put(MetricRecord::new("c", "gauge")).unwrap();

        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
        assert!(state.get_record("a").unwrap().is_none());

        assert_eq!(store.delete_all().unwrap(), 2);
        assert!(store.is_empty());
        assert!(state.list_records().unwrap().is_empty());
    }

    #[test]
    fn failed_commit_leaves_memory_untouched() {
        let fail = Arc::new(AtomicBool::new(false));
        let backend = FailingBackend {
            inner: InMemoryBackend::new(),
            fail: fail.clone(),
        };
        let mut store = SeriesStore::load(StateStore::open_with_backend(backend).unwrap()).unwrap();

        let mut up = MetricRecord::new("up", "gauge");
        up.merge_sample(Sample::new(Labels::new(), 1.0));
        store.put(up.clone()).unwrap();

        fail.store(true, Ordering::SeqCst);

        let mut changed = up.clone();
        changed.merge_sample(Sample::new(Labels::new(), 4.0));
        assert!(store.put(changed).is_err());
        assert!(store.put(MetricRecord::new("jobs", "counter")).is_err());
        assert!(store.delete("up").is_err());
        assert!(store.delete_all().is_err());

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("up"), Some(&up));
        assert!(store.get("jobs").is_none());
    }
}
