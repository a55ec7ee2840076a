use std::{collections::HashMap, sync::Arc};

use meter_domain::domain::Reading;
use parking_lot::RwLock;

/// Latest reading per meter id.
///
/// Cloning yields another handle onto the same map. Lock hold time is a
/// single map insert or a clone of the values; no I/O happens under it.
#[derive(Clone, Default)]
pub struct ReadingStore {
    inner: Arc<RwLock<HashMap<u64, Reading>>>,
}

impl ReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, meter_id: u64, reading: Reading) {
        self.inner.write().insert(meter_id, reading);
    }

    /// Point-in-time copy of every stored reading, ordered by meter id.
    pub fn snapshot(&self) -> Vec<Reading> {
        let mut readings: Vec<Reading> = self.inner.read().values().cloned().collect();
        readings.sort_unstable_by_key(Reading::meter_id);
        readings
    }

    pub fn get(&self, meter_id: u64) -> Option<Reading> {
        self.inner.read().get(&meter_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_domain::domain::{MeterType, ScmMessage};
    use time::macros::datetime;

    fn reading(meter_id: u64, consumption: u64) -> Reading {
        Reading {
            time: datetime!(2025-12-05 16:44:45 UTC),
            offset: 0,
            meter_type: MeterType::Scm,
            message: ScmMessage {
                meter_id,
                protocol_type: 12,
                consumption,
            },
        }
    }

    #[test]
    fn empty_store_snapshots_to_nothing() {
        let store = ReadingStore::new();
        assert!(store.is_empty());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn last_write_wins_per_meter() {
        let store = ReadingStore::new();
        for v in [10, 5, 30, 20] {
            store.upsert(5, reading(5, v));
        }
        store.upsert(6, reading(6, 1));

        let snap = store.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].message.meter_id, 5);
        assert_eq!(snap[0].message.consumption, 20);
        assert_eq!(snap[1].message.meter_id, 6);
    }

    #[test]
    fn concurrent_upserts_to_distinct_meters_are_not_lost() {
        let store = ReadingStore::new();
        let writers: Vec<_> = (0..8u64)
            .map(|w| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..100u64 {
                        let id = w * 1000 + i;
                        store.upsert(id, reading(id, i));
                        store.upsert(id, reading(id, i + 1));
                    }
                })
            })
            .collect();

        let reader = {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..50 {
                    let snap = store.snapshot();
                    assert!(snap.windows(2).all(|w| w[0].meter_id() < w[1].meter_id()));
                }
            })
        };

        for w in writers {
            w.join().unwrap();
        }
        reader.join().unwrap();

        assert_eq!(store.len(), 800);
        for w in 0..8u64 {
            for i in 0..100u64 {
                let r = store.get(w * 1000 + i).unwrap();
                assert_eq!(r.message.consumption, i + 1);
            }
        }
    }
}
