//! In-flight computation markers
//!
//! When miss coalescing is on, the first caller to miss a key becomes its
//! leader and computes; later callers for the same key wait until the leader
//! is done and then look the key up again.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

// == Inflight Slot ==
#[derive(Debug, Default)]
pub(crate) struct InflightSlot {
    done: Mutex<bool>,
    ready: Condvar,
}

impl InflightSlot {
    /// Blocks until the leader releases the slot.
    pub(crate) fn wait(&self) {
        let mut done = self.done.lock();
        while !*done {
            self.ready.wait(&mut done);
        }
    }

    fn finish(&self) {
        *self.done.lock() = true;
        self.ready.notify_all();
    }
}

// == Claim ==
pub(crate) enum Claim<'a> {
    /// The caller must compute; the slot is released when the guard drops
    Leader(InflightGuard<'a>),
    /// Another caller is computing this key
    Follower(Arc<InflightSlot>),
}

// == Inflight Guard ==
/// Releases the leader's slot on drop, including when the computation panics.
pub(crate) struct InflightGuard<'a> {
    table: &'a InflightTable,
    key: String,
    slot: Arc<InflightSlot>,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.table.slots.lock().remove(&self.key);
        self.slot.finish();
    }
}

// == Inflight Table ==
#[derive(Debug, Default)]
pub(crate) struct InflightTable {
    slots: Mutex<HashMap<String, Arc<InflightSlot>>>,
}

impl InflightTable {
    /// Registers the caller as leader for `key`, or returns the running slot.
    pub(crate) fn claim(&self, key: &str) -> Claim<'_> {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get(key) {
            return Claim::Follower(Arc::clone(slot));
        }

        let slot = Arc::new(InflightSlot::default());
        slots.insert(key.to_string(), Arc::clone(&slot));
        Claim::Leader(InflightGuard {
            table: self,
            key: key.to_string(),
            slot,
        })
    }

    /// Number of keys currently being computed.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_first_claim_leads_second_follows() {
        let table = InflightTable::default();

        let leader = table.claim("k");
        assert!(matches!(leader, Claim::Leader(_)));
        assert!(matches!(table.claim("k"), Claim::Follower(_)));
        assert!(matches!(table.claim("other"), Claim::Leader(_)));

        drop(leader);
        assert_eq!(table.len(), 0);
        assert!(matches!(table.claim("k"), Claim::Leader(_)));
    }

    #[test]
    fn test_follower_wakes_when_leader_drops() {
        let table = Arc::new(InflightTable::default());
        let leader = table.claim("k");

        let follower = {
            let table = Arc::clone(&table);
            thread::spawn(move || match table.claim("k") {
                Claim::Follower(slot) => {
                    slot.wait();
                    true
                }
                Claim::Leader(_) => false,
            })
        };

        thread::sleep(Duration::from_millis(20));
        drop(leader);

        assert!(follower.join().unwrap());
        assert_eq!(table.len(), 0);
    }
}
