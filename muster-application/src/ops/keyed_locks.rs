use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

type RecordKey = (String, String);

/// Per-(member, event) mutual exclusion for check-then-write sequences.
#[derive(Default)]
pub struct KeyedLocks {
    slots: Mutex<HashMap<RecordKey, Arc<Mutex<()>>>>,
}

/// Releases the key when dropped.
pub struct KeyedGuard {
    _guard: OwnedMutexGuard<()>,
}

impl KeyedLocks {
    pub async fn lock(&self, member_id: &str, event_id: &str) -> KeyedGuard {
        let slot = {
            let mut slots = self.slots.lock().await;
            // only the map holds these; nobody is waiting on them
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots
                .entry((member_id.to_string(), event_id.to_string()))
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        KeyedGuard {
            _guard: slot.lock_owned().await,
        }
    }

    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }
}
