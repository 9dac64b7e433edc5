use super::*;
use crate::service::ServiceId;
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Default)]
pub struct InMemoryProgressTracker {
    store: Mutex<BTreeMap<ServiceId, Offset>>,
}

impl InMemoryProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> SharedProgressTracker {
        Arc::new(Self::new())
    }
}

impl ProgressTracker for InMemoryProgressTracker {
    fn load(&self, _conn: &mut dyn Connection, id: ServiceIdRef) -> Result<Option<Offset>> {
        Ok(self.store.lock().get(id).copied())
    }

    fn store_tr<'a>(
        &self,
        _transaction: &mut dyn Transaction<'a>,
        id: ServiceIdRef,
        offset: Offset,
    ) -> Result<()> {
        self.store.lock().insert(id.to_owned(), offset);
        Ok(())
    }
}
