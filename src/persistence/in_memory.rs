use super::*;
use parking_lot::{Mutex, MutexGuard};

/// Fake in-memory persistence.
///
/// A transaction is a process-wide lock: while one is open no other
/// service can start one. Useful for unit-tests and single-node runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPersistence {
    lock: Arc<Mutex<()>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> SharedPersistence {
        Arc::new(Self::new())
    }
}

impl Persistence for InMemoryPersistence {
    fn get_connection(&self) -> Result<OwnedConnection> {
        Ok(Box::new(InMemoryConnection {
            lock: self.lock.clone(),
        }))
    }
}

#[derive(Debug)]
pub struct InMemoryConnection {
    lock: Arc<Mutex<()>>,
}

impl Connection for InMemoryConnection {
    fn start_transaction<'a>(&'a mut self) -> Result<OwnedTransaction<'a>> {
        Ok(Box::new(InMemoryTransaction {
            _lock_guard: self.lock.lock(),
        }))
    }
}

#[derive(Debug)]
pub struct InMemoryTransaction<'a> {
    _lock_guard: MutexGuard<'a, ()>,
}

impl<'a> Transaction<'a> for InMemoryTransaction<'a> {
    fn commit(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
