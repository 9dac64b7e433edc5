//! Database persistence traits
//!
//! Stores never open their own transactions. Services start one, pass it to
//! every store they touch while handling an event, and commit once, so the
//! submission set, the clearing outcome, the event log and the log progress
//! move together.
mod in_memory;

pub use self::in_memory::*;

use anyhow::Result;
use std::sync::Arc;

/// An instance of a persistence (store) that can hold data
pub trait Persistence: Send + Sync {
    /// Get a connection to a store
    fn get_connection(&self) -> Result<OwnedConnection>;
}

/// A connection to a database/persistence
pub trait Connection {
    fn start_transaction<'a>(&'a mut self) -> Result<OwnedTransaction<'a>>;
}

/// A database transaction to a database/persistence
pub trait Transaction<'a> {
    fn commit(self: Box<Self>) -> Result<()>;
}

pub type OwnedConnection = Box<dyn Connection>;
pub type OwnedTransaction<'a> = Box<dyn Transaction<'a> + 'a>;
pub type SharedPersistence = Arc<dyn Persistence>;
