//! Append-only event log
//!
//! Services talk to each other only through here. Readers address events by
//! offset and can block until something new shows up.
mod in_memory;

pub use self::in_memory::*;

use crate::{
    event::Event,
    persistence::{Connection, Transaction},
};
use anyhow::Result;
use std::{sync::Arc, time::Duration};

pub type Offset = u64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEvent {
    pub offset: Offset,
    pub details: Event,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithOffset<T> {
    pub offset: Offset,
    pub data: T,
}

pub trait Reader: Send + Sync {
    /// Read up to `limit` events starting at `offset`
    ///
    /// If there is nothing at `offset` yet, wait up to `timeout` (forever if
    /// `None`) for a writer. The returned offset is where the next read
    /// should start.
    fn read(
        &self,
        conn: &mut dyn Connection,
        offset: Offset,
        limit: usize,
        timeout: Option<Duration>,
    ) -> Result<WithOffset<Vec<LogEvent>>>;

    fn get_start_offset(&self) -> Result<Offset>;
}

pub trait Writer: Send + Sync {
    /// Append outside of any transaction; returns the offset after the write
    fn write(&self, conn: &mut dyn Connection, events: &[Event]) -> Result<Offset>;

    fn write_tr<'a>(&self, transaction: &mut dyn Transaction<'a>, events: &[Event])
        -> Result<Offset>;
}

pub type SharedReader = Arc<dyn Reader + 'static>;
pub type SharedWriter = Arc<dyn Writer + 'static>;
