mod in_memory;

pub use self::in_memory::*;

use crate::{
    event_log::Offset,
    persistence::{Connection, Transaction},
    service::ServiceIdRef,
};
use anyhow::Result;
use std::sync::Arc;

/// A persistent store to keep track of the last processed event
pub trait ProgressTracker: Send + Sync {
    fn load(&self, conn: &mut dyn Connection, id: ServiceIdRef) -> Result<Option<Offset>>;

    fn store_tr<'a>(
        &self,
        transaction: &mut dyn Transaction<'a>,
        id: ServiceIdRef,
        offset: Offset,
    ) -> Result<()>;
}

pub type SharedProgressTracker = Arc<dyn ProgressTracker + 'static>;
