//! Storage of the auction itself
//!
//! There is one auction per deployment: the submissions collected so far
//! and, once cleared, its outcome.
mod in_memory;

pub use self::in_memory::*;

use crate::{
    auction::Auction,
    persistence::{Connection, Transaction},
};
use anyhow::Result;
use std::sync::Arc;

pub trait AuctionStore: Send + Sync {
    /// Read-only access for queries outside of a transaction
    fn load(&self, conn: &mut dyn Connection) -> Result<Auction>;

    fn load_tr<'a>(&self, transaction: &mut dyn Transaction<'a>) -> Result<Auction>;

    fn store_tr<'a>(&self, transaction: &mut dyn Transaction<'a>, auction: &Auction)
        -> Result<()>;
}

pub type SharedAuctionStore = Arc<dyn AuctionStore + 'static>;
