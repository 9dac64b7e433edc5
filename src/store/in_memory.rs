use super::*;
use parking_lot::Mutex;

#[derive(Default)]
pub struct InMemoryAuctionStore(Mutex<Auction>);

impl InMemoryAuctionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> SharedAuctionStore {
        Arc::new(Self::new())
    }
}

impl AuctionStore for InMemoryAuctionStore {
    fn load(&self, _conn: &mut dyn Connection) -> Result<Auction> {
        Ok(self.0.lock().clone())
    }

    fn load_tr<'a>(&self, _transaction: &mut dyn Transaction<'a>) -> Result<Auction> {
        Ok(self.0.lock().clone())
    }

    fn store_tr<'a>(
        &self,
        _transaction: &mut dyn Transaction<'a>,
        auction: &Auction,
    ) -> Result<()> {
        *self.0.lock() = auction.clone();
        Ok(())
    }
}
