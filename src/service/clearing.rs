//! Clearing
//!
//! Runs the one and only Collecting -> Cleared transition, on the deadline
//! or when an operator asks for it. A failed run leaves the auction
//! collecting and stores nothing; the reason only goes to the log and the
//! operator, never to bidders.
use super::LogFollowerService;
use crate::{
    auction::{Phase, Rules, SeededTieBreaker},
    event::{ClearingEvent, DeadlineEvent, Event, UiEvent},
    event_log,
    persistence::Transaction,
    store::SharedAuctionStore,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info};

pub const CLEARING_SERVICE_ID: &str = "clearing";

pub struct ClearingHouse {
    store: SharedAuctionStore,
    event_writer: event_log::SharedWriter,
    rules: Arc<Rules>,
    tie_break_seed: Option<u64>,
}

impl ClearingHouse {
    pub fn new(
        store: SharedAuctionStore,
        event_writer: event_log::SharedWriter,
        rules: Arc<Rules>,
        tie_break_seed: Option<u64>,
    ) -> Self {
        Self {
            store,
            event_writer,
            rules,
            tie_break_seed,
        }
    }

    fn clear<'a>(&mut self, transaction: &mut dyn Transaction<'a>) -> Result<()> {
        let auction = self.store.load_tr(transaction)?;
        if auction.phase() == Phase::Cleared {
            debug!("auction already cleared, ignoring trigger");
            return Ok(());
        }

        let mut tie_breaker = match self.tie_break_seed {
            Some(seed) => SeededTieBreaker::with_seed(seed),
            None => SeededTieBreaker::from_entropy(),
        };

        let event = match auction.cleared(&self.rules, &mut tie_breaker) {
            Ok(cleared) => {
                self.store.store_tr(transaction, &cleared)?;
                match cleared.outcome() {
                    Some(outcome) => {
                        info!(
                            run_id = %outcome.run_id,
                            pricing_rule = %outcome.pricing_rule,
                            seed = ?outcome.tie_break_seed,
                            tied_candidates = ?outcome.clearing.tied_candidates,
                            welfare = outcome.clearing.welfare,
                            residual = outcome.clearing.residual,
                            "auction cleared"
                        );
                        ClearingEvent::Cleared {
                            run_id: outcome.run_id,
                        }
                    }
                    None => anyhow::bail!("cleared auction without an outcome"),
                }
            }
            Err(reason) => {
                error!(
                    %reason,
                    submissions = auction.snapshot().len(),
                    "clearing failed"
                );
                ClearingEvent::Failed { reason }
            }
        };

        self.event_writer
            .write_tr(transaction, &[Event::Clearing(event)])?;
        Ok(())
    }
}

impl LogFollowerService for ClearingHouse {
    fn get_log_progress_id(&self) -> String {
        CLEARING_SERVICE_ID.to_owned()
    }

    fn handle_event<'a>(
        &mut self,
        transaction: &mut dyn Transaction<'a>,
        event: Event,
    ) -> Result<()> {
        match event {
            Event::Ui(UiEvent::ClearRequested) | Event::Deadline(DeadlineEvent::Passed) => {
                debug!(?event, "clearing triggered");
                self.clear(transaction)
            }
            _ => Ok(()),
        }
    }
}
