//! Registrar
//!
//! Turns submitted bid forms into part of the auction. The form was already
//! sanitized by the Ui; what can still go wrong here is timing (the auction
//! cleared or filled up in the meantime) or a second submission from the
//! same participant.
use super::LogFollowerService;
use crate::{
    auction::{Rules, Submission},
    event::{Event, RegistrarEvent, UiEvent},
    event_log,
    persistence::Transaction,
    store::SharedAuctionStore,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const REGISTRAR_SERVICE_ID: &str = "registrar";

pub struct Registrar {
    store: SharedAuctionStore,
    event_writer: event_log::SharedWriter,
    rules: Arc<Rules>,
}

impl Registrar {
    pub fn new(
        store: SharedAuctionStore,
        event_writer: event_log::SharedWriter,
        rules: Arc<Rules>,
    ) -> Self {
        Self {
            store,
            event_writer,
            rules,
        }
    }

    fn handle_submission<'a>(
        &mut self,
        transaction: &mut dyn Transaction<'a>,
        submission: Submission,
    ) -> Result<()> {
        let participant = submission.participant.id.clone();
        let auction = self.store.load_tr(transaction)?;

        let event = match auction.with_submission(submission, self.rules.positions) {
            Ok(auction) => {
                self.store.store_tr(transaction, &auction)?;
                info!(
                    %participant,
                    submissions = auction.snapshot().len(),
                    "submission accepted"
                );
                RegistrarEvent::Accepted { participant }
            }
            Err(reason) => {
                warn!(%participant, %reason, "submission rejected");
                RegistrarEvent::Rejected {
                    participant,
                    reason,
                }
            }
        };

        self.event_writer
            .write_tr(transaction, &[Event::Registrar(event)])?;
        Ok(())
    }
}

impl LogFollowerService for Registrar {
    fn get_log_progress_id(&self) -> String {
        REGISTRAR_SERVICE_ID.to_owned()
    }

    fn handle_event<'a>(
        &mut self,
        transaction: &mut dyn Transaction<'a>,
        event: Event,
    ) -> Result<()> {
        debug!(?event, "event");
        match event {
            Event::Ui(UiEvent::BidSubmitted(submission)) => {
                self.handle_submission(transaction, submission)
            }
            _ => Ok(()),
        }
    }
}
