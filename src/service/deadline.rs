use super::LoopService;
use crate::{
    event::{DeadlineEvent, Event},
    event_log,
    persistence::SharedPersistence,
};
use anyhow::Result;
use std::time::{Duration, SystemTime};
use tracing::info;

pub const DEADLINE_SERVICE_ID: &str = "deadline";

// upper bound on a sleep, so stop requests are noticed
const TICK: Duration = Duration::from_secs(1);

/// Announces once that the submission deadline passed
pub struct Deadline {
    at: SystemTime,
    announced: bool,
    persistence: SharedPersistence,
    event_writer: event_log::SharedWriter,
}

impl Deadline {
    pub fn new(
        at: SystemTime,
        persistence: SharedPersistence,
        event_writer: event_log::SharedWriter,
    ) -> Self {
        Self {
            at,
            announced: false,
            persistence,
            event_writer,
        }
    }
}

impl LoopService for Deadline {
    fn get_service_id(&self) -> String {
        DEADLINE_SERVICE_ID.to_owned()
    }

    fn run_iteration(&mut self) -> Result<()> {
        if self.announced {
            std::thread::sleep(TICK);
            return Ok(());
        }

        match self.at.duration_since(SystemTime::now()) {
            Ok(remaining) if !remaining.is_zero() => std::thread::sleep(remaining.min(TICK)),
            _ => {
                let mut connection = self.persistence.get_connection()?;
                self.event_writer
                    .write(&mut *connection, &[Event::Deadline(DeadlineEvent::Passed)])?;
                info!(deadline = %humantime::format_rfc3339_seconds(self.at), "deadline passed");
                self.announced = true;
            }
        }
        Ok(())
    }
}
