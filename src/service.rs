pub mod clearing;
pub mod deadline;
pub mod registrar;
pub mod ui;

pub use self::{clearing::*, deadline::*, registrar::*, ui::*};
use crate::{
    event::Event,
    event_log::{self, WithOffset},
    persistence::{SharedPersistence, Transaction},
    progress,
};
use anyhow::{format_err, Result};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};
use tracing::{debug, error};

pub type ServiceId = String;
pub type ServiceIdRef<'a> = &'a str;

const LOG_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// A service that handles events on the log
pub trait LogFollowerService: Send {
    fn get_log_progress_id(&self) -> String;

    fn handle_event<'a>(
        &mut self,
        transaction: &mut dyn Transaction<'a>,
        event: Event,
    ) -> Result<()>;
}

/// A service that is a loop that does something
pub trait LoopService: Send {
    fn get_service_id(&self) -> String;

    fn run_iteration(&mut self) -> Result<()>;
}

/// Runs every service on its own thread and stops all of them together
///
/// Any service returning an error or panicking flags `stop_all`; the other
/// loops notice it before their next iteration.
#[derive(Clone)]
pub struct ServiceControl {
    stop_all: Arc<AtomicBool>,
    progress_store: progress::SharedProgressTracker,
    persistence: SharedPersistence,
}

impl ServiceControl {
    pub fn new(
        persistence: SharedPersistence,
        progress_store: progress::SharedProgressTracker,
    ) -> Self {
        Self {
            stop_all: Default::default(),
            progress_store,
            persistence,
        }
    }

    pub fn stop_all(&self) {
        self.stop_all.store(true, Ordering::SeqCst);
    }

    pub fn spawn_log_follower(
        &self,
        service: impl LogFollowerService + 'static,
        event_reader: event_log::SharedReader,
    ) -> JoinHandle {
        let service_id = service.get_log_progress_id();
        match self.load_progress(&service_id, &event_reader) {
            Ok(offset) => {
                let mut follower = Follower {
                    service,
                    service_id: service_id.clone(),
                    offset,
                    event_reader,
                    progress_store: self.progress_store.clone(),
                    persistence: self.persistence.clone(),
                };
                self.spawn_loop_raw(service_id, move || follower.step())
            }
            // fail the same way a failing first iteration would
            Err(e) => {
                error!(service = %service_id, error = %e, "loading log progress failed");
                self.stop_all();
                JoinHandle::new(
                    Arc::new(AtomicBool::new(false)),
                    thread::spawn(move || Err(e)),
                )
            }
        }
    }

    pub fn spawn_loop(&self, mut service: impl LoopService + 'static) -> JoinHandle {
        let service_id = service.get_service_id();
        self.spawn_loop_raw(service_id, move || service.run_iteration())
    }

    fn load_progress(
        &self,
        service_id: ServiceIdRef,
        event_reader: &event_log::SharedReader,
    ) -> Result<event_log::Offset> {
        let mut connection = self.persistence.get_connection()?;
        match self.progress_store.load(&mut *connection, service_id)? {
            Some(offset) => Ok(offset),
            None => event_reader.get_start_offset(),
        }
    }

    /// Call `step` until asked to stop or until it fails
    fn spawn_loop_raw<F>(&self, service_id: ServiceId, mut step: F) -> JoinHandle
    where
        F: FnMut() -> Result<()> + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_all = self.stop_all.clone();

        let thread = thread::spawn({
            let stop = stop.clone();
            move || {
                debug!(service = %service_id, "service started");
                let should_run =
                    || !stop.load(Ordering::SeqCst) && !stop_all.load(Ordering::SeqCst);

                let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| -> Result<()> {
                    while should_run() {
                        step()?;
                    }
                    Ok(())
                }));

                let res = match res {
                    Ok(Ok(())) => {
                        debug!(service = %service_id, "service stopped");
                        return Ok(());
                    }
                    Ok(Err(e)) => {
                        error!(service = %service_id, error = %e, "service failed, stopping all");
                        Err(e)
                    }
                    Err(_panic) => {
                        error!(service = %service_id, "service panicked, stopping all");
                        Err(format_err!("service {service_id} panicked"))
                    }
                };
                stop_all.store(true, Ordering::SeqCst);
                res
            }
        });

        JoinHandle::new(stop, thread)
    }
}

/// A [`LogFollowerService`] together with its position in the log
struct Follower<S> {
    service: S,
    service_id: ServiceId,
    offset: event_log::Offset,
    event_reader: event_log::SharedReader,
    progress_store: progress::SharedProgressTracker,
    persistence: SharedPersistence,
}

impl<S: LogFollowerService> Follower<S> {
    /// Handle the next event, if one shows up within [`LOG_POLL_TIMEOUT`]
    ///
    /// The event and the new offset commit in one transaction, so a crash
    /// in between replays the event instead of losing it.
    fn step(&mut self) -> Result<()> {
        let mut connection = self.persistence.get_connection()?;

        let WithOffset {
            offset: next_offset,
            data: events,
        } = self
            .event_reader
            .read(&mut *connection, self.offset, 1, Some(LOG_POLL_TIMEOUT))?;
        if events.is_empty() {
            return Ok(());
        }

        let mut transaction = connection.start_transaction()?;
        for event in events {
            self.service.handle_event(&mut *transaction, event.details)?;
        }
        self.progress_store
            .store_tr(&mut *transaction, &self.service_id, next_offset)?;
        transaction.commit()?;

        self.offset = next_offset;
        Ok(())
    }
}

/// Stops and joins its service thread when dropped
pub struct JoinHandle {
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<Result<()>>>,
}

impl JoinHandle {
    fn new(stop: Arc<AtomicBool>, thread: thread::JoinHandle<Result<()>>) -> Self {
        Self {
            stop,
            thread: Some(thread),
        }
    }

    fn wait(&mut self) -> Result<()> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|e| format_err!("service thread died: {e:?}"))?,
            None => Ok(()),
        }
    }

    pub fn join(mut self) -> Result<()> {
        self.wait()
    }
}

impl Drop for JoinHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Err(e) = self.wait() {
            error!(error = %e, "service exited with an error");
        }
    }
}
