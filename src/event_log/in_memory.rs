use super::*;
use anyhow::format_err;
use parking_lot::{Condvar, Mutex};

pub struct InMemoryLog {
    events: Mutex<Vec<Event>>,
    appended: Condvar,
}

impl InMemoryLog {
    fn append(&self, events: &[Event]) -> Result<Offset> {
        let mut log = self.events.lock();

        log.extend_from_slice(events);
        self.appended.notify_all();

        Ok(Offset::try_from(log.len())?)
    }
}

impl Reader for InMemoryLog {
    fn read(
        &self,
        _conn: &mut dyn Connection,
        offset: Offset,
        limit: usize,
        timeout: Option<Duration>,
    ) -> Result<WithOffset<Vec<LogEvent>>> {
        let start = usize::try_from(offset)?;

        let mut log = self.events.lock();

        if log.len() == start {
            match timeout {
                Some(timeout) => {
                    self.appended.wait_for(&mut log, timeout);
                }
                None => self.appended.wait(&mut log),
            }
        }

        let data = log
            .get(start..)
            .ok_or_else(|| format_err!("offset {offset} past the end of the log"))?
            .iter()
            .take(limit)
            .zip(offset..)
            .map(|(e, offset)| LogEvent {
                offset,
                details: e.clone(),
            })
            .collect::<Vec<_>>();

        Ok(WithOffset {
            offset: offset + Offset::try_from(data.len())?,
            data,
        })
    }

    fn get_start_offset(&self) -> Result<Offset> {
        Ok(0)
    }
}

impl Writer for InMemoryLog {
    fn write(&self, _conn: &mut dyn Connection, events: &[Event]) -> Result<Offset> {
        self.append(events)
    }

    fn write_tr<'a>(
        &self,
        _transaction: &mut dyn Transaction<'a>,
        events: &[Event],
    ) -> Result<Offset> {
        self.append(events)
    }
}

pub fn new_in_memory_shared() -> (SharedWriter, SharedReader) {
    let log = Arc::new(InMemoryLog {
        events: Mutex::new(Vec::new()),
        appended: Condvar::new(),
    });
    (log.clone(), log)
}
