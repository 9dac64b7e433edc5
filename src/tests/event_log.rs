use std::time::Duration;

use crate::{
    event::*,
    event_log::{self, LogEvent, WithOffset},
    persistence::{self, Persistence},
};
use anyhow::Result;

#[test]
fn event_logs_sanity_check() -> Result<()> {
    let persistence = persistence::InMemoryPersistence::new();
    let (event_writer, event_reader) = event_log::new_in_memory_shared();

    let start_offset = event_reader.get_start_offset()?;

    let mut conn = persistence.get_connection()?;

    assert_eq!(
        event_reader.read(&mut *conn, start_offset, 0, Some(Duration::from_secs(0)))?,
        WithOffset {
            offset: start_offset,
            data: vec![]
        }
    );

    assert_eq!(
        event_reader.read(&mut *conn, start_offset, 1, Some(Duration::from_secs(0)))?,
        WithOffset {
            offset: start_offset,
            data: vec![]
        }
    );

    let inserted_offset = event_writer.write(&mut *conn, &[Event::Test])?;

    assert_eq!(
        event_reader.read(&mut *conn, inserted_offset, 1, Some(Duration::from_secs(0)))?,
        WithOffset {
            offset: inserted_offset,
            data: vec![]
        }
    );

    assert_eq!(
        event_reader.read(&mut *conn, start_offset, 1, Some(Duration::from_secs(0)))?,
        WithOffset {
            offset: inserted_offset,
            data: vec![LogEvent {
                offset: start_offset,
                details: Event::Test
            }]
        }
    );

    Ok(())
}

#[test]
fn transactional_writes_append_in_order() -> Result<()> {
    let persistence = persistence::InMemoryPersistence::new();
    let (event_writer, event_reader) = event_log::new_in_memory_shared();
    let mut conn = persistence.get_connection()?;

    {
        let mut transaction = conn.start_transaction()?;
        event_writer.write_tr(
            &mut *transaction,
            &[Event::Ui(UiEvent::ClearRequested), Event::Test],
        )?;
        transaction.commit()?;
    }
    let end = event_writer.write(&mut *conn, &[Event::Deadline(DeadlineEvent::Passed)])?;
    assert_eq!(end, 3);

    let WithOffset { offset, data } = event_reader.read(&mut *conn, 1, 10, None)?;
    assert_eq!(offset, 3);
    assert_eq!(
        data.into_iter().map(|e| (e.offset, e.details)).collect::<Vec<_>>(),
        vec![(1, Event::Test), (2, Event::Deadline(DeadlineEvent::Passed))]
    );
    Ok(())
}

#[test]
fn reading_past_the_end_is_an_error() -> Result<()> {
    let persistence = persistence::InMemoryPersistence::new();
    let (_, event_reader) = event_log::new_in_memory_shared();
    let mut conn = persistence.get_connection()?;

    assert!(event_reader
        .read(&mut *conn, 5, 1, Some(Duration::from_secs(0)))
        .is_err());
    Ok(())
}
