//! The threading mode is process-wide and can only change before the engine
//! initializes, so this file holds a single test and runs in its own process.

mod common;

use arclite::{Connection, Error};

#[test]
fn test_configure_serialized_before_and_after_open() -> anyhow::Result<()> {
    common::init_tracing();
    assert!(Connection::is_threadsafe());

    unsafe { Connection::configure_serialized() }?;

    let conn = Connection::open_in_memory()?;
    conn.exec("SELECT 1")?;

    let err = unsafe { Connection::configure_serialized() }.unwrap_err();
    assert!(
        matches!(err, Error::Misuse(_)),
        "expected misuse, got {:?}",
        err
    );
    let engine = err.engine().unwrap();
    assert_eq!(
        engine.context,
        "failed to configure SQLite for serialized threading mode"
    );
    assert_eq!((engine.code, engine.extended_code), (21, 21));

    let message = err.to_string();
    assert!(message.starts_with(&engine.context));
    assert!(message.contains(", SQLite error (21,21): "));
    Ok(())
}
