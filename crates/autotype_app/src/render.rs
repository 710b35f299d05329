//! JSON-lines output on stdout.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use autotype_bridge::{BridgeError, BridgeEvent};
use autotype_logging::autotype_warn;
use serde::Serialize;
use serde_json::{json, Value};

pub fn event(event: &BridgeEvent) -> Value {
    serde_json::to_value(event).unwrap_or_else(|err| json!({"error": err.to_string()}))
}

pub fn success<T: Serialize>(command: &str, data: &T) -> Value {
    match serde_json::to_value(data) {
        Ok(data) => json!({"command": command, "ok": true, "data": data}),
        Err(err) => json!({"command": command, "ok": false, "error": err.to_string()}),
    }
}

pub fn failure(command: &str, err: &BridgeError) -> Value {
    let kind = match err {
        BridgeError::Worker(err) => err.kind.to_string(),
        BridgeError::Session(_) => "state conflict".to_string(),
    };
    json!({"command": command, "ok": false, "kind": kind, "error": err.to_string()})
}

pub fn outcome<T: Serialize, E: Into<BridgeError>>(command: &str, result: Result<T, E>) -> Value {
    match result {
        Ok(data) => success(command, &data),
        Err(err) => failure(command, &err.into()),
    }
}

static STDOUT_CLOSED: AtomicBool = AtomicBool::new(false);

/// Prints one line. Once the reader has gone away, output is dropped.
pub fn emit(line: &Value) {
    if let Err(err) = write_line(&mut io::stdout().lock(), line, &STDOUT_CLOSED) {
        autotype_warn!("Failed to write output: {}", err);
    }
}

/// True after a write found stdout closed.
pub fn stdout_closed() -> bool {
    STDOUT_CLOSED.load(Ordering::Relaxed)
}

fn write_line(out: &mut impl Write, line: &Value, closed: &AtomicBool) -> io::Result<()> {
    if closed.load(Ordering::Relaxed) {
        return Ok(());
    }
    match writeln!(out, "{line}").and_then(|()| out.flush()) {
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
            closed.store(true, Ordering::Relaxed);
            Ok(())
        }
        other => other,
    }
}
