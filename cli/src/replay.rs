//! Replay of recorded message captures
//!
//! A capture is a JSON-lines file, one intercepted message per line with the
//! session time it was seen at:
//!
//! ```text
//! {"at": 0, "message": {"type": "login", "game_id": 7, "template_id": 10101}}
//! {"at": 6050, "message": {"type": "response_gamestat_pong"}}
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use foresight_core::protocol::{Inbound, Outbound, Verdict};
use foresight_core::{Delivery, Millis, SessionContext, run_session};
use foresight_types::formatting::trace_stamp as stamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Line {line}: time {at} is before the previous entry ({previous})")]
    OutOfOrder {
        line: usize,
        at: Millis,
        previous: Millis,
    },
}

/// One captured message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayEntry {
    pub at: Millis,
    pub message: Inbound,
}

pub fn read_replay(path: &Path) -> Result<Vec<ReplayEntry>, ReplayError> {
    let file = std::fs::File::open(path).map_err(|source| ReplayError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_replay(std::io::BufReader::new(file), path)
}

/// Parse a capture. Entries must be in time order.
pub fn parse_replay(reader: impl BufRead, path: &Path) -> Result<Vec<ReplayEntry>, ReplayError> {
    let mut entries: Vec<ReplayEntry> = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_number = idx + 1;
        let line = line.map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let entry: ReplayEntry = serde_json::from_str(line).map_err(|source| ReplayError::Json {
            line: line_number,
            source,
        })?;
        if let Some(previous) = entries.last()
            && entry.at < previous.at
        {
            return Err(ReplayError::OutOfOrder {
                line: line_number,
                at: entry.at,
                previous: previous.at,
            });
        }
        entries.push(entry);
    }

    Ok(entries)
}

/// Feed a capture through `context` as fast as possible.
///
/// Returns one printable line per delivery. With `until`, entries after that
/// time are dropped and timers are run up to it once the capture is over.
pub fn replay_offline(
    context: &mut SessionContext,
    entries: &[ReplayEntry],
    until: Option<Millis>,
) -> Vec<String> {
    let mut lines = Vec::new();

    for entry in entries {
        if until.is_some_and(|until| entry.at > until) {
            break;
        }
        run_timers(context, entry.at, &mut lines);

        let verdict = context.handle(&entry.message, entry.at);
        emit_pending(context, &mut lines);
        let delivery = match verdict {
            Verdict::Pass => Some(Delivery::Forward(entry.message.clone())),
            Verdict::Rewrite(message) => Some(Delivery::Send(Outbound::Client(message))),
            Verdict::Block => None,
        };
        match delivery {
            Some(delivery) => lines.push(describe(context.now(), &delivery)),
            None => lines.push(format!("{} blocked {}", stamp(context.now()), entry.message.name())),
        }
    }

    if let Some(until) = until {
        run_timers(context, until, &mut lines);
    }
    lines
}

/// Fire timers one deadline at a time so each delivery carries the time it
/// was actually due.
fn run_timers(context: &mut SessionContext, until: Millis, lines: &mut Vec<String>) {
    while let Some(deadline) = context.next_deadline().filter(|deadline| *deadline <= until) {
        context.advance(deadline);
        emit_pending(context, lines);
    }
    context.advance(until);
}

/// Feed a capture through `context` at its recorded pace, printing each
/// delivery as the session driver produces it.
pub async fn replay_realtime(
    context: &mut SessionContext,
    entries: Vec<ReplayEntry>,
    until: Option<Millis>,
) -> usize {
    let base = context.now();
    let (in_tx, in_rx) = mpsc::channel(64);
    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    let epoch = Instant::now();

    let producer = async move {
        for entry in entries {
            if until.is_some_and(|until| entry.at > until) {
                break;
            }
            tokio::time::sleep_until(epoch + Duration::from_millis(entry.at.saturating_sub(base)))
                .await;
            if in_tx.send(entry.message).await.is_err() {
                return;
            }
        }
        if let Some(until) = until {
            tokio::time::sleep_until(epoch + Duration::from_millis(until.saturating_sub(base)))
                .await;
        }
    };

    let printer = async move {
        while let Some(delivery) = out_rx.recv().await {
            let now = base + u64::try_from(epoch.elapsed().as_millis()).unwrap_or(u64::MAX);
            println!("{}", describe(now, &delivery));
        }
    };

    let (_, handled, _) = tokio::join!(producer, run_session(context, in_rx, out_tx), printer);
    handled
}

fn emit_pending(context: &mut SessionContext, lines: &mut Vec<String>) {
    let now = context.now();
    for message in context.take_outbound() {
        lines.push(describe(now, &Delivery::Send(message)));
    }
    for notice in context.take_notices() {
        lines.push(describe(now, &Delivery::Notice(notice)));
    }
}

/// Render a delivery as a console line.
pub fn describe(now: Millis, delivery: &Delivery) -> String {
    match delivery {
        Delivery::Forward(message) => format!("{} forward {}", stamp(now), message.name()),
        Delivery::Send(message) => format!("{} send    {}", stamp(now), to_json(message)),
        Delivery::Notice(text) => format!("{} notice  {}", stamp(now), text),
    }
}

fn to_json(message: &Outbound) -> String {
    serde_json::to_string(message).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use foresight_core::SuppressionTable;
    use foresight_types::Settings;

    const CAPTURE: &str = r#"
# local player logs in and gets a 5s buff
{"at": 0, "message": {"type": "login", "game_id": 7, "template_id": 10101}}
{"at": 0, "message": {"type": "spawn_me"}}

{"at": 100, "message": {"type": "abnormality_begin", "target": 7, "id": 100, "duration": 5000, "stacks": 1}}
{"at": 200, "message": {"type": "abnormality_begin", "target": 8, "id": 100, "duration": 5000}}
"#;

    fn context() -> SessionContext {
        SessionContext::new(Settings::default(), SuppressionTable::new())
    }

    #[test]
    fn test_parse_capture() {
        let entries = parse_replay(CAPTURE.as_bytes(), Path::new("capture.jsonl")).unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[1].message, Inbound::SpawnMe);
        assert_eq!(entries[3].at, 200);
    }

    #[test]
    fn test_parse_reports_line_of_bad_json() {
        let input = "{\"at\": 0, \"message\": {\"type\": \"spawn_me\"}}\n{\"at\": 5, \"message\": {\"type\": \"nope\"}}\n";
        let err = parse_replay(input.as_bytes(), Path::new("x")).unwrap_err();
        assert!(matches!(err, ReplayError::Json { line: 2, .. }));
    }

    #[test]
    fn test_parse_rejects_time_going_backwards() {
        let input = "{\"at\": 10, \"message\": {\"type\": \"spawn_me\"}}\n{\"at\": 5, \"message\": {\"type\": \"load_topo\"}}\n";
        let err = parse_replay(input.as_bytes(), Path::new("x")).unwrap_err();
        assert!(matches!(
            err,
            ReplayError::OutOfOrder {
                line: 2,
                at: 5,
                previous: 10
            }
        ));
    }

    #[test]
    fn test_offline_replay_runs_timers_until_end() {
        let entries = parse_replay(CAPTURE.as_bytes(), Path::new("capture.jsonl")).unwrap();
        let mut ctx = context();

        let lines = replay_offline(&mut ctx, &entries, Some(10_000));

        assert_eq!(lines[0], "[0000] forward Login");
        assert_eq!(lines[1], "[0000] forward SpawnMe");
        assert!(lines[2].starts_with("[0100] send    {\"to\":\"client\""));
        assert!(lines[2].contains("\"duration\":5000"));
        assert_eq!(lines[3], "[0200] forward AbnormalityBegin");
        // first probe at 6000, buff runs out at 5100
        assert!(lines[4].starts_with("[5100] send") && lines[4].contains("abnormality_end"));
        assert!(lines[5].starts_with("[6000] send") && lines[5].contains("request_gamestat_ping"));
        assert_eq!(lines.len(), 6);
        assert!(ctx.abnormals().is_empty());
    }

    #[test]
    fn test_offline_replay_stops_at_until() {
        let entries = parse_replay(CAPTURE.as_bytes(), Path::new("capture.jsonl")).unwrap();
        let mut ctx = context();

        let lines = replay_offline(&mut ctx, &entries, Some(150));
        assert_eq!(lines.len(), 3);
        assert!(ctx.abnormals().exists(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_realtime_replay_handles_every_entry() {
        let entries = parse_replay(CAPTURE.as_bytes(), Path::new("capture.jsonl")).unwrap();
        let mut ctx = context();

        let handled = replay_realtime(&mut ctx, entries, Some(5_500)).await;
        assert_eq!(handled, 4);
        assert!(ctx.abnormals().is_empty(), "buff expired at 5100");
    }
}
