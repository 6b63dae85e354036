//! Run tracing
//!
//! Every run owns a `Tracer` that buffers one event per model call and per
//! tool call, then appends them to a durable newline-delimited JSON log at
//! run end. Concurrent runs may share the same log file; each line is written
//! whole so independent flushes never interleave partial lines.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A durable record of one model call or one tool call within a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TraceEvent {
    /// One chat call to the model
    Llm {
        run_id: Uuid,
        step: usize,
        latency_ms: u64,
        /// Raw model output before any parsing
        raw: String,
        ts: DateTime<Utc>,
    },
    /// One tool invocation
    Tool {
        run_id: Uuid,
        step: usize,
        tool: String,
        latency_ms: u64,
        args: Map<String, Value>,
        result: Map<String, Value>,
        ts: DateTime<Utc>,
    },
}

/// Buffers trace events for a single run and flushes them to an append-only
/// NDJSON log
pub struct Tracer {
    log_path: PathBuf,
    run_id: Uuid,
    events: Vec<TraceEvent>,
}

impl Tracer {
    /// Creates a tracer with a fresh run id targeting the given log path
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            run_id: Uuid::new_v4(),
            events: Vec::new(),
        }
    }

    /// Returns the run id shared by all events of this tracer
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the buffered events, oldest first
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Returns the log path events are flushed to
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Records one model call
    pub fn record_llm(&mut self, step: usize, latency: Duration, raw: &str) {
        self.events.push(TraceEvent::Llm {
            run_id: self.run_id,
            step,
            latency_ms: latency.as_millis() as u64,
            raw: raw.to_string(),
            ts: Utc::now(),
        });
    }

    /// Records one tool invocation
    pub fn record_tool(
        &mut self,
        step: usize,
        tool: &str,
        latency: Duration,
        args: &Map<String, Value>,
        result: &Map<String, Value>,
    ) {
        self.events.push(TraceEvent::Tool {
            run_id: self.run_id,
            step,
            tool: tool.to_string(),
            latency_ms: latency.as_millis() as u64,
            args: args.clone(),
            result: result.clone(),
            ts: Utc::now(),
        });
    }

    /// Appends all buffered events to the log and clears the buffer
    ///
    /// Creates the log directory if missing. Each event is one JSON object on
    /// its own line; the whole batch goes out in a single append-mode write.
    pub fn flush(&mut self) -> io::Result<()> {
        if self.events.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.log_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut batch = String::new();
        for event in &self.events {
            let line = serde_json::to_string(event)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            batch.push_str(&line);
            batch.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        file.write_all(batch.as_bytes())?;

        tracing::debug!(
            run_id = %self.run_id,
            events = self.events.len(),
            path = %self.log_path.display(),
            "flushed trace events"
        );
        self.events.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_args() -> Map<String, Value> {
        let mut args = Map::new();
        args.insert("clauses".to_string(), json!({"liability": "none"}));
        args
    }

    #[test]
    fn test_events_share_run_id() {
        let mut tracer = Tracer::new("unused.jsonl");
        tracer.record_llm(0, Duration::from_millis(12), "{}");
        tracer.record_tool(
            0,
            "score_risk_heuristics",
            Duration::from_millis(3),
            &sample_args(),
            &Map::new(),
        );

        assert_eq!(tracer.events().len(), 2);
        for event in tracer.events() {
            let run_id = match event {
                TraceEvent::Llm { run_id, .. } => run_id,
                TraceEvent::Tool { run_id, .. } => run_id,
            };
            assert_eq!(*run_id, tracer.run_id());
        }
    }

    #[test]
    fn test_flush_writes_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("runs.jsonl");

        let mut tracer = Tracer::new(&path);
        tracer.record_llm(0, Duration::from_millis(5), "{\"status\":\"final\"}");
        tracer.record_tool(
            0,
            "extract_clauses",
            Duration::from_millis(1),
            &sample_args(),
            &Map::new(),
        );
        tracer.flush().unwrap();

        // Buffer is cleared after flush; a second flush appends nothing.
        assert!(tracer.events().is_empty());
        tracer.flush().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: TraceEvent = serde_json::from_str(lines[0]).unwrap();
        assert!(matches!(first, TraceEvent::Llm { step: 0, .. }));
        let second: TraceEvent = serde_json::from_str(lines[1]).unwrap();
        assert!(matches!(second, TraceEvent::Tool { ref tool, .. } if tool == "extract_clauses"));
    }

    #[test]
    fn test_flush_appends_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.jsonl");

        let mut first = Tracer::new(&path);
        first.record_llm(0, Duration::from_millis(1), "a");
        first.flush().unwrap();

        let mut second = Tracer::new(&path);
        second.record_llm(0, Duration::from_millis(1), "b");
        second.flush().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert_ne!(first.run_id(), second.run_id());
    }

    #[test]
    fn test_event_serialization_tag() {
        let event = TraceEvent::Llm {
            run_id: Uuid::new_v4(),
            step: 3,
            latency_ms: 250,
            raw: "{}".to_string(),
            ts: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "llm");
        assert_eq!(value["step"], 3);
        assert_eq!(value["latency_ms"], 250);
    }
}
