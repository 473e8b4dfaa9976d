use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

pub type EventPayload = Map<String, Value>;

pub const RESEARCH_STARTED: &str = "research_started";
pub const RESEARCH_FINISHED: &str = "research_finished";
pub const IMAGE_REQUESTED: &str = "image_requested";
pub const IMAGE_PRODUCED: &str = "image_produced";
pub const IMAGE_MISSING: &str = "image_missing";
pub const ACCURACY_CHECK_BYPASSED: &str = "accuracy_check_bypassed";

/// Append-only JSONL log of pipeline calls.
///
/// Every line carries `type`, `run_id`, a per-writer `seq` and `ts`; the caller
/// payload is merged last. Clones share the sequence counter and file lock.
#[derive(Debug, Clone)]
pub struct EventWriter {
    inner: Arc<EventWriterInner>,
}

#[derive(Debug)]
struct EventWriterInner {
    path: PathBuf,
    run_id: String,
    seq: AtomicU64,
    lock: Mutex<()>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventWriterInner {
                path: path.into(),
                run_id: run_id.into(),
                seq: AtomicU64::new(0),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn with_generated_run_id(path: impl Into<PathBuf>) -> Self {
        Self::new(path, format!("run-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn run_id(&self) -> &str {
        &self.inner.run_id
    }

    pub fn emit(&self, event_type: &str, payload: EventPayload) -> anyhow::Result<Value> {
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("event writer lock poisoned"))?;
        let mut event = Map::new();
        event.insert("type".to_string(), Value::String(event_type.to_string()));
        event.insert(
            "run_id".to_string(),
            Value::String(self.inner.run_id.clone()),
        );
        event.insert(
            "seq".to_string(),
            Value::from(self.inner.seq.fetch_add(1, Ordering::SeqCst)),
        );
        event.insert(
            "ts".to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)),
        );
        event.extend(payload);

        let line = serde_json::to_string(&event)?;
        if let Some(parent) = self
            .inner
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)
            .with_context(|| format!("failed to open {}", self.inner.path.display()))?;
        writeln!(file, "{line}")?;

        Ok(Value::Object(event))
    }
}
