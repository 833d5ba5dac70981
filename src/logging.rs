//! Per-export structured log file.
//!
//! One line per event: `<RFC3339 timestamp> run=<id> event=<name> key=value ...`. Lines are written
//! whole under a lock and flushed immediately, so a crash leaves a readable prefix.

use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use parking_lot::Mutex;

use crate::foundation::error::RenderResult;

/// Directory used when settings do not name one.
pub fn default_log_dir() -> PathBuf {
    std::env::temp_dir().join("photoreel-logs")
}

/// Cheap-to-clone handle to an append-only log. A disabled logger only mirrors to `tracing`.
#[derive(Clone)]
pub struct RenderLogger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    run_id: String,
    path: Option<PathBuf>,
    writer: Option<Mutex<BufWriter<File>>>,
}

impl std::fmt::Debug for RenderLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderLogger")
            .field("run_id", &self.inner.run_id)
            .field("path", &self.inner.path)
            .finish()
    }
}

impl RenderLogger {
    /// Create `<dir>/photoreel-<timestamp>-<run>.log` and open it for appending.
    pub fn create_in(dir: &Path) -> RenderResult<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create log dir '{}'", dir.display()))?;
        let run_id = new_run_id();
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S");
        let path = dir.join(format!("photoreel-{stamp}-{run_id}.log"));
        Self::open(&path, run_id)
    }

    /// Append to `path`, tagging every line with `run_id`.
    pub fn open(path: &Path, run_id: impl Into<String>) -> RenderResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file '{}'", path.display()))?;
        Ok(Self {
            inner: Arc::new(LoggerInner {
                run_id: run_id.into(),
                path: Some(path.to_path_buf()),
                writer: Some(Mutex::new(BufWriter::new(file))),
            }),
        })
    }

    pub fn disabled() -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                run_id: new_run_id(),
                path: None,
                writer: None,
            }),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.inner.run_id
    }

    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// Append one event line.
    ///
    /// Write failures are reported through `tracing` and otherwise ignored; logging never fails
    /// a render.
    pub fn event(&self, name: &str, fields: &[(&str, &dyn Display)]) {
        let line = self.format_line(name, fields);
        tracing::debug!(target: "photoreel::render_log", "{line}");

        let Some(writer) = &self.inner.writer else {
            return;
        };
        let mut w = writer.lock();
        let res = writeln!(w, "{line}").and_then(|()| w.flush());
        if let Err(e) = res {
            tracing::warn!(error = %e, "render log write failed");
        }
    }

    fn format_line(&self, name: &str, fields: &[(&str, &dyn Display)]) -> String {
        let mut line = format!(
            "{} run={} event={}",
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            self.inner.run_id,
            name
        );
        for (key, value) in fields {
            line.push(' ');
            line.push_str(key);
            line.push('=');
            push_value(&mut line, &value.to_string());
        }
        line
    }
}

fn new_run_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

fn push_value(line: &mut String, value: &str) {
    let needs_quotes = value.is_empty() || value.chars().any(|c| c.is_whitespace() || c == '"');
    if !needs_quotes {
        line.push_str(value);
        return;
    }
    line.push('"');
    for ch in value.chars() {
        match ch {
            '"' => line.push_str("\\\""),
            '\n' => line.push_str("\\n"),
            '\r' => {}
            c => line.push(c),
        }
    }
    line.push('"');
}

#[cfg(test)]
#[path = "../tests/unit/logging.rs"]
mod tests;
