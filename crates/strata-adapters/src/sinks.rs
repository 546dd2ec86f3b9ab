//! JSON-lines file sinks for `tracing`.
//!
//! [`JsonFileSinks`] is both the [`LogSinks`] registry used by the settings
//! store and the [`MakeWriter`] behind a `tracing-subscriber` JSON layer.
//! Every formatted record is appended to each registered file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::Subscriber;
use tracing_subscriber::{Layer, fmt, fmt::MakeWriter, registry::LookupSpan};

use strata_core::{
    application::{ApplicationError, ports::LogSinks},
    error::StrataResult,
};

#[derive(Debug)]
struct FileSink {
    path: PathBuf,
    file: File,
}

/// Registry of structured log files. Clones share the registry.
#[derive(Debug, Clone, Default)]
pub struct JsonFileSinks {
    inner: Arc<Mutex<Vec<FileSink>>>,
}

impl JsonFileSinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `fmt` layer that writes one flattened JSON object per event to every
    /// registered file.
    ///
    /// Records carry `timestamp`, `level`, `target` and `message` plus the
    /// event's own fields.
    pub fn layer<S>(&self) -> impl Layer<S> + Send + Sync + 'static
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_ansi(false)
            .with_target(true)
            .with_writer(self.clone())
    }
}

impl LogSinks for JsonFileSinks {
    fn attach(&self, path: &Path) -> StrataResult<bool> {
        let sink_error = |e: io::Error| ApplicationError::SinkAttach {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        // No logging while the registry is locked: the writer takes the same lock.
        let mut sinks = self
            .inner
            .lock()
            .map_err(|_| ApplicationError::StoreLockError)?;
        if sinks.iter().any(|sink| sink.path == path) {
            return Ok(false);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(sink_error)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(sink_error)?;

        sinks.push(FileSink {
            path: path.to_path_buf(),
            file,
        });
        Ok(true)
    }

    fn destinations(&self) -> Vec<PathBuf> {
        self.inner
            .lock()
            .map(|sinks| sinks.iter().map(|sink| sink.path.clone()).collect())
            .unwrap_or_default()
    }
}

/// Writer handed out per event; fans the record out to every file.
pub struct SinkWriter {
    sinks: Arc<Mutex<Vec<FileSink>>>,
}

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut sinks = self
            .sinks
            .lock()
            .map_err(|_| io::Error::other("log sink registry poisoned"))?;

        let mut first_error = None;
        for sink in sinks.iter_mut() {
            if let Err(e) = sink.file.write_all(buf) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(buf.len()), Err)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut sinks = self
            .sinks
            .lock()
            .map_err(|_| io::Error::other("log sink registry poisoned"))?;
        for sink in sinks.iter_mut() {
            sink.file.flush()?;
        }
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for JsonFileSinks {
    type Writer = SinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter {
            sinks: Arc::clone(&self.inner),
        }
    }
}
