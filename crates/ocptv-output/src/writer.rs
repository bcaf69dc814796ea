//! # Output sinks
//!
//! A [`Writer`] receives one fully rendered JSON line per call, without the
//! trailing newline. Implementations must not interleave concurrent calls.
//!
//! | Sink | Target |
//! |------|--------|
//! | [`StdoutWriter`] | process stdout, locked per line |
//! | [`StreamWriter`] | any `io::Write` behind a mutex, flushed per line |
//! | [`BufferWriter`] | in-memory line list |

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// Destination for serialized output lines.
pub trait Writer: Send + Sync {
    fn write(&self, line: &str) -> io::Result<()>;
}

impl<W: Writer + ?Sized> Writer for Arc<W> {
    fn write(&self, line: &str) -> io::Result<()> {
        (**self).write(line)
    }
}

/// Writes each line to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutWriter;

impl StdoutWriter {
    /// Writer for the process stdout.
    pub fn new() -> Self {
        Self
    }
}

impl Writer for StdoutWriter {
    fn write(&self, line: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(line.as_bytes())?;
        stdout.write_all(b"\n")?;
        stdout.flush()
    }
}

/// Newline-delimited writer over any byte stream.
#[derive(Debug)]
pub struct StreamWriter<W: Write + Send> {
    inner: Mutex<W>,
}

impl<W: Write + Send> StreamWriter<W> {
    /// Wrap `writer`; every line is flushed.
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(writer),
        }
    }

    /// Consume the writer and return the underlying stream.
    pub fn into_inner(self) -> W {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StreamWriter<File> {
    /// Create (or truncate) a file sink.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        File::create(path).map(Self::new)
    }
}

impl<W: Write + Send> Writer for StreamWriter<W> {
    fn write(&self, line: &str) -> io::Result<()> {
        let mut writer = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

/// Collects lines in memory.
#[derive(Debug, Default)]
pub struct BufferWriter {
    lines: Mutex<Vec<String>>,
}

impl BufferWriter {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Lines joined as an NDJSON document.
    pub fn contents(&self) -> String {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        let mut contents = String::new();
        for line in lines.iter() {
            contents.push_str(line);
            contents.push('\n');
        }
        contents
    }

    /// Drop every captured line.
    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Writer for BufferWriter {
    fn write(&self, line: &str) -> io::Result<()> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_owned());
        Ok(())
    }
}
