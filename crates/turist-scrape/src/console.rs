//! Serialized console output shared by all workers.
//!
//! Every call to [`Console::line`] writes exactly one complete line while
//! holding the lock, so output from concurrent units never interleaves.

use std::io::Write;
use std::sync::{Arc, Mutex};

/// Mutually-exclusive line sink injected into every worker.
pub struct Console {
    out: Mutex<Box<dyn Write + Send>>,
    quiet: bool,
}

impl Console {
    /// Console over any writer.
    pub fn new(out: impl Write + Send + 'static, quiet: bool) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
            quiet,
        }
    }

    /// Console over stdout.
    pub fn stdout(quiet: bool) -> Self {
        Self::new(std::io::stdout(), quiet)
    }

    /// Console that captures into memory, plus a handle for reading it back.
    pub fn capture() -> (Self, CaptureBuffer) {
        let buf = CaptureBuffer::default();
        (Self::new(buf.clone(), false), buf)
    }

    /// Write one progress line. Suppressed in quiet mode.
    pub fn line(&self, msg: impl AsRef<str>) {
        if !self.quiet {
            self.write_line(msg.as_ref());
        }
    }

    /// Write one line even in quiet mode (summaries, fatal errors).
    pub fn always(&self, msg: impl AsRef<str>) {
        self.write_line(msg.as_ref());
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    fn write_line(&self, msg: &str) {
        let mut buf = String::with_capacity(msg.len() + 1);
        buf.push_str(msg);
        buf.push('\n');

        // A poisoned lock only means another worker panicked mid-write;
        // the writer itself is still usable.
        let mut out = match self.out.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _ = out.write_all(buf.as_bytes());
        let _ = out.flush();
    }
}

/// Shared in-memory writer returned by [`Console::capture`].
#[derive(Clone, Default)]
pub struct CaptureBuffer(Arc<Mutex<Vec<u8>>>);

impl CaptureBuffer {
    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        let bytes = match self.0.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(String::from).collect()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        let mut guard = match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
