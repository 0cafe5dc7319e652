use std::{
    error::Error,
    fmt, io,
    sync::{Arc, Mutex, PoisonError},
    thread::JoinHandle,
    time::Instant,
};

use crossbeam_channel::{RecvTimeoutError, Sender, bounded, unbounded};

use crate::{
    config::PKGLOG_CONFIG,
    level::LogLevel,
    sink::{Sink, error_chain},
};

enum Command {
    Record(BufferedRecord),
    /// Flush and acknowledge, so the caller can wait for the drain.
    Flush(Sender<()>),
    Shutdown,
}

fn writer_gone() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "log writer thread stopped")
}

struct BufferedRecord {
    caller: String,
    level: LogLevel,
    message: Option<String>,
    error: Option<String>,
}

/// Error text rendered at the call site, carried across the channel so the
/// inner sink still receives an error value.
#[derive(Debug)]
struct RenderedError(String);

impl fmt::Display for RenderedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for RenderedError {}

/// Sink decorator that hands records to a dedicated writer thread over a
/// channel, so the logging call never blocks on the inner sink's I/O. The
/// thread flushes the inner sink on the configured interval
/// (`PKGLOG_FLUSH_INTERVAL_MS`), on explicit `flush`, and at shutdown.
///
/// An explicit `flush` blocks until the thread has written out every record
/// queued ahead of it.
pub struct BufferedSink {
    sender: Sender<Command>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl BufferedSink {
    pub fn spawn(inner: impl Sink + 'static) -> Self {
        let (sender, receiver) = unbounded::<Command>();
        let handle = std::thread::spawn(move || {
            let flush_interval = PKGLOG_CONFIG.flush_interval();
            let mut last_flush = Instant::now();
            loop {
                match receiver.recv_timeout(flush_interval) {
                    Ok(Command::Record(record)) => {
                        let error = record.error.map(RenderedError);
                        let _ = inner.write(
                            &record.caller,
                            record.level,
                            record.message.as_deref(),
                            error.as_ref().map(|e| e as &dyn Error),
                        );
                        if last_flush.elapsed() >= flush_interval {
                            let _ = inner.flush();
                            last_flush = Instant::now();
                        }
                    }
                    Ok(Command::Flush(ack)) => {
                        let _ = inner.flush();
                        last_flush = Instant::now();
                        let _ = ack.send(());
                    }
                    Ok(Command::Shutdown) => {
                        let _ = inner.flush();
                        break;
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        if last_flush.elapsed() >= flush_interval {
                            let _ = inner.flush();
                            last_flush = Instant::now();
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        let _ = inner.flush();
                        break;
                    }
                }
            }
        });
        Self {
            sender,
            handle: Mutex::new(Some(handle)),
        }
    }

    fn shutdown(&self) {
        let mut guard = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = guard.take() {
            // Ignore the send error if the channel is already closed.
            let _ = self.sender.send(Command::Shutdown);
            let _ = handle.join();
        }
    }
}

impl Drop for BufferedSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Sink for BufferedSink {
    fn write(
        &self,
        caller: &str,
        level: LogLevel,
        message: Option<&str>,
        error: Option<&dyn Error>,
    ) -> io::Result<()> {
        self.sender
            .send(Command::Record(BufferedRecord {
                caller: caller.to_string(),
                level,
                message: message.map(String::from),
                error: error.map(error_chain),
            }))
            .map_err(|_| writer_gone())
    }

    /// Blocks until the writer thread has drained everything queued before
    /// this call and flushed the inner sink.
    fn flush(&self) -> io::Result<()> {
        let (ack_sender, ack_receiver) = bounded(1);
        self.sender
            .send(Command::Flush(ack_sender))
            .map_err(|_| writer_gone())?;
        ack_receiver.recv().map_err(|_| writer_gone())
    }
}

/// Keeps the active sink alive for the duration of a logging session and
/// flushes it when dropped. Hold one in `main` when using a buffered sink so
/// pending records are written out before the process exits.
#[must_use = "LoggerGuard flushes on drop; bind it with \"let _guard = ...\""]
pub struct LoggerGuard {
    sink: Arc<dyn Sink>,
}

impl LoggerGuard {
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        Self { sink }
    }
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        let _ = self.sink.flush();
    }
}
