//! Multiplexed stdout/stderr line reader
//!
//! One [`MultiplexedReader::poll_once`] call is one poll slice: it waits at
//! most [`POLL_INTERVAL`] for either stream, takes up to [`READ_CHUNK`]
//! bytes from each stream that is ready, and returns the lines those reads
//! completed. Within a slice stderr lines come before stdout lines.

use std::time::Duration;

use futures::FutureExt;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

/// Longest wait for output in one poll slice
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Bytes read from a ready stream per slice
pub const READ_CHUNK: usize = 1024;

/// Partial-line carry for one stream
#[derive(Debug, Default)]
pub struct LineCarry {
    pending: Vec<u8>,
}

impl LineCarry {
    /// Append a chunk and return the lines it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let Some(last_newline) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        complete[..last_newline]
            .split(|b| *b == b'\n')
            .map(|line| String::from_utf8_lossy(line).trim_end().to_string())
            .collect()
    }

    /// Bytes waiting for their newline
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}

/// Reads whichever of two streams has data, one slice at a time
#[derive(Debug)]
pub struct MultiplexedReader<O, E> {
    stdout: Option<O>,
    stderr: Option<E>,
    stdout_carry: LineCarry,
    stderr_carry: LineCarry,
}

impl<O, E> MultiplexedReader<O, E>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    /// Reader over the given streams; a missing stream counts as closed
    pub fn new(stdout: Option<O>, stderr: Option<E>) -> Self {
        Self {
            stdout,
            stderr,
            stdout_carry: LineCarry::default(),
            stderr_carry: LineCarry::default(),
        }
    }

    /// Whether both streams reached EOF
    pub fn is_closed(&self) -> bool {
        self.stdout.is_none() && self.stderr.is_none()
    }

    /// Run one poll slice and return the completed lines
    pub async fn poll_once(&mut self) -> Vec<String> {
        if self.is_closed() {
            tokio::time::sleep(POLL_INTERVAL).await;
            return Vec::new();
        }

        let mut err_buf = [0u8; READ_CHUNK];
        let mut out_buf = [0u8; READ_CHUNK];
        let mut err_read = None;
        let mut out_read = None;

        let slice = tokio::time::sleep(POLL_INTERVAL);
        tokio::pin!(slice);

        tokio::select! {
            biased;
            r = read_chunk(self.stderr.as_mut(), &mut err_buf) => err_read = Some(r),
            r = read_chunk(self.stdout.as_mut(), &mut out_buf) => out_read = Some(r),
            _ = &mut slice => return Vec::new(),
        }

        // Pick up whatever the other stream already has, without waiting.
        if err_read.is_none() {
            err_read = read_chunk(self.stderr.as_mut(), &mut err_buf).now_or_never();
        }
        if out_read.is_none() {
            out_read = read_chunk(self.stdout.as_mut(), &mut out_buf).now_or_never();
        }

        let mut lines = Vec::new();
        if let Some(result) = err_read {
            if let Some(n) = accept(result, "stderr") {
                lines.extend(self.stderr_carry.feed(&err_buf[..n]));
            } else {
                self.stderr = None;
            }
        }
        if let Some(result) = out_read {
            if let Some(n) = accept(result, "stdout") {
                lines.extend(self.stdout_carry.feed(&out_buf[..n]));
            } else {
                self.stdout = None;
            }
        }
        lines
    }
}

async fn read_chunk<R>(stream: Option<&mut R>, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match stream {
        Some(stream) => stream.read(buf).await,
        None => std::future::pending().await,
    }
}

/// Byte count of a successful non-empty read; None closes the stream
fn accept(result: std::io::Result<usize>, stream: &'static str) -> Option<usize> {
    match result {
        Ok(0) => {
            debug!(stream, "Output stream closed");
            None
        }
        Ok(n) => Some(n),
        Err(e) => {
            warn!(stream, error = %e, "Output stream read failed, closing it");
            None
        }
    }
}
