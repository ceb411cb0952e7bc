use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use slurmscope_types::TailEvent;

/// Largest initial snapshot emitted when a tail session opens.
pub const MAX_SNAPSHOT_BYTES: u64 = 200_000;

/// How long the follow loop waits when no complete line is available.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Lifecycle of a tail session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TailPhase {
    /// Opened, initial snapshot not yet emitted
    Snapshot,
    /// Snapshot emitted, reading appended lines
    Follow,
    /// Terminal; the file handle is released when the session drops
    Closed,
}

/// One live view over a growing log file.
///
/// Owns its file handle for its whole lifetime; sessions over the same file
/// share no state. The file is expected to grow under us — an independent
/// writer appends to it — so no read here assumes a stable length. The read
/// offset only ever moves forward.
pub struct TailSession {
    file: File,
    pos: u64,
    phase: TailPhase,
}

impl TailSession {
    pub async fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path).await?;
        Ok(Self {
            file,
            pos: 0,
            phase: TailPhase::Snapshot,
        })
    }

    pub fn phase(&self) -> TailPhase {
        self.phase
    }

    /// Current byte offset into the file.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Read the bounded tail of the file and move to the follow phase.
    ///
    /// The window starts at most [`MAX_SNAPSHOT_BYTES`] before the size seen
    /// at open. When that start lands mid-line, the remainder of the cut line
    /// is skipped so the snapshot never begins with a fragment.
    pub async fn snapshot(&mut self) -> std::io::Result<String> {
        let size = self.file.seek(SeekFrom::End(0)).await?;
        let start = size.saturating_sub(MAX_SNAPSHOT_BYTES);
        self.file.seek(SeekFrom::Start(start)).await?;

        let mut buf = Vec::with_capacity((size - start) as usize);
        // cap at the size observed above; anything appended since belongs
        // to the follow phase
        (&mut self.file)
            .take(size - start)
            .read_to_end(&mut buf)
            .await?;
        self.pos = start + buf.len() as u64;

        let text = if start > 0 {
            match buf.iter().position(|&b| b == b'\n') {
                Some(cut) => &buf[cut + 1..],
                // the whole window is one partial line
                None => &[][..],
            }
        } else {
            &buf[..]
        };
        self.phase = TailPhase::Follow;
        Ok(String::from_utf8_lossy(text).into_owned())
    }

    /// Try to read one complete line at the current offset.
    ///
    /// Returns `Ok(None)` when no full line has been appended yet; the offset
    /// advances only past lines that were actually returned, so a partial
    /// line at end-of-file is re-read once its newline arrives.
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.file.seek(SeekFrom::Start(self.pos)).await?;
        let mut line = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            let n = self.file.read(&mut chunk).await?;
            if n == 0 {
                return Ok(None);
            }
            match chunk[..n].iter().position(|&b| b == b'\n') {
                Some(at) => {
                    line.extend_from_slice(&chunk[..=at]);
                    self.pos += line.len() as u64;
                    return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
                }
                None => line.extend_from_slice(&chunk[..n]),
            }
        }
    }

    /// Mark the session terminal. The handle itself is released on drop.
    pub fn close(&mut self) {
        self.phase = TailPhase::Closed;
    }
}

/// Handle to a spawned tail task.
pub struct TailHandle {
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl TailHandle {
    /// Ask the tail task to stop. It winds down at its next suspension point.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TailHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Spawn an independent tail task over `path`, emitting events on `tx`.
///
/// The task emits one [`TailEvent::Snapshot`] and then one
/// [`TailEvent::Append`] per complete line, sleeping [`POLL_INTERVAL`]
/// between empty polls. There is no natural end of stream; the task ends on
/// cancellation, on channel close (the viewer went away), or on the first
/// I/O error. Each call gets its own session, so a stalled viewer never
/// holds up another.
pub fn spawn_tail(path: PathBuf, tx: mpsc::UnboundedSender<TailEvent>) -> TailHandle {
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();
    let task = tokio::spawn(async move {
        if let Err(e) = run_tail(&path, tx, task_cancel).await {
            warn!(path = %path.display(), error = %e, "tail session ended with I/O error");
        }
    });
    TailHandle { cancel, task }
}

async fn run_tail(
    path: &Path,
    tx: mpsc::UnboundedSender<TailEvent>,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let mut session = TailSession::open(path).await?;

    let snapshot = session.snapshot().await?;
    if tx.send(TailEvent::Snapshot(snapshot)).is_err() {
        session.close();
        return Ok(());
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            read = session.next_line() => match read {
                Ok(Some(line)) => {
                    if tx.send(TailEvent::Append(line)).is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = sleep(POLL_INTERVAL) => {}
                    }
                }
                Err(e) => {
                    session.close();
                    return Err(e);
                }
            },
        }
    }

    session.close();
    Ok(())
}
