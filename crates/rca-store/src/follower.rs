use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Follows a growing sample log, one complete line at a time.
///
/// The follower owns its read position: bytes handed out as lines are
/// consumed, a trailing line without its newline waits for the writer.
#[derive(Debug)]
pub struct LogFollower {
    path: PathBuf,
    /// File offset up to which bytes have been read into `pending`.
    offset: u64,
    pending: Vec<u8>,
}

impl LogFollower {
    pub fn new(path: &Path) -> Self {
        Self::resume(path, 0)
    }

    /// Continue from a cursor previously returned by [`LogFollower::cursor`].
    pub fn resume(path: &Path, cursor: u64) -> Self {
        Self {
            path: path.to_path_buf(),
            offset: cursor,
            pending: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset of the first byte not yet returned as part of a line.
    pub fn cursor(&self) -> u64 {
        self.offset - self.pending.len() as u64
    }

    /// Next complete line, without its line terminator. `None` when nothing
    /// complete is available yet, including when the log does not exist.
    pub fn poll(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.take_line() {
            return Ok(Some(line));
        }
        self.fill()?;
        Ok(self.take_line())
    }

    /// Every complete line currently available.
    pub fn drain(&mut self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        while let Some(line) = self.poll()? {
            lines.push(line);
        }
        Ok(lines)
    }

    /// Hand out a trailing partial line, for logs known to be finished.
    pub fn take_partial(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        let line = String::from_utf8_lossy(&rest).trim_end_matches('\r').to_string();
        (!line.trim().is_empty()).then_some(line)
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let raw: Vec<u8> = self.pending.drain(..=end).collect();
        let text = String::from_utf8_lossy(&raw[..end]);
        Some(text.trim_end_matches('\r').to_string())
    }

    fn fill(&mut self) -> Result<()> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("log {} does not exist yet", self.path.display());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let len = file.metadata()?.len();
        if len < self.offset {
            tracing::warn!(
                "log {} shrank from {} to {len} bytes; reading from the start",
                self.path.display(),
                self.offset
            );
            self.offset = 0;
            self.pending.clear();
        }
        file.seek(SeekFrom::Start(self.offset))?;
        let read = file.read_to_end(&mut self.pending)?;
        self.offset += read as u64;
        Ok(())
    }
}
