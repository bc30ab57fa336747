//! Read-only tailing of the active log.

use std::fs::{File, Metadata};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Last `n` lines of the file at `path`. A missing file has no lines.
pub fn tail(path: &Path, n: usize) -> io::Result<Vec<String>> {
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let text = String::from_utf8_lossy(&content);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    Ok(lines[start..].iter().map(|l| l.to_string()).collect())
}

/// Device and inode of an open file.
#[cfg(unix)]
fn file_identity(meta: &Metadata) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Some((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn file_identity(_meta: &Metadata) -> Option<(u64, u64)> {
    None
}

/// Incremental reader over the active log.
///
/// Each [`poll`](Follower::poll) returns the complete lines appended since the
/// previous poll. When the path names a different file than last time, or the
/// file shrank below the read offset, or it disappeared, the log has been
/// rotated and reading restarts at the beginning of the new file.
#[derive(Debug)]
pub struct Follower {
    path: PathBuf,
    offset: u64,
    identity: Option<(u64, u64)>,
    pending: Vec<u8>,
}

impl Follower {
    /// Follow `path` starting at its current end.
    pub fn from_end(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let (offset, identity) = match std::fs::metadata(&path) {
            Ok(meta) => (meta.len(), file_identity(&meta)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => (0, None),
            Err(e) => return Err(e),
        };
        Ok(Self {
            path,
            offset,
            identity,
            pending: Vec::new(),
        })
    }

    /// Follow `path` from its first byte.
    pub fn from_start(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
            identity: None,
            pending: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read whatever complete lines were appended since the last poll.
    pub fn poll(&mut self) -> io::Result<Vec<String>> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.reset();
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let meta = file.metadata()?;
        let len = meta.len();
        let identity = file_identity(&meta);
        if (self.identity.is_some() && identity != self.identity) || len < self.offset {
            self.reset();
        }
        self.identity = identity;
        if len == self.offset {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(self.offset))?;
        let mut buf = Vec::new();
        let read = file.take(len - self.offset).read_to_end(&mut buf)?;
        self.offset += read as u64;
        self.pending.extend_from_slice(&buf);

        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Ok(Vec::new());
        };
        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        Ok(String::from_utf8_lossy(&complete)
            .lines()
            .map(str::to_owned)
            .collect())
    }

    fn reset(&mut self) {
        self.offset = 0;
        self.identity = None;
        self.pending.clear();
    }
}
