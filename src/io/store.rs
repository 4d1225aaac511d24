//! On-disk session journal.
//!
//! A sync session is three files inside the session directory: `ORIG_HEAD`
//! plus the `rollback` and `commit` queues, one revision per line, front
//! first. Queue rewrites go through a temp file + rename, so a failure
//! before the rename leaves the previous contents intact. The directory's
//! existence is what marks a session as in progress.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::types::Phase;

/// File recording the symbolic head at session start.
pub const ORIG_HEAD_FILE: &str = "ORIG_HEAD";

/// Journal for one repository's sync session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// A session is in progress iff the session directory exists.
    pub fn session_exists(&self) -> bool {
        self.dir.is_dir()
    }

    /// Mark a session as started.
    pub fn begin(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create session directory {}", self.dir.display()))?;
        debug!(dir = %self.dir.display(), "session started");
        Ok(())
    }

    /// Record the branch (or raw revision, when detached) to restore later.
    pub fn save_original_head(&self, sym: &str) -> Result<()> {
        write_atomic(&self.dir.join(ORIG_HEAD_FILE), &format!("{sym}\n"))
    }

    pub fn load_original_head(&self) -> Result<String> {
        let path = self.dir.join(ORIG_HEAD_FILE);
        let contents =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        Ok(contents.trim_end().to_string())
    }

    /// Overwrite a queue with the given revisions, front first.
    pub fn write_queue(&self, phase: Phase, revs: &[String]) -> Result<()> {
        let mut buf = revs.join("\n");
        if !buf.is_empty() {
            buf.push('\n');
        }
        debug!(queue = %phase, len = revs.len(), "queue written");
        write_atomic(&self.queue_path(phase), &buf)
    }

    /// Remove and return the front revision; `None` on an empty or absent
    /// queue. The rewrite is atomic: a crash before the rename leaves the
    /// front in place.
    pub fn pop_front(&self, phase: Phase) -> Result<Option<String>> {
        let path = self.queue_path(phase);
        if !path.exists() {
            return Ok(None);
        }
        let contents =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        let mut lines = contents.lines();
        let Some(front) = lines.next() else {
            return Ok(None);
        };
        if front.is_empty() {
            return Ok(None);
        }
        let front = front.to_string();
        let mut rest = lines.collect::<Vec<_>>().join("\n");
        if !rest.is_empty() {
            rest.push('\n');
        }
        write_atomic(&path, &rest)?;
        debug!(queue = %phase, rev = %front, "queue front popped");
        Ok(Some(front))
    }

    /// Put a revision back at the front of its queue.
    pub fn push_front(&self, phase: Phase, rev: &str) -> Result<()> {
        let path = self.queue_path(phase);
        let existing = if path.exists() {
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?
        } else {
            String::new()
        };
        let mut buf = String::with_capacity(rev.len() + 1 + existing.len());
        buf.push_str(rev);
        buf.push('\n');
        buf.push_str(&existing);
        debug!(queue = %phase, rev = %rev, "queue front restored");
        write_atomic(&path, &buf)
    }

    /// Remove the session files and the now-empty session directory.
    pub fn destroy(&self) -> Result<()> {
        for name in [
            ORIG_HEAD_FILE,
            Phase::Rollback.queue_file(),
            Phase::Commit.queue_file(),
        ] {
            let path = self.dir.join(name);
            if path.exists() {
                fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
            }
        }
        fs::remove_dir(&self.dir)
            .with_context(|| format!("remove session directory {}", self.dir.display()))?;
        debug!(dir = %self.dir.display(), "session removed");
        Ok(())
    }

    fn queue_path(&self, phase: Phase) -> PathBuf {
        self.dir.join(phase.queue_file())
    }
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("session path missing parent {}", path.display()))?;
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("replace {} in {}", path.display(), parent.display()))?;
    Ok(())
}
