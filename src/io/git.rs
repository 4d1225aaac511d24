//! Git adapter behind the [`Vcs`] trait.
//!
//! The planner, the state machine, and the session controller only see
//! [`Vcs`], so they can be driven against an in-memory graph in tests.
//! [`GitCli`] is the production implementation, a small explicit wrapper
//! around `git` subprocess calls.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Errors from the underlying `git` tool.
#[derive(Debug, Error)]
pub enum VcsError {
    /// The `git` binary could not be spawned at all.
    #[error("failed to spawn git {args}: {source}")]
    Spawn {
        args: String,
        #[source]
        source: std::io::Error,
    },
    /// `git` ran and exited non-zero.
    #[error("git {args} failed: {stderr}")]
    Command { args: String, stderr: String },
}

/// The version-control system, reduced to the operations the engine needs.
pub trait Vcs {
    /// Absolute path of the working tree root.
    fn root_dir(&self) -> &Path;

    /// Absolute path of the VCS metadata directory.
    fn metadata_dir(&self) -> &Path;

    /// Canonical revision id for `rev`, or `None` if it is unknown.
    fn resolve(&self, rev: &str) -> Result<Option<String>, VcsError>;

    /// Revision id the working tree currently has checked out.
    fn head_revision(&self) -> Result<String, VcsError>;

    /// Branch name `HEAD` points to, or the raw revision id when detached.
    fn symbolic_head(&self) -> Result<String, VcsError>;

    /// Check out `rev` (detached for a revision id, attached for a branch).
    ///
    /// `Ok(false)` when the checkout itself exits non-zero; the caller
    /// decides whether that ends the walk.
    fn checkout(&self, rev: &str) -> Result<bool, VcsError>;

    /// Working tree has no uncommitted modifications.
    fn is_clean(&self) -> Result<bool, VcsError>;

    /// Current `HEAD` has no parent.
    fn is_root_commit(&self) -> Result<bool, VcsError>;

    /// Revisions reachable from `from` but not from `to`, newest first.
    fn ancestors_excluding(&self, from: &str, to: &str) -> Result<Vec<String>, VcsError>;

    /// Revisions reachable from `from` but not from `to`, oldest first.
    fn ancestors_excluding_reverse(&self, from: &str, to: &str) -> Result<Vec<String>, VcsError>;

    /// Every revision reachable from `HEAD`, oldest first.
    fn full_history_oldest_first(&self) -> Result<Vec<String>, VcsError>;
}

/// Subprocess-backed [`Vcs`] for a discovered repository.
#[derive(Debug, Clone)]
pub struct GitCli {
    root_dir: PathBuf,
    metadata_dir: PathBuf,
}

impl GitCli {
    /// Locate the repository that contains `cwd`.
    pub fn discover(cwd: &Path) -> Result<Self, VcsError> {
        let root = capture_in(cwd, &["rev-parse", "--show-toplevel"])?;
        let metadata = capture_in(cwd, &["rev-parse", "--absolute-git-dir"])?;
        debug!(root = %root, "repository discovered");
        Ok(Self {
            root_dir: PathBuf::from(root),
            metadata_dir: PathBuf::from(metadata),
        })
    }

    fn run(&self, args: &[&str]) -> Result<Output, VcsError> {
        run_in(&self.root_dir, args)
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output, VcsError> {
        let output = self.run(args)?;
        if !output.status.success() {
            return Err(command_error(args, &output));
        }
        Ok(output)
    }

    fn run_capture(&self, args: &[&str]) -> Result<String, VcsError> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Vcs for GitCli {
    fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn metadata_dir(&self) -> &Path {
        &self.metadata_dir
    }

    #[instrument(skip_all, fields(rev = %rev))]
    fn resolve(&self, rev: &str) -> Result<Option<String>, VcsError> {
        let spec = format!("{rev}^{{commit}}");
        let output = self.run(&["rev-parse", "--verify", "--quiet", &spec])?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(Some(
            String::from_utf8_lossy(&output.stdout).trim().to_string(),
        ))
    }

    fn head_revision(&self) -> Result<String, VcsError> {
        self.run_capture(&["rev-parse", "HEAD"])
    }

    fn symbolic_head(&self) -> Result<String, VcsError> {
        let output = self.run(&["symbolic-ref", "--quiet", "--short", "HEAD"])?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
        }
        self.head_revision()
    }

    #[instrument(skip_all, fields(rev = %rev))]
    fn checkout(&self, rev: &str) -> Result<bool, VcsError> {
        let output = self.run(&["checkout", rev])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(rev = %rev, stderr = %stderr.trim(), "checkout failed");
            return Ok(false);
        }
        debug!(rev = %rev, "checked out");
        Ok(true)
    }

    #[instrument(skip_all)]
    fn is_clean(&self) -> Result<bool, VcsError> {
        let out = self.run_capture(&["status", "--porcelain"])?;
        Ok(out.is_empty())
    }

    #[instrument(skip_all)]
    fn is_root_commit(&self) -> Result<bool, VcsError> {
        let output = self.run(&["rev-parse", "--verify", "--quiet", "HEAD^"])?;
        Ok(!output.status.success())
    }

    fn ancestors_excluding(&self, from: &str, to: &str) -> Result<Vec<String>, VcsError> {
        let exclude = format!("^{to}");
        let out = self.run_capture(&["rev-list", from, &exclude])?;
        Ok(lines(&out))
    }

    fn ancestors_excluding_reverse(&self, from: &str, to: &str) -> Result<Vec<String>, VcsError> {
        let exclude = format!("^{to}");
        let out = self.run_capture(&["rev-list", "--reverse", from, &exclude])?;
        Ok(lines(&out))
    }

    fn full_history_oldest_first(&self) -> Result<Vec<String>, VcsError> {
        let out = self.run_capture(&["rev-list", "--reverse", "HEAD"])?;
        Ok(lines(&out))
    }
}

fn lines(out: &str) -> Vec<String> {
    out.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn run_in(dir: &Path, args: &[&str]) -> Result<Output, VcsError> {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|source| VcsError::Spawn {
            args: args.join(" "),
            source,
        })
}

fn capture_in(dir: &Path, args: &[&str]) -> Result<String, VcsError> {
    let output = run_in(dir, args)?;
    if !output.status.success() {
        return Err(command_error(args, &output));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn command_error(args: &[&str], output: &Output) -> VcsError {
    VcsError::Command {
        args: args.join(" "),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}
