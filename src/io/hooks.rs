//! User hook discovery and invocation.
//!
//! Each world is described by the executable hooks it places under
//! `<root>/git-sync-world`. The [`HookRunner`] trait is the capability the
//! state machine consumes, so tests can script hook behavior without
//! touching a shell. [`HookDir`] is the production runner.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Applies one revision's change to the world.
pub const COMMIT: &str = "commit";
/// Undoes one revision's change.
pub const ROLLBACK: &str = "rollback";
/// Checks that `commit` took effect.
pub const VERIFY_COMMIT: &str = "verify-commit";
/// Checks that `rollback` took effect.
pub const VERIFY_ROLLBACK: &str = "verify-rollback";
/// Records a change id in the world; an empty argument means pre-tracking.
pub const SET_CHANGE_ID: &str = "set-change-id";
/// Prints the change id the world currently stores; configuration-time only.
pub const GET_CHANGE_ID: &str = "get-change-id";

/// The four change hooks whose presence makes a revision non-trivial.
pub const CHANGE_HOOKS: [&str; 4] = [COMMIT, VERIFY_COMMIT, ROLLBACK, VERIFY_ROLLBACK];

/// All five hooks a processed revision must provide.
pub const REVISION_HOOKS: [&str; 5] =
    [COMMIT, VERIFY_COMMIT, ROLLBACK, VERIFY_ROLLBACK, SET_CHANGE_ID];

/// Errors locating or spawning a hook. A hook that runs and exits non-zero
/// is not an error at this layer; callers get the status back.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("hook '{name}' not found under {dir}")]
    Missing { name: String, dir: PathBuf },

    #[error("hook '{name}' at {path} is not executable")]
    NotExecutable { name: String, path: PathBuf },

    #[error("failed to run hook '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Capability to locate and run the user hooks.
pub trait HookRunner {
    /// The hook directory itself exists.
    fn dir_exists(&self) -> bool;

    /// A file with this hook name exists (executable or not).
    fn present(&self, name: &str) -> bool;

    /// The hook exists and its mode carries an executable bit.
    fn validate(&self, name: &str) -> Result<(), HookError>;

    /// Run a hook with stdio forwarded. `Ok(true)` iff it exited zero.
    fn run(&self, name: &str, args: &[&str]) -> Result<bool, HookError>;

    /// Run a hook with stdout captured and trimmed of trailing whitespace;
    /// stderr stays forwarded.
    fn capture(&self, name: &str) -> Result<(String, bool), HookError>;
}

/// Hooks as executable files in a directory, run from the repository root.
///
/// The hook inherits the tool's environment untouched; no timeout is
/// imposed, so a stuck hook hangs the tool where the author can attach to
/// it.
#[derive(Debug, Clone)]
pub struct HookDir {
    dir: PathBuf,
    workdir: PathBuf,
}

impl HookDir {
    pub fn new(dir: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            workdir: workdir.into(),
        }
    }

    fn hook_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn command(&self, name: &str) -> Result<Command, HookError> {
        self.validate(name)?;
        let mut cmd = Command::new(self.hook_path(name));
        cmd.current_dir(&self.workdir);
        Ok(cmd)
    }
}

impl HookRunner for HookDir {
    fn dir_exists(&self) -> bool {
        self.dir.is_dir()
    }

    fn present(&self, name: &str) -> bool {
        self.hook_path(name).is_file()
    }

    fn validate(&self, name: &str) -> Result<(), HookError> {
        let path = self.hook_path(name);
        if !path.is_file() {
            return Err(HookError::Missing {
                name: name.to_string(),
                dir: self.dir.clone(),
            });
        }
        let metadata = fs::metadata(&path).map_err(|source| HookError::Io {
            name: name.to_string(),
            source,
        })?;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(HookError::NotExecutable {
                name: name.to_string(),
                path,
            });
        }
        Ok(())
    }

    #[instrument(skip_all, fields(hook = %name))]
    fn run(&self, name: &str, args: &[&str]) -> Result<bool, HookError> {
        let mut cmd = self.command(name)?;
        cmd.args(args);
        debug!(args = ?args, "running hook");
        let status = cmd.status().map_err(|source| HookError::Io {
            name: name.to_string(),
            source,
        })?;
        if !status.success() {
            warn!(code = ?status.code(), "hook exited non-zero");
        }
        Ok(status.success())
    }

    #[instrument(skip_all, fields(hook = %name))]
    fn capture(&self, name: &str) -> Result<(String, bool), HookError> {
        let mut cmd = self.command(name)?;
        cmd.stdout(Stdio::piped()).stderr(Stdio::inherit());
        let output = cmd.output().map_err(|source| HookError::Io {
            name: name.to_string(),
            source,
        })?;
        let stdout = String::from_utf8_lossy(&output.stdout)
            .trim_end()
            .to_string();
        debug!(stdout = %stdout, success = output.status.success(), "hook captured");
        Ok((stdout, output.status.success()))
    }
}
