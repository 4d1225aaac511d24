//! Per-invocation configuration.
//!
//! Everything here is derived fresh from the repository and the
//! `get-change-id` hook on each run; nothing is persisted.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::io::git::Vcs;
use crate::io::hooks::{GET_CHANGE_ID, HookRunner};

/// Directory name used both for the user hooks (under the worktree root)
/// and for the session directory (under the git metadata directory).
pub const SYNC_WORLD_DIR: &str = "git-sync-world";

/// Canonical locations for one repository.
#[derive(Debug, Clone)]
pub struct Paths {
    pub root_dir: PathBuf,
    pub session_dir: PathBuf,
    pub user_hooks_dir: PathBuf,
}

impl Paths {
    pub fn derive<V: Vcs>(vcs: &V) -> Self {
        Self {
            root_dir: vcs.root_dir().to_path_buf(),
            session_dir: vcs.metadata_dir().join(SYNC_WORLD_DIR),
            user_hooks_dir: vcs.root_dir().join(SYNC_WORLD_DIR),
        }
    }
}

/// Validated invocation state.
#[derive(Debug, Clone)]
pub struct Config {
    pub paths: Paths,
    /// Change id the world currently reports, in resolved form; empty means
    /// the world is pre-tracking.
    pub world_id: String,
    /// Revision the working tree has checked out.
    pub local_id: String,
}

impl Config {
    /// Build and validate the configuration.
    ///
    /// Fails when the working tree is dirty, the hook directory is missing,
    /// or `get-change-id` is absent, not executable, exits non-zero, answers
    /// the reserved name `HEAD`, or answers something that is not a known
    /// revision.
    pub fn load<V: Vcs, H: HookRunner>(paths: Paths, vcs: &V, hooks: &H) -> Result<Self> {
        if !vcs.is_clean()? {
            bail!("the working tree has uncommitted changes; commit or stash them first");
        }
        if !hooks.dir_exists() {
            bail!(
                "hook directory {} does not exist",
                paths.user_hooks_dir.display()
            );
        }
        hooks
            .validate(GET_CHANGE_ID)
            .context("cannot read the world's change id")?;
        let (raw, ok) = hooks.capture(GET_CHANGE_ID)?;
        if !ok {
            bail!("{GET_CHANGE_ID} exited non-zero");
        }
        if raw == "HEAD" {
            bail!("{GET_CHANGE_ID} returned the reserved name HEAD");
        }
        let world_id = if raw.is_empty() {
            String::new()
        } else {
            match vcs.resolve(&raw)? {
                Some(id) => id,
                None => bail!("{GET_CHANGE_ID} returned '{raw}', which is not a known revision"),
            }
        };
        let local_id = vcs.head_revision()?;
        debug!(world_id = %world_id, local_id = %local_id, "configuration loaded");
        Ok(Self {
            paths,
            world_id,
            local_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::hooks::GET_CHANGE_ID;
    use crate::test_support::{FakeHooks, FakeVcs};

    fn load(vcs: &FakeVcs, hooks: &FakeHooks) -> Result<Config> {
        Config::load(Paths::derive(vcs), vcs, hooks)
    }

    #[test]
    fn derives_hook_and_session_paths() {
        let vcs = FakeVcs::linear(&["d"]);
        let paths = Paths::derive(&vcs);
        assert_eq!(paths.user_hooks_dir, PathBuf::from("/repo/git-sync-world"));
        assert_eq!(paths.session_dir, PathBuf::from("/repo/.git/git-sync-world"));
    }

    #[test]
    fn loads_world_and_local_ids() {
        let vcs = FakeVcs::linear(&["d", "e"]);
        let hooks = FakeHooks::complete().with_world_id("d");

        let cfg = load(&vcs, &hooks).expect("load");
        assert_eq!(cfg.world_id, "d");
        assert_eq!(cfg.local_id, "e");
    }

    #[test]
    fn empty_world_id_means_pre_tracking() {
        let vcs = FakeVcs::linear(&["d", "e"]);
        let hooks = FakeHooks::complete();

        let cfg = load(&vcs, &hooks).expect("load");
        assert_eq!(cfg.world_id, "");
    }

    #[test]
    fn refuses_a_dirty_working_tree() {
        let vcs = FakeVcs::linear(&["d"]).with_dirty_tree();
        let hooks = FakeHooks::complete();

        let err = load(&vcs, &hooks).expect_err("should refuse");
        assert!(err.to_string().contains("uncommitted"));
    }

    #[test]
    fn refuses_a_missing_hook_directory() {
        let vcs = FakeVcs::linear(&["d"]);
        let hooks = FakeHooks::complete().without_dir();

        let err = load(&vcs, &hooks).expect_err("should refuse");
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn refuses_a_missing_or_failing_get_change_id() {
        let vcs = FakeVcs::linear(&["d"]);

        let missing = FakeHooks::complete().without(GET_CHANGE_ID);
        assert!(load(&vcs, &missing).is_err());

        let failing = FakeHooks::complete().with_failing(GET_CHANGE_ID);
        let err = load(&vcs, &failing).expect_err("should refuse");
        assert!(err.to_string().contains("non-zero"));
    }

    #[test]
    fn refuses_the_head_sentinel() {
        let vcs = FakeVcs::linear(&["d"]);
        let hooks = FakeHooks::complete().with_world_id("HEAD");

        let err = load(&vcs, &hooks).expect_err("should refuse");
        assert!(err.to_string().contains("HEAD"));
    }

    #[test]
    fn refuses_an_unknown_world_id() {
        let vcs = FakeVcs::linear(&["d"]);
        let hooks = FakeHooks::complete().with_world_id("no-such-rev");

        let err = load(&vcs, &hooks).expect_err("should refuse");
        assert!(err.to_string().contains("not a known revision"));
    }
}
