//! Per-revision orchestration of the hook quintet.
//!
//! One call processes one revision in one phase, following a fixed order:
//! checkout, no-op check, hook validation, phase body. On any error the
//! caller still owns the revision and must restore it to the front of its
//! queue before exiting, so a later `--continue` starts exactly here.

use anyhow::{Context, Result, bail};
use tracing::warn;

use crate::core::types::Phase;
use crate::io::git::Vcs;
use crate::io::hooks::{
    CHANGE_HOOKS, COMMIT, GET_CHANGE_ID, HookRunner, REVISION_HOOKS, ROLLBACK, SET_CHANGE_ID,
    VERIFY_COMMIT, VERIFY_ROLLBACK,
};
use crate::report;

/// How a successfully processed revision was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The phase hooks ran to completion.
    Applied,
    /// No change hook exists at this revision; nothing was run.
    Noop,
}

/// Process one revision in the given phase.
pub fn apply_revision<V: Vcs, H: HookRunner>(
    vcs: &V,
    hooks: &H,
    rev: &str,
    phase: Phase,
) -> Result<StepOutcome> {
    if !vcs.checkout(rev)? {
        bail!("failed to check out revision {rev}");
    }
    if !CHANGE_HOOKS.iter().any(|name| hooks.present(name)) {
        report::say(format!("nothing to do at {rev}"));
        return Ok(StepOutcome::Noop);
    }
    for name in REVISION_HOOKS {
        hooks
            .validate(name)
            .with_context(|| format!("cannot process {rev}"))?;
    }
    match phase {
        Phase::Commit => commit_revision(hooks, rev)?,
        Phase::Rollback => roll_back_revision(vcs, hooks, rev)?,
    }
    report::say(format!("Applied {phase} at {rev}"));
    Ok(StepOutcome::Applied)
}

fn commit_revision<H: HookRunner>(hooks: &H, rev: &str) -> Result<()> {
    if !hooks.run(COMMIT, &[])? {
        bail!("{COMMIT} failed at {rev}; the system may be dirty");
    }
    if !hooks.run(SET_CHANGE_ID, &[rev])? {
        bail!("{SET_CHANGE_ID} failed at {rev}; the system may be dirty ({COMMIT} already succeeded)");
    }
    if !hooks.run(VERIFY_COMMIT, &[])? {
        // Name the id the world actually stores, so the operator rolls back
        // to that revision rather than to the one that just failed.
        match current_world_id(hooks) {
            Some(id) => bail!(
                "{VERIFY_COMMIT} failed at {rev}; the world reports change id {id}; the system may be dirty"
            ),
            None => bail!("{VERIFY_COMMIT} failed at {rev}; the system may be dirty"),
        }
    }
    Ok(())
}

fn roll_back_revision<V: Vcs, H: HookRunner>(vcs: &V, hooks: &H, rev: &str) -> Result<()> {
    if !hooks.run(ROLLBACK, &[])? {
        bail!("{ROLLBACK} failed at {rev}; the system may be dirty");
    }
    if !hooks.run(VERIFY_ROLLBACK, &[])? {
        bail!("{VERIFY_ROLLBACK} failed at {rev}; the system may be dirty");
    }
    if vcs.is_root_commit()? {
        // Rolling back the root returns the world to its pre-tracking state.
        if !hooks.run(SET_CHANGE_ID, &[""])? {
            bail!(
                "{SET_CHANGE_ID} failed after rolling back {rev}; the system may be dirty ({ROLLBACK} already succeeded)"
            );
        }
        return Ok(());
    }
    if !vcs.checkout("HEAD^")? {
        // The step still counts as applied; the next queue entry operates on
        // whatever HEAD is now.
        warn!(rev = %rev, "checkout of the parent revision failed after rollback");
        return Ok(());
    }
    let new_head = vcs.head_revision()?;
    if !hooks.run(SET_CHANGE_ID, &[&new_head])? {
        bail!(
            "{SET_CHANGE_ID} failed after rolling back {rev}; the system may be dirty ({ROLLBACK} already succeeded)"
        );
    }
    Ok(())
}

fn current_world_id<H: HookRunner>(hooks: &H) -> Option<String> {
    match hooks.capture(GET_CHANGE_ID) {
        Ok((id, true)) if !id.is_empty() => Some(id),
        _ => None,
    }
}
