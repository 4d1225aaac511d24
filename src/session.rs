//! Session lifecycle: the five user commands and the drain loop.
//!
//! A session starts by journaling the original head and the planned queues,
//! then drains the rollback queue followed by the commit queue. Any step
//! failure leaves the failing revision at the front of its queue and the
//! working tree detached where it stopped; `--continue`, `--skip`, and
//! `--abort` pick up from there.

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::config::Config;
use crate::core::planner;
use crate::core::types::Phase;
use crate::io::git::Vcs;
use crate::io::hooks::HookRunner;
use crate::io::store::SessionStore;
use crate::report;
use crate::step;

/// Print the world and repository ids and the session state. Never mutates.
pub fn run_status(cfg: &Config, store: &SessionStore) -> Result<()> {
    let world = if cfg.world_id.is_empty() {
        "(none)"
    } else {
        &cfg.world_id
    };
    report::say(format!("World ID: {world}"));
    report::say(format!("Git ID: {}", cfg.local_id));
    if store.session_exists() {
        report::say(
            "a sync session is in progress; use --continue to resume, \
             --skip to drop the current revision, or --abort to end it",
        );
    } else if cfg.world_id == cfg.local_id {
        report::say("the world is already in sync");
    } else {
        report::say("the world is out of sync; run git-sync-world to synchronize");
    }
    Ok(())
}

/// Start a new session and drain it.
pub fn run_sync<V: Vcs, H: HookRunner>(
    cfg: &Config,
    vcs: &V,
    hooks: &H,
    store: &SessionStore,
) -> Result<()> {
    if store.session_exists() {
        bail!("a sync session is already in progress; use --continue, --skip, or --abort");
    }
    if cfg.world_id == cfg.local_id {
        report::say("the world is already in sync");
        return Ok(());
    }
    let plan = planner::plan(vcs, &cfg.world_id, &cfg.local_id)?;
    info!(
        rollback = plan.rollback.len(),
        commit = plan.commit.len(),
        "session planned"
    );
    store.begin()?;
    store.save_original_head(&vcs.symbolic_head()?)?;
    store.write_queue(Phase::Rollback, &plan.rollback)?;
    store.write_queue(Phase::Commit, &plan.commit)?;
    drain(vcs, hooks, store)
}

/// Resume the in-progress session at the revision that failed.
pub fn run_continue<V: Vcs, H: HookRunner>(
    vcs: &V,
    hooks: &H,
    store: &SessionStore,
) -> Result<()> {
    ensure_in_session(store)?;
    drain(vcs, hooks, store)
}

/// Drop the front revision (rollback queue first) and resume.
///
/// No checkout happens here; the next drained revision does its own.
pub fn run_skip<V: Vcs, H: HookRunner>(vcs: &V, hooks: &H, store: &SessionStore) -> Result<()> {
    ensure_in_session(store)?;
    let skipped = match store.pop_front(Phase::Rollback)? {
        Some(rev) => Some((Phase::Rollback, rev)),
        None => store.pop_front(Phase::Commit)?.map(|rev| (Phase::Commit, rev)),
    };
    match skipped {
        Some((phase, rev)) => report::say(format!("skipped {phase} of {rev}")),
        None => debug!("nothing to skip; queues already empty"),
    }
    drain(vcs, hooks, store)
}

/// End the session immediately without running any further hook.
pub fn run_abort<V: Vcs>(vcs: &V, store: &SessionStore) -> Result<()> {
    ensure_in_session(store)?;
    finish(vcs, store)
}

fn ensure_in_session(store: &SessionStore) -> Result<()> {
    if !store.session_exists() {
        bail!("no sync session is in progress");
    }
    Ok(())
}

/// Process queue fronts until both queues are empty, then finish.
fn drain<V: Vcs, H: HookRunner>(vcs: &V, hooks: &H, store: &SessionStore) -> Result<()> {
    loop {
        let (phase, rev) = match store.pop_front(Phase::Rollback)? {
            Some(rev) => (Phase::Rollback, rev),
            None => match store.pop_front(Phase::Commit)? {
                Some(rev) => (Phase::Commit, rev),
                None => return finish(vcs, store),
            },
        };
        if let Err(err) = step::apply_revision(vcs, hooks, &rev, phase) {
            store
                .push_front(phase, &rev)
                .context("restore the failing revision to its queue")?;
            return Err(err);
        }
    }
}

/// Restore the original head and delete the session.
fn finish<V: Vcs>(vcs: &V, store: &SessionStore) -> Result<()> {
    let orig = store.load_original_head()?;
    if !vcs.checkout(&orig)? {
        bail!("failed to restore the original head '{orig}'; the session is left in place");
    }
    store.destroy()?;
    report::say("Done.");
    Ok(())
}
