//! Path planning between the world's change id and the checked-out revision.

use crate::io::git::{Vcs, VcsError};

/// Ordered revision lists for one sync session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Drained first, front to back: newest first, down to (but excluding)
    /// the common ancestor.
    pub rollback: Vec<String>,
    /// Drained second, front to back: oldest first, up to the target head.
    pub commit: Vec<String>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.rollback.is_empty() && self.commit.is_empty()
    }
}

/// Compute the rollback and commit lists. Never checks anything out.
///
/// An empty `world_id` is the pre-tracking state: nothing to roll back, the
/// entire history to commit.
pub fn plan<V: Vcs>(vcs: &V, world_id: &str, local_id: &str) -> Result<Plan, VcsError> {
    if world_id == local_id {
        return Ok(Plan::default());
    }
    if world_id.is_empty() {
        return Ok(Plan {
            rollback: Vec::new(),
            commit: vcs.full_history_oldest_first()?,
        });
    }
    Ok(Plan {
        rollback: vcs.ancestors_excluding(world_id, local_id)?,
        commit: vcs.ancestors_excluding_reverse(local_id, world_id)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeVcs;

    fn revs(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn equal_ids_plan_nothing() {
        let vcs = FakeVcs::linear(&["d", "e", "f"]);
        let plan = plan(&vcs, "f", "f").expect("plan");
        assert!(plan.is_empty());
    }

    #[test]
    fn pre_tracking_world_commits_full_history() {
        let vcs = FakeVcs::linear(&["d", "e", "f"]);
        let plan = plan(&vcs, "", "f").expect("plan");
        assert!(plan.rollback.is_empty());
        assert_eq!(plan.commit, revs(&["d", "e", "f"]));
    }

    #[test]
    fn forward_sync_commits_oldest_first() {
        let vcs = FakeVcs::linear(&["d", "e", "f", "g"]);
        let plan = plan(&vcs, "d", "g").expect("plan");
        assert!(plan.rollback.is_empty());
        assert_eq!(plan.commit, revs(&["e", "f", "g"]));
    }

    #[test]
    fn reverse_sync_rolls_back_newest_first() {
        let vcs = FakeVcs::linear(&["d", "e", "f", "g"]);
        let plan = plan(&vcs, "g", "d").expect("plan");
        assert_eq!(plan.rollback, revs(&["g", "f", "e"]));
        assert!(plan.commit.is_empty());
    }

    #[test]
    fn crossover_rolls_back_to_the_common_ancestor_then_commits_up() {
        let vcs = FakeVcs::linear(&["d", "e", "f", "g"])
            .with_revision("a", Some("d"))
            .with_revision("b", Some("a"))
            .with_revision("c", Some("b"))
            .with_branch("topic", "c")
            .with_head("c", Some("topic"));

        let plan = plan(&vcs, "g", "c").expect("plan");
        assert_eq!(plan.rollback, revs(&["g", "f", "e"]));
        assert_eq!(plan.commit, revs(&["a", "b", "c"]));
    }
}
