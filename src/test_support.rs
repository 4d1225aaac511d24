//! Test doubles: an in-memory revision graph and a scripted hook runner.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::io::git::{Vcs, VcsError};
use crate::io::hooks::{GET_CHANGE_ID, HookError, HookRunner, REVISION_HOOKS, SET_CHANGE_ID};

/// In-memory [`Vcs`] over an explicit parent graph.
pub struct FakeVcs {
    root_dir: PathBuf,
    metadata_dir: PathBuf,
    parents: BTreeMap<String, Option<String>>,
    branches: BTreeMap<String, String>,
    symbolic: Option<String>,
    clean: bool,
    head: RefCell<String>,
    fail_checkout: BTreeSet<String>,
}

impl FakeVcs {
    /// Linear history, oldest first, on branch `main` with `HEAD` at the tip.
    pub fn linear(revs: &[&str]) -> Self {
        let mut parents = BTreeMap::new();
        let mut prev: Option<String> = None;
        for rev in revs {
            parents.insert(rev.to_string(), prev.clone());
            prev = Some(rev.to_string());
        }
        let tip = revs.last().expect("at least one revision").to_string();
        let mut branches = BTreeMap::new();
        branches.insert("main".to_string(), tip.clone());
        Self {
            root_dir: PathBuf::from("/repo"),
            metadata_dir: PathBuf::from("/repo/.git"),
            parents,
            branches,
            symbolic: Some("main".to_string()),
            clean: true,
            head: RefCell::new(tip),
            fail_checkout: BTreeSet::new(),
        }
    }

    /// Add a revision on top of `parent` without moving `HEAD`.
    pub fn with_revision(mut self, rev: &str, parent: Option<&str>) -> Self {
        self.parents
            .insert(rev.to_string(), parent.map(str::to_string));
        self
    }

    /// Add a branch pointing at `tip`.
    pub fn with_branch(mut self, name: &str, tip: &str) -> Self {
        self.branches.insert(name.to_string(), tip.to_string());
        self
    }

    /// Move `HEAD` to `rev`, attached to `branch` (or detached when `None`).
    pub fn with_head(self, rev: &str, branch: Option<&str>) -> Self {
        *self.head.borrow_mut() = rev.to_string();
        Self {
            symbolic: branch.map(str::to_string),
            ..self
        }
    }

    pub fn with_dirty_tree(mut self) -> Self {
        self.clean = false;
        self
    }

    /// Make every future checkout of `rev` exit non-zero.
    pub fn fail_checkout_of(mut self, rev: &str) -> Self {
        self.fail_checkout.insert(rev.to_string());
        self
    }

    pub fn head(&self) -> String {
        self.head.borrow().clone()
    }

    fn parent_of(&self, rev: &str) -> Option<String> {
        self.parents.get(rev).cloned().flatten()
    }

    /// Ancestry of `from` inclusive, newest first.
    fn ancestry(&self, from: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut cur = Some(from.to_string());
        while let Some(rev) = cur {
            cur = self.parent_of(&rev);
            out.push(rev);
        }
        out
    }
}

impl Vcs for FakeVcs {
    fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn metadata_dir(&self) -> &Path {
        &self.metadata_dir
    }

    fn resolve(&self, rev: &str) -> Result<Option<String>, VcsError> {
        if let Some(tip) = self.branches.get(rev) {
            return Ok(Some(tip.clone()));
        }
        Ok(self.parents.contains_key(rev).then(|| rev.to_string()))
    }

    fn head_revision(&self) -> Result<String, VcsError> {
        Ok(self.head())
    }

    fn symbolic_head(&self) -> Result<String, VcsError> {
        Ok(self.symbolic.clone().unwrap_or_else(|| self.head()))
    }

    fn checkout(&self, rev: &str) -> Result<bool, VcsError> {
        let target = if rev == "HEAD^" {
            match self.parent_of(&self.head()) {
                Some(parent) => parent,
                None => return Ok(false),
            }
        } else if let Some(tip) = self.branches.get(rev) {
            tip.clone()
        } else {
            rev.to_string()
        };
        if self.fail_checkout.contains(&target) || !self.parents.contains_key(&target) {
            return Ok(false);
        }
        *self.head.borrow_mut() = target;
        Ok(true)
    }

    fn is_clean(&self) -> Result<bool, VcsError> {
        Ok(self.clean)
    }

    fn is_root_commit(&self) -> Result<bool, VcsError> {
        Ok(self.parent_of(&self.head()).is_none())
    }

    fn ancestors_excluding(&self, from: &str, to: &str) -> Result<Vec<String>, VcsError> {
        let exclude: BTreeSet<String> = self.ancestry(to).into_iter().collect();
        Ok(self
            .ancestry(from)
            .into_iter()
            .filter(|rev| !exclude.contains(rev))
            .collect())
    }

    fn ancestors_excluding_reverse(&self, from: &str, to: &str) -> Result<Vec<String>, VcsError> {
        let mut revs = self.ancestors_excluding(from, to)?;
        revs.reverse();
        Ok(revs)
    }

    fn full_history_oldest_first(&self) -> Result<Vec<String>, VcsError> {
        let mut revs = self.ancestry(&self.head());
        revs.reverse();
        Ok(revs)
    }
}

/// Scripted [`HookRunner`] that records every invocation and keeps a fake
/// world change id: `set-change-id` stores its argument, `get-change-id`
/// reports it.
pub struct FakeHooks {
    dir_exists: bool,
    present: BTreeSet<String>,
    not_executable: BTreeSet<String>,
    failing: RefCell<BTreeSet<String>>,
    world_id: RefCell<String>,
    calls: RefCell<Vec<String>>,
}

impl FakeHooks {
    /// All six hooks present and executable; the world starts pre-tracking.
    pub fn complete() -> Self {
        let mut present: BTreeSet<String> =
            REVISION_HOOKS.iter().map(|name| name.to_string()).collect();
        present.insert(GET_CHANGE_ID.to_string());
        Self {
            dir_exists: true,
            present,
            not_executable: BTreeSet::new(),
            failing: RefCell::new(BTreeSet::new()),
            world_id: RefCell::new(String::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Hook directory present but no hooks in it (a no-op revision).
    pub fn none() -> Self {
        Self {
            present: BTreeSet::new(),
            ..Self::complete()
        }
    }

    pub fn without_dir(mut self) -> Self {
        self.dir_exists = false;
        self
    }

    pub fn without(mut self, name: &str) -> Self {
        self.present.remove(name);
        self
    }

    pub fn with_non_executable(mut self, name: &str) -> Self {
        self.not_executable.insert(name.to_string());
        self
    }

    /// Make `name` exit non-zero until [`FakeHooks::fix`] is called.
    pub fn with_failing(self, name: &str) -> Self {
        self.failing.borrow_mut().insert(name.to_string());
        self
    }

    pub fn with_world_id(self, id: &str) -> Self {
        *self.world_id.borrow_mut() = id.to_string();
        self
    }

    pub fn fix(&self, name: &str) {
        self.failing.borrow_mut().remove(name);
    }

    pub fn world_id(&self) -> String {
        self.world_id.borrow().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, name: &str, args: &[&str]) {
        let call = if args.is_empty() {
            name.to_string()
        } else {
            format!("{name} {}", args.join(" "))
        };
        self.calls.borrow_mut().push(call);
    }
}

impl HookRunner for FakeHooks {
    fn dir_exists(&self) -> bool {
        self.dir_exists
    }

    fn present(&self, name: &str) -> bool {
        self.present.contains(name)
    }

    fn validate(&self, name: &str) -> Result<(), HookError> {
        if !self.present.contains(name) {
            return Err(HookError::Missing {
                name: name.to_string(),
                dir: PathBuf::from("/repo/git-sync-world"),
            });
        }
        if self.not_executable.contains(name) {
            return Err(HookError::NotExecutable {
                name: name.to_string(),
                path: PathBuf::from("/repo/git-sync-world").join(name),
            });
        }
        Ok(())
    }

    fn run(&self, name: &str, args: &[&str]) -> Result<bool, HookError> {
        self.validate(name)?;
        self.record(name, args);
        if self.failing.borrow().contains(name) {
            return Ok(false);
        }
        if name == SET_CHANGE_ID {
            *self.world_id.borrow_mut() = args.first().unwrap_or(&"").to_string();
        }
        Ok(true)
    }

    fn capture(&self, name: &str) -> Result<(String, bool), HookError> {
        self.validate(name)?;
        self.record(name, &[]);
        if self.failing.borrow().contains(name) {
            return Ok((String::new(), false));
        }
        Ok((self.world_id(), true))
    }
}
