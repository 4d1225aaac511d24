//! Shared fixture for end-to-end tests: a real git repository whose
//! committed hooks create and remove marker files in a world directory
//! outside the worktree, addressed through the `WORLD_DIR` environment
//! variable the hooks inherit from the tool.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

pub const HOOKS_DIR: &str = "git-sync-world";

pub struct WorldRepo {
    repo: tempfile::TempDir,
    world: tempfile::TempDir,
}

impl WorldRepo {
    pub fn new() -> Self {
        let repo = tempfile::tempdir().expect("repo tempdir");
        let world = tempfile::tempdir().expect("world tempdir");
        let fixture = Self { repo, world };
        fixture.git(&["init", "-q", "-b", "main"]);
        fixture.git(&["config", "user.email", "test@example.com"]);
        fixture.git(&["config", "user.name", "test"]);
        fixture
    }

    pub fn root(&self) -> &Path {
        self.repo.path()
    }

    pub fn world_dir(&self) -> &Path {
        self.world.path()
    }

    pub fn session_dir(&self) -> PathBuf {
        self.root().join(".git").join(HOOKS_DIR)
    }

    pub fn git(&self, args: &[&str]) -> String {
        let out = Command::new("git")
            .args(args)
            .current_dir(self.root())
            .output()
            .expect("run git");
        assert!(
            out.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&out.stderr)
        );
        String::from_utf8_lossy(&out.stdout).trim().to_string()
    }

    /// Run the tool in the repository with `WORLD_DIR` pointing at the world.
    pub fn sync_world(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_git-sync-world"))
            .args(args)
            .current_dir(self.root())
            .env("WORLD_DIR", self.world_dir())
            .output()
            .expect("run git-sync-world")
    }

    /// Commit a revision whose hooks create/remove `<marker>.txt` in the
    /// world; returns the revision id.
    pub fn commit_marker(&self, marker: &str) -> String {
        self.write_marker_hooks(marker);
        self.commit_all(marker)
    }

    /// Like [`WorldRepo::commit_marker`], but `verify-commit` additionally
    /// requires `<marker>-allowed` in the world (absent until a test adds it).
    pub fn commit_marker_guarded(&self, marker: &str) -> String {
        self.write_marker_hooks(marker);
        self.write_hook(
            "verify-commit",
            &format!("test -f \"$WORLD_DIR/{marker}.txt\" && test -f \"$WORLD_DIR/{marker}-allowed\""),
        );
        self.commit_all(marker)
    }

    /// Like [`WorldRepo::commit_marker`], but the `commit` hook exits 1.
    pub fn commit_marker_broken(&self, marker: &str) -> String {
        self.write_marker_hooks(marker);
        self.write_hook("commit", "exit 1");
        self.commit_all(marker)
    }

    /// Like [`WorldRepo::commit_marker`], but with one hook file removed.
    pub fn commit_marker_without(&self, marker: &str, missing: &str) -> String {
        self.write_marker_hooks(marker);
        fs::remove_file(self.root().join(HOOKS_DIR).join(missing)).expect("remove hook");
        self.commit_all(marker)
    }

    /// Commit a replacement body for a single hook.
    pub fn commit_hook_override(&self, name: &str, body: &str) -> String {
        self.write_hook(name, body);
        self.commit_all(&format!("override {name}"))
    }

    /// Commit a revision carrying only the id hooks. With none of the four
    /// change hooks present, the walker treats it as a no-op revision.
    pub fn commit_id_hooks_only(&self, marker: &str) -> String {
        let dir = self.root().join(HOOKS_DIR);
        if dir.exists() {
            fs::remove_dir_all(&dir).expect("clear hooks dir");
        }
        self.write_hook(
            "get-change-id",
            "cat \"$WORLD_DIR/change-id\" 2>/dev/null || true",
        );
        self.write_hook(
            "set-change-id",
            "printf '%s' \"$1\" > \"$WORLD_DIR/change-id\"",
        );
        self.commit_all(marker)
    }

    pub fn set_world_id(&self, id: &str) {
        fs::write(self.world_dir().join("change-id"), id).expect("write change-id");
    }

    pub fn world_id(&self) -> String {
        fs::read_to_string(self.world_dir().join("change-id"))
            .unwrap_or_default()
            .trim()
            .to_string()
    }

    pub fn touch_world(&self, name: &str) {
        fs::write(self.world_dir().join(name), "").expect("touch world file");
    }

    pub fn world_has(&self, marker: &str) -> bool {
        self.world_dir().join(format!("{marker}.txt")).exists()
    }

    pub fn queue_contents(&self, name: &str) -> String {
        fs::read_to_string(self.session_dir().join(name)).expect("read queue file")
    }

    fn commit_all(&self, msg: &str) -> String {
        fs::write(
            self.root().join(format!("{msg}.src")),
            format!("{msg}\n"),
        )
        .expect("write payload");
        self.git(&["add", "-A"]);
        self.git(&["commit", "-q", "-m", &format!("add {msg}")]);
        self.git(&["rev-parse", "HEAD"])
    }

    fn write_marker_hooks(&self, marker: &str) {
        self.write_hook(
            "get-change-id",
            "cat \"$WORLD_DIR/change-id\" 2>/dev/null || true",
        );
        self.write_hook(
            "set-change-id",
            "printf '%s' \"$1\" > \"$WORLD_DIR/change-id\"",
        );
        self.write_hook("commit", &format!("touch \"$WORLD_DIR/{marker}.txt\""));
        self.write_hook("rollback", &format!("rm -f \"$WORLD_DIR/{marker}.txt\""));
        self.write_hook(
            "verify-commit",
            &format!("test -f \"$WORLD_DIR/{marker}.txt\""),
        );
        self.write_hook(
            "verify-rollback",
            &format!("test ! -f \"$WORLD_DIR/{marker}.txt\""),
        );
    }

    fn write_hook(&self, name: &str, body: &str) {
        let dir = self.root().join(HOOKS_DIR);
        fs::create_dir_all(&dir).expect("create hooks dir");
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write hook");
        let mut perms = fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod hook");
    }
}

pub fn stdout_of(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).to_string()
}

pub fn stderr_of(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).to_string()
}
