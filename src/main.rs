//! `git-sync-world` — keep an external system in sync with the checked-out
//! revision via user-supplied hooks.

use clap::{ArgAction, ArgGroup, Parser};

use git_sync_world::config::{Config, Paths};
use git_sync_world::io::git::GitCli;
use git_sync_world::io::hooks::HookDir;
use git_sync_world::io::store::SessionStore;
use git_sync_world::{exit_codes, logging, report, session};

#[derive(Parser, Debug)]
#[command(
    name = "git-sync-world",
    version,
    about = "Synchronize an external system with the checked-out revision",
    disable_help_flag = true,
    group(ArgGroup::new("mode").multiple(false))
)]
struct Cli {
    /// Print the world and repository change ids and the session state.
    #[arg(long, group = "mode")]
    status: bool,

    /// Resume the in-progress session at the revision that failed.
    #[arg(long = "continue", group = "mode")]
    resume: bool,

    /// Drop the revision at the front of the queue and resume.
    #[arg(long, group = "mode")]
    skip: bool,

    /// End the in-progress session without running further hooks.
    #[arg(long, group = "mode")]
    abort: bool,

    /// Print usage.
    #[arg(short = '?', long, action = ArgAction::Help)]
    help: Option<bool>,
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        report::error(format!("{err:#}"));
        std::process::exit(exit_codes::FAILURE);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let vcs = GitCli::discover(&cwd)?;
    let paths = Paths::derive(&vcs);
    let hooks = HookDir::new(&paths.user_hooks_dir, &paths.root_dir);
    let cfg = Config::load(paths, &vcs, &hooks)?;
    let store = SessionStore::new(cfg.paths.session_dir.clone());

    if cli.status {
        session::run_status(&cfg, &store)
    } else if cli.resume {
        session::run_continue(&vcs, &hooks, &store)
    } else if cli.skip {
        session::run_skip(&vcs, &hooks, &store)
    } else if cli.abort {
        session::run_abort(&vcs, &store)
    } else {
        session::run_sync(&cfg, &vcs, &hooks, &store)
    }
}
