/*
This file implements "testseed", a small automation tool that seeds a Git repository with
placeholder unit-test files and publishes them.

Key features and structure:
- Uses Clap for parsing command-line arguments; with no subcommand the full workflow runs.
- Synchronizes a local working copy (clone, or fetch/checkout/pull) through the git CLI, picking
  the SSH address when it answers and falling back to HTTPS (optionally with a token).
- Writes N placeholder test files into a target subdirectory (see `template`).
- Stages everything, inspects the staged diff with git2 and only commits/pushes when it is non-empty.
- Settings come from built-in defaults, an optional TOML file and command-line overrides.
*/

pub mod template;

use clap::{Args, Parser, Subcommand};
use git2::Repository;
use std::error::Error;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Stdio};

use crate::template::{render_test_file, test_file_name};

const BLUE: &str = "\x1b[94m"; // Light blue
const GREEN: &str = "\x1b[32m"; // Green
const YELLOW: &str = "\x1b[93m"; // Light yellow
const RESET: &str = "\x1b[0m";

pub const DEFAULT_SSH_URL: &str = "git@github.com:akashs271997/repo.git";
pub const DEFAULT_HTTPS_URL: &str = "https://github.com/akashs271997/repo.git";
pub const DEFAULT_LOCAL_PATH: &str = "repo";
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_TARGET_SUBPATH: &str = "docs/tests";
pub const DEFAULT_NUM_FILES: usize = 100;
pub const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";

#[derive(Parser)]
#[command(
    name = "testseed",
    version,
    about = "Seed a Git repository with placeholder test files, then commit and push them.",
    after_help = "\
Stages:
  testseed            => sync, generate and publish (same as `testseed run`).
  testseed sync       => clone the repository, or fetch/checkout/pull an existing clone.
  testseed generate   => write the placeholder files into the working copy.
  testseed publish    => stage everything, commit if anything changed, and push."
)]
pub struct Cli {
    /// Stage to run (defaults to the full workflow)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// TOML file with settings; command-line flags take precedence over it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print the git commands and file writes without performing them
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(flatten)]
    pub overrides: Overrides,
}

#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Commands {
    #[command(about = "Synchronize, generate and publish (default)")]
    Run,
    #[command(about = "Clone or update the local working copy")]
    Sync,
    #[command(about = "Write the placeholder test files")]
    Generate,
    #[command(about = "Stage, commit and push pending changes")]
    Publish,
}

/// Per-setting command-line overrides. Unset flags leave the file/default value alone.
#[derive(Args, Default, Clone, Debug)]
pub struct Overrides {
    /// SSH clone address, preferred when reachable
    #[arg(long, global = true)]
    pub ssh_url: Option<String>,
    /// HTTPS clone address, used when the SSH address does not answer
    #[arg(long, global = true)]
    pub https_url: Option<String>,
    /// Local working copy directory
    #[arg(long, global = true)]
    pub local_path: Option<PathBuf>,
    /// Remote name to fetch from and push to
    #[arg(long, global = true)]
    pub remote: Option<String>,
    /// Branch to check out and push
    #[arg(long, global = true)]
    pub branch: Option<String>,
    /// Directory inside the repository that receives the files
    #[arg(long = "target", global = true)]
    pub target_subpath: Option<String>,
    /// Number of files to generate
    #[arg(long = "count", global = true)]
    pub num_files: Option<usize>,
    /// Commit message (default: "Add <count> test files to <target>")
    #[arg(long = "message", global = true)]
    pub commit_message: Option<String>,
    /// Environment variable holding the HTTPS token
    #[arg(long, global = true)]
    pub token_env: Option<String>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub ssh_url: String,
    pub https_url: String,
    pub local_path: PathBuf,
    pub remote: String,
    pub branch: String,
    pub target_subpath: String,
    pub num_files: usize,
    pub commit_message: Option<String>,
    pub token_env: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            ssh_url: DEFAULT_SSH_URL.to_string(),
            https_url: DEFAULT_HTTPS_URL.to_string(),
            local_path: PathBuf::from(DEFAULT_LOCAL_PATH),
            remote: DEFAULT_REMOTE.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            target_subpath: DEFAULT_TARGET_SUBPATH.to_string(),
            num_files: DEFAULT_NUM_FILES,
            commit_message: None,
            token_env: DEFAULT_TOKEN_ENV.to_string(),
        }
    }
}

impl Settings {
    /// The configured commit message, or one derived from the count and target.
    pub fn commit_message(&self) -> String {
        self.commit_message.clone().unwrap_or_else(|| {
            format!(
                "Add {} test files to {}",
                self.num_files, self.target_subpath
            )
        })
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(v) = &overrides.ssh_url {
            self.ssh_url = v.clone();
        }
        if let Some(v) = &overrides.https_url {
            self.https_url = v.clone();
        }
        if let Some(v) = &overrides.local_path {
            self.local_path = v.clone();
        }
        if let Some(v) = &overrides.remote {
            self.remote = v.clone();
        }
        if let Some(v) = &overrides.branch {
            self.branch = v.clone();
        }
        if let Some(v) = &overrides.target_subpath {
            self.target_subpath = v.clone();
        }
        if let Some(v) = overrides.num_files {
            self.num_files = v;
        }
        if let Some(v) = &overrides.commit_message {
            self.commit_message = Some(v.clone());
        }
        if let Some(v) = &overrides.token_env {
            self.token_env = v.clone();
        }
    }
}

/// Layer the settings in a TOML file over `base`.
pub fn load_settings_file(path: &Path, base: Settings) -> Result<Settings, Box<dyn Error>> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("cannot read config '{}': {}", path.display(), e))?;
    let value: toml::Value = contents
        .parse::<toml::Value>()
        .map_err(|e| format!("invalid config '{}': {}", path.display(), e))?;
    let table = value
        .as_table()
        .ok_or_else(|| format!("config '{}' is not a table", path.display()))?;

    let mut settings = base;
    for (key, val) in table {
        let text = || {
            val.as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| format!("config key '{}' must be a string", key))
        };
        match key.as_str() {
            "ssh_url" => settings.ssh_url = text()?,
            "https_url" => settings.https_url = text()?,
            "local_path" => settings.local_path = PathBuf::from(text()?),
            "remote" => settings.remote = text()?,
            "branch" => settings.branch = text()?,
            "target_subpath" => settings.target_subpath = text()?,
            "commit_message" => settings.commit_message = Some(text()?),
            "token_env" => settings.token_env = text()?,
            "num_files" => {
                let n = val
                    .as_integer()
                    .ok_or_else(|| format!("config key '{}' must be an integer", key))?;
                settings.num_files = usize::try_from(n)
                    .map_err(|_| format!("config key '{}' must not be negative", key))?;
            }
            other => log::warn!("Ignoring unknown config key '{}'", other),
        }
    }
    Ok(settings)
}

/// Defaults, then the `--config` file, then command-line overrides.
pub fn resolve_settings(cli: &Cli) -> Result<Settings, Box<dyn Error>> {
    let mut settings = match &cli.config {
        Some(path) => load_settings_file(path, Settings::default())?,
        None => Settings::default(),
    };
    settings.apply_overrides(&cli.overrides);
    Ok(settings)
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    execute_cli(cli)
}

pub fn execute_cli(cli: Cli) -> Result<(), Box<dyn Error>> {
    let settings = resolve_settings(&cli)?;
    let command = cli.command.unwrap_or(Commands::Run);
    if command != Commands::Generate && !check_git_installed() {
        return Err("Git not installed".into());
    }
    match command {
        Commands::Run => {
            sync_stage(&settings, cli.dry_run)?;
            create_tests(
                &settings.local_path,
                &settings.target_subpath,
                settings.num_files,
                cli.dry_run,
            )?;
            publish_stage(&settings, cli.dry_run)?;
        }
        Commands::Sync => {
            sync_stage(&settings, cli.dry_run)?;
        }
        Commands::Generate => {
            create_tests(
                &settings.local_path,
                &settings.target_subpath,
                settings.num_files,
                cli.dry_run,
            )?;
        }
        Commands::Publish => {
            publish_stage(&settings, cli.dry_run)?;
        }
    }
    Ok(())
}

fn sync_stage(settings: &Settings, dry_run: bool) -> Result<SyncOutcome, Box<dyn Error>> {
    let outcome = ensure_repository(settings, dry_run)
        .map_err(|e| format!("failed to clone or prepare repository: {}", e))?;
    Ok(outcome)
}

fn publish_stage(settings: &Settings, dry_run: bool) -> Result<PublishOutcome, Box<dyn Error>> {
    match commit_and_push(settings, dry_run) {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            log::warn!("Make sure you have push permissions and authentication configured.");
            Err(format!("failed to commit or push: {}", e).into())
        }
    }
}

/// Replace the userinfo of a URL-shaped argument with `***`.
///
/// Arguments without a `scheme://` prefix (including scp-style SSH addresses) are returned as is.
pub fn redact_url(arg: &str) -> String {
    let Some(scheme_end) = arg.find("://") else {
        return arg.to_string();
    };
    let rest = &arg[scheme_end + 3..];
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}://***@{}", &arg[..scheme_end], &rest[at + 1..]),
        None => arg.to_string(),
    }
}

/// Shell-quoted, credential-free rendering of a git invocation (without `-C <dir>`).
pub fn display_command(args: &[&str]) -> String {
    let redacted: Vec<String> = args.iter().map(|a| redact_url(a)).collect();
    let words = std::iter::once("git").chain(redacted.iter().map(String::as_str));
    shlex::try_join(words.clone()).unwrap_or_else(|_| words.collect::<Vec<_>>().join(" "))
}

/// Echo and run `git <args>`, optionally inside `dir`. A non-zero exit is an error.
fn git(dir: Option<&Path>, args: &[&str], dry_run: bool) -> Result<(), Box<dyn Error>> {
    let shown = display_command(args);
    log::info!("> {}", shown);
    if dry_run {
        return Ok(());
    }
    let mut cmd = Command::new("git");
    if let Some(dir) = dir {
        cmd.arg("-C").arg(dir);
    }
    let status = cmd
        .args(args)
        .status()
        .map_err(|e| format!("could not run `{}`: {}", shown, e))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("`{}` failed ({})", shown, status).into())
    }
}

/// Check if Git is installed.
pub fn check_git_installed() -> bool {
    if let Ok(output) = Command::new("git").arg("--version").output() {
        output.status.success()
    } else {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A fresh clone was made; holds the redacted address it came from.
    Cloned { url: String },
    /// An existing working copy was fetched, checked out and pulled.
    Updated,
}

/// `git ls-remote <url>` that never waits on a prompt: no terminal credentials and ssh in batch mode.
pub fn probe_command(url: &str) -> Command {
    let ssh = match std::env::var("GIT_SSH_COMMAND") {
        Ok(custom) if !custom.trim().is_empty() => format!("{} -o BatchMode=yes", custom.trim()),
        _ => "ssh -o BatchMode=yes".to_string(),
    };
    let mut cmd = Command::new("git");
    cmd.arg("ls-remote")
        .arg(url)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("GIT_SSH_COMMAND", ssh)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd
}

/// Lightweight reachability check with all output discarded.
pub fn probe_remote(url: &str) -> bool {
    probe_command(url)
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Read a bearer token from `var`; an empty value counts as absent.
pub fn token_from_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|t| !t.is_empty())
}

/// Insert `token` as userinfo into an `https://` address.
pub fn https_with_token(https_url: &str, token: &str) -> String {
    https_url.replacen("https://", &format!("https://{}@", token), 1)
}

/// SSH when reachable, else HTTPS with the token when one is present, else bare HTTPS.
pub fn select_remote_url(
    ssh_url: &str,
    https_url: &str,
    ssh_reachable: bool,
    token: Option<&str>,
) -> String {
    if ssh_reachable {
        return ssh_url.to_string();
    }
    match token {
        Some(token) => https_with_token(https_url, token),
        None => https_url.to_string(),
    }
}

pub fn choose_clone_url(settings: &Settings) -> String {
    let reachable = probe_remote(&settings.ssh_url);
    if !reachable {
        log::info!(
            "SSH address '{}' is not reachable; falling back to HTTPS",
            settings.ssh_url
        );
    }
    let token = token_from_env(&settings.token_env);
    select_remote_url(
        &settings.ssh_url,
        &settings.https_url,
        reachable,
        token.as_deref(),
    )
}

/// True when `dir` holds git metadata that opens as a repository.
pub fn is_working_copy(dir: &Path) -> bool {
    dir.join(".git").exists() && Repository::open(dir).is_ok()
}

/// Make `settings.local_path` a working copy of the remote, on `settings.branch`, at its latest state.
pub fn ensure_repository(settings: &Settings, dry_run: bool) -> Result<SyncOutcome, Box<dyn Error>> {
    let dir = settings.local_path.as_path();
    let branch = settings.branch.as_str();
    let remote = settings.remote.as_str();

    if is_working_copy(dir) {
        log::info!(
            "Repo already present at {}. Fetching latest {}...",
            dir.display(),
            branch
        );
        git(Some(dir), &["fetch", remote, branch], dry_run)?;
        git(Some(dir), &["checkout", branch], dry_run)?;
        git(Some(dir), &["pull", remote, branch], dry_run)?;
        return Ok(SyncOutcome::Updated);
    }

    let url = choose_clone_url(settings);
    let shown_url = redact_url(&url);
    log::info!("Cloning {} into {} ...", shown_url, dir.display());
    let dir_str = dir
        .to_str()
        .ok_or_else(|| format!("local path '{}' is not valid UTF-8", dir.display()))?;
    let mut clone_args = vec!["clone"];
    if remote != DEFAULT_REMOTE {
        clone_args.extend(["--origin", remote]);
    }
    clone_args.extend([url.as_str(), dir_str]);
    git(None, &clone_args, dry_run)?;
    git(Some(dir), &["checkout", branch], dry_run)?;
    Ok(SyncOutcome::Cloned { url: shown_url })
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl GenerationReport {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.unchanged
    }
}

/// Resolve `subpath` under `repo_dir`, rejecting absolute paths and `..` escapes.
pub fn target_directory(repo_dir: &Path, subpath: &str) -> Result<PathBuf, Box<dyn Error>> {
    let sub = Path::new(subpath);
    let escapes = sub
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(format!(
            "target subpath '{}' must be relative to the repository",
            subpath
        )
        .into());
    }
    Ok(repo_dir.join(sub))
}

/// Write `count` placeholder files (`test_001.py` ...) into `repo_dir/subpath`.
///
/// Files whose content already matches are left untouched; anything else is overwritten.
pub fn create_tests(
    repo_dir: &Path,
    subpath: &str,
    count: usize,
    dry_run: bool,
) -> Result<GenerationReport, Box<dyn Error>> {
    let target_dir = target_directory(repo_dir, subpath)?;
    if !dry_run {
        fs::create_dir_all(&target_dir)
            .map_err(|e| format!("cannot create '{}': {}", target_dir.display(), e))?;
    }

    let mut report = GenerationReport::default();
    for index in 1..=count {
        let path = target_dir.join(test_file_name(index));
        let content = render_test_file(index);
        match fs::read(&path) {
            Ok(existing) if existing == content.as_bytes() => {
                report.unchanged += 1;
                log::debug!("Unchanged {}", path.display());
                continue;
            }
            Ok(_) => {
                report.updated += 1;
                log::info!("Updated {}", path.display());
            }
            Err(_) => {
                report.created += 1;
                log::info!("Created {}", path.display());
            }
        }
        if !dry_run {
            fs::write(&path, content)
                .map_err(|e| format!("cannot write '{}': {}", path.display(), e))?;
        }
    }

    log::info!(
        "{}{} files in {}:{} {} created, {} updated, {} unchanged",
        BLUE,
        report.total(),
        target_dir.display(),
        RESET,
        report.created,
        report.updated,
        report.unchanged
    );
    Ok(report)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The staged diff was empty; nothing was committed or pushed.
    NoChanges,
    /// One commit was created and pushed; holds the staged paths.
    Pushed { files: Vec<String> },
    /// Dry run: the commands were echoed only.
    DryRun,
}

/// Paths that differ between HEAD and the index. An unborn HEAD compares against the empty tree.
pub fn staged_changes(dir: &Path) -> Result<Vec<String>, Box<dyn Error>> {
    let repo = Repository::open(dir)?;
    let index = repo.index()?;
    let head_tree = match repo.head() {
        Ok(head) => Some(head.peel_to_tree()?),
        Err(_) => None,
    };
    let diff = repo.diff_tree_to_index(head_tree.as_ref(), Some(&index), None)?;
    let files = diff
        .deltas()
        .filter_map(|delta| {
            delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .map(|p| p.to_string_lossy().to_string())
        })
        .collect();
    Ok(files)
}

/// Describe the identity git will commit with, and where it comes from.
pub fn describe_author(repo: &Repository) -> String {
    if let (Ok(name), Ok(email)) = (
        std::env::var("GIT_AUTHOR_NAME"),
        std::env::var("GIT_AUTHOR_EMAIL"),
    ) {
        return format!("{} <{}> (source: env:GIT_AUTHOR_NAME/GIT_AUTHOR_EMAIL)", name, email);
    }
    if let Ok(cfg) = repo.config() {
        let name = cfg.get_string("user.name").ok();
        let email = cfg.get_string("user.email").ok();
        if let (Some(name), Some(email)) = (name, email) {
            return format!("{} <{}> (source: git config)", name, email);
        }
    }
    "(not configured)".to_string()
}

/// Stage everything, then commit and push only if the staged diff is non-empty.
pub fn commit_and_push(settings: &Settings, dry_run: bool) -> Result<PublishOutcome, Box<dyn Error>> {
    let dir = settings.local_path.as_path();
    let message = settings.commit_message();

    if dry_run {
        git(Some(dir), &["add", "."], true)?;
        git(Some(dir), &["commit", "-m", &message], true)?;
        git(Some(dir), &["push", &settings.remote, &settings.branch], true)?;
        return Ok(PublishOutcome::DryRun);
    }

    git(Some(dir), &["add", "."], false)?;
    let files = staged_changes(dir)?;
    if files.is_empty() {
        log::info!("{}No changes to commit.{}", YELLOW, RESET);
        return Ok(PublishOutcome::NoChanges);
    }
    log::info!("{}Staged:{} {} file(s)", BLUE, RESET, files.len());
    for file in &files {
        log::debug!("  {}", file);
    }

    let repo = Repository::open(dir)?;
    log::info!("Committing as {}", describe_author(&repo));
    git(Some(dir), &["commit", "-m", &message], false)?;
    git(Some(dir), &["push", &settings.remote, &settings.branch], false)?;
    log::info!(
        "{}Pushed to {}/{}{}",
        GREEN,
        settings.remote,
        settings.branch,
        RESET
    );
    Ok(PublishOutcome::Pushed { files })
}
