#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use testseed::Settings;

pub fn git_available() -> bool {
    which::which("git").is_ok()
}

pub fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .status()
        .unwrap();
    assert!(status.success(), "git {:?} failed in {}", args, dir.display());
}

pub fn git_stdout(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .unwrap();
    assert!(out.status.success(), "git {:?} failed in {}", args, dir.display());
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

pub fn configure_identity(dir: &Path) {
    git(dir, &["config", "user.name", "testseed"]);
    git(dir, &["config", "user.email", "testseed@example.com"]);
}

/// Bare repository under `root` whose `main` branch (HEAD) holds one commit with a README,
/// plus a `develop` branch with one more commit adding `DEVELOP.md`.
pub fn seeded_remote(root: &Path) -> PathBuf {
    let bare = root.join("remote.git");
    git2::Repository::init_bare(&bare).unwrap();
    git(&bare, &["symbolic-ref", "HEAD", "refs/heads/main"]);

    let seed = root.join("seed");
    std::fs::create_dir_all(&seed).unwrap();
    git(&seed, &["init"]);
    git(&seed, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    configure_identity(&seed);
    std::fs::write(seed.join("README.md"), "seed\n").unwrap();
    git(&seed, &["add", "README.md"]);
    git(&seed, &["commit", "-m", "Initial commit"]);
    git(&seed, &["remote", "add", "origin", bare.to_str().unwrap()]);
    git(&seed, &["push", "origin", "main"]);

    // A second branch that is not the remote's HEAD.
    git(&seed, &["checkout", "-b", "develop"]);
    std::fs::write(seed.join("DEVELOP.md"), "develop only\n").unwrap();
    git(&seed, &["add", "DEVELOP.md"]);
    git(&seed, &["commit", "-m", "Develop commit"]);
    git(&seed, &["push", "origin", "develop"]);
    git(&seed, &["checkout", "main"]);
    bare
}

/// Settings pointing at a local bare remote; the HTTPS address never resolves.
pub fn local_settings(root: &Path, remote: &Path) -> Settings {
    Settings {
        ssh_url: remote.to_str().unwrap().to_string(),
        https_url: root.join("no-such-remote.git").to_str().unwrap().to_string(),
        local_path: root.join("work"),
        num_files: 5,
        token_env: "TESTSEED_TEST_UNSET_TOKEN".to_string(),
        ..Settings::default()
    }
}

pub fn commit_count(dir: &Path) -> usize {
    git_stdout(dir, &["rev-list", "--count", "HEAD"])
        .parse()
        .unwrap()
}

pub fn head_of(repo: &Path, rev: &str) -> String {
    git_stdout(repo, &["rev-parse", rev])
}
