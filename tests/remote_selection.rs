mod common;

use tempfile::tempdir;
use testseed::*;

#[test]
fn test_select_prefers_ssh_when_reachable() {
    let url = select_remote_url(
        "git@example.com:o/r.git",
        "https://example.com/o/r.git",
        true,
        Some("tok"),
    );
    assert_eq!(url, "git@example.com:o/r.git");
}

#[test]
fn test_select_uses_token_only_when_ssh_unreachable() {
    let with_token = select_remote_url(
        "git@example.com:o/r.git",
        "https://example.com/o/r.git",
        false,
        Some("tok"),
    );
    assert_eq!(with_token, "https://tok@example.com/o/r.git");

    let bare = select_remote_url(
        "git@example.com:o/r.git",
        "https://example.com/o/r.git",
        false,
        None,
    );
    assert_eq!(bare, "https://example.com/o/r.git");
}

#[test]
fn test_https_with_token_leaves_other_schemes_alone() {
    assert_eq!(
        https_with_token("http://example.com/r.git", "tok"),
        "http://example.com/r.git"
    );
}

#[test]
#[serial_test::serial]
fn test_token_from_env_ignores_empty_values() {
    let var = "TESTSEED_TEST_TOKEN_EMPTY";
    std::env::set_var(var, "");
    assert_eq!(token_from_env(var), None);
    std::env::set_var(var, "secret");
    assert_eq!(token_from_env(var).as_deref(), Some("secret"));
    std::env::remove_var(var);
    assert_eq!(token_from_env(var), None);
}

#[test]
fn test_probe_remote_local_paths() {
    if !common::git_available() {
        eprintln!("git not installed; skipping");
        return;
    }
    let tmp = tempdir().unwrap();
    let bare = common::seeded_remote(tmp.path());
    assert!(probe_remote(bare.to_str().unwrap()));
    assert!(!probe_remote(
        tmp.path().join("missing.git").to_str().unwrap()
    ));
}

#[test]
#[serial_test::serial]
fn test_choose_clone_url_falls_back_to_token_address() {
    if !common::git_available() {
        eprintln!("git not installed; skipping");
        return;
    }
    let tmp = tempdir().unwrap();
    let var = "TESTSEED_TEST_TOKEN_FALLBACK";
    let settings = Settings {
        ssh_url: tmp.path().join("missing.git").to_str().unwrap().to_string(),
        https_url: "https://example.invalid/o/r.git".to_string(),
        token_env: var.to_string(),
        ..Settings::default()
    };

    std::env::remove_var(var);
    assert_eq!(choose_clone_url(&settings), "https://example.invalid/o/r.git");

    std::env::set_var(var, "abc");
    assert_eq!(
        choose_clone_url(&settings),
        "https://abc@example.invalid/o/r.git"
    );
    std::env::remove_var(var);
}

#[test]
#[serial_test::serial]
fn test_choose_clone_url_ignores_token_when_ssh_answers() {
    if !common::git_available() {
        eprintln!("git not installed; skipping");
        return;
    }
    let tmp = tempdir().unwrap();
    let bare = common::seeded_remote(tmp.path());
    let var = "TESTSEED_TEST_TOKEN_PRIMARY";
    std::env::set_var(var, "abc");
    let settings = Settings {
        ssh_url: bare.to_str().unwrap().to_string(),
        https_url: "https://example.invalid/o/r.git".to_string(),
        token_env: var.to_string(),
        ..Settings::default()
    };
    assert_eq!(choose_clone_url(&settings), bare.to_str().unwrap());
    std::env::remove_var(var);
}

#[test]
#[serial_test::serial]
fn test_probe_command_runs_ssh_in_batch_mode() {
    let saved = std::env::var_os("GIT_SSH_COMMAND");

    std::env::remove_var("GIT_SSH_COMMAND");
    let cmd = probe_command("git@example.com:o/r.git");
    let envs: Vec<_> = cmd.get_envs().collect();
    assert!(envs.contains(&(
        std::ffi::OsStr::new("GIT_SSH_COMMAND"),
        Some(std::ffi::OsStr::new("ssh -o BatchMode=yes"))
    )));
    assert!(envs.contains(&(
        std::ffi::OsStr::new("GIT_TERMINAL_PROMPT"),
        Some(std::ffi::OsStr::new("0"))
    )));

    // A user-supplied ssh command is kept, with batch mode appended.
    std::env::set_var("GIT_SSH_COMMAND", "ssh -i /keys/deploy");
    let cmd = probe_command("git@example.com:o/r.git");
    assert!(cmd.get_envs().any(|(k, v)| k == "GIT_SSH_COMMAND"
        && v == Some(std::ffi::OsStr::new("ssh -i /keys/deploy -o BatchMode=yes"))));

    match saved {
        Some(v) => std::env::set_var("GIT_SSH_COMMAND", v),
        None => std::env::remove_var("GIT_SSH_COMMAND"),
    }
}
