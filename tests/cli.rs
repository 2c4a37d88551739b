use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn soundclip() -> Command {
    let mut cmd = Command::cargo_bin("soundclip").unwrap();
    cmd.env_remove("DISCORD_API_KEY")
        .env_remove("DISCORD_GUILD_ID");
    cmd
}

fn config_file(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("soundclip.yaml");
    fs_err::write(&path, "discord:\n  api_base: \"http://127.0.0.1:9\"\nupload:\n  max_attempts: 1\n").unwrap();
    path
}

#[test]
fn test_help_lists_commands() {
    soundclip()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("upload-dir"))
        .stdout(predicate::str::contains("slides"));
}

#[test]
fn test_platforms() {
    soundclip()
        .arg("platforms")
        .assert()
        .success()
        .stdout(predicate::str::contains("YouTube"))
        .stdout(predicate::str::contains("Instagram"))
        .stdout(predicate::str::contains("Facebook"));
}

#[test]
fn test_create_rejects_unrecognized_source() {
    let dir = TempDir::new().unwrap();
    let config = config_file(&dir);

    soundclip()
        .args(["--config", config.to_str().unwrap(), "--token", "test-token", "-q"])
        .args(["create", "https://example.com/clip.mp4", "--start", "0", "--end", "2"])
        .args(["--name", "horn", "--guild", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unrecognized source"));
}

#[test]
fn test_create_rejects_short_name() {
    let dir = TempDir::new().unwrap();
    let config = config_file(&dir);

    soundclip()
        .args(["--config", config.to_str().unwrap(), "--token", "test-token", "-q"])
        .args(["create", "https://youtu.be/dQw4w9WgXcQ", "--start", "0", "--end", "2"])
        .args(["--name", "x", "--guild", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Sound name must be between 2 and 32 characters"));
}

#[test]
fn test_preview_rejects_inverted_window() {
    let dir = TempDir::new().unwrap();
    let config = config_file(&dir);
    let output = dir.path().join("clip.mp3");

    soundclip()
        .args(["--config", config.to_str().unwrap(), "-q"])
        .args(["preview", "https://youtu.be/dQw4w9WgXcQ", "--start", "5", "--end", "2"])
        .args(["--output", output.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid trim"));

    assert!(!output.exists());
}

#[test]
fn test_list_requires_token() {
    let dir = TempDir::new().unwrap();
    let config = config_file(&dir);

    soundclip()
        .args(["--config", config.to_str().unwrap(), "list", "--guild", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DISCORD_API_KEY"));
}

#[test]
fn test_list_requires_guild() {
    let dir = TempDir::new().unwrap();
    let config = config_file(&dir);

    soundclip()
        .args(["--config", config.to_str().unwrap(), "--token", "test-token", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No guild specified"));
}

#[test]
fn test_config_show() {
    let dir = TempDir::new().unwrap();
    let config = config_file(&dir);

    soundclip()
        .args(["--config", config.to_str().unwrap(), "config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("API Base: http://127.0.0.1:9"))
        .stdout(predicate::str::contains("Bitrates: 128k, 96k, 64k, 48k, 32k"));
}
