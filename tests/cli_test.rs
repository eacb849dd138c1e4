use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_normalize_prints_transcript() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("lecture.srt");
    std::fs::write(
        &file,
        "1\n00:00:01,000 --> 00:00:02,000\nHello world.\n\n2\n00:00:02,000 --> 00:00:03,000\nSecond  line\n",
    )
    .unwrap();

    Command::cargo_bin("caption-archiver")
        .unwrap()
        .arg("normalize")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::eq("Hello world.\nSecond line\n"));
}

#[test]
fn test_normalize_missing_file_fails() {
    Command::cargo_bin("caption-archiver")
        .unwrap()
        .args(["normalize", "does-not-exist.srt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist.srt"));
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("caption-archiver")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("download"))
        .stdout(predicate::str::contains("normalize"));
}
