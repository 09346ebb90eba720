//! CLI contract tests.

use assert_cmd::Command;

fn hirebot(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("hirebot").expect("binary should build");
    cmd.env("HOME", home)
        .env("HIREBOT_CONFIG_PATH", home.join("config.toml"))
        .env("HIREBOT_DB_PATH", home.join("hirebot.db"))
        .env_remove("RUST_LOG")
        .env_remove("OPENAI_API_KEY");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().expect("binary should run");
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn help_lists_subcommands() {
    let home = tempfile::tempdir().expect("tempdir");
    let help = stdout_of(hirebot(home.path()).arg("--help"));
    for subcommand in ["chat", "seed", "slots", "schedule", "cancel", "ingest", "stats"] {
        assert!(help.contains(subcommand), "missing {subcommand} in help");
    }
}

#[test]
fn seed_then_list_slots() {
    let home = tempfile::tempdir().expect("tempdir");
    let seeded = stdout_of(hirebot(home.path()).args(["seed", "--from", "2030-06-03"]));
    assert!(seeded.starts_with("inserted "));

    let listed = stdout_of(hirebot(home.path()).args([
        "slots",
        "--position",
        "Python Developer",
        "--from",
        "2030-06-03",
        "--to",
        "2030-06-30",
    ]));
    assert!(listed.contains("Python Developer"));
    assert!(listed.contains("2030-06-"));
}

#[test]
fn schedule_and_cancel_without_booking() {
    let home = tempfile::tempdir().expect("tempdir");
    let cancelled = stdout_of(hirebot(home.path()).args(["cancel", "--phone", "1234567890"]));
    assert_eq!(cancelled.trim(), "released 0 interview(s)");

    let stats = stdout_of(hirebot(home.path()).arg("stats"));
    assert!(stats.contains("candidates:   0"));
}

#[test]
fn chat_quits_on_command() {
    let home = tempfile::tempdir().expect("tempdir");
    let out = stdout_of(
        hirebot(home.path())
            .env("HIREBOT_INTENT_STRATEGY", "keyword")
            .env("HIREBOT_LOG_DIR", home.path().join("logs"))
            .args(["chat"])
            .write_stdin("Hi, I'm John, my number is 123-456-7890\n/quit\n"),
    );
    assert!(out.contains("Thank you for providing your details, John."));
}
