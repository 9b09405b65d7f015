// CLI integration tests for the one-shot commands and the menu.
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use serde_json::Value;

fn cmd(db: &Path) -> Command {
    let exe = env!("CARGO_BIN_EXE_studentdb");
    let mut command = Command::new(exe);
    command.env_remove("STUDENTDB_PATH").arg("--db").arg(db);
    command
}

fn parse_json(output: &[u8]) -> Value {
    serde_json::from_str(std::str::from_utf8(output).expect("utf8")).expect("valid json")
}

#[test]
fn add_list_find_flow() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db = temp.path().join("database.txt");

    let add = cmd(&db)
        .args(["--format", "json", "add", "Ada", "Lovelace", "28"])
        .output()
        .expect("add");
    assert!(add.status.success());
    let added = parse_json(&add.stdout);
    assert_eq!(added["id"], 1);
    assert_eq!(added["first_name"], "Ada");
    assert_eq!(added["age"], 28);

    let add = cmd(&db)
        .args(["add", "Alan", "Turing", "41"])
        .output()
        .expect("add");
    assert!(add.status.success());
    let text = String::from_utf8_lossy(&add.stdout);
    assert!(text.contains("ID: 2"));

    let list = cmd(&db)
        .args(["--format", "json", "list"])
        .output()
        .expect("list");
    assert!(list.status.success());
    let students = parse_json(&list.stdout);
    let ids: Vec<u64> = students
        .as_array()
        .expect("array")
        .iter()
        .map(|s| s["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2]);

    let find = cmd(&db)
        .args(["--format", "json", "find", "2"])
        .output()
        .expect("find");
    assert!(find.status.success());
    assert_eq!(parse_json(&find.stdout)["last_name"], "Turing");

    let missing = cmd(&db).args(["find", "3"]).output().expect("find");
    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stderr).contains("Student 3 not found"));

    let contents = std::fs::read_to_string(&db).unwrap();
    assert_eq!(contents, "2\n1 Ada Lovelace 28\n2 Alan Turing 41\n");
}

#[test]
fn read_commands_do_not_create_registry() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db = temp.path().join("database.txt");

    let list = cmd(&db).arg("list").output().expect("list");
    assert!(!list.status.success());
    assert!(String::from_utf8_lossy(&list.stderr).contains("not initialized"));
    assert!(!db.exists());
}

#[test]
fn invalid_add_is_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db = temp.path().join("database.txt");

    let add = cmd(&db)
        .args(["add", "Ada", "Lovelace", "-3"])
        .output()
        .expect("add");
    assert!(!add.status.success());
    assert!(String::from_utf8_lossy(&add.stderr).contains("valid age"));
    assert!(!db.exists());
}

#[test]
fn capacity_flag_limits_registry() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db = temp.path().join("database.txt");

    let first = cmd(&db)
        .args(["--capacity", "1", "add", "Ada", "Lovelace", "28"])
        .output()
        .expect("add");
    assert!(first.status.success());

    let second = cmd(&db)
        .args(["--capacity", "1", "add", "Alan", "Turing", "41"])
        .output()
        .expect("add");
    assert!(!second.status.success());
    assert!(String::from_utf8_lossy(&second.stderr).contains("Database limit reached"));
}

#[test]
fn remove_resyncs_counter() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db = temp.path().join("database.txt");
    std::fs::write(&db, "1\n1 Ada Lovelace 28\n2 Alan Turing 41\n").unwrap();

    let remove = cmd(&db)
        .args(["--format", "json", "remove"])
        .output()
        .expect("remove");
    assert!(remove.status.success());
    assert_eq!(parse_json(&remove.stdout)["count"], 2);
    assert!(String::from_utf8_lossy(&remove.stderr).contains("behind stored ID 2"));

    let status = cmd(&db)
        .args(["--format", "json", "status"])
        .output()
        .expect("status");
    assert!(status.status.success());
    let status = parse_json(&status.stdout);
    assert_eq!(status["count"], 2);
    assert_eq!(status["records"], 2);
    assert_eq!(status["capacity"], 50);
    assert_eq!(status["warnings"].as_array().unwrap().len(), 0);
}

#[test]
fn load_warning_is_reported_once() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db = temp.path().join("database.txt");
    std::fs::write(&db, "1\n1 Ada Lovelace 28\n2 Alan Turing 41\n").unwrap();

    let list = cmd(&db)
        .env_remove("RUST_LOG")
        .arg("list")
        .output()
        .expect("list");
    assert!(list.status.success());
    let stderr = String::from_utf8_lossy(&list.stderr);
    assert_eq!(stderr.matches("behind stored ID 2").count(), 1);
    assert!(stderr.starts_with("warning: "));
}

#[test]
fn interactive_session() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db = temp.path().join("database.txt");

    let mut child = cmd(&db)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"2\nAda\nLovelace\n28\n1\n5\n")
        .expect("write");
    let output = child.wait_with_output().expect("wait");

    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("Student Registry System"));
    assert!(text.contains("New student created!"));
    assert!(text.contains("1 Ada Lovelace 28"));
    assert!(text.contains("Exiting program..."));
}
