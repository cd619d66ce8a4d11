//! End-to-end tests driving the `kinfolk` binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn kinfolk(&self) -> Command {
        let mut cmd = Command::cargo_bin("kinfolk").unwrap();
        cmd.env("KINFOLK_DATA_DIR", self.dir.path().join("data"))
            .env("KINFOLK_CONFIG", self.dir.path().join("config.toml"))
            .env_remove("RUST_LOG");
        cmd
    }

    /// Run with JSON output and parse stdout
    fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self
            .kinfolk()
            .args(["-f", "json"])
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).unwrap()
    }

    fn add_person(&self, first: &str, last: &str) -> i64 {
        self.json(&["person", "add", first, last])["id"]
            .as_i64()
            .unwrap()
    }
}

fn first_names(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"]["first"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_family_with_children() {
    let ws = Workspace::new();
    let alice = ws.add_person("Alice", "Smith");
    let bob = ws.add_person("Bob", "Smith");
    let carol = ws.add_person("Carol", "Smith");
    let dave = ws.add_person("Dave", "Smith");

    let family = ws.json(&[
        "family",
        "add",
        "--partner1",
        &alice.to_string(),
        "--partner2",
        &bob.to_string(),
        "--child",
        &carol.to_string(),
        "--child",
        &dave.to_string(),
    ]);
    assert_eq!(family["partner1"], alice);

    let parents = ws.json(&["tree", "parents", &carol.to_string()]);
    assert_eq!(first_names(&parents), vec!["Alice", "Bob"]);

    let siblings = ws.json(&["tree", "siblings", &carol.to_string()]);
    assert_eq!(first_names(&siblings), vec!["Dave"]);

    ws.kinfolk()
        .args(["tree", "descendants", &alice.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Carol Smith"))
        .stdout(predicate::str::contains("Dave Smith"));

    ws.kinfolk()
        .args(["tree", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("consistent"));
}

#[test]
fn test_self_union_is_rejected() {
    let ws = Workspace::new();
    let alice = ws.add_person("Alice", "Smith");

    ws.kinfolk()
        .args(["family", "add", "--partner1", &alice.to_string()])
        .args(["--partner2", &alice.to_string()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[self_union]"));

    let families = ws.json(&["family", "list"]);
    assert!(families.as_array().unwrap().is_empty());
}

#[test]
fn test_cycle_is_rejected() {
    let ws = Workspace::new();
    let parent = ws.add_person("Old", "Smith");
    let child = ws.add_person("Young", "Smith");

    ws.kinfolk()
        .args(["family", "add", "--partner1", &parent.to_string()])
        .args(["--child", &child.to_string()])
        .assert()
        .success();
    let second = ws.json(&["family", "add", "--partner1", &child.to_string()]);
    let second = second["id"].as_i64().unwrap().to_string();

    ws.kinfolk()
        .args(["family", "add-child", &second, &parent.to_string()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[cycle_detected]"));
}

#[test]
fn test_trash_round_trip() {
    let ws = Workspace::new();
    let alice = ws.add_person("Alice", "Smith").to_string();

    ws.kinfolk().args(["person", "delete", &alice]).assert().success();
    ws.kinfolk()
        .args(["person", "get", &alice])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[not_found]"));
    ws.kinfolk()
        .args(["trash", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Alice Smith"));

    ws.kinfolk()
        .args(["trash", "restore", "person", &alice])
        .assert()
        .success();
    ws.kinfolk()
        .args(["person", "get", &alice])
        .assert()
        .success()
        .stdout(predicate::str::contains("Alice Smith"));
}

#[test]
fn test_search() {
    let ws = Workspace::new();
    ws.add_person("John", "Smith");
    ws.add_person("Mary", "Brown");

    let hits = ws.json(&["search", "smi"]);
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["person"]["name"]["first"], "John");

    ws.kinfolk()
        .args(["search", "s"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 2 characters"));

    ws.kinfolk().args(["person", "delete", "1"]).assert().success();
    let hits = ws.json(&["search", "smi"]);
    assert!(hits.as_array().unwrap().is_empty());
}

#[test]
fn test_export_then_import() {
    let source = Workspace::new();
    let alice = source.add_person("Alice", "Smith");
    let carol = source.add_person("Carol", "Smith");
    source
        .kinfolk()
        .args(["family", "add", "--partner1", &alice.to_string()])
        .args(["--child", &carol.to_string()])
        .assert()
        .success();

    let file = source.dir.path().join("tree.json");
    source
        .kinfolk()
        .args(["export", "--output", file.to_str().unwrap()])
        .assert()
        .success();

    let target = Workspace::new();
    target.add_person("Zed", "Other");
    target
        .kinfolk()
        .args(["import", file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--merge"));
    target
        .kinfolk()
        .args(["import", "--merge", file.to_str().unwrap()])
        .assert()
        .success();

    // Imported ids follow the existing person
    let parents = target.json(&["tree", "parents", "3"]);
    assert_eq!(first_names(&parents), vec!["Alice"]);
}

#[test]
fn test_export_after_deleting_a_partner_imports() {
    let source = Workspace::new();
    let alice = source.add_person("Alice", "Smith").to_string();
    let bob = source.add_person("Bob", "Smith").to_string();
    let carol = source.add_person("Carol", "Smith").to_string();
    source
        .kinfolk()
        .args(["family", "add", "--partner1", &alice, "--partner2", &bob])
        .args(["--child", &carol])
        .assert()
        .success();
    source
        .kinfolk()
        .args(["event", "add", &bob, "burial", "--date", "1990-01-01"])
        .assert()
        .success();
    source.kinfolk().args(["person", "delete", &bob]).assert().success();

    let file = source.dir.path().join("tree.json");
    source
        .kinfolk()
        .args(["export", "--output", file.to_str().unwrap()])
        .assert()
        .success();

    let target = Workspace::new();
    target
        .kinfolk()
        .args(["import", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 persons, 1 families, 0 events"));
    let parents = target.json(&["tree", "parents", "2"]);
    assert_eq!(first_names(&parents), vec!["Alice"]);
}

#[test]
fn test_config_keys_are_validated() {
    let ws = Workspace::new();
    ws.kinfolk()
        .args(["config", "set", "backend", "postgres"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("redb or sqlite"));
    ws.kinfolk()
        .args(["config", "set", "default_max_depth", "500"])
        .assert()
        .failure();

    ws.kinfolk()
        .args(["config", "set", "default_max_depth", "3"])
        .assert()
        .success();
    ws.kinfolk()
        .args(["config", "get", "default_max_depth"])
        .assert()
        .success()
        .stdout("3\n");
    ws.kinfolk()
        .args(["config", "reset", "default_max_depth"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_max_depth = 10"));
}

#[test]
fn test_gedcom_export() {
    let ws = Workspace::new();
    ws.add_person("Alice", "Smith");

    ws.kinfolk()
        .args(["export", "--type", "gedcom"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("0 HEAD"))
        .stdout(predicate::str::contains("1 NAME Alice /Smith/"))
        .stdout(predicate::str::contains("0 TRLR"));
}

#[test]
fn test_mutations_take_automatic_backups() {
    let ws = Workspace::new();
    ws.add_person("Alice", "Smith");
    // Throttled: the second mutation inside the interval takes no backup
    ws.add_person("Bob", "Smith");

    let backups = ws.json(&["backup", "list"]);
    let backups = backups.as_array().unwrap();
    assert_eq!(backups.len(), 1);
    assert_eq!(backups[0]["trigger"], "auto");

    let name = backups[0]["name"].as_str().unwrap().to_string();
    ws.kinfolk()
        .args(["backup", "restore", &name])
        .assert()
        .success()
        .stdout(predicate::str::contains("Previous database saved"));

    // The automatic backup was taken after the first person was created
    let persons = ws.json(&["person", "list"]);
    assert_eq!(first_names(&persons), vec!["Alice"]);
}

#[test]
fn test_sqlite_backend() {
    let ws = Workspace::new();
    ws.kinfolk()
        .args(["--backend", "sqlite", "person", "add", "Ada", "Byron"])
        .assert()
        .success();
    assert!(ws.dir.path().join("data").join("kinfolk.db").exists());

    ws.kinfolk()
        .args(["config", "set", "backend", "sqlite"])
        .assert()
        .success();
    let persons = ws.json(&["person", "list"]);
    assert_eq!(first_names(&persons), vec!["Ada"]);
}

#[test]
fn test_completions() {
    Command::cargo_bin("kinfolk")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kinfolk"));
}
