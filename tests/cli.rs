use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::path::PathBuf;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn modelguard() -> Command {
    let mut cmd = Command::cargo_bin("modelguard").unwrap();
    cmd.env_remove("MODELGUARD_COLLECT")
        .env_remove("MODELGUARD_PROTOCOL")
        .env("NO_COLOR", "1");
    cmd
}

const BROKEN_MODELS: &str = r#"[
  { "type": "tradle.Model", "id": "shop.Basket", "properties": {}, "sort": "total" },
  { "type": "tradle.Model", "id": "shop.Receipt", "properties": {}, "required": ["total"] }
]"#;

#[test]
fn validate_accepts_fixture_models() {
    modelguard()
        .arg("validate")
        .arg(fixtures())
        .assert()
        .success()
        .stdout(predicate::str::contains("models passed validation!"));
}

#[test]
fn validate_reports_first_failure() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("shop.json").write_str(BROKEN_MODELS).unwrap();

    modelguard()
        .arg("validate")
        .arg(fixtures().join("base"))
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid model \"shop.Basket\""))
        .stderr(predicate::str::contains("Validation failed"));
}

#[test]
fn validate_collects_failures_from_env() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("shop.json").write_str(BROKEN_MODELS).unwrap();

    modelguard()
        .env("MODELGUARD_COLLECT", "true")
        .arg("validate")
        .arg(fixtures().join("base"))
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("shop.Basket"))
        .stderr(predicate::str::contains("shop.Receipt"))
        .stderr(predicate::str::contains("2 of"));
}

#[test]
fn validate_points_at_parse_errors() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("broken.json")
        .write_str("[\n  { \"id\": \"shop.Basket\",, }\n]")
        .unwrap();

    modelguard()
        .arg("validate")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.json"))
        .stderr(predicate::str::contains("Failed to load models"));
}

#[test]
fn validate_requires_existing_paths() {
    modelguard()
        .args(["validate", "does/not/exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No such file or directory"));
}

#[test]
fn refs_prints_the_closure_one_id_per_line() {
    modelguard()
        .args(["refs", "-m", "bank.MyLoan"])
        .arg(fixtures())
        .assert()
        .success()
        .stdout(predicate::str::contains("bank.Loan\n"))
        .stdout(predicate::str::contains("bank.Colour\n"))
        .stdout(predicate::str::contains("tradle.Object\n"));
}

#[test]
fn refs_direct_stops_after_one_hop() {
    modelguard()
        .args(["refs", "--direct", "--model", "bank.MyLoan"])
        .arg(fixtures())
        .assert()
        .success()
        .stdout(predicate::str::contains("bank.Loan"))
        .stdout(predicate::str::contains("bank.Colour").not());
}

#[test]
fn refs_fails_on_unknown_model() {
    modelguard()
        .args(["refs", "-m", "bank.Nope"])
        .arg(fixtures())
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing model \"bank.Nope\""));
}

#[test]
fn protocol_prints_registry_as_yaml() {
    modelguard()
        .arg("protocol")
        .assert()
        .success()
        .stdout(predicate::str::contains("model: tradle.Model"))
        .stdout(predicate::str::contains("protocolRoots:"));
}

#[test]
fn protocol_file_overrides_reserved_ids() {
    let dir = assert_fs::TempDir::new().unwrap();
    let file = dir.child("protocol.yml");
    file.write_str("reserved:\n  model: acme.Model\n").unwrap();

    modelguard()
        .arg("--protocol")
        .arg(file.path())
        .arg("protocol")
        .assert()
        .success()
        .stdout(predicate::str::contains("model: acme.Model"))
        .stdout(predicate::str::contains("object: tradle.Object"));
}
