use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn cmd() -> Command {
    Command::cargo_bin("aws-primitives-tool").unwrap()
}

#[test]
fn no_args_prints_usage_and_fails() {
    cmd().assert().failure().stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_lists_every_category() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("kv"))
        .stdout(predicate::str::contains("counter"))
        .stdout(predicate::str::contains("lock"))
        .stdout(predicate::str::contains("queue"))
        .stdout(predicate::str::contains("leader"))
        .stdout(predicate::str::contains("set"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("txn"))
        .stdout(predicate::str::contains("blob"))
        .stdout(predicate::str::contains("topic"))
        .stdout(predicate::str::contains("mq"))
        .stdout(predicate::str::contains("doctor"));
}

#[test]
fn unknown_category_is_a_usage_error() {
    cmd().arg("frobnicate").arg("thing").assert().failure();
}

#[test]
fn kv_get_missing_name_is_a_usage_error() {
    cmd().args(["kv", "get"]).assert().failure().stderr(predicate::str::contains("required"));
}

#[test]
fn doctor_runs_entirely_against_in_memory_doubles() {
    cmd().arg("doctor").assert().success().stdout(predicate::str::contains("\"item_store\": true"));
}

#[test]
fn txn_rejects_a_malformed_leg() {
    cmd()
        .args(["txn", "run", "not-a-real-leg"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid argument"));
}

#[test]
fn blob_put_rejects_a_uri_without_a_bucket() {
    cmd()
        .args(["blob", "put", "Cargo.toml", "just-a-key"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bucket"));
}
