//! Binary behaviour on fatal errors
//!
//! Run with: cargo test --test cli_test

use std::net::TcpListener;
use std::process::Command;

const BINARY: &str = env!("CARGO_BIN_EXE_coin-raffle");

fn raffle() -> Command {
    let mut cmd = Command::new(BINARY);
    cmd.env_remove("RAFFLE_CHAIN_ID")
        .env_remove("RAFFLE_SALT")
        .env_remove("FACTOMD_HOST")
        .env("RUST_LOG", "coin_raffle=info");
    cmd
}

#[test]
fn test_missing_salt_exits_with_usage() {
    let output = raffle().args(["-c", &"ab".repeat(32)]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("coin-raffle -s SALT -c CHAIN_ID"));
    assert!(stderr.contains("must provide a salt"));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_bad_chain_id_exits_before_fetch() {
    let output = raffle().args(["-s", "aa", "-c", "nothex"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(!String::from_utf8_lossy(&output.stderr).contains("Fetching chain"));
}

#[test]
fn test_unreachable_factomd_exits_nonzero() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let output = raffle()
        .args(["-s", "aa", "-c", &"ab".repeat(32), "-H", &format!("127.0.0.1:{port}")])
        .args(["--timeout-secs", "2"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ledger retrieval failed"));
    assert!(output.stdout.is_empty());
}
