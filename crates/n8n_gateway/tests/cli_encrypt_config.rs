//! End-to-end tests for the `encrypt-config` tool and subcommand.

use n8n_gateway_config::{decrypt, EncryptedConfigBlob};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const PASSWORD: &str = "correct horse battery staple";

fn encrypt_config_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_encrypt-config"))
}

fn gateway_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_n8n-mcp"))
}

fn plaintext() -> Value {
    json!({
        "environments": {
            "prod": {"n8n_host": "https://prod.example.com", "n8n_api_key": "n8n_api_prod_0123456789"}
        },
        "defaultEnv": "prod"
    })
}

fn write_plaintext(dir: &Path) -> PathBuf {
    let path = dir.join("config.json");
    std::fs::write(&path, serde_json::to_string_pretty(&plaintext()).unwrap()).unwrap();
    path
}

fn run(mut cmd: Command, home: &Path) -> Output {
    cmd.env("N8N_MCP_HOME", home)
        .env_remove("DEBUG")
        .output()
        .expect("Failed to run binary")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn encrypts_in_place_with_backup() {
    let temp = TempDir::new().unwrap();
    let path = write_plaintext(temp.path());
    let original = std::fs::read_to_string(&path).unwrap();

    let mut cmd = Command::new(encrypt_config_bin());
    cmd.arg(&path).env("CONFIG_ENCRYPTION_PASSWORD", PASSWORD);
    let output = run(cmd, temp.path());
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("config.json.backup"));

    let backup = temp.path().join("config.json.backup");
    assert_eq!(std::fs::read_to_string(&backup).unwrap(), original);

    let encrypted = std::fs::read_to_string(&path).unwrap();
    assert!(!encrypted.contains("n8n_api_prod_0123456789"));
    let blob: EncryptedConfigBlob = serde_json::from_str(&encrypted).unwrap();
    assert_eq!(blob.version, 2);
    assert_eq!(decrypt(&blob, PASSWORD).unwrap(), plaintext());
}

#[test]
fn password_argument_overrides_environment() {
    let temp = TempDir::new().unwrap();
    let path = write_plaintext(temp.path());

    let mut cmd = Command::new(gateway_bin());
    cmd.arg("encrypt-config")
        .arg(&path)
        .arg(PASSWORD)
        .env("CONFIG_ENCRYPTION_PASSWORD", "something else entirely");
    let output = run(cmd, temp.path());
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let blob: EncryptedConfigBlob =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(decrypt(&blob, PASSWORD).is_ok());
}

#[test]
fn refuses_to_encrypt_twice() {
    let temp = TempDir::new().unwrap();
    let path = write_plaintext(temp.path());

    let mut first = Command::new(encrypt_config_bin());
    first.arg(&path).arg(PASSWORD);
    assert!(run(first, temp.path()).status.success());

    let mut second = Command::new(encrypt_config_bin());
    second.arg(&path).arg(PASSWORD);
    let output = run(second, temp.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("already encrypted"));
}

#[test]
fn missing_password_fails() {
    let temp = TempDir::new().unwrap();
    let path = write_plaintext(temp.path());

    let mut cmd = Command::new(encrypt_config_bin());
    cmd.arg(&path).env_remove("CONFIG_ENCRYPTION_PASSWORD");
    let output = run(cmd, temp.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("CONFIG_ENCRYPTION_PASSWORD"));
    assert!(!temp.path().join("config.json.backup").exists());
}

#[test]
fn missing_file_fails() {
    let temp = TempDir::new().unwrap();

    let mut cmd = Command::new(encrypt_config_bin());
    cmd.arg(temp.path().join("nope.json")).arg(PASSWORD);
    let output = run(cmd, temp.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Error: "));
}
