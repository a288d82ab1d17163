//! One-shot migration of a plaintext config file to an encrypted envelope.
//!
//! Order matters: the backup is written before anything is encrypted, and
//! the original is only replaced by an atomic rename of a sibling temp file.

use crate::crypto::{self, ConfigCrypto};
use crate::error::{CryptoError, MigrationError};
use crate::resolver::read_config_file;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where migration left things.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub backup_path: PathBuf,
    pub encrypted_path: PathBuf,
}

/// `<path>.backup`
pub fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".backup");
    PathBuf::from(name)
}

/// Encrypt `path` in place with the default iteration count.
pub fn migrate_config_file(path: &Path, password: &str) -> Result<MigrationReport, MigrationError> {
    migrate_with(&ConfigCrypto::default(), path, password)
}

pub fn migrate_with(
    crypto: &ConfigCrypto,
    path: &Path,
    password: &str,
) -> Result<MigrationReport, MigrationError> {
    let document = read_config_file(path)?;
    if crypto::looks_encrypted(&document) {
        return Err(MigrationError::AlreadyEncrypted {
            path: path.to_path_buf(),
        });
    }
    if !document.is_object() {
        return Err(MigrationError::NotAnObject {
            path: path.to_path_buf(),
        });
    }

    let backup_path = backup_path_for(path);
    fs::copy(path, &backup_path).map_err(|e| MigrationError::write(&backup_path, e))?;
    restrict_permissions(&backup_path)?;
    info!(backup = %backup_path.display(), "Wrote plaintext config backup");

    let blob = crypto.encrypt(&document, password)?;
    debug!(iterations = crypto.iterations(), "Encrypted configuration envelope");
    let encoded = serde_json::to_vec_pretty(&blob).map_err(|_| CryptoError::Encryption)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut tmp =
        tempfile::NamedTempFile::new_in(&dir).map_err(|e| MigrationError::write(&dir, e))?;
    tmp.write_all(&encoded)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| MigrationError::write(tmp.path(), e))?;
    restrict_permissions(tmp.path())?;
    tmp.persist(path)
        .map_err(|e| MigrationError::write(path, e.error))?;

    info!(path = %path.display(), "Encrypted config written");

    Ok(MigrationReport {
        backup_path,
        encrypted_path: path.to_path_buf(),
    })
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), MigrationError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|e| MigrationError::write(path, e))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), MigrationError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::MIN_ITERATIONS;
    use crate::error::ConfigError;
    use serde_json::{json, Value};

    fn fast() -> ConfigCrypto {
        ConfigCrypto::with_iterations(MIN_ITERATIONS).unwrap()
    }

    fn write_plain(dir: &Path) -> (PathBuf, Value) {
        let path = dir.join("config.json");
        let doc = json!({
            "environments": {
                "prod": {"n8n_host": "https://n8n.example.com", "n8n_api_key": "n8n_api_prod_0123456789"}
            },
            "defaultEnv": "prod"
        });
        fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
        (path, doc)
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path_for(Path::new("/etc/n8n/config.json")),
            PathBuf::from("/etc/n8n/config.json.backup")
        );
    }

    #[test]
    fn test_migrates_and_keeps_backup() {
        let dir = tempfile::tempdir().unwrap();
        let (path, doc) = write_plain(dir.path());
        let original = fs::read_to_string(&path).unwrap();

        let report = migrate_with(&fast(), &path, "pw-pw-pw-pw").unwrap();

        assert_eq!(report.encrypted_path, path);
        assert_eq!(fs::read_to_string(&report.backup_path).unwrap(), original);
        assert!(crypto::is_encrypted(&path));

        let blob: crypto::EncryptedConfigBlob =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(blob.iterations, fast().iterations());
        assert_eq!(crypto::decrypt(&blob, "pw-pw-pw-pw").unwrap(), doc);
    }

    #[test]
    fn test_refuses_already_encrypted() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = write_plain(dir.path());
        migrate_with(&fast(), &path, "pw-pw-pw-pw").unwrap();
        let sealed = fs::read(&path).unwrap();

        let err = migrate_with(&fast(), &path, "pw-pw-pw-pw").unwrap_err();
        assert!(matches!(err, MigrationError::AlreadyEncrypted { .. }));
        assert_eq!(fs::read(&path).unwrap(), sealed);
    }

    #[test]
    fn test_rejects_non_object_without_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let err = migrate_with(&fast(), &path, "pw-pw-pw-pw").unwrap_err();
        assert!(matches!(err, MigrationError::NotAnObject { .. }));
        assert!(!backup_path_for(&path).exists());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = migrate_with(&fast(), &dir.path().join("nope.json"), "pw").unwrap_err();
        assert!(matches!(err, MigrationError::Config(ConfigError::Io { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_written_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let (path, _) = write_plain(dir.path());
        let report = migrate_with(&fast(), &path, "pw-pw-pw-pw").unwrap();

        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&report.encrypted_path), 0o600);
        assert_eq!(mode(&report.backup_path), 0o600);
    }
}
