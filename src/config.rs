use anyhow::{anyhow, Context, Result};
use std::{
    fs, io,
    io::Write as _,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::{Environment, StoredToken};

/// Everything fatt keeps between runs.
///
/// Uses the same keys as the older `freeagent-cli-php.json` file, which wrote
/// `null` for unset strings, so every field tolerates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Credentials {
    #[serde(deserialize_with = "null_as_default")]
    pub environment: Environment,
    #[serde(deserialize_with = "null_as_default")]
    pub client_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub client_secret: String,
    pub access_token: Option<StoredToken>,
    pub timeslip_user: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn default_path() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").filter(|dir| !dir.is_empty()) {
        return Ok(PathBuf::from(dir).join("fatt").join("config.json"));
    }
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
    Ok(home.join(".config").join("fatt").join("config.json"))
}

/// Credentials file of the older client, read when fatt has none of its own.
pub fn legacy_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("freeagent-cli-php.json"))
}

pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_path(),
    }
}

/// A missing or empty file yields the default record; anything unreadable or
/// malformed is an error so it never gets overwritten with defaults.
pub fn load(path: &Path) -> Result<Credentials> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no credentials file, using defaults");
            return Ok(Credentials::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    if contents.trim().is_empty() {
        return Ok(Credentials::default());
    }

    serde_json::from_str(&contents).with_context(|| format!("malformed {}", path.display()))
}

/// Like [`load`], but falls back to `legacy` while `path` does not exist yet.
/// The next save then writes the imported record to `path`.
pub fn load_or_import(path: &Path, legacy: Option<&Path>) -> Result<Credentials> {
    match legacy {
        Some(legacy) if !path.exists() && legacy.is_file() => {
            tracing::debug!(from = %legacy.display(), "importing credentials");
            load(legacy)
        }
        _ => load(path),
    }
}

pub fn save(path: &Path, credentials: &Credentials) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;

    let json = serde_json::to_string_pretty(credentials)?;
    let mut file = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
    file.write_all(json.as_bytes())?;
    file.write_all(b"\n")?;
    restrict_permissions(file.as_file())?;
    file.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to write {}", path.display()))?;

    tracing::debug!(path = %path.display(), "saved credentials");
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File) -> Result<()> {
    Ok(())
}
