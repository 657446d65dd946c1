use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Version label given to files inserted when neither flag nor config names one
pub const DEFAULT_GAME_VERSION: &str = "unknown";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct NdfDbConfig {
    pub database: Option<String>,
    pub game_version: Option<String>,
}

impl NdfDbConfig {
    /// Database path: explicit flag, then config, then `.ndf-db/ndf.db` under `base`
    pub fn database_path(&self, flag: Option<&Path>, base: &Path) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.database.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| default_database_path_in(base))
    }

    pub fn game_version<'a>(&'a self, flag: Option<&'a str>) -> &'a str {
        flag.or(self.game_version.as_deref()).unwrap_or(DEFAULT_GAME_VERSION)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("ndf-db.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".ndf-db").join("ndf.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<NdfDbConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: NdfDbConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &NdfDbConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
