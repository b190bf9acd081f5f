use std::{
    path::{Path, PathBuf},
    sync::RwLock,
};

use tracing::debug;

use crate::{
    env_subst::substitute_env,
    error::{Context, Error, Result},
    schema::PorticoConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "portico.toml",
    "portico.yaml",
    "portico.yml",
    "portico.json",
];

static CONFIG_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Use `dir` instead of the user-global config directory.
pub fn set_config_dir(dir: PathBuf) {
    if let Ok(mut guard) = CONFIG_DIR_OVERRIDE.write() {
        *guard = Some(dir);
    }
}

pub fn clear_config_dir() {
    if let Ok(mut guard) = CONFIG_DIR_OVERRIDE.write() {
        *guard = None;
    }
}

/// Returns the config directory: the override if set, else `~/.config/portico/`.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(guard) = CONFIG_DIR_OVERRIDE.read()
        && let Some(dir) = guard.as_ref()
    {
        return Some(dir.clone());
    }
    directories::ProjectDirs::from("", "", "portico").map(|d| d.config_dir().to_path_buf())
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<PorticoConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./portico.{toml,yaml,yml,json}` (project-local)
/// 2. `<config dir>/portico.{toml,yaml,yml,json}` (user-global)
///
/// Returns `PorticoConfig::default()` if no config file is found. A file
/// that fails to load is an error naming the file, so the caller can log
/// it once tracing is up.
pub fn discover_and_load() -> Result<PorticoConfig> {
    let search = [Some(PathBuf::from(".")), config_dir()];
    load_first(search.iter().flatten())
}

fn load_first<'a>(dirs: impl IntoIterator<Item = &'a PathBuf>) -> Result<PorticoConfig> {
    let Some(path) = find_config_file(dirs) else {
        debug!("no config file found, using defaults");
        return Ok(PorticoConfig::default());
    };
    debug!(path = %path.display(), "loading config");
    load_config(&path).with_context(|| path.display().to_string())
}

/// First existing config file across `dirs`, in order.
fn find_config_file<'a>(dirs: impl IntoIterator<Item = &'a PathBuf>) -> Option<PathBuf> {
    dirs.into_iter().find_map(|dir| {
        CONFIG_FILENAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.exists())
    })
}

fn parse_config(raw: &str, path: &Path) -> Result<PorticoConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(Error::UnsupportedFormat {
            extension: ext.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portico.toml");
        std::fs::write(
            &path,
            r#"
            [logging]
            level = "debug"

            [channels.console.user]
            title = "Ops"
            "#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.channels.console.contains_key("user"));
    }

    #[test]
    fn loads_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("portico.yaml");
        std::fs::write(&yaml, "logging:\n  json: true\n").unwrap();
        assert!(load_config(&yaml).unwrap().logging.json);

        let json = dir.path().join("portico.json");
        std::fs::write(&json, r#"{"logging": {"capture": false}}"#).unwrap();
        assert!(!load_config(&json).unwrap().logging.capture);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portico.ini");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(Error::UnsupportedFormat { extension }) if extension == "ini"
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_config(&dir.path().join("nope.toml")),
            Err(Error::Read { .. })
        ));
    }

    #[test]
    fn find_prefers_earlier_directory_and_filename_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join("portico.toml"), "").unwrap();
        std::fs::write(first.path().join("portico.json"), "{}").unwrap();
        std::fs::write(first.path().join("portico.yaml"), "").unwrap();

        let dirs = [first.path().to_path_buf(), second.path().to_path_buf()];
        let found = find_config_file(dirs.iter()).unwrap();
        assert_eq!(found, first.path().join("portico.yaml"));
    }

    #[test]
    fn load_failure_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portico.toml");
        std::fs::write(&path, "[logging\nlevel = ").unwrap();

        let dirs = [dir.path().to_path_buf()];
        let err = load_first(dirs.iter()).unwrap_err();
        assert!(matches!(err, Error::Message(_)));
        assert!(err.to_string().starts_with(&path.display().to_string()));
    }

    #[test]
    fn no_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = [dir.path().to_path_buf()];
        let cfg = load_first(dirs.iter()).unwrap();
        assert_eq!(cfg.logging.level, PorticoConfig::default().logging.level);
    }
}
