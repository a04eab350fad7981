use std::{
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::debug;
use serde::Deserialize;
use thiserror::Error;

use crate::{cert_sign_request::dn::SubjectKind, key::DEFAULT_KEY_BITS};

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("can't find a config file, looked at {}", display_paths(.0))]
    NotFound(Vec<PathBuf>),
    #[error("can't read {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("can't parse file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| format!("{path:?}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Defaults offered at each prompt, plus the key settings.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    pub country: String,
    pub state: String,
    pub city: String,
    pub organization: String,
    pub common_name: String,

    #[serde(default = "default_key_bits")]
    pub key_bits: usize,
    /// Names added to every request next to the common name.
    #[serde(default)]
    pub alt_names: Vec<String>,
}

fn default_key_bits() -> usize {
    DEFAULT_KEY_BITS
}

impl Config {
    pub fn default_for(&self, kind: SubjectKind) -> &str {
        match kind {
            SubjectKind::Country => &self.country,
            SubjectKind::State => &self.state,
            SubjectKind::City => &self.city,
            SubjectKind::Organization => &self.organization,
            SubjectKind::CommonName => &self.common_name,
        }
    }
}

/// Places searched when no path is given on the command line, in order.
pub fn search_paths(app: Option<&ProjectDirs>, cwd: &Path) -> Vec<PathBuf> {
    let mut paths = vec![cwd.join(CONFIG_FILE_NAME)];
    if let Some(app) = app {
        paths.push(app.config_dir().join(CONFIG_FILE_NAME));
    }
    paths
}

pub fn read_config(
    user_config_path: Option<&Path>,
    candidates: &[PathBuf],
) -> Result<Config, ConfigError> {
    if let Some(user_config_path) = user_config_path {
        if user_config_path.exists() {
            load(user_config_path)
        } else {
            Err(ConfigError::NotFound(vec![user_config_path.to_owned()]))
        }
    } else {
        for config_path in candidates {
            if config_path.exists() {
                return load(config_path);
            }
            debug!("no config at {config_path:?}");
        }
        Err(ConfigError::NotFound(candidates.to_vec()))
    }
}

pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let mut str = String::new();
    File::open(path)
        .and_then(|mut file| file.read_to_string(&mut str))
        .map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
    let config = toml::from_str::<Config>(&str).map_err(|source| {
        ConfigError::Parse {
            path: path.to_owned(),
            source,
        }
    })?;
    debug!("loaded config from {path:?}");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const FULL: &str = r#"
country = "US"
state = "Oregon"
city = "Portland"
organization = "Example Corp"
common_name = "www.example.com"
"#;

    fn write(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILE_NAME);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn reads_all_five_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), FULL);

        let config = read_config(Some(&path), &[]).unwrap();

        assert_eq!(config.default_for(SubjectKind::Country), "US");
        assert_eq!(config.default_for(SubjectKind::State), "Oregon");
        assert_eq!(config.default_for(SubjectKind::City), "Portland");
        assert_eq!(
            config.default_for(SubjectKind::Organization),
            "Example Corp"
        );
        assert_eq!(
            config.default_for(SubjectKind::CommonName),
            "www.example.com"
        );
        assert_eq!(config.key_bits, DEFAULT_KEY_BITS);
        assert!(config.alt_names.is_empty());
    }

    #[test]
    fn optional_keys_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let contents =
            format!("{FULL}key_bits = 2048\nalt_names = [\"10.0.0.1\"]\n");
        let path = write(dir.path(), &contents);

        let config = load(&path).unwrap();

        assert_eq!(config.key_bits, 2048);
        assert_eq!(config.alt_names, vec!["10.0.0.1".to_string()]);
    }

    #[test]
    fn content_is_not_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), &FULL.replace("\"US\"", "\"USA\""));

        assert_eq!(load(&path).unwrap().country, "USA");
    }

    #[test]
    fn missing_key_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), &FULL.replace("state = \"Oregon\"\n", ""));

        let err = load(&path).unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
        let source = std::error::Error::source(&err).unwrap().to_string();
        assert!(source.contains("state"), "{source}");
    }

    #[test]
    fn missing_explicit_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");

        let err = read_config(Some(&path), &[]).unwrap_err();

        assert!(matches!(err, ConfigError::NotFound(paths) if paths == vec![path.clone()]));
    }

    #[test]
    fn first_existing_candidate_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write(second.path(), FULL);
        let candidates = search_paths(None, first.path())
            .into_iter()
            .chain(search_paths(None, second.path()))
            .collect::<Vec<_>>();

        let config = read_config(None, &candidates).unwrap();

        assert_eq!(config.common_name, "www.example.com");
    }

    #[test]
    fn no_candidate_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let candidates = search_paths(None, dir.path());

        let err = read_config(None, &candidates).unwrap_err();

        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }
}
