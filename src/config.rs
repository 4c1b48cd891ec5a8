use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::lang::Lang;

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = ".textref.toml";

/// Project configuration loaded from `.textref.toml`.
/// Include/exclude patterns are path prefixes applied to record files
/// relative to the library directory.
#[derive(Debug, Clone)]
pub struct Config {
    /// Language assumed for citations that carry no Hebrew letters.
    pub default_language: Lang,
    /// Record path prefixes to skip.
    exclude: Vec<String>,
    /// Record path prefixes to load; empty means everything.
    include: Vec<String>,
    /// Directory holding index, term, and version records.
    pub library: PathBuf,
    /// Where unresolved citations are written for review.
    pub review_log: PathBuf,
}

/// Raw TOML structure for `.textref.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TextrefTomlConfig {
    /// See `Config::default_language`.
    #[serde(default)]
    default_language: Option<Lang>,
    /// See `Config::exclude`.
    #[serde(default)]
    exclude: Vec<String>,
    /// See `Config::include`.
    #[serde(default)]
    include: Vec<String>,
    /// See `Config::library`.
    #[serde(default)]
    library: Option<PathBuf>,
    /// See `Config::review_log`.
    #[serde(default)]
    review_log: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        return Self {
            default_language: Lang::En,
            exclude: Vec::new(),
            include: Vec::new(),
            library: PathBuf::from("library"),
            review_log: PathBuf::from(".textref-review.toml"),
        };
    }
}

impl Config {
    /// Load config from `.textref.toml` in the given root directory.
    /// Returns defaults if the file doesn't exist; an existing file that
    /// fails to parse is an error, never a silent fallback.
    ///
    /// Relative paths in the file are taken relative to `root`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::rooted_defaults(root)),
            Err(e) => return Err(Error::Io(e)),
        };
        return Self::parse(root, &content);
    }

    /// Load an explicitly named config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigNotFound` if the file does not exist, otherwise
    /// the same errors as `load`.
    pub fn load_file(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ConfigNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
        };
        let root = path.parent().unwrap_or_else(|| return Path::new("."));
        return Self::parse(root, &content);
    }

    /// Parse TOML content, resolving paths against `root`.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed.
    fn parse(root: &Path, content: &str) -> Result<Self, Error> {
        let raw: TextrefTomlConfig = toml::from_str(content)?;
        let defaults = Self::default();
        return Ok(Self {
            default_language: raw.default_language.unwrap_or(defaults.default_language),
            exclude: raw.exclude,
            include: raw.include,
            library: root.join(raw.library.unwrap_or(defaults.library)),
            review_log: root.join(raw.review_log.unwrap_or(defaults.review_log)),
        });
    }

    /// Defaults with paths under `root`.
    fn rooted_defaults(root: &Path) -> Self {
        let defaults = Self::default();
        return Self {
            library: root.join(&defaults.library),
            review_log: root.join(&defaults.review_log),
            ..defaults
        };
    }

    /// Check whether a record file should be loaded.
    ///
    /// A path is included if no include patterns are set (load everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_load(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }

    /// Config that loads from `library` with everything else defaulted.
    pub fn with_library(library: PathBuf) -> Self {
        return Self {
            library,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.library, dir.path().join("library"));
        assert_eq!(config.default_language, Lang::En);
        assert!(config.should_load("anything.json"), "no filters loads everything");
    }

    #[test]
    fn reads_filters_and_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "library = \"data\"\ndefault_language = \"he\"\ninclude = [\"tanakh/\"]\nexclude = [\"tanakh/drafts/\"]\n",
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.library, dir.path().join("data"));
        assert_eq!(config.default_language, Lang::He);
        assert!(config.should_load("tanakh/genesis.json"), "included prefix");
        assert!(!config.should_load("tanakh/drafts/x.json"), "excluded prefix wins");
        assert!(!config.should_load("talmud/shabbat.json"), "outside include");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "libary = 3").unwrap();
        assert!(Config::load(dir.path()).is_err(), "unknown keys are rejected");
    }

    #[test]
    fn explicit_missing_file_is_reported() {
        let err = Config::load_file(Path::new("/nonexistent/.textref.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }), "{err}");
    }
}
