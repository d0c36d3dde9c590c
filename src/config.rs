use crate::{
    errors::{FileFormat, FileOperation, IoError, ParseError},
    folders::{self, FolderError, FolderSpec, DEFAULT_MARKER},
};
use indexmap::IndexMap;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "packager.toml";
pub const DEFAULT_SKELETON: &str = "https://github.com/thephpleague/skeleton/archive/master.zip";
pub const DEFAULT_WORKSPACE: &str = "packages";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("I/O error within config domain")]
    #[diagnostic(code(packager::config::io))]
    Io(#[from] IoError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Folders(#[from] FolderError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
    pub homepage: String,
    pub role: String,
}

/// Values written into the generated package's `composer.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    pub description: String,
    pub license: String,
    pub homepage: String,
    pub authors: Vec<Author>,
    pub require: IndexMap<String, String>,
    pub require_dev: IndexMap<String, String>,
}
impl Default for ComposerConfig {
    fn default() -> Self {
        let require_dev = [
            ("laravel/laravel", "5.3.*"),
            ("phpunit/phpunit", "~5"),
            ("phpunit/php-code-coverage", "^4"),
            ("squizlabs/php_codesniffer", "~2.3"),
            ("phpmd/phpmd", "^2.4"),
            ("phpunit/phpcov", "*"),
            ("mockery/mockery", "*"),
            ("fzaninotto/faker", "^1.6"),
            ("symfony/css-selector", "3.1.*"),
            ("symfony/dom-crawler", "3.1.*"),
            ("barryvdh/laravel-ide-helper", "^2.2"),
            ("doctrine/dbal", "^2.5"),
        ];

        Self {
            description: "Package description".to_string(),
            license: "Proprietary".to_string(),
            homepage: String::new(),
            authors: vec![Author {
                name: "Reww Techteam".to_string(),
                email: "techadmin@reww.com".to_string(),
                homepage: "http://reww.com".to_string(),
                role: "Developer".to_string(),
            }],
            require: IndexMap::from([("php".to_string(), "~5.6|~7.0".to_string())]),
            require_dev: require_dev
                .into_iter()
                .map(|(package, version)| (package.to_string(), version.to_string()))
                .collect(),
        }
    }
}

/// Settings for a generation run, read from `packager.toml`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding `<vendor>/<name>` packages. Never removed recursively.
    pub workspace: PathBuf,
    /// Skeleton source: zip URL, git reference, local archive or directory.
    pub skeleton: String,
    pub verify_tls: bool,
    pub marker: String,
    pub folders: FolderSpec,
    /// Skeleton files whose `:vendor`/`:package_name` placeholders get replaced.
    pub skeleton_files: Vec<String>,
    /// Skeleton files deleted from the generated package.
    pub unnecessary_files: Vec<String>,
    pub composer: ComposerConfig,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from(DEFAULT_WORKSPACE),
            skeleton: DEFAULT_SKELETON.to_string(),
            verify_tls: true,
            marker: DEFAULT_MARKER.to_string(),
            folders: FolderSpec::default(),
            skeleton_files: ["composer.json", "README.md", "CHANGELOG.md"]
                .map(String::from)
                .to_vec(),
            unnecessary_files: [
                "CONDUCT.md",
                "CONTRIBUTING.md",
                "ISSUE_TEMPLATE.md",
                "LICENSE.md",
                "prefill.php",
                "PULL_REQUEST_TEMPLATE.md",
            ]
            .map(String::from)
            .to_vec(),
            composer: ComposerConfig::default(),
        }
    }
}
impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path)
            .map_err(|error| IoError::new(FileOperation::Read, path.to_path_buf(), error))?;

        let config: Config = toml::from_str(&content)
            .map_err(|error| ParseError::new(FileFormat::Toml, path.to_path_buf(), error))?;

        folders::check_marker(&config.marker)?;

        Ok(config)
    }

    /// Loads `explicit` if given, else `packager.toml` in the working directory if present,
    /// else the defaults. `CURL_VERIFY` overrides `verify_tls` when set.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Config::from_file(path)?,
            None if Path::new(CONFIG_FILE_NAME).is_file() => Config::from_file(CONFIG_FILE_NAME)?,
            None => Config::default(),
        };

        if let Ok(value) = std::env::var("CURL_VERIFY") {
            config.verify_tls = parse_bool_env(&value).unwrap_or(config.verify_tls);
        }

        log::debug!("...loaded config: {:?}", config);

        Ok(config)
    }
}

fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::folders::FolderNode;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.workspace, PathBuf::from("packages"));
        assert_eq!(config.folders, FolderSpec::default());
    }

    #[test]
    fn test_partial_overrides() {
        let config: Config = toml::from_str(
            r#"
            workspace = "vendor-packages"
            marker = ".keep"
            folders = ["Http", { resources = ["lang"] }]

            [composer]
            license = "MIT"

            [composer.require]
            php = "^8.2"
            "#,
        )
        .unwrap();

        assert_eq!(config.workspace, PathBuf::from("vendor-packages"));
        assert_eq!(config.marker, ".keep");
        assert_eq!(
            config.folders,
            FolderSpec::new([
                FolderNode::leaf("Http"),
                FolderNode::branch("resources", [FolderNode::leaf("lang")]),
            ])
        );
        assert_eq!(config.composer.license, "MIT");
        assert_eq!(config.composer.require["php"], "^8.2");
        assert_eq!(config.composer.description, "Package description");
        assert_eq!(config.skeleton, DEFAULT_SKELETON);
    }

    #[test]
    fn test_from_file_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "workspace = [").unwrap();

        let error = Config::from_file(&path).unwrap_err();

        assert!(matches!(error, ConfigError::Parse(ParseError { ref path, .. }) if path.ends_with(CONFIG_FILE_NAME)));
    }

    #[test]
    fn test_from_file_missing() {
        let error = Config::from_file("/definitely/not/here/packager.toml").unwrap_err();

        assert!(matches!(error, ConfigError::Io(_)));
    }

    #[test]
    fn test_from_file_rejects_bad_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        for marker in [r#"marker = "../x""#, r#"marker = """#] {
            fs::write(&path, marker).unwrap();

            let error = Config::from_file(&path).unwrap_err();

            assert!(
                matches!(error, ConfigError::Folders(FolderError::InvalidMarker { .. })),
                "{marker}"
            );
        }
    }

    #[test]
    fn test_from_file_rejects_folder_escaping_package() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, r#"folders = [{ database = ["../../escaped"] }]"#).unwrap();

        let error = Config::from_file(&path).unwrap_err();

        let error = match error {
            ConfigError::Parse(error) => error,
            other => panic!("expected a parse error, got {other:?}"),
        };
        assert!(
            error.source.to_string().contains("invalid folder name"),
            "{}",
            error.source
        );
    }

    // the only test touching CURL_VERIFY, so it cannot race with another one
    #[test]
    fn test_load_honours_curl_verify() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "verify_tls = true").unwrap();

        std::env::set_var("CURL_VERIFY", "false");
        let disabled = Config::load(Some(&path));
        std::env::set_var("CURL_VERIFY", "maybe");
        let unparsable = Config::load(Some(&path));
        std::env::remove_var("CURL_VERIFY");
        let unset = Config::load(Some(&path));

        assert!(!disabled.unwrap().verify_tls);
        assert!(unparsable.unwrap().verify_tls);
        assert!(unset.unwrap().verify_tls);
    }

    #[test]
    fn test_parse_bool_env() {
        assert_eq!(parse_bool_env("false"), Some(false));
        assert_eq!(parse_bool_env(" TRUE "), Some(true));
        assert_eq!(parse_bool_env("0"), Some(false));
        assert_eq!(parse_bool_env("maybe"), None);
    }
}
