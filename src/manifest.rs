use crate::{
    config::ComposerConfig,
    errors::{FileFormat, FileOperation, IoError, ParseError},
};
use miette::Diagnostic;
use serde_json::{Map, Value};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    #[error("I/O error within manifest domain")]
    #[diagnostic(code(packager::manifest::io))]
    Io(#[from] IoError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error("manifest '{path}' is not a JSON object")]
    #[diagnostic(
        code(packager::manifest::not_an_object),
        help("The skeleton's composer.json must contain a top level object")
    )]
    NotAnObject { path: PathBuf },
}

/// A JSON manifest loaded for field level edits. Key order is preserved on save.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    document: Map<String, Value>,
}
impl Manifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path)
            .map_err(|error| IoError::new(FileOperation::Read, path.to_path_buf(), error))?;

        let value: Value = serde_json::from_str(&content)
            .map_err(|error| ParseError::new(FileFormat::Json, path.to_path_buf(), error))?;

        match value {
            Value::Object(document) => Ok(Self {
                path: path.to_path_buf(),
                document,
            }),
            _ => Err(ManifestError::NotAnObject {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.document.insert(key.to_string(), value.into());
    }

    /// Sets `parent.key`, creating `parent` (or replacing a non-object `parent`) as needed.
    pub fn set_nested(&mut self, parent: &str, key: &str, value: impl Into<Value>) {
        let entry = self
            .document
            .entry(parent.to_string())
            .or_insert_with(|| Value::Object(Map::new()));

        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }

        if let Value::Object(map) = entry {
            map.insert(key.to_string(), value.into());
        }
    }

    /// Serializes with four-space indentation. Slashes are never escaped by serde_json.
    pub fn save(&self) -> Result<(), ManifestError> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);

        serde::Serialize::serialize(&self.document, &mut serializer)
            .map_err(|error| ParseError::new(FileFormat::Json, self.path.clone(), error))?;

        fs::write(&self.path, buffer)
            .map_err(|error| IoError::new(FileOperation::Write, self.path.clone(), error))?;

        Ok(())
    }
}

/// Rewrites the package metadata of the generated `composer.json`.
pub fn update_composer_json(
    path: &Path,
    namespace: &str,
    composer: &ComposerConfig,
) -> Result<(), ManifestError> {
    let mut manifest = Manifest::load(path)?;

    let authors = serde_json::to_value(&composer.authors)
        .map_err(|error| ParseError::new(FileFormat::Json, path.to_path_buf(), error))?;

    let to_object = |entries: &indexmap::IndexMap<String, String>| {
        entries
            .iter()
            .map(|(package, version)| (package.clone(), Value::String(version.clone())))
            .collect::<Map<String, Value>>()
    };

    manifest.set("description", composer.description.as_str());
    manifest.set("license", composer.license.as_str());
    manifest.set("authors", authors);
    manifest.set("require-dev", to_object(&composer.require_dev));
    manifest.set("require", to_object(&composer.require));
    manifest.set("homepage", composer.homepage.as_str());

    let mut autoload_dev = Map::new();
    autoload_dev.insert(format!("{namespace}\\Tests\\"), Value::from("tests"));
    manifest.set_nested("autoload-dev", "psr-4", autoload_dev);

    manifest.save()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKELETON_COMPOSER: &str = r#"{
    "name": "acme/blog",
    "description": ":package_description",
    "keywords": ["acme", "blog"],
    "homepage": "https://github.com/acme/blog",
    "license": "MIT",
    "autoload": {
        "psr-4": {
            "Acme\\Blog\\": "src"
        }
    },
    "autoload-dev": {
        "psr-4": {
            "League\\Skeleton\\Test\\": "tests"
        },
        "files": ["tests/helpers.php"]
    }
}"#;

    #[test]
    fn test_update_composer_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("composer.json");
        fs::write(&path, SKELETON_COMPOSER).unwrap();

        update_composer_json(&path, "Acme\\Blog", &ComposerConfig::default()).unwrap();

        let saved = fs::read_to_string(&path).unwrap();
        let value: Value = serde_json::from_str(&saved).unwrap();

        assert_eq!(value["name"], "acme/blog");
        assert_eq!(value["description"], "Package description");
        assert_eq!(value["license"], "Proprietary");
        assert_eq!(value["homepage"], "");
        assert_eq!(value["authors"][0]["name"], "Reww Techteam");
        assert_eq!(value["require"]["php"], "~5.6|~7.0");
        assert_eq!(value["require-dev"]["doctrine/dbal"], "^2.5");
        assert_eq!(
            value["autoload-dev"]["psr-4"],
            serde_json::json!({ "Acme\\Blog\\Tests\\": "tests" })
        );
        assert_eq!(value["autoload-dev"]["files"][0], "tests/helpers.php");

        // unescaped slashes, original key order, four space indentation
        assert!(saved.contains("\"doctrine/dbal\": \"^2.5\""));
        assert!(saved.find("\"name\"").unwrap() < saved.find("\"autoload\"").unwrap());
        assert!(saved.starts_with("{\n    \"name\""));
    }

    #[test]
    fn test_set_nested_replaces_non_object_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("composer.json");
        fs::write(&path, r#"{"autoload-dev": []}"#).unwrap();

        let mut manifest = Manifest::load(&path).unwrap();
        manifest.set_nested("autoload-dev", "psr-4", "tests");

        assert_eq!(
            manifest.get("autoload-dev"),
            Some(&serde_json::json!({ "psr-4": "tests" }))
        );
    }

    #[test]
    fn test_load_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("composer.json");
        fs::write(&path, "[1, 2]").unwrap();

        assert!(matches!(
            Manifest::load(&path),
            Err(ManifestError::NotAnObject { .. })
        ));
    }

    #[test]
    fn test_load_reports_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("composer.json");
        fs::write(&path, "{ nope").unwrap();

        assert!(matches!(Manifest::load(&path), Err(ManifestError::Parse(_))));
    }
}
