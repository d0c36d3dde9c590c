use crate::{
    config::Config,
    errors::{FileOperation, IoError},
    folders::{self, FolderError, FolderSpec},
    fsops,
    manifest::{self, ManifestError},
    names::PackageNames,
    source::{Source, SourceError},
    template::{self, TemplateError, Templates},
    transactions::{Active, RollbackOperation, Transaction},
    vfs::{VirtualEntry, VirtualFS},
};
use colored::{ColoredString, Colorize};
use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

const SOURCE_DIR: &str = "src";
const SKELETON_CLASS: &str = "src/SkeletonClass.php";
const COMPOSER_JSON: &str = "composer.json";

#[derive(Debug, Error, Diagnostic)]
pub enum GeneratorError {
    #[error("I/O error within generator domain")]
    #[diagnostic(code(packager::generator::io))]
    Io(#[from] IoError),

    #[error("Package already exists: '{path}'")]
    #[diagnostic(
        code(packager::generator::package_exists),
        help("Pick another name or run `packager remove` first")
    )]
    PackageExists { path: PathBuf },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Folders(#[from] FolderError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Manifest(#[from] ManifestError),
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub package_dir: PathBuf,
    /// Files written from bundled templates, in write order.
    pub written: Vec<PathBuf>,
    /// Directories that only received the placeholder marker.
    pub marked: Vec<PathBuf>,
}

/// Generates one package skeleton at `<workspace>/<vendor>/<name>`.
pub struct Generator<'a> {
    config: &'a Config,
    names: PackageNames,
    templates: Templates,
}
impl<'a> Generator<'a> {
    pub fn new(config: &'a Config, names: PackageNames) -> Result<Self, GeneratorError> {
        Ok(Self {
            config,
            names,
            templates: Templates::bundled()?,
        })
    }

    pub fn package_dir(&self) -> PathBuf {
        self.config
            .workspace
            .join(&self.names.vendor)
            .join(&self.names.name)
    }

    fn folders(&self) -> &FolderSpec {
        &self.config.folders
    }

    /// Fails before anything is touched when the package directory is already there.
    pub fn check_existing_package(&self) -> Result<(), GeneratorError> {
        let path = self.package_dir();

        if path.exists() {
            return Err(GeneratorError::PackageExists { path });
        }

        Ok(())
    }

    /// Stages the folder layout and every bundled file, relative to the package directory.
    pub fn stage(&mut self) -> Result<VirtualFS, GeneratorError> {
        let mut vfs = VirtualFS::new();

        for path in self.folders().paths(Path::new(SOURCE_DIR))? {
            vfs.entries.push(VirtualEntry::directory(path));
        }

        let files = self.templates.stage(&self.names.tokens())?;
        vfs.entries.extend(files.entries);

        Ok(vfs)
    }

    /// Runs the whole generation. Everything created is registered on `trx`, so returning an
    /// error before the caller commits leaves the workspace as it was.
    pub fn generate(
        &self,
        source: &Source,
        staged: &VirtualFS,
        trx: &mut Transaction<Active>,
    ) -> Result<GenerationReport, GeneratorError> {
        self.check_existing_package()?;

        let package_dir = self.package_dir();

        log::info!("generating {} into {}", self.names.composer_name(), package_dir.display());

        self.fetch_skeleton(source, &package_dir, trx)?;
        self.replace_skeleton_tokens(&package_dir)?;

        let src = package_dir.join(SOURCE_DIR);
        folders::create_structure(&src, self.folders())?;

        let written = write_staged_files(&package_dir, staged)?;

        let skeleton_class = package_dir.join(SKELETON_CLASS);
        if skeleton_class.is_file() {
            fsops::remove_file_quietly(&skeleton_class);
            announce(Action::Remove, &skeleton_class);
        }

        // every file is in place, anything still empty gets a marker
        let marked = folders::fill_empty_directories(&src, self.folders(), &self.config.marker)?;
        for directory in &marked {
            announce(Action::Keep, &directory.join(&self.config.marker));
        }

        self.update_manifest(&package_dir)?;
        self.remove_unnecessary_files(&package_dir);

        Ok(GenerationReport {
            package_dir,
            written,
            marked,
        })
    }

    fn fetch_skeleton(
        &self,
        source: &Source,
        package_dir: &Path,
        trx: &mut Transaction<Active>,
    ) -> Result<(), GeneratorError> {
        let vendor_dir = package_dir
            .parent()
            .unwrap_or(self.config.workspace.as_path());

        if !vendor_dir.is_dir() {
            std::fs::create_dir_all(vendor_dir).map_err(|error| {
                IoError::new(FileOperation::Mkdir, vendor_dir.to_path_buf(), error)
            })?;
            trx.add_operation(RollbackOperation::RemoveDir(vendor_dir.to_path_buf()));
        }

        let staging = tempfile::Builder::new()
            .prefix(".packager-")
            .tempdir_in(vendor_dir)
            .map_err(|error| IoError::new(FileOperation::Mkdir, vendor_dir.to_path_buf(), error))?;

        log::info!("fetching skeleton from {}", source);

        let root = source.fetch_into(staging.path(), self.config.verify_tls)?;

        fsops::rename(&root, package_dir)?;
        trx.add_operation(RollbackOperation::RemoveDir(package_dir.to_path_buf()));

        Ok(())
    }

    fn replace_skeleton_tokens(&self, package_dir: &Path) -> Result<(), GeneratorError> {
        let replacements = self.names.skeleton_replacements();

        for file in &self.config.skeleton_files {
            let path = package_dir.join(file);

            if !path.is_file() {
                log::debug!("...skeleton has no {}, skipping", file);
                continue;
            }

            template::replace_and_save(&path, &replacements, None)?;
        }

        Ok(())
    }

    fn update_manifest(&self, package_dir: &Path) -> Result<(), GeneratorError> {
        let path = package_dir.join(COMPOSER_JSON);

        if !path.is_file() {
            log::warn!("skeleton has no {}, writing a fresh one", COMPOSER_JSON);
            let fresh = format!("{{\n    \"name\": \"{}\"\n}}\n", self.names.composer_name());
            fsops::write_file(&path, fresh)?;
        }

        manifest::update_composer_json(&path, &self.names.namespace, &self.config.composer)?;

        announce(Action::Update, &path);

        Ok(())
    }

    fn remove_unnecessary_files(&self, package_dir: &Path) {
        for file in &self.config.unnecessary_files {
            let path = package_dir.join(file);

            if path.is_file() {
                fsops::remove_file_quietly(&path);
                announce(Action::Remove, &path);
            }
        }
    }
}

fn write_staged_files(package_dir: &Path, staged: &VirtualFS) -> Result<Vec<PathBuf>, IoError> {
    let mut written = Vec::new();

    for entry in staged.files() {
        let path = package_dir.join(&entry.destination);
        let contents = entry.content.as_deref().unwrap_or_default();

        written.push(fsops::write_file(&path, contents)?);

        announce(Action::Create, &path);
    }

    Ok(written)
}

/// What happened to a path, as printed to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    Create,
    Update,
    Keep,
    Remove,
}
impl Action {
    fn label(self) -> ColoredString {
        match self {
            Self::Create => "create".green(),
            Self::Update => "update".yellow(),
            Self::Keep => "keep".yellow(),
            Self::Remove => "remove".red(),
        }
    }
}

pub(crate) fn announce(action: Action, path: &Path) {
    println!("{} {}", action.label(), path.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SKELETON_COMPOSER: &str = r#"{
    "name": "league/:package_name",
    "description": ":package_description",
    "autoload": {
        "psr-4": {
            ":vendor\\:package_name\\": "src"
        }
    }
}"#;

    fn skeleton(dir: &Path) -> PathBuf {
        let skeleton = dir.join("skeleton");
        fs::create_dir_all(skeleton.join("src")).unwrap();
        fs::write(skeleton.join("composer.json"), SKELETON_COMPOSER).unwrap();
        fs::write(skeleton.join("README.md"), "# :package_name").unwrap();
        fs::write(skeleton.join("CONDUCT.md"), "be nice").unwrap();
        fs::write(skeleton.join("prefill.php"), "<?php").unwrap();
        fs::write(skeleton.join("src/SkeletonClass.php"), "<?php").unwrap();
        skeleton
    }

    fn config(dir: &Path) -> Config {
        Config {
            workspace: dir.join("packages"),
            ..Config::default()
        }
    }

    #[test]
    fn test_generate_builds_complete_package() {
        let dir = tempfile::tempdir().unwrap();
        let source = Source::Local(skeleton(dir.path()));
        let config = config(dir.path());
        let names = PackageNames::new("acme", "blog").unwrap();

        let mut generator = Generator::new(&config, names).unwrap();
        let staged = generator.stage().unwrap();
        let mut trx = Transaction::<Active>::new(&config.workspace);
        let report = generator.generate(&source, &staged, &mut trx).unwrap();
        trx.commit();

        let package = dir.path().join("packages/acme/blog");
        assert_eq!(report.package_dir, package);

        for file in [
            "src/Controllers/BlogController.php",
            "src/Facades/Blog.php",
            "src/config/blog.php",
            "src/Repositories/BlogRepository.php",
            "src/routes.php",
            "src/BlogServiceProvider.php",
            "src/Blog.php",
            "src/resources/views/index.blade.php",
            "tests/TestCase.php",
            "phpunit.xml",
            ".gitignore",
            ".env.testing",
            ".gitlab-ci.yml",
        ] {
            assert!(package.join(file).is_file(), "missing {file}");
        }

        assert!(!package.join("src/SkeletonClass.php").exists());
        assert!(!package.join("CONDUCT.md").exists());
        assert!(!package.join("prefill.php").exists());
        assert_eq!(fs::read_to_string(package.join("README.md")).unwrap(), "# blog");

        // populated directories never get a marker
        assert!(!package.join("src/Controllers/.gitkeep").exists());
        assert!(!package.join("src/config/.gitkeep").exists());
        assert!(!package.join("src/resources/views/.gitkeep").exists());
        for empty in [
            "src/Models",
            "src/database/migrations",
            "src/resources/assets/js",
            "src/resources/assets/sass",
            "src/resources/views/elements",
        ] {
            assert!(package.join(empty).join(".gitkeep").is_file(), "no marker in {empty}");
            assert!(report.marked.contains(&package.join(empty)));
        }

        let composer: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(package.join("composer.json")).unwrap())
                .unwrap();
        assert_eq!(composer["name"], "acme/blog");
        assert_eq!(composer["autoload"]["psr-4"]["Acme\\Blog\\"], "src");
        assert_eq!(composer["autoload-dev"]["psr-4"]["Acme\\Blog\\Tests\\"], "tests");

        // staging directory is gone
        let leftovers: Vec<_> = fs::read_dir(dir.path().join("packages/acme"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("blog")]);
    }

    #[test]
    fn test_existing_package_aborts_before_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let package = dir.path().join("packages/acme/blog");
        fs::create_dir_all(&package).unwrap();
        fs::write(package.join("keep.txt"), "mine").unwrap();

        let generator = Generator::new(&config, PackageNames::new("acme", "blog").unwrap()).unwrap();

        assert!(matches!(
            generator.check_existing_package(),
            Err(GeneratorError::PackageExists { .. })
        ));
        assert_eq!(fs::read_to_string(package.join("keep.txt")).unwrap(), "mine");
    }

    #[test]
    fn test_failed_generation_rolls_back_vendor_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        fs::create_dir_all(&config.workspace).unwrap();
        let source = Source::Local(dir.path().join("missing-skeleton"));

        let mut generator =
            Generator::new(&config, PackageNames::new("acme", "blog").unwrap()).unwrap();
        let staged = generator.stage().unwrap();

        {
            let mut trx = Transaction::<Active>::new(&config.workspace);
            let result = generator.generate(&source, &staged, &mut trx);
            assert!(matches!(result, Err(GeneratorError::Source(_))));
        }

        assert!(!dir.path().join("packages/acme").exists());
        assert!(dir.path().join("packages").is_dir());
    }

    #[test]
    fn test_action_labels() {
        colored::control::set_override(false);

        let labels: Vec<String> = [Action::Create, Action::Update, Action::Keep, Action::Remove]
            .into_iter()
            .map(|action| action.label().to_string())
            .collect();

        assert_eq!(labels, ["create", "update", "keep", "remove"]);
    }

    #[test]
    fn test_stage_rejects_folder_outside_package() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            folders: FolderSpec::new([folders::FolderNode::branch(
                "database",
                [folders::FolderNode::leaf("../../escaped")],
            )]),
            ..config(dir.path())
        };
        let mut generator =
            Generator::new(&config, PackageNames::new("acme", "blog").unwrap()).unwrap();

        assert!(matches!(
            generator.stage(),
            Err(GeneratorError::Folders(FolderError::InvalidName { .. }))
        ));
    }

    #[test]
    fn test_stage_lists_folders_before_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mut generator =
            Generator::new(&config, PackageNames::new("acme", "blog").unwrap()).unwrap();

        let staged = generator.stage().unwrap();

        assert_eq!(staged.entries[0].destination, PathBuf::from("src/Controllers"));
        assert!(!staged.entries[0].is_file);
        assert!(staged
            .files()
            .any(|entry| entry.destination == Path::new("src/Facades/Blog.php")));
    }
}
