use crate::{
    config::{Config, ConfigError},
    errors::IoError,
    folders::FolderError,
    fsops,
    generator::{announce, Action, GenerationReport, Generator, GeneratorError},
    names::{InvalidName, PackageNames},
    preview::{preview_as_tree, render_tree},
    prompt::{self, PromptError},
    source::Source,
    transactions::{Active, Transaction},
    vfs::{VirtualEntry, VirtualFS},
};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum PackagerError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Name(#[from] InvalidName),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Folders(#[from] FolderError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Generator(#[from] GeneratorError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Io(#[from] IoError),

    #[error("Package not found: '{path}'")]
    #[diagnostic(
        code(packager::package_not_found),
        help("Check the vendor and package names, and the workspace directory")
    )]
    PackageNotFound { path: PathBuf },
}

/// Arguments of a `new` run. Anything left `None` falls back to the config file, or is asked for.
#[derive(Debug, Default, Clone)]
pub struct NewPackage<'a> {
    pub vendor: Option<&'a str>,
    pub name: Option<&'a str>,
    pub source: Option<&'a str>,
    pub workspace: Option<&'a Path>,
    pub config: Option<&'a Path>,
    pub assume_yes: bool,
}

fn load_config(explicit: Option<&Path>, workspace: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = Config::load(explicit)?;

    if let Some(workspace) = workspace {
        config.workspace = workspace.to_path_buf();
    }

    Ok(config)
}

/// Generates a new package skeleton.
///
/// Returns `None` when the user declines the preview. Nothing is written before that.
///
/// # Errors
///
/// Returns a [`PackagerError`] if:
///
/// - The configuration file cannot be read or parsed.
/// - The vendor or package name is invalid, or the package already exists.
/// - User prompts fail or the user cancels the input.
/// - The skeleton cannot be fetched, extracted or copied.
/// - A template fails to render or a file cannot be written.
///
/// Any failure after the first write rolls the created directories back.
pub fn new_package(args: NewPackage<'_>) -> Result<Option<GenerationReport>, PackagerError> {
    let config = load_config(args.config, args.workspace)?;

    let vendor = prompt::get_or_ask(args.vendor, "Vendor", "The vendor namespace, e.g. acme")?;
    let name = prompt::get_or_ask(args.name, "Package name", "The package name, e.g. blog")?;
    let names = PackageNames::new(&vendor, &name)?;

    let source = Source::parse(args.source.unwrap_or(config.skeleton.as_str()));

    let mut generator = Generator::new(&config, names)?;
    generator.check_existing_package()?;

    let staged = generator.stage()?;
    let package_dir = generator.package_dir();

    preview_as_tree(&staged, &package_dir, !args.assume_yes);

    if !args.assume_yes && !prompt::apply_changes()? {
        log::info!("generation declined, nothing was written");
        return Ok(None);
    }

    let mut trx = Transaction::<Active>::new(&config.workspace);

    let report = generator.generate(&source, &staged, &mut trx)?;

    trx.commit();

    log::info!("package ready at {}", report.package_dir.display());

    Ok(Some(report))
}

/// Removes `<workspace>/<vendor>/<name>`, and the vendor directory when it ends up empty.
///
/// Returns `false` when removal was refused or declined.
///
/// # Errors
///
/// Returns a [`PackagerError`] if the names are invalid, the package does not exist, the prompt
/// fails, or a file cannot be removed.
pub fn remove_package(
    vendor: &str,
    name: &str,
    workspace: Option<&Path>,
    config: Option<&Path>,
    assume_yes: bool,
) -> Result<bool, PackagerError> {
    let config = load_config(config, workspace)?;
    let names = PackageNames::new(vendor, name)?;

    let vendor_dir = config.workspace.join(&names.vendor);
    let package_dir = vendor_dir.join(&names.name);

    if !package_dir.is_dir() {
        return Err(PackagerError::PackageNotFound { path: package_dir });
    }

    if !assume_yes && !prompt::confirm(&format!("Remove {}?", package_dir.display()))? {
        return Ok(false);
    }

    if !fsops::remove_dir(&package_dir, &config.workspace)? {
        return Ok(false);
    }

    announce(Action::Remove, &package_dir);

    if fsops::is_empty_dir(&vendor_dir)? {
        fsops::remove_dir(&vendor_dir, &config.workspace)?;
    }

    Ok(true)
}

/// Renders the configured folder layout, rooted at `src`.
///
/// # Errors
///
/// Returns a [`PackagerError`] if the configuration file cannot be read or parsed.
pub fn folder_tree(config: Option<&Path>) -> Result<String, PackagerError> {
    let config = load_config(config, None)?;

    let mut vfs = VirtualFS::new();
    for path in config.folders.paths(Path::new(""))? {
        vfs.entries.push(VirtualEntry::directory(path));
    }

    Ok(render_tree(&vfs, Path::new("src")))
}
