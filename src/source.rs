use crate::{
    errors::{FileOperation, IoError},
    fsops,
};
use git2::Repository;
use miette::Diagnostic;
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum SourceError {
    #[error("I/O error within source domain")]
    #[diagnostic(code(packager::source::io))]
    Io(#[from] IoError),

    #[error("unable to clone repo at: '{url}': {source}")]
    #[diagnostic(
        code(packager::source::git_clone),
        help("Make sure that username and project name are correct")
    )]
    GitClone {
        url: String,
        path: PathBuf,
        source: git2::Error,
    },

    #[error("invalid git prefix provided: {url}")]
    #[diagnostic(
        code(packager::source::invalid_git_prefix),
        help("Valid git prefix are: ['gh', 'gl', 'git@', 'git+http']")
    )]
    InvalidGitPrefix { url: String },

    #[error("unable to download skeleton from '{url}'")]
    #[diagnostic(
        code(packager::source::download),
        help("Check the URL and your network connection; set CURL_VERIFY=false to skip TLS verification")
    )]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unable to extract archive '{path}'")]
    #[diagnostic(
        code(packager::source::extract),
        help("Make sure the skeleton is a valid zip archive")
    )]
    Extract {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("skeleton source '{path}' is empty")]
    #[diagnostic(code(packager::source::empty))]
    Empty { path: PathBuf },
}

/// Where the package skeleton comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A git repository, cloned without history.
    Git(String),
    /// A zip archive served over http(s).
    Remote(String),
    /// A zip archive on disk.
    Archive(PathBuf),
    /// A directory on disk.
    Local(PathBuf),
}
impl Source {
    fn is_git(source: &str) -> bool {
        lazy_static::lazy_static! {
            static ref GIT_URL_REGEX: regex::Regex = regex::Regex::new(
                r"(?x)        # Enable extended mode
                ^(?:
                    # 1) gh:account/repo
                    gh:[^/]+/[^/]+
                    |
                    # 2) gl:account/repo
                    gl:[^/]+/[^/]+
                    |
                    # 3) git@host:account/repo.git
                    git@[A-Za-z0-9._-]+:[^/]+/[^/]+\.git
                    |
                    # 4) git+http(s)://...
                    git\+https?://.*
                )$"
            ).expect("a valid regex pattern");
        }

        GIT_URL_REGEX.is_match(source)
    }

    fn expand_git_short_url(url: &str) -> Result<String, SourceError> {
        if let Some(stripped) = url.strip_prefix("gh:") {
            Ok(format!("https://github.com/{}.git", stripped))
        } else if let Some(stripped) = url.strip_prefix("gl:") {
            Ok(format!("https://gitlab.com/{}.git", stripped))
        } else if let Some(stripped) = url.strip_prefix("git+") {
            Ok(stripped.to_string())
        } else if url.starts_with("git@") {
            Ok(url.to_string())
        } else {
            Err(SourceError::InvalidGitPrefix {
                url: url.to_string(),
            })
        }
    }

    pub fn parse(source: &str) -> Self {
        if Source::is_git(source) {
            Self::Git(source.to_string())
        } else if source.starts_with("http://") || source.starts_with("https://") {
            Self::Remote(source.to_string())
        } else if source.to_ascii_lowercase().ends_with(".zip") {
            Self::Archive(PathBuf::from(source))
        } else {
            Self::Local(PathBuf::from(source))
        }
    }

    /// Realises the skeleton inside `staging` and returns its root directory.
    ///
    /// Remote archives are downloaded to a temporary `package*.zip` next to `staging`, which is
    /// removed again once extracted. An archive whose only entry is a directory is unwrapped to
    /// that directory.
    pub fn fetch_into(&self, staging: &Path, verify_tls: bool) -> Result<PathBuf, SourceError> {
        match self {
            Self::Git(url) => {
                let expanded_url = Source::expand_git_short_url(url)?;

                log::info!("cloning {}", expanded_url);

                Repository::clone(&expanded_url, staging).map_err(|err| {
                    SourceError::GitClone {
                        url: expanded_url.clone(),
                        path: staging.to_path_buf(),
                        source: err,
                    }
                })?;

                fsops::remove_dir(&staging.join(".git"), staging)?;

                Ok(staging.to_path_buf())
            }
            Self::Remote(url) => {
                let parent = staging.parent().unwrap_or(staging);
                let zip_file = make_filename(parent)?;

                download(url, zip_file.path(), verify_tls)?;
                let extracted = extract(zip_file.path(), staging);
                clean_up(zip_file);
                extracted?;

                unwrap_single_directory(staging)
            }
            Self::Archive(path) => {
                extract(path, staging)?;

                unwrap_single_directory(staging)
            }
            Self::Local(path) => {
                if !path.is_dir() {
                    return Err(SourceError::Io(IoError::new(
                        FileOperation::ReadDir,
                        path.clone(),
                        std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
                    )));
                }

                fsops::copy_dir(path, staging)?;

                Ok(staging.to_path_buf())
            }
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Git(url) | Self::Remote(url) => write!(f, "{}", url),
            Self::Archive(path) | Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Creates an empty, randomly named `package*.zip` file inside `directory`.
pub fn make_filename(directory: &Path) -> Result<NamedTempFile, IoError> {
    tempfile::Builder::new()
        .prefix("package")
        .suffix(".zip")
        .tempfile_in(directory)
        .map_err(|error| IoError::new(FileOperation::Write, directory.to_path_buf(), error))
}

/// Downloads `url` into `zip_file`. Non-success statuses are errors.
pub fn download(url: &str, zip_file: &Path, verify_tls: bool) -> Result<u64, SourceError> {
    log::info!("downloading {}", url);

    let to_error = |source| SourceError::Download {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .danger_accept_invalid_certs(!verify_tls)
        .build()
        .map_err(to_error)?;

    let mut response = client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .map_err(to_error)?;

    let mut file = File::create(zip_file)
        .map_err(|error| IoError::new(FileOperation::Write, zip_file.to_path_buf(), error))?;

    let written = response.copy_to(&mut file).map_err(to_error)?;

    log::debug!("...downloaded {} bytes to {}", written, zip_file.display());

    Ok(written)
}

/// Extracts every entry of `zip_file` into `directory`.
pub fn extract(zip_file: &Path, directory: &Path) -> Result<(), SourceError> {
    let file = File::open(zip_file)
        .map_err(|error| IoError::new(FileOperation::Read, zip_file.to_path_buf(), error))?;

    let to_error = |source| SourceError::Extract {
        path: zip_file.to_path_buf(),
        source,
    };

    let mut archive = zip::ZipArchive::new(file).map_err(to_error)?;

    archive.extract(directory).map_err(to_error)?;

    log::debug!(
        "...extracted {} entries into {}",
        archive.len(),
        directory.display()
    );

    Ok(())
}

/// Removes the temporary archive. Failures are ignored.
pub fn clean_up(zip_file: NamedTempFile) {
    let path = zip_file.path().to_path_buf();

    if zip_file.close().is_err() {
        fsops::remove_file_quietly(&path);
    }
}

fn unwrap_single_directory(staging: &Path) -> Result<PathBuf, SourceError> {
    let mut entries = Vec::new();

    for entry in fs::read_dir(staging)
        .map_err(|error| IoError::new(FileOperation::ReadDir, staging.to_path_buf(), error))?
    {
        let entry = entry
            .map_err(|error| IoError::new(FileOperation::ReadDir, staging.to_path_buf(), error))?;
        entries.push(entry.path());
    }

    match entries.as_slice() {
        [] => Err(SourceError::Empty {
            path: staging.to_path_buf(),
        }),
        [only] if only.is_dir() => Ok(only.clone()),
        _ => Ok(staging.to_path_buf()),
    }
}
