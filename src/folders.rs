use crate::{
    errors::{FileOperation, IoError},
    fsops,
};
use indexmap::IndexMap;
use miette::Diagnostic;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Placeholder file dropped into directories that would otherwise be empty, so that version
/// control keeps them.
pub const DEFAULT_MARKER: &str = ".gitkeep";

#[derive(Debug, Error, Diagnostic)]
pub enum FolderError {
    #[error("I/O error within folders domain")]
    #[diagnostic(code(packager::folders::io))]
    Io(#[from] IoError),

    #[error("invalid folder name: '{name}'")]
    #[diagnostic(
        code(packager::folders::invalid_name),
        help("A folder name is a single path segment: no '/', no '.' or '..', not absolute")
    )]
    InvalidName { name: String },

    #[error("invalid marker file name: '{marker}'")]
    #[diagnostic(
        code(packager::folders::invalid_marker),
        help("The marker is a plain file name such as '.gitkeep'")
    )]
    InvalidMarker { marker: String },
}

fn check_name(name: &str) -> Result<&str, FolderError> {
    if fsops::is_single_segment(name) {
        Ok(name)
    } else {
        Err(FolderError::InvalidName {
            name: name.to_string(),
        })
    }
}

/// Fails unless `marker` is a plain file name.
pub fn check_marker(marker: &str) -> Result<(), FolderError> {
    if fsops::is_single_segment(marker) {
        Ok(())
    } else {
        Err(FolderError::InvalidMarker {
            marker: marker.to_string(),
        })
    }
}

/// A single entry of a [`FolderSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderNode {
    /// A directory with no described children.
    Leaf(String),
    /// A directory together with the folders nested inside it.
    Branch { name: String, children: FolderSpec },
}
impl FolderNode {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self::Leaf(name.into())
    }

    pub fn branch(name: impl Into<String>, children: impl IntoIterator<Item = FolderNode>) -> Self {
        Self::Branch {
            name: name.into(),
            children: FolderSpec::new(children),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Leaf(name) => name,
            Self::Branch { name, .. } => name,
        }
    }
}

/// Ordered description of the directories generated inside a package.
///
/// Deserializes from a mixed array where a string is a leaf and a table maps each of its keys,
/// in document order, to a nested array. Every name must be a single path segment:
///
/// ```toml
/// folders = ["Controllers", { database = ["migrations"] }]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<RawFolder>")]
pub struct FolderSpec(Vec<FolderNode>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFolder {
    Leaf(String),
    Branches(IndexMap<String, Vec<RawFolder>>),
}

impl TryFrom<Vec<RawFolder>> for FolderSpec {
    type Error = FolderError;

    fn try_from(raw: Vec<RawFolder>) -> Result<Self, Self::Error> {
        let mut nodes = Vec::with_capacity(raw.len());

        for entry in raw {
            match entry {
                RawFolder::Leaf(name) => {
                    check_name(&name)?;
                    nodes.push(FolderNode::Leaf(name));
                }
                RawFolder::Branches(branches) => {
                    for (name, children) in branches {
                        check_name(&name)?;
                        nodes.push(FolderNode::Branch {
                            name,
                            children: FolderSpec::try_from(children)?,
                        });
                    }
                }
            }
        }

        Ok(Self(nodes))
    }
}

impl Default for FolderSpec {
    fn default() -> Self {
        Self::new([
            FolderNode::leaf("Controllers"),
            FolderNode::leaf("Facades"),
            FolderNode::leaf("Models"),
            FolderNode::leaf("Repositories"),
            FolderNode::leaf("config"),
            FolderNode::branch("database", [FolderNode::leaf("migrations")]),
            FolderNode::branch(
                "resources",
                [
                    FolderNode::branch("assets", [FolderNode::leaf("js"), FolderNode::leaf("sass")]),
                    FolderNode::branch("views", [FolderNode::leaf("elements")]),
                ],
            ),
        ])
    }
}

impl FolderSpec {
    pub fn new(nodes: impl IntoIterator<Item = FolderNode>) -> Self {
        Self(nodes.into_iter().collect())
    }

    /// Every directory described by the spec, resolved against `root`, in visit order.
    pub fn paths(&self, root: &Path) -> Result<Vec<PathBuf>, FolderError> {
        let mut paths = Vec::new();

        self.visit(root, &mut |path: &Path| -> Result<(), FolderError> {
            paths.push(path.to_path_buf());
            Ok(())
        })?;

        Ok(paths)
    }

    /// Depth-first, insertion-order walk. A branch is visited before its children and each
    /// level appends exactly one segment to `base`. A name that is not a single segment stops
    /// the walk before anything under it is visited.
    fn visit<E: From<FolderError>>(
        &self,
        base: &Path,
        visitor: &mut impl FnMut(&Path) -> Result<(), E>,
    ) -> Result<(), E> {
        for node in &self.0 {
            let path = base.join(check_name(node.name())?);

            visitor(&path)?;

            if let FolderNode::Branch { children, .. } = node {
                children.visit(&path, visitor)?;
            }
        }

        Ok(())
    }
}

/// Creates every directory described by `spec` under `root`.
///
/// Directories that already exist are left alone, so running this twice is a no-op. The first
/// failure aborts the walk and is returned as is.
pub fn create_structure(root: &Path, spec: &FolderSpec) -> Result<(), FolderError> {
    spec.visit(root, &mut |path: &Path| -> Result<(), FolderError> {
        if path.is_dir() {
            log::debug!("...directory exists: {}", path.display());
            return Ok(());
        }

        fs::create_dir_all(path)
            .map_err(|error| IoError::new(FileOperation::Mkdir, path.to_path_buf(), error))?;

        log::debug!("...created directory: {}", path.display());

        Ok(())
    })
}

/// Writes a zero-byte `marker` file into every directory of `spec` that has no entries.
///
/// Must run after everything else has been written into the tree, otherwise a directory that is
/// about to be populated gets a marker too. Returns the marked directories in visit order.
pub fn fill_empty_directories(
    root: &Path,
    spec: &FolderSpec,
    marker: &str,
) -> Result<Vec<PathBuf>, FolderError> {
    check_marker(marker)?;

    let mut marked = Vec::new();

    spec.visit(root, &mut |path: &Path| -> Result<(), FolderError> {
        if !fsops::is_empty_dir(path)? {
            return Ok(());
        }

        let marker_path = path.join(marker);

        fs::write(&marker_path, b"")
            .map_err(|error| IoError::new(FileOperation::Write, marker_path.clone(), error))?;

        log::debug!("...placed marker: {}", marker_path.display());

        marked.push(path.to_path_buf());

        Ok(())
    })?;

    Ok(marked)
}
