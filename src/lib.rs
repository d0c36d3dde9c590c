//! Generates framework package skeletons: fetches a skeleton archive, lays out the default
//! folder tree, renders the bundled templates and marks directories left empty.
pub mod api;
pub mod config;
pub mod errors;
pub mod folders;
pub mod fsops;
pub mod generator;
pub mod manifest;
pub mod names;
pub mod preview;
pub mod prompt;
pub mod source;
pub mod template;
pub mod transactions;
pub mod vfs;

pub use api::{folder_tree, new_package, remove_package, NewPackage, PackagerError};
pub use folders::{create_structure, fill_empty_directories, FolderError, FolderNode, FolderSpec};
