use std::path::PathBuf;

/// Represents a file or directory staged in memory before anything is written to disk.
///
/// Destinations are relative to the package root so the same staging can be previewed and then
/// applied.
#[derive(Debug, Clone)]
pub struct VirtualEntry {
    /// Target path, relative to the package root.
    pub destination: PathBuf,
    /// Contents to be written if the entry represents a file.
    pub content: Option<String>,
    /// Indicates whether this entry is a file (`true`) or a directory (`false`).
    pub is_file: bool,
}
impl VirtualEntry {
    pub fn file(destination: impl Into<PathBuf>, content: String) -> Self {
        Self {
            destination: destination.into(),
            content: Some(content),
            is_file: true,
        }
    }

    pub fn directory(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            content: None,
            is_file: false,
        }
    }
}
/// A collection of [`VirtualEntry`] values queued up before committing them to disk.
#[derive(Debug, Clone, Default)]
pub struct VirtualFS {
    pub entries: Vec<VirtualEntry>,
}
impl VirtualFS {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn files(&self) -> impl Iterator<Item = &VirtualEntry> {
        self.entries.iter().filter(|entry| entry.is_file)
    }
}
