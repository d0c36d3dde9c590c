use crate::fsops;
use std::{marker::PhantomData, path::PathBuf};

/// Enum of possible operations to rollback
#[derive(Debug)]
pub enum RollbackOperation {
    RemoveDir(PathBuf),
}
/// Active Transaction
pub struct Active;
/// Committed Transaction
pub struct Committed;
/// A trait that tells us if rollback should occur when dropped.
pub trait TransactionState {
    const SHOULD_ROLLBACK: bool;
}
impl TransactionState for Active {
    const SHOULD_ROLLBACK: bool = true;
}
impl TransactionState for Committed {
    const SHOULD_ROLLBACK: bool = false;
}
/// Tracks what a generation run created so a failed run leaves nothing behind.
///
/// A `Transaction<Active>` that is dropped without [`Transaction::commit`], for instance because
/// an error was propagated with `?`, undoes its operations in reverse order. Directories are
/// removed through [`fsops::remove_dir`], so the workspace root and `/` are never touched.
///
/// ```rust,ignore
/// let mut trx = Transaction::<Active>::new("packages");
/// trx.add_operation(RollbackOperation::RemoveDir("packages/acme".into()));
/// trx.commit(); // No rollback will happen
/// ```
pub struct Transaction<State: TransactionState> {
    rollback_operations: Vec<RollbackOperation>,
    workspace_root: PathBuf,
    state: PhantomData<State>,
}
impl Transaction<Active> {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Transaction {
            rollback_operations: vec![],
            workspace_root: workspace_root.into(),
            state: PhantomData,
        }
    }
    /// Registers an action to reverse if the transaction is dropped uncommitted.
    pub fn add_operation(&mut self, operation: RollbackOperation) {
        self.rollback_operations.push(operation);
    }
    /// Finalizes the transaction, preventing any rollback from occurring.
    pub fn commit(mut self) -> Transaction<Committed> {
        self.rollback_operations.clear();

        Transaction {
            rollback_operations: vec![],
            workspace_root: std::mem::take(&mut self.workspace_root),
            state: PhantomData,
        }
    }
}
impl<S: TransactionState> Drop for Transaction<S> {
    fn drop(&mut self) {
        if S::SHOULD_ROLLBACK && !self.rollback_operations.is_empty() {
            log::debug!("...rolling back operations");
            while let Some(operation) = self.rollback_operations.pop() {
                match operation {
                    RollbackOperation::RemoveDir(path) => {
                        log::debug!("...removing dir: {}", path.display());
                        if !path.exists() {
                            continue;
                        }
                        if let Err(error) = fsops::remove_dir(&path, &self.workspace_root) {
                            log::warn!("rollback failed for {}: {}", path.display(), error);
                        }
                    }
                }
            }
        } else if !S::SHOULD_ROLLBACK {
            log::debug!("...committing transaction");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_dropped_active_transaction_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let package = dir.path().join("packages/acme/blog");
        fs::create_dir_all(package.join("src")).unwrap();
        fs::write(package.join("composer.json"), "{}").unwrap();

        {
            let mut trx = Transaction::<Active>::new(dir.path().join("packages"));
            trx.add_operation(RollbackOperation::RemoveDir(dir.path().join("packages/acme")));
            trx.add_operation(RollbackOperation::RemoveDir(package.clone()));
        }

        assert!(!dir.path().join("packages/acme").exists());
        assert!(dir.path().join("packages").is_dir());
    }

    #[test]
    fn test_committed_transaction_keeps_everything() {
        let dir = tempfile::tempdir().unwrap();
        let package = dir.path().join("packages/acme/blog");
        fs::create_dir_all(&package).unwrap();

        let mut trx = Transaction::<Active>::new(dir.path().join("packages"));
        trx.add_operation(RollbackOperation::RemoveDir(package.clone()));
        drop(trx.commit());

        assert!(package.is_dir());
    }

    #[test]
    fn test_rollback_never_removes_workspace_root() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path().join("packages");
        fs::create_dir_all(workspace.join("other/package")).unwrap();

        {
            let mut trx = Transaction::<Active>::new(workspace.clone());
            trx.add_operation(RollbackOperation::RemoveDir(workspace.clone()));
        }

        assert!(workspace.join("other/package").is_dir());
    }
}
