use derive_more::Display;
use snafu::Snafu;

use crate::sync::{LocalStore, RemoteError, RemoteSync, SnapshotError};
use crate::tree::{Node, Tree, TreePath};

/// A mutation as it is handed to a backend. Renames travel as `Replace`
/// carrying the renamed node.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Change {
    #[display("create {node} under {parent}")]
    Create { parent: TreePath, node: Node },
    #[display("replace {path} with {node}")]
    Replace { path: TreePath, node: Node },
    #[display("remove {path}")]
    Remove { path: TreePath },
}

/// Where a tree comes from and where changes go
pub trait TreeBackend {
    /// Returns the current tree, replacing any local copy wholesale
    async fn fetch(&self) -> Result<Tree, BackendError>;
    /// Persists `change`. `updated` is the tree with the change applied
    /// locally, for backends that store whole trees.
    async fn commit(&self, change: &Change, updated: &Tree) -> Result<(), BackendError>;
}

/// Static demo tree, refuses every change
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoBackend;

impl TreeBackend for DemoBackend {
    async fn fetch(&self) -> Result<Tree, BackendError> {
        Ok(Tree::demo())
    }

    async fn commit(&self, _change: &Change, _updated: &Tree) -> Result<(), BackendError> {
        Err(BackendError::ReadOnly)
    }
}

/// The backend picked at start-up
pub enum Backend {
    Demo(DemoBackend),
    Local(LocalStore),
    Remote(RemoteSync),
}

impl TreeBackend for Backend {
    async fn fetch(&self) -> Result<Tree, BackendError> {
        match self {
            Backend::Demo(backend) => backend.fetch().await,
            Backend::Local(backend) => backend.fetch().await,
            Backend::Remote(backend) => backend.fetch().await,
        }
    }

    async fn commit(&self, change: &Change, updated: &Tree) -> Result<(), BackendError> {
        match self {
            Backend::Demo(backend) => backend.commit(change, updated).await,
            Backend::Local(backend) => backend.commit(change, updated).await,
            Backend::Remote(backend) => backend.commit(change, updated).await,
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BackendError {
    #[snafu(display("The demo tree is read-only"))]
    ReadOnly,
    #[snafu(display("Local snapshot failure"))]
    SnapshotError { source: SnapshotError },
    #[snafu(display("Remote failure"))]
    RemoteError { source: RemoteError },
    #[snafu(display("Failed to dispatch remote request: {}", message))]
    DispatchError { message: String },
    #[snafu(display("Remote request got cancelled"))]
    CanceledError {
        source: futures_channel::oneshot::Canceled,
    },
}
