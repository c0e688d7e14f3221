//! Loading and persisting trees.
//!
//! A [`TreeSession`] holds the tree the user is looking at and pushes
//! every change through a [`TreeBackend`]: the read-only demo tree, a local
//! snapshot file or a remote REST API.

mod backend;
mod local;
mod remote;
mod session;

pub use backend::{Backend, BackendError, Change, DemoBackend, TreeBackend};
pub use local::{LocalStore, SnapshotError};
pub use remote::{RemoteError, RemoteSetupError, RemoteSync};
pub use session::{SyncOutcome, TreeSession};
