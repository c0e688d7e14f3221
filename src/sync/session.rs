use snafu::Report;
use tracing::{debug, error, info, warn};

use crate::sync::{BackendError, Change, TreeBackend};
use crate::tree::{NodeKind, Tree, TreeError, TreePath};

/// What happened to a change that passed local validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Committed and the local copy was refetched
    Synced,
    /// Committed, but the refetch failed and the local copy is outdated
    Stale,
    /// The backend refused the change, the local copy is untouched
    Rejected,
}

/// The current tree plus the backend it came from.
///
/// Changes are checked against the local copy first, then committed, then
/// the whole tree is fetched again. Nothing is applied locally until that
/// refetch succeeds. Two changes racing each other resolve as
/// last-write-wins on the backend side.
pub struct TreeSession<B> {
    backend: B,
    tree: Tree,
}

impl<B: TreeBackend> TreeSession<B> {
    pub async fn open(backend: B) -> Result<Self, BackendError> {
        let tree = backend.fetch().await?;
        info!("Opened tree with {} nodes", tree.node_count());
        Ok(Self { backend, tree })
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Drops the local copy and fetches it again
    pub async fn refresh(&mut self) -> Result<(), BackendError> {
        self.tree = self.backend.fetch().await?;
        debug!("Refreshed tree, {} nodes", self.tree.node_count());
        Ok(())
    }

    pub async fn create(
        &mut self,
        parent: &TreePath,
        name: &str,
        kind: NodeKind,
    ) -> Result<SyncOutcome, TreeError> {
        let updated = self.tree.create(parent, name, kind)?;
        let node = updated.get(&parent.join(name))?.clone();
        let change = Change::Create {
            parent: parent.clone(),
            node,
        };
        Ok(self.commit(change, updated).await)
    }

    pub async fn rename(&mut self, path: &TreePath, new_name: &str) -> Result<SyncOutcome, TreeError> {
        let updated = self.tree.rename(path, new_name)?;
        let node = updated.get(&path.with_name(new_name))?.clone();
        let change = Change::Replace {
            path: path.clone(),
            node,
        };
        Ok(self.commit(change, updated).await)
    }

    pub async fn remove(&mut self, path: &TreePath) -> Result<SyncOutcome, TreeError> {
        let updated = self.tree.remove(path)?;
        let change = Change::Remove { path: path.clone() };
        Ok(self.commit(change, updated).await)
    }

    async fn commit(&mut self, change: Change, updated: Tree) -> SyncOutcome {
        if let Err(e) = self.backend.commit(&change, &updated).await {
            error!("Failed to {}: {}", change, Report::from_error(e));
            return SyncOutcome::Rejected;
        }
        info!("Committed: {}", change);

        match self.refresh().await {
            Ok(()) => SyncOutcome::Synced,
            Err(e) => {
                warn!(
                    "Committed '{}' but could not refetch the tree: {}",
                    change,
                    Report::from_error(e)
                );
                SyncOutcome::Stale
            }
        }
    }
}
