use std::collections::HashSet;

use tracing::debug;

use crate::tree::{RenderEntry, Tree, TreePath};

/// Which folders the user has opened. Lives next to the printer, never in
/// the persisted tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    expanded: HashSet<TreePath>,
}

impl ExpansionState {
    pub fn is_expanded(&self, path: &TreePath) -> bool {
        self.expanded.contains(path)
    }

    pub fn expand(&mut self, path: TreePath) {
        self.expanded.insert(path);
    }

    pub fn collapse(&mut self, path: &TreePath) {
        self.expanded.remove(path);
    }

    /// Flips the state of `path` and returns whether it is now expanded
    pub fn toggle(&mut self, path: TreePath) -> bool {
        if self.expanded.remove(&path) {
            false
        } else {
            self.expanded.insert(path);
            true
        }
    }

    pub fn expand_all(&mut self, tree: &Tree) {
        self.expand_to_depth(tree, usize::MAX);
    }

    /// Expands every folder shallower than `depth`
    pub fn expand_to_depth(&mut self, tree: &Tree, depth: usize) {
        let folders = tree
            .render()
            .filter(|entry| entry.node.is_folder() && entry.depth < depth)
            .map(|entry| entry.path);
        self.expanded.extend(folders);
        debug!("{} folders expanded", self.expanded.len());
    }

    /// Rendered entries whose ancestors are all expanded
    pub fn visible<'a>(&'a self, tree: &'a Tree) -> impl Iterator<Item = RenderEntry<'a>> + 'a {
        tree.render()
            .filter(move |entry| entry.path.ancestors().all(|ancestor| self.is_expanded(&ancestor)))
    }
}
