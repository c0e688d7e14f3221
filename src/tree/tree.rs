use std::collections::HashSet;

use snafu::{Snafu, ensure};
use tracing::debug;

use crate::tree::{Node, NodeKind, Render, SEPARATOR, TreePath};

pub const DEFAULT_ROOT_NAME: &str = "Root";

/// A hierarchy of named nodes under a single root folder.
///
/// Every mutating operation takes `&self` and hands back a new tree, so a
/// failed operation can never leave a half-applied change behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    root: Node,
}

impl Default for Tree {
    fn default() -> Self {
        Tree {
            root: Node::folder(DEFAULT_ROOT_NAME, Vec::new()),
        }
    }
}

impl Tree {
    /// Validates an externally supplied root and wraps it into a tree
    pub fn from_root(root: Node) -> Result<Self, TreeError> {
        ensure!(root.is_folder(), InvalidRootSnafu { name: root.name() });
        validate_subtree(&root, &TreePath::root(root.name()))?;
        Ok(Tree { root })
    }

    /// The read-only tree shown in demo mode
    pub fn demo() -> Self {
        Tree {
            root: Node::folder(
                DEFAULT_ROOT_NAME,
                vec![
                    Node::folder(
                        "Folder 1",
                        vec![Node::file("File 1.1"), Node::file("File 1.2")],
                    ),
                    Node::folder(
                        "Folder 2",
                        vec![Node::file("File 2.1"), Node::file("File 2.2")],
                    ),
                ],
            ),
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_path(&self) -> TreePath {
        TreePath::root(self.root.name())
    }

    pub fn node_count(&self) -> usize {
        self.root.count()
    }

    pub fn get(&self, path: &TreePath) -> Result<&Node, TreeError> {
        let mut segments = path.segments().iter();
        let mut current = match segments.next() {
            Some(first) if first == self.root.name() => &self.root,
            _ => return NotFoundSnafu { path: path.clone() }.fail(),
        };

        for segment in segments {
            current = current
                .child(segment)
                .ok_or_else(|| NotFoundSnafu { path: path.clone() }.build())?;
        }

        Ok(current)
    }

    /// Direct children of the folder at `path`, in insertion order
    pub fn list_children(&self, path: &TreePath) -> Result<&[Node], TreeError> {
        self.get(path)?
            .children()
            .ok_or_else(|| NotAFolderSnafu { path: path.clone() }.build())
    }

    pub fn create(&self, parent: &TreePath, name: &str, kind: NodeKind) -> Result<Tree, TreeError> {
        validate_name(name)?;

        let mut updated = self.clone();
        let children = updated
            .get_mut(parent)
            .ok()
            .and_then(Node::children_mut)
            .ok_or_else(|| InvalidParentSnafu { path: parent.clone() }.build())?;

        ensure!(
            children.iter().all(|child| child.name() != name),
            DuplicateNameSnafu {
                parent: parent.clone(),
                name,
            }
        );

        children.push(Node::new(name, kind));
        debug!("Created {} '{}' under {}", kind, name, parent);
        Ok(updated)
    }

    pub fn rename(&self, path: &TreePath, new_name: &str) -> Result<Tree, TreeError> {
        let current_name = self.get(path)?.name().to_string();
        validate_name(new_name)?;

        if current_name == new_name {
            return Ok(self.clone());
        }

        if let Some(parent) = path.parent() {
            let taken = self
                .get(&parent)?
                .child(new_name)
                .is_some();
            ensure!(
                !taken,
                DuplicateNameSnafu {
                    parent,
                    name: new_name,
                }
            );
        }

        let mut updated = self.clone();
        updated.get_mut(path)?.set_name(new_name.to_string());
        debug!("Renamed {} to '{}'", path, new_name);
        Ok(updated)
    }

    pub fn remove(&self, path: &TreePath) -> Result<Tree, TreeError> {
        self.get(path)?;
        let (parent, name) = match (path.parent(), path.name()) {
            (Some(parent), Some(name)) => (parent, name),
            _ => return CannotRemoveRootSnafu.fail(),
        };

        let mut updated = self.clone();
        if let Some(children) = updated.get_mut(&parent)?.children_mut() {
            children.retain(|child| child.name() != name);
        }
        debug!("Removed {}", path);
        Ok(updated)
    }

    /// Depth-first, pre-order walk over every node. Each call starts over.
    pub fn render(&self) -> Render<'_> {
        Render::new(&self.root)
    }

    fn get_mut(&mut self, path: &TreePath) -> Result<&mut Node, TreeError> {
        let mut segments = path.segments().iter();
        let mut current = match segments.next() {
            Some(first) if first == self.root.name() => &mut self.root,
            _ => return NotFoundSnafu { path: path.clone() }.fail(),
        };

        for segment in segments {
            current = current
                .children_mut()
                .and_then(|children| children.iter_mut().find(|child| child.name() == segment))
                .ok_or_else(|| NotFoundSnafu { path: path.clone() }.build())?;
        }

        Ok(current)
    }
}

/// Names that path resolution treats as relative segments
const RESERVED_NAMES: [&str; 2] = [".", ".."];

fn validate_name(name: &str) -> Result<(), TreeError> {
    ensure!(
        !name.is_empty() && !name.contains(SEPARATOR) && !RESERVED_NAMES.contains(&name),
        InvalidNameSnafu { name }
    );
    Ok(())
}

fn validate_subtree(node: &Node, path: &TreePath) -> Result<(), TreeError> {
    validate_name(node.name())?;

    if let Some(children) = node.children() {
        let mut seen = HashSet::new();
        for child in children {
            ensure!(
                seen.insert(child.name()),
                DuplicateNameSnafu {
                    parent: path.clone(),
                    name: child.name(),
                }
            );
            validate_subtree(child, &path.join(child.name()))?;
        }
    }

    Ok(())
}

#[derive(Debug, Snafu)]
pub enum TreeError {
    #[snafu(display("No node at {}", path))]
    NotFound { path: TreePath },
    #[snafu(display("{} is not a folder", path))]
    NotAFolder { path: TreePath },
    #[snafu(display("Cannot add a node under {}: it is not an existing folder", path))]
    InvalidParent { path: TreePath },
    #[snafu(display("{} already contains a node named '{}'", parent, name))]
    DuplicateName { parent: TreePath, name: String },
    #[snafu(display("The root folder cannot be removed"))]
    CannotRemoveRoot,
    #[snafu(display("'{}' is not a valid node name", name))]
    InvalidName { name: String },
    #[snafu(display("The root node '{}' must be a folder", name))]
    InvalidRoot { name: String },
}
