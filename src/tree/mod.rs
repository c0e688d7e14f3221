//! In-memory file/folder tree.
//!
//! Nodes are addressed by [`TreePath`]s walked from the root folder. All
//! mutations are validated up front and produce a fresh [`Tree`].

mod node;
mod path;
mod render;
#[allow(clippy::module_inception)]
mod tree;

pub use node::{Node, NodeKind};
pub use path::{SEPARATOR, TreePath};
pub use render::{Render, RenderEntry};
pub use tree::{Tree, TreeError};
