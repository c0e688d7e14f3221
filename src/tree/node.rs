use bincode::{Decode, Encode};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Kind of a tree node, as shown to the user and sent over the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum NodeKind {
    #[display("file")]
    File,
    #[display("folder")]
    Folder,
}

/// A single entry of the tree. Folders own their children exclusively,
/// files are always leaves.
#[derive(Debug, Clone, PartialEq, Eq, Display, Encode, Decode, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    #[display("{name}")]
    File { name: String },
    #[display("{name}/")]
    Folder {
        name: String,
        #[serde(default)]
        children: Vec<Node>,
    },
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        match kind {
            NodeKind::File => Self::file(name),
            NodeKind::Folder => Self::folder(name, Vec::new()),
        }
    }

    pub fn file(name: impl Into<String>) -> Self {
        Node::File { name: name.into() }
    }

    pub fn folder(name: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Folder {
            name: name.into(),
            children,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::File { name } | Node::Folder { name, .. } => name,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::File { .. } => NodeKind::File,
            Node::Folder { .. } => NodeKind::Folder,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Node::Folder { .. })
    }

    /// Direct children in stored order, `None` for files
    pub fn children(&self) -> Option<&[Node]> {
        match self {
            Node::File { .. } => None,
            Node::Folder { children, .. } => Some(children),
        }
    }

    pub(super) fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::File { .. } => None,
            Node::Folder { children, .. } => Some(children),
        }
    }

    pub(super) fn set_name(&mut self, new_name: String) {
        match self {
            Node::File { name } | Node::Folder { name, .. } => *name = new_name,
        }
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children()?.iter().find(|child| child.name() == name)
    }

    /// Number of nodes in this subtree, the node itself included
    pub fn count(&self) -> usize {
        1 + self
            .children()
            .map(|children| children.iter().map(Node::count).sum())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_node_of_requested_kind() {
        assert_eq!(Node::new("a", NodeKind::File), Node::file("a"));
        assert_eq!(Node::new("b", NodeKind::Folder), Node::folder("b", vec![]));
    }

    #[test]
    fn display_marks_folders_with_trailing_slash() {
        assert_eq!(Node::file("notes.txt").to_string(), "notes.txt");
        assert_eq!(Node::folder("docs", vec![]).to_string(), "docs/");
        assert_eq!(NodeKind::Folder.to_string(), "folder");
    }

    #[test]
    fn count_includes_every_descendant() {
        let node = Node::folder(
            "a",
            vec![Node::file("b"), Node::folder("c", vec![Node::file("d")])],
        );
        assert_eq!(node.count(), 4);
        assert_eq!(Node::file("x").count(), 1);
    }

    #[test]
    fn json_uses_type_tag_and_defaults_children() {
        let folder: Node = serde_json::from_str(r#"{"name":"Docs","type":"folder"}"#).unwrap();
        assert_eq!(folder, Node::folder("Docs", vec![]));

        let json = serde_json::to_value(Node::folder("A", vec![Node::file("b")])).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "folder",
                "name": "A",
                "children": [{"type": "file", "name": "b"}]
            })
        );
    }

    #[test]
    fn files_have_no_children() {
        let file = Node::file("a");
        assert!(file.children().is_none());
        assert!(file.child("anything").is_none());
        assert!(!file.is_folder());
    }
}
