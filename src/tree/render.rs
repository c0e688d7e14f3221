use crate::tree::{Node, TreePath};

/// One line of a rendered tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderEntry<'a> {
    pub node: &'a Node,
    pub depth: usize,
    pub path: TreePath,
}

/// Lazy pre-order traversal of a tree.
///
/// Keeps an explicit stack instead of recursing, children are pushed in
/// reverse so they come out in stored order.
#[derive(Debug, Clone)]
pub struct Render<'a> {
    stack: Vec<(&'a Node, TreePath)>,
}

impl<'a> Render<'a> {
    pub(super) fn new(root: &'a Node) -> Self {
        Render {
            stack: vec![(root, TreePath::root(root.name()))],
        }
    }
}

impl<'a> Iterator for Render<'a> {
    type Item = RenderEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (node, path) = self.stack.pop()?;

        if let Some(children) = node.children() {
            self.stack.extend(
                children
                    .iter()
                    .rev()
                    .map(|child| (child, path.join(child.name()))),
            );
        }

        Some(RenderEntry {
            node,
            depth: path.depth(),
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::tree::{Node, Tree};

    #[test]
    fn single_root_yields_one_entry() {
        let tree = Tree::default();
        let entries: Vec<_> = tree.render().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].depth, 0);
        assert_eq!(entries[0].path.to_string(), "/Root");
    }

    #[test]
    fn paths_follow_nesting() {
        let tree = Tree::from_root(Node::folder(
            "Root",
            vec![Node::folder("a", vec![Node::folder("b", vec![Node::file("c")])])],
        ))
        .unwrap();
        let paths: Vec<_> = tree.render().map(|entry| entry.path.to_string()).collect();
        assert_eq!(paths, ["/Root", "/Root/a", "/Root/a/b", "/Root/a/b/c"]);
    }

    #[test]
    fn is_lazy() {
        let tree = Tree::demo();
        let mut render = tree.render();
        assert_eq!(render.next().map(|entry| entry.node.name()), Some("Root"));
        assert_eq!(render.next().map(|entry| entry.node.name()), Some("Folder 1"));
        assert_eq!(tree.render().count(), tree.node_count());
    }
}
