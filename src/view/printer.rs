use std::io::{self, Write};

use colored::Colorize;
use supports_color::Stream;

use crate::tree::{Node, RenderEntry, Tree};
use crate::view::ExpansionState;

const INDENT: &str = "  ";
const EXPANDED_MARKER: &str = "▾ ";
const COLLAPSED_MARKER: &str = "▸ ";
const LEAF_MARKER: &str = "  ";

/// Writes trees as indented text
#[derive(Debug, Clone, Copy, Default)]
pub struct TreePrinter {
    color: bool,
    show_paths: bool,
}

impl TreePrinter {
    pub fn new(color: bool, show_paths: bool) -> Self {
        Self { color, show_paths }
    }

    /// Whether stdout can show colour
    pub fn stdout_supports_color() -> bool {
        supports_color::on(Stream::Stdout).is_some()
    }

    pub fn write_tree(
        &self,
        out: &mut impl Write,
        tree: &Tree,
        state: &ExpansionState,
    ) -> io::Result<()> {
        for entry in state.visible(tree) {
            let marker = match entry.node.is_folder() {
                true if state.is_expanded(&entry.path) => EXPANDED_MARKER,
                true => COLLAPSED_MARKER,
                false => LEAF_MARKER,
            };
            write!(out, "{}{}{}", INDENT.repeat(entry.depth), marker, self.label(entry.node))?;
            self.write_path_column(out, &entry)?;
            writeln!(out)?;
        }
        Ok(())
    }

    /// One line per direct child, folders suffixed with a slash
    pub fn write_listing(&self, out: &mut impl Write, children: &[Node]) -> io::Result<()> {
        for child in children {
            let suffix = if child.is_folder() { "/" } else { "" };
            writeln!(out, "{}{}", self.label(child), suffix)?;
        }
        Ok(())
    }

    fn write_path_column(&self, out: &mut impl Write, entry: &RenderEntry<'_>) -> io::Result<()> {
        if !self.show_paths {
            return Ok(());
        }
        let path = entry.path.to_string();
        if self.color {
            write!(out, "  {}", path.dimmed())
        } else {
            write!(out, "  {path}")
        }
    }

    fn label(&self, node: &Node) -> String {
        match (self.color, node.is_folder()) {
            (true, true) => node.name().blue().bold().to_string(),
            (true, false) => node.name().normal().to_string(),
            (false, _) => node.name().to_string(),
        }
    }
}
