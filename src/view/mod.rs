//! Presentation side of the tree: expand/collapse state and text output.

mod expansion;
mod printer;

pub use expansion::ExpansionState;
pub use printer::TreePrinter;
