use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::LogLevel;
use crate::tree::{NodeKind, TreePath};

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Browse and edit a file/folder tree")]
pub struct Cli {
    #[clap(long, short, default_value = "warn", value_enum, global = true)]
    pub log_level: LogLevel,

    /// Directory holding foldertree.yaml and the local snapshot
    #[clap(long, short, default_value = ".", global = true)]
    pub root: PathBuf,

    /// Base URL of a remote tree API, takes precedence over foldertree.yaml
    #[clap(long, global = true, conflicts_with = "demo")]
    pub remote: Option<String>,

    /// Work on the built-in read-only demo tree
    #[clap(long, global = true)]
    pub demo: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the tree, fully expanded unless told otherwise
    Show {
        /// Only expand folders above this depth
        #[clap(long)]
        depth: Option<usize>,
        /// Folder to print expanded, may be repeated
        #[clap(long = "expand", value_name = "PATH")]
        expand: Vec<TreePath>,
        /// Folder to print collapsed, may be repeated
        #[clap(long = "collapse", value_name = "PATH")]
        collapse: Vec<TreePath>,
        /// Folder to flip open or closed, applied last, may be repeated
        #[clap(long = "toggle", value_name = "PATH")]
        toggle: Vec<TreePath>,
        /// Print each node's path next to it
        #[clap(long)]
        paths: bool,
    },
    /// List the direct children of a folder (the root by default)
    List { path: Option<TreePath> },
    /// Add a node as the last child of PARENT
    Create {
        parent: TreePath,
        name: String,
        #[clap(long, short, value_enum, default_value = "file")]
        kind: KindArg,
    },
    /// Give a node a new name
    Rename { path: TreePath, new_name: String },
    /// Delete a node and everything below it
    Remove { path: TreePath },
    /// Replace the local tree with one described in YAML (the demo tree by default)
    Import { file: Option<PathBuf> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    File,
    Folder,
}

impl From<KindArg> for NodeKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::File => NodeKind::File,
            KindArg::Folder => NodeKind::Folder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("foldertree").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = parse(&["show", "--demo", "--collapse", "/Root/Folder 1", "--paths"]);
        assert!(cli.demo);
        assert_eq!(
            cli.command,
            Command::Show {
                depth: None,
                expand: vec![],
                collapse: vec!["/Root/Folder 1".parse().unwrap()],
                toggle: vec![],
                paths: true,
            }
        );
    }

    #[test]
    fn expansion_flags_repeat() {
        let cli = parse(&[
            "show", "--depth", "1", "--expand", "/Root/a", "--expand", "/Root/b", "--toggle", "/Root",
        ]);
        let Command::Show {
            depth,
            expand,
            toggle,
            ..
        } = cli.command
        else {
            panic!("expected show, got {:?}", cli.command);
        };
        assert_eq!(depth, Some(1));
        assert_eq!(expand.len(), 2);
        assert_eq!(toggle, vec!["/Root".parse::<TreePath>().unwrap()]);
    }

    #[test]
    fn create_defaults_to_file() {
        let cli = parse(&["create", "/Root", "notes.txt"]);
        assert_eq!(
            cli.command,
            Command::Create {
                parent: "/Root".parse().unwrap(),
                name: "notes.txt".to_string(),
                kind: KindArg::File,
            }
        );
        assert_eq!(NodeKind::from(KindArg::Folder), NodeKind::Folder);
    }

    #[test]
    fn invalid_path_is_rejected() {
        let result = Cli::try_parse_from(["foldertree", "remove", "/"]);
        assert!(result.is_err());
    }

    #[test]
    fn demo_and_remote_conflict() {
        let result = Cli::try_parse_from(["foldertree", "--demo", "--remote", "http://x", "show"]);
        assert!(result.is_err());
    }
}
