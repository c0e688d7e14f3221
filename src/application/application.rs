use std::io::{self, Write};

use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info, warn};

use crate::application::{RuntimeConfig, TreeSource};
use crate::cli::{Cli, Command};
use crate::config::{Settings, SettingsError, TreeFileError, read_tree_file};
use crate::sync::{
    Backend, BackendError, DemoBackend, LocalStore, RemoteSetupError, RemoteSync, SnapshotError,
    SyncOutcome, TreeSession,
};
use crate::tree::{Node, Tree, TreeError, TreePath};
use crate::view::{ExpansionState, TreePrinter};

pub struct Application;

impl Application {
    pub async fn run(cli: Cli) -> Result<(), ApplicationError> {
        let settings = Settings::read(&cli.root).await.context(SettingsSnafu)?;
        debug!("Loaded settings: {:?}", settings);

        let config = RuntimeConfig::resolve(cli, settings);
        debug!("Resolved tree source: {:?}", config.source);

        let backend = Self::backend(&config.source)?;
        let mut session = TreeSession::open(backend).await.context(OpenSnafu)?;

        let color = TreePrinter::stdout_supports_color();
        Self::execute(&mut session, config.command, &mut io::stdout(), color).await
    }

    fn backend(source: &TreeSource) -> Result<Backend, ApplicationError> {
        let backend = match source {
            TreeSource::Demo => Backend::Demo(DemoBackend),
            TreeSource::Local(path) => Backend::Local(LocalStore::new(path)),
            TreeSource::Remote(settings) => {
                Backend::Remote(RemoteSync::new(settings).context(RemoteSetupSnafu)?)
            }
        };
        Ok(backend)
    }

    /// Runs one command against an open session, writing tree output to `out`
    pub async fn execute(
        session: &mut TreeSession<Backend>,
        command: Command,
        out: &mut impl Write,
        color: bool,
    ) -> Result<(), ApplicationError> {
        match command {
            Command::Show {
                depth,
                expand,
                collapse,
                toggle,
                paths,
            } => {
                let tree = session.tree();
                let mut state = ExpansionState::default();
                match depth {
                    Some(depth) => state.expand_to_depth(tree, depth),
                    None => state.expand_all(tree),
                }

                let requested = expand.iter().chain(&collapse).chain(&toggle);
                let missing = Self::missing_folders(tree, requested);
                for path in &missing {
                    warn!("{} is not a folder in this tree, ignoring it", path);
                }
                for path in expand.into_iter().filter(|path| !missing.contains(path)) {
                    state.expand(path);
                }
                for path in collapse.iter().filter(|path| !missing.contains(*path)) {
                    state.collapse(path);
                }
                for path in toggle.into_iter().filter(|path| !missing.contains(path)) {
                    state.toggle(path);
                }
                TreePrinter::new(color, paths)
                    .write_tree(out, tree, &state)
                    .context(OutputSnafu)
            }
            Command::List { path } => {
                let tree = session.tree();
                let path = path.unwrap_or_else(|| tree.root_path());
                let children = tree.list_children(&path).context(InvalidRequestSnafu)?;
                TreePrinter::new(color, false)
                    .write_listing(out, children)
                    .context(OutputSnafu)
            }
            Command::Create { parent, name, kind } => {
                let outcome = session
                    .create(&parent, &name, kind.into())
                    .await
                    .context(InvalidRequestSnafu)?;
                Self::report(session, outcome, out, color)
            }
            Command::Rename { path, new_name } => {
                let outcome = session
                    .rename(&path, &new_name)
                    .await
                    .context(InvalidRequestSnafu)?;
                Self::report(session, outcome, out, color)
            }
            Command::Remove { path } => {
                let outcome = session.remove(&path).await.context(InvalidRequestSnafu)?;
                Self::report(session, outcome, out, color)
            }
            Command::Import { file } => {
                let Backend::Local(store) = session.backend() else {
                    return ImportRequiresLocalStoreSnafu.fail();
                };

                let tree = match file {
                    Some(file) => read_tree_file(file).await.context(ImportSnafu)?,
                    None => Tree::demo(),
                };
                store.save(&tree).await.context(SaveSnafu)?;
                info!("Imported {} nodes into {}", tree.node_count(), store.path().display());

                session.refresh().await.context(OpenSnafu)?;
                Self::report(session, SyncOutcome::Synced, out, color)
            }
        }
    }

    /// Paths among `paths` that do not name a folder of `tree`
    fn missing_folders<'a>(
        tree: &Tree,
        paths: impl IntoIterator<Item = &'a TreePath>,
    ) -> Vec<TreePath> {
        paths
            .into_iter()
            .filter(|path| !tree.get(path).is_ok_and(Node::is_folder))
            .cloned()
            .collect()
    }

    /// Prints the tree after a change, or fails when the change did not
    /// make it to the backend
    fn report(
        session: &TreeSession<Backend>,
        outcome: SyncOutcome,
        out: &mut impl Write,
        color: bool,
    ) -> Result<(), ApplicationError> {
        match outcome {
            SyncOutcome::Rejected => return ChangeRejectedSnafu.fail(),
            SyncOutcome::Stale => warn!("Showing the tree as it was before the change"),
            SyncOutcome::Synced => {}
        }

        let tree = session.tree();
        let mut state = ExpansionState::default();
        state.expand_all(tree);
        TreePrinter::new(color, false)
            .write_tree(out, tree, &state)
            .context(OutputSnafu)
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered while reading settings"))]
    SettingsError { source: SettingsError },
    #[snafu(display("Could not set up the remote tree"))]
    RemoteSetupError { source: RemoteSetupError },
    #[snafu(display("Could not load the tree"))]
    OpenError { source: BackendError },
    #[snafu(display("Invalid request"))]
    InvalidRequestError { source: TreeError },
    #[snafu(display("The change was not saved, see the log above for the cause"))]
    ChangeRejectedError,
    #[snafu(display("Could not import the tree"))]
    ImportError { source: TreeFileError },
    #[snafu(display("Could not save the imported tree"))]
    SaveError { source: SnapshotError },
    #[snafu(display("Import only works on the local snapshot, not with --demo or --remote"))]
    ImportRequiresLocalStore,
    #[snafu(display("Failed to write output"))]
    OutputError { source: io::Error },
}
