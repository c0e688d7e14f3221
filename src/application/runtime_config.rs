use std::path::PathBuf;

use crate::cli::{Cli, Command};
use crate::config::{RemoteSettings, Settings};

/// Where the tree is read from and written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeSource {
    Demo,
    Local(PathBuf),
    Remote(RemoteSettings),
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub source: TreeSource,
    pub command: Command,
}

impl RuntimeConfig {
    /// Merges CLI flags over the settings file: `--demo` beats `--remote`,
    /// which beats a configured remote, which beats the local snapshot
    pub fn resolve(cli: Cli, settings: Settings) -> Self {
        let source = if cli.demo {
            TreeSource::Demo
        } else if let Some(base_url) = cli.remote {
            let mut remote = settings
                .remote
                .unwrap_or_else(|| RemoteSettings::new(base_url.as_str()));
            remote.base_url = base_url;
            TreeSource::Remote(remote)
        } else if let Some(remote) = settings.remote {
            TreeSource::Remote(remote)
        } else {
            TreeSource::Local(cli.root.join(settings.snapshot))
        };

        Self {
            source,
            command: cli.command,
        }
    }
}
