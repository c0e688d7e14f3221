pub mod settings;
pub mod tree_file;

pub use settings::{RemoteSettings, Settings, SettingsError};
pub use tree_file::{TreeFileError, read_tree_file};
