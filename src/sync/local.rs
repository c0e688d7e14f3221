use std::hash::Hasher;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bincode::{Decode, Encode};
use compio::fs;
use metrohash::MetroHash64;
use snafu::{ResultExt, Snafu, ensure};
use tracing::{debug, info};

use crate::sync::backend::SnapshotSnafu;
use crate::sync::{BackendError, Change, TreeBackend};
use crate::tree::{Node, Tree, TreeError};

const SNAPSHOT_VERSION: u32 = 1;
const COMPRESSION_LEVEL: i32 = 3;

/// On-disk envelope. `payload` is the zstd-compressed bincode encoding of
/// the root node, `checksum` its MetroHash64.
#[derive(Debug, Encode, Decode)]
struct Snapshot {
    version: u32,
    checksum: u64,
    payload: Vec<u8>,
}

fn checksum(bytes: &[u8]) -> u64 {
    let mut hasher = MetroHash64::default();
    hasher.write(bytes);
    hasher.finish()
}

/// Keeps the tree in a single snapshot file
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the snapshot, starting from an empty root when there is none
    pub async fn load(&self) -> Result<Tree, SnapshotError> {
        debug!("Reading snapshot from {}", self.path.display());
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                info!("No snapshot at {}, starting fresh", self.path.display());
                return Ok(Tree::default());
            }
            Err(error) => {
                return Err(error).context(ReadSnafu {
                    file_path: self.path.display().to_string(),
                });
            }
        };
        let tree = Self::decode(&bytes)?;
        debug!("Loaded snapshot with {} nodes", tree.node_count());
        Ok(tree)
    }

    pub async fn save(&self, tree: &Tree) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.context(WriteSnafu {
                file_path: parent.display().to_string(),
            })?;
        }

        // Written next to the snapshot and renamed over it, so a crash
        // mid-write leaves the previous snapshot intact
        let bytes = Self::encode(tree)?;
        let staging = self.staging_path();
        let written = fs::write(&staging, bytes).await;
        written.0.context(WriteSnafu {
            file_path: staging.display().to_string(),
        })?;
        fs::rename(&staging, &self.path).await.context(WriteSnafu {
            file_path: self.path.display().to_string(),
        })?;
        debug!("Wrote snapshot to {}", self.path.display());
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn encode(tree: &Tree) -> Result<Vec<u8>, SnapshotError> {
        let config = bincode::config::standard();
        let encoded = bincode::encode_to_vec(tree.root(), config).context(EncodeSnafu)?;
        let payload = zstd::encode_all(encoded.as_slice(), COMPRESSION_LEVEL).context(CompressionSnafu)?;
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            checksum: checksum(&payload),
            payload,
        };
        bincode::encode_to_vec(&snapshot, config).context(EncodeSnafu)
    }

    fn decode(bytes: &[u8]) -> Result<Tree, SnapshotError> {
        let config = bincode::config::standard();
        let (snapshot, _): (Snapshot, usize) =
            bincode::decode_from_slice(bytes, config).context(DecodeSnafu)?;

        ensure!(
            snapshot.version == SNAPSHOT_VERSION,
            UnsupportedVersionSnafu {
                version: snapshot.version
            }
        );
        let actual = checksum(&snapshot.payload);
        ensure!(
            actual == snapshot.checksum,
            ChecksumMismatchSnafu {
                expected: snapshot.checksum,
                actual,
            }
        );

        let encoded = zstd::decode_all(snapshot.payload.as_slice()).context(CompressionSnafu)?;
        let (root, _): (Node, usize) =
            bincode::decode_from_slice(&encoded, config).context(DecodeSnafu)?;
        Tree::from_root(root).context(InvalidTreeSnafu)
    }
}

impl TreeBackend for LocalStore {
    async fn fetch(&self) -> Result<Tree, BackendError> {
        self.load().await.context(SnapshotSnafu)
    }

    async fn commit(&self, change: &Change, updated: &Tree) -> Result<(), BackendError> {
        debug!("Persisting '{}' locally", change);
        self.save(updated).await.context(SnapshotSnafu)
    }
}

#[derive(Debug, Snafu)]
pub enum SnapshotError {
    #[snafu(display("Failed to read snapshot {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to write snapshot {}", file_path))]
    WriteError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to encode snapshot"))]
    EncodeError {
        source: bincode::error::EncodeError,
    },
    #[snafu(display("Failed to decode snapshot"))]
    DecodeError {
        source: bincode::error::DecodeError,
    },
    #[snafu(display("Failed to (de)compress snapshot payload"))]
    CompressionError { source: std::io::Error },
    #[snafu(display("Snapshot version {} is not supported", version))]
    UnsupportedVersion { version: u32 },
    #[snafu(display("Snapshot checksum mismatch: expected {:x}, got {:x}", expected, actual))]
    ChecksumMismatch { expected: u64, actual: u64 },
    #[snafu(display("Snapshot holds an invalid tree"))]
    InvalidTree { source: TreeError },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{NodeKind, TreePath};
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> LocalStore {
        LocalStore::new(dir.path().join("nested/dir/tree.snapshot"))
    }

    #[compio::test]
    async fn missing_snapshot_starts_with_empty_root() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let tree = store_in(&dir).load().await.unwrap();
        assert_eq!(tree, Tree::default());
    }

    #[compio::test]
    async fn saved_tree_is_loaded_back() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let store = store_in(&dir);
        let root: TreePath = "/Root".parse().unwrap();
        let tree = Tree::demo()
            .create(&root, "Notes", NodeKind::Folder)
            .unwrap();

        store.save(&tree).await.unwrap();

        assert!(store.path().exists());
        assert_eq!(store.load().await.unwrap(), tree);
    }

    #[compio::test]
    async fn corrupted_payload_is_detected() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let store = store_in(&dir);
        let payload = zstd::encode_all(&b"garbage"[..], COMPRESSION_LEVEL).unwrap();
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            checksum: checksum(&payload).wrapping_add(1),
            payload,
        };
        let bytes = bincode::encode_to_vec(&snapshot, bincode::config::standard()).unwrap();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), bytes).unwrap();

        assert!(matches!(
            store.load().await,
            Err(SnapshotError::ChecksumMismatch { .. })
        ));
    }

    #[compio::test]
    async fn future_version_is_rejected() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let store = store_in(&dir);
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION + 1,
            checksum: 0,
            payload: Vec::new(),
        };
        let bytes = bincode::encode_to_vec(&snapshot, bincode::config::standard()).unwrap();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), bytes).unwrap();

        assert!(matches!(
            store.load().await,
            Err(SnapshotError::UnsupportedVersion { version }) if version == SNAPSHOT_VERSION + 1
        ));
    }

    #[compio::test]
    async fn interrupted_write_keeps_previous_snapshot() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let store = store_in(&dir);
        store.save(&Tree::demo()).await.unwrap();

        // What a crash halfway through the next save leaves behind
        std::fs::write(store.staging_path(), b"half a snapshot").unwrap();
        assert_eq!(store.load().await.unwrap(), Tree::demo());

        store.save(&Tree::default()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Tree::default());
        assert!(!store.staging_path().exists());
    }

    #[compio::test]
    async fn commit_persists_updated_tree() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let store = store_in(&dir);
        let path: TreePath = "/Root/Folder 2".parse().unwrap();
        let updated = Tree::demo().remove(&path).unwrap();

        store
            .commit(&Change::Remove { path }, &updated)
            .await
            .unwrap();

        assert_eq!(store.fetch().await.unwrap(), updated);
    }
}
