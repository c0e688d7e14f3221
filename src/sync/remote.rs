use std::num::NonZeroUsize;

use compio::dispatcher::{Dispatcher, DispatcherBuilder};
use serde::Deserialize;
use snafu::{ResultExt, Snafu, ensure};
use tracing::{debug, info};
use url::Url;

use crate::config::RemoteSettings;
use crate::sync::backend::{CanceledSnafu, RemoteSnafu};
use crate::sync::{BackendError, Change, TreeBackend};
use crate::tree::{Node, Tree, TreeError, TreePath};

const FILES_ENDPOINT: &str = "files";
const PATH_QUERY: &str = "path";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Body of `GET /files`
#[derive(Debug, Deserialize)]
struct FilesResponse {
    root: Node,
}

/// Blocking client for the REST collaborator.
///
/// Paths sent to the API lose their root segment, whatever the root is
/// called: `/Root/Folder 1` goes out as `/Folder 1`, the root as `""`.
#[derive(Clone)]
pub struct RemoteClient {
    agent: ureq::Agent,
    base_url: Url,
}

impl RemoteClient {
    pub fn new(settings: &RemoteSettings) -> Result<Self, RemoteError> {
        let base_url = Url::parse(&settings.base_url).context(InvalidBaseUrlSnafu {
            url: settings.base_url.as_str(),
        })?;
        ensure!(
            !base_url.cannot_be_a_base(),
            UnusableBaseUrlSnafu {
                url: settings.base_url.as_str()
            }
        );

        let agent = ureq::AgentBuilder::new().timeout(settings.timeout).build();
        Ok(Self { agent, base_url })
    }

    pub fn fetch_tree(&self) -> Result<Tree, RemoteError> {
        let url = self.endpoint(None, None);
        let body = self
            .send("GET", &url, None)?
            .into_string()
            .context(BodySnafu { url: url.as_str() })?;
        let response: FilesResponse = serde_json::from_str(&body).context(DecodeSnafu)?;
        Tree::from_root(response.root).context(InvalidTreeSnafu)
    }

    pub fn create_node(&self, parent: &TreePath, node: &Node) -> Result<(), RemoteError> {
        let url = self.endpoint(None, Some(parent));
        self.send("POST", &url, Some(node)).map(|_| ())
    }

    pub fn replace_node(&self, path: &TreePath, node: &Node) -> Result<(), RemoteError> {
        let (parent, name) = Self::split(path)?;
        let url = self.endpoint(Some(name), Some(&parent));
        self.send("PUT", &url, Some(node)).map(|_| ())
    }

    pub fn delete_node(&self, path: &TreePath) -> Result<(), RemoteError> {
        let (parent, name) = Self::split(path)?;
        let url = self.endpoint(Some(name), Some(&parent));
        self.send("DELETE", &url, None).map(|_| ())
    }

    pub fn apply(&self, change: &Change) -> Result<(), RemoteError> {
        match change {
            Change::Create { parent, node } => self.create_node(parent, node),
            Change::Replace { path, node } => self.replace_node(path, node),
            Change::Remove { path } => self.delete_node(path),
        }
    }

    fn split(path: &TreePath) -> Result<(TreePath, &str), RemoteError> {
        let (Some(parent), Some(name)) = (path.parent(), path.name()) else {
            return RootNotAddressableSnafu.fail();
        };
        // URL path segments drop `.` and `..`, which would retarget the request
        ensure!(
            !matches!(name, "." | ".."),
            UnaddressableNameSnafu { name }
        );
        Ok((parent, name))
    }

    fn endpoint(&self, name: Option<&str>, parent: Option<&TreePath>) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`, the base URL can always take segments
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(FILES_ENDPOINT);
            if let Some(name) = name {
                segments.push(name);
            }
        }
        if let Some(parent) = parent {
            url.query_pairs_mut()
                .append_pair(PATH_QUERY, &parent.without_root());
        }
        url
    }

    fn send(&self, method: &str, url: &Url, body: Option<&Node>) -> Result<ureq::Response, RemoteError> {
        debug!("{} {}", method, url);
        let request = self.agent.request_url(method, url);
        let result = match body {
            Some(node) => {
                let json = serde_json::to_string(node).context(EncodeSnafu)?;
                request
                    .set("Content-Type", JSON_CONTENT_TYPE)
                    .send_string(&json)
            }
            None => request.call(),
        };

        result.map_err(|error| match error {
            ureq::Error::Status(status, _) => RemoteError::StatusError {
                method: method.to_string(),
                url: url.to_string(),
                status,
            },
            other => RemoteError::TransportError {
                method: method.to_string(),
                url: url.to_string(),
                source: Box::new(other),
            },
        })
    }
}

/// Remote backend. HTTP calls are blocking, so they run on a dedicated
/// dispatcher thread and the runtime only awaits their outcome.
pub struct RemoteSync {
    client: RemoteClient,
    dispatcher: Dispatcher,
}

impl RemoteSync {
    pub fn new(settings: &RemoteSettings) -> Result<Self, RemoteSetupError> {
        let client = RemoteClient::new(settings).context(ClientSnafu)?;
        let dispatcher = DispatcherBuilder::new()
            .worker_threads(NonZeroUsize::MIN)
            .build()
            .context(DispatcherSnafu)?;
        info!("Syncing with {}", client.base_url);
        Ok(Self { client, dispatcher })
    }

    async fn offload<R, F>(&self, job: F) -> Result<R, BackendError>
    where
        F: FnOnce(RemoteClient) -> Result<R, RemoteError> + Send + 'static,
        R: Send + 'static,
    {
        let client = self.client.clone();
        let receiver = self
            .dispatcher
            .dispatch(move || async move { job(client) })
            .map_err(|e| BackendError::DispatchError {
                message: e.to_string(),
            })?;

        receiver
            .await
            .context(CanceledSnafu)?
            .context(RemoteSnafu)
    }
}

impl TreeBackend for RemoteSync {
    async fn fetch(&self) -> Result<Tree, BackendError> {
        self.offload(|client| client.fetch_tree()).await
    }

    async fn commit(&self, change: &Change, _updated: &Tree) -> Result<(), BackendError> {
        let change = change.clone();
        self.offload(move |client| client.apply(&change)).await
    }
}

#[derive(Debug, Snafu)]
pub enum RemoteError {
    #[snafu(display("'{}' is not a valid base URL", url))]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[snafu(display("'{}' cannot be used as a base URL", url))]
    UnusableBaseUrl { url: String },
    #[snafu(display("{} {} failed", method, url))]
    TransportError {
        method: String,
        url: String,
        source: Box<ureq::Error>,
    },
    #[snafu(display("{} {} answered with status {}", method, url, status))]
    StatusError {
        method: String,
        url: String,
        status: u16,
    },
    #[snafu(display("Failed to read response body from {}", url))]
    BodyError {
        url: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to encode node as JSON"))]
    EncodeError { source: serde_json::Error },
    #[snafu(display("Failed to decode the remote tree"))]
    DecodeError { source: serde_json::Error },
    #[snafu(display("The remote tree is invalid"))]
    InvalidTreeError { source: TreeError },
    #[snafu(display("The root folder has no parent to address it by"))]
    RootNotAddressable,
    #[snafu(display("'{}' cannot be used as a path segment", name))]
    UnaddressableName { name: String },
}

#[derive(Debug, Snafu)]
pub enum RemoteSetupError {
    #[snafu(display("Failed to configure the remote client"))]
    ClientError { source: RemoteError },
    #[snafu(display("Failed to create the request dispatcher"))]
    DispatcherError { source: std::io::Error },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{SyncOutcome, TreeSession};
    use crate::tree::NodeKind;
    use rstest::*;
    use std::io::Read;
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[derive(Debug)]
    struct Recorded {
        method: String,
        url: String,
        body: String,
    }

    /// Serves the demo tree on GET and answers every other request with
    /// `mutation_status`. Requests are reported through the receiver.
    fn start_mock_server(mutation_status: u16) -> (RemoteSettings, mpsc::Receiver<Recorded>) {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("Failed to start test server");
        let port = server.server_addr().to_ip().unwrap().port();
        let (sender, receiver) = mpsc::channel();

        thread::spawn(move || {
            for mut request in server.incoming_requests() {
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let method = request.method().to_string();
                let response = if method == "GET" {
                    let tree = serde_json::json!({ "root": Tree::demo().root() });
                    tiny_http::Response::from_string(tree.to_string())
                } else {
                    tiny_http::Response::from_string("").with_status_code(mutation_status)
                };
                let _ = sender.send(Recorded {
                    method,
                    url: request.url().to_string(),
                    body,
                });
                let _ = request.respond(response);
            }
        });

        let mut settings = RemoteSettings::new(format!("http://127.0.0.1:{port}/api"));
        settings.timeout = Duration::from_secs(5);
        (settings, receiver)
    }

    fn path(raw: &str) -> TreePath {
        raw.parse().unwrap()
    }

    fn client(settings: &RemoteSettings) -> RemoteClient {
        RemoteClient::new(settings).unwrap()
    }

    #[test]
    fn fetches_whole_tree() {
        let (settings, requests) = start_mock_server(200);
        let tree = client(&settings).fetch_tree().unwrap();

        assert_eq!(tree, Tree::demo());
        let request = requests.recv().unwrap();
        assert_eq!(request.method, "GET");
        assert_eq!(request.url, "/api/files");
    }

    #[test]
    fn create_posts_node_under_stripped_parent() {
        let (settings, requests) = start_mock_server(201);
        let node = Node::new("Notes", NodeKind::Folder);
        client(&settings)
            .create_node(&path("/Root/Folder 1"), &node)
            .unwrap();

        let request = requests.recv().unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.url, "/api/files?path=%2FFolder+1");
        assert_eq!(serde_json::from_str::<Node>(&request.body).unwrap(), node);
    }

    #[test]
    fn replace_puts_node_by_name() {
        let (settings, requests) = start_mock_server(200);
        let renamed = Node::folder("Folder A", vec![]);
        client(&settings)
            .replace_node(&path("/Root/Folder 1"), &renamed)
            .unwrap();

        let request = requests.recv().unwrap();
        assert_eq!(request.method, "PUT");
        assert_eq!(request.url, "/api/files/Folder%201?path=");
        assert_eq!(serde_json::from_str::<Node>(&request.body).unwrap(), renamed);
    }

    #[test]
    fn delete_addresses_node_by_name() {
        let (settings, requests) = start_mock_server(204);
        client(&settings)
            .delete_node(&path("/Root/Folder 1/File 1.1"))
            .unwrap();

        let request = requests.recv().unwrap();
        assert_eq!(request.method, "DELETE");
        assert_eq!(request.url, "/api/files/File%201.1?path=%2FFolder+1");
    }

    #[test]
    fn root_prefix_is_stripped_whatever_its_name() {
        let (settings, requests) = start_mock_server(200);
        client(&settings)
            .delete_node(&path("/Home/Docs/a.txt"))
            .unwrap();

        assert_eq!(
            requests.recv().unwrap().url,
            "/api/files/a.txt?path=%2FDocs"
        );
    }

    #[test]
    fn root_cannot_be_replaced_remotely() {
        let (settings, _requests) = start_mock_server(200);
        let result = client(&settings).replace_node(&path("/Root"), &Node::folder("Home", vec![]));
        assert!(matches!(result, Err(RemoteError::RootNotAddressable)));
    }

    #[rstest]
    #[case("/Root/Folder 1/..")]
    #[case("/Root/.")]
    fn dot_names_never_reach_the_server(#[case] raw: &str) {
        let (settings, requests) = start_mock_server(204);
        let client = client(&settings);

        assert!(matches!(
            client.delete_node(&path(raw)),
            Err(RemoteError::UnaddressableName { .. })
        ));
        assert!(matches!(
            client.replace_node(&path(raw), &Node::file("x")),
            Err(RemoteError::UnaddressableName { .. })
        ));
        assert!(requests.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn error_status_is_reported() {
        let (settings, _requests) = start_mock_server(500);
        let result = client(&settings).delete_node(&path("/Root/Folder 2"));
        assert!(matches!(
            result,
            Err(RemoteError::StatusError { status: 500, .. })
        ));
    }

    #[test]
    fn unreachable_server_is_transport_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let settings = RemoteSettings::new(format!("http://127.0.0.1:{port}"));
        let result = client(&settings).fetch_tree();
        assert!(matches!(result, Err(RemoteError::TransportError { .. })));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            RemoteClient::new(&RemoteSettings::new("not a url")),
            Err(RemoteError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            RemoteClient::new(&RemoteSettings::new("mailto:someone@example.com")),
            Err(RemoteError::UnusableBaseUrl { .. })
        ));
    }

    #[compio::test]
    async fn session_refetches_after_remote_change() {
        let (settings, requests) = start_mock_server(200);
        let backend = RemoteSync::new(&settings).unwrap();
        let mut session = TreeSession::open(backend).await.unwrap();

        let outcome = session
            .rename(&path("/Root/Folder 1"), "Renamed")
            .await
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Synced);
        // The server did not apply the rename, and its answer wins
        assert_eq!(session.tree(), &Tree::demo());
        let methods: Vec<_> = requests.try_iter().map(|r| r.method).collect();
        assert_eq!(methods, ["GET", "PUT", "GET"]);
    }

    #[compio::test]
    async fn failed_remote_change_keeps_local_tree() {
        let (settings, requests) = start_mock_server(503);
        let backend = RemoteSync::new(&settings).unwrap();
        let mut session = TreeSession::open(backend).await.unwrap();

        let outcome = session.remove(&path("/Root/Folder 2")).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Rejected);
        assert_eq!(session.tree(), &Tree::demo());
        let methods: Vec<_> = requests.try_iter().map(|r| r.method).collect();
        assert_eq!(methods, ["GET", "DELETE"]);
    }
}
