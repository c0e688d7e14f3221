use std::path::PathBuf;

use compio::fs;
use hashlink::LinkedHashMap;
use saphyr::{ScalarStyle, Yaml, YamlLoader};
use saphyr_parser::Parser;
use snafu::prelude::*;
use tracing::debug;

use crate::tree::{Node, Tree, TreeError};

const NULL_SPELLINGS: [&str; 5] = ["", "~", "null", "Null", "NULL"];

/// Source text of a non-null scalar. Scalars are kept unresolved, so
/// `2024` or `true` stay names instead of turning into numbers.
fn scalar_text<'a>(yaml: &'a Yaml) -> Option<&'a str> {
    match yaml {
        Yaml::Representation(text, ScalarStyle::Plain, None)
            if NULL_SPELLINGS.contains(&text.as_ref()) =>
        {
            None
        }
        Yaml::Representation(text, _, _) => Some(text.as_ref()),
        _ => None,
    }
}

fn get<'a, 'input>(
    mapping: &'a LinkedHashMap<Yaml<'input>, Yaml<'input>>,
    key: &str,
) -> Option<&'a Yaml<'input>> {
    mapping
        .iter()
        .find(|(candidate, _)| scalar_text(candidate) == Some(key))
        .map(|(_, value)| value)
}

/// Reads a tree described in YAML.
///
/// A bare string is a file. A mapping needs a `name`, becomes a folder
/// when it has `children`, and may force its kind with `type`.
pub async fn read_tree_file(path: PathBuf) -> Result<Tree, TreeFileError> {
    debug!("Reading tree file: {}", path.display());
    let bytes = fs::read(&path).await.context(ReadSnafu {
        file_path: path.display().to_string(),
    })?;
    let contents = String::from_utf8(bytes).context(EncodingSnafu {
        file_path: path.display().to_string(),
    })?;
    parse_tree(&contents)
}

pub fn parse_tree(contents: &str) -> Result<Tree, TreeFileError> {
    let mut loader = YamlLoader::<Yaml>::default();
    loader.early_parse(false);
    Parser::new_from_str(contents)
        .load(&mut loader, true)
        .context(ParseSnafu)?;
    let documents = loader.into_documents();
    let document = documents.first().context(MalformedDocumentSnafu)?;

    let mapping = document.as_mapping().context(TopLevelNotMapSnafu)?;
    let root = get(mapping, "root").context(MissingRootSnafu)?;

    let root = parse_node(root, "root")?;
    let tree = Tree::from_root(root).context(InvalidTreeSnafu)?;
    debug!("Parsed tree with {} nodes", tree.node_count());
    Ok(tree)
}

fn parse_node(yaml: &Yaml, location: &str) -> Result<Node, TreeFileError> {
    if let Some(name) = scalar_text(yaml) {
        return Ok(Node::file(name));
    }

    let mapping = yaml.as_mapping().context(InvalidNodeSnafu {
        location,
        reason: "expected a name or a mapping",
    })?;
    parse_mapping(mapping, location)
}

fn parse_mapping(mapping: &LinkedHashMap<Yaml, Yaml>, location: &str) -> Result<Node, TreeFileError> {
    let name = get(mapping, "name")
        .and_then(scalar_text)
        .context(InvalidNodeSnafu {
            location,
            reason: "missing name",
        })?;
    let location = format!("{location}/{name}");

    let declared_type = match get(mapping, "type") {
        None => None,
        Some(value) => Some(scalar_text(value).context(InvalidNodeSnafu {
            location: location.as_str(),
            reason: "type should be a string",
        })?),
    };

    let children = match get(mapping, "children") {
        None => None,
        Some(value) => {
            let sequence = value.as_sequence().context(InvalidNodeSnafu {
                location: location.as_str(),
                reason: "children should be a list",
            })?;
            Some(
                sequence
                    .iter()
                    .map(|child| parse_node(child, &location))
                    .collect::<Result<Vec<_>, _>>()?,
            )
        }
    };

    match (declared_type, children) {
        (Some("file"), None) => Ok(Node::file(name)),
        (Some("file"), Some(_)) => InvalidNodeSnafu {
            location,
            reason: "a file cannot have children",
        }
        .fail(),
        (Some("folder"), children) | (None, children @ Some(_)) => {
            Ok(Node::folder(name, children.unwrap_or_default()))
        }
        (None, None) => Ok(Node::file(name)),
        (Some(other), _) => InvalidNodeSnafu {
            location,
            reason: format!("unknown type '{other}'"),
        }
        .fail(),
    }
}

#[derive(Debug, Snafu)]
pub enum TreeFileError {
    #[snafu(display("Failed to read the tree file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Tree file {} is not valid UTF-8", file_path))]
    EncodingError {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the tree file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Improperly formatted tree file"))]
    MalformedDocument,
    #[snafu(display("Top level of the tree file should be a map"))]
    TopLevelNotMap,
    #[snafu(display("The tree file has no root entry"))]
    MissingRoot,
    #[snafu(display("Invalid node at {}: {}", location, reason))]
    InvalidNode { location: String, reason: String },
    #[snafu(display("The tree file describes an invalid tree"))]
    InvalidTree { source: TreeError },
}
