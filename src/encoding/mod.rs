//! Codecs turning descriptor bytes into a nested tree.
//!
//! # Data Flow
//! ```text
//! Descriptor { format: "yaml", data }
//!     → Codecs::get("yaml")
//!     → Codec::decode(data)  → Tree (string-keyed mapping)
//! ```
//!
//! # Design Decisions
//! - The tree is `serde_json`'s model: one representation for every format
//! - Every codec must produce a mapping at the root
//! - Line-oriented formats (env, flags) infer scalar types so that typed
//!   scans work without per-field hints

pub mod env;
pub mod json;
pub mod toml;
pub mod xml;
pub mod yaml;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Number, Value as Node};

use crate::reader::tree::Tree;

/// Format tags understood out of the box.
pub const SUPPORTED_FORMATS: &[&str] = &["env", "json", "toml", "xml", "yaml", "yml"];

/// Decodes one format into a tree.
pub trait Codec: Send + Sync {
    /// Returns a human-readable message on failure; the caller wraps it
    /// with the descriptor's name and format.
    fn decode(&self, data: &[u8]) -> Result<Tree, String>;
}

/// Registry of codecs keyed by format tag.
#[derive(Clone)]
pub struct Codecs {
    codecs: HashMap<String, Arc<dyn Codec>>,
}

impl Codecs {
    /// Registry with the built-in codecs.
    pub fn new() -> Self {
        let mut codecs = Self::empty();
        codecs.register("env", env::EnvCodec);
        codecs.register("json", json::JsonCodec);
        codecs.register("toml", self::toml::TomlCodec);
        codecs.register("xml", xml::XmlCodec);
        codecs.register("yaml", yaml::YamlCodec);
        codecs.register("yml", yaml::YamlCodec);
        codecs
    }

    pub fn empty() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// Register (or replace) the codec for `format`.
    pub fn register(&mut self, format: impl Into<String>, codec: impl Codec + 'static) {
        self.codecs.insert(format.into(), Arc::new(codec));
    }

    pub fn get(&self, format: &str) -> Option<&Arc<dyn Codec>> {
        self.codecs.get(format)
    }

    pub fn formats(&self) -> Vec<&str> {
        let mut formats: Vec<&str> = self.codecs.keys().map(String::as_str).collect();
        formats.sort_unstable();
        formats
    }
}

impl Default for Codecs {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Codecs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codecs").field("formats", &self.formats()).finish()
    }
}

/// Type a textual scalar from a line-oriented source.
///
/// Only canonical spellings are converted so that values such as `007`
/// or `1_000` keep their exact text.
pub fn infer_scalar(raw: &str) -> Node {
    match raw {
        "true" => return Node::Bool(true),
        "false" => return Node::Bool(false),
        _ => {}
    }

    if let Ok(i) = raw.parse::<i64>() {
        if i.to_string() == raw {
            return Node::Number(i.into());
        }
    }

    let looks_float = raw.contains(['.', 'e', 'E'])
        && raw.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+'))
        && !raw.starts_with('.')
        && !raw.ends_with('.');
    if looks_float {
        if let Some(n) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
            return Node::Number(n);
        }
    }

    Node::String(raw.to_string())
}

/// Wrap a decoded root, rejecting anything that is not a mapping.
fn into_tree(node: Node) -> Result<Tree, String> {
    match node {
        Node::Object(map) => Ok(map),
        Node::Null => Ok(Tree::new()),
        other => Err(format!(
            "root must be a mapping, found {}",
            crate::value::Kind::of(&other)
        )),
    }
}
