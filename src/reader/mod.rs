//! Merged configuration tree.
//!
//! # Data Flow
//! ```text
//! Descriptor(s)
//!     → decode (codec by format, or dotted-path scalar for empty format)
//!     → merge into raw tree (last merge wins per path, mappings combine)
//!     → resolve: raw tree → resolved tree (placeholders expanded)
//!     → value(path) / source()
//! ```
//!
//! # Design Decisions
//! - The raw tree is kept next to the resolved one so that placeholders are
//!   re-evaluated after every merge and resolve stays idempotent
//! - Merge also folds into the resolved view, so values are readable
//!   before the first resolve
//! - One `RwLock` guards both trees. Decoding and resolving happen outside
//!   it; a resolve whose input was overtaken by a merge is recomputed

pub mod resolver;
pub mod tree;

use parking_lot::RwLock;
use serde_json::Value as Node;

use crate::encoding::{infer_scalar, Codecs};
use crate::error::{ConfigError, Result};
use crate::source::Descriptor;
use crate::value::Value;

use tree::{get_path, insert_path, merge_into, split_path, Tree};

#[derive(Default)]
struct Trees {
    raw: Tree,
    resolved: Tree,
    /// Bumped on every merge.
    generation: u64,
}

/// Owns the merged tree and answers path lookups.
pub struct Reader {
    codecs: Codecs,
    trees: RwLock<Trees>,
}

impl Reader {
    pub fn new(codecs: Codecs) -> Self {
        Self {
            codecs,
            trees: RwLock::new(Trees::default()),
        }
    }

    /// Decode one descriptor into a sub-tree without touching the merged tree.
    pub fn decode(&self, descriptor: &Descriptor) -> Result<Tree> {
        if descriptor.is_scalar() {
            return decode_scalar(descriptor);
        }

        let codec = self
            .codecs
            .get(&descriptor.format)
            .ok_or_else(|| ConfigError::UnsupportedFormat {
                name: descriptor.name.clone(),
                format: descriptor.format.clone(),
            })?;

        codec.decode(&descriptor.data).map_err(|message| ConfigError::Decode {
            name: descriptor.name.clone(),
            format: descriptor.format.clone(),
            message,
        })
    }

    /// Fold descriptors in order; later ones override earlier ones.
    ///
    /// Descriptors before a failing one stay merged.
    pub fn merge(&self, descriptors: &[Descriptor]) -> Result<()> {
        for descriptor in descriptors {
            let sub_tree = self.decode(descriptor)?;
            let mut trees = self.trees.write();
            merge_into(&mut trees.raw, sub_tree.clone());
            merge_into(&mut trees.resolved, sub_tree);
            trees.generation += 1;
        }
        Ok(())
    }

    /// Rebuild the resolved tree from the raw one.
    pub fn resolve(&self) -> Result<()> {
        loop {
            let (raw, generation) = {
                let trees = self.trees.read();
                (trees.raw.clone(), trees.generation)
            };
            let resolved = resolver::resolve(&raw);

            let mut trees = self.trees.write();
            if trees.generation == generation {
                trees.resolved = resolved;
                return Ok(());
            }
        }
    }

    /// Resolved node at `path`.
    pub fn lookup(&self, path: &str) -> Option<Node> {
        let segments = split_path(path)?;
        let trees = self.trees.read();
        get_path(&trees.resolved, &segments).cloned()
    }

    /// A fresh `Value` for `path`, or `None` when absent or malformed.
    pub fn value(&self, path: &str) -> Option<Value> {
        self.lookup(path).map(|node| Value::new(path, node))
    }

    /// Serialize the resolved tree as compact JSON with sorted keys.
    pub fn source(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.trees.read().resolved).map_err(ConfigError::Encode)
    }

    /// Copy of the resolved tree.
    pub fn snapshot(&self) -> Tree {
        self.trees.read().resolved.clone()
    }
}

impl Default for Reader {
    fn default() -> Self {
        Self::new(Codecs::new())
    }
}

fn decode_scalar(descriptor: &Descriptor) -> Result<Tree> {
    let decode_error = |message: String| ConfigError::Decode {
        name: descriptor.name.clone(),
        format: descriptor.format.clone(),
        message,
    };

    let segments = split_path(&descriptor.name)
        .ok_or_else(|| decode_error(format!("invalid key path {:?}", descriptor.name)))?;
    let text = std::str::from_utf8(&descriptor.data).map_err(|e| decode_error(e.to_string()))?;

    let mut tree = Tree::new();
    insert_path(&mut tree, &segments, infer_scalar(text));
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_descriptor(name: &str, body: &str) -> Descriptor {
        Descriptor::new(name, "json", body.as_bytes().to_vec())
    }

    #[test]
    fn test_reader_merge() {
        let r = Reader::default();
        let err = r.merge(&[json_descriptor("a", "bad")]).unwrap_err();
        assert!(matches!(err, ConfigError::Decode { ref name, .. } if name == "a"));

        r.merge(&[json_descriptor("b", r#"{"nice": "boat", "x": 1}"#)]).unwrap();
        assert_eq!(r.value("nice").unwrap().string().unwrap(), "boat");

        r.merge(&[json_descriptor("b", r#"{"x": 2}"#)]).unwrap();
        assert_eq!(r.value("x").unwrap().int().unwrap(), 2);
        assert_eq!(r.value("nice").unwrap().string().unwrap(), "boat");
    }

    #[test]
    fn test_unsupported_format() {
        let r = Reader::default();
        let err = r.merge(&[Descriptor::new("app.ini", "ini", b"a=1".to_vec())]).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { ref format, .. } if format == "ini"));
    }

    #[test]
    fn test_merge_precedence_is_last_wins() {
        let low = json_descriptor("low", r#"{"x": {"y": "low"}}"#);
        let high = json_descriptor("high", r#"{"x": {"y": "high"}}"#);

        let r = Reader::default();
        r.merge(&[low.clone(), high.clone()]).unwrap();
        r.resolve().unwrap();
        assert_eq!(r.lookup("x.y"), Some(json!("high")));

        let r = Reader::default();
        r.merge(&[high, low]).unwrap();
        r.resolve().unwrap();
        assert_eq!(r.lookup("x.y"), Some(json!("low")));
    }

    #[test]
    fn test_scalar_descriptor() {
        let r = Reader::default();
        r.merge(&[
            json_descriptor("file", r#"{"log": {"level": "info", "file": "a.log"}}"#),
            Descriptor::scalar("log.level", "warn"),
            Descriptor::scalar("server.port", "8080"),
        ])
        .unwrap();
        assert_eq!(r.lookup("log.level"), Some(json!("warn")));
        assert_eq!(r.lookup("log.file"), Some(json!("a.log")));
        assert_eq!(r.lookup("server.port"), Some(json!(8080)));

        let err = r.merge(&[Descriptor::scalar("a..b", "1")]).unwrap_err();
        assert!(matches!(err, ConfigError::Decode { .. }));
    }

    #[test]
    fn test_reader_value() {
        let yaml = "
a:
  b:
    X: 1
    Y: \"lol\"
    z: true
";
        let cases = vec![
            json_descriptor("config", r#"{"a": {"b": {"X": 1, "Y": "lol", "z": true}}}"#),
            Descriptor::new("config", "yaml", yaml.as_bytes().to_vec()),
        ];

        for descriptor in cases {
            let r = Reader::default();
            r.merge(&[descriptor]).unwrap();
            r.resolve().unwrap();

            assert_eq!(r.value("a.b.X").unwrap().int().unwrap(), 1);
            assert_eq!(r.value("a.b.Y").unwrap().string().unwrap(), "lol");
            assert!(r.value("a.b.z").unwrap().bool().unwrap());

            assert!(r.value("aasasdg=234l.asdfk,").is_none());
            assert!(r.value("aas......asdg=234l.asdfk,").is_none());
            assert!(r.value("a.b.Y.").is_none());
            assert!(r.value("").is_none());
            assert!(r.value("a..b").is_none());
            assert!(r.value("a.b.Y.deeper").is_none());
        }
    }

    #[test]
    fn test_resolve_follows_merges() {
        let r = Reader::default();
        r.merge(&[json_descriptor("f", r#"{"a": "1", "b": "${a}-x"}"#)]).unwrap();
        r.resolve().unwrap();
        assert_eq!(r.lookup("b"), Some(json!("1-x")));

        r.merge(&[json_descriptor("f", r#"{"a": "2"}"#)]).unwrap();
        r.resolve().unwrap();
        assert_eq!(r.lookup("b"), Some(json!("2-x")));

        let before = r.snapshot();
        r.resolve().unwrap();
        assert_eq!(r.snapshot(), before);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let r = Reader::default();
        r.merge(&[json_descriptor(
            "f",
            r#"{"y": "secret", "b": "${missing:${y}}", "c": ["${b}", "$5"], "d": "${b}-x"}"#,
        )])
        .unwrap();
        r.resolve().unwrap();
        let once = r.snapshot();
        assert_eq!(once["b"], json!("${y}"));
        assert_eq!(once["d"], json!("${y}-x"));

        r.resolve().unwrap();
        r.resolve().unwrap();
        assert_eq!(r.snapshot(), once);
    }

    #[test]
    fn test_resolve_with_cycle_finishes() {
        let r = Reader::default();
        r.merge(&[json_descriptor("f", r#"{"a": "${a}${a}${a}", "b": "ok"}"#)])
            .unwrap();
        r.resolve().unwrap();
        assert_eq!(r.lookup("a"), Some(json!("")));
        assert_eq!(r.lookup("b"), Some(json!("ok")));
    }

    #[test]
    fn test_reader_source() {
        let r = Reader::default();
        r.merge(&[json_descriptor("b", r#"{"a": {"b": {"X": 1}}}"#)]).unwrap();
        r.resolve().unwrap();
        assert_eq!(r.source().unwrap(), br#"{"a":{"b":{"X":1}}}"#.to_vec());
    }

    #[test]
    fn test_source_round_trip() {
        let r = Reader::default();
        r.merge(&[
            json_descriptor("one", r#"{"svc": {"name": "api", "tags": ["a", "b"]}, "n": 1.5}"#),
            Descriptor::new("two", "toml", b"[svc]\nport = 80\nurl = \"http://${svc.name}\"\n".to_vec()),
        ])
        .unwrap();
        r.resolve().unwrap();

        let bytes = r.source().unwrap();
        let decoded = Reader::default()
            .decode(&Descriptor::new("roundtrip", "json", bytes))
            .unwrap();
        assert_eq!(decoded, r.snapshot());
        assert_eq!(decoded["svc"]["url"], json!("http://api"));
    }
}
