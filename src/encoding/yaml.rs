//! YAML codec (`yaml` and `yml`).

use serde_json::{Number, Value as Node};
use serde_yaml::Value as Yaml;

use crate::encoding::{into_tree, Codec};
use crate::reader::tree::Tree;

pub struct YamlCodec;

impl Codec for YamlCodec {
    fn decode(&self, data: &[u8]) -> Result<Tree, String> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Tree::new());
        }
        let yaml: Yaml = serde_yaml::from_slice(data).map_err(|e| e.to_string())?;
        into_tree(convert(yaml)?)
    }
}

/// YAML allows non-string keys; they are stringified.
fn convert(yaml: Yaml) -> Result<Node, String> {
    Ok(match yaml {
        Yaml::Null => Node::Null,
        Yaml::Bool(b) => Node::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Node::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Node::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map(Node::Number)
                    .ok_or_else(|| format!("unrepresentable number {}", n))?
            }
        }
        Yaml::String(s) => Node::String(s),
        Yaml::Sequence(items) => Node::Array(items.into_iter().map(convert).collect::<Result<_, _>>()?),
        Yaml::Mapping(mapping) => {
            let mut tree = Tree::new();
            for (k, v) in mapping {
                let key = match k {
                    Yaml::String(s) => s,
                    Yaml::Bool(b) => b.to_string(),
                    Yaml::Number(n) => n.to_string(),
                    other => return Err(format!("unsupported mapping key {:?}", other)),
                };
                tree.insert(key, convert(v)?);
            }
            Node::Object(tree)
        }
        Yaml::Tagged(tagged) => convert(tagged.value)?,
    })
}
