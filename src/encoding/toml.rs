//! TOML codec.

use serde_json::{Number, Value as Node};

use crate::encoding::Codec;
use crate::reader::tree::Tree;

pub struct TomlCodec;

impl Codec for TomlCodec {
    fn decode(&self, data: &[u8]) -> Result<Tree, String> {
        let text = std::str::from_utf8(data).map_err(|e| e.to_string())?;
        let table: ::toml::Table = text.parse().map_err(|e: ::toml::de::Error| e.to_string())?;
        Ok(convert_table(table))
    }
}

fn convert_table(table: ::toml::Table) -> Tree {
    table.into_iter().map(|(k, v)| (k, convert(v))).collect()
}

fn convert(value: ::toml::Value) -> Node {
    match value {
        ::toml::Value::String(s) => Node::String(s),
        ::toml::Value::Integer(i) => Node::Number(i.into()),
        ::toml::Value::Float(f) => Number::from_f64(f).map(Node::Number).unwrap_or(Node::Null),
        ::toml::Value::Boolean(b) => Node::Bool(b),
        ::toml::Value::Datetime(dt) => Node::String(dt.to_string()),
        ::toml::Value::Array(items) => Node::Array(items.into_iter().map(convert).collect()),
        ::toml::Value::Table(table) => Node::Object(convert_table(table)),
    }
}
