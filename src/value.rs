//! Typed, hot-swappable accessor for one resolved node.
//!
//! # Design Decisions
//! - A `Value` is a cheap handle: clones share one `ArcSwapOption` slot, so
//!   a `store` from the watch loop is seen by every holder
//! - Loads are lock-free; a store never blocks readers
//! - An empty slot is the "not found" sentinel; every accessor then fails
//!   with `ConfigError::NotFound`

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use serde::de::DeserializeOwned;
use serde_json::Value as Node;

use crate::error::{ConfigError, Result};

/// Shape of a node, used to decide whether a hot update may be applied in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Bool,
    Int,
    Float,
    String,
    Map,
    Seq,
}

impl Kind {
    pub fn of(node: &Node) -> Self {
        match node {
            Node::Null => Kind::Null,
            Node::Bool(_) => Kind::Bool,
            Node::Number(n) if n.is_f64() => Kind::Float,
            Node::Number(_) => Kind::Int,
            Node::String(_) => Kind::String,
            Node::Array(_) => Kind::Seq,
            Node::Object(_) => Kind::Map,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::Map => "mapping",
            Kind::Seq => "sequence",
        };
        f.write_str(name)
    }
}

/// Accessor for the node at one dotted path.
#[derive(Clone)]
pub struct Value {
    path: Arc<str>,
    slot: Arc<ArcSwapOption<Node>>,
}

impl Value {
    pub fn new(path: impl Into<Arc<str>>, node: Node) -> Self {
        Self {
            path: path.into(),
            slot: Arc::new(ArcSwapOption::from_pointee(node)),
        }
    }

    /// The sentinel returned for paths with no match.
    pub fn not_found(path: impl Into<Arc<str>>) -> Self {
        Self {
            path: path.into(),
            slot: Arc::new(ArcSwapOption::empty()),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_found(&self) -> bool {
        self.slot.load().is_some()
    }

    /// Current node, or `None` for the not-found sentinel.
    pub fn load(&self) -> Option<Arc<Node>> {
        self.slot.load_full()
    }

    /// Atomically replace the content seen by every holder of this value.
    pub fn store(&self, node: Node) {
        self.slot.store(Some(Arc::new(node)));
    }

    /// `None` for the not-found sentinel.
    pub fn kind(&self) -> Option<Kind> {
        self.slot.load().as_deref().map(Kind::of)
    }

    /// True when both handles share the same slot.
    pub fn same_slot(&self, other: &Value) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    fn node(&self) -> Result<Arc<Node>> {
        self.load()
            .ok_or_else(|| ConfigError::NotFound(self.path.to_string()))
    }

    fn mismatch(&self, expected: &'static str, node: &Node) -> ConfigError {
        ConfigError::TypeAssert {
            path: self.path.to_string(),
            expected,
            found: Kind::of(node).to_string(),
        }
    }

    /// Clone of the raw node.
    pub fn raw(&self) -> Result<Node> {
        Ok(self.node()?.as_ref().clone())
    }

    pub fn string(&self) -> Result<String> {
        let node = self.node()?;
        match node.as_ref() {
            Node::String(s) => Ok(s.clone()),
            Node::Bool(b) => Ok(b.to_string()),
            Node::Number(n) => Ok(n.to_string()),
            other => Err(self.mismatch("string", other)),
        }
    }

    pub fn int(&self) -> Result<i64> {
        let node = self.node()?;
        match node.as_ref() {
            Node::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Ok(i);
                }
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                        Ok(f as i64)
                    }
                    _ => Err(self.mismatch("int", &node)),
                }
            }
            Node::String(s) => s.trim().parse().map_err(|_| self.mismatch("int", &node)),
            other => Err(self.mismatch("int", other)),
        }
    }

    pub fn float(&self) -> Result<f64> {
        let node = self.node()?;
        match node.as_ref() {
            Node::Number(n) => n.as_f64().ok_or_else(|| self.mismatch("float", &node)),
            Node::String(s) => s.trim().parse().map_err(|_| self.mismatch("float", &node)),
            other => Err(self.mismatch("float", other)),
        }
    }

    pub fn bool(&self) -> Result<bool> {
        let node = self.node()?;
        match node.as_ref() {
            Node::Bool(b) => Ok(*b),
            Node::String(s) => parse_bool(s.trim()).ok_or_else(|| self.mismatch("bool", &node)),
            other => Err(self.mismatch("bool", other)),
        }
    }

    /// Integers are nanoseconds; strings use unit suffixes (`300ms`, `1h30m`).
    pub fn duration(&self) -> Result<Duration> {
        let node = self.node()?;
        match node.as_ref() {
            Node::Number(n) => n
                .as_u64()
                .map(Duration::from_nanos)
                .ok_or_else(|| self.mismatch("duration", &node)),
            Node::String(s) => parse_duration(s.trim()).ok_or_else(|| self.mismatch("duration", &node)),
            other => Err(self.mismatch("duration", other)),
        }
    }

    /// Deserialize the node into `T`.
    pub fn scan<T: DeserializeOwned>(&self) -> Result<T> {
        let node = self.node()?;
        T::deserialize(node.as_ref()).map_err(ConfigError::Scan)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("path", &self.path)
            .field("node", &self.load())
            .finish()
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Parse `1h30m`, `1.5s`, `300ms`, `10us`, or a bare nanosecond count.
pub fn parse_duration(s: &str) -> Option<Duration> {
    if s.is_empty() {
        return None;
    }
    if let Ok(nanos) = s.parse::<u64>() {
        return Some(Duration::from_nanos(nanos));
    }

    let mut total = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return None;
        }
        let number: f64 = rest[..number_len].parse().ok()?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return None,
        };
        rest = &rest[unit_len..];
        total += number * nanos_per_unit;
    }

    if !total.is_finite() || total > u64::MAX as f64 {
        return None;
    }
    Some(Duration::from_nanos(total.round() as u64))
}
