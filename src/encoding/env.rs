//! `KEY=VALUE` line codec used by the environment source.
//!
//! `SERVICE_NAME=app` becomes `{service: {name: "app"}}`.

use crate::encoding::{infer_scalar, Codec};
use crate::reader::tree::{insert_path, Tree};

pub struct EnvCodec;

impl Codec for EnvCodec {
    fn decode(&self, data: &[u8]) -> Result<Tree, String> {
        let text = std::str::from_utf8(data).map_err(|e| e.to_string())?;
        let mut tree = Tree::new();

        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| format!("line {}: expected KEY=VALUE", lineno + 1))?;

            let path = key.trim().to_lowercase().replace('_', ".");
            let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
            if segments.is_empty() {
                return Err(format!("line {}: empty key", lineno + 1));
            }

            insert_path(&mut tree, &segments, infer_scalar(unquote(value.trim())));
        }

        Ok(tree)
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_env() {
        let data = "service_name=sraph_app\naddr=192.168.0.1\nAGE=20\n# comment\n\nexport DEBUG='true'\n";
        let tree = EnvCodec.decode(data.as_bytes()).unwrap();
        assert_eq!(tree["service"]["name"], json!("sraph_app"));
        assert_eq!(tree["addr"], json!("192.168.0.1"));
        assert_eq!(tree["age"], json!(20));
        assert_eq!(tree["debug"], json!(true));
    }

    #[test]
    fn test_values_may_contain_equals() {
        let tree = EnvCodec.decode(b"DSN=user=a;pass=b\n").unwrap();
        assert_eq!(tree["dsn"], json!("user=a;pass=b"));
    }

    #[test]
    fn test_later_line_overrides() {
        let tree = EnvCodec.decode(b"LOG=1\nLOG_LEVEL=warn\n").unwrap();
        assert_eq!(tree["log"]["level"], json!("warn"));
    }

    #[test]
    fn test_malformed_line() {
        assert!(EnvCodec.decode(b"NOVALUE\n").is_err());
    }
}
