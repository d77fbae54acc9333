//! Command-line flag source.

use async_trait::async_trait;

use crate::error::Result;
use crate::reader::tree::split_path;
use crate::source::{Descriptor, Source, SourceKind, Watcher};

/// Turns `--key=value`, `--key value` and bare `--key` arguments into one
/// scalar descriptor per flag, named by its dotted key.
#[derive(Debug, Clone)]
pub struct FlagSource {
    args: Vec<String>,
}

impl FlagSource {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Arguments of the current process, program name excluded.
    pub fn from_env() -> Self {
        Self::new(std::env::args().skip(1))
    }

    fn parse(&self) -> Vec<(String, String)> {
        let mut flags = Vec::new();
        let mut args = self.args.iter().peekable();

        while let Some(arg) = args.next() {
            let Some(body) = flag_body(arg) else {
                continue;
            };

            let (key, value) = match body.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => match args.peek() {
                    Some(next) if flag_body(next).is_none() => {
                        let value = next.to_string();
                        args.next();
                        (body.to_string(), value)
                    }
                    _ => (body.to_string(), "true".to_string()),
                },
            };

            if split_path(&key).is_none() {
                tracing::warn!(flag = %arg, "Ignoring flag with invalid key path");
                continue;
            }
            flags.push((key, value));
        }

        flags
    }
}

/// Strip leading dashes, or `None` when `arg` is not a flag.
fn flag_body(arg: &str) -> Option<&str> {
    let body = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-'))?;
    // "-1" is a negative value, "--" alone ends nothing we care about.
    match body.chars().next() {
        Some(c) if !c.is_ascii_digit() && c != '.' => Some(body),
        _ => None,
    }
}

#[async_trait]
impl Source for FlagSource {
    async fn load(&self) -> Result<Vec<Descriptor>> {
        Ok(self
            .parse()
            .into_iter()
            .map(|(key, value)| Descriptor::scalar(key, value))
            .collect())
    }

    async fn watch(&self) -> Result<Option<Box<dyn Watcher>>> {
        Ok(None)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Flag
    }

    fn name(&self) -> String {
        "flag".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_flag_forms() {
        let source = FlagSource::new(["--foo", "--bar=baz", "--sp", "2", "--a.b.c=d", "positional"]);
        let ds = source.load().await.unwrap();

        let pairs: Vec<(String, String)> = ds
            .iter()
            .map(|d| (d.name.clone(), String::from_utf8(d.data.clone()).unwrap()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("foo".to_string(), "true".to_string()),
                ("bar".to_string(), "baz".to_string()),
                ("sp".to_string(), "2".to_string()),
                ("a.b.c".to_string(), "d".to_string()),
            ]
        );
        assert!(ds.iter().all(Descriptor::is_scalar));
    }

    #[tokio::test]
    async fn test_negative_number_is_a_value() {
        let source = FlagSource::new(["--offset", "-1", "-v"]);
        let ds = source.load().await.unwrap();
        assert_eq!(ds[0].name, "offset");
        assert_eq!(ds[0].data, b"-1");
        assert_eq!(ds[1].name, "v");
        assert_eq!(ds[1].data, b"true");
    }

    #[tokio::test]
    async fn test_invalid_keys_are_skipped() {
        let source = FlagSource::new(["--a..b=1", "--ok=2"]);
        let ds = source.load().await.unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds[0].name, "ok");
    }
}
