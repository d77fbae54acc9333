//! Environment variable source.

use async_trait::async_trait;

use crate::error::Result;
use crate::source::{Descriptor, Source, SourceKind, Watcher};

/// Descriptor name used for the environment snapshot.
pub const ENV_DESCRIPTOR: &str = "environ";

/// Snapshots variables sharing a prefix into one `env`-format descriptor.
///
/// `APP_SERVICE_NAME=x` with prefix `APP` becomes the line `SERVICE_NAME=x`,
/// which the env codec maps to `service.name`.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
    vars: Option<Vec<(String, String)>>,
}

impl EnvSource {
    /// Read from the process environment.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            vars: None,
        }
    }

    /// Read from a fixed variable list instead of the process environment.
    pub fn from_vars<I, K, V>(prefix: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix: prefix.into(),
            vars: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    fn render(&self) -> String {
        let vars: Vec<(String, String)> = match &self.vars {
            Some(vars) => vars.clone(),
            None => std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        };

        let mut out = String::new();
        for (key, value) in vars {
            let Some(rest) = key.strip_prefix(self.prefix.as_str()) else {
                continue;
            };
            let rest = rest.strip_prefix('_').unwrap_or(rest);
            if rest.is_empty() || value.contains('\n') {
                continue;
            }
            out.push_str(rest);
            out.push('=');
            out.push_str(&value);
            out.push('\n');
        }
        out
    }
}

#[async_trait]
impl Source for EnvSource {
    async fn load(&self) -> Result<Vec<Descriptor>> {
        Ok(vec![Descriptor::new(ENV_DESCRIPTOR, "env", self.render())])
    }

    async fn watch(&self) -> Result<Option<Box<dyn Watcher>>> {
        Ok(None)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Env
    }

    fn name(&self) -> String {
        format!("env({})", self.prefix)
    }
}
