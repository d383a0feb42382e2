use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, bail};
use serde::Deserialize;
use url::Url;

/// Environment variable naming an optional YAML config file.
pub const CONFIG_ENV: &str = "CATNAP_CONFIG";

/// Where a listener binds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Endpoint {
    Tcp(SocketAddr),
    Unix { path: PathBuf, anonymous: bool },
}

impl FromStr for Endpoint {
    type Err = anyhow::Error;

    /// Accepts `127.0.0.1:8080`, `tcp://host:port` or
    /// `unix:///path/to.sock[?anonymous=true]`.
    fn from_str(s: &str) -> anyhow::Result<Self> {
        if let Ok(addr) = s.parse::<SocketAddr>() {
            return Ok(Endpoint::Tcp(addr));
        }

        let url = Url::parse(s).with_context(|| format!("invalid endpoint '{s}'"))?;
        match url.scheme() {
            "tcp" | "http" => {
                let addr = url
                    .socket_addrs(|| None)
                    .with_context(|| format!("cannot resolve endpoint '{s}'"))?
                    .into_iter()
                    .next()
                    .with_context(|| format!("endpoint '{s}' resolved to no address"))?;
                Ok(Endpoint::Tcp(addr))
            }
            "unix" => {
                let anonymous = url
                    .query_pairs()
                    .any(|(k, v)| k == "anonymous" && v != "false");
                Ok(Endpoint::Unix {
                    path: PathBuf::from(url.path()),
                    anonymous,
                })
            }
            other => bail!("unsupported endpoint scheme '{other}' in '{s}'"),
        }
    }
}

impl TryFrom<String> for Endpoint {
    type Error = anyhow::Error;

    fn try_from(s: String) -> anyhow::Result<Self> {
        s.parse()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "tcp://{addr}"),
            Endpoint::Unix { path, .. } => write!(f, "unix://{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen: Vec<Endpoint>,
    pub doc_root: String,
    /// Runtime worker threads; `None` uses one per core.
    pub workers: Option<usize>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: vec![Endpoint::Tcp(SocketAddr::from(([127, 0, 0, 1], 8080)))],
            doc_root: ".".to_string(),
            workers: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads the config file named by `CATNAP_CONFIG`, if any, then applies
    /// `LISTEN`, `DOC_ROOT`, `WORKERS` and `LOG_LEVEL` from the environment.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`] with a custom variable lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match lookup(CONFIG_ENV) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        if let Some(listen) = lookup("LISTEN") {
            cfg.listen = listen
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(Endpoint::from_str)
                .collect::<anyhow::Result<_>>()
                .context("invalid LISTEN")?;
        }
        if let Some(root) = lookup("DOC_ROOT") {
            cfg.doc_root = root;
        }
        if let Some(workers) = lookup("WORKERS") {
            cfg.workers = Some(workers.parse().context("invalid WORKERS")?);
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            cfg.log_level = level;
        }

        Ok(cfg)
    }

    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{path}'"))?;
        Self::from_yaml_str(&text).with_context(|| format!("in config file '{path}'"))
    }

    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(text).context("invalid configuration")
    }

    pub fn log_level(&self) -> anyhow::Result<tracing::Level> {
        self.log_level
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid log level '{}'", self.log_level))
    }
}
