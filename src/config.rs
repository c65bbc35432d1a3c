use anyhow::Context;
use serde::Deserialize;

/// Port used when neither the config file nor `LISTEN` supplies an address.
///
/// Overridable at build time: `CHUNKSERVE_HTTP_PORT=8080 cargo build`.
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// Capacity of the per-connection transfer buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Smallest buffer that can still hold a request line.
pub const MIN_BUFFER_SIZE: usize = 32;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub static_files: StaticFilesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

/// Where files are served from and how they are streamed.
#[derive(Debug, Clone, Deserialize)]
pub struct StaticFilesConfig {
    /// Prefix prepended verbatim to the request target.
    #[serde(default = "default_root")]
    pub root: String,
    /// Appended to targets ending in `/`.
    #[serde(default = "default_index_file")]
    pub index_file: String,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_http_port() -> u16 {
    option_env!("CHUNKSERVE_HTTP_PORT")
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_HTTP_PORT)
}

fn default_listen_addr() -> String {
    format!("0.0.0.0:{}", default_http_port())
}

fn default_root() -> String {
    ".".to_string()
}

fn default_index_file() -> String {
    "index.html".to_string()
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            index_file: default_index_file(),
            buffer_size: default_buffer_size(),
        }
    }
}

impl Config {
    /// Loads the YAML file named by `CHUNKSERVE_CONFIG` (defaults when unset),
    /// then applies the `LISTEN` override.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("CHUNKSERVE_CONFIG") {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config file {}", path))?;
                Self::from_yaml(&raw).with_context(|| format!("invalid config file {}", path))?
            }
            Err(_) => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var("LISTEN") {
            cfg.server.listen_addr = listen_addr;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.listen_addr.trim().is_empty() {
            anyhow::bail!("server.listen_addr must not be empty");
        }
        if self.static_files.index_file.is_empty() || self.static_files.index_file.contains('/') {
            anyhow::bail!(
                "static_files.index_file must be a plain file name, got {:?}",
                self.static_files.index_file
            );
        }
        if self.static_files.buffer_size < MIN_BUFFER_SIZE {
            anyhow::bail!(
                "static_files.buffer_size must be at least {} bytes, got {}",
                MIN_BUFFER_SIZE,
                self.static_files.buffer_size
            );
        }
        Ok(())
    }
}
