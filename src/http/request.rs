use std::path::PathBuf;

use crate::config::StaticFilesConfig;
use crate::http::parser::{ParseError, parse_request_line};

/// A request reduced to what the server acts on: the raw target and the
/// filesystem path it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The target as sent by the client (e.g. "/index.html")
    pub target: String,
    /// `root` + target, with the index file appended for directory targets
    pub path: PathBuf,
}

impl Request {
    /// Parses the first chunk read from a client and resolves its target.
    ///
    /// # Example
    ///
    /// ```
    /// # use chunkserve::config::StaticFilesConfig;
    /// # use chunkserve::http::request::Request;
    /// let req = Request::resolve(b"GET / HTTP/1.1\r\n\r\n", &StaticFilesConfig::default()).unwrap();
    /// assert_eq!(req.path.to_str(), Some("./index.html"));
    /// ```
    pub fn resolve(buf: &[u8], cfg: &StaticFilesConfig) -> Result<Self, ParseError> {
        let target = parse_request_line(buf)?;
        Ok(Self {
            target: target.to_string(),
            path: resolve_path(target, cfg),
        })
    }
}

/// Maps a request target onto the document root.
///
/// The root is a plain string prefix and `..` segments are passed through
/// untouched: a target such as `/../etc/passwd` escapes the root. Deploy
/// behind something that normalizes paths if that matters.
pub fn resolve_path(target: &str, cfg: &StaticFilesConfig) -> PathBuf {
    let mut path = String::with_capacity(cfg.root.len() + target.len() + cfg.index_file.len());
    path.push_str(&cfg.root);
    path.push_str(target);
    if path.ends_with('/') {
        path.push_str(&cfg.index_file);
    }
    PathBuf::from(path)
}
