//! Asset Fetching Module
//!
//! Builds the URLs of data pages, the background asset and fonts, and
//! resolves them to raw bytes.

use crate::error::{Error, Result};
use log::debug;
use reqwest::blocking::Client;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = concat!("passports/", env!("CARGO_PKG_VERSION"));

/// Anything that can turn an asset URL into bytes.
///
/// The rasterizer and the font loader only ever talk to this trait, so a run
/// can be driven entirely from memory.
pub trait AssetSource: Send + Sync {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>>;
}

/// Fetches `http(s)` URLs over the network and `file` URLs from disk.
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::network("<client>", format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl AssetSource for HttpSource {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        match url.scheme() {
            "http" | "https" => {
                debug!("GET {}", url);
                let response = self
                    .client
                    .get(url.as_str())
                    .send()
                    .and_then(|resp| resp.error_for_status())
                    .map_err(|e| Error::network(url, e))?;
                let body = response.bytes().map_err(|e| Error::network(url, e))?;
                Ok(body.to_vec())
            }
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| Error::network(url, "not a local file path"))?;
                debug!("Reading {:?}", path);
                fs::read(&path).map_err(|e| Error::network(url, e))
            }
            other => Err(Error::network(url, format!("unsupported scheme '{}'", other))),
        }
    }
}

/// URL of the data page image for `index`, i.e. `{base}/{index}.png`.
pub fn data_page_url(base: &Url, index: u32) -> Result<Url> {
    base.join(&format!("/{}.png", index))
        .map_err(|e| Error::Layout(format!("cannot build data page URL for {}: {}", index, e)))
}

/// URL of the fixed background asset placed next to every data page.
pub fn background_url(base: &Url, path: &str) -> Result<Url> {
    base.join(path)
        .map_err(|e| Error::Layout(format!("cannot build background URL from '{}': {}", path, e)))
}

/// `file://` URL of a font inside `dir`. Relative directories are resolved
/// against the current working directory.
pub fn font_url(dir: &Path, file: &str) -> Result<Url> {
    let path = dir.join(file);
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(|e| Error::network(path.display(), e))?
            .join(path)
    };
    Url::from_file_path(&absolute)
        .map_err(|_| Error::network(absolute.display(), "cannot express path as a file URL"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://data.passports.purduehackers.com").unwrap()
    }

    #[test]
    fn data_page_url_appends_index() {
        let url = data_page_url(&base(), 42).unwrap();
        assert_eq!(url.as_str(), "https://data.passports.purduehackers.com/42.png");
    }

    #[test]
    fn data_page_url_replaces_base_path() {
        let base = Url::parse("https://example.com/some/dir/").unwrap();
        let url = data_page_url(&base, 0).unwrap();
        assert_eq!(url.as_str(), "https://example.com/0.png");
    }

    #[test]
    fn background_url_is_fixed() {
        let url = background_url(&base(), "/page-1-second-half.png").unwrap();
        assert_eq!(
            url.as_str(),
            "https://data.passports.purduehackers.com/page-1-second-half.png"
        );
    }

    #[test]
    fn font_url_is_absolute_file_url() {
        let url = font_url(Path::new("assets"), "Inter-Regular.ttf").unwrap();
        assert_eq!(url.scheme(), "file");
        assert!(url.path().ends_with("/assets/Inter-Regular.ttf"));
    }

    #[test]
    fn http_source_reads_file_urls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        fs::write(&path, b"bytes").unwrap();
        let url = Url::from_file_path(&path).unwrap();

        let source = HttpSource::new(Duration::from_secs(1)).unwrap();
        assert_eq!(source.fetch(&url).unwrap(), b"bytes");
    }

    #[test]
    fn http_source_reports_missing_files_as_network_errors() {
        let dir = tempfile::tempdir().unwrap();
        let url = Url::from_file_path(dir.path().join("missing.ttf")).unwrap();

        let source = HttpSource::new(Duration::from_secs(1)).unwrap();
        assert!(matches!(source.fetch(&url), Err(Error::Network { .. })));
    }

    #[test]
    fn http_source_rejects_unknown_schemes() {
        let source = HttpSource::new(Duration::from_secs(1)).unwrap();
        let url = Url::parse("ftp://example.com/1.png").unwrap();
        assert!(matches!(source.fetch(&url), Err(Error::Network { .. })));
    }
}
