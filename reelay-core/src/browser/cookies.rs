use std::path::{Path, PathBuf};

use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use serde::Deserialize;

use super::error::{BrowserError, BrowserResult};

/// One entry of the externally produced session blob: a JSON array of
/// cookies exported from an authenticated browser session.
#[derive(Debug, Clone, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, rename = "httpOnly")]
    pub http_only: bool,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

/// The publisher's authentication material. Absent or undecodable blobs
/// are startup failures: the process must exit rather than drive a UI it
/// cannot authenticate against.
#[derive(Debug, Clone)]
pub struct SessionCookies {
    path: PathBuf,
    records: Vec<CookieRecord>,
}

impl SessionCookies {
    pub fn load(path: impl Into<PathBuf>) -> BrowserResult<Self> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path).map_err(|err| BrowserError::Session {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        let records: Vec<CookieRecord> =
            serde_json::from_str(&contents).map_err(|err| BrowserError::Session {
                path: path.clone(),
                reason: format!("not a JSON cookie array: {err}"),
            })?;
        if records.is_empty() {
            return Err(BrowserError::Session {
                path,
                reason: "cookie array is empty".to_string(),
            });
        }
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_params(&self) -> BrowserResult<Vec<CookieParam>> {
        self.records
            .iter()
            .map(|record| {
                CookieParam::builder()
                    .name(record.name.clone())
                    .value(record.value.clone())
                    .domain(record.domain.clone())
                    .path(record.path.clone())
                    .secure(record.secure)
                    .http_only(record.http_only)
                    .build()
                    .map_err(|err| BrowserError::Session {
                        path: self.path.clone(),
                        reason: format!("cookie {} rejected: {err}", record.name),
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_blob_fails_fast() {
        let err = SessionCookies::load("/nonexistent/session.json").unwrap_err();
        assert!(matches!(err, BrowserError::Session { .. }));
    }

    #[test]
    fn empty_array_fails_fast() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[]").unwrap();
        file.flush().unwrap();
        assert!(SessionCookies::load(file.path()).is_err());
    }

    #[test]
    fn valid_blob_converts_to_params() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name":"sessionid","value":"abc","domain":".example.com","httpOnly":true,"secure":true}}]"#
        )
        .unwrap();
        file.flush().unwrap();
        let cookies = SessionCookies::load(file.path()).unwrap();
        assert_eq!(cookies.len(), 1);
        let params = cookies.to_params().unwrap();
        assert_eq!(params.len(), 1);
    }
}
