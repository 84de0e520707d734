use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::buffer::CommandBuffer;
use crate::error::FetchError;
use crate::scanner::{extract_values, ExtractMode};

/// Default upper bound on the number of bytes pulled from a remote resource.
pub const DEFAULT_FETCH_LIMIT: usize = 32 * 1024;

/// Blocking fetch of at most `limit` bytes from `url`.
///
/// Transport details (scheme, TLS, redirects) are entirely the implementation's business.
pub trait RemoteFetch {
    fn fetch(&mut self, url: &str, limit: usize) -> Result<Vec<u8>, FetchError>;
}

/// HTTP(S) fetcher backed by a blocking `reqwest` client.
///
/// With no timeout configured a stalled server blocks the caller (and so the whole emulated
/// machine) indefinitely.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct HttpFetch {
    client: reqwest::blocking::Client,
}

#[cfg(not(target_arch = "wasm32"))]
impl HttpFetch {
    pub fn new(timeout: Option<std::time::Duration>) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| FetchError::Http(err.to_string()))?;
        Ok(Self { client })
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl RemoteFetch for HttpFetch {
    fn fetch(&mut self, url: &str, limit: usize) -> Result<Vec<u8>, FetchError> {
        use std::io::Read;

        let parsed =
            reqwest::Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        let resp = self
            .client
            .get(parsed)
            .send()
            .map_err(|err| FetchError::Http(err.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let mut body = Vec::new();
        resp.take(limit as u64)
            .read_to_end(&mut body)
            .map_err(|err| FetchError::Io(err.to_string()))?;
        Ok(body)
    }
}

/// Fetcher that serves canned responses from memory and records every request.
///
/// Clones share responses and the request log. Unknown URLs fail with
/// [`FetchError::HttpStatus`] 404.
#[derive(Debug, Clone, Default)]
pub struct CannedFetch {
    responses: Rc<RefCell<HashMap<String, Result<Vec<u8>, FetchError>>>>,
    requests: Rc<RefCell<Vec<String>>>,
}

impl CannedFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.responses
            .borrow_mut()
            .insert(url.into(), Ok(body.into()));
    }

    pub fn fail(&self, url: impl Into<String>, err: FetchError) {
        self.responses.borrow_mut().insert(url.into(), Err(err));
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl RemoteFetch for CannedFetch {
    fn fetch(&mut self, url: &str, limit: usize) -> Result<Vec<u8>, FetchError> {
        self.requests.borrow_mut().push(url.to_string());
        match self.responses.borrow().get(url) {
            Some(Ok(body)) => Ok(body[..body.len().min(limit)].to_vec()),
            Some(Err(err)) => Err(err.clone()),
            None => Err(FetchError::HttpStatus { status: 404 }),
        }
    }
}

/// Handle `READ_REMOTE`: treat the buffer as a URL, fetch it, and replace the buffer with the
/// values extracted from the response.
///
/// Fetch failures and empty responses both leave the buffer empty.
pub fn read_remote(
    fetch: &mut dyn RemoteFetch,
    limit: usize,
    mode: ExtractMode,
    buf: &mut CommandBuffer,
) {
    let url = String::from_utf8_lossy(buf.as_slice()).into_owned();
    buf.reset();

    let payload = match fetch.fetch(&url, limit) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!(%url, error = %err, "remote fetch failed");
            return;
        }
    };
    if payload.is_empty() {
        tracing::debug!(%url, "remote fetch returned no data");
        return;
    }

    extract_values(&payload, mode, buf);
    tracing::debug!(%url, fetched = payload.len(), len = buf.len(), "remote values extracted");
}
