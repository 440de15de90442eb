//! libcurl-backed GET.

use std::time::Duration;

use super::{FetchError, Fetcher};

/// Connect phase limit; the overall request timeout still bounds the whole call.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// One blocking `curl::easy::Easy` transfer per call. Runs on the calling
/// thread; the orchestrator calls it from `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct CurlFetcher {
    user_agent: String,
}

impl CurlFetcher {
    pub fn new() -> Self {
        Self {
            user_agent: format!("skyfetch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for CurlFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for CurlFetcher {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        let mut body = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.useragent(&self.user_agent)?;
        easy.connect_timeout(CONNECT_TIMEOUT.min(timeout))?;
        easy.timeout(timeout)?;

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        if code != 200 {
            return Err(FetchError::Rejected { status: code });
        }
        Ok(body)
    }
}
