//! OKX public REST endpoints and request signing

use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use sha2::Sha256;
use tracing::debug;

use super::messages::{OkxBook, OkxCandle, OkxInstrument, OkxResponse, OkxRestTrade};
use crate::error::{FeedError, FeedResult};

type HmacSha256 = Hmac<Sha256>;

/// Production REST endpoint
pub const OKX_HTTP_URL: &str = "https://www.okx.com";

/// Most records OKX returns per market-data page
pub const OKX_PAGE_LIMIT: usize = 100;

/// Signs `timestamp + method + path` with the API secret, base64 encoded
///
/// # Errors
///
/// Returns [`FeedError::InvalidConfig`] if the secret is unusable as an HMAC key.
pub fn sign(secret: &str, timestamp: &str, method: &str, path: &str) -> FeedResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| FeedError::InvalidConfig(format!("api secret: {e}")))?;
    mac.update(timestamp.as_bytes());
    mac.update(method.as_bytes());
    mac.update(path.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Thin client over the public market-data endpoints
#[derive(Debug, Clone)]
pub struct OkxHttpClient {
    client: reqwest::Client,
    base_url: String,
}

impl OkxHttpClient {
    /// Creates a client for `base_url`
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: Option<String>, timeout_secs: u64) -> FeedResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or_else(|| OKX_HTTP_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> FeedResult<Vec<T>> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, ?query, "OKX GET");
        let response: OkxResponse<T> = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if response.code != "0" {
            return Err(FeedError::Transport(format!(
                "{path} returned code {}: {}",
                response.code, response.msg
            )));
        }
        Ok(response.data)
    }

    /// Instrument definitions of one type (`SPOT`, `SWAP`)
    ///
    /// # Errors
    ///
    /// Returns transport or decode errors.
    pub async fn instruments(
        &self,
        inst_type: &str,
        inst_id: Option<&str>,
    ) -> FeedResult<Vec<OkxInstrument>> {
        let mut query = vec![("instType", inst_type.to_string())];
        if let Some(inst_id) = inst_id {
            query.push(("instId", inst_id.to_string()));
        }
        self.get("/api/v5/public/instruments", &query).await
    }

    /// Recent trades, newest first
    ///
    /// # Errors
    ///
    /// Returns transport or decode errors.
    pub async fn trades(&self, inst_id: &str, limit: usize) -> FeedResult<Vec<OkxRestTrade>> {
        let query = [
            ("instId", inst_id.to_string()),
            ("limit", limit.clamp(1, OKX_PAGE_LIMIT).to_string()),
        ];
        self.get("/api/v5/market/history-trades", &query).await
    }

    /// Current book with `depth` levels per side
    ///
    /// # Errors
    ///
    /// Returns transport or decode errors.
    pub async fn book(&self, inst_id: &str, depth: usize) -> FeedResult<Option<OkxBook>> {
        let query = [
            ("instId", inst_id.to_string()),
            ("sz", depth.clamp(1, 400).to_string()),
        ];
        let books: Vec<OkxBook> = self.get("/api/v5/market/books", &query).await?;
        Ok(books.into_iter().next())
    }

    /// Confirmed candles, newest first. `after_ms` pages to records older than it.
    ///
    /// # Errors
    ///
    /// Returns transport or decode errors.
    pub async fn candles(
        &self,
        inst_id: &str,
        interval: &str,
        after_ms: Option<u64>,
        limit: usize,
    ) -> FeedResult<Vec<OkxCandle>> {
        let mut query = vec![
            ("instId", inst_id.to_string()),
            ("bar", interval.to_string()),
            ("limit", limit.clamp(1, OKX_PAGE_LIMIT).to_string()),
        ];
        if let Some(after) = after_ms {
            query.push(("after", after.to_string()));
        }
        self.get("/api/v5/market/history-candles", &query).await
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_sign_is_deterministic_base64() {
        let a = sign("secret", "1538054050", "GET", "/users/self/verify").unwrap();
        let b = sign("secret", "1538054050", "GET", "/users/self/verify").unwrap();
        let other = sign("secret", "1538054051", "GET", "/users/self/verify").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, other);
        // 32-byte digest
        assert_eq!(STANDARD.decode(&a).unwrap().len(), 32);
    }

    #[rstest]
    fn test_base_url_trailing_slash() {
        let client = OkxHttpClient::new(Some("http://localhost:1234/".to_string()), 5).unwrap();
        assert_eq!(client.base_url, "http://localhost:1234");
    }

    #[rstest]
    fn test_envelope_error_code() {
        let response: OkxResponse<OkxInstrument> =
            serde_json::from_str(r#"{"code":"51001","msg":"Instrument ID does not exist","data":[]}"#)
                .unwrap();
        assert_eq!(response.code, "51001");
        assert!(response.data.is_empty());
    }
}
