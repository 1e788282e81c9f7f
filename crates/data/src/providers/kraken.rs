//! Kraken public REST client.

use super::pair_index::PairIndex;
use super::wire::{AssetPairInfo, Envelope, decode_trades_result};
use crate::error::SyncError;
use crate::{PairCatalog, TradeFetcher};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};
use trade_history_domain::{PairDescriptor, TradePage};

/// Default public API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.kraken.com";

/// Largest page the trades endpoint returns.
pub const MAX_PAGE_SIZE: usize = 1000;

const ASSET_PAIRS_PATH: &str = "/0/public/AssetPairs";
const TRADES_PATH: &str = "/0/public/Trades";

/// Configuration for the Kraken client.
#[derive(Debug, Clone)]
pub struct KrakenConfig {
    /// Base URL of the REST API.
    pub base_url: String,
    /// Records requested per trades page.
    pub page_size: usize,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for KrakenConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: MAX_PAGE_SIZE,
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("trade-history/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl KrakenConfig {
    /// Checks the configuration for values the API would reject.
    ///
    /// # Errors
    /// Returns [`SyncError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.base_url.trim().is_empty() {
            return Err(SyncError::Config("base_url is empty".to_string()));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(SyncError::Config(format!(
                "page_size must be within 1..={MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(SyncError::Config("request_timeout must be positive".to_string()));
        }
        Ok(())
    }
}

/// Client for the public market-data endpoints.
#[derive(Debug, Clone)]
pub struct KrakenClient {
    http: reqwest::Client,
    config: KrakenConfig,
}

impl KrakenClient {
    /// Creates a client after validating `config`.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: KrakenConfig) -> Result<Self, SyncError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { http, config })
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &KrakenConfig {
        &self.config
    }

    /// Fetches every tradeable pair from the catalog endpoint.
    ///
    /// # Errors
    /// Returns an error if the request fails or the response is malformed.
    pub async fn asset_pairs(&self) -> Result<Vec<PairDescriptor>, SyncError> {
        let result: BTreeMap<String, AssetPairInfo> =
            self.get_result(ASSET_PAIRS_PATH, &[], None).await?;
        Ok(result
            .into_iter()
            .map(|(id, info)| info.into_descriptor(id))
            .collect())
    }

    /// Fetches the catalog and indexes it for symbol lookup.
    ///
    /// # Errors
    /// Returns an error if the catalog cannot be fetched.
    pub async fn pair_index(&self) -> Result<PairIndex, SyncError> {
        let index = PairIndex::new(self.asset_pairs().await?);
        debug!(pairs = index.len(), "Loaded pair catalog");
        Ok(index)
    }

    async fn trades(
        &self,
        pair: &PairDescriptor,
        since: Option<i64>,
        count: usize,
    ) -> Result<TradePage, SyncError> {
        let mut query = vec![("pair", pair.id.clone()), ("count", count.to_string())];
        if let Some(since) = since {
            query.push(("since", since.to_string()));
        }
        let result: Map<String, Value> = self
            .get_result(TRADES_PATH, &query, Some(pair.id.as_str()))
            .await?;
        decode_trades_result(result, pair, count)
    }

    async fn get_result<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        symbol: Option<&str>,
    ) -> Result<T, SyncError> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;

        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        if !envelope.error.is_empty() {
            return Err(SyncError::from_upstream(envelope.error, symbol));
        }
        envelope
            .result
            .ok_or_else(|| SyncError::malformed(format!("{path}: response has no result")))
    }
}

#[async_trait]
impl PairCatalog for KrakenClient {
    async fn resolve(&self, symbol: &str) -> Result<PairDescriptor, SyncError> {
        let pair = self.pair_index().await?.resolve(symbol)?;
        if pair.id.eq_ignore_ascii_case(symbol.trim()) {
            info!(pair = %pair.id, "Found pair");
        } else {
            info!(
                symbol = symbol,
                pair = %pair.id,
                "Alternate name entered, using canonical pair"
            );
        }
        Ok(pair)
    }
}

#[async_trait]
impl TradeFetcher for KrakenClient {
    fn page_size(&self) -> usize {
        self.config.page_size
    }

    async fn fetch_page(&self, pair: &PairDescriptor, since: i64) -> Result<TradePage, SyncError> {
        let page = self.trades(pair, Some(since), self.config.page_size).await?;
        debug!(
            pair = %pair.id,
            since = since,
            records = page.trades.len(),
            last = %page.last,
            "Fetched trades page"
        );
        Ok(page)
    }

    async fn latest_trade_id(&self, pair: &PairDescriptor) -> Result<Option<i64>, SyncError> {
        let page = self.trades(pair, None, 1).await?;
        Ok(page.last_trade_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const TRADES_BODY: &str = r#"{"error":[],"result":{"XXBTZUSD":[["100.50","0.75",1690000000.123456,"b","m","",98765]],"last":"98765"}}"#;
    const PAIRS_BODY: &str = r#"{"error":[],"result":{"XXBTZUSD":{"altname":"XBTUSD","wsname":"XBT/USD","base":"XXBT"},"XETHZUSD":{"altname":"ETHUSD"}}}"#;

    /// Local HTTP server answering one canned response per connection.
    struct CannedServer {
        base_url: String,
        targets: Arc<Mutex<Vec<String>>>,
    }

    impl CannedServer {
        async fn start(responses: Vec<(u16, &'static str)>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base_url = format!("http://{}", listener.local_addr().unwrap());
            let targets = Arc::new(Mutex::new(Vec::new()));
            let seen = targets.clone();

            tokio::spawn(async move {
                for (status, body) in responses {
                    let (mut socket, _) = listener.accept().await.unwrap();
                    let mut head = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                        let n = socket.read(&mut chunk).await.unwrap();
                        if n == 0 {
                            break;
                        }
                        head.extend_from_slice(&chunk[..n]);
                    }
                    let request = String::from_utf8_lossy(&head);
                    let target = request.split_whitespace().nth(1).unwrap_or_default();
                    seen.lock().unwrap().push(target.to_string());

                    let response = format!(
                        "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\n\
                         content-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    socket.write_all(response.as_bytes()).await.unwrap();
                    let _ = socket.shutdown().await;
                }
            });

            Self { base_url, targets }
        }

        fn client(&self, page_size: usize) -> KrakenClient {
            let config = KrakenConfig {
                base_url: self.base_url.clone(),
                page_size,
                ..Default::default()
            };
            config.validate().unwrap();
            // Loopback only; ignore any proxy configured in the environment.
            let http = reqwest::Client::builder()
                .timeout(config.request_timeout)
                .no_proxy()
                .build()
                .unwrap();
            KrakenClient { http, config }
        }

        fn targets(&self) -> Vec<String> {
            self.targets.lock().unwrap().clone()
        }
    }

    fn xbtusd() -> PairDescriptor {
        PairDescriptor::new("XXBTZUSD", vec!["XBTUSD".to_string()])
    }

    #[tokio::test]
    async fn test_fetch_page_sends_cursor_and_count() {
        let server = CannedServer::start(vec![(200, TRADES_BODY)]).await;
        let client = server.client(2);

        let page = client.fetch_page(&xbtusd(), 98_000).await.unwrap();

        assert_eq!(page.trades.len(), 1);
        assert_eq!(page.trades[0].trade_id, 98765);
        assert_eq!(page.trades[0].time_ns, 1_690_000_000_123_456_000);
        assert!(page.is_final);
        assert_eq!(page.next_cursor().unwrap(), 98766);

        let targets = server.targets();
        assert_eq!(targets.len(), 1);
        let target = &targets[0];
        assert!(target.starts_with("/0/public/Trades?"), "{target}");
        assert!(target.contains("pair=XXBTZUSD"), "{target}");
        assert!(target.contains("since=98000"), "{target}");
        assert!(target.contains("count=2"), "{target}");
    }

    #[tokio::test]
    async fn test_latest_trade_id_requests_single_record() {
        let server = CannedServer::start(vec![(200, TRADES_BODY)]).await;

        let latest = server.client(1000).latest_trade_id(&xbtusd()).await.unwrap();

        assert_eq!(latest, Some(98765));
        let target = &server.targets()[0];
        assert!(target.contains("count=1"), "{target}");
        assert!(!target.contains("since="), "{target}");
    }

    #[tokio::test]
    async fn test_resolve_against_catalog() {
        let server = CannedServer::start(vec![(200, PAIRS_BODY), (200, PAIRS_BODY)]).await;
        let client = server.client(1000);

        let pair = client.resolve("xbt/usd").await.unwrap();
        assert_eq!(pair.id, "XXBTZUSD");
        assert_eq!(pair.alt_names, vec!["XBTUSD", "XBT/USD"]);

        let err = client.resolve("DOGEMOON").await.unwrap_err();
        assert!(matches!(err, SyncError::PairNotFound(symbol) if symbol == "DOGEMOON"));

        assert!(
            server
                .targets()
                .iter()
                .all(|t| t.starts_with("/0/public/AssetPairs"))
        );
    }

    #[tokio::test]
    async fn test_unknown_pair_error_array() {
        let server = CannedServer::start(vec![(
            200,
            r#"{"error":["EQuery:Unknown asset pair"]}"#,
        )])
        .await;

        let err = server.client(1000).fetch_page(&xbtusd(), 0).await.unwrap_err();

        assert!(matches!(err, SyncError::PairNotFound(id) if id == "XXBTZUSD"));
    }

    #[tokio::test]
    async fn test_rate_limit_error_array_is_transient() {
        let server = CannedServer::start(vec![(
            200,
            r#"{"error":["EAPI:Rate limit exceeded"],"result":{}}"#,
        )])
        .await;

        let err = server.client(1000).fetch_page(&xbtusd(), 0).await.unwrap_err();

        assert!(matches!(&err, SyncError::Upstream(messages) if messages.len() == 1));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_missing_result_is_malformed() {
        let server = CannedServer::start(vec![(200, r#"{"error":[]}"#)]).await;

        let err = server.client(1000).fetch_page(&xbtusd(), 0).await.unwrap_err();

        assert!(matches!(err, SyncError::MalformedRecord(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_transport() {
        let server = CannedServer::start(vec![(503, r#"{"error":["EService:Unavailable"]}"#)]).await;

        let err = server.client(1000).fetch_page(&xbtusd(), 0).await.unwrap_err();

        assert!(matches!(err, SyncError::Transport(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = KrakenConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.page_size, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_config_rejects_page_size() {
        let config = KrakenConfig {
            page_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SyncError::Config(_))));

        let config = KrakenConfig {
            page_size: MAX_PAGE_SIZE + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_client_reports_page_size() {
        let client = KrakenClient::new(KrakenConfig {
            page_size: 250,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(TradeFetcher::page_size(&client), 250);
        assert_eq!(client.config().base_url, DEFAULT_BASE_URL);
    }
}
