// src/transport.rs
//! Resilient HTTP transport with a memoized relay fallback chain.
//!
//! Some origins block direct cross-origin reads; for those the client walks a
//! prioritized list of relay services that rewrite the request URL. The path
//! that worked (direct, or a specific relay) is remembered per origin host for
//! the lifetime of the process, so later requests skip the probing.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// First-contact direct probe; kept short so dead origins fail fast.
pub const DIRECT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Relay attempts get longer since they add a hop.
pub const RELAY_TIMEOUT: Duration = Duration::from_secs(8);
/// Requests on an already-memoized route.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// Minimal response surface the pipeline needs.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl RawResponse {
    /// 2xx, or 304 (relay-cached).
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status) || self.status == 304
    }
}

/// Low-level request execution, injectable for tests.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn send(&self, url: &str, timeout: Duration) -> Result<RawResponse>;
}

/// Production dispatcher over a shared reqwest client.
pub struct HttpDispatcher {
    client: reqwest::Client,
}

impl HttpDispatcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn send(&self, url: &str, timeout: Duration) -> Result<RawResponse> {
        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp
            .text()
            .await
            .with_context(|| format!("reading body of {url}"))?;
        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}

/// One relay service: a URL template with a `{url}` placeholder that receives
/// the percent-encoded target.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RelaySpec {
    pub name: String,
    pub template: String,
}

impl RelaySpec {
    pub fn build_url(&self, target: &str) -> String {
        self.template
            .replace("{url}", urlencoding::encode(target).as_ref())
    }
}

/// Which transport path last succeeded for an origin host.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Direct,
    Relay(String),
}

/// HTTP client with per-origin route memoization and relay fallback.
pub struct ResilientClient {
    dispatcher: Arc<dyn Dispatcher>,
    relays: Vec<RelaySpec>,
    routes: Mutex<HashMap<String, Route>>,
}

impl ResilientClient {
    pub fn new(dispatcher: Arc<dyn Dispatcher>, relays: Vec<RelaySpec>) -> Self {
        Self {
            dispatcher,
            relays,
            routes: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch through the memoized relay protocol.
    ///
    /// First contact for a host probes direct with a short timeout; a direct
    /// transport success (any status) pins the direct route. On transport
    /// failure the relay chain is walked in priority order; the first relay
    /// answering OK/304 with a plausible payload is pinned. Relays sometimes
    /// return their own HTML error page with HTTP 200, so a `text/html`
    /// content-type for a non-HTML target rejects the response.
    pub async fn fetch(&self, url: &str) -> Result<RawResponse> {
        self.fetch_with(url, DEFAULT_TIMEOUT).await
    }

    /// Like [`fetch`](Self::fetch) but with a custom timeout for requests on
    /// an already-pinned route. Probe timeouts stay fixed.
    pub async fn fetch_with(&self, url: &str, timeout: Duration) -> Result<RawResponse> {
        let host = origin_host(url)?;

        match self.remembered(&host) {
            Some(Route::Direct) => {
                return self.dispatcher.send(url, timeout).await;
            }
            Some(Route::Relay(name)) => {
                if let Some(relay) = self.relays.iter().find(|r| r.name == name) {
                    return self.dispatcher.send(&relay.build_url(url), timeout).await;
                }
                // The pinned relay vanished from config; fall through and
                // re-probe from scratch.
            }
            None => {}
        }

        match self.dispatcher.send(url, DIRECT_PROBE_TIMEOUT).await {
            Ok(resp) => {
                self.remember(&host, Route::Direct);
                counter!("digest_transport_direct_total").increment(1);
                return Ok(resp);
            }
            Err(e) => {
                tracing::debug!(error = ?e, host, "direct fetch failed, trying relays");
            }
        }

        for relay in &self.relays {
            let rewritten = relay.build_url(url);
            match self.dispatcher.send(&rewritten, RELAY_TIMEOUT).await {
                Ok(resp) if resp.is_ok() => {
                    if is_html_masquerade(&resp, url) {
                        counter!("digest_transport_relay_rejected_html_total").increment(1);
                        continue;
                    }
                    self.remember(&host, Route::Relay(relay.name.clone()));
                    counter!("digest_transport_relay_total").increment(1);
                    return Ok(resp);
                }
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!(error = ?e, relay = %relay.name, "relay fetch failed");
                    continue;
                }
            }
        }

        counter!("digest_transport_exhausted_total").increment(1);
        Err(anyhow!("all relays failed for {url}"))
    }

    /// Fetch a text body. `use_relay` opts into the memoized relay protocol
    /// for origins known to refuse direct reads; otherwise the request goes
    /// out plainly with the given timeout. Non-OK statuses are errors.
    pub async fn fetch_text(&self, url: &str, use_relay: bool, timeout: Duration) -> Result<String> {
        let resp = if use_relay {
            self.fetch_with(url, timeout).await?
        } else {
            self.dispatcher.send(url, timeout).await?
        };
        if !resp.is_ok() {
            bail!("HTTP {} for {url}", resp.status);
        }
        Ok(resp.body)
    }

    /// Fetch and decode a JSON body.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str, use_relay: bool) -> Result<T> {
        let body = self.fetch_text(url, use_relay, DEFAULT_TIMEOUT).await?;
        serde_json::from_str(&body).with_context(|| format!("decoding json from {url}"))
    }

    fn remembered(&self, host: &str) -> Option<Route> {
        self.routes
            .lock()
            .expect("route mutex poisoned")
            .get(host)
            .cloned()
    }

    fn remember(&self, host: &str, route: Route) {
        self.routes
            .lock()
            .expect("route mutex poisoned")
            .insert(host.to_string(), route);
    }
}

/// A relay answering 200 with an HTML page for a non-HTML target is serving
/// its own error page, not the requested resource.
fn is_html_masquerade(resp: &RawResponse, requested_url: &str) -> bool {
    let ct = resp.content_type.as_deref().unwrap_or_default();
    ct.contains("text/html") && !requested_url.contains(".html")
}

fn origin_host(raw: &str) -> Result<String> {
    let parsed = url::Url::parse(raw).with_context(|| format!("parsing url {raw}"))?;
    parsed
        .host_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("url {raw} has no host"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_template_percent_encodes_target() {
        let relay = RelaySpec {
            name: "allorigins".into(),
            template: "https://api.allorigins.win/raw?url={url}".into(),
        };
        let built = relay.build_url("https://www.reddit.com/r/ai/hot.json?limit=20&raw_json=1");
        assert_eq!(
            built,
            "https://api.allorigins.win/raw?url=https%3A%2F%2Fwww.reddit.com%2Fr%2Fai%2Fhot.json%3Flimit%3D20%26raw_json%3D1"
        );
    }

    #[test]
    fn html_masquerade_guard() {
        let html = RawResponse {
            status: 200,
            content_type: Some("text/html; charset=utf-8".into()),
            body: "<html>relay error</html>".into(),
        };
        assert!(is_html_masquerade(&html, "https://a.com/feed.xml"));
        // an actual HTML target is allowed to come back as HTML
        assert!(!is_html_masquerade(&html, "https://a.com/page.html"));

        let xml = RawResponse {
            status: 200,
            content_type: Some("application/rss+xml".into()),
            body: "<rss/>".into(),
        };
        assert!(!is_html_masquerade(&xml, "https://a.com/feed.xml"));
    }

    #[test]
    fn origin_host_extracts_hostname() {
        assert_eq!(
            origin_host("https://hn.algolia.com/api/v1/search?query=ai").unwrap(),
            "hn.algolia.com"
        );
        assert!(origin_host("not a url").is_err());
    }
}
