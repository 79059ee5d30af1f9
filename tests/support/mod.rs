// tests/support/mod.rs
//! Shared test scaffolding: a scripted dispatcher standing in for the HTTP
//! layer, plus context builders.
#![allow(dead_code)] // each integration test binary uses a different subset

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ai_digest::cache::{CacheStore, MemoryStorage};
use ai_digest::config::DigestConfig;
use ai_digest::sources::SourceContext;
use ai_digest::transport::{Dispatcher, RawResponse, RelaySpec, ResilientClient};

/// Scripted outcome for URLs matching a prefix.
pub enum Scripted {
    Ok(RawResponse),
    Fail(&'static str),
}

/// Dispatcher that answers from a prefix-matched script and records every
/// URL it was asked for.
pub struct FakeDispatcher {
    rules: Vec<(String, Scripted)>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeDispatcher {
    pub fn new(rules: Vec<(String, Scripted)>) -> Self {
        Self {
            rules,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls_matching(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl Dispatcher for FakeDispatcher {
    async fn send(&self, url: &str, _timeout: Duration) -> Result<RawResponse> {
        self.calls.lock().unwrap().push(url.to_string());
        for (prefix, outcome) in &self.rules {
            if url.starts_with(prefix.as_str()) {
                return match outcome {
                    Scripted::Ok(resp) => Ok(resp.clone()),
                    Scripted::Fail(msg) => Err(anyhow!("{msg}")),
                };
            }
        }
        Err(anyhow!("no scripted response for {url}"))
    }
}

pub fn json_response(body: &str) -> RawResponse {
    RawResponse {
        status: 200,
        content_type: Some("application/json".into()),
        body: body.to_string(),
    }
}

pub fn xml_response(body: &str) -> RawResponse {
    RawResponse {
        status: 200,
        content_type: Some("application/xml".into()),
        body: body.to_string(),
    }
}

pub fn html_response(body: &str) -> RawResponse {
    RawResponse {
        status: 200,
        content_type: Some("text/html; charset=utf-8".into()),
        body: body.to_string(),
    }
}

pub fn default_relays() -> Vec<RelaySpec> {
    DigestConfig::default().relays.chain
}

/// Client over a scripted dispatcher with the default relay chain.
pub fn scripted_client(dispatcher: Arc<FakeDispatcher>) -> Arc<ResilientClient> {
    Arc::new(ResilientClient::new(dispatcher, default_relays()))
}

/// Full source context over a scripted dispatcher: unbounded in-memory cache
/// and the seed config.
pub fn scripted_context(dispatcher: Arc<FakeDispatcher>) -> SourceContext {
    let config = Arc::new(DigestConfig::default());
    let client = Arc::new(ResilientClient::new(dispatcher, config.relays.chain.clone()));
    let cache = CacheStore::new(Arc::new(MemoryStorage::unbounded()));
    SourceContext::new(client, cache, config)
}
