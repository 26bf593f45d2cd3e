// Proxy module - Pingora ProxyHttp implementation for the caching proxy

use async_trait::async_trait;
use bytes::Bytes;
use pingora_core::upstreams::peer::HttpPeer;
use pingora_core::Result;
use pingora_http::{RequestHeader, ResponseHeader};
use pingora_proxy::{ProxyHttp, Session};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::Cache;
use crate::config::{Config, Origin};
use crate::constants::CACHE_STATUS_HEADER;
use crate::error::ProxyError;
use crate::pipeline::{CacheStatus, PendingEntry, RequestContext};

pub mod cache_handler;
pub mod upstream;

/// Caching reverse proxy in front of a single origin
pub struct CachingProxy {
    origin: Origin,
    timeout: Duration,
    cache: Arc<dyn Cache>,
}

impl CachingProxy {
    pub fn new(origin: Origin, timeout: Duration, cache: Arc<dyn Cache>) -> Self {
        Self {
            origin,
            timeout,
            cache,
        }
    }

    /// Build a proxy from validated configuration
    pub fn from_config(config: &Config, cache: Arc<dyn Cache>) -> Result<Self, ProxyError> {
        let origin = config.origin()?;
        Ok(Self::new(origin, config.origin.timeout_duration(), cache))
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Per-read timeouts do not bound a slowly trickling origin; this does
    fn check_upstream_deadline(&self, ctx: &mut RequestContext) -> Result<()> {
        if !ctx.upstream_deadline_exceeded() {
            return Ok(());
        }
        ctx.discard_pending();
        tracing::warn!(
            request_id = %ctx.request_id(),
            timeout_seconds = self.timeout.as_secs(),
            "Origin exceeded total timeout"
        );
        Err(ProxyError::Upstream(format!(
            "origin did not finish within {}s",
            self.timeout.as_secs()
        ))
        .into_pingora())
    }

    /// Store a completed capture, if any
    fn store_pending(&self, ctx: &mut RequestContext) {
        if let Some(pending) = ctx.take_pending() {
            let (key, entry) = pending.into_entry();
            tracing::debug!(
                request_id = %ctx.request_id(),
                cache_key = %key,
                size_bytes = entry.size_bytes(),
                "Stored response in cache"
            );
            self.cache.set(key, entry);
        }
    }
}

#[async_trait]
impl ProxyHttp for CachingProxy {
    type CTX = RequestContext;

    fn new_ctx(&self) -> Self::CTX {
        RequestContext::new()
    }

    /// Serve from cache when possible; otherwise continue to the origin
    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> Result<bool> {
        let (method, path) = {
            let req = session.req_header();
            (req.method.as_str().to_string(), req.uri.path().to_string())
        };
        ctx.set_request(&method, &path);

        let key = cache_handler::build_cache_key(&method, &self.origin, &path);
        ctx.set_cache_key(key.clone());

        let Some(entry) = self.cache.get(&key) else {
            tracing::info!(
                request_id = %ctx.request_id(),
                cache_key = %key,
                "Cache MISS"
            );
            ctx.set_cache_status(CacheStatus::Miss);
            return Ok(false);
        };

        tracing::info!(
            request_id = %ctx.request_id(),
            cache_key = %key,
            "Cache HIT"
        );
        ctx.set_cache_status(CacheStatus::Hit);

        let header = cache_handler::build_hit_response(&entry)?;
        if entry.data.is_empty() {
            session
                .write_response_header(Box::new(header), true)
                .await?;
        } else {
            session
                .write_response_header(Box::new(header), false)
                .await?;
            session
                .write_response_body(Some(entry.data.clone()), true)
                .await?;
        }

        Ok(true)
    }

    async fn upstream_peer(
        &self,
        _session: &mut Session,
        ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        ctx.start_upstream_deadline(self.timeout);
        upstream::build_peer(&self.origin, self.timeout)
            .await
            .map_err(|e| {
                tracing::error!(
                    request_id = %ctx.request_id(),
                    origin = %self.origin,
                    error = %e,
                    "Failed to resolve origin"
                );
                e.into_pingora()
            })
    }

    async fn upstream_request_filter(
        &self,
        _session: &mut Session,
        upstream_request: &mut RequestHeader,
        _ctx: &mut Self::CTX,
    ) -> Result<()> {
        upstream::rewrite_request(upstream_request, &self.origin).map_err(ProxyError::into_pingora)
    }

    /// Mark the response as a miss and start capturing it if cacheable
    async fn response_filter(
        &self,
        _session: &mut Session,
        upstream_response: &mut ResponseHeader,
        ctx: &mut Self::CTX,
    ) -> Result<()> {
        let status_code = upstream_response.status.as_u16();

        if cache_handler::is_cacheable(ctx.method(), status_code) {
            if let Some(key) = ctx.cache_key().cloned() {
                let headers = cache_handler::filter_headers(&upstream_response.headers);
                ctx.begin_capture(PendingEntry::new(key, status_code, headers));
            }
        }

        upstream_response.insert_header(CACHE_STATUS_HEADER, CacheStatus::Miss.as_header_value())?;
        Ok(())
    }

    /// Capture body chunks; abort origins that outlive the total timeout
    fn response_body_filter(
        &self,
        _session: &mut Session,
        body: &mut Option<Bytes>,
        end_of_stream: bool,
        ctx: &mut Self::CTX,
    ) -> Result<Option<Duration>> {
        self.check_upstream_deadline(ctx)?;

        if let (Some(pending), Some(chunk)) = (ctx.pending_mut(), body.as_ref()) {
            pending.append(chunk);
        }

        if end_of_stream {
            self.store_pending(ctx);
        }

        Ok(None)
    }

    /// Finish any capture the body filter did not, and log the request
    async fn logging(
        &self,
        session: &mut Session,
        e: Option<&pingora_core::Error>,
        ctx: &mut Self::CTX,
    ) {
        match e {
            None => self.store_pending(ctx),
            Some(error) => {
                ctx.discard_pending();
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    error = %error,
                    "Request failed"
                );
            }
        }

        let status_code = session
            .response_written()
            .map(|resp| resp.status.as_u16())
            .unwrap_or(500);

        tracing::info!(
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = %ctx.path(),
            cache_status = ctx.cache_status().map(|s| s.as_header_value()).unwrap_or("-"),
            status_code = status_code,
            duration_ms = ctx.elapsed_ms(),
            "Request completed"
        );

        let stats = self.cache.stats();
        tracing::debug!(
            hits = stats.hits,
            misses = stats.misses,
            items = stats.current_item_count,
            hit_rate = stats.hit_rate(),
            "Cache stats"
        );
    }
}
