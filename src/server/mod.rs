// Server module - Pingora HTTP server setup and configuration

use pingora::server::configuration::Opt as ServerOpt;
use pingora_core::server::Server;
use std::sync::Arc;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::error::ProxyError;
use crate::proxy::CachingProxy;

/// Caching proxy server wrapper around Pingora
pub struct ProxyServer {
    config: Config,
    cache: Arc<CacheStore>,
}

impl ProxyServer {
    /// Validate configuration and open the cache store it names
    pub fn new(config: Config) -> Result<Self, ProxyError> {
        config.validate()?;
        let cache = Arc::new(CacheStore::with_dir(config.cache.dir())?);
        Ok(Self { config, cache })
    }

    /// Use an existing cache store instead of opening one
    pub fn with_cache(config: Config, cache: Arc<CacheStore>) -> Result<Self, ProxyError> {
        config.validate()?;
        Ok(Self { config, cache })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    /// Socket address the proxy listens on
    pub fn listen_address(&self) -> String {
        self.config.server.listen_address()
    }

    /// Assemble the Pingora server with the proxy service registered
    pub fn build_pingora_server(&self) -> Result<Server, ProxyError> {
        let opt = ServerOpt {
            daemon: false,
            upgrade: false,
            ..Default::default()
        };
        let mut server = Server::new(Some(opt))
            .map_err(|e| ProxyError::Internal(format!("server setup: {}", e)))?;
        server.bootstrap();

        let proxy = CachingProxy::from_config(&self.config, self.cache.clone())?;
        let mut proxy_service = pingora_proxy::http_proxy_service(&server.configuration, proxy);

        let listen_addr = self.listen_address();
        proxy_service.add_tcp(&listen_addr);

        tracing::info!(
            address = %listen_addr,
            origin = %self.config.origin.url,
            cache_dir = %self.cache.dir().display(),
            "Starting caching proxy"
        );

        server.add_service(proxy_service);
        Ok(server)
    }

    /// Run until the process is terminated
    pub fn run(self) -> Result<(), ProxyError> {
        let server = self.build_pingora_server()?;
        server.run_forever()
    }
}
