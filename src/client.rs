//! API client
//!
//! Ties the endpoint catalog, configuration and transport together. Every
//! call gets its own queue paced by the endpoint's quota.

use crate::config::ClientConfig;
use crate::decode::Envelope;
use crate::endpoints::Endpoint;
use crate::error::{ApiError, Error, Result};
use crate::http::{HttpTransport, StreamConnector, Transport};
use crate::pagination::{PageStream, PaginationDriver, PaginationPolicy};
use crate::queue::UnitOfWork;
use crate::stream::{StreamReader, StreamSession};
use std::sync::Arc;
use tracing::info;

/// Client for the known endpoints
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    connector: Arc<dyn StreamConnector>,
    config: ClientConfig,
}

impl ApiClient {
    /// Create a client with a reqwest transport built from `config`
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::with_config(config.transport_config())?);
        Ok(Self::with_transport(transport.clone(), transport, config))
    }

    /// Create a client over caller-provided transports
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        connector: Arc<dyn StreamConnector>,
        config: ClientConfig,
    ) -> Self {
        Self {
            transport,
            connector,
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Pagination driver for an endpoint, paced by its quota
    pub fn driver(&self, endpoint: Endpoint, policy: PaginationPolicy) -> PaginationDriver {
        PaginationDriver::new(
            Arc::clone(&self.transport),
            self.config.queue_config(endpoint),
            policy,
        )
    }

    /// Walk every page of a paginated endpoint
    pub fn paginate<I, K, V>(&self, endpoint: Endpoint, ids: &[&str], params: I) -> Result<PageStream>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let work = self.unit(endpoint, ids, params)?;
        info!("Paginating {} ({})", endpoint, work.target());
        Ok(self
            .driver(endpoint, self.config.pagination_policy())
            .paginate(work))
    }

    /// Fetch a single page; its `meta.next_token` can be passed back through
    /// the pagination token parameter to continue manually
    pub async fn fetch<I, K, V>(&self, endpoint: Endpoint, ids: &[&str], params: I) -> Result<Envelope>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let work = self.unit(endpoint, ids, params)?;
        let policy = self.config.pagination_policy().with_auto_continue(false);
        let pages = self.driver(endpoint, policy).paginate(work).collect_all().await?;

        pages
            .into_iter()
            .next()
            .ok_or_else(|| Error::decode(format!("{endpoint} returned no page")))
    }

    /// Open a streaming endpoint
    pub async fn stream<I, K, V>(
        &self,
        endpoint: Endpoint,
        params: I,
    ) -> std::result::Result<StreamSession, ApiError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if !endpoint.is_stream() {
            let err = Error::invalid_value("endpoint", format!("{endpoint} is not a stream"));
            return Err(ApiError::from_error(&err));
        }

        let path = endpoint.path(&[]).map_err(|e| ApiError::from_error(&e))?;
        StreamReader::new(Arc::clone(&self.connector), self.config.stream_config())
            .start(&path, params)
            .await
    }

    fn unit<I, K, V>(&self, endpoint: Endpoint, ids: &[&str], params: I) -> Result<UnitOfWork>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if endpoint.is_stream() {
            return Err(Error::invalid_value(
                "endpoint",
                format!("{endpoint} is a stream; use ApiClient::stream"),
            ));
        }
        Ok(UnitOfWork::get(endpoint.path(ids)?).with_params(params))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}
