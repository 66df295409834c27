//! Execution engine for IFPA queries and lookups.
//!
//! # Design
//! Everything that decides *what* goes over the wire is pure: `resolve`
//! turns a `Query` or `Lookup` into an `HttpRequest`, validation checks the
//! resolved parameters, and `interpret` turns an `HttpResponse` into a typed
//! value or a classified error. The blocking and async paths differ only in
//! which `Transport` method they call (`send` vs `send_async`); every
//! terminal operation is built on one of those two invokers.
//!
//! The client owns its transport, and with it the connection pools. `close`
//! releases them explicitly; dropping the client releases them on every
//! other path.

use futures_util::Stream;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::classify::classify;
use crate::config::{ClientConfig, API_KEY_HEADER};
use crate::error::Error;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::paginate::{self, Collector, Pages};
use crate::query::{Lookup, Params, Query, Resource};
use crate::transport::{HttpTransport, Transport};
use crate::validate::validate;

/// Client for the IFPA API.
///
/// Stateless between calls apart from the transport's connection pools, so
/// one instance can serve many concurrent queries.
pub struct IfpaClient<T = HttpTransport> {
    base_url: String,
    api_key: String,
    user_agent: String,
    timeout: std::time::Duration,
    validate_requests: bool,
    transport: T,
}

/// A resolved request that passed pre-flight validation.
struct Prepared {
    operation: &'static str,
    request: HttpRequest,
}

impl IfpaClient<HttpTransport> {
    /// Build a client with the production transport.
    ///
    /// Fails with `Error::Config` when no API key can be resolved or the base
    /// URL is not an http(s) URL.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(config, transport)
    }

    /// Default configuration with the key taken from `IFPA_API_KEY`.
    pub fn from_env() -> Result<Self, Error> {
        Self::new(ClientConfig::default())
    }
}

impl<T: Transport> IfpaClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self, Error> {
        let api_key = config.resolve_api_key()?;
        let base_url = config.normalized_base_url()?;
        Ok(Self {
            base_url,
            api_key,
            user_agent: config.user_agent,
            timeout: config.timeout,
            validate_requests: config.validate_requests,
            transport,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Shut the client down, closing every pooled connection.
    pub fn close(self) {
        debug!(base_url = %self.base_url, "closing client");
        drop(self);
    }

    // ------------------------------------------------------------------
    // Resolution (pure)
    // ------------------------------------------------------------------

    pub fn resolve<R: Resource>(&self, query: &Query<R>) -> HttpRequest {
        self.build_request(query.path(), &query.params())
    }

    pub fn resolve_lookup<D>(&self, lookup: &Lookup<D>) -> HttpRequest
    where
        D: DeserializeOwned,
    {
        self.build_request(lookup.path(), lookup.params())
    }

    fn build_request(&self, path: &str, params: &Params) -> HttpRequest {
        HttpRequest {
            id: Uuid::new_v4(),
            method: HttpMethod::Get,
            url: format!("{}{path}", self.base_url),
            path: path.to_string(),
            query: params
                .iter()
                .filter(|(param, _)| !param.is_path())
                .map(|(param, value)| (param.wire_name().to_string(), value.clone()))
                .collect(),
            headers: vec![
                (API_KEY_HEADER.to_string(), self.api_key.clone()),
                ("Accept".to_string(), "application/json".to_string()),
                ("User-Agent".to_string(), self.user_agent.clone()),
            ],
            timeout: self.timeout,
        }
    }

    fn prepare(
        &self,
        operation: &'static str,
        path: &str,
        params: &Params,
    ) -> Result<Prepared, Error> {
        if self.validate_requests {
            validate(operation, params)?;
        }
        Ok(Prepared {
            operation,
            request: self.build_request(path, params),
        })
    }

    fn prepare_query<R: Resource>(&self, query: &Query<R>) -> Result<Prepared, Error> {
        self.prepare(R::OPERATION, query.path(), &query.params())
    }

    fn prepare_lookup<D: DeserializeOwned>(&self, lookup: &Lookup<D>) -> Result<Prepared, Error> {
        self.prepare(lookup.operation(), lookup.path(), lookup.params())
    }

    // ------------------------------------------------------------------
    // Invokers
    // ------------------------------------------------------------------

    fn send<D: DeserializeOwned>(&self, prepared: &Prepared) -> Result<D, Error> {
        let request = &prepared.request;
        debug!(
            request_id = %request.id,
            operation = prepared.operation,
            url = %request.url,
            "dispatching request"
        );
        let response = self.transport.execute(request)?;
        interpret(prepared, response)
    }

    async fn send_async<D: DeserializeOwned>(&self, prepared: &Prepared) -> Result<D, Error> {
        let request = &prepared.request;
        debug!(
            request_id = %request.id,
            operation = prepared.operation,
            url = %request.url,
            "dispatching request"
        );
        let response = self.transport.execute_async(request).await?;
        interpret(prepared, response)
    }

    // ------------------------------------------------------------------
    // Blocking terminal operations
    // ------------------------------------------------------------------

    /// Execute one page and return the raw page envelope.
    pub fn run<R: Resource>(&self, query: &Query<R>) -> Result<R::Page, Error> {
        self.send(&self.prepare_query(query)?)
    }

    /// Execute one page and return its items.
    pub fn get<R: Resource>(&self, query: &Query<R>) -> Result<Vec<R::Item>, Error> {
        self.run(query).map(R::items)
    }

    /// The first matching item; `Error::Empty` when nothing matches.
    pub fn first<R: Resource>(&self, query: &Query<R>) -> Result<R::Item, Error> {
        let prepared = self.prepare_query(&first_query(query))?;
        let page: R::Page = self.send(&prepared)?;
        take_first::<R>(page, &prepared)
    }

    /// Like `first`, but an empty result is `Ok(None)`.
    pub fn first_or_none<R: Resource>(&self, query: &Query<R>) -> Result<Option<R::Item>, Error> {
        empty_as_none(self.first(query))
    }

    /// Lazily iterate every matching item, `page_size` per request.
    pub fn iterate<R: Resource>(&self, query: &Query<R>, page_size: u32) -> Pages<'_, R, T> {
        Pages::new(self, query, page_size)
    }

    /// Collect every matching item, failing with `Error::LimitExceeded` as
    /// soon as more than `max_results` exist. Page size is the query's
    /// `limit`, or `DEFAULT_PAGE_SIZE`.
    pub fn get_all<R: Resource>(
        &self,
        query: &Query<R>,
        max_results: usize,
    ) -> Result<Vec<R::Item>, Error> {
        let mut collector = Collector::new(query, max_results);
        while let Some(page_query) = collector.next_query() {
            collector.accept(self.get(&page_query)?)?;
        }
        Ok(collector.finish())
    }

    pub fn fetch<D: DeserializeOwned>(&self, lookup: &Lookup<D>) -> Result<D, Error> {
        self.send(&self.prepare_lookup(lookup)?)
    }

    /// Like `fetch`, but a not-found response is `Ok(None)`. Every other
    /// error, including semantic 404s such as `PlayersNeverMet`, propagates.
    pub fn fetch_or_none<D: DeserializeOwned>(
        &self,
        lookup: &Lookup<D>,
    ) -> Result<Option<D>, Error> {
        not_found_as_none(self.fetch(lookup))
    }

    // ------------------------------------------------------------------
    // Async terminal operations
    // ------------------------------------------------------------------

    pub async fn run_async<R: Resource>(&self, query: &Query<R>) -> Result<R::Page, Error> {
        self.send_async(&self.prepare_query(query)?).await
    }

    pub async fn get_async<R: Resource>(&self, query: &Query<R>) -> Result<Vec<R::Item>, Error> {
        self.run_async(query).await.map(R::items)
    }

    pub async fn first_async<R: Resource>(&self, query: &Query<R>) -> Result<R::Item, Error> {
        let prepared = self.prepare_query(&first_query(query))?;
        let page: R::Page = self.send_async(&prepared).await?;
        take_first::<R>(page, &prepared)
    }

    pub async fn first_or_none_async<R: Resource>(
        &self,
        query: &Query<R>,
    ) -> Result<Option<R::Item>, Error> {
        empty_as_none(self.first_async(query).await)
    }

    /// Async counterpart of `iterate`.
    pub fn stream<R: Resource>(
        &self,
        query: &Query<R>,
        page_size: u32,
    ) -> impl Stream<Item = Result<R::Item, Error>> + '_ {
        paginate::item_stream(self, query.clone(), page_size, CancellationToken::new())
    }

    /// `stream` that stops at the next page boundary once `cancel` fires.
    pub fn stream_until<R: Resource>(
        &self,
        query: &Query<R>,
        page_size: u32,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<R::Item, Error>> + '_ {
        paginate::item_stream(self, query.clone(), page_size, cancel)
    }

    pub async fn get_all_async<R: Resource>(
        &self,
        query: &Query<R>,
        max_results: usize,
    ) -> Result<Vec<R::Item>, Error> {
        let mut collector = Collector::new(query, max_results);
        while let Some(page_query) = collector.next_query() {
            collector.accept(self.get_async(&page_query).await?)?;
        }
        Ok(collector.finish())
    }

    pub async fn fetch_async<D: DeserializeOwned>(&self, lookup: &Lookup<D>) -> Result<D, Error> {
        self.send_async(&self.prepare_lookup(lookup)?).await
    }

    pub async fn fetch_or_none_async<D: DeserializeOwned>(
        &self,
        lookup: &Lookup<D>,
    ) -> Result<Option<D>, Error> {
        not_found_as_none(self.fetch_async(lookup).await)
    }
}

/// Map a response to a typed value or a classified error.
fn interpret<D: DeserializeOwned>(prepared: &Prepared, response: HttpResponse) -> Result<D, Error> {
    let request = &prepared.request;
    debug!(
        request_id = %request.id,
        status = response.status,
        bytes = response.body.len(),
        "response received"
    );
    if !response.is_success() {
        let err = classify(response, request.context());
        debug!(request_id = %request.id, kind = %err.kind, "request failed");
        return Err(err.into());
    }
    serde_json::from_str(&response.body).map_err(|e| Error::Deserialization {
        context: request.context(),
        message: e.to_string(),
    })
}

/// One-item query where the endpoint honours `count`.
fn first_query<R: Resource>(query: &Query<R>) -> Query<R> {
    if R::HONORS_PAGING {
        query.limit(1)
    } else {
        query.clone()
    }
}

fn take_first<R: Resource>(page: R::Page, prepared: &Prepared) -> Result<R::Item, Error> {
    R::items(page)
        .into_iter()
        .next()
        .ok_or_else(|| Error::Empty {
            context: prepared.request.context(),
        })
}

fn empty_as_none<V>(result: Result<V, Error>) -> Result<Option<V>, Error> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::Empty { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

fn not_found_as_none<V>(result: Result<V, Error>) -> Result<Option<V>, Error> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}
