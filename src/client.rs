//! The API client and its request façade.
//!
//! [`Client`] is the single entry point. [`Client::request`] looks the
//! resource up in the catalog and either runs a paged, cached data request or
//! a single action call. Use [`ClientBuilder`] to configure and create clients.

use crate::{
    cache::ResponseCache,
    merge,
    metadata::{
        query_params_from_json, QueryParams, RequestDescriptor, RequestMetadata,
        VIRTUAL_DOMAIN_PARAM,
    },
    options::{RequestOptions, DEFAULT_TIMEOUT},
    paging,
    resource::{endpoint, Resource, ResourceCatalog, ResourceKind},
    scheduler::BatchScheduler,
    Error, Response, Result,
};
use http::header::{ACCEPT, CONNECTION};
use http::Method;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use url::Url;

/// Path of the API root below the server host.
pub const API_ROOT: &str = "/webacs/api/v4";

/// A client for the Prime Infrastructure REST API.
///
/// The client is cheap to clone; clones share the HTTP connection pool, the
/// resource catalog, the response cache and the session virtual domain.
///
/// # Examples
///
/// ```no_run
/// use piapi::{Client, RequestOptions};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), piapi::Error> {
/// let client = Client::builder()
///     .host("prime.example.com")?
///     .credentials("admin", "secret")
///     .build()?;
///
/// // Paged, cached data request
/// let devices = client
///     .request("Devices", &json!({"reachability": "REACHABLE"}), &RequestOptions::default())
///     .await?;
/// println!("{} devices", devices["queryResponse"]["@count"]);
///
/// // Action request, never cached
/// client
///     .request("updateAccessPoint", &json!({"accessPoint": {"id": 42}}), &RequestOptions::default())
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: Url,
    username: String,
    password: String,
    timeout: Duration,
    registered: ResourceCatalog,
    discover_resources: bool,
    discovered: OnceCell<ResourceCatalog>,
    cache: ResponseCache,
    virtual_domain: RwLock<Option<String>>,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The API root all resource URLs are derived from.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The response cache of this client.
    pub fn cache(&self) -> &ResponseCache {
        &self.inner.cache
    }

    /// Removes every cached result.
    pub fn flush_cache(&self) {
        self.inner.cache.flush();
        tracing::debug!("Response cache flushed");
    }

    /// The virtual domain applied to calls that don't override it.
    pub fn virtual_domain(&self) -> Option<String> {
        self.inner
            .virtual_domain
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Sets (or clears) the session virtual domain.
    pub fn set_virtual_domain(&self, domain: Option<String>) {
        tracing::info!(virtual_domain = ?domain, "Session virtual domain changed");
        *self
            .inner
            .virtual_domain
            .write()
            .unwrap_or_else(|e| e.into_inner()) = domain;
    }

    fn effective_domain(&self, options: &RequestOptions) -> Option<String> {
        options
            .virtual_domain
            .clone()
            .or_else(|| self.virtual_domain())
    }

    fn persist_domain(&self, options: &RequestOptions) {
        if !options.persist_virtual_domain {
            return;
        }
        if let Some(domain) = &options.virtual_domain {
            self.set_virtual_domain(Some(domain.clone()));
        }
    }

    /// Looks up a resource by name.
    ///
    /// Resources registered on the builder are checked first. Otherwise the
    /// API's resource listings are fetched (once per client) unless discovery
    /// was disabled.
    pub async fn resource(&self, name: &str) -> Result<Resource> {
        if let Some(resource) = self.inner.registered.get(name) {
            return Ok(resource.clone());
        }
        if self.inner.discover_resources {
            if let Some(resource) = self.discovered().await?.get(name) {
                return Ok(resource.clone());
            }
        }
        Err(Error::UnknownResource(name.to_string()))
    }

    /// Every known resource, registered and discovered.
    pub async fn catalog(&self) -> Result<ResourceCatalog> {
        let mut catalog = if self.inner.discover_resources {
            self.discovered().await?.clone()
        } else {
            ResourceCatalog::new()
        };
        catalog.extend(self.inner.registered.iter().cloned());
        Ok(catalog)
    }

    /// Names of all resources, data resources first.
    pub async fn resources(&self) -> Result<Vec<String>> {
        let catalog = self.catalog().await?;
        let mut names = catalog.data_names();
        names.extend(catalog.action_names());
        Ok(names)
    }

    /// Names of the data resources.
    pub async fn data_resources(&self) -> Result<Vec<String>> {
        Ok(self.catalog().await?.data_names())
    }

    /// Names of the action resources.
    pub async fn action_resources(&self) -> Result<Vec<String>> {
        Ok(self.catalog().await?.action_names())
    }

    async fn discovered(&self) -> Result<&ResourceCatalog> {
        self.inner
            .discovered
            .get_or_try_init(|| self.discover())
            .await
    }

    async fn discover(&self) -> Result<ResourceCatalog> {
        let base_url = &self.inner.base_url;
        let timeout = self.inner.timeout;

        let data = self
            .call(RequestMetadata::new(Method::GET, endpoint(base_url, "data")?).with_timeout(timeout))
            .await?;
        let operations = self
            .call(RequestMetadata::new(Method::GET, endpoint(base_url, "op")?).with_timeout(timeout))
            .await?;

        let mut catalog = ResourceCatalog::new();
        catalog.add_data_listing(base_url, &data)?;
        catalog.add_operation_listing(base_url, &operations)?;

        tracing::info!(
            data_resources = catalog.data_names().len(),
            action_resources = catalog.action_names().len(),
            "Discovered API resources"
        );
        Ok(catalog)
    }

    /// Requests any resource.
    ///
    /// For data resources `params` is a JSON object of query parameters and
    /// the merged result of every page is returned. For action resources
    /// `params` is the payload (`null` for none) and the raw JSON response is
    /// returned.
    pub async fn request(
        &self,
        resource_name: &str,
        params: &Value,
        options: &RequestOptions,
    ) -> Result<Value> {
        let resource = self.resource(resource_name).await?;
        match resource.kind {
            ResourceKind::Data => {
                let query = query_params_from_json(params)?;
                self.request_data(resource_name, &query, options).await
            }
            ResourceKind::Action { .. } => {
                let payload = (!params.is_null()).then_some(params);
                self.request_action(resource_name, payload, options).await
            }
        }
    }

    /// Requests every page of a data resource and merges them.
    ///
    /// The result is served from the cache when an identical request (same
    /// resource, same parameters, same virtual domain) already succeeded,
    /// unless `options.check_cache` is `false`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use piapi::{Client, QueryParams, RequestOptions};
    ///
    /// # async fn example(client: Client) -> Result<(), piapi::Error> {
    /// let mut params = QueryParams::new();
    /// params.insert("clientType".into(), "WIRELESS".into());
    ///
    /// let options = RequestOptions::builder()
    ///     .paging_size(500)
    ///     .concurrent_requests(3)
    ///     .build();
    /// let clients = client.request_data("ClientDetails", &params, &options).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn request_data(
        &self,
        resource_name: &str,
        params: &QueryParams,
        options: &RequestOptions,
    ) -> Result<Value> {
        options.validate()?;
        let resource = self.resource(resource_name).await?;
        if !resource.kind.is_data() {
            return Err(Error::WrongResourceKind {
                name: resource_name.to_string(),
                expected: "data",
            });
        }

        let mut query = params.clone();
        if let Some(domain) = self.effective_domain(options) {
            query.insert(VIRTUAL_DOMAIN_PARAM.to_string(), domain);
        }
        let descriptor = RequestDescriptor::data(resource_name, query);
        let key = descriptor.cache_key();

        if options.check_cache {
            if let Some(entry) = key.as_ref().and_then(|k| self.inner.cache.get(k)) {
                tracing::debug!(resource = resource_name, key = %entry.key, "Cache hit");
                self.persist_domain(options);
                return Ok(entry.merged_result);
            }
        }

        let merged = self.fetch_pages(&resource, &descriptor, options).await?;

        if let Some(key) = key {
            tracing::debug!(resource = resource_name, key = %key, "Caching merged result");
            self.inner.cache.put(key, merged.clone());
        }
        self.persist_domain(options);
        Ok(merged)
    }

    async fn fetch_pages(
        &self,
        resource: &Resource,
        descriptor: &RequestDescriptor,
        options: &RequestOptions,
    ) -> Result<Value> {
        let timeout = options.timeout.unwrap_or(self.inner.timeout);
        let paging_size = options.paging_size;

        let first = self
            .fetch_page(&resource.url, descriptor.query_params(), 0, paging_size, timeout)
            .await
            .map_err(|e| Error::PageFailed {
                page: 0,
                source: Box::new(e),
            })?;

        let total = paging::total_count(&first)?;
        let remaining = paging::plan_additional_pages(total, paging_size, &first)?;
        tracing::info!(
            resource = descriptor.resource_name(),
            total = total,
            pages = remaining + 1,
            "Planned paged request"
        );

        let mut pages = vec![merge::page_entities(&first).map_err(|e| Error::PageFailed {
            page: 0,
            source: Box::new(e),
        })?];

        if remaining > 0 {
            let scheduler = BatchScheduler::new(options.concurrent_requests, options.hold);
            let client = self.clone();
            let url = resource.url.clone();
            let query = descriptor.query_params().clone();

            let rest = scheduler
                .run(1..=remaining, move |page| {
                    let client = client.clone();
                    let url = url.clone();
                    let query = query.clone();
                    async move {
                        let body = client
                            .fetch_page(&url, &query, page, paging_size, timeout)
                            .await?;
                        merge::page_entities(&body)
                    }
                })
                .await?;
            pages.extend(rest);
        }

        merge::merge_pages(&first, pages, total)
    }

    async fn fetch_page(
        &self,
        url: &Url,
        query: &QueryParams,
        page: u64,
        paging_size: u64,
        timeout: Duration,
    ) -> Result<Value> {
        let metadata = RequestMetadata::new(Method::GET, url.clone())
            .with_query_params(
                query
                    .iter()
                    .filter(|(name, _)| !paging::is_paging_param(name))
                    .map(|(name, value)| (name.clone(), value.clone())),
            )
            .with_query_params(paging::page_params(page, paging_size))
            .with_timeout(timeout);

        Ok(self.call(metadata).await?.into_data())
    }

    /// Calls an action resource once.
    ///
    /// `GET` actions send the payload as query parameters; `POST`, `PUT` and
    /// `DELETE` actions send it as a JSON body. The response is never cached.
    pub async fn request_action(
        &self,
        resource_name: &str,
        payload: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<Value> {
        let resource = self.resource(resource_name).await?;
        let method = match &resource.kind {
            ResourceKind::Action { method } => method.clone(),
            ResourceKind::Data => {
                return Err(Error::WrongResourceKind {
                    name: resource_name.to_string(),
                    expected: "action",
                })
            }
        };

        let mut query = QueryParams::new();
        let mut body = None;
        match payload {
            Some(payload) if method == Method::GET => query = query_params_from_json(payload)?,
            Some(payload) => body = Some(payload.clone()),
            None => {}
        }
        if let Some(domain) = self.effective_domain(options) {
            query.insert(VIRTUAL_DOMAIN_PARAM.to_string(), domain);
        }
        let descriptor = RequestDescriptor::action(resource_name, query);

        let mut metadata = RequestMetadata::new(method, resource.url)
            .with_query_params(descriptor.query_params().clone())
            .with_timeout(options.timeout.unwrap_or(self.inner.timeout));
        if let Some(body) = body {
            metadata = metadata.with_body(body);
        }

        tracing::debug!(resource = descriptor.resource_name(), "Calling action resource");
        let response = self.call(metadata).await?;
        self.persist_domain(options);
        Ok(response.into_data())
    }

    /// Sends one authenticated HTTP call and parses its JSON body.
    ///
    /// An empty body parses as `null`.
    pub async fn call(&self, metadata: RequestMetadata) -> Result<Response<Value>> {
        let start_time = Instant::now();
        let response = self.execute_request(&metadata).await?;
        self.parse_response(response, start_time).await
    }

    /// Executes a single request.
    async fn execute_request(&self, metadata: &RequestMetadata) -> Result<reqwest::Response> {
        let mut url = metadata.url.clone();
        if !metadata.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &metadata.query_params {
                pairs.append_pair(key, value);
            }
        }

        tracing::debug!(
            method = %metadata.method,
            url = %url,
            "Executing HTTP request"
        );

        let mut request = self
            .inner
            .http_client
            .request(metadata.method.clone(), url)
            .basic_auth(&self.inner.username, Some(&self.inner.password))
            .header(ACCEPT, "application/json")
            // keep-alive is discouraged by the API documentation
            .header(CONNECTION, "close")
            .timeout(metadata.timeout.unwrap_or(self.inner.timeout));

        if let Some(body) = &metadata.body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }

    /// Checks the status and parses the JSON body.
    async fn parse_response(
        &self,
        response: reqwest::Response,
        start_time: Instant,
    ) -> Result<Response<Value>> {
        let status = response.status();
        let headers = response.headers().clone();

        if !status.is_success() {
            let raw_response = response.text().await.unwrap_or_default();

            if status.is_server_error() {
                tracing::warn!(
                    status = status.as_u16(),
                    response = %raw_response,
                    "Server error (5xx)"
                );
            } else {
                tracing::error!(
                    status = status.as_u16(),
                    response = %raw_response,
                    "Request rejected"
                );
            }

            return Err(Error::HttpError {
                status,
                raw_response,
                headers,
            });
        }

        let raw_body = response.text().await?;
        let latency = start_time.elapsed();

        tracing::info!(
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            "Received HTTP response"
        );

        if raw_body.trim().is_empty() {
            return Ok(Response::new(Value::Null, raw_body, status, headers, latency));
        }

        match serde_json::from_str::<Value>(&raw_body) {
            Ok(data) => Ok(Response::new(data, raw_body, status, headers, latency)),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    raw_response = %raw_body,
                    "Response is not JSON"
                );

                Err(Error::MalformedResponse {
                    reason: format!("response is not JSON: {}", e),
                    raw_response: raw_body,
                })
            }
        }
    }
}

enum PendingResource {
    Data(String),
    Action {
        name: String,
        method: Method,
        path: String,
    },
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use piapi::ClientBuilder;
/// use http::Method;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), piapi::Error> {
/// let client = ClientBuilder::new()
///     .host("prime.example.com")?
///     .credentials("admin", "secret")
///     .verify_tls(false)
///     .timeout(Duration::from_secs(60))
///     .virtual_domain("ROOT-DOMAIN")
///     .data_resource("Devices")
///     .action_resource("updateAccessPoint", Method::PUT, "apService/accessPoint")
///     .discover_resources(false)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<Url>,
    username: Option<String>,
    password: Option<String>,
    verify_tls: bool,
    https_only: bool,
    timeout: Duration,
    virtual_domain: Option<String>,
    resources: Vec<PendingResource>,
    discover_resources: bool,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            username: None,
            password: None,
            verify_tls: true,
            https_only: true,
            timeout: DEFAULT_TIMEOUT,
            virtual_domain: None,
            resources: Vec::new(),
            discover_resources: true,
        }
    }

    /// Sets the API root, e.g. `https://prime.example.com/webacs/api/v4`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Sets the API root to `https://{host}/webacs/api/v4`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host does not form a valid URL.
    pub fn host(self, host: impl AsRef<str>) -> Result<Self> {
        let url = format!("https://{}{}", host.as_ref().trim_end_matches('/'), API_ROOT);
        self.base_url(url)
    }

    /// Sets the HTTP Basic credentials sent with every request.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets whether TLS certificates are verified. Defaults to `true`.
    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    /// Sets whether plain-HTTP URLs are rejected. Defaults to `true`.
    pub fn https_only(mut self, https_only: bool) -> Self {
        self.https_only = https_only;
        self
    }

    /// Sets the default per-request timeout. Defaults to 300 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the initial session virtual domain.
    pub fn virtual_domain(mut self, domain: impl Into<String>) -> Self {
        self.virtual_domain = Some(domain.into());
        self
    }

    /// Registers a data resource served at `{base}/data/{name}.json`.
    pub fn data_resource(mut self, name: impl Into<String>) -> Self {
        self.resources.push(PendingResource::Data(name.into()));
        self
    }

    /// Registers an action resource served at `{base}/op/{path}.json`.
    pub fn action_resource(
        mut self,
        name: impl Into<String>,
        method: Method,
        path: impl Into<String>,
    ) -> Self {
        self.resources.push(PendingResource::Action {
            name: name.into(),
            method,
            path: path.into(),
        });
        self
    }

    /// Sets whether unknown resource names are looked up in the API's
    /// resource listings. Defaults to `true`.
    pub fn discover_resources(mut self, discover: bool) -> Self {
        self.discover_resources = discover;
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or the credentials are missing, if the
    /// base URL is not HTTPS while `https_only` is set, or if the HTTP client
    /// cannot be created.
    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::ConfigurationError("Base URL is required".to_string()))?;
        if self.https_only && base_url.scheme() != "https" {
            return Err(Error::ConfigurationError(format!(
                "HTTPS is required, got {}",
                base_url
            )));
        }
        let (username, password) = self
            .username
            .zip(self.password)
            .ok_or_else(|| Error::ConfigurationError("Credentials are required".to_string()))?;

        if !self.verify_tls {
            tracing::warn!("TLS certificate verification is disabled");
        }

        let http_client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!self.verify_tls)
            .https_only(self.https_only)
            // a 302 means the credentials were refused
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
            })?;

        let mut registered = ResourceCatalog::new();
        for pending in self.resources {
            let resource = match pending {
                PendingResource::Data(name) => Resource::data(&base_url, name)?,
                PendingResource::Action { name, method, path } => {
                    Resource::action(&base_url, name, method, &path)?
                }
            };
            registered.insert(resource);
        }

        Ok(Client {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                username,
                password,
                timeout: self.timeout,
                registered,
                discover_resources: self.discover_resources,
                discovered: OnceCell::new(),
                cache: ResponseCache::new(),
                virtual_domain: RwLock::new(self.virtual_domain),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
