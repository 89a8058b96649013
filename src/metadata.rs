//! Request descriptors and low-level request metadata.

use crate::cache::CacheKey;
use http::Method;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// Query parameters of a data request, kept sorted by name.
pub type QueryParams = BTreeMap<String, String>;

/// Query parameter carrying the virtual domain of a request.
pub const VIRTUAL_DOMAIN_PARAM: &str = "_ctx.domain";

/// Describes one logical request against a named resource.
///
/// Two descriptors with the same resource name and the same parameter set
/// are equal regardless of the order the parameters were added in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    resource_name: String,
    query_params: QueryParams,
    is_data_resource: bool,
}

impl RequestDescriptor {
    /// Creates a descriptor for a data resource.
    pub fn data(resource_name: impl Into<String>, query_params: QueryParams) -> Self {
        Self {
            resource_name: resource_name.into(),
            query_params,
            is_data_resource: true,
        }
    }

    /// Creates a descriptor for an action resource.
    pub fn action(resource_name: impl Into<String>, query_params: QueryParams) -> Self {
        Self {
            resource_name: resource_name.into(),
            query_params,
            is_data_resource: false,
        }
    }

    /// The resource name.
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    /// The query parameters.
    pub fn query_params(&self) -> &QueryParams {
        &self.query_params
    }

    /// Whether the descriptor targets a data resource.
    pub fn is_data_resource(&self) -> bool {
        self.is_data_resource
    }

    /// The cache key for this descriptor, or `None` for action resources.
    pub fn cache_key(&self) -> Option<CacheKey> {
        self.is_data_resource
            .then(|| CacheKey::new(&self.resource_name, &self.query_params))
    }
}

/// Converts a JSON object into query parameters.
///
/// Strings are used as-is; numbers and booleans use their JSON text. `null`
/// values are skipped.
///
/// # Errors
///
/// Returns an error if `params` is not an object (or `null`) or contains
/// nested arrays/objects.
pub fn query_params_from_json(params: &Value) -> crate::Result<QueryParams> {
    let object = match params {
        Value::Null => return Ok(QueryParams::new()),
        Value::Object(object) => object,
        other => {
            return Err(crate::Error::ConfigurationError(format!(
                "query parameters must be a JSON object, got {}",
                other
            )))
        }
    };

    let mut query = QueryParams::new();
    for (key, value) in object {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Bool(_) | Value::Number(_) => value.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(crate::Error::ConfigurationError(format!(
                    "query parameter '{}' must be a scalar",
                    key
                )))
            }
        };
        query.insert(key.clone(), text);
    }
    Ok(query)
}

/// Metadata for an individual HTTP call.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// The HTTP method.
    pub method: Method,

    /// The absolute URL of the resource.
    pub url: Url,

    /// Query parameters appended to the URL.
    pub query_params: Vec<(String, String)>,

    /// Optional JSON body.
    pub body: Option<Value>,

    /// Timeout for this call.
    pub timeout: Option<Duration>,
}

impl RequestMetadata {
    /// Creates a new `RequestMetadata` with the given method and URL.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            query_params: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    /// Adds multiple query parameters to the request.
    pub fn with_query_params(
        mut self,
        params: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        self.query_params.extend(params);
        self
    }

    /// Sets the JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_equality_ignores_insertion_order() {
        let mut a = QueryParams::new();
        a.insert("ipAddress".into(), "10.0.0.1".into());
        a.insert("reachability".into(), "REACHABLE".into());

        let mut b = QueryParams::new();
        b.insert("reachability".into(), "REACHABLE".into());
        b.insert("ipAddress".into(), "10.0.0.1".into());

        let first = RequestDescriptor::data("Devices", a);
        let second = RequestDescriptor::data("Devices", b);
        assert_eq!(first, second);
        assert_eq!(first.cache_key(), second.cache_key());
    }

    #[test]
    fn test_action_descriptor_has_no_cache_key() {
        let descriptor = RequestDescriptor::action("updateAccessPoint", QueryParams::new());
        assert!(!descriptor.is_data_resource());
        assert!(descriptor.cache_key().is_none());
    }

    #[test]
    fn test_query_params_from_json() {
        let params = json!({
            "deviceName": "startsWith(\"ap\")",
            ".maxResults": 10,
            "ignored": null,
            ".full": true,
        });
        let query = query_params_from_json(&params).unwrap();
        assert_eq!(query.get("deviceName").unwrap(), "startsWith(\"ap\")");
        assert_eq!(query.get(".maxResults").unwrap(), "10");
        assert_eq!(query.get(".full").unwrap(), "true");
        assert!(!query.contains_key("ignored"));
    }

    #[test]
    fn test_query_params_reject_nested_values() {
        assert!(query_params_from_json(&json!({"a": [1, 2]})).is_err());
        assert!(query_params_from_json(&json!("flat")).is_err());
        assert!(query_params_from_json(&Value::Null).unwrap().is_empty());
    }
}
