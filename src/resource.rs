//! Catalog of the resources exposed by the API.
//!
//! The API exposes two kinds of resources:
//!
//! - **Data resources** return collected data (devices, clients, alarms...)
//!   and are paged and cached.
//! - **Action resources** change the configuration of the server. They are
//!   called once per request and never cached.
//!
//! The catalog maps each name to its kind and URL. It is filled from the
//! client builder and from the API's own listings (`data.json`, `op.json`).

use crate::paging::malformed;
use crate::{Error, Result};
use http::Method;
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

/// The kind of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    /// A read-only, paged resource.
    Data,
    /// A resource that performs an operation with the given HTTP method.
    Action {
        /// The HTTP method of the operation.
        method: Method,
    },
}

impl ResourceKind {
    /// Returns `true` for data resources.
    pub fn is_data(&self) -> bool {
        matches!(self, ResourceKind::Data)
    }
}

/// A named resource and its endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// The resource name, e.g. `Devices`.
    pub name: String,
    /// Data or action.
    pub kind: ResourceKind,
    /// The JSON endpoint of the resource.
    pub url: Url,
}

impl Resource {
    /// A data resource served at `{base}/data/{name}.json`.
    pub fn data(base_url: &Url, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let url = endpoint(base_url, &format!("data/{}", name))?;
        Ok(Self {
            name,
            kind: ResourceKind::Data,
            url,
        })
    }

    /// An action resource served at `{base}/op/{path}.json`.
    pub fn action(
        base_url: &Url,
        name: impl Into<String>,
        method: Method,
        path: &str,
    ) -> Result<Self> {
        let url = endpoint(base_url, &format!("op/{}", path.trim_matches('/')))?;
        Ok(Self {
            name: name.into(),
            kind: ResourceKind::Action { method },
            url,
        })
    }
}

/// Appends `path` plus a `.json` suffix to `base_url`.
pub(crate) fn endpoint(base_url: &Url, path: &str) -> Result<Url> {
    let mut url = base_url.clone();
    {
        let mut segments = url.path_segments_mut().map_err(|_| {
            Error::ConfigurationError(format!("Base URL cannot be a base: {}", base_url))
        })?;
        segments.pop_if_empty();
        segments.extend(path.split('/'));
    }
    let with_suffix = format!("{}.json", url.path());
    url.set_path(&with_suffix);
    Ok(url)
}

/// Name-indexed set of resources.
#[derive(Debug, Clone, Default)]
pub struct ResourceCatalog {
    resources: BTreeMap<String, Resource>,
}

impl ResourceCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a resource.
    pub fn insert(&mut self, resource: Resource) {
        self.resources.insert(resource.name.clone(), resource);
    }

    /// Looks up a resource by name.
    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    /// Iterates over the resources in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Number of resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns `true` if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Names of the data resources, sorted.
    pub fn data_names(&self) -> Vec<String> {
        self.names(true)
    }

    /// Names of the action resources, sorted.
    pub fn action_names(&self) -> Vec<String> {
        self.names(false)
    }

    fn names(&self, data: bool) -> Vec<String> {
        self.resources
            .values()
            .filter(|r| r.kind.is_data() == data)
            .map(|r| r.name.clone())
            .collect()
    }

    /// Adds the data resources listed by the `data.json` endpoint.
    ///
    /// Each entry of `queryResponse.entityType` carries the name in `$` and
    /// the resource URL in `@url`.
    pub fn add_data_listing(&mut self, base_url: &Url, listing: &Value) -> Result<()> {
        for entry in listing_entries(listing, "entityType")? {
            let name = entry_str(entry, "$", listing)?;
            let resource = match entry.get("@url").and_then(Value::as_str) {
                Some(raw) => Resource {
                    name: name.to_string(),
                    kind: ResourceKind::Data,
                    url: Url::parse(&format!("{}.json", raw.trim_end_matches('/')))?,
                },
                None => Resource::data(base_url, name)?,
            };
            self.insert(resource);
        }
        Ok(())
    }

    /// Adds the action resources listed by the `op.json` endpoint.
    ///
    /// Each entry of `queryResponse.operation` carries the name in `$`, the
    /// method in `@httpMethod` and the path below `op/` in `@path`.
    pub fn add_operation_listing(&mut self, base_url: &Url, listing: &Value) -> Result<()> {
        for entry in listing_entries(listing, "operation")? {
            let name = entry_str(entry, "$", listing)?;
            let method_name = entry_str(entry, "@httpMethod", listing)?;
            let path = entry_str(entry, "@path", listing)?;
            let method = Method::from_bytes(method_name.to_ascii_uppercase().as_bytes())
                .map_err(|_| malformed(&format!("invalid @httpMethod {}", method_name), listing))?;
            self.insert(Resource::action(base_url, name, method, path)?);
        }
        Ok(())
    }
}

impl Extend<Resource> for ResourceCatalog {
    fn extend<I: IntoIterator<Item = Resource>>(&mut self, iter: I) {
        for resource in iter {
            self.insert(resource);
        }
    }
}

fn listing_entries<'a>(listing: &'a Value, field: &str) -> Result<&'a Vec<Value>> {
    let envelope = listing
        .get("queryResponse")
        .ok_or_else(|| malformed("missing queryResponse object", listing))?;
    match envelope.get(field) {
        Some(Value::Array(entries)) => Ok(entries),
        _ => Err(malformed(
            &format!("missing queryResponse.{} array", field),
            listing,
        )),
    }
}

fn entry_str<'a>(entry: &'a Value, field: &str, listing: &Value) -> Result<&'a str> {
    entry
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(&format!("listing entry without {}", field), listing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Url {
        Url::parse("https://prime.example.com/webacs/api/v4").unwrap()
    }

    #[test]
    fn test_endpoints() {
        let devices = Resource::data(&base(), "Devices").unwrap();
        assert_eq!(
            devices.url.as_str(),
            "https://prime.example.com/webacs/api/v4/data/Devices.json"
        );

        let update = Resource::action(
            &base(),
            "updateAccessPoint",
            Method::PUT,
            "apService/accessPoint",
        )
        .unwrap();
        assert_eq!(
            update.url.as_str(),
            "https://prime.example.com/webacs/api/v4/op/apService/accessPoint.json"
        );

        let trailing = Url::parse("https://prime.example.com/webacs/api/v4/").unwrap();
        assert_eq!(
            Resource::data(&trailing, "Clients").unwrap().url.path(),
            "/webacs/api/v4/data/Clients.json"
        );
    }

    #[test]
    fn test_listings() {
        let data = json!({"queryResponse": {"entityType": [
            {"$": "Devices", "@url": "https://prime.example.com/webacs/api/v4/data/Devices"},
            {"$": "Clients"}
        ]}});
        let ops = json!({"queryResponse": {"operation": [
            {"$": "updateAccessPoint", "@httpMethod": "put", "@path": "apService/accessPoint"},
            {"$": "deleteGroup", "@httpMethod": "DELETE", "@path": "groups/group"}
        ]}});

        let mut catalog = ResourceCatalog::new();
        catalog.add_data_listing(&base(), &data).unwrap();
        catalog.add_operation_listing(&base(), &ops).unwrap();

        assert_eq!(catalog.data_names(), vec!["Clients", "Devices"]);
        assert_eq!(catalog.action_names(), vec!["deleteGroup", "updateAccessPoint"]);
        assert_eq!(
            catalog.get("updateAccessPoint").unwrap().kind,
            ResourceKind::Action { method: Method::PUT }
        );
        assert_eq!(
            catalog.get("Devices").unwrap().url.path(),
            "/webacs/api/v4/data/Devices.json"
        );
    }

    #[test]
    fn test_malformed_listing() {
        let mut catalog = ResourceCatalog::new();
        let err = catalog
            .add_data_listing(&base(), &json!({"queryResponse": {}}))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));

        let err = catalog
            .add_operation_listing(
                &base(),
                &json!({"queryResponse": {"operation": [{"$": "x", "@path": "y"}]}}),
            )
            .unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
    }
}
