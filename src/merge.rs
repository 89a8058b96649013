//! Merging of paged responses into one result.

use crate::paging::malformed;
use crate::{Error, Result};
use serde_json::{Map, Value};

/// Extracts the `queryResponse.entity` array of one page.
///
/// A page without an `entity` key contributes no entries; the API leaves the
/// key out when a page is empty.
pub fn page_entities(body: &Value) -> Result<Vec<Value>> {
    let envelope = body
        .get("queryResponse")
        .and_then(Value::as_object)
        .ok_or_else(|| malformed("missing queryResponse object", body))?;

    match envelope.get("entity") {
        None => Ok(Vec::new()),
        Some(Value::Array(entities)) => Ok(entities.clone()),
        Some(_) => Err(malformed("queryResponse.entity is not an array", body)),
    }
}

/// Combines the first-page envelope with every page's entities.
///
/// `pages` must be in page order, starting with the first page's own
/// entities. The merged envelope keeps the first page's attributes and
/// rewrites `@count`, `@first`, `@last` and `entity`.
///
/// # Errors
///
/// Returns [`Error::PaginationIntegrity`] when the merged entry count differs
/// from `expected_total`.
pub fn merge_pages(
    first_page: &Value,
    pages: Vec<Vec<Value>>,
    expected_total: u64,
) -> Result<Value> {
    let mut envelope: Map<String, Value> = first_page
        .get("queryResponse")
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| malformed("missing queryResponse object", first_page))?;

    let entities: Vec<Value> = pages.into_iter().flatten().collect();
    let actual = entities.len() as u64;
    if actual != expected_total {
        return Err(Error::PaginationIntegrity {
            expected: expected_total,
            actual,
        });
    }

    envelope.insert("@count".to_string(), Value::from(actual));
    envelope.insert("@first".to_string(), Value::from(0u64));
    envelope.insert("@last".to_string(), Value::from(actual.saturating_sub(1)));
    envelope.insert("entity".to_string(), Value::Array(entities));

    let mut merged = Map::new();
    merged.insert("queryResponse".to_string(), Value::Object(envelope));
    Ok(Value::Object(merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn first_page() -> Value {
        json!({
            "queryResponse": {
                "@type": "Devices",
                "@requestUrl": "https://prime/webacs/api/v4/data/Devices",
                "@count": "5",
                "@first": "0",
                "@last": "1",
                "entity": [{"id": 0}, {"id": 1}]
            }
        })
    }

    #[test]
    fn test_merge_keeps_page_order() {
        let pages = vec![
            page_entities(&first_page()).unwrap(),
            vec![json!({"id": 2}), json!({"id": 3})],
            vec![json!({"id": 4})],
        ];

        let merged = merge_pages(&first_page(), pages, 5).unwrap();
        let envelope = &merged["queryResponse"];
        assert_eq!(envelope["@type"], "Devices");
        assert_eq!(envelope["@count"], 5);
        assert_eq!(envelope["@last"], 4);

        let ids: Vec<u64> = envelope["entity"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_merge_count_mismatch() {
        let pages = vec![page_entities(&first_page()).unwrap()];
        match merge_pages(&first_page(), pages, 5) {
            Err(Error::PaginationIntegrity { expected, actual }) => {
                assert_eq!(expected, 5);
                assert_eq!(actual, 2);
            }
            other => panic!("Expected PaginationIntegrity, got {:?}", other),
        }
    }

    #[test]
    fn test_page_entities_edge_cases() {
        assert!(page_entities(&json!({"queryResponse": {"@count": 0}}))
            .unwrap()
            .is_empty());
        assert!(matches!(
            page_entities(&json!({"entity": []})),
            Err(Error::MalformedResponse { .. })
        ));
        assert!(matches!(
            page_entities(&json!({"queryResponse": {"entity": {"id": 1}}})),
            Err(Error::MalformedResponse { .. })
        ));
    }
}
