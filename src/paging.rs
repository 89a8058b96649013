//! Page planning for data resources.
//!
//! A data request starts by fetching page 0, whose envelope reports the
//! total number of entries in `queryResponse.@count`. The remaining pages are
//! planned from that total.

use crate::{Error, Result};
use serde_json::Value;

/// Query parameter asking for detailed (not summary) entries.
pub const FULL_PARAM: &str = ".full";
/// Query parameter holding the offset of the first entry of a page.
pub const FIRST_RESULT_PARAM: &str = ".firstResult";
/// Query parameter holding the page size.
pub const MAX_RESULTS_PARAM: &str = ".maxResults";

/// Most pages a single data request may span, page 0 included.
pub const MAX_PAGES: u64 = 1_000_000;

/// Reads the total entry count from a response envelope.
///
/// The API serializes `@count` either as a string or as a number.
pub fn total_count(body: &Value) -> Result<u64> {
    let count = body
        .pointer("/queryResponse/@count")
        .ok_or_else(|| malformed("missing queryResponse.@count", body))?;

    let parsed = match count {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| malformed(&format!("invalid queryResponse.@count {}", count), body))
}

/// Number of pages still needed after page 0.
///
/// Returns `ceil((total - paging_size) / paging_size)`, or zero when the
/// first page already covers everything.
pub fn additional_pages(total: u64, paging_size: u64) -> u64 {
    if paging_size == 0 || total <= paging_size {
        return 0;
    }
    (total - paging_size).div_ceil(paging_size)
}

/// Like [`additional_pages`], but rejects totals no server would report.
///
/// # Errors
///
/// Returns [`Error::MalformedResponse`] when `total` needs more than
/// [`MAX_PAGES`] pages, or when the offset of the last page does not fit in a
/// `u64`.
pub fn plan_additional_pages(total: u64, paging_size: u64, body: &Value) -> Result<u64> {
    let remaining = additional_pages(total, paging_size);
    if remaining >= MAX_PAGES {
        return Err(malformed(
            &format!(
                "queryResponse.@count {} needs more than {} pages of {}",
                total, MAX_PAGES, paging_size
            ),
            body,
        ));
    }
    if remaining.checked_mul(paging_size).is_none() {
        return Err(malformed(
            &format!("queryResponse.@count {} overflows the page offset", total),
            body,
        ));
    }
    Ok(remaining)
}

/// Offset of the first entry of `page`.
pub fn first_result(page: u64, paging_size: u64) -> u64 {
    page.saturating_mul(paging_size)
}

/// Returns `true` for parameters the pager sets itself.
pub fn is_paging_param(name: &str) -> bool {
    matches!(name, FULL_PARAM | FIRST_RESULT_PARAM | MAX_RESULTS_PARAM)
}

/// Query parameters selecting one detailed page.
pub fn page_params(page: u64, paging_size: u64) -> [(String, String); 3] {
    [
        (FULL_PARAM.to_string(), "true".to_string()),
        (
            FIRST_RESULT_PARAM.to_string(),
            first_result(page, paging_size).to_string(),
        ),
        (MAX_RESULTS_PARAM.to_string(), paging_size.to_string()),
    ]
}

pub(crate) fn malformed(reason: &str, body: &Value) -> Error {
    Error::MalformedResponse {
        reason: reason.to_string(),
        raw_response: body.to_string(),
    }
}
