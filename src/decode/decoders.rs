//! Decoder implementations

use super::types::{NextLink, PaginationEnvelope, StatusClass};
use crate::error::{Error, Result};
use crate::http::ApiResponse;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::value::RawValue;
use url::Url;

/// Classify a response status before decoding.
///
/// 401 is fatal for the run, 404 means "nothing here for this seed", any
/// other non-success status is a plain request failure.
pub fn classify_status(response: &ApiResponse) -> Result<StatusClass> {
    match response.status {
        200..=299 => Ok(StatusClass::Success),
        401 => Err(Error::unauthorized(&response.url)),
        404 => Ok(StatusClass::IgnoreAndContinue),
        status => Err(Error::http_status(
            status,
            &response.url,
            response.body_text(),
        )),
    }
}

/// Decode a response body into `T`, keeping the URL and raw body on failure
pub fn decode_response<T: DeserializeOwned>(response: &ApiResponse) -> Result<T> {
    serde_json::from_slice(&response.body)
        .map_err(|e| Error::decode(&response.url, e.to_string(), response.body_text()))
}

/// Decode the full pagination envelope
pub fn decode_envelope(response: &ApiResponse) -> Result<PaginationEnvelope> {
    decode_response(response)
}

/// Number of pages needed for `size` records at `page_size` per page.
///
/// Any nonzero remainder adds a page. A zero page size yields zero pages.
pub fn total_pages(size: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let page_size = u64::from(page_size);
    let mut pages = size / page_size;
    if size % page_size > 0 {
        pages += 1;
    }
    u32::try_from(pages).unwrap_or(u32::MAX)
}

#[derive(Deserialize)]
struct NextOnly {
    #[serde(default)]
    next: Option<String>,
}

/// Decode the `next` link into the next page token.
///
/// The token is the `page` query parameter of the link, taken as-is; it need
/// not be sequential. Relative links are resolved against the request URL.
pub fn decode_next_link(response: &ApiResponse) -> Result<NextLink> {
    let body: NextOnly = decode_response(response)?;
    let next = match body.next {
        Some(next) if !next.is_empty() => next,
        _ => return Ok(NextLink::End),
    };

    let parsed = Url::parse(&response.url)
        .and_then(|base| base.join(&next))
        .map_err(|e| {
            Error::decode(
                &response.url,
                format!("invalid next link '{next}': {e}"),
                response.body_text(),
            )
        })?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "page")
        .map(|(_, value)| NextLink::Page(value.into_owned()))
        .ok_or_else(|| Error::MissingPageToken {
            url: response.url.clone(),
            next,
        })
}

#[derive(Deserialize)]
struct ValuesOnly {
    values: Vec<Box<RawValue>>,
}

/// Decode the `values` array into opaque documents
pub fn decode_raw_records(response: &ApiResponse) -> Result<Vec<Box<RawValue>>> {
    let body: ValuesOnly = decode_response(response)?;
    Ok(body.values)
}
