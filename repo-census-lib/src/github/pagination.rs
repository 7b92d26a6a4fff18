//! Exact item counts for paginated list endpoints.
//!
//! Only two pages are ever fetched: the first, which tells us the page size and
//! where the last page lives, and the last, which tells us how many items spill
//! over. Everything in between is implied.

use super::client::{ApiResponse, GitHubClient, ResponseShape};
use crate::Result;
use ohno::{EnrichableExt, app_err, bail};
use reqwest::header::LINK;
use url::Url;

const LOG_TARGET: &str = "    github";

/// Where the last page lives and its number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastPage {
    pub url: String,
    pub page: u64,
}

/// Find the `rel="last"` entry of a `Link` header and extract its `page` query parameter.
pub fn parse_last_page(link_header: &str) -> Result<LastPage> {
    for part in link_header.split(',') {
        let mut target = None;
        let mut is_last = false;

        for segment in part.split(';') {
            let segment = segment.trim();
            if let Some(inner) = segment.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                target = Some(inner);
            } else if let Some(rel) = segment.strip_prefix("rel=") {
                is_last = rel.trim_matches('"').split_whitespace().any(|r| r == "last");
            }
        }

        if !is_last {
            continue;
        }

        let Some(target) = target else {
            bail!("malformed Link header, rel=\"last\" entry has no URL: '{link_header}'");
        };

        let url = Url::parse(target).map_err(|e| app_err!("malformed last page URL '{target}': {e}"))?;
        let Some((_, page)) = url.query_pairs().find(|(key, _)| key == "page") else {
            bail!("last page URL '{target}' has no page parameter");
        };

        let page: u64 = page
            .parse()
            .map_err(|e| app_err!("last page URL '{target}' has an invalid page parameter '{page}': {e}"))?;
        if page == 0 {
            bail!("last page URL '{target}' has page number 0");
        }

        return Ok(LastPage {
            url: target.to_string(),
            page,
        });
    }

    bail!("Link header has no rel=\"last\" entry: '{link_header}'")
}

/// Total items across `last_page` pages of `per_page` items, the last holding `on_last_page`.
fn total_items(last_page: u64, per_page: u64, on_last_page: u64) -> Result<u64> {
    last_page
        .checked_sub(1)
        .and_then(|full_pages| full_pages.checked_mul(per_page))
        .and_then(|items| items.checked_add(on_last_page))
        .ok_or_else(|| app_err!("item count overflows: {last_page} pages of {per_page} items plus {on_last_page}"))
}

/// Items on a page, as reported by a JSON array payload.
fn page_len(response: &ApiResponse, resource: &str) -> Result<u64> {
    response
        .payload
        .as_json()
        .and_then(serde_json::Value::as_array)
        .map(|items| items.len() as u64)
        .ok_or_else(|| app_err!("expected a JSON array from '{resource}' (status {})", response.status))
}

impl GitHubClient {
    /// Count the items of a list endpoint.
    pub async fn count(&self, resource: &str) -> Result<u64> {
        let first = self.get(resource, ResponseShape::Structured).await?;
        let per_page = page_len(&first, resource)?;

        let Some(link) = first.headers.get(LINK) else {
            return Ok(per_page);
        };

        let link = link
            .to_str()
            .map_err(|e| app_err!("Link header from '{resource}' is not valid text: {e}"))?;
        let last = parse_last_page(link).map_err(|e| e.enrich_with(|| format!("could not count '{resource}'")))?;

        log::debug!(target: LOG_TARGET, "'{resource}' has {} pages of {per_page} items", last.page);

        let last_response = self.get(&last.url, ResponseShape::Structured).await?;
        let on_last_page = page_len(&last_response, &last.url)?;

        total_items(last.page, per_page, on_last_page)
            .map_err(|e| e.enrich_with(|| format!("could not count '{resource}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_last_page() {
        let link = r#"<https://api.github.com/repositories/1/commits?page=2>; rel="next", <https://api.github.com/repositories/1/commits?page=5>; rel="last""#;
        let last = parse_last_page(link).unwrap();
        assert_eq!(last.page, 5);
        assert_eq!(last.url, "https://api.github.com/repositories/1/commits?page=5");
    }

    #[test]
    fn test_parse_last_page_with_other_params() {
        let link = r#"<https://api.github.com/repos/a/b/issues?state=all&page=12&per_page=30>; rel="last""#;
        assert_eq!(parse_last_page(link).unwrap().page, 12);
    }

    #[test]
    fn test_parse_last_page_missing_rel_last() {
        let link = r#"<https://api.github.com/repos/a/b/issues?page=2>; rel="next""#;
        let err = parse_last_page(link).unwrap_err();
        assert!(format!("{err}").contains("rel=\"last\""));
    }

    #[test]
    fn test_parse_last_page_malformed_url() {
        assert!(parse_last_page(r#"<not a url>; rel="last""#).is_err());
    }

    #[test]
    fn test_parse_last_page_missing_page() {
        assert!(parse_last_page(r#"<https://api.github.com/repos/a/b/issues?per_page=30>; rel="last""#).is_err());
    }

    #[test]
    fn test_parse_last_page_non_numeric_page() {
        assert!(parse_last_page(r#"<https://api.github.com/repos/a/b/issues?page=abc>; rel="last""#).is_err());
    }

    #[test]
    fn test_parse_last_page_zero_page() {
        assert!(parse_last_page(r#"<https://api.github.com/repos/a/b/issues?page=0>; rel="last""#).is_err());
    }

    #[test]
    fn test_total_items() {
        assert_eq!(total_items(5, 30, 3).unwrap(), 123);
        assert_eq!(total_items(1, 30, 30).unwrap(), 30);
    }

    #[test]
    fn test_total_items_overflow() {
        assert!(total_items(u64::MAX, 3, 1).is_err());
        assert!(total_items(2, u64::MAX, 1).is_err());
        assert!(total_items(0, 30, 1).is_err());
    }

    #[test]
    fn test_parse_last_page_empty_header() {
        assert!(parse_last_page("").is_err());
    }
}
