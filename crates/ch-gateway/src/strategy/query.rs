//! `ids:QueryMessage` → `POST {base}/messages/query/{pid}[?paging]`

use super::{decode_json, BackendBody, MessageStrategy};
use crate::domain::envelope::MessageType;
use crate::domain::error::BackendError;
use crate::domain::paging::{Paging, DATE_FORMAT};
use crate::domain::request::{BackendResponse, HandlerRequest, QueryResponse};

pub struct QueryStrategy {
    /// Send the `size` value under `page` (or `null` without a size) when a
    /// page is requested, as older deployments did
    legacy_page_param: bool,
}

impl QueryStrategy {
    pub fn new(legacy_page_param: bool) -> Self {
        Self { legacy_page_param }
    }

    /// `?page=..&size=..&sort=..&dateFrom=..&dateTo=..`, absent fields skipped.
    pub fn query_string(&self, paging: &Paging) -> String {
        let page = match paging.page {
            None => None,
            Some(page) if !self.legacy_page_param => Some(page.to_string()),
            Some(_) => Some(
                paging
                    .size
                    .map_or_else(|| "null".to_string(), |size| size.to_string()),
            ),
        };

        let params: Vec<(&str, Option<String>)> = vec![
            ("page", page),
            ("size", paging.size.map(|s| s.to_string())),
            ("sort", paging.sort.map(|s| s.as_str().to_string())),
            (
                "dateFrom",
                paging.date_from.map(|d| d.format(DATE_FORMAT).to_string()),
            ),
            (
                "dateTo",
                paging.date_to.map(|d| d.format(DATE_FORMAT).to_string()),
            ),
        ];

        let mut query = String::new();
        for (name, value) in params {
            if let Some(value) = value {
                query.push(if query.is_empty() { '?' } else { '&' });
                query.push_str(name);
                query.push('=');
                query.push_str(&value);
            }
        }
        query
    }
}

impl MessageStrategy for QueryStrategy {
    fn name(&self) -> &'static str {
        "query"
    }

    fn can_handle(&self, message_type: MessageType) -> bool {
        message_type == MessageType::QueryMessage
    }

    fn build_url(&self, base_url: &str, request: &HandlerRequest) -> String {
        let query = request
            .paging
            .as_ref()
            .map(|p| self.query_string(p))
            .unwrap_or_default();
        format!("{}/messages/query/{}{}", base_url, request.pid, query)
    }

    fn build_body(&self, request: &HandlerRequest) -> BackendBody {
        BackendBody::header_only(request)
    }

    fn parse_response(&self, body: &[u8]) -> Result<BackendResponse, BackendError> {
        decode_json::<QueryResponse>(body).map(BackendResponse::Query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::paging::Sort;
    use crate::strategy::test_support::request;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn full_paging(page: u32, size: u32) -> Paging {
        Paging {
            page: Some(page),
            size: Some(size),
            sort: Some(Sort::Asc),
            date_from: NaiveDate::from_ymd_opt(2024, 1, 1),
            date_to: NaiveDate::from_ymd_opt(2024, 1, 2),
        }
    }

    #[test]
    fn test_full_query_url() {
        let req = request(MessageType::QueryMessage, None, Some(full_paging(1, 1)));
        assert_eq!(
            QueryStrategy::new(false).build_url("http://ch", &req),
            "http://ch/messages/query/p-123?page=1&size=1&sort=asc&dateFrom=2024-01-01&dateTo=2024-01-02"
        );
    }

    #[test]
    fn test_partial_paging_skips_absent_fields() {
        let paging = Paging {
            size: Some(20),
            sort: Some(Sort::Desc),
            ..Default::default()
        };
        assert_eq!(
            QueryStrategy::new(false).query_string(&paging),
            "?size=20&sort=desc"
        );
        assert_eq!(QueryStrategy::new(false).query_string(&Paging::default()), "");
    }

    #[test]
    fn test_no_paging_no_query_string() {
        let req = request(MessageType::QueryMessage, None, None);
        assert_eq!(
            QueryStrategy::new(false).build_url("http://ch", &req),
            "http://ch/messages/query/p-123"
        );
    }

    #[test]
    fn test_legacy_page_param_sends_size() {
        let strategy = QueryStrategy::new(true);
        assert_eq!(
            strategy.query_string(&full_paging(3, 25)),
            "?page=25&size=25&sort=asc&dateFrom=2024-01-01&dateTo=2024-01-02"
        );
    }

    #[test]
    fn test_legacy_page_param_without_page() {
        let only_size = Paging {
            size: Some(25),
            ..Default::default()
        };
        assert_eq!(QueryStrategy::new(true).query_string(&only_size), "?size=25");
    }

    #[test]
    fn test_legacy_page_param_without_size() {
        let only_page = Paging {
            page: Some(3),
            sort: Some(Sort::Desc),
            ..Default::default()
        };
        assert_eq!(
            QueryStrategy::new(true).query_string(&only_page),
            "?page=null&sort=desc"
        );
        assert_eq!(QueryStrategy::new(false).query_string(&only_page), "?page=3&sort=desc");
    }

    #[test]
    fn test_query_body_has_no_payload() {
        let req = request(MessageType::QueryMessage, Some("ignored"), None);
        let body = serde_json::to_value(QueryStrategy::new(false).build_body(&req)).unwrap();
        assert!(body.get("payload").is_none());
        assert_eq!(body["header"]["@type"], "ids:QueryMessage");
    }

    #[test]
    fn test_parse_query_response() {
        let body = br#"{
            "date_from": "2024-01-01",
            "date_to": "2024-01-02",
            "page": 1,
            "size": 10,
            "order": "asc",
            "documents": [{"id": "doc-1"}]
        }"#;
        match QueryStrategy::new(false).parse_response(body).unwrap() {
            BackendResponse::Query(q) => {
                assert_eq!(q.documents.len(), 1);
                assert_eq!(q.order, "asc");
            }
            other => panic!("unexpected response {:?}", other),
        }
    }

    proptest! {
        #[test]
        fn prop_query_params_keep_fixed_order(
            page in proptest::option::of(0u32..1000),
            size in proptest::option::of(0u32..1000),
            desc in proptest::option::of(any::<bool>()),
        ) {
            let paging = Paging {
                page,
                size,
                sort: desc.map(|d| if d { Sort::Desc } else { Sort::Asc }),
                ..Default::default()
            };
            let query = QueryStrategy::new(false).query_string(&paging);
            let names: Vec<&str> = query
                .trim_start_matches('?')
                .split('&')
                .filter(|p| !p.is_empty())
                .map(|p| p.split('=').next().unwrap())
                .collect();
            let expected: Vec<&str> = [("page", page.is_some()), ("size", size.is_some()), ("sort", desc.is_some())]
                .iter()
                .filter(|(_, present)| *present)
                .map(|(name, _)| *name)
                .collect();
            prop_assert_eq!(names, expected);
            prop_assert_eq!(query.matches('?').count(), usize::from(!query.is_empty()));
        }
    }
}
