//! Paging parameters of query requests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Date format of `date_from` / `date_to`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Sort order of query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sort {
    Asc,
    Desc,
}

impl Sort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sort::Asc => "asc",
            Sort::Desc => "desc",
        }
    }

    /// Case-insensitive parse
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Sort::Asc),
            "desc" => Some(Sort::Desc),
            _ => None,
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Paging window for a query; every field independently optional
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paging {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<Sort>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// Raw paging query parameters, as strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PagingQuery {
    pub page: Option<String>,
    pub size: Option<String>,
    pub sort: Option<String>,
    #[serde(alias = "dateFrom")]
    pub date_from: Option<String>,
    #[serde(alias = "dateTo")]
    pub date_to: Option<String>,
}

/// Paging parameter that failed to parse
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid paging parameter `{name}`: {value}")]
pub struct PagingError {
    pub name: &'static str,
    pub value: String,
}

impl Paging {
    pub fn is_empty(&self) -> bool {
        *self == Paging::default()
    }

    /// Parse raw query parameters. Blank values count as absent.
    pub fn parse(query: &PagingQuery) -> Result<Self, PagingError> {
        Ok(Self {
            page: parse_field(&query.page, "page", |v| v.parse::<u32>().ok())?,
            size: parse_field(&query.size, "size", |v| v.parse::<u32>().ok())?,
            sort: parse_field(&query.sort, "sort", Sort::parse)?,
            date_from: parse_field(&query.date_from, "date_from", parse_date)?,
            date_to: parse_field(&query.date_to, "date_to", parse_date)?,
        })
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

fn parse_field<T>(
    raw: &Option<String>,
    name: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, PagingError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse(value).map(Some).ok_or_else(|| PagingError {
            name,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> PagingQuery {
        let mut q = PagingQuery::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "page" => q.page = v,
                "size" => q.size = v,
                "sort" => q.sort = v,
                "date_from" => q.date_from = v,
                "date_to" => q.date_to = v,
                _ => unreachable!(),
            }
        }
        q
    }

    #[test]
    fn test_parse_all_fields() {
        let paging = Paging::parse(&query(&[
            ("page", "2"),
            ("size", "50"),
            ("sort", "DESC"),
            ("date_from", "2024-01-01"),
            ("date_to", "2024-01-31"),
        ]))
        .unwrap();

        assert_eq!(paging.page, Some(2));
        assert_eq!(paging.size, Some(50));
        assert_eq!(paging.sort, Some(Sort::Desc));
        assert_eq!(paging.date_from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(paging.date_to, NaiveDate::from_ymd_opt(2024, 1, 31));
    }

    #[test]
    fn test_blank_values_are_absent() {
        let paging = Paging::parse(&query(&[("page", ""), ("sort", "  ")])).unwrap();
        assert!(paging.is_empty());
    }

    #[test]
    fn test_invalid_values_are_named() {
        let err = Paging::parse(&query(&[("size", "-1")])).unwrap_err();
        assert_eq!(err.name, "size");

        let err = Paging::parse(&query(&[("sort", "sideways")])).unwrap_err();
        assert_eq!(err.name, "sort");

        let err = Paging::parse(&query(&[("date_to", "01/02/2024")])).unwrap_err();
        assert_eq!(err.name, "date_to");
        assert_eq!(err.value, "01/02/2024");
    }
}
