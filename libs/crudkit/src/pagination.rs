//! Page parameters and paginated results

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_PAGE_LIMIT: u64 = 20;
pub const DEFAULT_SORT: &str = "created_at";
pub const DEFAULT_ORDER: &str = "desc";

/// Largest OFFSET accepted by the SQL backends (a signed 64-bit integer).
const MAX_OFFSET: u64 = i64::MAX as u64;

/// Row offset of a 1-based page, saturating instead of overflowing.
pub fn page_offset(page: u64, limit: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(limit).min(MAX_OFFSET)
}

/// Fallbacks used when a request leaves page parameters empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDefaults {
    pub limit: u64,
    /// Upper bound applied to requested limits, if any.
    pub max_limit: Option<u64>,
    pub sort: String,
    pub order: String,
}

impl Default for PageDefaults {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            max_limit: None,
            sort: DEFAULT_SORT.to_string(),
            order: DEFAULT_ORDER.to_string(),
        }
    }
}

/// Page parameters as supplied by a caller, before normalization.
///
/// `sort` and `order` may hold comma-separated lists that pair up by
/// position: `sort=status,created_at&order=asc,desc`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub sort: String,
    #[serde(default)]
    pub order: String,
    #[serde(default)]
    pub filter: BTreeMap<String, String>,
    #[serde(default, rename = "q")]
    pub search: Option<String>,
}

impl PageParams {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page,
            limit,
            ..Self::default()
        }
    }

    pub fn sorted_by(mut self, sort: impl Into<String>, order: impl Into<String>) -> Self {
        self.sort = sort.into();
        self.order = order.into();
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter.insert(key.into(), value.into());
        self
    }

    /// Collect `filter[key]=value` pairs from raw query parameters.
    pub fn with_query_filters<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in pairs {
            let key = key.as_ref();
            if let Some(inner) = key
                .strip_prefix("filter[")
                .and_then(|rest| rest.strip_suffix(']'))
            {
                if !inner.is_empty() {
                    self.filter.insert(inner.to_string(), value.into());
                }
            }
        }
        self
    }

    /// Apply defaults and clamps.
    pub fn resolve(&self, defaults: &PageDefaults) -> PageRequest {
        let page = u64::try_from(self.page).unwrap_or(0).max(1);
        let mut limit = match u64::try_from(self.limit) {
            Ok(limit) if limit > 0 => limit,
            _ => defaults.limit.max(1),
        };
        if let Some(max) = defaults.max_limit {
            limit = limit.min(max.max(1));
        }
        let sort = if self.sort.trim().is_empty() {
            defaults.sort.clone()
        } else {
            self.sort.clone()
        };
        let order = if self.order.trim().is_empty() {
            defaults.order.clone()
        } else {
            self.order.clone()
        };

        PageRequest {
            page,
            limit,
            sort,
            order,
        }
    }
}

/// Normalized page window with sort instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
    pub sort: String,
    pub order: String,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        page_offset(self.page, self.limit)
    }

    /// Pair each sort field with its direction. Missing or unrecognized
    /// directions fall back to ascending.
    pub fn sort_fields(&self) -> Vec<(String, SortOrder)> {
        let orders: Vec<&str> = self.order.split(',').map(str::trim).collect();
        self.sort
            .split(',')
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .enumerate()
            .map(|(i, field)| {
                let order = orders.get(i).copied().map(SortOrder::parse).unwrap_or_default();
                (field.to_string(), order)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// One page of results plus navigation metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total_count: u64, page: u64, limit: u64) -> Self {
        let limit = if limit == 0 { DEFAULT_PAGE_LIMIT } else { limit };
        let page = page.max(1);
        let total_pages = total_count.div_ceil(limit);

        Self {
            items,
            total_count,
            page,
            limit,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
            has_next: self.has_next,
            has_prev: self.has_prev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_page_metadata() {
        let page = Paginated::new(vec![0u8; 10], 25, 2, 10);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next);
        assert!(page.has_prev);
    }

    #[test]
    fn single_page_metadata() {
        let page = Paginated::new(vec![0u8; 5], 5, 1, 20);
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_next);
        assert!(!page.has_prev);
    }

    #[test]
    fn zero_limit_uses_default() {
        let page = Paginated::<u8>::new(Vec::new(), 45, 0, 0);
        assert_eq!(page.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn empty_result_has_no_pages() {
        let page = Paginated::<u8>::new(Vec::new(), 0, 1, 10);
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next);
    }

    #[test]
    fn resolve_applies_defaults_and_clamps() {
        let req = PageParams::new(-3, 0).resolve(&PageDefaults::default());
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, 20);
        assert_eq!(req.sort, "created_at");
        assert_eq!(req.order, "desc");
        assert_eq!(req.offset(), 0);

        let defaults = PageDefaults {
            max_limit: Some(50),
            ..PageDefaults::default()
        };
        let req = PageParams::new(3, 500).resolve(&defaults);
        assert_eq!(req.limit, 50);
        assert_eq!(req.offset(), 100);
    }

    #[test]
    fn huge_pages_saturate_the_offset() {
        let req = PageParams::new(i64::MAX, 100).resolve(&PageDefaults::default());
        assert_eq!(req.offset(), i64::MAX as u64);
        assert_eq!(page_offset(0, 10), 0);
        assert_eq!(page_offset(3, 10), 20);
    }

    #[test]
    fn sort_fields_pair_by_position() {
        let req = PageParams::new(1, 10)
            .sorted_by("status, created_at,title", "desc,sideways")
            .resolve(&PageDefaults::default());
        assert_eq!(
            req.sort_fields(),
            vec![
                ("status".to_string(), SortOrder::Desc),
                ("created_at".to_string(), SortOrder::Asc),
                ("title".to_string(), SortOrder::Asc),
            ]
        );
    }

    #[test]
    fn query_filters_are_extracted() {
        let params = PageParams::default().with_query_filters([
            ("filter[status]", "open"),
            ("page", "2"),
            ("filter[]", "ignored"),
        ]);
        assert_eq!(params.filter.len(), 1);
        assert_eq!(params.filter.get("status").map(String::as_str), Some("open"));
    }
}
