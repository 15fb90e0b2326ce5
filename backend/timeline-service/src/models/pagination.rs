use serde::Serialize;

/// Page-number pagination parsed from request query parameters.
///
/// `page` is 1-indexed. Both values arrive as raw strings and are coerced:
/// anything that is not a positive integer falls back to the default, and
/// `limit` is capped at `max_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    pub fn from_query(
        page: Option<&str>,
        limit: Option<&str>,
        default_limit: i64,
        max_limit: i64,
    ) -> Self {
        let page = coerce_positive(page).unwrap_or(1);
        let limit = coerce_positive(limit)
            .unwrap_or(default_limit)
            .min(max_limit.max(1));

        Self::new(page, limit)
    }

    /// Rows to skip: `(page - 1) * limit`
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Whether rows remain after this page: `page * limit < total`
    pub fn has_more(&self, total: i64) -> bool {
        self.page.saturating_mul(self.limit) < total
    }
}

fn coerce_positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
}

/// The `pagination` block of the response envelope.
///
/// Feed-style endpoints report `hasMore`, comment listings report `hasNext`;
/// exactly one of the two is serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_next: Option<bool>,
}

impl Pagination {
    /// Pagination block using the `hasMore` key
    pub fn with_has_more(request: PageRequest, total: i64) -> Self {
        Self {
            has_more: Some(request.has_more(total)),
            ..Self::base(request, total)
        }
    }

    /// Pagination block using the `hasNext` key
    pub fn with_has_next(request: PageRequest, total: i64) -> Self {
        Self {
            has_next: Some(request.has_more(total)),
            ..Self::base(request, total)
        }
    }

    fn base(request: PageRequest, total: i64) -> Self {
        let total = total.max(0);
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages: (total + request.limit - 1) / request.limit,
            has_more: None,
            has_next: None,
        }
    }
}
