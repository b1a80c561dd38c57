use serde::Deserialize;

use crate::model::SortOrder;

fn default_limit() -> i64 {
    100
}

/// Offset/limit pagination shared by every list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: default_limit(),
            sort_order: SortOrder::Asc,
        }
    }
}

impl PaginationParams {
    /// Clamps to sane bounds so a pathological query string can't force an
    /// unbounded scan.
    pub fn offset(&self) -> i64 {
        self.offset.max(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, 500)
    }
}
