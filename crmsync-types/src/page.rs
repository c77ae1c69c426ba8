//! Paginated list envelope.

use serde::{Deserialize, Serialize};

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(alias = "data")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub skip: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl<T> Page<T> {
    /// Returns true if the backend reports more items after this page.
    pub fn has_more(&self) -> bool {
        match self.total {
            Some(total) => {
                let seen = u64::from(self.skip.unwrap_or(0)) + self.items.len() as u64;
                seen < total
            }
            None => false,
        }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: None,
            skip: None,
            limit: None,
        }
    }
}
