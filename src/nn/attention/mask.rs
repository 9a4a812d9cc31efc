use serde::{Deserialize, Serialize};

/// Which key positions each query row may attend to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionMask {
    /// Every query sees every key.
    #[default]
    None,
    /// Query row `i` sees key columns `0..=i` only.
    ///
    /// Rows are aligned at the top-left corner, so when there are fewer keys than `i + 1`
    /// the whole row stays visible.
    Causal,
}

impl AttentionMask {
    /// Number of leading key columns visible to query row `row` out of `kv_len`.
    pub fn visible(&self, row: usize, kv_len: usize) -> usize {
        match self {
            Self::None => kv_len,
            Self::Causal => (row + 1).min(kv_len),
        }
    }

    pub fn is_visible(&self, row: usize, col: usize, kv_len: usize) -> bool {
        col < self.visible(row, kv_len)
    }
}
