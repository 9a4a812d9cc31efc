use super::mask::AttentionMask;
use super::scorer::ScoreScale;
use crate::tensor::{Result, TensorError, WeightInit};
use serde::{Deserialize, Serialize};

/// Head combination as plain data, resolved into a `HeadCombiner` when the module is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineStrategy {
    #[default]
    Concat,
    ConcatProject {
        d_out: usize,
    },
    Average,
}

/// Hyper-parameters of a (multi-head) attention block.
///
/// Missing fields fall back to [`AttentionConfig::default`] when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttentionConfig {
    /// Embedding width `d`.
    pub d_in: usize,
    /// Query/key width.
    pub d_k: usize,
    /// Value (and context) width.
    pub d_v: usize,
    pub num_heads: usize,
    pub score_scale: ScoreScale,
    pub mask: AttentionMask,
    pub combine: CombineStrategy,
    pub init: WeightInit,
    pub parallel_heads: bool,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            d_in: 16,
            d_k: 24,
            d_v: 28,
            num_heads: 1,
            score_scale: ScoreScale::default(),
            mask: AttentionMask::default(),
            combine: CombineStrategy::default(),
            init: WeightInit::default(),
            parallel_heads: true,
        }
    }
}

impl AttentionConfig {
    /// Rejects zero widths, zero heads, and bad init parameters.
    pub fn validate(&self) -> Result<()> {
        let dims = [
            ("d_in", self.d_in),
            ("d_k", self.d_k),
            ("d_v", self.d_v),
            ("num_heads", self.num_heads),
        ];
        if let Some((name, _)) = dims.iter().find(|(_, v)| *v == 0) {
            return Err(TensorError::InvalidConfig(format!("{name} must be > 0")));
        }
        if let CombineStrategy::ConcatProject { d_out: 0 } = self.combine {
            return Err(TensorError::InvalidConfig("d_out must be > 0".to_string()));
        }
        self.init.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AttentionConfig::default();
        assert_eq!((cfg.d_in, cfg.d_k, cfg.d_v, cfg.num_heads), (16, 24, 28, 1));
        assert_eq!(cfg.score_scale, ScoreScale::InverseSqrtDk);
        assert_eq!(cfg.mask, AttentionMask::None);
        assert_eq!(cfg.combine, CombineStrategy::Concat);
        assert!(cfg.parallel_heads);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_zeros() {
        let cfg = AttentionConfig {
            num_heads: 0,
            ..AttentionConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(TensorError::InvalidConfig(msg)) if msg.contains("num_heads")));

        let cfg = AttentionConfig {
            combine: CombineStrategy::ConcatProject { d_out: 0 },
            ..AttentionConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(TensorError::InvalidConfig(_))));

        let cfg = AttentionConfig {
            init: WeightInit::Uniform { low: 2.0, high: 1.0 },
            ..AttentionConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(TensorError::InvalidConfig(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: AttentionConfig = serde_json::from_str(
            r#"{"num_heads": 3, "mask": "causal", "combine": {"concat_project": {"d_out": 16}}}"#,
        )
        .unwrap();
        assert_eq!(cfg.num_heads, 3);
        assert_eq!(cfg.d_v, 28);
        assert_eq!(cfg.mask, AttentionMask::Causal);
        assert_eq!(cfg.combine, CombineStrategy::ConcatProject { d_out: 16 });
    }

    #[test]
    fn test_json_round_trip() {
        let cfg = AttentionConfig {
            score_scale: ScoreScale::Unscaled,
            combine: CombineStrategy::Average,
            init: WeightInit::XavierUniform,
            ..AttentionConfig::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: AttentionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
