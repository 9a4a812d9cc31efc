use attn_rs::nn::attention::{
    AttentionConfig, AttentionHead, CrossAttention, MultiHeadAttention, ProjectionWeights,
};
use attn_rs::tensor::{Tensor, TensorError};
use rand::rngs::StdRng;
use rand::SeedableRng;

const D: usize = 16;
const D_K: usize = 24;
const D_V: usize = 28;

fn matrix(rows: usize, cols: usize, f: impl Fn(f64, f64) -> f64) -> Tensor<f64, 2> {
    let data = (0..rows * cols)
        .map(|i| f((i / cols) as f64, (i % cols) as f64))
        .collect();
    Tensor::new(data, [rows, cols]).unwrap()
}

fn cross() -> CrossAttention<f64> {
    let wq = matrix(D_K, D, |r, c| (0.1 * r - 0.2 * c).cos() * 0.25);
    let wk = matrix(D_K, D, |r, c| (0.15 * r + 0.05 * c).sin() * 0.25);
    let wv = matrix(D_V, D, |r, c| (0.07 * r * c + 0.3).cos() * 0.2);
    CrossAttention::new(AttentionHead::new(ProjectionWeights::new(wq, wk, wv).unwrap()))
}

fn decoder_side() -> Tensor<f64, 2> {
    matrix(6, D, |i, j| (0.5 * i + 0.3 * j).sin())
}

fn encoder_side(len: usize) -> Tensor<f64, 2> {
    matrix(len, D, |i, j| (0.4 * i - 0.25 * j).cos())
}

#[test]
fn test_six_queries_over_eight_keys() {
    let attn = cross();
    let out = attn.forward_detailed(&decoder_side(), &encoder_side(8)).unwrap();

    assert_eq!(out.scores.shape(), &[6, 8]);
    assert_eq!(out.weights.shape(), &[6, 8]);
    assert_eq!(out.context.shape(), &[6, D_V]);

    let z0 = out.context.row(0).unwrap();
    assert!((z0[0] - 1.2985829979395633).abs() < 1e-9);
    assert!((z0[27] - 0.014547552515475721).abs() < 1e-9);
}

#[test]
fn test_output_length_follows_queries_only() {
    let attn = cross();
    let x_q = decoder_side();
    for t_kv in [1, 3, 8, 20] {
        let z = attn.forward(&x_q, &encoder_side(t_kv)).unwrap();
        assert_eq!(z.shape(), &[6, D_V]);
    }
}

#[test]
fn test_cross_with_itself_is_self_attention() {
    let attn = cross();
    let x = decoder_side();
    assert_eq!(attn.forward(&x, &x).unwrap(), attn.head().forward(&x).unwrap());
}

#[test]
fn test_embedding_widths_must_match() {
    let attn = cross();
    let x_kv = matrix(8, D + 1, |i, j| i + j);
    assert!(matches!(
        attn.forward(&decoder_side(), &x_kv),
        Err(TensorError::DimensionMismatch { op: "cross_attention", expected: 16, got: 17 })
    ));
}

#[test]
fn test_multi_head_cross_attention() {
    let config = AttentionConfig {
        num_heads: 2,
        ..AttentionConfig::default()
    };
    let mha = MultiHeadAttention::<f64>::from_config(&config, &mut StdRng::seed_from_u64(42))
        .unwrap();
    let z = mha.forward_cross(&decoder_side(), &encoder_side(8)).unwrap();
    assert_eq!(z.shape(), &[6, 2 * D_V]);
}
