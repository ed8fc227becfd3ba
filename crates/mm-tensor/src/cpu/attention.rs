// Fused scaled dot-product attention.
//
// Every (batch, head) pair is independent, so each is computed as one rayon
// task producing a [q_len, head_dim] block that is scattered back into the
// interleaved [batch, q_len, n_heads * head_dim] layout afterwards.

use rayon::prelude::*;

use crate::backend::AttentionShape;

pub(crate) fn scaled_dot_product(
    q: &[f32],
    k: &[f32],
    v: &[f32],
    shape: AttentionShape,
    causal: bool,
) -> Vec<f32> {
    let AttentionShape {
        batch,
        n_heads,
        head_dim,
        q_len,
        kv_len,
    } = shape;
    let width = shape.row_width();
    let scale = 1.0 / (head_dim as f32).sqrt();

    let blocks: Vec<Vec<f32>> = (0..batch * n_heads)
        .into_par_iter()
        .map(|bh| {
            let b = bh / n_heads;
            let col = (bh % n_heads) * head_dim;
            let q_base = b * q_len * width;
            let kv_base = b * kv_len * width;

            let mut out = vec![0.0f32; q_len * head_dim];
            let mut scores = vec![0.0f32; kv_len];

            for i in 0..q_len {
                let q_row = &q[q_base + i * width + col..][..head_dim];
                let visible = if causal { (i + 1).min(kv_len) } else { kv_len };

                let mut max_score = f32::NEG_INFINITY;
                for (j, score) in scores.iter_mut().enumerate().take(visible) {
                    let k_row = &k[kv_base + j * width + col..][..head_dim];
                    let dot: f32 = q_row.iter().zip(k_row).map(|(a, b)| a * b).sum();
                    *score = dot * scale;
                    max_score = max_score.max(*score);
                }

                let mut exp_sum = 0.0f32;
                for score in &mut scores[..visible] {
                    *score = (*score - max_score).exp();
                    exp_sum += *score;
                }

                let o_row = &mut out[i * head_dim..(i + 1) * head_dim];
                for (j, &score) in scores.iter().enumerate().take(visible) {
                    let prob = score / exp_sum;
                    let v_row = &v[kv_base + j * width + col..][..head_dim];
                    for (o, &vd) in o_row.iter_mut().zip(v_row) {
                        *o += prob * vd;
                    }
                }
            }
            out
        })
        .collect();

    let mut result = vec![0.0f32; batch * q_len * width];
    for (bh, block) in blocks.iter().enumerate() {
        let b = bh / n_heads;
        let col = (bh % n_heads) * head_dim;
        for i in 0..q_len {
            let dst = b * q_len * width + i * width + col;
            result[dst..dst + head_dim].copy_from_slice(&block[i * head_dim..(i + 1) * head_dim]);
        }
    }
    result
}
