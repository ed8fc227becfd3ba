mod logging;

use std::time::Instant;

use anyhow::{Context, Result};
use mm_model::MultimodalModel;
use mm_tensor::Tensor;
use tracing::info;

fn main() -> Result<()> {
    logging::init();

    let model = MultimodalModel::new().context("building multimodal model")?;
    let vocab_size = model.vocab_size();
    let vision = &model.config().vision;
    let max_seq_len = model.config().decoder.max_seq_len;

    let images = Tensor::randn(
        [1, vision.channels, vision.image_size, vision.image_size],
        0.0,
        1.0,
        0,
    )?;
    let tokens = Tensor::rand_tokens([1, max_seq_len], u32::try_from(vocab_size)?, 0)?;

    let start = Instant::now();
    let logits = model
        .forward(&images, &tokens)
        .context("multimodal forward pass")?;
    info!(elapsed_ms = start.elapsed().as_millis() as u64, "forward done");

    let values = logits.as_f32()?;
    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64;

    println!("logits shape: {}", logits.shape());
    println!("logits min {min:.4} max {max:.4} mean {mean:.6}");
    Ok(())
}
