use std::sync::Arc;

use mm_tensor::{ComputeBackend, CpuBackend, Tensor};
use tracing::{debug, info};

use crate::config::MultimodalConfig;
use crate::decoder::AutoregressiveDecoder;
use crate::error::{ModelError, Result};
use crate::generation::GenerateParams;
use crate::nn::ParamInit;
use crate::vision::VisionEncoder;

/// Image-conditioned language model.
///
/// The vision encoder turns an image batch into patch features; the decoder
/// cross-attends to those features while predicting the next token at every
/// position of the token batch. Weights are randomly initialised from
/// `config.seed`, so two models built from the same config are identical.
pub struct MultimodalModel {
    config: MultimodalConfig,
    encoder: VisionEncoder,
    decoder: AutoregressiveDecoder,
    backend: Arc<dyn ComputeBackend>,
}

impl MultimodalModel {
    /// Default-sized model on the CPU backend.
    pub fn new() -> Result<Self> {
        Self::with_config(MultimodalConfig::default())
    }

    pub fn with_config(config: MultimodalConfig) -> Result<Self> {
        Self::with_backend(config, Arc::new(CpuBackend::new()))
    }

    pub fn with_backend(config: MultimodalConfig, backend: Arc<dyn ComputeBackend>) -> Result<Self> {
        config.validate()?;

        let mut init = ParamInit::new(config.seed);
        let encoder = VisionEncoder::new(config.vision.clone(), &mut init)?;
        let decoder = AutoregressiveDecoder::new(config.decoder.clone(), &mut init)?;

        info!(
            backend = backend.name(),
            seed = config.seed,
            "multimodal model ready"
        );

        Ok(Self {
            config,
            encoder,
            decoder,
            backend,
        })
    }

    pub fn config(&self) -> &MultimodalConfig {
        &self.config
    }

    pub fn encoder(&self) -> &VisionEncoder {
        &self.encoder
    }

    pub fn decoder(&self) -> &AutoregressiveDecoder {
        &self.decoder
    }

    pub fn vocab_size(&self) -> usize {
        self.config.decoder.vocab_size
    }

    /// Next-token logits for every position.
    ///
    /// - `images`: `f32` tensor `(batch, channels, height, width)`.
    /// - `tokens`: `u32` tensor `(batch, seq_len)`.
    ///
    /// Returns `(batch, seq_len, vocab_size)`. Both inputs are fully
    /// validated before any computation runs.
    pub fn forward(&self, images: &Tensor, tokens: &Tensor) -> Result<Tensor> {
        let geometry = self.encoder.validate(images)?;
        let (batch, seq_len) = self.decoder.validate_tokens(tokens)?;
        if geometry.batch != batch {
            return Err(ModelError::BatchMismatch {
                images: geometry.batch,
                tokens: batch,
            });
        }
        debug!(batch, seq_len, patches = geometry.num_patches, "forward");

        let backend = self.backend.as_ref();
        let context = self.encoder.encode(images, backend)?;
        self.decoder.decode(tokens, Some(&context), backend)
    }

    /// Caption-style generation: encode one image, then extend `prompt`.
    pub fn generate(&self, image: &Tensor, prompt: &[u32], params: &GenerateParams) -> Result<Vec<u32>> {
        let geometry = self.encoder.validate(image)?;
        if geometry.batch != 1 {
            return Err(ModelError::BatchMismatch {
                images: geometry.batch,
                tokens: 1,
            });
        }

        let backend = self.backend.as_ref();
        let context = self.encoder.encode(image, backend)?;
        self.decoder.generate(prompt, Some(&context), params, backend)
    }
}
