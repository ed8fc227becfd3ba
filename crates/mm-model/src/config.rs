use crate::error::{ModelError, Result};

/// Normalisation used inside transformer blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormKind {
    LayerNorm,
    RmsNorm,
}

/// Feed-forward variant used inside transformer blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedForwardKind {
    /// `Linear -> GELU -> Linear`.
    Gelu,
    /// `down(silu(gate(x)) * up(x))`.
    SwiGlu,
}

/// How the decoder injects token positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionEncoding {
    /// Learned table added to the token embeddings.
    Absolute,
    /// Rotary embeddings applied to self-attention queries and keys.
    Rotary,
}

/// Hyperparameters of the ViT-style vision encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct VisionConfig {
    /// Largest square image side the positional table covers.
    pub image_size: usize,
    /// Side of one square patch, in pixels.
    pub patch_size: usize,
    /// Input channels (RGB).
    pub channels: usize,
    /// Hidden width of the encoder.
    pub dim: usize,
    /// Number of encoder blocks.
    pub depth: usize,
    /// Attention heads per block.
    pub heads: usize,
    /// Feed-forward width multiplier.
    pub ff_mult: usize,
    pub norm_eps: f32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            image_size: 256,
            patch_size: 32,
            channels: 3,
            dim: 512,
            depth: 6,
            heads: 8,
            ff_mult: 4,
            norm_eps: 1e-5,
        }
    }
}

impl VisionConfig {
    /// Maximum number of patches, i.e. rows of the positional table.
    pub fn num_patches(&self) -> usize {
        let side = self.image_size / self.patch_size;
        side * side
    }

    /// Length of one flattened patch vector.
    pub fn patch_dim(&self) -> usize {
        self.channels * self.patch_size * self.patch_size
    }

    pub fn head_dim(&self) -> usize {
        self.dim / self.heads
    }

    pub fn validate(&self) -> Result<()> {
        if self.patch_size == 0 || self.image_size == 0 {
            return Err(ModelError::InvalidConfig(
                "vision image_size and patch_size must be > 0".to_string(),
            ));
        }
        if self.image_size % self.patch_size != 0 {
            return Err(ModelError::InvalidConfig(format!(
                "vision image_size {} is not divisible by patch_size {}",
                self.image_size, self.patch_size
            )));
        }
        if self.channels == 0 || self.ff_mult == 0 {
            return Err(ModelError::InvalidConfig(
                "vision channels and ff_mult must be > 0".to_string(),
            ));
        }
        check_heads("vision", self.dim, self.heads)
    }
}

/// Hyperparameters of the autoregressive text decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderConfig {
    /// Vocabulary size (rows of the token embedding, width of the logits).
    pub vocab_size: usize,
    /// Longest token sequence a single call accepts.
    pub max_seq_len: usize,
    /// Hidden width of the decoder.
    pub dim: usize,
    /// Number of decoder blocks.
    pub depth: usize,
    /// Attention heads per block.
    pub heads: usize,
    /// Feed-forward width multiplier.
    pub ff_mult: usize,
    /// Whether each block cross-attends to an encoder context.
    pub cross_attend: bool,
    /// Feature width of the context the decoder cross-attends to.
    pub context_dim: usize,
    pub norm: NormKind,
    pub feed_forward: FeedForwardKind,
    pub position: PositionEncoding,
    pub norm_eps: f32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            vocab_size: 20000,
            max_seq_len: 1024,
            dim: 512,
            depth: 6,
            heads: 8,
            ff_mult: 4,
            cross_attend: true,
            context_dim: 512,
            norm: NormKind::LayerNorm,
            feed_forward: FeedForwardKind::Gelu,
            position: PositionEncoding::Absolute,
            norm_eps: 1e-5,
        }
    }
}

impl DecoderConfig {
    pub fn head_dim(&self) -> usize {
        self.dim / self.heads
    }

    pub fn validate(&self) -> Result<()> {
        if self.vocab_size == 0 || self.max_seq_len == 0 {
            return Err(ModelError::InvalidConfig(
                "decoder vocab_size and max_seq_len must be > 0".to_string(),
            ));
        }
        if self.vocab_size > u32::MAX as usize {
            return Err(ModelError::InvalidConfig(format!(
                "decoder vocab_size {} does not fit token ids",
                self.vocab_size
            )));
        }
        if self.cross_attend && self.context_dim == 0 {
            return Err(ModelError::InvalidConfig(
                "decoder context_dim must be > 0 when cross_attend is set".to_string(),
            ));
        }
        if self.ff_mult == 0 {
            return Err(ModelError::InvalidConfig(
                "decoder ff_mult must be > 0".to_string(),
            ));
        }
        check_heads("decoder", self.dim, self.heads)?;
        if self.position == PositionEncoding::Rotary && self.head_dim() % 2 != 0 {
            return Err(ModelError::InvalidConfig(format!(
                "rotary embeddings need an even head_dim, got {}",
                self.head_dim()
            )));
        }
        Ok(())
    }
}

/// Full configuration of the multimodal model.
#[derive(Debug, Clone, PartialEq)]
pub struct MultimodalConfig {
    pub vision: VisionConfig,
    pub decoder: DecoderConfig,
    /// Seed for deterministic weight initialisation.
    pub seed: u64,
}

impl Default for MultimodalConfig {
    fn default() -> Self {
        Self {
            vision: VisionConfig::default(),
            decoder: DecoderConfig::default(),
            seed: 0,
        }
    }
}

impl MultimodalConfig {
    pub fn validate(&self) -> Result<()> {
        self.vision.validate()?;
        self.decoder.validate()?;
        if !self.decoder.cross_attend {
            return Err(ModelError::InvalidConfig(
                "the multimodal decoder must cross-attend to the image context".to_string(),
            ));
        }
        if self.decoder.context_dim != self.vision.dim {
            return Err(ModelError::InvalidConfig(format!(
                "decoder context_dim {} must equal vision dim {}",
                self.decoder.context_dim, self.vision.dim
            )));
        }
        Ok(())
    }
}

fn check_heads(which: &str, dim: usize, heads: usize) -> Result<()> {
    if dim == 0 || heads == 0 {
        return Err(ModelError::InvalidConfig(format!(
            "{which} dim and heads must be > 0"
        )));
    }
    if dim % heads != 0 {
        return Err(ModelError::InvalidConfig(format!(
            "{which} dim {dim} is not divisible by heads {heads}"
        )));
    }
    Ok(())
}
