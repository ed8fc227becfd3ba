use mm_tensor::{ComputeBackend, DType, Tensor};
use tracing::{debug, info, trace};

use crate::config::{FeedForwardKind, NormKind, VisionConfig};
use crate::error::{ModelError, Result};
use crate::nn::{Attention, FeedForward, Linear, Norm, ParamInit};

/// One pre-norm encoder block: bidirectional self-attention then
/// feed-forward, each wrapped in a residual connection.
struct EncoderBlock {
    attn_norm: Norm,
    attn: Attention,
    ff_norm: Norm,
    ff: FeedForward,
}

impl EncoderBlock {
    fn new(cfg: &VisionConfig, init: &mut ParamInit) -> Result<Self> {
        Ok(Self {
            attn_norm: Norm::layer(cfg.dim, cfg.norm_eps),
            attn: Attention::self_attention(cfg.dim, cfg.heads, false, false, init)?,
            ff_norm: Norm::layer(cfg.dim, cfg.norm_eps),
            ff: FeedForward::new(FeedForwardKind::Gelu, cfg.dim, cfg.ff_mult, init)?,
        })
    }

    fn forward(&self, hidden: Vec<f32>, batch: usize, backend: &dyn ComputeBackend) -> Result<Vec<f32>> {
        let normed = self.attn_norm.forward(&hidden, backend)?;
        let hidden = backend.add(&hidden, &self.attn.forward(&normed, batch, backend)?)?;

        let normed = self.ff_norm.forward(&hidden, backend)?;
        Ok(backend.add(&hidden, &self.ff.forward(&normed, backend)?)?)
    }
}

/// Validated geometry of an image batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageGeometry {
    pub batch: usize,
    pub height: usize,
    pub width: usize,
    pub num_patches: usize,
}

/// ViT-style image encoder producing patch-level features.
///
/// Pipeline: split the image into non-overlapping square patches, flatten each
/// as `(p1 p2 c)`, LayerNorm, project to `dim`, LayerNorm, add the learned
/// positional table, run the encoder blocks, apply a final LayerNorm.
pub struct VisionEncoder {
    config: VisionConfig,
    patch_norm: Norm,
    patch_proj: Linear,
    embed_norm: Norm,
    /// Learned positions, `[num_patches, dim]`.
    pos_embedding: Vec<f32>,
    blocks: Vec<EncoderBlock>,
    final_norm: Norm,
}

impl VisionEncoder {
    pub fn new(config: VisionConfig, init: &mut ParamInit) -> Result<Self> {
        config.validate()?;
        let patch_dim = config.patch_dim();

        let patch_norm = Norm::new(NormKind::LayerNorm, patch_dim, config.norm_eps);
        let patch_proj = Linear::new(patch_dim, config.dim, true, init)?;
        let embed_norm = Norm::layer(config.dim, config.norm_eps);
        let pos_embedding = init.embedding(config.num_patches(), config.dim)?;
        let blocks = (0..config.depth)
            .map(|_| EncoderBlock::new(&config, init))
            .collect::<Result<Vec<_>>>()?;
        let final_norm = Norm::layer(config.dim, config.norm_eps);

        info!(
            image_size = config.image_size,
            patch_size = config.patch_size,
            dim = config.dim,
            depth = config.depth,
            heads = config.heads,
            "vision encoder ready"
        );

        Ok(Self {
            config,
            patch_norm,
            patch_proj,
            embed_norm,
            pos_embedding,
            blocks,
            final_norm,
        })
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    /// Check that `images` is an `f32` `(batch, channels, height, width)`
    /// tensor the encoder can consume.
    pub fn validate(&self, images: &Tensor) -> Result<ImageGeometry> {
        let (batch, channels, height, width) =
            images.shape().dims4().map_err(|_| ModelError::InvalidRank {
                name: "image batch",
                expected: 4,
                got: images.dims().to_vec(),
            })?;
        if images.dtype() != DType::F32 {
            return Err(ModelError::InvalidDType {
                name: "image batch",
                expected: DType::F32.to_string(),
                got: images.dtype().to_string(),
            });
        }
        if height == 0 || width == 0 {
            return Err(ModelError::EmptySpatial { height, width });
        }
        if batch == 0 {
            return Err(ModelError::EmptyBatch("image batch"));
        }
        if channels != self.config.channels {
            return Err(ModelError::ChannelMismatch {
                expected: self.config.channels,
                got: channels,
            });
        }

        let p = self.config.patch_size;
        if height % p != 0 || width % p != 0 {
            return Err(ModelError::PatchMismatch {
                height,
                width,
                patch_size: p,
            });
        }
        let num_patches = (height / p) * (width / p);
        if num_patches > self.config.num_patches() {
            return Err(ModelError::TooManyPatches {
                got: num_patches,
                max: self.config.num_patches(),
            });
        }

        Ok(ImageGeometry {
            batch,
            height,
            width,
            num_patches,
        })
    }

    /// Encode an image batch into a `(batch, num_patches, dim)` context.
    pub fn encode(&self, images: &Tensor, backend: &dyn ComputeBackend) -> Result<Tensor> {
        let geometry = self.validate(images)?;
        debug!(
            batch = geometry.batch,
            height = geometry.height,
            width = geometry.width,
            patches = geometry.num_patches,
            "encoding image batch"
        );

        let features = self.encode_features(images.as_f32()?, geometry, backend)?;
        Ok(Tensor::from_f32(
            features,
            [geometry.batch, geometry.num_patches, self.config.dim],
        )?)
    }

    /// Encoder body over validated pixel data.
    fn encode_features(
        &self,
        pixels: &[f32],
        geometry: ImageGeometry,
        backend: &dyn ComputeBackend,
    ) -> Result<Vec<f32>> {
        let patches = patchify(pixels, geometry, self.config.channels, self.config.patch_size);

        let x = self.patch_norm.forward(&patches, backend)?;
        let x = self.patch_proj.forward(&x, backend)?;
        let x = self.embed_norm.forward(&x, backend)?;

        let positions = &self.pos_embedding[..geometry.num_patches * self.config.dim];
        let mut hidden = backend.add_row(&x, positions)?;

        for (i, block) in self.blocks.iter().enumerate() {
            trace!(layer = i, "vision block");
            hidden = block.forward(hidden, geometry.batch, backend)?;
        }

        self.final_norm.forward(&hidden, backend)
    }
}

/// Rearrange `b c (h p1) (w p2) -> b (h w) (p1 p2 c)`.
fn patchify(pixels: &[f32], g: ImageGeometry, channels: usize, p: usize) -> Vec<f32> {
    let (grid_h, grid_w) = (g.height / p, g.width / p);
    let plane = g.height * g.width;
    let mut out = Vec::with_capacity(pixels.len());

    for b in 0..g.batch {
        let image = &pixels[b * channels * plane..(b + 1) * channels * plane];
        for gy in 0..grid_h {
            for gx in 0..grid_w {
                for py in 0..p {
                    let y = gy * p + py;
                    for px in 0..p {
                        let x = gx * p + px;
                        for c in 0..channels {
                            out.push(image[c * plane + y * g.width + x]);
                        }
                    }
                }
            }
        }
    }
    out
}
