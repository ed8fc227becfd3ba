use image::DynamicImage;
use mm_tensor::{ComputeBackend, CpuBackend};
use tracing::{debug, info};

use super::image_processor::ImageProcessor;
use crate::config::VisionConfig;
use crate::error::{ModelError, Result};
use crate::nn::init::stable_seed;
use crate::nn::{Linear, ParamInit};
use crate::vision::VisionEncoder;

/// Turns an image (alongside its caption text) into a fixed-size embedding.
pub trait ImageEmbedder: Send + Sync {
    /// Identifier of the embedding model.
    fn model_id(&self) -> &str;

    /// Length of every vector returned by `embed`.
    fn embedding_dim(&self) -> usize;

    fn embed(&self, text: &str, image: &DynamicImage) -> Result<Vec<f32>>;
}

/// Architecture of a CLIP-style image tower.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipModelSpec {
    pub id: &'static str,
    pub image_size: usize,
    pub patch_size: usize,
    pub width: usize,
    pub depth: usize,
    pub heads: usize,
    pub projection_dim: usize,
}

/// Image towers that `ClipImageEmbedder::from_pretrained_id` can build.
pub const KNOWN_MODELS: &[ClipModelSpec] = &[
    ClipModelSpec {
        id: "openai/clip-vit-base-patch32",
        image_size: 224,
        patch_size: 32,
        width: 768,
        depth: 12,
        heads: 12,
        projection_dim: 512,
    },
    ClipModelSpec {
        id: "openai/clip-vit-base-patch16",
        image_size: 224,
        patch_size: 16,
        width: 768,
        depth: 12,
        heads: 12,
        projection_dim: 512,
    },
];

impl ClipModelSpec {
    pub fn by_id(id: &str) -> Option<&'static ClipModelSpec> {
        KNOWN_MODELS.iter().find(|spec| spec.id == id)
    }

    pub fn vision_config(&self) -> VisionConfig {
        VisionConfig {
            image_size: self.image_size,
            patch_size: self.patch_size,
            channels: 3,
            dim: self.width,
            depth: self.depth,
            heads: self.heads,
            ff_mult: 4,
            norm_eps: 1e-5,
        }
    }
}

/// CLIP-style image embedder.
///
/// Preprocesses the image, runs a ViT tower, mean-pools the patch features,
/// projects them and L2-normalises the result. Weights are seeded from the
/// model id, so the same id always yields the same embedder. The caption does
/// not influence the image embedding.
///
/// The tower has no class token. Pooling is a mean over patches, which differs
/// from CLIP's `image_embeds`, where the class-token output is projected.
pub struct ClipImageEmbedder {
    spec: ClipModelSpec,
    processor: ImageProcessor,
    encoder: VisionEncoder,
    projection: Linear,
    backend: CpuBackend,
}

impl ClipImageEmbedder {
    /// Build one of the [`KNOWN_MODELS`].
    pub fn from_pretrained_id(id: &str) -> Result<Self> {
        let spec = ClipModelSpec::by_id(id)
            .ok_or_else(|| ModelError::UnknownEmbeddingModel(id.to_string()))?;
        Self::from_spec(spec.clone())
    }

    pub fn from_spec(spec: ClipModelSpec) -> Result<Self> {
        if spec.projection_dim == 0 {
            return Err(ModelError::InvalidConfig(format!(
                "{}: projection_dim must be > 0",
                spec.id
            )));
        }
        let image_size = u32::try_from(spec.image_size).map_err(|_| {
            ModelError::InvalidConfig(format!("{}: image_size {} is too large", spec.id, spec.image_size))
        })?;

        let mut init = ParamInit::new(stable_seed(spec.id));
        let encoder = VisionEncoder::new(spec.vision_config(), &mut init)?;
        let projection = Linear::new(spec.width, spec.projection_dim, false, &mut init)?;

        info!(model = spec.id, dim = spec.projection_dim, "image embedder ready");
        Ok(Self {
            processor: ImageProcessor::new(image_size),
            spec,
            encoder,
            projection,
            backend: CpuBackend::new(),
        })
    }

    pub fn spec(&self) -> &ClipModelSpec {
        &self.spec
    }
}

impl ImageEmbedder for ClipImageEmbedder {
    fn model_id(&self) -> &str {
        self.spec.id
    }

    fn embedding_dim(&self) -> usize {
        self.spec.projection_dim
    }

    fn embed(&self, _text: &str, image: &DynamicImage) -> Result<Vec<f32>> {
        let pixels = self.processor.preprocess(image)?;
        let features = self.encoder.encode(&pixels, &self.backend)?;
        let (_, n_patches, width) = features.shape().dims3()?;

        let mut pooled = vec![0.0f32; width];
        for patch in features.as_f32()?.chunks(width) {
            for (p, f) in pooled.iter_mut().zip(patch) {
                *p += f;
            }
        }
        let pooled = self.backend.scale(&pooled, 1.0 / n_patches as f32)?;

        let projected = self.projection.forward(&pooled, &self.backend)?;
        let norm = projected.iter().map(|v| v * v).sum::<f32>().sqrt();
        debug!(model = self.spec.id, norm, "embedded image");
        if norm == 0.0 {
            return Ok(projected);
        }
        Ok(self.backend.scale(&projected, 1.0 / norm)?)
    }
}
