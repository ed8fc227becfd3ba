use std::path::Path;

use tracing::debug;

use super::embedder::{ClipImageEmbedder, ImageEmbedder};
use super::image_processor::load_image;
use super::text::TextTokenizer;
use crate::error::{ModelError, Result};

/// One element of a flattened multimodal sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SequenceItem {
    Token(u32),
    Embedding(f32),
}

/// Joint encoding of a caption and an image.
#[derive(Debug, Clone, PartialEq)]
pub struct MultimodalEncoding {
    /// Caption ids, starting with BOS.
    pub text_tokens: Vec<u32>,
    /// Fixed-size image embedding.
    pub image_embedding: Vec<f32>,
}

impl MultimodalEncoding {
    /// Text ids followed by the image embedding values, as one tagged stream.
    pub fn to_sequence(&self) -> Vec<SequenceItem> {
        self.text_tokens
            .iter()
            .map(|&id| SequenceItem::Token(id))
            .chain(self.image_embedding.iter().map(|&v| SequenceItem::Embedding(v)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.text_tokens.len() + self.image_embedding.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tokenizer for paired text and image inputs.
pub struct MultimodalTokenizer {
    text: TextTokenizer,
    embedder: Box<dyn ImageEmbedder>,
}

impl MultimodalTokenizer {
    /// Pair `text` with the CLIP embedder registered under `model_id`.
    pub fn new(text: TextTokenizer, model_id: &str) -> Result<Self> {
        let embedder = ClipImageEmbedder::from_pretrained_id(model_id)?;
        Ok(Self::with_embedder(text, Box::new(embedder)))
    }

    pub fn with_embedder(text: TextTokenizer, embedder: Box<dyn ImageEmbedder>) -> Self {
        Self { text, embedder }
    }

    pub fn text_tokenizer(&self) -> &TextTokenizer {
        &self.text
    }

    pub fn embedder(&self) -> &dyn ImageEmbedder {
        self.embedder.as_ref()
    }

    /// Encode a caption and the image stored at `image_path`.
    ///
    /// Both inputs are required; a missing text is reported before a missing
    /// image. The caption gets a leading BOS and no EOS.
    pub fn encode_multimodal(
        &self,
        text: Option<&str>,
        image_path: Option<&Path>,
    ) -> Result<MultimodalEncoding> {
        let text = text.ok_or(ModelError::MissingModality("text"))?;
        let image_path = image_path.ok_or(ModelError::MissingModality("image"))?;

        let text_tokens = self.text.encode(text, true, false)?;
        let image = load_image(image_path)?;
        let image_embedding = self.embedder.embed(text, &image)?;

        debug!(
            tokens = text_tokens.len(),
            embedding_dim = image_embedding.len(),
            model = self.embedder.model_id(),
            "encoded multimodal input"
        );
        Ok(MultimodalEncoding {
            text_tokens,
            image_embedding,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::fixtures::{write_png, write_tokenizer};
    use image::{DynamicImage, GenericImageView};

    /// Embeds an image as its width and height.
    struct SizeEmbedder;

    impl ImageEmbedder for SizeEmbedder {
        fn model_id(&self) -> &str {
            "test/size"
        }

        fn embedding_dim(&self) -> usize {
            2
        }

        fn embed(&self, _text: &str, image: &DynamicImage) -> Result<Vec<f32>> {
            Ok(vec![image.width() as f32, image.height() as f32])
        }
    }

    fn tokenizer(dir: &Path) -> MultimodalTokenizer {
        let text = TextTokenizer::from_file(write_tokenizer(dir)).unwrap();
        MultimodalTokenizer::with_embedder(text, Box::new(SizeEmbedder))
    }

    #[test]
    fn test_encode_multimodal() {
        let dir = tempfile::tempdir().unwrap();
        let tok = tokenizer(dir.path());
        let image = write_png(dir.path(), "cat.png", 6, 4, [10, 20, 30]);

        let enc = tok
            .encode_multimodal(Some("a test image"), Some(&image))
            .unwrap();
        assert_eq!(enc.text_tokens, vec![1, 6, 7, 10]);
        assert_eq!(enc.image_embedding, vec![6.0, 4.0]);
        assert_eq!(enc.len(), 6);
        assert_eq!(
            enc.to_sequence(),
            vec![
                SequenceItem::Token(1),
                SequenceItem::Token(6),
                SequenceItem::Token(7),
                SequenceItem::Token(10),
                SequenceItem::Embedding(6.0),
                SequenceItem::Embedding(4.0),
            ]
        );
    }

    #[test]
    fn test_encode_with_registered_clip_tower() {
        let dir = tempfile::tempdir().unwrap();
        let text = TextTokenizer::from_file(write_tokenizer(dir.path())).unwrap();
        let bos = text.bos_id();
        let tok = MultimodalTokenizer::new(text, "openai/clip-vit-base-patch32").unwrap();
        assert_eq!(tok.embedder().model_id(), "openai/clip-vit-base-patch32");
        assert_eq!(tok.embedder().embedding_dim(), 512);

        let image = write_png(dir.path(), "photo.png", 40, 30, [120, 60, 200]);
        let enc = tok
            .encode_multimodal(Some("this is a description"), Some(&image))
            .unwrap();
        assert_eq!(enc.text_tokens[0], bos);
        assert_eq!(enc.text_tokens, vec![1, 4, 5, 6, 8]);
        assert_eq!(enc.image_embedding.len(), 512);
        let norm: f32 = enc.image_embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        approx::assert_abs_diff_eq!(norm, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_missing_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let tok = tokenizer(dir.path());
        let image = write_png(dir.path(), "cat.png", 2, 2, [0, 0, 0]);

        assert!(matches!(
            tok.encode_multimodal(None, Some(&image)),
            Err(ModelError::MissingModality("text"))
        ));
        assert!(matches!(
            tok.encode_multimodal(Some("a test"), None),
            Err(ModelError::MissingModality("image"))
        ));
        assert!(matches!(
            tok.encode_multimodal(None, None),
            Err(ModelError::MissingModality("text"))
        ));
    }

    #[test]
    fn test_bad_image_paths() {
        let dir = tempfile::tempdir().unwrap();
        let tok = tokenizer(dir.path());

        let missing = dir.path().join("missing.png");
        assert!(matches!(
            tok.encode_multimodal(Some("a test"), Some(&missing)),
            Err(ModelError::Io(_))
        ));

        let garbage = dir.path().join("garbage.png");
        std::fs::write(&garbage, [0u8, 1, 2, 3, 4, 5]).unwrap();
        assert!(matches!(
            tok.encode_multimodal(Some("a test"), Some(&garbage)),
            Err(ModelError::Image(_))
        ));
    }

    #[test]
    fn test_unknown_model_id_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        let text = TextTokenizer::from_file(write_tokenizer(dir.path())).unwrap();
        assert!(matches!(
            MultimodalTokenizer::new(text, "nobody/nothing"),
            Err(ModelError::UnknownEmbeddingModel(_))
        ));
    }

    #[test]
    fn test_accessors() {
        let dir = tempfile::tempdir().unwrap();
        let tok = tokenizer(dir.path());
        assert_eq!(tok.embedder().model_id(), "test/size");
        assert_eq!(tok.text_tokenizer().bos_id(), 1);
    }
}
