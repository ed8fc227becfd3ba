pub mod embedder;
pub mod image_processor;
pub mod multimodal;
pub mod text;

pub use embedder::{ClipImageEmbedder, ClipModelSpec, ImageEmbedder, KNOWN_MODELS};
pub use image_processor::{load_image, ImageProcessor, CLIP_MEAN, CLIP_STD};
pub use multimodal::{MultimodalEncoding, MultimodalTokenizer, SequenceItem};
pub use text::{TextTokenizer, TokenizerConfig};

#[cfg(test)]
pub(crate) mod fixtures {
    use std::path::{Path, PathBuf};

    /// Word-level vocabulary: four special pieces followed by plain words.
    pub const WORDS: &[&str] = &[
        "<unk>", "<s>", "</s>", "<pad>", "this", "is", "a", "test", "description", "of", "image",
    ];

    fn tokenizer_json(words: &[&str]) -> String {
        let vocab: Vec<String> = words
            .iter()
            .enumerate()
            .map(|(i, w)| format!("\"{w}\": {i}"))
            .collect();
        let added: Vec<String> = words
            .iter()
            .enumerate()
            .filter(|(_, w)| w.starts_with('<'))
            .map(|(i, w)| {
                format!(
                    r#"{{"id": {i}, "content": "{w}", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}}"#
                )
            })
            .collect();

        format!(
            r#"{{
  "version": "1.0",
  "truncation": null,
  "padding": null,
  "added_tokens": [{}],
  "normalizer": null,
  "pre_tokenizer": {{"type": "Whitespace"}},
  "post_processor": null,
  "decoder": null,
  "model": {{"type": "WordLevel", "vocab": {{{}}}, "unk_token": "<unk>"}}
}}"#,
            added.join(", "),
            vocab.join(", ")
        )
    }

    /// Write a tokenizer file with the given vocabulary into `dir`.
    pub fn write_tokenizer_with(dir: &Path, words: &[&str]) -> PathBuf {
        let path = dir.join("tokenizer.json");
        std::fs::write(&path, tokenizer_json(words)).unwrap();
        path
    }

    pub fn write_tokenizer(dir: &Path) -> PathBuf {
        write_tokenizer_with(dir, WORDS)
    }

    /// Write a small solid-colour PNG into `dir`.
    pub fn write_png(dir: &Path, name: &str, width: u32, height: u32, rgb: [u8; 3]) -> PathBuf {
        let path = dir.join(name);
        ::image::RgbImage::from_pixel(width, height, ::image::Rgb(rgb))
            .save(&path)
            .unwrap();
        path
    }
}
