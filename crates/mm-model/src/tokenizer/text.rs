use std::path::Path;

use tokenizers::Tokenizer;
use tracing::info;

use crate::error::{ModelError, Result};

/// Names of the marker pieces looked up in the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizerConfig {
    pub bos_token: String,
    pub eos_token: String,
    /// Padding piece; a vocabulary without it simply has no pad id.
    pub pad_token: Option<String>,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            bos_token: "<s>".to_string(),
            eos_token: "</s>".to_string(),
            pad_token: Some("<pad>".to_string()),
        }
    }
}

/// Subword text tokenizer backed by a `tokenizers` JSON model.
pub struct TextTokenizer {
    inner: Tokenizer,
    n_words: usize,
    bos_id: u32,
    eos_id: u32,
    pad_id: Option<u32>,
}

impl TextTokenizer {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file_with_config(path, &TokenizerConfig::default())
    }

    /// Load a tokenizer file and resolve the marker ids named by `config`.
    ///
    /// Fails with `Io` when the file cannot be read and with `Tokenizer` when
    /// it is not a valid model or lacks the BOS/EOS pieces.
    pub fn from_file_with_config(path: impl AsRef<Path>, config: &TokenizerConfig) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let inner = Tokenizer::from_bytes(&bytes).map_err(|e| {
            ModelError::Tokenizer(format!("failed to parse {}: {e}", path.display()))
        })?;

        let lookup = |piece: &str| {
            inner.token_to_id(piece).ok_or_else(|| {
                ModelError::Tokenizer(format!("{} has no '{piece}' piece", path.display()))
            })
        };
        let bos_id = lookup(&config.bos_token)?;
        let eos_id = lookup(&config.eos_token)?;
        let pad_id = config.pad_token.as_deref().and_then(|p| inner.token_to_id(p));
        let n_words = inner.get_vocab(true).len();

        info!(
            path = %path.display(),
            n_words,
            bos_id,
            eos_id,
            pad_id = ?pad_id,
            "loaded text tokenizer"
        );

        Ok(Self {
            inner,
            n_words,
            bos_id,
            eos_id,
            pad_id,
        })
    }

    /// Encode `text` to token ids, optionally framed by BOS and EOS.
    pub fn encode(&self, text: &str, bos: bool, eos: bool) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| ModelError::Tokenizer(format!("encode failed: {e}")))?;

        let mut ids = Vec::with_capacity(encoding.len() + 2);
        if bos {
            ids.push(self.bos_id);
        }
        ids.extend_from_slice(encoding.get_ids());
        if eos {
            ids.push(self.eos_id);
        }
        Ok(ids)
    }

    /// Decode token ids back to text. Marker pieces are skipped.
    ///
    /// Skipping is by id, so a marker written literally in the input text
    /// (`"this <pad> test"`) is dropped as well. `decode(encode(text))`
    /// reproduces `text` only when it contains no marker pieces.
    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        self.inner
            .decode(ids, true)
            .map_err(|e| ModelError::Tokenizer(format!("decode failed: {e}")))
    }

    /// Vocabulary size, including added pieces.
    pub fn n_words(&self) -> usize {
        self.n_words
    }

    pub fn bos_id(&self) -> u32 {
        self.bos_id
    }

    pub fn eos_id(&self) -> u32 {
        self.eos_id
    }

    pub fn pad_id(&self) -> Option<u32> {
        self.pad_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::fixtures::{write_tokenizer, write_tokenizer_with, WORDS};

    fn load() -> (tempfile::TempDir, TextTokenizer) {
        let dir = tempfile::tempdir().unwrap();
        let tok = TextTokenizer::from_file(write_tokenizer(dir.path())).unwrap();
        (dir, tok)
    }

    #[test]
    fn test_metadata() {
        let (_dir, tok) = load();
        assert_eq!(tok.n_words(), WORDS.len());
        assert_eq!(tok.bos_id(), 1);
        assert_eq!(tok.eos_id(), 2);
        assert_eq!(tok.pad_id(), Some(3));
    }

    #[test]
    fn test_round_trip_without_markers() {
        let (_dir, tok) = load();
        let ids = tok.encode("this is a test", false, false).unwrap();
        assert_eq!(ids, vec![4, 5, 6, 7]);
        assert_eq!(tok.decode(&ids).unwrap(), "this is a test");

        for text in ["a description of this image", "image", "test test test"] {
            let ids = tok.encode(text, true, true).unwrap();
            assert_eq!(tok.decode(&ids).unwrap(), text);
        }
    }

    #[test]
    fn test_literal_marker_is_dropped_on_decode() {
        let (_dir, tok) = load();
        let ids = tok.encode("this <pad> test", false, false).unwrap();
        assert_eq!(ids, vec![4, 3, 7]);
        assert_eq!(tok.decode(&ids).unwrap(), "this test");
    }

    #[test]
    fn test_markers() {
        let (_dir, tok) = load();
        let with_bos = tok.encode("a test", true, false).unwrap();
        assert_eq!(with_bos[0], tok.bos_id());
        assert_eq!(with_bos.len(), 3);

        let with_eos = tok.encode("a test", false, true).unwrap();
        assert_eq!(*with_eos.last().unwrap(), tok.eos_id());

        let framed = tok.encode("a test", true, true).unwrap();
        assert_eq!(tok.decode(&framed).unwrap(), "a test");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TextTokenizer::from_file(dir.path().join("absent.json")).err().unwrap();
        match err {
            ModelError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_file_is_tokenizer_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokenizer.json");
        std::fs::write(&path, "not a tokenizer").unwrap();
        assert!(matches!(
            TextTokenizer::from_file(&path),
            Err(ModelError::Tokenizer(_))
        ));
    }

    #[test]
    fn test_missing_markers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tokenizer_with(dir.path(), &["<unk>", "<s>", "hello"]);
        assert!(matches!(
            TextTokenizer::from_file(&path),
            Err(ModelError::Tokenizer(_))
        ));

        let config = TokenizerConfig {
            eos_token: "<s>".to_string(),
            pad_token: None,
            ..TokenizerConfig::default()
        };
        let tok = TextTokenizer::from_file_with_config(&path, &config).unwrap();
        assert_eq!(tok.pad_id(), None);
        assert_eq!(tok.eos_id(), 1);
    }
}
