use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
    #[error("unknown image embedding model: {0}")]
    UnknownEmbeddingModel(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("missing {0} input: both text and image are required")]
    MissingModality(&'static str),

    #[error("{name} must have rank {expected}, got shape {got:?}")]
    InvalidRank {
        name: &'static str,
        expected: usize,
        got: Vec<usize>,
    },
    #[error("{name} must have dtype {expected}, got {got}")]
    InvalidDType {
        name: &'static str,
        expected: String,
        got: String,
    },
    #[error("image batch has empty spatial dimensions {height}x{width}")]
    EmptySpatial { height: usize, width: usize },
    #[error("image size {height}x{width} is not divisible by patch size {patch_size}")]
    PatchMismatch {
        height: usize,
        width: usize,
        patch_size: usize,
    },
    #[error("image yields {got} patches but the encoder supports at most {max}")]
    TooManyPatches { got: usize, max: usize },
    #[error("image batch has {got} channels, expected {expected}")]
    ChannelMismatch { expected: usize, got: usize },
    #[error("{0} is empty")]
    EmptyBatch(&'static str),
    #[error("token batch has zero sequence length")]
    EmptySequence,
    #[error("sequence length {len} exceeds max_seq_len {max}")]
    SequenceTooLong { len: usize, max: usize },
    #[error("token id {token} at position {position} is outside vocabulary of size {vocab_size}")]
    TokenOutOfRange {
        token: u32,
        position: usize,
        vocab_size: usize,
    },
    #[error("batch size mismatch: image batch {images}, token batch {tokens}")]
    BatchMismatch { images: usize, tokens: usize },
    #[error("context has no positions to attend to")]
    EmptyContext,
    #[error("context feature dim {got} does not match decoder context dim {expected}")]
    ContextMismatch { expected: usize, got: usize },

    #[error("generation failed: {0}")]
    Generation(String),
    #[error("tensor error: {0}")]
    TensorError(#[from] mm_tensor::TensorError),
}

impl ModelError {
    /// True for errors raised by input validation, before any computation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ModelError::InvalidRank { .. }
                | ModelError::InvalidDType { .. }
                | ModelError::EmptySpatial { .. }
                | ModelError::PatchMismatch { .. }
                | ModelError::TooManyPatches { .. }
                | ModelError::ChannelMismatch { .. }
                | ModelError::EmptyBatch(_)
                | ModelError::EmptySequence
                | ModelError::SequenceTooLong { .. }
                | ModelError::TokenOutOfRange { .. }
                | ModelError::BatchMismatch { .. }
                | ModelError::EmptyContext
                | ModelError::ContextMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
