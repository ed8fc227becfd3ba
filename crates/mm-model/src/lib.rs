pub mod architecture;
pub mod config;
pub mod decoder;
pub mod error;
pub mod generation;
pub mod model;
pub mod nn;
pub mod tokenizer;
pub mod vision;

pub use architecture::ConditionalDecoder;
pub use config::{
    DecoderConfig, FeedForwardKind, MultimodalConfig, NormKind, PositionEncoding, VisionConfig,
};
pub use decoder::AutoregressiveDecoder;
pub use error::{ModelError, Result};
pub use generation::{generate, GenerateParams};
pub use model::MultimodalModel;
pub use tokenizer::{
    ClipImageEmbedder, ImageEmbedder, MultimodalEncoding, MultimodalTokenizer, SequenceItem,
    TextTokenizer, TokenizerConfig,
};
pub use vision::VisionEncoder;
