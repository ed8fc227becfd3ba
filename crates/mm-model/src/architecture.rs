use mm_tensor::{ComputeBackend, Tensor};

/// Trait for decoders that turn token sequences into next-token logits,
/// optionally conditioned on an encoder context.
///
/// The generation loop is written against this trait so it does not depend
/// on a particular decoder layout.
pub trait ConditionalDecoder: Send + Sync {
    /// Run the full forward pass.
    ///
    /// - `tokens`: `u32` tensor of shape `(batch, seq_len)`.
    /// - `context`: optional `f32` tensor of shape `(batch, ctx_len, context_dim)`.
    /// - `backend`: the compute backend to use for tensor operations.
    ///
    /// Returns logits of shape `(batch, seq_len, vocab_size)`.
    fn decode(
        &self,
        tokens: &Tensor,
        context: Option<&Tensor>,
        backend: &dyn ComputeBackend,
    ) -> crate::Result<Tensor>;

    /// Returns the vocabulary size (number of output logits per position).
    fn vocab_size(&self) -> usize;

    /// Longest sequence a single `decode` call accepts.
    fn max_seq_len(&self) -> usize;
}
