// ============================================================
// Layer 5 — Span Encoder
// ============================================================
// Transformer encoder with a two-logit head on every token:
//
//   ids ─▶ token emb ─┐
//   pos ─▶ pos emb   ─┼─▶ N × [self-attn + FFN] ─▶ norm ─▶ Linear(d, 2)
//   type ─▶ type emb ─┘                                      │
//                                             start_logits ◀─┴─▶ end_logits
//
// Padding positions are masked out of attention. Loss is the mean
// of the start and end cross-entropies against the label pair.

use anyhow::{anyhow, Result};
use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::data::batcher::{LabelledBatch, SpanBatch};
use crate::domain::window::WindowLogits;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct SpanEncoderConfig {
    pub vocab_size:      usize,
    pub max_position:    usize,
    pub d_model:         usize,
    pub num_heads:       usize,
    pub num_layers:      usize,
    pub d_ff:            usize,
    pub dropout:         f64,
    #[config(default = 2)]
    pub type_vocab_size: usize,
}

impl SpanEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SpanEncoder<B> {
        let layers = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();

        SpanEncoder {
            token_embedding:    EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            position_embedding: EmbeddingConfig::new(self.max_position, self.d_model).init(device),
            type_embedding:     EmbeddingConfig::new(self.type_vocab_size, self.d_model).init(device),
            layers,
            final_norm:         LayerNormConfig::new(self.d_model).init(device),
            span_head:          LinearConfig::new(self.d_model, 2).init(device),
            dropout:            DropoutConfig::new(self.dropout).init(),
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        EncoderBlock {
            self_attn:   MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
                .with_dropout(self.dropout)
                .init(device),
            ffn_linear1: LinearConfig::new(self.d_model, self.d_ff).init(device),
            ffn_linear2: LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm1:       LayerNormConfig::new(self.d_model).init(device),
            norm2:       LayerNormConfig::new(self.d_model).init(device),
            dropout:     DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// `pad_mask` is true where the position is padding.
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn = self
            .self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_pad(pad_mask))
            .context;
        let x = self.norm1.forward(x + self.dropout.forward(attn));
        let ffn = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone())),
        );
        self.norm2.forward(x + self.dropout.forward(ffn))
    }
}

#[derive(Module, Debug)]
pub struct SpanEncoder<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub type_embedding:     Embedding<B>,
    pub layers:             Vec<EncoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub span_head:          Linear<B>,
    pub dropout:            Dropout,
}

/// Per-token scores, both [batch, seq_len].
pub struct SpanLogits<B: Backend> {
    pub start_logits: Tensor<B, 2>,
    pub end_logits:   Tensor<B, 2>,
}

impl<B: Backend> SpanEncoder<B> {
    pub fn forward(&self, batch: SpanBatch<B>) -> SpanLogits<B> {
        let [batch_size, seq_len] = batch.input_ids.dims();
        let device   = batch.input_ids.device();
        let pad_mask = batch.attention_mask.equal_elem(0);

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);

        let embedded = self.token_embedding.forward(batch.input_ids)
            + self.position_embedding.forward(positions)
            + self.type_embedding.forward(batch.type_ids);

        let mut x = self.dropout.forward(embedded);
        for layer in &self.layers {
            x = layer.forward(x, pad_mask.clone());
        }
        let x = self.final_norm.forward(x);

        let logits = self.span_head.forward(x); // [batch, seq_len, 2]
        let start_logits = logits
            .clone()
            .slice([0..batch_size, 0..seq_len, 0..1])
            .reshape([batch_size, seq_len]);
        let end_logits = logits
            .slice([0..batch_size, 0..seq_len, 1..2])
            .reshape([batch_size, seq_len]);

        SpanLogits { start_logits, end_logits }
    }

    /// (CE_start + CE_end) / 2
    pub fn forward_loss(&self, batch: LabelledBatch<B>) -> Tensor<B, 1> {
        let output = self.forward(batch.inputs);
        let ce = CrossEntropyLossConfig::new().init(&output.start_logits.device());
        (ce.forward(output.start_logits, batch.start_positions)
            + ce.forward(output.end_logits, batch.end_positions))
            / 2.0_f64
    }
}

impl<B: Backend> SpanLogits<B> {
    /// Copy the scores to host memory, one `WindowLogits` per batch row.
    pub fn into_rows(self) -> Result<Vec<WindowLogits>> {
        let [batch_size, seq_len] = self.start_logits.dims();
        if seq_len == 0 {
            return Ok(vec![WindowLogits { start: Vec::new(), end: Vec::new() }; batch_size]);
        }

        let start = host_vec(self.start_logits)?;
        let end   = host_vec(self.end_logits)?;

        Ok(start
            .chunks(seq_len)
            .zip(end.chunks(seq_len))
            .map(|(s, e)| WindowLogits { start: s.to_vec(), end: e.to_vec() })
            .collect())
    }
}

fn host_vec<B: Backend>(t: Tensor<B, 2>) -> Result<Vec<f32>> {
    t.into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("cannot read logits back from device: {e:?}"))
}
