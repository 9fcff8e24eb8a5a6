// ============================================================
// Layer 4 — Window Batcher
// ============================================================
// Implements Burn's Batcher trait for both directions of the
// pipeline:
//
//   Vec<LabelledWindow> → LabelledBatch   (training DataLoader)
//   Vec<TokenWindow>    → SpanBatch       (inference DataLoader)
//
//   Input:  N windows, each of length S (pre-padded by the tokenizer)
//   Output: [N, S] tensors
//
// Windows of one dataset share a length, but nothing enforces it,
// so shorter rows are right-padded with zeros to the longest one.
// Labels live in a separate wrapper so the inference path cannot
// accidentally depend on them.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::LabelledWindow;
use crate::domain::window::TokenWindow;

/// Model inputs for a group of windows. All tensors are [batch, seq_len].
#[derive(Debug, Clone)]
pub struct SpanBatch<B: Backend> {
    pub input_ids:      Tensor<B, 2, Int>,
    /// 1 = real token, 0 = padding
    pub attention_mask: Tensor<B, 2, Int>,
    /// 0 = question side, 1 = context side
    pub type_ids:       Tensor<B, 2, Int>,
}

/// Inputs plus the training targets, one per window.
#[derive(Debug, Clone)]
pub struct LabelledBatch<B: Backend> {
    pub inputs:          SpanBatch<B>,
    pub start_positions: Tensor<B, 1, Int>,
    pub end_positions:   Tensor<B, 1, Int>,
}

/// Stateless: the DataLoader hands over the target device per batch.
#[derive(Clone, Debug, Default)]
pub struct WindowBatcher;

impl<B: Backend> Batcher<B, TokenWindow, SpanBatch<B>> for WindowBatcher {
    fn batch(&self, items: Vec<TokenWindow>, device: &B::Device) -> SpanBatch<B> {
        let rows: Vec<&TokenWindow> = items.iter().collect();
        span_batch(&rows, device)
    }
}

impl<B: Backend> Batcher<B, LabelledWindow, LabelledBatch<B>> for WindowBatcher {
    fn batch(&self, items: Vec<LabelledWindow>, device: &B::Device) -> LabelledBatch<B> {
        let starts: Vec<i32> = items.iter().map(|s| s.label.start as i32).collect();
        let ends:   Vec<i32> = items.iter().map(|s| s.label.end as i32).collect();
        let rows: Vec<&TokenWindow> = items.iter().map(|s| &s.window).collect();

        LabelledBatch {
            inputs:          span_batch(&rows, device),
            start_positions: Tensor::<B, 1, Int>::from_data(
                TensorData::new(starts, [items.len()]), device,
            ),
            end_positions:   Tensor::<B, 1, Int>::from_data(
                TensorData::new(ends, [items.len()]), device,
            ),
        }
    }
}

fn span_batch<B: Backend>(rows: &[&TokenWindow], device: &B::Device) -> SpanBatch<B> {
    let seq_len = rows.iter().map(|w| w.len()).max().unwrap_or(0);

    SpanBatch {
        input_ids:      stack(rows, seq_len, |w| &w.input_ids, device),
        attention_mask: stack(rows, seq_len, |w| &w.attention_mask, device),
        type_ids:       stack(rows, seq_len, |w| &w.type_ids, device),
    }
}

fn stack<B: Backend>(
    rows:    &[&TokenWindow],
    seq_len: usize,
    column:  impl Fn(&TokenWindow) -> &Vec<u32>,
    device:  &B::Device,
) -> Tensor<B, 2, Int> {
    let mut flat: Vec<i32> = Vec::with_capacity(rows.len() * seq_len);
    for &w in rows {
        let values = column(w);
        flat.extend(values.iter().map(|&x| x as i32));
        flat.extend(std::iter::repeat(0).take(seq_len - values.len()));
    }
    Tensor::<B, 2, Int>::from_data(TensorData::new(flat, [rows.len(), seq_len]), device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::windowing::window_from_parts;
    use crate::domain::window::LabelPair;

    use burn::backend::ndarray::NdArrayDevice;

    type TestBackend = burn::backend::NdArray;

    fn ints<const D: usize>(t: Tensor<TestBackend, D, Int>) -> Vec<i64> {
        t.into_data().convert::<i64>().to_vec::<i64>().unwrap()
    }

    fn short_window() -> TokenWindow {
        window_from_parts(
            &[101, 7, 102], &[1; 3], &[0, 1, 1],
            &[None, Some(1), None],
            &[(0, 0), (0, 1), (0, 0)], 0, "a",
        )
    }

    fn long_window() -> TokenWindow {
        window_from_parts(
            &[101, 5, 102, 8, 9, 102], &[1; 6], &[0, 0, 0, 1, 1, 1],
            &[None, Some(0), None, Some(1), Some(1), None],
            &[(0, 0), (0, 1), (0, 0), (0, 1), (1, 2), (0, 0)], 1, "b",
        )
    }

    #[test]
    fn test_inputs_right_padded_to_longest_window() {
        let device = NdArrayDevice::default();
        let batch: SpanBatch<TestBackend> =
            WindowBatcher.batch(vec![short_window(), long_window()], &device);

        assert_eq!(batch.input_ids.dims(), [2, 6]);
        assert_eq!(
            ints(batch.input_ids),
            vec![101, 7, 102, 0, 0, 0, 101, 5, 102, 8, 9, 102],
        );
        assert_eq!(ints(batch.attention_mask), vec![1, 1, 1, 0, 0, 0, 1, 1, 1, 1, 1, 1]);
        assert_eq!(ints(batch.type_ids), vec![0, 1, 1, 0, 0, 0, 0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_labels_follow_item_order() {
        let device = NdArrayDevice::default();
        let items = vec![
            LabelledWindow { window: long_window(),  label: LabelPair::new(3, 4) },
            LabelledWindow { window: short_window(), label: LabelPair::NO_ANSWER },
        ];
        let batch: LabelledBatch<TestBackend> = WindowBatcher.batch(items, &device);

        assert_eq!(batch.inputs.input_ids.dims(), [2, 6]);
        assert_eq!(ints(batch.start_positions), vec![3, 0]);
        assert_eq!(ints(batch.end_positions), vec![4, 0]);
    }
}
