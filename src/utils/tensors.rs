use burn::tensor::{backend::Backend, Data, ElementConversion, Int, Shape, Tensor};

/// Mean-pool token representations into one vector per sequence.
///
/// Only the first `lengths[i]` positions of sequence `i` contribute, so padding added by the
/// batcher does not change the pooled vector.
pub fn mean_pool<B: Backend>(hidden_states: Tensor<B, 3>, lengths: &[usize]) -> Tensor<B, 2> {
    let [batch_size, seq_length, hidden_size] = hidden_states.dims();
    debug_assert_eq!(lengths.len(), batch_size);

    let mut weights: Vec<B::FloatElem> = Vec::with_capacity(batch_size * seq_length);
    for &length in lengths {
        let length = length.clamp(1, seq_length.max(1));

        for position in 0..seq_length {
            let weight = if position < length {
                1.0 / length as f32
            } else {
                0.0
            };
            weights.push(weight.elem());
        }
    }

    let weights = Tensor::<B, 3>::from_data(
        Data::new(weights, Shape::new([batch_size, seq_length, 1])),
        &hidden_states.device(),
    );

    hidden_states
        .mul(weights)
        .sum_dim(1)
        .reshape([batch_size, hidden_size])
}

/// Build a 2D float tensor from row-major rows of equal width
pub fn rows_to_tensor<B: Backend>(rows: &[Vec<f32>], device: &B::Device) -> Tensor<B, 2> {
    let n_rows = rows.len();
    let width = rows.first().map(Vec::len).unwrap_or(0);

    let values = rows
        .iter()
        .flat_map(|row| row.iter().map(|value| value.elem()))
        .collect();

    Tensor::from_data(Data::new(values, Shape::new([n_rows, width])), device)
}

/// Build a 1D int tensor of class ids
pub fn class_ids_to_tensor<B: Backend>(ids: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let values = ids.iter().map(|id| (*id as i64).elem()).collect();

    Tensor::from_data(Data::new(values, Shape::new([ids.len()])), device)
}

/// Copy a 2D float tensor back into host rows
pub fn tensor_to_rows<B: Backend>(tensor: Tensor<B, 2>) -> Vec<Vec<f32>> {
    let [_, width] = tensor.dims();
    let values = tensor.into_data().convert::<f32>().value;

    if width == 0 {
        return Vec::new();
    }

    values.chunks(width).map(<[f32]>::to_vec).collect()
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;
    use pretty_assertions::assert_eq;

    use super::*;

    type TestBackend = NdArray;

    #[test]
    fn mean_pool_ignores_padding() {
        let device = Default::default();
        // Two sequences of length 3, the second padded after one token
        let hidden = Tensor::<TestBackend, 3>::from_floats(
            [
                [[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]],
                [[2.0, 2.0], [100.0, 100.0], [100.0, 100.0]],
            ],
            &device,
        );

        let pooled = tensor_to_rows(mean_pool(hidden, &[3, 1]));
        let expected = [[3.0, 4.0], [2.0, 2.0]];

        for (row, expected) in pooled.iter().zip(expected) {
            for (value, expected) in row.iter().zip(expected) {
                assert!((value - expected).abs() < 1e-5, "{value} != {expected}");
            }
        }
    }

    #[test]
    fn pooled_width_is_hidden_size() {
        let device = Default::default();
        let hidden = Tensor::<TestBackend, 3>::zeros([4, 7, 768], &device);

        assert_eq!(mean_pool(hidden, &[7, 7, 3, 1]).dims(), [4, 768]);
    }

    #[test]
    fn rows_survive_tensor_conversion() {
        let device = Default::default();
        let rows = vec![vec![0.5, -1.0, 2.0], vec![3.0, 4.0, -0.25]];

        let tensor = rows_to_tensor::<TestBackend>(&rows, &device);

        assert_eq!(tensor.dims(), [2, 3]);
        assert_eq!(tensor_to_rows(tensor), rows);
    }
}
