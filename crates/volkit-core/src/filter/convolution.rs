//! Separable convolution along one tensor axis.

use burn::tensor::backend::Backend;
use burn::tensor::ops::ConvOptions;
use burn::tensor::{Shape, Tensor};

/// Correlate `input` with a 1D `kernel` along `dim`, replicating edge values
/// so the output has the input's shape.
///
/// The kernel is applied as a correlation: `out[i] = sum_k kernel[k] * in[i + k - r]`
/// with `r = kernel.len() / 2`. Kernels must have odd length.
pub(crate) fn correlate_axis<B: Backend, const D: usize>(
    input: Tensor<B, D>,
    kernel: &[f32],
    dim: usize,
) -> Tensor<B, D> {
    let dims: [usize; D] = input.dims();
    let len = dims[dim];
    let radius = kernel.len() / 2;
    if kernel.is_empty() || dims.iter().any(|&d| d == 0) {
        return input;
    }
    let device = input.device();

    // Move the target axis last.
    let mut permute_indices = [0isize; D];
    let mut idx = 0;
    for i in 0..D {
        if i != dim {
            permute_indices[idx] = i as isize;
            idx += 1;
        }
    }
    permute_indices[D - 1] = dim as isize;

    let batch: usize = (0..D).filter(|&i| i != dim).map(|i| dims[i]).product();
    let lines = input.permute(permute_indices).reshape([batch, 1, len]);

    // Replicate padding, then a 'valid' convolution.
    let padded = if radius > 0 {
        let first = lines.clone().narrow(2, 0, 1);
        let last = lines.clone().narrow(2, len - 1, 1);
        let mut parts = Vec::with_capacity(2 * radius + 1);
        for _ in 0..radius {
            parts.push(first.clone());
        }
        parts.push(lines);
        for _ in 0..radius {
            parts.push(last.clone());
        }
        Tensor::cat(parts, 2)
    } else {
        lines
    };

    let weight = Tensor::<B, 1>::from_floats(kernel, &device).reshape([1, 1, kernel.len()]);
    let options = ConvOptions::new([1], [0], [1], 1);
    let output = burn::tensor::module::conv1d(padded, weight, None, options);

    let mut permuted_shape = [0usize; D];
    let mut p_idx = 0;
    for i in 0..D {
        if i != dim {
            permuted_shape[p_idx] = dims[i];
            p_idx += 1;
        }
    }
    permuted_shape[D - 1] = len;
    let output = output.reshape(Shape::new(permuted_shape));

    let mut inverse = [0isize; D];
    for (new_pos, &old_pos) in permute_indices.iter().enumerate() {
        inverse[old_pos as usize] = new_pos as isize;
    }
    output.permute(inverse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type Backend = NdArray<f32>;

    fn values<const D: usize>(t: Tensor<Backend, D>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_replicate_boundary() {
        let device = Default::default();
        let input = Tensor::<Backend, 1>::from_floats([1.0, 2.0, 3.0, 4.0], &device).reshape([1, 1, 4]);
        let out = correlate_axis(input, &[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0], 2);
        let v = values(out);
        // Edges see their own value replicated.
        assert!((v[0] - (1.0 + 1.0 + 2.0) / 3.0).abs() < 1e-6);
        assert!((v[1] - 2.0).abs() < 1e-6);
        assert!((v[3] - (3.0 + 4.0 + 4.0) / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_derivative_along_first_axis() {
        let device = Default::default();
        // 3x2x1 volume increasing along axis 0.
        let data = TensorData::new(vec![0.0f32, 0.0, 1.0, 1.0, 2.0, 2.0], Shape::new([3, 2, 1]));
        let input = Tensor::<Backend, 3>::from_data(data, &device);
        let out = correlate_axis(input, &[-1.0, 0.0, 1.0], 0);
        assert_eq!(out.dims(), [3, 2, 1]);
        let v = values(out);
        assert_eq!(v, vec![1.0, 1.0, 2.0, 2.0, 1.0, 1.0]);
    }

    #[test]
    fn test_shape_preserved_for_wide_kernel() {
        let device = Default::default();
        let input = Tensor::<Backend, 3>::ones([2, 3, 2], &device);
        let out = correlate_axis(input, &[0.2; 5], 1);
        assert_eq!(out.dims(), [2, 3, 2]);
        for v in values(out) {
            assert!((v - 1.0).abs() < 1e-6);
        }
    }
}
