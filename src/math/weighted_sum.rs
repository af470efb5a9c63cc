/// Dot product of two equal-length slices, unrolled by four.
///
/// # Panics
/// Panics if `a` is shorter than `b`.
pub fn dot_product(a: &[f64], b: &[f64]) -> f64 {
    let n = b.len();
    let a = &a[..n];

    let mut sum = 0.0;
    let mut chunks_a = a.chunks_exact(4);
    let mut chunks_b = b.chunks_exact(4);
    for (x, y) in (&mut chunks_a).zip(&mut chunks_b) {
        sum += x[0] * y[0] + x[1] * y[1] + x[2] * y[2] + x[3] * y[3];
    }
    // Leftover terms are added last element first.
    for (x, y) in chunks_a.remainder().iter().zip(chunks_b.remainder()).rev() {
        sum += x * y;
    }
    sum
}

/// Weighted sum of `inputs` plus bias.
///
/// `weights` holds one weight per input followed by the bias, so
/// `weights.len() == inputs.len() + 1`. The bias is added as-is and never
/// multiplies an input.
pub fn sum_weights(weights: &[f64], inputs: &[f64]) -> f64 {
    debug_assert_eq!(weights.len(), inputs.len() + 1, "weights must carry a trailing bias");
    dot_product(weights, inputs) + weights[inputs.len()]
}

/// Index of the largest value; the first maximum wins on exact ties.
///
/// Returns `None` for an empty slice.
pub fn argmax_first(values: &[f64]) -> Option<usize> {
    let (first, rest) = values.split_first()?;
    let mut best = 0;
    let mut best_value = *first;
    for (i, &v) in rest.iter().enumerate() {
        if v > best_value {
            best = i + 1;
            best_value = v;
        }
    }
    Some(best)
}
