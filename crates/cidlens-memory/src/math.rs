/// Cosine of the angle between `a` and `b`.
///
/// Vectors of different lengths are incomparable and score `0.0`; so does a
/// pair where either vector has zero norm. Sums are accumulated in `f64` and
/// the result is clamped to `[-1.0, 1.0]`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) =
        a.iter()
            .zip(b)
            .fold((0.0f64, 0.0f64, 0.0f64), |(dot, na, nb), (&x, &y)| {
                let (x, y) = (f64::from(x), f64::from(y));
                (dot + x * y, na + x * x, nb + y * y)
            });

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32
}
