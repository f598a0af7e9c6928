pub fn l2_norm(v: &[f32]) -> f32 {
    let mut sum = 0.0f32;
    for x in v {
        sum += x * x;
    }
    sum.sqrt()
}

pub fn cosine_similarity(a: &[f32], b: &[f32], a_norm: f32, b_norm: f32) -> f32 {
    let mut dot = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
    }
    dot / (a_norm * b_norm)
}

/// `1 - cos(a, b)`, or `None` when either side has zero length.
pub fn cosine_distance(a: &[f32], b: &[f32], a_norm: f32, b_norm: f32) -> Option<f32> {
    if a_norm == 0.0 || b_norm == 0.0 {
        return None;
    }
    Some(1.0 - cosine_similarity(a, b, a_norm, b_norm))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_of_parallel_and_orthogonal_vectors() {
        let a = [1.0, 0.0];
        let b = [2.0, 0.0];
        let c = [0.0, 3.0];
        let d = cosine_distance(&a, &b, l2_norm(&a), l2_norm(&b)).unwrap();
        assert!(d.abs() < 1e-6);
        let d = cosine_distance(&a, &c, l2_norm(&a), l2_norm(&c)).unwrap();
        assert!((d - 1.0).abs() < 1e-6);
        assert!(cosine_distance(&a, &[0.0, 0.0], 1.0, 0.0).is_none());
    }
}
