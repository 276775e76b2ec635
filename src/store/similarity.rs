//! Vector Similarity Functions
//!
//! Cosine similarity over half-precision embedding rows. Accumulation is
//! done in f32; the rows themselves stay f16 to halve the resident
//! footprint of the table.

use half::f16;

/// Compute dot product of two f16 rows with f32 accumulation.
///
/// Uses unrolled loop for better CPU performance.
#[inline]
pub fn dot_product(a: &[f16], b: &[f16]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let len = a.len();
    let mut sum = 0.0f32;

    // Process 4 elements at a time (manual unrolling)
    let chunks = len / 4;
    let remainder = len % 4;

    for i in 0..chunks {
        let idx = i * 4;
        sum += a[idx].to_f32() * b[idx].to_f32();
        sum += a[idx + 1].to_f32() * b[idx + 1].to_f32();
        sum += a[idx + 2].to_f32() * b[idx + 2].to_f32();
        sum += a[idx + 3].to_f32() * b[idx + 3].to_f32();
    }

    // Handle remainder
    for i in (len - remainder)..len {
        sum += a[i].to_f32() * b[i].to_f32();
    }

    sum
}

/// L2 magnitude of a row, accumulated in f32.
#[inline]
pub fn magnitude(a: &[f16]) -> f32 {
    a.iter().map(|x| x.to_f32() * x.to_f32()).sum::<f32>().sqrt()
}

/// Compute cosine similarity between two rows.
///
/// Returns value in range [-1, 1] where 1 means identical direction.
/// Zero-magnitude rows score 0.
#[inline]
pub fn cosine_similarity(a: &[f16], b: &[f16]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let dot = dot_product(a, b);
    let denom = magnitude(a) * magnitude(b);
    if denom > 0.0 {
        dot / denom
    } else {
        0.0
    }
}

#[cfg(test)]
pub(crate) fn quantize(v: &[f32]) -> Vec<f16> {
    v.iter().copied().map(f16::from_f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_product() {
        let a = quantize(&[1.0, 2.0, 3.0]);
        let b = quantize(&[4.0, 5.0, 6.0]);
        assert!((dot_product(&a, &b) - 32.0).abs() < 1e-3);
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = quantize(&[1.0, 0.0, 0.0]);
        let b = quantize(&[1.0, 0.0, 0.0]);
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = quantize(&[1.0, 0.0, 0.0]);
        let b = quantize(&[0.0, 1.0, 0.0]);
        assert!(cosine_similarity(&a, &b).abs() < 1e-3);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = quantize(&[1.0, 0.0, 0.0]);
        let b = quantize(&[-1.0, 0.0, 0.0]);
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_magnitude_scores_zero() {
        let a = quantize(&[0.0, 0.0, 0.0]);
        let b = quantize(&[1.0, 2.0, 3.0]);
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_unroll_remainder() {
        // 5 components exercises both the unrolled body and the tail
        let a = quantize(&[1.0, 1.0, 1.0, 1.0, 2.0]);
        let b = quantize(&[2.0, 2.0, 2.0, 2.0, 3.0]);
        assert!((dot_product(&a, &b) - 14.0).abs() < 1e-3);
    }
}
