//! Math utility functions

/// Compute Euclidean distance between two vectors.
///
/// Vectors of different length are never close: the distance is `f32::MAX`.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::MAX;
    }

    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

/// User-facing match score: `(1 - distance) * 100`, rounded
pub fn confidence_from_distance(distance: f32) -> i32 {
    ((1.0 - distance) * 100.0).round() as i32
}

/// Pack a float vector as little-endian bytes
pub fn f32_to_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Inverse of [`f32_to_bytes`]
pub fn f32_from_bytes(bytes: &[u8]) -> anyhow::Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        anyhow::bail!("Invalid embedding bytes length: {}", bytes.len());
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
