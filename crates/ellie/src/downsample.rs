//! Order-preserving thinning of track point sequences.

/// Default point ceiling. Keeps the static map URL below the renderer's length limit.
pub const DEFAULT_MAX_POINTS: usize = 30;

/// Reduce `points` to at most `target + 1` samples.
///
/// Sequences of `target` points or fewer come back unchanged. Longer ones are
/// sampled at a fixed real-valued stride `len / target`, and the final point is
/// always appended so the path keeps its endpoint.
pub fn downsample<T: Clone>(points: &[T], target: usize) -> Vec<T> {
    if points.len() <= target {
        return points.to_vec();
    }
    let Some(last) = points.last() else {
        return Vec::new();
    };

    let stride = points.len() as f64 / target as f64;
    let mut sampled = Vec::with_capacity(target + 1);
    for i in 0..target {
        let idx = ((i as f64 * stride).round() as usize).min(points.len() - 1);
        sampled.push(points[idx].clone());
    }
    sampled.push(last.clone());
    sampled
}
