//! Fill-policy target dimensions.

/// Computes the new size for a `width × height` image against a
/// `max_width × max_height` box using the *fill* policy.
///
/// Returns `None` when the image is already within both bounds, or when the
/// rounded result equals the input size (nothing to do). Otherwise the image
/// is scaled by `max(max_width / width, max_height / height)`, so the result
/// covers the box and may exceed it on one axis. Aspect ratio is preserved
/// within rounding and neither side drops below 1.
///
/// ```
/// use birdcache_core::resize::fill_dimensions;
///
/// assert_eq!(fill_dimensions(2000, 1000, 800, 600), Some((1200, 600)));
/// assert_eq!(fill_dimensions(400, 300, 800, 600), None);
/// ```
#[must_use]
pub fn fill_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> Option<(u32, u32)> {
    if width == 0 || height == 0 || (width <= max_width && height <= max_height) {
        return None;
    }

    let scale = (f64::from(max_width) / f64::from(width)).max(f64::from(max_height) / f64::from(height));
    let new_width = scaled_side(width, scale);
    let new_height = scaled_side(height, scale);

    if (new_width, new_height) == (width, height) {
        None
    } else {
        Some((new_width, new_height))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scaled_side(side: u32, scale: f64) -> u32 {
    let scaled = (f64::from(side) * scale).round();
    (scaled.min(f64::from(u32::MAX)) as u32).max(1)
}
