//! Time-domain waveform geometry.
//!
//! Maps one chunk of samples onto a polyline spanning the window width.

/// A point in window pixels, y growing downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Fills `points` with one vertex per sample.
///
/// Sample `i` of `n` sits at `x = i * width / (n - 1)`; amplitudes are clamped
/// to `[-1, 1]` and mapped so that `1.0` touches the top edge and `-1.0` the
/// bottom. A single sample yields two identical points so a line can still be
/// drawn. `points` is reused to avoid reallocating every frame.
pub fn waveform_points(samples: &[f32], width: f32, height: f32, points: &mut Vec<Point>) {
    points.clear();
    let n = samples.len();
    if n == 0 {
        return;
    }

    let center_y = height / 2.0;
    let max_amplitude = height / 2.0;
    let x_scale = if n > 1 { width / (n - 1) as f32 } else { width };

    points.extend(samples.iter().enumerate().map(|(i, &amplitude)| {
        let clamped = if amplitude.is_nan() { 0.0 } else { amplitude.clamp(-1.0, 1.0) };
        Point {
            x: i as f32 * x_scale,
            y: center_y - clamped * max_amplitude,
        }
    }));

    if n == 1 {
        points.push(points[0]);
    }
}
