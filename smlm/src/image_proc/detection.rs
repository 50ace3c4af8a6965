//! Single-pass local maximum detection on the band-pass image.

use ndarray::{Array2, ArrayView2};

/// Integer pixel position of a probable emitter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub x: usize,
    pub y: usize,
}

/// Forward neighbours compared against each pixel: right, down-right, down, down-left
const FORWARD_NEIGHBOURS: [(isize, usize); 4] = [(1, 0), (1, 1), (0, 1), (-1, 1)];

/// Find local maxima of `band_pass` above `threshold`, at least `margin` pixels from every edge.
///
/// Pixels are scanned in row-major order, skipping the last row and column. Each
/// pixel is compared with its four forward neighbours and the lower of each pair
/// loses its maximum flag; a tie clears the scanned pixel. Once a pixel has been
/// scanned its flag can no longer change, so candidates are emitted immediately.
/// On plateaus the outcome depends on scan order. Neighbours outside the image
/// are skipped.
pub fn detect_candidates(
    band_pass: ArrayView2<f64>,
    threshold: f64,
    margin: usize,
) -> Vec<Candidate> {
    let (height, width) = band_pass.dim();
    let mut candidates = Vec::new();
    if width < 2 || height < 2 {
        return candidates;
    }

    let mut is_max = Array2::from_elem((height, width), true);

    for y in 0..height - 1 {
        for x in 0..width - 1 {
            let value = band_pass[[y, x]];
            for &(dx, dy) in &FORWARD_NEIGHBOURS {
                let Some(nx) = x.checked_add_signed(dx) else {
                    continue;
                };
                let ny = y + dy;
                if value > band_pass[[ny, nx]] {
                    is_max[[ny, nx]] = false;
                } else {
                    is_max[[y, x]] = false;
                }
            }

            let inside = x >= margin && x + margin < width && y >= margin && y + margin < height;
            if is_max[[y, x]] && value > threshold && inside {
                candidates.push(Candidate { x, y });
            }
        }
    }

    log::debug!("{} candidates above threshold {threshold:.4}", candidates.len());
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn spot(width: usize, height: usize, at: (usize, usize), value: f64) -> Array2<f64> {
        let mut image = Array2::zeros((height, width));
        image[[at.1, at.0]] = value;
        image
    }

    #[test]
    fn test_single_peak_detected() {
        let image = spot(16, 12, (7, 5), 3.0);
        let candidates = detect_candidates(image.view(), 1.0, 4);
        assert_eq!(candidates, vec![Candidate { x: 7, y: 5 }]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let image = spot(16, 16, (8, 8), 2.0);
        assert!(detect_candidates(image.view(), 2.0, 4).is_empty());
        assert_eq!(detect_candidates(image.view(), 1.999, 4).len(), 1);
    }

    #[test]
    fn test_margin_excludes_edges() {
        // x = width - margin is outside, x = margin is inside
        let image = spot(16, 16, (12, 8), 5.0);
        assert!(detect_candidates(image.view(), 0.0, 4).is_empty());
        let image = spot(16, 16, (4, 4), 5.0);
        assert_eq!(detect_candidates(image.view(), 0.0, 4).len(), 1);
        let image = spot(16, 16, (3, 8), 5.0);
        assert!(detect_candidates(image.view(), 0.0, 4).is_empty());
    }

    #[test]
    fn test_horizontal_plateau_goes_to_second_pixel() {
        // Tie with the right neighbour clears the scanned pixel
        let mut image = Array2::zeros((12, 12));
        image[[6, 5]] = 4.0;
        image[[6, 6]] = 4.0;
        let candidates = detect_candidates(image.view(), 1.0, 2);
        assert_eq!(candidates, vec![Candidate { x: 6, y: 6 }]);
    }

    #[test]
    fn test_diagonal_plateau_goes_to_later_pixel() {
        let mut image = Array2::zeros((12, 12));
        image[[5, 6]] = 4.0;
        image[[6, 5]] = 4.0;
        // (6, 5) ties with its down-left neighbour (5, 6), which survives
        let candidates = detect_candidates(image.view(), 1.0, 2);
        assert_eq!(candidates, vec![Candidate { x: 5, y: 6 }]);
    }

    #[test]
    fn test_left_column_does_not_wrap() {
        // Wrapping down-left from column 0 would land on the last pixel of the same row
        let mut image = Array2::zeros((6, 6));
        image[[2, 0]] = 3.0;
        image[[2, 5]] = 9.0;
        let candidates = detect_candidates(image.view(), 1.0, 0);
        assert!(candidates.contains(&Candidate { x: 0, y: 2 }));
    }

    #[test]
    fn test_last_row_and_column_never_scanned() {
        let image = spot(8, 8, (7, 3), 5.0);
        assert!(detect_candidates(image.view(), 0.0, 0).is_empty());
        let image = spot(8, 8, (3, 7), 5.0);
        assert!(detect_candidates(image.view(), 0.0, 0).is_empty());
    }

    #[test]
    fn test_tiny_images() {
        let image = Array2::<f64>::zeros((1, 10));
        assert!(detect_candidates(image.view(), -1.0, 0).is_empty());
        let image = Array2::<f64>::zeros((0, 0));
        assert!(detect_candidates(image.view(), -1.0, 0).is_empty());
    }
}
