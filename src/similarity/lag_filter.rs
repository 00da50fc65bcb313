//! Time-lag median filtering of recurrence matrices
//!
//! Repeated sections show up as stripes parallel to the main diagonal. A
//! median filter running along each diagonal (the time axis of the time-lag
//! representation) keeps those stripes and suppresses isolated matches.

use ndarray::Array2;

/// Median-filter a square matrix along its diagonals
///
/// Each cell is replaced by the median of the `size` cells centered on it
/// along its own diagonal. Cells falling outside the matrix count as zero.
/// For even sizes the upper median is used. A size of 0 or 1 returns a copy.
pub fn diagonal_median_filter(matrix: &Array2<f64>, size: usize) -> Array2<f64> {
    let n = matrix.nrows();
    if size <= 1 || n == 0 || matrix.ncols() != n {
        return matrix.clone();
    }

    log::debug!("Diagonal median filter: {}x{}, size={}", n, n, size);

    let half = size / 2;
    let mut out = Array2::<f64>::zeros((n, n));
    let mut window = Vec::with_capacity(size);
    let n_i = n as isize;

    for offset in -(n_i - 1)..n_i {
        // Cells (row, row + offset) along this diagonal
        let start_row = if offset < 0 { -offset } else { 0 };
        let len = n_i - offset.abs();
        let diagonal: Vec<f64> = (0..len)
            .map(|p| {
                let row = (start_row + p) as usize;
                let col = (start_row + p + offset) as usize;
                matrix[[row, col]]
            })
            .collect();

        for p in 0..len {
            window.clear();
            for q in (p - half as isize)..(p - half as isize + size as isize) {
                let value = if q >= 0 && q < len {
                    diagonal[q as usize]
                } else {
                    0.0
                };
                window.push(value);
            }
            window.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let row = (start_row + p) as usize;
            let col = (start_row + p + offset) as usize;
            out[[row, col]] = window[size / 2];
        }
    }

    out
}
