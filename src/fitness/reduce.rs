/// two-phase parallel reduction of per-pixel errors to a single scalar.
/// phase 1 produces one sum per image row (parallel over bands of rows);
/// phase 2 collapses the row sums (parallel over runs of rows). the join
/// between the two rayon dispatches is the barrier: phase 2 never observes
/// a partially written row-sum buffer.
use rayon::prelude::*;

/// fill `row_sums[row]` for every row. rows are dispatched in bands of
/// `tile` rows; `row_error` must be safe to evaluate from any worker.
pub fn reduce_rows<F>(row_sums: &mut [f32], tile: usize, row_error: F)
where
    F: Fn(usize) -> f32 + Sync,
{
    profiling::scope!("reduce_rows");
    debug_assert_eq!(row_sums.len() % tile, 0);
    row_sums
        .par_chunks_exact_mut(tile)
        .enumerate()
        .for_each(|(band, out)| {
            for (offset, slot) in out.iter_mut().enumerate() {
                *slot = row_error(band * tile + offset);
            }
        });
}

/// collapse the row sums to the member's total error. run sums are written
/// to fixed positions and folded in index order, so the result does not
/// depend on how the scheduler split the work.
pub fn reduce_total(row_sums: &[f32], tile: usize) -> f32 {
    profiling::scope!("reduce_total");
    debug_assert_eq!(row_sums.len() % tile, 0);
    let mut run_sums = vec![0.0f32; row_sums.len() / tile];
    row_sums
        .par_chunks_exact(tile)
        .zip(run_sums.par_iter_mut())
        .for_each(|(run, out)| *out = run.iter().sum());
    run_sums.iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_phase_matches_serial_sum() {
        // 8 rows in bands of 4; row r contributes r + 0.5
        let mut row_sums = vec![0.0f32; 8];
        reduce_rows(&mut row_sums, 4, |row| row as f32 + 0.5);

        let expected: f32 = (0..8).map(|r| r as f32 + 0.5).sum();
        assert_eq!(reduce_total(&row_sums, 4), expected);
    }

    #[test]
    fn test_rows_land_in_their_own_slots() {
        let mut row_sums = vec![0.0f32; 6];
        reduce_rows(&mut row_sums, 2, |row| row as f32);
        assert_eq!(row_sums, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }
}
