//! Sliding history query: pulls a contiguous, gap-packed window of real
//! values aligned to a dimension's update interval.

use crate::error::Outcome;
use crate::handle::DimensionHandle;
use crate::storage::{decode_packed, SeriesSource};

/// A fixed-length vector of real values pulled from the storage query
/// interface, carry-forward-packed over any interior gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleWindow {
    /// Real values in increasing time order. Never contains `NaN`.
    pub values: Vec<f64>,
    /// Count of real (non-missing) samples observed while building this
    /// window, before leading-gap trimming.
    pub collected: usize,
    /// The `N` requested when the window was built.
    pub capacity: usize,
}

impl SampleWindow {
    /// `collected / capacity`, in `[0, 1]`.
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.collected as f64 / self.capacity as f64
        }
    }

    /// Build a window of `n` samples (minimum `min_n` real samples) ending
    /// one second before `now`, per §4.1.
    pub fn build(
        source: &dyn SeriesSource,
        handle: &DimensionHandle,
        now: i64,
        update_every: i64,
        n: usize,
        min_n: usize,
    ) -> Result<SampleWindow, Outcome> {
        if update_every <= 0 || n == 0 {
            return Err(Outcome::NoData);
        }

        let before = floor_to_multiple(now - 1, update_every);
        let after = floor_to_multiple(before - n as i64 * update_every, update_every);

        let before = match source.latest_time(handle) {
            Some(latest) => before.min(latest),
            None => before,
        };
        let after = match source.oldest_time(handle) {
            Some(oldest) => after.max(oldest),
            None => after,
        };

        if after >= before {
            return Err(Outcome::NoData);
        }

        let mut cursor = source.query(handle, after, before);
        let mut values: Vec<f64> = Vec::with_capacity(n);
        let mut collected = 0usize;
        let mut last_real: Option<f64> = None;

        while values.len() < n && !cursor.is_finished() {
            let Some((_, raw)) = cursor.next_metric() else {
                break;
            };
            let (present, value) = decode_packed(raw);
            if present {
                values.push(value);
                collected += 1;
                last_real = Some(value);
            } else if let Some(prev) = last_real {
                values.push(prev);
            } else {
                values.push(f64::NAN);
            }
        }

        let first_real = values.iter().position(|v| !v.is_nan()).unwrap_or(values.len());
        let values = values.split_off(first_real);

        if collected < min_n {
            return Err(Outcome::MissingData);
        }

        debug_assert!(values.iter().all(|v| !v.is_nan()));

        Ok(SampleWindow {
            values,
            collected,
            capacity: n,
        })
    }
}

/// Floor `x` to the nearest multiple of `step` at or below it.
fn floor_to_multiple(x: i64, step: i64) -> i64 {
    x.div_euclid(step) * step
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::encode_packed;
    use crate::storage::SeriesCursor;

    struct VecSource {
        samples: Vec<(i64, u32)>,
    }

    struct VecCursor<'a> {
        samples: &'a [(i64, u32)],
        idx: usize,
    }

    impl SeriesCursor for VecCursor<'_> {
        fn is_finished(&self) -> bool {
            self.idx >= self.samples.len()
        }

        fn next_metric(&mut self) -> Option<(i64, u32)> {
            let item = self.samples.get(self.idx).copied();
            self.idx += 1;
            item
        }
    }

    impl SeriesSource for VecSource {
        fn latest_time(&self, _handle: &DimensionHandle) -> Option<i64> {
            self.samples.last().map(|(t, _)| *t)
        }

        fn oldest_time(&self, _handle: &DimensionHandle) -> Option<i64> {
            self.samples.first().map(|(t, _)| *t)
        }

        fn query<'a>(&'a self, _handle: &DimensionHandle, after: i64, before: i64) -> Box<dyn SeriesCursor + 'a> {
            let start = self.samples.partition_point(|(t, _)| *t <= after);
            let end = self.samples.partition_point(|(t, _)| *t <= before);
            Box::new(VecCursor {
                samples: &self.samples[start..end],
                idx: 0,
            })
        }
    }

    fn handle() -> DimensionHandle {
        DimensionHandle::new("test.dim")
    }

    #[test]
    fn empty_range_returns_no_data() {
        let source = VecSource { samples: vec![] };
        let err = SampleWindow::build(&source, &handle(), 100, 1, 10, 5).unwrap_err();
        assert_eq!(err, Outcome::NoData);
    }

    #[test]
    fn carries_forward_missing_interior_samples() {
        let samples: Vec<(i64, u32)> = vec![
            (0, encode_packed(true, 1.0)),
            (1, encode_packed(false, 0.0)),
            (2, encode_packed(true, 3.0)),
        ];
        let source = VecSource { samples };
        let window = SampleWindow::build(&source, &handle(), 4, 1, 3, 1).unwrap();
        assert_eq!(window.values, vec![1.0, 1.0, 3.0]);
        assert_eq!(window.collected, 2);
    }

    #[test]
    fn missing_data_when_below_min_n() {
        let samples: Vec<(i64, u32)> = vec![(0, encode_packed(true, 1.0))];
        let source = VecSource { samples };
        let err = SampleWindow::build(&source, &handle(), 4, 1, 3, 2).unwrap_err();
        assert_eq!(err, Outcome::MissingData);
    }

    #[test]
    fn leading_missing_samples_are_trimmed_not_nan() {
        let samples: Vec<(i64, u32)> = vec![
            (0, encode_packed(false, 0.0)),
            (1, encode_packed(true, 5.0)),
            (2, encode_packed(true, 6.0)),
        ];
        let source = VecSource { samples };
        let window = SampleWindow::build(&source, &handle(), 4, 1, 3, 2).unwrap();
        assert!(window.values.iter().all(|v| !v.is_nan()));
        assert_eq!(window.values, vec![5.0, 6.0]);
        assert_eq!(window.collected, 2);
    }
}
