//! Three-state machine driving anomaly-event boundaries from a stream of
//! per-tick anomaly bits.

use crate::bits::RollingBitCounter;

/// Which of the three states the window is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// The underlying counter has not yet seen `window_size` insertions.
    NotFilled,
    /// Filled, and the set-bit count is below `threshold`.
    Below,
    /// Filled, and the set-bit count is at or above `threshold`.
    Above,
}

/// A state transition: `(from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: WindowState,
    pub to: WindowState,
}

impl Edge {
    /// An `Above -> Below` transition ends an anomalous run.
    pub fn is_closing(&self) -> bool {
        self.from == WindowState::Above && self.to == WindowState::Below
    }

    /// A `Below -> Below` transition signals a stale contribution baseline.
    pub fn is_roundtrip_below(&self) -> bool {
        self.from == WindowState::Below && self.to == WindowState::Below
    }
}

/// Owns a [`RollingBitCounter`] of capacity `window_size` and drives the
/// three-state machine over it.
#[derive(Debug, Clone)]
pub struct RollingBitWindow {
    counter: RollingBitCounter,
    threshold: usize,
    window_size: u64,
    state: WindowState,
    current_length: u64,
    previous_length: u64,
}

impl RollingBitWindow {
    pub fn new(window_size: usize, threshold: usize) -> Self {
        Self {
            counter: RollingBitCounter::new(window_size),
            threshold,
            window_size: window_size as u64,
            state: WindowState::NotFilled,
            current_length: 0,
            previous_length: 0,
        }
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn current_length(&self) -> u64 {
        self.current_length
    }

    pub fn window_size(&self) -> u64 {
        self.window_size
    }

    /// Feed one new bit. Returns the edge taken and `previous_length` — the
    /// length of the run as it stood *before* this insertion, which is the
    /// value to report on a closing edge.
    pub fn insert(&mut self, bit: bool) -> (Edge, u64) {
        self.counter.insert(bit);
        let filled = self.counter.is_filled();
        let above = self.counter.set_bits() >= self.threshold;

        self.previous_length = self.current_length;
        let from = self.state;

        let to = match from {
            WindowState::NotFilled => {
                if !filled {
                    self.current_length += 1;
                    WindowState::NotFilled
                } else if above {
                    self.current_length += 1;
                    WindowState::Above
                } else {
                    self.current_length = self.window_size;
                    WindowState::Below
                }
            }
            WindowState::Below => {
                self.current_length = self.window_size;
                if above {
                    WindowState::Above
                } else {
                    WindowState::Below
                }
            }
            WindowState::Above => {
                if above {
                    self.current_length += 1;
                    WindowState::Above
                } else {
                    self.current_length = self.window_size;
                    WindowState::Below
                }
            }
        };
        self.state = to;
        (Edge { from, to }, self.previous_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closing_lengths(window_size: usize, threshold: usize, bits: &[u8]) -> Vec<u64> {
        let mut window = RollingBitWindow::new(window_size, threshold);
        let mut closings = Vec::new();
        for &b in bits {
            let (edge, prev) = window.insert(b == 1);
            if edge.is_closing() {
                closings.push(prev);
            }
        }
        closings
    }

    const SEQUENCE: [u8; 14] = [0, 0, 1, 1, 0, 1, 0, 0, 0, 1, 0, 1, 0, 0];

    #[test]
    fn scenario_bit_window_edge_emission() {
        assert_eq!(closing_lengths(4, 2, &SEQUENCE), vec![7, 5]);
    }

    #[test]
    fn scenario_threshold_escalation() {
        assert_eq!(closing_lengths(4, 3, &SEQUENCE), vec![4]);
    }

    #[test]
    fn scenario_no_emission_at_all() {
        assert_eq!(closing_lengths(4, 4, &SEQUENCE), Vec::<u64>::new());
    }

    #[test]
    fn no_closing_edge_before_counter_fills() {
        let mut window = RollingBitWindow::new(10, 1);
        for _ in 0..9 {
            let (edge, _) = window.insert(true);
            assert!(!edge.is_closing());
        }
    }

    #[test]
    fn current_length_at_least_window_size_once_filled() {
        let mut window = RollingBitWindow::new(4, 2);
        for &b in SEQUENCE.iter() {
            window.insert(b == 1);
            if !matches!(window.state(), WindowState::NotFilled) {
                assert!(window.current_length() >= window.window_size());
            }
        }
    }

    #[test]
    fn roundtrip_below_is_detected() {
        let mut window = RollingBitWindow::new(4, 2);
        let mut saw_roundtrip = false;
        for &b in SEQUENCE.iter() {
            let (edge, _) = window.insert(b == 1);
            saw_roundtrip |= edge.is_roundtrip_below();
        }
        assert!(saw_roundtrip);
    }
}
