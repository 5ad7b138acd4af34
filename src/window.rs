//! Generic time-windowed ring buffer.
//!
//! Every tracker in `components/` needs the same shape: append a
//! timestamped record, evict anything older than a retention bound, and
//! scan a sub-window from the head on query. Rather than each tracker
//! re-implementing its own `VecDeque<(i64, T)>`, this is the one generic
//! container the redesign calls for.

use std::collections::VecDeque;

/// A record paired with the millisecond timestamp it was observed at.
pub trait Timestamped {
    fn time_ms(&self) -> i64;
}

/// Monotone time-ordered queue with lazy eviction past `retention_ms`.
#[derive(Debug, Clone)]
pub struct Window<T> {
    retention_ms: i64,
    entries: VecDeque<T>,
}

impl<T: Timestamped> Window<T> {
    pub fn new(retention_ms: i64) -> Self {
        Self {
            retention_ms,
            entries: VecDeque::new(),
        }
    }

    /// Push a new record and evict anything now out of retention. Records
    /// older than the current tail are still accepted but sorted into
    /// place, keeping the monotone-time invariant without rejecting
    /// slightly-reordered wire delivery.
    pub fn push(&mut self, now_ms: i64, record: T) {
        match self.entries.back() {
            Some(tail) if record.time_ms() < tail.time_ms() => {
                let pos = self
                    .entries
                    .iter()
                    .position(|e| e.time_ms() > record.time_ms())
                    .unwrap_or(self.entries.len());
                self.entries.insert(pos, record);
            }
            _ => self.entries.push_back(record),
        }
        self.evict(now_ms);
    }

    pub fn evict(&mut self, now_ms: i64) {
        let cutoff = now_ms - self.retention_ms;
        while let Some(front) = self.entries.front() {
            if front.time_ms() < cutoff {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// Iterate entries with `time_ms >= now_ms - window_ms`.
    pub fn since(&self, now_ms: i64, window_ms: i64) -> impl Iterator<Item = &T> {
        let cutoff = now_ms - window_ms;
        self.entries.iter().filter(move |e| e.time_ms() >= cutoff)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn front(&self) -> Option<&T> {
        self.entries.front()
    }

    pub fn back(&self) -> Option<&T> {
        self.entries.back()
    }
}

/// A fixed-capacity history (candles, ATR readings) that drops the oldest
/// entry once `cap` is exceeded rather than evicting by age.
#[derive(Debug, Clone)]
pub struct Capped<T> {
    cap: usize,
    entries: VecDeque<T>,
}

impl<T> Capped<T> {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            entries: VecDeque::with_capacity(cap.min(1024)),
        }
    }

    pub fn push(&mut self, value: T) {
        if self.entries.len() >= self.cap {
            self.entries.pop_front();
        }
        self.entries.push_back(value);
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn last_mut(&mut self) -> Option<&mut T> {
        self.entries.back_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Point(i64, f64);
    impl Timestamped for Point {
        fn time_ms(&self) -> i64 {
            self.0
        }
    }

    #[test]
    fn evicts_past_retention() {
        let mut w: Window<Point> = Window::new(1_000);
        w.push(0, Point(0, 1.0));
        w.push(500, Point(500, 2.0));
        w.push(1_500, Point(1_500, 3.0));
        assert_eq!(w.len(), 2);
        assert_eq!(w.front().unwrap().0, 500);
    }

    #[test]
    fn since_filters_subwindow() {
        let mut w: Window<Point> = Window::new(10_000);
        for t in [0, 1_000, 2_000, 3_000] {
            w.push(3_000, Point(t, t as f64));
        }
        let recent: Vec<_> = w.since(3_000, 1_500).map(|p| p.0).collect();
        assert_eq!(recent, vec![2_000, 3_000]);
    }

    #[test]
    fn capped_drops_oldest() {
        let mut c: Capped<i32> = Capped::new(3);
        for i in 0..5 {
            c.push(i);
        }
        assert_eq!(c.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
    }
}
