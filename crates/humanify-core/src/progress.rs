//! Progress reporting.
//!
//! The engine reports a fraction in `0..=1` after every applied batch and
//! exactly once with `1.0` on completion. The reporter keeps the stream
//! monotone so resumed runs never appear to move backwards.

/// Callback receiving a completion fraction in `0..=1`.
pub type ProgressFn = Box<dyn Fn(f64) + Send + Sync>;

/// Monotone progress reporter over an optional callback.
pub struct ProgressReporter {
    callback: Option<ProgressFn>,
    last: f64,
    finished: bool,
}

impl ProgressReporter {
    pub fn new(callback: Option<ProgressFn>) -> Self {
        ProgressReporter {
            callback,
            last: 0.0,
            finished: false,
        }
    }

    /// Report `visited / total`, clamped to `[last, 1)`. The final `1.0`
    /// only comes from [`finish`](Self::finish).
    pub fn report(&mut self, visited: usize, total: usize) {
        if self.finished || total == 0 {
            return;
        }
        let fraction = (visited as f64 / total as f64).min(0.999_999);
        if fraction > self.last {
            self.last = fraction;
            if let Some(cb) = &self.callback {
                cb(fraction);
            }
        }
    }

    /// Report exactly one final `1.0`.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.last = 1.0;
        if let Some(cb) = &self.callback {
            cb(1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn capture() -> (Arc<Mutex<Vec<f64>>>, ProgressFn) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cb: ProgressFn = Box::new(move |f| sink.lock().unwrap().push(f));
        (seen, cb)
    }

    #[test]
    fn reports_are_monotone() {
        let (seen, cb) = capture();
        let mut progress = ProgressReporter::new(Some(cb));
        progress.report(1, 4);
        progress.report(1, 4); // duplicate fraction suppressed
        progress.report(3, 4);
        progress.finish();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[0.25, 0.75, 1.0]);
    }

    #[test]
    fn finish_fires_exactly_once() {
        let (seen, cb) = capture();
        let mut progress = ProgressReporter::new(Some(cb));
        progress.finish();
        progress.finish();
        progress.report(1, 2); // after finish: ignored
        assert_eq!(seen.lock().unwrap().as_slice(), &[1.0]);
    }

    #[test]
    fn full_batch_is_capped_below_one_until_finish() {
        let (seen, cb) = capture();
        let mut progress = ProgressReporter::new(Some(cb));
        progress.report(4, 4);
        progress.finish();
        let seen = seen.lock().unwrap();
        assert!(seen[0] < 1.0);
        assert_eq!(*seen.last().unwrap(), 1.0);
    }

    #[test]
    fn no_callback_is_fine() {
        let mut progress = ProgressReporter::new(None);
        progress.report(1, 2);
        progress.finish();
    }
}
