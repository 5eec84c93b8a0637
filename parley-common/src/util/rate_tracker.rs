use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Struct to allow the tracking of how frequently something happens over a trailing window.
///
/// For example, can be used to determine how many commands were ran over the last minute,
/// or the rate of messages being received.
pub struct RateTracker {
    tracking_length: Duration,
    samples: VecDeque<Instant>,
}
impl RateTracker {
    pub fn new(tracking_length: Duration) -> RateTracker {
        RateTracker {
            tracking_length,
            samples: VecDeque::new(),
        }
    }

    fn remove_expired(&mut self) {
        while let Some(oldest) = self.samples.front() {
            if oldest.elapsed() > self.tracking_length {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn add_sample(&mut self) {
        self.remove_expired();
        self.samples.push_back(Instant::now());
    }

    /// Number of samples inside the window.
    pub fn get_rate(&self) -> usize {
        self.samples
            .iter()
            .filter(|sample| sample.elapsed() <= self.tracking_length)
            .count()
    }
}
