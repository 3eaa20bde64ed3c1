//! Per-second rate measurement, used for loop statistics.

/// Counts events and reports how many happened in each elapsed second.
pub struct RateCounter {
    window_start_ms: Option<u64>,
    count: u32,
}

impl RateCounter {
    pub fn new() -> Self {
        Self {
            window_start_ms: None,
            count: 0,
        }
    }

    /// Records one event at `now_ms`. Returns the completed count once at
    /// least a second has passed since the current window began.
    pub fn record(&mut self, now_ms: u64) -> Option<u32> {
        let start = *self.window_start_ms.get_or_insert(now_ms);
        self.count += 1;
        if now_ms.saturating_sub(start) >= 1000 {
            let rate = self.count;
            self.count = 0;
            self.window_start_ms = Some(now_ms);
            Some(rate)
        } else {
            None
        }
    }
}

impl Default for RateCounter {
    fn default() -> Self {
        Self::new()
    }
}
