//! AI phase timing against the tick budget
//!
//! Pathfinding is a bounded but synchronous cost paid inside every tick. The
//! world records how long each AI phase took so overruns show up in the logs
//! and in `status()` long before frames start dropping.

use std::collections::VecDeque;
use std::time::Duration;

/// Rolling window size (~2 seconds at 60Hz)
const MAX_SAMPLES: usize = 120;
/// Samples needed before the status is trusted
const MIN_SAMPLES: usize = 10;

/// Budget health over the recent window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    /// Under half the budget on average
    Healthy,
    /// Between half and the full budget
    Strained,
    /// Over budget on average
    Overrun,
}

/// Rolling record of AI phase durations
#[derive(Debug, Clone)]
pub struct TickBudget {
    samples: VecDeque<Duration>,
    budget: Duration,
    status: BudgetStatus,
    overruns: u64,
}

impl TickBudget {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            samples: VecDeque::with_capacity(MAX_SAMPLES),
            budget: Duration::from_secs_f32(1.0 / tick_rate.max(1) as f32),
            status: BudgetStatus::Healthy,
            overruns: 0,
        }
    }

    #[inline]
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Record one phase. Returns true when this sample alone exceeded the budget.
    pub fn record(&mut self, duration: Duration) -> bool {
        self.samples.push_back(duration);
        while self.samples.len() > MAX_SAMPLES {
            self.samples.pop_front();
        }

        let over = duration > self.budget;
        if over {
            self.overruns += 1;
        }
        self.update_status();
        over
    }

    fn update_status(&mut self) {
        if self.samples.len() < MIN_SAMPLES {
            return;
        }
        let ratio = self.budget_usage_percent() / 100.0;
        self.status = if ratio < 0.5 {
            BudgetStatus::Healthy
        } else if ratio <= 1.0 {
            BudgetStatus::Strained
        } else {
            BudgetStatus::Overrun
        };
    }

    pub fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.samples.iter().sum();
        sum / self.samples.len() as u32
    }

    pub fn p95(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let mut sorted: Vec<_> = self.samples.iter().copied().collect();
        sorted.sort();
        let idx = (sorted.len() as f32 * 0.95) as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    pub fn budget_usage_percent(&self) -> f32 {
        self.average().as_secs_f32() / self.budget.as_secs_f32() * 100.0
    }

    #[inline]
    pub fn status(&self) -> BudgetStatus {
        self.status
    }

    /// Samples over budget since creation or the last `clear`
    #[inline]
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.status = BudgetStatus::Healthy;
        self.overruns = 0;
    }

    pub fn status_message(&self) -> String {
        format!(
            "{:?} - {:.1}% budget, p95 {:?}, {} overruns",
            self.status,
            self.budget_usage_percent(),
            self.p95(),
            self.overruns
        )
    }
}

impl Default for TickBudget {
    fn default() -> Self {
        Self::new(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_budget_is_healthy() {
        let budget = TickBudget::new(60);
        assert_eq!(budget.status(), BudgetStatus::Healthy);
        assert_eq!(budget.average(), Duration::ZERO);
        assert!(budget.budget() > Duration::from_millis(16));
    }

    #[test]
    fn test_cheap_ticks_stay_healthy() {
        let mut budget = TickBudget::new(60);
        for _ in 0..20 {
            assert!(!budget.record(Duration::from_millis(2)));
        }
        assert_eq!(budget.status(), BudgetStatus::Healthy);
        assert_eq!(budget.overruns(), 0);
    }

    #[test]
    fn test_strained_between_half_and_full() {
        let mut budget = TickBudget::new(60);
        for _ in 0..20 {
            budget.record(Duration::from_millis(12));
        }
        assert_eq!(budget.status(), BudgetStatus::Strained);
    }

    #[test]
    fn test_overrun_counted() {
        let mut budget = TickBudget::new(60);
        for _ in 0..20 {
            assert!(budget.record(Duration::from_millis(25)));
        }
        assert_eq!(budget.status(), BudgetStatus::Overrun);
        assert_eq!(budget.overruns(), 20);
        assert!(budget.budget_usage_percent() > 100.0);

        budget.clear();
        assert_eq!(budget.overruns(), 0);
        assert_eq!(budget.status(), BudgetStatus::Healthy);
    }

    #[test]
    fn test_status_needs_enough_samples() {
        let mut budget = TickBudget::new(60);
        for _ in 0..MIN_SAMPLES - 1 {
            budget.record(Duration::from_millis(40));
        }
        assert_eq!(budget.status(), BudgetStatus::Healthy);
        budget.record(Duration::from_millis(40));
        assert_eq!(budget.status(), BudgetStatus::Overrun);
    }

    #[test]
    fn test_window_is_bounded() {
        let mut budget = TickBudget::new(60);
        for _ in 0..MAX_SAMPLES {
            budget.record(Duration::from_millis(40));
        }
        for _ in 0..MAX_SAMPLES {
            budget.record(Duration::from_millis(1));
        }
        assert_eq!(budget.average(), Duration::from_millis(1));
        assert_eq!(budget.p95(), Duration::from_millis(1));
    }
}
