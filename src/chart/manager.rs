//! Bar data manager for the chart module.
//!
//! Holds the ordered, append-only bar sequence. The only mutations are
//! appending a newer bar or replacing the last one in place.

use super::object::Bar;

/// Outcome of feeding one bar into the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarUpdate {
    /// A new bar was pushed at the end
    Appended,
    /// The last bar was replaced in place
    ReplacedLast,
    /// The bar was older than the last one and dropped
    Ignored,
}

/// Manages the ordered bar sequence
#[derive(Debug, Clone, Default)]
pub struct BarManager {
    /// Ordered list of bar data
    ordered_bars: Vec<Bar>,
}

impl BarManager {
    /// Create a new BarManager
    pub fn new() -> Self {
        Self {
            ordered_bars: Vec::new(),
        }
    }

    /// Replace the whole history. Bars are sorted by timestamp; for equal
    /// timestamps the later entry wins.
    pub fn update_history(&mut self, mut history: Vec<Bar>) {
        history.sort_by_key(|bar| bar.timestamp);

        let mut ordered: Vec<Bar> = Vec::with_capacity(history.len());
        for bar in history {
            match ordered.last_mut() {
                Some(last) if last.timestamp == bar.timestamp => *last = bar,
                _ => ordered.push(bar),
            }
        }

        tracing::info!(count = ordered.len(), "bar history loaded");
        self.ordered_bars = ordered;
    }

    /// Update with a single bar: same timestamp as the last bar replaces it,
    /// a newer timestamp appends.
    pub fn update_bar(&mut self, bar: Bar) -> BarUpdate {
        match self.ordered_bars.last() {
            Some(last) if bar.timestamp == last.timestamp => {
                self.update_last(bar);
                BarUpdate::ReplacedLast
            }
            Some(last) if bar.timestamp < last.timestamp => {
                tracing::warn!(
                    timestamp = bar.timestamp,
                    last = last.timestamp,
                    "ignoring bar older than the last bar"
                );
                BarUpdate::Ignored
            }
            _ => {
                self.append(bar);
                BarUpdate::Appended
            }
        }
    }

    /// Push a new bar at the end
    pub fn append(&mut self, bar: Bar) {
        self.ordered_bars.push(bar);
    }

    /// Replace the raw fields of the last bar, keeping its indicator values
    /// so that fields of inactive selections survive.
    pub fn update_last(&mut self, bar: Bar) {
        match self.ordered_bars.last_mut() {
            Some(last) => {
                let values = std::mem::take(&mut last.values);
                *last = bar;
                last.values = values;
            }
            None => self.ordered_bars.push(bar),
        }
    }

    /// Swap in a fully computed sequence
    pub fn replace_bars(&mut self, bars: Vec<Bar>) {
        self.ordered_bars = bars;
    }

    /// Get total number of bars
    pub fn get_count(&self) -> usize {
        self.ordered_bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_bars.is_empty()
    }

    /// Get bar data for an index
    pub fn get_bar(&self, ix: usize) -> Option<&Bar> {
        self.ordered_bars.get(ix)
    }

    pub fn last_bar(&self) -> Option<&Bar> {
        self.ordered_bars.last()
    }

    /// Get all bar data
    pub fn get_all_bars(&self) -> &[Bar] {
        &self.ordered_bars
    }

    pub(crate) fn bars_mut(&mut self) -> &mut [Bar] {
        &mut self.ordered_bars
    }

    /// Owned copy for off-thread work
    pub fn snapshot(&self) -> Vec<Bar> {
        self.ordered_bars.clone()
    }

    /// Clear all data
    pub fn clear_all(&mut self) {
        self.ordered_bars.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_bar(timestamp: i64, close: f64) -> Bar {
        Bar::new(timestamp, close, close + 1.0, close - 1.0, close, 100.0)
    }

    #[test]
    fn test_update_history_sorts_and_dedups() {
        let mut manager = BarManager::new();
        manager.update_history(vec![
            create_test_bar(3, 30.0),
            create_test_bar(1, 10.0),
            create_test_bar(2, 20.0),
            create_test_bar(2, 21.0),
        ]);

        assert_eq!(manager.get_count(), 3);
        assert_eq!(manager.get_bar(0).unwrap().timestamp, 1);
        assert_eq!(manager.get_bar(1).unwrap().close, 21.0);
        assert_eq!(manager.last_bar().unwrap().timestamp, 3);
    }

    #[test]
    fn test_update_bar_append_and_replace() {
        let mut manager = BarManager::new();
        assert_eq!(manager.update_bar(create_test_bar(1, 10.0)), BarUpdate::Appended);
        assert_eq!(manager.update_bar(create_test_bar(2, 11.0)), BarUpdate::Appended);
        assert_eq!(manager.update_bar(create_test_bar(2, 12.0)), BarUpdate::ReplacedLast);
        assert_eq!(manager.update_bar(create_test_bar(1, 9.0)), BarUpdate::Ignored);

        assert_eq!(manager.get_count(), 2);
        assert_eq!(manager.last_bar().unwrap().close, 12.0);
    }

    #[test]
    fn test_update_last_keeps_values() {
        let mut manager = BarManager::new();
        let mut bar = create_test_bar(1, 10.0);
        bar.values.ema.insert(5, 10.0);
        manager.append(bar);

        manager.update_last(create_test_bar(1, 11.0));
        let last = manager.last_bar().unwrap();
        assert_eq!(last.close, 11.0);
        assert_eq!(last.values.ema(5), Some(10.0));
    }

    #[test]
    fn test_empty_manager() {
        let manager = BarManager::default();
        assert!(manager.is_empty());
        assert!(manager.get_bar(0).is_none());
    }
}
