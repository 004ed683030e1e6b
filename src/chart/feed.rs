//! Producer side of the chart: bars arrive from any thread through a
//! [`BarFeed`] and are drained by the owning view before each draw.

use tokio::sync::mpsc;

use super::indicator::IndicatorEngine;
use super::object::Bar;
use crate::error::{ChartError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// A live update: appends a newer bar or replaces the last one
    Bar(Bar),
    /// Replace the whole series
    History(Vec<Bar>),
}

/// Cloneable handle for posting bars to a chart view
#[derive(Debug, Clone)]
pub struct BarFeed {
    sender: mpsc::UnboundedSender<FeedEvent>,
}

pub type FeedReceiver = mpsc::UnboundedReceiver<FeedEvent>;

impl BarFeed {
    pub fn channel() -> (Self, FeedReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn send(&self, event: FeedEvent) -> Result<()> {
        self.sender.send(event).map_err(|_| ChartError::FeedClosed)
    }

    pub fn send_bar(&self, bar: Bar) -> Result<()> {
        self.send(FeedEvent::Bar(bar))
    }

    pub fn send_history(&self, bars: Vec<Bar>) -> Result<()> {
        self.send(FeedEvent::History(bars))
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Result of a full recompute done off the owner thread
#[derive(Debug, Clone)]
pub struct RecomputedBars {
    pub bars: Vec<Bar>,
    /// Selections the bars were computed for
    pub engine: IndicatorEngine,
}

/// Full indicator recompute of an owned snapshot on the blocking pool
pub async fn recompute(engine: IndicatorEngine, mut bars: Vec<Bar>) -> Result<RecomputedBars> {
    let handle = tokio::task::spawn_blocking(move || {
        engine.recompute_all(&mut bars);
        RecomputedBars { bars, engine }
    });
    handle.await.map_err(|e| ChartError::Task(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::indicator::{MainIndicator, SecondarySet};
    use tokio_test::{assert_err, assert_ok};

    fn create_test_bar(timestamp: i64, close: f64) -> Bar {
        Bar::new(timestamp, close, close + 1.0, close - 1.0, close, 10.0)
    }

    #[tokio::test]
    async fn test_send_and_receive() {
        let (feed, mut receiver) = BarFeed::channel();
        let producer = feed.clone();
        let sent = tokio::spawn(async move { producer.send_bar(create_test_bar(1_000, 10.0)) })
            .await
            .unwrap();
        assert_ok!(sent);

        assert_eq!(
            receiver.recv().await,
            Some(FeedEvent::Bar(create_test_bar(1_000, 10.0)))
        );
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped() {
        let (feed, receiver) = BarFeed::channel();
        drop(receiver);
        assert!(feed.is_closed());
        let error = assert_err!(feed.send_history(Vec::new()));
        assert!(matches!(error, ChartError::FeedClosed));
    }

    #[tokio::test]
    async fn test_background_recompute_matches_inline() {
        let bars: Vec<Bar> = (0..40)
            .map(|i| create_test_bar(i * 60_000, 100.0 + (i % 7) as f64))
            .collect();
        let engine = IndicatorEngine::new(MainIndicator::default_ma(), SecondarySet::new());

        let mut inline = bars.clone();
        engine.recompute_all(&mut inline);

        let result = recompute(engine.clone(), bars).await.unwrap();
        assert_eq!(result.engine, engine);
        assert_eq!(result.bars, inline);
    }
}
