//! Read-only aggregations over a logger's history.

use std::sync::Arc;

use crate::statistics::logger::StatisticsLogger;
use crate::statistics::types::{StatisticsError, StatisticsResult};

/// Windowed queries against a [`StatisticsLogger`].
#[derive(Debug, Clone)]
pub struct StatisticsQueries {
    logger: Arc<StatisticsLogger>,
}

impl StatisticsQueries {
    pub fn new(logger: Arc<StatisticsLogger>) -> Self {
        Self { logger }
    }

    /// Average response time in milliseconds over history slices
    /// `0..=slice_index`, oldest first.
    ///
    /// Each slice contributes its own mean (0 when it has no completed
    /// operations) and the slices are averaged unweighted, so a quiet slice
    /// counts as much as a busy one.
    pub fn avg_response_time_until(&self, slice_index: usize) -> StatisticsResult<f64> {
        self.logger.with_history(|slices| {
            if slice_index >= slices.len() {
                return Err(StatisticsError::OutOfRange {
                    index: slice_index,
                    len: slices.len(),
                });
            }

            let window = &slices[..=slice_index];
            let total: f64 = window.iter().map(|s| s.avg_response_time_ms()).sum();
            Ok(total / window.len() as f64)
        })
    }

    /// Averages for each window size that the current history can satisfy.
    /// A window of `n` slices is reported once at least `n` slices exist.
    pub fn avg_response_times(&self, windows: &[usize]) -> Vec<(usize, f64)> {
        windows
            .iter()
            .filter(|n| **n > 0)
            .filter_map(|n| {
                self.avg_response_time_until(n - 1)
                    .ok()
                    .map(|avg| (*n, avg))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::statistics::logger::tests::advance;

    #[tokio::test(start_paused = true)]
    async fn test_avg_response_time_golden() {
        let delays = [100, 200, 300, 200, 100];
        let total_ms: u64 = delays.iter().map(|d| d * 10).sum();

        let logger = Arc::new(StatisticsLogger::new(
            Duration::from_millis(1000),
            (total_ms / 1000) as usize,
        ));
        logger.start().unwrap();

        for i in 0..50u64 {
            let id = i.to_string();
            logger.request(&id).unwrap();
            advance(delays[(i / 10) as usize]).await;
            if i % 2 == 0 {
                logger.response(&id).unwrap();
            } else {
                logger.error(&id).unwrap();
            }
        }
        logger.stop();

        let queries = StatisticsQueries::new(logger);
        let expected = [100, 150, 166, 200, 220, 233, 228, 225, 211];
        for (index, want) in expected.iter().enumerate() {
            let avg = queries.avg_response_time_until(index).unwrap();
            assert_eq!(avg.trunc() as u64, *want, "slice index {}", index);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_index_out_of_range() {
        let logger = Arc::new(StatisticsLogger::new(Duration::from_millis(1000), 3));
        logger.start().unwrap();
        let queries = StatisticsQueries::new(logger);

        assert_eq!(
            queries.avg_response_time_until(4),
            Err(StatisticsError::OutOfRange { index: 4, len: 0 })
        );
        assert!(queries.avg_response_time_until(0).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_slices_count_as_zero() {
        let logger = Arc::new(StatisticsLogger::new(Duration::from_millis(1000), 5));
        logger.start().unwrap();

        logger.request("a").unwrap();
        advance(400).await;
        logger.response("a").unwrap();
        advance(600).await;
        advance(1000).await;

        let queries = StatisticsQueries::new(logger);
        assert_eq!(queries.avg_response_time_until(0).unwrap(), 400.0);
        assert_eq!(queries.avg_response_time_until(1).unwrap(), 200.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_windows_limited_by_history() {
        let logger = Arc::new(StatisticsLogger::new(Duration::from_millis(1000), 10));
        logger.start().unwrap();
        for _ in 0..3 {
            advance(1000).await;
        }

        let queries = StatisticsQueries::new(logger);
        let windows: Vec<usize> = queries
            .avg_response_times(&[2, 3, 5])
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(windows, vec![2, 3]);
    }
}
