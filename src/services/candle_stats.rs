use serde::Serialize;

use crate::constants::{MA_LONG_PERIOD, MA_SHORT_PERIOD};
use crate::models::Candle;

/// Summary statistics over a window of candles
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandleSummary {
    pub count: usize,
    pub last_price: f64,
    /// Percent change of the last close against the first close
    pub change_pct: f64,
    pub avg_volume: f64,
    pub max_high: f64,
    pub min_low: f64,
    /// Sample standard deviation of close
    pub volatility: f64,
    pub sma_short: Option<f64>,
    pub sma_long: Option<f64>,
}

impl CandleSummary {
    /// Summarize candles in ascending time order; `None` for an empty slice
    pub fn from_candles(candles: &[Candle]) -> Option<Self> {
        let first = candles.first()?;
        let last = candles.last()?;
        let count = candles.len();

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

        let change_pct = if first.close == 0.0 {
            0.0
        } else {
            (last.close - first.close) / first.close * 100.0
        };

        let avg_volume = candles.iter().map(|c| c.volume).sum::<f64>() / count as f64;
        let max_high = candles.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
        let min_low = candles.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);

        Some(Self {
            count,
            last_price: last.close,
            change_pct,
            avg_volume,
            max_high,
            min_low,
            volatility: sample_std_dev(&closes),
            sma_short: latest_sma(&closes, MA_SHORT_PERIOD),
            sma_long: latest_sma(&closes, MA_LONG_PERIOD),
        })
    }
}

/// Simple moving average, 0.0 until `period` values are available
pub fn calculate_sma(closes: &[f64], period: usize) -> Vec<f64> {
    let mut ma_values = vec![0.0; closes.len()];

    if period == 0 || closes.len() < period {
        return ma_values;
    }

    let mut sum: f64 = closes[..period].iter().sum();
    ma_values[period - 1] = sum / period as f64;
    for i in period..closes.len() {
        sum += closes[i] - closes[i - period];
        ma_values[i] = sum / period as f64;
    }

    ma_values
}

fn latest_sma(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }
    calculate_sma(closes, period).last().copied()
}

fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: i64, close: f64) -> Candle {
        Candle::new("AAPL", ts, close, close + 1.0, close - 1.0, close, 100.0 * ts as f64)
    }

    #[test]
    fn test_calculate_sma() {
        let closes = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let sma = calculate_sma(&closes, 3);
        assert_eq!(sma, vec![0.0, 0.0, 2.0, 3.0, 4.0]);

        assert_eq!(calculate_sma(&closes, 6), vec![0.0; 5]);
        assert_eq!(calculate_sma(&closes, 0), vec![0.0; 5]);
    }

    #[test]
    fn test_summary_basic() {
        let candles: Vec<Candle> = (1..=4).map(|i| candle(i, 10.0 * i as f64)).collect();
        let summary = CandleSummary::from_candles(&candles).unwrap();

        assert_eq!(summary.count, 4);
        assert_eq!(summary.last_price, 40.0);
        assert!((summary.change_pct - 300.0).abs() < 1e-9);
        assert!((summary.avg_volume - 250.0).abs() < 1e-9);
        assert_eq!(summary.max_high, 41.0);
        assert_eq!(summary.min_low, 9.0);
        // closes 10,20,30,40: sample variance 166.67
        assert!((summary.volatility - 12.909944487358056).abs() < 1e-9);
        assert_eq!(summary.sma_short, None);
        assert_eq!(summary.sma_long, None);
    }

    #[test]
    fn test_summary_moving_averages() {
        let candles: Vec<Candle> = (0..60).map(|i| candle(i, i as f64)).collect();
        let summary = CandleSummary::from_candles(&candles).unwrap();

        // last 20 closes are 40..=59, last 50 are 10..=59
        assert_eq!(summary.sma_short, Some(49.5));
        assert_eq!(summary.sma_long, Some(34.5));
        // first close is 0
        assert_eq!(summary.change_pct, 0.0);
    }

    #[test]
    fn test_summary_edge_cases() {
        assert!(CandleSummary::from_candles(&[]).is_none());

        let summary = CandleSummary::from_candles(&[candle(1, 5.0)]).unwrap();
        assert_eq!(summary.volatility, 0.0);
        assert_eq!(summary.change_pct, 0.0);
        assert_eq!(summary.last_price, 5.0);
    }
}
