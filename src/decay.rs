use chrono::{DateTime, Utc};

const DAYS_PER_MONTH: f64 = 30.44;
const MIN_WEIGHT: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone)]
pub enum TrendAnalysis {
    InsufficientData,
    Available {
        direction: TrendDirection,
        older_average: f64,
        newer_average: f64,
        relative_change: f64,
        confidence: f64,
    },
}

/// Exponential time-decay weighting and the weighted aggregates built on it.
pub struct DecayCalculator {
    lambda: f64,
}

impl DecayCalculator {
    pub fn new(lambda: f64) -> Self {
        Self { lambda }
    }

    /// `w = max(exp(-lambda * months_old), 0.01)`.
    pub fn weight(&self, date: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let days_old = (now - date).num_milliseconds() as f64 / 86_400_000.0;
        let months_old = (days_old / DAYS_PER_MONTH).max(0.0);
        (-self.lambda * months_old).exp().max(MIN_WEIGHT)
    }

    pub fn batch_weights(&self, dates: &[DateTime<Utc>], now: DateTime<Utc>) -> Vec<f64> {
        dates.iter().map(|d| self.weight(*d, now)).collect()
    }

    /// Weighted average of `values` paired with `dates`, each value scaled by
    /// its decay weight at `now`.
    pub fn weighted_average(&self, values: &[f64], dates: &[DateTime<Utc>], now: DateTime<Utc>) -> Option<f64> {
        if values.is_empty() || values.len() != dates.len() {
            return None;
        }
        let weights = self.batch_weights(dates, now);
        let total_weight: f64 = weights.iter().sum();
        if total_weight <= 0.0 {
            return None;
        }
        let weighted_sum: f64 = values.iter().zip(weights.iter()).map(|(v, w)| v * w).sum();
        Some(weighted_sum / total_weight)
    }

    /// Split `dates`/`values` into older/newer halves by the **temporal
    /// midpoint** of the date range (not a count-based median), compute
    /// weighted averages for each half, and report direction + confidence.
    pub fn trend_analysis(
        &self,
        values: &[f64],
        dates: &[DateTime<Utc>],
        now: DateTime<Utc>,
    ) -> TrendAnalysis {
        if values.len() < 3 || values.len() != dates.len() {
            return TrendAnalysis::InsufficientData;
        }

        let min_date = *dates.iter().min().unwrap();
        let max_date = *dates.iter().max().unwrap();
        let midpoint = min_date + (max_date - min_date) / 2;

        let mut older_vals = Vec::new();
        let mut older_dates = Vec::new();
        let mut newer_vals = Vec::new();
        let mut newer_dates = Vec::new();

        for (v, d) in values.iter().zip(dates.iter()) {
            if *d < midpoint {
                older_vals.push(*v);
                older_dates.push(*d);
            } else {
                newer_vals.push(*v);
                newer_dates.push(*d);
            }
        }

        if older_vals.is_empty() || newer_vals.is_empty() {
            return TrendAnalysis::InsufficientData;
        }

        let older_avg = match self.weighted_average(&older_vals, &older_dates, now) {
            Some(v) => v,
            None => return TrendAnalysis::InsufficientData,
        };
        let newer_avg = match self.weighted_average(&newer_vals, &newer_dates, now) {
            Some(v) => v,
            None => return TrendAnalysis::InsufficientData,
        };

        let relative_change = if older_avg.abs() > 1e-9 {
            (newer_avg - older_avg) / older_avg
        } else {
            0.0
        };

        let direction = if relative_change > 0.10 {
            TrendDirection::Increasing
        } else if relative_change < -0.10 {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };

        // Confidence: average of three factors.
        let size_confidence = (older_vals.len().min(newer_vals.len()).min(5) as f64) / 5.0;
        let change_confidence = (relative_change.abs() * 2.0).min(1.0);
        let variance_confidence = {
            let combined: Vec<f64> = older_vals.iter().chain(newer_vals.iter()).copied().collect();
            let mean = combined.iter().sum::<f64>() / combined.len() as f64;
            let variance = combined.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / combined.len() as f64;
            1.0 / (1.0 + variance)
        };
        let confidence = (size_confidence + change_confidence + variance_confidence) / 3.0;

        TrendAnalysis::Available {
            direction,
            older_average: older_avg,
            newer_average: newer_avg,
            relative_change,
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn weight_at_twelve_months() {
        let calc = DecayCalculator::new(0.08);
        let now = Utc::now();
        let date = now - Duration::days((12.0 * DAYS_PER_MONTH) as i64);
        let w = calc.weight(date, now);
        assert!((w - 0.3829).abs() < 0.01, "weight was {w}");
    }

    #[test]
    fn weight_clamped_at_sixty_months() {
        let calc = DecayCalculator::new(0.08);
        let now = Utc::now();
        let date = now - Duration::days((60.0 * DAYS_PER_MONTH) as i64);
        let w = calc.weight(date, now);
        assert_eq!(w, MIN_WEIGHT);
    }

    #[test]
    fn insufficient_data_under_three_points() {
        let calc = DecayCalculator::new(0.08);
        let now = Utc::now();
        let dates = vec![now, now - Duration::days(10)];
        let values = vec![1.0, 2.0];
        assert!(matches!(
            calc.trend_analysis(&values, &dates, now),
            TrendAnalysis::InsufficientData
        ));
    }

    #[test]
    fn trending_up_detected() {
        let calc = DecayCalculator::new(0.08);
        let now = Utc::now();
        let dates = vec![
            now - Duration::days(300),
            now - Duration::days(290),
            now - Duration::days(10),
            now - Duration::days(5),
            now - Duration::days(1),
        ];
        let values = vec![0.0, 0.0, 1.0, 1.0, 1.0];
        match calc.trend_analysis(&values, &dates, now) {
            TrendAnalysis::Available { direction, .. } => {
                assert_eq!(direction, TrendDirection::Increasing);
            }
            other => panic!("expected Available, got {other:?}"),
        }
    }
}
