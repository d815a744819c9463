use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatisticKind {
    Mean,
    P99,
    Max,
}

impl StatisticKind {
    pub const ALL: [StatisticKind; 3] =
        [StatisticKind::Mean, StatisticKind::P99, StatisticKind::Max];

    pub fn title(&self) -> &'static str {
        match self {
            StatisticKind::Mean => "Average Latency",
            StatisticKind::P99 => "99th Percentile Latency",
            StatisticKind::Max => "Maximum Latency",
        }
    }
}

impl fmt::Display for StatisticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatisticKind::Mean => "mean",
            StatisticKind::P99 => "p99",
            StatisticKind::Max => "max",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    pub p99: f64,
    pub max: f64,
}

impl Summary {
    /// [`None`] for an empty sample set, the phase then has no entry at all
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_unstable_by(f64::total_cmp);

        let max = sorted[sorted.len() - 1];
        // rounding in the sum can push the mean of equal samples past max
        let mean = (sorted.iter().sum::<f64>() / sorted.len() as f64).min(max);
        Some(Self {
            mean,
            p99: percentile(&sorted, 0.99).min(max),
            max,
        })
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self {
            mean: self.mean * factor,
            p99: self.p99 * factor,
            max: self.max * factor,
        }
    }

    pub fn get(&self, kind: StatisticKind) -> f64 {
        match kind {
            StatisticKind::Mean => self.mean,
            StatisticKind::P99 => self.p99,
            StatisticKind::Max => self.max,
        }
    }
}

/// Linear interpolation between the closest ranks of an ascending, non-empty slice
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn three_samples() {
        let summary = Summary::from_samples(&[3000.0, 1000.0, 2000.0]).unwrap();
        assert_relative_eq!(summary.mean, 2000.0, max_relative = 1e-9);
        assert_relative_eq!(summary.p99, 2980.0, max_relative = 1e-9);
        assert_relative_eq!(summary.max, 3000.0, max_relative = 1e-9);

        let summary = summary.scaled(crate::NS_TO_US);
        assert_relative_eq!(summary.mean, 2.0, max_relative = 1e-9);
        assert_relative_eq!(summary.p99, 2.98, max_relative = 1e-9);
        assert_relative_eq!(summary.max, 3.0, max_relative = 1e-9);
    }

    #[test]
    fn single_sample() {
        let summary = Summary::from_samples(&[350.0]).unwrap();
        assert_eq!(summary.mean, 350.0);
        assert_eq!(summary.p99, 350.0);
        assert_eq!(summary.max, 350.0);
    }

    #[test]
    fn empty_has_no_summary() {
        assert!(Summary::from_samples(&[]).is_none());
    }

    #[test]
    fn max_bounds_mean_and_p99() {
        let sets: [&[f64]; 7] = [
            &[0.0],
            &[0.1, 0.1, 0.1],
            &[0.7, 0.7, 0.7, 0.7, 0.7, 0.7, 0.7],
            &[5.0, 5.0, 5.0],
            &[1.0, 1_000_000.0],
            &[12.5, 3.0, 99.0, 7.25, 42.0, 0.5, 18.0],
            &[4.0, 8.0, 15.0, 16.0, 23.0, 42.0, 108.0, 1.0, 1.0, 2.0, 3.0],
        ];
        for samples in sets {
            let summary = Summary::from_samples(samples).unwrap();
            assert!(summary.max >= summary.p99, "{summary:?}");
            assert!(summary.max >= summary.mean, "{summary:?}");
        }

        let many = (1..=1000)
            .map(|x| ((x * 7919) % 1013) as f64)
            .collect::<Vec<_>>();
        let summary = Summary::from_samples(&many).unwrap();
        assert!(summary.max >= summary.p99);
        assert!(summary.max >= summary.mean);
    }

    #[test]
    fn mean_of_equal_fractions_is_exact() {
        let summary = Summary::from_samples(&[0.1, 0.1, 0.1]).unwrap();
        assert_eq!(summary.mean, 0.1);
        assert_eq!(summary.p99, 0.1);
        assert_eq!(summary.max, 0.1);
    }

    #[test]
    fn percentile_endpoints() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 0.5), 3.0);
        assert_eq!(percentile(&sorted, 1.0), 5.0);
        assert_relative_eq!(percentile(&sorted, 0.99), 4.96, max_relative = 1e-9);
    }

    #[test]
    fn select_by_kind() {
        let summary = Summary {
            mean: 1.0,
            p99: 2.0,
            max: 3.0,
        };
        let values = StatisticKind::ALL.map(|x| summary.get(x));
        assert_eq!(values, [1.0, 2.0, 3.0]);
    }
}
