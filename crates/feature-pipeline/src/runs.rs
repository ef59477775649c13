//! Window-based run statistics over binary-like sequences
//!
//! Each statistic contributes one column computed over a sliding window;
//! rows before the window fills are zero.

use ndarray::Array2;

/// One run-based statistic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunsStat {
    /// Number of maximal same-valued runs in the window
    Runs,
    /// Length of the final run in the window
    Streak,
    /// Count of nonzero minus count of zero values
    Rtotal,
    /// Wald-Wolfowitz runs-test z statistic
    Zscore,
}

impl RunsStat {
    /// Declared expansion order for the `all` shorthand
    pub const ALL: [RunsStat; 4] = [
        RunsStat::Runs,
        RunsStat::Streak,
        RunsStat::Rtotal,
        RunsStat::Zscore,
    ];

    /// Resolve a statistic name; unknown names are the caller's
    /// non-fatal skip
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "runs" => Some(RunsStat::Runs),
            "streak" => Some(RunsStat::Streak),
            "rtotal" => Some(RunsStat::Rtotal),
            "zscore" => Some(RunsStat::Zscore),
            _ => None,
        }
    }

    fn compute(self, window: &[bool]) -> f64 {
        match self {
            RunsStat::Runs => run_count(window) as f64,
            RunsStat::Streak => final_streak(window) as f64,
            RunsStat::Rtotal => {
                let n1 = window.iter().filter(|&&b| b).count() as f64;
                n1 - (window.len() as f64 - n1)
            }
            RunsStat::Zscore => runs_zscore(window),
        }
    }
}

fn run_count(window: &[bool]) -> usize {
    if window.is_empty() {
        return 0;
    }
    1 + window.windows(2).filter(|pair| pair[0] != pair[1]).count()
}

fn final_streak(window: &[bool]) -> usize {
    let Some(&last) = window.last() else {
        return 0;
    };
    window.iter().rev().take_while(|&&b| b == last).count()
}

/// Wald-Wolfowitz runs test: z-score of the observed run count against
/// its expectation under random ordering; zero when the variance term is
/// degenerate
fn runs_zscore(window: &[bool]) -> f64 {
    let n1 = window.iter().filter(|&&b| b).count() as f64;
    let n2 = window.len() as f64 - n1;
    let fac1 = 2.0 * n1 * n2;
    let fac2 = n1 + n2;
    if fac2 == 0.0 {
        return 0.0;
    }
    let rbar = fac1 / fac2 + 1.0;
    let sr2_num = fac1 * (fac1 - n1 - n2);
    let sr2_den = fac2 * fac2 * (fac2 - 1.0);
    if sr2_den == 0.0 {
        return 0.0;
    }
    let sr = (sr2_num / sr2_den).sqrt();
    if sr == 0.0 {
        return 0.0;
    }
    (run_count(window) as f64 - rbar) / sr
}

/// Compute the requested statistics over every window of the sequence;
/// one output column per statistic, zeros until the window fills.
/// Values binarize as nonzero versus zero.
pub(crate) fn rolling_runs(values: &[f64], window: usize, stats: &[RunsStat]) -> Array2<f64> {
    let bits: Vec<bool> = values.iter().map(|&v| v != 0.0).collect();
    let n = bits.len();
    let mut out = Array2::zeros((n, stats.len()));
    if window == 0 {
        return out;
    }
    for row in 0..n {
        if row + 1 < window {
            continue;
        }
        let slice = &bits[row + 1 - window..=row];
        for (j, stat) in stats.iter().enumerate() {
            out[[row, j]] = stat.compute(slice);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alternating_sequence_full_window() {
        let values = [1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let out = rolling_runs(&values, 8, &RunsStat::ALL);
        // only the final row has a full window
        for row in 0..7 {
            assert_eq!(out[[row, 0]], 0.0);
        }
        // every element alone is a run
        assert_eq!(out[[7, 0]], 8.0);
        assert_eq!(out[[7, 1]], 1.0);
        assert_eq!(out[[7, 2]], 0.0);
        // more runs than randomness expects
        assert!(out[[7, 3]] > 2.0);
    }

    #[test]
    fn test_constant_sequence_degenerate_variance() {
        let values = [1.0, 1.0, 1.0, 1.0];
        let out = rolling_runs(&values, 4, &RunsStat::ALL);
        assert_eq!(out[[3, 0]], 1.0); // one run
        assert_eq!(out[[3, 3]], 0.0); // degenerate z
    }

    #[test]
    fn test_lopsided_sequence_negative_zscore() {
        // 995 ones then 5 zeros: two runs, far fewer than expected
        let mut values = vec![1.0; 995];
        values.extend(vec![0.0; 5]);
        let out = rolling_runs(&values, 1000, &[RunsStat::Zscore]);
        // single filled output row
        for row in 0..999 {
            assert_eq!(out[[row, 0]], 0.0);
        }
        assert!(out[[999, 0]] < -20.0);
    }

    #[test]
    fn test_rolling_window_slides() {
        let values = [1.0, 1.0, 0.0, 0.0, 1.0];
        let out = rolling_runs(&values, 2, &[RunsStat::Runs, RunsStat::Streak]);
        assert_eq!(out[[0, 0]], 0.0); // window not filled
        assert_eq!(out[[1, 0]], 1.0); // [1,1]
        assert_eq!(out[[2, 0]], 2.0); // [1,0]
        assert_eq!(out[[3, 0]], 1.0); // [0,0]
        assert_eq!(out[[4, 1]], 1.0); // final streak of [0,1]
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(RunsStat::parse("zscore"), Some(RunsStat::Zscore));
        assert_eq!(RunsStat::parse("sorties"), None);
    }
}
