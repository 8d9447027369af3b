use crate::executor::TrialResult;
use crate::sweep::SweepPlan;
use log::{debug, warn};
use predator_prey_common::{Outcome, SweepMode};
use serde::{Deserialize, Serialize};

/// Outcome counts of one sweep point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeTally {
    counts: [usize; 3],
    /// Position in the fed sequence where each outcome first appeared.
    first_seen: [Option<usize>; 3],
    seen: usize,
    failed: usize,
}

impl OutcomeTally {
    pub fn record(&mut self, outcome: Outcome) {
        let i = outcome.code() as usize;
        if self.first_seen[i].is_none() {
            self.first_seen[i] = Some(self.seen);
        }
        self.counts[i] += 1;
        self.seen += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn counts(&self) -> [usize; 3] {
        self.counts
    }

    pub fn total(&self) -> usize {
        self.seen
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Most frequent outcome. On an exact tie, the one encountered first wins.
    pub fn majority(&self) -> Option<Outcome> {
        Outcome::ALL
            .into_iter()
            .filter(|o| self.counts[o.code() as usize] > 0)
            .fold(None, |best: Option<Outcome>, candidate| match best {
                None => Some(candidate),
                Some(b) => {
                    let (bc, cc) = (self.counts[b.code() as usize], self.counts[candidate.code() as usize]);
                    let earlier = self.first_seen[candidate.code() as usize] < self.first_seen[b.code() as usize];
                    if cc > bc || (cc == bc && earlier) {
                        Some(candidate)
                    } else {
                        Some(b)
                    }
                }
            })
    }
}

/// Groups trial outcomes by sweep point.
#[derive(Debug, Clone)]
pub struct OutcomeAggregator {
    tallies: Vec<OutcomeTally>,
}

impl OutcomeAggregator {
    pub fn new(num_points: usize) -> Self {
        Self {
            tallies: vec![OutcomeTally::default(); num_points],
        }
    }

    pub fn record(&mut self, point: usize, outcome: Outcome) {
        self.tallies[point].record(outcome);
    }

    pub fn record_result(&mut self, result: &TrialResult) {
        match &result.report {
            Ok(report) => self.record(result.point, report.outcome),
            Err(e) => {
                debug!("Trial {} failed: {}", result.index, e);
                self.tallies[result.point].record_failure();
            }
        }
    }

    pub fn tally(&self, point: usize) -> &OutcomeTally {
        &self.tallies[point]
    }

    /// Writes each point's majority outcome at its matrix coordinate.
    /// Skipped points and points without a single successful trial stay `None`.
    pub fn into_matrix(self, plan: &SweepPlan) -> PhaseMatrix {
        let mut matrix = PhaseMatrix::new(plan.mode, plan.x_values.clone(), plan.y_values.clone());
        for (planned, tally) in plan.points.iter().zip(&self.tallies) {
            let (row, col) = (planned.point.row, planned.point.col);
            if tally.failed() > 0 {
                warn!(
                    "{} of {} trials failed at ({:.3}, {:.3})",
                    tally.failed(),
                    tally.failed() + tally.total(),
                    planned.point.x,
                    planned.point.y
                );
            }
            matrix.set(row, col, tally.majority(), tally.counts());
        }
        matrix
    }
}

/// Majority outcome per sweep point, `None` marking points that were not simulated.
/// Rows follow the y axis, columns the x axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseMatrix {
    pub x_label: String,
    pub y_label: String,
    pub x_values: Vec<f64>,
    pub y_values: Vec<f64>,
    cells: Vec<Option<Outcome>>,
    counts: Vec<[usize; 3]>,
}

impl PhaseMatrix {
    pub fn new(mode: SweepMode, x_values: Vec<f64>, y_values: Vec<f64>) -> Self {
        let (x_label, y_label) = match mode {
            SweepMode::RatioDensity => ("Ratio (Prey / Predator)", "Density (Agents per Grid Cell)"),
            SweepMode::Counts => ("Initial Prey Population", "Initial Predator Population"),
        };
        let len = x_values.len() * y_values.len();
        Self {
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            x_values,
            y_values,
            cells: vec![None; len],
            counts: vec![[0; 3]; len],
        }
    }

    pub fn rows(&self) -> usize {
        self.y_values.len()
    }

    pub fn cols(&self) -> usize {
        self.x_values.len()
    }

    fn set(&mut self, row: usize, col: usize, outcome: Option<Outcome>, counts: [usize; 3]) {
        let idx = row * self.cols() + col;
        self.cells[idx] = outcome;
        self.counts[idx] = counts;
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Outcome> {
        self.cells[row * self.cols() + col]
    }

    /// Outcome counts in `Outcome` code order.
    pub fn counts(&self, row: usize, col: usize) -> [usize; 3] {
        self.counts[row * self.cols() + col]
    }

    pub fn row(&self, row: usize) -> &[Option<Outcome>] {
        let cols = self.cols();
        &self.cells[row * cols..(row + 1) * cols]
    }

    /// Number of cells holding each outcome, ignoring unsimulated points.
    pub fn histogram(&self) -> [usize; 3] {
        let mut hist = [0; 3];
        for outcome in self.cells.iter().flatten() {
            hist[outcome.code() as usize] += 1;
        }
        hist
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn majority_picks_most_frequent() {
        let mut tally = OutcomeTally::default();
        for o in [Outcome::Coexistence, Outcome::PreyExtinct, Outcome::PreyExtinct] {
            tally.record(o);
        }
        assert_eq!(tally.majority(), Some(Outcome::PreyExtinct));
        assert_eq!(tally.counts(), [2, 0, 1]);
    }

    #[test]
    fn exact_tie_goes_to_first_encountered() {
        let mut tally = OutcomeTally::default();
        for o in [Outcome::Coexistence, Outcome::PredatorExtinct, Outcome::PredatorExtinct, Outcome::Coexistence] {
            tally.record(o);
        }
        assert_eq!(tally.majority(), Some(Outcome::Coexistence));

        let mut tally = OutcomeTally::default();
        for o in [Outcome::PredatorExtinct, Outcome::Coexistence, Outcome::Coexistence, Outcome::PredatorExtinct] {
            tally.record(o);
        }
        assert_eq!(tally.majority(), Some(Outcome::PredatorExtinct));
    }

    #[test]
    fn empty_tally_has_no_majority() {
        let mut tally = OutcomeTally::default();
        tally.record_failure();
        assert_eq!(tally.majority(), None);
        assert_eq!(tally.failed(), 1);
    }

    #[test]
    fn matrix_indexes_rows_by_y() {
        let mut matrix = PhaseMatrix::new(SweepMode::Counts, vec![10.0, 20.0, 30.0], vec![1.0, 2.0]);
        matrix.set(1, 2, Some(Outcome::Coexistence), [0, 0, 4]);
        assert_eq!(matrix.rows(), 2);
        assert_eq!(matrix.cols(), 3);
        assert_eq!(matrix.get(1, 2), Some(Outcome::Coexistence));
        assert!(matrix.row(0).iter().all(Option::is_none));
        assert_eq!(matrix.histogram(), [0, 0, 1]);
    }

    fn outcome_strategy() -> impl Strategy<Value = Outcome> {
        (0u8..3).prop_map(|c| Outcome::from_code(c).unwrap_or(Outcome::Coexistence))
    }

    proptest! {
        #[test]
        fn majority_is_order_independent_without_ties(
            outcomes in proptest::collection::vec(outcome_strategy(), 1..60),
            seed in any::<u64>(),
        ) {
            let mut forward = OutcomeTally::default();
            outcomes.iter().for_each(|o| forward.record(*o));
            let counts = forward.counts();
            let max = counts.iter().copied().max().unwrap_or(0);
            prop_assume!(counts.iter().filter(|&&c| c == max).count() == 1);

            let mut shuffled = outcomes.clone();
            use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
            shuffled.shuffle(&mut StdRng::seed_from_u64(seed));
            let mut permuted = OutcomeTally::default();
            shuffled.iter().for_each(|o| permuted.record(*o));

            prop_assert_eq!(forward.majority(), permuted.majority());
            prop_assert_eq!(forward.counts(), permuted.counts());
        }
    }
}
