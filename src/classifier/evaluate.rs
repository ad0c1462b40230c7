use std::fmt;

use serde::{Deserialize, Serialize};

/// Precision, recall and F-measure of one class
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassScores {
    /// samples of the class that were predicted as the class
    pub true_positives: u64,
    /// samples predicted as the class
    pub predicted: u64,
    /// samples whose true label is the class
    pub actual: u64,
    pub precision: f64,
    pub recall: f64,
    pub f_measure: f64,
}

impl ClassScores {
    fn compute(true_positives: u64, predicted: u64, actual: u64) -> Self {
        let ratio = |num: u64, den: u64| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let precision = ratio(true_positives, predicted);
        let recall = ratio(true_positives, actual);
        let f_measure = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            true_positives,
            predicted,
            actual,
            precision,
            recall,
            f_measure,
        }
    }
}

/// Outcome of classifying a labeled sample set
///
/// Macro averages are taken over classes with at least one actual or predicted
/// sample. The micro average over single-label samples is the accuracy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Evaluation {
    pub per_class: Vec<ClassScores>,
    /// `confusion[actual][predicted]`
    pub confusion: Vec<Vec<u64>>,
    pub samples: u64,
    pub correct: u64,
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f_measure: f64,
    pub accuracy: f64,
}

impl Evaluation {
    /// Score `(actual, predicted)` label pairs over `num_classes` classes
    ///
    /// Pairs naming a label outside `0..num_classes` are skipped.
    pub fn from_pairs<I>(num_classes: usize, pairs: I) -> Self
    where
        I: IntoIterator<Item = (u32, u32)>,
    {
        let mut confusion = vec![vec![0u64; num_classes]; num_classes];
        for (actual, predicted) in pairs {
            let (a, p) = (actual as usize, predicted as usize);
            if a < num_classes && p < num_classes {
                confusion[a][p] += 1;
            }
        }

        let per_class: Vec<ClassScores> = (0..num_classes)
            .map(|c| {
                let actual = confusion[c].iter().sum();
                let predicted = confusion.iter().map(|row| row[c]).sum();
                ClassScores::compute(confusion[c][c], predicted, actual)
            })
            .collect();

        let samples: u64 = confusion.iter().flatten().sum();
        let correct: u64 = (0..num_classes).map(|c| confusion[c][c]).sum();
        let active: Vec<&ClassScores> = per_class
            .iter()
            .filter(|s| s.actual > 0 || s.predicted > 0)
            .collect();
        let mean = |f: fn(&ClassScores) -> f64| {
            if active.is_empty() {
                0.0
            } else {
                active.iter().map(|s| f(s)).sum::<f64>() / active.len() as f64
            }
        };

        let macro_precision = mean(|s| s.precision);
        let macro_recall = mean(|s| s.recall);
        let macro_f_measure = mean(|s| s.f_measure);

        Self {
            macro_precision,
            macro_recall,
            macro_f_measure,
            accuracy: if samples == 0 {
                0.0
            } else {
                correct as f64 / samples as f64
            },
            per_class,
            confusion,
            samples,
            correct,
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "class\tprecision\trecall\tf-measure\tactual\tpredicted")?;
        for (class, s) in self.per_class.iter().enumerate() {
            writeln!(
                f,
                "{}\t{:.4}\t{:.4}\t{:.4}\t{}\t{}",
                class, s.precision, s.recall, s.f_measure, s.actual, s.predicted
            )?;
        }
        writeln!(
            f,
            "macro\t{:.4}\t{:.4}\t{:.4}",
            self.macro_precision, self.macro_recall, self.macro_f_measure
        )?;
        write!(
            f,
            "micro\t{:.4} ({} of {} correct)",
            self.accuracy, self.correct, self.samples
        )
    }
}
