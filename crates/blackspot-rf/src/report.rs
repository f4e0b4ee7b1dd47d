//! Human-readable classification report with named classes.

use std::fmt;

use crate::confusion::{ClassMetrics, ConfusionMatrix};
use crate::error::RfError;

/// A per-class precision/recall/F1 report using real class names.
///
/// The class list equals the names passed in, in the same order — callers
/// pass the target encoder's vocabulary so the report reads in terms of
/// severity class names rather than integer codes.
#[derive(Debug, Clone)]
pub struct ClassificationReport {
    class_names: Vec<String>,
    metrics: Vec<ClassMetrics>,
    accuracy: f64,
    n_samples: usize,
}

impl ClassificationReport {
    /// Build a report from a confusion matrix and ordered class names.
    ///
    /// `class_names[c]` names class code `c`.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::ClassNameCountMismatch`] when the name list does
    /// not match the matrix's class count.
    pub fn from_confusion(
        confusion: &ConfusionMatrix,
        class_names: &[String],
    ) -> Result<Self, RfError> {
        if class_names.len() != confusion.n_classes() {
            return Err(RfError::ClassNameCountMismatch {
                expected: confusion.n_classes(),
                got: class_names.len(),
            });
        }
        let metrics = confusion.class_metrics();
        let n_samples = metrics.iter().map(|m| m.support).sum();
        Ok(Self {
            class_names: class_names.to_vec(),
            metrics,
            accuracy: confusion.accuracy(),
            n_samples,
        })
    }

    /// Return the class names, in class-code order.
    #[must_use]
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Return the per-class metrics, in class-code order.
    #[must_use]
    pub fn metrics(&self) -> &[ClassMetrics] {
        &self.metrics
    }

    /// Return the overall accuracy.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    /// Return the total number of evaluated samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Unweighted mean of per-class (precision, recall, f1).
    #[must_use]
    pub fn macro_avg(&self) -> (f64, f64, f64) {
        let n = self.metrics.len() as f64;
        if n == 0.0 {
            return (0.0, 0.0, 0.0);
        }
        let p = self.metrics.iter().map(|m| m.precision).sum::<f64>() / n;
        let r = self.metrics.iter().map(|m| m.recall).sum::<f64>() / n;
        let f = self.metrics.iter().map(|m| m.f1).sum::<f64>() / n;
        (p, r, f)
    }

    /// Support-weighted mean of per-class (precision, recall, f1).
    #[must_use]
    pub fn weighted_avg(&self) -> (f64, f64, f64) {
        let total = self.n_samples as f64;
        if total == 0.0 {
            return (0.0, 0.0, 0.0);
        }
        let mut p = 0.0;
        let mut r = 0.0;
        let mut f = 0.0;
        for m in &self.metrics {
            let w = m.support as f64 / total;
            p += m.precision * w;
            r += m.recall * w;
            f += m.f1 * w;
        }
        (p, r, f)
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_width = self
            .class_names
            .iter()
            .map(String::len)
            .max()
            .unwrap_or(5)
            .max("weighted avg".len());

        writeln!(
            f,
            "{:>name_width$}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;

        for (name, m) in self.class_names.iter().zip(&self.metrics) {
            writeln!(
                f,
                "{name:>name_width$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.precision, m.recall, m.f1, m.support
            )?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "{:>name_width$}  {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.n_samples
        )?;

        let (mp, mr, mf) = self.macro_avg();
        writeln!(
            f,
            "{:>name_width$}  {mp:>9.2} {mr:>9.2} {mf:>9.2} {:>9}",
            "macro avg", self.n_samples
        )?;

        let (wp, wr, wf) = self.weighted_avg();
        writeln!(
            f,
            "{:>name_width$}  {wp:>9.2} {wr:>9.2} {wf:>9.2} {:>9}",
            "weighted avg", self.n_samples
        )?;

        Ok(())
    }
}
