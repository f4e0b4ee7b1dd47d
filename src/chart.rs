//! Terminal charts rendered as plain strings.
//!
//! Exploration and training both print to stdout, so every chart here
//! renders into a `String` with Unicode bars and box-drawing borders
//! instead of driving a TUI.

use blackspot_data::ValueCount;
use blackspot_rf::{ConfusionMatrix, RankedFeature};

/// Horizontal bar chart over category frequency counts.
#[derive(Debug, Clone)]
pub struct FrequencyChart {
    title: String,
    entries: Vec<(String, usize)>,
    bar_width: usize,
}

impl FrequencyChart {
    /// Build a chart from pre-sorted value counts.
    pub fn new(title: &str, counts: &[ValueCount], bar_width: usize) -> Self {
        Self {
            title: title.to_string(),
            entries: counts
                .iter()
                .map(|vc| (vc.value.clone(), vc.count))
                .collect(),
            bar_width,
        }
    }

    /// Render to string.
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return format!("{}: no data\n", self.title);
        }

        let max_name_len = self
            .entries
            .iter()
            .map(|(name, _)| name.chars().count())
            .max()
            .unwrap_or(0);
        let max_count = self
            .entries
            .iter()
            .map(|&(_, count)| count)
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        out.push_str(&format!("── {} ──\n", self.title));
        for (name, count) in &self.entries {
            let bar_len = if max_count > 0 {
                (*count as f64 / max_count as f64 * self.bar_width as f64).round() as usize
            } else {
                0
            };
            out.push_str(&format!(
                "  {:name_width$}  {:bar_width$}  {}\n",
                name,
                "█".repeat(bar_len),
                count,
                name_width = max_name_len,
                bar_width = self.bar_width
            ));
        }
        out
    }
}

/// Horizontal bar chart over ranked feature importances.
#[derive(Debug, Clone)]
pub struct ImportanceChart {
    features: Vec<RankedFeature>,
    bar_width: usize,
}

impl ImportanceChart {
    /// Build a chart from importances already ranked by the forest; only
    /// the first `top_k` are shown.
    pub fn new(importances: &[RankedFeature], top_k: usize, bar_width: usize) -> Self {
        Self {
            features: importances.iter().take(top_k).cloned().collect(),
            bar_width,
        }
    }

    /// Render to string.
    pub fn render(&self) -> String {
        if self.features.is_empty() {
            return String::from("no feature importance data\n");
        }

        let max_name_len = self
            .features
            .iter()
            .map(|f| f.name.chars().count())
            .max()
            .unwrap_or(0);
        let max_importance = self
            .features
            .iter()
            .map(|f| f.importance)
            .fold(0.0f64, f64::max);

        let mut out = String::new();
        out.push_str("── Feature importances (mean decrease in impurity) ──\n");
        for feature in &self.features {
            let bar_len = if max_importance > 0.0 {
                (feature.importance / max_importance * self.bar_width as f64).round() as usize
            } else {
                0
            };
            out.push_str(&format!(
                "  {:>2}. {:name_width$}  {:bar_width$}  {:.4}\n",
                feature.rank,
                feature.name,
                "█".repeat(bar_len),
                feature.importance,
                name_width = max_name_len,
                bar_width = self.bar_width
            ));
        }
        out
    }
}

/// Confusion matrix rendered as a labelled count grid.
///
/// Rows are true classes, columns are predicted classes. Cell shading
/// scales with the count so the diagonal stands out at a glance.
#[derive(Debug, Clone)]
pub struct ConfusionGrid {
    class_names: Vec<String>,
    rows: Vec<Vec<usize>>,
}

impl ConfusionGrid {
    /// Build a grid from a confusion matrix and its class names, in code
    /// order.
    pub fn new(matrix: &ConfusionMatrix, class_names: &[String]) -> Self {
        Self {
            class_names: class_names.to_vec(),
            rows: matrix.as_rows().to_vec(),
        }
    }

    fn shade(count: usize, max_count: usize) -> char {
        if max_count == 0 || count == 0 {
            return ' ';
        }
        let levels = [' ', '░', '▒', '▓', '█'];
        let idx = (count as f64 / max_count as f64 * (levels.len() - 1) as f64).ceil() as usize;
        levels[idx.min(levels.len() - 1)]
    }

    /// Render to string.
    pub fn render(&self) -> String {
        let label_width = self
            .class_names
            .iter()
            .map(|n| n.chars().count())
            .max()
            .unwrap_or(0)
            .max("true \\ predicted".len());
        let max_count = self
            .rows
            .iter()
            .flatten()
            .copied()
            .max()
            .unwrap_or(0);
        let cell_width = max_count.to_string().len().max(3);

        let mut out = String::new();
        out.push_str("── Confusion matrix (rows = true, columns = predicted) ──\n");

        out.push_str(&format!("  {:label_width$}", "true \\ predicted"));
        for (i, _) in self.class_names.iter().enumerate() {
            out.push_str(&format!("  [{i}] {:cell_width$}", ""));
        }
        out.push('\n');

        for (i, row) in self.rows.iter().enumerate() {
            out.push_str(&format!("  {:label_width$}", self.class_names[i]));
            for &count in row {
                out.push_str(&format!(
                    "  {} {:>cell_width$}",
                    Self::shade(count, max_count),
                    count
                ));
            }
            out.push('\n');
        }

        out.push_str("  legend:");
        for (i, name) in self.class_names.iter().enumerate() {
            out.push_str(&format!(" [{i}] {name}"));
        }
        out.push('\n');
        out
    }
}
