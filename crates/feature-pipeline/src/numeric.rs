//! Numerical transform: imputation then conditional log normalization

use tracing::debug;

use columnar::{Column, ColumnRole};
use tab_stats::{median, most_frequent, normal_test};

use crate::config::Config;
use crate::diagnostics::{DiagnosticEvent, Diagnostics};

/// Impute missing cells: median for continuous columns, most frequent
/// value (ties to the smallest) for discrete ones. A column with no
/// observed values imputes zero and records a diagnostic.
pub(crate) fn impute(
    name: &str,
    cells: &[Option<f64>],
    role: ColumnRole,
    diag: &mut Diagnostics,
) -> Vec<f64> {
    let observed: Vec<f64> = cells.iter().flatten().copied().collect();
    let fill = if observed.is_empty() {
        diag.record(DiagnosticEvent::EmptyColumnImputed {
            column: name.to_string(),
        });
        0.0
    } else {
        match role {
            ColumnRole::Continuous => median(&observed),
            _ => most_frequent(&observed),
        }
    };
    cells.iter().map(|c| c.unwrap_or(fill)).collect()
}

/// Transform a continuous or discrete column: impute, then replace by
/// the natural log when the transform is enabled, every value is
/// strictly positive, and normality is rejected at the configured level
pub(crate) fn transform_numeric(
    column: &Column,
    role: ColumnRole,
    config: &Config,
    diag: &mut Diagnostics,
) -> Vec<f64> {
    let cells = column.numeric_cells().unwrap_or_default();
    let mut values = impute(&column.name, &cells, role, diag);

    if config.logtransform && values.iter().all(|&v| v > 0.0) {
        let (_, pvalue) = normal_test(&values);
        if pvalue <= config.pvalue_level {
            debug!(
                column = %column.name,
                pvalue,
                "column is not normally distributed, applying log transform"
            );
            for v in &mut values {
                *v = v.ln();
            }
        }
    }
    values
}
