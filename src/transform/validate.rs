//! Checks on curve sets and regionalisation tables.
//!
//! Findings are reported according to an `ErrorHandling` policy: `ignore`
//! logs at debug, `warn` logs a warning, `raise` returns an error. The
//! return value tells the caller whether the input passed.

use tracing::{debug, warn};

use crate::domain::{CurveSet, ErrorHandling, FlowSign, FractionTable, INPUT_SUFFIX, OUTPUT_SUFFIX};
use crate::error::TransformError;

/// Default rounding precision (decimals) for the hourly balance check.
pub const BALANCE_PRECISION: i32 = 1;
/// Default rounding precision (decimals) for fraction sums.
pub const FRACTION_PRECISION: i32 = 3;

/// Check that every row of `curves` sums to zero.
///
/// Raw engine curves (columns ending in `.input (MW)` / `.output (MW)`) get
/// the demand-negative convention applied first.
pub fn check_hourly_balance(
    curves: &CurveSet,
    precision: i32,
    errors: ErrorHandling,
) -> Result<bool, TransformError> {
    let raw = curves
        .columns()
        .iter()
        .any(|c| c.ends_with(INPUT_SUFFIX) || c.ends_with(OUTPUT_SUFFIX));

    let mut sums = vec![0.0; curves.n_rows()];
    for (name, series) in curves.iter() {
        let factor = if raw { FlowSign::DemandNegative.factor(name) } else { 1.0 };
        for (acc, v) in sums.iter_mut().zip(series) {
            *acc += factor * v;
        }
    }

    let rows = sums.iter().filter(|s| round_to(**s, precision) != 0.0).count();
    if rows == 0 {
        return Ok(true);
    }

    match errors {
        ErrorHandling::Ignore => debug!(rows, "deficits in hourly carrier curves"),
        ErrorHandling::Warn => warn!(rows, "deficits in hourly carrier curves"),
        ErrorHandling::Raise => return Err(TransformError::Unbalanced { rows }),
    }
    Ok(false)
}

/// Validate a fraction table against the curves it will be applied to.
///
/// Curve columns missing from the table are always an error. Unused table
/// columns and column sums that do not round to 1 are reported per `errors`.
/// Returns `true` when every fraction column sums to 1.
pub fn validate_fractions(
    curves: &CurveSet,
    fractions: &FractionTable,
    precision: i32,
    errors: ErrorHandling,
) -> Result<bool, TransformError> {
    let missing: Vec<String> = curves
        .columns()
        .iter()
        .filter(|c| fractions.column_position(c).is_none())
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(TransformError::MissingKeys(missing));
    }

    let unused: Vec<String> = fractions
        .columns()
        .iter()
        .filter(|c| curves.position(c).is_none())
        .cloned()
        .collect();
    if !unused.is_empty() {
        match errors {
            ErrorHandling::Ignore => {}
            ErrorHandling::Warn => {
                for key in &unused {
                    warn!(key = %key, "unused key in regionalisation");
                }
            }
            ErrorHandling::Raise => {
                return Err(TransformError::UnusedKeys {
                    table: "regionalisation",
                    keys: unused,
                });
            }
        }
    }

    let off: Vec<(String, f64)> = fractions
        .columns()
        .iter()
        .zip(fractions.column_sums())
        .map(|(c, s)| (c.clone(), round_to(s, precision)))
        .filter(|(_, s)| *s != 1.0)
        .collect();
    if off.is_empty() {
        return Ok(true);
    }

    let decimals = precision.max(0) as usize;
    let formatted = off
        .iter()
        .map(|(k, s)| format!("{k}={s:.decimals$}"))
        .collect::<Vec<_>>()
        .join(", ");

    match errors {
        ErrorHandling::Ignore => debug!(keys = %formatted, "regionalisation key does not sum to 1"),
        ErrorHandling::Warn => warn!(keys = %formatted, "regionalisation key does not sum to 1"),
        ErrorHandling::Raise => return Err(TransformError::FractionSums(formatted)),
    }
    Ok(false)
}

fn round_to(value: f64, precision: i32) -> f64 {
    let scale = 10f64.powi(precision);
    let rounded = (value * scale).round() / scale;
    // Avoid -0.0 so comparisons and formatting stay stable.
    if rounded == 0.0 { 0.0 } else { rounded }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categorised() -> CurveSet {
        CurveSet::hourly(vec![
            ("demand".to_string(), vec![-10.0, -20.0]),
            ("supply".to_string(), vec![10.0, 20.0]),
        ])
        .unwrap()
    }

    #[test]
    fn balanced_curves_pass() {
        assert!(check_hourly_balance(&categorised(), BALANCE_PRECISION, ErrorHandling::Raise).unwrap());
    }

    #[test]
    fn raw_engine_curves_get_sign_convention() {
        let raw = CurveSet::hourly(vec![
            ("households.input (MW)".to_string(), vec![10.0]),
            ("wind.output (MW)".to_string(), vec![10.0]),
        ])
        .unwrap();
        assert!(check_hourly_balance(&raw, BALANCE_PRECISION, ErrorHandling::Raise).unwrap());
    }

    #[test]
    fn unbalanced_curves_follow_policy() {
        let curves = CurveSet::hourly(vec![
            ("demand".to_string(), vec![-10.0, -20.0]),
            ("supply".to_string(), vec![10.0, 25.0]),
        ])
        .unwrap();

        assert!(!check_hourly_balance(&curves, BALANCE_PRECISION, ErrorHandling::Warn).unwrap());
        assert_eq!(
            check_hourly_balance(&curves, BALANCE_PRECISION, ErrorHandling::Raise).unwrap_err(),
            TransformError::Unbalanced { rows: 1 }
        );
    }

    #[test]
    fn small_deficits_round_away() {
        let curves = CurveSet::hourly(vec![
            ("demand".to_string(), vec![-10.0]),
            ("supply".to_string(), vec![10.04]),
        ])
        .unwrap();
        assert!(check_hourly_balance(&curves, BALANCE_PRECISION, ErrorHandling::Raise).unwrap());
    }

    #[test]
    fn missing_fraction_keys_always_error() {
        let fractions = FractionTable::from_rows(vec![("north", vec![("demand", 1.0)])]).unwrap();
        let err = validate_fractions(&categorised(), &fractions, FRACTION_PRECISION, ErrorHandling::Ignore)
            .unwrap_err();
        assert_eq!(err, TransformError::MissingKeys(vec!["supply".to_string()]));
    }

    #[test]
    fn unused_fraction_keys_follow_policy() {
        let fractions = FractionTable::from_rows(vec![(
            "north",
            vec![("demand", 1.0), ("supply", 1.0), ("extra", 1.0)],
        )])
        .unwrap();

        assert!(validate_fractions(&categorised(), &fractions, FRACTION_PRECISION, ErrorHandling::Warn).unwrap());
        let err = validate_fractions(&categorised(), &fractions, FRACTION_PRECISION, ErrorHandling::Raise)
            .unwrap_err();
        assert!(matches!(err, TransformError::UnusedKeys { keys, .. } if keys == ["extra"]));
    }

    #[test]
    fn fraction_sums_are_checked() {
        let fractions = FractionTable::from_rows(vec![
            ("north", vec![("demand", 0.4), ("supply", 0.5)]),
            ("south", vec![("demand", 0.6), ("supply", 0.4)]),
        ])
        .unwrap();

        assert!(!validate_fractions(&categorised(), &fractions, FRACTION_PRECISION, ErrorHandling::Warn).unwrap());
        let err = validate_fractions(&categorised(), &fractions, FRACTION_PRECISION, ErrorHandling::Raise)
            .unwrap_err();
        assert_eq!(err, TransformError::FractionSums("supply=0.900".to_string()));
    }
}
