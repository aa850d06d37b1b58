//! Column type inference from sampled cell values.

use std::sync::Arc;

use crate::types::ColumnType;

/// Injectable inference strategy: given the sampled raw values of one column, pick its type.
///
/// The default is [`infer_column_type`]. Any `Fn(&[&str]) -> ColumnType` closure can be used
/// instead, e.g. to force every column to `Text`.
pub type ColumnInferencer = Arc<dyn Fn(&[&str]) -> ColumnType + Send + Sync>;

/// Returns the default inferencer.
pub fn default_inferencer() -> ColumnInferencer {
    Arc::new(infer_column_type)
}

/// Classify a single non-empty value as the most specific type it is compatible with.
///
/// Returns `None` for empty/whitespace-only values, which do not take part in inference.
pub fn classify_value(raw: &str) -> Option<ColumnType> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.parse::<i64>().is_ok() {
        return Some(ColumnType::Integer);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(ColumnType::Real),
        _ => Some(ColumnType::Text),
    }
}

/// Infer a column type from sampled values.
///
/// The result is the most general type compatible with every non-empty sample, under
/// `Integer ⊂ Real ⊂ Text`. Empty samples are ignored; a column with no non-empty samples is
/// `Text`.
pub fn infer_column_type(samples: &[&str]) -> ColumnType {
    let mut widest: Option<ColumnType> = None;
    for sample in samples {
        if let Some(t) = classify_value(sample) {
            widest = Some(widest.map_or(t, |w| w.max(t)));
            if widest == Some(ColumnType::Text) {
                break;
            }
        }
    }
    widest.unwrap_or(ColumnType::Text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_value_orders_integer_real_text() {
        assert_eq!(classify_value("42"), Some(ColumnType::Integer));
        assert_eq!(classify_value("-7"), Some(ColumnType::Integer));
        assert_eq!(classify_value("+3"), Some(ColumnType::Integer));
        assert_eq!(classify_value("1.5"), Some(ColumnType::Real));
        assert_eq!(classify_value("1e-3"), Some(ColumnType::Real));
        assert_eq!(classify_value("abc"), Some(ColumnType::Text));
        assert_eq!(classify_value(""), None);
        assert_eq!(classify_value("  "), None);
    }

    #[test]
    fn non_finite_floats_are_text() {
        assert_eq!(classify_value("NaN"), Some(ColumnType::Text));
        assert_eq!(classify_value("inf"), Some(ColumnType::Text));
        assert_eq!(classify_value("-infinity"), Some(ColumnType::Text));
    }

    #[test]
    fn integer_overflow_is_real() {
        assert_eq!(
            classify_value("99999999999999999999"),
            Some(ColumnType::Real)
        );
    }

    #[test]
    fn all_integers_infer_integer() {
        assert_eq!(infer_column_type(&["1", "2", "300"]), ColumnType::Integer);
    }

    #[test]
    fn one_fractional_sample_widens_to_real() {
        assert_eq!(infer_column_type(&["1", "2", "1.5"]), ColumnType::Real);
    }

    #[test]
    fn one_non_numeric_sample_widens_to_text() {
        assert_eq!(infer_column_type(&["1", "2", "n/a"]), ColumnType::Text);
        assert_eq!(infer_column_type(&["1", "1.5", "n/a"]), ColumnType::Text);
    }

    #[test]
    fn empty_samples_are_ignored() {
        assert_eq!(infer_column_type(&["", "4", " "]), ColumnType::Integer);
        assert_eq!(infer_column_type(&["", "4.0", ""]), ColumnType::Real);
    }

    #[test]
    fn all_empty_defaults_to_text() {
        assert_eq!(infer_column_type(&["", "  "]), ColumnType::Text);
        assert_eq!(infer_column_type(&[]), ColumnType::Text);
    }

    #[test]
    fn custom_inferencer_is_callable_through_the_alias() {
        let always_text: ColumnInferencer = Arc::new(|_: &[&str]| ColumnType::Text);
        assert_eq!(always_text(&["1", "2"]), ColumnType::Text);
        assert_eq!(default_inferencer()(&["1", "2"]), ColumnType::Integer);
    }
}
