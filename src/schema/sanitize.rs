//! Header and table name sanitization.
//!
//! Identifiers produced here only contain `[a-z0-9_]`, never start with a digit, never start or
//! end with `_`, and never contain `__`. Sanitizing an already-sanitized name returns it
//! unchanged.

use std::collections::HashSet;

use crate::types::RESERVED_COLUMNS;

/// Prefix applied to identifiers that would otherwise start with a digit.
pub const DIGIT_PREFIX: &str = "col_";

/// Table name used when a file stem or caller-provided name sanitizes to nothing.
pub const FALLBACK_TABLE_NAME: &str = "imported_data";

/// Sanitize a single raw name.
///
/// Returns `None` if nothing alphanumeric is left (e.g. `"(°)"` or `""`).
pub fn sanitize_identifier(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;

    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            // Separators are only emitted between alphanumeric runs, which both collapses
            // repeats and strips leading/trailing underscores.
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }

    if out.is_empty() {
        return None;
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, DIGIT_PREFIX);
    }
    Some(out)
}

/// Sanitize a column name at 1-based `position`, substituting `column_{position}` when the raw
/// name has no usable characters.
pub fn sanitize_column_name(raw: &str, position: usize) -> String {
    sanitize_identifier(raw).unwrap_or_else(|| format!("column_{position}"))
}

/// Sanitize a table name, substituting [`FALLBACK_TABLE_NAME`] when nothing usable is left.
pub fn sanitize_table_name(raw: &str) -> String {
    sanitize_identifier(raw).unwrap_or_else(|| FALLBACK_TABLE_NAME.to_string())
}

/// Sanitize a full header row into unique column identifiers, preserving order.
///
/// Rules:
///
/// - each name goes through [`sanitize_column_name`]
/// - the implicit columns (`id`, `import_timestamp`, `source_file`) are treated as taken
/// - the first occurrence of a name keeps it; later occurrences get the smallest free suffix
///   `_2`, `_3`, ...
pub fn sanitize_headers<'a, I>(headers: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut taken: HashSet<String> = RESERVED_COLUMNS.iter().map(|s| s.to_string()).collect();
    let mut out = Vec::new();

    for (idx, raw) in headers.into_iter().enumerate() {
        let base = sanitize_column_name(raw, idx + 1);
        let name = if taken.contains(&base) {
            (2usize..)
                .map(|n| format!("{base}_{n}"))
                .find(|candidate| !taken.contains(candidate))
                .unwrap_or_default()
        } else {
            base
        };
        taken.insert(name.clone());
        out.push(name);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_symbol_runs_and_lowercases() {
        assert_eq!(sanitize_identifier("Sample ID").as_deref(), Some("sample_id"));
        assert_eq!(
            sanitize_identifier("Temperature (°C)").as_deref(),
            Some("temperature_c")
        );
        assert_eq!(
            sanitize_identifier("  --Flow--Rate // mL/min  ").as_deref(),
            Some("flow_rate_ml_min")
        );
    }

    #[test]
    fn collapses_existing_underscores() {
        assert_eq!(sanitize_identifier("__a___b__").as_deref(), Some("a_b"));
    }

    #[test]
    fn prefixes_leading_digit() {
        assert_eq!(
            sanitize_identifier("1st_Reading").as_deref(),
            Some("col_1st_reading")
        );
        assert_eq!(sanitize_identifier("2024").as_deref(), Some("col_2024"));
    }

    #[test]
    fn non_ascii_letters_are_separators() {
        assert_eq!(sanitize_identifier("Température").as_deref(), Some("temp_rature"));
        assert_eq!(sanitize_identifier("µg/L"), Some("g_l".to_string()));
    }

    #[test]
    fn empty_and_symbolic_names_fall_back_to_position() {
        assert_eq!(sanitize_identifier(""), None);
        assert_eq!(sanitize_identifier("(%)"), None);
        assert_eq!(sanitize_column_name("", 3), "column_3");
        assert_eq!(sanitize_column_name("###", 1), "column_1");
        assert_eq!(sanitize_table_name("..."), FALLBACK_TABLE_NAME);
    }

    #[test]
    fn sanitizing_is_idempotent() {
        let raws = [
            "Sample ID",
            "Temperature (°C)",
            "1st_Reading",
            "MiXeD--CaSe!!Name",
            "  padded  ",
            "a__b",
            "%",
        ];
        for (i, raw) in raws.iter().enumerate() {
            let once = sanitize_column_name(raw, i + 1);
            let twice = sanitize_column_name(&once, i + 1);
            assert_eq!(once, twice, "raw={raw:?}");
        }
    }

    #[test]
    fn headers_keep_order_and_become_unique() {
        let names = sanitize_headers(["Sample ID", "Temperature (°C)", "1st_Reading"]);
        assert_eq!(names, vec!["sample_id", "temperature_c", "col_1st_reading"]);

        let names = sanitize_headers(["Value", "value", "VALUE", "value_2"]);
        assert_eq!(names, vec!["value", "value_2", "value_3", "value_2_2"]);
    }

    #[test]
    fn headers_avoid_implicit_columns() {
        let names = sanitize_headers(["ID", "Source File", "reading"]);
        assert_eq!(names, vec!["id_2", "source_file_2", "reading"]);
    }

    #[test]
    fn headers_use_positional_fallback() {
        let names = sanitize_headers(["", "x", "(%)"]);
        assert_eq!(names, vec!["column_1", "x", "column_3"]);
    }
}
