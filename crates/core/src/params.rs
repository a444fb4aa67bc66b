//! Per-case parameter values keyed by placeholder.
//!
//! A [`ParameterTable`] is built once from the case plan columns and is
//! read-only for the rest of the run.

use std::collections::HashMap;
use std::fmt;

use crate::error::CoreError;

/// A raw cell value from the case plan.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Int(i64),
    Float(f64),
    Text(String),
    Empty,
}

impl CellValue {
    /// Classify a raw text cell: integer, then float, otherwise text.
    ///
    /// Surrounding whitespace is ignored; a blank cell is [`CellValue::Empty`].
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Self::Int(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return Self::Float(f);
        }
        Self::Text(trimmed.to_string())
    }
}

/// Apply spreadsheet column typing to one column of parsed cells.
///
/// A numeric column holding any float or blank cell is a float column, so
/// its integers become floats (`2` renders as `2.0`). Columns with text
/// are left cell by cell.
pub fn unify_column(mut values: Vec<CellValue>) -> Vec<CellValue> {
    let has_text = values.iter().any(|v| matches!(v, CellValue::Text(_)));
    let needs_float = values
        .iter()
        .any(|v| matches!(v, CellValue::Float(_) | CellValue::Empty));
    if has_text || !needs_float {
        return values;
    }
    for value in &mut values {
        if let CellValue::Int(i) = *value {
            *value = CellValue::Float(i as f64);
        }
    }
    values
}

/// Spreadsheet-style rendering: floats always carry a fractional part.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Empty => Ok(()),
        }
    }
}

/// A placeholder that had no column mapping and was filled with zeros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingWarning {
    pub placeholder: String,
}

impl fmt::Display for MappingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "placeholder {} has no column mapping, defaulting to 0",
            self.placeholder
        )
    }
}

/// Ordered mapping `placeholder -> per-case values`.
///
/// Placeholders keep their declaration order, which is also the order in
/// which they are substituted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterTable {
    entries: Vec<(String, Vec<CellValue>)>,
}

impl ParameterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a placeholder column, replacing an earlier one with the same name.
    pub fn insert(&mut self, placeholder: impl Into<String>, values: Vec<CellValue>) {
        let placeholder = placeholder.into();
        match self.entries.iter_mut().find(|(p, _)| *p == placeholder) {
            Some(entry) => entry.1 = values,
            None => self.entries.push((placeholder, values)),
        }
    }

    /// Build the table from case plan columns.
    ///
    /// Each placeholder takes the column named by `column_mapping`. A
    /// placeholder with no mapping gets one `0` per case plan row and a
    /// [`MappingWarning`]. A mapping that names an absent column is an error
    /// listing every missing column.
    pub fn from_columns(
        placeholders: &[String],
        column_mapping: &HashMap<String, String>,
        columns: &HashMap<String, Vec<CellValue>>,
    ) -> Result<(Self, Vec<MappingWarning>), CoreError> {
        let mut missing: Vec<&str> = column_mapping
            .values()
            .filter(|col| !columns.contains_key(col.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            missing.dedup();
            return Err(CoreError::Validation(format!(
                "Case plan is missing columns: {}",
                missing.join(", ")
            )));
        }

        let row_count = columns.values().map(Vec::len).max().unwrap_or(0);
        let mut table = Self::new();
        let mut warnings = Vec::new();

        for placeholder in placeholders {
            match column_mapping.get(placeholder) {
                Some(column) => {
                    // Presence checked above.
                    let values = columns.get(column).cloned().unwrap_or_default();
                    table.insert(placeholder.clone(), values);
                }
                None => {
                    table.insert(placeholder.clone(), vec![CellValue::Int(0); row_count]);
                    warnings.push(MappingWarning {
                        placeholder: placeholder.clone(),
                    });
                }
            }
        }

        Ok((table, warnings))
    }

    /// Number of cases: the shortest placeholder sequence bounds the run.
    ///
    /// Returns 0 for an empty table.
    pub fn case_count(&self) -> usize {
        self.entries
            .iter()
            .map(|(_, values)| values.len())
            .min()
            .unwrap_or(0)
    }

    /// Check the table describes at least one case.
    pub fn validate(&self) -> Result<usize, CoreError> {
        if self.entries.is_empty() {
            return Err(CoreError::Validation(
                "Parameter table has no placeholders".to_string(),
            ));
        }
        match self.case_count() {
            0 => Err(CoreError::Validation(
                "Parameter table has no cases".to_string(),
            )),
            n => Ok(n),
        }
    }

    /// Placeholder names in substitution order.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.as_str())
    }

    /// `(placeholder, value)` pairs for the case at `index`.
    ///
    /// Placeholders whose sequence is shorter than `index + 1` are skipped.
    pub fn row(&self, index: usize) -> impl Iterator<Item = (&str, &CellValue)> {
        self.entries
            .iter()
            .filter_map(move |(p, values)| values.get(index).map(|v| (p.as_str(), v)))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
