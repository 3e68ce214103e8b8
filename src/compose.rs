//! Post-run composition: filtering and sorting of the merged table.
//!
//! Both steps parse from compact configuration text. Filters are
//! set-membership tests over a column's rendered values: conditions on the
//! same column OR together, different columns AND together. Sorting is a
//! stable multi-key pass, so equal keys keep their prior order and an empty
//! key list is the identity.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::errors::{Error, Result};
use crate::frame::{Cell, Column, Frame};

/// One membership condition over a column's values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterCond {
    /// Keep rows whose rendered value is in the set.
    In(Vec<String>),
    /// Keep rows whose rendered value is not in the set.
    NotIn(Vec<String>),
}

impl FilterCond {
    fn matches(&self, rendered: &str) -> bool {
        match self {
            Self::In(set) => set.iter().any(|v| v == rendered),
            Self::NotIn(set) => !set.iter().any(|v| v == rendered),
        }
    }
}

/// A conjunction of per-column membership filters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterBy {
    filters: Vec<(Column, Vec<FilterCond>)>,
}

impl FilterBy {
    /// Builds a filter from explicit conditions.
    pub fn new(filters: Vec<(Column, Vec<FilterCond>)>) -> Self {
        Self { filters }
    }

    /// Applies the filter in place.
    ///
    /// A column no row carries is skipped with a warning rather than
    /// failing; date-typed values are compared after date coercion so
    /// `2024-01-02` matches regardless of rendering.
    pub fn apply(&self, frame: &mut Frame) {
        for (column, conditions) in &self.filters {
            if !frame.has_column(*column) {
                warn!(column = column.as_str(), "filter column absent, skipping");
                continue;
            }
            debug!(column = column.as_str(), conditions = conditions.len(), "filtering");
            frame.retain(|row| {
                let rendered = match row.cell(*column) {
                    Some(cell) => cell.render(),
                    None => return false,
                };
                conditions.iter().any(|c| c.matches(&rendered))
            });
        }
    }
}

/// Parses `col=a|b,col2=NON_x|y` into a [`FilterBy`].
///
/// Values for the `Date` column are normalized to `%Y-%m-%d` so they compare
/// equal to rendered date cells.
pub fn parse_filters(input: &str) -> Result<FilterBy> {
    let mut filters: Vec<(Column, Vec<FilterCond>)> = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, value) = part
            .split_once('=')
            .ok_or_else(|| Error::MalformedFilter(part.to_string()))?;
        let column = Column::from_str(name.trim())?;
        let (negated, value) = match value.strip_prefix("NON_") {
            Some(rest) => (true, rest),
            None => (false, value),
        };
        let set = value
            .split('|')
            .map(|v| normalize_value(column, v.trim()))
            .collect::<Result<Vec<_>>>()?;
        if set.is_empty() || set.iter().any(|v| v.is_empty()) {
            return Err(Error::MalformedFilter(part.to_string()));
        }
        let condition = if negated {
            FilterCond::NotIn(set)
        } else {
            FilterCond::In(set)
        };
        match filters.iter_mut().find(|(c, _)| *c == column) {
            Some((_, conditions)) => conditions.push(condition),
            None => filters.push((column, vec![condition])),
        }
    }
    Ok(FilterBy::new(filters))
}

fn normalize_value(column: Column, value: &str) -> Result<String> {
    if column == Column::Date {
        let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|_| Error::MalformedFilter(value.to_string()))?;
        return Ok(date.format("%Y-%m-%d").to_string());
    }
    Ok(value.to_string())
}

/// A stable multi-key sort order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortBy {
    keys: Vec<(Column, bool)>,
}

impl SortBy {
    /// Builds a sort from `(column, ascending)` keys.
    pub fn new(keys: Vec<(Column, bool)>) -> Self {
        Self { keys }
    }

    /// Applies the sort in place. An empty key list leaves the table as is.
    pub fn apply(&self, frame: &mut Frame) {
        if self.keys.is_empty() {
            return;
        }
        debug!(keys = self.keys.len(), "sorting");
        frame.sort_by(|a, b| {
            for (column, ascending) in &self.keys {
                let x = a.cell(*column).filter(Cell::is_defined);
                let y = b.cell(*column).filter(Cell::is_defined);
                // undefined and absent cells sort last in both directions;
                // only the defined-vs-defined ordering reverses
                let ordering = match (&x, &y) {
                    (Some(x), Some(y)) => {
                        let ordering = x.compare(y);
                        if *ascending { ordering } else { ordering.reverse() }
                    }
                    (None, None) => Ordering::Equal,
                    (None, Some(_)) => Ordering::Greater,
                    (Some(_), None) => Ordering::Less,
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }
}

/// Parses `col1[desc],col2` into a [`SortBy`]; keys are ascending unless
/// suffixed with `[desc]`.
pub fn parse_sort(input: &str) -> Result<SortBy> {
    let mut keys = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, ascending) = match part.strip_suffix("[desc]") {
            Some(name) => (name.trim(), false),
            None => match part.strip_suffix("[asc]") {
                Some(name) => (name.trim(), true),
                None => (part, true),
            },
        };
        keys.push((Column::from_str(name)?, ascending));
    }
    Ok(SortBy::new(keys))
}
