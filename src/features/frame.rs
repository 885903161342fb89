//! Column-oriented frame of dated rows with possibly undefined cells

use crate::error::{ForecastError, Result};
use crate::types::WeatherRecord;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
struct Column {
    name: String,
    values: Vec<Option<f64>>,
}

/// Ordered daily rows with named numeric columns
///
/// Dates are strictly ascending. A cell is `None` when it is undefined, e.g.
/// a lag feature on a row without enough history behind it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureFrame {
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
}

impl FeatureFrame {
    /// Create a frame with no columns, rejecting unordered or duplicate dates
    pub fn new(dates: Vec<NaiveDate>) -> Result<Self> {
        for (idx, pair) in dates.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(ForecastError::UnorderedDates {
                    row: idx + 1,
                    previous: pair[0],
                    next: pair[1],
                });
            }
        }
        Ok(Self {
            dates,
            columns: Vec::new(),
        })
    }

    pub fn from_records(records: &[WeatherRecord]) -> Result<Self> {
        let mut frame = Self::new(records.iter().map(|r| r.date).collect())?;
        let rows: Vec<_> = records.iter().map(WeatherRecord::columns).collect();

        if let Some(first) = rows.first() {
            for (idx, (name, _)) in first.iter().enumerate() {
                let values = rows.iter().map(|row| Some(row[idx].1)).collect();
                frame.insert_column(*name, values);
            }
        }
        Ok(frame)
    }

    /// Builder-style column insertion with a length check
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<Option<f64>>) -> Result<Self> {
        if values.len() != self.len() {
            return Err(ForecastError::ShapeMismatch {
                expected: self.len(),
                actual: values.len(),
            });
        }
        self.insert_column(name, values);
        Ok(self)
    }

    /// Insert or replace a column; callers guarantee the length matches
    pub(crate) fn insert_column(&mut self, name: impl Into<String>, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.dates.len());
        let name = name.into();
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(column) => column.values = values,
            None => self.columns.push(Column { name, values }),
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Columns in insertion order
    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.columns
            .iter()
            .map(|c| (c.name.as_str(), c.values.as_slice()))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Cell value; `None` when the column is absent or the cell undefined
    pub fn value(&self, row: usize, name: &str) -> Option<f64> {
        self.column(name).and_then(|values| values.get(row).copied().flatten())
    }

    /// First undefined cell as (column, row), scanning row by row
    pub fn first_undefined(&self) -> Option<(&str, usize)> {
        (0..self.len()).find_map(|row| {
            self.columns
                .iter()
                .find(|c| !defined(c.values[row]))
                .map(|c| (c.name.as_str(), row))
        })
    }

    pub fn is_complete(&self) -> bool {
        self.first_undefined().is_none()
    }

    /// Copy of the frame keeping only rows where every column is defined and finite
    pub fn drop_incomplete(&self) -> Self {
        let keep: Vec<bool> = (0..self.len())
            .map(|row| self.columns.iter().all(|c| defined(c.values[row])))
            .collect();

        let dates = self
            .dates
            .iter()
            .zip(&keep)
            .filter(|(_, keep)| **keep)
            .map(|(date, _)| *date)
            .collect();

        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: c
                    .values
                    .iter()
                    .zip(&keep)
                    .filter(|(_, keep)| **keep)
                    .map(|(value, _)| *value)
                    .collect(),
            })
            .collect();

        Self { dates, columns }
    }
}

fn defined(value: Option<f64>) -> bool {
    value.is_some_and(f64::is_finite)
}
