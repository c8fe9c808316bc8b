//! Column-oriented tables with an explicit schema check at each component boundary.
//!
//! Activity-store files are CSV with a header row; an empty cell is a missing value. Columns
//! whose non-empty cells all parse as numbers are stored as [`Column::Float`], everything else
//! as [`Column::Text`]. Components call [`Table::require`] once on entry and then read typed
//! columns, instead of probing for columns on every access.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use time::{
    OffsetDateTime, PrimitiveDateTime, format_description::well_known::Rfc3339,
    macros::format_description,
};

use crate::errors::{PacerError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Float(values) => values.len(),
            Column::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cell(&self, row: usize) -> Option<String> {
        match self {
            Column::Float(values) => values[row].map(|v| v.to_string()),
            Column::Text(values) => values[row].clone(),
        }
    }

    /// Infers the column type from raw CSV cells.
    fn from_cells(cells: Vec<Option<String>>) -> Self {
        let parsed: Option<Vec<Option<f64>>> = cells
            .iter()
            .map(|cell| match cell {
                None => Some(None),
                Some(s) => s.trim().parse::<f64>().ok().map(finite),
            })
            .collect();

        match parsed {
            Some(values) => Column::Float(values),
            None => Column::Text(cells),
        }
    }
}

fn finite(v: f64) -> Option<f64> {
    if v.is_finite() { Some(v) } else { None }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    names: Vec<String>,
    columns: HashMap<String, Column>,
    len: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Fails with every missing name at once.
    pub fn require(&self, names: &[&str]) -> Result<()> {
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !self.has_column(name))
            .map(|name| name.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PacerError::MissingColumns(missing))
        }
    }

    /// Adds or replaces a column. Replacing keeps the column's position.
    pub fn push_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        let replacing_only_column = self.names.len() == 1 && self.names[0] == name;
        if !self.names.is_empty() && !replacing_only_column && column.len() != self.len {
            return Err(PacerError::MalformedInput(format!(
                "column '{name}' has {} rows, table has {}",
                column.len(),
                self.len
            )));
        }

        self.len = column.len();
        if self.columns.insert(name.clone(), column).is_none() {
            self.names.push(name);
        }
        Ok(())
    }

    pub fn push_float(&mut self, name: impl Into<String>, values: Vec<Option<f64>>) -> Result<()> {
        self.push_column(name, Column::Float(values))
    }

    pub fn push_text(&mut self, name: impl Into<String>, values: Vec<Option<String>>) -> Result<()> {
        self.push_column(name, Column::Text(values))
    }

    /// Numeric view of a column; text cells that do not parse become missing.
    pub fn floats(&self, name: &str) -> Option<Vec<Option<f64>>> {
        self.columns.get(name).map(|column| match column {
            Column::Float(values) => values.clone(),
            Column::Text(values) => values
                .iter()
                .map(|cell| {
                    cell.as_deref()
                        .and_then(|s| s.trim().parse::<f64>().ok())
                        .and_then(finite)
                })
                .collect(),
        })
    }

    pub fn float_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        self.floats(name)
            .ok_or_else(|| PacerError::MissingColumns(vec![name.to_string()]))
    }

    pub fn texts(&self, name: &str) -> Option<Vec<Option<String>>> {
        self.columns
            .get(name)
            .map(|column| (0..column.len()).map(|row| column.cell(row)).collect())
    }

    pub fn text_column(&self, name: &str) -> Result<Vec<Option<String>>> {
        self.texts(name)
            .ok_or_else(|| PacerError::MissingColumns(vec![name.to_string()]))
    }

    /// First non-missing value of a column, as text.
    pub fn first_text(&self, name: &str) -> Option<String> {
        let column = self.columns.get(name)?;
        (0..column.len()).find_map(|row| column.cell(row))
    }

    /// Timestamp view of a column, parsed leniently (see [`parse_timestamp`]).
    pub fn timestamps(&self, name: &str) -> Option<Vec<Option<OffsetDateTime>>> {
        self.columns.get(name).map(|column| match column {
            Column::Float(values) => values.iter().map(|v| v.and_then(from_unix_seconds)).collect(),
            Column::Text(values) => values
                .iter()
                .map(|cell| cell.as_deref().and_then(parse_timestamp))
                .collect(),
        })
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for record in rdr.records() {
            let record = record?;
            for (i, column) in cells.iter_mut().enumerate() {
                let value = record.get(i).map(str::trim).filter(|s| !s.is_empty());
                column.push(value.map(str::to_string));
            }
        }

        let mut table = Table::new();
        for (name, column_cells) in headers.into_iter().zip(cells) {
            table.push_column(name, Column::from_cells(column_cells))?;
        }
        Ok(table)
    }

    /// Reads a CSV file; the handle is closed on every exit path.
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.names)?;

        let columns: Vec<&Column> = self.names.iter().filter_map(|n| self.columns.get(n)).collect();
        for row in 0..self.len {
            let record: Vec<String> = columns
                .iter()
                .map(|column| column.cell(row).unwrap_or_default())
                .collect();
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        self.to_writer(BufWriter::new(file))
    }
}

fn from_unix_seconds(seconds: f64) -> Option<OffsetDateTime> {
    if !seconds.is_finite() {
        return None;
    }
    OffsetDateTime::from_unix_timestamp_nanos((seconds * 1e9) as i128).ok()
}

/// Parses RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff][+HH:MM]` (UTC when no offset), a naive
/// `YYYY-MM-DDTHH:MM:SS[.fff]`, or Unix seconds. Anything else is `None`.
pub fn parse_timestamp(s: &str) -> Option<OffsetDateTime> {
    let s = s.trim();

    if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(ts);
    }

    let with_offset = [
        format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
        ),
        format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]"
        ),
    ];
    for fmt in with_offset {
        if let Ok(ts) = OffsetDateTime::parse(s, fmt) {
            return Some(ts);
        }
    }

    let naive = [
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    ];
    for fmt in naive {
        if let Ok(ts) = PrimitiveDateTime::parse(s, fmt) {
            return Some(ts.assume_utc());
        }
    }

    s.parse::<f64>().ok().and_then(from_unix_seconds)
}
