use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use crate::entsoe::EntsoeError;

/// Rows of a transparency-platform CSV export, addressed by header name
#[derive(Debug, Clone)]
pub struct Table {
    headers: StringRecord,
    records: Vec<StringRecord>,
}

impl Table {
    pub fn from_path(path: &Path) -> Result<Self, EntsoeError> {
        let file = std::fs::File::open(path)?;
        let table = Self::from_reader(file)?;
        debug!(path = %path.display(), rows = table.len(), "loaded table");
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, EntsoeError> {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let records = reader.records().collect::<Result<Vec<_>, _>>()?;

        Ok(Self { headers, records })
    }

    /// Position of a column, or `MissingColumn` if the export does not carry it
    pub fn column(&self, name: &str) -> Result<usize, EntsoeError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| EntsoeError::MissingColumn(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Iterate over the raw records in file order
    pub fn rows(&self) -> impl Iterator<Item = &StringRecord> {
        self.records.iter()
    }
}

/// Read one field of a record, treating short rows as empty cells
pub fn field(record: &StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("")
}
