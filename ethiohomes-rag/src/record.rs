//! Listing records and the CSV record loader.
//!
//! The loader reads a header-led CSV file into [`PropertyRecord`]s. Numeric
//! columns are kept as raw cell text here; coercion to integers happens in the
//! [document builder](crate::document) so that a malformed price never stops a
//! listing from being indexed.

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{RagError, Result};

/// Columns every source file must provide.
pub const REQUIRED_COLUMNS: [&str; 7] =
    ["property_id", "location", "type", "price", "bedrooms", "bathrooms", "status"];

/// Listing availability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PropertyStatus {
    Available,
    Sold,
    Reserved,
    /// Any label outside the known set, kept verbatim.
    Other(String),
}

impl PropertyStatus {
    /// Whether the property can still be bought or rented.
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

impl From<&str> for PropertyStatus {
    fn from(value: &str) -> Self {
        let value = value.trim();
        match value.to_ascii_lowercase().as_str() {
            "available" => Self::Available,
            "sold" => Self::Sold,
            "reserved" => Self::Reserved,
            _ => Self::Other(value.to_string()),
        }
    }
}

impl From<String> for PropertyStatus {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<PropertyStatus> for String {
    fn from(status: PropertyStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for PropertyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => f.write_str("Available"),
            Self::Sold => f.write_str("Sold"),
            Self::Reserved => f.write_str("Reserved"),
            Self::Other(label) => f.write_str(label),
        }
    }
}

/// One row of the listing dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    /// Unique listing identifier, kept in its textual form.
    pub property_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: String,
    /// Category label such as `apartment` or `villa`.
    pub property_type: String,
    /// Asking price in ETB, raw cell text.
    pub price: String,
    pub bedrooms: String,
    pub bathrooms: String,
    /// Floor area in square metres, raw cell text.
    pub size: Option<String>,
    pub status: PropertyStatus,
}

/// Header positions resolved once per file.
struct ColumnMap {
    property_id: usize,
    location: usize,
    property_type: usize,
    price: usize,
    bedrooms: usize,
    bathrooms: usize,
    status: usize,
    title: Option<usize>,
    description: Option<usize>,
    size: Option<usize>,
}

impl ColumnMap {
    /// Resolve column positions, returning the names of any missing required columns.
    fn resolve(headers: &csv::StringRecord) -> std::result::Result<Self, Vec<&'static str>> {
        let names: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_ascii_lowercase())
            .collect();
        let find = |name: &str| names.iter().position(|h| h == name);

        let missing: Vec<&'static str> =
            REQUIRED_COLUMNS.iter().copied().filter(|name| find(name).is_none()).collect();
        if !missing.is_empty() {
            return Err(missing);
        }

        let required = |name: &str| find(name).unwrap_or_default();
        Ok(Self {
            property_id: required("property_id"),
            location: required("location"),
            property_type: required("type"),
            price: required("price"),
            bedrooms: required("bedrooms"),
            bathrooms: required("bathrooms"),
            status: required("status"),
            title: find("title"),
            description: find("description"),
            size: find("size"),
        })
    }

    fn record(&self, row: &csv::StringRecord) -> PropertyRecord {
        let cell = |idx: usize| row.get(idx).unwrap_or_default().trim().to_string();
        let optional = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i)).map(str::trim).filter(|v| !v.is_empty()).map(String::from)
        };

        PropertyRecord {
            property_id: cell(self.property_id),
            title: optional(self.title),
            description: optional(self.description),
            location: cell(self.location),
            property_type: cell(self.property_type),
            price: cell(self.price),
            bedrooms: cell(self.bedrooms),
            bathrooms: cell(self.bathrooms),
            size: optional(self.size),
            status: PropertyStatus::from(cell(self.status)),
        }
    }
}

/// Load every listing from the CSV file at `path`.
///
/// # Errors
///
/// Returns [`RagError::LoadError`] if the file cannot be opened, is not valid
/// CSV, lacks a required column, or repeats a `property_id`.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<PropertyRecord>> {
    let path = path.as_ref();
    let source = path.display().to_string();
    let file =
        File::open(path).map_err(|e| RagError::load(&source, format!("cannot open source: {e}")))?;
    load_from_reader(file, &source)
}

/// Load listings from any CSV reader. `source` names the input in errors and logs.
///
/// # Errors
///
/// Same conditions as [`load`].
pub fn load_from_reader<R: io::Read>(reader: R, source: &str) -> Result<Vec<PropertyRecord>> {
    let mut csv_reader =
        csv::ReaderBuilder::new().trim(csv::Trim::All).flexible(true).from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| RagError::load(source, format!("cannot read header row: {e}")))?
        .clone();
    let columns = ColumnMap::resolve(&headers).map_err(|missing| {
        RagError::load(source, format!("missing required columns: {}", missing.join(", ")))
    })?;

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for (index, row) in csv_reader.records().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let row = row.map_err(|e| RagError::load(source, format!("malformed row {line}: {e}")))?;
        if row.iter().all(|field| field.is_empty()) {
            debug!(source, line, "skipping blank row");
            continue;
        }

        let record = columns.record(&row);
        if record.property_id.is_empty() {
            return Err(RagError::load(source, format!("row {line} has an empty property_id")));
        }
        if !seen.insert(record.property_id.clone()) {
            return Err(RagError::load(
                source,
                format!("duplicate property_id '{}' at row {line}", record.property_id),
            ));
        }
        records.push(record);
    }

    info!(source, record_count = records.len(), "loaded property records");
    Ok(records)
}
