//! Searchable documents built from listing records.

use serde::{Deserialize, Serialize};

use crate::record::{PropertyRecord, PropertyStatus};

/// Structured listing fields carried alongside the embedded text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    pub property_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: String,
    pub property_type: String,
    /// Price in ETB; 0 when the source value was missing or unparseable.
    pub price: u64,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub status: PropertyStatus,
}

/// A listing rendered for embedding, keyed by its property id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Storage key, always equal to `metadata.property_id`.
    pub id: String,
    /// Labelled multi-line rendering of every field.
    pub body: String,
    pub metadata: DocumentMetadata,
}

/// A retrieved [`Document`] paired with its relevance to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub document: Document,
    /// Cosine similarity to the query embedding (higher is more relevant).
    pub score: f32,
}

/// Build the searchable document for one record.
///
/// Pure and deterministic: identical records always produce identical documents,
/// which the index fingerprint relies on.
pub fn build(record: &PropertyRecord) -> Document {
    let body = format!(
        "Title: {}\n\
         Description: {}\n\
         Location: {}\n\
         Type: {}\n\
         Price: {}\n\
         Bedrooms: {}\n\
         Bathrooms: {}\n\
         Size: {} sq.m.\n\
         Status: {}",
        record.title.as_deref().unwrap_or_default(),
        record.description.as_deref().unwrap_or_default(),
        record.location,
        record.property_type,
        record.price,
        record.bedrooms,
        record.bathrooms,
        record.size.as_deref().unwrap_or_default(),
        record.status,
    )
    .trim()
    .to_string();

    let property_id = record.property_id.trim().to_string();
    Document {
        id: property_id.clone(),
        body,
        metadata: DocumentMetadata {
            property_id,
            title: record.title.clone(),
            description: record.description.clone(),
            location: record.location.clone(),
            property_type: record.property_type.clone(),
            price: coerce_integer(&record.price),
            bedrooms: coerce_integer(&record.bedrooms).try_into().unwrap_or(0),
            bathrooms: coerce_integer(&record.bathrooms).try_into().unwrap_or(0),
            status: record.status.clone(),
        },
    }
}

/// Build documents for every record, preserving order.
pub fn build_all(records: &[PropertyRecord]) -> Vec<Document> {
    records.iter().map(build).collect()
}

/// Parse a non-negative integer out of a spreadsheet cell.
///
/// Thousands separators and surrounding whitespace are ignored and fractional
/// values truncate. Anything else, including negatives, yields 0.
fn coerce_integer(raw: &str) -> u64 {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',' && *c != '_').collect();
    if cleaned.is_empty() {
        return 0;
    }
    if let Ok(value) = cleaned.parse::<u64>() {
        return value;
    }
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 && value < u64::MAX as f64 => {
            value.trunc() as u64
        }
        _ => 0,
    }
}
