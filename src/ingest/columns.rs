use csv::StringRecord;

use crate::error::LoadError;
use crate::ingest::date::parse_created_date;
use crate::ingest::record::ServiceRequest;

/// Declared mapping from source header (case- and spacing-sensitive) to
/// destination field, in destination column order.
pub const COLUMNS: [(&str, &str); 8] = [
    ("Created Date", "created_date"),
    ("Agency", "agency"),
    ("Agency Name", "agency_name"),
    ("Complaint Type", "complaint_type"),
    ("Descriptor", "descriptor"),
    ("Incident Zip", "incident_zip"),
    ("Borough", "borough"),
    ("Resolution Description", "resolution_description"),
];

/// Resolved source-column positions for the eight destination fields.
/// Built once from the header so schema mismatches fail before any row is
/// appended; extra source columns are simply never referenced.
#[derive(Debug, Clone)]
pub struct Projection {
    indices: [usize; COLUMNS.len()],
}

impl Projection {
    /// Validate the source header against the declared mapping. The first
    /// missing required column aborts with `LoadError::Schema`.
    pub fn from_header(header: &StringRecord) -> Result<Self, LoadError> {
        let mut indices = [0usize; COLUMNS.len()];
        for (slot, (source, _)) in indices.iter_mut().zip(COLUMNS.iter()) {
            *slot = header
                .iter()
                .position(|h| h == *source)
                .ok_or_else(|| LoadError::Schema((*source).to_string()))?;
        }
        Ok(Self { indices })
    }

    /// Project one raw record onto the destination shape. Fields beyond the
    /// record's length (short rows) become empty strings; the date field is
    /// coerced, everything else is copied verbatim.
    pub fn project(&self, record: &StringRecord) -> ServiceRequest {
        let field = |n: usize| record.get(self.indices[n]).unwrap_or("");
        ServiceRequest {
            created_date: parse_created_date(field(0)),
            agency: field(1).to_string(),
            agency_name: field(2).to_string(),
            complaint_type: field(3).to_string(),
            descriptor: field(4).to_string(),
            incident_zip: field(5).to_string(),
            borough: field(6).to_string(),
            resolution_description: field(7).to_string(),
        }
    }
}
