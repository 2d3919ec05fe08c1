use chrono::NaiveDateTime;

/// One projected service-request row, exactly as it lands in the
/// destination table. Field order matches the table's column order.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRequest {
    /// Null when the source value did not match the expected date format.
    pub created_date: Option<NaiveDateTime>,
    pub agency: String,
    pub agency_name: String,
    pub complaint_type: String,
    pub descriptor: String,
    pub incident_zip: String,
    pub borough: String,
    pub resolution_description: String,
}
