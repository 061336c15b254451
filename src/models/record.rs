//! The Record model: fixed relational columns plus a JSON attribute bag

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Editorial lifecycle of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Visible only to its owner and staff.
    Draft,
    /// Submitted for publication, pending review.
    Pending,
    /// Under editorial review.
    Review,
    /// Publicly accessible.
    Public,
    /// Sent to the bin.
    Deleted,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Draft => "draft",
            RecordStatus::Pending => "pending",
            RecordStatus::Review => "review",
            RecordStatus::Public => "public",
            RecordStatus::Deleted => "deleted",
        }
    }
}

impl TryFrom<String> for RecordStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "draft" => Ok(RecordStatus::Draft),
            "pending" => Ok(RecordStatus::Pending),
            "review" => Ok(RecordStatus::Review),
            "public" => Ok(RecordStatus::Public),
            "deleted" => Ok(RecordStatus::Deleted),
            _ => Err(format!("Invalid record status: {}", value)),
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted content entity (story, document, ...).
///
/// The relational columns are fixed; everything else lives in the opaque
/// `data` JSON bag, including per-language variants such as
/// `data.title.fr_FR`. The derived search vector stays database-side and is
/// never materialized into this struct.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Record {
    pub id: i64,
    pub slug: String,
    pub title: String,
    #[sqlx(try_from = "String")]
    pub status: RecordStatus,
    /// Opaque metadata contents, JSON format.
    pub data: JsonValue,
    /// Displayed date (metadata), if any.
    pub date: Option<DateTime<Utc>>,
    pub date_created: DateTime<Utc>,
    pub date_last_modified: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            RecordStatus::Draft,
            RecordStatus::Pending,
            RecordStatus::Review,
            RecordStatus::Public,
            RecordStatus::Deleted,
        ] {
            let parsed = RecordStatus::try_from(status.as_str().to_string()).unwrap();
            assert_eq!(parsed, status);
        }
        assert!(RecordStatus::try_from("bogus".to_string()).is_err());
    }
}
