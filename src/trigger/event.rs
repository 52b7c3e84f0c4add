//! Storage-write notification payload.
//!
//! Mirrors the S3 event notification shape, reduced to the fields the
//! trigger consumes.

use serde::Deserialize;

/// A storage event carrying one or more object-created records.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

/// One record of a storage event.
#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    pub s3: S3Entity,
}

/// The S3 portion of an event record.
#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub object: ObjectEntity,
}

/// The object portion of an event record.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectEntity {
    /// URL-encoded object key, e.g. `b3_raw/dt%3D2025-09-17/file.parquet`.
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_notification() {
        let json = r#"{
            "Records": [
                {"s3": {"object": {"key": "b3_raw/dt%3D2025-09-17/b3_stock_info.parquet"}}}
            ]
        }"#;

        let event: StorageEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.records.len(), 1);
        assert_eq!(
            event.records[0].s3.object.key,
            "b3_raw/dt%3D2025-09-17/b3_stock_info.parquet"
        );
    }

    #[test]
    fn test_missing_records_defaults_to_empty() {
        let event: StorageEvent = serde_json::from_str("{}").unwrap();
        assert!(event.records.is_empty());
    }
}
