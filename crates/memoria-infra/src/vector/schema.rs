//! Arrow schema for the LanceDB memory table.
//!
//! Arrow versions MUST match lancedb's transitive dependency (57.3 for lancedb 0.26).

use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema};

use memoria_types::memory::payload_keys;

/// Column holding the point id.
pub const ID_COLUMN: &str = "id";
/// Column holding the embedding.
pub const VECTOR_COLUMN: &str = "vector";
/// Column LanceDB adds to vector search results.
pub const DISTANCE_COLUMN: &str = "_distance";

/// Payload columns, all strings. `metadata` holds a JSON object.
pub const PAYLOAD_COLUMNS: [&str; 5] = [
    payload_keys::USER_ID,
    payload_keys::MEMORY_TYPE,
    payload_keys::CONTENT,
    payload_keys::TIMESTAMP,
    payload_keys::METADATA,
];

/// Schema for a memory table with `dimension`-wide vectors.
///
/// Payload columns are nullable so a row missing a required field can exist
/// on disk; readers skip such rows instead of failing the whole query.
pub fn memory_schema(dimension: i32) -> Schema {
    let mut fields = vec![Field::new(ID_COLUMN, DataType::Utf8, false)];
    fields.extend(
        PAYLOAD_COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::Utf8, true)),
    );
    fields.push(Field::new(
        VECTOR_COLUMN,
        DataType::FixedSizeList(
            Arc::new(Field::new("item", DataType::Float32, true)),
            dimension,
        ),
        false,
    ));
    Schema::new(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_schema_layout() {
        let schema = memory_schema(768);
        assert_eq!(schema.fields().len(), 7);
        assert_eq!(schema.field(0).name(), "id");
        assert!(!schema.field(0).is_nullable());

        for name in PAYLOAD_COLUMNS {
            let field = schema.field_with_name(name).unwrap();
            assert!(field.is_nullable(), "{name} should be nullable");
            assert_eq!(field.data_type(), &DataType::Utf8);
        }

        match schema.field_with_name(VECTOR_COLUMN).unwrap().data_type() {
            DataType::FixedSizeList(_, size) => assert_eq!(*size, 768),
            other => panic!("Expected FixedSizeList, got {other:?}"),
        }
    }
}
