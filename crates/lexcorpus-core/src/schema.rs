/// Arrow schema definitions for ingested statute records.
pub mod articles {
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::error::ArrowError;
    use arrow::record_batch::RecordBatch;

    use crate::record::ArticleRecord;

    /// Schema for one destination table of statute records.
    pub fn records_schema() -> Schema {
        Schema::new(vec![
            Field::new("number", DataType::Utf8, true),
            Field::new("text", DataType::Utf8, false),
            Field::new("ord", DataType::Int64, false),
            Field::new("kind", DataType::Utf8, false),
        ])
    }

    /// Convert records into a single RecordBatch matching [`records_schema`].
    pub fn records_to_batch(records: &[ArticleRecord]) -> Result<RecordBatch, ArrowError> {
        let number: ArrayRef = Arc::new(StringArray::from(
            records.iter().map(|r| r.number.clone()).collect::<Vec<_>>(),
        ));
        let text: ArrayRef = Arc::new(StringArray::from(
            records.iter().map(|r| r.text.as_str()).collect::<Vec<_>>(),
        ));
        let ord: ArrayRef = Arc::new(Int64Array::from(
            records.iter().map(|r| r.order).collect::<Vec<_>>(),
        ));
        let kind: ArrayRef = Arc::new(StringArray::from(
            records.iter().map(|r| r.kind.as_str()).collect::<Vec<_>>(),
        ));
        RecordBatch::try_new(Arc::new(records_schema()), vec![number, text, ord, kind])
    }
}

#[cfg(test)]
mod tests {
    use super::articles;
    use arrow::array::Array;
    use crate::numbering::ArticleNumber;
    use crate::record::{ArticleRecord, RecordKind};

    #[test]
    fn records_schema_has_expected_fields() {
        let schema = articles::records_schema();
        assert_eq!(schema.fields().len(), 4);
        assert!(schema.field_with_name("number").unwrap().is_nullable());
        assert!(!schema.field_with_name("text").unwrap().is_nullable());
    }

    #[test]
    fn records_convert_to_batch() {
        let recs = vec![
            ArticleRecord::element(RecordKind::Title, "LEI Nº 1", 0),
            ArticleRecord::article(&ArticleNumber::new(1), "Texto."),
        ];
        let batch = articles::records_to_batch(&recs).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 4);
        assert!(batch.column(0).is_null(0));
        assert!(!batch.column(0).is_null(1));
    }

    #[test]
    fn empty_records_give_empty_batch() {
        let batch = articles::records_to_batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
    }
}
