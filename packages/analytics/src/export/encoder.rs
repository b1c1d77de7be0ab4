//! Delimited-text rendering of homogeneous row sets.

use ingres_analytics_models::ExportRow;
use serde_json::Value;

use super::ExportError;

/// Renders `rows` as comma-separated text.
///
/// The header is the key set of the first row, in key order. Each later
/// row may omit keys (rendered empty) but may not add any. `null` renders
/// empty; fields containing a comma, quote, or newline are quoted with
/// embedded quotes doubled. An empty row set renders as an empty string
/// with no header.
///
/// # Errors
///
/// * [`ExportError::NestedValue`] if any value is an object or array
/// * [`ExportError::UnexpectedColumn`] if a row has a key the header lacks
/// * [`ExportError::Csv`] or [`ExportError::Io`] if writing fails
pub fn encode_csv(rows: &[ExportRow]) -> Result<String, ExportError> {
    let Some(first) = rows.first() else {
        return Ok(String::new());
    };
    let header: Vec<&String> = first.keys().collect();

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(header.iter().map(|k| k.as_str()))?;

    for (index, row) in rows.iter().enumerate() {
        if let Some(extra) = row.keys().find(|k| !first.contains_key(*k)) {
            return Err(ExportError::UnexpectedColumn {
                column: extra.clone(),
                row: index,
            });
        }

        let fields = header
            .iter()
            .map(|column| render(row.get(column.as_str()), column, index))
            .collect::<Result<Vec<String>, ExportError>>()?;
        writer.write_record(&fields)?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn render(value: Option<&Value>, column: &str, row: usize) -> Result<String, ExportError> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Array(_) | Value::Object(_)) => Err(ExportError::NestedValue {
            column: column.to_string(),
            row,
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(value: Value) -> ExportRow {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture rows must be objects"),
        }
    }

    #[test]
    fn empty_rows_render_nothing() {
        assert_eq!(encode_csv(&[]).unwrap(), "");
    }

    #[test]
    fn header_follows_first_row_key_order() {
        let rows = vec![
            row(json!({"name": "Kolar", "id": 11, "ratio": 85.5})),
            row(json!({"name": "Mysuru", "id": 12, "ratio": null})),
        ];
        assert_eq!(
            encode_csv(&rows).unwrap(),
            "name,id,ratio\nKolar,11,85.5\nMysuru,12,\n"
        );
    }

    #[test]
    fn missing_keys_render_empty() {
        let rows = vec![
            row(json!({"a": 1, "b": 2})),
            row(json!({"a": 3})),
        ];
        assert_eq!(encode_csv(&rows).unwrap(), "a,b\n1,2\n3,\n");
    }

    #[test]
    fn special_characters_round_trip_through_a_reader() {
        let awkward = "Bangalore, \"Urban\"\nNorth";
        let rows = vec![
            row(json!({"id": 1, "name": awkward, "source": "CGWB"})),
            row(json!({"id": 2, "name": "plain", "source": null})),
        ];
        let text = encode_csv(&rows).unwrap();

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let header: Vec<String> = reader
            .headers()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(header, vec!["id", "name", "source"]);

        let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][1], awkward);
        assert_eq!(&records[1][2], "");
    }

    #[test]
    fn nested_values_are_rejected() {
        let rows = vec![row(json!({"id": 1, "tags": ["a", "b"]}))];
        assert!(matches!(
            encode_csv(&rows),
            Err(ExportError::NestedValue { column, row: 0 }) if column == "tags"
        ));
    }

    #[test]
    fn extra_columns_are_rejected() {
        let rows = vec![row(json!({"id": 1})), row(json!({"id": 2, "surprise": true}))];
        assert!(matches!(
            encode_csv(&rows),
            Err(ExportError::UnexpectedColumn { column, row: 1 }) if column == "surprise"
        ));
    }
}
