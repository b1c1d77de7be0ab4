//! Export of record sets as structured objects or delimited text.

pub mod datasets;
pub mod encoder;

use chrono::{DateTime, SecondsFormat, Utc};
use ingres_analytics_models::{ExportDataType, ExportFormat, ExportRow, StructuredExport};
use thiserror::Error;

pub use datasets::{ExportFilters, build_rows, build_simple_rows};
pub use encoder::encode_csv;

/// Client guidance attached to `excel` exports.
pub const EXCEL_NOTE: &str =
    "For Excel format, use a client-side library to convert this JSON to Excel format";

/// Errors that can occur while encoding an export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A value was an object or array.
    #[error("Column '{column}' in row {row} holds a nested value")]
    NestedValue {
        /// Column name.
        column: String,
        /// Zero-based row index.
        row: usize,
    },

    /// A row carried a key that the header (first row) lacks.
    #[error("Row {row} has column '{column}' that is not in the header")]
    UnexpectedColumn {
        /// Column name.
        column: String,
        /// Zero-based row index.
        row: usize,
    },

    /// CSV writer error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error while flushing the writer.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoded bytes were not UTF-8.
    #[error("Encoded output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// An encoded export ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedExport {
    /// Delimited text with its attachment filename.
    Csv {
        /// Attachment filename.
        filename: String,
        /// CSV body.
        body: String,
    },
    /// Structured envelope.
    Structured(StructuredExport),
}

/// Formats `time` as RFC 3339 with millisecond precision.
#[must_use]
pub fn timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Attachment filename for a CSV export produced at `time`.
#[must_use]
pub fn export_filename(data_type: ExportDataType, time: DateTime<Utc>) -> String {
    format!(
        "{}_{}.csv",
        data_type.export_name(),
        time.format("%Y-%m-%d")
    )
}

/// Encodes `rows` in `format`. `csv` yields text; `json` and `excel` yield
/// the structured envelope, with a client note for `excel`.
///
/// # Errors
///
/// Returns [`ExportError`] if the rows cannot be rendered as CSV.
pub fn encode(
    data_type: ExportDataType,
    rows: Vec<ExportRow>,
    format: ExportFormat,
    time: DateTime<Utc>,
) -> Result<EncodedExport, ExportError> {
    match format {
        ExportFormat::Csv => Ok(EncodedExport::Csv {
            filename: export_filename(data_type, time),
            body: encode_csv(&rows)?,
        }),
        ExportFormat::Json | ExportFormat::Excel => Ok(EncodedExport::Structured(StructuredExport {
            export_type: data_type.export_name().to_string(),
            timestamp: timestamp(time),
            record_count: rows.len(),
            data: rows,
            note: (format == ExportFormat::Excel).then(|| EXCEL_NOTE.to_string()),
        })),
    }
}
