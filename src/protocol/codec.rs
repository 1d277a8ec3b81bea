//! The four result encodings, plus the error body.
//!
//! Each encoding projects a [`TabularResult`] into payload bytes for one
//! response type, and each has a decode side used by the client driver:
//!
//! - Row-Table: JSON object with `columns` and nested string-array `rows`.
//! - Document: JSON array of per-row objects keyed by column name.
//! - Columnar-Binary: big-endian counts followed by length-prefixed cells
//!   in row-major order.
//! - Chunked-Stream: JSON array of ordered events (`metadata`, one `row`
//!   per result row, `end`).
//!
//! NULL handling differs by encoding and is part of the wire contract:
//! Row-Table and Columnar-Binary flatten NULL into an empty string /
//! zero-length cell, which makes NULL and `""` indistinguishable on those
//! two paths. Document and Chunked-Stream keep NULL as a true JSON null.
//! The lossy paths are pinned down by tests rather than papered over,
//! since changing them would break wire compatibility.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::table::TabularResult;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("truncated binary frame at offset {offset}: need {needed} more bytes, {available} available")]
    TruncatedBinaryFrame {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("binary cell at row {row}, column {col} is not valid UTF-8")]
    InvalidCellUtf8 { row: u32, col: u32 },
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Row-Table
// ---------------------------------------------------------------------------

/// Decoded Row-Table payload. All cells are strings; a NULL cell arrives
/// as `""` because the encoding cannot carry the distinction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn encode_row_table(result: &TabularResult) -> Result<Vec<u8>, CodecError> {
    let table = RowTable {
        columns: result.columns.clone(),
        rows: result
            .rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.clone().unwrap_or_default()).collect())
            .collect(),
    };
    Ok(serde_json::to_vec(&table)?)
}

pub fn decode_row_table(bytes: &[u8]) -> Result<RowTable, CodecError> {
    Ok(serde_json::from_slice(bytes)?)
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Encodes rows as a JSON array of objects keyed by column name, NULL
/// preserved as a JSON null. Cell values stay strings; type inference is
/// the executor's business, not the wire's.
pub fn encode_document(result: &TabularResult) -> Result<Vec<u8>, CodecError> {
    let mut documents = Vec::with_capacity(result.rows.len());
    for row in &result.rows {
        let mut object = serde_json::Map::with_capacity(result.columns.len());
        for (column, cell) in result.columns.iter().zip(row) {
            let value = match cell {
                Some(text) => serde_json::Value::String(text.clone()),
                None => serde_json::Value::Null,
            };
            object.insert(column.clone(), value);
        }
        documents.push(serde_json::Value::Object(object));
    }
    Ok(serde_json::to_vec(&serde_json::Value::Array(documents))?)
}

pub fn decode_document(bytes: &[u8]) -> Result<serde_json::Value, CodecError> {
    Ok(serde_json::from_slice(bytes)?)
}

// ---------------------------------------------------------------------------
// Columnar-Binary
// ---------------------------------------------------------------------------

/// Decoded Columnar-Binary payload. As with [`RowTable`], NULL arrives as
/// an empty cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryTable {
    pub row_count: u32,
    pub col_count: u32,
    pub rows: Vec<Vec<String>>,
}

/// `row_count` and `col_count` as big-endian `u32`, then every cell in
/// row-major order as a big-endian `u32` length followed by that many
/// bytes. NULL is written as length zero.
pub fn encode_columnar(result: &TabularResult) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(result.row_count() as u32).to_be_bytes());
    buf.extend_from_slice(&(result.column_count() as u32).to_be_bytes());

    for row in &result.rows {
        for cell in row {
            let bytes = cell.as_deref().unwrap_or("").as_bytes();
            buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
            buf.extend_from_slice(bytes);
        }
    }
    buf
}

/// Decodes a Columnar-Binary payload, validating every length against the
/// remaining buffer before reading. A declared length that runs past the
/// end aborts the decode; there is no partial recovery.
///
/// The declared counts are untrusted: decoding never allocates more than
/// the buffer itself can account for. Every cell needs at least its
/// 4-byte length prefix, so counts whose cells cannot fit in the
/// remaining bytes are rejected up front, and a zero-column payload
/// keeps its declared `row_count` without materializing per-row
/// allocations the buffer carries no bytes for.
pub fn decode_columnar(bytes: &[u8]) -> Result<BinaryTable, CodecError> {
    let mut offset = 0;
    let row_count = read_u32(bytes, &mut offset)?;
    let col_count = read_u32(bytes, &mut offset)?;

    let min_cell_bytes = (row_count as u64)
        .saturating_mul(col_count as u64)
        .saturating_mul(4);
    if min_cell_bytes > (bytes.len() - offset) as u64 {
        return Err(CodecError::TruncatedBinaryFrame {
            offset,
            needed: usize::try_from(min_cell_bytes).unwrap_or(usize::MAX),
            available: bytes.len() - offset,
        });
    }
    if col_count == 0 {
        return Ok(BinaryTable {
            row_count,
            col_count,
            rows: Vec::new(),
        });
    }

    let mut rows = Vec::new();
    for row in 0..row_count {
        let mut cells = Vec::new();
        for col in 0..col_count {
            let len = read_u32(bytes, &mut offset)? as usize;
            if bytes.len() - offset < len {
                return Err(CodecError::TruncatedBinaryFrame {
                    offset,
                    needed: len,
                    available: bytes.len() - offset,
                });
            }
            let cell = std::str::from_utf8(&bytes[offset..offset + len])
                .map_err(|_| CodecError::InvalidCellUtf8 { row, col })?;
            offset += len;
            cells.push(cell.to_string());
        }
        rows.push(cells);
    }

    Ok(BinaryTable {
        row_count,
        col_count,
        rows,
    })
}

fn read_u32(bytes: &[u8], offset: &mut usize) -> Result<u32, CodecError> {
    if bytes.len() - *offset < 4 {
        return Err(CodecError::TruncatedBinaryFrame {
            offset: *offset,
            needed: 4,
            available: bytes.len() - *offset,
        });
    }
    let value = u32::from_be_bytes([
        bytes[*offset],
        bytes[*offset + 1],
        bytes[*offset + 2],
        bytes[*offset + 3],
    ]);
    *offset += 4;
    Ok(value)
}

// ---------------------------------------------------------------------------
// Chunked-Stream
// ---------------------------------------------------------------------------

/// One event in a Chunked-Stream response.
///
/// Wire order is fixed: exactly one `Metadata`, then one `Row` per result
/// row with indices counting up from zero, then exactly one `End` whose
/// `total_rows` matches the number of row events. The whole sequence
/// ships as a single buffered payload; per-event framing would be a
/// protocol extension, not this encoding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Metadata { columns: Vec<String> },
    Row { index: u64, data: Vec<Option<String>> },
    End { total_rows: u64 },
}

pub fn encode_stream(result: &TabularResult) -> Result<Vec<u8>, CodecError> {
    let mut events = Vec::with_capacity(result.rows.len() + 2);
    events.push(StreamEvent::Metadata {
        columns: result.columns.clone(),
    });
    for (index, row) in result.rows.iter().enumerate() {
        events.push(StreamEvent::Row {
            index: index as u64,
            data: row.clone(),
        });
    }
    events.push(StreamEvent::End {
        total_rows: result.row_count() as u64,
    });
    Ok(serde_json::to_vec(&events)?)
}

pub fn decode_stream(bytes: &[u8]) -> Result<Vec<StreamEvent>, CodecError> {
    Ok(serde_json::from_slice(bytes)?)
}

// ---------------------------------------------------------------------------
// Error body
// ---------------------------------------------------------------------------

/// Wire shape of a `ResponseError` payload: a JSON object with a single
/// `error` message. No structured code exists in the format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

pub fn encode_error(message: &str) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(&ErrorBody {
        error: message.to_string(),
    })?)
}

pub fn decode_error(bytes: &[u8]) -> Result<String, CodecError> {
    let body: ErrorBody = serde_json::from_slice(bytes)?;
    Ok(body.error)
}
