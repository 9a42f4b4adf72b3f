//! Row codec
//!
//! Converts between keyed [`Row`]s and the positional wire rows the remote
//! API requires, applying per-type coercion on the way out.
//!
//! Always pass the container schema when encoding keyed rows. Without it
//! the encoder falls back to the row's insertion order as column order,
//! which is only correct if the caller happened to insert keys in the
//! container's column order. That path is kept for compatibility and
//! reports a [`Diagnostic::SchemaMissing`] warning every time it is taken.

mod coerce;

use std::sync::Arc;

use gridrest_domain::{ColumnDescriptor, QueryResult, Row, RowInput, Value};

pub use self::coerce::{coerce, coerce_generic, convert_from_wire};
use crate::diagnostics_ports::{Diagnostic, DiagnosticsSink, NoopDiagnostics};

/// Schema-aware row encoder/decoder
#[derive(Clone)]
pub struct RowCodec {
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl Default for RowCodec {
    fn default() -> Self {
        Self::new(Arc::new(NoopDiagnostics))
    }
}

impl std::fmt::Debug for RowCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowCodec").finish_non_exhaustive()
    }
}

impl RowCodec {
    pub fn new(diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        Self { diagnostics }
    }

    /// Encode one row into wire order.
    ///
    /// - `Positional` input is returned unchanged.
    /// - With a schema: one value per descriptor, in descriptor order;
    ///   missing keys become `Null`.
    /// - Without a schema: values in insertion order with generic coercion,
    ///   plus a `SchemaMissing` warning.
    pub fn encode(&self, input: &RowInput, schema: Option<&[ColumnDescriptor]>) -> Vec<Value> {
        match (input, schema) {
            (RowInput::Positional(values), _) => values.clone(),
            (RowInput::Keyed(row), Some(schema)) => encode_with_schema(row, schema),
            (RowInput::Keyed(row), None) => {
                self.warn_schema_missing(row);
                encode_without_schema(row)
            }
        }
    }

    /// Encode several rows. The schema-less warning is reported once per
    /// call rather than once per row.
    pub fn encode_all(
        &self,
        inputs: &[RowInput],
        schema: Option<&[ColumnDescriptor]>,
    ) -> Vec<Vec<Value>> {
        if schema.is_none() {
            if let Some(RowInput::Keyed(first)) =
                inputs.iter().find(|input| matches!(input, RowInput::Keyed(_)))
            {
                self.warn_schema_missing(first);
            }
        }

        inputs
            .iter()
            .map(|input| match (input, schema) {
                (RowInput::Positional(values), _) => values.clone(),
                (RowInput::Keyed(row), Some(schema)) => encode_with_schema(row, schema),
                (RowInput::Keyed(row), None) => encode_without_schema(row),
            })
            .collect()
    }

    /// Zip a wire row against column names.
    ///
    /// A missing wire row yields an empty row. A short wire row yields
    /// `Null` for the unmatched trailing columns; extra values are ignored.
    pub fn decode<S: AsRef<str>>(wire_row: Option<&[Value]>, column_names: &[S]) -> Row {
        let Some(values) = wire_row else {
            return Row::new();
        };

        let mut row = Row::with_capacity(column_names.len());
        for (position, name) in column_names.iter().enumerate() {
            row.insert(name.as_ref(), values.get(position).cloned().unwrap_or_default());
        }
        row
    }

    /// Decode every row of a query result using its own column list.
    pub fn decode_result(result: &QueryResult) -> Vec<Row> {
        let names = result.column_names();
        result.results.iter().map(|values| Self::decode(Some(values.as_slice()), &names)).collect()
    }

    /// Decode a query result and apply [`convert_from_wire`] to every value
    /// using the declared column types.
    pub fn decode_result_typed(result: &QueryResult) -> Vec<Row> {
        result
            .results
            .iter()
            .map(|values| {
                result
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(position, column)| {
                        let raw = values.get(position).cloned().unwrap_or_default();
                        (column.name.clone(), convert_from_wire(raw, &column.column_type))
                    })
                    .collect()
            })
            .collect()
    }

    fn warn_schema_missing(&self, row: &Row) {
        self.diagnostics.emit(&Diagnostic::SchemaMissing {
            columns: row.keys().map(str::to_owned).collect(),
        });
    }
}

fn encode_with_schema(row: &Row, schema: &[ColumnDescriptor]) -> Vec<Value> {
    schema
        .iter()
        .map(|column| {
            row.get(&column.name).map_or(Value::Null, |value| coerce(value, &column.column_type))
        })
        .collect()
}

fn encode_without_schema(row: &Row) -> Vec<Value> {
    row.values().map(coerce_generic).collect()
}
