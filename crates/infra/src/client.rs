//! High-level client over the Web API
//!
//! [`GridClient`] ties the request executor, the row codec and the schema
//! cache together into container, row and SQL operations.

use std::sync::Arc;

use async_trait::async_trait;
use gridrest_core::{
    plan_chunks, BatchOutcome, DeleteOptions, DiagnosticsSink, RowCodec, SelectOptions,
    UpdateOptions,
};
use gridrest_domain::constants::{QUERY_TYPE_SQL_SELECT, QUERY_TYPE_TQL};
use gridrest_domain::{
    ClientOptions, ColumnDescriptor, ConnectionProfile, ContainerInfo, GridError, QueryResult,
    Result, Row, RowInput, Statement, UpdateResult, Value,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument, warn};

use crate::http::{container_path, RequestExecutor, RequestOptions};
use crate::schema_cache::{SchemaCache, SchemaSource};

const CONTAINERS_PATH: &str = "/containers";
const SQL_QUERY_PATH: &str = "/sql/dml/query";
const SQL_UPDATE_PATH: &str = "/sql/dml/update";

/// Row write semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// `POST`: fails on an existing row key
    #[default]
    Insert,
    /// `PUT`: replaces rows with an existing key
    Upsert,
}

/// Body element for `/sql/dml/*` and TQL calls
#[derive(Serialize)]
struct QueryDescriptor<'a> {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    stmt: &'a str,
    #[serde(skip_serializing_if = "no_bindings")]
    bindings: &'a [Value],
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn no_bindings(bindings: &&[Value]) -> bool {
    bindings.is_empty()
}

impl<'a> QueryDescriptor<'a> {
    fn new(kind: Option<&'static str>, statement: &'a Statement) -> Self {
        Self { kind, stmt: &statement.text, bindings: &statement.bindings }
    }
}

#[derive(Debug, Deserialize)]
struct ContainerList {
    container_names: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TqlResponse {
    #[serde(default)]
    results: Vec<QueryResult>,
}

/// Container, row and SQL operations against one database
#[derive(Debug)]
pub struct GridClient {
    executor: RequestExecutor,
    codec: RowCodec,
    schemas: SchemaCache,
}

impl GridClient {
    /// Resolve options and connect with `tracing` diagnostics.
    ///
    /// # Errors
    ///
    /// Returns `GridError::Config` for invalid options.
    pub fn new(options: impl Into<ClientOptions>) -> Result<Self> {
        Ok(Self::from_executor(RequestExecutor::new(options)?))
    }

    /// Like [`GridClient::new`] but routes every diagnostic to `sink`.
    pub fn with_diagnostics(
        options: impl Into<ClientOptions>,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Result<Self> {
        let profile = ConnectionProfile::resolve(options)?;
        let executor = RequestExecutor::builder(profile).diagnostics(sink).build()?;
        Ok(Self::from_executor(executor))
    }

    /// The codec reports through the executor's diagnostics sink.
    pub fn from_executor(executor: RequestExecutor) -> Self {
        let codec = RowCodec::new(executor.diagnostics());
        Self { executor, codec, schemas: SchemaCache::new() }
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub fn codec(&self) -> &RowCodec {
        &self.codec
    }

    pub fn schema_cache(&self) -> &SchemaCache {
        &self.schemas
    }

    // ---------------------------------------------------------------------
    // Containers
    // ---------------------------------------------------------------------

    #[instrument(skip(self, definition), fields(container = %definition.container_name))]
    pub async fn create_container(&self, definition: &ContainerInfo) -> Result<()> {
        require_name(&definition.container_name)?;
        if definition.columns.is_empty() {
            return Err(GridError::InvalidInput(format!(
                "container {} needs at least one column",
                definition.container_name
            )));
        }

        self.executor.post(CONTAINERS_PATH, RequestOptions::new().json(definition)?).await?;
        self.schemas.invalidate(&definition.container_name);
        info!("Container created");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn drop_container(&self, name: &str) -> Result<()> {
        require_name(name)?;
        self.executor.delete(&container_path(name, ""), RequestOptions::new()).await?;
        self.schemas.invalidate(name);
        info!("Container dropped");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_containers(&self) -> Result<Vec<String>> {
        let body = self.executor.get(CONTAINERS_PATH, RequestOptions::new()).await?;
        let list: ContainerList = parse_body(body, "container list")?;
        Ok(list.container_names)
    }

    #[instrument(skip(self))]
    pub async fn container_info(&self, name: &str) -> Result<ContainerInfo> {
        require_name(name)?;
        let body = self.executor.get(&container_path(name, "info"), RequestOptions::new()).await?;
        parse_body(body, "container info")
    }

    pub async fn container_exists(&self, name: &str) -> Result<bool> {
        require_name(name)?;
        self.executor.container_exists(name).await
    }

    // ---------------------------------------------------------------------
    // Schemas
    // ---------------------------------------------------------------------

    /// Column list of `name`, fetched on first use and cached until
    /// refreshed or invalidated.
    pub async fn schema(&self, name: &str) -> Result<Arc<[ColumnDescriptor]>> {
        require_name(name)?;
        self.schemas.get_or_fetch(name, &self.executor).await
    }

    pub async fn refresh_schema(&self, name: &str) -> Result<Arc<[ColumnDescriptor]>> {
        require_name(name)?;
        self.schemas.refresh(name, &self.executor).await
    }

    pub fn invalidate_schema(&self, name: &str) -> bool {
        self.schemas.invalidate(name)
    }

    // ---------------------------------------------------------------------
    // Rows
    // ---------------------------------------------------------------------

    /// Encode `rows` against the container schema and write them.
    ///
    /// Returns the row count reported by the service, or the number of rows
    /// sent when the response carries no count.
    pub async fn put_rows(&self, name: &str, rows: &[RowInput], mode: WriteMode) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let schema = self.schema(name).await?;
        self.put_rows_with_schema(name, rows, Some(&schema[..]), mode).await
    }

    pub async fn insert(&self, name: &str, rows: &[RowInput]) -> Result<u64> {
        self.put_rows(name, rows, WriteMode::Insert).await
    }

    pub async fn upsert(&self, name: &str, rows: &[RowInput]) -> Result<u64> {
        self.put_rows(name, rows, WriteMode::Upsert).await
    }

    /// Write rows with a caller-supplied schema. `None` takes the
    /// schema-less path, which orders keyed rows by insertion order and
    /// emits a warning.
    #[instrument(skip(self, rows, schema), fields(rows = rows.len()))]
    pub async fn put_rows_with_schema(
        &self,
        name: &str,
        rows: &[RowInput],
        schema: Option<&[ColumnDescriptor]>,
        mode: WriteMode,
    ) -> Result<u64> {
        require_name(name)?;
        if rows.is_empty() {
            return Ok(0);
        }

        let wire_rows = self.codec.encode_all(rows, schema);
        let path = container_path(name, "rows");
        let options = RequestOptions::new().json(&wire_rows)?;
        let body = match mode {
            WriteMode::Insert => self.executor.post(&path, options).await?,
            WriteMode::Upsert => self.executor.put(&path, options).await?,
        };

        let written = body.get("count").and_then(JsonValue::as_u64).unwrap_or(rows.len() as u64);
        debug!(written, "Rows written");
        Ok(written)
    }

    /// Insert `rows` in sequential chunks of `chunk_size`.
    ///
    /// Each chunk is awaited before the next starts. A rejected chunk is
    /// recorded in the outcome and does not stop the remaining chunks.
    ///
    /// # Errors
    ///
    /// Returns an error only when nothing could be attempted: a zero chunk
    /// size or a failed schema lookup.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn batch_insert(
        &self,
        name: &str,
        rows: &[RowInput],
        chunk_size: usize,
    ) -> Result<BatchOutcome> {
        let spans = plan_chunks(rows.len(), chunk_size)?;
        let mut outcome = BatchOutcome::default();
        if spans.is_empty() {
            return Ok(outcome);
        }

        let schema = self.schema(name).await?;
        for span in &spans {
            let chunk = &rows[span.range()];
            match self.put_rows_with_schema(name, chunk, Some(&schema[..]), WriteMode::Insert).await {
                Ok(_) => outcome.record_success(span),
                Err(err) => {
                    warn!(chunk = span.index, offset = span.offset, error = %err, "Chunk rejected");
                    outcome.record_failure(span, err.to_string());
                }
            }
        }

        if outcome.is_complete_success() {
            info!(succeeded = outcome.succeeded, "Batch insert successful");
        } else {
            warn!(
                succeeded = outcome.succeeded,
                failed = outcome.failed,
                "Batch insert completed with errors"
            );
        }
        Ok(outcome)
    }

    // ---------------------------------------------------------------------
    // SQL / TQL
    // ---------------------------------------------------------------------

    /// Run one assembled SELECT and return keyed rows.
    pub async fn select(&self, options: &SelectOptions) -> Result<Vec<Row>> {
        let result = self.select_result(options).await?;
        Ok(RowCodec::decode_result(&result))
    }

    /// Like [`GridClient::select`], also converting timestamp and blob
    /// columns back into typed values.
    pub async fn select_typed(&self, options: &SelectOptions) -> Result<Vec<Row>> {
        let result = self.select_result(options).await?;
        Ok(RowCodec::decode_result_typed(&result))
    }

    async fn select_result(&self, options: &SelectOptions) -> Result<QueryResult> {
        let statement = options.build()?;
        let mut results = self.sql_query(std::slice::from_ref(&statement)).await?;
        Ok(if results.is_empty() { QueryResult::default() } else { results.swap_remove(0) })
    }

    /// Run SELECT statements; one result per statement.
    #[instrument(skip(self, statements), fields(count = statements.len()))]
    pub async fn sql_query(&self, statements: &[Statement]) -> Result<Vec<QueryResult>> {
        let descriptors: Vec<_> = statements
            .iter()
            .map(|s| QueryDescriptor::new(Some(QUERY_TYPE_SQL_SELECT), s))
            .collect();
        let body =
            self.executor.post(SQL_QUERY_PATH, RequestOptions::new().json(&descriptors)?).await?;
        parse_body(body, "query results")
    }

    /// Run INSERT/UPDATE/DELETE statements; one result per statement.
    #[instrument(skip(self, statements), fields(count = statements.len()))]
    pub async fn sql_update(&self, statements: &[Statement]) -> Result<Vec<UpdateResult>> {
        let descriptors: Vec<_> =
            statements.iter().map(|s| QueryDescriptor::new(None, s)).collect();
        let body =
            self.executor.post(SQL_UPDATE_PATH, RequestOptions::new().json(&descriptors)?).await?;
        parse_body(body, "update results")
    }

    /// Returns the number of updated rows.
    pub async fn update(&self, options: &UpdateOptions) -> Result<u64> {
        let statement = options.build()?;
        self.affected_rows(statement).await
    }

    /// Returns the number of deleted rows.
    pub async fn delete(&self, options: &DeleteOptions) -> Result<u64> {
        let statement = options.build()?;
        self.affected_rows(statement).await
    }

    async fn affected_rows(&self, statement: Statement) -> Result<u64> {
        let results = self.sql_update(std::slice::from_ref(&statement)).await?;
        Ok(results.iter().map(|r| r.updated_rows).sum())
    }

    /// Run a TQL statement against one container.
    #[instrument(skip(self, stmt))]
    pub async fn tql(&self, name: &str, stmt: &str) -> Result<Vec<QueryResult>> {
        require_name(name)?;
        let statement = Statement::new(stmt);
        let descriptor = QueryDescriptor::new(Some(QUERY_TYPE_TQL), &statement);
        let body = self
            .executor
            .post(&container_path(name, "tql"), RequestOptions::new().json(&descriptor)?)
            .await?;
        let response: TqlResponse = parse_body(body, "TQL results")?;
        Ok(response.results)
    }
}

#[async_trait]
impl SchemaSource for RequestExecutor {
    async fn fetch_schema(&self, container: &str) -> Result<Vec<ColumnDescriptor>> {
        let body = self.get(&container_path(container, "info"), RequestOptions::new()).await?;
        let info: ContainerInfo = parse_body(body, "container info")?;
        Ok(info.columns)
    }
}

fn require_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(GridError::InvalidInput("container name must not be empty".into()));
    }
    Ok(())
}

fn parse_body<T: DeserializeOwned>(body: JsonValue, what: &str) -> Result<T> {
    serde_json::from_value(body)
        .map_err(|e| GridError::UnexpectedResponse(format!("malformed {what}: {e}")))
}
