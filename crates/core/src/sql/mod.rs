//! SQL statement assembly
//!
//! Builds SELECT / UPDATE / DELETE text for the `/sql/dml/*` endpoints.
//! Values always travel in [`Statement::bindings`] as `?` placeholders and
//! are never spliced into the statement text.

use gridrest_domain::{impl_wire_name_conversions, GridError, Result, Statement, Value};

/// ORDER BY direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl_wire_name_conversions!(SortOrder {
    Asc => "ASC",
    Desc => "DESC",
});

/// Options for a single-container SELECT
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectOptions {
    pub container: String,
    pub columns: Vec<String>,
    pub where_clause: Option<String>,
    pub bindings: Vec<Value>,
    pub order_by: Option<String>,
    pub order: SortOrder,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectOptions {
    pub fn new(container: impl Into<String>) -> Self {
        Self { container: container.into(), ..Self::default() }
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the WHERE clause (without the keyword) and its bindings.
    pub fn filter(mut self, clause: impl Into<String>, bindings: Vec<Value>) -> Self {
        self.where_clause = Some(clause.into());
        self.bindings = bindings;
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some(column.into());
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn build(&self) -> Result<Statement> {
        require_container(&self.container)?;

        let projection =
            if self.columns.is_empty() { "*".to_owned() } else { self.columns.join(", ") };
        let mut text = format!("SELECT {projection} FROM {}", self.container);

        push_where(&mut text, self.where_clause.as_deref());
        if let Some(column) = non_blank(self.order_by.as_deref()) {
            text.push_str(&format!(" ORDER BY {column} {}", self.order));
        }
        if let Some(limit) = self.limit {
            text.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            text.push_str(&format!(" OFFSET {offset}"));
        }

        Ok(Statement::new(text).with_bindings(self.bindings.clone()))
    }
}

/// Options for an UPDATE over one container
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOptions {
    pub container: String,
    pub set: Vec<(String, Value)>,
    pub where_clause: Option<String>,
    pub bindings: Vec<Value>,
}

impl UpdateOptions {
    pub fn new(container: impl Into<String>) -> Self {
        Self { container: container.into(), ..Self::default() }
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.push((column.into(), value.into()));
        self
    }

    pub fn filter(mut self, clause: impl Into<String>, bindings: Vec<Value>) -> Self {
        self.where_clause = Some(clause.into());
        self.bindings = bindings;
        self
    }

    /// SET values are bound ahead of the WHERE bindings.
    pub fn build(&self) -> Result<Statement> {
        require_container(&self.container)?;
        if self.set.is_empty() {
            return Err(GridError::InvalidInput(format!(
                "UPDATE on {} needs at least one column to set",
                self.container
            )));
        }

        let assignments: Vec<String> =
            self.set.iter().map(|(column, _)| format!("{column} = ?")).collect();
        let mut text = format!("UPDATE {} SET {}", self.container, assignments.join(", "));
        push_where(&mut text, self.where_clause.as_deref());

        let bindings = self
            .set
            .iter()
            .map(|(_, value)| value.clone())
            .chain(self.bindings.iter().cloned())
            .collect();

        Ok(Statement::new(text).with_bindings(bindings))
    }
}

/// Options for a DELETE over one container
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteOptions {
    pub container: String,
    pub where_clause: Option<String>,
    pub bindings: Vec<Value>,
}

impl DeleteOptions {
    pub fn new(container: impl Into<String>) -> Self {
        Self { container: container.into(), ..Self::default() }
    }

    pub fn filter(mut self, clause: impl Into<String>, bindings: Vec<Value>) -> Self {
        self.where_clause = Some(clause.into());
        self.bindings = bindings;
        self
    }

    pub fn build(&self) -> Result<Statement> {
        require_container(&self.container)?;

        let mut text = format!("DELETE FROM {}", self.container);
        push_where(&mut text, self.where_clause.as_deref());

        Ok(Statement::new(text).with_bindings(self.bindings.clone()))
    }
}

fn require_container(container: &str) -> Result<()> {
    if container.trim().is_empty() {
        return Err(GridError::InvalidInput("container name must not be empty".into()));
    }
    Ok(())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn push_where(text: &mut String, clause: Option<&str>) {
    if let Some(clause) = non_blank(clause) {
        text.push_str(&format!(" WHERE {clause}"));
    }
}
