//! Data types exchanged with the remote service

pub mod query;
pub mod row;
pub mod schema;
pub mod value;

pub use query::{QueryResult, Statement, UpdateResult};
pub use row::{Row, RowInput};
pub use schema::{ColumnDescriptor, ColumnType, ContainerInfo, ContainerType};
pub use value::{format_timestamp, Value};
