//! Abstract store surface for keyplan
//!
//! Typed values, one request/response shape per store operation, the
//! blocking client seam, and the error taxonomy with its distinguished
//! retryable class. Nothing in this module performs I/O.

mod client;
mod errors;
mod request;
mod response;
mod table;
mod value;

pub use client::StoreClient;
pub use errors::{StoreError, StoreResult};
pub use request::{
    BatchGetRequest, DeleteItemRequest, NamePlaceholders, PointGetRequest, PutItemRequest,
    QueryRequest, ScanRequest, StoreRequest, UpdateItemRequest, ValuePlaceholders,
};
pub use response::{BatchPayload, Page, StoreResponse};
pub use table::{
    AttributeDefinition, KeyAttributeType, KeySchema, ProjectionKind, SecondaryIndexDefinition,
    SecondaryIndexDescription, TableChanges, TableDefinition, TableDescription, TableStatus,
};
pub use value::{item, AttributeValue, Item};
