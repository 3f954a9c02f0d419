//! Wire types and value codec for the Firekit REST client.
//!
//! This crate provides:
//! - The tagged wire value union and its serde representation
//! - Typed and dynamic value codecs (`ToWireValue` / `FromWireValue`,
//!   `encode_json` / `decode_json`)
//! - The document envelope with id and metadata extraction
//! - Structured query wire types

pub mod document;
pub mod query;
pub mod value;

pub use document::{Document, ListDocumentsResponse, QueryResultEnvelope};
pub use query::{
    CollectionSelector, CompositeFilter, FieldFilter, FieldReference, Filter, Order, Projection,
    RunQueryRequest, StructuredQuery,
};
pub use value::{
    decode_fields, decode_json, encode_fields, encode_json, format_timestamp, parse_timestamp,
    ArrayValue, Blob, FromWireValue, MapValue, ToWireValue, WireValue,
};
