//! Structured query builder.
//!
//! Accumulates filter/order/limit/offset/projection clauses and compiles them
//! into one `runQuery` payload. Validation happens at the offending builder
//! call; compiling consumes the builder, so a query cannot be mutated after
//! it is compiled or executed twice with divergent clauses.

use reqwest::Method;
use tracing::debug;

use firekit_wire::{
    CollectionSelector, Document, FieldFilter, FieldReference, Filter, Order, Projection,
    QueryResultEnvelope, RunQueryRequest, StructuredQuery, ToWireValue,
};

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::transport::{ApiRequest, CredentialMode, Transport};

/// The fixed operator set, mapped 1:1 to wire operator names.
fn wire_operator(op: &str) -> Option<&'static str> {
    Some(match op {
        "==" => "EQUAL",
        "!=" => "NOT_EQUAL",
        "<" => "LESS_THAN",
        "<=" => "LESS_THAN_OR_EQUAL",
        ">" => "GREATER_THAN",
        ">=" => "GREATER_THAN_OR_EQUAL",
        "array-contains" => "ARRAY_CONTAINS",
        "array-contains-any" => "ARRAY_CONTAINS_ANY",
        "in" => "IN",
        "not-in" => "NOT_IN",
        _ => return None,
    })
}

/// Builder for one collection query.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    collection_path: String,
    filters: Vec<FieldFilter>,
    orders: Vec<Order>,
    limit: Option<i32>,
    offset: Option<i32>,
    projection: Option<Vec<String>>,
}

impl QueryBuilder {
    /// Query the given collection path (nested paths like
    /// `users/alice/posts` are allowed).
    pub fn new(collection_path: impl Into<String>) -> Self {
        Self {
            collection_path: collection_path.into(),
            filters: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            projection: None,
        }
    }

    /// Append a field filter. Several filters are ANDed at compile time.
    ///
    /// Unknown operators fail here, not at execution.
    pub fn filter(mut self, field: &str, op: &str, value: impl ToWireValue) -> Result<Self> {
        if field.is_empty() {
            return Err(Error::validation("filter field path must not be empty"));
        }
        let wire_op = wire_operator(op)
            .ok_or_else(|| Error::validation(format!("unknown filter operator: {:?}", op)))?;

        self.filters.push(FieldFilter {
            field: FieldReference::new(field),
            op: wire_op.to_string(),
            value: value.to_wire_value(),
        });
        Ok(self)
    }

    /// Append a sort key; the first call is the primary key.
    pub fn order_by(mut self, field: &str, direction: &str) -> Result<Self> {
        if field.is_empty() {
            return Err(Error::validation("order field path must not be empty"));
        }
        let direction = match direction.to_ascii_lowercase().as_str() {
            "asc" => "ASCENDING",
            "desc" => "DESCENDING",
            other => {
                return Err(Error::validation(format!(
                    "sort direction must be \"asc\" or \"desc\", got {:?}",
                    other
                )))
            }
        };

        self.orders.push(Order {
            field: FieldReference::new(field),
            direction: direction.to_string(),
        });
        Ok(self)
    }

    /// Cap the result count. Last call wins.
    pub fn limit(mut self, n: i32) -> Self {
        self.limit = Some(n);
        self
    }

    /// Skip the first `n` results. Last call wins.
    pub fn offset(mut self, n: i32) -> Self {
        self.offset = Some(n);
        self
    }

    /// Project only the given fields. Overwrites any previous projection.
    pub fn select(mut self, fields: &[&str]) -> Self {
        self.projection = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Split the collection path into parent segment and collection id.
    fn split_path(&self) -> (Option<&str>, &str) {
        match self.collection_path.rsplit_once('/') {
            Some((parent, collection)) => (Some(parent), collection),
            None => (None, self.collection_path.as_str()),
        }
    }

    /// Compile the accumulated clauses into one immutable wire payload.
    ///
    /// A single filter is sent unwrapped; several are AND-composed.
    pub fn compile(self) -> (String, StructuredQuery) {
        let (parent, collection_id) = {
            let (parent, collection_id) = self.split_path();
            (
                parent.map(str::to_string).unwrap_or_default(),
                collection_id.to_string(),
            )
        };

        let mut filters = self.filters;
        let filter = match filters.len() {
            0 => None,
            1 => filters.pop().map(Filter::field),
            _ => Some(Filter::and(filters.into_iter().map(Filter::field).collect())),
        };

        let query = StructuredQuery {
            from: vec![CollectionSelector {
                collection_id,
                all_descendants: None,
            }],
            filter,
            order_by: (!self.orders.is_empty()).then_some(self.orders),
            limit: self.limit,
            offset: self.offset,
            select: self.projection.map(|fields| Projection {
                fields: fields.into_iter().map(FieldReference::new).collect(),
            }),
        };

        (parent, query)
    }

    /// Compile and execute, returning matching documents in result order.
    ///
    /// No matches is an empty vector, not an error.
    pub async fn run(self, transport: &Transport, conn: &Connection) -> Result<Vec<Document>> {
        let (parent, query) = self.compile();

        let url = if parent.is_empty() {
            format!("{}:runQuery", conn.firestore_url())
        } else {
            format!("{}/{}:runQuery", conn.firestore_url(), parent)
        };

        let bearer = conn.fresh_bearer(transport).await?;
        let request = RunQueryRequest {
            structured_query: query,
        };

        let req = ApiRequest::new("run_query", Method::POST, url)
            .json(serde_json::to_value(&request)?)
            .credential(Some(bearer), CredentialMode::BearerHeader);

        let body = transport.request(req).await?;
        let envelopes: Vec<QueryResultEnvelope> = serde_json::from_value(body)?;

        let documents: Vec<Document> = envelopes
            .into_iter()
            .filter_map(|e| e.document)
            .collect();
        debug!(count = documents.len(), "query returned");
        Ok(documents)
    }
}

// =============================================================================
// Tests
// =============================================================================
