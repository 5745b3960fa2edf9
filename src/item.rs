//! Data item requests and the query directive the customizer attaches to them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{DataSourceDescriptor, ParamValue};

/// Named parameter values, ordered by name.
pub type Parameters = BTreeMap<String, ParamValue>;

/// A literal query whose caller-derived values travel separately from the text.
///
/// `text` holds named `:placeholders`; `parameters` maps each placeholder name
/// to its bound value. The executor hands both to the driver; values are never
/// spliced into `text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterizedQuery {
    /// SQL text with `:name` placeholders
    pub text: String,
    /// Bound values keyed by placeholder name
    #[serde(default)]
    pub parameters: Parameters,
}

/// How the executor should fetch a data item.
///
/// A single tagged value replaces the independently nullable custom-query and
/// procedure fields, so an item can never carry both.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum QueryDirective {
    /// Read the item's table as requested.
    #[default]
    Passthrough,
    /// Run a parameterized literal query instead of the table.
    LiteralQuery(ParameterizedQuery),
    /// Call a stored procedure with named parameters.
    ProcedureCall {
        /// Procedure name
        name: String,
        /// Bound values keyed by parameter name
        parameters: Parameters,
    },
}

/// One dataset requested for a dashboard visualization.
///
/// Built by the transport layer from the client payload, handed to
/// [`QueryCustomizer::customize`](crate::QueryCustomizer::customize) by value
/// and returned to be serialized back.
///
/// The `directive` is skipped on deserialization: whatever the client sends,
/// an incoming item always starts as [`QueryDirective::Passthrough`].
///
/// # Examples
///
/// ```
/// use datasource_router::{DataItemRequest, DataSourceKind, QueryDirective};
///
/// let item: DataItemRequest = serde_json::from_str(r#"{
///     "id": "Customer_Orders",
///     "table": "customer_orders",
///     "dataSource": { "kind": "mysql" },
///     "directive": { "mode": "literal_query", "text": "DROP TABLE x" }
/// }"#).unwrap();
///
/// assert_eq!(item.data_source.kind, DataSourceKind::MySql);
/// assert_eq!(item.directive, QueryDirective::Passthrough);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataItemRequest {
    /// Logical identifier from the dashboard definition
    pub id: String,
    /// Display title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Raw table or view name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Query override attached by the customizer
    #[serde(default, skip_deserializing)]
    pub directive: QueryDirective,
    /// Backend this item reads from
    pub data_source: DataSourceDescriptor,
}

impl DataItemRequest {
    /// Creates a pass-through request for `id` against `data_source`.
    pub fn new(id: impl Into<String>, data_source: DataSourceDescriptor) -> Self {
        Self {
            id: id.into(),
            title: None,
            table: None,
            directive: QueryDirective::Passthrough,
            data_source,
        }
    }

    /// Sets the table name.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// The literal query override, if any.
    pub fn custom_query(&self) -> Option<&ParameterizedQuery> {
        match &self.directive {
            QueryDirective::LiteralQuery(query) => Some(query),
            _ => None,
        }
    }

    /// The stored procedure name, if redirected.
    pub fn procedure(&self) -> Option<&str> {
        match &self.directive {
            QueryDirective::ProcedureCall { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The stored procedure parameters, if redirected.
    pub fn procedure_parameters(&self) -> Option<&Parameters> {
        match &self.directive {
            QueryDirective::ProcedureCall { parameters, .. } => Some(parameters),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DataSourceKind;
    use serde_json::json;

    fn item() -> DataItemRequest {
        DataItemRequest::new("Orders", DataSourceDescriptor::new(DataSourceKind::MySql))
    }

    #[test]
    fn passthrough_exposes_nothing() {
        let item = item();

        assert!(item.custom_query().is_none());
        assert!(item.procedure().is_none());
        assert!(item.procedure_parameters().is_none());
    }

    #[test]
    fn literal_query_exposes_only_custom_query() {
        let mut item = item();
        item.directive = QueryDirective::LiteralQuery(ParameterizedQuery {
            text: "SELECT * FROM orders WHERE customer_id = :customer".to_string(),
            parameters: Parameters::from([(
                "customer".to_string(),
                ParamValue::Text("42".to_string()),
            )]),
        });

        assert!(item.custom_query().is_some());
        assert!(item.procedure().is_none());
        assert!(item.procedure_parameters().is_none());
    }

    #[test]
    fn procedure_call_exposes_name_and_parameters() {
        let mut item = item();
        item.directive = QueryDirective::ProcedureCall {
            name: "sp_orders".to_string(),
            parameters: Parameters::new(),
        };

        assert!(item.custom_query().is_none());
        assert_eq!(item.procedure(), Some("sp_orders"));
        assert_eq!(item.procedure_parameters(), Some(&Parameters::new()));
    }

    #[test]
    fn directive_serializes_tagged() {
        let mut item = item().with_table("orders");
        item.directive = QueryDirective::ProcedureCall {
            name: "sp_orders".to_string(),
            parameters: Parameters::from([("customer".to_string(), ParamValue::Integer(42))]),
        };

        let wire = serde_json::to_value(&item).unwrap();

        assert_eq!(wire["table"], json!("orders"));
        assert_eq!(wire["dataSource"]["kind"], json!("mysql"));
        assert_eq!(
            wire["directive"],
            json!({ "mode": "procedure_call", "name": "sp_orders", "parameters": { "customer": 42 } })
        );
    }

    #[test]
    fn client_cannot_supply_directive() {
        let item: DataItemRequest = serde_json::from_value(json!({
            "id": "Orders",
            "dataSource": { "kind": "mysql" },
            "directive": { "mode": "procedure_call", "name": "sp_drop_everything", "parameters": {} }
        }))
        .unwrap();

        assert_eq!(item.directive, QueryDirective::Passthrough);
    }
}
