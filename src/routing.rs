//! The declarative routing policy.
//!
//! A [`RoutingTable`] maps data item ids (or table names) to a
//! [`RouteOutcome`]. It is compiled from [`RouteSpec`] entries at load time,
//! where every ambiguity is rejected, so request handling never has to pick
//! between conflicting rules.
//!
//! # Example
//!
//! ```
//! use datasource_router::{RouteOutcome, RoutingTable};
//!
//! let table: RoutingTable = serde_json::from_str(r#"[
//!     { "id": "sp_Customer_Orders", "procedure": "sp_customer_orders",
//!       "params": [ { "name": "customer", "source": "user_id" } ] }
//! ]"#).unwrap();
//!
//! assert!(matches!(
//!     table.lookup("sp_Customer_Orders", None),
//!     Some(RouteOutcome::Procedure { .. })
//! ));
//! assert!(table.lookup("unregistered_id", None).is_none());
//! ```

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigErrorKind};

/// Where a bound parameter takes its value from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamSource {
    /// The caller's user id
    UserId,
    /// The id of the dashboard being served
    DashboardId,
    /// A named claim on the user context
    Property(String),
}

/// A named parameter and its value source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamSpec {
    /// Placeholder or procedure parameter name
    pub name: String,
    /// Value source
    pub source: ParamSource,
}

impl ParamSpec {
    /// Creates a parameter spec.
    pub fn new(name: impl Into<String>, source: ParamSource) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

/// One routing rule as written in settings.
///
/// Exactly one of `id`/`table` keys the rule and exactly one of
/// `query`/`procedure`/`reject` gives its outcome. [`RoutingTable`] enforces
/// both when it compiles the rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteSpec {
    /// Data item id this rule matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Table or view name this rule matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Literal query text with `:name` placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Stored procedure name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure: Option<String>,
    /// Refuse to serve the item
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reject: bool,
    /// Parameters bound from the request
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamSpec>,
}

/// What a matched item turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Replace the item with a parameterized literal query.
    Literal {
        /// Query text with `:name` placeholders
        text: String,
        /// Parameters, one per distinct placeholder
        params: Vec<ParamSpec>,
    },
    /// Redirect the item to a stored procedure.
    Procedure {
        /// Procedure name
        name: String,
        /// Parameters passed by name
        params: Vec<ParamSpec>,
    },
    /// Do not serve the item at all.
    Reject,
}

impl RouteOutcome {
    /// Short name used in logs.
    pub fn mode(&self) -> &'static str {
        match self {
            RouteOutcome::Literal { .. } => "literal_query",
            RouteOutcome::Procedure { .. } => "procedure_call",
            RouteOutcome::Reject => "reject",
        }
    }
}

/// Compiled routing policy, keyed by item id and by table name.
///
/// Lookups try the item id first, then the table name. Items matching
/// neither pass through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<RouteSpec>")]
pub struct RoutingTable {
    by_id: HashMap<String, RouteOutcome>,
    by_table: HashMap<String, RouteOutcome>,
}

impl RoutingTable {
    /// Compiles routing rules.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a rule:
    /// - is keyed by neither or both of `id` and `table` (`InvalidRouteKey`)
    /// - declares more than one outcome, or repeats an already routed key (`AmbiguousRoute`)
    /// - declares no outcome (`MissingOutcome`)
    /// - has placeholders that do not match its params, or malformed or
    ///   duplicate param names (`InvalidTemplate`)
    pub fn from_specs(specs: impl IntoIterator<Item = RouteSpec>) -> Result<Self, ConfigError> {
        let mut table = RoutingTable::default();

        for spec in specs {
            let (key, outcome) = compile(spec)?;
            let (map, label) = match &key {
                RouteKey::Id(_) => (&mut table.by_id, "id"),
                RouteKey::Table(_) => (&mut table.by_table, "table"),
            };
            let name = key.into_name();
            if map.contains_key(&name) {
                return Err(ConfigError::new(
                    ConfigErrorKind::AmbiguousRoute,
                    format!("{} '{}' is routed more than once", label, name),
                ));
            }
            map.insert(name, outcome);
        }

        Ok(table)
    }

    /// Finds the outcome for an item, by id first and then by table.
    pub fn lookup(&self, id: &str, table: Option<&str>) -> Option<&RouteOutcome> {
        self.by_id
            .get(id)
            .or_else(|| table.and_then(|t| self.by_table.get(t)))
    }

    /// Number of compiled rules.
    pub fn len(&self) -> usize {
        self.by_id.len() + self.by_table.len()
    }

    /// Returns true if no rules are configured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TryFrom<Vec<RouteSpec>> for RoutingTable {
    type Error = ConfigError;

    fn try_from(specs: Vec<RouteSpec>) -> Result<Self, Self::Error> {
        RoutingTable::from_specs(specs)
    }
}

enum RouteKey {
    Id(String),
    Table(String),
}

impl RouteKey {
    fn into_name(self) -> String {
        match self {
            RouteKey::Id(name) | RouteKey::Table(name) => name,
        }
    }
}

fn compile(spec: RouteSpec) -> Result<(RouteKey, RouteOutcome), ConfigError> {
    let key = match (spec.id, spec.table) {
        (Some(id), None) if !id.is_empty() => RouteKey::Id(id),
        (None, Some(table)) if !table.is_empty() => RouteKey::Table(table),
        (None, None) => {
            return Err(ConfigError::new(
                ConfigErrorKind::InvalidRouteKey,
                "route has neither an id nor a table",
            ))
        }
        (Some(_), Some(_)) => {
            return Err(ConfigError::new(
                ConfigErrorKind::InvalidRouteKey,
                "route has both an id and a table",
            ))
        }
        _ => {
            return Err(ConfigError::new(
                ConfigErrorKind::InvalidRouteKey,
                "route key is empty",
            ))
        }
    };
    let label = match &key {
        RouteKey::Id(id) => format!("id '{}'", id),
        RouteKey::Table(table) => format!("table '{}'", table),
    };

    let declared = [spec.query.is_some(), spec.procedure.is_some(), spec.reject]
        .iter()
        .filter(|set| **set)
        .count();
    if declared > 1 {
        return Err(ConfigError::new(
            ConfigErrorKind::AmbiguousRoute,
            format!("route for {} declares more than one of query, procedure, reject", label),
        ));
    }

    check_param_names(&label, &spec.params)?;

    let outcome = match (spec.query, spec.procedure) {
        (Some(text), None) => {
            if let Some(param) = spec.params.iter().find(|p| p.name.starts_with('@')) {
                return Err(ConfigError::new(
                    ConfigErrorKind::InvalidTemplate,
                    format!(
                        "route for {} names param '{}' with '@', which only procedure params may use; literal queries bind ':name'",
                        label, param.name
                    ),
                ));
            }
            check_placeholders(&label, &text, &spec.params)?;
            RouteOutcome::Literal {
                text,
                params: spec.params,
            }
        }
        (None, Some(name)) => {
            if name.trim().is_empty() {
                return Err(ConfigError::new(
                    ConfigErrorKind::InvalidTemplate,
                    format!("route for {} has an empty procedure name", label),
                ));
            }
            RouteOutcome::Procedure {
                name,
                params: spec.params,
            }
        }
        _ if spec.reject => {
            if !spec.params.is_empty() {
                return Err(ConfigError::new(
                    ConfigErrorKind::InvalidTemplate,
                    format!("rejecting route for {} declares params", label),
                ));
            }
            RouteOutcome::Reject
        }
        _ => {
            return Err(ConfigError::new(
                ConfigErrorKind::MissingOutcome,
                format!("route for {} declares no query, procedure or reject", label),
            ))
        }
    };

    Ok((key, outcome))
}

fn is_param_name(name: &str) -> bool {
    let name = name.strip_prefix('@').unwrap_or(name);
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_param_names(label: &str, params: &[ParamSpec]) -> Result<(), ConfigError> {
    let mut seen = BTreeSet::new();
    for param in params {
        if !is_param_name(&param.name) {
            return Err(ConfigError::new(
                ConfigErrorKind::InvalidTemplate,
                format!("route for {} has malformed param name '{}'", label, param.name),
            ));
        }
        if !seen.insert(param.name.as_str()) {
            return Err(ConfigError::new(
                ConfigErrorKind::InvalidTemplate,
                format!("route for {} declares param '{}' twice", label, param.name),
            ));
        }
    }
    Ok(())
}

fn check_placeholders(label: &str, text: &str, params: &[ParamSpec]) -> Result<(), ConfigError> {
    let used = placeholders(text);
    let declared: BTreeSet<&str> = params.iter().map(|p| p.name.as_str()).collect();

    if let Some(missing) = used.iter().find(|name| !declared.contains(name.as_str())) {
        return Err(ConfigError::new(
            ConfigErrorKind::InvalidTemplate,
            format!("route for {} uses undeclared placeholder ':{}'", label, missing),
        ));
    }
    if let Some(unused) = declared.iter().find(|name| !used.contains(**name)) {
        return Err(ConfigError::new(
            ConfigErrorKind::InvalidTemplate,
            format!("route for {} declares param '{}' that the query never uses", label, unused),
        ));
    }
    Ok(())
}

/// Collects `:name` placeholders, skipping quoted text, comments and `::` casts.
///
/// Inside `'...'` and `"..."` a backslash escapes the next character.
pub(crate) fn placeholders(text: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    let mut chars = text.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if c == '\\' && q != '`' {
                chars.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '-' if chars.peek() == Some(&'-') => {
                for n in chars.by_ref() {
                    if n == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
            }
            ':' if chars.peek() == Some(&':') => {
                chars.next();
            }
            ':' => {
                let mut name = String::new();
                while let Some(&n) = chars.peek() {
                    let valid = if name.is_empty() {
                        n.is_ascii_alphabetic() || n == '_'
                    } else {
                        n.is_ascii_alphanumeric() || n == '_'
                    };
                    if !valid {
                        break;
                    }
                    name.push(n);
                    chars.next();
                }
                if !name.is_empty() {
                    found.insert(name);
                }
            }
            _ => {}
        }
    }

    found
}
