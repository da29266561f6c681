//! Query-string translation: filters, projection, sort and pagination
//!
//! A listing request such as
//!
//! ```text
//! GET /api/v1/books?rating[gte]=4&location[city]=Boston&select=author,rating&sort=-rating&page=2&limit=10
//! ```
//!
//! is translated into a [`ListingQuery`]: a typed [`Filter`] made of
//! [`ComparisonClause`]s, an optional [`Projection`], a [`SortSpec`] and a
//! [`PaginationWindow`]. Stores consume the typed query directly; the public
//! vocabulary (`gt`, `gte`, `lt`, `lte`, `in`) never depends on a backend's
//! operator syntax.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;

use crate::core::book::{Book, CREATED_AT};
use crate::core::error::{CatalogError, CatalogResult};
use crate::core::field::{FieldKind, FieldValue};

/// Parameters that shape the query instead of filtering it
pub const RESERVED_KEYS: [&str; 4] = ["select", "sort", "page", "limit"];

/// Page used when `page` is absent or not a positive integer
pub const DEFAULT_PAGE: u64 = 1;

/// Page size used when `limit` is absent or not a positive integer
pub const DEFAULT_LIMIT: u64 = 100;

// =============================================================================
// Request
// =============================================================================

/// Raw listing parameters, in the order they were received
///
/// Repeated keys accumulate their values.
#[derive(Debug, Clone, Default)]
pub struct ListingFilterRequest {
    raw: IndexMap<String, Vec<String>>,
}

impl ListingFilterRequest {
    /// Build from decoded `(key, value)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut raw: IndexMap<String, Vec<String>> = IndexMap::new();
        for (key, value) in pairs {
            raw.entry(key.into()).or_default().push(value.into());
        }
        Self { raw }
    }

    /// First value of a parameter
    pub fn first(&self, key: &str) -> Option<&str> {
        self.raw
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Parameters that become filter clauses
    pub fn filter_parameters(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.raw
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    /// Translate into a typed store query
    pub fn translate(&self) -> CatalogResult<ListingQuery> {
        let mut clauses = Vec::new();
        for (key, values) in self.filter_parameters() {
            let (field, operator) = parse_filter_key(key)?;
            clauses.extend(build_clauses(&field, operator, values)?);
        }

        Ok(ListingQuery {
            filter: Filter { clauses },
            projection: self.first("select").and_then(Projection::parse),
            sort: self
                .first("sort")
                .and_then(SortSpec::parse)
                .unwrap_or_default(),
            window: PaginationWindow::new(
                parse_positive(self.first("page")).unwrap_or(DEFAULT_PAGE),
                parse_positive(self.first("limit")).unwrap_or(DEFAULT_LIMIT),
            ),
        })
    }
}

/// Everything a store needs to run a listing
#[derive(Debug, Clone, Default)]
pub struct ListingQuery {
    pub filter: Filter,
    pub projection: Option<Projection>,
    pub sort: SortSpec,
    pub window: PaginationWindow,
}

// =============================================================================
// Filter
// =============================================================================

/// Comparison operators accepted in `field[op]` keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl Operator {
    /// Recognize a bracket keyword; anything else is part of the field name
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "gt" => Some(Operator::Gt),
            "gte" => Some(Operator::Gte),
            "lt" => Some(Operator::Lt),
            "lte" => Some(Operator::Lte),
            "in" => Some(Operator::In),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::In => "in",
        }
    }
}

/// Right-hand side of a clause
#[derive(Debug, Clone, PartialEq)]
pub enum ClauseValue {
    Scalar(FieldValue),
    List(Vec<FieldValue>),
}

/// One `field operator value` condition
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonClause {
    /// Dotted attribute path
    pub field: String,
    pub operator: Operator,
    pub value: ClauseValue,
}

impl ComparisonClause {
    /// Evaluate against a stored record in its JSON form
    ///
    /// Array-valued attributes match when any element matches, as document
    /// stores do.
    pub fn matches(&self, record: &Value) -> bool {
        let Some(stored) = lookup_path(record, &self.field) else {
            return false;
        };
        match stored {
            Value::Array(items) => items.iter().any(|item| self.matches_value(item)),
            other => self.matches_value(other),
        }
    }

    fn matches_value(&self, stored: &Value) -> bool {
        match (&self.operator, &self.value) {
            (Operator::In, ClauseValue::List(options)) => options
                .iter()
                .any(|option| option.compare_json(stored) == Some(Ordering::Equal)),
            (op, ClauseValue::Scalar(value)) => {
                let Some(ordering) = value.compare_json(stored) else {
                    return false;
                };
                match op {
                    Operator::Eq | Operator::In => ordering == Ordering::Equal,
                    Operator::Gt => ordering == Ordering::Greater,
                    Operator::Gte => ordering != Ordering::Less,
                    Operator::Lt => ordering == Ordering::Less,
                    Operator::Lte => ordering != Ordering::Greater,
                }
            }
            (_, ClauseValue::List(_)) => false,
        }
    }
}

/// Conjunction of clauses; empty matches everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub clauses: Vec<ComparisonClause>,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, record: &Value) -> bool {
        self.clauses.iter().all(|clause| clause.matches(record))
    }
}

/// Split `location[city][in]` into (`location.city`, `In`)
///
/// The trailing bracket segment is an operator only if it is one of the
/// recognized keywords; other segments extend the path.
fn parse_filter_key(key: &str) -> CatalogResult<(String, Operator)> {
    let malformed = |reason: &str| CatalogError::InvalidQuery {
        message: format!("malformed filter '{}': {}", key, reason),
    };

    let (base, mut rest) = match key.find('[') {
        Some(idx) => (&key[..idx], &key[idx..]),
        None => (key, ""),
    };
    if base.is_empty() || base.contains(']') {
        return Err(malformed("missing field name"));
    }
    if base.starts_with('$') {
        return Err(malformed("field names cannot start with '$'"));
    }

    let mut segments: Vec<&str> = vec![base];
    while !rest.is_empty() {
        let Some(inner) = rest.strip_prefix('[') else {
            return Err(malformed("unexpected text after ']'"));
        };
        let Some(close) = inner.find(']') else {
            return Err(malformed("unbalanced '['"));
        };
        let segment = &inner[..close];
        if segment.is_empty() || segment.contains('[') {
            return Err(malformed("empty or nested bracket"));
        }
        if segment.starts_with('$') {
            return Err(malformed("field names cannot start with '$'"));
        }
        segments.push(segment);
        rest = &inner[close + 1..];
    }

    let mut operator = Operator::Eq;
    if segments.len() > 1
        && let Some(op) = segments.last().and_then(|s| Operator::from_keyword(s))
    {
        operator = op;
        segments.pop();
    }

    Ok((segments.join("."), operator))
}

fn build_clauses(
    field: &str,
    operator: Operator,
    values: &[String],
) -> CatalogResult<Vec<ComparisonClause>> {
    let kind = Book::field_kind(field).unwrap_or(FieldKind::Text);
    let coerce = |raw: &str| {
        FieldValue::coerce(raw, kind).ok_or_else(|| CatalogError::InvalidQuery {
            message: format!("'{}' is not a valid value for {}", raw, field),
        })
    };

    // a repeated bare key means "any of", not "all of"; its values are
    // taken whole, only `in` splits on commas
    let split_commas = operator == Operator::In;
    let operator = if operator == Operator::Eq && values.len() > 1 {
        Operator::In
    } else {
        operator
    };

    if operator == Operator::In {
        let options = values
            .iter()
            .flat_map(|v| {
                if split_commas {
                    v.split(',').collect::<Vec<_>>()
                } else {
                    vec![v.as_str()]
                }
            })
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(coerce)
            .collect::<CatalogResult<Vec<_>>>()?;
        return Ok(vec![ComparisonClause {
            field: field.to_string(),
            operator,
            value: ClauseValue::List(options),
        }]);
    }

    values
        .iter()
        .map(|raw| {
            Ok(ComparisonClause {
                field: field.to_string(),
                operator,
                value: ClauseValue::Scalar(coerce(raw)?),
            })
        })
        .collect()
}

/// Resolve a dotted path inside a JSON document
pub fn lookup_path<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(record, |current, segment| current.get(segment))
}

// =============================================================================
// Projection
// =============================================================================

/// Inclusion list of attribute paths; `id` is always kept
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub fields: Vec<String>,
}

impl Projection {
    /// Parse `author,rating`; `None` if nothing usable remains
    pub fn parse(raw: &str) -> Option<Self> {
        let fields: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty() && !f.starts_with('$'))
            .map(String::from)
            .collect();
        (!fields.is_empty()).then_some(Self { fields })
    }

    /// Keep only the projected paths (plus `id`) of a JSON record
    pub fn apply(&self, record: &Value) -> Value {
        let mut out = Map::new();
        if let Some(id) = record.get("id") {
            out.insert("id".to_string(), id.clone());
        }
        for path in &self.fields {
            if let Some(value) = lookup_path(record, path) {
                insert_path(&mut out, path, value.clone());
            }
        }
        Value::Object(out)
    }
}

fn insert_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            target.insert(path.to_string(), value);
        }
        Some((head, tail)) => {
            let child = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(map) = child {
                insert_path(map, tail, value);
            }
        }
    }
}

// =============================================================================
// Sort
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// Ordered sort keys; defaults to newest first
#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub keys: Vec<SortKey>,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            keys: vec![SortKey {
                field: CREATED_AT.to_string(),
                direction: SortDirection::Descending,
            }],
        }
    }
}

impl SortSpec {
    /// Parse `-rating,author`; `None` if nothing usable remains
    pub fn parse(raw: &str) -> Option<Self> {
        let keys: Vec<SortKey> = raw
            .split(',')
            .map(str::trim)
            .filter_map(|token| {
                let (field, direction) = match token.strip_prefix('-') {
                    Some(field) => (field, SortDirection::Descending),
                    None => (token, SortDirection::Ascending),
                };
                let field = field.trim();
                (!field.is_empty() && !field.starts_with('$')).then(|| SortKey {
                    field: field.to_string(),
                    direction,
                })
            })
            .collect();
        (!keys.is_empty()).then_some(Self { keys })
    }

    /// Compare two JSON records by the sort keys
    ///
    /// Missing values sort before present ones, as in document stores.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        for key in &self.keys {
            let ordering = compare_values(lookup_path(a, &key.field), lookup_path(b, &key.field));
            let ordering = match key.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        // numbers before strings before everything else
        (Some(Value::Number(_)), Some(_)) => Ordering::Less,
        (Some(_), Some(Value::Number(_))) => Ordering::Greater,
        (Some(Value::String(_)), Some(_)) => Ordering::Less,
        (Some(_), Some(Value::String(_))) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// `page`/`limit` pair with derived slice indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationWindow {
    pub page: u64,
    pub limit: u64,
}

impl Default for PaginationWindow {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_LIMIT)
    }
}

impl PaginationWindow {
    /// Zero values are replaced by the defaults
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: if page == 0 { DEFAULT_PAGE } else { page },
            limit: if limit == 0 { DEFAULT_LIMIT } else { limit },
        }
    }

    /// Number of records skipped: `(page - 1) * limit`
    pub fn start_index(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Exclusive end of the window: `page * limit`
    pub fn end_index(&self) -> u64 {
        self.page.saturating_mul(self.limit)
    }

    /// Navigation hints for a collection of `total` records
    pub fn links(&self, total: u64) -> Pagination {
        Pagination {
            next: (self.end_index() < total).then(|| PageRef {
                page: self.page + 1,
                limit: self.limit,
            }),
            prev: (self.start_index() > 0).then(|| PageRef {
                page: self.page - 1,
                limit: self.limit,
            }),
        }
    }
}

/// Reference to an adjacent page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: u64,
    pub limit: u64,
}

/// `pagination` member of the listing envelope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

/// Leading-digit parse; `None` for absent, non-numeric or zero input
fn parse_positive(raw: Option<&str>) -> Option<u64> {
    let raw = raw?.trim();
    let end = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    raw[..end].parse::<u64>().ok().filter(|n| *n > 0)
}
