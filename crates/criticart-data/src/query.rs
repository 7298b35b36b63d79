//! Chained query builder for the provider's relational API.
//!
//! Queries compile to PostgREST conventions: filters become query-string
//! parameters (`category=eq.Books`), paging becomes a `Range` header and the
//! exact-count and single-row modes become `Prefer` / `Accept` headers.

use std::fmt;

/// `Accept` value asking for one object instead of an array.
pub const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// A filter operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    /// Array contains.
    Cs,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "eq",
            Op::Neq => "neq",
            Op::Gt => "gt",
            Op::Gte => "gte",
            Op::Lt => "lt",
            Op::Lte => "lte",
            Op::Like => "like",
            Op::ILike => "ilike",
            Op::Cs => "cs",
        }
    }
}

/// A single column condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub op: Op,
    pub value: String,
}

impl Condition {
    pub fn new(column: impl Into<String>, op: Op, value: impl fmt::Display) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.to_string(),
        }
    }

    /// `column=op.value` form used at the top level.
    fn param(&self) -> (String, String) {
        (
            self.column.clone(),
            format!("{}.{}", self.op.as_str(), self.value),
        )
    }

    /// `column.op.value` form used inside `or=(...)`.
    fn nested(&self) -> String {
        format!("{}.{}.{}", self.column, self.op.as_str(), quote(&self.value))
    }
}

/// Quote a value that contains characters reserved inside logic trees.
fn quote(value: &str) -> String {
    if value.chars().any(|c| matches!(c, ',' | '.' | ':' | '(' | ')' | '"' | '\\') || c.is_whitespace()) {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{}\"", escaped)
    } else {
        value.to_string()
    }
}

/// Wrap a search term as a case-insensitive substring pattern.
///
/// `%` and `_` in the term match literally.
pub fn contains_pattern(term: &str) -> String {
    // `*` is the URL-safe wildcard; a literal one in the term would widen the match.
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('*');
    for c in term.chars() {
        match c {
            '*' => {}
            '\\' | '%' | '_' => {
                pattern.push('\\');
                pattern.push(c);
            }
            _ => pattern.push(c),
        }
    }
    pattern.push('*');
    pattern
}

/// Read query against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: String,
    select: String,
    conditions: Vec<Condition>,
    any_of: Vec<Vec<Condition>>,
    order: Vec<(String, bool)>,
    range: Option<(u64, u64)>,
    limit: Option<u64>,
    count_exact: bool,
    single: bool,
}

impl Query {
    /// Start a query against `table`, selecting all columns.
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: "*".to_string(),
            conditions: Vec::new(),
            any_of: Vec::new(),
            order: Vec::new(),
            range: None,
            limit: None,
            count_exact: false,
            single: false,
        }
    }

    /// Columns and embedded relations, e.g. `*, author:profiles(*)`.
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = columns.into();
        self
    }

    pub fn filter(mut self, column: impl Into<String>, op: Op, value: impl fmt::Display) -> Self {
        self.conditions.push(Condition::new(column, op, value));
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.filter(column, Op::Eq, value)
    }

    pub fn gte(self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.filter(column, Op::Gte, value)
    }

    pub fn ilike(self, column: impl Into<String>, pattern: impl fmt::Display) -> Self {
        self.filter(column, Op::ILike, pattern)
    }

    /// Match rows satisfying at least one of `conditions`.
    pub fn or(mut self, conditions: Vec<Condition>) -> Self {
        if !conditions.is_empty() {
            self.any_of.push(conditions);
        }
        self
    }

    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order.push((column.into(), ascending));
        self
    }

    /// Inclusive row range.
    pub fn range(mut self, from: u64, to: u64) -> Self {
        self.range = Some((from, to));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Ask for the total number of matching rows.
    pub fn count_exact(mut self) -> Self {
        self.count_exact = true;
        self
    }

    /// Expect exactly one row back.
    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn row_range(&self) -> Option<(u64, u64)> {
        self.range
    }

    pub fn is_single(&self) -> bool {
        self.single
    }

    pub fn wants_count(&self) -> bool {
        self.count_exact
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Query-string parameters for a read.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.select.replace(' ', ""))];
        params.extend(self.filter_params());
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(col, asc)| format!("{}.{}", col, if *asc { "asc" } else { "desc" }))
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }

    /// Only the row-selecting parameters; used by update and delete.
    pub fn filter_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> =
            self.conditions.iter().map(Condition::param).collect();
        for group in &self.any_of {
            let inner = group
                .iter()
                .map(Condition::nested)
                .collect::<Vec<_>>()
                .join(",");
            params.push(("or".to_string(), format!("({})", inner)));
        }
        params
    }

    /// Headers for a read.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = Vec::new();
        if let Some((from, to)) = self.range {
            headers.push(("Range-Unit", "items".to_string()));
            headers.push(("Range", format!("{}-{}", from, to)));
        }
        if self.count_exact {
            headers.push(("Prefer", "count=exact".to_string()));
        }
        if self.single {
            headers.push(("Accept", SINGLE_OBJECT.to_string()));
        }
        headers
    }
}
