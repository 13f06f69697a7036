//! Builder for the restricted, SQL-like query language the spreadsheet
//! backend's tabular query endpoint accepts.
//!
//! The builder maps logical column names to sheet letters, substitutes `?`
//! placeholders with type-escaped literals and emits clauses in the fixed
//! order `select .. where .. order by .. offset .. limit ..`.

use sheet_bridge_common::{Result, SheetBridgeError};

use crate::values::check_safe_i64;

/// Transforms the raw where text before placeholder substitution. The row
/// store uses this to inject the row-identity guard.
pub type WhereInterceptor = fn(&str) -> String;

/// Sort direction for a selected column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    Asc,
    Desc,
}

impl OrderBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderBy::Asc => "ASC",
            OrderBy::Desc => "DESC",
        }
    }
}

/// Ordering requirement for one column.
#[derive(Debug, Clone)]
pub struct ColumnOrderBy {
    pub column: String,
    pub order: OrderBy,
}

impl ColumnOrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: OrderBy::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: OrderBy::Desc,
        }
    }
}

/// A typed argument bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryArg {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
}

impl From<i64> for QueryArg {
    fn from(v: i64) -> Self {
        QueryArg::Int(v)
    }
}

impl From<i32> for QueryArg {
    fn from(v: i32) -> Self {
        QueryArg::Int(v as i64)
    }
}

impl From<f64> for QueryArg {
    fn from(v: f64) -> Self {
        QueryArg::Float(v)
    }
}

impl From<bool> for QueryArg {
    fn from(v: bool) -> Self {
        QueryArg::Bool(v)
    }
}

impl From<&str> for QueryArg {
    fn from(v: &str) -> Self {
        QueryArg::String(v.to_string())
    }
}

impl From<String> for QueryArg {
    fn from(v: String) -> Self {
        QueryArg::String(v)
    }
}

impl From<Vec<u8>> for QueryArg {
    fn from(v: Vec<u8>) -> Self {
        QueryArg::Bytes(v)
    }
}

impl From<&[u8]> for QueryArg {
    fn from(v: &[u8]) -> Self {
        QueryArg::Bytes(v.to_vec())
    }
}

/// One-shot query assembler.
///
/// Setters replace earlier values rather than accumulate; `generate` is
/// side-effect free and returns the same string until the state changes.
///
/// Column names are substituted textually throughout the where clause and
/// order-by list, in definition order. A column name that is a substring of
/// another identifier in the clause will be replaced as well; callers must
/// avoid overlapping names.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    replacer: Vec<(String, String)>,
    columns: Vec<String>,
    where_condition: String,
    where_args: Vec<QueryArg>,
    where_interceptor: Option<WhereInterceptor>,
    order_by: Vec<String>,
    limit: u64,
    offset: u64,
}

impl QueryBuilder {
    /// Creates a builder over the given name→letter replacements, selecting
    /// `columns` (logical names or aggregate expressions over them).
    pub fn new(
        replacer: Vec<(String, String)>,
        where_interceptor: Option<WhereInterceptor>,
        columns: Vec<String>,
    ) -> Self {
        Self {
            replacer,
            columns,
            where_condition: String::new(),
            where_args: Vec::new(),
            where_interceptor,
            order_by: Vec::new(),
            limit: 0,
            offset: 0,
        }
    }

    /// Sets the where condition. `condition` may contain `?` placeholders;
    /// `args` must supply exactly one value per placeholder.
    pub fn where_clause(mut self, condition: impl Into<String>, args: Vec<QueryArg>) -> Self {
        self.where_condition = condition.into();
        self.where_args = args;
        self
    }

    /// Sets the full ordering list.
    pub fn order_by(mut self, ordering: Vec<ColumnOrderBy>) -> Self {
        self.order_by = ordering
            .into_iter()
            .map(|o| format!("{} {}", o.column, o.order.as_str()))
            .collect();
        self
    }

    /// Sets the row limit. Zero means unset.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the number of rows to skip. Zero means unset.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Produces the query string.
    pub fn generate(&self) -> Result<String> {
        let mut stmt: Vec<String> = vec!["select".to_string()];

        self.write_cols(&mut stmt);
        self.write_where(&mut stmt)?;
        self.write_order_by(&mut stmt);
        self.write_offset(&mut stmt);
        self.write_limit(&mut stmt);

        Ok(stmt.join(" "))
    }

    fn write_cols(&self, stmt: &mut Vec<String>) {
        let translated: Vec<String> = self
            .columns
            .iter()
            .map(|col| self.replace_columns(col))
            .collect();
        stmt.push(translated.join(", "));
    }

    fn write_where(&self, stmt: &mut Vec<String>) -> Result<()> {
        let clause = match self.where_interceptor {
            Some(interceptor) => interceptor(&self.where_condition),
            None => self.where_condition.clone(),
        };

        let placeholders = clause.matches('?').count();
        if placeholders != self.where_args.len() {
            return Err(SheetBridgeError::Query(format!(
                "number of arguments required in the where clause ({}) is not the same as \
                 the number of provided arguments ({})",
                placeholders,
                self.where_args.len()
            )));
        }

        if clause.is_empty() {
            return Ok(());
        }

        let clause = self.replace_columns(&clause);
        let fragments: Vec<&str> = clause.split('?').collect();

        let mut parts: Vec<String> = Vec::new();
        let first = fragments[0].trim();
        if !first.is_empty() {
            parts.push(first.to_string());
        }
        for (idx, arg) in self.where_args.iter().enumerate() {
            parts.push(convert_arg(arg)?);
            let rest = fragments[idx + 1].trim();
            if !rest.is_empty() {
                parts.push(rest.to_string());
            }
        }

        stmt.push("where".to_string());
        stmt.push(parts.join(" "));
        Ok(())
    }

    fn write_order_by(&self, stmt: &mut Vec<String>) {
        if self.order_by.is_empty() {
            return;
        }
        let translated: Vec<String> = self
            .order_by
            .iter()
            .map(|o| self.replace_columns(o))
            .collect();
        stmt.push("order by".to_string());
        stmt.push(translated.join(", "));
    }

    fn write_offset(&self, stmt: &mut Vec<String>) {
        if self.offset == 0 {
            return;
        }
        stmt.push("offset".to_string());
        stmt.push(self.offset.to_string());
    }

    fn write_limit(&self, stmt: &mut Vec<String>) {
        if self.limit == 0 {
            return;
        }
        stmt.push("limit".to_string());
        stmt.push(self.limit.to_string());
    }

    fn replace_columns(&self, s: &str) -> String {
        let mut result = s.to_string();
        for (col, letter) in &self.replacer {
            result = result.replace(col, letter);
        }
        result
    }
}

/// Converts one bound argument into its query-language literal.
fn convert_arg(arg: &QueryArg) -> Result<String> {
    match arg {
        QueryArg::Int(i) => {
            check_safe_i64(*i)?;
            Ok(i.to_string())
        }
        QueryArg::Float(f) => Ok(f.to_string()),
        QueryArg::Bool(b) => Ok(b.to_string()),
        QueryArg::String(s) => convert_string(s),
        QueryArg::Bytes(bytes) => {
            let s = std::str::from_utf8(bytes).map_err(|e| {
                SheetBridgeError::Query(format!("binary argument is not valid UTF-8: {}", e))
            })?;
            Ok(serde_json::to_string(s)?)
        }
    }
}

fn convert_string(s: &str) -> Result<String> {
    // The query language wants date/datetime/timeofday literals as barewords
    // (`date "2024-01-02"`), so those pass through without quoting.
    let cleaned = s.trim().to_lowercase();
    if cleaned.starts_with("date") || cleaned.starts_with("timeofday") {
        return Ok(s.to_string());
    }
    Ok(serde_json::to_string(s)?)
}
