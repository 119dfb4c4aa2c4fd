//! Compiles [`FilterExpr`] trees into parameterized SQL fragments.
//!
//! The fragment references the `c` (cases) and `w` (latest workflow entry)
//! aliases used by the case view queries in
//! [`CaseRepo`](crate::repositories::CaseRepo). Operands never appear in
//! the SQL text; they are collected in bind order.

use medreview_core::query::{CaseField, FilterExpr, FilterValue, SortDirection, SortExpr};
use medreview_core::types::Timestamp;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::Postgres;

/// A typed bind parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindValue {
    BigInt(i64),
    SmallInt(i16),
    Time(Timestamp),
}

impl From<&FilterValue> for BindValue {
    fn from(value: &FilterValue) -> Self {
        match value {
            FilterValue::Id(id) => Self::BigInt(*id),
            FilterValue::CaseType(t) => Self::SmallInt(t.id()),
            FilterValue::Status(s) => Self::SmallInt(s.id()),
            FilterValue::Time(ts) => Self::Time(*ts),
        }
    }
}

/// A `WHERE`-ready condition plus its bind values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFilter {
    pub sql: String,
    pub binds: Vec<BindValue>,
}

/// SQL expression for a case field.
pub fn column(field: CaseField) -> &'static str {
    match field {
        CaseField::CaseId => "c.id",
        CaseField::CaseType => "c.case_type_id",
        CaseField::RecordId => "c.record_id",
        CaseField::Status => "w.step_status_id",
        CaseField::AssigneeId => "w.recipient_user_id",
        CaseField::CreatedAt => "c.created_at",
        CaseField::DueDate => "c.due_date",
        CaseField::StatusChangedAt => "w.entry_at",
    }
}

/// Compile `expr`, numbering placeholders from `$first_bind_idx`.
pub fn compile(expr: &FilterExpr, first_bind_idx: u32) -> CompiledFilter {
    let mut binds = Vec::new();
    let sql = compile_into(expr, first_bind_idx, &mut binds);
    CompiledFilter { sql, binds }
}

fn compile_into(expr: &FilterExpr, base: u32, binds: &mut Vec<BindValue>) -> String {
    let placeholder = |value: &FilterValue, binds: &mut Vec<BindValue>| {
        binds.push(BindValue::from(value));
        format!("${}", base + binds.len() as u32 - 1)
    };

    match expr {
        FilterExpr::All => "TRUE".to_string(),
        FilterExpr::And(items) => join(items, " AND ", "TRUE", base, binds),
        FilterExpr::Or(items) => join(items, " OR ", "FALSE", base, binds),
        FilterExpr::Not(inner) => format!("NOT ({})", compile_into(inner, base, binds)),
        FilterExpr::Eq(field, value) => {
            format!("{} = {}", column(*field), placeholder(value, binds))
        }
        FilterExpr::AtLeast(field, value) => {
            format!("{} >= {}", column(*field), placeholder(value, binds))
        }
        FilterExpr::AtMost(field, value) => {
            format!("{} <= {}", column(*field), placeholder(value, binds))
        }
        FilterExpr::In(field, values) => {
            if values.is_empty() {
                return "FALSE".to_string();
            }
            let list: Vec<String> = values.iter().map(|v| placeholder(v, binds)).collect();
            format!("{} IN ({})", column(*field), list.join(", "))
        }
        FilterExpr::IsNull(field) => format!("{} IS NULL", column(*field)),
    }
}

fn join(
    items: &[FilterExpr],
    op: &str,
    empty: &str,
    base: u32,
    binds: &mut Vec<BindValue>,
) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    let parts: Vec<String> = items
        .iter()
        .map(|item| compile_into(item, base, binds))
        .collect();
    format!("({})", parts.join(op))
}

/// `ORDER BY` clause with a stable tie-break on case id.
pub fn order_by(sort: SortExpr) -> String {
    let dir = match sort.direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    };
    if sort.field == CaseField::CaseId {
        format!("ORDER BY c.id {dir}")
    } else {
        format!("ORDER BY {} {dir} NULLS LAST, c.id ASC", column(sort.field))
    }
}

/// Bind compiled filter values onto a query in order.
pub fn bind_all<'q, O>(
    mut query: QueryAs<'q, Postgres, O, PgArguments>,
    binds: &[BindValue],
) -> QueryAs<'q, Postgres, O, PgArguments> {
    for value in binds {
        query = match *value {
            BindValue::BigInt(v) => query.bind(v),
            BindValue::SmallInt(v) => query.bind(v),
            BindValue::Time(v) => query.bind(v),
        };
    }
    query
}
