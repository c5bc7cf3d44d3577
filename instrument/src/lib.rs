//! Game telemetry: `tracing` events collected into per-target tables.
//!
//! Every `tracing::info!` event becomes one row in the table named after its
//! target. Columns are whatever fields the events carried; a row that lacks a
//! field reads as null. Tables convert to polars DataFrames for analysis.
//!
//! # Usage
//!
//! ```ignore
//! // In game code:
//! tracing::info!(target: "trade", side = "buy", quantity = 5u64, price = 120i64);
//!
//! // In a test:
//! let capture = instrument::Capture::start();
//! // ... play some turns ...
//! let telemetry = capture.finish();
//! let prices = telemetry.table("trade").unwrap().f64s("price");
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Id, Metadata, Subscriber};

// ============================================================================
// Values and tables
// ============================================================================

/// A single recorded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U64(u64),
    I64(i64),
    F64(f64),
    Bool(bool),
    Str(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::U64(v) => Some(*v as f64),
            Value::I64(v) => Some(*v as f64),
            Value::F64(v) => Some(*v),
            Value::Bool(_) | Value::Str(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::U64(v) => i64::try_from(*v).ok(),
            Value::I64(v) => Some(*v),
            Value::F64(_) | Value::Bool(_) | Value::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::U64(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Str(v) => f.write_str(v),
        }
    }
}

pub type Row = HashMap<String, Value>;

/// Rows recorded under one tracing target, in emission order.
#[derive(Debug, Clone, Default)]
pub struct Table {
    rows: Vec<Row>,
    /// Column names in first-seen order
    columns: Vec<String>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn push(&mut self, row: Row) {
        for name in row.keys() {
            if !self.columns.iter().any(|c| c == name) {
                self.columns.push(name.clone());
            }
        }
        self.rows.push(row);
    }

    /// Raw cells of a column, `None` where a row lacked the field.
    pub fn column(&self, name: &str) -> Vec<Option<&Value>> {
        self.rows.iter().map(|row| row.get(name)).collect()
    }

    /// Numeric values of a column, skipping rows that lacked it.
    pub fn f64s(&self, name: &str) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.get(name).and_then(Value::as_f64))
            .collect()
    }

    pub fn i64s(&self, name: &str) -> Vec<i64> {
        self.rows
            .iter()
            .filter_map(|row| row.get(name).and_then(Value::as_i64))
            .collect()
    }

    pub fn strs(&self, name: &str) -> Vec<&str> {
        self.rows
            .iter()
            .filter_map(|row| row.get(name).and_then(Value::as_str))
            .collect()
    }

    /// Rows whose string field `name` equals `value`.
    pub fn filter_eq<'a>(&'a self, name: &'a str, value: &'a str) -> impl Iterator<Item = &'a Row> {
        self.rows
            .iter()
            .filter(move |row| row.get(name).and_then(Value::as_str) == Some(value))
    }
}

/// All tables, keyed by tracing target.
#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    pub tables: HashMap<String, Table>,
}

impl Telemetry {
    pub fn table(&self, target: &str) -> Option<&Table> {
        self.tables.get(target)
    }

    /// Number of rows recorded under `target`, zero if none.
    pub fn count(&self, target: &str) -> usize {
        self.tables.get(target).map_or(0, Table::len)
    }
}

thread_local! {
    static TELEMETRY: RefCell<Telemetry> = RefCell::default();
}

// ============================================================================
// Subscriber
// ============================================================================

/// Visitor that turns event fields into one row.
#[derive(Default)]
struct RowVisitor {
    row: Row,
}

impl RowVisitor {
    fn put(&mut self, field: &Field, value: Value) {
        self.row.insert(field.name().to_string(), value);
    }
}

impl Visit for RowVisitor {
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, Value::U64(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, Value::I64(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, Value::F64(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, Value::Bool(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::Str(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, Value::Str(format!("{:?}", value)));
    }
}

/// Tracing subscriber that appends every info-level event to the
/// thread-local telemetry.
pub struct TelemetrySubscriber;

impl Subscriber for TelemetrySubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event() && *metadata.level() <= tracing::Level::INFO
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let mut visitor = RowVisitor::default();
        event.record(&mut visitor);
        let target = event.metadata().target().to_string();

        TELEMETRY.with(|t| {
            t.borrow_mut()
                .tables
                .entry(target)
                .or_default()
                .push(visitor.row);
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Take everything recorded on this thread so far.
pub fn drain() -> Telemetry {
    TELEMETRY.with(|t| std::mem::take(&mut *t.borrow_mut()))
}

pub fn clear() {
    TELEMETRY.with(|t| *t.borrow_mut() = Telemetry::default());
}

/// Records telemetry on the current thread for as long as it is alive.
///
/// Starting a capture discards anything recorded earlier on the thread.
pub struct Capture {
    _guard: DefaultGuard,
}

impl Capture {
    pub fn start() -> Self {
        clear();
        Self {
            _guard: tracing::subscriber::set_default(TelemetrySubscriber),
        }
    }

    /// Stop capturing and hand back what was recorded.
    pub fn finish(self) -> Telemetry {
        drop(self);
        drain()
    }
}

// ============================================================================
// Polars integration
// ============================================================================

use polars::prelude::*;

/// Storage type chosen for a column from the values it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    U64,
    I64,
    F64,
    Bool,
    Str,
}

fn column_kind<'a>(values: impl Iterator<Item = &'a Value>) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;
    for value in values {
        let this = match value {
            Value::U64(_) => ColumnKind::U64,
            Value::I64(_) => ColumnKind::I64,
            Value::F64(_) => ColumnKind::F64,
            Value::Bool(_) => ColumnKind::Bool,
            Value::Str(_) => ColumnKind::Str,
        };
        kind = Some(match (kind, this) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            // Mixed integers widen to signed, anything numeric with a float to float
            (Some(ColumnKind::U64), ColumnKind::I64) | (Some(ColumnKind::I64), ColumnKind::U64) => {
                ColumnKind::I64
            }
            (Some(a), b)
                if [a, b]
                    .iter()
                    .all(|k| matches!(k, ColumnKind::U64 | ColumnKind::I64 | ColumnKind::F64)) =>
            {
                ColumnKind::F64
            }
            _ => ColumnKind::Str,
        });
    }
    kind.unwrap_or(ColumnKind::Str)
}

impl Table {
    /// Convert to a DataFrame. Missing cells become nulls.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.columns.len());

        for name in &self.columns {
            let cells = self.column(name);
            let column = match column_kind(cells.iter().flatten().copied()) {
                ColumnKind::U64 => {
                    let v: Vec<Option<u64>> = cells
                        .iter()
                        .map(|c| match c {
                            Some(Value::U64(v)) => Some(*v),
                            _ => None,
                        })
                        .collect();
                    Column::new(name.into(), v)
                }
                ColumnKind::I64 => {
                    let v: Vec<Option<i64>> =
                        cells.iter().map(|c| c.and_then(Value::as_i64)).collect();
                    Column::new(name.into(), v)
                }
                ColumnKind::F64 => {
                    let v: Vec<Option<f64>> =
                        cells.iter().map(|c| c.and_then(Value::as_f64)).collect();
                    Column::new(name.into(), v)
                }
                ColumnKind::Bool => {
                    let v: Vec<Option<bool>> =
                        cells.iter().map(|c| c.and_then(Value::as_bool)).collect();
                    Column::new(name.into(), v)
                }
                ColumnKind::Str => {
                    let v: Vec<Option<String>> =
                        cells.iter().map(|c| c.map(|v| v.to_string())).collect();
                    Column::new(name.into(), v)
                }
            };
            columns.push(column);
        }

        DataFrame::new(columns)
    }
}

impl Telemetry {
    /// Convert every table, dropping any that fail to convert.
    pub fn to_dataframes(&self) -> HashMap<String, DataFrame> {
        self.tables
            .iter()
            .filter_map(|(name, table)| table.to_dataframe().ok().map(|df| (name.clone(), df)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_groups_rows_by_target() {
        let capture = Capture::start();
        tracing::info!(target: "trade", side = "buy", quantity = 5u64, price = 120i64);
        tracing::info!(target: "trade", side = "sell", quantity = 5u64, price = 140i64);
        tracing::info!(target: "debt", action = "loan", amount = 1000i64);
        let telemetry = capture.finish();

        assert_eq!(telemetry.count("trade"), 2);
        assert_eq!(telemetry.count("debt"), 1);
        assert_eq!(telemetry.count("market"), 0);

        let trades = telemetry.table("trade").unwrap();
        assert_eq!(trades.strs("side"), vec!["buy", "sell"]);
        assert_eq!(trades.i64s("price"), vec![120, 140]);
        assert_eq!(trades.filter_eq("side", "sell").count(), 1);
    }

    #[test]
    fn test_nothing_recorded_after_finish() {
        let capture = Capture::start();
        tracing::info!(target: "turn", turn = 1u64);
        let telemetry = capture.finish();
        tracing::info!(target: "turn", turn = 2u64);

        assert_eq!(telemetry.count("turn"), 1);
        assert_eq!(drain().count("turn"), 0);
    }

    #[test]
    fn test_missing_fields_read_as_null() {
        let capture = Capture::start();
        tracing::info!(target: "travel", from = "Terra", fuel_cost = 15i64);
        tracing::info!(target: "travel", from = "Mars");
        let telemetry = capture.finish();

        let travel = telemetry.table("travel").unwrap();
        let cells = travel.column("fuel_cost");
        assert_eq!(cells, vec![Some(&Value::I64(15)), None]);

        let df = travel.to_dataframe().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("fuel_cost").unwrap().null_count(), 1);
    }

    #[test]
    fn test_mixed_numeric_columns_widen() {
        let ints = [Value::U64(1), Value::I64(-2)];
        assert_eq!(column_kind(ints.iter()), ColumnKind::I64);

        let mixed = [Value::U64(1), Value::F64(0.5)];
        assert_eq!(column_kind(mixed.iter()), ColumnKind::F64);

        let odd = [Value::Bool(true), Value::U64(3)];
        assert_eq!(column_kind(odd.iter()), ColumnKind::Str);
    }

    #[test]
    fn test_dataframe_keeps_values() {
        let capture = Capture::start();
        tracing::info!(target: "market", good = "Water", price = 98i64, stock = 210u64);
        tracing::info!(target: "market", good = "Food", price = 151i64, stock = 140u64);
        let telemetry = capture.finish();

        let dfs = telemetry.to_dataframes();
        let df = &dfs["market"];
        let prices: Vec<i64> = df
            .column("price")
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(prices, vec![98, 151]);
    }
}
