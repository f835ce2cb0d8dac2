//! Delimited summary tables (header plus rows).

use crate::log::mem_report::COMPONENTS;
use crate::log::{FieldValue, MemBreakdown, MetricRecord};
use crate::Result;
use crate::model::SummaryRow;
use anyhow::Context;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Columns that lead every table when present, in this order.
pub const PRIORITY_FIELDS: [&str; 6] = ["benchmark", "module", "keysize", "keys", "prefixlen", "samples"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    /// Cells by column name; missing cells are written empty.
    pub rows: Vec<BTreeMap<String, String>>,
}

impl Table {
    /// Build a table whose columns are every field seen in `rows`, ordered
    /// priority fields first and the rest alphabetically.
    pub fn from_rows(rows: Vec<BTreeMap<String, String>>) -> Self {
        let fields: BTreeSet<&str> = rows.iter().flat_map(|r| r.keys().map(String::as_str)).collect();
        let columns = order_columns(fields);
        Self { columns, rows }
    }
}

pub fn order_columns<'a>(fields: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let fields: BTreeSet<&str> = fields.into_iter().collect();
    let mut out: Vec<String> = PRIORITY_FIELDS
        .iter()
        .filter(|f| fields.contains(*f))
        .map(|f| f.to_string())
        .collect();
    out.extend(
        fields
            .iter()
            .filter(|f| !PRIORITY_FIELDS.contains(*f))
            .map(|f| f.to_string()),
    );
    out
}

fn number(v: f64) -> String {
    FieldValue::Number(v).to_string()
}

/// One row per parsed record.
pub fn records_table(records: &[MetricRecord]) -> Table {
    let rows = records
        .iter()
        .map(|r| {
            let mut row = BTreeMap::new();
            row.insert("benchmark".to_string(), r.benchmark_name.clone());
            row.insert("module".to_string(), r.module.clone());
            row.insert("full_name".to_string(), r.full_name.clone());
            row.insert("sample_index".to_string(), r.sample_index.to_string());
            if let Some(n) = r.repeat_count {
                row.insert("samples_count".to_string(), n.to_string());
            }
            for (k, v) in &r.parameters {
                row.insert(k.clone(), v.to_string());
            }
            for (k, v) in &r.metrics {
                row.insert(k.clone(), number(*v));
            }
            row
        })
        .collect();
    Table::from_rows(rows)
}

/// One row per aggregated group; absent key fields stay empty.
pub fn summary_table(summary: &[SummaryRow]) -> Table {
    let rows = summary
        .iter()
        .map(|s| {
            let mut row = BTreeMap::new();
            for (k, v) in &s.key {
                row.insert(k.clone(), v.as_ref().map(|v| v.to_string()).unwrap_or_default());
            }
            row.insert("samples".to_string(), s.sample_count.to_string());
            for (k, v) in &s.values {
                row.insert(k.clone(), number(*v));
            }
            row
        })
        .collect();
    Table::from_rows(rows)
}

/// Per-component bits per key for each memory report, with a fixed layout.
pub fn breakdown_table(reports: &[MemBreakdown]) -> Table {
    let mut columns: Vec<String> = ["Module", "Mode", "Keys"].iter().map(|s| s.to_string()).collect();
    columns.extend(COMPONENTS.iter().map(|c| c.to_string()));
    columns.push("Total_Bits_Per_Key".to_string());

    let rows = reports
        .iter()
        .map(|b| {
            let mut row = BTreeMap::new();
            row.insert("Module".to_string(), b.module.clone());
            row.insert("Mode".to_string(), b.mode.clone());
            row.insert("Keys".to_string(), b.keys.to_string());
            for c in COMPONENTS {
                row.insert(c.to_string(), format!("{:.4}", b.bits_per_key(c)));
            }
            row.insert(
                "Total_Bits_Per_Key".to_string(),
                format!("{:.4}", b.total_bits_per_key()),
            );
            row
        })
        .collect();
    Table { columns, rows }
}

/// Write `table` as CSV, creating parent directories.
pub fn write_table(path: impl AsRef<Path>, table: &Table) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
    }
    let mut w = csv::Writer::from_path(path).with_context(|| format!("open {}", path.display()))?;
    w.write_record(&table.columns)?;
    for row in &table.rows {
        w.write_record(
            table
                .columns
                .iter()
                .map(|c| row.get(c).map(String::as_str).unwrap_or("")),
        )?;
    }
    w.flush().with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
