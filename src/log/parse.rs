use crate::log::ParseError;
use crate::log::mem_report::MemNode;
use crate::log::row::{FieldValue, MemBreakdown, MetricRecord, ParsedLog};
use anyhow::Context;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Result lines start with this token.
pub const BENCH_MARKER: &str = "Benchmark";

/// Lines containing this token carry an inline JSON memory report.
pub const MEM_REPORT_MARKER: &str = "JSON_MEM_REPORT:";

/// Invocation lines of the detailed memory benchmark set the report context.
pub const MEM_DETAIL_BENCH: &str = "BenchmarkMemoryDetailed/";

/// Parse a merged benchmark log into metric records and memory reports.
///
/// A missing file is "no data", not an error.
///
/// Example lines:
/// BenchmarkBuild/KeySize=64/Keys=1024-8   100   234 ns/op   512 B/op   3 allocs/op
/// BenchmarkMemoryComparison/KeySize=64/Keys=1024-8   1   88.25 bits/key
///     mem_test.go:41: JSON_MEM_REPORT: {"name":"lerloc","total_bytes":4096,...}
pub fn parse_log_file(path: impl AsRef<Path>, module: &str) -> anyhow::Result<ParsedLog> {
    let path = path.as_ref();
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "log file missing, treating as no data");
            return Ok(ParsedLog::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("read log file {}", path.display()));
        }
    };
    Ok(parse_log_text(&text, module))
}

/// Parse already-loaded log text. See [`parse_log_file`].
pub fn parse_log_text(text: &str, module: &str) -> ParsedLog {
    let mut out = ParsedLog::default();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut ctx = MemContext::default();

    for (lineno, line) in text.lines().enumerate() {
        let lno = lineno + 1;

        if line.starts_with(MEM_DETAIL_BENCH) {
            ctx.update(line);
        }

        if let Some(idx) = line.find(MEM_REPORT_MARKER) {
            let payload = line[idx + MEM_REPORT_MARKER.len()..].trim();
            match parse_mem_payload(payload, &ctx) {
                Ok(components) => out.mem_reports.push(MemBreakdown {
                    module: module.to_string(),
                    mode: ctx.mode.clone(),
                    keys: ctx.keys,
                    components,
                }),
                Err(e) => {
                    warn!(
                        module = %module,
                        line = lno,
                        mode = %ctx.mode,
                        keys = ctx.keys,
                        "skipping memory report: {e}"
                    );
                    out.skipped += 1;
                }
            }
            continue;
        }

        if !line.starts_with(BENCH_MARKER) {
            continue;
        }

        let Some(mut record) = parse_result_line(line, module) else {
            continue;
        };
        let counter = seen.entry(record.full_name.clone()).or_insert(0);
        record.sample_index = *counter;
        *counter += 1;
        out.records.push(record);
    }

    out
}

fn parse_mem_payload(
    payload: &str,
    ctx: &MemContext,
) -> Result<BTreeMap<String, u64>, ParseError> {
    let node = MemNode::from_json(payload).map_err(|source| ParseError::MalformedReport {
        mode: ctx.mode.clone(),
        keys: ctx.keys,
        source,
    })?;
    node.flatten()
}

/// Parse one result line. Returns `None` when the line is too short to hold
/// a value/unit pair. `sample_index` is left at zero for the caller to set.
pub fn parse_result_line(line: &str, module: &str) -> Option<MetricRecord> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 4 {
        return None;
    }

    let full_name = tokens[0];
    let benchmark_name = full_name.split('/').next().unwrap_or(full_name).to_string();

    Some(MetricRecord {
        benchmark_name,
        full_name: full_name.to_string(),
        parameters: parse_params(strip_procs_suffix(full_name)),
        metrics: parse_metrics(&tokens[1..]),
        module: module.to_string(),
        sample_index: 0,
        repeat_count: tokens[1].parse::<u64>().ok(),
    })
}

/// Strip the harness's trailing `-<procs>` concurrency suffix, if any.
///
/// A dash directly after `=` is a negative parameter value, not a suffix.
pub fn strip_procs_suffix(name: &str) -> &str {
    match name.rsplit_once('-') {
        Some((head, tail))
            if !tail.is_empty()
                && tail.bytes().all(|b| b.is_ascii_digit())
                && !head.is_empty()
                && !head.ends_with(['=', '/', '-']) =>
        {
            head
        }
        _ => name,
    }
}

/// Extract `/Key=Value` segments. Keys are lower-cased.
pub fn parse_params(name: &str) -> BTreeMap<String, FieldValue> {
    name.split('/')
        .skip(1)
        .filter_map(|seg| seg.split_once('='))
        .map(|(k, v)| (k.to_lowercase(), FieldValue::parse(v)))
        .collect()
}

/// Walk adjacent `(value, unit)` token pairs.
///
/// The standard units map to fixed names. Any other unit following a numeric
/// value becomes a metric of its own, unless the unit is itself numeric.
pub fn parse_metrics(tokens: &[&str]) -> BTreeMap<String, f64> {
    let mut metrics = BTreeMap::new();
    for pair in tokens.windows(2) {
        let (value, unit) = (pair[0], pair[1]);
        let Ok(v) = value.parse::<f64>() else {
            continue;
        };
        if let Some((key, v)) = classify_metric(v, unit) {
            metrics.insert(key, v);
        }
    }
    metrics
}

/// Decide what a numeric value followed by `unit` means.
pub fn classify_metric(value: f64, unit: &str) -> Option<(String, f64)> {
    let key = match unit {
        "ns/op" => "ns_per_op".to_string(),
        "B/op" => "bytes_per_op".to_string(),
        "allocs/op" => "allocs_per_op".to_string(),
        _ if unit.parse::<f64>().is_ok() => return None,
        _ => metric_key(unit),
    };
    Some((key, value))
}

/// `bits/key` -> `bits_key`, `MB/s` -> `MB_s`, `key.in.mem` -> `keyinmem`.
pub fn metric_key(unit: &str) -> String {
    unit.replace('/', "_").replace('.', "")
}

/// Most recent `(mode, keys)` seen on a detailed memory benchmark line.
#[derive(Debug, Clone, PartialEq)]
struct MemContext {
    mode: String,
    keys: u64,
}

impl Default for MemContext {
    fn default() -> Self {
        Self {
            mode: "default".to_string(),
            keys: 0,
        }
    }
}

impl MemContext {
    fn update(&mut self, line: &str) {
        let Some(name) = line.split_whitespace().next() else {
            return;
        };
        let parts: Vec<&str> = name.split('/').collect();

        self.mode = "default".to_string();
        if parts.len() >= 3 && !parts[1].starts_with("Keys=") {
            self.mode = parts[1].to_string();
        }

        for p in &parts {
            if let Some(raw) = p.strip_prefix("Keys=") {
                let digits = raw.split('-').next().unwrap_or(raw);
                if let Ok(n) = digits.parse::<u64>() {
                    self.keys = n;
                }
            }
        }
    }
}
