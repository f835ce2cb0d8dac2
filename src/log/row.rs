use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// A parameter value taken from an invocation name (`Keys=1024`, `Mode=fast`).
#[derive(Debug, Clone)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Numbers when the text parses as one, literal text otherwise.
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<f64>() {
            Ok(v) => FieldValue::Number(v),
            Err(_) => FieldValue::Text(raw.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }
}

// Total order so values can key a BTreeMap; numbers sort before text.
impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (FieldValue::Number(a), FieldValue::Number(b)) => a.total_cmp(b),
            (FieldValue::Number(_), FieldValue::Text(_)) => Ordering::Less,
            (FieldValue::Text(_), FieldValue::Number(_)) => Ordering::Greater,
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FieldValue {}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => write!(f, "{}", *v as i64),
            FieldValue::Number(v) => write!(f, "{}", v),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// One observation of one benchmark invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub benchmark_name: String,
    /// Invocation name as printed, concurrency suffix included.
    pub full_name: String,
    /// Lower-cased parameter names from `/Key=Value` segments.
    pub parameters: BTreeMap<String, FieldValue>,
    pub metrics: BTreeMap<String, f64>,
    pub module: String,
    pub sample_index: usize,
    /// Harness-reported iteration count for the invocation (second token).
    pub repeat_count: Option<u64>,
}

impl MetricRecord {
    /// Look up a groupable field: `benchmark`, `module`, or any parameter.
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "benchmark" => Some(FieldValue::Text(self.benchmark_name.clone())),
            "module" => Some(FieldValue::Text(self.module.clone())),
            _ => self.parameters.get(name).cloned(),
        }
    }
}

/// Flattened memory report for one `(mode, keys)` context of a module.
#[derive(Debug, Clone, PartialEq)]
pub struct MemBreakdown {
    pub module: String,
    pub mode: String,
    pub keys: u64,
    /// Canonical component name -> bytes. Sums to the report's root total.
    pub components: BTreeMap<String, u64>,
}

impl MemBreakdown {
    pub fn total_bytes(&self) -> u64 {
        self.components.values().sum()
    }

    /// Bits per key for one component; zero keys yield zero.
    pub fn bits_per_key(&self, component: &str) -> f64 {
        if self.keys == 0 {
            return 0.0;
        }
        let bytes = self.components.get(component).copied().unwrap_or(0);
        bytes as f64 * 8.0 / self.keys as f64
    }

    pub fn total_bits_per_key(&self) -> f64 {
        if self.keys == 0 {
            return 0.0;
        }
        self.total_bytes() as f64 * 8.0 / self.keys as f64
    }
}

/// Everything extracted from one module's merged log.
#[derive(Debug, Clone, Default)]
pub struct ParsedLog {
    pub records: Vec<MetricRecord>,
    pub mem_reports: Vec<MemBreakdown>,
    /// Marker lines that were recognized but could not be used.
    pub skipped: usize,
}
