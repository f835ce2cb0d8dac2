//! Aggregation model: group repeated trials and reduce them to medians.

pub mod stats;

use crate::log::{FieldValue, MetricRecord};
use std::collections::BTreeMap;

pub use stats::{median, quantile};

/// One group of records reduced to per-field medians.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    /// Group-key fields in the order they were requested. `None` marks a
    /// field the group's records do not carry.
    pub key: Vec<(String, Option<FieldValue>)>,
    pub sample_count: usize,
    /// Median of every numeric field carried by at least one member.
    pub values: BTreeMap<String, f64>,
}

impl SummaryRow {
    /// A group-key field, falling back to reduced values.
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        self.key
            .iter()
            .find(|(k, _)| k == name)
            .and_then(|(_, v)| v.clone())
            .or_else(|| self.values.get(name).map(|v| FieldValue::Number(*v)))
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.field(name).and_then(|v| v.as_f64())
    }

    pub fn text(&self, name: &str) -> String {
        self.field(name).map(|v| v.to_string()).unwrap_or_default()
    }
}

/// Numeric fields of a record that take part in reduction: all metrics plus
/// numeric parameters that are not group keys.
fn numeric_fields<'a>(
    record: &'a MetricRecord,
    group_keys: &'a [String],
) -> impl Iterator<Item = (&'a str, f64)> + 'a {
    let params = record
        .parameters
        .iter()
        .filter(|(k, _)| !group_keys.contains(k))
        .filter_map(|(k, v)| v.as_f64().map(|n| (k.as_str(), n)));
    let metrics = record.metrics.iter().map(|(k, v)| (k.as_str(), *v));
    params.chain(metrics)
}

/// Group records by `group_keys` and reduce each group to medians.
///
/// Key fields may be `benchmark`, `module` or any parameter name. A record
/// lacking a key field groups under the "absent" value for that field.
/// Rows come out ordered by group key.
pub fn aggregate(records: &[MetricRecord], group_keys: &[String]) -> Vec<SummaryRow> {
    let mut groups: BTreeMap<Vec<Option<FieldValue>>, Vec<&MetricRecord>> = BTreeMap::new();
    for r in records {
        let key = group_keys.iter().map(|k| r.field(k)).collect();
        groups.entry(key).or_default().push(r);
    }

    let mut rows = Vec::with_capacity(groups.len());
    for (key, members) in groups {
        let mut samples: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for r in &members {
            for (name, v) in numeric_fields(r, group_keys) {
                samples.entry(name).or_default().push(v);
            }
        }

        let values = samples
            .into_iter()
            .filter_map(|(name, vals)| median(&vals).map(|m| (name.to_string(), m)))
            .collect();

        rows.push(SummaryRow {
            key: group_keys.iter().cloned().zip(key).collect(),
            sample_count: members.len(),
            values,
        });
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(name: &str, params: &[(&str, f64)], metrics: &[(&str, f64)]) -> MetricRecord {
        MetricRecord {
            benchmark_name: name.to_string(),
            full_name: name.to_string(),
            parameters: params
                .iter()
                .map(|(k, v)| (k.to_string(), FieldValue::Number(*v)))
                .collect(),
            metrics: metrics.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            module: "rloc".to_string(),
            sample_index: 0,
            repeat_count: Some(1),
        }
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn two_samples_interpolate() {
        let recs = vec![
            record("BenchmarkBuild", &[("keys", 1024.0)], &[("ns_per_op", 100.0)]),
            record("BenchmarkBuild", &[("keys", 1024.0)], &[("ns_per_op", 300.0)]),
        ];
        let rows = aggregate(&recs, &keys(&["benchmark", "keys"]));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sample_count, 2);
        assert_eq!(rows[0].values["ns_per_op"], 200.0);
        assert_eq!(rows[0].number("keys"), Some(1024.0));
    }

    #[test]
    fn singleton_group_keeps_its_value() {
        let recs = vec![record("BenchmarkLookup", &[], &[("ns_per_op", 7.0)])];
        let rows = aggregate(&recs, &keys(&["benchmark"]));
        assert_eq!(rows[0].values["ns_per_op"], 7.0);
        assert_eq!(rows[0].sample_count, 1);
    }

    #[test]
    fn absent_key_is_its_own_group() {
        let recs = vec![
            record("BenchmarkBuild", &[("keysize", 64.0)], &[("ns_per_op", 1.0)]),
            record("BenchmarkBuild", &[], &[("ns_per_op", 2.0)]),
            record("BenchmarkBuild", &[("keysize", 0.0)], &[("ns_per_op", 3.0)]),
        ];
        let rows = aggregate(&recs, &keys(&["benchmark", "keysize"]));
        assert_eq!(rows.len(), 3);
        let absent = rows.iter().find(|r| r.key[1].1.is_none()).unwrap();
        assert_eq!(absent.values["ns_per_op"], 2.0);
    }

    #[test]
    fn partial_fields_use_only_records_that_carry_them() {
        let recs = vec![
            record("BenchmarkBuild", &[], &[("ns_per_op", 10.0), ("bits_key", 80.0)]),
            record("BenchmarkBuild", &[], &[("ns_per_op", 20.0)]),
            record("BenchmarkBuild", &[], &[("ns_per_op", 30.0)]),
        ];
        let rows = aggregate(&recs, &keys(&["benchmark"]));
        assert_eq!(
            rows[0].values,
            BTreeMap::from([
                ("bits_key".to_string(), 80.0),
                ("ns_per_op".to_string(), 20.0),
            ])
        );
    }

    #[test]
    fn non_key_numeric_parameters_are_reduced() {
        let recs = vec![
            record("BenchmarkBuild", &[("keys", 8.0), ("seed", 1.0)], &[]),
            record("BenchmarkBuild", &[("keys", 8.0), ("seed", 3.0)], &[]),
        ];
        let rows = aggregate(&recs, &keys(&["benchmark", "keys"]));
        assert_eq!(rows[0].values["seed"], 2.0);
        assert!(!rows[0].values.contains_key("keys"));
    }

    #[test]
    fn result_is_independent_of_record_order() {
        let mut recs = vec![
            record("BenchmarkBuild", &[("keys", 1.0)], &[("ns_per_op", 5.0)]),
            record("BenchmarkBuild", &[("keys", 2.0)], &[("ns_per_op", 9.0)]),
            record("BenchmarkBuild", &[("keys", 1.0)], &[("ns_per_op", 1.0)]),
            record("BenchmarkBuild", &[("keys", 1.0)], &[("ns_per_op", 3.0)]),
        ];
        let group = keys(&["benchmark", "keys"]);
        let forward = aggregate(&recs, &group);
        recs.reverse();
        assert_eq!(aggregate(&recs, &group), forward);
        assert_eq!(forward[0].values["ns_per_op"], 3.0);
    }

    #[test]
    fn groups_by_module() {
        let mut a = record("BenchmarkBuild", &[], &[("ns_per_op", 1.0)]);
        a.module = "lerloc".into();
        let b = record("BenchmarkBuild", &[], &[("ns_per_op", 2.0)]);
        let rows = aggregate(&[a, b], &keys(&["module"]));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text("module"), "lerloc");
    }
}
