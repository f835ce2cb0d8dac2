//! Report driver: parse every module's log, write the summary tables and
//! render the chart set.

use crate::config::ValidatedConfig;
use crate::log::mem_report::COMPONENTS;
use crate::log::{self, MemBreakdown, MetricRecord};
use crate::model::{self, SummaryRow, median, quantile};
use crate::render::{
    Labels, RenderError, Rendered, Series, render_bar_chart, render_line_chart,
    render_stacked_area, write_chart,
};
use crate::table;
use crate::theory;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{info, warn};

pub const RECORDS_FILE: &str = "all_runs.csv";
pub const SUMMARY_FILE: &str = "agg.csv";
pub const BREAKDOWN_FILE: &str = "mem_breakdown.csv";
pub const PLOTS_DIR: &str = "plots";

/// Metric names that carry bits per key, in lookup order.
const BITS_PER_KEY_METRICS: [&str; 2] = ["bits_per_key", "bits_key_in_mem"];
const QUERY_MARKERS: [&str; 3] = ["Query", "Search", "Lookup"];

/// Repeats whose p90/p10 `ns/op` ratio exceeds this are reported as noisy.
const NOISE_RATIO: f64 = 1.5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportSummary {
    pub records: usize,
    pub groups: usize,
    pub mem_reports: usize,
    /// Marker lines that could not be used.
    pub skipped: usize,
    /// Invocations whose repeats disagree beyond [`NOISE_RATIO`].
    pub noisy: usize,
    pub charts: usize,
}

/// Parse, aggregate and render everything under `out_dir`.
pub fn build_report(cfg: &ValidatedConfig, out_dir: &Path) -> anyhow::Result<ReportSummary> {
    let mut records: Vec<MetricRecord> = Vec::new();
    let mut reports: Vec<MemBreakdown> = Vec::new();
    let mut skipped = 0;
    for module in &cfg.modules {
        let parsed = log::parse_log_file(&module.out, &module.name)?;
        if parsed.records.is_empty() && parsed.mem_reports.is_empty() {
            warn!(module = %module.name, path = %module.out.display(), "no data for module");
        }
        info!(
            module = %module.name,
            records = parsed.records.len(),
            mem_reports = parsed.mem_reports.len(),
            "parsed log"
        );
        records.extend(parsed.records);
        reports.extend(parsed.mem_reports);
        skipped += parsed.skipped;
    }

    let noisy = noisy_invocations(&records);
    for (module, name, ratio) in &noisy {
        warn!(module = %module, benchmark = %name, ratio = %format!("{ratio:.2}"), "noisy repeats (p90/p10 ns/op)");
    }

    table::write_table(out_dir.join(RECORDS_FILE), &table::records_table(&records))?;
    let summary = model::aggregate(&records, &cfg.group_by);
    table::write_table(out_dir.join(SUMMARY_FILE), &table::summary_table(&summary))?;
    table::write_table(out_dir.join(BREAKDOWN_FILE), &table::breakdown_table(&reports))?;

    let rows = model::aggregate(&records, &chart_keys(&records));
    let charts = render_charts(&rows, &reports, &out_dir.join(PLOTS_DIR));

    Ok(ReportSummary {
        records: records.len(),
        groups: summary.len(),
        mem_reports: reports.len(),
        skipped,
        noisy: noisy.len(),
        charts,
    })
}

/// Invocations with at least three repeats whose `ns_per_op` spread between
/// the 10th and 90th percentile exceeds [`NOISE_RATIO`].
fn noisy_invocations(records: &[MetricRecord]) -> Vec<(String, String, f64)> {
    let mut samples: BTreeMap<(&str, &str), Vec<f64>> = BTreeMap::new();
    for r in records {
        if let Some(v) = r.metrics.get("ns_per_op") {
            samples
                .entry((r.module.as_str(), r.full_name.as_str()))
                .or_default()
                .push(*v);
        }
    }
    samples
        .into_iter()
        .filter(|(_, v)| v.len() >= 3)
        .filter_map(|((module, name), v)| {
            let lo = quantile(&v, 0.1)?;
            let hi = quantile(&v, 0.9)?;
            (lo > 0.0 && hi / lo > NOISE_RATIO).then(|| (module.to_string(), name.to_string(), hi / lo))
        })
        .collect()
}

/// Charts split series by every configuration a record carries:
/// benchmark, module and all parameter names.
fn chart_keys(records: &[MetricRecord]) -> Vec<String> {
    let params: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.parameters.keys().map(String::as_str))
        .collect();
    ["benchmark", "module"]
        .into_iter()
        .chain(params)
        .map(str::to_string)
        .collect()
}

fn render_charts(rows: &[SummaryRow], reports: &[MemBreakdown], plots: &Path) -> usize {
    let mut written = 0;
    let mut emit = |name: &str, chart: Result<Rendered, RenderError>| {
        let chart = match chart {
            Ok(c) => c,
            Err(e) => {
                warn!(chart = name, error = %e, "chart not rendered");
                return;
            }
        };
        match write_chart(plots.join(name), &chart) {
            Ok(true) => written += 1,
            Ok(false) => {}
            Err(e) => warn!(chart = name, error = %format!("{e:#}"), "chart not written"),
        }
    };

    let build = series_by_config(rows, |r| r.text("benchmark").contains("Build"), &["ns_per_op"]);
    emit(
        "build_time.svg",
        render_line_chart(&Labels::new("Build Time", "Keys (N)", "ns/op"), &build, true, true),
    );

    let bits = series_by_config(rows, |_| true, &BITS_PER_KEY_METRICS);
    emit(
        "bits_per_key.svg",
        render_line_chart(&Labels::new("Space Usage", "Keys (N)", "bits/key"), &bits, true, false),
    );

    let query = series_by_config(
        rows,
        |r| {
            let b = r.text("benchmark");
            QUERY_MARKERS.iter().any(|m| b.contains(m))
        },
        &["ns_per_op"],
    );
    emit(
        "query_latency.svg",
        render_line_chart(&Labels::new("Query Latency", "Keys (N)", "ns/op"), &query, true, true),
    );

    let mem = breakdown_medians(reports);
    let efficiency: Vec<Series> = mem
        .iter()
        .map(|((module, mode), by_keys)| {
            let points = by_keys.iter().map(|(&n, c)| (n as f64, c.total)).collect();
            Series::new(format!("{module} {mode}"), points)
        })
        .collect();
    emit(
        "memory_efficiency.svg",
        render_line_chart(
            &Labels::new("Memory Efficiency", "Keys (N)", "bits/key"),
            &efficiency,
            true,
            false,
        ),
    );
    for ((module, mode), by_keys) in &mem {
        let layers: Vec<Series> = COMPONENTS
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let points = by_keys.iter().map(|(&n, b)| (n as f64, b.components[i])).collect();
                Series::new(*c, points)
            })
            .collect();
        let labels = Labels::new(format!("Memory Breakdown: {module} ({mode})"), "Keys (N)", "bits/key");
        emit(
            &format!("mem_breakdown_{}_{}.svg", file_part(module), file_part(mode)),
            render_stacked_area(&labels, &layers, true),
        );
    }

    let (empirical, bars) = success_series(rows);
    emit(
        "build_success.svg",
        render_line_chart(
            &Labels::new("Build Success: Empirical vs Theory", "Keys (N)", "Success rate"),
            &empirical,
            true,
            false,
        ),
    );
    emit(
        "success_by_sbits.svg",
        Ok(render_bar_chart(
            &Labels::new("Build Success Rate vs S", "S bits", "Success rate"),
            &bars,
        )),
    );

    written
}

/// One series per configuration (all key fields except `keys` and the
/// fields the points come from), x = keys, y = the first of `metrics` the
/// row carries.
fn series_by_config(
    rows: &[SummaryRow],
    include: impl Fn(&SummaryRow) -> bool,
    metrics: &[&str],
) -> Vec<Series> {
    let mut by_label: BTreeMap<String, Vec<(f64, f64)>> = BTreeMap::new();
    for row in rows.iter().filter(|r| include(r)) {
        let Some(x) = row.number("keys") else {
            continue;
        };
        let Some(y) = metrics.iter().find_map(|m| row.values.get(*m).copied()) else {
            continue;
        };
        by_label.entry(series_label(row)).or_default().push((x, y));
    }
    by_label
        .into_iter()
        .map(|(label, mut points)| {
            points.sort_by(|a, b| a.0.total_cmp(&b.0));
            Series::new(label, points)
        })
        .collect()
}

/// Key fields other than `keys`, as `Build rloc keysize=64`.
fn series_label(row: &SummaryRow) -> String {
    row.key
        .iter()
        .filter(|(k, _)| k != "keys")
        .filter_map(|(k, v)| v.as_ref().map(|v| (k.as_str(), v.to_string())))
        .map(|(k, v)| match k {
            "benchmark" => v.trim_start_matches("Benchmark").to_string(),
            "module" => v,
            _ => format!("{k}={v}"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Empirical `success_rate` series, each followed by its theory overlay
/// (from the row's `keysize` and `sbits`), plus bars of success rate per
/// signature width at the largest key count.
fn success_series(rows: &[SummaryRow]) -> (Vec<Series>, Vec<(String, f64)>) {
    let measured: Vec<&SummaryRow> = rows
        .iter()
        .filter(|r| r.values.contains_key("success_rate"))
        .collect();

    let mut out = Vec::new();
    let empirical = series_by_config(rows, |r| r.values.contains_key("success_rate"), &["success_rate"]);
    for series in empirical {
        let params = measured
            .iter()
            .find(|r| series_label(r) == series.name)
            .and_then(|r| Some((r.number("keysize")?, r.number("sbits")?)));
        let overlay = params.filter(|(w, s)| *w >= 1.0 && *s >= 1.0).map(|(w, s)| {
            let keys: Vec<u64> = series.points.iter().map(|(x, _)| *x as u64).collect();
            theory::theory_series(
                format!("{} theory", series.name),
                &keys,
                w as u32,
                s as u32,
                theory::DEFAULT_REBUILD_ATTEMPTS,
            )
        });
        out.push(series);
        out.extend(overlay);
    }

    let max_keys = measured
        .iter()
        .filter_map(|r| r.number("keys"))
        .fold(None, |acc: Option<f64>, n| Some(acc.map_or(n, |a| a.max(n))));
    let mut by_sbits: BTreeMap<u64, Vec<f64>> = BTreeMap::new();
    for r in &measured {
        if max_keys.is_some() && r.number("keys") != max_keys {
            continue;
        }
        if let (Some(s), Some(rate)) = (r.number("sbits"), r.values.get("success_rate")) {
            by_sbits.entry(s as u64).or_default().push(*rate);
        }
    }
    let bars = by_sbits
        .into_iter()
        .filter_map(|(s, rates)| median(&rates).map(|m| (s.to_string(), m)))
        .collect();

    (out, bars)
}

/// Median bits per key per canonical component (in `COMPONENTS` order)
/// plus the median total.
#[derive(Debug, Clone, PartialEq)]
struct ComponentBits {
    components: Vec<f64>,
    total: f64,
}

fn breakdown_medians(reports: &[MemBreakdown]) -> BTreeMap<(String, String), BTreeMap<u64, ComponentBits>> {
    let mut grouped: BTreeMap<(String, String), BTreeMap<u64, Vec<&MemBreakdown>>> = BTreeMap::new();
    for r in reports.iter().filter(|r| r.keys > 0) {
        grouped
            .entry((r.module.clone(), r.mode.clone()))
            .or_default()
            .entry(r.keys)
            .or_default()
            .push(r);
    }
    grouped
        .into_iter()
        .map(|(id, by_keys)| {
            let by_keys = by_keys
                .into_iter()
                .map(|(n, reps)| {
                    let components = COMPONENTS
                        .iter()
                        .map(|c| {
                            let v: Vec<f64> = reps.iter().map(|r| r.bits_per_key(c)).collect();
                            median(&v).unwrap_or(0.0)
                        })
                        .collect();
                    let totals: Vec<f64> = reps.iter().map(|r| r.total_bits_per_key()).collect();
                    let total = median(&totals).unwrap_or(0.0);
                    (n, ComponentBits { components, total })
                })
                .collect();
            (id, by_keys)
        })
        .collect()
}

fn file_part(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HarnessSpec, ModuleSpec};
    use pretty_assertions::assert_eq;
    use regex::Regex;
    use std::fs;

    fn config(root: &Path, modules: &[(&str, &str)]) -> ValidatedConfig {
        let modules = modules
            .iter()
            .map(|(name, text)| {
                let out = root.join("raw").join(format!("{name}.txt"));
                fs::create_dir_all(out.parent().unwrap()).unwrap();
                fs::write(&out, text).unwrap();
                ModuleSpec {
                    name: name.to_string(),
                    dir: root.to_path_buf(),
                    out,
                }
            })
            .collect();
        ValidatedConfig {
            modules,
            harness: HarnessSpec::default(),
            repeat: 1,
            jobs: 1,
            bench: ".".into(),
            bench_re: Regex::new(".").unwrap(),
            split: false,
            group_by: vec!["benchmark".into(), "keys".into()],
        }
    }

    const RLOC: &str = "\
goos: linux
BenchmarkBuild/keys=1024-8 1 1000 ns/op 64 B/op 2 allocs/op
BenchmarkBuild/keys=1024-8 1 3000 ns/op 64 B/op 2 allocs/op
BenchmarkBuild/keys=65536-8 1 90000 ns/op 64 B/op 2 allocs/op
BenchmarkLookup/keys=1024-8 1000 35 ns/op 12.5 bits_per_key
BenchmarkLookup/keys=65536-8 1000 48 ns/op 11.0 bits_per_key
BenchmarkMemoryDetailed/Keys=1024-8
    mem_test.go:41: JSON_MEM_REPORT: {\"name\":\"rloc\",\"total_bytes\":2048,\"children\":[{\"name\":\"hzft\",\"total_bytes\":1024}]}
    mem_test.go:41: JSON_MEM_REPORT: {\"name\":\"rloc\",\"total_bytes\":1024,\"children\":[{\"name\":\"hzft\",\"total_bytes\":9999}]}
PASS
";

    const STUDY: &str = "\
BenchmarkBuildSuccess/keysize=64/sbits=8/keys=1000-8 1 0.40 success_rate
BenchmarkBuildSuccess/keysize=64/sbits=8/keys=10000-8 1 0.02 success_rate
BenchmarkBuildSuccess/keysize=64/sbits=16/keys=10000-8 1 1 success_rate
";

    #[test]
    fn writes_tables_and_charts() {
        let root = tempfile::tempdir().unwrap();
        let cfg = config(root.path(), &[("rloc", RLOC), ("study", STUDY), ("empty", "")]);
        let out = root.path().join("parsed");

        let summary = build_report(&cfg, &out).unwrap();
        assert_eq!(summary.records, 8);
        assert_eq!(summary.mem_reports, 1);
        assert_eq!(summary.skipped, 1);

        let agg = fs::read_to_string(out.join(SUMMARY_FILE)).unwrap();
        let build_1024 = agg
            .lines()
            .find(|l| l.starts_with("BenchmarkBuild,1024,"))
            .unwrap();
        // Median of 1000 and 3000.
        assert!(build_1024.contains(",2000"), "{build_1024}");

        let breakdown = fs::read_to_string(out.join(BREAKDOWN_FILE)).unwrap();
        let lines: Vec<&str> = breakdown.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("rloc,default,1024,8.0000,8.0000,"), "{}", lines[1]);
        assert!(out.join(RECORDS_FILE).exists());

        let plots = out.join(PLOTS_DIR);
        for name in [
            "build_time.svg",
            "bits_per_key.svg",
            "query_latency.svg",
            "memory_efficiency.svg",
            "mem_breakdown_rloc_default.svg",
            "build_success.svg",
            "success_by_sbits.svg",
        ] {
            assert!(plots.join(name).exists(), "{name}");
        }
        assert_eq!(summary.charts, 7);
    }

    #[test]
    fn success_overlay_follows_each_configuration() {
        let records = log::parse_log_text(STUDY, "study").records;
        let rows = model::aggregate(&records, &chart_keys(&records));
        let (series, bars) = success_series(&rows);
        let names: Vec<(&str, bool)> = series.iter().map(|s| (s.name.as_str(), s.dashed)).collect();
        assert_eq!(
            names,
            vec![
                ("BuildSuccess study keysize=64 sbits=16", false),
                ("BuildSuccess study keysize=64 sbits=16 theory", true),
                ("BuildSuccess study keysize=64 sbits=8", false),
                ("BuildSuccess study keysize=64 sbits=8 theory", true),
            ]
        );
        assert_eq!(bars, vec![("8".to_string(), 0.02), ("16".to_string(), 1.0)]);
        // Same key count: the narrower signature is predicted to fail more.
        assert_eq!(series[3].points[1].0, series[1].points[0].0);
        assert!(series[3].points[1].1 < series[1].points[0].1);
    }

    #[test]
    fn empty_input_writes_headers_and_no_charts() {
        let root = tempfile::tempdir().unwrap();
        let cfg = config(root.path(), &[("a", "PASS\n")]);
        let summary = build_report(&cfg, &root.path().join("out")).unwrap();
        assert_eq!(summary.records, 0);
        assert_eq!(summary.charts, 0);
        assert!(!root.path().join("out").join(PLOTS_DIR).exists());
    }

    #[test]
    fn flags_noisy_repeats_only() {
        let text = "\
BenchmarkBuild/keys=8-8 1 100 ns/op
BenchmarkBuild/keys=8-8 1 104 ns/op
BenchmarkBuild/keys=8-8 1 400 ns/op
BenchmarkBuild/keys=16-8 1 100 ns/op
BenchmarkBuild/keys=16-8 1 101 ns/op
BenchmarkBuild/keys=16-8 1 102 ns/op
BenchmarkBuild/keys=32-8 1 100 ns/op
BenchmarkBuild/keys=32-8 1 900 ns/op
";
        let records = log::parse_log_text(text, "rloc").records;
        let noisy = noisy_invocations(&records);
        assert_eq!(noisy.len(), 1);
        assert_eq!(noisy[0].1, "BenchmarkBuild/keys=8-8");
        assert_eq!(noisy[0].2, 4.0);
    }

    #[test]
    fn labels_drop_the_x_field() {
        let records = log::parse_log_text(
            "BenchmarkBuild/keysize=32/keys=8-4 1 5 ns/op\n",
            "rloc",
        )
        .records;
        let rows = model::aggregate(&records, &chart_keys(&records));
        assert_eq!(series_label(&rows[0]), "Build rloc keysize=32");
    }
}
