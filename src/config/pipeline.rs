//! Pipeline config (pipeline.json): the modules to benchmark and how to run them.
//!
//! JSON shape:
//! {
//!   "modules": [
//!     { "name": "rloc", "dir": "locators/rloc", "out": "raw/rloc.txt" }
//!   ],
//!   "harness": {                       // optional, defaults to `go test`
//!     "program": "go",
//!     "args": ["test", "-bench={bench}", "-count=1", "-benchmem", "./..."],
//!     "list_args": ["test", "-list", "{bench}"],
//!     "list_prefix": "Benchmark"
//!   },
//!   "repeat": 5,
//!   "jobs": 8,                         // optional, defaults to available cores
//!   "bench": ".",
//!   "split": false,
//!   "group_by": ["benchmark", "keysize", "keys", "prefixlen"]
//! }
//!
//! Relative `dir`/`out` paths resolve against the config file's directory.

use crate::Result;
use anyhow::{Context, bail};
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Placeholder in harness arguments replaced by the benchmark pattern.
pub const BENCH_PLACEHOLDER: &str = "{bench}";

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub modules: Vec<RawModule>,

    #[serde(default)]
    pub harness: HarnessSpec,

    #[serde(default = "default_repeat")]
    pub repeat: usize,

    #[serde(default)]
    pub jobs: Option<usize>,

    #[serde(default = "default_bench")]
    pub bench: String,

    #[serde(default)]
    pub split: bool,

    #[serde(default = "default_group_by")]
    pub group_by: Vec<String>,
}

/// Module entry as it appears in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct RawModule {
    pub name: String,
    pub dir: PathBuf,
    pub out: PathBuf,
}

/// External benchmark harness invocation.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HarnessSpec {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Arguments that list benchmark names instead of running them.
    #[serde(default)]
    pub list_args: Vec<String>,

    /// Only listing lines starting with this prefix are benchmark names.
    #[serde(default = "default_list_prefix")]
    pub list_prefix: String,
}

impl Default for HarnessSpec {
    fn default() -> Self {
        Self {
            program: "go".to_string(),
            args: ["test", "-bench={bench}", "-count=1", "-benchmem", "./..."]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            list_args: ["test", "-list", "{bench}"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            list_prefix: default_list_prefix(),
        }
    }
}

impl HarnessSpec {
    /// Run arguments with the pattern substituted.
    pub fn run_args(&self, bench: &str) -> Vec<String> {
        substitute(&self.args, bench)
    }

    /// Listing arguments with the pattern substituted.
    pub fn list_args(&self, bench: &str) -> Vec<String> {
        substitute(&self.list_args, bench)
    }
}

fn substitute(args: &[String], bench: &str) -> Vec<String> {
    args.iter()
        .map(|a| a.replace(BENCH_PLACEHOLDER, bench))
        .collect()
}

fn default_repeat() -> usize {
    5
}

fn default_bench() -> String {
    ".".to_string()
}

fn default_list_prefix() -> String {
    "Benchmark".to_string()
}

fn default_group_by() -> Vec<String> {
    ["benchmark", "keysize", "keys", "prefixlen"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub repeat: Option<usize>,
    pub jobs: Option<usize>,
    pub bench: Option<String>,
    pub split: bool,
}

/// One module to benchmark.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleSpec {
    pub name: String,
    /// Working directory holding the benchmark target.
    pub dir: PathBuf,
    /// Merged log destination.
    pub out: PathBuf,
}

/// Validated configuration with resolved paths.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub modules: Vec<ModuleSpec>,
    pub harness: HarnessSpec,
    pub repeat: usize,
    pub jobs: usize,
    pub bench: String,
    /// `bench` compiled, for filtering discovered benchmark names.
    pub bench_re: Regex,
    pub split: bool,
    pub group_by: Vec<String>,
}

impl PipelineConfig {
    /// Read and parse a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse config file {}", path.display()))
    }

    pub fn apply(&mut self, o: &Overrides) {
        if let Some(r) = o.repeat {
            self.repeat = r;
        }
        if let Some(j) = o.jobs {
            self.jobs = Some(j);
        }
        if let Some(b) = &o.bench {
            self.bench = b.clone();
        }
        self.split |= o.split;
    }

    /// Validate and resolve relative paths against `base_dir`:
    /// - at least one module, unique module names and output paths
    /// - repeat and jobs at least 1
    /// - harness program present
    /// - bench pattern compiles
    pub fn validate_and_build(&self, base_dir: &Path) -> Result<ValidatedConfig> {
        if self.modules.is_empty() {
            bail!("config must list at least 1 module");
        }
        let mut names = BTreeSet::new();
        let mut outs: BTreeMap<PathBuf, &str> = BTreeMap::new();
        for m in &self.modules {
            if m.name.trim().is_empty() {
                bail!("module with empty name (dir {})", m.dir.display());
            }
            if !names.insert(m.name.as_str()) {
                bail!("duplicate module name in config: {}", m.name);
            }
            let out = resolve(base_dir, &m.out);
            if let Some(other) = outs.get(&out) {
                bail!("modules {} and {} share output path {}", other, m.name, out.display());
            }
            outs.insert(out, m.name.as_str());
        }
        if self.repeat == 0 {
            bail!("repeat must be at least 1");
        }
        if self.jobs == Some(0) {
            bail!("jobs must be at least 1");
        }
        if self.harness.program.trim().is_empty() {
            bail!("harness program must not be empty");
        }
        let bench_re = Regex::new(&self.bench)
            .with_context(|| format!("bad benchmark pattern {:?}", self.bench))?;

        let jobs = self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        });

        let modules = self
            .modules
            .iter()
            .map(|m| ModuleSpec {
                name: m.name.clone(),
                dir: resolve(base_dir, &m.dir),
                out: resolve(base_dir, &m.out),
            })
            .collect();

        Ok(ValidatedConfig {
            modules,
            harness: self.harness.clone(),
            repeat: self.repeat,
            jobs,
            bench: self.bench.clone(),
            bench_re,
            split: self.split,
            group_by: self.group_by.iter().map(|k| k.to_lowercase()).collect(),
        })
    }
}

fn resolve(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

/// Load, apply overrides and validate in one step. Relative paths resolve
/// against the config file's directory.
pub fn load_validated(path: impl AsRef<Path>, overrides: &Overrides) -> Result<ValidatedConfig> {
    let path = path.as_ref();
    let mut cfg = PipelineConfig::load(path)?;
    cfg.apply(overrides);
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    cfg.validate_and_build(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(json: &str) -> PipelineConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn defaults_fill_everything_but_modules() {
        let cfg = parse(r#"{"modules":[{"name":"rloc","dir":"rloc","out":"raw/rloc.txt"}]}"#);
        let v = cfg.validate_and_build(Path::new("/bench")).unwrap();
        assert_eq!(v.repeat, 5);
        assert!(v.jobs >= 1);
        assert_eq!(v.bench, ".");
        assert!(!v.split);
        assert_eq!(v.harness, HarnessSpec::default());
        assert_eq!(v.group_by, vec!["benchmark", "keysize", "keys", "prefixlen"]);
        assert_eq!(
            v.modules,
            vec![ModuleSpec {
                name: "rloc".into(),
                dir: PathBuf::from("/bench/rloc"),
                out: PathBuf::from("/bench/raw/rloc.txt"),
            }]
        );
    }

    #[test]
    fn harness_placeholder_is_substituted() {
        let h = HarnessSpec::default();
        assert_eq!(
            h.run_args("^BenchmarkBuild$"),
            vec!["test", "-bench=^BenchmarkBuild$", "-count=1", "-benchmem", "./..."]
        );
        assert_eq!(h.list_args("Build"), vec!["test", "-list", "Build"]);
    }

    #[test]
    fn overrides_win() {
        let mut cfg = parse(r#"{"modules":[{"name":"a","dir":"a","out":"a.txt"}],"repeat":3}"#);
        cfg.apply(&Overrides {
            repeat: Some(9),
            jobs: Some(2),
            bench: Some("Build".into()),
            split: true,
        });
        let v = cfg.validate_and_build(Path::new(".")).unwrap();
        assert_eq!((v.repeat, v.jobs, v.bench.as_str(), v.split), (9, 2, "Build", true));
    }

    #[test]
    fn rejects_bad_configs() {
        let cases = [
            r#"{"modules":[]}"#,
            r#"{"modules":[{"name":"a","dir":"a","out":"a"},{"name":"a","dir":"b","out":"b"}]}"#,
            r#"{"modules":[{"name":"a","dir":"a","out":"a"}],"repeat":0}"#,
            r#"{"modules":[{"name":"a","dir":"a","out":"a"}],"jobs":0}"#,
            r#"{"modules":[{"name":"a","dir":"a","out":"a"}],"bench":"("}"#,
            r#"{"modules":[{"name":"a","dir":"a","out":"a"}],"harness":{"program":" "}}"#,
        ];
        for json in cases {
            assert!(parse(json).validate_and_build(Path::new(".")).is_err(), "{json}");
        }
    }

    #[test]
    fn shared_output_path_is_rejected() {
        let same = parse(r#"{"modules":[{"name":"a","dir":"a","out":"x.txt"},{"name":"b","dir":"b","out":"x.txt"}]}"#);
        let err = same.validate_and_build(Path::new("/base")).unwrap_err();
        assert!(err.to_string().contains("share output path"), "{err}");

        // Relative and absolute spellings of one file collide too.
        let mixed = parse(r#"{"modules":[{"name":"a","dir":"a","out":"raw/x.txt"},{"name":"b","dir":"b","out":"/base/raw/x.txt"}]}"#);
        assert!(mixed.validate_and_build(Path::new("/base")).is_err());

        let distinct = parse(r#"{"modules":[{"name":"a","dir":"a","out":"a.txt"},{"name":"b","dir":"b","out":"b.txt"}]}"#);
        assert!(distinct.validate_and_build(Path::new("/base")).is_ok());
    }

    #[test]
    fn absolute_paths_are_kept() {
        let cfg = parse(r#"{"modules":[{"name":"a","dir":"/src/a","out":"/tmp/a.txt"}]}"#);
        let v = cfg.validate_and_build(Path::new("/elsewhere")).unwrap();
        assert_eq!(v.modules[0].dir, PathBuf::from("/src/a"));
        assert_eq!(v.modules[0].out, PathBuf::from("/tmp/a.txt"));
    }

    #[test]
    fn loads_from_file_relative_to_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        fs::write(
            &path,
            r#"{"modules":[{"name":"a","dir":"mods/a","out":"raw/a.txt"}],"group_by":["Benchmark","Keys"]}"#,
        )
        .unwrap();
        let v = load_validated(&path, &Overrides::default()).unwrap();
        assert_eq!(v.modules[0].dir, dir.path().join("mods/a"));
        assert_eq!(v.group_by, vec!["benchmark", "keys"]);
    }
}
