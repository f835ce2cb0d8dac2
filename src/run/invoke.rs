use crate::Result;
use crate::config::HarnessSpec;
use anyhow::{Context, bail};
use regex::Regex;
use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// One external benchmark process: a (module, benchmark, iteration) slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Index into the config's module list.
    pub module: usize,
    /// Benchmark name in split mode; `None` runs the whole pattern at once.
    pub bench: Option<String>,
    pub iteration: usize,
    /// Captured stdout + stderr.
    pub temp_path: PathBuf,
}

impl Invocation {
    pub fn new(module: usize, out: &Path, bench: Option<String>, iteration: usize) -> Self {
        let temp_path = temp_path(out, bench.as_deref(), iteration);
        Self {
            module,
            bench,
            iteration,
            temp_path,
        }
    }

    /// Pattern handed to the harness: the anchored name in split mode.
    pub fn pattern(&self, default: &str) -> String {
        match &self.bench {
            Some(name) => format!("^{name}$"),
            None => default.to_string(),
        }
    }
}

/// `<out>.<iteration>` or `<out>.<bench>.<iteration>`.
pub fn temp_path(out: &Path, bench: Option<&str>, iteration: usize) -> PathBuf {
    let mut s: OsString = out.as_os_str().to_owned();
    if let Some(b) = bench {
        s.push(".");
        s.push(b);
    }
    s.push(format!(".{iteration}"));
    PathBuf::from(s)
}

/// Run the harness in `dir` with `pattern`, capturing both output streams
/// into `temp_path`. A non-zero exit is an error; the file is left for the
/// merge step to clean up.
pub fn execute(harness: &HarnessSpec, dir: &Path, pattern: &str, temp_path: &Path) -> Result<()> {
    let out = File::create(temp_path)
        .with_context(|| format!("create temp output {}", temp_path.display()))?;
    let err = out
        .try_clone()
        .with_context(|| format!("share temp output {}", temp_path.display()))?;

    let args = harness.run_args(pattern);
    debug!(program = %harness.program, ?args, dir = %dir.display(), "spawning benchmark");
    let status = Command::new(&harness.program)
        .args(&args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(out))
        .stderr(Stdio::from(err))
        .status()
        .with_context(|| format!("spawn {} in {}", harness.program, dir.display()))?;

    if !status.success() {
        bail!("{} exited with {status}", harness.program);
    }
    Ok(())
}

/// List benchmark names in `dir` matching `pattern`: listing lines that
/// start with the harness prefix and match `filter`, in listing order,
/// without duplicates.
pub fn discover(
    harness: &HarnessSpec,
    dir: &Path,
    pattern: &str,
    filter: &Regex,
) -> Result<Vec<String>> {
    let args = harness.list_args(pattern);
    let output = Command::new(&harness.program)
        .args(&args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .with_context(|| format!("spawn {} in {}", harness.program, dir.display()))?;
    if !output.status.success() {
        bail!("listing benchmarks in {} failed: {}", dir.display(), output.status);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut names: Vec<String> = Vec::new();
    for line in stdout.lines().map(str::trim) {
        if !line.starts_with(&harness.list_prefix) || !filter.is_match(line) {
            continue;
        }
        if !names.iter().any(|n| n == line) {
            names.push(line.to_string());
        }
    }
    Ok(names)
}
