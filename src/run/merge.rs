use crate::Result;
use anyhow::Context;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// A finished invocation's temp file and whether it succeeded.
#[derive(Debug, Clone)]
pub struct Slot {
    pub temp_path: PathBuf,
    pub ok: bool,
}

/// Concatenate successful slots, in the given order, into `out`, then
/// delete every slot's temp file. Returns how many slots were merged.
///
/// `out` is always (re)created, so a module where everything failed ends
/// up with an empty log.
pub fn merge_slots(out: &Path, slots: &[Slot]) -> Result<usize> {
    if let Some(dir) = out.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
    }
    let file = File::create(out).with_context(|| format!("create {}", out.display()))?;
    let mut w = BufWriter::new(file);

    let mut merged = 0;
    for slot in slots.iter().filter(|s| s.ok) {
        // An unreadable slot becomes a gap, like a failed run.
        match append_slot(&mut w, &slot.temp_path) {
            Ok(()) => merged += 1,
            Err(e) => warn!(
                path = %slot.temp_path.display(),
                out = %out.display(),
                error = %e,
                "could not merge temp file"
            ),
        }
    }
    let flushed = w.flush().with_context(|| format!("write {}", out.display()));

    for slot in slots {
        match fs::remove_file(&slot.temp_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %slot.temp_path.display(), error = %e, "could not delete temp file"),
        }
    }
    flushed?;
    Ok(merged)
}

fn append_slot(w: &mut impl Write, temp_path: &Path) -> io::Result<()> {
    let mut part = File::open(temp_path)?;
    io::copy(&mut part, w)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn merges_successes_in_order_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("raw/m.txt");
        let mut slots = Vec::new();
        for (i, ok) in [(0, true), (1, false), (2, true)] {
            let p = dir.path().join(format!("m.txt.{i}"));
            fs::write(&p, format!("line {i}\n")).unwrap();
            slots.push(Slot { temp_path: p, ok });
        }
        // Missing temp file of a slot that never started.
        slots.push(Slot {
            temp_path: dir.path().join("m.txt.3"),
            ok: false,
        });

        assert_eq!(merge_slots(&out, &slots).unwrap(), 2);
        assert_eq!(fs::read_to_string(&out).unwrap(), "line 0\nline 2\n");
        assert!(slots.iter().all(|s| !s.temp_path.exists()));
    }

    #[test]
    fn unreadable_success_is_a_gap_and_cleanup_still_runs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("m.txt");
        let first = dir.path().join("m.txt.0");
        let last = dir.path().join("m.txt.2");
        fs::write(&first, "line 0\n").unwrap();
        fs::write(&last, "line 2\n").unwrap();
        let slots = vec![
            Slot { temp_path: first, ok: true },
            Slot {
                temp_path: dir.path().join("m.txt.1"),
                ok: true,
            },
            Slot { temp_path: last, ok: true },
        ];

        assert_eq!(merge_slots(&out, &slots).unwrap(), 2);
        assert_eq!(fs::read_to_string(&out).unwrap(), "line 0\nline 2\n");
        assert!(slots.iter().all(|s| !s.temp_path.exists()));
    }

    #[test]
    fn all_failed_gives_empty_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("m.txt");
        fs::write(&out, "stale\n").unwrap();
        let p = dir.path().join("m.txt.0");
        fs::write(&p, "partial").unwrap();
        let n = merge_slots(&out, &[Slot { temp_path: p, ok: false }]).unwrap();
        assert_eq!(n, 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "");
    }
}
