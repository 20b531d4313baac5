use crate::decoder::DictionarySource;
use crate::error::DslError;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Dictionary root: `$GDCL_DICT_DIR` override, else `~/.goldendict/dic`.
pub fn dict_root() -> PathBuf {
    if let Ok(p) = std::env::var("GDCL_DICT_DIR") {
        return PathBuf::from(p);
    }
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".goldendict")
        .join("dic")
}

fn is_dsl_name(name: &str) -> bool {
    name.ends_with(".dsl") || name.ends_with(".dsl.dz")
}

/// Matches exclusion entries against a file name; `foo.dsl` also excludes
/// the compressed `foo.dsl.dz` so config written for unzipped trees keeps
/// working.
fn is_excluded(name: &str, exclude: &[String]) -> bool {
    exclude.iter().any(|x| {
        !x.is_empty() && (name == x.as_str() || name == format!("{}.dz", x).as_str())
    })
}

/// Sorted names of the group directories under the dictionary root.
pub fn list_groups(root: &Path) -> Vec<String> {
    let mut groups: Vec<String> = std::fs::read_dir(root)
        .map(|rd| {
            rd.filter_map(|e| e.ok())
                .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
                .filter_map(|e| e.file_name().to_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();
    groups.sort();
    groups
}

/// Resolves a group name to the sorted list of dictionary source files
/// beneath it, minus exclusions.
pub fn resolve_group(
    root: &Path,
    group: &str,
    exclude: &[String],
) -> Result<Vec<PathBuf>, DslError> {
    let dir = root.join(group);
    if !dir.is_dir() {
        return Err(DslError::GroupNotFound(group.to_string()));
    }
    let mut files: Vec<PathBuf> = WalkDir::new(&dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .file_name()
                .and_then(|s| s.to_str())
                .map(|n| is_dsl_name(n) && !is_excluded(n, exclude))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();
    Ok(files)
}

#[derive(Serialize, Debug, Clone)]
pub struct DictionaryInfo {
    pub path: String,
    pub name: String,
}

/// Display names for a set of dictionary files, decoded in parallel.
/// Unreadable files are dropped; output order is sorted-path order.
pub fn group_index(files: &[PathBuf]) -> Vec<DictionaryInfo> {
    let mut infos: Vec<DictionaryInfo> = files
        .par_iter()
        .filter_map(|p| {
            let src = DictionarySource::open(p).ok()?;
            Some(DictionaryInfo {
                path: p.to_string_lossy().to_string(),
                name: src.display_name(),
            })
        })
        .collect();
    infos.sort_by(|a, b| a.path.cmp(&b.path));
    infos
}
