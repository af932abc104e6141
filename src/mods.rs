//! Mod list kept in the user `openmw.cfg`.
//!
//! Each `data=`, `content=` or `groundcover=` line is one mod. A leading `#`
//! disables it without losing its place. Every other line is left alone.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ModsError {
    #[error("Failed to read mod list {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write mod list {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModCategory {
    Data,
    Content,
    Groundcover,
}

impl ModCategory {
    /// File order of the category blocks.
    pub const ALL: [ModCategory; 3] = [
        ModCategory::Data,
        ModCategory::Content,
        ModCategory::Groundcover,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModCategory::Data => "data",
            ModCategory::Content => "content",
            ModCategory::Groundcover => "groundcover",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == key)
    }
}

impl fmt::Display for ModCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModEntry {
    pub category: ModCategory,
    pub value: String,
    /// 1-based position among all mod lines of the file.
    pub index: usize,
    pub enabled: bool,
}

impl ModEntry {
    pub fn line(&self) -> String {
        let line = format!("{}={}", self.category, self.value);
        if self.enabled {
            line
        } else {
            format!("#{line}")
        }
    }
}

/// Splits a trimmed line into its mod fields, if it is one.
fn mod_line(line: &str) -> Option<(ModCategory, &str, bool)> {
    let enabled = !line.starts_with('#');
    let (key, value) = line.strip_prefix('#').unwrap_or(line).split_once('=')?;
    let category = ModCategory::from_key(key.trim())?;
    Some((category, value.trim(), enabled))
}

pub fn parse_mods(content: &str) -> Vec<ModEntry> {
    let mut mods = Vec::new();
    for line in content.lines().map(str::trim) {
        if let Some((category, value, enabled)) = mod_line(line) {
            mods.push(ModEntry {
                category,
                value: value.to_string(),
                index: mods.len() + 1,
                enabled,
            });
        }
    }
    mods
}

/// Adds `entries` to the file's lines, grouped by category.
///
/// Non-mod lines come first in their original order, then one block per
/// non-empty category holding its existing lines followed by the new entries
/// by index.
/// Entries already present (enabled or not) or whose value is in `ignore`
/// are skipped.
pub fn merge_mods(lines: &[String], entries: &[ModEntry], ignore: &[String]) -> Vec<String> {
    let mut other = Vec::new();
    let mut blocks: [Vec<String>; 3] = Default::default();
    let mut present: Vec<(ModCategory, String)> = Vec::new();

    for line in lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        match mod_line(line) {
            Some((category, value, _)) => {
                present.push((category, value.to_string()));
                blocks[category as usize].push(line.to_string());
            }
            None => other.push(line.to_string()),
        }
    }

    let mut sorted: Vec<&ModEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| (e.category, e.index));
    for entry in sorted {
        let key = (entry.category, entry.value.clone());
        if present.contains(&key) || ignore.contains(&entry.value) {
            debug!("Skipping mod {}", entry.line());
            continue;
        }
        blocks[entry.category as usize].push(entry.line());
        present.push(key);
    }

    let mut merged = other;
    if !merged.is_empty() {
        merged.push(String::new());
    }
    for block in blocks.into_iter().filter(|b| !b.is_empty()) {
        merged.extend(block);
        merged.push(String::new());
    }
    merged
}

/// Rewrites every line of `value` in `category` as enabled or disabled.
/// Returns whether any line matched.
pub fn apply_enabled(
    lines: &mut [String],
    category: ModCategory,
    value: &str,
    enabled: bool,
) -> bool {
    let replacement = ModEntry {
        category,
        value: value.to_string(),
        index: 0,
        enabled,
    }
    .line();

    let mut found = false;
    for line in lines.iter_mut() {
        if matches!(mod_line(line.trim()), Some((c, v, _)) if c == category && v == value) {
            *line = replacement.clone();
            found = true;
        }
    }
    found
}

#[derive(Clone, Debug)]
pub struct ModsFile {
    path: PathBuf,
}

impl ModsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_lines(&self) -> Result<Vec<String>, ModsError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content.lines().map(String::from).collect()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No mod list at {}", self.path.display());
                Ok(Vec::new())
            }
            Err(source) => Err(ModsError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_lines(&self, lines: &[String]) -> Result<(), ModsError> {
        std::fs::write(&self.path, lines.join("\n")).map_err(|source| ModsError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Missing file reads as no mods.
    pub fn read_mods(&self) -> Result<Vec<ModEntry>, ModsError> {
        let mods = parse_mods(&self.read_lines()?.join("\n"));
        debug!("Read {} mods from {}", mods.len(), self.path.display());
        Ok(mods)
    }

    pub fn write_mods(&self, entries: &[ModEntry], ignore: &[String]) -> Result<(), ModsError> {
        let merged = merge_mods(&self.read_lines()?, entries, ignore);
        self.write_lines(&merged)?;
        info!("Wrote mod list to {}", self.path.display());
        Ok(())
    }

    pub fn set_enabled(
        &self,
        category: ModCategory,
        value: &str,
        enabled: bool,
    ) -> Result<bool, ModsError> {
        let mut lines = self.read_lines()?;
        if !apply_enabled(&mut lines, category, value, enabled) {
            debug!("No {} entry for {}", category, value);
            return Ok(false);
        }
        self.write_lines(&lines)?;
        let action = if enabled { "Enabled" } else { "Disabled" };
        info!("{} {}={}", action, category, value);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# This is the user openmw.cfg.
fallback-archive=Morrowind.bsa
content = Morrowind.esm
#content=Tribunal.esm
data=/storage/Data Files
groundcover=Grass.esp
content=Bloodmoon.esm
";

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(String::from).collect()
    }

    fn entry(category: ModCategory, value: &str, index: usize, enabled: bool) -> ModEntry {
        ModEntry {
            category,
            value: value.to_string(),
            index,
            enabled,
        }
    }

    #[test]
    fn reads_mod_lines_in_file_order() {
        let mods = parse_mods(SAMPLE);
        assert_eq!(
            mods,
            vec![
                entry(ModCategory::Content, "Morrowind.esm", 1, true),
                entry(ModCategory::Content, "Tribunal.esm", 2, false),
                entry(ModCategory::Data, "/storage/Data Files", 3, true),
                entry(ModCategory::Groundcover, "Grass.esp", 4, true),
                entry(ModCategory::Content, "Bloodmoon.esm", 5, true),
            ]
        );
    }

    #[test]
    fn merge_groups_by_category_and_keeps_other_lines() {
        let merged = merge_mods(
            &lines(SAMPLE),
            &[
                entry(ModCategory::Content, "Mod B.esp", 2, true),
                entry(ModCategory::Content, "Mod A.esp", 1, false),
                entry(ModCategory::Data, "/storage/Mods", 1, true),
            ],
            &[],
        );
        assert_eq!(
            merged,
            lines(
                "# This is the user openmw.cfg.\n\
                 fallback-archive=Morrowind.bsa\n\
                 \n\
                 data=/storage/Data Files\n\
                 data=/storage/Mods\n\
                 \n\
                 content = Morrowind.esm\n\
                 #content=Tribunal.esm\n\
                 content=Bloodmoon.esm\n\
                 #content=Mod A.esp\n\
                 content=Mod B.esp\n\
                 \n\
                 groundcover=Grass.esp\n"
            )
            .into_iter()
            .chain([String::new()])
            .collect::<Vec<_>>()
        );
    }

    #[test]
    fn merge_skips_duplicates_and_ignored_values() {
        let merged = merge_mods(
            &lines(SAMPLE),
            &[
                entry(ModCategory::Content, "Tribunal.esm", 1, true),
                entry(ModCategory::Content, "Morrowind.esm", 2, true),
                entry(ModCategory::Content, "Unwanted.esp", 3, true),
            ],
            &["Unwanted.esp".to_string()],
        );
        let mods = parse_mods(&merged.join("\n"));
        assert_eq!(mods.len(), 5);
        assert!(mods.iter().all(|m| m.value != "Unwanted.esp"));
        // The disabled line is kept as it was.
        let tribunal = mods.iter().find(|m| m.value == "Tribunal.esm").unwrap();
        assert!(!tribunal.enabled);
    }

    #[test]
    fn toggling_matches_whole_values() {
        let mut file = lines("content=Mod.esp\ncontent=Mod.esp.bak\n");
        assert!(apply_enabled(&mut file, ModCategory::Content, "Mod.esp", false));
        assert_eq!(file, lines("#content=Mod.esp\ncontent=Mod.esp.bak"));

        assert!(!apply_enabled(&mut file, ModCategory::Data, "Mod.esp", true));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mods = ModsFile::new(dir.path().join("openmw.cfg"));
        assert!(mods.read_mods().unwrap().is_empty());

        mods.write_mods(
            &[
                entry(ModCategory::Content, "Morrowind.esm", 1, true),
                entry(ModCategory::Groundcover, "Grass.esp", 2, true),
            ],
            &[],
        )
        .unwrap();
        assert!(mods.set_enabled(ModCategory::Groundcover, "Grass.esp", false).unwrap());
        assert!(!mods.set_enabled(ModCategory::Data, "missing", true).unwrap());

        let read = mods.read_mods().unwrap();
        assert_eq!(
            read,
            vec![
                entry(ModCategory::Content, "Morrowind.esm", 1, true),
                entry(ModCategory::Groundcover, "Grass.esp", 2, false),
            ]
        );
    }
}
