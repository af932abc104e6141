//! Reader and in-place editor for the engine's INI-style `settings.cfg`.
//!
//! Edits touch only the affected line so the rest of the file, comments and
//! blank lines included, survives a rewrite.

pub mod value;

pub use value::SettingValue;

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Keys the engine writes as placeholders; never surfaced.
const BLACKLISTED_KEYS: [&str; 3] = ["key1", "key2", "key3"];

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write settings file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct SettingEntry {
    pub key: String,
    pub value: SettingValue,
    pub comment: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    pub name: String,
    pub entries: Vec<SettingEntry>,
}

impl Section {
    pub fn get(&self, key: &str) -> Option<&SettingEntry> {
        self.entries.iter().find(|e| e.key == key)
    }
}

fn section_name(line: &str) -> Option<&str> {
    line.strip_prefix('[')?.strip_suffix(']').map(str::trim)
}

fn line_key(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.starts_with('#') {
        return None;
    }
    line.split_once('=').map(|(key, _)| key.trim())
}

fn format_comment(comment: &str) -> String {
    let comment = comment.trim();
    if comment.starts_with('#') {
        comment.to_string()
    } else {
        format!("# {comment}")
    }
}

/// Parses settings text into ordered sections.
///
/// A `#` line is attached to the most recent key that was accepted; entries
/// outside any section are skipped.
pub fn parse_settings(content: &str) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut last_entry: Option<(usize, usize)> = None;

    for line in content.lines().map(str::trim) {
        if let Some(name) = section_name(line) {
            sections.push(Section {
                name: name.to_string(),
                entries: Vec::new(),
            });
            last_entry = None;
        } else if let Some(text) = line.strip_prefix('#') {
            if let Some((s, e)) = last_entry {
                let text = text.trim();
                let comment = &mut sections[s].entries[e].comment;
                let merged = match comment.take() {
                    Some(mut existing) => {
                        existing.push('\n');
                        existing.push_str(text);
                        existing
                    }
                    None => text.to_string(),
                };
                *comment = Some(merged);
            }
        } else if let Some((key, raw)) = line.split_once('=') {
            let key = key.trim();
            let Some(section_index) = sections.len().checked_sub(1) else {
                last_entry = None;
                continue;
            };
            if key.is_empty() || BLACKLISTED_KEYS.contains(&key) {
                last_entry = None;
                continue;
            }

            let value = SettingValue::infer(raw);
            let entries = &mut sections[section_index].entries;
            let entry_index = match entries.iter().position(|e| e.key == key) {
                Some(existing) => {
                    entries[existing].value = value;
                    existing
                }
                None => {
                    entries.push(SettingEntry {
                        key: key.to_string(),
                        value,
                        comment: None,
                    });
                    entries.len() - 1
                }
            };
            last_entry = Some((section_index, entry_index));
        }
    }
    sections
}

/// Applies one `key = value` edit to the file's lines.
pub fn apply_value(
    lines: &mut Vec<String>,
    section: &str,
    key: &str,
    value: &SettingValue,
    comment: Option<&str>,
) {
    let entry = format!("{key} = {value}");
    let comment = comment.map(format_comment);

    let Some(header) = lines
        .iter()
        .position(|l| section_name(l.trim()) == Some(section))
    else {
        lines.push(format!("[{section}]"));
        lines.push(entry);
        if let Some(comment) = comment {
            lines.push(comment);
            lines.push(String::new());
        }
        return;
    };

    let end = lines[header + 1..]
        .iter()
        .position(|l| section_name(l.trim()).is_some())
        .map(|i| header + 1 + i)
        .unwrap_or(lines.len());

    if let Some(index) = (header + 1..end).find(|&i| line_key(&lines[i]) == Some(key)) {
        lines[index] = entry;
        if let Some(comment) = comment {
            if lines.get(index + 1).map(|l| l.trim()) != Some(comment.as_str()) {
                lines.insert(index + 1, comment);
                lines.insert(index + 2, String::new());
            }
        }
        return;
    }

    // New keys go after the section's last non-blank line.
    let mut at = end;
    while at > header + 1 && lines[at - 1].trim().is_empty() {
        at -= 1;
    }
    lines.insert(at, entry);
    if let Some(comment) = comment {
        lines.insert(at + 1, comment);
        lines.insert(at + 2, String::new());
    }
}

#[derive(Clone, Debug)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_lines(&self) -> Result<Vec<String>, SettingsError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content.lines().map(String::from).collect()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No settings file at {}", self.path.display());
                Ok(Vec::new())
            }
            Err(source) => Err(SettingsError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Missing file reads as no sections.
    pub fn read(&self) -> Result<Vec<Section>, SettingsError> {
        let sections = parse_settings(&self.read_lines()?.join("\n"));
        debug!(
            "Read {} sections from {}",
            sections.len(),
            self.path.display()
        );
        Ok(sections)
    }

    pub fn write_value(
        &self,
        section: &str,
        key: &str,
        value: &SettingValue,
        comment: Option<&str>,
    ) -> Result<(), SettingsError> {
        let mut lines = self.read_lines()?;
        apply_value(&mut lines, section, key, value, comment);

        std::fs::write(&self.path, lines.join("\n")).map_err(|source| SettingsError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!("Set [{}] {} = {}", section, key, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
orphan = 1
[Video]
resolution x = 1920
# horizontal pixels
fullscreen = TRUE
gamma = 1.25
key1 = ignored

[General]
# about the font
font size = 16
window title = OpenMW
font size = 18
";

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(String::from).collect()
    }

    #[test]
    fn parses_sections_types_and_comments() {
        let sections = parse_settings(SAMPLE);
        assert_eq!(sections.len(), 2);

        let video = &sections[0];
        assert_eq!(video.name, "Video");
        assert_eq!(video.entries.len(), 3);
        let res = video.get("resolution x").unwrap();
        assert_eq!(res.value, SettingValue::Int(1920));
        assert_eq!(res.comment.as_deref(), Some("horizontal pixels"));
        assert_eq!(video.get("fullscreen").unwrap().value, SettingValue::Bool(true));
        assert_eq!(video.get("gamma").unwrap().value, SettingValue::Float(1.25));
        assert!(video.get("key1").is_none());

        let general = &sections[1];
        assert_eq!(general.entries.len(), 2);
        // Comment before the first key of a section has nothing to attach to.
        assert_eq!(general.get("font size").unwrap().comment, None);
        assert_eq!(general.get("font size").unwrap().value, SettingValue::Int(18));
        assert_eq!(
            general.get("window title").unwrap().value,
            SettingValue::Text("OpenMW".into())
        );
    }

    #[test]
    fn rejected_keys_do_not_inherit_comments() {
        let sections = parse_settings("[A]\nfoo = 1\nkey1 = x\n# about key1\n");
        assert_eq!(sections[0].get("foo").unwrap().comment, None);

        let sections = parse_settings("stray = 1\n# about stray\n[A]\nfoo = 1\n");
        assert_eq!(sections[0].get("foo").unwrap().comment, None);
    }

    #[test]
    fn replaces_value_in_place_and_adds_comment_once() {
        let mut file = lines(SAMPLE);
        apply_value(&mut file, "Video", "gamma", &1.5f32.into(), Some("brightness"));
        apply_value(&mut file, "Video", "gamma", &1.5f32.into(), Some("# brightness"));

        let at = file.iter().position(|l| l == "gamma = 1.5").unwrap();
        assert_eq!(file[at + 1], "# brightness");
        assert_eq!(file[at + 2], "");
        assert_eq!(file.iter().filter(|l| l.contains("brightness")).count(), 1);
    }

    #[test]
    fn matches_whole_keys_only() {
        let mut file = lines("[Video]\nresolution x = 800\nresolution = 1\n");
        apply_value(&mut file, "Video", "resolution", &2.into(), None);
        assert_eq!(file, lines("[Video]\nresolution x = 800\nresolution = 2"));
    }

    #[test]
    fn missing_key_goes_to_end_of_its_section() {
        let mut file = lines(SAMPLE);
        apply_value(&mut file, "Video", "vsync", &true.into(), None);

        let vsync = file.iter().position(|l| l == "vsync = true").unwrap();
        assert_eq!(file[vsync - 1], "key1 = ignored");
        assert_eq!(file[vsync + 1], "");
        assert_eq!(file[vsync + 2], "[General]");
    }

    #[test]
    fn missing_section_is_appended() {
        let mut file = lines(SAMPLE);
        apply_value(&mut file, "Input", "camera sensitivity", &1.0f32.into(), None);
        assert_eq!(
            file[file.len() - 2..],
            ["[Input]".to_string(), "camera sensitivity = 1.0".to_string()]
        );
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SettingsFile::new(dir.path().join("settings.cfg"));
        assert!(settings.read().unwrap().is_empty());

        settings
            .write_value("GUI", "scaling factor", &1.5f32.into(), Some("UI scale"))
            .unwrap();
        settings
            .write_value("GUI", "subtitles", &false.into(), None)
            .unwrap();

        let sections = settings.read().unwrap();
        let gui = &sections[0];
        assert_eq!(gui.name, "GUI");
        let scaling = gui.get("scaling factor").unwrap();
        assert_eq!(scaling.value, SettingValue::Float(1.5));
        assert_eq!(scaling.comment.as_deref(), Some("UI scale"));
        assert_eq!(gui.get("subtitles").unwrap().value, SettingValue::Bool(false));
    }
}
