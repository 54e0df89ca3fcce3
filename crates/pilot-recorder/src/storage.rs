//! Macro files - one pretty JSON document per macro
//!
//! ```json
//! { "version": 1, "created": "2025-01-01T00:00:00Z", "events": [
//!     { "delay": 0.0, "type": "move", "x": 10, "y": 10 } ] }
//! ```
//!
//! Unknown fields are ignored on load. A bare array of events is accepted
//! too, for hand-written files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::events::{Event, Macro};

pub const FORMAT_VERSION: u32 = 1;
pub const EXTENSION: &str = "json";

#[derive(Serialize)]
struct MacroDocument<'a> {
    version: u32,
    created: DateTime<Utc>,
    events: &'a [Event],
}

#[derive(Deserialize)]
struct StoredMacro {
    #[serde(default = "default_version")]
    version: u32,
    events: Vec<Event>,
}

fn default_version() -> u32 {
    FORMAT_VERSION
}

pub fn to_writer<W: Write>(writer: W, m: &Macro) -> Result<()> {
    let doc = MacroDocument {
        version: FORMAT_VERSION,
        created: Utc::now(),
        events: m.events(),
    };
    serde_json::to_writer_pretty(writer, &doc)?;
    Ok(())
}

pub fn to_string(m: &Macro) -> Result<String> {
    let mut buf = Vec::new();
    to_writer(&mut buf, m)?;
    String::from_utf8(buf).map_err(|e| Error::CorruptData(e.to_string()))
}

pub fn from_str(s: &str) -> Result<Macro> {
    let value: Value = serde_json::from_str(s)?;
    from_value(value)
}

pub fn from_reader<R: Read>(reader: R) -> Result<Macro> {
    let value: Value = serde_json::from_reader(reader)?;
    from_value(value)
}

fn from_value(value: Value) -> Result<Macro> {
    // Event deserialization rejects delays outside 0..=MAX_DELAY
    let events: Vec<Event> = match value {
        Value::Array(_) => serde_json::from_value(value)?,
        Value::Object(_) => {
            let stored: StoredMacro = serde_json::from_value(value)?;
            if stored.version > FORMAT_VERSION {
                warn!(
                    version = stored.version,
                    supported = FORMAT_VERSION,
                    "macro file is newer than this build, reading known fields only"
                );
            }
            stored.events
        }
        other => {
            return Err(Error::Schema(format!(
                "expected a macro document or an array of events, found {}",
                json_kind(&other)
            )))
        }
    };

    Ok(Macro::from(events))
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub fn save_file(path: impl AsRef<Path>, m: &Macro) -> Result<()> {
    let path = path.as_ref();
    let mut w = BufWriter::new(File::create(path)?);
    to_writer(&mut w, m)?;
    w.flush()?;
    info!(path = %path.display(), events = m.len(), "macro saved");
    Ok(())
}

pub fn load_file(path: impl AsRef<Path>) -> Result<Macro> {
    let path = path.as_ref();
    let m = from_reader(BufReader::new(File::open(path)?))?;
    info!(path = %path.display(), events = m.len(), "macro loaded");
    Ok(m)
}

/// `$HOME/.pilot`, where the store and the front-end settings live
pub fn data_dir() -> Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "HOME not set"))?;
    Ok(PathBuf::from(home).join(".pilot"))
}

/// Directory of saved macros
pub struct MacroStore {
    dir: PathBuf,
}

impl MacroStore {
    pub fn new() -> Result<Self> {
        Self::with_dir(data_dir()?.join("macros"))
    }

    pub fn with_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Path of a named macro inside the store
    pub fn resolve(&self, name: &str) -> PathBuf {
        let suffix = format!(".{EXTENSION}");
        let stem = name.strip_suffix(&suffix).unwrap_or(name);
        self.dir.join(format!("{}{}", sanitize(stem), suffix))
    }

    pub fn save(&self, name: &str, m: &Macro) -> Result<PathBuf> {
        let path = self.resolve(name);
        save_file(&path, m)?;
        Ok(path)
    }

    /// Fresh `macro_<timestamp>.json` path inside the store
    pub fn timestamped_path(&self) -> PathBuf {
        let ts = Utc::now().format("%Y%m%d_%H%M%S");
        self.resolve(&format!("macro_{ts}"))
    }

    pub fn save_timestamped(&self, m: &Macro) -> Result<PathBuf> {
        let path = self.timestamped_path();
        save_file(&path, m)?;
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<Macro> {
        load_file(self.resolve(name))
    }

    /// File names of all stored macros, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    files.push(name.to_string());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        fs::remove_file(self.resolve(name))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
