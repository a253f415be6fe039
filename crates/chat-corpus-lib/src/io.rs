//! Whole-file reads and writes at stage boundaries.
//!
//! Formats:
//! - raw export: UTF-8 text
//! - parsed messages: one pretty-printed JSON array
//! - turns, chat records, inference results: JSON Lines
//!
//! Non-ASCII text is written verbatim (serde_json never escapes it).

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CorpusError, Result};
use crate::model::message::{derive_timestamps, Message};

fn open_input(path: &Path) -> Result<File> {
    if !path.exists() {
        return Err(CorpusError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    File::open(path).map_err(|source| CorpusError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn create_output(path: &Path) -> Result<BufWriter<File>> {
    let write_err = |source| CorpusError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
    }
    File::create(path).map(BufWriter::new).map_err(write_err)
}

/// Read the raw chat export as text.
pub fn read_export(path: &Path) -> Result<String> {
    let mut reader = BufReader::new(open_input(path)?);
    let mut text = String::new();
    std::io::Read::read_to_string(&mut reader, &mut text).map_err(|source| CorpusError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(text)
}

/// Write parsed messages as a pretty-printed JSON array (2-space indent).
pub fn write_messages_json(path: &Path, messages: &[Message]) -> Result<()> {
    let mut writer = create_output(path)?;
    serde_json::to_writer_pretty(&mut writer, messages)?;
    writer.flush().map_err(|source| CorpusError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Read parsed messages and derive their timestamps.
pub fn read_messages_json(path: &Path) -> Result<Vec<Message>> {
    let reader = BufReader::new(open_input(path)?);
    let mut messages: Vec<Message> =
        serde_json::from_reader(reader).map_err(|source| CorpusError::Json {
            path: path.to_path_buf(),
            line: source.line(),
            source,
        })?;
    derive_timestamps(&mut messages);
    Ok(messages)
}

/// Read a JSON Lines file. Blank lines are skipped.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let reader = BufReader::new(open_input(path)?);
    let mut items = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| CorpusError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line).map_err(|source| CorpusError::Json {
            path: path.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        items.push(item);
    }
    Ok(items)
}

/// Incremental JSON Lines writer, flushed per record so partial batches survive.
pub struct JsonlWriter {
    writer: BufWriter<File>,
    path: std::path::PathBuf,
}

impl JsonlWriter {
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self {
            writer: create_output(path)?,
            path: path.to_path_buf(),
        })
    }

    pub fn append<T: Serialize>(&mut self, item: &T) -> Result<()> {
        let line = serde_json::to_string(item)?;
        writeln!(self.writer, "{}", line)
            .and_then(|_| self.writer.flush())
            .map_err(|source| CorpusError::Write {
                path: self.path.clone(),
                source,
            })
    }
}

/// Write a whole slice as JSON Lines.
pub fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let mut writer = create_output(path)?;
    for item in items {
        let line = serde_json::to_string(item)?;
        writeln!(writer, "{}", line).map_err(|source| CorpusError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    writer.flush().map_err(|source| CorpusError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::turn::Turn;

    #[test]
    fn missing_input_is_reported_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_export(&dir.path().join("nope.txt")).unwrap_err();
        assert!(err.is_input_not_found());
    }

    #[test]
    fn jsonl_writes_unescaped_korean_one_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/turns.jsonl");
        let turns = vec![Turn {
            user: vec!["질문?".into()],
            assistant: vec!["대답입니다".into()],
        }];
        write_jsonl(&path, &turns).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\"user\":[\"질문?\"],\"assistant\":[\"대답입니다\"]}\n");
        let back: Vec<Turn> = read_jsonl(&path).unwrap();
        assert_eq!(back, turns);
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        fs::write(&path, "{\"user\":[],\"assistant\":[]}\n\nnot json\n").unwrap();
        match read_jsonl::<Turn>(&path) {
            Err(CorpusError::Json { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected JSON error, got {:?}", other),
        }
    }

    #[test]
    fn malformed_messages_json_reports_its_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.json");
        fs::write(&path, "[\n  {\"date\": null,\n  oops\n]").unwrap();
        match read_messages_json(&path) {
            Err(CorpusError::Json { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected JSON error, got {:?}", other),
        }
    }

    #[test]
    fn messages_json_derives_timestamps_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.json");
        let msgs = vec![
            Message::new(Some("2025-01-01".into()), "a", "10:00", "x"),
            Message::new(None, "b", "10:01", "y"),
        ];
        write_messages_json(&path, &msgs).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n  {\n    \"date\": \"2025-01-01\""));

        let back = read_messages_json(&path).unwrap();
        assert!(back[0].timestamp.is_some());
        assert!(back[1].timestamp.is_none());
    }
}
