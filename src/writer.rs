use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::{MailFetchError, Result};

/// Appends one JSON document per line. Every record is flushed as soon as it
/// is written, so a run that fails halfway leaves a readable file behind.
pub struct ResultWriter {
    path: PathBuf,
    out: BufWriter<File>,
    written: usize,
}

impl ResultWriter {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| MailFetchError::write(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| MailFetchError::write(&path, e))?;
        debug!(path = %path.display(), "opened results file");
        Ok(Self {
            path,
            out: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn write_record<T: Serialize>(&mut self, record: &T) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        self.out
            .write_all(&line)
            .and_then(|()| self.out.flush())
            .map_err(|e| MailFetchError::write(&self.path, e))?;
        self.written += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes and syncs the file, returning the number of records written.
    pub fn close(mut self) -> Result<usize> {
        self.out
            .flush()
            .and_then(|()| self.out.get_ref().sync_all())
            .map_err(|e| MailFetchError::write(&self.path, e))?;
        Ok(self.written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OutputRecord;
    use serde_json::{Value, json};

    fn read_lines(path: &Path) -> Vec<Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results").join("results_x.json");
        let writer = ResultWriter::open(&path).unwrap();
        assert_eq!(writer.close().unwrap(), 0);
        assert!(path.exists());
    }

    #[test]
    fn writes_one_record_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let mut writer = ResultWriter::open(&path).unwrap();
        writer
            .write_record(&json!({"subject": "line one\nline two"}))
            .unwrap();
        writer.write_record(&json!({"subject": "second"})).unwrap();
        assert_eq!(writer.close().unwrap(), 2);

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.ends_with('\n'));
        let lines = read_lines(&path);
        assert_eq!(lines[0]["subject"], "line one\nline two");
    }

    #[test]
    fn records_survive_a_dropped_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        {
            let mut writer = ResultWriter::open(&path).unwrap();
            writer.write_record(&json!({"n": 1})).unwrap();
        }
        assert_eq!(read_lines(&path), vec![json!({"n": 1})]);
    }

    #[test]
    fn reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        for n in 0..2 {
            let mut writer = ResultWriter::open(&path).unwrap();
            writer.write_record(&json!({"n": n})).unwrap();
            writer.close().unwrap();
        }
        assert_eq!(read_lines(&path).len(), 2);
    }

    #[test]
    fn output_record_round_trips_through_generic_json() {
        let message = json!({
            "id": "m1",
            "receivedDateTime": "2024-03-01T10:15:00+02:00",
            "subject": "Invoice",
            "importance": "normal",
            "from": {"emailAddress": {"name": "Ops", "address": "ops@contoso.test"}}
        });
        // An item attachment embeds a copy of its parent message.
        let attachment = json!({
            "@odata.type": "#microsoft.graph.itemAttachment",
            "id": "a1",
            "name": "Invoice",
            "lastModifiedDateTime": "2024-03-01T08:16:00Z",
            "item": message.clone()
        });
        let record = OutputRecord {
            message: serde_json::from_value(message).unwrap(),
            attachments: vec![serde_json::from_value(attachment).unwrap()],
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let mut writer = ResultWriter::open(&path).unwrap();
        writer.write_record(&record).unwrap();
        writer.close().unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line["Message"]["receivedDateTime"], "2024-03-01T08:15:00.000Z");
        assert_eq!(line["Message"]["importance"], "normal");
        assert_eq!(
            line["Message"]["from"]["emailAddress"]["address"],
            "ops@contoso.test"
        );
        assert_eq!(
            line["Attachments"][0]["lastModifiedDateTime"],
            "2024-03-01T08:16:00.000Z"
        );
        assert_eq!(line["Attachments"][0]["item"]["id"], "m1");

        let parsed: OutputRecord = serde_json::from_value(line.clone()).unwrap();
        assert_eq!(parsed, record);
    }
}
