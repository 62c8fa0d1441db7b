//! Directory-backed sink: one `<tab>.csv` file per tab, header on the first line.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::spawn_blocking;
use tracing::debug;

use hitaudit_core_types::OutputRow;

use crate::error::SinkError;
use crate::sink::Sink;

#[derive(Clone, Debug)]
pub struct CsvSink {
    dir: PathBuf,
    // appends to one directory are serialized
    write_lock: Arc<Mutex<()>>,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path_for(&self, tab: &str) -> PathBuf {
        self.dir.join(format!("{tab}.csv"))
    }
}

#[async_trait]
impl Sink for CsvSink {
    async fn read_header_row(&self, tab: &str) -> Result<Vec<String>, SinkError> {
        let path = self.path_for(tab);
        let owned_tab = tab.to_string();
        spawn_blocking(move || read_header(&path, &owned_tab))
            .await
            .map_err(|err| SinkError::schema(tab, err.to_string()))?
    }

    async fn append_row(&self, tab: &str, row: &OutputRow) -> Result<(), SinkError> {
        let path = self.path_for(tab);
        let cells = row.to_strings();
        let owned_tab = tab.to_string();
        let lock = self.write_lock.clone();
        let appended = spawn_blocking(move || {
            let _guard = lock.lock();
            append_record(&path, &owned_tab, &cells)
        });
        appended
            .await
            .map_err(|err| SinkError::write(tab, err.to_string()))?
    }
}

fn read_header(path: &Path, tab: &str) -> Result<Vec<String>, SinkError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|err| SinkError::schema(tab, format!("{}: {err}", path.display())))?;

    let record = match reader.records().next() {
        Some(record) => record.map_err(|err| SinkError::schema(tab, err.to_string()))?,
        None => return Err(SinkError::schema(tab, "sheet is empty")),
    };

    let headers: Vec<String> = record.iter().map(|cell| cell.trim().to_string()).collect();
    if headers.iter().all(String::is_empty) {
        return Err(SinkError::schema(tab, "header row is blank"));
    }
    debug!(target: "sink", tab, columns = headers.len(), "header row loaded");
    Ok(headers)
}

fn append_record(path: &Path, tab: &str, cells: &[String]) -> Result<(), SinkError> {
    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .open(path)
        .map_err(|err| SinkError::write(tab, err.to_string()))?;
    ensure_trailing_newline(&mut file).map_err(|err| SinkError::write(tab, err.to_string()))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer.write_record(cells).map_err(|err| SinkError::write(tab, err.to_string()))?;
    writer.flush().map_err(|err| SinkError::write(tab, err.to_string()))?;
    Ok(())
}

fn ensure_trailing_newline(file: &mut File) -> std::io::Result<()> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(());
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        file.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hitaudit_core_types::CellValue;

    #[tokio::test]
    async fn reads_header_and_appends_rows() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hits.csv"), "timestamp,event_name,cu").unwrap();
        let sink = CsvSink::new(dir.path());

        let headers = sink.read_header_row("hits").await.unwrap();
        assert_eq!(headers, vec!["timestamp", "event_name", "cu"]);

        let row = OutputRow(vec![
            CellValue::text("t1"),
            CellValue::text("purchase"),
            CellValue::Empty,
        ]);
        sink.append_row("hits", &row).await.unwrap();
        sink.append_row("hits", &row).await.unwrap();

        let content = std::fs::read_to_string(sink.path_for("hits")).unwrap();
        assert_eq!(
            content,
            "timestamp,event_name,cu\nt1,purchase,\nt1,purchase,\n"
        );
    }

    #[tokio::test]
    async fn multiline_cells_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hits.csv"), "errors\n").unwrap();
        let sink = CsvSink::new(dir.path());
        sink.append_row("hits", &OutputRow(vec![CellValue::text("a\nb")]))
            .await
            .unwrap();
        let content = std::fs::read_to_string(sink.path_for("hits")).unwrap();
        assert_eq!(content, "errors\n\"a\nb\"\n");
    }

    #[tokio::test]
    async fn missing_or_blank_headers_fail_schema_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path());
        assert!(matches!(
            sink.read_header_row("absent").await,
            Err(SinkError::SchemaFetch { .. })
        ));

        std::fs::write(dir.path().join("blank.csv"), ",,\n").unwrap();
        assert!(matches!(
            sink.read_header_row("blank").await,
            Err(SinkError::SchemaFetch { .. })
        ));

        std::fs::write(dir.path().join("empty.csv"), "").unwrap();
        assert!(matches!(
            sink.read_header_row("empty").await,
            Err(SinkError::SchemaFetch { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_keep_rows_whole() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hits.csv"), "event_name,errors\n").unwrap();
        let sink = CsvSink::new(dir.path());

        let mut tasks = tokio::task::JoinSet::new();
        for n in 0..32 {
            let sink = sink.clone();
            tasks.spawn(async move {
                let row = OutputRow(vec![
                    CellValue::text(format!("event_{n}")),
                    CellValue::text("line one\nline two"),
                ]);
                sink.append_row("hits", &row).await
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        let mut reader = csv::Reader::from_path(sink.path_for("hits")).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 32);
        assert!(rows.iter().all(|row| row.len() == 2 && &row[1] == "line one\nline two"));
    }

    #[tokio::test]
    async fn append_to_missing_tab_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path());
        let err = sink
            .append_row("absent", &OutputRow(vec![CellValue::text("x")]))
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::SinkWrite { .. }));
    }
}
