//! JSON output adapter.

use anyhow::Result;
use drowsy_core::{FrameReport, ResultOutput};
use std::io::{self, Write};
use std::sync::Mutex;

use crate::commands::run::OutputFormat;

/// Frame report writer.
///
/// In JSON Lines mode every report is written as soon as it arrives. In JSON
/// mode reports are buffered and written as one array on flush.
pub struct JsonOutput {
    writer: Mutex<Box<dyn Write + Send>>,
    format: OutputFormat,
    pretty: bool,
    pending: Mutex<Vec<FrameReport>>,
}

impl JsonOutput {
    /// Creates a new JSON output writing to stdout.
    #[must_use]
    pub fn stdout(format: OutputFormat, pretty: bool) -> Self {
        Self::new(Box::new(io::stdout()), format, pretty)
    }

    /// Creates a new JSON output writing to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer: Mutex::new(writer),
            format,
            pretty,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Writes a batch of reports as a JSON array.
    #[allow(clippy::significant_drop_tightening)]
    fn write_array(&self, reports: &[FrameReport]) -> Result<()> {
        let json = if self.pretty {
            serde_json::to_string_pretty(reports)?
        } else {
            serde_json::to_string(reports)?
        };
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
        writeln!(writer, "{json}")?;
        Ok(())
    }
}

impl ResultOutput for JsonOutput {
    #[allow(clippy::significant_drop_tightening)]
    fn write(&self, report: &FrameReport) -> Result<()> {
        if self.format == OutputFormat::Json {
            self.pending
                .lock()
                .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?
                .push(report.clone());
            return Ok(());
        }

        let json = serde_json::to_string(report)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
        writeln!(writer, "{json}")?;
        Ok(())
    }

    #[allow(clippy::significant_drop_tightening)]
    fn flush(&self) -> Result<()> {
        if self.format == OutputFormat::Json {
            let reports = std::mem::take(
                &mut *self
                    .pending
                    .lock()
                    .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?,
            );
            self.write_array(&reports)?;
        }

        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use drowsy_core::domain::{FrameDimensions, Phase};
    use std::sync::Arc;

    /// Writer that shares its buffer with the test.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn report(frame: u64) -> FrameReport {
        FrameReport {
            frame,
            source: format!("frames/{frame:03}.png"),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            dimensions: FrameDimensions::new(640, 480),
            faces: Vec::new(),
            failed_faces: 0,
            counter: 0,
            phase: Phase::Awake,
            alarms: Vec::new(),
        }
    }

    #[test]
    fn test_jsonl_writes_one_line_per_report() {
        let buf = SharedBuf::default();
        let output = JsonOutput::new(Box::new(buf.clone()), OutputFormat::Jsonl, false);

        output.write(&report(1)).unwrap();
        output.write(&report(2)).unwrap();
        assert_eq!(buf.text().lines().count(), 2);

        output.flush().unwrap();
        let lines: Vec<_> = buf.text().lines().map(str::to_string).collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["frame"], 1);
        assert_eq!(first["phase"], "awake");
        assert!(first.get("alarms").is_none());
    }

    #[test]
    fn test_json_buffers_until_flush() {
        let buf = SharedBuf::default();
        let output = JsonOutput::new(Box::new(buf.clone()), OutputFormat::Json, true);

        output.write(&report(1)).unwrap();
        output.write(&report(2)).unwrap();
        assert!(buf.text().is_empty());

        output.flush().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&buf.text()).unwrap();
        let frames: Vec<_> = parsed
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["frame"].as_u64().unwrap())
            .collect();
        assert_eq!(frames, vec![1, 2]);
    }

    #[test]
    fn test_json_empty_run_writes_empty_array() {
        let buf = SharedBuf::default();
        let output = JsonOutput::new(Box::new(buf.clone()), OutputFormat::Json, false);
        output.flush().unwrap();
        assert_eq!(buf.text().trim(), "[]");
    }
}
