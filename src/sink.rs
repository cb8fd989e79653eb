use ads129x_afe::{AcquisitionFrame, StatusWord};
use anyhow::{Context, Result};
use log::info;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use uuid::Uuid;

use crate::config::OutputConfig;

/// One JSON line per frame
#[derive(Debug, Serialize)]
struct FrameRecord<'a> {
    session: Uuid,
    seq: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<StatusWord>,
    samples: &'a [i32],
}

/// Writes decoded frames as JSON lines, tagged with the configuration session
pub struct FrameSink {
    out: Box<dyn Write + Send>,
    session: Uuid,
    seq: u64,
}

impl FrameSink {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        FrameSink { out, session: Uuid::new_v4(), seq: 0 }
    }

    /// Append to `output.path`, or stdout when unset
    pub fn open(config: &OutputConfig) -> Result<Self> {
        let out: Box<dyn Write + Send> = match &config.path {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .context(format!("Failed to open output file: {}", path))?;
                info!("Writing frames to {}", path);
                Box::new(BufWriter::new(file))
            }
            None => Box::new(io::stdout()),
        };
        Ok(Self::new(out))
    }

    pub fn session(&self) -> Uuid {
        self.session
    }

    /// Start a new session after the device was reconfigured
    pub fn new_session(&mut self) {
        self.session = Uuid::new_v4();
        self.seq = 0;
        info!("Session {}", self.session);
    }

    pub fn write(&mut self, frame: &AcquisitionFrame) -> Result<()> {
        let record = FrameRecord {
            session: self.session,
            seq: self.seq,
            status: frame.status,
            samples: &frame.samples,
        };
        serde_json::to_writer(&mut self.out, &record).context("Failed to encode frame")?;
        self.out.write_all(b"\n").context("Failed to write frame")?;
        self.seq += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush().context("Failed to flush output")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value as JsonValue;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn lines(shared: &Shared) -> Vec<JsonValue> {
        let bytes = shared.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_json_lines() {
        let shared = Shared::default();
        let mut sink = FrameSink::new(Box::new(shared.clone()));
        let session = sink.session().to_string();

        sink.write(&AcquisitionFrame { status: None, samples: vec![1, -2] }).unwrap();
        sink.write(&AcquisitionFrame { status: Some(StatusWord(0xC0_0000)), samples: vec![3] }).unwrap();

        let records = lines(&shared);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["session"], session.as_str());
        assert_eq!(records[0]["seq"], 0);
        assert_eq!(records[0]["samples"], serde_json::json!([1, -2]));
        assert!(records[0].get("status").is_none());
        assert_eq!(records[1]["seq"], 1);
        assert_eq!(records[1]["status"], 0xC0_0000);
    }

    #[test]
    fn test_new_session_restarts_sequence() {
        let shared = Shared::default();
        let mut sink = FrameSink::new(Box::new(shared.clone()));
        let first = sink.session();
        sink.write(&AcquisitionFrame::default()).unwrap();
        sink.new_session();
        sink.write(&AcquisitionFrame::default()).unwrap();

        let records = lines(&shared);
        assert_ne!(first, sink.session());
        assert_eq!(records[1]["seq"], 0);
        assert_eq!(records[1]["session"], sink.session().to_string().as_str());
    }
}
