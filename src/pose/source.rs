use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use log::warn;

use super::keypoint::LandmarkFrame;

/// Anything that yields detector output frame by frame.
///
/// `Ok(None)` ends the stream. An error is fatal for the pipeline run.
pub trait KeypointSource {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>>;
}

impl<S: KeypointSource + ?Sized> KeypointSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>> {
        (**self).next_frame()
    }
}

/// Reads one `LandmarkFrame` JSON object per line, e.g. piped from an
/// external detector process.
pub struct JsonLinesSource<R: BufRead> {
    reader: R,
    line: String,
    line_no: usize,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
        }
    }
}

impl JsonLinesSource<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open landmark input {}", path.display()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl JsonLinesSource<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock())
    }
}

impl<R: BufRead> KeypointSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>> {
        loop {
            self.line.clear();
            let n = self
                .reader
                .read_line(&mut self.line)
                .context("failed to read landmark input")?;
            if n == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let text = self.line.trim();
            if text.is_empty() {
                continue;
            }

            match serde_json::from_str::<LandmarkFrame>(text) {
                Ok(frame) => return Ok(Some(frame)),
                Err(e) => warn!("skipping landmark line {}: {}", self.line_no, e),
            }
        }
    }
}
