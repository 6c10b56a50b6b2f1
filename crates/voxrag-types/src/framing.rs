//! Newline-delimited JSON framing.
//!
//! Network reads split records at arbitrary byte offsets (including inside a
//! multi-byte UTF-8 sequence), so incoming bytes are buffered and only complete
//! lines are parsed.

use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed record {line:?}: {source}")]
    Malformed {
        line: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("record is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and returns every record completed by them, in order.
    pub fn push<T: DeserializeOwned>(&mut self, bytes: &[u8]) -> Result<Vec<T>, WireError> {
        self.buffer.extend_from_slice(bytes);

        let mut records = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(record) = Self::parse(&line[..pos])? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Parses whatever is left once the byte stream has ended.
    pub fn finish<T: DeserializeOwned>(&mut self) -> Result<Option<T>, WireError> {
        let rest = std::mem::take(&mut self.buffer);
        Self::parse(&rest)
    }

    fn parse<T: DeserializeOwned>(line: &[u8]) -> Result<Option<T>, WireError> {
        let text = std::str::from_utf8(line)?.trim();
        if text.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(text)
            .map(Some)
            .map_err(|source| WireError::Malformed {
                line: text.to_string(),
                source,
            })
    }
}
