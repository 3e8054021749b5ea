//! Incremental JSON object extractor.
//!
//! Ollama streams NDJSON; chunk boundaries do not line up with object
//! boundaries, so complete objects are pulled out of the byte stream with
//! a single-pass bracket matcher that is aware of strings and escapes.
//! The same machinery digs a JSON object out of free-text model replies
//! (models like to wrap JSON in chatter).

use crate::errors::{PipelineError, Result};

/// Maximum accumulation buffer (1MB)
pub const MAX_BUFFER_SIZE: usize = 1_048_576;

/// Incremental JSON object extractor over a byte stream
#[derive(Debug)]
pub struct JsonExtractor {
    buffer: Vec<u8>,
    max_buffer_size: usize,
}

impl JsonExtractor {
    pub fn new() -> Self {
        Self::with_capacity(MAX_BUFFER_SIZE)
    }

    pub fn with_capacity(max_buffer_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            max_buffer_size,
        }
    }

    /// Append raw bytes from the wire
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if self.buffer.len() + bytes.len() > self.max_buffer_size {
            return Err(PipelineError::JsonParse(format!(
                "Buffer overflow: {} bytes exceeds maximum {}",
                self.buffer.len() + bytes.len(),
                self.max_buffer_size
            )));
        }

        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Pull the next complete JSON object out of the buffer, if any.
    ///
    /// Repeated calls drain the buffer one object at a time; bytes before
    /// the object (whitespace, newlines between NDJSON records) are
    /// discarded along with it.
    pub fn next_object(&mut self) -> Result<Option<String>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match find_complete_object(&self.buffer)? {
            Some((start, end)) => {
                let json = String::from_utf8_lossy(&self.buffer[start..=end]).to_string();
                self.buffer.drain(..=end);
                Ok(Some(json))
            }
            None => Ok(None),
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for JsonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the first complete JSON object embedded in free text
pub fn first_json_object(text: &str) -> Option<String> {
    match find_complete_object(text.as_bytes()) {
        Ok(Some((start, end))) => {
            Some(String::from_utf8_lossy(&text.as_bytes()[start..=end]).to_string())
        }
        _ => None,
    }
}

/// Single-pass bracket matcher. Returns the byte range of the first
/// complete top-level object, or None if the buffer ends mid-object.
fn find_complete_object(buffer: &[u8]) -> Result<Option<(usize, usize)>> {
    let mut depth: i32 = 0;
    let mut start: Option<usize> = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, &byte) in buffer.iter().enumerate() {
        let ch = byte as char;

        if escape_next {
            escape_next = false;
            continue;
        }

        if ch == '\\' && in_string {
            escape_next = true;
            continue;
        }

        // Braces inside strings do not count
        if ch == '"' && start.is_some() {
            in_string = !in_string;
            continue;
        }

        if in_string {
            continue;
        }

        match ch {
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                if depth == 0 {
                    continue;
                }
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start {
                        return Ok(Some((s, i)));
                    }
                }
            }
            _ => {}
        }
    }

    Ok(None)
}
