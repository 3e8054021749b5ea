//! Plain-text document loading and chunking.
//!
//! Stands in for the opaque ingestion step: reads `.txt`/`.md` files and
//! windows their text into overlapping character chunks.

use crate::errors::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// A loaded source document, pre-chunking
#[derive(Debug, Clone)]
pub struct Document {
    pub source: PathBuf,
    pub text: String,
}

/// Load documents from a file or a folder of `.txt`/`.md` files
pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    let mut documents = Vec::new();

    if path.is_file() {
        documents.push(Document {
            source: path.to_path_buf(),
            text: fs::read_to_string(path)?,
        });
        return Ok(documents);
    }

    let mut entries: Vec<PathBuf> = fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("txt") | Some("md")
                )
        })
        .collect();
    entries.sort();

    for file in entries {
        let text = fs::read_to_string(&file)?;
        documents.push(Document { source: file, text });
    }

    Ok(documents)
}

/// Window text into chunks of `chunk_size` characters with `overlap`
/// characters shared between neighbors.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_chunk_short_text_single_chunk() {
        let chunks = chunk_text("short text", 1000, 100);
        assert_eq!(chunks, vec!["short text".to_string()]);
    }

    #[test]
    fn test_chunk_overlap() {
        let text = "abcdefghij"; // 10 chars
        let chunks = chunk_text(text, 4, 2);
        assert_eq!(chunks[0], "abcd");
        assert_eq!(chunks[1], "cdef");
        assert_eq!(chunks[2], "efgh");
    }

    #[test]
    fn test_chunk_empty_text() {
        assert!(chunk_text("", 1000, 100).is_empty());
    }

    #[test]
    fn test_chunk_overlap_ge_size_still_advances() {
        // Degenerate config must not loop forever
        let chunks = chunk_text("abcdef", 2, 5);
        assert!(chunks.len() <= 6);
        assert_eq!(chunks[0], "ab");
    }

    #[test]
    fn test_load_documents_filters_extensions() {
        let dir = TempDir::new().unwrap();

        let mut f = std::fs::File::create(dir.path().join("notes.txt")).unwrap();
        writeln!(f, "heart rate guidance").unwrap();
        let mut f = std::fs::File::create(dir.path().join("guide.md")).unwrap();
        writeln!(f, "sleep hygiene").unwrap();
        std::fs::File::create(dir.path().join("image.png")).unwrap();

        let docs = load_documents(dir.path()).unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn test_load_single_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("doc.txt");
        std::fs::write(&file, "contents").unwrap();

        let docs = load_documents(&file).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "contents");
    }
}
