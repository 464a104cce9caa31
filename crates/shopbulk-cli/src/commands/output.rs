//! JSON lines output for query results

use crate::error::Result;
use serde::Serialize;
use serde_jsonlines::JsonLinesWriter;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Write `records` as JSON lines to `output`, or stdout when `None`
pub fn write_records<T: Serialize>(records: &[T], output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path)?;
            write_to(BufWriter::new(file), records)?;
            eprintln!("Wrote {} records to {}", records.len(), path.display());
        },
        None => write_to(io::stdout().lock(), records)?,
    }

    Ok(())
}

fn write_to<W: Write, T: Serialize>(writer: W, records: &[T]) -> Result<()> {
    let mut writer = JsonLinesWriter::new(writer);
    writer.write_all(records)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_records_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");

        write_records(&[json!({"id": 1}), json!({"id": 2})], Some(&path)).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\"id\":1}\n{\"id\":2}\n");
    }

    #[test]
    fn test_write_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.jsonl");

        write_records::<serde_json::Value>(&[], Some(&path)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
