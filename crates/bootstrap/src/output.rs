//! JSONL output: one record per line.

use nostr::Event;
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write each record as a single JSON line and flush. Returns the number of
/// lines written.
pub fn write_jsonl<'a, W: Write>(
    mut writer: W,
    records: impl IntoIterator<Item = &'a Event>,
) -> Result<usize, OutputError> {
    let mut written = 0;
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn event(id: &str, created_at: i64) -> Event {
        Event {
            id: id.to_string(),
            pubkey: "ab".repeat(32),
            created_at: Some(created_at),
            kind: 0,
            tags: Some(vec![vec!["p".to_string(), "cd".repeat(32)]]),
            content: Some("line one\nline two".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_one_line_per_record() {
        let records = vec![event("1", 5), event("2", 6)];
        let mut buf = Vec::new();

        let written = write_jsonl(&mut buf, &records).unwrap();
        assert_eq!(written, 2);

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(text.ends_with('\n'));

        let parsed: Vec<Event> = lines
            .iter()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(parsed, records);
    }

    #[test]
    fn test_relay_record_written_as_received() {
        let line = r#"{"id":"ff","pubkey":"ab","kind":3,"tags":[["p","cd"]],"client":"x","nonce":7}"#;
        let record: Event = serde_json::from_str(line).unwrap();
        let mut buf = Vec::new();

        write_jsonl(&mut buf, [&record]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), format!("{line}\n"));
    }

    #[test]
    fn test_empty_stream_writes_nothing() {
        let mut buf = Vec::new();
        assert_eq!(write_jsonl(&mut buf, &Vec::new()).unwrap(), 0);
        assert!(buf.is_empty());
    }
}
