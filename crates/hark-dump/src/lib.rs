use anyhow::Context;
use hark_core::props::REL_WAV_PATH;
use hark_core::UtterResult;
use std::path::Path;

/// Read a decoder error dump file and parse it into utterance records.
pub fn read_dump(path: &Path) -> anyhow::Result<Vec<UtterResult>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading decoder dump {}", path.display()))?;
    Ok(parse_dump(&text))
}

/// Parse the custom line-based dump format into records, in file order.
///
/// Records are separated by a truly blank line. Within a record, a line
/// containing the `RelWavPath` marker sets the record identity (the value is
/// everything after the first `=` following the marker); otherwise a line
/// containing `=` is split at the first `=` into a body field; anything else
/// is ignored.
///
/// A record is only emitted when its terminating blank line is seen: a dump
/// that does not end with a blank line loses its last record. Matches the
/// historical format, which producers satisfy by always writing a blank
/// separator line after every record.
pub fn parse_dump(input: &str) -> Vec<UtterResult> {
    let mut records = Vec::new();
    let mut wav_path = String::new();
    let mut fields: Vec<(String, String)> = Vec::new();

    for line in input.lines() {
        if line.is_empty() {
            if !wav_path.is_empty() || !fields.is_empty() {
                records.push(UtterResult {
                    rel_wav_path: std::mem::take(&mut wav_path),
                    attributes: Vec::new(),
                    sub_elements: std::mem::take(&mut fields),
                });
            }
            continue;
        }

        if let Some(idx) = line.find(REL_WAV_PATH) {
            let after = &line[idx + REL_WAV_PATH.len()..];
            wav_path = match after.find('=') {
                Some(eq) => after[eq + 1..].to_string(),
                None => String::new(),
            };
            continue;
        }

        if let Some(eq) = line.find('=') {
            fields.push((line[..eq].to_string(), line[eq + 1..].to_string()));
        }
        // non-blank lines without `=` are silently ignored
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_records_separated_by_blank_lines() {
        let dump = "RelWavPath=a/one.wav\nwordDist=2\nwordsActual=hello\n\n\
                    RelWavPath=a/two.wav\nwordDist=1\nwordsActual=there\n\n";
        let records = parse_dump(dump);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].rel_wav_path, "a/one.wav");
        assert_eq!(records[1].rel_wav_path, "a/two.wav");
        assert_eq!(records[0].prop_value("wordsActual").unwrap(), "hello");
        assert_eq!(records[1].prop_value("wordDist").unwrap(), "1");
    }

    #[test]
    fn record_without_trailing_blank_line_is_dropped() {
        let dump = "RelWavPath=a/one.wav\nwordDist=2\n\n\
                    RelWavPath=a/two.wav\nwordDist=1";
        let records = parse_dump(dump);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rel_wav_path, "a/one.wav");
    }

    #[test]
    fn rel_wav_path_marker_takes_precedence_over_key_value() {
        // the marker line also contains `=` but must not become a body field
        let dump = "Some RelWavPath=x/y.wav\nwordDist=3\n\n";
        let records = parse_dump(dump);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rel_wav_path, "x/y.wav");
        assert_eq!(records[0].sub_elements.len(), 1);
    }

    #[test]
    fn value_keeps_equals_signs_after_the_first() {
        let records = parse_dump("RelWavPath=w.wav\nexpr=a=b\n\n");
        assert_eq!(records[0].prop_value("expr").unwrap(), "a=b");
    }

    #[test]
    fn lines_without_equals_are_ignored() {
        let dump = "RelWavPath=w.wav\njust a note line\nwordDist=1\n\n";
        let records = parse_dump(dump);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sub_elements.len(), 1);
    }

    #[test]
    fn consecutive_blank_lines_emit_no_empty_records() {
        let dump = "\n\nRelWavPath=w.wav\nwordDist=1\n\n\n";
        let records = parse_dump(dump);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn read_dump_reports_missing_file() {
        let err = read_dump(Path::new("/nonexistent/dump.txt")).unwrap_err();
        assert!(err.to_string().contains("dump"));
    }

    #[test]
    fn read_dump_round_trips_through_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("errorDump.txt");
        std::fs::write(&path, "RelWavPath=a.wav\nwordDist=2\n\n").unwrap();
        let records = read_dump(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rel_wav_path, "a.wav");
    }
}
