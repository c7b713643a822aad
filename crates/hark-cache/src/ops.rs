use crate::diff::diff;
use crate::store::{write_atomic, Cache, InsertStats};
use hark_core::UtterResult;
use serde::Serialize;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// Counts reported back to the operator after a merge or diff run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub new_count: usize,
    pub old_count: usize,
    /// Where the novelty report was written, diff mode only.
    pub report_path: Option<PathBuf>,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.new_count + self.old_count
    }

    /// Share of new items among all eligible items. `None` when the batch
    /// had nothing to process, so callers never divide by zero.
    pub fn new_ratio(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.new_count as f64 / total as f64),
        }
    }

    fn from_insert(stats: InsertStats) -> Self {
        Self {
            new_count: stats.new_count,
            old_count: stats.old_count,
            report_path: None,
        }
    }
}

/// Read a batch of decoder results: `.xml` files are flat result documents,
/// anything else is the line-based dump format.
pub fn read_results(path: &Path) -> anyhow::Result<Vec<UtterResult>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("xml") => hark_xml::read_result_doc(path),
        _ => hark_dump::read_dump(path),
    }
}

/// "put" mode: merge freshly produced decoder results into the cache and
/// rewrite the cache file in full.
pub fn merge(cache_path: &Path, input_path: &Path) -> anyhow::Result<RunReport> {
    let mut cache = Cache::load(cache_path)?;
    let items = read_results(input_path)?;
    tracing::info!(records = items.len(), input = %input_path.display(), "merging decoder results");

    let stats = cache.insert_all(items)?;
    if stats.total() > 0 {
        cache.save(cache_path)?;
    }
    Ok(RunReport::from_insert(stats))
}

/// "diff" mode: classify freshly produced decoder results against the cache
/// without touching it, and write the novel items as a flat result document
/// to `<input_path>.<fractional-second timestamp>`.
///
/// A batch with nothing to process produces no report file.
pub fn compute_diff(cache_path: &Path, input_path: &Path) -> anyhow::Result<RunReport> {
    let cache = Cache::load(cache_path)?;
    let items = read_results(input_path)?;
    tracing::info!(records = items.len(), input = %input_path.display(), "diffing decoder results");

    let outcome = diff(&cache, &items)?;
    if outcome.total() == 0 {
        return Ok(RunReport {
            new_count: 0,
            old_count: 0,
            report_path: None,
        });
    }

    let report_path = report_path_for(input_path);
    let xml = hark_xml::render_result_doc(&outcome.novel)?;
    write_atomic(&report_path, xml.as_bytes())?;
    tracing::info!(novel = outcome.novel.len(), report = %report_path.display(), "wrote novelty report");

    Ok(RunReport {
        new_count: outcome.new_count,
        old_count: outcome.old_count,
        report_path: Some(report_path),
    })
}

/// Append a microseconds-of-the-second suffix, the stamp format the report
/// files have always used.
fn report_path_for(input_path: &Path) -> PathBuf {
    let stamp = OffsetDateTime::now_utc().microsecond();
    let mut os = input_path.as_os_str().to_os_string();
    os.push(format!(".{stamp:06}"));
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_empty_cache(path: &Path) {
        let xml = hark_xml::render_cache_doc(&[]).unwrap();
        std::fs::write(path, xml).unwrap();
    }

    fn find_report(dir: &Path, input_name: &str) -> Option<PathBuf> {
        let prefix = format!("{input_name}.");
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .find(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix) && n != input_name)
            })
    }

    #[test]
    fn diff_against_empty_cache_reports_only_mismatches() {
        let tmp = tempfile::tempdir().unwrap();
        let cache_path = tmp.path().join("decRecogCache.xml");
        write_empty_cache(&cache_path);

        let dump_path = tmp.path().join("errorDump.txt");
        std::fs::write(
            &dump_path,
            "RelWavPath=a.wav\nwordDist=0\nwordsActual=good\n\n\
             RelWavPath=b.wav\nwordDist=2\nwordsActual=hello\n\n",
        )
        .unwrap();

        let report = compute_diff(&cache_path, &dump_path).unwrap();
        assert_eq!(report.new_count, 1);
        assert_eq!(report.old_count, 0);
        assert_eq!(report.new_ratio(), Some(1.0));

        let report_path = report.report_path.unwrap();
        let novel = hark_xml::read_result_doc(&report_path).unwrap();
        assert_eq!(novel.len(), 1);
        assert_eq!(novel[0].rel_wav_path, "b.wav");
        assert_eq!(novel[0].prop_value("wordsActual").unwrap(), "hello");
    }

    #[test]
    fn diff_with_known_output_reports_nothing_novel() {
        let tmp = tempfile::tempdir().unwrap();
        let cache_path = tmp.path().join("decRecogCache.xml");
        write_empty_cache(&cache_path);

        let dump_path = tmp.path().join("errorDump.txt");
        std::fs::write(
            &dump_path,
            "RelWavPath=b.wav\nwordDist=2\nwordsActual=hello\n\n",
        )
        .unwrap();

        // seed the cache with the same mismatch
        merge(&cache_path, &dump_path).unwrap();

        let report = compute_diff(&cache_path, &dump_path).unwrap();
        assert_eq!(report.new_count, 0);
        assert_eq!(report.old_count, 1);

        let novel = hark_xml::read_result_doc(&report.report_path.unwrap()).unwrap();
        assert!(novel.is_empty());
    }

    #[test]
    fn merge_twice_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let cache_path = tmp.path().join("decRecogCache.xml");
        write_empty_cache(&cache_path);

        let dump_path = tmp.path().join("errorDump.txt");
        std::fs::write(
            &dump_path,
            "RelWavPath=a.wav\nwordDist=1\nwordsActual=one\n\n\
             RelWavPath=b.wav\nwordDist=2\nwordsActual=two\n\n",
        )
        .unwrap();

        let first = merge(&cache_path, &dump_path).unwrap();
        assert_eq!(first.new_count, 2);
        assert_eq!(first.old_count, 0);

        let cache = Cache::load(&cache_path).unwrap();
        assert_eq!(cache.len(), 2);

        let second = merge(&cache_path, &dump_path).unwrap();
        assert_eq!(second.new_count, 0);
        assert_eq!(second.old_count, 2);

        let cache = Cache::load(&cache_path).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a.wav").unwrap().instances.len(), 1);
        assert_eq!(cache.get("b.wav").unwrap().instances.len(), 1);
    }

    #[test]
    fn merge_accepts_flat_xml_input() {
        let tmp = tempfile::tempdir().unwrap();
        let cache_path = tmp.path().join("decRecogCache.xml");
        write_empty_cache(&cache_path);

        let input_path = tmp.path().join("decResults.xml");
        let items = vec![UtterResult {
            rel_wav_path: "c.wav".into(),
            attributes: vec![("segId".into(), "4".into())],
            sub_elements: vec![
                ("wordsActual".into(), "three".into()),
                ("wordDist".into(), "3".into()),
            ],
        }];
        std::fs::write(&input_path, hark_xml::render_result_doc(&items).unwrap()).unwrap();

        let report = merge(&cache_path, &input_path).unwrap();
        assert_eq!(report.new_count, 1);

        let cache = Cache::load(&cache_path).unwrap();
        let group = cache.get("c.wav").unwrap();
        assert_eq!(group.instances[0].attributes[0].0, "segId");
    }

    #[test]
    fn degenerate_batch_writes_no_report() {
        let tmp = tempfile::tempdir().unwrap();
        let cache_path = tmp.path().join("decRecogCache.xml");
        write_empty_cache(&cache_path);

        let dump_path = tmp.path().join("errorDump.txt");
        // a single perfect recognition: nothing to process
        std::fs::write(
            &dump_path,
            "RelWavPath=a.wav\nwordDist=0\nwordsActual=good\n\n",
        )
        .unwrap();

        let report = compute_diff(&cache_path, &dump_path).unwrap();
        assert_eq!(report.total(), 0);
        assert_eq!(report.new_ratio(), None);
        assert!(report.report_path.is_none());
        assert!(find_report(tmp.path(), "errorDump.txt").is_none());
    }

    #[test]
    fn missing_cache_file_aborts_before_writing_anything() {
        let tmp = tempfile::tempdir().unwrap();
        let dump_path = tmp.path().join("errorDump.txt");
        std::fs::write(
            &dump_path,
            "RelWavPath=a.wav\nwordDist=1\nwordsActual=x\n\n",
        )
        .unwrap();

        let missing = tmp.path().join("decRecogCache.xml");
        assert!(compute_diff(&missing, &dump_path).is_err());
        assert!(find_report(tmp.path(), "errorDump.txt").is_none());
    }

    #[test]
    fn report_path_appends_timestamp_suffix() {
        let path = report_path_for(Path::new("/tmp/decResults.xml"));
        let name = path.file_name().unwrap().to_str().unwrap();
        let suffix = name.strip_prefix("decResults.xml.").unwrap();
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }
}
