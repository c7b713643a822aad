use crate::store::Cache;
use hark_core::UtterResult;
use std::collections::HashMap;

/// Result of classifying one batch of decoder results against a baseline.
#[derive(Debug, Default)]
pub struct DiffOutcome {
    /// Novel mismatches keyed by segment, in first-seen order. When one
    /// batch carries two novel items for the same segment only the later
    /// one survives, at the earlier position.
    pub novel: Vec<UtterResult>,
    pub new_count: usize,
    pub old_count: usize,
}

impl DiffOutcome {
    /// Eligible items seen: novel plus already-known. Perfect recognitions
    /// are excluded from both sides.
    pub fn total(&self) -> usize {
        self.new_count + self.old_count
    }

    pub fn get(&self, rel_wav_path: &str) -> Option<&UtterResult> {
        self.novel.iter().find(|u| u.rel_wav_path == rel_wav_path)
    }
}

/// Classify a freshly parsed batch against a read-only baseline cache.
///
/// Items with word distance zero are perfect recognitions and are skipped
/// outright, counted on neither side. A remaining item is novel when the
/// baseline has no group for its segment, or the group has no instance with
/// the same recognized text; otherwise it is already known. The baseline is
/// never mutated.
pub fn diff(baseline: &Cache, items: &[UtterResult]) -> anyhow::Result<DiffOutcome> {
    let mut outcome = DiffOutcome::default();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for item in items {
        if item.word_dist()? == 0 {
            continue;
        }

        let is_new = match baseline.get(&item.rel_wav_path) {
            None => true,
            Some(group) => !group.has_instance_with_same_output(item)?,
        };

        if is_new {
            match positions.get(&item.rel_wav_path) {
                Some(&pos) => outcome.novel[pos] = item.clone(),
                None => {
                    positions.insert(item.rel_wav_path.clone(), outcome.novel.len());
                    outcome.novel.push(item.clone());
                }
            }
            outcome.new_count += 1;
        } else {
            outcome.old_count += 1;
        }
    }

    tracing::debug!(
        new_count = outcome.new_count,
        old_count = outcome.old_count,
        "diff classified batch"
    );
    Ok(outcome)
}
