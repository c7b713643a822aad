use anyhow::Context;
use hark_core::{UtterResult, UtterResultGroup};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

/// Counts reported by a dedup-aware batch insert.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct InsertStats {
    pub new_count: usize,
    pub old_count: usize,
}

impl InsertStats {
    pub fn total(&self) -> usize {
        self.new_count + self.old_count
    }
}

/// The persisted mismatch cache: one group of result instances per audio
/// segment, unique keys, group insertion order preserved for write-back.
///
/// Loaded once at process start, mutated purely in memory, and rewritten to
/// disk in full. A single-operator batch tool: no locking, last writer wins
/// when two processes rewrite the same file.
#[derive(Debug, Default)]
pub struct Cache {
    groups: Vec<UtterResultGroup>,
    index: HashMap<String, usize>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a grouped cache document. A missing or unreadable file aborts
    /// the run before anything is mutated.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let groups = hark_xml::read_cache_doc(path)?;
        let mut cache = Self::new();
        for group in groups {
            match cache.index.get(&group.rel_wav_path) {
                // duplicate keys in a hand-edited file: last one wins
                Some(&pos) => cache.groups[pos] = group,
                None => {
                    cache
                        .index
                        .insert(group.rel_wav_path.clone(), cache.groups.len());
                    cache.groups.push(group);
                }
            }
        }
        tracing::debug!(groups = cache.len(), path = %path.display(), "loaded cache");
        Ok(cache)
    }

    /// Rewrite the whole cache document, atomically replacing the target.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let xml = hark_xml::render_cache_doc(&self.groups)?;
        write_atomic(path, xml.as_bytes())
            .with_context(|| format!("writing cache document {}", path.display()))?;
        tracing::debug!(groups = self.len(), path = %path.display(), "saved cache");
        Ok(())
    }

    pub fn get(&self, rel_wav_path: &str) -> Option<&UtterResultGroup> {
        self.index.get(rel_wav_path).map(|&pos| &self.groups[pos])
    }

    pub fn groups(&self) -> &[UtterResultGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Insert a batch of decoder results with dedup on recognized text.
    ///
    /// An item whose segment has no group yet starts a new group and counts
    /// as new. An item whose group already holds an instance with the same
    /// recognized text counts as old and is discarded. Anything else is
    /// appended to its group and counts as new. Groups and instances are
    /// never removed.
    pub fn insert_all(
        &mut self,
        items: impl IntoIterator<Item = UtterResult>,
    ) -> anyhow::Result<InsertStats> {
        let mut stats = InsertStats::default();
        for item in items {
            match self.index.get(&item.rel_wav_path) {
                None => {
                    let mut group = UtterResultGroup::new(item.rel_wav_path.clone());
                    self.index
                        .insert(item.rel_wav_path.clone(), self.groups.len());
                    group.instances.push(item);
                    self.groups.push(group);
                    stats.new_count += 1;
                }
                Some(&pos) => {
                    let group = &mut self.groups[pos];
                    if group.has_instance_with_same_output(&item)? {
                        stats.old_count += 1;
                    } else {
                        group.instances.push(item);
                        stats.new_count += 1;
                    }
                }
            }
        }
        Ok(stats)
    }
}

/// Write to a temp file in the target's directory, then rename over it.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}
