use std::path::Path;

pub fn execute(cache_path: &Path, input_path: &Path, json: bool) -> anyhow::Result<()> {
    let report = hark_cache::merge(cache_path, input_path)?;
    crate::report::print(&report, json)
}
