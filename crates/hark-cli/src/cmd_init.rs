use anyhow::bail;
use std::path::Path;

/// Write an empty grouped cache document so `put` and `diff` have a
/// baseline to load. Refuses to overwrite an existing cache.
pub fn execute(cache_path: &Path) -> anyhow::Result<()> {
    if cache_path.exists() {
        bail!("cache file {} already exists", cache_path.display());
    }
    let xml = hark_xml::render_cache_doc(&[])?;
    hark_cache::write_atomic(cache_path, xml.as_bytes())?;
    println!("Initialized empty cache at {}", cache_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_a_loadable_empty_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("decRecogCache.xml");
        execute(&path).unwrap();
        let cache = hark_cache::Cache::load(&path).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("decRecogCache.xml");
        execute(&path).unwrap();
        assert!(execute(&path).is_err());
    }
}
