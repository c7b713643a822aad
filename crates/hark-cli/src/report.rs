use hark_cache::RunReport;

/// Print a run report in the historical `newUtters=N new/all=R` shape, or
/// as one JSON object with `--json`.
pub fn print(report: &RunReport, json: bool) -> anyhow::Result<()> {
    if json {
        let out = serde_json::json!({
            "new_count": report.new_count,
            "old_count": report.old_count,
            "ratio": report.new_ratio(),
            "report_path": report.report_path,
        });
        println!("{}", serde_json::to_string(&out)?);
        return Ok(());
    }

    match report.new_ratio() {
        Some(ratio) => println!("newUtters={} new/all={ratio:.6}", report.new_count),
        None => println!("No eligible decoder results to process."),
    }
    if let Some(path) = &report.report_path {
        println!("novelty report written to {}", path.display());
    }
    Ok(())
}
