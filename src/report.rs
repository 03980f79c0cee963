use {
    crate::scan_core::ScanReport,
    std::{fs, path::Path},
};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Write a finished scan as pretty JSON. Parent directories are created.
pub fn save_report(report: &ScanReport, file_path: impl AsRef<Path>) -> Result<(), ReportError> {
    let path = file_path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;

    log::info!(
        "💾 Saved {} counterparties for {} to {}",
        report.entries.len(),
        report.summary.address,
        path.display()
    );
    Ok(())
}
