/// The only error a scan surfaces to its caller. Transient fetch failures are
/// retried inside the pipeline and unusable transactions are skipped, so
/// neither ever reaches this type.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
