//! DTO definitions for question bank import/export.

use serde::Serialize;
use utoipa::ToSchema;

/// Acknowledgement returned after a successful bank import.
#[derive(Debug, Serialize, ToSchema)]
pub struct ImportReport {
    /// Number of questions now in the bank.
    pub imported: usize,
}
