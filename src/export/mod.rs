pub mod json_export;
pub mod tiles;
pub mod verification;

use anyhow::Result;

use crate::core::model::RunSummary;

pub use json_export::JsonExporter;
pub use tiles::TileWriter;
pub use verification::{VerificationArtifact, VerificationRenderer};

pub trait Exporter {
    fn export(&self, summary: &RunSummary) -> Result<()>;
}
