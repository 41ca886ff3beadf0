//! Core layout API shared by the CLI and the benches.
//! No terminal or file format concerns beyond the KiCad document.

use std::path::{Path, PathBuf};

use crate::config::ClockParams;
use crate::parser::document::KicadDocument;
use crate::session::{LayoutSession, SessionError, SessionReport};

#[derive(Debug, thiserror::Error)]
pub enum StudioClockError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Layout error: {0}")]
    Session(#[from] SessionError),
}

impl From<crate::parser::pcb::PcbParseError> for StudioClockError {
    fn from(e: crate::parser::pcb::PcbParseError) -> Self {
        match e {
            crate::parser::pcb::PcbParseError::Io(io) => StudioClockError::Io(io),
            other => StudioClockError::Parse(other.to_string()),
        }
    }
}

/// Options for a layout run (CLI or library).
#[derive(Clone, Debug, Default)]
pub struct LayoutOptions {
    pub params: ClockParams,
    /// Where to write the result; `None` writes back to the input file.
    pub output: Option<PathBuf>,
    /// Run the session but skip saving.
    pub dry_run: bool,
}

/// Result of laying out one file.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LayoutResult {
    pub file: PathBuf,
    /// `None` for dry runs.
    pub output: Option<PathBuf>,
    pub report: SessionReport,
}

/// Core layout API used by the CLI.
pub struct StudioClockCore;

impl StudioClockCore {
    /// Load, lay out and save a single `.kicad_pcb` file.
    pub fn layout_pcb(path: &Path, options: &LayoutOptions) -> Result<LayoutResult, StudioClockError> {
        let mut document = KicadDocument::load(path)?;
        let report = Self::layout_document(&mut document, &options.params)?;

        let output = if options.dry_run {
            tracing::info!("Dry run, not saving");
            None
        } else {
            let target = options.output.clone().unwrap_or_else(|| path.to_path_buf());
            document.save(&target)?;
            Some(target)
        };

        Ok(LayoutResult {
            file: path.to_path_buf(),
            output,
            report,
        })
    }

    /// Run one session against an already loaded document.
    pub fn layout_document(
        document: &mut KicadDocument,
        params: &ClockParams,
    ) -> Result<SessionReport, StudioClockError> {
        let session = LayoutSession::new(params.clone(), &document.board().layers)?;
        Ok(session.run(document.board_mut())?)
    }
}
