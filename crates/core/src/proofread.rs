//! Walks a presentation and runs every text frame through a corrector.

use serde::Serialize;

use crate::{Corrector, Presentation, Result, Shape, ShapeKind};

/// One text frame whose text the corrector changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Amendment {
    /// 1-based slide number.
    pub slide: usize,
    /// Name of the amended shape.
    pub shape: String,
    pub before: String,
    pub after: String,
}

/// Outcome of a proofreading pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProofreadReport {
    /// Text frames passed to the corrector.
    pub examined: usize,
    /// Text frames whose text changed, in document order.
    pub amendments: Vec<Amendment>,
}

impl ProofreadReport {
    /// Number of amended text frames.
    pub fn amended(&self) -> usize {
        self.amendments.len()
    }
}

/// Correct every text frame in `presentation`, slides and shapes in
/// document order.
///
/// Empty frames are still offered to the corrector. A frame is rewritten and
/// counted only when the corrected text differs byte-for-byte from the
/// current text. Shapes without a text frame are skipped. The first corrector
/// error aborts the pass.
pub async fn proofread(
    presentation: &mut Presentation,
    corrector: &dyn Corrector,
) -> Result<ProofreadReport> {
    let mut report = ProofreadReport::default();

    for slide in &mut presentation.slides {
        for shape in &mut slide.shapes {
            let Shape { name, kind, .. } = shape;
            let ShapeKind::Text(frame) = kind else {
                continue;
            };

            report.examined += 1;
            let corrected = corrector.correct(frame.text()).await?;
            if corrected == frame.text() {
                continue;
            }

            log::debug!(
                "Slide {} shape '{}': {:?} -> {:?}",
                slide.number,
                name,
                frame.text(),
                corrected
            );
            report.amendments.push(Amendment {
                slide: slide.number,
                shape: name.clone(),
                before: frame.text().to_string(),
                after: corrected.clone(),
            });
            frame.set_text(corrected);
        }
    }

    log::info!(
        "Proofread '{}': {} of {} text frames amended",
        presentation.filename,
        report.amended(),
        report.examined
    );

    Ok(report)
}
