pub mod lines;
pub mod streets;

use serde::Serialize;
use tracing::{debug, info};

use crate::model::{Document, StreetSegmentRecord};
use lines::{BoroughTracker, Line};
pub use streets::split_streets;

/// Line counts from one extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractStats {
    pub lines: usize,
    pub blank: usize,
    pub boilerplate: usize,
    pub borough_headers: usize,
    pub before_borough: usize,
    pub not_concrete: usize,
    /// Concrete rows whose on/from street could not be recovered.
    pub rejected: usize,
    pub accepted: usize,
}

/// Two-pass pipeline: lines → (borough, block) rows → street records.
pub fn extract_records(doc: &Document) -> (Vec<StreetSegmentRecord>, ExtractStats) {
    let mut tracker = BoroughTracker::new();
    let mut stats = ExtractStats::default();
    let mut records = Vec::new();

    for raw in doc.lines() {
        stats.lines += 1;
        match tracker.classify(raw) {
            Line::Blank => stats.blank += 1,
            Line::Boilerplate => stats.boilerplate += 1,
            Line::BoroughHeader(_) => stats.borough_headers += 1,
            Line::BeforeBorough => {
                debug!(line = raw.trim(), "Concrete row before any borough header");
                stats.before_borough += 1;
            }
            Line::NotConcrete => stats.not_concrete += 1,
            Line::Row { borough, block } => {
                let [on_street, from_street, to_street] = split_streets(block);
                if on_street.is_empty() || from_street.is_empty() {
                    debug!(%borough, block, "Rejected row, missing on/from street");
                    stats.rejected += 1;
                    continue;
                }
                stats.accepted += 1;
                records.push(StreetSegmentRecord {
                    borough,
                    on_street,
                    from_street,
                    to_street,
                });
            }
        }
    }

    info!(
        "Extracted {} segments from {} lines ({} rejected)",
        records.len(),
        stats.lines,
        stats.rejected
    );
    (records, stats)
}

// ── Tests ──
