use tracing::info;

use crate::error::Result;
use crate::geocode::Geocoder;
use crate::model::ResolvedSegment;
use crate::parser::{extract_records, ExtractStats};
use crate::render::{ColourTable, MapRenderer};
use crate::resolve::{ResolveStats, SegmentResolver};
use crate::source::DocumentSource;

pub struct RunReport {
    pub extract: ExtractStats,
    pub resolve: ResolveStats,
    pub segments: Vec<ResolvedSegment>,
}

/// One refresh cycle: document → records → resolved segments → renderers.
///
/// Only an unavailable document or a blown deadline fails the run; nothing
/// is rendered in that case.
pub async fn refresh<G: Geocoder + 'static>(
    source: &dyn DocumentSource,
    resolver: &SegmentResolver<G>,
    renderers: &[&dyn MapRenderer],
    colours: &ColourTable,
) -> Result<RunReport> {
    let doc = source.fetch().await?;
    let (records, extract) = extract_records(&doc);
    let (segments, resolve) = resolver.resolve_all(records).await?;

    for renderer in renderers {
        renderer.render(&segments, colours)?;
    }
    info!(
        "Run complete: {} segments from {} records",
        segments.len(),
        extract.accepted
    );

    Ok(RunReport {
        extract,
        resolve,
        segments,
    })
}
