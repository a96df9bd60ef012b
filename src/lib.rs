pub mod config;
pub mod db;
pub mod error;
pub mod geocode;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod resolve;
pub mod retry;
pub mod source;

pub use error::{GeocodeError, PipelineError};
pub use model::{Borough, Coordinate, Document, ResolvedSegment, StreetSegmentRecord};
