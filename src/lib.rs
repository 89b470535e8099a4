mod error;
mod model;
mod progress;
pub mod fetch;
pub mod reshape;
pub mod calendar;
pub mod rates;
pub mod weekly;
pub mod geometry;
pub mod join;
pub mod render;
mod config;
mod pipeline;

pub use error::*;
pub use model::*;
pub use progress::*;
pub use config::*;
pub use pipeline::*;

pub use calendar::WeekConvention;
pub use fetch::{DatasetFetcher, DataverseClient, LocalFetcher};
pub use geometry::{GeometryFetcher, GeoJsonBoundaries, MAP_CRS};
pub use join::EXCLUDED_STATES;
pub use render::{Renderer, VegaLiteWriter};
pub use reshape::IdentifierColumns;
