//! Implementações das operações de geoprocessamento

pub mod fields;
pub mod lines;
pub mod polygonize;
pub mod select;
