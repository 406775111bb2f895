//! Geometry helpers shared by the detector stages.

pub mod perspective;
