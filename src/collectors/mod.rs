//! Collector implementations and the trait they share

#[cfg(feature = "conservative")]
pub mod collector;

#[cfg(feature = "conservative")]
pub mod conservative;
