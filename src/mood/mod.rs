//! # Mood Module
//!
//! Derives a listening mood from a track's audio features and narrows candidate
//! track collections down to a requested mood.
//!
//! - [`classify`] maps an [`AudioFeatureVector`](crate::types::AudioFeatureVector)
//!   to one of the ten [`Mood`] labels. It is total over the unit square and never
//!   fails.
//! - [`filter`] keeps the candidates whose classified mood matches, intersected with
//!   optional [`MoodFilter`] constraints, preserving input order.
//!
//! Both are pure and may run concurrently with anything else, including an
//! in-flight session operation.

mod classifier;
mod filter;

pub use classifier::Mood;
pub use classifier::ParseMoodError;
pub use classifier::classify;
pub use filter::MoodFilter;
pub use filter::filter;
