//! Assembles overlapping transcription fragments into a single subtitle
//! timeline and exports it as WebVTT or SubRip.
//!
//! The interactive edit operations on [`model::Timeline`] and the label
//! lookups on [`alternatives::AlternativesStore`] are public for editors that
//! drive the timeline directly; the `subweave` binary only uses the batch
//! commands.

pub mod alternatives;
pub mod cli;
pub mod client;
pub mod config;
pub mod formats;
pub mod generation;
pub mod merge;
pub mod model;
pub mod pipeline;
pub mod quality;
pub mod segment;
