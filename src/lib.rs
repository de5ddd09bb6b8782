#![doc = "drive-bucket: stream filtered Google Drive files into a Cloud Storage bucket."]

//! One invocation lists matching files, transfers each of them concurrently (exporting
//! Drive-native documents to a portable format on the way), and reports a single outcome.
//! Nothing is persisted between runs.
//!
//! Entry point for embedding: [`synchronise::run_batch`] with any [`contract::SourceStore`]
//! and [`contract::SinkStore`]. The binary wires in [`download::DriveClient`] and
//! [`upload::GcsClient`].

pub mod auth;
pub mod classify;
pub mod cli;
pub mod config;
pub mod contract;
pub mod download;
pub mod list;
pub mod load_config;
pub mod naming;
pub mod synchronise;
pub mod transfer;
pub mod upload;

pub use cli::{run, Cli, Commands};
