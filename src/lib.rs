//! Client for the HubStorage API: projects, jobs, items, logs, collections,
//! frontiers, settings and the job queue, as thin proxies over blocking HTTP.
//!
//! The crate also ships the machinery its own test suite runs on: a cassette
//! record/replay engine ([`replay`]) and the session/cleanup harness
//! ([`session`]) that let every integration test execute against recorded
//! interactions instead of a live backend.

pub mod client;
pub mod collections;
pub mod config;
pub mod frontier;
pub mod items;
pub mod job;
pub mod jobq;
pub mod logging;
pub mod project;
pub mod proxy;
pub mod replay;
pub mod serialization;
pub mod session;
pub mod settings;

pub use client::{Error, HttpRequest, HttpResponse, HubstorageClient, Transport};
pub use config::{Config, RecordMode, ReplayConfig, DEFAULT_ENDPOINT};
pub use job::JobKey;
pub use proxy::{Filter, IterParams};
pub use serialization::WireFormat;
