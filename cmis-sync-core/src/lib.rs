#![doc = "cmis-sync-core: reconciliation engine for cmis-sync."]

//! This crate holds everything that decides what to create, replace or skip
//! when mirroring a local directory tree into a CMIS document repository.
//! It contains no network code: the repository and the content type detector
//! are reached through the traits in [`contract`].
//!
//! # Usage
//! Build a [`synchronise::SynchroniseConfig`], hand [`synchronise::synchronise`]
//! a [`contract::Repository`] implementation and a [`contract::ContentDetector`]
//! (usually [`detect::MagicDetector`]), then inspect the returned report.

pub mod contract;
pub mod detect;
pub mod error;
pub mod path_map;
pub mod reconcile;
pub mod resolver;
pub mod scan;
pub mod synchronise;

pub use error::SyncError;
