//! trail-planner core
//!
//! Route-recommendation pipeline: structured search criteria go in, a
//! ranked and diversity-reranked set of closed-loop walking routes through
//! real points of interest comes out. Candidate recall talks to external
//! place-search and directions oracles through the seams in `traits`;
//! ranking and diversity run against persisted model artifacts produced by
//! the offline trainer.

pub mod cluster;
pub mod config;
pub mod error;
pub mod features;
pub mod google;
pub mod haversine;
pub mod models;
pub mod pipeline;
pub mod polyline;
pub mod ranking;
pub mod recall;
pub mod response;
pub mod store;
pub mod traits;
pub mod trainer;
