pub mod analytics;
pub mod availability;
pub mod classify;
pub mod config;
pub mod domain;
pub mod downtime;
pub mod engine;
pub mod error;
pub mod facts;
pub mod intervals;
pub mod metrics;
pub mod normalize;
pub mod period;
pub mod reachability;
pub mod report;
pub mod scope;
pub mod source;
