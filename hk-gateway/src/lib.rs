//! Hong Kong home-automation gateway.
//!
//! Reshapes public data for dashboards and voice assistants: KMB bus
//! arrivals around two configured areas, HKO weather summaries, and an
//! LLM description of the latest rain radar picture.

pub mod catalog;
pub mod config;
pub mod domain;
pub mod eta;
pub mod kmb;
pub mod llm;
pub mod notify;
pub mod refresh;
pub mod store;
pub mod weather;
pub mod web;
