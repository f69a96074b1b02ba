//! aura-gateway: backend gateway for the EA Aura dashboard.
//!
//! Resolves a deployment environment profile, extracts role context from
//! bearer tokens, proxies the identity provider's admin API, and fronts a
//! search engine plus the dashboard's data and file endpoints.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data;
pub mod environment;
pub mod files;
pub mod logging;
pub mod proxy;
pub mod query;
pub mod reply;
pub mod search;
pub mod web;
