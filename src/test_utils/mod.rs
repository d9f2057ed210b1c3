//! Shared test helpers: config builders, mock collectors and source payloads.

#![cfg(test)]

pub mod config;
pub mod fixtures;
pub mod mocks;
