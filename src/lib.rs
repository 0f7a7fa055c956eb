//! Test Health Server library.
//!
//! Ingests CI test results, maintains per-test health metrics, and
//! evaluates skip rules so runners can disable known-bad tests at
//! runtime. Also ships the runner-side cached disablement client.

pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
