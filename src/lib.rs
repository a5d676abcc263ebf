//! Slackers Guide to Charleston - parks of Charleston, the people who visited them
//!
//! This library provides the park and user stores, the services on top of
//! them, and the HTTP layer serving both the JSON API and the site pages.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod views;
