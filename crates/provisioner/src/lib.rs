//! Provisioning service
//!
//! HTTP front end over `provision_lib`: renders deployment and branding
//! artifacts, evaluates heartbeats and exposes health and metrics endpoints.

pub mod api;
pub mod config;
