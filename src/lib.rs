// src/lib.rs

//! SCMS Client Library

pub mod api;
pub mod cache;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod mappers;
pub mod models;
pub mod session;
pub mod transport;
