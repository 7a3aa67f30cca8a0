//! Real-time transit arrival display engine.
//!
//! Polls a live or recorded StopMonitoring feed, picks the next arrival,
//! classifies how urgent it is, and animates changes on a fixed-size LED
//! matrix through an abstract pixel sink.

pub mod config;
pub mod display;
pub mod domain;
pub mod feed;
pub mod scheduler;
