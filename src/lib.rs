//! Guided Tour — adaptive onboarding walkthrough for the property site.

pub mod config;
pub mod error;
pub mod notify;
pub mod signals;
pub mod store;
pub mod tour;
