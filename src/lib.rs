//! Controllers for the full-screen interstitials of a simulated broadcast station:
//! the station bump, the pay-per-view viewer, the diagnostics slideshow and the
//! remote-control entry pad.
//!
//! Each display runs as a tokio task and is driven through the handle its
//! `spawn` function returns. Rendering goes through the traits in [`surface`].

pub mod api_client;
pub mod audio;
pub mod bump;
pub mod config;
pub mod content;
pub mod diagnostics;
pub mod errors;
pub mod handoff;
pub mod input;
pub mod model;
pub mod ppv;
pub mod presentation;
pub mod remote;
pub mod slideshow;
pub mod status_poller;
pub mod surface;
pub mod timer;

#[cfg(test)]
mod test_support;
