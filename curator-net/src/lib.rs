//! Curator network layer
//!
//! Provides the outbound HTTP plumbing shared by every signal source:
//! - `reqwest` client with user-agent rotation and optional proxy
//! - `Transport` seam with a scripted implementation for offline use
//! - Rate-limited, retrying fetch policy
//! - RSS/Atom listing link extraction

pub mod client;
pub mod feed;
pub mod policy;
pub mod transport;

pub use client::*;
pub use feed::*;
pub use policy::*;
pub use transport::*;
