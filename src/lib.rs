//! Send ICMP (`IPv4`) echo requests to a host and measure the round trip time.
//!
//! A [`Session`] owns a raw ICMP socket and performs one request/reply
//! exchange per call to [`Session::probe`]:
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! use echoping::{ProbeConfig, Session};
//! use std::time::Duration;
//!
//! let config = ProbeConfig::new("127.0.0.1", 1, None, Duration::from_secs(1))?;
//! let mut session = Session::open(&config)?;
//! let result = session.probe();
//! println!("seq={} {:?}", result.sequence, result.outcome);
//! # Ok(())
//! # }
//! ```
//!
//! Opening a raw socket needs elevated privileges on most platforms.
#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc
)]
#![forbid(unsafe_code)]

pub mod config;
pub mod driver;
pub mod error;
pub mod packet;
pub mod resolve;
pub mod session;
pub mod socket;

pub use config::ProbeConfig;
pub use error::{Error, Result};
pub use session::{ProbeResult, Session};
