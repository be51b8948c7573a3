use crate::error::{Error, Result};
use std::time::Duration;

/// Default values for configuration.
pub mod defaults {
    use std::time::Duration;

    /// The default number of echo requests to send.
    pub const DEFAULT_COUNT: i64 = 3;

    /// The default time to wait for each echo reply.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

    /// The pause after each probe.
    pub const PROBE_INTERVAL: Duration = Duration::from_secs(1);
}

/// The default ICMP identifier, derived from the process id.
#[must_use]
pub fn default_identifier() -> u16 {
    (std::process::id() & 0xffff) as u16
}

/// Validated, immutable configuration for a ping run.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ProbeConfig {
    target: String,
    count: u64,
    identifier: u16,
    timeout: Duration,
}

impl ProbeConfig {
    /// Validate and build a configuration.
    ///
    /// `identifier` of `None` uses [`default_identifier`].
    pub fn new(
        target: impl Into<String>,
        count: i64,
        identifier: Option<i64>,
        timeout: Duration,
    ) -> Result<Self> {
        let target = target.into();
        if target.is_empty() {
            return Err(Error::BadConfig(String::from("Required address (-a).")));
        }
        let count = u64::try_from(count)
            .ok()
            .filter(|&count| count > 0)
            .ok_or_else(|| Error::BadConfig(String::from("Trial count must be greater than 0")))?;
        let identifier = match identifier {
            None => default_identifier(),
            Some(id) => u16::try_from(id)
                .map_err(|_| Error::BadConfig(String::from("Identifier must be 0-65535")))?,
        };
        Ok(Self {
            target,
            count,
            identifier,
            timeout,
        })
    }

    /// The destination hostname or `IPv4` literal, as given.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    #[must_use]
    pub const fn identifier(&self) -> u16 {
        self.identifier
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}
