use std::time::Duration;

use sbdlink_at::ExchangeConfig;

/// Longest text accepted by `AT+SBDWT`.
pub const MAX_TEXT_LEN: usize = 120;

/// Largest mobile-originated binary message (`AT+SBDWB`).
pub const MAX_MO_LEN: usize = 340;

/// Largest mobile-terminated message the device can hold.
pub const MAX_MT_LEN: usize = 270;

/// Bounded, fixed-backoff retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero behaves like one.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub const fn once() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Connection and timing settings for a [`crate::Modem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModemConfig {
    /// Serial baud rate. Default: 19200.
    pub baud_rate: u32,
    /// Budget for ordinary command exchanges. Default: 5 s.
    pub command_timeout: Duration,
    /// Budget for `AT+SBDIX`, which waits on the satellite link. Default: 90 s.
    pub session_timeout: Duration,
    /// Whether the modem echoes commands. Default: true.
    pub expect_echo: bool,
    /// `AT` probes sent while connecting. Default: 3.
    pub probe_attempts: u32,
    /// Used by `initiate_session_with_retry` callers that want the default.
    pub session_retry: RetryPolicy,
    /// Applied while the modem reports no network service for `AT-MSSTM`.
    pub network_retry: RetryPolicy,
}

impl ModemConfig {
    pub(crate) fn command_exchange(&self) -> ExchangeConfig {
        ExchangeConfig {
            timeout: self.command_timeout,
            expect_echo: self.expect_echo,
        }
    }

    pub(crate) fn session_exchange(&self) -> ExchangeConfig {
        ExchangeConfig {
            timeout: self.session_timeout,
            expect_echo: self.expect_echo,
        }
    }
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            baud_rate: 19_200,
            command_timeout: Duration::from_secs(5),
            session_timeout: Duration::from_secs(90),
            expect_echo: true,
            probe_attempts: 3,
            session_retry: RetryPolicy {
                max_attempts: 3,
                backoff: Duration::from_secs(2),
            },
            network_retry: RetryPolicy {
                max_attempts: 5,
                backoff: Duration::from_secs(1),
            },
        }
    }
}
