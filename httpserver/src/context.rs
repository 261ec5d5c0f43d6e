//! Deadline shared by every step of the shutdown phase.

use std::time::Duration;

use tokio::time::Instant;

/// Time budget of a running shutdown.
///
/// One value is created when shutdown begins and handed, unchanged, to the
/// listener drain and then to every hook. Hooks therefore share what is left
/// of the budget instead of getting a fresh timeout each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownContext {
    deadline: Instant,
}

impl ShutdownContext {
    /// Starts a budget of `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
        }
    }

    /// Absolute point in time at which the shutdown must be over.
    #[must_use]
    pub const fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline, zero once it passed.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Whether the deadline already passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Resolves when the deadline passes.
    pub async fn expired(&self) {
        tokio::time::sleep_until(self.deadline).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn remaining_shrinks_to_zero() {
        let ctx = ShutdownContext::with_timeout(Duration::from_millis(30));
        assert!(!ctx.is_expired());
        assert!(ctx.remaining() <= Duration::from_millis(30));

        ctx.expired().await;
        assert!(ctx.is_expired());
        assert_eq!(ctx.remaining(), Duration::ZERO);
    }

    #[test]
    fn copies_share_the_same_deadline() {
        let ctx = ShutdownContext::with_timeout(Duration::from_secs(5));
        let copy = ctx;
        assert_eq!(ctx.deadline(), copy.deadline());
    }
}
