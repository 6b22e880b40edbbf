//! Stub settlement rail.
//!
//! The original gateway ships a stub that reports every payment as
//! succeeded; this adapter keeps that behavior as the default and adds
//! failure modes so worker retry policy can be exercised.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use crate::domain::Transaction;
use crate::ports::{RailError, SettlementRail};

#[derive(Debug, Clone, Copy)]
enum RailMode {
    Succeed,
    Fatal,
    Transient,
    /// Fail transiently this many times, then succeed.
    TransientThenSucceed(u32),
}

pub struct StubRail {
    mode: RailMode,
    calls: AtomicU32,
}

impl StubRail {
    pub fn succeeding() -> Self {
        Self::with_mode(RailMode::Succeed)
    }

    pub fn rejecting() -> Self {
        Self::with_mode(RailMode::Fatal)
    }

    pub fn flaky() -> Self {
        Self::with_mode(RailMode::Transient)
    }

    pub fn flaky_then_succeeding(failures: u32) -> Self {
        Self::with_mode(RailMode::TransientThenSucceed(failures))
    }

    fn with_mode(mode: RailMode) -> Self {
        Self {
            mode,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettlementRail for StubRail {
    async fn submit(&self, transaction: &Transaction) -> Result<(), RailError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        match self.mode {
            RailMode::Succeed => Ok(()),
            RailMode::Fatal => Err(RailError::Fatal(format!(
                "rail rejected transaction {}",
                transaction.id
            ))),
            RailMode::Transient => Err(RailError::Transient("rail unavailable".to_string())),
            RailMode::TransientThenSucceed(failures) => {
                if call < failures {
                    Err(RailError::Transient("rail unavailable".to_string()))
                } else {
                    Ok(())
                }
            }
        }
    }
}
