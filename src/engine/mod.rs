//! Membership & authorization engine.
//!
//! Each public operation opens one unit of work, evaluates its authorization
//! predicate and invariants against state read inside that unit, mutates, and
//! commits. Operations that lose a serialization race are re-run from the
//! start, so a retried leave/remove re-reads the admin set before deciding.

mod accounts;
mod clubs;
mod members;
pub mod policy;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

use crate::auth::TokenService;
use crate::config::Settings;
use crate::db::Store;
use crate::error::EngineResult;
use crate::metrics;

pub use accounts::{AuthToken, Registration};
pub use clubs::{ClubPatch, NewClub};

/// Business-rule switches read from configuration.
#[derive(Debug, Clone, Copy)]
pub struct EngineRules {
    pub strict_pricing: bool,
    pub allow_admin_signup: bool,
    pub retry_attempts: usize,
}

impl Default for EngineRules {
    fn default() -> Self {
        EngineRules {
            strict_pricing: true,
            allow_admin_signup: false,
            retry_attempts: 3,
        }
    }
}

impl From<&Settings> for EngineRules {
    fn from(s: &Settings) -> Self {
        EngineRules {
            strict_pricing: s.strict_pricing,
            allow_admin_signup: s.allow_admin_signup,
            retry_attempts: s.tx_retry_attempts,
        }
    }
}

#[derive(Clone)]
pub struct ClubEngine {
    store: Arc<dyn Store>,
    tokens: TokenService,
    rules: EngineRules,
}

impl ClubEngine {
    pub fn new(store: Arc<dyn Store>, tokens: TokenService, rules: EngineRules) -> Self {
        ClubEngine {
            store,
            tokens,
            rules,
        }
    }

    /// Cheap liveness check against the backing store.
    pub async fn ping(&self) -> EngineResult<()> {
        let uow = self.store.begin().await?;
        drop(uow);
        Ok(())
    }

    /// Run `op` and re-run it while it fails with store contention.
    async fn atomically<T, F, Fut>(&self, name: &'static str, op: F) -> EngineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        let strategy = ExponentialBackoff::from_millis(10)
            .max_delay(Duration::from_millis(250))
            .map(jitter)
            .take(self.rules.retry_attempts);

        let res = RetryIf::start(strategy, op, |e: &crate::error::EngineError| {
            let retry = e.is_contention();
            if retry {
                log::debug!("{name}: serialization conflict, retrying");
            }
            retry
        })
        .await;
        metrics::record_ledger_op(name, &res);
        res
    }
}
