//! Transaction confirmation polling
//!
//! After a broadcast the poller asks the node for the transaction's inclusion
//! height on a fixed interval. Each answer is classified into a [`PollState`];
//! only a positive height ends the wait. The wait is bounded by
//! [`PollPolicy::max_attempts`] and can be cut short by a shutdown signal.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::rpc::{NeoRpc, RpcError};
use crate::transaction::TxHash;

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default attempt budget (two minutes at the default interval)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1200;

/// Polling cadence and budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` polls until the transaction is included
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
        }
    }
}

impl PollPolicy {
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// Classification of a single poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    /// Reported height is zero or negative
    Pending,
    /// Included at this height
    Confirmed(u64),
    /// Node has not indexed the hash yet
    Unknown,
    /// Any other node error; logged and polled again
    Failed(String),
}

impl PollState {
    pub fn classify(response: Result<i64, RpcError>) -> Self {
        match response {
            Ok(height) if height > 0 => PollState::Confirmed(height as u64),
            Ok(_) => PollState::Pending,
            Err(e) if e.message().to_lowercase().contains("unknown") => PollState::Unknown,
            Err(e) => PollState::Failed(e.to_string()),
        }
    }
}

/// How a wait ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Confirmed { height: u64, attempts: u32 },
    /// Attempt budget exhausted without inclusion
    Stalled { attempts: u32 },
    /// Shutdown requested before inclusion
    Cancelled { attempts: u32 },
}

impl ConfirmationOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ConfirmationOutcome::Confirmed { .. })
    }

    pub fn height(&self) -> Option<u64> {
        match self {
            ConfirmationOutcome::Confirmed { height, .. } => Some(*height),
            _ => None,
        }
    }
}

/// Polls inclusion height for broadcast transactions
pub struct ConfirmationPoller {
    rpc: Arc<dyn NeoRpc>,
    policy: PollPolicy,
}

impl ConfirmationPoller {
    pub fn new(rpc: Arc<dyn NeoRpc>, policy: PollPolicy) -> Self {
        Self { rpc, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// One poll
    pub async fn poll_once(&self, tx_hash: &TxHash) -> PollState {
        let response = self.rpc.get_transaction_height(&tx_hash.to_hex()).await;
        PollState::classify(response)
    }

    /// Wait until included or the attempt budget runs out
    pub async fn wait(&self, tx_hash: &TxHash) -> ConfirmationOutcome {
        let mut attempts = 0u32;
        loop {
            if self.policy.exhausted(attempts) {
                warn!(
                    tx_hash = %tx_hash,
                    attempts = attempts,
                    "Transaction not included within attempt budget"
                );
                return ConfirmationOutcome::Stalled { attempts };
            }

            tokio::time::sleep(self.policy.interval).await;
            attempts += 1;

            match self.poll_once(tx_hash).await {
                PollState::Confirmed(height) => {
                    info!(tx_hash = %tx_hash, height = height, attempts = attempts, "Captured NEO transaction");
                    return ConfirmationOutcome::Confirmed { height, attempts };
                }
                PollState::Pending => {
                    debug!(tx_hash = %tx_hash, attempts = attempts, "Transaction pending");
                }
                PollState::Unknown => {
                    debug!(tx_hash = %tx_hash, attempts = attempts, "Transaction not yet indexed");
                }
                PollState::Failed(reason) => {
                    warn!(tx_hash = %tx_hash, error = %reason, "Failed to get NEO transaction height");
                }
            }
        }
    }

    /// Like [`wait`](Self::wait) but returns `Cancelled` once `shutdown` fires
    pub async fn wait_with_shutdown(
        &self,
        tx_hash: &TxHash,
        shutdown: &mut mpsc::Receiver<()>,
    ) -> ConfirmationOutcome {
        let mut attempts = 0u32;
        loop {
            if self.policy.exhausted(attempts) {
                return ConfirmationOutcome::Stalled { attempts };
            }

            // A closed channel has no cancellation source left; keep polling
            tokio::select! {
                Some(()) = shutdown.recv() => {
                    info!(tx_hash = %tx_hash, attempts = attempts, "Confirmation wait cancelled");
                    return ConfirmationOutcome::Cancelled { attempts };
                }
                _ = tokio::time::sleep(self.policy.interval) => {}
            }
            attempts += 1;

            match self.poll_once(tx_hash).await {
                PollState::Confirmed(height) => {
                    info!(tx_hash = %tx_hash, height = height, "Captured NEO transaction");
                    return ConfirmationOutcome::Confirmed { height, attempts };
                }
                PollState::Failed(reason) => {
                    warn!(tx_hash = %tx_hash, error = %reason, "Failed to get NEO transaction height");
                }
                PollState::Pending | PollState::Unknown => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::rpc::InvokeResult;

    /// Replays scripted height responses, then repeats the last one
    struct HeightScript {
        responses: Mutex<VecDeque<Result<i64, RpcError>>>,
        calls: Mutex<u32>,
    }

    impl HeightScript {
        fn new(responses: Vec<Result<i64, RpcError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl NeoRpc for HeightScript {
        async fn invoke_script(&self, _: &str, _: &str) -> Result<InvokeResult, RpcError> {
            unimplemented!()
        }

        async fn send_raw_transaction(&self, _: &str) -> Result<(), RpcError> {
            unimplemented!()
        }

        async fn get_transaction_height(&self, _: &str) -> Result<i64, RpcError> {
            *self.calls.lock().unwrap() += 1;
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                responses.front().cloned().unwrap()
            }
        }

        async fn get_storage(&self, _: &str, _: &str) -> Result<String, RpcError> {
            unimplemented!()
        }
    }

    fn unknown() -> Result<i64, RpcError> {
        Err(RpcError::Server {
            code: -100,
            message: "Unknown transaction".to_string(),
        })
    }

    fn fast(max_attempts: Option<u32>) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            max_attempts,
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(PollState::classify(Ok(100)), PollState::Confirmed(100));
        assert_eq!(PollState::classify(Ok(0)), PollState::Pending);
        assert_eq!(PollState::classify(Ok(-1)), PollState::Pending);
        assert_eq!(PollState::classify(unknown()), PollState::Unknown);
        assert!(matches!(
            PollState::classify(Err(RpcError::Transport("connection refused".into()))),
            PollState::Failed(_)
        ));
    }

    #[tokio::test]
    async fn test_confirms_on_first_positive_height() {
        let rpc = HeightScript::new(vec![Ok(100)]);
        let poller = ConfirmationPoller::new(rpc.clone(), fast(Some(10)));
        let outcome = poller.wait(&TxHash([1; 32])).await;
        assert_eq!(
            outcome,
            ConfirmationOutcome::Confirmed {
                height: 100,
                attempts: 1
            }
        );
        assert_eq!(rpc.calls(), 1);
    }

    #[tokio::test]
    async fn test_keeps_polling_through_unknown_pending_and_errors() {
        let rpc = HeightScript::new(vec![
            unknown(),
            Ok(0),
            Err(RpcError::Transport("timeout".into())),
            Ok(7),
        ]);
        let poller = ConfirmationPoller::new(rpc.clone(), fast(Some(10)));
        let outcome = poller.wait(&TxHash([2; 32])).await;
        assert_eq!(outcome.height(), Some(7));
        assert_eq!(rpc.calls(), 4);
    }

    #[tokio::test]
    async fn test_stalls_after_budget() {
        let rpc = HeightScript::new(vec![unknown()]);
        let poller = ConfirmationPoller::new(rpc.clone(), fast(Some(3)));
        let outcome = poller.wait(&TxHash([3; 32])).await;
        assert_eq!(outcome, ConfirmationOutcome::Stalled { attempts: 3 });
        assert_eq!(rpc.calls(), 3);
        assert!(!outcome.is_confirmed());
    }

    #[tokio::test]
    async fn test_shutdown_cancels_wait() {
        let rpc = HeightScript::new(vec![Ok(0)]);
        let poller = ConfirmationPoller::new(
            rpc.clone(),
            PollPolicy::unbounded(Duration::from_secs(60)),
        );
        let (tx, mut rx) = mpsc::channel(1);
        tx.send(()).await.unwrap();
        let outcome = poller.wait_with_shutdown(&TxHash([4; 32]), &mut rx).await;
        assert_eq!(outcome, ConfirmationOutcome::Cancelled { attempts: 0 });
        assert_eq!(rpc.calls(), 0);
    }

    #[tokio::test]
    async fn test_dropped_sender_keeps_polling() {
        let rpc = HeightScript::new(vec![Ok(0), Ok(5)]);
        let poller = ConfirmationPoller::new(rpc.clone(), fast(Some(10)));
        let (tx, mut rx) = mpsc::channel::<()>(1);
        drop(tx);
        let outcome = poller.wait_with_shutdown(&TxHash([5; 32]), &mut rx).await;
        assert_eq!(
            outcome,
            ConfirmationOutcome::Confirmed {
                height: 5,
                attempts: 2
            }
        );
        assert_eq!(rpc.calls(), 2);
    }

    #[test]
    fn test_default_policy() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_millis(100));
        assert!(!policy.exhausted(DEFAULT_MAX_ATTEMPTS - 1));
        assert!(policy.exhausted(DEFAULT_MAX_ATTEMPTS));
        assert!(!PollPolicy::unbounded(DEFAULT_POLL_INTERVAL).exhausted(u32::MAX));
    }
}
