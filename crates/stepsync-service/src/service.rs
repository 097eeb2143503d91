use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::FutureExt;
use stepsync_core::store::AccountSource;
use stepsync_core::{AccountId, Result, SubmitStatus};
use stepsync_remote::{SubmissionResult, Submitter};
use stepsync_scheduler::{JobRegistry, JobRunner, ReconcileReport};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::outcome::{BulkOutcome, ExecutionOutcome};
use crate::recorder::ExecutionRecorder;

/// Where an execution request came from. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Manual,
    Bulk,
    Scheduled,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Manual => write!(f, "manual"),
            Trigger::Bulk => write!(f, "bulk"),
            Trigger::Scheduled => write!(f, "scheduled"),
        }
    }
}

/// Orchestrates account lookup, remote submission and recording, and keeps
/// the job registry in step with the account table.
pub struct SchedulerService {
    accounts: Arc<dyn AccountSource>,
    submitter: Arc<dyn Submitter>,
    recorder: ExecutionRecorder,
    registry: Arc<JobRegistry>,
    /// Serializes list + reconcile so two syncs never see different
    /// account snapshots in the wrong order.
    sync_lock: Mutex<()>,
}

impl SchedulerService {
    pub fn new(
        accounts: Arc<dyn AccountSource>,
        submitter: Arc<dyn Submitter>,
        recorder: ExecutionRecorder,
        registry: Arc<JobRegistry>,
    ) -> Self {
        Self {
            accounts,
            submitter,
            recorder,
            registry,
            sync_lock: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Start the scheduler clock with this service as the job runner.
    /// A second call is a no-op.
    pub fn start(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> bool {
        let runner: Arc<dyn JobRunner> = Arc::clone(self) as Arc<dyn JobRunner>;
        self.registry.start(runner, shutdown)
    }

    /// Re-read all accounts and reconcile the job table against them.
    pub fn sync_jobs(&self) -> Result<ReconcileReport> {
        let _guard = self.sync_lock.lock().unwrap_or_else(|p| p.into_inner());
        let accounts = self.accounts.list_accounts()?;
        Ok(self.registry.reconcile(&accounts))
    }

    /// Submit for one account right now, with an optional step override.
    pub async fn execute_now(&self, id: AccountId, steps: Option<u32>) -> ExecutionOutcome {
        self.execute(id, steps, Trigger::Manual).await
    }

    /// Run every enabled account once, one after another, in id order.
    pub async fn execute_all(&self) -> BulkOutcome {
        let mut accounts = match self.accounts.list_accounts() {
            Ok(accounts) => accounts,
            Err(e) => {
                error!(error = %e, "failed to list accounts for bulk execution");
                return BulkOutcome::aborted(format!("failed to list accounts: {e}"));
            }
        };
        accounts.retain(|a| a.enabled);
        accounts.sort_by_key(|a| a.id);

        let mut results = Vec::with_capacity(accounts.len());
        for account in &accounts {
            results.push(self.execute(account.id, None, Trigger::Bulk).await);
        }

        let bulk = BulkOutcome::from_results(results);
        info!(
            accounts = bulk.results.len(),
            failed = bulk.results.iter().filter(|r| !r.success).count(),
            "bulk execution finished"
        );
        bulk
    }

    /// Credential check: submit without touching any account or record.
    pub async fn submit_to_remote(&self, login: &str, secret: &str, steps: u32) -> SubmissionResult {
        let result = self.submitter.submit(login, secret, steps).await;
        info!(steps, success = result.success, "test submission finished");
        result
    }

    async fn execute(&self, id: AccountId, steps: Option<u32>, trigger: Trigger) -> ExecutionOutcome {
        let account = match self.accounts.get_account(id) {
            Ok(Some(account)) => account,
            Ok(None) => {
                warn!(account_id = %id, %trigger, "execution requested for unknown account");
                return ExecutionOutcome::not_found(id);
            }
            Err(e) => {
                error!(account_id = %id, %trigger, error = %e, "failed to load account");
                return ExecutionOutcome::failure(id, format!("failed to load account: {e}"));
            }
        };
        let steps = steps.unwrap_or(account.steps);

        let Some(_permit) = self.registry.in_flight().try_acquire(id) else {
            info!(account_id = %id, %trigger, "execution already in flight, rejecting");
            return ExecutionOutcome::busy(&account, steps);
        };

        let result = self
            .submitter
            .submit(&account.login, &account.password, steps)
            .await;

        if let Err(e) = self.recorder.record(id, &account.login, steps, &result) {
            error!(account_id = %id, error = %e, "failed to write submit record");
        }

        info!(
            account_id = %id,
            %trigger,
            steps,
            status = %SubmitStatus::from_success(result.success),
            "submission finished"
        );
        ExecutionOutcome::completed(&account, steps, &result)
    }
}

#[async_trait]
impl JobRunner for SchedulerService {
    async fn run_scheduled_job(&self, account_id: AccountId) {
        let run = AssertUnwindSafe(self.execute(account_id, None, Trigger::Scheduled))
            .catch_unwind()
            .await;
        match run {
            Ok(outcome) if outcome.success => debug!(account_id = %account_id, "scheduled run ok"),
            Ok(outcome) => {
                warn!(account_id = %account_id, message = %outcome.message, "scheduled run failed")
            }
            Err(_) => error!(account_id = %account_id, "scheduled run panicked"),
        }
    }
}
