use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use stepsync_core::{Account, AccountId};
use tokio::sync::{watch, Notify};
use tracing::{debug, error, info, warn};

use crate::guard::InFlight;
use crate::schedule::{latest_occurrence, next_fire_after};
use crate::types::{DailyTrigger, JobOptions, ReconcileReport, ScheduledJob};

/// Longest the clock sleeps without re-reading the wall clock. Keeps fire
/// times honest across suspend/resume, where the monotonic sleep and the
/// wall clock drift apart.
const MAX_IDLE: std::time::Duration = std::time::Duration::from_secs(30);

/// Receives due accounts from the clock.
#[async_trait]
pub trait JobRunner: Send + Sync + 'static {
    async fn run_scheduled_job(&self, account_id: AccountId);
}

/// Job table plus the clock that drives it.
pub struct JobRegistry {
    tz: Tz,
    options: JobOptions,
    /// Every add/update/remove happens under this one lock, including the
    /// whole of a reconcile pass.
    jobs: Mutex<HashMap<AccountId, ScheduledJob>>,
    in_flight: Arc<InFlight>,
    started: AtomicBool,
    wake: Notify,
}

impl JobRegistry {
    pub fn new(tz: Tz) -> Self {
        Self::with_options(tz, JobOptions::default())
    }

    pub fn with_options(tz: Tz, options: JobOptions) -> Self {
        Self {
            tz,
            options,
            jobs: Mutex::new(HashMap::new()),
            in_flight: Arc::new(InFlight::new()),
            started: AtomicBool::new(false),
            wake: Notify::new(),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Exclusion set shared with the manual execution path.
    pub fn in_flight(&self) -> &Arc<InFlight> {
        &self.in_flight
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    fn lock_jobs(&self) -> MutexGuard<'_, HashMap<AccountId, ScheduledJob>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of the job table ordered by next fire time.
    pub fn jobs(&self) -> Vec<ScheduledJob> {
        let mut jobs: Vec<_> = self.lock_jobs().values().cloned().collect();
        jobs.sort_by_key(|j| (j.next_fire, j.account_id));
        jobs
    }

    pub fn job(&self, id: AccountId) -> Option<ScheduledJob> {
        self.lock_jobs().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock_jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_jobs().is_empty()
    }

    /// Make the job table match `accounts`: one job per enabled account,
    /// none for disabled or absent ones. Idempotent.
    pub fn reconcile(&self, accounts: &[Account]) -> ReconcileReport {
        self.reconcile_at(accounts, Utc::now())
    }

    fn reconcile_at(&self, accounts: &[Account], now: DateTime<Utc>) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut jobs = self.lock_jobs();
        let mut present = HashSet::with_capacity(accounts.len());

        for account in accounts {
            let id = account.id;
            present.insert(id);

            if !account.enabled {
                if jobs.remove(&id).is_some() {
                    report.removed.push(id);
                }
                continue;
            }

            let trigger = match DailyTrigger::new(account.schedule_hour, account.schedule_minute) {
                Ok(t) => t,
                Err(e) => {
                    warn!(account_id = %id, error = %e, "account has an invalid schedule, no job");
                    if jobs.remove(&id).is_some() {
                        report.removed.push(id);
                    }
                    continue;
                }
            };

            match jobs.get_mut(&id) {
                Some(job) if job.trigger == trigger => {}
                Some(job) => {
                    // Options stay as they were; only the trigger moves.
                    job.trigger = trigger;
                    job.next_fire = self.advance(trigger, now);
                    report.rescheduled.push(id);
                }
                None => {
                    let next = self.advance(trigger, now);
                    jobs.insert(id, ScheduledJob::new(id, trigger, self.options, next));
                    report.added.push(id);
                }
            }
        }

        jobs.retain(|id, _| {
            let keep = present.contains(id);
            if !keep {
                report.removed.push(*id);
            }
            keep
        });

        let mut ids: Vec<_> = jobs.keys().map(|id| id.get()).collect();
        ids.sort_unstable();
        drop(jobs);

        if !report.is_noop() {
            self.wake.notify_one();
        }
        info!(
            jobs = ?ids,
            added = report.added.len(),
            rescheduled = report.rescheduled.len(),
            removed = report.removed.len(),
            "scheduler jobs synced"
        );
        report
    }

    fn advance(&self, trigger: DailyTrigger, from: DateTime<Utc>) -> DateTime<Utc> {
        next_fire_after(trigger, from, self.tz).unwrap_or_else(|| {
            warn!(%trigger, "no fire time found in the next days, retrying tomorrow");
            from + Duration::days(1)
        })
    }

    /// Spawn the clock task. Calling it again while running is a no-op;
    /// returns whether this call started it.
    pub fn start(self: &Arc<Self>, runner: Arc<dyn JobRunner>, shutdown: watch::Receiver<bool>) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("scheduler already started");
            return false;
        }
        let registry = Arc::clone(self);
        tokio::spawn(async move { registry.run(runner, shutdown).await });
        info!(tz = %self.tz, "scheduler started");
        true
    }

    async fn run(self: Arc<Self>, runner: Arc<dyn JobRunner>, mut shutdown: watch::Receiver<bool>) {
        loop {
            for id in self.take_due(Utc::now()) {
                dispatch(id, &runner);
            }

            let wait = self.next_wait(Utc::now());
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = self.wake.notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("scheduler clock shutting down");
                        break;
                    }
                }
            }
        }
        self.started.store(false, Ordering::SeqCst);
    }

    /// Collect accounts due at `now` and advance their next fire time.
    ///
    /// Backlogs coalesce: only the latest missed occurrence is checked
    /// against the grace window, and at most one run is produced per job.
    fn take_due(&self, now: DateTime<Utc>) -> Vec<AccountId> {
        let mut due = Vec::new();
        let mut jobs = self.lock_jobs();

        for job in jobs.values_mut() {
            if job.next_fire > now {
                continue;
            }
            let id = job.account_id;
            let occurrence = latest_occurrence(job.trigger, job.next_fire, now, self.tz);
            job.next_fire = self.advance(job.trigger, now);

            let late = now - occurrence;
            if late > job.options.misfire_grace {
                warn!(
                    account_id = %id,
                    late_secs = late.num_seconds(),
                    "run missed beyond grace window, skipping"
                );
                continue;
            }
            if self.in_flight.is_running(id) {
                info!(account_id = %id, "previous run still in flight, skipping");
                continue;
            }

            job.last_fired = Some(now);
            due.push(id);
        }

        due
    }

    /// Time until the earliest fire, capped at [`MAX_IDLE`].
    fn next_wait(&self, now: DateTime<Utc>) -> std::time::Duration {
        self.lock_jobs()
            .values()
            .map(|j| j.next_fire)
            .min()
            .map(|next| (next - now).to_std().unwrap_or(std::time::Duration::ZERO))
            .map_or(MAX_IDLE, |wait| wait.min(MAX_IDLE))
    }
}

/// Run one job on its own task. A panic inside the runner is logged here
/// and never reaches the clock loop.
fn dispatch(id: AccountId, runner: &Arc<dyn JobRunner>) {
    let runner = Arc::clone(runner);
    let handle = tokio::spawn(async move { runner.run_scheduled_job(id).await });
    tokio::spawn(async move {
        if let Err(e) = handle.await {
            if e.is_panic() {
                error!(account_id = %id, "scheduled job panicked");
            }
        }
    });
}
