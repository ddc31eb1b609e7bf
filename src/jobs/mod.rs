//! Scheduled Jobs
//!
//! Monthly balance snapshots and the scheduler that triggers them.
//! The generator is idempotent within a month, so the scheduler can run it
//! as often as it likes; only missing snapshots are created.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use uuid::Uuid;

use crate::balance::replay;
use crate::domain::{Account, AccountBalanceSnapshot, Clock};
use crate::policy::WithdrawalPolicy;
use crate::store::{
    AccountStore, MovementStore, SnapshotStore, SortOrder, StoreError, TransactionManager,
    UnitOfWork,
};

// =========================================================================
// Monthly Snapshot Generator
// =========================================================================

/// Creates one balance snapshot per active account for the current month
pub struct SnapshotGenerator<T: TransactionManager> {
    transactions: Arc<T>,
    policy: WithdrawalPolicy,
    clock: Arc<dyn Clock>,
}

impl<T: TransactionManager> Clone for SnapshotGenerator<T> {
    fn clone(&self) -> Self {
        Self {
            transactions: Arc::clone(&self.transactions),
            policy: self.policy.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

/// Per-account result of a generator run
enum SnapshotOutcome {
    Created(AccountBalanceSnapshot),
    AlreadyExists,
}

impl<T: TransactionManager> SnapshotGenerator<T> {
    pub fn new(transactions: Arc<T>, policy: WithdrawalPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            transactions,
            policy,
            clock,
        }
    }

    /// Snapshot every active account for the current local (month, year).
    ///
    /// Per-account failures are recorded in the report and do not stop the
    /// batch. Only failing to enumerate accounts fails the whole run.
    pub async fn create_monthly_snapshots(&self) -> Result<MonthlySnapshotReport, JobError> {
        let now = self.clock.now();
        let (month, year) = self.policy.period_of(now);

        let accounts = self.active_accounts().await?;
        tracing::info!(
            accounts = accounts.len(),
            month,
            year,
            "Starting monthly snapshot run"
        );

        let mut report = MonthlySnapshotReport {
            month,
            year,
            ..MonthlySnapshotReport::default()
        };

        for account in &accounts {
            let outcome = AssertUnwindSafe(self.snapshot_account(account, month, year, now))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(SnapshotOutcome::Created(snapshot))) => {
                    tracing::debug!(
                        account_id = %account.id,
                        balance = %snapshot.balance,
                        "Snapshot created"
                    );
                    report.snapshots.push(snapshot);
                }
                Ok(Ok(SnapshotOutcome::AlreadyExists)) => report.skipped += 1,
                Ok(Err(e)) if e.is_conflict() => {
                    // another generator got there first
                    tracing::debug!(account_id = %account.id, "Snapshot created concurrently");
                    report.skipped += 1;
                }
                Ok(Err(e)) => {
                    tracing::error!(account_id = %account.id, error = %e, "Snapshot failed");
                    report.failures.push(SnapshotFailure {
                        account_id: account.id,
                        error: e.to_string(),
                    });
                }
                Err(_) => {
                    tracing::error!(account_id = %account.id, "Snapshot panicked");
                    report.failures.push(SnapshotFailure {
                        account_id: account.id,
                        error: "unexpected panic while creating snapshot".to_string(),
                    });
                }
            }
        }

        report.completed_at = self.clock.now();
        tracing::info!(
            created = report.snapshots.len(),
            skipped = report.skipped,
            failed = report.failures.len(),
            "Monthly snapshot run finished"
        );

        Ok(report)
    }

    async fn active_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let mut work = self.transactions.begin().await?;
        let accounts = work.find_active_accounts().await;
        work.rollback().await?;
        accounts
    }

    async fn snapshot_account(
        &self,
        account: &Account,
        month: u32,
        year: i32,
        now: DateTime<Utc>,
    ) -> Result<SnapshotOutcome, StoreError> {
        let mut work = self.transactions.begin().await?;

        match build_snapshot(&mut work, account.id, month, year, now).await {
            Ok(Some(snapshot)) => {
                work.commit().await?;
                Ok(SnapshotOutcome::Created(snapshot))
            }
            Ok(None) => {
                work.rollback().await?;
                Ok(SnapshotOutcome::AlreadyExists)
            }
            Err(e) => {
                if let Err(rollback_err) = work.rollback().await {
                    tracing::warn!(account_id = %account.id, error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}

/// Fold the account's history into a new snapshot, or `None` when the
/// period is already covered.
///
/// Movements created at or after `now` are left for reconstruction to fold
/// on top of the snapshot.
async fn build_snapshot<S>(
    store: &mut S,
    account_id: Uuid,
    month: u32,
    year: i32,
    now: DateTime<Utc>,
) -> Result<Option<AccountBalanceSnapshot>, StoreError>
where
    S: MovementStore + SnapshotStore + ?Sized,
{
    if store
        .find_snapshot_by_period(account_id, month, year)
        .await?
        .is_some()
    {
        return Ok(None);
    }

    let mut movements = store
        .find_movements_by_account_id(account_id, SortOrder::Asc)
        .await?;
    movements.retain(|m| m.created_at() < now);

    let (balance, last) = replay(&movements);
    let snapshot = AccountBalanceSnapshot::new(
        account_id,
        balance,
        month,
        year,
        now,
        last.map(|m| (m.id(), m.created_at())),
    );

    store.create_snapshot(&snapshot).await?;
    Ok(Some(snapshot))
}

/// Account that could not be snapshotted
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotFailure {
    pub account_id: Uuid,
    pub error: String,
}

/// Report from a snapshot run
#[derive(Debug, Clone, Default, Serialize)]
pub struct MonthlySnapshotReport {
    pub month: u32,
    pub year: i32,
    pub snapshots: Vec<AccountBalanceSnapshot>,
    pub skipped: u64,
    pub failures: Vec<SnapshotFailure>,
    pub completed_at: DateTime<Utc>,
}

// =========================================================================
// Job Scheduler
// =========================================================================

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval between snapshot checks (default: 1 hour)
    pub snapshot_check_interval: Duration,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            snapshot_check_interval: Duration::from_secs(3600),
        }
    }
}

/// Job Scheduler - runs periodic maintenance tasks
pub struct JobScheduler<T: TransactionManager> {
    generator: SnapshotGenerator<T>,
    config: JobSchedulerConfig,
}

impl<T: TransactionManager> JobScheduler<T> {
    pub fn new(generator: SnapshotGenerator<T>) -> Self {
        Self::with_config(generator, JobSchedulerConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(generator: SnapshotGenerator<T>, config: JobSchedulerConfig) -> Self {
        Self { generator, config }
    }

    /// Start the job scheduler in the background
    /// Returns a handle that can be used to abort the scheduler
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        tracing::info!(
            interval_secs = self.config.snapshot_check_interval.as_secs(),
            "Job scheduler started"
        );

        let mut snapshot_interval = interval(self.config.snapshot_check_interval);

        loop {
            snapshot_interval.tick().await;
            if let Err(e) = self.generator.create_monthly_snapshots().await {
                tracing::error!(error = %e, "Monthly snapshot run failed");
            }
        }
    }

    /// Run the snapshot job once (for manual trigger or testing)
    pub async fn run_once(&self) -> Result<MonthlySnapshotReport, JobError> {
        self.generator.create_monthly_snapshots().await
    }
}

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

// =========================================================================
// Tests
// =========================================================================
