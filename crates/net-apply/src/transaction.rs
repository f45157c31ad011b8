//! Transactional reconciliation of the managed document
//!
//! One reconciliation walks `Idle → BackedUp → Written → (Tested) →
//! Applied → Committed`. A failure after the backup ends in `RolledBack`:
//! the prior document is restored, or the new one removed when there was
//! none, and the original error is returned.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info};

use netplan_config::{EngineSettings, NetplanStore, ReconcileLock};
use netplan_core::{NetworkDocument, Result};
use netplan_validate::Remediation;

use crate::command::{NetplanCli, TrialVerdict};
use crate::report::{ApplyReport, ApplyState, TrialOutcome, Warning};
use crate::rollback::Checkpoint;

/// Reported when the trial is skipped because bonds or bridges are present
pub const TRIAL_SKIPPED_WARNING: &str = "Netplan try is not supported for bonds or bridges. \
Configuration was generated and applied directly without a trial; verify connectivity manually.";

/// Progress of one reconciliation
#[derive(Debug)]
pub struct Transaction {
    states: Vec<ApplyState>,
    trial: Option<TrialOutcome>,
    warnings: Vec<Warning>,
    started: Instant,
}

impl Transaction {
    fn begin() -> Self {
        Self {
            states: vec![ApplyState::Idle],
            trial: None,
            warnings: Vec::new(),
            started: Instant::now(),
        }
    }

    fn enter(&mut self, state: ApplyState) {
        debug!("Reconciliation state: {} -> {}", self.state(), state);
        self.states.push(state);
    }

    pub fn state(&self) -> ApplyState {
        self.states.last().copied().unwrap_or(ApplyState::Idle)
    }

    fn finish(self, remediations: Vec<Remediation>) -> ApplyReport {
        ApplyReport {
            state: self.state(),
            states: self.states,
            trial: self.trial,
            remediations,
            warnings: self.warnings,
            duration_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}

/// Drives backup, write, generate, trial, apply and commit
pub struct ApplyOrchestrator {
    store: Arc<NetplanStore>,
    cli: NetplanCli,
    backup_path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
}

impl ApplyOrchestrator {
    pub fn new(settings: &EngineSettings, store: Arc<NetplanStore>, cli: NetplanCli) -> Self {
        Self {
            store,
            cli,
            backup_path: settings.backup_path(),
            lock_path: settings.lock_path.clone(),
            lock_timeout: settings.lock_timeout(),
        }
    }

    pub fn store(&self) -> &NetplanStore {
        &self.store
    }

    /// Write `document` and make it live.
    ///
    /// `document` is rewritten in place by remediation before it is saved.
    pub async fn reconcile(
        &self,
        document: &mut NetworkDocument,
        trial_timeout_secs: u64,
    ) -> Result<ApplyReport> {
        let _lock = ReconcileLock::acquire(&self.lock_path, self.lock_timeout).await?;
        let mut transaction = Transaction::begin();

        info!("Reconciling {:?}", self.store.path());

        let checkpoint = Checkpoint::create(self.store.path(), &self.backup_path).await?;
        transaction.enter(ApplyState::BackedUp);

        match self
            .write_and_activate(document, trial_timeout_secs, &mut transaction)
            .await
        {
            Ok(remediations) => {
                checkpoint.discard().await;
                transaction.enter(ApplyState::Committed);
                info!("Reconciliation committed");
                Ok(transaction.finish(remediations))
            }
            Err(e) => {
                error!("Reconciliation failed in state {}: {}", transaction.state(), e);
                transaction.enter(ApplyState::RolledBack);

                if let Err(rollback_err) = checkpoint.restore().await {
                    error!(
                        "Failed to roll back {:?}, backup left at {:?}: {}",
                        self.store.path(),
                        self.backup_path,
                        rollback_err
                    );
                }
                Err(e)
            }
        }
    }

    /// Make the document already on disk live, without backup or write
    pub async fn activate(&self, trial_timeout_secs: u64) -> Result<ApplyReport> {
        let _lock = ReconcileLock::acquire(&self.lock_path, self.lock_timeout).await?;
        let mut transaction = Transaction::begin();

        let document = self.store.load().await?;
        self.activation(&document, trial_timeout_secs, &mut transaction)
            .await?;

        transaction.enter(ApplyState::Committed);
        Ok(transaction.finish(Vec::new()))
    }

    async fn write_and_activate(
        &self,
        document: &mut NetworkDocument,
        trial_timeout_secs: u64,
        transaction: &mut Transaction,
    ) -> Result<Vec<Remediation>> {
        let remediations = self.store.save(document).await?;
        transaction.enter(ApplyState::Written);

        self.activation(document, trial_timeout_secs, transaction)
            .await?;
        Ok(remediations)
    }

    async fn activation(
        &self,
        document: &NetworkDocument,
        trial_timeout_secs: u64,
        transaction: &mut Transaction,
    ) -> Result<()> {
        self.cli.generate().await?;

        if document.has_bonds_or_bridges() {
            info!("Bonds or bridges present, skipping netplan try");
            transaction
                .warnings
                .push(Warning::new("netplan try", TRIAL_SKIPPED_WARNING));
            self.cli.apply().await?;
            transaction.trial = Some(TrialOutcome::SkippedForBondOrBridge);
            transaction.enter(ApplyState::Applied);
            return Ok(());
        }

        let outcome = match self.cli.try_config(trial_timeout_secs).await? {
            TrialVerdict::Accepted => {
                transaction.enter(ApplyState::Tested);
                TrialOutcome::Tested
            }
            TrialVerdict::Reverted => TrialOutcome::DirectApplyAfterRevert,
        };

        self.cli.apply().await?;
        transaction.trial = Some(outcome);
        transaction.enter(ApplyState::Applied);
        Ok(())
    }
}
