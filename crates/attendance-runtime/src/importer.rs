//! Sequential bulk import of validated roster rows.
//!
//! Rows are sent to an [`AccountCreator`] one at a time, with a pause between
//! rows so the account service is not flooded. Failed attempts are retried
//! according to the injected [`RetryPolicy`]. A row either produces an
//! account or an entry in [`ImportSummary::error_details`]; one failed row
//! never stops the batch.

use std::time::Duration;

use attendance_data::csv_import::AccountRequest;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, info, warn};

use crate::accounts::AccountCreator;
use crate::retry::{ExponentialBackoff, RetryPolicy};

/// Default pause between consecutive rows.
pub const DEFAULT_PACING: Duration = Duration::from_secs(2);

// ── Public types ──────────────────────────────────────────────────────────────

/// Outcome of an import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub success: usize,
    pub errors: usize,
    /// `"Student <sId>: <message>"` or `"Faculty <E_ID>: <message>"`.
    pub error_details: Vec<String>,
}

/// Progress events emitted while an import runs. `row` is 1-based.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportProgress {
    Started {
        total: usize,
    },
    Retrying {
        row: usize,
        external_id: String,
        attempt: u32,
        delay: Duration,
    },
    Created {
        row: usize,
        external_id: String,
        uid: String,
    },
    Failed {
        row: usize,
        detail: String,
    },
    Finished(ImportSummary),
}

// ── ImportRunner ──────────────────────────────────────────────────────────────

pub struct ImportRunner<P = ExponentialBackoff> {
    policy: P,
    pacing: Duration,
    progress: Option<mpsc::Sender<ImportProgress>>,
}

impl Default for ImportRunner<ExponentialBackoff> {
    fn default() -> Self {
        Self::new(ExponentialBackoff::default())
    }
}

impl<P: RetryPolicy> ImportRunner<P> {
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            pacing: DEFAULT_PACING,
            progress: None,
        }
    }

    /// Pause between rows. `Duration::ZERO` disables pacing.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<ImportProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Import every request in order and summarise the results.
    pub async fn run<C: AccountCreator>(
        &self,
        creator: &mut C,
        requests: &[AccountRequest],
    ) -> ImportSummary {
        let mut summary = ImportSummary::default();
        self.emit(ImportProgress::Started {
            total: requests.len(),
        })
        .await;
        info!("Importing {} accounts", requests.len());

        for (index, request) in requests.iter().enumerate() {
            let row = index + 1;
            match self.import_one(creator, request, row).await {
                Ok(uid) => {
                    summary.success += 1;
                    debug!("Row {}: created {} ({})", row, request.external_id, uid);
                    self.emit(ImportProgress::Created {
                        row,
                        external_id: request.external_id.clone(),
                        uid,
                    })
                    .await;
                }
                Err(detail) => {
                    summary.errors += 1;
                    warn!("Row {}: {}", row, detail);
                    self.emit(ImportProgress::Failed {
                        row,
                        detail: detail.clone(),
                    })
                    .await;
                    summary.error_details.push(detail);
                }
            }

            if row < requests.len() && !self.pacing.is_zero() {
                time::sleep(self.pacing).await;
            }
        }

        info!(
            "Import finished: {} created, {} failed",
            summary.success, summary.errors
        );
        self.emit(ImportProgress::Finished(summary.clone())).await;
        summary
    }

    /// Create one account, retrying as the policy allows. The error string
    /// is the row's error detail.
    async fn import_one<C: AccountCreator>(
        &self,
        creator: &mut C,
        request: &AccountRequest,
        row: usize,
    ) -> Result<String, String> {
        let mut attempt = 1;
        loop {
            match creator.create_account(request).await {
                Ok(uid) => return Ok(uid),
                Err(e) => match self.policy.delay_for(attempt, &e) {
                    Some(delay) => {
                        debug!(
                            "Row {}: attempt {} failed ({}), retrying in {:?}",
                            row, attempt, e, delay
                        );
                        self.emit(ImportProgress::Retrying {
                            row,
                            external_id: request.external_id.clone(),
                            attempt,
                            delay,
                        })
                        .await;
                        time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        return Err(format!(
                            "{} {}: {}",
                            request.kind.label(),
                            request.external_id,
                            e
                        ))
                    }
                },
            }
        }
    }

    async fn emit(&self, event: ImportProgress) {
        if let Some(tx) = &self.progress {
            if tx.send(event).await.is_err() {
                debug!("import progress receiver dropped");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::AccountError;
    use crate::retry::NoRetry;
    use attendance_core::academic::AcademicConfig;
    use attendance_data::csv_import::{CsvValidator, RowKind};
    use std::collections::VecDeque;

    /// Replays scripted results and records every call.
    #[derive(Default)]
    struct ScriptedCreator {
        script: VecDeque<Result<String, AccountError>>,
        calls: Vec<String>,
    }

    impl ScriptedCreator {
        fn new(script: Vec<Result<String, AccountError>>) -> Self {
            Self {
                script: script.into(),
                calls: Vec::new(),
            }
        }
    }

    impl AccountCreator for ScriptedCreator {
        async fn create_account(
            &mut self,
            request: &AccountRequest,
        ) -> Result<String, AccountError> {
            self.calls.push(request.external_id.clone());
            self.script
                .pop_front()
                .unwrap_or_else(|| Ok(format!("uid-{}", request.external_id)))
        }
    }

    fn requests(text: &str, kind: RowKind) -> Vec<AccountRequest> {
        let academic = AcademicConfig::default();
        CsvValidator::new(&academic)
            .validate_text(text, kind)
            .into_rows()
            .unwrap()
            .account_requests(&academic)
    }

    fn three_students() -> Vec<AccountRequest> {
        requests(
            "studentName,studyingYear,rollNo,division,batch,electiveSubject,sId,sPassword\n\
             A,SE,1,5,K5,DS,ST1,pw\n\
             B,SE,2,5,L5,DS,ST2,pw\n\
             C,SE,3,6,K6,DS,ST3,pw\n",
            RowKind::Student,
        )
    }

    fn fast_backoff() -> ExponentialBackoff {
        ExponentialBackoff {
            max_attempts: 3,
            base: Duration::from_millis(1),
        }
    }

    // ── run ───────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_all_rows_succeed() {
        let mut creator = ScriptedCreator::default();
        let runner = ImportRunner::new(NoRetry).with_pacing(Duration::ZERO);

        let summary = runner.run(&mut creator, &three_students()).await;
        assert_eq!(summary.success, 3);
        assert_eq!(summary.errors, 0);
        assert!(summary.error_details.is_empty());
        assert_eq!(creator.calls, vec!["ST1", "ST2", "ST3"]);
    }

    #[tokio::test]
    async fn test_failed_row_does_not_stop_batch() {
        let mut creator = ScriptedCreator::new(vec![
            Ok("u1".into()),
            Err(AccountError::AlreadyExists("ST2@student.pict.edu".into())),
        ]);
        let runner = ImportRunner::new(NoRetry).with_pacing(Duration::ZERO);

        let summary = runner.run(&mut creator, &three_students()).await;
        assert_eq!(summary.success, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(
            summary.error_details,
            vec!["Student ST2: An account already exists for ST2@student.pict.edu"]
        );
    }

    #[tokio::test]
    async fn test_rate_limited_row_retried_then_succeeds() {
        let mut creator = ScriptedCreator::new(vec![
            Err(AccountError::RateLimited),
            Err(AccountError::RateLimited),
            Ok("u1".into()),
        ]);
        let runner = ImportRunner::new(fast_backoff()).with_pacing(Duration::ZERO);

        let summary = runner.run(&mut creator, &three_students()[..1]).await;
        assert_eq!(summary.success, 1);
        assert_eq!(creator.calls.len(), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted_reports_error() {
        let mut creator = ScriptedCreator::new(vec![
            Err(AccountError::RateLimited),
            Err(AccountError::RateLimited),
            Err(AccountError::RateLimited),
        ]);
        let runner = ImportRunner::new(fast_backoff()).with_pacing(Duration::ZERO);

        let rows = requests(
            "name,designation,emailID,subject,E_ID,E_password\n\
             Dr. Rao,Professor,rao@pict.edu,OS,EMP1,pw\n",
            RowKind::Faculty,
        );
        let summary = runner.run(&mut creator, &rows).await;
        assert_eq!(creator.calls.len(), 3);
        assert_eq!(
            summary.error_details,
            vec!["Faculty EMP1: Too many requests, try again later"]
        );
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let mut creator = ScriptedCreator::default();
        let summary = ImportRunner::default()
            .run(&mut creator, &[])
            .await;
        assert_eq!(summary, ImportSummary::default());
    }

    // ── progress ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_progress_events() {
        let (tx, mut rx) = mpsc::channel(32);
        let mut creator = ScriptedCreator::new(vec![
            Err(AccountError::RateLimited),
            Ok("u1".into()),
            Err(AccountError::Rejected("weak password".into())),
        ]);
        let runner = ImportRunner::new(fast_backoff())
            .with_pacing(Duration::from_millis(1))
            .with_progress(tx);

        let rows = three_students();
        let summary = runner.run(&mut creator, &rows[..2]).await;
        drop(runner);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(events[0], ImportProgress::Started { total: 2 });
        assert!(matches!(
            events[1],
            ImportProgress::Retrying { row: 1, attempt: 1, .. }
        ));
        assert_eq!(
            events[2],
            ImportProgress::Created {
                row: 1,
                external_id: "ST1".into(),
                uid: "u1".into(),
            }
        );
        assert_eq!(
            events[3],
            ImportProgress::Failed {
                row: 2,
                detail: "Student ST2: weak password".into(),
            }
        );
        assert_eq!(events[4], ImportProgress::Finished(summary));
        assert_eq!(events.len(), 5);
    }
}
