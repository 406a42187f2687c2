use crate::admission::AdmissionController;
use crate::{StageError, StageResult};
use std::future::Future;
use std::time::Duration;

/// What a stage gets from the driver for one call
///
/// Admission waits happen before the hard cutoff starts, so a long wait
/// for quota never counts against the stage timeout.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    admission: &'a AdmissionController,
    timeout: Duration,
}

impl<'a> StageContext<'a> {
    pub fn new(admission: &'a AdmissionController, timeout: Duration) -> Self {
        Self { admission, timeout }
    }

    pub fn admission(&self) -> &'a AdmissionController {
        self.admission
    }

    /// Hard cutoff applied to a single outbound call
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `call` under the hard cutoff
    pub async fn timed<T>(
        &self,
        stage: &'static str,
        call: impl Future<Output = StageResult<T>>,
    ) -> StageResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StageError::Timeout {
                stage,
                after: self.timeout,
            }),
        }
    }

    /// Waits for admission to `class`, then runs `call` under the hard cutoff
    ///
    /// Usage is committed from the response text only when the call
    /// succeeds; a failed or timed-out call consumes no quota.
    pub async fn gated_text(
        &self,
        stage: &'static str,
        class: &str,
        estimated_cost: u64,
        call: impl Future<Output = StageResult<String>>,
    ) -> StageResult<String> {
        self.admission.acquire(class, estimated_cost).await;
        let text = self.timed(stage, call).await?;
        self.admission.commit_text(class, &text);
        Ok(text)
    }
}
