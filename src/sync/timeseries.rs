//! Executing the canonical script.

use std::sync::atomic::Ordering;

use tracing::Instrument;

use super::ScriptSync;
use crate::flux::ScriptStatus;
use crate::observability::script_span;
use crate::service::{Notification, Service};

impl ScriptSync {
    /// Validate and execute the canonical script against `service`.
    ///
    /// A script the parser rejects sets the error status and is not
    /// executed. A run whose validation is overtaken by a newer parse stops
    /// without touching the state. Execution failures clear the stored tables and notify the
    /// user; a truncated response keeps its tables and notifies once. Every
    /// run that gets past validation ends with a non-propagating parse of
    /// the script.
    pub async fn fetch_time_series(&self, service: &Service) -> ScriptStatus {
        let script = self.script();
        if script.is_empty() {
            return self.status();
        }

        self.state().status = ScriptStatus::Loading;
        let seq = self.inner.parse_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let validated = self
            .inner
            .parser
            .parse(&script)
            .instrument(script_span("validate", seq))
            .await;

        // A newer parse owns the state; this run neither reports nor executes.
        if self.inner.parse_seq.load(Ordering::SeqCst) != seq {
            tracing::debug!(seq, "discarding superseded fetch");
            return self.status();
        }

        if let Err(e) = validated {
            tracing::error!(error = %e, "could not parse script");
            let status = ScriptStatus::error(e.diagnostic());
            self.state().status = status.clone();
            return status;
        }

        let result = self
            .inner
            .executor
            .execute(service, &script)
            .instrument(script_span("execute", seq))
            .await;

        match result {
            Ok(result) => {
                let did_truncate = result.did_truncate;
                self.state().data = result.tables;
                if did_truncate {
                    self.inner.notifier.notify(Notification::ResponseTruncated {
                        max_bytes: self.inner.executor.max_response_bytes(),
                    });
                }
            }
            Err(e) => {
                self.state().data.clear();
                self.inner.notifier.notify(Notification::TimeSeriesError {
                    message: e.diagnostic(),
                });
                tracing::error!(service = %service.name, error = %e, "could not get time series");
            }
        }

        self.parse(&script, false).await
    }
}
