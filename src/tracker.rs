//! The coordinating task.
//!
//! A single [`HitTracker`] owns the correlator and drains both observation channels, so
//! decode, `offer` and `resolve` never interleave. Only sink appends leave the task; they run
//! on a [`JoinSet`] and the first failure aborts the page.

use std::collections::BTreeSet;
use std::sync::Arc;

use hit_codec::{classify, decode_pairs, DecodeError, DecodedHit};
use hit_tap::{Correlator, ObservationStreams, ObservedRequest, ObservedResponse};
use hitaudit_core_types::{
    timestamp_now, CorrelatedHit, DecodedPairs, PendingEntry, RunMetadata, ValidationResult,
    EVENT_NAME_KEY,
};
use hitaudit_registry::{validate, SchemaRegistry};
use hitaudit_sink::{ColumnPlan, HeaderCache, Sink, SinkError};
use serde::Serialize;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::errors::TrackerError;
use crate::metrics::{self, HitOutcome};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Responses that matched a pending request.
    pub total_responses: usize,
    pub success_responses: usize,
    pub failed_responses: usize,
    pub emitted_rows: usize,
    /// URLs still pending at shutdown, oldest first.
    pub orphaned: Vec<String>,
    pub events_seen: BTreeSet<String>,
    pub hits_with_errors: usize,
    pub malformed_hits: usize,
}

impl RunSummary {
    pub fn log(&self) {
        info!(
            target: "tracker",
            total = self.total_responses,
            success = self.success_responses,
            failed = self.failed_responses,
            rows = self.emitted_rows,
            orphaned = self.orphaned.len(),
            with_errors = self.hits_with_errors,
            "Summary"
        );
    }
}

type AppendResult = Result<Result<(), SinkError>, JoinError>;

pub struct HitTracker {
    registry: Arc<SchemaRegistry>,
    sink: Arc<dyn Sink>,
    header: HeaderCache,
    run: RunMetadata,
    correlator: Correlator,
    summary: RunSummary,
}

impl HitTracker {
    /// Fetch the sink header once; a missing header is fatal.
    pub async fn initialize(
        registry: Arc<SchemaRegistry>,
        sink: Arc<dyn Sink>,
        tab: impl Into<String>,
    ) -> Result<Self, TrackerError> {
        let header = HeaderCache::new(tab);
        let plan = header.plan(sink.as_ref()).await?;
        info!(
            target: "tracker",
            tab = header.tab(),
            columns = plan.len(),
            tracked = registry.tracked_events.len(),
            "tracker initialized"
        );
        Ok(Self {
            registry,
            sink,
            header,
            run: RunMetadata::new(timestamp_now()),
            correlator: Correlator::new(),
            summary: RunSummary::default(),
        })
    }

    /// Metadata for the `page_num`-th page (1-based) of this run.
    pub fn page(&self, page_url: &str, page_num: u32) -> RunMetadata {
        self.run.for_page(page_url, page_num)
    }

    pub fn pending(&self) -> usize {
        self.correlator.len()
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Decode, filter and validate a request. Returns whether a pending entry was stored.
    pub fn on_request(&mut self, observed: ObservedRequest) -> bool {
        let pairs = match decode_pairs(&observed.url) {
            Ok(pairs) => pairs,
            Err(err) => return self.drop_malformed(err),
        };

        // off-list hits are skipped before their items are decoded
        if let Some(name) = wire_event_name(&pairs) {
            if !self.registry.is_tracked(name) {
                metrics::record_hit(HitOutcome::Untracked);
                debug!(target: "tracker", event = %name, "event not tracked");
                return false;
            }
        }

        let hit = match classify(pairs, &self.registry.field_maps) {
            Ok(hit) => hit,
            Err(err) => return self.drop_malformed(err),
        };

        let validation = validate(
            &hit.event_details,
            &hit.user_properties,
            &hit.items,
            &self.registry,
        );

        let Some(event_name) = hit.event_name().map(str::to_string) else {
            metrics::record_hit(HitOutcome::Unnamed);
            for message in &validation.errors {
                error!(target: "tracker", url = %observed.url, "{message}");
            }
            return false;
        };

        metrics::record_hit(HitOutcome::Tracked);
        log_hit(&event_name, &hit, &validation);
        self.summary.events_seen.insert(event_name.clone());
        if !validation.errors.is_empty() {
            self.summary.hits_with_errors += 1;
        }

        let entry = PendingEntry {
            url: observed.url.clone(),
            event_details: hit.event_details,
            user_properties: hit.user_properties,
            items: hit.items,
            validation,
            timestamp: observed.timestamp,
        };
        if self.correlator.offer(observed.url, entry).is_some() {
            warn!(
                target: "tracker",
                event = %event_name,
                "identical hit URL still pending; earlier entry replaced"
            );
        }
        true
    }

    fn drop_malformed(&mut self, err: DecodeError) -> bool {
        metrics::record_hit(HitOutcome::Malformed);
        self.summary.malformed_hits += 1;
        warn!(target: "tracker", %err, "dropping malformed hit");
        false
    }

    /// Pair a response with its pending request, if there is one.
    pub fn on_response(&mut self, observed: ObservedResponse) -> Option<CorrelatedHit> {
        let url = observed.url.clone();
        let Some(hit) = self.correlator.resolve(&url, observed.into_record()) else {
            debug!(target: "tracker", %url, "response without pending request");
            return None;
        };

        self.summary.total_responses += 1;
        if hit.response.is_success() {
            self.summary.success_responses += 1;
        } else {
            self.summary.failed_responses += 1;
        }
        info!(
            target: "tracker",
            event = hit.request.event_details.name().unwrap_or_default(),
            status = hit.response.status,
            "hit correlated"
        );
        Some(hit)
    }

    /// Process observations until `cancel` fires, then drain what is already queued and wait
    /// for outstanding appends. Returns the number of rows written for this page.
    pub async fn track_page(
        &mut self,
        streams: &mut ObservationStreams,
        page: &RunMetadata,
        cancel: &CancellationToken,
    ) -> Result<usize, TrackerError> {
        let plan = self.header.plan(self.sink.as_ref()).await?;
        let rows_before = self.summary.emitted_rows;
        let mut appends: JoinSet<Result<(), SinkError>> = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                Some(done) = appends.join_next() => self.settle(done)?,
                Some(request) = streams.requests.recv() => {
                    self.on_request(request);
                }
                Some(response) = streams.responses.recv() => {
                    if let Some(hit) = self.on_response(response) {
                        self.spawn_append(&mut appends, &plan, &hit, page);
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }

        while let Ok(request) = streams.requests.try_recv() {
            self.on_request(request);
        }
        while let Ok(response) = streams.responses.try_recv() {
            if let Some(hit) = self.on_response(response) {
                self.spawn_append(&mut appends, &plan, &hit, page);
            }
        }
        while let Some(done) = appends.join_next().await {
            self.settle(done)?;
        }

        let rows = self.summary.emitted_rows - rows_before;
        info!(
            target: "tracker",
            page_num = page.page_num,
            rows,
            pending = self.correlator.len(),
            "page finished"
        );
        Ok(rows)
    }

    fn spawn_append(
        &self,
        appends: &mut JoinSet<Result<(), SinkError>>,
        plan: &ColumnPlan,
        hit: &CorrelatedHit,
        page: &RunMetadata,
    ) {
        let row = plan.project(hit, page);
        let sink = self.sink.clone();
        let tab = self.header.tab().to_string();
        appends.spawn(async move { sink.append_row(&tab, &row).await });
    }

    fn settle(&mut self, done: AppendResult) -> Result<(), TrackerError> {
        match done {
            Ok(Ok(())) => {
                metrics::record_append(true);
                self.summary.emitted_rows += 1;
                Ok(())
            }
            Ok(Err(err)) => {
                metrics::record_append(false);
                error!(target: "tracker", %err, "row append failed");
                Err(err.into())
            }
            Err(err) => Err(TrackerError::AppendTask(err.to_string())),
        }
    }

    /// End the run: report every request that never got a response.
    pub fn finish(mut self) -> RunSummary {
        let orphaned = self.correlator.drain_unmatched();
        for url in &orphaned {
            warn!(target: "tracker", %url, "Request without response");
        }
        self.summary.orphaned = orphaned;
        self.summary
    }
}

fn log_hit(event_name: &str, hit: &DecodedHit, validation: &ValidationResult) {
    info!(
        target: "tracker",
        event = %event_name,
        params = hit.event_details.params.len(),
        items = hit.items.len(),
        "tracked hit"
    );
    debug!(
        target: "tracker",
        user_properties = ?hit.user_properties,
        custom_user_properties = ?hit.custom_user_properties,
        event_details = ?hit.event_details.params,
        "hit contents"
    );
    for (index, item) in hit.items.iter().enumerate() {
        debug!(target: "tracker", item = index + 1, params = ?item.params, custom = ?item.custom, "item");
    }
    for warning in &validation.warnings {
        warn!(target: "tracker", event = %event_name, "{warning}");
    }
    for message in &validation.errors {
        error!(target: "tracker", event = %event_name, "{message}");
    }
}

/// The last non-empty `en` value, matching how the decoder fills the event name.
fn wire_event_name(pairs: &DecodedPairs) -> Option<&str> {
    pairs
        .iter()
        .rev()
        .find(|(key, _)| key == EVENT_NAME_KEY)
        .map(|(_, value)| value.as_str())
        .filter(|value| !value.is_empty())
}
