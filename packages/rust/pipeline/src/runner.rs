//! End-to-end discovery run: seed queries → harvest → extract → score →
//! dedupe → enrich → output → ledger.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use url::Url;

use orgscout_connectors::{
    EnrichProvider, FetchDecision, FetchProvider, LedgerStore, LlmAssist, LlmExtract,
    MeteredEnrich, SearchHit, SearchProvider, WebGateway, region_from_country,
};
use orgscout_extract::{
    classify_region, clip, detect_red_flags, detect_signals, extract_healthcare_entities,
    is_article_title, org_name_from_title,
};
use orgscout_runtime::{Budget, BudgetKind, CacheStack, CheckpointRecord, CheckpointStore};
use orgscout_scoring::{Detection, score, table_for};
use orgscout_shared::{LedgerEntry, OrgScoutError, Result, Segment, StageError};

use crate::allocate::RegionMix;
use crate::dedupe::{Deduper, normalize_org_name};
use crate::output;
use crate::queries::{self, RESULTS_PER_QUERY};
use crate::state::{CancelFlag, Candidate, RunConfig, RunResult, RunState, RunStatus};

/// Page text kept per candidate; enough for every extractor.
const PAGE_TEXT_CLIP: usize = 20_000;

/// Harvest collects up to this many times the target before fetching.
const HARVEST_FACTOR: usize = 3;

/// The error-rate check stays quiet until this many external attempts.
const MIN_ATTEMPTS_FOR_TOLERANCE: usize = 4;

/// Progress callback for reporting run status.
pub trait RunProgress: Send + Sync {
    /// Called when entering a new stage.
    fn stage(&self, name: &str);
    /// Called as items move through a stage.
    fn item(&self, label: &str, current: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, result: &RunResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl RunProgress for SilentProgress {
    fn stage(&self, _name: &str) {}
    fn item(&self, _label: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &RunResult) {}
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// One discovery run over injected providers. All external traffic goes
/// through the metered wrappers, so every stage observes the same budget
/// and cache.
pub struct Runner<S, F, E, M, L> {
    config: RunConfig,
    budget: Arc<Budget>,
    cache: Arc<CacheStack>,
    gateway: WebGateway<S, F>,
    enrich: MeteredEnrich<E>,
    llm: LlmAssist<M>,
    ledger: L,
    checkpoints: CheckpointStore,
    cancel: CancelFlag,
}

impl<S, F, E, M, L> Runner<S, F, E, M, L>
where
    S: SearchProvider,
    F: FetchProvider,
    E: EnrichProvider,
    M: LlmExtract,
    L: LedgerStore,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: RunConfig,
        budget: Arc<Budget>,
        cache: Arc<CacheStack>,
        gateway: WebGateway<S, F>,
        enrich: MeteredEnrich<E>,
        llm: LlmAssist<M>,
        ledger: L,
        checkpoints: CheckpointStore,
    ) -> Self {
        Self {
            config,
            budget,
            cache,
            gateway,
            enrich,
            llm,
            ledger,
            checkpoints,
            cancel: CancelFlag::new(),
        }
    }

    /// Handle for requesting cancellation from another task (e.g. a
    /// ctrl-c handler). The run stops at the next stage boundary.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run a fresh discovery pass.
    #[instrument(skip_all, fields(run_id = %self.config.run_id.short(), segment = %self.config.segment))]
    pub async fn run(&self, progress: &dyn RunProgress) -> Result<RunResult> {
        self.config.validate()?;
        self.drive(RunState::fresh(), progress).await
    }

    /// Resume an interrupted run from its newest checkpoint. Organizations
    /// the earlier attempt already processed are dropped at dedupe, so
    /// only the remainder is re-enriched. A complete checkpoint is a
    /// no-op: the result carries the checkpoint's final budget counters
    /// and recorded errors but no rows, since the original run already
    /// wrote its artifacts (see `runs/latest/`).
    #[instrument(skip_all, fields(run_id = %self.config.run_id.short(), segment = %self.config.segment))]
    pub async fn resume(&self, progress: &dyn RunProgress) -> Result<RunResult> {
        self.config.validate()?;
        let Some(record) = self.checkpoints.latest_for_run(&self.config.run_id)? else {
            return Err(OrgScoutError::validation(format!(
                "no checkpoint found for run {}",
                self.config.run_id
            )));
        };

        if record.is_complete() {
            info!(batch = record.batch_index, "checkpoint already complete, nothing to resume");
            let result = RunResult {
                run_id: self.config.run_id.clone(),
                status: RunStatus::Completed,
                rows: Vec::new(),
                achieved_mix: RegionMix::default(),
                budget: record.budget,
                errors: record.errors,
                artifacts_dir: None,
                elapsed: std::time::Duration::ZERO,
            };
            progress.done(&result);
            return Ok(result);
        }

        info!(
            batch = record.batch_index,
            processed = record.processed,
            total = record.total,
            "resuming from checkpoint"
        );
        self.drive(RunState::from_checkpoint(&record), progress).await
    }

    async fn drive(&self, mut state: RunState, progress: &dyn RunProgress) -> Result<RunResult> {
        let start = Instant::now();
        let segment = self.config.segment;

        info!(
            target = self.config.target_count,
            region = %self.config.region,
            "starting discovery run"
        );

        // --- Stage 1: Harvest (search + fetch) ---
        self.harvest(&mut state, progress).await;
        if self.cancel.is_cancelled() {
            return Ok(self.abort(&mut state, start, progress));
        }

        // --- Stage 2: Extract ---
        self.extract_stage(&mut state, progress).await;
        if self.cancel.is_cancelled() {
            return Ok(self.abort(&mut state, start, progress));
        }

        // --- Stage 3: Score ---
        progress.stage("Scoring candidates");
        {
            let RunState {
                candidates, errors, ..
            } = &mut state;
            for candidate in candidates.iter_mut() {
                match score(segment, &candidate.evidence) {
                    Ok(outcome) => candidate.outcome = Some(outcome),
                    Err(e) => errors.push(StageError::new("score", e.to_string())),
                }
            }
        }
        let rejected = state.candidates.iter().filter(|c| !c.in_play()).count();
        debug!(scored = state.candidates.len(), rejected, "scoring complete");

        // --- Stage 4: Dedupe against the ledger ---
        progress.stage("Deduplicating against the ledger");
        let known = match self.ledger.load(segment).await {
            Ok(entries) => entries.into_iter().map(|e| e.organization).collect(),
            Err(e) => {
                warn!(error = %e, "ledger load failed, deduping within the run only");
                state.errors.push(StageError::new("ledger", e.to_string()));
                Vec::new()
            }
        };
        let mut deduper =
            Deduper::new(known).with_seen(state.prior_orgs.iter().cloned());
        let before = state.candidates.len();
        state.candidates.retain(|c| {
            let admitted = deduper.admit(&c.name);
            if !admitted {
                debug!(org = %c.name, "dropped as duplicate or already in the ledger");
            }
            admitted
        });
        info!(kept = state.candidates.len(), dropped = before - state.candidates.len(), "dedupe complete");
        if self.cancel.is_cancelled() {
            return Ok(self.abort(&mut state, start, progress));
        }

        // --- Stage 5: Enrich ---
        if state.short_circuited {
            info!("skipping enrichment after error-rate breach");
        } else {
            self.enrich_stage(&mut state, progress).await;
            if self.cancel.is_cancelled() {
                return Ok(self.abort(&mut state, start, progress));
            }
        }

        // --- Stage 6: Output artifacts ---
        let (rows, mix, artifacts_dir) = self.output_stage(&mut state, progress);

        // --- Stage 7: Ledger upsert ---
        if rows.is_empty() {
            debug!("no rows to upsert");
        } else {
            progress.stage("Updating the ledger");
            let now = Utc::now();
            let entries: Vec<LedgerEntry> = rows
                .iter()
                .map(|row| LedgerEntry {
                    organization: row.organization.clone(),
                    segment,
                    region: row.region.map(|r| r.label().to_string()).unwrap_or_default(),
                    status: row.tier.as_str().to_string(),
                    score: row.score,
                    first_added: now,
                    last_validated: now,
                    evidence_url: row.evidence_url.clone(),
                    notes: row.notes.clone(),
                })
                .collect();
            match self.ledger.upsert(&entries).await {
                Ok(outcome) => {
                    info!(added = outcome.added, updated = outcome.updated, "ledger upserted")
                }
                Err(e) => {
                    warn!(error = %e, "ledger upsert failed");
                    state.errors.push(StageError::new("ledger", e.to_string()));
                }
            }
        }

        let status = if state.short_circuited || state.budget_hit {
            RunStatus::PartiallyCompleted
        } else {
            RunStatus::Completed
        };

        let result = RunResult {
            run_id: self.config.run_id.clone(),
            status,
            rows,
            achieved_mix: mix,
            budget: self.budget.snapshot(),
            errors: std::mem::take(&mut state.errors),
            artifacts_dir,
            elapsed: start.elapsed(),
        };
        progress.done(&result);

        info!(
            status = %result.status,
            rows = result.rows.len(),
            na = result.achieved_mix.na,
            emea = result.achieved_mix.emea,
            elapsed_ms = result.elapsed.as_millis(),
            "discovery run complete"
        );
        Ok(result)
    }

    /// Search the seed queries, triage titles, and fetch the survivors.
    async fn harvest(&self, state: &mut RunState, progress: &dyn RunProgress) {
        let segment = self.config.segment;
        progress.stage("Searching and harvesting pages");

        state.queries = queries::seed_queries(segment)
            .iter()
            .map(|q| q.to_string())
            .collect();

        let cap = self.config.target_count * HARVEST_FACTOR;
        let mut attempts = 0usize;
        let mut failures = 0usize;
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut hits: Vec<SearchHit> = Vec::new();

        for query in &state.queries {
            if self.cancel.is_cancelled() || hits.len() >= cap {
                break;
            }
            match self.gateway.search(query, RESULTS_PER_QUERY, None).await {
                Ok(Some(results)) => {
                    attempts += 1;
                    for hit in results {
                        if seen_urls.insert(hit.url.clone()) {
                            hits.push(hit);
                        }
                    }
                }
                Ok(None) => {
                    info!("search budget exhausted");
                    state.budget_hit = true;
                    break;
                }
                Err(e) => {
                    attempts += 1;
                    failures += 1;
                    warn!(query = %query, error = %e, "search failed");
                    state.errors.push(StageError::new("search", e.to_string()));
                }
            }
        }
        hits.truncate(cap);

        // Title triage before any fetch: article-style listings are
        // dropped and the organization name must be derivable.
        let mut planned: Vec<(String, SearchHit)> = Vec::new();
        for hit in hits {
            if is_article_title(&hit.title) {
                debug!(title = %hit.title, "dropped article-style result");
                continue;
            }
            let Some(name) = org_name_from_title(&hit.title) else {
                debug!(title = %hit.title, "no organization name in title");
                continue;
            };
            planned.push((name, hit));
        }

        if !self.cancel.is_cancelled() && !planned.is_empty() {
            let total = planned.len();
            let semaphore = Arc::new(Semaphore::new(self.config.concurrency as usize));
            let outcomes = join_all(planned.iter().map(|(_, hit)| {
                let semaphore = Arc::clone(&semaphore);
                async move {
                    let _permit = semaphore.acquire().await.expect("semaphore closed");
                    self.gateway.fetch(&hit.url).await
                }
            }))
            .await;

            for (i, ((name, hit), outcome)) in planned.into_iter().zip(outcomes).enumerate() {
                progress.item(&hit.url, i + 1, total);
                match outcome {
                    Ok(FetchDecision::Fetched(page)) => {
                        attempts += 1;
                        let text = clip(&page.extracted_text, PAGE_TEXT_CLIP).to_string();
                        state
                            .candidates
                            .push(Candidate::new(segment, name, hit.title, hit.url, text));
                    }
                    Ok(FetchDecision::BudgetExhausted) => {
                        info!("fetch budget exhausted");
                        state.budget_hit = true;
                        break;
                    }
                    Ok(FetchDecision::DomainCapped(domain)) => {
                        debug!(%domain, "domain capped, skipping");
                    }
                    Ok(FetchDecision::NotAllowed(domain)) => {
                        debug!(%domain, "domain not allowed, skipping");
                    }
                    Err(e) => {
                        attempts += 1;
                        failures += 1;
                        warn!(url = %hit.url, error = %e, "fetch failed, skipping");
                        state.errors.push(StageError::new("fetch", e.to_string()));
                    }
                }
            }
        }

        if attempts >= MIN_ATTEMPTS_FOR_TOLERANCE
            && failures as f64 / attempts as f64 >= self.config.error_tolerance
        {
            warn!(attempts, failures, "error rate over tolerance, short-circuiting to output");
            state.short_circuited = true;
        }
        info!(candidates = state.candidates.len(), attempts, failures, "harvest complete");
    }

    /// Canonicalize names, detect signals and red flags, classify
    /// regions, and pull segment entities out of the page text.
    async fn extract_stage(&self, state: &mut RunState, progress: &dyn RunProgress) {
        let segment = self.config.segment;
        progress.stage("Extracting signals");

        let RunState {
            candidates, errors, ..
        } = state;
        for candidate in candidates.iter_mut() {
            // Optional assist; it gates itself on the token budget.
            if let Some(name) = self
                .llm
                .canonicalize_org_name(&candidate.title, &candidate.url, segment)
                .await
            {
                candidate.name = name;
            }

            for flag in detect_red_flags(segment, &candidate.page_text) {
                candidate.evidence.add_red_flag(flag);
            }
            for signal in detect_signals(segment, &candidate.page_text, &candidate.url) {
                let detection = Detection {
                    snippet: signal.snippet,
                    source_url: candidate.url.clone(),
                };
                if let Err(e) = candidate.evidence.record(signal.name, detection) {
                    errors.push(StageError::new("extract", e.to_string()));
                }
            }

            candidate.region = classify_region(&candidate.page_text, &candidate.url);
            if segment == Segment::Healthcare {
                candidate.entities = Some(extract_healthcare_entities(&candidate.page_text));
            }
        }
        debug!(candidates = state.candidates.len(), "extraction complete");
    }

    /// Enrich surviving candidates in bounded chunks, checkpointing as
    /// batches complete. Firmographics can settle an unknown region and
    /// add the large-scale signal, which re-scores the candidate.
    async fn enrich_stage(&self, state: &mut RunState, progress: &dyn RunProgress) {
        let segment = self.config.segment;
        progress.stage("Enriching survivors");

        let survivors: Vec<usize> = state
            .candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.in_play())
            .map(|(i, _)| i)
            .collect();
        let total = survivors.len();
        let mut interrupted = false;

        for chunk in survivors.chunks(self.config.concurrency as usize) {
            if self.cancel.is_cancelled() {
                interrupted = true;
                break;
            }
            if self.budget.exhausted(BudgetKind::Enrich) {
                info!("enrichment budget exhausted with candidates remaining");
                state.budget_hit = true;
                interrupted = true;
                break;
            }

            let outcomes = join_all(chunk.iter().map(|&i| {
                let candidate = &state.candidates[i];
                let domain = Url::parse(&candidate.url)
                    .ok()
                    .and_then(|u| u.host_str().map(str::to_string));
                async move { self.enrich.enrich(&candidate.name, domain.as_deref()).await }
            }))
            .await;

            {
                let RunState {
                    candidates, errors, ..
                } = &mut *state;
                for (&i, outcome) in chunk.iter().zip(outcomes) {
                    let candidate = &mut candidates[i];
                    match outcome {
                        Ok(Some(firmographics)) => {
                            if candidate.region.is_none() {
                                if let Some(country) = firmographics.country.as_deref() {
                                    candidate.region = region_from_country(country);
                                }
                            }
                            let scale_scored =
                                table_for(segment).iter().any(|s| s.name == "large_scale");
                            if firmographics.is_large_scale()
                                && scale_scored
                                && !candidate.evidence.present("large_scale")
                            {
                                let detection = Detection {
                                    snippet: firmographics
                                        .employee_range
                                        .clone()
                                        .unwrap_or_default(),
                                    source_url: candidate.url.clone(),
                                };
                                if let Err(e) =
                                    candidate.evidence.record("large_scale", detection)
                                {
                                    errors.push(StageError::new("enrich", e.to_string()));
                                }
                                match score(segment, &candidate.evidence) {
                                    Ok(outcome) => candidate.outcome = Some(outcome),
                                    Err(e) => {
                                        errors.push(StageError::new("enrich", e.to_string()))
                                    }
                                }
                            }
                            candidate.firmographics = Some(firmographics);
                        }
                        Ok(None) => debug!(org = %candidate.name, "no firmographic match"),
                        Err(e) => {
                            warn!(org = %candidate.name, error = %e, "enrichment failed");
                            errors.push(StageError::new("enrich", e.to_string()));
                        }
                    }
                }
            }

            state
                .processed_orgs
                .extend(chunk.iter().map(|&i| normalize_org_name(&state.candidates[i].name)));
            state.processed += chunk.len();
            state.batch_index += 1;
            progress.item("enriched", state.processed, total);

            if state.batch_index % self.config.checkpoint_interval == 0 {
                self.write_checkpoint(state, total);
            }
        }

        // The closing record marks the stage complete; interrupted runs
        // keep their last incomplete record so resume has work left.
        if !interrupted {
            self.write_checkpoint(state, total);
        }
        info!(enriched = state.processed, total, "enrichment complete");
    }

    fn write_checkpoint(&self, state: &RunState, total: usize) {
        let record = CheckpointRecord {
            run_id: self.config.run_id.clone(),
            segment: self.config.segment,
            batch_index: state.batch_index,
            processed: state.processed,
            total,
            budget: self.budget.snapshot(),
            seen_orgs: state.seen_for_checkpoint(),
            errors: state.errors.clone(),
            created_at: Utc::now(),
        };
        match self.checkpoints.write(&record) {
            Ok(path) => debug!(path = %path.display(), "checkpoint written"),
            Err(e) => warn!(error = %e, "checkpoint write failed"),
        }
    }

    /// Select reportable rows under the regional quotas and write the
    /// run directory. Row-level schema violations land in `state.errors`.
    fn output_stage(
        &self,
        state: &mut RunState,
        progress: &dyn RunProgress,
    ) -> (Vec<output::OutputRow>, RegionMix, Option<PathBuf>) {
        progress.stage("Writing output artifacts");
        let emitted = output::emit_rows(
            &state.candidates,
            self.config.region,
            self.config.target_count,
            self.config.region_ratio,
        );
        state.errors.extend(emitted.errors);
        let artifacts_dir = match output::write_run_artifacts(
            &self.config.output_dir,
            &self.config.run_id,
            self.config.segment,
            &emitted.rows,
            emitted.mix,
            &self.budget.snapshot(),
            &self.cache.stats(),
        ) {
            Ok(dir) => Some(dir),
            Err(e) => {
                warn!(error = %e, "artifact write failed");
                state.errors.push(StageError::new("output", e.to_string()));
                None
            }
        };
        (emitted.rows, emitted.mix, artifacts_dir)
    }

    /// Stop the run where it stands: record a resumable checkpoint, then
    /// go straight to output with whatever candidates exist. The ledger
    /// is left untouched so a resumed attempt still owns the names.
    fn abort(&self, state: &mut RunState, start: Instant, progress: &dyn RunProgress) -> RunResult {
        let in_play = state.candidates.iter().filter(|c| c.in_play()).count();
        let total = if in_play == 0 && state.processed == 0 {
            self.config.target_count
        } else {
            in_play.max(state.processed)
        };
        self.write_checkpoint(state, total);

        let (rows, mix, artifacts_dir) = self.output_stage(state, progress);
        let result = RunResult {
            run_id: self.config.run_id.clone(),
            status: RunStatus::Aborted,
            rows,
            achieved_mix: mix,
            budget: self.budget.snapshot(),
            errors: state.errors.clone(),
            artifacts_dir,
            elapsed: start.elapsed(),
        };
        progress.done(&result);
        warn!(
            rows = result.rows.len(),
            elapsed_ms = result.elapsed.as_millis(),
            "run cancelled"
        );
        result
    }
}
