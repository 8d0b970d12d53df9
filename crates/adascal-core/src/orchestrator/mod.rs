//! Run orchestrator.
//!
//! Enumerates manufacturers x models x tokens, skips combinations the
//! checkpoint already holds complete, drives navigation and extraction for
//! the rest and writes through the checkpoint store after every token.
//! A model whose recorded token list is entirely complete is skipped
//! without opening a page.
//!
//! Failures are contained at the smallest unit: a slot failure leaves that
//! slot for the next run, a token failure skips the token, a model failure
//! skips the model and a manufacturer failure never stops the run.

use std::sync::Arc;

use adascal_checkpoint::{CheckpointStore, ModelTokens, RunReport};
use adascal_config::{Catalogue, Config, ConfigError};
use adascal_protocols::{
    AdasResult, BrowserContext, BrowserProvider, Manufacturer, ManufacturerResults, PageDriver,
    ScrapeError, SlotValue, SystemSlot, TextRecognizer, YearOrChassisToken,
};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::automaton::{NavState, NavigationTrace, Navigator};
use crate::diagnostics::DebugCapture;
use crate::discovery::{discover_models, discover_systems, discover_tokens, map_systems};
use crate::extractor::CalibrationExtractor;
use crate::resolver::ElementResolver;

/// What one token produced: the result to merge plus the slots that failed.
struct TokenOutcome {
    result: AdasResult,
    failures: Vec<(SystemSlot, ScrapeError)>,
}

pub struct Orchestrator {
    config: Arc<Config>,
    browser: Arc<dyn BrowserProvider>,
    store: Arc<dyn CheckpointStore>,
    navigator: Navigator,
    extractor: CalibrationExtractor,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        config: Arc<Config>,
        browser: Arc<dyn BrowserProvider>,
        store: Arc<dyn CheckpointStore>,
        recognizer: Option<Arc<dyn TextRecognizer>>,
    ) -> Result<Self, ScrapeError> {
        let mut resolver = ElementResolver::from_config(&config);
        if config.run.capture_debug {
            resolver =
                resolver.with_debug_capture(Arc::new(DebugCapture::new(config.paths.debug_dir())));
        }
        let resolver = Arc::new(resolver);
        let navigator = Navigator::new(resolver.clone(), &config);
        let extractor = CalibrationExtractor::new(resolver, &config, recognizer)?;

        Ok(Self {
            config,
            browser,
            store,
            navigator,
            extractor,
            cancel: CancellationToken::new(),
        })
    }

    /// Stop the run between manufacturers once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the catalogue entries named in `names`, or all of them when
    /// `names` is empty. Unknown names and unloadable catalogue rows are
    /// reported as configuration errors.
    pub async fn run_selected(&self, catalogue: &Catalogue, names: &[String]) -> RunReport {
        let mut report = RunReport::new();
        for row in catalogue.skipped() {
            let name = row
                .name
                .clone()
                .unwrap_or_else(|| format!("row {}", row.index));
            report.failed(&name, None, None, "configuration_error", row.reason.clone());
        }

        let (selected, missing) = catalogue.select(names);
        for err in missing {
            let name = match &err {
                ConfigError::UnknownManufacturer(name) => name.clone(),
                other => other.to_string(),
            };
            warn!("Skipping {}: {}", name, err);
            report.failed(&name, None, None, "configuration_error", err.to_string());
        }

        self.run_with_report(selected, report).await
    }

    /// Process the given manufacturers. Always exports the combined result
    /// file and writes the run report, also when cancelled.
    pub async fn run(&self, manufacturers: Vec<Manufacturer>) -> RunReport {
        self.run_with_report(manufacturers, RunReport::new()).await
    }

    async fn run_with_report(&self, manufacturers: Vec<Manufacturer>, mut report: RunReport) -> RunReport {
        let limit = self.config.run.max_concurrent_manufacturers.max(1);
        info!(
            "Starting run {} over {} manufacturers ({} at a time)",
            report.run_id,
            manufacturers.len(),
            limit
        );

        let reports: Vec<RunReport> = stream::iter(manufacturers)
            .map(|manufacturer| async move { self.process_manufacturer(&manufacturer).await })
            .buffer_unordered(limit)
            .collect()
            .await;
        for manufacturer_report in reports {
            report.absorb(manufacturer_report);
        }

        if let Err(e) = self.store.export_combined().await {
            error!("Failed to export combined results: {}", e);
            report.failed("*", None, None, "persistence_failure", e.to_string());
        }

        report.finish(self.cancel.is_cancelled());
        let results_dir = self.config.paths.results_dir();
        if let Err(e) = report.write(&results_dir).await {
            error!("Failed to write run report to {}: {}", results_dir.display(), e);
        }
        report.log_summary();
        report
    }

    async fn process_manufacturer(&self, manufacturer: &Manufacturer) -> RunReport {
        let span = info_span!("manufacturer", name = %manufacturer.name);
        async {
            let mut report = RunReport::new();
            if self.cancel.is_cancelled() {
                info!("Run cancelled, not starting");
                return report;
            }

            let mut results = match self.store.load(&manufacturer.name).await {
                Ok(results) => results,
                Err(e) => {
                    error!("Cannot load checkpoint: {}", e);
                    report.failed(&manufacturer.name, None, None, "persistence_failure", e.to_string());
                    return report;
                }
            };
            let (total, complete) = results.counts();
            info!("Checkpoint holds {} combinations, {} complete", total, complete);
            let known = self.store.load_tokens(&manufacturer.name).await.unwrap_or_else(|e| {
                warn!("Cannot load recorded token lists: {}", e);
                ModelTokens::new()
            });

            let context = match self.browser.open_context(&manufacturer.name).await {
                Ok(context) => context,
                Err(e) => {
                    let e = ScrapeError::from(e);
                    error!("Cannot open browser context: {}", e);
                    report.failed(&manufacturer.name, None, None, e.kind(), e.to_string());
                    return report;
                }
            };

            if let Err(e) = self
                .process_models(manufacturer, context.as_ref(), &known, &mut results, &mut report)
                .await
            {
                error!("Manufacturer aborted: {}", e);
                report.failed(&manufacturer.name, None, None, e.kind(), e.to_string());
            }

            self.save(&manufacturer.name, &results, &mut report).await;
            if let Err(e) = context.close().await {
                warn!("Failed to close browser context: {}", e);
            }
            report
        }
        .instrument(span)
        .await
    }

    async fn process_models(
        &self,
        manufacturer: &Manufacturer,
        context: &dyn BrowserContext,
        known: &ModelTokens,
        results: &mut ManufacturerResults,
        report: &mut RunReport,
    ) -> Result<(), ScrapeError> {
        let page = context.new_page().await?;
        let models = discover_models(&self.navigator, page.as_ref(), manufacturer).await;
        close_page(page).await;
        let models = models?;
        if models.is_empty() {
            warn!("No models listed");
        }

        for model in &models {
            let finished = known
                .get(model)
                .filter(|listed| !listed.is_empty())
                .filter(|listed| listed.iter().all(|token| results.is_complete(model, token)));
            if let Some(listed) = finished {
                info!("{}: all {} recorded tokens complete", model, listed.len());
                for token in listed {
                    report.skipped(&manufacturer.name, model, token);
                }
                continue;
            }
            if let Err(e) = self
                .process_model(manufacturer, model, context, results, report)
                .await
            {
                warn!("Skipping model {}: {}", model, e);
                report.failed(&manufacturer.name, Some(model.as_str()), None, e.kind(), e.to_string());
            }
        }
        Ok(())
    }

    async fn process_model(
        &self,
        manufacturer: &Manufacturer,
        model: &str,
        context: &dyn BrowserContext,
        results: &mut ManufacturerResults,
        report: &mut RunReport,
    ) -> Result<(), ScrapeError> {
        let page = context.new_page().await?;
        let tokens = discover_tokens(&self.navigator, page.as_ref(), manufacturer, model).await;
        let model_page = if self.config.run.fresh_page_per_token {
            close_page(page).await;
            None
        } else {
            Some(page)
        };
        let tokens = tokens?;
        if tokens.is_empty() {
            return Err(ScrapeError::ExtractionFailure(
                "no acceptable year or chassis tokens".to_string(),
            ));
        }
        info!("{}: {} tokens", model, tokens.len());
        let listed: Vec<String> = tokens.iter().map(|t| t.raw.clone()).collect();
        if let Err(e) = self.store.save_tokens(&manufacturer.name, model, &listed).await {
            warn!("Failed to record token list for {}: {}", model, e);
        }

        for token in &tokens {
            if results.is_complete(model, &token.raw) {
                debug!("{} {} already complete", model, token);
                report.skipped(&manufacturer.name, model, &token.raw);
                continue;
            }

            let fresh = match &model_page {
                Some(_) => None,
                None => match context.new_page().await {
                    Ok(page) => Some(page),
                    Err(e) => {
                        report.failed(&manufacturer.name, Some(model), Some(token.raw.as_str()), "driver_error", e.to_string());
                        continue;
                    }
                },
            };
            let Some(page) = fresh.as_deref().or(model_page.as_deref()) else {
                continue;
            };

            let outcome = self.process_token(page, manufacturer, model, token).await;
            if let Some(page) = fresh {
                close_page(page).await;
            }

            match outcome {
                Ok(TokenOutcome { result, failures }) => {
                    for (slot, e) in failures {
                        report.failed(
                            &manufacturer.name,
                            Some(model),
                            Some(token.raw.as_str()),
                            e.kind(),
                            format!("{}: {}", slot, e),
                        );
                    }
                    results.record(model, &token.raw, &result);
                    if result.is_complete() {
                        report.completed(&manufacturer.name, model, &token.raw);
                    }
                    self.save(&manufacturer.name, results, report).await;
                }
                Err(e) => {
                    warn!("Skipping {} {}: {}", model, token, e);
                    report.failed(&manufacturer.name, Some(model), Some(token.raw.as_str()), e.kind(), e.to_string());
                }
            }
        }

        if let Some(page) = model_page {
            close_page(page).await;
        }
        Ok(())
    }

    async fn process_token(
        &self,
        page: &dyn PageDriver,
        manufacturer: &Manufacturer,
        model: &str,
        token: &YearOrChassisToken,
    ) -> Result<TokenOutcome, ScrapeError> {
        let mut trace = self
            .navigator
            .navigate_to_token(page, manufacturer, model, token)
            .await?;
        let available = discover_systems(&self.navigator, page).await?;
        let mapped = map_systems(manufacturer, &available);
        debug!("{} {}: systems {:?}, mapped {:?}", model, token, available, mapped);

        let mut outcome = TokenOutcome {
            result: AdasResult::new(),
            failures: Vec::new(),
        };
        for slot in SystemSlot::ALL {
            let Some(label) = mapped.get(&slot) else {
                outcome.result.set(slot, SlotValue::NotAvailable);
                continue;
            };
            match self.extract_slot(page, &mut trace, label).await {
                Ok(value) => {
                    outcome.result.set(slot, value);
                }
                Err(e @ ScrapeError::ExtractionFailure(_)) => {
                    outcome.result.set(slot, SlotValue::NotAvailable);
                    outcome.failures.push((slot, e));
                }
                Err(e) => outcome.failures.push((slot, e)),
            }
            if let Err(e) = self.navigator.dismiss(page).await {
                debug!("Dismiss failed: {}", e);
            }
        }

        trace.enter(NavState::Done);
        debug!("{} {}: {} transitions", model, token, trace.transitions.len());
        Ok(outcome)
    }

    async fn extract_slot(
        &self,
        page: &dyn PageDriver,
        trace: &mut NavigationTrace,
        label: &str,
    ) -> Result<SlotValue, ScrapeError> {
        self.navigator.select_system(page, trace, label).await?;
        let value = self.extractor.extract(page, label).await?;
        trace.enter(NavState::CalibrationTypeKnown);
        Ok(value)
    }

    async fn save(&self, manufacturer: &str, results: &ManufacturerResults, report: &mut RunReport) {
        if let Err(e) = self.store.save(manufacturer, results).await {
            error!("Checkpoint save failed: {}", e);
            report.failed(manufacturer, None, None, "persistence_failure", e.to_string());
        }
    }
}

async fn close_page(page: Box<dyn PageDriver>) {
    if let Err(e) = page.close().await {
        debug!("Failed to close page: {}", e);
    }
}
