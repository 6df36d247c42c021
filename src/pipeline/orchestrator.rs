use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::agents::{AnalysisContext, GitHubAnalyzer, GitHubClient, GitLabAnalyzer, SourcewareAnalyzer};
use crate::analysis::{ConsensusEngine, ConsensusStore};
use crate::config::{Credentials, RunConfig};
use crate::discovery::debian::DebianTrackerSource;
use crate::discovery::nvd_page::NvdPageSource;
use crate::discovery::osv::OsvSource;
use crate::discovery::websearch::WebSearchSource;
use crate::discovery::{LinkDiscovery, LinkEntry, LinkProvider, LinkSource, UrlBucket, UrlClassifier, DISPATCH_ORDER};
use crate::errors::{RetryConfig, RootCauseError};
use crate::http::HttpFetch;
use crate::llm::{self, LLMProvider};
use crate::models::CveTask;
use crate::nvd::{DescriptionCache, NvdClient};
use crate::processors::{
    BitbucketProcessor, CommitProcessor, IssuesProcessor, PatchProcessor, PullProcessor, UrlProcessor,
};
use crate::utils::formatting::format_duration;
use super::metrics::compute_summary;
use super::state::{BucketMetrics, RunState, RunStatus, RunSummary};

/// External collaborators of one run.
pub struct Services {
    pub http: Arc<dyn HttpFetch>,
    pub analyst: Arc<dyn LLMProvider>,
    pub reducer: Arc<dyn LLMProvider>,
    /// Search-capable chat model behind the web-search discovery source.
    pub web_search: Option<Arc<dyn LLMProvider>>,
    /// Grounded search model used to resolve release tags.
    pub grounded_search: Option<Arc<dyn LLMProvider>>,
    pub nvd: Arc<NvdClient>,
}

impl Services {
    /// Production wiring. Fails only when no analysis model can be reached.
    pub fn connect(config: &RunConfig, credentials: &Credentials, http: Arc<dyn HttpFetch>) -> Result<Self, RootCauseError> {
        let nvd = Arc::new(NvdClient::new(http.clone(), credentials.nvd_api_key.clone()));

        let key = credentials
            .openrouter_api_key
            .clone()
            .ok_or_else(|| RootCauseError::Config("OPEN_ROUTER_API_KEY is not set".into()))?;
        let base_url = Some(config.llm.base_url.as_str());

        let analyst = llm::create_provider("openrouter", &key, &config.llm.analysis_model, base_url)?;
        let reducer = llm::create_provider("openrouter", &key, &config.llm.consensus_model, base_url)?;
        let web_search = Some(llm::create_provider("openrouter", &key, &config.llm.search_model, base_url)?);

        let grounded_search = match &credentials.gemini_api_key {
            Some(gemini_key) => Some(llm::create_provider(
                "gemini",
                gemini_key,
                &config.llm.grounded_search_model,
                None,
            )?),
            None => {
                warn!("GEMINI_API_KEY not set, advisory and tag URLs will not be resolved");
                None
            }
        };

        Ok(Self { http, analyst, reducer, web_search, grounded_search, nvd })
    }
}

/// Drives one CVE task: discovery, classification, then every bucket in
/// dispatch order.
pub struct PipelineOrchestrator {
    discovery: LinkDiscovery,
    classifier: UrlClassifier,
    processors: HashMap<UrlBucket, Arc<dyn UrlProcessor>>,
    store: Arc<ConsensusStore>,
}

impl PipelineOrchestrator {
    pub fn new(config: &RunConfig, credentials: &Credentials, services: Services, store: Arc<ConsensusStore>) -> Self {
        let http = services.http.clone();

        let mut providers: Vec<Arc<dyn LinkProvider>> = Vec::new();
        let sources = &config.discovery;
        if sources.enabled("nvd") {
            providers.push(Arc::new(NvdPageSource::new(http.clone())));
        }
        if sources.enabled("osv") {
            providers.push(Arc::new(OsvSource::new(http.clone())));
        }
        if sources.enabled("debian") {
            providers.push(Arc::new(DebianTrackerSource::new(http.clone())));
        }
        if sources.enabled("websearch") {
            match &services.web_search {
                Some(search) => providers.push(Arc::new(WebSearchSource::new(search.clone()))),
                None => warn!("Web search model not configured, skipping web search source"),
            }
        }

        let engine = ConsensusEngine::new(services.analyst.clone(), services.reducer.clone(), config.llm.analysis_runs)
            .with_retry(RetryConfig::new(config.llm.max_retries));
        let ctx = Arc::new(
            AnalysisContext::new(engine, store.clone(), DescriptionCache::new(services.nvd.clone()))
                .with_max_workers(config.analysis.max_workers),
        );

        let github = Arc::new(GitHubClient::new(http.clone(), credentials.github_token.clone()));
        let github_analyzer = Arc::new(GitHubAnalyzer::new(github.clone(), ctx.clone()));
        let gitlab_analyzer = Arc::new(GitLabAnalyzer::new(http.clone(), credentials.gitlab_token.clone(), ctx.clone()));
        let sourceware_analyzer = Arc::new(SourcewareAnalyzer::new(http, ctx));

        let mut processors: HashMap<UrlBucket, Arc<dyn UrlProcessor>> = HashMap::new();
        processors.insert(UrlBucket::Bitbucket, Arc::new(BitbucketProcessor::new(github_analyzer.clone())));
        processors.insert(UrlBucket::Sourceware, Arc::new(CommitProcessor::new(sourceware_analyzer)));
        processors.insert(UrlBucket::Gitlab, Arc::new(CommitProcessor::new(gitlab_analyzer)));
        processors.insert(UrlBucket::Commit, Arc::new(CommitProcessor::new(github_analyzer.clone())));
        processors.insert(UrlBucket::Pull, Arc::new(PullProcessor::new(github.clone(), github_analyzer.clone())));
        processors.insert(UrlBucket::Issues, Arc::new(IssuesProcessor::new(github.clone(), github_analyzer.clone())));
        processors.insert(
            UrlBucket::Patch,
            Arc::new(PatchProcessor::new(services.grounded_search.clone(), github, github_analyzer)),
        );

        Self {
            discovery: LinkDiscovery::new(providers),
            classifier: UrlClassifier::new(config.discovery.exclude_hosts.clone()),
            processors,
            store,
        }
    }

    pub fn store(&self) -> &Arc<ConsensusStore> {
        &self.store
    }

    /// Run the task to completion. Failures are logged and reflected in the
    /// summary; whatever was stored before a failure is kept.
    pub async fn run(&self, task: &CveTask) -> RunSummary {
        let started = Instant::now();
        let cve_id = task.cve_id.clone().unwrap_or_default();
        let mut state = RunState::new(&cve_id);

        info!(
            run_id = %state.run_id,
            cve_id = %cve_id,
            package_name = ?task.package_url,
            repo_url = ?task.repo_url,
            ecosystem = ?task.ecosystem,
            "Processing root cause"
        );

        match self.process(task, &mut state).await {
            Ok(()) => state.status = RunStatus::Completed,
            Err(e) => {
                error!(
                    cve_id = %cve_id,
                    repo_url = ?task.repo_url,
                    error = %e,
                    error_type = e.classify().error_type,
                    "Pipeline failed"
                );
                state.status = RunStatus::Failed;
                state.error = Some(e.to_string());
            }
        }

        let summary = compute_summary(&state, self.store.len().await, started.elapsed().as_millis() as u64);
        info!(
            run_id = %summary.run_id,
            cve_id = %summary.cve_id,
            discovered_urls = summary.discovered_urls,
            buckets = ?summary.bucket_counts,
            processed_urls = summary.processed_urls,
            failed_urls = summary.failed_urls,
            records = summary.records,
            elapsed = %format_duration(summary.total_duration_ms),
            failed = summary.failed,
            "Run summary"
        );
        summary
    }

    async fn process(&self, task: &CveTask, state: &mut RunState) -> Result<(), RootCauseError> {
        let cve_id = task
            .cve_id
            .as_deref()
            .ok_or_else(|| RootCauseError::InvalidInput("no CVE id in input".into()))?;

        let mut links = self.discovery.discover(cve_id, task.ecosystem.as_deref()).await;
        if let Some(repo) = task.repo_url.as_deref() {
            if !links.iter().any(|l| l.url == repo) {
                links.push(LinkEntry::new(repo, LinkSource::ManualInput));
            }
        }

        let url_to_source: HashMap<&str, LinkSource> = links.iter().map(|l| (l.url.as_str(), l.source)).collect();
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        info!(cve_id, urls = ?urls, "All URLs with source tracking");

        let buckets = self.classifier.classify(&urls);
        state.discovered_urls = urls.len();
        state.bucket_counts = buckets.counts().into_iter().map(|(k, v)| (k.to_string(), v)).collect();

        for bucket in DISPATCH_ORDER {
            let bucket_urls = buckets.get(bucket);
            if bucket_urls.is_empty() {
                continue;
            }
            let Some(processor) = self.processors.get(&bucket) else {
                continue;
            };

            info!(cve_id, bucket = %bucket, count = bucket_urls.len(), "Processing {} URLs", bucket);
            let bucket_started = Instant::now();
            let mut metrics = BucketMetrics { bucket: bucket.to_string(), urls: bucket_urls.len(), ..Default::default() };

            for url in bucket_urls {
                let source = source_label(url_to_source.get(url.as_str()).copied(), bucket);
                match processor.process(url, cve_id, source).await {
                    Ok(records) => {
                        metrics.processed += 1;
                        metrics.records += records.len();
                    }
                    Err(e) => {
                        metrics.failed += 1;
                        error!(
                            cve_id,
                            bucket = %bucket,
                            url = %url,
                            source,
                            error = %e,
                            error_type = e.classify().error_type,
                            "Processor failed"
                        );
                    }
                }
            }

            metrics.duration_ms = bucket_started.elapsed().as_millis() as u64;
            state.buckets.push(metrics);
        }

        Ok(())
    }
}

/// Provenance label for a URL; buckets without a discovered source fall
/// back to their platform name.
pub fn source_label(source: Option<LinkSource>, bucket: UrlBucket) -> &'static str {
    match (source, bucket) {
        (Some(source), _) => source.label(),
        (None, UrlBucket::Sourceware) => "sourceware",
        (None, UrlBucket::Gitlab) => "gitlab",
        (None, _) => "Unknown",
    }
}
