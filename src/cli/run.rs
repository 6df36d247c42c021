use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::analysis::ConsensusStore;
use crate::cli::commands::Cli;
use crate::config::{parse_config, Credentials, RunConfig};
use crate::errors::RootCauseError;
use crate::http::{HttpFetch, ReqwestFetcher};
use crate::models::load_task;
use crate::nvd::NvdClient;
use crate::pipeline::{assemble_document, write_document, PipelineOrchestrator, RunSummary, Services};

/// Load everything the run needs, run the pipeline, then always write the
/// output document. Only unreadable input or configuration is fatal.
pub async fn handle_run(cli: Cli) -> Result<Option<RunSummary>, RootCauseError> {
    let task = load_task(&cli.input).map_err(|e| {
        error!(path = %cli.input.display(), error = %e, "Failed to load input");
        e
    })?;

    let mut config = match &cli.config {
        Some(path) => parse_config(path).await?,
        None => RunConfig::default(),
    };
    if let Some(store) = &cli.store {
        config.analysis.store_path = store.clone();
    }

    let credentials = Credentials::resolve(&config.credentials);

    let store = Arc::new(open_store(&config.analysis.store_path).await);

    let (summary, nvd) = match ReqwestFetcher::new() {
        Ok(fetcher) => {
            let http: Arc<dyn HttpFetch> = Arc::new(fetcher);
            let nvd = NvdClient::new(http.clone(), credentials.nvd_api_key.clone());
            let summary = match Services::connect(&config, &credentials, http) {
                Ok(services) => {
                    let orchestrator = PipelineOrchestrator::new(&config, &credentials, services, store.clone());
                    Some(orchestrator.run(&task).await)
                }
                Err(e) => {
                    error!(error = %e, error_type = e.classify().error_type, "Pipeline could not start");
                    None
                }
            };
            (summary, Some(nvd))
        }
        Err(e) => {
            error!(error = %e, error_type = e.classify().error_type, "HTTP client could not be built");
            (None, None)
        }
    };

    let store_text = read_store(&store).await;
    let document = assemble_document(&task, &store_text, nvd.as_ref()).await;
    write_document(&cli.output, &document).await?;

    info!(
        output = %cli.output.display(),
        commits = document.root_cause_functions.len(),
        "Root cause analysis finished"
    );
    Ok(summary)
}

/// Store backed by `path`, or memory only when the file cannot be created.
pub(crate) async fn open_store(path: &Path) -> ConsensusStore {
    match ConsensusStore::with_sink(path).await {
        Ok(store) => store,
        Err(e) => {
            error!(path = %path.display(), error = %e, "Store file unavailable, keeping records in memory");
            ConsensusStore::in_memory()
        }
    }
}

async fn read_store(store: &ConsensusStore) -> String {
    match store.sink_path() {
        Some(path) => match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Store file unreadable, using in-memory records");
                store.render().await
            }
        },
        None => store.render().await,
    }
}
