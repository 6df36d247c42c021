use std::path::Path;

use tracing::{info, warn};

use crate::errors::RootCauseError;
use crate::models::CveTask;
use crate::nvd::NvdClient;
use crate::reporting::{aggregate_store_text, VexBuilder, VexDocument};

/// Fold the store text into per-commit aggregates and enrich them with the
/// NVD record. NVD failures leave the metadata fields empty.
pub async fn assemble_document(task: &CveTask, store_text: &str, nvd: Option<&NvdClient>) -> VexDocument {
    let cve_id = task.cve_id.as_deref().unwrap_or("");
    let package = task.package_url.as_deref().unwrap_or("");
    let aggregates = aggregate_store_text(store_text, task.repo_url.as_deref().unwrap_or(""));

    let record = match (nvd, cve_id.is_empty()) {
        (Some(client), false) => match client.fetch_cve(cve_id).await {
            Ok(Some(cve)) => Some(cve),
            Ok(None) => {
                warn!(cve_id, "CVE not found in NVD");
                None
            }
            Err(e) => {
                warn!(cve_id, error = %e, error_type = e.classify().error_type, "NVD lookup failed");
                None
            }
        },
        _ => None,
    };

    info!(cve_id, commits = aggregates.len(), "Assembled root cause output");
    VexBuilder::new(cve_id, package, record).build(aggregates)
}

/// Write the document as 2-space indented JSON, creating parent
/// directories as needed.
pub async fn write_document(path: &Path, document: &VexDocument) -> Result<(), RootCauseError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(document)?;
    tokio::fs::write(path, json).await?;
    info!(path = %path.display(), "Output written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::http::testing::StaticFetcher;

    const NVD_BODY: &str = r#"{"totalResults":1,"vulnerabilities":[{"cve":{
        "id":"CVE-2024-0001","published":"2024-01-02T03:04:05.120","lastModified":"2024-02-03T04:05:06.000",
        "descriptions":[{"lang":"en","value":"Overflow in parseInput."}],
        "weaknesses":[{"description":[{"lang":"en","value":"CWE-120"}]}],
        "references":[{"url":"https://github.com/acme/foo/commit/abc123","tags":["Patch"]}]}}]}"#;

    fn task() -> CveTask {
        CveTask {
            cve_id: Some("CVE-2024-0001".into()),
            package_url: Some("pkg:npm/foo".into()),
            repo_url: Some("https://github.com/acme/foo".into()),
            ecosystem: Some("npm".into()),
        }
    }

    #[tokio::test]
    async fn test_assemble_with_nvd_record() {
        let http = Arc::new(StaticFetcher::new().route(
            "https://services.nvd.nist.gov/rest/json/cves/2.0?cveId=CVE-2024-0001",
            200,
            NVD_BODY,
        ));
        let nvd = NvdClient::new(http, None);
        let store = "\nRoot cause exists in the commit URL: https://github.com/acme/foo/commit/abc123\n\
                     Source: NVD\nReference URL: https://nvd.nist.gov/vuln/detail/CVE-2024-0001\n\
                     [{\"root_cause_functions\": [{\"function_name\": \"parseInput\"}]}]\n";

        let doc = assemble_document(&task(), store, Some(&nvd)).await;
        assert_eq!(doc.package, "pkg:npm/foo");
        assert_eq!(doc.root_cause_functions.len(), 1);
        assert_eq!(doc.root_cause_functions[0].methods, vec!["parseInput"]);
        assert_eq!(doc.vex.description, "Overflow in parseInput.");
        assert_eq!(doc.vex.cwes, vec![120]);
        assert_eq!(doc.vex.published, "2024-01-02T03:04:05.120Z");
        assert_eq!(doc.vex.created, doc.vex.updated);
    }

    #[tokio::test]
    async fn test_assemble_without_nvd() {
        let http = Arc::new(StaticFetcher::new());
        let nvd = NvdClient::new(http, None);
        let doc = assemble_document(&task(), "", Some(&nvd)).await;
        assert!(doc.root_cause_functions.is_empty());
        assert_eq!(doc.vex.description, "");
        assert_eq!(doc.vex.ratings[0].score, "");
    }

    #[tokio::test]
    async fn test_write_document_pretty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/result.json");
        let doc = VexBuilder::new("CVE-1", "pkg:npm/foo", None).build(Vec::new());

        write_document(&path, &doc).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("{\n  \"cve\": \"CVE-1\""));
    }
}
