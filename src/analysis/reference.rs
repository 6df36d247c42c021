/// Human-facing page that explains where a commit URL was found.
///
/// Sources are matched by their log label; the fallback labels `sourceware`
/// and `gitlab` keep only the part of the URL before the first `;`.
pub fn reference_url(cve_id: &str, url: &str, source: &str) -> String {
    match source {
        "NVD" => format!("https://nvd.nist.gov/vuln/detail/{}", cve_id),
        "OSV" => format!("https://osv.dev/list?q={}&ecosystem=", cve_id),
        "Debian" => format!("https://security-tracker.debian.org/tracker/{}", cve_id),
        "sourceware" | "gitlab" => url.split(';').next().unwrap_or(url).to_string(),
        "Manual Input" => {
            let parts: Vec<&str> = url.split('/').collect();
            if url.contains("github.com") && parts.len() >= 5 {
                parts[..5].join("/")
            } else {
                url.to_string()
            }
        }
        _ => url.to_string(),
    }
}
