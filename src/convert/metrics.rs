//! Cloud Monitoring metric type to PromQL metric name mapping.
//!
//! MSP exposes `compute.googleapis.com/instance/cpu/utilization` as
//! `compute_googleapis_com:instance_cpu_utilization`. The rule is mechanical,
//! so it is computed here and handed to the model instead of left to it.

/// Applies the MSP naming rule to a Cloud Monitoring metric type.
pub fn promql_metric_name(metric_type: &str) -> String {
    let mut seen_slash = false;
    metric_type
        .chars()
        .map(|c| match c {
            '/' if !seen_slash => {
                seen_slash = true;
                ':'
            }
            c if c.is_ascii_alphanumeric() || c == '_' || c == ':' => c,
            _ => '_',
        })
        .collect()
}

/// Finds quoted Cloud Monitoring metric types in an MQL query, in order of
/// first appearance and without duplicates.
///
/// Handles both `metric 'a.b/c'` and the `resource::a.b/c` shorthand.
pub fn extract_metric_types(mql_query: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();

    for candidate in candidate_tokens(mql_query) {
        if looks_like_metric_type(&candidate) && !found.contains(&candidate) {
            found.push(candidate);
        }
    }

    found
}

/// Builds `(metric type, PromQL name)` pairs for every metric in the query.
pub fn metric_hints(mql_query: &str) -> Vec<(String, String)> {
    extract_metric_types(mql_query)
        .into_iter()
        .map(|metric_type| {
            let name = promql_metric_name(&metric_type);
            (metric_type, name)
        })
        .collect()
}

fn candidate_tokens(mql_query: &str) -> Vec<String> {
    let mut tokens = Vec::new();

    // Quoted strings.
    for quote in ['\'', '"'] {
        let mut parts = mql_query.split(quote);
        parts.next();
        while let Some(inside) = parts.next() {
            tokens.push(inside.trim().to_string());
            // Skip the text between this closing quote and the next opening one.
            parts.next();
        }
    }

    // `resource_type::metric.type/path` shorthand.
    for word in mql_query.split(|c: char| c.is_whitespace() || matches!(c, '|' | '{' | '}' | ';' | ',')) {
        if let Some((_, metric)) = word.split_once("::") {
            tokens.push(metric.trim().to_string());
        }
    }

    tokens
}

fn looks_like_metric_type(token: &str) -> bool {
    let Some((domain, path)) = token.split_once('/') else {
        return false;
    };

    !path.is_empty()
        && domain.contains('.')
        && !token.contains(char::is_whitespace)
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '/' | '_' | '-'))
}
