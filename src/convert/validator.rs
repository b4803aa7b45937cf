use serde::Serialize;

pub const EMPTY_QUERY: &str = "Query cannot be empty";

/// Outcome of checking an MQL query before it is sent to the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Lightweight sanity checks on MQL text. This is not a parser.
///
/// Only an empty query is always rejected. The structural checks are
/// reported as warnings unless `strict` is set, in which case they reject
/// the query.
#[derive(Debug, Clone, Copy, Default)]
pub struct MqlValidator {
    strict: bool,
}

impl MqlValidator {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    pub fn validate(&self, query: &str) -> ValidationReport {
        let mut report = ValidationReport::default();

        if query.trim().is_empty() {
            report.errors.push(EMPTY_QUERY.to_string());
            return report;
        }

        let findings = structural_findings(query);
        if self.strict {
            report.errors.extend(findings);
        } else {
            report.warnings.extend(findings);
        }

        if query.contains("::") && !query.contains("fetch") {
            report
                .warnings
                .push("Resource specification without fetch may cause issues".to_string());
        }

        report
    }
}

fn structural_findings(query: &str) -> Vec<String> {
    let mut findings = Vec::new();

    if query.matches('\'').count() % 2 != 0 {
        findings.push("Unmatched single quotes in query".to_string());
    }
    if query.matches('"').count() % 2 != 0 {
        findings.push("Unmatched double quotes in query".to_string());
    }

    let mut depth: i64 = 0;
    for c in query.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            findings.push("Unmatched closing parenthesis".to_string());
            break;
        }
    }
    if depth > 0 {
        findings.push("Unmatched opening parenthesis".to_string());
    }

    let first_stage = query.split('|').next().unwrap_or_default().trim_start();
    if !first_stage.starts_with("fetch") {
        findings.push("Query must start with 'fetch'".to_string());
    }

    findings
}
