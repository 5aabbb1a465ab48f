use crate::models::{FinalResult, PositionRecord};
use crate::salary::annualized_salary;

/// Pseudo-value matching every rejection label.
pub const RESULT_ANY_REJECTED: &str = "已挂";
/// Pseudo-value matching PENDING.
pub const RESULT_PENDING_ALIAS: &str = "待定";

/// One search/filter request, applied locally over the full record set. All
/// present criteria are ANDed. The same four fields travel to
/// `GET /records/search` for the server-side variant.
#[derive(Debug, Clone, Default)]
pub struct FilterQuery {
    /// Comma-separated keywords (ASCII or full-width comma); any one matching
    /// company name, position, or base location qualifies the record.
    pub keywords: Option<String>,
    pub final_result: Option<String>,
    pub current_status: Option<String>,
    /// Annualized minimum, in ten-thousands per year.
    pub min_salary: Option<f64>,
}

impl FilterQuery {
    pub fn is_empty(&self) -> bool {
        self.keywords.as_deref().is_none_or(|k| k.trim().is_empty())
            && self.final_result.is_none()
            && self.current_status.is_none()
            && !self.min_salary.is_some_and(|m| m > 0.0)
    }
}

pub fn apply(records: &[PositionRecord], query: &FilterQuery) -> Vec<PositionRecord> {
    records
        .iter()
        .filter(|r| matches(r, query))
        .cloned()
        .collect()
}

fn matches(record: &PositionRecord, query: &FilterQuery) -> bool {
    if let Some(keywords) = query.keywords.as_deref() {
        let terms: Vec<&str> = keywords
            .split([',', '，'])
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if !terms.is_empty() && !terms.iter().any(|t| keyword_matches(record, t)) {
            return false;
        }
    }

    if let Some(wanted) = query.final_result.as_deref() {
        let actual = record.final_result.as_ref();
        let ok = match wanted {
            RESULT_ANY_REJECTED => matches!(actual, Some(FinalResult::Rejected(_))),
            RESULT_PENDING_ALIAS => matches!(actual, Some(FinalResult::Pending)),
            _ => actual.is_some_and(|r| r.label() == wanted),
        };
        if !ok {
            return false;
        }
    }

    if let Some(status) = query.current_status.as_deref() {
        if record.current_status.as_deref() != Some(status) {
            return false;
        }
    }

    if let Some(min) = query.min_salary {
        if min > 0.0 {
            // Only an OC record with a parsable salary can clear the bar.
            if record.final_result != Some(FinalResult::Oc) {
                return false;
            }
            let annualized = match (record.expected_salary_type, &record.expected_salary_value) {
                (Some(ty), Some(value)) => annualized_salary(ty, value),
                _ => None,
            };
            match annualized {
                Some(v) if v >= min => {}
                _ => return false,
            }
        }
    }

    true
}

fn keyword_matches(record: &PositionRecord, term: &str) -> bool {
    let term = term.to_lowercase();
    record.company_name.to_lowercase().contains(&term)
        || record.position.to_lowercase().contains(&term)
        || record
            .base_location
            .as_deref()
            .is_some_and(|l| l.to_lowercase().contains(&term))
}
