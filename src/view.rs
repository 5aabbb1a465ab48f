use chrono::{Datelike, NaiveDateTime};

use crate::group::GroupIndex;
use crate::models::{FinalResult, PositionRecord};
use crate::salary::format_salary;
use crate::timeline;

/// Card view: one card per company group, fronted by its primary record,
/// with the full timeline and the sibling positions listed underneath.
pub fn render_cards(index: &GroupIndex, now: NaiveDateTime) {
    if index.is_empty() {
        println!("No records.");
        return;
    }

    for group in &index.groups {
        let record = group.front();
        println!("{}", "=".repeat(72));
        println!(
            "{}  [{}]",
            record.company_name,
            record
                .final_result
                .as_ref()
                .map(|r| r.label().to_string())
                .unwrap_or_else(|| "-".to_string())
        );
        if let Some(url) = &record.company_url {
            println!("  {}", url);
        }
        println!(
            "  Position: {}   Pool: {} days",
            record.position,
            record.effective_pool_days(now)
        );
        if let Some(location) = &record.base_location {
            println!("  Base: {}", location);
        }
        if record.final_result == Some(FinalResult::Oc) && record.expected_salary_type.is_some() {
            println!(
                "  Salary: {}",
                format_salary(
                    record.expected_salary_type,
                    record.expected_salary_value.as_deref()
                )
            );
        }

        let steps = timeline::derive(record, now);
        if !steps.is_empty() {
            println!("  Timeline:");
            for step in steps {
                println!(
                    "    {}. {} {}",
                    step.ordinal,
                    step.label,
                    step.time.map(format_date_short).unwrap_or_default()
                );
            }
        }

        if group.records.len() > 1 {
            println!("  Other positions in this group:");
            for sibling in &group.records[1..] {
                println!(
                    "    #{} {} [{}]",
                    sibling.id.map(|id| id.to_string()).unwrap_or_default(),
                    sibling.position,
                    sibling
                        .final_result
                        .as_ref()
                        .map(|r| r.label().to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
            }
        }

        if let Some(remarks) = &record.remarks {
            for line in textwrap::fill(remarks, 68).lines() {
                println!("  {}", line);
            }
        }
    }
    println!("{}", "=".repeat(72));
    println!("{} company group(s)", index.groups.len());
}

/// Table view: one row per company group.
pub fn render_table(index: &GroupIndex, now: NaiveDateTime) {
    if index.is_empty() {
        println!("No records.");
        return;
    }

    println!(
        "{:<6} {:<18} {:<20} {:<8} {:>6} {:>10}  {}",
        "ID", "COMPANY", "POSITION", "RESULT", "POOL", "SALARY", "TIMELINE"
    );
    println!("{}", "-".repeat(100));
    for group in &index.groups {
        let record = group.front();
        let salary = if record.final_result == Some(FinalResult::Oc) {
            format_salary(
                record.expected_salary_type,
                record.expected_salary_value.as_deref(),
            )
        } else {
            "-".to_string()
        };
        println!(
            "{:<6} {:<18} {:<20} {:<8} {:>6} {:>10}  {}",
            record.id.map(|id| id.to_string()).unwrap_or_default(),
            truncate(&record.company_name, 16),
            truncate(&record.position, 18),
            record
                .final_result
                .as_ref()
                .map(|r| r.label().to_string())
                .unwrap_or_else(|| "-".to_string()),
            format!("{}d", record.effective_pool_days(now)),
            salary,
            timeline::compact(record, now)
        );
    }
    println!("{} company group(s)", index.groups.len());
}

/// Full detail view for one record.
pub fn render_record(record: &PositionRecord, now: NaiveDateTime) {
    println!(
        "Record #{}",
        record.id.map(|id| id.to_string()).unwrap_or_default()
    );
    println!("Company: {}", record.company_name);
    println!("Position: {}", record.position);
    if !record.company_group_id.is_empty() {
        println!("Group: {}", record.company_group_id);
    }
    if let Some(location) = &record.base_location {
        println!("Base: {}", location);
    }
    if let Some(url) = &record.company_url {
        println!("URL: {}", url);
    }
    if let Some(result) = &record.final_result {
        println!("Result: {}", result);
    }
    println!("Primary: {}", if record.is_primary { "yes" } else { "no" });
    println!("Pool days: {}", record.effective_pool_days(now));
    if record.expected_salary_type.is_some() {
        println!(
            "Expected salary: {}",
            format_salary(
                record.expected_salary_type,
                record.expected_salary_value.as_deref()
            )
        );
    }
    let steps = timeline::derive(record, now);
    if steps.is_empty() {
        println!("Timeline: (empty)");
    } else {
        println!("Timeline:");
        for step in steps {
            println!(
                "  {}. {} {}",
                step.ordinal,
                step.label,
                step.time.map(format_date_short).unwrap_or_default()
            );
        }
    }
    if !record.interviews.is_empty() {
        println!("Interview rounds on file: {}", record.interviews.len());
    }
    if let Some(remarks) = &record.remarks {
        println!("Remarks:");
        for line in textwrap::fill(remarks, 70).lines() {
            println!("  {}", line);
        }
    }
}

/// Short month/day form for timeline step times.
fn format_date_short(t: NaiveDateTime) -> String {
    format!("{}/{}", t.month(), t.day())
}

/// Char-aware truncation; company and position names are routinely CJK, so
/// byte slicing is off the table.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}
