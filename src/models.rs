use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use anyhow::{bail, Result};

/// Terminal or interim outcome of one position's pipeline.
///
/// The wire form is the bare label string ("OC", "PENDING", "简历挂", ...).
/// Any label containing 挂 is a rejection stage; everything else we have not
/// seen before lands in `Other` instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FinalResult {
    Oc,
    Pending,
    Rejected(String),
    Other(String),
}

impl FinalResult {
    pub fn label(&self) -> &str {
        match self {
            FinalResult::Oc => "OC",
            FinalResult::Pending => "PENDING",
            FinalResult::Rejected(label) | FinalResult::Other(label) => label,
        }
    }

    /// Group ordering priority: OC before PENDING before rejections before
    /// anything unrecognized. Lower sorts first.
    pub fn priority(&self) -> u8 {
        match self {
            FinalResult::Oc => 1,
            FinalResult::Pending => 2,
            FinalResult::Rejected(_) => 3,
            FinalResult::Other(_) => 4,
        }
    }
}

/// Absent results sort with the unrecognized ones.
pub fn result_priority(result: Option<&FinalResult>) -> u8 {
    result.map(FinalResult::priority).unwrap_or(4)
}

impl From<String> for FinalResult {
    fn from(label: String) -> Self {
        match label.as_str() {
            "OC" => FinalResult::Oc,
            "PENDING" => FinalResult::Pending,
            _ if label.contains('挂') => FinalResult::Rejected(label),
            _ => FinalResult::Other(label),
        }
    }
}

impl From<FinalResult> for String {
    fn from(result: FinalResult) -> Self {
        result.label().to_string()
    }
}

impl std::fmt::Display for FinalResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// How `expected_salary_value` is encoded. The wire labels are the ones the
/// backend stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalaryType {
    #[serde(rename = "总包")]
    TotalPackage,
    #[serde(rename = "月薪")]
    Monthly,
    #[serde(rename = "待商议")]
    Negotiable,
}

/// One interview round. Rounds without a time stay in storage but are
/// excluded from timeline display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interview {
    pub interview_type: String, // ordinal label, e.g. "一面".."十面" or "AI面"
    #[serde(default, with = "flex_datetime")]
    pub interview_time: Option<NaiveDateTime>,
}

/// One job application to one position at one company, in normalized (flat)
/// form. This is the only shape the core logic ever sees; the nested
/// `currentPosition` wire variant is flattened at the persistence boundary
/// (see [`RecordDto::into_normalized`]).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PositionRecord {
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "null_string")]
    pub company_group_id: String,
    pub company_name: String,
    pub position: String,
    pub base_location: Option<String>,
    pub company_url: Option<String>,
    #[serde(default, with = "flex_datetime")]
    pub apply_time: Option<NaiveDateTime>,
    #[serde(default, with = "flex_datetime")]
    pub test_time: Option<NaiveDateTime>,
    #[serde(default, with = "flex_datetime")]
    pub written_exam_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub interviews: Vec<Interview>,
    pub current_status: Option<String>,
    #[serde(default, with = "flex_datetime")]
    pub current_status_date: Option<NaiveDateTime>,
    pub final_result: Option<FinalResult>,
    pub expected_salary_type: Option<SalaryType>,
    pub expected_salary_value: Option<String>,
    pub remarks: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    /// Days awaiting resolution, computed server-side when present.
    pub pool_days: Option<i64>,
    #[serde(default, with = "flex_datetime")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, with = "flex_datetime")]
    pub updated_at: Option<NaiveDateTime>,
}

impl PositionRecord {
    /// Server-supplied pool days when available, otherwise days between the
    /// latest stage activity and `now` (the backend's own calculation).
    pub fn effective_pool_days(&self, now: NaiveDateTime) -> i64 {
        if let Some(days) = self.pool_days {
            return days;
        }
        let mut latest = self.apply_time;
        latest = latest.max(self.test_time);
        latest = latest.max(self.written_exam_time);
        latest = latest.max(self.current_status_date);
        for interview in &self.interviews {
            latest = latest.max(interview.interview_time);
        }
        match latest {
            Some(t) => (now - t).num_days(),
            None => 0,
        }
    }

    /// Checked before any network call; a failure here aborts the operation
    /// with no side effects.
    pub fn validate_for_submit(&self) -> Result<()> {
        if self.company_name.trim().is_empty() {
            bail!("company name must not be empty");
        }
        if self.position.trim().is_empty() {
            bail!("position must not be empty");
        }
        if self.apply_time.is_none() {
            bail!("apply time is required");
        }
        Ok(())
    }
}

/// Per-position fields as nested inside the newer DTO shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSnapshot {
    pub id: Option<i64>,
    pub position: Option<String>,
    pub final_result: Option<FinalResult>,
    pub current_status: Option<String>,
    #[serde(default, with = "flex_datetime")]
    pub current_status_date: Option<NaiveDateTime>,
    pub pool_days: Option<i64>,
    pub expected_salary_type: Option<SalaryType>,
    pub expected_salary_value: Option<String>,
    pub remarks: Option<String>,
    #[serde(default)]
    pub interviews: Vec<Interview>,
    #[serde(default, with = "flex_datetime")]
    pub apply_time: Option<NaiveDateTime>,
    #[serde(default, with = "flex_datetime")]
    pub test_time: Option<NaiveDateTime>,
    #[serde(default, with = "flex_datetime")]
    pub written_exam_time: Option<NaiveDateTime>,
}

/// Wire record as the server actually returns it. Two shapes exist in the
/// backend's history: flat per-position fields, and company-level fields with
/// the position data nested under `currentPosition`. This adapter collapses
/// both into [`PositionRecord`] so nothing downstream has to care.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDto {
    #[serde(flatten)]
    pub record: PositionRecord,
    pub current_position: Option<PositionSnapshot>,
}

impl RecordDto {
    pub fn into_normalized(self) -> PositionRecord {
        let mut record = self.record;
        if let Some(current) = self.current_position {
            if let Some(id) = current.id {
                record.id = Some(id);
            }
            if let Some(position) = current.position {
                record.position = position;
            }
            record.final_result = current.final_result.or(record.final_result);
            record.current_status = current.current_status.or(record.current_status);
            record.current_status_date = current.current_status_date.or(record.current_status_date);
            record.pool_days = current.pool_days.or(record.pool_days);
            record.expected_salary_type =
                current.expected_salary_type.or(record.expected_salary_type);
            record.expected_salary_value =
                current.expected_salary_value.or(record.expected_salary_value);
            record.remarks = current.remarks.or(record.remarks);
            record.apply_time = current.apply_time.or(record.apply_time);
            record.test_time = current.test_time.or(record.test_time);
            record.written_exam_time = current.written_exam_time.or(record.written_exam_time);
            if !current.interviews.is_empty() {
                record.interviews = current.interviews;
            }
        }
        record
    }
}

/// Older rows predate company groups and carry a null group id.
fn null_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a user-entered or wire datetime. The backend speaks zone-less
/// ISO-8601-ish local datetimes; browser datetime inputs drop the seconds.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, format) {
            return Some(t);
        }
    }
    // A bare date means midnight that day.
    if let Ok(d) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    None
}

/// Serde adapter for optional zone-less datetimes that tolerates every
/// format the backend has ever emitted, plus null/absent.
pub mod flex_datetime {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(t) => serializer.serialize_str(&t.format("%Y-%m-%dT%H:%M:%S").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => match super::parse_datetime(&s) {
                Some(t) => Ok(Some(t)),
                None if s.trim().is_empty() => Ok(None),
                None => Err(serde::de::Error::custom(format!(
                    "unrecognized datetime: {s}"
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        parse_datetime(s).unwrap()
    }

    #[test]
    fn test_final_result_priorities() {
        // OC before PENDING before any rejection before unknown
        assert_eq!(FinalResult::from("OC".to_string()).priority(), 1);
        assert_eq!(FinalResult::from("PENDING".to_string()).priority(), 2);
        assert_eq!(FinalResult::from("简历挂".to_string()).priority(), 3);
        assert_eq!(FinalResult::from("笔试挂".to_string()).priority(), 3);
        assert_eq!(FinalResult::from("X".to_string()).priority(), 4);
        assert_eq!(result_priority(None), 4);
    }

    #[test]
    fn test_final_result_round_trips_as_label() {
        let json = serde_json::to_string(&FinalResult::Rejected("面试挂".into())).unwrap();
        assert_eq!(json, "\"面试挂\"");
        let back: FinalResult = serde_json::from_str("\"面试挂\"").unwrap();
        assert_eq!(back, FinalResult::Rejected("面试挂".into()));
    }

    #[test]
    fn test_parse_datetime_formats() {
        assert!(parse_datetime("2025-03-01T10:30:00").is_some());
        assert!(parse_datetime("2025-03-01T10:30").is_some());
        assert!(parse_datetime("2025-03-01 10:30:00").is_some());
        assert_eq!(
            parse_datetime("2025-03-01").unwrap(),
            dt("2025-03-01T00:00:00")
        );
        assert!(parse_datetime("").is_none());
        assert!(parse_datetime("not a date").is_none());
    }

    #[test]
    fn test_record_tolerates_absent_optional_dates() {
        let record: PositionRecord = serde_json::from_str(
            r#"{"companyName":"Acme","position":"SRE","testTime":null}"#,
        )
        .unwrap();
        assert!(record.apply_time.is_none());
        assert!(record.test_time.is_none());
        assert!(record.interviews.is_empty());
    }

    #[test]
    fn test_pool_days_uses_latest_stage_activity() {
        let now = dt("2025-03-11T00:00:00");
        let record = PositionRecord {
            company_name: "Acme".into(),
            position: "SRE".into(),
            apply_time: Some(dt("2025-03-01T09:00:00")),
            interviews: vec![Interview {
                interview_type: "一面".into(),
                interview_time: Some(dt("2025-03-06T09:00:00")),
            }],
            ..Default::default()
        };
        // 2025-03-06 09:00 -> 2025-03-11 00:00 is 4 whole days
        assert_eq!(record.effective_pool_days(now), 4);
    }

    #[test]
    fn test_pool_days_prefers_server_value() {
        let record = PositionRecord {
            pool_days: Some(12),
            apply_time: Some(dt("2025-03-01T09:00:00")),
            ..Default::default()
        };
        assert_eq!(record.effective_pool_days(dt("2025-03-02T09:00:00")), 12);
    }

    #[test]
    fn test_nested_current_position_overrides_flat_fields() {
        let json = r#"{
            "id": 1,
            "companyName": "Acme",
            "position": "Backend",
            "applyTime": "2025-03-01T09:00",
            "finalResult": "PENDING",
            "currentPosition": {
                "id": 2,
                "position": "Platform",
                "finalResult": "OC",
                "applyTime": "2025-03-02T09:00"
            }
        }"#;
        let record = serde_json::from_str::<RecordDto>(json)
            .unwrap()
            .into_normalized();
        assert_eq!(record.id, Some(2));
        assert_eq!(record.position, "Platform");
        assert_eq!(record.final_result, Some(FinalResult::Oc));
        assert_eq!(record.apply_time, Some(dt("2025-03-02T09:00")));
        assert_eq!(record.company_name, "Acme");
    }

    #[test]
    fn test_validate_for_submit() {
        let mut record = PositionRecord {
            company_name: "Acme".into(),
            position: "SRE".into(),
            apply_time: Some(dt("2025-03-01T09:00:00")),
            ..Default::default()
        };
        assert!(record.validate_for_submit().is_ok());
        record.position = "  ".into();
        assert!(record.validate_for_submit().is_err());
    }
}
