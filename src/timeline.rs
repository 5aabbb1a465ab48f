use chrono::NaiveDateTime;

use crate::models::{FinalResult, PositionRecord};

pub const LABEL_APPLY: &str = "Resume Submitted";
pub const LABEL_ASSESSMENT: &str = "Assessment";
pub const LABEL_WRITTEN_EXAM: &str = "Written Exam";
pub const LABEL_OFFER: &str = "Offer";

/// One display step of a position's pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub label: String,
    pub time: Option<NaiveDateTime>,
    pub ordinal: usize,
}

impl Step {
    fn new(label: impl Into<String>, time: Option<NaiveDateTime>, ordinal: usize) -> Step {
        Step {
            label: label.into(),
            time,
            ordinal,
        }
    }
}

/// Derive the ordered timeline steps for one record.
///
/// When both `current_status` and `current_status_date` are set the record is
/// in current-status mode: at most the submission step plus the literal
/// current status, every other stage field ignored. That is a deliberate
/// simplification (submission + latest known stage), and the status step is
/// always ordinal 2 even when the submission step is absent.
///
/// Otherwise the full history is shown in a fixed stage order, appending only
/// the steps whose source field is present. Interview rounds without a time
/// are excluded from display but stay in storage. The Offer step appears only
/// for an OC result and carries `now` as its time, since no offer timestamp
/// is stored.
///
/// A record with no qualifying fields derives an empty timeline, not an
/// error.
pub fn derive(record: &PositionRecord, now: NaiveDateTime) -> Vec<Step> {
    let mut steps = Vec::new();

    if record.current_status.is_some() && record.current_status_date.is_some() {
        if record.apply_time.is_some() {
            steps.push(Step::new(LABEL_APPLY, record.apply_time, 1));
        }
        steps.push(Step::new(
            record.current_status.clone().unwrap_or_default(),
            record.current_status_date,
            2,
        ));
        return steps;
    }

    if record.apply_time.is_some() {
        steps.push(Step::new(LABEL_APPLY, record.apply_time, steps.len() + 1));
    }
    if record.test_time.is_some() {
        steps.push(Step::new(
            LABEL_ASSESSMENT,
            record.test_time,
            steps.len() + 1,
        ));
    }
    if record.written_exam_time.is_some() {
        steps.push(Step::new(
            LABEL_WRITTEN_EXAM,
            record.written_exam_time,
            steps.len() + 1,
        ));
    }

    let mut rounds: Vec<_> = record
        .interviews
        .iter()
        .filter(|i| i.interview_time.is_some())
        .collect();
    rounds.sort_by_key(|i| i.interview_time);
    for round in rounds {
        steps.push(Step::new(
            round.interview_type.clone(),
            round.interview_time,
            steps.len() + 1,
        ));
    }

    if record.final_result == Some(FinalResult::Oc) {
        steps.push(Step::new(LABEL_OFFER, Some(now), steps.len() + 1));
    }

    steps
}

/// Compact single-line form for table rows: step labels joined with arrows.
pub fn compact(record: &PositionRecord, now: NaiveDateTime) -> String {
    derive(record, now)
        .into_iter()
        .map(|step| step.label)
        .collect::<Vec<_>>()
        .join(" → ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{parse_datetime, Interview};

    fn dt(s: &str) -> NaiveDateTime {
        parse_datetime(s).unwrap()
    }

    fn base_record() -> PositionRecord {
        PositionRecord {
            company_name: "Acme".into(),
            position: "SRE".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_current_status_mode_two_steps() {
        let mut record = base_record();
        record.apply_time = Some(dt("2025-03-01T09:00:00"));
        record.current_status = Some("一面".into());
        record.current_status_date = Some(dt("2025-03-05T10:00:00"));
        // Fields that must be ignored in this mode:
        record.test_time = Some(dt("2025-03-02T09:00:00"));
        record.final_result = Some(FinalResult::Oc);

        let now = dt("2025-03-10T00:00:00");
        let steps = derive(&record, now);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].label, LABEL_APPLY);
        assert_eq!(steps[0].time, Some(dt("2025-03-01T09:00:00")));
        assert_eq!(steps[0].ordinal, 1);
        assert_eq!(steps[1].label, "一面");
        assert_eq!(steps[1].time, Some(dt("2025-03-05T10:00:00")));
        assert_eq!(steps[1].ordinal, 2);
    }

    #[test]
    fn test_current_status_mode_without_apply_time() {
        let mut record = base_record();
        record.current_status = Some("二面".into());
        record.current_status_date = Some(dt("2025-03-05T10:00:00"));

        let steps = derive(&record, dt("2025-03-10T00:00:00"));
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].label, "二面");
        // The status step keeps ordinal 2 even with no submission step.
        assert_eq!(steps[0].ordinal, 2);
    }

    #[test]
    fn test_status_without_date_falls_back_to_full_history() {
        let mut record = base_record();
        record.apply_time = Some(dt("2025-03-01T09:00:00"));
        record.current_status = Some("一面".into());

        let steps = derive(&record, dt("2025-03-10T00:00:00"));
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].label, LABEL_APPLY);
    }

    #[test]
    fn test_full_history_interviews_sorted_by_time() {
        let mut record = base_record();
        record.apply_time = Some(dt("2025-03-01T09:00:00"));
        record.interviews = vec![
            Interview {
                interview_type: "二面".into(),
                interview_time: Some(dt("2025-03-08T09:00:00")),
            },
            Interview {
                interview_type: "一面".into(),
                interview_time: Some(dt("2025-03-04T09:00:00")),
            },
        ];

        let steps = derive(&record, dt("2025-03-10T00:00:00"));
        let labels: Vec<_> = steps.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec![LABEL_APPLY, "一面", "二面"]);
        let ordinals: Vec<_> = steps.iter().map(|s| s.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 3]);
    }

    #[test]
    fn test_untimed_interview_rounds_excluded_but_kept_in_storage() {
        let mut record = base_record();
        record.apply_time = Some(dt("2025-03-01T09:00:00"));
        record.interviews = vec![
            Interview {
                interview_type: "一面".into(),
                interview_time: None,
            },
            Interview {
                interview_type: "二面".into(),
                interview_time: Some(dt("2025-03-08T09:00:00")),
            },
        ];

        let steps = derive(&record, dt("2025-03-10T00:00:00"));
        let labels: Vec<_> = steps.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec![LABEL_APPLY, "二面"]);
        assert_eq!(record.interviews.len(), 2);
    }

    #[test]
    fn test_full_history_fixed_stage_order_and_offer() {
        let now = dt("2025-03-20T12:00:00");
        let mut record = base_record();
        record.apply_time = Some(dt("2025-03-01T09:00:00"));
        record.test_time = Some(dt("2025-03-03T09:00:00"));
        record.written_exam_time = Some(dt("2025-03-05T09:00:00"));
        record.interviews = vec![Interview {
            interview_type: "一面".into(),
            interview_time: Some(dt("2025-03-08T09:00:00")),
        }];
        record.final_result = Some(FinalResult::Oc);

        let steps = derive(&record, now);
        let labels: Vec<_> = steps.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                LABEL_APPLY,
                LABEL_ASSESSMENT,
                LABEL_WRITTEN_EXAM,
                "一面",
                LABEL_OFFER
            ]
        );
        // Offer time is the render instant, not a stored value.
        assert_eq!(steps.last().unwrap().time, Some(now));
        let ordinals: Vec<_> = steps.iter().map(|s| s.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_no_offer_step_without_oc() {
        let mut record = base_record();
        record.apply_time = Some(dt("2025-03-01T09:00:00"));
        record.final_result = Some(FinalResult::Pending);

        let steps = derive(&record, dt("2025-03-10T00:00:00"));
        assert!(steps.iter().all(|s| s.label != LABEL_OFFER));
    }

    #[test]
    fn test_empty_record_yields_empty_timeline() {
        let steps = derive(&base_record(), dt("2025-03-10T00:00:00"));
        assert!(steps.is_empty());
    }

    #[test]
    fn test_compact_joins_labels() {
        let mut record = base_record();
        record.apply_time = Some(dt("2025-03-01T09:00:00"));
        record.test_time = Some(dt("2025-03-03T09:00:00"));
        assert_eq!(
            compact(&record, dt("2025-03-10T00:00:00")),
            "Resume Submitted → Assessment"
        );
    }
}
