use std::collections::HashMap;

use chrono::NaiveDateTime;
use tracing::warn;

use crate::models::{result_priority, PositionRecord};

/// One company's applications, rendered as a single card/row. The record at
/// index 0 is the one shown by default.
#[derive(Debug, Clone)]
pub struct CompanyGroup {
    pub group_id: String,
    pub records: Vec<PositionRecord>,
}

impl CompanyGroup {
    pub fn front(&self) -> &PositionRecord {
        // A group only exists because at least one record produced it.
        &self.records[0]
    }
}

/// Secondary comparator applied within equal final-result priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Days since last pipeline activity, ascending (lower = fresher).
    #[default]
    PoolDays,
    /// Last update, newest first.
    UpdateTime,
    /// Application time, newest first.
    ApplyTime,
    /// Creation time, newest first.
    CreatedTime,
}

impl SortMode {
    pub fn parse(s: &str) -> Option<SortMode> {
        match s {
            "pool-days" | "poolDays" => Some(SortMode::PoolDays),
            "update-time" | "updateTime" => Some(SortMode::UpdateTime),
            "apply-time" | "applyTime" => Some(SortMode::ApplyTime),
            "created-time" | "createdTime" => Some(SortMode::CreatedTime),
            _ => None,
        }
    }
}

/// Derived, in-memory view over one load of the record set: company group id
/// to its ordered records, groups held in a stable overall order. Rebuilt
/// from scratch on every load, filter, or sort-preference change; never
/// mutated incrementally across rebuilds.
#[derive(Debug, Clone, Default)]
pub struct GroupIndex {
    pub groups: Vec<CompanyGroup>,
}

impl GroupIndex {
    /// Partition records into company groups. Bucket creation order is
    /// first-seen order in `records`. Within a bucket the primary record
    /// takes index 0 and every other record appends in encounter order.
    ///
    /// At most one record per group should be primary. If the input violates
    /// that, the first primary encountered keeps the front slot and later
    /// primaries append like ordinary siblings (first-wins, made explicit
    /// here rather than depending on insertion order).
    pub fn build(records: &[PositionRecord]) -> GroupIndex {
        let mut groups: Vec<CompanyGroup> = Vec::new();
        let mut by_id: HashMap<String, usize> = HashMap::new();

        for record in records {
            let slot = *by_id
                .entry(record.company_group_id.clone())
                .or_insert_with(|| {
                    groups.push(CompanyGroup {
                        group_id: record.company_group_id.clone(),
                        records: Vec::new(),
                    });
                    groups.len() - 1
                });
            let bucket = &mut groups[slot].records;
            if record.is_primary && !bucket.first().is_some_and(|front| front.is_primary) {
                bucket.insert(0, record.clone());
            } else {
                bucket.push(record.clone());
            }
        }

        GroupIndex { groups }
    }

    /// Order groups by front-record final-result priority, then by the
    /// selected secondary key. The sort is stable, so groups the comparator
    /// cannot separate keep their first-seen order, and it is recomputed in
    /// full on every call.
    pub fn order(mut self, mode: SortMode, now: NaiveDateTime) -> GroupIndex {
        self.groups.sort_by(|a, b| {
            let a = a.front();
            let b = b.front();
            let by_priority = result_priority(a.final_result.as_ref())
                .cmp(&result_priority(b.final_result.as_ref()));
            if by_priority != std::cmp::Ordering::Equal {
                return by_priority;
            }
            match mode {
                SortMode::PoolDays => a
                    .effective_pool_days(now)
                    .cmp(&b.effective_pool_days(now)),
                // Missing timestamps fall back to the epoch and sort oldest.
                SortMode::UpdateTime => b
                    .updated_at
                    .unwrap_or_default()
                    .cmp(&a.updated_at.unwrap_or_default()),
                SortMode::ApplyTime => b
                    .apply_time
                    .unwrap_or_default()
                    .cmp(&a.apply_time.unwrap_or_default()),
                SortMode::CreatedTime => b
                    .created_at
                    .unwrap_or_default()
                    .cmp(&a.created_at.unwrap_or_default()),
            }
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Make `record_id` the primary of `group_id`: flag it, clear its
    /// siblings, move it to the front of the bucket. Returns the group's
    /// records (every sibling, not just the target) so the caller can
    /// persist all of them and then rebuild from scratch.
    ///
    /// A lookup miss is an inconsistent-state finding: logged, no-op, never
    /// a panic.
    pub fn switch_primary(
        &mut self,
        group_id: &str,
        record_id: i64,
    ) -> Option<&[PositionRecord]> {
        let Some(group) = self.groups.iter_mut().find(|g| g.group_id == group_id) else {
            warn!(group_id, "company group not found, skipping primary switch");
            return None;
        };
        let Some(target) = group
            .records
            .iter()
            .position(|r| r.id == Some(record_id))
        else {
            warn!(group_id, record_id, "record not found in company group");
            return None;
        };
        for record in &mut group.records {
            record.is_primary = record.id == Some(record_id);
        }
        let record = group.records.remove(target);
        group.records.insert(0, record);
        Some(&group.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{parse_datetime, FinalResult};

    fn dt(s: &str) -> NaiveDateTime {
        parse_datetime(s).unwrap()
    }

    fn record(id: i64, group: &str, primary: bool) -> PositionRecord {
        PositionRecord {
            id: Some(id),
            company_group_id: group.to_string(),
            company_name: format!("company-{group}"),
            position: format!("position-{id}"),
            is_primary: primary,
            ..Default::default()
        }
    }

    #[test]
    fn test_build_puts_primary_at_front() {
        let records = vec![
            record(1, "g1", false),
            record(2, "g1", true),
            record(3, "g1", false),
        ];
        let index = GroupIndex::build(&records);
        assert_eq!(index.groups.len(), 1);
        let ids: Vec<_> = index.groups[0].records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![Some(2), Some(1), Some(3)]);
    }

    #[test]
    fn test_build_without_primary_keeps_encounter_order() {
        let records = vec![record(1, "g1", false), record(2, "g1", false)];
        let index = GroupIndex::build(&records);
        assert_eq!(index.groups[0].front().id, Some(1));
    }

    #[test]
    fn test_build_first_primary_wins() {
        let records = vec![
            record(1, "g1", true),
            record(2, "g1", true),
            record(3, "g1", false),
        ];
        let index = GroupIndex::build(&records);
        let ids: Vec<_> = index.groups[0].records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_build_bucket_order_is_first_seen() {
        let records = vec![
            record(1, "beta", false),
            record(2, "alpha", false),
            record(3, "beta", false),
        ];
        let index = GroupIndex::build(&records);
        let order: Vec<_> = index.groups.iter().map(|g| g.group_id.as_str()).collect();
        assert_eq!(order, vec!["beta", "alpha"]);
        assert_eq!(index.groups[0].records.len(), 2);
    }

    #[test]
    fn test_empty_build_and_order() {
        let index = GroupIndex::build(&[]).order(SortMode::PoolDays, dt("2025-03-01T00:00:00"));
        assert!(index.is_empty());
    }

    #[test]
    fn test_order_by_result_priority() {
        let mut records = vec![
            record(1, "g1", false),
            record(2, "g2", false),
            record(3, "g3", false),
            record(4, "g4", false),
        ];
        records[0].final_result = Some(FinalResult::from("简历挂".to_string()));
        records[1].final_result = Some(FinalResult::Oc);
        records[2].final_result = Some(FinalResult::from("X".to_string()));
        records[3].final_result = Some(FinalResult::Pending);

        let index =
            GroupIndex::build(&records).order(SortMode::PoolDays, dt("2025-03-01T00:00:00"));
        let order: Vec<_> = index.groups.iter().map(|g| g.group_id.as_str()).collect();
        assert_eq!(order, vec!["g2", "g4", "g1", "g3"]);
    }

    #[test]
    fn test_order_is_stable_for_ties() {
        // Equal priority, equal pool days: first-seen order must survive.
        let records = vec![
            record(1, "g1", false),
            record(2, "g2", false),
            record(3, "g3", false),
        ];
        let index =
            GroupIndex::build(&records).order(SortMode::PoolDays, dt("2025-03-01T00:00:00"));
        let order: Vec<_> = index.groups.iter().map(|g| g.group_id.as_str()).collect();
        assert_eq!(order, vec!["g1", "g2", "g3"]);
    }

    #[test]
    fn test_order_pool_days_ascending() {
        let now = dt("2025-03-10T00:00:00");
        let mut a = record(1, "g1", false);
        a.apply_time = Some(dt("2025-03-01T00:00:00")); // 9 days in pool
        let mut b = record(2, "g2", false);
        b.apply_time = Some(dt("2025-03-08T00:00:00")); // 2 days in pool

        let index = GroupIndex::build(&[a, b]).order(SortMode::PoolDays, now);
        let order: Vec<_> = index.groups.iter().map(|g| g.group_id.as_str()).collect();
        assert_eq!(order, vec!["g2", "g1"]);
    }

    #[test]
    fn test_order_update_time_descending_missing_as_epoch() {
        let now = dt("2025-03-10T00:00:00");
        let mut a = record(1, "g1", false);
        a.updated_at = None; // epoch, sorts oldest
        let mut b = record(2, "g2", false);
        b.updated_at = Some(dt("2025-03-09T00:00:00"));

        let index = GroupIndex::build(&[a, b]).order(SortMode::UpdateTime, now);
        let order: Vec<_> = index.groups.iter().map(|g| g.group_id.as_str()).collect();
        assert_eq!(order, vec!["g2", "g1"]);
    }

    #[test]
    fn test_order_apply_time_descending() {
        let now = dt("2025-03-10T00:00:00");
        let mut a = record(1, "g1", false);
        a.apply_time = Some(dt("2025-03-01T00:00:00"));
        let mut b = record(2, "g2", false);
        b.apply_time = Some(dt("2025-03-05T00:00:00"));

        let index = GroupIndex::build(&[a, b]).order(SortMode::ApplyTime, now);
        let order: Vec<_> = index.groups.iter().map(|g| g.group_id.as_str()).collect();
        assert_eq!(order, vec!["g2", "g1"]);
    }

    #[test]
    fn test_switch_primary() {
        let records = vec![record(1, "g1", true), record(2, "g1", false)];
        let mut index = GroupIndex::build(&records);

        let updated = index.switch_primary("g1", 2).unwrap().to_vec();
        assert_eq!(updated[0].id, Some(2));
        assert!(updated[0].is_primary);
        assert!(!updated[1].is_primary);

        // Rebuild from the persisted set, as the caller must.
        let rebuilt = GroupIndex::build(&updated);
        assert_eq!(rebuilt.groups[0].front().id, Some(2));
        assert!(rebuilt.groups[0].front().is_primary);
    }

    #[test]
    fn test_switch_primary_missing_group_is_noop() {
        let mut index = GroupIndex::build(&[record(1, "g1", true)]);
        assert!(index.switch_primary("nope", 1).is_none());
        assert!(index.switch_primary("g1", 99).is_none());
        // Nothing changed.
        assert!(index.groups[0].front().is_primary);
    }
}
