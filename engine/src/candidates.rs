//! Global candidate set: every legal `(field, activity)` pairing, deduplicated.

use std::collections::{HashMap, HashSet};

use crate::model::{Activity, ActivityId, ActivityKind, Candidate, CandIdx, Field, FieldId};

#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    pub candidates: Vec<Candidate>,
    /// Inverse map: activity -> candidate indices hosting it.
    by_activity: HashMap<ActivityId, Vec<CandIdx>>,
    /// Inverse map: field -> candidate indices on it.
    by_field: HashMap<FieldId, Vec<CandIdx>>,
}

impl CandidateSet {
    /// Built from (i) master field records with sanctioned activities, (ii)
    /// master special-activity records (self-hosting), deduplicated by
    /// `(field, activity)`. Globally disabled fields/activities are excluded.
    pub fn build<'a>(
        fields: impl Iterator<Item = &'a Field>,
        activities: impl Iterator<Item = &'a Activity>,
        field_by_name: &HashMap<String, FieldId>,
    ) -> Self {
        let activities: Vec<&Activity> = activities.collect();
        let activity_by_id: HashMap<ActivityId, &Activity> = activities.iter().map(|a| (a.id, *a)).collect();

        let mut seen: HashSet<(FieldId, ActivityId)> = HashSet::new();
        let mut candidates = Vec::new();
        let mut by_activity: HashMap<ActivityId, Vec<CandIdx>> = HashMap::new();
        let mut by_field: HashMap<FieldId, Vec<CandIdx>> = HashMap::new();

        let mut push = |field: FieldId, activity: ActivityId, kind: ActivityKind,
                        candidates: &mut Vec<Candidate>, seen: &mut HashSet<(FieldId, ActivityId)>,
                        by_activity: &mut HashMap<ActivityId, Vec<CandIdx>>,
                        by_field: &mut HashMap<FieldId, Vec<CandIdx>>| {
            if !seen.insert((field, activity)) {
                return;
            }
            let idx = candidates.len();
            candidates.push(Candidate { idx, field, activity, kind });
            by_activity.entry(activity).or_default().push(idx);
            by_field.entry(field).or_default().push(idx);
        };

        for field in fields {
            if field.disabled {
                continue;
            }
            for &activity_id in &field.activities {
                let Some(activity) = activity_by_id.get(&activity_id) else { continue };
                if activity.disabled {
                    continue;
                }
                push(field.id, activity_id, activity.kind, &mut candidates, &mut seen, &mut by_activity, &mut by_field);
            }
        }

        // Special activities self-host: the activity name is also a field name.
        for activity in &activities {
            if activity.kind != ActivityKind::Special || activity.disabled {
                continue;
            }
            if let Some(&field_id) = field_by_name.get(&activity.name) {
                push(field_id, activity.id, ActivityKind::Special, &mut candidates, &mut seen, &mut by_activity, &mut by_field);
            }
        }

        Self { candidates, by_activity, by_field }
    }

    pub fn for_activity(&self, activity: ActivityId) -> &[CandIdx] {
        self.by_activity.get(&activity).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn for_field(&self, field: FieldId) -> &[CandIdx] {
        self.by_field.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, idx: CandIdx) -> &Candidate {
        &self.candidates[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    /// Count of distinct fields hosting `activity` — used by the unique-field resource map.
    pub fn unique_host_count(&self, activity: ActivityId) -> usize {
        self.for_activity(activity)
            .iter()
            .map(|&idx| self.candidates[idx].field)
            .collect::<HashSet<_>>()
            .len()
    }
}
