//! Inbound/outbound JSON contract: raw, string-keyed wire types plus the
//! interning step that turns them into the dense-id [`Catalog`] everything
//! downstream operates on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::candidates::CandidateSet;
use crate::context::Catalog;
use crate::error::EngineError;
use crate::field_cache::FieldPropertyCache;
use crate::model::{
    Activity, ActivityId, ActivityKind, Block, BlockIdx, Bunk, BunkId, Division, DivisionId, Field,
    FieldId, FieldPreferences, Interval, Lock, SharingMode, TimeSlot, TimeWindow,
};
use crate::resource_maps::{ResourceMaps, SkeletonEntry};
use crate::rotation::ActivityHistory;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDivision {
    pub name: String,
    pub bunks: Vec<String>,
    #[serde(default)]
    pub slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBunk {
    pub name: String,
    pub division: String,
    pub size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFieldPreferences {
    pub ordered_divisions: Vec<String>,
    #[serde(default)]
    pub exclusive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawField {
    pub name: String,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    #[serde(default)]
    pub sharing: SharingMode,
    #[serde(default)]
    pub preferences: Option<RawFieldPreferences>,
    #[serde(default)]
    pub activities: Vec<String>,
    #[serde(default)]
    pub time_rules: Option<Vec<TimeWindow>>,
    #[serde(default)]
    pub max_usage: Option<u32>,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

fn default_capacity() -> u32 {
    1
}

impl Default for SharingMode {
    fn default() -> Self {
        SharingMode::NotSharable
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawActivity {
    pub name: String,
    pub kind: ActivityKind,
    #[serde(default)]
    pub preferences: Option<RawFieldPreferences>,
    #[serde(default)]
    pub max_usage: Option<u32>,
    #[serde(default)]
    pub min_players: Option<u32>,
    #[serde(default)]
    pub max_players: Option<u32>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBlock {
    pub bunk: String,
    pub division: String,
    pub slots: Vec<u32>,
    #[serde(default)]
    pub start_min: Option<u32>,
    #[serde(default)]
    pub end_min: Option<u32>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub is_league: bool,
    #[serde(default)]
    pub from_split_tile: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLock {
    pub field: String,
    #[serde(default)]
    pub allowed_division: Option<String>,
    pub start_min: u32,
    pub end_min: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSkeletonEntry {
    pub division: String,
    pub start_min: u32,
    pub end_min: u32,
    pub kind: crate::model::SkeletonKind,
}

impl Serialize for crate::model::SkeletonKind {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let name = match self {
            crate::model::SkeletonKind::Sport => "sport",
            crate::model::SkeletonKind::Special => "special",
            crate::model::SkeletonKind::Break => "break",
            crate::model::SkeletonKind::General => "general",
            crate::model::SkeletonKind::Other => "other",
        };
        s.serialize_str(name)
    }
}

impl<'de> Deserialize<'de> for crate::model::SkeletonKind {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Ok(match s.as_str() {
            "sport" => crate::model::SkeletonKind::Sport,
            "special" => crate::model::SkeletonKind::Special,
            "break" => crate::model::SkeletonKind::Break,
            "general" => crate::model::SkeletonKind::General,
            _ => crate::model::SkeletonKind::Other,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBunkHistory {
    pub bunk: String,
    /// activity -> days since last done; absent means never done.
    #[serde(default)]
    pub days_since_last: HashMap<String, u32>,
    #[serde(default)]
    pub season_count: HashMap<String, u32>,
    #[serde(default)]
    pub done_today: Vec<String>,
    #[serde(default)]
    pub max_usage_reached: Vec<String>,
    /// Usage counters accrued prior to this solve, keyed by field/activity name.
    #[serde(default)]
    pub field_usage_so_far: HashMap<String, u32>,
    #[serde(default)]
    pub activity_usage_so_far: HashMap<String, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundSnapshot {
    pub divisions: Vec<RawDivision>,
    pub bunks: Vec<RawBunk>,
    pub fields: Vec<RawField>,
    pub activities: Vec<RawActivity>,
    pub blocks: Vec<RawBlock>,
    #[serde(default)]
    pub locks: Vec<RawLock>,
    #[serde(default)]
    pub skeleton: Vec<RawSkeletonEntry>,
    #[serde(default)]
    pub rotation_history: Vec<RawBunkHistory>,
    #[serde(default)]
    pub time_constrained_threshold_min: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAssignment {
    pub bunk: String,
    pub division: String,
    pub slots: Vec<u32>,
    pub field: Option<String>,
    pub activity: Option<String>,
    pub cost: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPassSummary {
    pub pass_index: u32,
    pub total_cost: i64,
    pub free_count: usize,
    pub assigned_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundResult {
    pub assignments: Vec<RawAssignment>,
    pub warnings: Vec<String>,
    pub pass_summaries: Vec<RawPassSummary>,
}

struct Interner {
    divisions: HashMap<String, DivisionId>,
    bunks: HashMap<String, BunkId>,
    fields: HashMap<String, FieldId>,
    activities: HashMap<String, ActivityId>,
}

fn resolve_prefs(raw: &Option<RawFieldPreferences>, divisions: &HashMap<String, DivisionId>) -> Option<FieldPreferences> {
    raw.as_ref().map(|p| FieldPreferences {
        ordered_divisions: p.ordered_divisions.iter().filter_map(|n| divisions.get(n).copied()).collect(),
        exclusive: p.exclusive,
    })
}

/// Intern every name in `snapshot` into dense ids and build the full
/// [`Catalog`], including the time index, field property cache, and resource
/// maps precomputed once up front.
pub fn build_catalog(snapshot: &InboundSnapshot, time_constrained_default: u32) -> Result<Catalog, EngineError> {
    let mut seen_fields = std::collections::HashSet::new();
    for f in &snapshot.fields {
        if !seen_fields.insert(&f.name) {
            return Err(EngineError::DuplicateFieldDefinition { field: f.name.clone() });
        }
    }

    let divisions_map: HashMap<String, DivisionId> =
        snapshot.divisions.iter().enumerate().map(|(i, d)| (d.name.clone(), DivisionId(i as u32))).collect();
    let bunks_map: HashMap<String, BunkId> =
        snapshot.bunks.iter().enumerate().map(|(i, b)| (b.name.clone(), BunkId(i as u32))).collect();
    let fields_map: HashMap<String, FieldId> =
        snapshot.fields.iter().enumerate().map(|(i, f)| (f.name.clone(), FieldId(i as u32))).collect();
    let activities_map: HashMap<String, ActivityId> =
        snapshot.activities.iter().enumerate().map(|(i, a)| (a.name.clone(), ActivityId(i as u32))).collect();

    let interner = Interner { divisions: divisions_map, bunks: bunks_map, fields: fields_map, activities: activities_map };

    let bunks: Vec<Bunk> = snapshot
        .bunks
        .iter()
        .map(|b| Bunk {
            id: interner.bunks[&b.name],
            name: b.name.clone(),
            numeric_suffix: Bunk::parse_numeric_suffix(&b.name),
            division: interner.divisions.get(&b.division).copied().unwrap_or(DivisionId(0)),
            size: b.size,
        })
        .collect();

    let divisions: Vec<Division> = snapshot
        .divisions
        .iter()
        .map(|d| Division {
            id: interner.divisions[&d.name],
            name: d.name.clone(),
            bunks: d.bunks.iter().filter_map(|n| interner.bunks.get(n).copied()).collect(),
            slots: d.slots.clone(),
        })
        .collect();

    let activities: Vec<Activity> = snapshot
        .activities
        .iter()
        .map(|a| Activity {
            id: interner.activities[&a.name],
            name: a.name.clone(),
            kind: a.kind,
            preferences: resolve_prefs(&a.preferences, &interner.divisions),
            max_usage: a.max_usage,
            min_players: a.min_players,
            max_players: a.max_players,
            disabled: a.disabled,
        })
        .collect();

    let fields: Vec<Field> = snapshot
        .fields
        .iter()
        .map(|f| Field {
            id: interner.fields[&f.name],
            name: f.name.clone(),
            capacity: f.capacity,
            sharing: f.sharing,
            preferences: resolve_prefs(&f.preferences, &interner.divisions),
            activities: f.activities.iter().filter_map(|n| interner.activities.get(n).copied()).collect(),
            time_rules: f.time_rules.clone(),
            max_usage: f.max_usage,
            zone: f.zone.clone(),
            disabled: f.disabled,
        })
        .collect();

    let blocks: Vec<Block> = snapshot
        .blocks
        .iter()
        .enumerate()
        .filter_map(|(idx, b)| {
            Some(Block {
                idx: idx as BlockIdx,
                bunk: *interner.bunks.get(&b.bunk)?,
                division: *interner.divisions.get(&b.division)?,
                slots: b.slots.clone(),
                interval: match (b.start_min, b.end_min) {
                    (Some(s), Some(e)) => Some(Interval::new(s, e)),
                    _ => None,
                },
                event: b.event.clone(),
                is_league: b.is_league,
                from_split_tile: b.from_split_tile,
            })
        })
        .collect();

    let locks: Vec<Lock> = snapshot
        .locks
        .iter()
        .filter_map(|l| {
            Some(Lock {
                field: *interner.fields.get(&l.field)?,
                allowed_division: l.allowed_division.as_ref().and_then(|n| interner.divisions.get(n).copied()),
                interval: Interval::new(l.start_min, l.end_min),
            })
        })
        .collect();

    let field_by_name = interner.fields.clone();
    let candidates = CandidateSet::build(fields.iter(), activities.iter(), &field_by_name);
    let field_cache = FieldPropertyCache::build(fields.iter());

    let skeleton_outline: Vec<SkeletonEntry> = snapshot
        .skeleton
        .iter()
        .filter_map(|s| {
            Some(SkeletonEntry {
                division: *interner.divisions.get(&s.division)?,
                start_min: s.start_min,
                end_min: s.end_min,
                kind: s.kind,
            })
        })
        .collect();

    let resource_maps = ResourceMaps::build(
        &candidates,
        activities.iter(),
        fields.iter(),
        bunks.iter(),
        &blocks,
        &skeleton_outline,
        snapshot.time_constrained_threshold_min.unwrap_or(time_constrained_default),
    );

    let mut blocks_by_bunk: HashMap<BunkId, Vec<BlockIdx>> = HashMap::new();
    let mut blocks_by_division: HashMap<DivisionId, Vec<BlockIdx>> = HashMap::new();
    for block in &blocks {
        blocks_by_bunk.entry(block.bunk).or_default().push(block.idx);
        blocks_by_division.entry(block.division).or_default().push(block.idx);
    }

    let mut field_usage_so_far = HashMap::new();
    let mut activity_usage_so_far = HashMap::new();
    for hist in &snapshot.rotation_history {
        let Some(&bunk) = interner.bunks.get(&hist.bunk) else { continue };
        for (name, &count) in &hist.field_usage_so_far {
            if let Some(&field) = interner.fields.get(name) {
                field_usage_so_far.insert((bunk, field), count);
            }
        }
        for (name, &count) in &hist.activity_usage_so_far {
            if let Some(&activity) = interner.activities.get(name) {
                activity_usage_so_far.insert((bunk, activity), count);
            }
        }
    }

    let division_index = divisions.iter().enumerate().map(|(i, d)| (d.id, i)).collect();
    let bunk_index = bunks.iter().enumerate().map(|(i, b)| (b.id, i)).collect();
    let field_index = fields.iter().enumerate().map(|(i, f)| (f.id, i)).collect();
    let activity_index = activities.iter().enumerate().map(|(i, a)| (a.id, i)).collect();

    Ok(Catalog {
        divisions,
        bunks,
        fields,
        activities,
        blocks,
        locks,
        candidates,
        field_cache,
        resource_maps,
        field_by_name,
        division_index,
        bunk_index,
        field_index,
        activity_index,
        blocks_by_bunk,
        blocks_by_division,
        field_usage_so_far,
        activity_usage_so_far,
    })
}

/// Build the reference rotation oracle's history table from the same
/// snapshot section consumed above, keeping name resolution in one place.
pub fn build_rotation_history(
    snapshot: &InboundSnapshot,
    catalog: &Catalog,
) -> HashMap<BunkId, ActivityHistory> {
    let bunk_by_name: HashMap<&str, BunkId> = catalog.bunks.iter().map(|b| (b.name.as_str(), b.id)).collect();
    let activity_by_name: HashMap<&str, ActivityId> = catalog.activities.iter().map(|a| (a.name.as_str(), a.id)).collect();

    let mut out = HashMap::new();
    for hist in &snapshot.rotation_history {
        let Some(&bunk) = bunk_by_name.get(hist.bunk.as_str()) else { continue };
        let mut entry = ActivityHistory::default();
        for (name, &days) in &hist.days_since_last {
            if let Some(&id) = activity_by_name.get(name.as_str()) {
                entry.days_since_last.insert(id, days);
            }
        }
        for (name, &count) in &hist.season_count {
            if let Some(&id) = activity_by_name.get(name.as_str()) {
                entry.season_count.insert(id, count);
            }
        }
        for name in &hist.done_today {
            if let Some(&id) = activity_by_name.get(name.as_str()) {
                entry.done_today.insert(id);
            }
        }
        for name in &hist.max_usage_reached {
            if let Some(&id) = activity_by_name.get(name.as_str()) {
                entry.max_usage_reached.insert(id);
            }
        }
        out.insert(bunk, entry);
    }
    out
}

/// Serialize a finished solve into the outbound wire contract.
pub fn build_outbound(catalog: &Catalog, result: &crate::solve::SolveResult) -> OutboundResult {
    let pass_summaries = result
        .pass_reports
        .iter()
        .map(|r| RawPassSummary {
            pass_index: r.pass_index,
            total_cost: r.total_cost,
            free_count: r.free_count,
            assigned_count: r.assigned_count,
        })
        .collect();

    build_outbound_from_schedule(catalog, &result.schedule, &result.warnings, pass_summaries)
}

/// Rehydrate a [`crate::model::Assignment`] vector from a previously
/// serialized [`OutboundResult`], positionally matched against `catalog`'s
/// block order (the same order [`build_outbound_from_schedule`] emits in).
pub fn rehydrate_schedule(catalog: &Catalog, result: &OutboundResult) -> Vec<crate::model::Assignment> {
    result
        .assignments
        .iter()
        .map(|raw| match (&raw.field, &raw.activity) {
            (Some(field_name), Some(activity_name)) => {
                let field = catalog.field_by_name.get(field_name).copied();
                let activity = catalog.activities.iter().find(|a| &a.name == activity_name).map(|a| a.id);
                match (field, activity) {
                    (Some(field), Some(activity)) => {
                        let kind = catalog.activity(activity).kind;
                        crate::model::Assignment::Assigned {
                            pick: crate::model::Pick { field, activity, kind },
                            cost: raw.cost,
                        }
                    }
                    _ => crate::model::Assignment::Free,
                }
            }
            _ => crate::model::Assignment::Free,
        })
        .collect()
}

/// Serialize any schedule vector against `catalog`, independent of whether it
/// came from a full solve or a narrow [`crate::repair::repair`] call.
pub fn build_outbound_from_schedule(
    catalog: &Catalog,
    schedule: &[crate::model::Assignment],
    warnings: &[crate::error::SolveWarning],
    pass_summaries: Vec<RawPassSummary>,
) -> OutboundResult {
    let assignments = catalog
        .blocks
        .iter()
        .map(|block| {
            let assignment = &schedule[block.idx];
            let (field, activity, cost) = match assignment {
                crate::model::Assignment::Free => (None, None, assignment.cost()),
                crate::model::Assignment::Assigned { pick, cost } => (
                    Some(catalog.field(pick.field).name.clone()),
                    Some(catalog.activity(pick.activity).name.clone()),
                    *cost,
                ),
            };
            RawAssignment {
                bunk: catalog.bunk(block.bunk).name.clone(),
                division: catalog.division(block.division).name.clone(),
                slots: block.slots.clone(),
                field,
                activity,
                cost,
            }
        })
        .collect();

    OutboundResult {
        assignments,
        warnings: warnings.iter().map(|w| w.to_string()).collect(),
        pass_summaries,
    }
}
