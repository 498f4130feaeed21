use std::collections::HashMap;

use engine::config::SolverConfig;
use engine::model::SharingMode;
use engine::snapshot::{
    InboundSnapshot, RawActivity, RawBlock, RawBunk, RawDivision, RawField,
};

fn division(name: &str, bunks: &[&str]) -> RawDivision {
    RawDivision { name: name.into(), bunks: bunks.iter().map(|s| s.to_string()).collect(), slots: Vec::new() }
}

fn bunk(name: &str, division: &str, size: u32) -> RawBunk {
    RawBunk { name: name.into(), division: division.into(), size }
}

fn sport(name: &str) -> RawActivity {
    RawActivity {
        name: name.into(),
        kind: engine::model::ActivityKind::Sport,
        preferences: None,
        max_usage: None,
        min_players: Some(4),
        max_players: Some(20),
        disabled: false,
    }
}

fn field(name: &str, capacity: u32, sharing: SharingMode, activities: &[&str]) -> RawField {
    RawField {
        name: name.into(),
        capacity,
        sharing,
        preferences: None,
        activities: activities.iter().map(|s| s.to_string()).collect(),
        time_rules: None,
        max_usage: None,
        zone: None,
        disabled: false,
    }
}

fn field_with_prefs(name: &str, capacity: u32, sharing: SharingMode, activities: &[&str], exclusive_divisions: &[&str]) -> RawField {
    RawField {
        name: name.into(),
        capacity,
        sharing,
        preferences: Some(engine::snapshot::RawFieldPreferences {
            ordered_divisions: exclusive_divisions.iter().map(|s| s.to_string()).collect(),
            exclusive: true,
        }),
        activities: activities.iter().map(|s| s.to_string()).collect(),
        time_rules: None,
        max_usage: None,
        zone: None,
        disabled: false,
    }
}

fn block(bunk: &str, division: &str, start: u32, end: u32) -> RawBlock {
    RawBlock {
        bunk: bunk.into(),
        division: division.into(),
        slots: vec![start / 60],
        start_min: Some(start),
        end_min: Some(end),
        event: None,
        is_league: false,
        from_split_tile: false,
    }
}

/// Two bunks in one division, one field capable of hosting one bunk at a
/// time, two distinct activities — enough to exercise the full pipeline
/// without hitting any hard gate.
fn small_snapshot() -> InboundSnapshot {
    InboundSnapshot {
        divisions: vec![division("Seniors", &["Bunk1", "Bunk2"])],
        bunks: vec![bunk("Bunk1", "Seniors", 10), bunk("Bunk2", "Seniors", 10)],
        fields: vec![
            field("Field A", 1, SharingMode::NotSharable, &["Soccer"]),
            field("Field B", 1, SharingMode::NotSharable, &["Basketball"]),
        ],
        activities: vec![sport("Soccer"), sport("Basketball")],
        blocks: vec![
            block("Bunk1", "Seniors", 540, 600),
            block("Bunk2", "Seniors", 540, 600),
        ],
        locks: Vec::new(),
        skeleton: Vec::new(),
        rotation_history: Vec::new(),
        time_constrained_threshold_min: None,
    }
}

#[test]
fn solves_two_bunks_onto_two_fields() {
    let snapshot = small_snapshot();
    let config = SolverConfig::default();
    let result = engine::solve_snapshot(&snapshot, &config).expect("solve should not error on a clean snapshot");

    let assigned: Vec<_> = result.assignments.iter().filter(|a| a.field.is_some()).collect();
    assert_eq!(assigned.len(), 2, "both bunks should land on a field: {:?}", result.assignments);

    let fields_used: std::collections::HashSet<_> = assigned.iter().map(|a| a.field.clone()).collect();
    assert_eq!(fields_used.len(), 2, "each not-sharable field hosts at most one bunk concurrently");
}

#[test]
fn duplicate_field_definition_is_an_engine_error() {
    let mut snapshot = small_snapshot();
    snapshot.fields.push(field("Field A", 2, SharingMode::All, &["Soccer"]));

    let err = engine::snapshot::build_catalog(&snapshot, 480).expect_err("duplicate field name must fail to build");
    assert!(matches!(err, engine::EngineError::DuplicateFieldDefinition { .. }));
}

#[test]
fn same_day_repeat_is_never_committed() {
    // Three non-overlapping blocks for one bunk, only one field/activity
    // available — the bunk must not be assigned that activity twice.
    let mut snapshot = small_snapshot();
    snapshot.fields.truncate(1);
    snapshot.activities.truncate(1);
    snapshot.blocks = vec![
        block("Bunk1", "Seniors", 540, 600),
        block("Bunk1", "Seniors", 600, 660),
    ];

    let config = SolverConfig::default();
    let result = engine::solve_snapshot(&snapshot, &config).expect("solve should not error");

    let soccer_count = result.assignments.iter().filter(|a| a.activity.as_deref() == Some("Soccer")).count();
    assert!(soccer_count <= 1, "bunk must not repeat the same activity twice in a day, got {soccer_count}");
}

#[test]
fn capacity_one_field_never_double_booked_same_interval() {
    // Force both bunks to want the same single-capacity field by narrowing
    // the candidate set: only Field A hosts both Soccer and Basketball.
    let mut snapshot = small_snapshot();
    snapshot.fields = vec![field("Field A", 1, SharingMode::NotSharable, &["Soccer", "Basketball"])];

    let config = SolverConfig::default();
    let result = engine::solve_snapshot(&snapshot, &config).expect("solve should not error");

    let both_on_field_a = result
        .assignments
        .iter()
        .filter(|a| a.field.as_deref() == Some("Field A"))
        .count();
    assert!(both_on_field_a <= 1, "capacity-1 field must host at most one bunk per overlapping interval");
}

#[test]
fn rotation_history_forbids_activity_already_done_today() {
    let mut snapshot = small_snapshot();
    snapshot.rotation_history.push(engine::snapshot::RawBunkHistory {
        bunk: "Bunk1".into(),
        days_since_last: HashMap::new(),
        season_count: HashMap::new(),
        done_today: vec!["Soccer".into()],
        max_usage_reached: Vec::new(),
        field_usage_so_far: HashMap::new(),
        activity_usage_so_far: HashMap::new(),
    });

    let config = SolverConfig::default();
    let result = engine::solve_snapshot(&snapshot, &config).expect("solve should not error");

    let bunk1 = result.assignments.iter().find(|a| a.bunk == "Bunk1").expect("Bunk1 assignment present");
    assert_ne!(bunk1.activity.as_deref(), Some("Soccer"), "rotation history must forbid a same-day repeat");
}

#[test]
fn field_lock_forbids_all_use_during_its_interval() {
    let mut snapshot = small_snapshot();
    snapshot.locks.push(engine::snapshot::RawLock {
        field: "Field A".into(),
        allowed_division: Some("Nonexistent".into()),
        start_min: 0,
        end_min: 24 * 60,
    });

    let config = SolverConfig::default();
    let result = engine::solve_snapshot(&snapshot, &config).expect("solve should not error");

    let on_field_a = result.assignments.iter().filter(|a| a.field.as_deref() == Some("Field A")).count();
    assert_eq!(on_field_a, 0, "a locked field must never receive a commit during its locked interval");
}

#[test]
fn cross_division_sharing_mode_forbids_two_divisions_on_one_field() {
    let snapshot = InboundSnapshot {
        divisions: vec![division("Seniors", &["SBunk"]), division("Juniors", &["JBunk"])],
        bunks: vec![bunk("SBunk", "Seniors", 10), bunk("JBunk", "Juniors", 10)],
        fields: vec![field("Field A", 2, SharingMode::SameDivision, &["Soccer"])],
        activities: vec![sport("Soccer")],
        blocks: vec![block("SBunk", "Seniors", 540, 600), block("JBunk", "Juniors", 540, 600)],
        locks: Vec::new(),
        skeleton: Vec::new(),
        rotation_history: Vec::new(),
        time_constrained_threshold_min: None,
    };

    let config = SolverConfig::default();
    let result = engine::solve_snapshot(&snapshot, &config).expect("solve should not error");

    let on_field_a: Vec<_> = result.assignments.iter().filter(|a| a.field.as_deref() == Some("Field A")).collect();
    assert!(on_field_a.len() <= 1, "a division-local field must not host two divisions at once even with spare capacity: {on_field_a:?}");
}

#[test]
fn augmenting_path_finds_full_matching_when_greedy_assignment_would_strand_a_bunk() {
    // Field Two is exclusive to division "C"; Bunk A and Bunk B (division
    // "AB") can only ever land on Field One. A matcher that commits Bunk C to
    // Field One on sight (instead of recognizing Field Two as its only other
    // option) strands both Bunk A and Bunk B, even though reassigning Bunk C
    // to Field Two still lets one of them through.
    let snapshot = InboundSnapshot {
        divisions: vec![division("AB", &["BunkA", "BunkB"]), division("C", &["BunkC"])],
        bunks: vec![bunk("BunkA", "AB", 10), bunk("BunkB", "AB", 10), bunk("BunkC", "C", 10)],
        fields: vec![
            field("Field One", 1, SharingMode::All, &["Soccer"]),
            field_with_prefs("Field Two", 1, SharingMode::All, &["Soccer"], &["C"]),
        ],
        activities: vec![sport("Soccer")],
        blocks: vec![
            block("BunkA", "AB", 540, 600),
            block("BunkB", "AB", 540, 600),
            block("BunkC", "C", 540, 600),
        ],
        locks: Vec::new(),
        skeleton: Vec::new(),
        rotation_history: Vec::new(),
        time_constrained_threshold_min: None,
    };

    let config = SolverConfig::default();
    let result = engine::solve_snapshot(&snapshot, &config).expect("solve should not error");

    let assigned = result.assignments.iter().filter(|a| a.field.is_some()).count();
    assert_eq!(assigned, 2, "an augmenting reassignment should still seat two of the three bunks: {:?}", result.assignments);
}

#[test]
fn post_edit_repair_pins_a_cell_and_resolves_the_conflict_it_creates() {
    let snapshot = small_snapshot();
    let config = SolverConfig::default();
    let catalog = engine::snapshot::build_catalog(&snapshot, 480).expect("catalog should build");
    let history = engine::snapshot::build_rotation_history(&snapshot, &catalog);
    let oracle = engine::ReferenceRotationOracle::new(history, HashMap::new());
    let catalog = std::rc::Rc::new(catalog);

    let bunk1 = catalog.bunks.iter().find(|b| b.name == "Bunk1").unwrap().id;
    let bunk2 = catalog.bunks.iter().find(|b| b.name == "Bunk2").unwrap().id;
    let field_a = catalog.field_by_name["Field A"];
    let field_b = catalog.field_by_name["Field B"];
    let soccer = catalog.activities.iter().find(|a| a.name == "Soccer").unwrap().id;
    let basketball = catalog.activities.iter().find(|a| a.name == "Basketball").unwrap().id;

    let block_bunk1 = catalog.blocks_by_bunk[&bunk1][0];
    let block_bunk2 = catalog.blocks_by_bunk[&bunk2][0];

    // Simulate a prior solve: Bunk1 on Field A doing Soccer, Bunk2 on Field B
    // doing Basketball.
    let mut schedule = vec![engine::model::Assignment::Free; catalog.blocks.len()];
    schedule[block_bunk1] = engine::model::Assignment::Assigned {
        pick: engine::model::Pick { field: field_a, activity: soccer, kind: engine::model::ActivityKind::Sport },
        cost: 0,
    };
    schedule[block_bunk2] = engine::model::Assignment::Assigned {
        pick: engine::model::Pick { field: field_b, activity: basketball, kind: engine::model::ActivityKind::Sport },
        cost: 0,
    };

    let mut ctx = engine::repair::rehydrate_context(std::rc::Rc::clone(&catalog), std::rc::Rc::new(oracle), &schedule);

    // A human pins Bunk1 onto Field B doing Basketball, displacing Bunk2.
    let request = engine::repair::RepairRequest {
        pinned_bunk: bunk1,
        pinned_slots: vec![9],
        pinned_field: field_b,
        pinned_activity: basketball,
        conflict_list: vec![block_bunk2],
        bypass_mode: false,
    };
    let result = engine::repair::repair(&mut ctx, &config, &request);

    assert!(result.failed.is_empty(), "the displaced bunk should find a free field: {:?}", result.failed);
    assert_eq!(result.reassigned, vec![block_bunk2]);

    match ctx.schedule[block_bunk1] {
        engine::model::Assignment::Assigned { pick, .. } => {
            assert_eq!(pick.field, field_b);
            assert_eq!(pick.activity, basketball);
        }
        other => panic!("pinned block must stay assigned, got {other:?}"),
    }
    match ctx.schedule[block_bunk2] {
        engine::model::Assignment::Assigned { pick, .. } => {
            assert_ne!(pick.field, field_b, "the displaced bunk must not land back on the pinned field");
        }
        other => panic!("conflict block should have been reassigned, got {other:?}"),
    }
}
