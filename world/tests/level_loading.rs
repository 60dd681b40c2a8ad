mod common;

use blockwarp_core::{
    CellKind, Command, Coord, Event, GridId, GridView, LevelError, Occupant, OccupantKind,
};
use blockwarp_world::{apply, export_level, load_level, parse_legend, parse_level, query, World};
use common::{floored, legend, level, load, upper, with_block_id, with_target, with_teleporter};

const LEGEND: &str = r##"{
    "codeToType": {
        ".": "none", "_": "floor", "#": "wall", "P": "player",
        "B": "pushable", "L": "pullable", "T": "target", "O": "teleporter"
    },
    "typeToCode": {
        "none": ".", "floor": "_", "wall": "#", "player": "P",
        "pushable": "B", "pullable": "L", "target": "T", "teleporter": "O"
    }
}"##;

const LEVEL: &str = r##"{
    "grids": [
        {
            "gridID": "A",
            "gridTitle": "Atrium",
            "gridSize": { "height": 2, "columns": 3, "rows": 2 },
            "layers": [
                { "layout": ["___", "___"] },
                {
                    "layout": ["#T.", "PBO"],
                    "targets": [{ "position": [2, 2], "directions": "111111", "id": "red" }],
                    "blocks": [{ "position": [2, 1], "id": "red" }],
                    "teleporters": [{
                        "position": [3, 1],
                        "directions": "111111",
                        "targetGridID": "B",
                        "targetGridPosition": [2, 1, 1]
                    }]
                }
            ]
        },
        {
            "gridID": "B",
            "gridTitle": "Basement",
            "gridSize": { "height": 2, "columns": 1, "rows": 1 },
            "layers": [{ "layout": ["_"] }, { "layout": ["."] }]
        }
    ]
}"##;

fn load_json() -> (World, Vec<Event>) {
    let legend = parse_legend(LEGEND).expect("legend parses");
    let document = parse_level(LEVEL).expect("level parses");
    let mut world = World::new();
    let mut events = Vec::new();
    let _ = load_level(&mut world, &document, &legend, &mut events).expect("level loads");
    (world, events)
}

#[test]
fn json_level_loads_with_metadata() {
    let (world, events) = load_json();

    assert_eq!(
        events,
        vec![Event::LevelLoaded {
            grid_count: 2,
            active: GridId::from("A"),
        }]
    );
    let grid = query::grid(&world, &GridId::from("A")).expect("grid A");
    assert_eq!(grid.title(), "Atrium");

    // The first layout string is the highest row.
    assert_eq!(
        grid.occupant(upper(0, 1)).map(Occupant::kind),
        Some(OccupantKind::Wall)
    );
    assert_eq!(grid.player(), Some(upper(0, 0)));
    let block = grid.occupant(upper(1, 0)).expect("block present");
    assert_eq!(block.label().map(|label| label.as_str()), Some("red"));

    let target = grid
        .overlay(upper(1, 1))
        .and_then(|overlay| overlay.as_target())
        .expect("target present");
    assert_eq!(target.required().map(|label| label.as_str()), Some("red"));

    let teleporter = grid.teleporter(upper(2, 0)).expect("teleporter present");
    assert_eq!(teleporter.destination().grid(), &GridId::from("B"));
    assert_eq!(teleporter.destination().coord(), upper(0, 0));
    assert!(teleporter.is_usable());
    assert_eq!(query::teleporters(&world).count(), 1);
    assert_eq!(
        query::grid_size(&world, &GridId::from("B")).map(|size| size.columns()),
        Some(1)
    );
}

#[test]
fn export_reproduces_the_loaded_document() {
    let (world, _) = load_json();
    let legend = parse_legend(LEGEND).expect("legend parses");

    let exported = export_level(&world, &legend).expect("level exports");

    assert_eq!(exported, parse_level(LEVEL).expect("level parses"));
}

#[test]
fn malformed_json_reports_the_failing_path() {
    let error = parse_level(r#"{ "grids": [{ "gridID": "A", "gridSize": { "height": 1 } }] }"#)
        .expect_err("missing fields rejected");
    match error {
        LevelError::InvalidLevelDocument(message) => {
            assert!(message.contains("grids[0]"), "message was {message}");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn unknown_legend_kind_is_rejected() {
    assert_eq!(
        parse_legend(r#"{ "codeToType": { "~": "water" } }"#),
        Err(LevelError::UnknownKind("water".to_owned()))
    );
}

#[test]
fn missing_symbol_aborts_and_keeps_the_previous_level() {
    let (mut world, _, _) = load(&level(vec![floored("A", &["P."])]));
    let broken = level(vec![floored("Z", &["P?"])]);
    let mut events = Vec::new();

    let result = load_level(&mut world, &broken, &legend(), &mut events);

    assert_eq!(
        result,
        Err(LevelError::LegendMissing {
            symbol: '?',
            grid: GridId::from("Z"),
            coord: upper(1, 0),
        })
    );
    assert!(events.is_empty());
    assert_eq!(query::active_grid_id(&world), Some(&GridId::from("A")));
    assert!(query::player(&world).is_some());
}

#[test]
fn second_player_anywhere_fails_the_load() {
    let document = level(vec![floored("A", &["P."]), floored("B", &[".P"])]);
    let mut world = World::new();
    let mut events = Vec::new();

    assert_eq!(
        load_level(&mut world, &document, &legend(), &mut events),
        Err(LevelError::DuplicatePlayer {
            grid: GridId::from("B"),
            coord: upper(1, 0),
        })
    );
    assert!(!query::is_loaded(&world));
}

#[test]
fn structural_mistakes_are_invalid_documents() {
    let mut short_row = floored("A", &["P.."]);
    short_row.layers[1].layout[0] = "P.".to_owned();

    let mut missing_layer = floored("A", &["P."]);
    let _ = missing_layer.layers.pop();

    let mut bad_directions = with_target(floored("A", &["PT"]), 2, 1, None);
    bad_directions.layers[1].targets[0].directions = "1111".to_owned();

    let outside_metadata = with_block_id(floored("A", &["PB"]), 5, 1, "red");

    let mut zero_rows = floored("A", &["P"]);
    zero_rows.size.rows = 0;

    let cases = vec![
        ("short row", level(vec![short_row])),
        ("missing layer", level(vec![missing_layer])),
        ("bad directions", level(vec![bad_directions])),
        ("metadata outside grid", level(vec![outside_metadata])),
        ("zero rows", level(vec![zero_rows])),
        (
            "duplicate id",
            level(vec![floored("A", &["P"]), floored("A", &["."])]),
        ),
        ("no grids", level(Vec::new())),
    ];

    for (name, document) in cases {
        let mut world = World::new();
        let mut events = Vec::new();
        let result = load_level(&mut world, &document, &legend(), &mut events);
        assert!(
            matches!(result, Err(LevelError::InvalidLevelDocument(_))),
            "{name}: {result:?}"
        );
    }
}

#[test]
fn metadata_without_matching_entity_is_skipped() {
    let grid = with_teleporter(
        with_block_id(with_target(floored("A", &["P._"]), 2, 1, Some("red")), 3, 1, "red"),
        2,
        1,
        "A",
        [2, 1, 1],
    );
    let (world, report, _) = load(&level(vec![grid]));

    assert_eq!(report.teleporters, 0);
    assert_eq!(query::grid(&world, &GridId::from("A")).map(|grid| grid.overlays().count()), Some(0));
    assert_eq!(
        query::occupant(&world, &GridId::from("A"), upper(2, 0)),
        Some(&Occupant::Floor)
    );
}

#[test]
fn reloading_replaces_and_unloading_releases() {
    let (mut world, _, _) = load(&level(vec![floored("A", &["P."])]));
    let mut events = Vec::new();

    let _ = load_level(
        &mut world,
        &level(vec![floored("B", &[".P"])]),
        &legend(),
        &mut events,
    )
    .expect("second level loads");
    assert_eq!(
        events,
        vec![
            Event::LevelUnloaded,
            Event::LevelLoaded {
                grid_count: 1,
                active: GridId::from("B"),
            },
        ]
    );
    assert!(query::grid(&world, &GridId::from("A")).is_none());

    events.clear();
    apply(&mut world, Command::UnloadLevel, &mut events);
    assert_eq!(events, vec![Event::LevelUnloaded]);
    assert!(!query::is_loaded(&world));
    assert!(query::active_grid(&world).is_none());
}

#[test]
fn player_grid_starts_active() {
    let (world, report, _) = load(&level(vec![floored("A", &[".."]), floored("B", &["P."])]));
    assert!(report.has_player);
    assert!(report.solved, "a level without targets is solved");
    assert_eq!(query::active_grid_id(&world), Some(&GridId::from("B")));
}

#[test]
fn export_needs_a_symbol_for_every_kind() {
    let (world, _, _) = load(&level(vec![floored("A", &["P."])]));
    let sparse = legend_without_player();

    assert!(matches!(
        export_level(&world, &sparse),
        Err(LevelError::InvalidLegend(_))
    ));
}

fn legend_without_player() -> blockwarp_core::Legend {
    blockwarp_core::Legend::new()
        .with_symbol('.', CellKind::Empty)
        .with_symbol('_', CellKind::Occupant(OccupantKind::Floor))
}

#[test]
fn grid_coordinates_are_bounded() {
    let (world, _, _) = load(&level(vec![floored("A", &["P."])]));
    let grid = query::active_grid(&world).expect("active grid");
    assert!(grid.in_bounds(Coord::new(1, 1, 0)));
    assert!(!grid.in_bounds(Coord::new(2, 0, 0)));
}

#[test]
fn oversized_declaration_without_layout_is_rejected() {
    let document = parse_level(
        r#"{ "grids": [{
            "gridID": "A",
            "gridSize": { "height": 1, "columns": 200000, "rows": 200000 },
            "layers": [{ "layout": [] }]
        }] }"#,
    )
    .expect("document parses");
    let (mut world, _, _) = load(&level(vec![floored("B", &["P."])]));
    let mut events = Vec::new();

    let result = load_level(&mut world, &document, &legend(), &mut events);

    assert!(
        matches!(result, Err(LevelError::InvalidLevelDocument(_))),
        "{result:?}"
    );
    assert!(events.is_empty());
    assert_eq!(query::active_grid_id(&world), Some(&GridId::from("B")));
}
