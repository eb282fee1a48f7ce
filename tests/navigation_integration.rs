use nav_graph::{GraphStore, Interaction, NavKey, NavKind, NavigationModel, Trace};
use std::collections::HashSet;

fn open_row(trace_id: &str, row: usize, api: &str) -> Trace {
    Trace::new(trace_id)
        .with(Interaction::LocationChange {
            url: "https://app.test/items".into(),
        })
        .with(Interaction::Click {
            xpath: format!("/html/body/table/tr[{}]/td/a", row),
            text: "Open".into(),
        })
        .with(Interaction::Effect {
            added: vec![
                "/html/body/div/section/h2".into(),
                "/html/body/div/section/p".into(),
            ],
        })
        .with(Interaction::ApiCall {
            path: api.into(),
            method: "get".into(),
        })
}

fn location_id(model: &NavigationModel, path: &str) -> nav_graph::NodeId {
    model
        .find_node(&NavKey::Location { path: path.into() })
        .unwrap()
        .unwrap()
        .id
}

#[test]
fn test_converging_traces_collapse() {
    let mut model = NavigationModel::in_memory();
    model
        .ingest_all(&[
            open_row("t1", 1, "/api/items/17"),
            open_row("t2", 2, "/api/items/42"),
        ])
        .unwrap();

    let start = location_id(&model, "/items");
    let collapse = model.run_collapse_pass(start).unwrap().expect("collapse");

    let api = model
        .find_node(&NavKey::Api {
            path_template: "/api/items/{id}".into(),
            method: "GET".into(),
        })
        .unwrap()
        .unwrap();
    assert_eq!(collapse.start, start);
    assert_eq!(collapse.end, api.id);
    assert_eq!(collapse.instances.len(), 2);
    assert_eq!(collapse.len(), 3);
}

#[test]
fn test_different_endpoints_do_not_collapse() {
    let mut model = NavigationModel::in_memory();
    model
        .ingest_all(&[
            open_row("t1", 1, "/api/items/17"),
            open_row("t2", 2, "/api/users/42"),
        ])
        .unwrap();

    let start = location_id(&model, "/items");
    assert!(model.run_collapse_pass(start).unwrap().is_none());
}

#[test]
fn test_collapsed_graph_gives_generalized_instruction() {
    let mut model = NavigationModel::in_memory();
    let resolved = model
        .ingest_all(&[
            open_row("t1", 1, "/api/items/17"),
            open_row("t2", 2, "/api/items/42"),
            open_row("t3", 3, "/api/items/99"),
        ])
        .unwrap();
    let before = model.store().len().unwrap();

    let start = location_id(&model, "/items");
    let collapse = model.run_collapse_pass(start).unwrap().unwrap();
    let merged = model.apply_collapse(&collapse).unwrap();

    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].kind(), NavKind::Click);
    assert_eq!(merged[1].kind(), NavKind::Effect);
    assert_eq!(model.store().len().unwrap(), before - 4);
    assert!(model.run_collapse_pass(start).unwrap().is_none());

    let end = resolved[0].node_ids()[3];
    let mut path = model.construct_path(start, end).unwrap();
    assert_eq!(path.len(), 3);

    let step = path.next_instruction().unwrap();
    assert_eq!(step.kind, NavKind::Click);
    assert_eq!(step.xpath, "/html/body/table/tr/td/a");
    assert_eq!(step.text.as_deref(), Some("Open"));
    assert!(path.next_instruction().is_none());
}

#[test]
fn test_all_paths_through_diamond() {
    let model = NavigationModel::in_memory();
    let via = |id: &str, middle: &str| {
        Trace::new(id)
            .with(Interaction::LocationChange { url: "/a".into() })
            .with(Interaction::LocationChange { url: middle.into() })
            .with(Interaction::LocationChange { url: "/c".into() })
    };
    model.ingest_all(&[via("t1", "/b"), via("t2", "/d")]).unwrap();

    let a = location_id(&model, "/a");
    let c = location_id(&model, "/c");

    let paths = model.all_paths(a, c).unwrap();
    assert_eq!(paths.len(), 2);
    for path in &paths {
        assert_eq!(path.len(), 2);
        let ids = path.node_ids();
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    let shortest = model.construct_path(a, c).unwrap();
    assert!(paths.iter().any(|p| p.node_ids() == shortest.node_ids()));

    let dag = model.dag_toward(a, c).unwrap();
    assert_eq!(dag.nodes.len(), 4);
    assert_eq!(dag.next_steps(a).len(), 2);
}

#[test]
fn test_concurrent_ingestion_keeps_every_instance() {
    let model = NavigationModel::in_memory();
    let traces: Vec<Trace> = (0..8)
        .map(|i| {
            Trace::new(format!("t{}", i))
                .with(Interaction::LocationChange { url: "/home".into() })
                .with(Interaction::Click {
                    xpath: "/html/body/nav/a".into(),
                    text: "Settings".into(),
                })
                .with(Interaction::LocationChange { url: "/settings".into() })
        })
        .collect();

    std::thread::scope(|scope| {
        for trace in &traces {
            let model = &model;
            scope.spawn(move || model.ingest(trace).unwrap());
        }
    });

    assert_eq!(model.trace_count(), 8);
    assert_eq!(model.store().len().unwrap(), 3);
    assert_eq!(model.store().edge_count().unwrap(), 2);

    let click = model
        .find_node(&NavKey::Click {
            xpath: "/html/body/nav/a".into(),
            text: "Settings".into(),
        })
        .unwrap()
        .unwrap();
    assert_eq!(click.instances.len(), 8);
}

#[test]
fn test_effects_after_location_merge() {
    let mut model = NavigationModel::in_memory();
    for (id, banner) in [("t1", "/html/body/div[1]"), ("t2", "/html/body/div[2]")] {
        let trace = Trace::new(id)
            .with(Interaction::LocationChange { url: "/dashboard".into() })
            .with(Interaction::Effect {
                added: vec![banner.into()],
            });
        model.ingest(&trace).unwrap();
    }

    let dashboard = location_id(&model, "/dashboard");
    // Trailing effects match on their predecessor alone
    assert_eq!(model.store().successors(dashboard).unwrap().len(), 1);
    assert!(model.merge_effects_after_location(dashboard).unwrap().is_none());
}

#[test]
fn test_snapshot_round_trip_through_json() {
    let model = NavigationModel::in_memory();
    model.ingest(&open_row("t1", 1, "/api/items/1")).unwrap();

    let json = serde_json::to_string(&model.snapshot().unwrap()).unwrap();
    let restored = NavigationModel::from_snapshot(serde_json::from_str(&json).unwrap()).unwrap();

    assert_eq!(restored.snapshot().unwrap(), model.snapshot().unwrap());
    assert_eq!(restored.store().edge_count().unwrap(), 3);
}
