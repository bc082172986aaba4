mod util;
use pvld_reader::prelude::*;
use util::*;

/// Four solids with 2, 0, 3 and 1 history variables, split into two blocks.
fn history_store() -> InMemoryStore {
    let mut s = store(1);
    add_nodes(&mut s, &(1..=11).collect::<Vec<_>>());
    let conn: Vec<i64> = (0..4).flat_map(|e| (e + 1)..=(e + 8)).collect();
    add_elements(&mut s, ElementClass::Solid, &conn, Some(&[1, 1, 1, 1]));
    add_history(
        &mut s,
        ElementClass::Solid,
        &[2, 0, 3, 1],
        &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
    );
    s
}

#[test]
fn element_variable_rows_follow_the_block() {
    let mut s = ten_solids(2);
    let stress: Vec<f64> = (0..60).map(f64::from).collect();
    s.group_mut("Solid")
        .insert_floats("Stress", vec![10, 6], stress)
        .unwrap();
    let mut r = open(&s, equal(2));

    let d = r.read_block_data(ElementClass::Solid, 1, "Stress").unwrap();
    assert_eq!(d.dims, vec![5, 6]);
    assert_eq!(d.rows(), 5);
    assert_eq!(d.row_width(), 6);
    assert_eq!(d.row(0), &[30.0, 31.0, 32.0, 33.0, 34.0, 35.0]);

    let m = r.read_block_data(ElementClass::Solid, 0, "Material").unwrap();
    assert_eq!(m.values, vec![1.0; 5]);
}

#[test]
fn node_variables_are_gathered_through_the_block_map() {
    let s = ten_solids(2);
    let mut r = open(&s, ReaderConfig::default());
    let mesh = r.read_block_mesh(ElementClass::Solid, 2).unwrap();

    let t = r.read_block_data(ElementClass::Solid, 2, "Temperature").unwrap();
    assert_eq!(t.rows(), mesh.node_count());
    // element 2 touches raw nodes 3..=10
    assert_eq!(t.values, (3..=10).map(|i| i as f64 / 2.0).collect::<Vec<_>>());

    let idx = r.read_block_data(ElementClass::Solid, 2, "NodeIndex").unwrap();
    assert_eq!(idx.values, (3..=10).map(f64::from).collect::<Vec<_>>());

    let crd = r.read_block_data(ElementClass::Solid, 2, "Coordinate").unwrap();
    assert_eq!(crd.dims, vec![8, 3]);
    assert_eq!(crd.row(7), &xyz(10));
}

#[test]
fn history_variables_are_zero_filled() {
    let mut r = open(&history_store(), equal(2));

    let h = r.read_block_history(ElementClass::Solid, 0, 0).unwrap();
    assert_eq!(h.values, vec![1.0, 0.0]);
    let h = r.read_block_history(ElementClass::Solid, 0, 1).unwrap();
    assert_eq!(h.values, vec![2.0, 0.0]);
    let h = r.read_block_history(ElementClass::Solid, 1, 0).unwrap();
    assert_eq!(h.values, vec![3.0, 6.0]);
    let h = r.read_block_history(ElementClass::Solid, 1, 2).unwrap();
    assert_eq!(h.dims, vec![2]);
    assert_eq!(h.values, vec![5.0, 0.0]);
    let h = r.read_block_history(ElementClass::Solid, 1, 7).unwrap();
    assert_eq!(h.values, vec![0.0, 0.0]);
}

#[test]
fn history_names_resolve_to_one_based_variables() {
    let mut r = open(&history_store(), equal(2));
    let by_name = r
        .read_block_data(ElementClass::Solid, 1, "HistoryVariable_2")
        .unwrap();
    assert_eq!(by_name.values, vec![4.0, 0.0]);
    assert_eq!(by_name, r.read_block_history(ElementClass::Solid, 1, 1).unwrap());

    for bad in ["HistoryVariable_0", "HistoryVariable", "HistoryVariable_x"] {
        let err = r.read_block_data(ElementClass::Solid, 0, bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownVariable, "{bad}");
    }
}

#[test]
fn short_history_values_are_inconsistent() {
    let mut s = history_store();
    s.group_mut("Solid")
        .insert_floats("HistoryVariable", vec![4], vec![1.0, 2.0, 3.0, 4.0])
        .unwrap();
    let mut r = open(&s, equal(2));
    assert!(r.read_block_history(ElementClass::Solid, 0, 0).is_ok());
    let err = r.read_block_history(ElementClass::Solid, 1, 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InconsistentMetadata);
}

#[test]
fn history_without_counts_is_a_missing_dataset() {
    let s = ten_solids(2);
    let mut r = open(&s, ReaderConfig::default());
    let err = r.read_block_history(ElementClass::Solid, 0, 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingDataset);
}

#[test]
fn unknown_variable_names_the_class() {
    let s = ten_solids(2);
    let mut r = open(&s, ReaderConfig::default());
    let err = r.read_block_data(ElementClass::Solid, 0, "Pressure").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownVariable);
    assert!(err.to_string().contains("Failure in read_block_data(Solid, 0, Pressure)"));
}

#[test]
fn block_materials_use_stored_ids_or_the_sentinel() {
    let s = ten_solids(2);
    let mut r = open(&s, equal(2));
    assert_eq!(r.read_block_material(ElementClass::Solid, 0).unwrap(), vec![1; 5]);
    assert_eq!(r.read_block_material(ElementClass::Solid, 1).unwrap(), vec![2; 5]);

    let mut s = store(2);
    add_nodes(&mut s, &[1, 2, 3]);
    add_elements(&mut s, ElementClass::Beam, &[1, 2, 2, 3], None);
    let mut r = open(&s, equal(1).with_missing_parts(false));
    assert_eq!(r.materials().unknown_material(), 3);
    assert_eq!(r.read_block_material(ElementClass::Beam, 0).unwrap(), vec![3, 3]);
}

#[test]
fn variable_names_list_every_resolvable_name() {
    let names = {
        let mut r = open(&history_store(), ReaderConfig::default());
        r.variable_names(ElementClass::Solid).unwrap()
    };
    for expected in [
        "Nodes",
        "Material",
        "NumberOfHistoryVariables",
        "NodeIndex",
        "Coordinate",
        "Temperature",
        "HistoryVariable_1",
        "HistoryVariable_3",
    ] {
        assert!(names.iter().any(|n| n == expected), "{expected} in {names:?}");
    }
    assert!(!names.iter().any(|n| n == "HistoryVariable" || n == "HistoryVariable_4"));
}

#[test]
fn general_metadata_is_exposed() {
    let r = open(&ten_solids(2), ReaderConfig::default());
    let g = r.general();
    assert_eq!(g.sim_time, 1.5);
    assert_eq!(g.cycle, 42);
    assert_eq!(g.num_materials, 2);
    assert_eq!(g.title.as_deref(), Some("sled test"));
    assert_eq!(r.materials().titles(), &["Part 1", "Part 2", "Unknown"]);
}

#[test]
fn short_node_dataset_is_inconsistent() {
    let mut s = store(0);
    add_nodes(&mut s, &[1, 2, 3]);
    s.group_mut("Node")
        .insert_floats("Velocity", vec![2], vec![0.5, 1.5])
        .unwrap();
    add_elements(&mut s, ElementClass::Beam, &[1, 3], None);
    let mut r = open(&s, equal(1));

    let err = r
        .read_block_data(ElementClass::Beam, 0, "Velocity")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InconsistentMetadata);
    assert!(err.to_string().starts_with("Failure in read_block_data(Beam, 0, Velocity)"));
}

#[test]
fn variable_names_agree_across_ranks() {
    let s = history_store();
    let comms = ThreadComm::group(2);
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                let s = s.clone();
                scope.spawn(move || {
                    let mut r = PvldReader::builder(SharedStore(s))
                        .comm(comm)
                        .config(equal(2))
                        .open()
                        .unwrap();
                    let first = r.variable_names(ElementClass::Solid).unwrap();
                    // the history counts are cached, so no second collective read happens
                    let again = r.variable_names(ElementClass::Solid).unwrap();
                    assert_eq!(first, again);
                    let rank = r.comm().rank();
                    let h = r.read_block_history(ElementClass::Solid, rank, 0).unwrap();
                    (first, h.values)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(results[0].0, results[1].0);
    assert!(results[0].0.iter().any(|n| n == "HistoryVariable_3"));
    assert_eq!(results[0].1, vec![1.0, 0.0]);
    assert_eq!(results[1].1, vec![3.0, 6.0]);
}
