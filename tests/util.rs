#![allow(dead_code)]
use pvld_reader::io::Attribute;
use pvld_reader::io::memory::InMemoryStore;
use pvld_reader::prelude::*;

pub type MemReader<C = NoComm> = PvldReader<SharedStore<InMemoryStore>, C>;

/// Store with a `General` group declaring `nmmat` materials.
pub fn store(nmmat: i64) -> InMemoryStore {
    let mut s = InMemoryStore::new();
    s.group_mut("General")
        .set_attribute("SimuTime", Attribute::Float(1.5))
        .set_attribute("Ncycles", Attribute::Int(42))
        .set_attribute("NumMaterials", Attribute::Int(nmmat))
        .set_attribute("Title", Attribute::Text("sled test".into()));
    s
}

/// Coordinates of raw node `id`.
pub fn xyz(id: i64) -> [f64; 3] {
    let x = id as f64;
    [x, 10.0 * x, 100.0 * x]
}

/// `Node` group with `Index`, `Coordinate` and a scalar `Temperature = id / 2`.
pub fn add_nodes(s: &mut InMemoryStore, ids: &[i64]) {
    let n = ids.len();
    let g = s.group_mut("Node");
    g.set_attribute("number", Attribute::Int(n as i64));
    g.insert_ints("Index", vec![n], ids.to_vec()).unwrap();
    g.insert_floats("Coordinate", vec![n, 3], ids.iter().flat_map(|&i| xyz(i)).collect())
        .unwrap();
    g.insert_floats("Temperature", vec![n], ids.iter().map(|&i| i as f64 / 2.0).collect())
        .unwrap();
}

/// Element group of `class` with raw connectivity and optional material ids.
pub fn add_elements(
    s: &mut InMemoryStore,
    class: ElementClass,
    conn: &[i64],
    materials: Option<&[i64]>,
) {
    let arity = class.arity();
    let n = conn.len() / arity;
    let g = s.group_mut(class.group_name());
    g.set_attribute("number", Attribute::Int(n as i64));
    g.insert_ints("Nodes", vec![n, arity], conn.to_vec()).unwrap();
    if let Some(m) = materials {
        g.insert_ints("Material", vec![n], m.to_vec()).unwrap();
    }
}

/// Per-element history counts plus the flat value array.
pub fn add_history(s: &mut InMemoryStore, class: ElementClass, counts: &[i64], values: &[f64]) {
    let g = s.group_mut(class.group_name());
    g.insert_ints("NumberOfHistoryVariables", vec![counts.len()], counts.to_vec())
        .unwrap();
    g.insert_floats("HistoryVariable", vec![values.len()], values.to_vec())
        .unwrap();
}

/// Ten hexahedra; element `e` uses raw nodes `e+1 ..= e+8`, out of nodes `1..=17`.
/// Elements 0..5 use material 1, the rest material 2.
pub fn ten_solids(nmmat: i64) -> InMemoryStore {
    let mut s = store(nmmat);
    add_nodes(&mut s, &(1..=17).collect::<Vec<_>>());
    let conn: Vec<i64> = (0..10).flat_map(|e| (e + 1)..=(e + 8)).collect();
    let mats: Vec<i64> = (0..10).map(|e| if e < 5 { 1 } else { 2 }).collect();
    add_elements(&mut s, ElementClass::Solid, &conn, Some(&mats));
    s
}

pub fn open(s: &InMemoryStore, config: ReaderConfig) -> MemReader {
    PvldReader::builder(SharedStore(s.clone()))
        .config(config)
        .open()
        .unwrap()
}

pub fn equal(n: usize) -> ReaderConfig {
    ReaderConfig::default().with_partition(PartitionStrategy::Equal(n))
}
