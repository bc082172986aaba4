mod util;
use pvld_reader::io::Attribute;
use pvld_reader::io::memory::MemoryGroup;
use pvld_reader::prelude::*;
use pvld_reader::reader::PARTITION_ENV;
use serial_test::serial;
use util::*;

fn with_partition_env<T>(value: Option<&str>, f: impl FnOnce() -> T) -> T {
    // SAFETY: every test touching the variable runs under #[serial]
    unsafe {
        match value {
            Some(v) => std::env::set_var(PARTITION_ENV, v),
            None => std::env::remove_var(PARTITION_ENV),
        }
    }
    let out = f();
    unsafe { std::env::remove_var(PARTITION_ENV) };
    out
}

#[test]
#[serial]
fn env_block_count_overrides_default() {
    let s = ten_solids(2);
    let r = with_partition_env(Some("3"), || open(&s, ReaderConfig::from_env()));
    assert_eq!(r.block_count(ElementClass::Solid), 3);
    assert_eq!(r.element_range(ElementClass::Solid, 0), 0..4);
    assert_eq!(r.element_range(ElementClass::Solid, 2), 7..10);
}

#[test]
#[serial]
fn non_positive_env_selects_stored_partition() {
    let s = ten_solids(2);
    let r = with_partition_env(Some("0"), || open(&s, ReaderConfig::from_env()));
    assert_eq!(r.config().partition, PartitionStrategy::Stored);
    // no stored partition: the whole class is one block
    assert_eq!(r.block_count(ElementClass::Solid), 1);
}

#[test]
#[serial]
fn unset_env_uses_default_block_count() {
    let cfg = with_partition_env(None, ReaderConfig::from_env);
    assert_eq!(cfg, ReaderConfig::default());
}

#[test]
fn json_files_open_lazily_and_reopen_after_free() {
    let path = std::env::temp_dir().join(format!("pvld-reader-{}.json", std::process::id()));
    let s = ten_solids(2);
    s.to_json_writer(std::fs::File::create(&path).unwrap())
        .unwrap();

    let mut r = PvldReader::builder(JsonFileOpener::new(&path))
        .config(equal(2))
        .open()
        .unwrap();
    assert!(r.is_file_open());
    let before = r.read_block_mesh(ElementClass::Solid, 1).unwrap();

    r.free_resources();
    assert!(!r.is_file_open());
    let after = r.read_block_mesh(ElementClass::Solid, 1).unwrap();
    assert!(r.is_file_open());
    assert_eq!(before, after);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn close_file_keeps_metadata() {
    let mut r = open(&ten_solids(2), equal(2));
    r.close_file();
    assert!(!r.is_file_open());
    assert_eq!(r.block_count(ElementClass::Solid), 2);
    assert_eq!(r.materials().num_materials(), 2);
    assert_eq!(r.read_block_material(ElementClass::Solid, 1).unwrap(), vec![2; 5]);
}

#[test]
fn missing_json_file_is_an_io_error() {
    let err = PvldReader::builder(JsonFileOpener::new("/nonexistent/plot.json"))
        .open()
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn missing_general_group_fails_in_toc() {
    let err = PvldReader::builder(SharedStore(InMemoryStore::new()))
        .open()
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::MissingGroup);
    assert!(err.to_string().starts_with("Failure in read_toc()"));
}

#[test]
fn class_group_without_count_fails_in_toc() {
    let mut s = store(0);
    add_nodes(&mut s, &[1, 2]);
    s.group_mut("Beam")
        .insert_ints("Nodes", vec![1, 2], vec![1, 2])
        .unwrap();
    let err = PvldReader::builder(SharedStore(s))
        .open()
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::MissingAttribute);
    assert!(err.to_string().starts_with("Failure in read_toc()"));
}

#[test]
fn general_group_without_material_count_fails_in_toc() {
    let mut s = ten_solids(2);
    let mut general = MemoryGroup::default();
    general.set_attribute("SimuTime", Attribute::Float(0.0));
    general.set_attribute("Ncycles", Attribute::Int(0));
    *s.group_mut("General") = general;
    let err = PvldReader::builder(SharedStore(s))
        .open()
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::MissingAttribute);
    assert!(err.to_string().contains("NumMaterials"));
}
