//! End-to-end augmentation through on-disk store and snapshot files

use splitrandr::multimon::{fingerprint, MultiMonitorConfig, RecordKind, TopologyAugmenter};
use splitrandr::splits::{parse_blocks, SplitConfiguration, SplitStore, SplitTree};
use splitrandr::topology::{is_synthetic, strip, DisplaySource, SnapshotSource};
use tempfile::TempDir;

const EDID_HEX: &str = "00ffffffffffff0010ac";

const SNAPSHOT: &str = r#"{
  "topology": {
    "timestamp": 100,
    "config_timestamp": 90,
    "crtcs": [
      { "id": 62, "x": 0, "y": 0, "width": 1920, "height": 1080, "mode": 448,
        "rotation": 1, "rotations": 15, "outputs": [66], "possible": [66, 67] },
      { "id": 63, "x": 1920, "y": 0, "width": 3360, "height": 1050, "mode": 452,
        "rotation": 1, "rotations": 15, "outputs": [67], "possible": [66, 67] }
    ],
    "outputs": [
      { "id": 66, "name": "eDP-1", "crtc": 62, "mm_width": 344, "mm_height": 194,
        "connection": "connected", "crtcs": [62, 63], "modes": [448], "npreferred": 1 },
      { "id": 67, "name": "DP-1", "crtc": 63, "mm_width": 600, "mm_height": 340,
        "connection": "connected", "crtcs": [62, 63], "modes": [452], "npreferred": 1 }
    ],
    "modes": [
      { "id": 448, "width": 1920, "height": 1080, "dot_clock": 148500000,
        "h_total": 2200, "v_total": 1125, "name": "1920x1080" },
      { "id": 452, "width": 3360, "height": 1050, "dot_clock": 238560000,
        "h_total": 3520, "v_total": 1080, "name": "3360x1050" }
    ]
  },
  "properties": {
    "66": { "EDID": "00ffffffffffff004c2d" },
    "67": { "EDID": "00ffffffffffff0010ac" }
  }
}"#;

fn write_snapshot(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("snapshot.json");
    std::fs::write(&path, SNAPSHOT).unwrap();
    path
}

#[test]
fn test_snapshot_and_store_from_disk() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("config").join("fakexrandr.bin");

    let blocks = parse_blocks(&format!(
        "NAME=\"DP-1\"\nEDID={}\nWIDTH=3360\nHEIGHT=1050\nSPLITS=\"V 1680 N N\"\n",
        EDID_HEX
    ))
    .unwrap();
    let mut store = SplitStore::new();
    for block in &blocks {
        store.upsert(block.to_configuration());
    }
    store.save(&store_path).unwrap();

    let store = SplitStore::load(&store_path).unwrap();
    let source = SnapshotSource::load(write_snapshot(&dir)).unwrap();
    let physical = source.topology().unwrap();

    let augmenter = TopologyAugmenter::new(&store, MultiMonitorConfig::default());
    let augmented = augmenter.augment(&source, &physical).unwrap();

    let outputs: Vec<_> = augmented.outputs().collect();
    assert_eq!(outputs.len(), 3);
    assert_eq!(outputs[0].name, "eDP-1");
    assert_eq!(outputs[1].name, "DP-1~1");
    assert_eq!(outputs[2].name, "DP-1~2");

    for output in &outputs[1..] {
        assert!(is_synthetic(output.id));
        assert_eq!(strip(output.id), 67);
        assert_eq!((output.mm_width, output.mm_height), (300, 340));

        let crtc = augmented.crtc(output.crtc.unwrap()).unwrap();
        assert_eq!((crtc.width, crtc.height), (1680, 1050));
        assert_eq!(augmented.origin_of(RecordKind::Crtc, crtc.id), Some(63));

        let mode = augmented.mode(crtc.mode).unwrap();
        assert_eq!(mode.dot_clock, 238_560_000);
    }

    let xs: Vec<_> = outputs[1..]
        .iter()
        .map(|o| augmented.crtc(o.crtc.unwrap()).unwrap().x)
        .collect();
    assert_eq!(xs, vec![1920, 3600]);

    assert_eq!(augmented.crtc_count(), 4);
    assert_eq!(augmented.mode_count(), 4);

    let released = augmented.release();
    assert_eq!(released.outputs.len(), 2);
    assert_eq!(released.crtcs.len(), 2);
    assert_eq!(released.modes.len(), 2);
}

#[test]
fn test_corrupt_record_does_not_affect_others() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("fakexrandr.bin");

    let mut broken = SplitConfiguration::new(
        "eDP-1",
        "00ffffffffffff004c2d",
        1920,
        1080,
        &SplitTree::Leaf,
    );
    broken.program = b"Z".to_vec();

    let mut store = SplitStore::new();
    store.upsert(broken);
    store.upsert(SplitConfiguration::new(
        "DP-1",
        EDID_HEX,
        3360,
        1050,
        &"H 525 N N".parse().unwrap(),
    ));
    store.save(&store_path).unwrap();

    let store = SplitStore::load(&store_path).unwrap();
    assert_eq!(store.len(), 2);

    let source = SnapshotSource::load(write_snapshot(&dir)).unwrap();
    let physical = source.topology().unwrap();
    let augmenter = TopologyAugmenter::new(&store, MultiMonitorConfig::default());
    let augmented = augmenter.augment(&source, &physical).unwrap();

    let names: Vec<_> = augmented.outputs().map(|o| o.name.clone()).collect();
    assert_eq!(names, vec!["eDP-1", "DP-1~1", "DP-1~2"]);

    let bottom = augmented.outputs().nth(2).unwrap();
    let crtc = augmented.crtc(bottom.crtc.unwrap()).unwrap();
    assert_eq!((crtc.x, crtc.y, crtc.width, crtc.height), (1920, 525, 3360, 525));
}

#[test]
fn test_custom_separator_and_passthrough_json() {
    let dir = TempDir::new().unwrap();
    let source = SnapshotSource::load(write_snapshot(&dir)).unwrap();
    let physical = source.topology().unwrap();

    let mut store = SplitStore::new();
    store.upsert(SplitConfiguration::new(
        "DP-1",
        fingerprint(&[0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00, 0x10, 0xac]),
        3360,
        1050,
        &"V 1120 N V 1120 N N".parse().unwrap(),
    ));
    let config = MultiMonitorConfig {
        name_separator: "/".to_string(),
        ..MultiMonitorConfig::default()
    };
    let augmenter = TopologyAugmenter::new(&store, config);
    let augmented = augmenter.augment(&source, &physical).unwrap();

    let names: Vec<_> = augmented.outputs().map(|o| o.name.clone()).collect();
    assert_eq!(names, vec!["eDP-1", "DP-1/1", "DP-1/2", "DP-1/3"]);

    // merged view serializes as an ordinary snapshot topology
    let json = serde_json::to_string(&augmented.to_topology()).unwrap();
    let reparsed: splitrandr::topology::PhysicalTopology = serde_json::from_str(&json).unwrap();
    assert_eq!(reparsed.outputs.len(), 4);
    assert_eq!(reparsed.crtcs.len(), 5);

    // an empty store leaves the snapshot untouched
    let empty = SplitStore::new();
    let augmenter = TopologyAugmenter::new(&empty, MultiMonitorConfig::default());
    let passthrough = augmenter.augment(&source, &physical).unwrap();
    assert!(!passthrough.is_augmented());
    assert_eq!(passthrough.to_topology(), physical);
}
