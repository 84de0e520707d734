use bridge_card::{
    AppKeyId, AppKeyStore, BridgeCard, BridgeConfig, CannedFetch, FsAppKeyStore, Opcode,
};
use bridge_platform::{Card, ConstantFloatingBus};

#[test]
fn missing_blob_is_none_and_empty_blob_is_some() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FsAppKeyStore::new(dir.path());
    let id = AppKeyId([0, 1, 2, 3]);

    assert_eq!(store.get(id).unwrap(), None);
    store.put(id, b"").unwrap();
    assert_eq!(store.get(id).unwrap(), Some(Vec::new()));
}

#[test]
fn blobs_are_named_by_uppercase_hex_id() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FsAppKeyStore::new(dir.path());
    let id = AppKeyId([0xDE, 0xAD, 0xBE, 0xEF]);

    store.put(id, b"value").unwrap();
    let path = dir.path().join("ak_DEADBEEF.txt");
    assert_eq!(store.path_for(id), path);
    assert_eq!(std::fs::read(&path).unwrap(), b"value");
    assert!(!dir.path().join("ak_DEADBEEF.txt.tmp").exists());
}

#[test]
fn put_overwrites_existing_blob() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FsAppKeyStore::new(dir.path());
    let id = AppKeyId([1, 1, 1, 1]);

    store.put(id, b"0123456789").unwrap();
    store.put(id, b"ab").unwrap();
    assert_eq!(store.get(id).unwrap().unwrap(), b"ab");
}

#[test]
fn put_creates_missing_root() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("nested").join("appkeys");
    let mut store = FsAppKeyStore::new(&root);
    store.put(AppKeyId([7, 7, 7, 7]), b"x").unwrap();
    assert!(root.join("ak_07070707.txt").is_file());
}

#[test]
fn failed_rename_removes_temporary_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FsAppKeyStore::new(dir.path());
    let id = AppKeyId([0xAB, 0xCD, 0x00, 0x01]);

    // A non-empty directory at the blob path makes the final rename fail.
    let blocked = store.path_for(id);
    std::fs::create_dir(&blocked).unwrap();
    std::fs::write(blocked.join("keep"), b"x").unwrap();

    assert!(matches!(
        store.put(id, b"value"),
        Err(bridge_card::StoreError::Io(_))
    ));
    assert!(!dir.path().join("ak_ABCD0001.txt.tmp").exists());
    assert!(blocked.is_dir());
}

#[test]
fn unreadable_blob_reads_as_empty_through_the_card() {
    let dir = tempfile::tempdir().unwrap();
    // A directory where the blob file should be makes `fs::read` fail with something other
    // than NotFound.
    std::fs::create_dir(dir.path().join("ak_0A0B0C0D.txt")).unwrap();

    let mut card = BridgeCard::new(
        Box::new(FsAppKeyStore::new(dir.path())),
        Box::new(CannedFetch::new()),
        BridgeConfig::default(),
    );
    let mut bus = ConstantFloatingBus(0);
    for b in [0x0A, 0x0B, 0x0C, 0x0D] {
        card.io(0xC0C0, true, b, 0, &mut bus);
    }
    card.io(0xC0C1, true, Opcode::ReadAppKey as u8, 0, &mut bus);

    assert_eq!(card.io(0xC0C0, false, 0, 0, &mut bus), 0);
    assert_eq!(card.io(0xC0C1, false, 0, 0, &mut bus), 0);
}

#[test]
fn card_round_trip_persists_across_card_instances() {
    let dir = tempfile::tempdir().unwrap();
    let new_card = || {
        BridgeCard::new(
            Box::new(FsAppKeyStore::new(dir.path())),
            Box::new(CannedFetch::new()),
            BridgeConfig::default(),
        )
    };
    let mut bus = ConstantFloatingBus(0xFF);

    let mut writer = new_card();
    for b in [0xCA, 0xFE, 0x00, 0x01, 3, 0, b'y', b'e', b's'] {
        writer.io(0xC0C0, true, b, 0, &mut bus);
    }
    writer.io(0xC0C1, true, Opcode::WriteAppKey as u8, 0, &mut bus);

    let mut reader = new_card();
    for b in [0xCA, 0xFE, 0x00, 0x01] {
        reader.io(0xC0C0, true, b, 0, &mut bus);
    }
    reader.io(0xC0C1, true, Opcode::ReadAppKey as u8, 0, &mut bus);
    let out: Vec<u8> = (0..3).map(|_| reader.io(0xC0C2, false, 0, 0, &mut bus)).collect();
    assert_eq!(out, b"yes");
    assert_eq!(reader.io(0xC0C2, false, 0, 0, &mut bus), 0xFF);
}
