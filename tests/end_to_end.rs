//! Whole-machine flows: two bridge cards on one slot table sharing a filesystem AppKey store.

use std::cell::Cell;
use std::rc::Rc;

use bridge::card::card::{REG_APPEND, REG_COMMAND, REG_DATA, REG_LEN_HI, REG_LEN_LO};
use bridge::card::{BridgeCard, BridgeConfig, CannedFetch, FsAppKeyStore, Opcode};
use bridge::platform::io::slot_io_base;
use bridge::platform::{FloatingBus, SlotTable};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn fs_card(root: &std::path::Path, fetch: &CannedFetch) -> Box<BridgeCard> {
    Box::new(BridgeCard::new(
        Box::new(FsAppKeyStore::new(root)),
        Box::new(fetch.clone()),
        BridgeConfig::default(),
    ))
}

fn write(slots: &mut SlotTable, slot: u8, reg: u8, value: u8, bus: &mut dyn FloatingBus) {
    slots.write(slot_io_base(slot) + u16::from(reg), value, 0, bus);
}

fn read(slots: &mut SlotTable, slot: u8, reg: u8, bus: &mut dyn FloatingBus) -> u8 {
    slots.read(slot_io_base(slot) + u16::from(reg), 0, bus)
}

fn transact(
    slots: &mut SlotTable,
    slot: u8,
    request: &[u8],
    op: Opcode,
    bus: &mut dyn FloatingBus,
) -> Vec<u8> {
    write(slots, slot, REG_COMMAND, Opcode::Reset as u8, bus);
    for &b in request {
        write(slots, slot, REG_APPEND, b, bus);
    }
    write(slots, slot, REG_COMMAND, op as u8, bus);
    let len = usize::from(read(slots, slot, REG_LEN_LO, bus))
        | (usize::from(read(slots, slot, REG_LEN_HI, bus)) << 8);
    (0..len).map(|_| read(slots, slot, REG_DATA, bus)).collect()
}

#[test]
fn appkey_written_by_one_slot_is_visible_to_another() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let fetch = CannedFetch::new();

    let mut slots = SlotTable::new();
    slots.insert(2, fs_card(tmp.path(), &fetch));
    slots.insert(5, fs_card(tmp.path(), &fetch));
    let mut bus = |_cycles: u64| -> u8 { 0xEE };

    let mut request = vec![0xCA, 0xFE, 0x00, 0x01, 5, 0];
    request.extend_from_slice(b"score");
    transact(&mut slots, 2, &request, Opcode::WriteAppKey, &mut bus);

    assert!(tmp.path().join("ak_CAFE0001.txt").is_file());
    assert_eq!(
        transact(&mut slots, 5, &[0xCA, 0xFE, 0x00, 0x01], Opcode::ReadAppKey, &mut bus),
        b"score"
    );
}

#[test]
fn empty_slots_and_exhausted_data_read_the_floating_bus() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let fetch = CannedFetch::new();

    let mut slots = SlotTable::new();
    slots.insert(3, fs_card(tmp.path(), &fetch));

    // The floating value tracks the cycle count it is sampled at.
    let sampled = Rc::new(Cell::new(0u32));
    let counter = sampled.clone();
    let mut bus = move |cycles: u64| {
        counter.set(counter.get() + 1);
        (cycles & 0xFF) as u8
    };

    assert_eq!(slots.read(slot_io_base(6) + 2, 0x1234, &mut bus), 0x34);
    assert_eq!(slots.read(slot_io_base(3) + 2, 0x0042, &mut bus), 0x42);
    assert_eq!(sampled.get(), 2);

    // Backed reads never touch the bus.
    assert_eq!(slots.read(slot_io_base(3), 0x99, &mut bus), 0);
    assert_eq!(sampled.get(), 2);
}

#[test]
fn remote_values_survive_a_snapshot_into_a_fresh_machine() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let fetch = CannedFetch::new();
    fetch.respond(
        "https://scores.test/top",
        br#"{"player":"ada","points":1200,"tags":["gold"]}"#.to_vec(),
    );

    let mut slots = SlotTable::new();
    slots.insert(1, fs_card(tmp.path(), &fetch));
    let mut bus = |_cycles: u64| -> u8 { 0 };

    write(&mut slots, 1, REG_COMMAND, Opcode::Reset as u8, &mut bus);
    for &b in b"https://scores.test/top" {
        write(&mut slots, 1, REG_APPEND, b, &mut bus);
    }
    write(&mut slots, 1, REG_COMMAND, Opcode::ReadRemote as u8, &mut bus);
    // Consume part of the response before saving.
    assert_eq!(read(&mut slots, 1, REG_DATA, &mut bus), b'a');
    let snapshot = slots.save_state();

    let mut restored = SlotTable::new();
    restored.insert(1, fs_card(tmp.path(), &CannedFetch::new()));
    restored.load_state(&snapshot).unwrap();

    let rest: Vec<u8> = (0..)
        .map(|_| read(&mut restored, 1, REG_DATA, &mut bus))
        .take_while(|&b| b != 0)
        .collect();
    assert_eq!(rest, b"da\n1200\ngold\n");
    assert_eq!(fetch.requests(), vec!["https://scores.test/top".to_string()]);
}
