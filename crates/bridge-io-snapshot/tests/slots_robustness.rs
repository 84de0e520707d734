use bridge_io_snapshot::io::slots::SlotsSnapshot;
use bridge_io_snapshot::io::state::codec::Encoder;
use bridge_io_snapshot::io::state::{IoSnapshot, SnapshotError, SnapshotWriter};
use proptest::prelude::*;

#[test]
fn slots_snapshot_rejects_truncated_entry() {
    let mut w = SnapshotWriter::new(SlotsSnapshot::DEVICE_ID, SlotsSnapshot::DEVICE_VERSION);
    // Declares a 16-byte state blob but only carries 2 bytes.
    let field = Encoder::new()
        .vec_u8(b"Bridge")
        .u32(1)
        .u32(16)
        .bytes(&[1, 2])
        .finish();
    w.field_bytes(4, field);

    let mut snap = SlotsSnapshot::new();
    let err = snap
        .load_state(&w.finish())
        .expect_err("truncated entry must be rejected");
    assert_eq!(err, SnapshotError::UnexpectedEof);
    assert!(snap.is_empty());
}

#[test]
fn slots_snapshot_rejects_trailing_entry_bytes() {
    let mut w = SnapshotWriter::new(SlotsSnapshot::DEVICE_ID, SlotsSnapshot::DEVICE_VERSION);
    let field = Encoder::new()
        .vec_u8(b"Bridge")
        .u32(1)
        .vec_u8(&[])
        .u8(0xAA)
        .finish();
    w.field_bytes(4, field);

    let err = SlotsSnapshot::new().load_state(&w.finish()).unwrap_err();
    assert_eq!(err, SnapshotError::InvalidFieldEncoding("trailing bytes"));
}

proptest! {
    #[test]
    fn slots_snapshot_load_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let mut snap = SlotsSnapshot::new();
        let _ = snap.load_state(&bytes);
    }
}
