//! Two engines wired back to back through a shared directory, the way two
//! machines share an airlock.

use bidiclip::{EngineConfig, MemoryClipboard, ObfuscationKey, SyncEngine};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

struct Side {
    engine: SyncEngine<MemoryClipboard>,
    clipboard: MemoryClipboard,
}

fn side(input: &Path, output: &Path, key: Option<&str>) -> Side {
    let clipboard = MemoryClipboard::new();
    let config = EngineConfig::new(input, output)
        .with_key(key.and_then(|k| ObfuscationKey::new(k.as_bytes().to_vec())));
    let engine = SyncEngine::new(config, clipboard.clone()).unwrap();
    Side { engine, clipboard }
}

/// A writes a2b.0 and reads b2a.0; B the other way round.
fn linked_pair(airlock: &TempDir, key: Option<&str>) -> (Side, Side) {
    let a2b = airlock.path().join("a2b.0");
    let b2a = airlock.path().join("b2a.0");
    (side(&b2a, &a2b, key), side(&a2b, &b2a, key))
}

fn poll_both(a: &mut Side, b: &mut Side, rounds: usize) {
    for _ in 0..rounds {
        a.engine.sync_once();
        b.engine.sync_once();
    }
}

#[test]
fn test_copy_on_one_side_converges_without_relay() {
    let airlock = TempDir::new().unwrap();
    let (mut a, mut b) = linked_pair(&airlock, None);

    a.clipboard.copy("V");
    poll_both(&mut a, &mut b, 5);

    assert_eq!(a.clipboard.peek().as_deref(), Some("V"));
    assert_eq!(b.clipboard.peek().as_deref(), Some("V"));

    // A sent V exactly once; B never sent it back
    assert_eq!(a.engine.stats().frames_sent, 1);
    assert_eq!(b.engine.stats().frames_sent, 0);
    assert_eq!(b.engine.stats().frames_received, 1);
    assert_eq!(a.engine.stats().frames_received, 0);
    // V sat on B's clipboard for several polls after it arrived
    assert!(b.engine.stats().echoes_suppressed >= 1);
    assert_eq!(
        fs::metadata(airlock.path().join("b2a.0")).unwrap().len(),
        0
    );
}

#[test]
fn test_both_directions_alternate() {
    let airlock = TempDir::new().unwrap();
    let (mut a, mut b) = linked_pair(&airlock, Some("shared secret"));

    a.clipboard.copy("from A");
    poll_both(&mut a, &mut b, 3);
    assert_eq!(b.clipboard.peek().as_deref(), Some("from A"));

    b.clipboard.copy("from B");
    poll_both(&mut a, &mut b, 3);
    assert_eq!(a.clipboard.peek().as_deref(), Some("from B"));

    a.clipboard.copy("A again");
    poll_both(&mut a, &mut b, 3);
    assert_eq!(b.clipboard.peek().as_deref(), Some("A again"));

    assert_eq!(a.engine.stats().frames_sent, 2);
    assert_eq!(b.engine.stats().frames_sent, 1);
    assert_eq!(a.engine.stats().frames_received, 1);
    assert_eq!(b.engine.stats().frames_received, 2);
}

#[test]
fn test_airlock_holds_obfuscated_bytes() {
    let airlock = TempDir::new().unwrap();
    let (mut a, mut b) = linked_pair(&airlock, Some("k"));

    a.clipboard.copy("plain words");
    poll_both(&mut a, &mut b, 1);

    let raw = fs::read(airlock.path().join("a2b.0")).unwrap();
    assert_eq!(&raw[..4], &11u32.to_le_bytes());
    assert!(!raw.windows(5).any(|w| w == b"plain"));
    assert_eq!(b.clipboard.peek().as_deref(), Some("plain words"));
}

#[test]
fn test_mismatched_keys_do_not_loop() {
    let airlock = TempDir::new().unwrap();
    let a2b = airlock.path().join("a2b.0");
    let b2a = airlock.path().join("b2a.0");
    let mut a = side(&b2a, &a2b, Some("alpha"));
    let mut b = side(&a2b, &b2a, Some("omega"));

    a.clipboard.copy("garbled in transit");
    poll_both(&mut a, &mut b, 5);

    // B receives garbage once and does not bounce it back
    assert_eq!(b.engine.stats().frames_received, 1);
    assert_eq!(b.engine.stats().frames_sent, 0);
}

#[test]
fn test_large_payload_crosses_intact() {
    let airlock = TempDir::new().unwrap();
    let (mut a, mut b) = linked_pair(&airlock, None);

    let big: String = (0..100_000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    a.clipboard.copy(big.clone());
    poll_both(&mut a, &mut b, 2);

    assert_eq!(b.clipboard.peek(), Some(big));
}

#[test]
fn test_shutdown_leaves_empty_channels() {
    let airlock = TempDir::new().unwrap();
    let (mut a, mut b) = linked_pair(&airlock, None);

    a.clipboard.copy("x");
    b.clipboard.copy("y");
    poll_both(&mut a, &mut b, 1);

    a.engine.shutdown().unwrap();
    b.engine.shutdown().unwrap();
    assert_eq!(fs::metadata(airlock.path().join("a2b.0")).unwrap().len(), 0);
    assert_eq!(fs::metadata(airlock.path().join("b2a.0")).unwrap().len(), 0);
}
