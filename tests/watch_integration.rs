//! Config file watching against the real filesystem.

use std::fs;
use std::path::Path;
use std::time::Duration;

use devgate::config::{parse_config, ConfigWatcher, DevGateConfig};
use tokio::sync::mpsc;

fn gate_toml(blocked_major: u32) -> String {
    format!("[gate]\nblocked_major = {blocked_major}\n")
}

async fn next_update(rx: &mut mpsc::UnboundedReceiver<DevGateConfig>) -> DevGateConfig {
    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("no config update within 10s")
        .expect("watcher channel closed")
}

fn replace_atomically(path: &Path, content: &str) {
    let tmp = path.with_file_name("devgate.toml.tmp");
    fs::write(&tmp, content).unwrap();
    fs::rename(&tmp, path).unwrap();
}

#[tokio::test]
async fn test_watcher_follows_edits_and_renames() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("devgate.toml");
    fs::write(&path, gate_toml(129)).unwrap();

    let (watcher, mut rx) = ConfigWatcher::new(&path);
    let _watcher = watcher
        .starting_from(parse_config(&gate_toml(129)).unwrap())
        .run()
        .unwrap();

    fs::write(&path, gate_toml(130)).unwrap();
    assert_eq!(next_update(&mut rx).await.gate.blocked_major, 130);

    // The original inode is gone after this; later edits must still be seen.
    replace_atomically(&path, &gate_toml(131));
    assert_eq!(next_update(&mut rx).await.gate.blocked_major, 131);

    fs::write(&path, "[gate\nblocked_major = 1").unwrap();
    fs::write(&path, "[gate]\nblocked_major = 133\n[timeouts]\nrequest_secs = 0\n").unwrap();
    fs::write(&path, gate_toml(132)).unwrap();

    let update = next_update(&mut rx).await;
    assert_eq!(update.gate.blocked_major, 132);

    replace_atomically(&path, &gate_toml(134));
    assert_eq!(next_update(&mut rx).await.gate.blocked_major, 134);
}
