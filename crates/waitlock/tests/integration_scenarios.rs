//! End-to-end CLI scenarios, one per spec.md §8 concrete test.

use std::process::Command;
use std::time::Duration;

use assert_cmd::cargo::cargo_bin;
use tempfile::TempDir;

fn waitlock() -> Command {
    Command::new(cargo_bin("waitlock"))
}

/// S1: mutex hand-off. A holds, B blocks; once A releases (here, killed),
/// B's subsequent attempt succeeds.
#[test]
fn s1_mutex_hand_off() {
    let tmp = TempDir::new().unwrap();

    let mut holder = waitlock()
        .args(["mutex-handoff", "-d"])
        .arg(tmp.path())
        .spawn()
        .unwrap();
    std::thread::sleep(Duration::from_millis(200));

    let busy = waitlock()
        .args(["mutex-handoff", "--check", "-d"])
        .arg(tmp.path())
        .output()
        .unwrap();
    assert_eq!(busy.status.code(), Some(1));

    holder.kill().unwrap();
    holder.wait().unwrap();
    std::thread::sleep(Duration::from_millis(100));

    let available = waitlock()
        .args(["mutex-handoff", "--check", "-d"])
        .arg(tmp.path())
        .output()
        .unwrap();
    assert_eq!(available.status.code(), Some(0));
}

/// S2: semaphore capacity. Two holders of a capacity-2 lock both succeed;
/// a third attempt (checked, not blocked) finds it busy.
#[test]
fn s2_semaphore_capacity() {
    let tmp = TempDir::new().unwrap();

    let mut h1 = waitlock()
        .args(["sem2", "-m", "2", "-d"])
        .arg(tmp.path())
        .spawn()
        .unwrap();
    let mut h2 = waitlock()
        .args(["sem2", "-m", "2", "-d"])
        .arg(tmp.path())
        .spawn()
        .unwrap();
    std::thread::sleep(Duration::from_millis(300));

    let third = waitlock()
        .args(["sem2", "-m", "2", "-t", "0.1", "-d"])
        .arg(tmp.path())
        .output()
        .unwrap();
    assert_eq!(third.status.code(), Some(2)); // timeout

    h1.kill().unwrap();
    h1.wait().unwrap();
    h2.kill().unwrap();
    h2.wait().unwrap();
}

/// S3: stale cleanup. A record naming a dead PID is reclaimed by the next
/// claimant rather than blocking it.
#[test]
fn s3_stale_cleanup() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("stale-e2e.slot0.lock");

    // A record naming a PID that is certainly not running.
    std::fs::write(&path, b"VERSION=1\nPID=999999\nACQUIRED=1\nTYPE=mutex\nMAX_HOLDERS=1\nSLOT=0\nDESCRIPTOR=stale-e2e\n").unwrap();

    let out = waitlock()
        .args(["stale-e2e", "--check", "-d"])
        .arg(tmp.path())
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0));
}

/// S4: exec with contention. `--exec true` under a lock held by another
/// process times out rather than hanging forever.
#[test]
fn s4_exec_with_contention() {
    let tmp = TempDir::new().unwrap();

    let mut holder = waitlock()
        .args(["exec-contend", "-d"])
        .arg(tmp.path())
        .spawn()
        .unwrap();
    std::thread::sleep(Duration::from_millis(200));

    let out = waitlock()
        .args(["exec-contend", "-t", "0.2", "-d"])
        .arg(tmp.path())
        .args(["--exec", "true"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));

    holder.kill().unwrap();
    holder.wait().unwrap();
}

/// S5: done. Signalling a held lock causes it to become available.
#[test]
fn s5_done_releases_holder() {
    let tmp = TempDir::new().unwrap();

    let mut holder = waitlock()
        .args(["done-me", "-d"])
        .arg(tmp.path())
        .spawn()
        .unwrap();
    std::thread::sleep(Duration::from_millis(200));

    let done = waitlock()
        .args(["done-me", "--done", "-d"])
        .arg(tmp.path())
        .output()
        .unwrap();
    assert_eq!(done.status.code(), Some(0));

    let status = holder.wait().unwrap();
    assert!(!status.success() || status.code() == Some(0));

    std::thread::sleep(Duration::from_millis(100));
    let available = waitlock()
        .args(["done-me", "--check", "-d"])
        .arg(tmp.path())
        .output()
        .unwrap();
    assert_eq!(available.status.code(), Some(0));
}

/// S6: corruption rejection. A record with a bad checksum is treated as
/// absent, and removed, by `check`.
#[test]
fn s6_corruption_rejection() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("corrupt-e2e.slot0.lock");
    std::fs::write(&path, vec![0xFFu8; 64]).unwrap();

    let out = waitlock()
        .args(["corrupt-e2e", "--check", "-d"])
        .arg(tmp.path())
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0));
    assert!(!path.exists());

    let list = waitlock()
        .args(["--list", "-d"])
        .arg(tmp.path())
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&list.stdout);
    assert!(!stdout.contains("corrupt-e2e"));
}

#[test]
fn selftest_flag_passes() {
    let out = waitlock().arg("--test").output().unwrap();
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn bad_descriptor_is_a_usage_error() {
    let out = waitlock().args(["bad name", "--check"]).output().unwrap();
    assert_eq!(out.status.code(), Some(3));
}
