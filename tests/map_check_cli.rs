use async_fs as afs;
use futures_lite::future::block_on;
use std::process::Command;

const MAP_JSON: &str = r#"{
    "_version": "2.0.0",
    "_notes": [
        {"_time": 2.0, "_lineIndex": 1, "_lineLayer": 0, "_type": 0, "_cutDirection": 1},
        {"_time": 2.0, "_lineIndex": 1, "_lineLayer": 0, "_type": 0, "_cutDirection": 8},
        {"_time": 1.0, "_lineIndex": 0, "_lineLayer": 0, "_type": 1, "_cutDirection": 0},
        {"_time": 6.5, "_lineIndex": 3, "_lineLayer": 2, "_type": 3, "_cutDirection": 8}
    ],
    "_events": []
}"#;

#[test]
fn check_map_reports_counts_and_exits_clean() {
    let mut path = std::env::temp_dir();
    path.push(format!("nebula_mapper_test_{}_check.dat", std::process::id()));
    block_on(afs::write(&path, MAP_JSON.as_bytes())).unwrap();

    let bin = env!("CARGO_BIN_EXE_nebula-mapper");
    let out = Command::new(bin)
        .arg("--check-map")
        .arg("--map")
        .arg(&path)
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(out.status.success(), "stdout: {stdout}");
    assert!(
        stdout.contains("📊 谱面检查 | 音符: 4 | 冲突: 1 | ID 连续: 是"),
        "stdout: {stdout}"
    );
    assert!(stdout.contains("📊 节拍范围: 1.00 .. 6.50"), "stdout: {stdout}");

    let _ = block_on(afs::remove_file(&path));
}

#[test]
fn check_map_fails_on_unreadable_file() {
    let mut path = std::env::temp_dir();
    path.push(format!(
        "nebula_mapper_test_{}_missing.dat",
        std::process::id()
    ));

    let bin = env!("CARGO_BIN_EXE_nebula-mapper");
    let out = Command::new(bin)
        .arg("--check-map")
        .arg("--map")
        .arg(&path)
        .output()
        .unwrap();
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(!out.status.success());
    assert!(stderr.contains("谱面检查失败"), "stderr: {stderr}");
}

#[test]
fn check_map_requires_map_argument() {
    let bin = env!("CARGO_BIN_EXE_nebula-mapper");
    let out = Command::new(bin).arg("--check-map").output().unwrap();
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(!out.status.success());
    assert!(stderr.contains("--map"), "stderr: {stderr}");
}
