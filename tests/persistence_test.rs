#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn test_rocksdb_cart_survives_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // First run: fill the cart
    let output1 = Command::new(cargo_bin!("catering-orders"))
        .arg("--db-path")
        .arg(&db_path)
        .args([
            "cart", "add", "--customer", "cust-1", "--item", "tibs", "--name", "Tibs", "--price",
            "30", "--quantity", "2",
        ])
        .output()
        .expect("Failed to execute command");
    assert!(output1.status.success());

    // Second run: add to the same cart using the same DB path
    let output2 = Command::new(cargo_bin!("catering-orders"))
        .arg("--db-path")
        .arg(&db_path)
        .args([
            "cart", "add", "--customer", "cust-1", "--item", "injera", "--name", "Injera",
            "--price", "5", "--quantity", "1",
        ])
        .output()
        .expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);

    // Should have recovered 60 and added 5
    assert!(stdout2.contains("subtotal=65"));
}
