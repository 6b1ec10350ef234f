use assert_cmd::Command;

mod common;

use common::write_classification_split;

#[test]
fn runs() {
    let mut cmd = Command::cargo_bin("maskpack").unwrap();
    cmd.assert().success();
}

#[test]
fn outputs_tool_name() {
    let mut cmd = Command::cargo_bin("maskpack").unwrap();
    cmd.arg("-V");
    cmd.assert().success().stdout("maskpack 0.1.0\n");
}

// Convert subcommand tests

#[test]
fn convert_unknown_mode_prints_diagnostic_and_succeeds() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let mut cmd = Command::cargo_bin("maskpack").unwrap();
    cmd.arg("--root").arg(temp.path());
    cmd.args(["convert", "--mode", "validation"]);
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("mode validation not defined!"));
}

#[test]
fn convert_train_writes_container() {
    let temp = tempfile::tempdir().expect("create temp dir");
    write_classification_split(&temp.path().join("train"), &["with_mask", "without_mask"], 2);

    let mut cmd = Command::cargo_bin("maskpack").unwrap();
    cmd.arg("--root").arg(temp.path());
    cmd.args(["convert", "--mode", "train", "--seed", "3"]);
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("Converted mode 'train'"));

    assert!(temp.path().join("hdf5_train/train.h5").is_file());
}

#[test]
fn convert_missing_split_fails() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let mut cmd = Command::cargo_bin("maskpack").unwrap();
    cmd.arg("--root").arg(temp.path().join("absent"));
    cmd.args(["convert", "--mode", "test"]);
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("Error:"));
}

#[test]
fn convert_reads_layout_file() {
    let temp = tempfile::tempdir().expect("create temp dir");
    write_classification_split(&temp.path().join("faces/test"), &["a", "b"], 1);
    let layout = "\
train_dir: faces/train
test_dir: faces/test
detection_images_dir: faces/detection/images
detection_labels_dir: faces/detection/labels
train_container: packed/train.bin
test_container: packed/test.bin
detection_container: packed/detection.bin
cropped_container: packed/cropped.bin
label_dict: packed/label.json
size_dict: packed/size.json
";
    let layout_path = temp.path().join("layout.yaml");
    std::fs::write(&layout_path, layout).expect("write layout");

    let mut cmd = Command::cargo_bin("maskpack").unwrap();
    cmd.arg("--layout").arg(&layout_path);
    cmd.args(["convert", "--mode", "test"]);
    cmd.assert().success();

    assert!(temp.path().join("packed/test.bin").is_file());
}

// Inspect subcommand tests

#[test]
fn inspect_unknown_dataset_prints_diagnostic_and_succeeds() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let mut cmd = Command::cargo_bin("maskpack").unwrap();
    cmd.arg("--root").arg(temp.path());
    cmd.args(["inspect", "faces"]);
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("dataset faces is not defined!"));
}

#[test]
fn inspect_single_person_reports_split_sizes() {
    let temp = tempfile::tempdir().expect("create temp dir");
    write_classification_split(&temp.path().join("train"), &["with_mask", "without_mask"], 2);
    write_classification_split(&temp.path().join("test"), &["with_mask", "without_mask"], 1);

    for mode in ["train", "test"] {
        let mut cmd = Command::cargo_bin("maskpack").unwrap();
        cmd.arg("--root").arg(temp.path());
        cmd.args(["convert", "--mode", mode]);
        cmd.assert().success();
    }

    let mut cmd = Command::cargo_bin("maskpack").unwrap();
    cmd.arg("--root").arg(temp.path());
    cmd.args(["inspect", "single_person", "--seed", "1"]);
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("train: 4 sample(s)"))
        .stdout(predicates::str::contains("test:  2 sample(s)"))
        .stdout(predicates::str::contains("first train sample: 3x224x224"));
}

#[test]
fn inspect_missing_container_fails() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let mut cmd = Command::cargo_bin("maskpack").unwrap();
    cmd.arg("--root").arg(temp.path());
    cmd.args(["inspect", "cropped"]);
    cmd.assert().failure();
}
