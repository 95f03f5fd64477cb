//! End-to-end runs through files and the command line.

use std::path::Path;
use std::process::Command;

use divergence::data::loader::load_file;
use divergence::data::writer::write_table_csv;
use divergence::{
    negative_only, positive_only, probabilities, DivergenceError, DivergenceModel, Over, Table,
};

const TRAIN_CSV: &str = "\
id,A,B
p01,1,10
p02,2,20
p03,2,30
p04,2,40
p05,3,50
p06,4,60
p07,5,70
p08,6,80
p09,7,
p10,8,100
p11,9,110
p12,10,120
";

const COHORT_CSV: &str = "\
id,A,B
c1,2,0
c2,11,55
c3,0,200
c4,,120
";

fn write(dir: &Path, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

#[test]
fn fit_transform_and_aggregate_from_csv() {
    let dir = tempfile::tempdir().unwrap();
    let train = load_file(&write(dir.path(), "train.csv", TRAIN_CSV)).unwrap();
    let cohort = load_file(&write(dir.path(), "cohort.csv", COHORT_CSV)).unwrap();

    let model = DivergenceModel::new(&train, 0.025, 0.975, false).unwrap();
    assert_eq!(model.ranges()["A"].as_tuple(), (1.0, 10.0));
    // B has 11 observations; the missing cell is not counted
    assert_eq!(model.ranges()["B"].as_tuple(), (10.0, 120.0));

    let matrix = model.transform(&cohort, false).unwrap();
    assert_eq!(matrix.individuals(), ["c1", "c2", "c3", "c4"]);
    assert_eq!(
        matrix.column("A").unwrap(),
        &[Some(0.0), Some(1.0), Some(-1.0), None]
    );
    assert_eq!(
        matrix.column("B").unwrap(),
        &[Some(-1.0), Some(0.0), Some(1.0), Some(0.0)]
    );

    let abs = probabilities(&matrix, Over::Absolute).unwrap();
    assert_eq!(abs["A"], 0.5);
    assert_eq!(abs["B"], 0.5);
    let pos = probabilities(&positive_only(&matrix), Over::Positive).unwrap();
    let neg = probabilities(&negative_only(&matrix), Over::Negative).unwrap();
    assert_eq!(pos["A"], 0.25);
    assert_eq!(neg["B"], 0.25);

    let mut out = Vec::new();
    write_table_csv(matrix.as_table(), &mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "individual,A,B\nc1,0,-1\nc2,1,0\nc3,-1,1\nc4,,0\n"
    );
}

#[test]
fn unknown_analyte_is_reported_by_name() {
    let train = Table::from_columns([("A", vec![Some(1.0), Some(2.0), Some(3.0)])]).unwrap();
    let model = DivergenceModel::new(&train, 0.025, 0.975, false).unwrap();
    let cohort = Table::from_columns([
        ("A", vec![Some(2.0)]),
        ("ferritin", vec![Some(40.0)]),
    ])
    .unwrap();

    let err = model.transform(&cohort, false).unwrap_err();
    assert_eq!(err, DivergenceError::AnalyteNotFound(vec!["ferritin".into()]));
    assert!(err.to_string().contains("ferritin"));
}

#[test]
fn unsupported_mode_string() {
    assert!(matches!(
        "total".parse::<Over>(),
        Err(DivergenceError::InvalidArgument(_))
    ));
}

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

fn divergence() -> Command {
    Command::new(env!("CARGO_BIN_EXE_divergence"))
}

#[test]
fn cli_ranges_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let train = write(dir.path(), "train.csv", TRAIN_CSV);

    let out = divergence().arg("ranges").arg(&train).output().unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        String::from_utf8(out.stdout).unwrap(),
        "analyte,lower,upper\nA,1,10\nB,10,120\n"
    );
}

#[test]
fn cli_fit_then_probabilities() {
    let dir = tempfile::tempdir().unwrap();
    let train = write(dir.path(), "train.csv", TRAIN_CSV);
    let cohort = write(dir.path(), "cohort.csv", COHORT_CSV);
    let model = dir.path().join("model.json");
    let probs = dir.path().join("probs.csv");

    let fit = divergence()
        .arg("fit")
        .arg(&train)
        .arg("--model")
        .arg(&model)
        .output()
        .unwrap();
    assert!(fit.status.success(), "{}", String::from_utf8_lossy(&fit.stderr));

    let run = divergence()
        .arg("probabilities")
        .arg(&cohort)
        .arg("--model")
        .arg(&model)
        .args(["--over", "positive", "--output"])
        .arg(&probs)
        .output()
        .unwrap();
    assert!(run.status.success(), "{}", String::from_utf8_lossy(&run.stderr));
    assert_eq!(
        std::fs::read_to_string(&probs).unwrap(),
        "analyte,probability\nA,0.25\nB,0.25\n"
    );
}

#[test]
fn cli_rejects_unknown_mode_and_missing_analytes() {
    let dir = tempfile::tempdir().unwrap();
    let train = write(dir.path(), "train.csv", TRAIN_CSV);
    let cohort = write(dir.path(), "cohort.csv", "id,A,Z\nc1,1,1\n");

    let bad_mode = divergence()
        .arg("probabilities")
        .arg(&cohort)
        .arg("--train")
        .arg(&train)
        .args(["--over", "total"])
        .output()
        .unwrap();
    assert!(!bad_mode.status.success());

    let unaligned = divergence()
        .arg("transform")
        .arg(&cohort)
        .arg("--train")
        .arg(&train)
        .output()
        .unwrap();
    assert!(!unaligned.status.success());
    assert!(String::from_utf8_lossy(&unaligned.stderr).contains("Z"));

    let aligned = divergence()
        .arg("transform")
        .arg(&cohort)
        .arg("--train")
        .arg(&train)
        .arg("--align")
        .output()
        .unwrap();
    assert!(aligned.status.success(), "{}", String::from_utf8_lossy(&aligned.stderr));
    assert_eq!(String::from_utf8(aligned.stdout).unwrap(), "individual,A\nc1,0\n");
}
