use std::io::Write;

use approx::assert_abs_diff_eq;
use test_case::test_case;

use super::*;

#[test]
fn read_log() {
    let log = Log::read("testfiles/md.out", OUTPUT_MARKER).unwrap();
    assert!(log.is_terachem);
    let frames: Vec<_> = log.steps.iter().map(|s| s.frame).collect();
    assert_eq!(frames, vec![1, 2, 3, 4]);
    assert_eq!(log.first_frame(), Some(1));
    assert_eq!(log.frame_count(), 4);

    // the energy printed before the first iteration belongs to no frame
    assert_abs_diff_eq!(log.steps[0].energy.unwrap(), -76.012);
    assert_abs_diff_eq!(log.steps[0].temperature.unwrap(), 0.0);
    assert_abs_diff_eq!(log.steps[1].temperature.unwrap(), 105.23);
    assert_eq!(log.steps[2].energy, None);
    assert_eq!(log.steps[2].temperature, None);
    assert_abs_diff_eq!(log.steps[3].energy.unwrap(), -76.0101);
    assert_abs_diff_eq!(log.steps[3].temperature.unwrap(), 399.8);

    assert_eq!(
        log.errors,
        vec![
            ParseError::Energy {
                file: "testfiles/md.out".to_owned(),
                line: 14,
            },
            ParseError::Temperature {
                file: "testfiles/md.out".to_owned(),
                line: 15,
            },
        ]
    );
}

#[test]
fn not_terachem() {
    let log = Log::parse(
        "MD Iteration 7\nFINAL ENERGY: -1.0 a.u.\n",
        "x",
        OUTPUT_MARKER,
    );
    assert!(!log.is_terachem);
    assert_eq!(log.first_frame(), Some(8));
    assert_eq!(log.steps[0].energy, Some(-1.0));
}

#[test]
fn iteration_without_number() {
    let log = Log::parse("MD Iteration ??\n", "x", OUTPUT_MARKER);
    assert!(log.steps.is_empty());
    assert_eq!(log.frame_count(), 0);
    assert_eq!(
        log.errors,
        vec![ParseError::Iteration {
            file: "x".to_owned(),
            line: 1
        }]
    );
}

#[test]
fn frame_count_spans_iterations() {
    let log = Log::parse(
        "MD Iteration 100\nMD Iteration 101\nMD Iteration 105\n",
        "x",
        OUTPUT_MARKER,
    );
    assert_eq!(log.first_frame(), Some(101));
    assert_eq!(log.last_frame(), Some(106));
    assert_eq!(log.frame_count(), 6);
}

#[test]
fn missing_log() {
    let err = Log::read("testfiles/nope.out", OUTPUT_MARKER).unwrap_err();
    assert!(matches!(err, ParseError::ReadFile(..)));
}

fn write_file(dir: &std::path::Path, name: &str, contents: &str) {
    let mut f = std::fs::File::create(dir.join(name)).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
}

const TWO_FRAMES: &str = "2
frame 4 xyz file generated by terachem
H 0.0 0.0 0.0
H 0.0 0.0 0.74
2
frame 5 xyz file generated by terachem
H 0.0 0.0 0.0
H 0.0 0.0 0.75
2
frame 6 xyz file generated by terachem
H 0.0 0.0 0.0
";

#[test_case(
    TWO_FRAMES,
    Some(TrajInfo { first: 5, frames: 2 }) ;
    "partial tail"
)]
#[test_case("2\nfrom avogadro\nH 0 0 0\nH 0 0 1\n", None ; "foreign")]
#[test_case("2\nframe x generated by terachem\n", None ; "bad counter")]
#[test_case("", None ; "empty")]
fn scan_trajectory(contents: &str, want: Option<TrajInfo>) {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "coors.xyz", contents);
    let got = TrajInfo::scan(dir.path().join("coors.xyz"), TRAJECTORY_MARKER)
        .unwrap();
    assert_eq!(got, want);
}

#[test]
fn companions_present() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "charge.xls", "H1 H2\n0.1 -0.1\n0.2 -0.2\n");
    write_file(dir.path(), "spin.xls", "H1 H2\n0.5 0.5\nnot numbers\n");
    write_file(
        dir.path(),
        "bond_order.list",
        "1\nframe 0\n0 1 0.98\n2\nframe 1\n0 1 0.97\n1 0 0.97\n",
    );
    let mut comp = Companions::open(dir.path(), &Default::default()).unwrap();

    let a = comp.next_frame(2);
    assert_eq!(a.charges, vec![0.1, -0.1]);
    assert_eq!(a.spins, vec![0.5, 0.5]);
    assert_eq!(a.bond_orders, vec!["1", "frame 0", "0 1 0.98"]);

    let b = comp.next_frame(2);
    assert_eq!(b.charges, vec![0.2, -0.2]);
    assert!(b.spins.is_empty());
    assert_eq!(b.bond_orders.len(), 4);

    // everything has run out
    let c = comp.next_frame(2);
    assert!(c.charges.is_empty());
    assert!(c.spins.is_empty());
    assert_eq!(c.bond_orders, companion::NO_BOND_ORDERS.to_vec());

    assert_eq!(comp.errors.len(), 1);
    assert!(matches!(
        &comp.errors[0],
        ParseError::Companion { line: 3, .. }
    ));
}

#[test]
fn companions_absent() {
    let dir = tempfile::tempdir().unwrap();
    let mut comp = Companions::open(dir.path(), &Default::default()).unwrap();
    let a = comp.next_frame(3);
    assert_eq!(a.charges, vec![0.0; 3]);
    assert_eq!(a.spins, vec![0.0; 3]);
    insta::assert_snapshot!(a.bond_orders.join("\n"), @r"
    0
    No bond orders in this frame
    ");
}

#[test]
fn bad_bond_order_count() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "bond_order.list", "lots\nframe 0\n");
    let mut comp = Companions::open(dir.path(), &Default::default()).unwrap();
    assert_eq!(comp.next_frame(1).bond_orders.len(), 2);
    assert_eq!(comp.next_frame(1).bond_orders.len(), 2);
    assert_eq!(comp.errors.len(), 1);
}

#[test]
fn oversized_bond_order_count() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "bond_order.list",
        "18446744073709551615\nframe 0\n0 1 0.98\n",
    );
    let mut comp = Companions::open(dir.path(), &Default::default()).unwrap();
    assert_eq!(
        comp.next_frame(2).bond_orders,
        vec!["18446744073709551615", "frame 0", "0 1 0.98"]
    );
    assert_eq!(
        comp.next_frame(2).bond_orders,
        companion::NO_BOND_ORDERS.to_vec()
    );
    assert!(comp.errors.is_empty());
}
