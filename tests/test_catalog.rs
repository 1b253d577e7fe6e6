mod common;

use common::{ResultsFixture, RunSpec};
use papito_metrics::{
    join_records, load_catalog, resolve_log_path, tuning_label, CounterBlockParser, ParsedLog,
    ReportError,
};

#[test]
fn test_load_manifest() {
    let fx = ResultsFixture::new(&[
        RunSpec::new("naive", 256, 0, "0.5").counters(&["A"], &["1"]),
        RunSpec::new("avx", 256, 32, "0.25")
            .tuning("unroll4")
            .repeat(1),
    ]);
    let catalog = fx.catalog();

    assert_eq!(catalog.results_dir(), fx.path());
    assert_eq!(catalog.len(), 2);
    let r0 = &catalog.records()[0];
    assert_eq!(r0.mode, "naive");
    assert_eq!(r0.n, Some(256));
    assert_eq!(r0.bs, Some(0));
    assert_eq!(r0.elapsed_s, Some(0.5));
    assert_eq!(r0.tuning, None);
    assert!(r0.log_path.is_some());

    let r1 = &catalog.records()[1];
    assert_eq!(r1.repeat, Some(1));
    assert_eq!(r1.tuning.as_deref(), Some("unroll4"));
    assert!(r1.log_path.is_none());
}

#[test]
fn test_missing_manifest() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = load_catalog(dir.path()).expect_err("no manifest");
    assert!(matches!(err, ReportError::ManifestNotFound(_)));
}

#[test]
fn test_missing_required_column() {
    let fx =
        ResultsFixture::with_raw_manifest("timestamp,mode,N,BS,repeat,logfile\nt,a,1,0,0,x.log\n");
    let err = load_catalog(fx.path()).expect_err("no elapsed_s column");
    match err {
        ReportError::MissingColumn { column, .. } => assert_eq!(column, "elapsed_s"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_unparsable_cells_and_extra_columns() {
    let fx = ResultsFixture::with_raw_manifest(
        "timestamp,mode,N,BS,repeat,elapsed_s,logfile,host\n\
         t0,naive,1024.0,abc,0,,none.log,node1\n",
    );
    let catalog = fx.catalog();

    assert_eq!(catalog.extra_columns(), ["host".to_owned()]);
    let r = &catalog.records()[0];
    assert_eq!(r.n, Some(1024));
    assert_eq!(r.bs, None);
    assert_eq!(r.elapsed_s, None);
    assert_eq!(r.tuning, None);
    assert_eq!(r.extra, vec!["node1".to_owned()]);
}

#[test]
fn test_extra_cells_are_kept_verbatim() {
    let fx = ResultsFixture::with_raw_manifest(
        "timestamp,mode,N,BS,repeat,elapsed_s,logfile, host ,note\n\
         t0, tiled , 512 ,32,0, 1.5 ,none.log,\" node1 \",\"  a, b \"\n",
    );
    let catalog = fx.catalog();

    assert_eq!(catalog.extra_columns(), ["host".to_owned(), "note".to_owned()]);
    let r = &catalog.records()[0];
    assert_eq!(r.mode, "tiled");
    assert_eq!(r.n, Some(512));
    assert_eq!(r.elapsed_s, Some(1.5));
    assert_eq!(r.extra, vec![" node1 ".to_owned(), "  a, b ".to_owned()]);
}

#[test]
fn test_log_path_resolution_order() {
    let fx = ResultsFixture::with_raw_manifest(MANIFEST_ONLY_HEADER);
    fx.write_file("logs/run.log", "x");
    fx.write_file("run.log", "y");

    // The reference relative to the results directory comes first.
    assert_eq!(
        resolve_log_path(fx.path(), "logs/run.log"),
        Some(fx.path().join("logs/run.log"))
    );
    // Otherwise the bare file name inside the results directory.
    assert_eq!(
        resolve_log_path(fx.path(), "elsewhere/run.log"),
        Some(fx.path().join("run.log"))
    );
    // Otherwise the reference as given.
    let abs = fx.path().join("logs/run.log");
    let other = tempfile::tempdir().expect("temp dir");
    assert_eq!(
        resolve_log_path(other.path(), abs.to_str().expect("utf-8 path")),
        Some(abs)
    );

    assert_eq!(resolve_log_path(fx.path(), "missing.log"), None);
    assert_eq!(resolve_log_path(fx.path(), ""), None);
}

const MANIFEST_ONLY_HEADER: &str = "timestamp,mode,N,BS,repeat,elapsed_s,logfile\n";

#[test]
fn test_tuning_sentinels() {
    for raw in ["", "NA", "NaN", "nan", "none", "None", "  "] {
        assert_eq!(tuning_label(raw), None, "raw={raw:?}");
    }
    assert_eq!(tuning_label(" unroll4 ").as_deref(), Some("unroll4"));
}

#[test]
fn test_join_preserves_rows_and_order() {
    let fx = ResultsFixture::new(&[
        RunSpec::new("a", 128, 0, "1.0").counters(&["PAPI_TOT_INS"], &["10"]),
        RunSpec::new("b", 128, 0, "2.0"),
        RunSpec::new("c", 256, 0, "3.0").counters(&["PAPI_TOT_CYC"], &["20"]),
    ]);
    let table = fx.joined();

    assert_eq!(table.len(), 3);
    let modes: Vec<&str> = table.rows().iter().map(|r| r.mode()).collect();
    assert_eq!(modes, ["a", "b", "c"]);
    assert!(table.rows()[1].counters().is_empty());
    assert_eq!(
        table.counter_columns(),
        ["PAPI_TOT_CYC".to_owned(), "PAPI_TOT_INS".to_owned()]
    );
}

#[test]
fn test_join_pads_short_parse_results() {
    let fx = ResultsFixture::new(&[
        RunSpec::new("a", 128, 0, "1.0").counters(&["X"], &["1"]),
        RunSpec::new("b", 128, 0, "2.0").counters(&["X"], &["2"]),
    ]);
    let catalog = fx.catalog();
    let mut parsed = catalog.parse_logs(&CounterBlockParser::default());
    parsed.truncate(1);

    let table = join_records(&catalog, parsed);
    assert_eq!(table.len(), 2);
    assert_eq!(table.rows()[0].counters().value_of("X"), Some(1.0));
    assert!(table.rows()[1].counters().is_empty());

    let table = join_records(&catalog, vec![ParsedLog::default(); 5]);
    assert_eq!(table.len(), 2);
}

#[test]
fn test_join_uses_summary_seconds() {
    let log = "SUMMARY\tN=64\tseconds=0.75\tchecksum=12.5\n".to_owned();
    let fx = ResultsFixture::new(&[
        RunSpec::new("a", 64, 0, "").log(log.clone()),
        RunSpec::new("b", 64, 0, "0.5").log(log),
    ]);
    let table = fx.joined();

    assert_eq!(table.rows()[0].elapsed_s(), Some(0.75));
    assert_eq!(table.rows()[1].elapsed_s(), Some(0.5));
    assert_eq!(table.rows()[0].checksum(), Some(12.5));
}

#[test]
fn test_display_labels() {
    let fx = ResultsFixture::new(&[
        RunSpec::new("avx", 64, 0, "1").tuning("unroll4"),
        RunSpec::new("avx", 64, 0, "1").tuning("None"),
    ]);
    let table = fx.joined();

    assert_eq!(common::labels(&table), ["avx (unroll4)", "avx"]);
    assert_eq!(table.rows()[0].original_mode(), "avx");
}
