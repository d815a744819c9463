use std::{fs, path::Path};

use common::{
    classify::{Experiment, Label, Phase},
    config::Config,
    dataset::{Dataset, DatasetBuilder},
    plot::{Plot, SeriesSelection, plot},
    record::parse_records,
};
use phase_compare::{PhaseCompare, default_config, default_plots};
use tempfile::tempdir;

fn dataset() -> Dataset {
    let mut builder = DatasetBuilder::default();
    for (size, data) in [
        (256, "10\t20\t100\n10\t20\t300\n"),
        (4096, "10\t20\t900\n10\t20\t1100\n"),
        (65536, "10\t20\t5000\n"),
    ] {
        let records = parse_records(
            Path::new("rdma"),
            &format!("before wait\tafter wait\trtt\n{data}"),
        )
        .unwrap();
        builder.add_records(
            Experiment {
                label: Label::RdmaSendRecv,
                message_size: size,
            },
            &records,
        );
    }
    builder.finish()
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names = fs::read_dir(dir)
        .unwrap()
        .map(|x| x.unwrap())
        .filter(|x| x.path().is_file())
        .map(|x| x.file_name().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    names.sort();
    names
}

#[test]
fn empty_dataset_still_renders() {
    let dir = tempdir().unwrap();
    let plots = default_plots();
    let written = plot(&plots, &Dataset::default(), dir.path()).unwrap();

    // three partitions per thresholded set, one for the comparison
    assert_eq!(written.len(), 5 * 3 + 1);
    for path in &written {
        assert!(path.exists(), "{}", path.display());
        assert!(fs::metadata(path).unwrap().len() > 0);
    }
}

#[test]
fn file_names_are_deterministic() {
    let dir = tempdir().unwrap();
    let plots: Vec<Box<dyn Plot>> = vec![Box::new(PhaseCompare::new(
        "round_trip",
        "Full round trip",
        vec![SeriesSelection::phases(Label::RdmaSendRecv, &[Phase::Rtt])],
        Some(16 * 1024),
    ))];

    plot(&plots, &dataset(), dir.path()).unwrap();
    assert_eq!(
        file_names(dir.path()),
        vec![
            "round_trip_all.png",
            "round_trip_gt_16KiB.png",
            "round_trip_le_16KiB.png",
        ]
    );
    assert_eq!(
        file_names(&dir.path().join("plot_data")),
        vec![
            "round_trip_all.json",
            "round_trip_gt_16KiB.json",
            "round_trip_le_16KiB.json",
        ]
    );
}

#[test]
fn plot_data_holds_microseconds() {
    let dir = tempdir().unwrap();
    let plots: Vec<Box<dyn Plot>> = vec![Box::new(PhaseCompare::new(
        "rtt",
        "Round trip",
        vec![
            SeriesSelection::phases(Label::RdmaSendRecv, &[Phase::Rtt]),
            SeriesSelection::all_phases(Label::SyncIo),
        ],
        Some(1024),
    ))];
    plot(&plots, &dataset(), dir.path()).unwrap();

    let data: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("plot_data/rtt_le_1KiB.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(data["title"], "Round trip (Message Size <= 1KiB)");

    let statistics = data["statistics"].as_array().unwrap();
    assert_eq!(statistics.len(), 3);
    assert_eq!(statistics[0]["statistic"], "mean");

    // sync_io has no rows, so only the rdma series is drawn
    let series = statistics[0]["series"].as_array().unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0]["series"]["label"], "rdma_send_recv");
    let points = series[0]["points"].as_array().unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0][0], 256);
    assert!((points[0][1].as_f64().unwrap() - 0.2).abs() < 1e-9);

    let data: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("plot_data/rtt_gt_1KiB.json")).unwrap(),
    )
    .unwrap();
    let points = data["statistics"][2]["series"][0]["points"].as_array().unwrap();
    let sizes = points.iter().map(|x| x[0].as_u64().unwrap()).collect::<Vec<_>>();
    assert_eq!(sizes, vec![4096, 65536]);
    assert!((points[0][1].as_f64().unwrap() - 1.1).abs() < 1e-9);
}

#[test]
fn default_config_round_trips() {
    let yaml = serde_yml::to_string(&default_config()).unwrap();
    let config: Config = serde_yml::from_str(&yaml).unwrap();

    assert_eq!(config.name, "io-latency");
    assert_eq!(config.plots.len(), 6);
    let names = config.plots.iter().map(|x| x.name()).collect::<Vec<_>>();
    assert_eq!(
        names,
        vec![
            "all_conditions",
            "removed_conditions",
            "write_registered",
            "write_completed",
            "round_trip",
            "c_and_cpp_comparison",
        ]
    );

    let removed = config.plots[1].downcast_ref::<PhaseCompare>().unwrap();
    assert_eq!(removed.threshold, Some(64 * 1024));
    assert!(removed.series.iter().all(|x| x.label != Label::SyncIo));
}
