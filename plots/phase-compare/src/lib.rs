use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use common::{
    classify::{Label, Phase},
    config::{Config, Settings},
    dataset::Dataset,
    partition::{Partition, PartitionId},
    plot::{
        Plot, Series, SeriesColors, SeriesSelection, expand_selections, series_points,
        write_plot_data,
    },
    stats::StatisticKind,
    util::{deserialize_size, format_power_of_two},
};
use eyre::{Result, eyre};
use itertools::{Itertools, MinMaxResult};
use plotters::{
    coord::Shift,
    prelude::*,
    style::{FontStyle, register_font},
};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use tracing::debug;

const FONT_FAMILY: &str = "sans-serif";
const DEJAVU_SANS: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");
/// x range used when a partition has no rows at all
const EMPTY_X_RANGE: (f64, f64) = (1.0, 1_048_576.0);
const KIB: u64 = 1024;

/// Compares phases of several experiments across message sizes. Renders one
/// figure per partition, each with a mean, p99 and max subplot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseCompare {
    pub name: String,
    pub title: String,
    pub series: Vec<SeriesSelection>,
    /// Also render `<= threshold` and `> threshold` figures
    #[serde(
        default,
        deserialize_with = "deserialize_size",
        skip_serializing_if = "Option::is_none"
    )]
    pub threshold: Option<u64>,
    #[serde(default = "default_dimensions")]
    pub dimensions: (u32, u32),
}

fn default_dimensions() -> (u32, u32) {
    (1500, 1000)
}

struct FigureJob<'a> {
    filepath: PathBuf,
    stem: String,
    title: String,
    partition: Partition<'a>,
}

#[derive(Debug, Serialize)]
struct PlotData {
    title: String,
    statistics: Vec<StatisticData>,
}

#[derive(Debug, Serialize)]
struct StatisticData {
    statistic: StatisticKind,
    series: Vec<SeriesData>,
}

#[derive(Debug, Serialize)]
struct SeriesData {
    series: Series,
    points: Vec<(u64, f64)>,
}

#[typetag::serde]
impl Plot for PhaseCompare {
    fn name(&self) -> &str {
        &self.name
    }

    fn plot(&self, dataset: &Dataset, plot_path: &Path) -> Result<Vec<PathBuf>> {
        let series = expand_selections(&self.series);
        debug!("{}: {} series", self.name, series.len());

        let jobs = self
            .partitions(dataset)
            .into_iter()
            .map(|partition| {
                let stem = format!("{}_{}", self.name, partition.id.slug());
                FigureJob {
                    filepath: plot_path.join(format!("{stem}.png")),
                    title: self.figure_title(partition.id),
                    stem,
                    partition,
                }
            })
            .collect::<Vec<_>>();

        jobs.into_par_iter()
            .map(|job| -> Result<PathBuf> {
                let data = plot_data(&job.title, &job.partition, &series);
                write_plot_data(plot_path, &job.stem, &data)?;
                render_figure(&job.filepath, self.dimensions, &data, &job.partition)?;
                debug!("Wrote {}", job.filepath.display());
                Ok(job.filepath)
            })
            .collect()
    }
}

impl PhaseCompare {
    pub fn new(
        name: &str,
        title: &str,
        series: Vec<SeriesSelection>,
        threshold: Option<u64>,
    ) -> Self {
        Self {
            name: name.to_owned(),
            title: title.to_owned(),
            series,
            threshold,
            dimensions: default_dimensions(),
        }
    }

    fn partitions<'a>(&self, dataset: &'a Dataset) -> Vec<Partition<'a>> {
        let mut partitions = vec![Partition::all(dataset)];
        if let Some(threshold) = self.threshold {
            let (low, high) = common::partition::split(dataset, threshold);
            partitions.push(low);
            partitions.push(high);
        }
        partitions
    }

    fn figure_title(&self, id: PartitionId) -> String {
        match id {
            PartitionId::All => self.title.clone(),
            id => format!("{} ({id})", self.title),
        }
    }
}

fn plot_data(title: &str, partition: &Partition, series: &[Series]) -> PlotData {
    let statistics = StatisticKind::ALL
        .into_iter()
        .map(|statistic| StatisticData {
            statistic,
            series: series
                .iter()
                .map(|x| SeriesData {
                    series: *x,
                    points: series_points(partition, *x, statistic),
                })
                .filter(|x| !x.points.is_empty())
                .collect(),
        })
        .collect();
    PlotData {
        title: title.to_owned(),
        statistics,
    }
}

fn ensure_font() -> Result<()> {
    static REGISTERED: OnceLock<std::result::Result<(), String>> = OnceLock::new();
    REGISTERED
        .get_or_init(|| {
            register_font(FONT_FAMILY, FontStyle::Normal, DEJAVU_SANS)
                .map_err(|_| "Invalid bundled font".to_owned())
        })
        .clone()
        .map_err(|err| eyre!(err))
}

fn x_range(partition: &Partition) -> (f64, f64) {
    match partition
        .rows
        .iter()
        .map(|x| x.experiment.message_size as f64)
        .minmax_by(f64::total_cmp)
    {
        MinMaxResult::NoElements => EMPTY_X_RANGE,
        MinMaxResult::OneElement(x) => (x / 2.0, x * 2.0),
        MinMaxResult::MinMax(min, max) if min == max => (min / 2.0, max * 2.0),
        MinMaxResult::MinMax(min, max) => (min, max),
    }
}

fn render_figure(
    filepath: &Path,
    dimensions: (u32, u32),
    data: &PlotData,
    partition: &Partition,
) -> Result<()> {
    ensure_font()?;
    let root = BitMapBackend::new(filepath, dimensions).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(&data.title, (FONT_FAMILY, 28))?;

    let x_range = x_range(partition);
    let mut colors = SeriesColors::default();
    let areas = root.split_evenly((data.statistics.len(), 1));
    for (area, statistic) in areas.iter().zip(&data.statistics) {
        draw_statistic(area, statistic, x_range, &mut colors)?;
    }

    root.present()?;
    Ok(())
}

fn draw_statistic(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    statistic: &StatisticData,
    (x_min, x_max): (f64, f64),
    colors: &mut SeriesColors,
) -> Result<()> {
    let y_max = statistic
        .series
        .iter()
        .flat_map(|x| x.points.iter().map(|point| point.1))
        .fold(0.0, f64::max);
    let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

    let mut chart = ChartBuilder::on(area)
        .caption(statistic.statistic.title(), (FONT_FAMILY, 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d((x_min..x_max).log_scale().base(2.0), 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Message Size (Bytes)")
        .y_desc("Time (µs)")
        .x_label_formatter(&|x| format_power_of_two(*x))
        .y_label_formatter(&|y| format!("{y:.1}"))
        .label_style((FONT_FAMILY, 14))
        .draw()?;

    for item in &statistic.series {
        let (r, g, b) = colors.color(item.series);
        let color = RGBColor(r, g, b);
        chart
            .draw_series(LineSeries::new(
                item.points.iter().map(|(x, y)| (*x as f64, *y)),
                color.stroke_width(2),
            ))?
            .label(item.series.to_string())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
    }

    if !statistic.series.is_empty() {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .label_font((FONT_FAMILY, 13))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}

/// The figures produced when no config file is given
pub fn default_plots() -> Vec<Box<dyn Plot>> {
    use SeriesSelection as S;

    let async_flush = [Label::AsyncIoSync, Label::AsyncIoDsync];
    let plots = vec![
        PhaseCompare::new(
            "all_conditions",
            "Time spent by threads for I/O",
            Label::ALL.into_iter().map(S::all_phases).collect(),
            Some(2 * KIB),
        ),
        PhaseCompare::new(
            "removed_conditions",
            "Time spent by threads for I/O (Conditions Removed)",
            [Label::AsyncIo, Label::AsyncIoSync, Label::AsyncIoDsync]
                .into_iter()
                .map(S::all_phases)
                .chain([
                    S::phases(Label::MmapIo, &[Phase::Memcpy]),
                    S::all_phases(Label::RdmaSendRecv),
                    S::all_phases(Label::RdmaSendRecvC),
                ])
                .collect(),
            Some(64 * KIB),
        ),
        PhaseCompare::new(
            "write_registered",
            "Time to register a write",
            [
                S::phases(Label::SyncIo, &[Phase::Write]),
                S::phases(Label::AsyncIo, &[Phase::Initiation]),
            ]
            .into_iter()
            .chain(async_flush.map(|x| S::phases(x, &[Phase::WriteRegistered])))
            .chain([
                S::phases(Label::MmapIo, &[Phase::Memcpy]),
                S::phases(Label::RdmaSendRecv, &[Phase::BeforeWait]),
            ])
            .collect(),
            Some(16 * KIB),
        ),
        PhaseCompare::new(
            "write_completed",
            "Time to complete a write",
            [
                S::phases(Label::SyncIo, &[Phase::Write]),
                S::phases(Label::AsyncIo, &[Phase::Fsync]),
            ]
            .into_iter()
            .chain(async_flush.map(|x| S::phases(x, &[Phase::FsyncCompleted])))
            .chain([
                S::phases(Label::MmapIo, &[Phase::Msync]),
                S::phases(Label::RdmaSendRecv, &[Phase::AfterWait]),
            ])
            .collect(),
            Some(16 * KIB),
        ),
        PhaseCompare::new(
            "round_trip",
            "Full round trip",
            vec![
                S::phases(Label::RdmaSendRecv, &[Phase::Rtt]),
                S::phases(Label::RdmaSendRecvC, &[Phase::Rtt]),
            ],
            Some(16 * KIB),
        ),
        PhaseCompare::new(
            "c_and_cpp_comparison",
            "RDMA send/recv latency, C++ vs C wrapper",
            vec![
                S::all_phases(Label::RdmaSendRecv),
                S::all_phases(Label::RdmaSendRecvC),
            ],
            None,
        ),
    ];

    plots
        .into_iter()
        .map(|x| Box::new(x) as Box<dyn Plot>)
        .collect()
}

pub fn default_config() -> Config {
    Config {
        name: "io-latency".to_owned(),
        settings: Settings::default(),
        plots: default_plots(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plot_names_are_unique() {
        let plots = default_plots();
        let names = plots.iter().map(|x| x.name()).unique().count();
        assert_eq!(names, plots.len());
    }

    #[test]
    fn default_selections_only_use_measured_phases() {
        for plot in default_plots() {
            let plot = plot.downcast_ref::<PhaseCompare>().unwrap();
            for series in expand_selections(&plot.series) {
                assert!(
                    series.label.phases().contains(&series.phase),
                    "{}: {series}",
                    plot.name
                );
            }
        }
    }

    #[test]
    fn titles_name_the_partition() {
        let plot = PhaseCompare::new("x", "Latency", Vec::new(), Some(2 * KIB));
        assert_eq!(plot.figure_title(PartitionId::All), "Latency");
        assert_eq!(
            plot.figure_title(PartitionId::AtMost(2 * KIB)),
            "Latency (Message Size <= 2KiB)"
        );
    }

    #[test]
    fn partitions_per_threshold() {
        let dataset = Dataset::default();
        let with = PhaseCompare::new("x", "x", Vec::new(), Some(KIB));
        let ids = with.partitions(&dataset).iter().map(|x| x.id).collect::<Vec<_>>();
        assert_eq!(
            ids,
            vec![PartitionId::All, PartitionId::AtMost(KIB), PartitionId::Above(KIB)]
        );
        let without = PhaseCompare::new("x", "x", Vec::new(), None);
        assert_eq!(without.partitions(&dataset).len(), 1);
    }

    #[test]
    fn empty_partition_spans_default_range() {
        let dataset = Dataset::default();
        assert_eq!(x_range(&Partition::all(&dataset)), EMPTY_X_RANGE);
    }

    #[test]
    fn threshold_accepts_suffixes() {
        let yaml = "name: x\ntitle: x\nthreshold: 16k\n\
                    series:\n  - label: rdma_send_recv\n    phases: [rtt]\n";
        let plot: PhaseCompare = serde_yml::from_str(yaml).unwrap();
        assert_eq!(plot.threshold, Some(16 * KIB));
        assert_eq!(plot.dimensions, default_dimensions());
        assert_eq!(
            expand_selections(&plot.series),
            vec![Series {
                label: Label::RdmaSendRecv,
                phase: Phase::Rtt
            }]
        );

        let plot: PhaseCompare =
            serde_yml::from_str("name: x\ntitle: x\nthreshold: 2048\nseries: []\n").unwrap();
        assert_eq!(plot.threshold, Some(2048));
    }
}
