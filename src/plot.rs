use super::extract::{extract, ExtractOptions, Figure, TimeOrder};
use super::load::{load_path, load_stdin, Layout};
use super::{min_and_max, suitable_xfmt, PlotError, DT_FORMAT, VERSION};
use chrono::prelude::*;
use clap::{App, Arg};
use plotters::prelude::*;
use std::collections::HashSet;
use std::ffi::OsString;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_SIZE: &str = "1600x800";

/// Run configuration, built from the CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub parents: Vec<String>,
    pub children: Vec<String>,
    pub input: Option<PathBuf>,
    pub outdir: PathBuf,
    pub layout: Layout,
    pub extract: ExtractOptions,
    pub size: (u32, u32),
    pub verbose: bool,
}

fn split_keys(s: &str) -> Vec<String> {
    s.split(',').map(String::from).collect()
}

/// Parses `WIDTHxHEIGHT`, both positive.
pub fn parse_size(s: &str) -> Result<(u32, u32), PlotError> {
    let invalid = || PlotError::InvalidSize(s.to_string());
    let mut parts = s.split('x');
    let w = parts.next().and_then(|p| p.parse::<u32>().ok());
    let h = parts.next().and_then(|p| p.parse::<u32>().ok());
    match (w, h, parts.next()) {
        (Some(w), Some(h), None) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(invalid()),
    }
}

/// Takes the CLI arguments that control loading and plotting.
pub fn parse_cli() -> Config {
    match parse_cli_from(std::env::args_os()) {
        Ok(config) => config,
        Err(e) => e.exit(),
    }
}

pub fn parse_cli_from<I, T>(args: I) -> Result<Config, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let arg_parents = Arg::with_name("parents")
        .help("parent key(s) of JSON to plot (comma separated)")
        .required(true)
        .index(1);
    let arg_children = Arg::with_name("children")
        .help("child key(s) of JSON to plot (comma separated)")
        .required(true)
        .index(2);
    let arg_input = Arg::with_name("input")
        .help("JSON lines input file, standard input if omitted")
        .short("i")
        .long("input")
        .takes_value(true);
    let arg_datefmt = Arg::with_name("datefmt")
        .help("JSON date format")
        .short("d")
        .long("datefmt")
        .takes_value(true)
        .default_value(DT_FORMAT);
    let arg_outdir = Arg::with_name("outdir")
        .help("directory for the svg files, one per parent")
        .short("o")
        .long("outdir")
        .takes_value(true)
        .default_value(".");
    let arg_layout = Arg::with_name("layout")
        .help("nesting of the JSON lines")
        .long_help(
            "parent-first: {parent: {datetime: {child: value}}}\n\
             time-first: {datetime: {parent: {child: value}}}",
        )
        .long("layout")
        .takes_value(true)
        .possible_values(&["parent-first", "time-first"])
        .default_value("parent-first");
    let arg_sort = Arg::with_name("sort")
        .help("order of the datetimes on the x axis")
        .long_help(
            "lexicographic sorts the raw datetime strings, which is chronological \
             only for formats like the default one; chronological sorts the parsed datetimes",
        )
        .long("sort")
        .takes_value(true)
        .possible_values(&["lexicographic", "chronological"])
        .default_value("lexicographic");
    let arg_size = Arg::with_name("size")
        .help("size of the svg images (WIDTHxHEIGHT)")
        .long("size")
        .takes_value(true)
        .default_value(DEFAULT_SIZE)
        .validator(|s| parse_size(&s).map(|_| ()).map_err(|e| e.to_string()));
    let arg_verbose = Arg::with_name("verbose")
        .help("show verbose debug output")
        .short("v")
        .long("verbose")
        .takes_value(false)
        .required(false);
    let cli_args = App::new("jsonl_plot")
        .version(VERSION.unwrap_or("unknown"))
        .author("Luca Peruzzo")
        .about("simple plotting of JSON lines from standard input or an input file")
        .arg(arg_parents)
        .arg(arg_children)
        .arg(arg_input)
        .arg(arg_datefmt)
        .arg(arg_outdir)
        .arg(arg_layout)
        .arg(arg_sort)
        .arg(arg_size)
        .arg(arg_verbose)
        .get_matches_from_safe(args)?;

    let invalid = |e: String| clap::Error::with_description(&e, clap::ErrorKind::InvalidValue);
    let parents = split_keys(cli_args.value_of("parents").unwrap_or_default());
    let children = split_keys(cli_args.value_of("children").unwrap_or_default());
    let input = cli_args.value_of("input").map(PathBuf::from);
    let outdir = PathBuf::from(cli_args.value_of("outdir").unwrap_or("."));
    let layout = cli_args
        .value_of("layout")
        .unwrap_or_default()
        .parse::<Layout>()
        .map_err(invalid)?;
    let order = cli_args
        .value_of("sort")
        .unwrap_or_default()
        .parse::<TimeOrder>()
        .map_err(invalid)?;
    let size = parse_size(cli_args.value_of("size").unwrap_or_default())
        .map_err(|e| invalid(e.to_string()))?;
    let date_format = cli_args.value_of("datefmt").unwrap_or(DT_FORMAT).to_string();
    Ok(Config {
        parents,
        children,
        input,
        outdir,
        layout,
        extract: ExtractOptions { date_format, order },
        size,
        verbose: cli_args.is_present("verbose"),
    })
}

/// File name for a parent key, replacing characters unsafe in paths.
pub fn svg_name(parent: &str) -> String {
    let stem: String = parent
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect();
    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        format!("_{}.svg", stem)
    } else {
        format!("{}.svg", stem)
    }
}

/// Picks a file name for `parent` not yet in `taken`, adding `-1`, `-2`, ...
/// when another parent already maps to the same name.
pub fn unique_svg_name(parent: &str, taken: &mut HashSet<String>) -> String {
    let name = svg_name(parent);
    if taken.insert(name.clone()) {
        return name;
    }
    let stem = name.strip_suffix(".svg").unwrap_or(&name);
    let mut i: usize = 1;
    loop {
        let candidate = format!("{}-{}.svg", stem, i);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        i += 1;
    }
}

/// Loads the input, then extracts and renders one figure per parent.
/// Returns the paths of the written svg files.
pub fn run(config: &Config) -> Result<Vec<PathBuf>, PlotError> {
    let stdin = std::io::stdin();
    let handle = stdin.lock();
    run_with_stdin(config, handle)
}

/// Same as [`run`], reading `stdin` when no input file is configured.
pub fn run_with_stdin<R: BufRead>(config: &Config, stdin: R) -> Result<Vec<PathBuf>, PlotError> {
    let dataset = match &config.input {
        Some(p) => load_path(p, config.layout)?,
        None => load_stdin(stdin, config.layout)?,
    };
    std::fs::create_dir_all(&config.outdir)?;
    let mut written = Vec::with_capacity(config.parents.len());
    let mut plotted: HashSet<&str> = HashSet::new();
    let mut taken: HashSet<String> = HashSet::new();
    for parent in &config.parents {
        if !plotted.insert(parent.as_str()) {
            debug!("skipping repeated parent {}", parent);
            continue;
        }
        debug!("creating plot for {}", parent);
        let figure = extract(&dataset, parent, &config.children, &config.extract)?;
        if figure.is_empty() {
            info!("no data for {}, the plot will be empty", parent);
        }
        let fout = config.outdir.join(unique_svg_name(parent, &mut taken));
        render_svg(&figure, &fout, config.size)?;
        info!("plot for {} written to {}", parent, fout.display());
        written.push(fout);
    }
    Ok(written)
}

/// x range with a 5% margin; single instants and empty figures get a fixed span.
fn time_range(figure: &Figure) -> (NaiveDateTime, NaiveDateTime) {
    let times = figure.lines.iter().flat_map(|l| l.series.time.iter());
    match min_and_max(times) {
        Some((a, b)) if a < b => {
            let margin = (b - a) / 20;
            (a - margin, b + margin)
        }
        Some((a, _)) => (a - chrono::Duration::hours(1), a + chrono::Duration::hours(1)),
        None => {
            let origin = NaiveDateTime::default();
            (origin, origin + chrono::Duration::days(1))
        }
    }
}

/// y range with a 10% margin; constant and empty figures get a fixed span.
fn value_range(figure: &Figure) -> (f64, f64) {
    let values = figure
        .lines
        .iter()
        .flat_map(|l| l.series.value.iter())
        .filter(|v| v.is_finite());
    match min_and_max(values) {
        Some((a, b)) if a < b => {
            let margin = (b - a) / 10f64;
            (a - margin, b + margin)
        }
        Some((a, _)) => (a - 1., a + 1.),
        None => (0., 1.),
    }
}

/// Color of the `i`-th line and its legend entry.
pub fn line_color(i: usize) -> RGBAColor {
    Palette99::pick(i).to_rgba()
}

/// Plots every line of the figure to svg, legend labelled by child key.
pub fn render_svg(figure: &Figure, fout: &Path, size: (u32, u32)) -> Result<(), PlotError> {
    let chart_err = |e: &dyn std::fmt::Display| PlotError::Chart {
        parent: figure.title.clone(),
        reason: e.to_string(),
    };
    let (xmin, xmax) = time_range(figure);
    let xfmt = suitable_xfmt(xmax - xmin);
    let xminutc = TimeZone::from_utc_datetime(&Utc, &xmin);
    let xmaxutc = TimeZone::from_utc_datetime(&Utc, &xmax);
    let (ymin, ymax) = value_range(figure);

    let root = SVGBackend::new(fout, size).into_drawing_area();
    root.fill(&WHITE).map_err(|e| chart_err(&e))?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&figure.title, ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(100)
        .build_cartesian_2d(xminutc..xmaxutc, ymin..ymax)
        .map_err(|e| chart_err(&e))?;
    chart
        .configure_mesh()
        .light_line_style(&TRANSPARENT)
        .bold_line_style(RGBColor(150, 150, 150).stroke_width(2))
        .set_all_tick_mark_size(2)
        .label_style(("sans-serif", 24))
        .x_labels(14) // max number of labels
        .x_label_formatter(&|x: &DateTime<Utc>| x.format(xfmt).to_string())
        .y_label_formatter(&|y: &f64| format!("{:5}", y))
        .x_desc(format!("datetime [{}]", xfmt.replace("%", "")))
        .draw()
        .map_err(|e| chart_err(&e))?;

    for (i, line) in figure.lines.iter().enumerate() {
        debug!("drawing {} points for {}", line.series.len(), line.label);
        let color = line_color(i);
        chart
            .draw_series(LineSeries::new(
                line.series
                    .points()
                    .map(|(t, v)| (TimeZone::from_utc_datetime(&Utc, &t), v)),
                color.stroke_width(3),
            ))
            .map_err(|e| chart_err(&e))?
            .label(line.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3)));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .label_font(("sans-serif", 20))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| chart_err(&e))?;
    root.present().map_err(|e| chart_err(&e))?;
    Ok(())
}
