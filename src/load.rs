use super::{Dataset, Fields, PlotError};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// How the two outer levels of each line are nested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `{parent: {timestamp: {child: value}}}`
    ParentFirst,
    /// `{timestamp: {parent: {child: value}}}`
    TimeFirst,
}

impl Default for Layout {
    fn default() -> Self {
        Layout::ParentFirst
    }
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parent-first" => Ok(Layout::ParentFirst),
            "time-first" => Ok(Layout::TimeFirst),
            _ => Err(format!("unknown layout {}", s)),
        }
    }
}

/// A single input line: exactly one outer key over two nested maps.
type Record = BTreeMap<String, BTreeMap<String, Fields>>;

/// Parses one line into its single outer key and the nested maps.
fn parse_record(line: &str, lineno: usize) -> Result<(String, BTreeMap<String, Fields>), PlotError> {
    let record: Record = serde_json::from_str(line).map_err(|source| PlotError::Json {
        line: lineno,
        source,
    })?;
    if record.len() != 1 {
        return Err(PlotError::NotSingleKey {
            line: lineno,
            found: record.len(),
        });
    }
    record
        .into_iter()
        .next()
        .ok_or(PlotError::NotSingleKey {
            line: lineno,
            found: 0,
        })
}

/// Merges one line of text into the dataset.
pub fn merge_line(
    dataset: &mut Dataset,
    line: &str,
    lineno: usize,
    layout: Layout,
) -> Result<(), PlotError> {
    let (outer, inner) = parse_record(line, lineno)?;
    match layout {
        Layout::ParentFirst => dataset.merge(outer, inner),
        Layout::TimeFirst => {
            for (parent, fields) in inner {
                dataset.insert(parent, outer.clone(), fields);
            }
        }
    }
    Ok(())
}

/// Reads JSON lines and merges them, later lines overwriting earlier
/// ones at the timestamp level. Blank lines are skipped.
pub fn load<R: BufRead>(reader: R, layout: Layout) -> Result<Dataset, PlotError> {
    info!("parsing JSON lines");
    let mut dataset = Dataset::new();
    let mut count = 0;
    for (i, l) in reader.lines().enumerate() {
        let l = l?;
        if l.trim().is_empty() {
            continue;
        }
        merge_line(&mut dataset, &l, i + 1, layout)?;
        count += 1;
    }
    debug!(lines = count, parents = dataset.len(), "JSON lines merged");
    for parent in dataset.parents() {
        debug!(
            parent,
            timestamps = dataset.series(parent).map_or(0, |s| s.len()),
            "loaded"
        );
    }
    Ok(dataset)
}

pub fn load_path(path: &Path, layout: Layout) -> Result<Dataset, PlotError> {
    info!("reading {}", path.display());
    let file = File::open(path)?;
    load(BufReader::new(file), layout)
}

/// Loads from an already locked standard input handle.
pub fn load_stdin<R: BufRead>(stdin: R, layout: Layout) -> Result<Dataset, PlotError> {
    info!("reading standard input");
    load(stdin, layout)
}
