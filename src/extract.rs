use super::{parse_timestamp, Dataset, Fields, PlotError, TimeValue, DT_FORMAT};
use chrono::NaiveDateTime;
use std::str::FromStr;
use tracing::{debug, warn};

/// Order of the points along the time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOrder {
    /// Raw timestamp string order; chronological only for monotonic formats.
    Lexicographic,
    /// Parsed time order.
    Chronological,
}

impl Default for TimeOrder {
    fn default() -> Self {
        TimeOrder::Lexicographic
    }
}

impl FromStr for TimeOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lexicographic" => Ok(TimeOrder::Lexicographic),
            "chronological" => Ok(TimeOrder::Chronological),
            _ => Err(format!("unknown sort order {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    pub date_format: String,
    pub order: TimeOrder,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            date_format: DT_FORMAT.to_string(),
            order: TimeOrder::default(),
        }
    }
}

/// A labelled line of a figure.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub label: String,
    pub series: TimeValue,
}

/// Everything needed to draw one parent's chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    pub lines: Vec<Line>,
}

impl Figure {
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.series.is_empty())
    }
}

/// Builds the figure for `parent` with one line per child.
/// An unknown parent gives empty lines; a record without a requested
/// child is an error.
pub fn extract(
    dataset: &Dataset,
    parent: &str,
    children: &[String],
    options: &ExtractOptions,
) -> Result<Figure, PlotError> {
    debug!("creating datetime list for {}", parent);
    let mut records: Vec<(&str, NaiveDateTime, &Fields)> = Vec::new();
    if let Some(series) = dataset.series(parent) {
        for (ts, fields) in series {
            let dt = parse_timestamp(ts, &options.date_format)?;
            records.push((ts.as_str(), dt, fields));
        }
    }
    if options.order == TimeOrder::Chronological {
        records.sort_by_key(|&(_, dt, _)| dt);
    }

    let mut lines = Vec::with_capacity(children.len());
    for child in children {
        debug!("drawing line for {}", child);
        let mut series = TimeValue::new(records.len());
        for &(ts, dt, fields) in &records {
            let value = fields
                .get(child)
                .copied()
                .ok_or_else(|| PlotError::MissingField {
                    parent: parent.to_string(),
                    timestamp: ts.to_string(),
                    child: child.clone(),
                })?;
            series.push(dt, value);
        }
        debug!("{} of {}:\n{}", child, parent, series);
        lines.push(Line {
            label: child.clone(),
            series,
        });
    }
    if lines.iter().any(|l| !l.series.is_ordered()) {
        warn!(
            "datetimes of {} are not chronological with format {}, consider --sort chronological",
            parent, options.date_format
        );
    }
    Ok(Figure {
        title: parent.to_string(),
        lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::{load, Layout};
    use std::io::Cursor;

    fn dataset(s: &str) -> Dataset {
        load(Cursor::new(s.as_bytes()), Layout::ParentFirst).unwrap()
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, DT_FORMAT).unwrap()
    }

    fn children(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn srv1_cpu_scenario() {
        let ds = dataset(concat!(
            r#"{"srv1": {"2018-01-01 00:00:00": {"cpu": 10}}}"#,
            "\n",
            r#"{"srv1": {"2018-01-01 00:01:00": {"cpu": 20}}}"#,
            "\n",
        ));
        let fig = extract(&ds, "srv1", &children(&["cpu"]), &ExtractOptions::default()).unwrap();
        assert_eq!(fig.title, "srv1");
        assert_eq!(fig.lines.len(), 1);
        assert_eq!(fig.lines[0].label, "cpu");
        let points: Vec<_> = fig.lines[0].series.points().collect();
        assert_eq!(
            points,
            vec![
                (dt("2018-01-01 00:00:00"), 10.),
                (dt("2018-01-01 00:01:00"), 20.)
            ]
        );
    }

    #[test]
    fn single_line_single_point() {
        let ds = dataset(r#"{"A": {"t1-2018-01-01": {"x": 1}}}"#);
        let options = ExtractOptions {
            date_format: "t1-%Y-%m-%d".to_string(),
            ..ExtractOptions::default()
        };
        let fig = extract(&ds, "A", &children(&["x"]), &options).unwrap();
        assert_eq!(fig.title, "A");
        assert_eq!(
            fig.lines[0].series.points().collect::<Vec<_>>(),
            vec![(dt("2018-01-01 00:00:00"), 1.)]
        );
    }

    #[test]
    fn empty_dataset_gives_empty_lines() {
        let ds = Dataset::new();
        let fig = extract(&ds, "srv1", &children(&["cpu", "mem"]), &ExtractOptions::default())
            .unwrap();
        assert_eq!(fig.lines.len(), 2);
        assert!(fig.is_empty());
    }

    #[test]
    fn iso_timestamps_sort_chronologically() {
        let ds = dataset(concat!(
            r#"{"s": {"2018-01-02 00:00:00": {"v": 2}}}"#,
            "\n",
            r#"{"s": {"2018-01-01 00:00:00": {"v": 1}}}"#,
        ));
        let fig = extract(&ds, "s", &children(&["v"]), &ExtractOptions::default()).unwrap();
        let series = &fig.lines[0].series;
        assert!(series.is_ordered());
        assert_eq!(series.value, vec![1., 2.]);
    }

    #[test]
    fn hour_only_format_keeps_distinct_hours() {
        let ds = dataset(concat!(
            r#"{"s": {"2018-01-01 17": {"v": 2}}}"#,
            "\n",
            r#"{"s": {"2018-01-01 05": {"v": 1}}}"#,
        ));
        let options = ExtractOptions {
            date_format: "%Y-%m-%d %H".to_string(),
            order: TimeOrder::Chronological,
        };
        let fig = extract(&ds, "s", &children(&["v"]), &options).unwrap();
        assert_eq!(
            fig.lines[0].series.points().collect::<Vec<_>>(),
            vec![
                (dt("2018-01-01 05:00:00"), 1.),
                (dt("2018-01-01 17:00:00"), 2.)
            ]
        );
    }

    #[test]
    fn non_monotonic_format_needs_chronological_order() {
        let ds = dataset(concat!(
            r#"{"s": {"02-01-2018": {"v": 2}}}"#,
            "\n",
            r#"{"s": {"01-02-2018": {"v": 3}}}"#,
            "\n",
            r#"{"s": {"01-01-2018": {"v": 1}}}"#,
        ));
        let mut options = ExtractOptions {
            date_format: "%d-%m-%Y".to_string(),
            order: TimeOrder::Lexicographic,
        };
        let fig = extract(&ds, "s", &children(&["v"]), &options).unwrap();
        // "01-02-2018" sorts before "02-01-2018" but is a month later
        assert!(!fig.lines[0].series.is_ordered());
        assert_eq!(fig.lines[0].series.value, vec![1., 3., 2.]);

        options.order = TimeOrder::Chronological;
        let fig = extract(&ds, "s", &children(&["v"]), &options).unwrap();
        assert!(fig.lines[0].series.is_ordered());
        assert_eq!(fig.lines[0].series.value, vec![1., 2., 3.]);
    }

    #[test]
    fn missing_child_is_an_error() {
        let ds = dataset(concat!(
            r#"{"srv1": {"2018-01-01 00:00:00": {"cpu": 10}}}"#,
            "\n",
            r#"{"srv1": {"2018-01-01 00:01:00": {"mem": 20}}}"#,
        ));
        match extract(&ds, "srv1", &children(&["cpu"]), &ExtractOptions::default()) {
            Err(PlotError::MissingField {
                parent,
                timestamp,
                child,
            }) => {
                assert_eq!(parent, "srv1");
                assert_eq!(timestamp, "2018-01-01 00:01:00");
                assert_eq!(child, "cpu");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_field_map_is_missing_not_skipped() {
        let ds = dataset(r#"{"srv1": {"2018-01-01 00:00:00": {}}}"#);
        assert!(matches!(
            extract(&ds, "srv1", &children(&["cpu"]), &ExtractOptions::default()),
            Err(PlotError::MissingField { .. })
        ));
    }

    #[test]
    fn bad_timestamp_is_an_error() {
        let ds = dataset(r#"{"srv1": {"noon": {"cpu": 1}}}"#);
        assert!(matches!(
            extract(&ds, "srv1", &children(&["cpu"]), &ExtractOptions::default()),
            Err(PlotError::Timestamp { .. })
        ));
    }

    #[test]
    fn order_from_str() {
        assert_eq!("chronological".parse(), Ok(TimeOrder::Chronological));
        assert_eq!("lexicographic".parse(), Ok(TimeOrder::Lexicographic));
        assert!("random".parse::<TimeOrder>().is_err());
    }
}
