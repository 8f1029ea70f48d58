use chrono::format::{parse, Parsed, StrftimeItems};
use chrono::prelude::*;
use std::collections::BTreeMap;
pub mod error;
pub mod extract;
pub mod load;
pub mod logging;
pub mod plot;

pub use error::PlotError;

pub const DT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

/// Field name to numeric value, the innermost level of a record.
pub type Fields = BTreeMap<String, f64>;

/// Raw timestamp string to fields, kept in lexicographic key order.
pub type Series = BTreeMap<String, Fields>;

/// The merged dataset: parent key -> timestamp -> field -> value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    parents: BTreeMap<String, Series>,
}

impl Dataset {
    pub fn new() -> Dataset {
        Dataset::default()
    }

    /// Merges a parent's series; a timestamp already present is replaced
    /// by the incoming field map as a whole.
    pub fn merge(&mut self, parent: String, series: Series) {
        self.parents.entry(parent).or_default().extend(series);
    }

    /// Sets the fields of one parent at one timestamp, replacing any previous map.
    pub fn insert(&mut self, parent: String, timestamp: String, fields: Fields) {
        self.parents
            .entry(parent)
            .or_default()
            .insert(timestamp, fields);
    }

    pub fn series(&self, parent: &str) -> Option<&Series> {
        self.parents.get(parent)
    }

    pub fn parents(&self) -> impl Iterator<Item = &str> {
        self.parents.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

/// One plotted line: values paired with the time they were recorded at.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeValue {
    pub time: Vec<NaiveDateTime>,
    pub value: Vec<f64>,
}

impl TimeValue {
    pub fn new(capacity: usize) -> TimeValue {
        TimeValue {
            time: Vec::with_capacity(capacity),
            value: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, time: NaiveDateTime, value: f64) {
        self.time.push(time);
        self.value.push(value);
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.time.iter().copied().zip(self.value.iter().copied())
    }

    /// true if no datetime comes before its predecessor
    pub fn is_ordered(&self) -> bool {
        self.time.windows(2).all(|w| w[0] <= w[1])
    }
}

impl std::fmt::Display for TimeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "datetime,value")?;
        for (t, v) in self.points() {
            writeln!(f, "{},{}", t, v)?
        }
        Ok(())
    }
}

/// Parses a timestamp key. Time fields the format leaves out default to
/// zero, so `%Y-%m-%d` gives midnight and `%Y-%m-%d %H` the full hour;
/// a 12-hour clock without `%p` reads as AM.
pub fn parse_timestamp(timestamp: &str, format: &str) -> Result<NaiveDateTime, PlotError> {
    let to_error = |source| PlotError::Timestamp {
        timestamp: timestamp.to_string(),
        format: format.to_string(),
        source,
    };
    let mut parsed = Parsed::new();
    parse(&mut parsed, timestamp, StrftimeItems::new(format)).map_err(to_error)?;
    if parsed.timestamp().is_none() {
        if parsed.hour_div_12().is_none() {
            parsed.set_ampm(false).map_err(to_error)?;
        }
        if parsed.hour_mod_12().is_none() {
            parsed.set_hour12(12).map_err(to_error)?;
        }
        if parsed.minute().is_none() {
            parsed.set_minute(0).map_err(to_error)?;
        }
        if parsed.second().is_none() {
            parsed.set_second(0).map_err(to_error)?;
        }
    }
    parsed.to_naive_datetime_with_offset(0).map_err(to_error)
}

pub fn min_and_max<'a, T, I>(values: I) -> Option<(T, T)>
where
    T: PartialOrd + Copy + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut iter = values.into_iter();
    let first = *iter.next()?;
    let (mut min, mut max) = (first, first);
    for &v in iter {
        if v > max {
            max = v
        }
        if v < min {
            min = v
        }
    }
    Some((min, max))
}

pub fn suitable_xfmt(d: chrono::Duration) -> &'static str {
    if d > chrono::Duration::weeks(1) {
        "%y-%m-%d"
    } else if d > chrono::Duration::days(1) {
        "%m-%d %H"
    } else {
        "%d %H:%M"
    }
}
