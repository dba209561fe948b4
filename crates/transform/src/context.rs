use std::collections::HashSet;

use chrono::{Datelike, Local, NaiveDate};

use crate::mapping::Series;

/// Run date used for the initial fixed-date release.
pub const FIXED_RUN_DATE: (i32, u32, u32) = (2025, 3, 31);

/// State of one transform run: its date, an optional data cutoff and the
/// first-seen order of series codes across datasets.
#[derive(Clone, Debug)]
pub struct RunContext {
    run_date: NaiveDate,
    cutoff: Option<String>,
    series: Vec<Series>,
    seen: HashSet<String>,
}

impl RunContext {
    pub fn new(run_date: NaiveDate) -> Self {
        Self {
            run_date,
            cutoff: None,
            series: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn today() -> Self {
        Self::new(Local::now().date_naive())
    }

    /// Dated 2025-03-31; months after 2025-03 are dropped.
    pub fn fixed() -> Self {
        let (year, month, day) = FIXED_RUN_DATE;
        let run_date = NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN);
        Self::new(run_date).with_cutoff(run_date)
    }

    pub fn with_cutoff(mut self, last_month: NaiveDate) -> Self {
        self.cutoff = Some(last_month.format("%Y-%m").to_string());
        self
    }

    pub fn run_date(&self) -> NaiveDate {
        self.run_date
    }

    /// `YYYYMMDD` used in output file names.
    pub fn stamp(&self) -> String {
        self.run_date.format("%Y%m%d").to_string()
    }

    pub fn includes(&self, month: &str) -> bool {
        self.cutoff.as_deref().map_or(true, |last| month <= last)
    }

    /// Record a series; returns false when its code was already seen.
    pub fn register(&mut self, series: &Series) -> bool {
        if !self.seen.insert(series.code.clone()) {
            return false;
        }
        self.series.push(series.clone());
        true
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// Last day of the month after the run date, at noon.
    pub fn next_release_date(&self) -> String {
        let (year, month) = match self.run_date.month() {
            12 => (self.run_date.year() + 1, 1),
            month => (self.run_date.year(), month + 1),
        };
        let (after_year, after_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        NaiveDate::from_ymd_opt(after_year, after_month, 1)
            .and_then(|first| first.pred_opt())
            .map(|last| format!("{}T12:00:00", last.format("%Y-%m-%d")))
            .unwrap_or_default()
    }
}
