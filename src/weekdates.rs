use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

const FILE_NAME: &str = "week_dates.json";

/// A displayed week range. Overridden ranges are opaque labels taken
/// verbatim from the editor; only computed defaults are real dates.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeekRange {
    pub start: String,
    pub end: String,
}

pub struct Resolved {
    pub range: WeekRange,
    pub overridden: bool,
}

/// Manual week-date overrides, sparse by week number. The mapping is
/// read once at workspace open and rewritten on every mutation.
pub struct WeekDates {
    path: PathBuf,
    overrides: BTreeMap<i64, WeekRange>,
}

impl WeekDates {
    pub fn load(workspace: &Path) -> Self {
        let path = workspace.join(FILE_NAME);
        let overrides = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, WeekRange>>(&raw) {
                Ok(map) => map
                    .into_iter()
                    .filter_map(|(k, v)| k.parse::<i64>().ok().map(|week| (week, v)))
                    .collect(),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring malformed week dates file");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self { path, overrides }
    }

    pub fn resolve(&self, week: i64, school_year_start: NaiveDate) -> Resolved {
        if let Some(range) = self.overrides.get(&week) {
            return Resolved {
                range: range.clone(),
                overridden: true,
            };
        }
        let start = school_year_start + Duration::days((week - 1) * 7);
        let end = start + Duration::days(6);
        Resolved {
            range: WeekRange {
                start: start.format("%Y-%m-%d").to_string(),
                end: end.format("%Y-%m-%d").to_string(),
            },
            overridden: false,
        }
    }

    pub fn set_override(&mut self, week: i64, start: &str, end: &str) -> anyhow::Result<WeekRange> {
        let range = WeekRange {
            start: start.to_string(),
            end: end.to_string(),
        };
        self.overrides.insert(week, range.clone());
        self.persist()?;
        Ok(range)
    }

    pub fn reset_override(&mut self, week: i64) -> anyhow::Result<()> {
        if self.overrides.remove(&week).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    pub fn set_to_today(&mut self, week: i64) -> anyhow::Result<WeekRange> {
        let today = Local::now().date_naive();
        let end = today + Duration::days(6);
        self.set_override(
            week,
            &today.format("%Y-%m-%d").to_string(),
            &end.format("%Y-%m-%d").to_string(),
        )
    }

    fn persist(&self) -> anyhow::Result<()> {
        let map: BTreeMap<String, &WeekRange> = self
            .overrides
            .iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        std::fs::write(&self.path, serde_json::to_string_pretty(&map)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn year_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()
    }

    #[test]
    fn computed_defaults_walk_seven_day_windows() {
        let dir = TempDir::new().unwrap();
        let dates = WeekDates::load(dir.path());

        let week1 = dates.resolve(1, year_start());
        assert!(!week1.overridden);
        assert_eq!(week1.range.start, "2024-09-01");
        assert_eq!(week1.range.end, "2024-09-07");

        let week2 = dates.resolve(2, year_start());
        assert_eq!(week2.range.start, "2024-09-08");
        assert_eq!(week2.range.end, "2024-09-14");
    }

    #[test]
    fn override_is_returned_verbatim_and_reset_restores_default() {
        let dir = TempDir::new().unwrap();
        let mut dates = WeekDates::load(dir.path());

        let default3 = dates.resolve(3, year_start()).range;
        dates
            .set_override(3, "exam week", "back after eid")
            .unwrap();
        let resolved = dates.resolve(3, year_start());
        assert!(resolved.overridden);
        assert_eq!(resolved.range.start, "exam week");
        assert_eq!(resolved.range.end, "back after eid");

        dates.reset_override(3).unwrap();
        let after = dates.resolve(3, year_start());
        assert!(!after.overridden);
        assert_eq!(after.range, default3);
    }

    #[test]
    fn overrides_survive_reload() {
        let dir = TempDir::new().unwrap();
        {
            let mut dates = WeekDates::load(dir.path());
            dates.set_override(5, "2024-10-06", "2024-10-12").unwrap();
        }
        let dates = WeekDates::load(dir.path());
        let resolved = dates.resolve(5, year_start());
        assert!(resolved.overridden);
        assert_eq!(resolved.range.start, "2024-10-06");
        // Untouched weeks still compute.
        assert!(!dates.resolve(4, year_start()).overridden);
    }

    #[test]
    fn set_to_today_spans_seven_days() {
        let dir = TempDir::new().unwrap();
        let mut dates = WeekDates::load(dir.path());
        let range = dates.set_to_today(2).unwrap();

        let start = NaiveDate::parse_from_str(&range.start, "%Y-%m-%d").unwrap();
        let end = NaiveDate::parse_from_str(&range.end, "%Y-%m-%d").unwrap();
        assert_eq!(end - start, Duration::days(6));
        assert!(dates.resolve(2, year_start()).overridden);
    }

    #[test]
    fn malformed_file_falls_back_to_no_overrides() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(FILE_NAME), "not json").unwrap();
        let dates = WeekDates::load(dir.path());
        assert!(!dates.resolve(1, year_start()).overridden);
    }
}
