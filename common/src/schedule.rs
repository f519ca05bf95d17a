use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    error::ConfigError,
    timetable::{self, format_time_of_day, TimeWindow},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemperatureBand {
    #[serde(rename = "minT")]
    pub min_t: f32,
    #[serde(rename = "maxT")]
    pub max_t: f32,
    #[serde(default)]
    pub splits: u32,
    #[serde(rename = "duration", default)]
    pub duration_secs: u32,
    #[serde(default)]
    pub table: Vec<TimeWindow>,
}

impl TemperatureBand {
    pub fn contains(&self, temp_c: f32) -> bool {
        self.min_t <= temp_c && temp_c < self.max_t
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeasonWindow {
    pub name: String,
    pub months: Vec<u32>,
    #[serde(deserialize_with = "one_or_many")]
    pub table: Vec<TimeWindow>,
}

impl SeasonWindow {
    pub fn contains_month(&self, month: u32) -> bool {
        self.months.contains(&month)
    }

    pub fn primary_window(&self) -> Option<&TimeWindow> {
        self.table.first()
    }
}

// Accepts a lone `{on, off}` object as well as a list of them.
fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<TimeWindow>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(TimeWindow),
        Many(Vec<TimeWindow>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(window) => vec![window],
        OneOrMany::Many(windows) => windows,
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScheduleTable {
    #[serde(default, alias = "timetable")]
    pub bands: Vec<TemperatureBand>,
    #[serde(default, alias = "whitehours")]
    pub seasons: Vec<SeasonWindow>,
}

impl ScheduleTable {
    pub fn select_band(&self, temp_c: f32) -> Option<(usize, &TemperatureBand)> {
        self.bands
            .iter()
            .enumerate()
            .find(|(_, band)| band.contains(temp_c))
    }

    pub fn select_season(&self, month: u32) -> Option<&SeasonWindow> {
        self.seasons
            .iter()
            .find(|season| season.contains_month(month))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, band) in self.bands.iter().enumerate() {
            if !band.min_t.is_finite() || !band.max_t.is_finite() || band.min_t >= band.max_t {
                return Err(ConfigError::EmptyBand {
                    index,
                    min_t: band.min_t,
                    max_t: band.max_t,
                });
            }
        }

        for season in &self.seasons {
            if let Some(&month) = season.months.iter().find(|m| !(1..=12).contains(*m)) {
                return Err(ConfigError::MonthOutOfRange {
                    name: season.name.clone(),
                    month,
                });
            }

            let Some(window) = season.primary_window() else {
                return Err(ConfigError::SeasonWithoutWindow(season.name.clone()));
            };
            if window.on >= window.off {
                return Err(ConfigError::InvertedSeasonWindow {
                    name: season.name.clone(),
                    on: format_time_of_day(window.on),
                    off: format_time_of_day(window.off),
                });
            }

            for (index, band) in self.bands.iter().enumerate() {
                timetable::generate(band, window).map_err(|source| {
                    ConfigError::Unschedulable {
                        band: index,
                        season: season.name.clone(),
                        source,
                    }
                })?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::TimetableError;

    const CONFIG: &str = r#"{
        "timetable": [
            { "minT": 0, "maxT": 15, "splits": 0, "duration": 0,
              "table": [{ "on": "8:00", "off": "10:00" }] },
            { "minT": 15, "maxT": 25, "splits": 2, "duration": 7200 },
            { "minT": 25, "maxT": 40, "splits": 3, "duration": 21600 }
        ],
        "whitehours": [
            { "name": "summer", "months": [5, 6, 7, 8, 9],
              "table": { "on": "6:00", "off": "21:00" } },
            { "name": "winter", "months": [10, 11, 12, 1, 2, 3, 4],
              "table": [{ "on": "9:00", "off": "17:00" }] }
        ]
    }"#;

    fn table() -> ScheduleTable {
        serde_json::from_str(CONFIG).unwrap()
    }

    #[test]
    fn reads_legacy_layout() {
        let table = table();

        assert_eq!(table.bands.len(), 3);
        assert_eq!(table.seasons.len(), 2);
        assert_eq!(table.seasons[0].table.len(), 1);
        assert_eq!(
            table.seasons[1].primary_window(),
            Some(&TimeWindow::parse("9:00", "17:00").unwrap())
        );
        assert!(table.validate().is_ok());
    }

    #[test]
    fn selects_first_matching_band() {
        let table = table();

        assert_eq!(table.select_band(14.9).map(|(i, _)| i), Some(0));
        assert_eq!(table.select_band(15.0).map(|(i, _)| i), Some(1));
        assert_eq!(table.select_band(24.99).map(|(i, _)| i), Some(1));
        assert_eq!(table.select_band(40.0).map(|(i, _)| i), None);
        assert_eq!(table.select_band(-1.0).map(|(i, _)| i), None);
    }

    #[test]
    fn overlapping_bands_resolve_in_declaration_order() {
        let mut table = table();
        table.bands.insert(
            0,
            TemperatureBand {
                min_t: 20.0,
                max_t: 30.0,
                splits: 1,
                duration_secs: 60,
                table: Vec::new(),
            },
        );

        assert_eq!(table.select_band(22.0).map(|(i, _)| i), Some(0));
    }

    #[test]
    fn selects_season_by_month() {
        let table = table();

        assert_eq!(table.select_season(7).map(|s| s.name.as_str()), Some("summer"));
        assert_eq!(table.select_season(1).map(|s| s.name.as_str()), Some("winter"));
        assert!(table.select_season(13).is_none());
    }

    #[test]
    fn rejects_month_out_of_range() {
        let mut table = table();
        table.seasons[0].months.push(0);

        assert_eq!(
            table.validate(),
            Err(ConfigError::MonthOutOfRange {
                name: "summer".to_string(),
                month: 0,
            })
        );
    }

    #[test]
    fn rejects_inverted_season_window() {
        let mut table = table();
        table.seasons[1].table = vec![TimeWindow::parse("22:00", "6:00").unwrap()];

        assert!(matches!(
            table.validate(),
            Err(ConfigError::InvertedSeasonWindow { .. })
        ));
    }

    #[test]
    fn rejects_band_without_splits_or_table() {
        let mut table = table();
        table.bands[1].splits = 0;

        assert!(matches!(
            table.validate(),
            Err(ConfigError::Unschedulable {
                band: 1,
                source: TimetableError::NoSplits,
                ..
            })
        ));
    }

    #[test]
    fn rejects_empty_band_range() {
        let mut table = table();
        table.bands[2].max_t = table.bands[2].min_t;

        assert!(matches!(
            table.validate(),
            Err(ConfigError::EmptyBand { index: 2, .. })
        ));
    }
}
