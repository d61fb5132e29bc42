//! Enumeration of organisation → season → week → fixture.
use chrono::{Days, NaiveDate};
use log::{debug, info};

use crate::{
    api::{SchedulaClient, Transport},
    error::{Error, ParseAnomaly, Result},
    parser::{
        fixtures,
        options::{self, Anchor},
        report_anomalies, Parsed,
    },
    progress::Progress,
    role::is_blacklisted,
    schema::{Appointment, Fixture, Organisation, Season, Week, WeekRange},
    xjx,
};

/// `days` days from `start`, as requested on the command line.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    /// Number of days past `start + days` still accepted.
    const SLACK_DAYS: u64 = 2;
    /// Week boundaries are approximate; weeks are widened by this much on
    /// each side before being compared with the window.
    const WEEK_MARGIN_DAYS: u64 = 7;

    pub fn new(start: NaiveDate, days: u64) -> Result<Self> {
        let end = days
            .checked_add(Self::SLACK_DAYS)
            .and_then(|days| start.checked_add_days(Days::new(days)))
            .ok_or(Error::WindowOutOfRange { start, days })?;
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn week_overlaps(&self, week: WeekRange) -> bool {
        let margin = Days::new(Self::WEEK_MARGIN_DAYS);
        let first = week.first.checked_sub_days(margin).unwrap_or(NaiveDate::MIN);
        let last = week.last.checked_add_days(margin).unwrap_or(NaiveDate::MAX);
        first <= self.end && self.start <= last
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        (self.start..=self.end).contains(&date)
    }
}

/// A fixture together with where it was found and its appointments.
#[derive(Clone, Debug)]
pub struct PulledFixture {
    pub organisation: Organisation,
    pub season: Season,
    pub week: Week,
    pub fixture: Fixture,
    pub appointments: Vec<Appointment>,
}

struct WeekRef {
    organisation: Organisation,
    season: Season,
    week: Week,
}

impl<T: Transport> SchedulaClient<T> {
    pub async fn list_organisations(&self) -> Result<Parsed<Organisation>> {
        let page = self.get(self.admin_page_url()?).await?;
        Ok(
            options::parse(&page, Anchor::Form("search_fixture")).map(|option| Organisation {
                id: option.value.into(),
                name: option.label,
            }),
        )
    }

    pub async fn list_seasons(&self, organisation: &Organisation) -> Result<Parsed<Season>> {
        let response = self.call_admin(xjx::get_seasons(&organisation.id)).await?;
        Ok(
            options::parse(&response, Anchor::FirstSelect).map(|option| Season {
                id: option.value.into(),
                name: option.label,
                organisation_id: organisation.id.clone(),
            }),
        )
    }

    pub async fn list_weeks(&self, season: &Season) -> Result<Parsed<Week>> {
        let response = self.call_admin(xjx::get_season_weeks(&season.id)).await?;
        Ok(
            options::parse(&response, Anchor::FirstSelect).map(|option| Week {
                id: option.value.into(),
                label: option.label,
                season_id: season.id.clone(),
            }),
        )
    }

    /// Every fixture of one week as listed, youth grades included.
    pub async fn list_week_fixtures(
        &self,
        season: &Season,
        week: &Week,
    ) -> Result<Parsed<Fixture>> {
        let response = self
            .call_admin(xjx::show_fixtures_for_week(&season.id, &week.id))
            .await?;
        Ok(fixtures::parse(&response).map(|row| Fixture {
            id: row.id.into(),
            competition: row.competition,
            date: row.date,
            time: row.time,
            home: row.home,
            away: row.away,
            ground: row.ground,
            organisation_id: season.organisation_id.clone(),
            season_id: season.id.clone(),
            week_id: week.id.clone(),
        }))
    }

    /// Fixtures of one week, youth grades excluded.
    pub async fn list_fixtures(&self, season: &Season, week: &Week) -> Result<Parsed<Fixture>> {
        let mut res = self.list_week_fixtures(season, week).await?;
        res.records.retain(|fixture| {
            let blacklisted = is_blacklisted(&fixture.competition);
            if blacklisted {
                debug!("Skipping fixture {} of {:?}", fixture.id, fixture.competition);
            }
            !blacklisted
        });
        Ok(res)
    }

    /// Seasons whose label equals `year` (all seasons when `None`), over all
    /// organisations.
    pub(crate) async fn matching_seasons(
        &self,
        year: Option<&str>,
        anomalies: &mut Vec<ParseAnomaly>,
    ) -> Result<Vec<(Organisation, Season)>> {
        let mut res = vec![];
        for organisation in self.list_organisations().await?.drain_into(anomalies) {
            let seasons = self.list_seasons(&organisation).await?.drain_into(anomalies);
            for season in seasons {
                if year.is_some_and(|year| season.name != year) {
                    continue;
                }
                info!("Found season {} ({}) of {}", season.name, season.id, organisation.name);
                res.push((organisation.clone(), season));
            }
        }
        Ok(res)
    }

    async fn collect_weeks(
        &self,
        year: Option<&str>,
        anomalies: &mut Vec<ParseAnomaly>,
    ) -> Result<Vec<WeekRef>> {
        let mut res = vec![];
        for (organisation, season) in self.matching_seasons(year, anomalies).await? {
            for week in self.list_weeks(&season).await?.drain_into(anomalies) {
                res.push(WeekRef {
                    organisation: organisation.clone(),
                    season: season.clone(),
                    week,
                });
            }
        }
        Ok(res)
    }

    async fn pull_weeks(
        &self,
        weeks: Vec<WeekRef>,
        window: Option<DateWindow>,
        anomalies: &mut Vec<ParseAnomaly>,
    ) -> Result<Vec<PulledFixture>> {
        let mut found = vec![];
        let mut progress = Progress::new("weeks", weeks.len());
        for week in weeks {
            for fixture in self
                .list_fixtures(&week.season, &week.week)
                .await?
                .drain_into(anomalies)
            {
                if let Some(window) = window {
                    let date = week
                        .season
                        .year()
                        .and_then(|year| fixture.calendar_date(year));
                    match date {
                        Some(date) if window.contains(date) => {}
                        Some(_) => continue,
                        None => {
                            anomalies.push(ParseAnomaly::new(
                                "fixture date",
                                format!(
                                    "fixture {} has an unreadable date {:?} in season {:?}",
                                    fixture.id, fixture.date, week.season.name
                                ),
                            ));
                            continue;
                        }
                    }
                }
                found.push((week.organisation.clone(), week.season.clone(), week.week.clone(), fixture));
            }
            progress.item_done();
        }

        let mut res = vec![];
        let mut progress = Progress::new("fixtures", found.len());
        for (organisation, season, week, fixture) in found {
            let appointments = self
                .lookup_appointments(&fixture.id)
                .await?
                .drain_into(anomalies);
            res.push(PulledFixture {
                organisation,
                season,
                week,
                fixture,
                appointments,
            });
            progress.item_done();
        }
        Ok(res)
    }

    /// Every fixture of the matching seasons, with its appointments.
    pub async fn pull_all(&self, year: Option<&str>) -> Result<Vec<PulledFixture>> {
        let mut anomalies = vec![];
        let weeks = self.collect_weeks(year, &mut anomalies).await?;
        let res = self.pull_weeks(weeks, None, &mut anomalies).await?;
        report_anomalies("the fixture list", &anomalies);
        Ok(res)
    }

    /// Fixtures dated inside `window`, with their appointments.  Weeks are
    /// selected by their widened range first, then fixtures by exact date.
    pub async fn pull_window(
        &self,
        window: DateWindow,
        year: Option<&str>,
    ) -> Result<Vec<PulledFixture>> {
        let mut anomalies = vec![];
        let mut weeks = vec![];
        for week in self.collect_weeks(year, &mut anomalies).await? {
            match week.week.range() {
                Ok(range) if window.week_overlaps(range) => weeks.push(week),
                Ok(_) => {}
                Err(anomaly) => anomalies.push(anomaly),
            }
        }
        info!(
            "{} week(s) may contain fixtures between {} and {}",
            weeks.len(),
            window.start(),
            window.end()
        );
        let res = self.pull_weeks(weeks, Some(window), &mut anomalies).await?;
        report_anomalies("the fixture list", &anomalies);
        Ok(res)
    }
}
