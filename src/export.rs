//! The CSV files exchanged with the user: the fixtures export, the officials
//! list, the push input and the push results.
use std::{cmp::Ordering, fmt::Debug, path::Path};

use anyhow::Context;
use fs_err::File;
use log::warn;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use strum::IntoEnumIterator;
use thiserror::Error;

use crate::{
    hierarchy::PulledFixture,
    reconcile::{Assignment, DesiredFixture, Outcome, PushReport},
    schema::{Appointment, FixtureId, Person, RoleCode},
};

/// One row of the fixtures export.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct FixtureRecord {
    #[serde(rename = "FixtureID")]
    pub fixture_id: String,
    #[serde(rename = "OrgID")]
    pub organisation_id: String,
    #[serde(rename = "OrgName")]
    pub organisation_name: String,
    #[serde(rename = "SeasonID")]
    pub season_id: String,
    #[serde(rename = "SeasonName")]
    pub season_name: String,
    #[serde(rename = "WeekID")]
    pub week_id: String,
    #[serde(rename = "WeekName")]
    pub week_name: String,
    #[serde(rename = "Competition")]
    pub competition: String,
    /// `8-Feb-2020`
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "day")]
    pub day: String,
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "Home")]
    pub home: String,
    #[serde(rename = "Away")]
    pub away: String,
    #[serde(rename = "Ground")]
    pub ground: String,
    #[serde(rename = "Referee")]
    pub referee: String,
    #[serde(rename = "AR1")]
    pub assistant_1: String,
    #[serde(rename = "AR2")]
    pub assistant_2: String,
    #[serde(rename = "Mentor")]
    pub mentor: String,
    #[serde(rename = "Assessor")]
    pub assessor: String,
    #[serde(rename = "4th Official")]
    pub fourth_official: String,
    #[serde(rename = "Other")]
    pub other: String,
    /// `ok`, or why the appointments could not be exported faithfully.
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Rstatus")]
    pub referee_status: String,
    #[serde(rename = "AR1status")]
    pub assistant_1_status: String,
    #[serde(rename = "AR2status")]
    pub assistant_2_status: String,
    #[serde(rename = "Mstatus")]
    pub mentor_status: String,
    #[serde(rename = "Astatus")]
    pub assessor_status: String,
    #[serde(rename = "4status")]
    pub fourth_official_status: String,
}

pub const STATUS_OK: &str = "ok";

impl FixtureRecord {
    pub fn official(&self, role: RoleCode) -> &str {
        match role {
            RoleCode::Referee => &self.referee,
            RoleCode::AssistantReferee1 => &self.assistant_1,
            RoleCode::AssistantReferee2 => &self.assistant_2,
            RoleCode::Mentor => &self.mentor,
            RoleCode::Assessor => &self.assessor,
            RoleCode::FourthOfficial => &self.fourth_official,
            RoleCode::Other => &self.other,
        }
    }

    fn slots(&mut self, role: RoleCode) -> (&mut String, Option<&mut String>) {
        match role {
            RoleCode::Referee => (&mut self.referee, Some(&mut self.referee_status)),
            RoleCode::AssistantReferee1 => {
                (&mut self.assistant_1, Some(&mut self.assistant_1_status))
            }
            RoleCode::AssistantReferee2 => {
                (&mut self.assistant_2, Some(&mut self.assistant_2_status))
            }
            RoleCode::Mentor => (&mut self.mentor, Some(&mut self.mentor_status)),
            RoleCode::Assessor => (&mut self.assessor, Some(&mut self.assessor_status)),
            RoleCode::FourthOfficial => (
                &mut self.fourth_official,
                Some(&mut self.fourth_official_status),
            ),
            RoleCode::Other => (&mut self.other, None),
        }
    }

    pub fn new(pulled: &PulledFixture) -> Self {
        let fixture = &pulled.fixture;
        // "Sat Feb 8" in season "2020" becomes "8-Feb-2020".
        let parts = fixture.date.split_whitespace().collect::<Vec<_>>();
        let date = match parts[..] {
            [_, month, day, ..] => format!("{day}-{month}-{}", pulled.season.name),
            _ => fixture.date.clone(),
        };
        let mut res = Self {
            fixture_id: fixture.id.to_string(),
            organisation_id: pulled.organisation.id.to_string(),
            organisation_name: pulled.organisation.name.clone(),
            season_id: pulled.season.id.to_string(),
            season_name: pulled.season.name.clone(),
            week_id: pulled.week.id.to_string(),
            week_name: pulled.week.label.clone(),
            competition: fixture.competition.clone(),
            date,
            day: fixture.weekday_label().to_owned(),
            time: fixture.time.clone(),
            home: fixture.home.clone(),
            away: fixture.away.clone(),
            ground: fixture.ground.clone(),
            status: STATUS_OK.to_owned(),
            ..Default::default()
        };
        for appointment in &pulled.appointments {
            let role = appointment.role_code();
            let (official, status) = res.slots(role);
            if !official.is_empty() {
                warn!(
                    "Fixture {} has more than one {role} appointment: index.php?action=admin/appointments/appoint_match&fixtureid={}",
                    fixture.id, fixture.id
                );
                res.status = format!("Appointment Error, multiple appointments to {role}");
                continue;
            }
            *official = appointment.official_name.clone();
            if let Some(status) = status {
                *status = appointment.acceptance_status.clone();
            }
        }
        res
    }
}

/// Numeric ids in numeric order, anything else after them.
fn compare_ids(a: &str, b: &str) -> Ordering {
    let key = |id: &str| match id.parse::<u64>() {
        Ok(n) => (0, n, String::new()),
        Err(_) => (1, 0, id.to_owned()),
    };
    key(a).cmp(&key(b))
}

pub fn fixture_records(pulled: &[PulledFixture]) -> Vec<FixtureRecord> {
    let mut res: Vec<_> = pulled.iter().map(FixtureRecord::new).collect();
    res.sort_by(|a, b| compare_ids(&a.fixture_id, &b.fixture_id));
    res
}

/// A row of the push input: the desired official per role, empty for vacant.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PushRow {
    #[serde(rename = "FixtureID")]
    pub fixture_id: String,
    #[serde(rename = "R", default)]
    pub referee: String,
    #[serde(rename = "AR1", default)]
    pub assistant_1: String,
    #[serde(rename = "AR2", default)]
    pub assistant_2: String,
    #[serde(rename = "M", default)]
    pub mentor: String,
    #[serde(rename = "A", default)]
    pub assessor: String,
    #[serde(rename = "4", default)]
    pub fourth_official: String,
}

impl PushRow {
    pub fn official(&self, role: RoleCode) -> &str {
        match role {
            RoleCode::Referee => &self.referee,
            RoleCode::AssistantReferee1 => &self.assistant_1,
            RoleCode::AssistantReferee2 => &self.assistant_2,
            RoleCode::Mentor => &self.mentor,
            RoleCode::Assessor => &self.assessor,
            RoleCode::FourthOfficial => &self.fourth_official,
            RoleCode::Other => "",
        }
    }

    pub fn desired(&self) -> DesiredFixture {
        DesiredFixture {
            fixture_id: self.fixture_id.trim().into(),
            assignments: RoleCode::ASSIGNABLE
                .into_iter()
                .map(|role| Assignment::new(self.official(role), role))
                .collect(),
        }
    }
}

/// Why a push row is not applied.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum StaleExport {
    #[error("fixture {0} is not in the exported fixtures")]
    NotExported(String),
    #[error("fixture {fixture} was exported with status {status:?}")]
    BadStatus { fixture: String, status: String },
    #[error("{role} of fixture {fixture} is now {live:?}, exported as {exported:?}")]
    Changed {
        fixture: String,
        role: RoleCode,
        exported: String,
        live: String,
    },
}

/// Checks that the export a push row was prepared from still matches the
/// server.  `live` holds the fixture's current appointments.
pub fn stale_check(
    row: &PushRow,
    exported: &[FixtureRecord],
    live: &[Appointment],
) -> Result<(), StaleExport> {
    let fixture = row.fixture_id.trim();
    let record = exported
        .iter()
        .find(|r| r.fixture_id == fixture)
        .ok_or_else(|| StaleExport::NotExported(fixture.to_owned()))?;
    if record.status != STATUS_OK {
        return Err(StaleExport::BadStatus {
            fixture: fixture.to_owned(),
            status: record.status.clone(),
        });
    }
    for role in RoleCode::iter() {
        let live_name = live
            .iter()
            .filter(|a| a.role_code() == role)
            .last()
            .map_or("", |a| a.official_name.as_str());
        if live_name != record.official(role) {
            return Err(StaleExport::Changed {
                fixture: fixture.to_owned(),
                role,
                exported: record.official(role).to_owned(),
                live: live_name.to_owned(),
            });
        }
    }
    Ok(())
}

/// A row of the push results: what happened and who is appointed now.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PushResultRow {
    #[serde(rename = "FixtureID")]
    pub fixture_id: String,
    #[serde(rename = "Result")]
    pub outcome: String,
    #[serde(rename = "R")]
    pub referee: String,
    #[serde(rename = "AR1")]
    pub assistant_1: String,
    #[serde(rename = "AR2")]
    pub assistant_2: String,
    #[serde(rename = "M")]
    pub mentor: String,
    #[serde(rename = "A")]
    pub assessor: String,
    #[serde(rename = "4")]
    pub fourth_official: String,
}

pub fn push_results(report: &PushReport) -> Vec<PushResultRow> {
    let name = |fixture: &FixtureId, role: RoleCode| {
        report
            .appointments
            .iter()
            .filter(|a| &a.fixture_id == fixture && a.role_code() == role)
            .map(|a| a.official_name.as_str())
            .last()
            .unwrap_or("")
            .to_owned()
    };
    report
        .outcomes
        .iter()
        .map(|(fixture, outcome): &(FixtureId, Outcome)| PushResultRow {
            fixture_id: fixture.to_string(),
            outcome: outcome.to_string(),
            referee: name(fixture, RoleCode::Referee),
            assistant_1: name(fixture, RoleCode::AssistantReferee1),
            assistant_2: name(fixture, RoleCode::AssistantReferee2),
            mentor: name(fixture, RoleCode::Mentor),
            assessor: name(fixture, RoleCode::Assessor),
            fourth_official: name(fixture, RoleCode::FourthOfficial),
        })
        .collect()
}

pub fn read_csv<P: AsRef<Path> + Debug, T: DeserializeOwned>(path: P) -> anyhow::Result<Vec<T>> {
    let path = path.as_ref();
    csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(File::open(path)?)
        .into_deserialize()
        .collect::<Result<_, _>>()
        .with_context(|| format!("While reading {path:?}"))
}

pub fn write_csv<P: AsRef<Path> + Debug, T: Serialize>(path: P, rows: &[T]) -> anyhow::Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_writer(File::create(path)?);
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("While writing {path:?}"))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_people<P: AsRef<Path> + Debug>(path: P) -> anyhow::Result<Vec<Person>> {
    read_csv(path)
}
