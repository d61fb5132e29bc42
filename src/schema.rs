//! Records scraped from the administration site.
//!
//! Every record is derived: it is re-fetched on each run and never cached.
use chrono::{Month, NaiveDate};
use derive_more::{AsRef, From, FromStr, Into};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::ParseAnomaly;

macro_rules! string_id {
    ($(#[$meta: meta])* $name: ident) => {
        $(#[$meta])*
        #[derive(
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Debug,
            From,
            FromStr,
            Into,
            AsRef,
            derive_more::Display,
            Serialize,
            Deserialize,
        )]
        #[as_ref(forward)]
        #[serde(transparent)]
        pub struct $name(String);

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(OrganisationId);
string_id!(SeasonId);
string_id!(
    /// `YYYY-MM-DD_YYYY-MM-DD`, the first and last day of the week.
    WeekId
);
string_id!(FixtureId);
string_id!(PersonId);
string_id!(
    /// Per-fixture handle of an official on the appointment page.
    /// Invalidated whenever the fixture's appointments change.
    AppointmentRecordId
);
string_id!(PanelId);
string_id!(AppointmentTypeId);

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Organisation {
    pub id: OrganisationId,
    pub name: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Season {
    pub id: SeasonId,
    /// The label shown by the site, normally the calendar year.
    pub name: String,
    pub organisation_id: OrganisationId,
}

impl Season {
    pub fn year(&self) -> Option<i32> {
        self.name.trim().parse().ok()
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Week {
    pub id: WeekId,
    pub label: String,
    pub season_id: SeasonId,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct WeekRange {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

impl Week {
    /// Splits the `start_end` id into two calendar dates.
    pub fn range(&self) -> Result<WeekRange, ParseAnomaly> {
        let anomaly = |reason: String| ParseAnomaly::new("week id", reason);
        let (first, last) = self
            .id
            .as_str()
            .split_once('_')
            .ok_or_else(|| anomaly(format!("no `_` separator in {:?}", self.id.as_str())))?;
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|e| anomaly(format!("{s:?} is not a date: {e}")))
        };
        Ok(WeekRange {
            first: parse(first)?,
            last: parse(last)?,
        })
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Fixture {
    pub id: FixtureId,
    pub competition: String,
    /// As displayed, e.g. `Sat Feb 8`; the year comes from the season.
    pub date: String,
    pub time: String,
    pub home: String,
    pub away: String,
    pub ground: String,
    pub organisation_id: OrganisationId,
    pub season_id: SeasonId,
    pub week_id: WeekId,
}

impl Fixture {
    pub fn calendar_date(&self, year: i32) -> Option<NaiveDate> {
        let mut parts = self.date.split_whitespace().skip(1);
        let month = parts.next()?.parse::<Month>().ok()?;
        let day = parts.next()?.parse().ok()?;
        NaiveDate::from_ymd_opt(year, month.number_from_month(), day)
    }

    pub fn weekday_label(&self) -> &str {
        self.date.split_whitespace().next().unwrap_or("")
    }
}

/// One row of a fixture's appointment table.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Appointment {
    pub fixture_id: FixtureId,
    pub official_name: String,
    pub record_id: AppointmentRecordId,
    /// Free-text label of the selected appointment type.
    pub role: String,
    pub role_type_id: AppointmentTypeId,
    pub acceptance_status: String,
}

impl Appointment {
    pub fn role_code(&self) -> RoleCode {
        RoleCode::classify(&self.role)
    }
}

/// An official as listed on a panel of a fixture's appointment page.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PanelOfficial {
    pub name: String,
    pub person_id: PersonId,
    /// `None` when the page offered no appoint handle for this official.
    pub record_id: Option<AppointmentRecordId>,
    pub panel_id: Option<PanelId>,
}

/// Global identity of an official, as exported to the officials file.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    #[serde(rename = "personID")]
    pub person_id: PersonId,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Panel {
    pub id: PanelId,
    pub name: String,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AppointmentType {
    pub id: AppointmentTypeId,
    pub label: String,
}

/// Fixed role vocabulary that free-text role labels are mapped onto.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
pub enum RoleCode {
    #[strum(serialize = "R")]
    #[serde(rename = "R")]
    Referee,
    #[strum(serialize = "AR1")]
    #[serde(rename = "AR1")]
    AssistantReferee1,
    #[strum(serialize = "AR2")]
    #[serde(rename = "AR2")]
    AssistantReferee2,
    #[strum(serialize = "M")]
    #[serde(rename = "M")]
    Mentor,
    #[strum(serialize = "A")]
    #[serde(rename = "A")]
    Assessor,
    #[strum(serialize = "4")]
    #[serde(rename = "4")]
    FourthOfficial,
    #[strum(serialize = "Other")]
    #[serde(rename = "Other")]
    Other,
}

impl RoleCode {
    /// Roles that can be requested in a push file, in column order.
    pub const ASSIGNABLE: [RoleCode; 6] = [
        RoleCode::Referee,
        RoleCode::AssistantReferee1,
        RoleCode::AssistantReferee2,
        RoleCode::Mentor,
        RoleCode::Assessor,
        RoleCode::FourthOfficial,
    ];
}
