//! Encoding of the site's pseudo-RPC calls.
//!
//! A call is a form body `xjxfun=<Function>&xjxr=<millis>&xjxargs[]=<arg>...`
//! where every argument carries a one-letter type tag.
use std::fmt;

use itertools::Itertools;
use serde::Serialize;

use crate::{
    error::TransportError,
    schema::{AppointmentRecordId, AppointmentTypeId, FixtureId, OrganisationId, PanelId, SeasonId, WeekId},
};
use schedula_utils::credentials::Credentials;

/// Screen name the week/season selectors are registered under.
const APPOINT_BY_WEEK: &str = "AppointByWeek";

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum XjxArg {
    Str(String),
    Num(String),
    Bool(bool),
    /// An `<xjxobj>` document, sent without a type tag.
    Object(String),
}

impl XjxArg {
    fn encode(&self) -> String {
        match self {
            XjxArg::Str(s) => format!("S{s}"),
            XjxArg::Num(n) => format!("N{n}"),
            XjxArg::Bool(b) => format!("B{b}"),
            XjxArg::Object(o) => o.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct XjxCall {
    function: &'static str,
    stamp: Option<i64>,
    args: Vec<XjxArg>,
}

#[derive(Serialize)]
struct Form<'a> {
    xjxfun: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    xjxr: Option<i64>,
    #[serde(rename = "xjxargs[]")]
    args: Vec<String>,
}

impl XjxCall {
    pub fn new(function: &'static str) -> Self {
        Self {
            function,
            stamp: None,
            args: vec![],
        }
    }

    pub fn function(&self) -> &'static str {
        self.function
    }

    pub fn args(&self) -> &[XjxArg] {
        &self.args
    }

    /// Adds the `xjxr` request stamp (current time in epoch milliseconds).
    pub fn stamped(self) -> Self {
        self.stamped_at(chrono::Utc::now().timestamp_millis())
    }

    pub fn stamped_at(mut self, millis: i64) -> Self {
        self.stamp = Some(millis);
        self
    }

    pub fn str(mut self, value: impl AsRef<str>) -> Self {
        self.args.push(XjxArg::Str(value.as_ref().to_owned()));
        self
    }

    pub fn num(mut self, value: impl AsRef<str>) -> Self {
        self.args.push(XjxArg::Num(value.as_ref().to_owned()));
        self
    }

    pub fn bool(mut self, value: bool) -> Self {
        self.args.push(XjxArg::Bool(value));
        self
    }

    fn object(mut self, value: String) -> Self {
        self.args.push(XjxArg::Object(value));
        self
    }

    pub fn body(&self) -> Result<String, TransportError> {
        Ok(serde_html_form::to_string(Form {
            xjxfun: self.function,
            xjxr: self.stamp,
            args: self.args.iter().map(XjxArg::encode).collect(),
        })?)
    }
}

/// `GetSeasons(S9, SAppointByWeek)`; object arguments are elided since the
/// login object holds the password.
impl fmt::Display for XjxCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self.args.iter().format_with(", ", |arg, f| match arg {
            XjxArg::Object(_) => f(&"<xjxobj>"),
            arg => f(&arg.encode()),
        });
        write!(f, "{}({args})", self.function)
    }
}

pub fn login(credentials: &Credentials) -> XjxCall {
    let object = format!(
        "<xjxobj><e><k>email</k><v>S<![CDATA[{}]]></v></e><e><k>password</k><v>S{}</v></e><e><k>btnlogin</k><v>SLogin</v></e></xjxobj>",
        credentials.username,
        credentials.password.as_ref(),
    );
    XjxCall::new("dologin").object(object)
}

pub fn get_seasons(organisation: &OrganisationId) -> XjxCall {
    XjxCall::new("GetSeasons")
        .str(organisation)
        .str(APPOINT_BY_WEEK)
}

pub fn get_season_weeks(season: &SeasonId) -> XjxCall {
    XjxCall::new("GetSeasonWeeks")
        .str(season)
        .str(APPOINT_BY_WEEK)
}

pub fn show_fixtures_for_week(season: &SeasonId, week: &WeekId) -> XjxCall {
    XjxCall::new("ShowFixturesForWeek").num(season).str(week)
}

pub fn change_panel(panel: &PanelId, fixture: &FixtureId) -> XjxCall {
    XjxCall::new("ChangePanel")
        .stamped()
        .num(panel)
        .num(fixture)
        .bool(false)
}

pub fn change_appointment_type(kind: &AppointmentTypeId, fixture: &FixtureId) -> XjxCall {
    XjxCall::new("ChangeAppointmentType")
        .stamped()
        .str(kind)
        .num(fixture)
}

pub fn appoint_umpire(
    record: &AppointmentRecordId,
    kind: &AppointmentTypeId,
    fixture: &FixtureId,
) -> XjxCall {
    XjxCall::new("AppointUmpire")
        .stamped()
        .num(record)
        .str(kind)
        .num(fixture)
        .bool(false)
}

pub fn unappoint_umpire(
    record: &AppointmentRecordId,
    kind: &AppointmentTypeId,
    fixture: &FixtureId,
) -> XjxCall {
    XjxCall::new("UnappointUmpire")
        .stamped()
        .num(record)
        .num(kind)
        .num(fixture)
}

pub fn save_appointments(fixture: &FixtureId) -> XjxCall {
    XjxCall::new("SaveAppointments").stamped().num(fixture)
}

pub fn discard_changes(fixture: &FixtureId) -> XjxCall {
    XjxCall::new("DiscardChanges")
        .stamped()
        .num(fixture)
        .bool(false)
        .bool(false)
}

pub fn just_close(fixture: &FixtureId) -> XjxCall {
    XjxCall::new("JustClose").stamped().num(fixture)
}
