//! Reading a fixture's appointments and the officials that can be appointed.
use getset::Getters;
use itertools::Itertools;
use log::{info, warn};

use crate::{
    api::{SchedulaClient, Transport},
    error::{Error, ParseAnomaly, Result},
    parser::{
        appointments, officials,
        options::{self, Anchor, SelectOption},
        report_anomalies, Parsed,
    },
    schema::{
        Appointment, AppointmentType, FixtureId, Panel, PanelId, PanelOfficial, Person, PersonId,
        RoleCode,
    },
    xjx,
};

/// Listed first on every fixture; querying it reveals the other panels.
pub const DEFAULT_PANEL: &str = "Referee (built-in)";

/// Live appointment state of one fixture.
#[derive(Clone, Debug, Getters)]
#[getset(get = "pub")]
pub struct PanelInfo {
    panels: Vec<Panel>,
    appointment_types: Vec<AppointmentType>,
    officials: Vec<PanelOfficial>,
    appointments: Vec<Appointment>,
    /// The panel the server shows after the last query.
    current_panel: Option<PanelId>,
}

impl PanelInfo {
    /// The entry for `person_id`, preferring the one on the current panel.
    pub fn official(&self, person_id: &PersonId) -> Option<&PanelOfficial> {
        let mut candidates = self.officials.iter().filter(|o| &o.person_id == person_id);
        let first = candidates.next()?;
        if first.panel_id == self.current_panel {
            return Some(first);
        }
        Some(
            candidates
                .find(|o| o.panel_id == self.current_panel)
                .unwrap_or(first),
        )
    }

    /// First appointment type of the fixture whose label classifies as `role`.
    pub fn appointment_type(&self, role: RoleCode) -> Option<&AppointmentType> {
        self.appointment_types
            .iter()
            .find(|t| RoleCode::classify(&t.label) == role)
    }

    /// Takes the record ids of a newer listing of one panel.
    pub(crate) fn refresh_officials(&mut self, fresh: &[PanelOfficial]) {
        for official in &mut self.officials {
            if let Some(newer) = fresh
                .iter()
                .find(|f| f.person_id == official.person_id && f.panel_id == official.panel_id)
            {
                official.record_id.clone_from(&newer.record_id);
            }
        }
    }

    pub(crate) fn set_current_panel(&mut self, panel: PanelId) {
        self.current_panel = Some(panel);
    }

    pub(crate) fn set_appointments(&mut self, appointments: Vec<Appointment>) {
        self.appointments = appointments;
    }
}

pub(crate) fn appointments_from_page(fixture: &FixtureId, page: &str) -> Parsed<Appointment> {
    appointments::parse(page).map(|row| Appointment {
        fixture_id: fixture.clone(),
        official_name: row.name,
        record_id: row.record_id.into(),
        role: row.role,
        role_type_id: row.role_type_id.into(),
        acceptance_status: row.status,
    })
}

/// Officials of `panel` in a `ChangePanel`/`UnappointUmpire` response.
pub(crate) fn panel_officials(response: &str, panel: &PanelId) -> Parsed<PanelOfficial> {
    officials::parse(response).map(|row| PanelOfficial {
        name: row.name,
        person_id: row.person_id.into(),
        record_id: row.record_id.map(Into::into),
        panel_id: Some(panel.clone()),
    })
}

/// An option list the page cannot work without.
fn required(
    parsed: Parsed<SelectOption>,
    anomalies: &mut Vec<ParseAnomaly>,
) -> Result<Vec<SelectOption>> {
    let Parsed {
        records,
        anomalies: mut found,
    } = parsed;
    if records.is_empty() && !found.is_empty() {
        return Err(Error::Parse(found.remove(0)));
    }
    anomalies.extend(found);
    Ok(records)
}

impl<T: Transport> SchedulaClient<T> {
    pub async fn lookup_appointments(&self, fixture: &FixtureId) -> Result<Parsed<Appointment>> {
        let page = self.get(self.fixture_page_url(fixture)?).await?;
        Ok(appointments_from_page(fixture, &page))
    }

    /// Reads the fixture's panels, appointment types, appointments and the
    /// officials of `panel`.  Without a panel name the default panel is
    /// queried first and then every other one; officials are only listed
    /// per panel.
    pub async fn panel_info(&self, fixture: &FixtureId, panel: Option<&str>) -> Result<PanelInfo> {
        let page = self.get(self.fixture_page_url(fixture)?).await?;
        let mut anomalies = vec![];
        let appointments = appointments_from_page(fixture, &page).drain_into(&mut anomalies);
        let panels = required(
            options::parse(&page, Anchor::Form("panels_form")),
            &mut anomalies,
        )?
        .into_iter()
        .map(|option| Panel {
            id: option.value.into(),
            name: option.label,
        })
        .collect_vec();
        let appointment_types = required(
            options::parse(&page, Anchor::Form("appointment_type_form")),
            &mut anomalies,
        )?
        .into_iter()
        .map(|option| AppointmentType {
            id: option.value.into(),
            label: option.label,
        })
        .collect_vec();

        let find = |name: &str| {
            panels
                .iter()
                .find(|p| p.name == name)
                .ok_or_else(|| Error::PanelNotFound(name.to_owned()))
        };
        let queried = match panel {
            Some(name) => vec![find(name)?],
            None => {
                let default = find(DEFAULT_PANEL)?;
                std::iter::once(default)
                    .chain(panels.iter().filter(|p| p.id != default.id))
                    .collect_vec()
            }
        };

        let mut officials = vec![];
        let mut current_panel = None;
        for panel in queried {
            let response = self
                .call_fixture(fixture, xjx::change_panel(&panel.id, fixture))
                .await?;
            let listed = panel_officials(&response, &panel.id).drain_into(&mut anomalies);
            info!("Panel {:?}: {} official(s)", panel.name, listed.len());
            officials.extend(listed);
            current_panel = Some(panel.id.clone());
        }
        for official in &mut officials {
            if let Some(appointment) = appointments
                .iter()
                .find(|a| a.official_name == official.name)
            {
                official.record_id = Some(appointment.record_id.clone());
            }
        }
        report_anomalies(&format!("the appointment page of fixture {fixture}"), &anomalies);

        Ok(PanelInfo {
            panels,
            appointment_types,
            officials,
            appointments,
            current_panel,
        })
    }

    /// Everyone on `panel` (or on any panel) of the matching seasons.  Each
    /// season is read through the first fixture of its last week, whatever
    /// its competition.
    pub async fn officials_roster(
        &self,
        year: Option<&str>,
        panel: Option<&str>,
    ) -> Result<Vec<Person>> {
        let mut anomalies = vec![];
        let mut people = vec![];
        for (_, season) in self.matching_seasons(year, &mut anomalies).await? {
            let weeks = self.list_weeks(&season).await?.drain_into(&mut anomalies);
            let Some(week) = weeks.last() else {
                warn!("Season {} has no weeks", season.name);
                continue;
            };
            let fixtures = self
                .list_week_fixtures(&season, week)
                .await?
                .drain_into(&mut anomalies);
            let Some(fixture) = fixtures.first() else {
                warn!("Week {} of season {} has no fixtures", week.label, season.name);
                continue;
            };
            let info = self.panel_info(&fixture.id, panel).await?;
            people.extend(info.officials.into_iter().map(|o| Person {
                name: o.name,
                person_id: o.person_id,
            }));
        }
        report_anomalies("the officials roster", &anomalies);
        Ok(people
            .into_iter()
            .unique_by(|p| p.person_id.clone())
            .collect())
    }
}
