//! Bringing a fixture's appointments to a desired state.
//!
//! Each fixture is edited on its own: the live state is read, the smallest
//! set of removals and additions is worked out, and the edit is either saved
//! in one go or discarded.  A failure never leaves an edit open on the server
//! and never stops the remaining fixtures.
use itertools::Itertools;
use log::{debug, error, info, warn};
use strum::Display;

use crate::{
    api::{SchedulaClient, Transport},
    appointments::{panel_officials, PanelInfo},
    error::{Error, PersonNotFound, RemoteRejection, Result},
    parser::{report_anomalies, xjx_response},
    progress::Progress,
    schema::{Appointment, AppointmentTypeId, FixtureId, Person, PersonId, RoleCode},
    xjx::{self, XjxCall},
};

/// Type id sent when an official is to be taken off a fixture altogether.
pub const UNAPPOINT_TYPE: &str = "-1";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Duty {
    Role(RoleCode),
    /// The official must hold no role on the fixture.
    Unappoint,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Assignment {
    /// `None` when the role must be vacant.
    pub official: Option<String>,
    pub duty: Duty,
}

impl Assignment {
    /// An empty name asks for the role to be vacant.
    pub fn new(official: &str, role: RoleCode) -> Self {
        let official = official.trim();
        Self {
            official: (!official.is_empty()).then(|| official.to_owned()),
            duty: Duty::Role(role),
        }
    }

    pub fn unappoint(official: &str) -> Self {
        Self {
            official: Some(official.trim().to_owned()),
            duty: Duty::Unappoint,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DesiredFixture {
    pub fixture_id: FixtureId,
    pub assignments: Vec<Assignment>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
pub enum Outcome {
    /// Changes were saved.
    Committed,
    /// Nothing needed to change.
    Unchanged,
    /// The edit failed and was discarded.
    RolledBack,
    /// A requested official could not be identified; nothing was sent.
    Skipped,
}

#[derive(Debug)]
pub struct PushReport {
    pub outcomes: Vec<(FixtureId, Outcome)>,
    /// Appointments of every pushed fixture, read back afterwards.
    pub appointments: Vec<Appointment>,
}

/// Exact name first, then every comma-stripped, case-folded token of `name`
/// as a substring of a known name.  Several token matches are ambiguous; the
/// last one is used and a warning is emitted.
pub fn resolve_person(name: &str, people: &[Person]) -> Result<PersonId, PersonNotFound> {
    if let Some(person) = people.iter().find(|p| p.name == name) {
        return Ok(person.person_id.clone());
    }
    let not_found = || PersonNotFound {
        name: name.to_owned(),
    };
    let folded = name.replace(',', "").to_lowercase();
    let tokens = folded.split_whitespace().collect_vec();
    if tokens.is_empty() {
        return Err(not_found());
    }
    let candidates = people
        .iter()
        .filter(|p| {
            let known = p.name.to_lowercase();
            tokens.iter().all(|token| known.contains(token))
        })
        .collect_vec();
    if candidates.len() > 1 {
        warn!(
            "{name:?} is ambiguous ({}); using {:?}",
            candidates.iter().map(|p| &p.name).format(", "),
            candidates[candidates.len() - 1].name,
        );
    }
    candidates
        .last()
        .map(|p| p.person_id.clone())
        .ok_or_else(not_found)
}

/// A desired (official, type) pair in the fixture's own terms.
#[derive(Clone, Debug)]
struct Planned {
    /// Name as the fixture's pages show it; empty for a vacant role.
    name: String,
    person_id: Option<PersonId>,
    type_id: AppointmentTypeId,
    duty: Duty,
}

#[derive(Debug)]
struct Plan {
    removals: Vec<Appointment>,
    additions: Vec<Planned>,
}

impl Plan {
    /// An existing appointment goes when its type is wanted for someone else
    /// or its official is wanted in another type.  Exact matches stay.
    fn new(existing: &[Appointment], wanted: Vec<Planned>) -> Self {
        let removals = existing
            .iter()
            .filter(|e| {
                wanted.iter().any(|a| {
                    (e.role_type_id == a.type_id && e.official_name != a.name)
                        || (e.official_name == a.name && e.role_type_id != a.type_id)
                })
            })
            .cloned()
            .collect();
        let additions = wanted
            .into_iter()
            .filter(|a| {
                let satisfied = existing
                    .iter()
                    .any(|e| e.role_type_id == a.type_id && e.official_name == a.name);
                if satisfied {
                    debug!("{} already holds type {}", a.name, a.type_id);
                }
                !satisfied && a.person_id.is_some() && a.duty != Duty::Unappoint
            })
            .collect();
        Self {
            removals,
            additions,
        }
    }

    fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.additions.is_empty()
    }
}

/// `Baseline → Mutating → Committed | RolledBack`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
pub enum EditState {
    Baseline,
    Mutating,
    Committed,
    RolledBack,
}

/// An edit of one fixture's appointments.
struct Edit<'a, T> {
    client: &'a SchedulaClient<T>,
    fixture: &'a FixtureId,
    state: EditState,
}

impl<'a, T: Transport> Edit<'a, T> {
    fn new(client: &'a SchedulaClient<T>, fixture: &'a FixtureId) -> Self {
        Self {
            client,
            fixture,
            state: EditState::Baseline,
        }
    }

    fn enter(&mut self, next: EditState) {
        debug!("Fixture {}: {} -> {next}", self.fixture, self.state);
        self.state = next;
    }

    async fn send(&mut self, call: XjxCall) -> Result<String> {
        if self.state == EditState::Baseline {
            self.enter(EditState::Mutating);
        }
        Ok(self.client.call_fixture(self.fixture, call).await?)
    }

    async fn commit(&mut self) -> Result<()> {
        self.send(xjx::save_appointments(self.fixture)).await?;
        self.enter(EditState::Committed);
        Ok(())
    }

    /// Always sends the close, even after a failed discard; the first error
    /// is reported.
    async fn discard_and_close(&self) -> Result<()> {
        let discarded = self
            .client
            .call_fixture(self.fixture, xjx::discard_changes(self.fixture))
            .await;
        let closed = self
            .client
            .call_fixture(self.fixture, xjx::just_close(self.fixture))
            .await;
        discarded?;
        let response = closed?;
        match xjx_response::called_function(&response) {
            Some(function) if function == format!("confirmClose({})", self.fixture) => {
                Err(RemoteRejection::BadClose {
                    fixture: self.fixture.clone(),
                    function: function.to_owned(),
                }
                .into())
            }
            _ => Ok(()),
        }
    }

    /// Discards and closes the edit, retrying once if the server refuses.
    async fn roll_back(&mut self) {
        if let Err(e) = self.discard_and_close().await {
            warn!("Rollback of fixture {} failed ({e}), retrying", self.fixture);
            if let Err(e) = self.discard_and_close().await {
                error!(
                    "Fixture {} may still have an open edit on the server: {e}",
                    self.fixture
                );
            }
        }
        self.enter(EditState::RolledBack);
    }
}

type Resolved = (Option<(String, PersonId)>, Duty);

impl<T: Transport> SchedulaClient<T> {
    /// Applies every fixture in order.  Transport errors while reading the
    /// results back are the only failures reported to the caller.
    pub async fn push_appointments(
        &self,
        desired: &[DesiredFixture],
        people: &[Person],
    ) -> Result<PushReport> {
        let mut outcomes = vec![];
        let mut progress = Progress::new("fixtures to update", desired.len());
        for fixture in desired {
            let outcome = self.reconcile_fixture(fixture, people).await;
            info!("Fixture {}: {outcome}", fixture.fixture_id);
            outcomes.push((fixture.fixture_id.clone(), outcome));
            progress.item_done();
        }

        let mut anomalies = vec![];
        let mut appointments = vec![];
        for fixture in desired {
            appointments.extend(
                self.lookup_appointments(&fixture.fixture_id)
                    .await?
                    .drain_into(&mut anomalies),
            );
        }
        report_anomalies("the updated fixtures", &anomalies);
        Ok(PushReport {
            outcomes,
            appointments,
        })
    }

    pub async fn reconcile_fixture(&self, desired: &DesiredFixture, people: &[Person]) -> Outcome {
        let fixture = &desired.fixture_id;
        let mut resolved = vec![];
        for assignment in &desired.assignments {
            let person = match &assignment.official {
                None => None,
                Some(name) => match resolve_person(name, people) {
                    Ok(person_id) => Some((name.clone(), person_id)),
                    Err(e) => {
                        warn!("Not updating fixture {fixture}: {e}");
                        return Outcome::Skipped;
                    }
                },
            };
            resolved.push((person, assignment.duty));
        }

        let mut edit = Edit::new(self, fixture);
        match self.apply(&mut edit, resolved).await {
            Ok(true) => Outcome::Committed,
            Ok(false) => Outcome::Unchanged,
            Err(e) => {
                error!("Failed to update fixture {fixture} ({} state): {e}", edit.state);
                edit.roll_back().await;
                Outcome::RolledBack
            }
        }
    }

    /// `Ok(false)` when the fixture already matched and nothing was sent.
    async fn apply(&self, edit: &mut Edit<'_, T>, resolved: Vec<Resolved>) -> Result<bool> {
        let fixture = edit.fixture;
        let mut info = self.panel_info(fixture, None).await?;
        let plan = plan(&info, resolved)?;
        if plan.is_empty() {
            info!("Fixture {fixture} is up to date");
            return Ok(false);
        }

        for removal in &plan.removals {
            // Record ids change with every removal; use the latest reading.
            let current = info
                .appointments()
                .iter()
                .find(|a| {
                    a.official_name == removal.official_name
                        && a.role_type_id == removal.role_type_id
                })
                .unwrap_or(removal)
                .clone();
            info!("Removing {} ({})", current.official_name, current.role);
            let response = edit
                .send(xjx::unappoint_umpire(
                    &current.record_id,
                    &current.role_type_id,
                    fixture,
                ))
                .await?;
            if let Some(panel) = info.current_panel().clone() {
                info.refresh_officials(&panel_officials(&response, &panel).records);
            }
            info.set_appointments(self.lookup_appointments(fixture).await?.records);
        }

        for addition in &plan.additions {
            let Some(person_id) = &addition.person_id else {
                continue;
            };
            let official = info
                .official(person_id)
                .ok_or_else(|| Error::UnknownOfficial(addition.name.clone()))?;
            if let Some(panel) = official
                .panel_id
                .clone()
                .filter(|panel| Some(panel) != info.current_panel().as_ref())
            {
                debug!("Switching fixture {fixture} to panel {panel}");
                let response = edit.send(xjx::change_panel(&panel, fixture)).await?;
                info.refresh_officials(&panel_officials(&response, &panel).records);
                info.set_current_panel(panel);
            }
            let record_id = info
                .official(person_id)
                .and_then(|official| official.record_id.clone())
                .ok_or_else(|| Error::NoAppointHandle(addition.name.clone()))?;
            info!("Appointing {} (type {})", addition.name, addition.type_id);
            edit.send(xjx::change_appointment_type(&addition.type_id, fixture))
                .await?;
            edit.send(xjx::appoint_umpire(&record_id, &addition.type_id, fixture))
                .await?;
        }

        edit.commit().await?;
        Ok(true)
    }
}

/// At most one official per role, and every official at most once.
fn check_unique(resolved: &[Resolved]) -> Result<()> {
    let requested = resolved
        .iter()
        .filter_map(|(person, duty)| Some((person.as_ref()?, *duty)))
        .collect_vec();
    let roles = requested.iter().filter_map(|(_, duty)| match duty {
        Duty::Role(role) => Some(*role),
        Duty::Unappoint => None,
    });
    if let Some(role) = roles.duplicates().next() {
        return Err(Error::DuplicateRole(role));
    }
    if let Some(((name, _), _)) = requested
        .iter()
        .duplicates_by(|((_, person_id), _)| person_id.clone())
        .next()
    {
        return Err(Error::DuplicateOfficial(name.clone()));
    }
    Ok(())
}

fn plan(info: &PanelInfo, resolved: Vec<Resolved>) -> Result<Plan> {
    check_unique(&resolved)?;
    let mut wanted = vec![];
    for (person, duty) in resolved {
        let type_id = match duty {
            Duty::Role(role) => info
                .appointment_type(role)
                .ok_or(Error::MissingAppointmentType(role))?
                .id
                .clone(),
            Duty::Unappoint => UNAPPOINT_TYPE.into(),
        };
        let (name, person_id) = match person {
            None => (String::new(), None),
            Some((requested, person_id)) => {
                let official = info
                    .official(&person_id)
                    .ok_or(Error::UnknownOfficial(requested))?;
                (official.name.clone(), Some(person_id))
            }
        };
        wanted.push(Planned {
            name,
            person_id,
            type_id,
            duty,
        });
    }
    Ok(Plan::new(info.appointments(), wanted))
}
