//! An in-memory site for tests.  It renders the fragments the real pages
//! contain, keeps the per-fixture edit state the server keeps, and records
//! every pseudo-RPC call it receives.
use std::cell::RefCell;

use itertools::Itertools;
use url::Url;

use crate::{api::Transport, error::TransportError, parser::fixtures::tests::fixture_rows};

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RecordedCall {
    pub function: String,
    /// Arguments with their type tag removed.
    pub args: Vec<String>,
    pub fixture: Option<String>,
}

impl RecordedCall {
    /// Calls that belong to an edit of a fixture's appointments.
    pub fn is_mutation(&self) -> bool {
        matches!(
            &self.function[..],
            "ChangeAppointmentType"
                | "AppointUmpire"
                | "UnappointUmpire"
                | "SaveAppointments"
                | "DiscardChanges"
                | "JustClose"
        )
    }
}

#[derive(Clone, Debug)]
struct Appointed {
    person_id: String,
    type_id: String,
    status: String,
}

#[derive(Clone, Debug)]
pub struct FakeFixture {
    pub id: String,
    pub competition: String,
    pub date: String,
    pub time: String,
    pub home: String,
    pub away: String,
    pub ground: String,
    committed: Vec<Appointed>,
    draft: Option<Vec<Appointed>>,
    selected_type: Option<String>,
    panel: String,
}

impl FakeFixture {
    pub fn new(id: &str, competition: &str, date: &str) -> Self {
        Self {
            id: id.into(),
            competition: competition.into(),
            date: date.into(),
            time: "15:00".into(),
            home: "Adelaide City".into(),
            away: "Campbelltown City".into(),
            ground: "Marden Sports Complex".into(),
            committed: vec![],
            draft: None,
            selected_type: None,
            panel: "1".into(),
        }
    }

    fn effective(&self) -> &[Appointed] {
        self.draft.as_deref().unwrap_or(&self.committed)
    }

    fn draft_mut(&mut self) -> &mut Vec<Appointed> {
        let committed = &self.committed;
        self.draft.get_or_insert_with(|| committed.clone())
    }
}

struct FakeWeek {
    id: String,
    label: String,
    fixtures: Vec<String>,
}

struct FakeSeason {
    id: String,
    name: String,
    organisation: String,
    weeks: Vec<FakeWeek>,
}

struct FakeOfficial {
    name: String,
    person_id: String,
    panel: String,
}

struct State {
    organisations: Vec<(String, String)>,
    seasons: Vec<FakeSeason>,
    fixtures: Vec<FakeFixture>,
    panels: Vec<(String, String)>,
    types: Vec<(String, String)>,
    officials: Vec<FakeOfficial>,
    /// Bumped on every removal; record ids of older generations are stale.
    generation: u32,
    calls: Vec<RecordedCall>,
    fail_on: Option<(String, usize)>,
    close_rejections: usize,
    /// Listed on their panel without an `Appoint` link.
    without_handle: Vec<String>,
}

pub struct FakeSchedula {
    state: RefCell<State>,
}

fn injected(what: impl Into<String>) -> TransportError {
    TransportError::Other(what.into())
}

impl FakeSchedula {
    pub const PASSWORD: &'static str = "correct horse";

    /// One organisation (FFSA) with a 2020 season of one week holding one
    /// fixture (123), two panels and four officials.
    pub fn sample() -> Self {
        let state = State {
            organisations: vec![("9".into(), "FFSA".into())],
            seasons: vec![FakeSeason {
                id: "3033".into(),
                name: "2020".into(),
                organisation: "9".into(),
                weeks: vec![FakeWeek {
                    id: "2020-02-03_2020-02-09".into(),
                    label: "Week 4 (Feb 3 to Feb 9)".into(),
                    fixtures: vec!["123".into()],
                }],
            }],
            fixtures: vec![FakeFixture::new("123", "Senior Men", "Sat Feb 8")],
            panels: vec![
                ("1".into(), "Referee (built-in)".into()),
                ("2".into(), "Assessors".into()),
            ],
            types: [
                ("70", "Referee"),
                ("71", "AR 1"),
                ("72", "AR 2"),
                ("73", "Referee Mentor"),
                ("74", "Referee Assessor"),
                ("75", "4th Official"),
            ]
            .into_iter()
            .map(|(id, label)| (id.into(), label.into()))
            .collect(),
            officials: [
                ("Smith, John", "11504519", "1"),
                ("Jones, Amy", "13957370", "1"),
                ("Brown, Sam", "10000003", "1"),
                ("Green, Kim", "10000004", "2"),
            ]
            .into_iter()
            .map(|(name, person_id, panel)| FakeOfficial {
                name: name.into(),
                person_id: person_id.into(),
                panel: panel.into(),
            })
            .collect(),
            generation: 0,
            calls: vec![],
            fail_on: None,
            close_rejections: 0,
            without_handle: vec![],
        };
        Self {
            state: RefCell::new(state),
        }
    }

    pub fn add_season(&self, id: &str, name: &str) {
        self.state.borrow_mut().seasons.push(FakeSeason {
            id: id.into(),
            name: name.into(),
            organisation: "9".into(),
            weeks: vec![],
        });
    }

    pub fn add_week(&self, season: &str, id: &str, label: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(season) = state.seasons.iter_mut().find(|s| s.id == season) {
            season.weeks.push(FakeWeek {
                id: id.into(),
                label: label.into(),
                fixtures: vec![],
            });
        }
    }

    pub fn add_fixture(&self, week: &str, fixture: FakeFixture) {
        let mut state = self.state.borrow_mut();
        if let Some(week) = state
            .seasons
            .iter_mut()
            .flat_map(|s| &mut s.weeks)
            .find(|w| w.id == week)
        {
            week.fixtures.push(fixture.id.clone());
        }
        state.fixtures.push(fixture);
    }

    /// Stores an appointment as if it had been saved earlier.
    pub fn appoint(&self, fixture: &str, person_id: &str, type_id: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(fixture) = state.fixtures.iter_mut().find(|f| f.id == fixture) {
            fixture.committed.push(Appointed {
                person_id: person_id.into(),
                type_id: type_id.into(),
                status: "accepted".into(),
            });
        }
    }

    /// The `nth` (1-based) call of `function` fails at the transport level.
    pub fn fail_on(&self, function: &str, nth: usize) {
        self.state.borrow_mut().fail_on = Some((function.into(), nth));
    }

    /// The next `times` close calls are answered with `confirmClose`.
    pub fn reject_close(&self, times: usize) {
        self.state.borrow_mut().close_rejections = times;
    }

    /// The official's panel entry stops offering an appoint link.
    pub fn hide_appoint_handle(&self, person_id: &str) {
        self.state
            .borrow_mut()
            .without_handle
            .push(person_id.into());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Saved `(person id, type id)` pairs of a fixture.
    pub fn committed(&self, fixture: &str) -> Vec<(String, String)> {
        let state = self.state.borrow();
        state
            .fixtures
            .iter()
            .find(|f| f.id == fixture)
            .map(|f| {
                f.committed
                    .iter()
                    .map(|a| (a.person_id.clone(), a.type_id.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_open_edit(&self, fixture: &str) -> bool {
        let state = self.state.borrow();
        state
            .fixtures
            .iter()
            .any(|f| f.id == fixture && f.draft.is_some())
    }
}

impl State {
    fn record_id(&self, person_id: &str) -> String {
        let index = self
            .officials
            .iter()
            .position(|o| o.person_id == person_id)
            .unwrap_or(usize::MAX);
        format!("{}{:03}", self.generation + 1, index)
    }

    fn official_by_record(&self, record_id: &str) -> Option<&FakeOfficial> {
        self.officials
            .iter()
            .find(|o| self.record_id(&o.person_id) == record_id)
    }

    fn official_name(&self, person_id: &str) -> String {
        self.officials
            .iter()
            .find(|o| o.person_id == person_id)
            .map(|o| o.name.clone())
            .unwrap_or_default()
    }

    fn fixture_mut(&mut self, id: &str) -> Result<&mut FakeFixture, TransportError> {
        self.fixtures
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| injected(format!("no fixture {id}")))
    }

    fn fixture(&self, id: &str) -> Result<&FakeFixture, TransportError> {
        self.fixtures
            .iter()
            .find(|f| f.id == id)
            .ok_or_else(|| injected(format!("no fixture {id}")))
    }

    fn options(options: &[(String, String)], selected: Option<&str>) -> String {
        options
            .iter()
            .map(|(value, label)| {
                let selected = if Some(&value[..]) == selected {
                    " selected"
                } else {
                    ""
                };
                format!("<option value=\"{value}\"{selected}>{label}</option>")
            })
            .join("\n")
    }

    fn admin_page(&self) -> String {
        let organisations = self
            .organisations
            .iter()
            .map(|(id, name)| format!("<option value=\"{id}\">{name}</option>"))
            .join("\n");
        format!(
            r#"<html><body><div id="menu"><select name="nav"><option value="home">Home</option></select></div>
<form name="search_fixture"><table><tr><td><div class="select_wrap">
<select name="orgs" id="orgs" class="input_select" onchange="xajax_GetSeasons(document.search_fixture.orgs.value,'AppointByWeek')">
<option value=""></option>
{organisations}
</select></div></td><td id="season_div"></td></tr></table></form></body></html>"#
        )
    }

    fn seasons(&self, organisation: &str) -> String {
        let options = self
            .seasons
            .iter()
            .filter(|s| s.organisation == organisation)
            .map(|s| format!("<option value=\"{}\">{}</option>", s.id, s.name))
            .join("\n");
        xjx_assign(&format!(
            "<select class=\"input_select\" name=\"season\" id=\"season\" onchange=\"xajax_GetSeasonWeeks(document.search_fixture.season.value,'AppointByWeek')\">\n<option value=\"\"></option>\n{options}\n</select>"
        ))
    }

    fn weeks(&self, season: &str) -> String {
        let options = self
            .seasons
            .iter()
            .filter(|s| s.id == season)
            .flat_map(|s| &s.weeks)
            .map(|w| format!("<option value=\"{}\">{}</option>", w.id, w.label))
            .join("\n");
        xjx_assign(&format!(
            "<input type=\"button\" value=\"Show\" onclick=\"xajax_ShowFixturesForWeek({season},document.search_fixture.week.value)\" />\n<select id=\"week\" name=\"week\">\n{options}\n</select>"
        ))
    }

    fn fixtures_for_week(&self, week: &str) -> String {
        let ids = self
            .seasons
            .iter()
            .flat_map(|s| &s.weeks)
            .filter(|w| w.id == week)
            .flat_map(|w| &w.fixtures)
            .collect_vec();
        let fixtures = self
            .fixtures
            .iter()
            .filter(|f| ids.contains(&&f.id))
            .collect_vec();
        let rows = fixtures
            .iter()
            .map(|f| {
                (
                    &f.competition[..],
                    &f.date[..],
                    &f.time[..],
                    &f.home[..],
                    &f.away[..],
                    &f.ground[..],
                    &f.id[..],
                )
            })
            .collect_vec();
        fixture_rows(&rows)
    }

    fn appointment_page(&self, fixture: &FakeFixture) -> String {
        let rows = fixture
            .effective()
            .iter()
            .map(|a| {
                let record_id = self.record_id(&a.person_id);
                format!(
                    r#"<tr><td>{name}</td><td><select name="type_{record_id}" onchange="xajax_AppointUmpire({record_id},this.value,{fixture},false)">
{options}
</select></td><td class="status"><img src="https://schedula.sportstg.com/images/{status}_16.png" /></td></tr>"#,
                    name = self.official_name(&a.person_id),
                    fixture = fixture.id,
                    options = Self::options(&self.types, Some(a.type_id.as_str())),
                    status = a.status,
                )
            })
            .join("\n");
        format!(
            r#"<html><body><h2>{home} v {away}</h2>
<table class="list"><tr><th>Official</th><th>Role</th><th>Status</th></tr>
{rows}
</table>
<form name="panels_form"><select name="panel" onchange="xajax_ChangePanel(this.value,{id},false)">
{panels}
</select></form>
<form name="appointment_type_form"><select name="type" onchange="xajax_ChangeAppointmentType(this.value,{id})">
{types}
</select></form>
<div id="officials"></div></body></html>"#,
            home = fixture.home,
            away = fixture.away,
            id = fixture.id,
            panels = Self::options(&self.panels, Some(fixture.panel.as_str())),
            types = Self::options(&self.types, fixture.selected_type.as_deref()),
        )
    }

    /// The officials of the fixture's current panel plus the pending table.
    fn officials(&self, fixture: &FakeFixture) -> String {
        let appointed = fixture.effective();
        let is_appointed = |person_id: &str| appointed.iter().any(|a| a.person_id == person_id);
        let panel = self
            .officials
            .iter()
            .filter(|o| o.panel == fixture.panel)
            .map(|o| {
                let hidden =
                    is_appointed(&o.person_id) || self.without_handle.contains(&o.person_id);
                let appoint = if hidden {
                    String::new()
                } else {
                    format!(
                        r##" <a href="#" onclick="xajax_AppointUmpire({},document.appointment_type_form.type.value,{},false);return false;">Appoint</a>"##,
                        self.record_id(&o.person_id),
                        fixture.id
                    )
                };
                format!(
                    "<tr><td><b>{}</b>{appoint}</td>\n<td><a href=\"index.php?action=admin/people/view&personid={}&tab=1\">Details</a></td></tr>",
                    o.name, o.person_id
                )
            })
            .join("\n");
        let pending = appointed
            .iter()
            .map(|a| {
                format!(
                    "<tr><td>{}</td><td><input type=\"button\" onclick=\"xajax_AppointUmpire({},'{}',{},false)\" value=\"Re-appoint\" /></td><td><img src=\"/images/{}_16.png\" /></td></tr>",
                    self.official_name(&a.person_id),
                    self.record_id(&a.person_id),
                    a.type_id,
                    fixture.id,
                    a.status
                )
            })
            .join("\n");
        format!(
            r#"<?xml version="1.0" encoding="utf-8" ?><xjx><cmd n="as" t="officials" p="innerHTML"><![CDATA[S<table class="list">
{panel}
</table>]]></cmd><cmd n="as" t="pending" p="innerHTML"><![CDATA[S<table>
{pending}
</table><p>Pending appointments will also appear above.</p>]]></cmd></xjx>"#
        )
    }

    fn handle_fixture_call(
        &mut self,
        fixture_id: &str,
        function: &str,
        args: &[String],
    ) -> Result<String, TransportError> {
        let arg = |i: usize| {
            args.get(i)
                .map(|a| a.as_str())
                .ok_or_else(|| injected(format!("{function}: missing argument {i}")))
        };
        match function {
            "ChangePanel" => {
                let panel = arg(0)?.to_owned();
                if !self.panels.iter().any(|(id, _)| *id == panel) {
                    return Err(injected(format!("unknown panel {panel}")));
                }
                self.fixture_mut(fixture_id)?.panel = panel;
                Ok(self.officials(self.fixture(fixture_id)?))
            }
            "ChangeAppointmentType" => {
                let kind = arg(0)?.to_owned();
                self.fixture_mut(fixture_id)?.selected_type = Some(kind);
                Ok(EMPTY_RESPONSE.to_owned())
            }
            "AppointUmpire" => {
                let (record, kind) = (arg(0)?, arg(1)?);
                let official = self
                    .official_by_record(record)
                    .ok_or_else(|| injected(format!("stale record id {record}")))?;
                let person_id = official.person_id.clone();
                let panel = official.panel.clone();
                let fixture = self.fixture_mut(fixture_id)?;
                if fixture.selected_type.as_deref() != Some(kind) {
                    return Err(injected(format!("type {kind} was not selected")));
                }
                if fixture.panel != panel {
                    return Err(injected(format!("{person_id} is not on the shown panel")));
                }
                let draft = fixture.draft_mut();
                if draft.iter().any(|a| a.person_id == person_id) {
                    return Err(injected(format!("{person_id} is already appointed")));
                }
                draft.push(Appointed {
                    person_id,
                    type_id: kind.to_owned(),
                    status: "pending".into(),
                });
                Ok(EMPTY_RESPONSE.to_owned())
            }
            "UnappointUmpire" => {
                let (record, kind) = (arg(0)?, arg(1)?);
                let person_id = self
                    .official_by_record(record)
                    .ok_or_else(|| injected(format!("stale record id {record}")))?
                    .person_id
                    .clone();
                let draft = self.fixture_mut(fixture_id)?.draft_mut();
                let before = draft.len();
                draft.retain(|a| !(a.person_id == person_id && a.type_id == kind));
                if draft.len() == before {
                    return Err(injected(format!("{person_id} does not hold type {kind}")));
                }
                self.generation += 1;
                Ok(self.officials(self.fixture(fixture_id)?))
            }
            "SaveAppointments" => {
                let fixture = self.fixture_mut(fixture_id)?;
                if let Some(draft) = fixture.draft.take() {
                    fixture.committed = draft;
                }
                fixture.selected_type = None;
                Ok(EMPTY_RESPONSE.to_owned())
            }
            "DiscardChanges" => {
                let fixture = self.fixture_mut(fixture_id)?;
                fixture.draft = None;
                fixture.selected_type = None;
                Ok(EMPTY_RESPONSE.to_owned())
            }
            "JustClose" => {
                let function = if self.close_rejections > 0 {
                    self.close_rejections -= 1;
                    format!("confirmClose({fixture_id})")
                } else {
                    "closeWindow".to_owned()
                };
                Ok(format!(
                    r#"<?xml version="1.0" encoding="utf-8" ?><xjx><cmd n="js" func="{function}"></cmd></xjx>"#
                ))
            }
            _ => Err(injected(format!("unexpected call {function}"))),
        }
    }
}

const EMPTY_RESPONSE: &str = r#"<?xml version="1.0" encoding="utf-8" ?><xjx></xjx>"#;

fn xjx_assign(html: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?><xjx><cmd n="as" t="target" p="innerHTML"><![CDATA[S{html}]]></cmd></xjx>"#
    )
}

fn fixture_param(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == "fixtureid")
        .map(|(_, value)| value.into_owned())
}

impl Transport for FakeSchedula {
    async fn get(&self, url: Url) -> Result<String, TransportError> {
        let state = self.state.borrow();
        let query = url.query().unwrap_or("");
        if query.contains("appoint_match") {
            let id = fixture_param(&url).ok_or_else(|| injected("no fixtureid"))?;
            Ok(state.appointment_page(state.fixture(&id)?))
        } else if query.contains("appoint_by_week") {
            Ok(state.admin_page())
        } else {
            Ok("<html><body><form name=\"login\"></form></body></html>".to_owned())
        }
    }

    async fn post(&self, url: Url, form_body: String) -> Result<String, TransportError> {
        let pairs: Vec<(String, String)> = serde_html_form::from_str(&form_body)
            .map_err(|e| injected(format!("undecodable body: {e}")))?;
        let function = pairs
            .iter()
            .find(|(key, _)| key == "xjxfun")
            .map(|(_, value)| value.clone())
            .ok_or_else(|| injected("no xjxfun"))?;
        let raw_args = pairs
            .iter()
            .filter(|(key, _)| key == "xjxargs[]")
            .map(|(_, value)| value.clone())
            .collect_vec();
        let args = raw_args
            .iter()
            .map(|arg| arg.get(1..).unwrap_or("").to_owned())
            .collect_vec();
        let fixture = fixture_param(&url);

        let mut state = self.state.borrow_mut();
        state.calls.push(RecordedCall {
            function: function.clone(),
            args: args.clone(),
            fixture: fixture.clone(),
        });
        if let Some((failing, nth)) = &state.fail_on {
            let seen = state.calls.iter().filter(|c| &c.function == failing).count();
            if failing == &function && seen == *nth {
                return Err(injected(format!("injected failure of {function}")));
            }
        }

        match (&function[..], fixture) {
            ("dologin", _) => {
                let ok = raw_args
                    .first()
                    .is_some_and(|obj| obj.contains(&format!("<v>S{}</v>", Self::PASSWORD)));
                let target = if ok {
                    format!("{}index.php?action=dashboard", url.as_str())
                } else {
                    "Invalid email or password".to_owned()
                };
                Ok(format!(
                    r#"<?xml version="1.0" encoding="utf-8" ?><xjx><cmd n="rd"><![CDATA[S"{target}"]]></cmd></xjx>"#
                ))
            }
            ("GetSeasons", _) => Ok(state.seasons(args.first().map_or("", |a| a.as_str()))),
            ("GetSeasonWeeks", _) => Ok(state.weeks(args.first().map_or("", |a| a.as_str()))),
            ("ShowFixturesForWeek", _) => {
                Ok(state.fixtures_for_week(args.get(1).map_or("", |a| a.as_str())))
            }
            (function, Some(fixture)) => state.handle_fixture_call(&fixture, function, &args),
            (function, None) => Err(injected(format!("unexpected call {function}"))),
        }
    }
}
