//! The appointment table at the top of a fixture's appointment page.
use super::{
    first_call_argument,
    token::{clean_text, Token, Tokenizer},
    Parsed,
};

/// One appointed official, before it is tied to its fixture.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AppointmentRow {
    pub name: String,
    pub record_id: String,
    pub role: String,
    pub role_type_id: String,
    pub status: String,
}

const NAME: usize = 0;
const RECORD_ID: usize = 1;
const ROLE: usize = 2;
const ROLE_TYPE_ID: usize = 3;
const STATUS: usize = 4;

/// Rows are emitted as soon as all five fields are known; a row that is still
/// incomplete when the next `<tr>` (or the end of the table) arrives is
/// dropped without an anomaly, since the table also contains header and
/// action rows that never fill up.
pub fn parse(src: &str) -> Parsed<AppointmentRow> {
    let mut res = Parsed::default();
    let mut tokens = Tokenizer::new(src);
    if !tokens.by_ref().any(|token| token.is_open("table")) {
        res.anomaly("appointment table", "no <table> found");
        return res;
    }

    let mut row = Row::default();
    let mut expect_name = false;
    for token in tokens {
        if let (true, Token::Text(text)) = (expect_name, &token) {
            row.set(NAME, clean_text(text));
        }
        expect_name = false;

        match token {
            Token::Close(name) if name.eq_ignore_ascii_case("table") => break,
            Token::Open(tag) if tag.is("tr") => row = Row::default(),
            Token::Open(tag) if tag.is("td") && tag.attrs.is_empty() => expect_name = true,
            Token::Open(tag) if tag.is("option") && tag.has_attr("selected") => {
                // The label is the text that follows; remember the id for now.
                row.pending_role = tag.attr("value").map(str::to_owned);
            }
            Token::Text(text) if row.pending_role.is_some() => {
                if let Some(id) = row.pending_role.take() {
                    row.set(ROLE_TYPE_ID, id);
                    row.set(ROLE, clean_text(text));
                }
            }
            Token::Open(tag) if tag.is("select") => {
                if let Some(id) = tag
                    .attr_containing("AppointUmpire(")
                    .and_then(|handler| first_call_argument(handler, "AppointUmpire"))
                {
                    row.set(RECORD_ID, id.to_owned());
                }
            }
            Token::Open(tag) if tag.is("img") => {
                let status = tag.attr("src").and_then(status_from_icon);
                row.set(STATUS, status.unwrap_or("?").to_owned());
            }
            _ => {}
        }

        if let Some([name, record_id, role, role_type_id, status]) = row.complete() {
            res.records.push(AppointmentRow {
                name,
                record_id,
                role,
                role_type_id,
                status,
            });
            row = Row::default();
        }
    }
    res
}

/// `.../images/accepted_16.png` → `accepted`
fn status_from_icon(src: &str) -> Option<&str> {
    let file = src.rsplit('/').next()?;
    let (status, _) = file.split_once('_')?;
    Some(status).filter(|status| !status.is_empty())
}

#[derive(Default)]
struct Row {
    fields: [Option<String>; 5],
    /// Id of the selected option whose label is the next text.
    pending_role: Option<String>,
}

impl Row {
    /// Keeps the first non-empty value seen for a field.
    fn set(&mut self, field: usize, value: String) {
        let slot = &mut self.fields[field];
        if slot.is_none() && !value.is_empty() {
            *slot = Some(value);
        }
    }

    fn complete(&mut self) -> Option<[String; 5]> {
        if self.fields.iter().any(Option::is_none) {
            return None;
        }
        Some(std::mem::take(&mut self.fields).map(Option::unwrap_or_default))
    }
}

#[cfg(test)]
mod tests {
    use super::{parse, status_from_icon, AppointmentRow};

    const PAGE: &str = r#"<html><body><div class="appointments">
<table class="list">
<tr><th>Official</th><th>Role</th><th></th><th>Status</th></tr>
<tr><td>Smith, John</td>
 <td><select name="type_4411" onchange="xajax_AppointUmpire(4411,this.value,123,false)">
  <option value="71">AR 1</option>
  <option value="70" selected>Referee</option>
 </select></td>
 <td class="status"><img src="https://schedula.sportstg.com/images/accepted_16.png" /></td></tr>
<tr><td>Jones, Amy</td>
 <td><select name="type_4412" onchange="xajax_AppointUmpire(4412,this.value,123,false)">
  <option value="71" selected>AR 1</option>
 </select></td>
 <td class="status"><img src="/images/icons/pending.png" /></td></tr>
<tr><td>Half, Row</td><td>no select here</td></tr>
</table>
<form name="panels_form"><select><option value="1">Referee (built-in)</option></select></form>
<table><tr><td>Other</td></tr></table>
</div></body></html>"#;

    #[test]
    fn complete_rows_only() {
        let res = parse(PAGE);
        assert!(res.anomalies.is_empty());
        assert_eq!(
            res.records,
            vec![
                AppointmentRow {
                    name: "Smith, John".into(),
                    record_id: "4411".into(),
                    role: "Referee".into(),
                    role_type_id: "70".into(),
                    status: "accepted".into(),
                },
                AppointmentRow {
                    name: "Jones, Amy".into(),
                    record_id: "4412".into(),
                    role: "AR 1".into(),
                    role_type_id: "71".into(),
                    status: "?".into(),
                },
            ]
        );
    }

    #[test]
    fn page_without_table() {
        let res = parse("<html>Session expired</html>");
        assert!(res.records.is_empty());
        assert_eq!(res.anomalies.len(), 1);
    }

    #[test]
    fn truncated_page_terminates() {
        let cut = PAGE.find("<tr><td>Jones").unwrap() + 20;
        let res = parse(&PAGE[..cut]);
        assert_eq!(res.records.len(), 1);
    }

    #[test]
    fn icon_names() {
        assert_eq!(status_from_icon("/images/declined_16.png"), Some("declined"));
        assert_eq!(status_from_icon("/images/blank.gif"), None);
        assert_eq!(status_from_icon("_x.png"), None);
    }
}
