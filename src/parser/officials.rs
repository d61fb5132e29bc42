//! Officials listed in a `ChangePanel` (or `UnappointUmpire`) response.
//!
//! The response carries two tables.  The first lists every official of the
//! panel: a cell with the name in bold and an `AppointUmpire(<record id>, ...)`
//! handler, followed by a cell linking to the person (`personid=`).  The
//! second, a payload that starts with a bare `<table>`, lists pending
//! appointments and re-issues record ids for officials already on the fixture.
use super::{
    first_call_argument, query_param,
    token::{clean_text, Token, Tokenizer},
    Parsed,
};

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct OfficialRow {
    pub name: String,
    pub person_id: String,
    pub record_id: Option<String>,
}

/// What one `<td>` cell contained.
#[derive(Default)]
struct Cell {
    bold: String,
    in_bold: bool,
    text: String,
    text_closed: bool,
    record_id: Option<String>,
    person_id: Option<String>,
    removed: bool,
    image: bool,
}

impl Cell {
    fn feed(&mut self, token: &Token) {
        match token {
            Token::Open(tag) if tag.is("b") => self.in_bold = true,
            Token::Close(name) if name.eq_ignore_ascii_case("b") => self.in_bold = false,
            Token::Close(name) if name.eq_ignore_ascii_case("td") => self.text_closed = true,
            Token::Text(text) => {
                if self.in_bold {
                    self.bold.push_str(text);
                }
                if !self.text_closed {
                    self.text.push_str(text);
                }
            }
            Token::Open(tag) => {
                self.image |= tag.is("img");
                self.removed |= tag.attr("value") == Some("Removed");
                if self.record_id.is_none() {
                    self.record_id = tag
                        .attr_containing("AppointUmpire(")
                        .and_then(|handler| first_call_argument(handler, "AppointUmpire"))
                        .map(str::to_owned);
                }
                if self.person_id.is_none() {
                    self.person_id = tag
                        .attr_containing("personid=")
                        .and_then(|href| query_param(href, "personid="))
                        .map(str::to_owned);
                }
            }
            _ => {}
        }
    }
}

#[derive(PartialEq, Eq)]
enum Section {
    Panel,
    Pending,
}

#[derive(Default)]
struct Pending {
    name: String,
    record_id: Option<String>,
}

struct Builder {
    section: Section,
    pending: Pending,
    res: Parsed<OfficialRow>,
}

impl Builder {
    fn finish(&mut self, cell: Cell) {
        match self.section {
            Section::Panel => self.panel_cell(cell),
            Section::Pending => self.pending_cell(cell),
        }
    }

    fn panel_cell(&mut self, cell: Cell) {
        let bold = clean_text(&cell.bold);
        if !bold.is_empty() && cell.record_id.is_some() {
            self.pending = Pending {
                name: bold,
                record_id: cell.record_id,
            };
            return;
        }
        if !bold.is_empty() {
            self.pending.name = bold;
        }
        let Some(person_id) = cell.person_id else {
            return;
        };
        let Pending { name, record_id } = std::mem::take(&mut self.pending);
        if name.is_empty() {
            self.res.anomaly(
                "panel officials",
                format!("person {person_id} listed without a name"),
            );
        } else {
            self.res.records.push(OfficialRow {
                name,
                person_id,
                record_id,
            });
        }
    }

    fn pending_cell(&mut self, cell: Cell) {
        if cell.removed || cell.image {
            return;
        }
        if let Some(record_id) = cell.record_id {
            // Officials of other panels show up here too; they are not ours to update.
            let name = std::mem::take(&mut self.pending.name);
            if let Some(official) = self.res.records.iter_mut().find(|o| o.name == name) {
                official.record_id = Some(record_id);
            }
            return;
        }
        let text = clean_text(&cell.text);
        if !text.is_empty() {
            self.pending.name = text;
        }
    }
}

pub fn parse(src: &str) -> Parsed<OfficialRow> {
    let mut builder = Builder {
        section: Section::Panel,
        pending: Pending::default(),
        res: Parsed::default(),
    };
    let mut cell: Option<Cell> = None;
    // Tracks `<![CDATA[` `S` `<table>`: the start of the pending table.
    let mut cdata_prefix = 0;

    for token in Tokenizer::new(src) {
        cdata_prefix = match (&token, cdata_prefix) {
            (Token::CData, _) => 1,
            (Token::Text("S"), 1) => 2,
            (Token::Open(tag), 2) if tag.is("table") && tag.attrs.is_empty() => {
                if let Some(done) = cell.take() {
                    builder.finish(done);
                }
                builder.section = Section::Pending;
                builder.pending = Pending::default();
                0
            }
            _ => 0,
        };

        match &token {
            Token::Open(tag) if tag.is("td") && tag.attrs.is_empty() => {
                if let Some(done) = cell.replace(Cell::default()) {
                    builder.finish(done);
                }
            }
            token => {
                if let Some(cell) = &mut cell {
                    cell.feed(token);
                }
            }
        }
    }
    if let Some(done) = cell {
        builder.finish(done);
    }
    builder.res
}
