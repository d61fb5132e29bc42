//! The week table returned by `ShowFixturesForWeek`.
//!
//! A `<th colspan>` row names the competition for the rows below it.  Each
//! fixture row is a run of cells (date, time, home, "v", away, ground) closed
//! by an `<u>` link whose handler carries `fixtureid=`.
use super::{
    query_param,
    token::{clean_text, Token, Tokenizer},
    Parsed, Slots,
};

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FixtureRow {
    pub competition: String,
    pub date: String,
    pub time: String,
    pub home: String,
    pub away: String,
    pub ground: String,
    pub id: String,
}

const FIELDS: [&str; 5] = ["date", "time", "home team", "away team", "ground"];

enum Expect {
    Nothing,
    Competition,
    Cell,
}

pub fn parse(src: &str) -> Parsed<FixtureRow> {
    let mut res = Parsed::default();
    let mut competition = String::new();
    let mut slots = Slots::<5>::new();
    let mut expect = Expect::Nothing;

    for token in Tokenizer::new(src) {
        match (&expect, &token) {
            (Expect::Competition, Token::Text(text)) => competition = clean_text(text),
            (Expect::Cell, Token::Text(text)) => {
                let text = clean_text(text);
                if !text.is_empty() && text != "v" {
                    slots.fill(text);
                }
            }
            _ => {}
        }
        expect = Expect::Nothing;

        match token {
            Token::Close(name) if name.eq_ignore_ascii_case("table") => break,
            Token::Open(tag) if tag.is("th") && tag.has_attr("colspan") => {
                slots.clear();
                expect = Expect::Competition;
            }
            Token::Open(tag) if tag.is("td") => expect = Expect::Cell,
            Token::Open(tag) if tag.is("u") => {
                let Some(id) = tag
                    .attr_containing("fixtureid=")
                    .and_then(|value| query_param(value, "fixtureid="))
                else {
                    continue;
                };
                let record = match slots.first_missing() {
                    Some(missing) => Err(super::ParseAnomaly::new(
                        "fixture table",
                        format!("fixture {id} has no {}", FIELDS[missing]),
                    )),
                    None => {
                        let [date, time, home, away, ground] =
                            slots.take().unwrap_or_default();
                        Ok(FixtureRow {
                            competition: competition.clone(),
                            date,
                            time,
                            home,
                            away,
                            ground,
                            id: id.to_owned(),
                        })
                    }
                };
                slots.clear();
                res.push(record);
            }
            _ => {}
        }
    }
    res
}
