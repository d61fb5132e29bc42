//! `<select>` option lists: organisations, seasons, weeks, panels and
//! appointment types all arrive this way.
use super::{
    token::{clean_text, Token, Tokenizer},
    Parsed,
};

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Where the select of interest starts.
#[derive(Clone, Copy, Debug)]
pub enum Anchor<'s> {
    /// The first `<select>` of the fragment.
    FirstSelect,
    /// The first `<select>` after `<form name="...">`.
    Form(&'s str),
}

/// Reads options up to the closing `</select>` (or the end of the CDATA
/// payload).  Options with an empty value are placeholders and are dropped.
pub fn parse(src: &str, anchor: Anchor) -> Parsed<SelectOption> {
    let mut res = Parsed::default();
    let mut tokens = Tokenizer::new(src);

    if let Anchor::Form(name) = anchor {
        let found = tokens
            .by_ref()
            .any(|token| matches!(&token, Token::Open(tag) if tag.is("form") && tag.attr("name") == Some(name)));
        if !found {
            res.anomaly("option list", format!("form {name:?} not found"));
            return res;
        }
    }
    if !tokens.by_ref().any(|token| token.is_open("select")) {
        res.anomaly("option list", "no <select> found");
        return res;
    }

    let mut current: Option<PendingOption> = None;
    for token in tokens {
        match token {
            Token::Open(tag) if tag.is("option") => {
                finish(&mut current, &mut res);
                current = Some(PendingOption {
                    value: tag.attr("value"),
                    selected: tag.has_attr("selected"),
                    label: String::new(),
                });
            }
            Token::Text(text) => {
                if let Some(option) = &mut current {
                    option.label.push_str(text);
                }
            }
            Token::Close(name) if name.eq_ignore_ascii_case("option") => {
                finish(&mut current, &mut res);
            }
            Token::Close(name) if name.eq_ignore_ascii_case("select") => {
                finish(&mut current, &mut res);
                return res;
            }
            Token::CDataEnd => break,
            _ => {}
        }
    }
    finish(&mut current, &mut res);
    res
}

struct PendingOption<'a> {
    value: Option<&'a str>,
    selected: bool,
    label: String,
}

fn finish(current: &mut Option<PendingOption>, res: &mut Parsed<SelectOption>) {
    let Some(option) = current.take() else {
        return;
    };
    match option.value {
        None => res.anomaly(
            "option list",
            format!("option {:?} has no value", option.label),
        ),
        Some(value) if value.trim().is_empty() => {}
        Some(value) => res.records.push(SelectOption {
            value: value.trim().to_owned(),
            label: clean_text(&option.label),
            selected: option.selected,
        }),
    }
}
