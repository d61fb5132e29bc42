//! Fragment parsers.  Each one walks the token stream of a response and
//! returns the records it could build together with the ones it had to skip.
use itertools::Itertools;
use log::warn;

use crate::error::ParseAnomaly;

pub mod appointments;
pub mod fixtures;
pub mod officials;
pub mod options;
pub mod token;
pub mod xjx_response;

/// Records extracted from one fragment plus a reason for every skipped record.
#[derive(Debug)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub anomalies: Vec<ParseAnomaly>,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            records: vec![],
            anomalies: vec![],
        }
    }
}

impl<T> Parsed<T> {
    pub fn push(&mut self, record: Result<T, ParseAnomaly>) {
        match record {
            Ok(record) => self.records.push(record),
            Err(anomaly) => self.anomalies.push(anomaly),
        }
    }

    pub fn anomaly(&mut self, context: &'static str, reason: impl Into<String>) {
        self.anomalies.push(ParseAnomaly::new(context, reason));
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Parsed<U> {
        Parsed {
            records: self.records.into_iter().map(f).collect(),
            anomalies: self.anomalies,
        }
    }

    /// Moves the anomalies into `log` and hands back the records.
    pub fn drain_into(self, log: &mut Vec<ParseAnomaly>) -> Vec<T> {
        log.extend(self.anomalies);
        self.records
    }
}

/// Reports the anomalies gathered over a whole enumeration in one go.
pub fn report_anomalies(what: &str, anomalies: &[ParseAnomaly]) {
    if anomalies.is_empty() {
        return;
    }
    warn!(
        "{} record(s) skipped while reading {what}: {}",
        anomalies.len(),
        anomalies.iter().take(5).join("; ")
    );
}

/// Fixed-size record filled one field at a time, in order.
pub(crate) struct Slots<const N: usize>([Option<String>; N]);

impl<const N: usize> Slots<N> {
    pub fn new() -> Self {
        Self(std::array::from_fn(|_| None))
    }

    /// Puts `value` into the next empty slot; `false` when the record is full.
    pub fn fill(&mut self, value: String) -> bool {
        match self.0.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }

    pub fn first_missing(&self) -> Option<usize> {
        self.0.iter().position(Option::is_none)
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Takes the record if every slot is filled, leaving the slots empty.
    pub fn take(&mut self) -> Option<[String; N]> {
        if self.first_missing().is_some() {
            return None;
        }
        let slots = std::mem::replace(self, Self::new());
        Some(slots.0.map(|slot| slot.unwrap_or_default()))
    }
}

/// Value of `key` inside a URL-ish attribute, e.g. `fixtureid=` in an
/// `onclick` handler.
pub(crate) fn query_param<'a>(haystack: &'a str, key: &str) -> Option<&'a str> {
    let (_, rest) = haystack.split_once(key)?;
    let end = rest
        .find(|c: char| matches!(c, '&' | '"' | '\'' | ')' | ';') || c.is_whitespace())
        .unwrap_or(rest.len());
    Some(&rest[..end]).filter(|value| !value.is_empty())
}

/// First argument of a JavaScript call such as `xajax_AppointUmpire(123,'R',...)`.
pub(crate) fn first_call_argument<'a>(haystack: &'a str, function: &str) -> Option<&'a str> {
    let (_, rest) = haystack.split_once(function)?;
    let rest = rest.trim_start().strip_prefix('(')?;
    let end = rest.find([',', ')']).unwrap_or(rest.len());
    Some(rest[..end].trim().trim_matches(|c| c == '\'' || c == '"')).filter(|arg| !arg.is_empty())
}
