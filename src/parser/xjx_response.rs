//! Envelope-level facts of an xjx response that are not markup tables.
use super::token::{Token, Tokenizer};

/// The address the login response redirects to: the first double-quoted
/// string following the first CDATA marker.
pub fn login_redirect(src: &str) -> Option<&str> {
    let (_, payload) = src.split_once("CDATA")?;
    let (_, quoted) = payload.split_once('"')?;
    let (target, _) = quoted.split_once('"')?;
    Some(target)
}

/// Value of the first `func` attribute, e.g. `confirmClose(123)` when the
/// server refuses to close an edit with unsaved changes.
pub fn called_function(src: &str) -> Option<&str> {
    Tokenizer::new(src).find_map(|token| match token {
        Token::Open(tag) => tag.attr("func"),
        _ => None,
    })
}
