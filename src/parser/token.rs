//! A small state machine that splits a response into structural tokens.
//!
//! The site returns XML envelopes wrapping CDATA payloads of HTML that is
//! frequently not well formed, so nothing here builds a tree.  Quoting is
//! honoured inside tags, stray `<` characters fall back to text, and the
//! tokenizer always stops at the end of input.

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Token<'a> {
    Open(Tag<'a>),
    Close(&'a str),
    Text(&'a str),
    /// `<![CDATA[`; what follows is tokenized as markup.
    CData,
    /// `]]>` closing a CDATA payload.
    CDataEnd,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Tag<'a> {
    pub name: &'a str,
    /// Attribute values are raw (not entity-decoded); valueless attributes map to `""`.
    pub attrs: Vec<(&'a str, &'a str)>,
    pub self_closing: bool,
}

impl<'a> Tag<'a> {
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|&(_, value)| value)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// First attribute value containing `needle`, whatever the attribute is called.
    pub fn attr_containing(&self, needle: &str) -> Option<&'a str> {
        self.attrs
            .iter()
            .map(|&(_, value)| value)
            .find(|value| value.contains(needle))
    }
}

impl Token<'_> {
    pub fn is_open(&self, name: &str) -> bool {
        matches!(self, Token::Open(tag) if tag.is(name))
    }

    pub fn is_close(&self, name: &str) -> bool {
        matches!(self, Token::Close(n) if n.eq_ignore_ascii_case(name))
    }
}

pub struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
    in_cdata: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            in_cdata: false,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_past(&mut self, terminator: &str) {
        self.pos = match self.rest().find(terminator) {
            Some(i) => self.pos + i + terminator.len(),
            None => self.src.len(),
        };
    }

    fn text(&mut self, from: usize) -> Token<'a> {
        let bytes = self.src.as_bytes();
        let mut end = from;
        while end < bytes.len() {
            if bytes[end] == b'<' || (self.in_cdata && bytes[end..].starts_with(b"]]>")) {
                break;
            }
            end += 1;
        }
        let token = Token::Text(&self.src[self.pos..end]);
        self.pos = end;
        token
    }

    fn name_end(&self, from: usize) -> usize {
        let bytes = self.src.as_bytes();
        let mut i = from;
        while i < bytes.len() && is_name_byte(bytes[i]) {
            i += 1;
        }
        i
    }

    fn close_tag(&mut self) -> Option<Token<'a>> {
        let start = self.pos + 2;
        let end = self.name_end(start);
        if end == start {
            return None;
        }
        let name = &self.src[start..end];
        self.pos = end;
        self.skip_past(">");
        Some(Token::Close(name))
    }

    fn open_tag(&mut self) -> Option<Token<'a>> {
        #[derive(Clone, Copy)]
        enum State<'a> {
            BeforeAttr,
            AttrName(usize),
            AfterAttrName(&'a str),
            BeforeValue(&'a str),
            Quoted(&'a str, u8, usize),
            Unquoted(&'a str, usize),
        }

        let src = self.src;
        let bytes = src.as_bytes();
        let start = self.pos + 1;
        let mut i = self.name_end(start);
        if i == start {
            return None;
        }
        let name = &src[start..i];
        let mut attrs = vec![];
        let mut self_closing = false;
        let mut state = State::BeforeAttr;
        while i < bytes.len() {
            let b = bytes[i];
            let mut advance = true;
            match state {
                State::BeforeAttr => match b {
                    b'>' => {
                        self.pos = i + 1;
                        return Some(Token::Open(Tag {
                            name,
                            attrs,
                            self_closing,
                        }));
                    }
                    b'/' => self_closing = true,
                    b if b.is_ascii_whitespace() => {}
                    _ => {
                        self_closing = false;
                        state = State::AttrName(i);
                    }
                },
                State::AttrName(from) => match b {
                    b'=' => state = State::BeforeValue(&src[from..i]),
                    b if b.is_ascii_whitespace() => state = State::AfterAttrName(&src[from..i]),
                    b'>' | b'/' => {
                        attrs.push((&src[from..i], ""));
                        state = State::BeforeAttr;
                        advance = false;
                    }
                    _ => {}
                },
                State::AfterAttrName(key) => match b {
                    b'=' => state = State::BeforeValue(key),
                    b if b.is_ascii_whitespace() => {}
                    _ => {
                        attrs.push((key, ""));
                        state = State::BeforeAttr;
                        advance = false;
                    }
                },
                State::BeforeValue(key) => match b {
                    b'"' | b'\'' => state = State::Quoted(key, b, i + 1),
                    b'>' => {
                        attrs.push((key, ""));
                        state = State::BeforeAttr;
                        advance = false;
                    }
                    b if b.is_ascii_whitespace() => {}
                    _ => state = State::Unquoted(key, i),
                },
                State::Quoted(key, quote, from) => {
                    if b == quote {
                        attrs.push((key, &src[from..i]));
                        state = State::BeforeAttr;
                    }
                }
                State::Unquoted(key, from) => {
                    if b == b'>' || b.is_ascii_whitespace() {
                        attrs.push((key, &src[from..i]));
                        state = State::BeforeAttr;
                        advance = false;
                    }
                }
            }
            if advance {
                i += 1;
            }
        }
        // Unterminated tag: the remainder cannot be interpreted.
        None
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':')
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return None;
            }
            if self.in_cdata && rest.starts_with("]]>") {
                self.pos += 3;
                self.in_cdata = false;
                return Some(Token::CDataEnd);
            }
            if rest.starts_with("<![CDATA[") {
                self.pos += "<![CDATA[".len();
                self.in_cdata = true;
                return Some(Token::CData);
            }
            if rest.starts_with("<!--") {
                self.skip_past("-->");
                continue;
            }
            if rest.starts_with("<?") || rest.starts_with("<!") {
                self.skip_past(">");
                continue;
            }
            if rest.starts_with("</") {
                if let Some(token) = self.close_tag() {
                    return Some(token);
                }
            } else if rest.starts_with('<') {
                if let Some(token) = self.open_tag() {
                    return Some(token);
                }
                if self.name_end(self.pos + 1) > self.pos + 1 {
                    // Tag opened but never closed before the end of input.
                    let token = Token::Text(rest);
                    self.pos = self.src.len();
                    return Some(token);
                }
            }
            // Plain text, or a `<` that does not start a tag.
            let from = if rest.starts_with('<') {
                self.pos + 1
            } else {
                self.pos
            };
            return Some(self.text(from));
        }
    }
}

/// Decodes the entities that show up in cell text and trims it.
/// `&nbsp;` placeholders therefore come out as an empty string.
pub fn clean_text(raw: &str) -> String {
    raw.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .trim()
        .to_owned()
}
