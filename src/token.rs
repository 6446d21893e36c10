use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Text,          // bare identifier, usually part of a command name
    Number,        // 42, -7
    String,        // 'text' or "text"
    GameObject,    // {Energy Cells}
    ScriptObject,  // [THIS]
    Keyword,       // if, while, end, ->, =, :, ...
    Variable,      // $name
    Null,          // null
    Label,         // name:
    BinaryOp,      // + - * / == AND ( ) ...
    UnaryOp,       // ! ~ and unary -
    Comment,       // * rest of line
    Whitespace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub(crate) kind: Kind,
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) text: String,
}

impl Token {
    pub fn new(kind: Kind, start: usize, text: String) -> Self {
        let end = start + text.chars().count();
        Self {
            kind,
            start,
            end,
            text,
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Raw source text, delimiters included.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Source text with type-specific delimiters stripped.
    pub fn value_text(&self) -> &str {
        let text = self.text.as_str();
        match self.kind {
            Kind::String => strip_delimiters(text, 1, 1),
            Kind::GameObject | Kind::ScriptObject => strip_delimiters(text, 1, 1),
            Kind::Variable => strip_delimiters(text, 1, 0),
            Kind::Label => strip_delimiters(text, 0, 1),
            Kind::Comment => strip_delimiters(text, 1, 0).trim(),
            _ => text,
        }
    }

    /// Case-insensitive comparison against the raw text.
    pub fn matches(&self, text: &str) -> bool {
        self.text.eq_ignore_ascii_case(text)
    }

    /// Whether the syntax trie may consume this token through its parameter branch.
    pub fn is_parameter(&self) -> bool {
        matches!(
            self.kind,
            Kind::Number
                | Kind::String
                | Kind::GameObject
                | Kind::ScriptObject
                | Kind::Variable
                | Kind::Null
                | Kind::Label
                | Kind::Text
        )
    }

    /// Whether this token can stand as an operand inside an expression.
    pub fn is_operand(&self) -> bool {
        matches!(
            self.kind,
            Kind::Number
                | Kind::String
                | Kind::GameObject
                | Kind::ScriptObject
                | Kind::Variable
                | Kind::Null
        )
    }

    pub fn is_whitespace(&self) -> bool {
        self.kind == Kind::Whitespace
    }
}

fn strip_delimiters(text: &str, front: usize, back: usize) -> &str {
    let mut start = 0;
    for (count, (index, ch)) in text.char_indices().enumerate() {
        if count == front {
            start = index;
            break;
        }
        start = index + ch.len_utf8();
    }
    let mut end = text.len();
    for _ in 0..back {
        match text[start..end].char_indices().last() {
            Some((index, _)) => end = start + index,
            None => break,
        }
    }
    &text[start..end.max(start)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_text_strips_delimiters() {
        assert_eq!(Token::new(Kind::String, 0, "'hello'".into()).value_text(), "hello");
        assert_eq!(Token::new(Kind::GameObject, 0, "{Energy Cells}".into()).value_text(), "Energy Cells");
        assert_eq!(Token::new(Kind::ScriptObject, 0, "[THIS]".into()).value_text(), "THIS");
        assert_eq!(Token::new(Kind::Variable, 0, "$fuel".into()).value_text(), "fuel");
        assert_eq!(Token::new(Kind::Label, 0, "start:".into()).value_text(), "start");
        assert_eq!(Token::new(Kind::Comment, 0, "* note here ".into()).value_text(), "note here");
        assert_eq!(Token::new(Kind::Number, 0, "-12".into()).value_text(), "-12");
    }

    #[test]
    fn range_counts_characters() {
        let token = Token::new(Kind::String, 4, "'über'".into());
        assert_eq!(token.range(), 4..10);
    }
}
