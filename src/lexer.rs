use crate::error::LexingError;
use crate::token::{Kind, Token};

// Longest first, so that `->` wins over `-` and `<=` over `<`.
const SYMBOLS: [(&str, Kind); 25] = [
    ("->", Kind::Keyword),
    ("==", Kind::BinaryOp),
    ("!=", Kind::BinaryOp),
    ("<=", Kind::BinaryOp),
    (">=", Kind::BinaryOp),
    ("&&", Kind::BinaryOp),
    ("||", Kind::BinaryOp),
    ("<", Kind::BinaryOp),
    (">", Kind::BinaryOp),
    ("+", Kind::BinaryOp),
    ("-", Kind::BinaryOp),
    ("*", Kind::BinaryOp),
    ("/", Kind::BinaryOp),
    ("%", Kind::BinaryOp),
    ("(", Kind::BinaryOp),
    (")", Kind::BinaryOp),
    ("^", Kind::BinaryOp),
    ("|", Kind::BinaryOp),
    ("&", Kind::BinaryOp),
    ("!", Kind::UnaryOp),
    ("~", Kind::UnaryOp),
    ("=", Kind::Keyword),
    (":", Kind::Keyword),
    (",", Kind::Keyword),
    ("]", Kind::Keyword),
];

const WORD_OPERATORS: [&str; 3] = ["and", "or", "mod"];

const KEYWORDS: [&str; 21] = [
    "if", "not", "else", "skip", "do", "while", "start", "end", "break", "continue", "return",
    "goto", "gosub", "endsub", "label", "for", "each", "in", "to", "step", "dim",
];

/// Lexes a single script line.
pub struct Lexer<'a> {
    line: &'a str,
    chars: Vec<char>,
    current: usize,
    skip_whitespace: bool,
    tokens: Vec<Token>,
    // Last non-whitespace token, kept even when whitespace is dropped from the output.
    previous: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(line: &'a str, skip_whitespace: bool) -> Self {
        Self {
            line,
            chars: line.chars().collect(),
            current: 0,
            skip_whitespace,
            tokens: Vec::new(),
            previous: None,
        }
    }

    fn at(&self) -> char {
        self.peek(0)
    }

    fn peek(&self, offset: usize) -> char {
        self.chars.get(self.current + offset).copied().unwrap_or('\0')
    }

    fn is_eof(&self) -> bool {
        self.current >= self.chars.len()
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    fn error(&self, message: String, start: usize) -> LexingError {
        let end = (start + 1).min(self.chars.len()).max(start);
        LexingError::new(message, start, self.slice(start, end))
    }

    fn push(&mut self, kind: Kind, start: usize) {
        let token = Token::new(kind, start, self.slice(start, self.current));
        if kind != Kind::Whitespace {
            self.previous = Some(token.clone());
        } else if self.skip_whitespace {
            return;
        }
        self.tokens.push(token);
    }

    /// True when a `-` here would negate rather than subtract.
    fn in_unary_position(&self) -> bool {
        match &self.previous {
            None => true,
            Some(token) => match token.kind {
                Kind::Number
                | Kind::String
                | Kind::GameObject
                | Kind::ScriptObject
                | Kind::Variable
                | Kind::Null
                | Kind::Text
                | Kind::Label => false,
                Kind::BinaryOp => token.text != ")",
                Kind::Keyword => token.text != "]",
                _ => true,
            },
        }
    }

    pub fn tokenize(mut self) -> Result<TokenArray, LexingError> {
        while !self.is_eof() {
            let start = self.current;
            let ch = self.at();

            if ch.is_whitespace() {
                while !self.is_eof() && self.at().is_whitespace() {
                    self.current += 1;
                }
                self.push(Kind::Whitespace, start);
            } else if ch.is_ascii_digit()
                || (ch == '-' && self.peek(1).is_ascii_digit() && self.in_unary_position())
            {
                self.current += 1;
                while self.at().is_ascii_digit() {
                    self.current += 1;
                }
                self.push(Kind::Number, start);
            } else if ch == '\'' || ch == '"' {
                self.scan_delimited(ch, Kind::String, "Unterminated string")?;
            } else if ch == '{' {
                self.scan_delimited('}', Kind::GameObject, "Unterminated game object")?;
            } else if ch == '[' {
                let indexing = matches!(&self.previous, Some(t) if t.kind == Kind::Variable && t.end == start);
                if indexing {
                    self.current += 1;
                    self.push(Kind::Keyword, start);
                } else {
                    self.scan_delimited(']', Kind::ScriptObject, "Unterminated script object")?;
                }
            } else if ch == '$' {
                self.current += 1;
                while is_variable_char(self.at()) {
                    self.current += 1;
                }
                if self.current == start + 1 {
                    return Err(self.error("Expected a variable name after '$'".to_string(), start));
                }
                self.push(Kind::Variable, start);
            } else if ch == '*' && self.previous.is_none() {
                self.current = self.chars.len();
                self.push(Kind::Comment, start);
            } else if is_word_start(ch) {
                self.scan_word(start);
            } else if let Some((symbol, kind)) = self.match_symbol() {
                self.current += symbol.chars().count();
                let kind = if symbol == "-" && self.in_unary_position() {
                    Kind::UnaryOp
                } else {
                    kind
                };
                self.push(kind, start);
            } else {
                return Err(self.error(format!("Unrecognized character {}", ch), start));
            }
        }

        Ok(TokenArray::new(self.tokens))
    }

    fn scan_delimited(&mut self, close: char, kind: Kind, message: &str) -> Result<(), LexingError> {
        let start = self.current;
        self.current += 1;
        while !self.is_eof() && self.at() != close {
            self.current += 1;
        }
        if self.is_eof() {
            return Err(self.error(message.to_string(), start));
        }
        self.current += 1;
        self.push(kind, start);
        Ok(())
    }

    fn scan_word(&mut self, start: usize) {
        while is_word_char(self.at()) {
            self.current += 1;
        }
        let word = self.slice(start, self.current).to_lowercase();

        let label_allowed = match &self.previous {
            None => true,
            Some(token) => token.kind == Kind::Keyword && token.matches("gosub"),
        };
        if self.at() == ':' && label_allowed {
            self.current += 1;
            self.push(Kind::Label, start);
            return;
        }

        let kind = if WORD_OPERATORS.contains(&word.as_str()) {
            Kind::BinaryOp
        } else if word == "null" {
            Kind::Null
        } else if KEYWORDS.contains(&word.as_str()) {
            Kind::Keyword
        } else {
            Kind::Text
        };
        self.push(kind, start);
    }

    fn match_symbol(&self) -> Option<(&'static str, Kind)> {
        SYMBOLS.iter().copied().find(|(symbol, _)| {
            symbol
                .chars()
                .enumerate()
                .all(|(offset, c)| self.peek(offset) == c)
        })
    }
}

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_variable_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

/// Convenience wrapper around [`Lexer::tokenize`].
pub fn tokenize(line: &str, skip_whitespace: bool) -> Result<TokenArray, LexingError> {
    Lexer::new(line, skip_whitespace).tokenize()
}

/// The ordered output of the lexer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenArray {
    tokens: Vec<Token>,
    significant: usize,
}

impl TokenArray {
    pub fn new(tokens: Vec<Token>) -> Self {
        let significant = tokens.iter().filter(|t| !t.is_whitespace()).count();
        Self {
            tokens,
            significant,
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of tokens that are not whitespace.
    pub fn significant_count(&self) -> usize {
        self.significant
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    /// Finds the token covering a caret offset. A caret sitting on a token's end
    /// boundary belongs to that token.
    pub fn find_at(&self, offset: usize) -> Option<&Token> {
        self.tokens
            .iter()
            .find(|t| t.start <= offset && offset < t.end)
            .or_else(|| self.tokens.iter().rev().find(|t| t.end == offset))
    }

    pub fn cursor(&self) -> TokenCursor<'_> {
        TokenCursor::new(&self.tokens)
    }
}

/// Reads tokens left to right; `match_*` helpers only advance on success.
#[derive(Debug, Clone)]
pub struct TokenCursor<'t> {
    tokens: &'t [Token],
    position: usize,
}

impl<'t> TokenCursor<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        let mut cursor = Self {
            tokens,
            position: 0,
        };
        cursor.skip_whitespace();
        cursor
    }

    fn skip_whitespace(&mut self) {
        while self.position < self.tokens.len() && self.tokens[self.position].is_whitespace() {
            self.position += 1;
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_empty(&self) -> bool {
        self.position >= self.tokens.len()
    }

    pub fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.position)
    }

    /// Looks past the current token, ignoring whitespace.
    pub fn peek_nth(&self, n: usize) -> Option<&'t Token> {
        self.tokens[self.position.min(self.tokens.len())..]
            .iter()
            .filter(|t| !t.is_whitespace())
            .nth(n)
    }

    pub fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        self.skip_whitespace();
        Some(token)
    }

    pub fn match_text(&mut self, text: &str) -> bool {
        match self.peek() {
            Some(token) if token.matches(text) => {
                self.advance();
                true
            }
            _ => false,
        }
    }

    pub fn match_kind(&mut self, kind: Kind) -> Option<&'t Token> {
        match self.peek() {
            Some(token) if token.kind == kind => self.advance(),
            _ => None,
        }
    }

    /// Matches every word in order or nothing at all.
    pub fn match_sequence(&mut self, words: &[&str]) -> bool {
        let matched = words
            .iter()
            .enumerate()
            .all(|(n, word)| self.peek_nth(n).map_or(false, |t| t.matches(word)));
        if matched {
            for _ in words {
                self.advance();
            }
        }
        matched
    }

    /// Remaining significant tokens.
    pub fn remaining(&self) -> Vec<Token> {
        self.tokens[self.position.min(self.tokens.len())..]
            .iter()
            .filter(|t| !t.is_whitespace())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(line: &str) -> Vec<Kind> {
        tokenize(line, true).unwrap().iter().map(|t| t.kind()).collect()
    }

    #[test]
    fn tokenizes_command_with_reference_object() {
        let tokens = tokenize("$fuel = $ship-> get fuel", true).unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text()).collect();
        assert_eq!(texts, vec!["$fuel", "=", "$ship", "->", "get", "fuel"]);
        assert_eq!(
            kinds("$fuel = $ship-> get fuel"),
            vec![Kind::Variable, Kind::Keyword, Kind::Variable, Kind::Keyword, Kind::Text, Kind::Text]
        );
    }

    #[test]
    fn whitespace_round_trips() {
        for line in [
            "  if $fuel < 10",
            "$x = ( -5 + $y ) * 2 mod 3",
            "* a comment, with 'quotes",
            "start:",
            "$r = [THIS]-> call script 'a.b' : count=3 name={Energy Cells}",
        ] {
            let tokens = tokenize(line, false).unwrap();
            let rebuilt: String = tokens.iter().map(|t| t.text()).collect();
            assert_eq!(rebuilt, line);
            let mut last = 0;
            for token in tokens.iter() {
                assert!(token.start >= last);
                last = token.end;
            }
        }
    }

    #[test]
    fn minus_is_unary_after_operator_and_binary_after_operand() {
        assert_eq!(
            kinds("$a - -$b"),
            vec![Kind::Variable, Kind::BinaryOp, Kind::UnaryOp, Kind::Variable]
        );
        assert_eq!(kinds("$a = -5"), vec![Kind::Variable, Kind::Keyword, Kind::Number]);
        assert_eq!(kinds("$a -5"), vec![Kind::Variable, Kind::BinaryOp, Kind::Number]);
    }

    #[test]
    fn labels_only_at_line_start_or_after_gosub() {
        assert_eq!(kinds("main:"), vec![Kind::Label]);
        assert_eq!(kinds("gosub main:"), vec![Kind::Keyword, Kind::Label]);
        assert_eq!(
            kinds("$a = array alloc: size=3"),
            vec![
                Kind::Variable,
                Kind::Keyword,
                Kind::Text,
                Kind::Text,
                Kind::Keyword,
                Kind::Text,
                Kind::Keyword,
                Kind::Number
            ]
        );
    }

    #[test]
    fn array_indexing_is_not_a_script_object() {
        assert_eq!(
            kinds("$a[$i] = [TRUE]"),
            vec![
                Kind::Variable,
                Kind::Keyword,
                Kind::Variable,
                Kind::Keyword,
                Kind::Keyword,
                Kind::ScriptObject
            ]
        );
    }

    #[test]
    fn word_operators_and_null() {
        assert_eq!(
            kinds("$a AND $b or null"),
            vec![Kind::Variable, Kind::BinaryOp, Kind::Variable, Kind::BinaryOp, Kind::Null]
        );
    }

    #[test]
    fn unterminated_string_is_fatal() {
        let error = tokenize("$a = 'oops", true).unwrap_err();
        assert_eq!(error.position, 5);
        assert!(tokenize("$a = #", true).is_err());
        assert!(tokenize("$ = 1", true).is_err());
    }

    #[test]
    fn finds_token_under_caret() {
        let tokens = tokenize("$ship-> get fuel", false).unwrap();
        assert_eq!(tokens.find_at(2).unwrap().text(), "$ship");
        assert_eq!(tokens.find_at(9).unwrap().text(), "get");
        assert_eq!(tokens.find_at(16).unwrap().text(), "fuel");
        assert_eq!(tokens.significant_count(), 4);
    }

    #[test]
    fn cursor_matches_only_whole_sequences() {
        let tokens = tokenize("skip if not $x", true).unwrap();
        let mut cursor = tokens.cursor();
        assert!(!cursor.match_sequence(&["skip", "while"]));
        assert_eq!(cursor.position(), 0);
        assert!(cursor.match_sequence(&["SKIP", "if", "not"]));
        assert_eq!(cursor.match_kind(Kind::Variable).unwrap().text(), "$x");
        assert!(cursor.is_empty());
    }
}
