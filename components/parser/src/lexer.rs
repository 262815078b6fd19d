//! JavaScript Lexer - tokenizes source code into tokens

use core_types::{ErrorKind, JsError, SourcePosition};

/// JavaScript keyword types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// let keyword
    Let,
    /// const keyword
    Const,
    /// var keyword
    Var,
    /// function keyword
    Function,
    /// return keyword
    Return,
    /// if keyword
    If,
    /// else keyword
    Else,
    /// while keyword
    While,
    /// do keyword
    Do,
    /// for keyword
    For,
    /// break keyword
    Break,
    /// continue keyword
    Continue,
    /// new keyword
    New,
    /// this keyword
    This,
    /// true keyword
    True,
    /// false keyword
    False,
    /// null keyword
    Null,
    // Note: 'undefined' is NOT a keyword - it's a global property
    /// typeof keyword
    Typeof,
    /// void keyword
    Void,
    /// delete keyword
    Delete,
    /// instanceof keyword
    Instanceof,
    /// in keyword
    In,
    /// try keyword
    Try,
    /// catch keyword
    Catch,
    /// finally keyword
    Finally,
    /// throw keyword
    Throw,
    /// switch keyword
    Switch,
    /// case keyword
    Case,
    /// default keyword
    Default,
    /// class keyword (reserved, rejected by the parser)
    Class,
    /// extends keyword (reserved, rejected by the parser)
    Extends,
    /// super keyword (reserved, rejected by the parser)
    Super,
    /// import keyword (reserved, rejected by the parser)
    Import,
    /// export keyword (reserved, rejected by the parser)
    Export,
    /// yield keyword (reserved, rejected by the parser)
    Yield,
    /// with keyword (reserved, rejected by the parser)
    With,
    /// debugger keyword (reserved, rejected by the parser)
    Debugger,
}

impl Keyword {
    /// Look up a keyword by its source spelling.
    pub fn from_word(word: &str) -> Option<Keyword> {
        let keyword = match word {
            "let" => Keyword::Let,
            "const" => Keyword::Const,
            "var" => Keyword::Var,
            "function" => Keyword::Function,
            "return" => Keyword::Return,
            "if" => Keyword::If,
            "else" => Keyword::Else,
            "while" => Keyword::While,
            "do" => Keyword::Do,
            "for" => Keyword::For,
            "break" => Keyword::Break,
            "continue" => Keyword::Continue,
            "new" => Keyword::New,
            "this" => Keyword::This,
            "true" => Keyword::True,
            "false" => Keyword::False,
            "null" => Keyword::Null,
            "typeof" => Keyword::Typeof,
            "void" => Keyword::Void,
            "delete" => Keyword::Delete,
            "instanceof" => Keyword::Instanceof,
            "in" => Keyword::In,
            "try" => Keyword::Try,
            "catch" => Keyword::Catch,
            "finally" => Keyword::Finally,
            "throw" => Keyword::Throw,
            "switch" => Keyword::Switch,
            "case" => Keyword::Case,
            "default" => Keyword::Default,
            "class" => Keyword::Class,
            "extends" => Keyword::Extends,
            "super" => Keyword::Super,
            "import" => Keyword::Import,
            "export" => Keyword::Export,
            "yield" => Keyword::Yield,
            "with" => Keyword::With,
            "debugger" => Keyword::Debugger,
            _ => return None,
        };
        Some(keyword)
    }

    /// The source spelling of the keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Let => "let",
            Keyword::Const => "const",
            Keyword::Var => "var",
            Keyword::Function => "function",
            Keyword::Return => "return",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::While => "while",
            Keyword::Do => "do",
            Keyword::For => "for",
            Keyword::Break => "break",
            Keyword::Continue => "continue",
            Keyword::New => "new",
            Keyword::This => "this",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Null => "null",
            Keyword::Typeof => "typeof",
            Keyword::Void => "void",
            Keyword::Delete => "delete",
            Keyword::Instanceof => "instanceof",
            Keyword::In => "in",
            Keyword::Try => "try",
            Keyword::Catch => "catch",
            Keyword::Finally => "finally",
            Keyword::Throw => "throw",
            Keyword::Switch => "switch",
            Keyword::Case => "case",
            Keyword::Default => "default",
            Keyword::Class => "class",
            Keyword::Extends => "extends",
            Keyword::Super => "super",
            Keyword::Import => "import",
            Keyword::Export => "export",
            Keyword::Yield => "yield",
            Keyword::With => "with",
            Keyword::Debugger => "debugger",
        }
    }
}

/// JavaScript punctuators (operators and delimiters)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punctuator {
    /// Opening parenthesis
    LParen,
    /// Closing parenthesis
    RParen,
    /// Opening brace
    LBrace,
    /// Closing brace
    RBrace,
    /// Opening bracket
    LBracket,
    /// Closing bracket
    RBracket,
    /// Semicolon
    Semicolon,
    /// Comma
    Comma,
    /// Dot
    Dot,
    /// Spread operator
    Spread,
    /// Optional chaining
    OptionalChain,
    /// Colon
    Colon,
    /// Question mark
    Question,
    /// Assignment
    Assign,
    /// Arrow function
    Arrow,
    /// Plus
    Plus,
    /// Minus
    Minus,
    /// Multiply
    Star,
    /// Divide
    Slash,
    /// Modulo
    Percent,
    /// Exponentiation
    StarStar,
    /// Equality
    EqEq,
    /// Strict equality
    EqEqEq,
    /// Inequality
    NotEq,
    /// Strict inequality
    NotEqEq,
    /// Less than
    Lt,
    /// Less than or equal
    LtEq,
    /// Greater than
    Gt,
    /// Greater than or equal
    GtEq,
    /// Logical AND
    AndAnd,
    /// Logical OR
    OrOr,
    /// Nullish coalescing
    NullishCoalesce,
    /// Logical NOT
    Not,
    /// Bitwise AND
    And,
    /// Bitwise OR
    Or,
    /// Bitwise XOR
    Xor,
    /// Bitwise NOT
    Tilde,
    /// Left shift
    LtLt,
    /// Right shift
    GtGt,
    /// Unsigned right shift
    GtGtGt,
    /// Plus equals
    PlusEq,
    /// Minus equals
    MinusEq,
    /// Multiply equals
    StarEq,
    /// Divide equals
    SlashEq,
    /// Modulo equals
    PercentEq,
    /// Exponentiation equals
    StarStarEq,
    /// Bitwise AND equals
    AndEq,
    /// Bitwise OR equals
    OrEq,
    /// Bitwise XOR equals
    XorEq,
    /// Left shift equals
    LtLtEq,
    /// Right shift equals
    GtGtEq,
    /// Unsigned right shift equals
    GtGtGtEq,
    /// Logical AND equals
    AndAndEq,
    /// Logical OR equals
    OrOrEq,
    /// Nullish coalescing equals
    NullishCoalesceEq,
    /// Increment
    PlusPlus,
    /// Decrement
    MinusMinus,
}

/// Token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier (variable name, etc.)
    Identifier(String),
    /// Number literal
    Number(f64),
    /// String literal
    String(String),
    /// Template literal with no substitutions (no `${}`)
    TemplateLiteral(String),
    /// Template head: from ` to first ${
    TemplateHead(String),
    /// Template middle: from } to next ${
    TemplateMiddle(String),
    /// Template tail: from } to closing `
    TemplateTail(String),
    /// Regular expression literal (pattern, flags)
    RegExp(String, String),
    /// Keyword
    Keyword(Keyword),
    /// Punctuator/operator
    Punctuator(Punctuator),
    /// End of file
    EOF,
}

impl Token {
    /// Short description used in "Unexpected token" messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Identifier(name) => format!("identifier '{}'", name),
            Token::Number(n) => format!("number {}", n),
            Token::String(_) => "string".to_string(),
            Token::TemplateLiteral(_)
            | Token::TemplateHead(_)
            | Token::TemplateMiddle(_)
            | Token::TemplateTail(_) => "template literal".to_string(),
            Token::RegExp(..) => "regular expression".to_string(),
            Token::Keyword(k) => format!("'{}'", k.as_str()),
            Token::Punctuator(p) => format!("'{}'", punctuator_str(*p)),
            Token::EOF => "end of input".to_string(),
        }
    }
}

/// Lexer for JavaScript source code
pub struct Lexer<'a> {
    source: &'a str,
    chars: Vec<char>,
    /// Current character index
    pub position: usize,
    /// Current line (1-based)
    pub line: u32,
    /// Current column (1-based)
    pub column: u32,
    /// Token scanned by `peek_token` and not yet consumed
    pub current_token: Option<Token>,
    /// Start of the most recently scanned token
    pub token_position: SourcePosition,
    /// Tracks if a line terminator was encountered before the current token
    /// Used for Automatic Semicolon Insertion (ASI)
    pub line_terminator_before_token: bool,
}

/// Saved lexer state for speculative scanning
#[derive(Clone)]
pub struct LexerState {
    position: usize,
    line: u32,
    column: u32,
    current_token: Option<Token>,
    token_position: SourcePosition,
    line_terminator_before_token: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code
    pub fn new(source: &'a str) -> Self {
        let chars: Vec<char> = source.chars().collect();
        let mut lexer = Self {
            source,
            chars,
            position: 0,
            line: 1,
            column: 1,
            current_token: None,
            token_position: SourcePosition::new(1, 1, 0),
            line_terminator_before_token: false,
        };

        lexer.skip_hashbang();
        lexer
    }

    /// The source text being tokenized
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Skip hashbang comment (#!) at the beginning of the source
    fn skip_hashbang(&mut self) {
        if self.peek() == Some('#') && self.peek_next() == Some('!') {
            while let Some(c) = self.peek() {
                if is_line_terminator(c) {
                    break;
                }
                self.advance();
            }
        }
    }

    /// Snapshot the lexer so the parser can look ahead and rewind.
    pub fn save(&self) -> LexerState {
        LexerState {
            position: self.position,
            line: self.line,
            column: self.column,
            current_token: self.current_token.clone(),
            token_position: self.token_position,
            line_terminator_before_token: self.line_terminator_before_token,
        }
    }

    /// Rewind to a snapshot taken with [`Lexer::save`].
    pub fn restore(&mut self, state: LexerState) {
        self.position = state.position;
        self.line = state.line;
        self.column = state.column;
        self.current_token = state.current_token;
        self.token_position = state.token_position;
        self.line_terminator_before_token = state.line_terminator_before_token;
    }

    /// Get the next token from the source
    pub fn next_token(&mut self) -> Result<Token, JsError> {
        if let Some(token) = self.current_token.take() {
            return Ok(token);
        }
        self.scan_token()
    }

    /// Peek at the next token without consuming it
    pub fn peek_token(&mut self) -> Result<&Token, JsError> {
        let token = match self.current_token.take() {
            Some(token) => token,
            None => self.scan_token()?,
        };
        Ok(self.current_token.insert(token))
    }

    fn scan_token(&mut self) -> Result<Token, JsError> {
        let line_before = self.line;

        self.skip_whitespace_and_comments()?;

        // Crossing a line boundary enables ASI before this token
        self.line_terminator_before_token = self.line > line_before;
        self.token_position = self.current_position();

        let ch = match self.advance() {
            Some(ch) => ch,
            None => return Ok(Token::EOF),
        };

        let punct = |p| Ok(Token::Punctuator(p));

        match ch {
            '(' => punct(Punctuator::LParen),
            ')' => punct(Punctuator::RParen),
            '{' => punct(Punctuator::LBrace),
            '}' => punct(Punctuator::RBrace),
            '[' => punct(Punctuator::LBracket),
            ']' => punct(Punctuator::RBracket),
            ';' => punct(Punctuator::Semicolon),
            ',' => punct(Punctuator::Comma),
            ':' => punct(Punctuator::Colon),
            '~' => punct(Punctuator::Tilde),

            '.' => {
                if self.peek() == Some('.') && self.peek_next() == Some('.') {
                    self.advance();
                    self.advance();
                    punct(Punctuator::Spread)
                } else if self.peek().map_or(false, |c| c.is_ascii_digit()) {
                    self.scan_number('.')
                } else {
                    punct(Punctuator::Dot)
                }
            }

            '?' => {
                if self.match_char('?') {
                    if self.match_char('=') {
                        punct(Punctuator::NullishCoalesceEq)
                    } else {
                        punct(Punctuator::NullishCoalesce)
                    }
                } else if self.peek() == Some('.') && !self.peek_next().map_or(false, |c| c.is_ascii_digit()) {
                    // `?.5` is a conditional followed by a number, not optional chaining
                    self.advance();
                    punct(Punctuator::OptionalChain)
                } else {
                    punct(Punctuator::Question)
                }
            }

            '=' => {
                if self.match_char('>') {
                    punct(Punctuator::Arrow)
                } else if self.match_char('=') {
                    if self.match_char('=') {
                        punct(Punctuator::EqEqEq)
                    } else {
                        punct(Punctuator::EqEq)
                    }
                } else {
                    punct(Punctuator::Assign)
                }
            }

            '+' => {
                if self.match_char('+') {
                    punct(Punctuator::PlusPlus)
                } else if self.match_char('=') {
                    punct(Punctuator::PlusEq)
                } else {
                    punct(Punctuator::Plus)
                }
            }

            '-' => {
                if self.match_char('-') {
                    punct(Punctuator::MinusMinus)
                } else if self.match_char('=') {
                    punct(Punctuator::MinusEq)
                } else {
                    punct(Punctuator::Minus)
                }
            }

            '*' => {
                if self.match_char('*') {
                    if self.match_char('=') {
                        punct(Punctuator::StarStarEq)
                    } else {
                        punct(Punctuator::StarStar)
                    }
                } else if self.match_char('=') {
                    punct(Punctuator::StarEq)
                } else {
                    punct(Punctuator::Star)
                }
            }

            '/' => {
                if self.match_char('=') {
                    punct(Punctuator::SlashEq)
                } else {
                    punct(Punctuator::Slash)
                }
            }

            '%' => {
                if self.match_char('=') {
                    punct(Punctuator::PercentEq)
                } else {
                    punct(Punctuator::Percent)
                }
            }

            '!' => {
                if self.match_char('=') {
                    if self.match_char('=') {
                        punct(Punctuator::NotEqEq)
                    } else {
                        punct(Punctuator::NotEq)
                    }
                } else {
                    punct(Punctuator::Not)
                }
            }

            '<' => {
                if self.match_char('<') {
                    if self.match_char('=') {
                        punct(Punctuator::LtLtEq)
                    } else {
                        punct(Punctuator::LtLt)
                    }
                } else if self.match_char('=') {
                    punct(Punctuator::LtEq)
                } else {
                    punct(Punctuator::Lt)
                }
            }

            '>' => {
                if self.match_char('>') {
                    if self.match_char('>') {
                        if self.match_char('=') {
                            punct(Punctuator::GtGtGtEq)
                        } else {
                            punct(Punctuator::GtGtGt)
                        }
                    } else if self.match_char('=') {
                        punct(Punctuator::GtGtEq)
                    } else {
                        punct(Punctuator::GtGt)
                    }
                } else if self.match_char('=') {
                    punct(Punctuator::GtEq)
                } else {
                    punct(Punctuator::Gt)
                }
            }

            '&' => {
                if self.match_char('&') {
                    if self.match_char('=') {
                        punct(Punctuator::AndAndEq)
                    } else {
                        punct(Punctuator::AndAnd)
                    }
                } else if self.match_char('=') {
                    punct(Punctuator::AndEq)
                } else {
                    punct(Punctuator::And)
                }
            }

            '|' => {
                if self.match_char('|') {
                    if self.match_char('=') {
                        punct(Punctuator::OrOrEq)
                    } else {
                        punct(Punctuator::OrOr)
                    }
                } else if self.match_char('=') {
                    punct(Punctuator::OrEq)
                } else {
                    punct(Punctuator::Or)
                }
            }

            '^' => {
                if self.match_char('=') {
                    punct(Punctuator::XorEq)
                } else {
                    punct(Punctuator::Xor)
                }
            }

            '`' => self.scan_template_part(true),

            '"' | '\'' => self.scan_string(ch),

            _ if ch.is_ascii_digit() => self.scan_number(ch),

            _ if is_id_start(ch) => Ok(self.scan_identifier(ch)),

            _ => Err(self.error(format!("Unexpected character: '{}'", ch))),
        }
    }

    fn scan_string(&mut self, quote: char) -> Result<Token, JsError> {
        let mut value = String::new();

        loop {
            let ch = match self.peek() {
                None => return Err(self.error("Unterminated string literal")),
                Some(c) if c == quote => break,
                Some(c) if c == '\n' || c == '\r' => return Err(self.error("Unterminated string literal")),
                Some(c) => c,
            };
            self.advance();
            if ch == '\\' {
                self.scan_escape(&mut value)?;
            } else {
                value.push(ch);
            }
        }

        self.advance(); // Closing quote
        Ok(Token::String(value))
    }

    /// Scan one escape sequence; the backslash has been consumed.
    fn scan_escape(&mut self, value: &mut String) -> Result<(), JsError> {
        let escaped = match self.advance() {
            Some(c) => c,
            None => return Err(self.error("Unterminated escape sequence")),
        };
        match escaped {
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            'b' => value.push('\u{0008}'),
            'f' => value.push('\u{000C}'),
            'v' => value.push('\u{000B}'),
            '0' if !self.peek().map_or(false, |c| c.is_ascii_digit()) => value.push('\0'),
            'x' => {
                let code = self.scan_hex_digits(2)?;
                value.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
            }
            'u' => {
                let code = if self.match_char('{') {
                    let mut code: u32 = 0;
                    let mut digits = 0;
                    while let Some(c) = self.peek() {
                        if c == '}' {
                            break;
                        }
                        let digit = c
                            .to_digit(16)
                            .ok_or_else(|| self.error("Invalid Unicode escape sequence"))?;
                        code = code.saturating_mul(16).saturating_add(digit);
                        digits += 1;
                        self.advance();
                    }
                    if digits == 0 || !self.match_char('}') || code > 0x10FFFF {
                        return Err(self.error("Invalid Unicode escape sequence"));
                    }
                    code
                } else {
                    self.scan_hex_digits(4)?
                };
                value.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
            }
            '\r' => {
                // Line continuation (CRLF or CR)
                self.match_char('\n');
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            other => value.push(other),
        }
        Ok(())
    }

    fn scan_hex_digits(&mut self, count: usize) -> Result<u32, JsError> {
        let mut code = 0;
        for _ in 0..count {
            let digit = self
                .peek()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("Invalid hexadecimal escape sequence"))?;
            code = code * 16 + digit;
            self.advance();
        }
        Ok(code)
    }

    /// Scan a template chunk up to `${` or the closing backtick.
    fn scan_template_part(&mut self, head: bool) -> Result<Token, JsError> {
        let mut value = String::new();

        loop {
            match self.peek() {
                None => return Err(self.error("Unterminated template literal")),
                Some('`') => {
                    self.advance();
                    return Ok(if head {
                        Token::TemplateLiteral(value)
                    } else {
                        Token::TemplateTail(value)
                    });
                }
                Some('$') if self.peek_next() == Some('{') => {
                    self.advance();
                    self.advance();
                    return Ok(if head {
                        Token::TemplateHead(value)
                    } else {
                        Token::TemplateMiddle(value)
                    });
                }
                Some('\\') => {
                    self.advance();
                    self.scan_escape(&mut value)?;
                }
                Some(c) => {
                    self.advance();
                    value.push(c);
                }
            }
        }
    }

    /// Scan the continuation of a template literal after an expression.
    /// Called by the parser after it has consumed the closing `}` token.
    pub fn scan_template_continuation(&mut self) -> Result<Token, JsError> {
        self.current_token = None;
        self.token_position = self.current_position();
        self.scan_template_part(false)
    }

    /// Re-scan the current `/` or `/=` token as a regular expression literal.
    ///
    /// The parser calls this when it finds a slash in operand position.
    pub fn rescan_as_regexp(&mut self) -> Result<Token, JsError> {
        self.current_token = None;
        self.position = self.token_position.offset;
        self.line = self.token_position.line;
        self.column = self.token_position.column;

        self.advance(); // opening '/'
        let mut pattern = String::new();
        let mut in_class = false;
        loop {
            let ch = match self.advance() {
                None => return Err(self.error("Unterminated regular expression")),
                Some(c) if is_line_terminator(c) => {
                    return Err(self.error("Unterminated regular expression"))
                }
                Some(c) => c,
            };
            match ch {
                '/' if !in_class => break,
                '[' => in_class = true,
                ']' => in_class = false,
                '\\' => {
                    pattern.push(ch);
                    match self.advance() {
                        Some(c) if !is_line_terminator(c) => pattern.push(c),
                        _ => return Err(self.error("Unterminated regular expression")),
                    }
                    continue;
                }
                _ => {}
            }
            pattern.push(ch);
        }

        let mut flags = String::new();
        while let Some(c) = self.peek() {
            if !is_id_continue(c) {
                break;
            }
            flags.push(c);
            self.advance();
        }

        Ok(Token::RegExp(pattern, flags))
    }

    fn scan_number(&mut self, first: char) -> Result<Token, JsError> {
        if first == '0' {
            let radix = match self.peek() {
                Some('x') | Some('X') => Some(16),
                Some('o') | Some('O') => Some(8),
                Some('b') | Some('B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.advance();
                let mut value = 0f64;
                let mut digits = 0;
                while let Some(c) = self.peek() {
                    if c == '_' {
                        self.advance();
                        continue;
                    }
                    match c.to_digit(radix) {
                        Some(d) => {
                            value = value * radix as f64 + d as f64;
                            digits += 1;
                            self.advance();
                        }
                        None => break,
                    }
                }
                if digits == 0 {
                    return Err(self.error("Invalid number literal"));
                }
                return self.finish_number(value);
            }
        }

        let mut text = String::new();
        text.push(first);
        let mut seen_dot = first == '.';
        let mut seen_exp = false;

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
            } else if c == '_' {
                // numeric separator
            } else if c == '.' && !seen_dot && !seen_exp {
                seen_dot = true;
                text.push(c);
            } else if (c == 'e' || c == 'E') && !seen_exp {
                seen_exp = true;
                text.push('e');
                if matches!(self.peek_next(), Some('+') | Some('-')) {
                    self.advance();
                    text.push(self.peek().unwrap_or('+'));
                }
            } else {
                break;
            }
            self.advance();
        }

        let value: f64 = text
            .parse()
            .map_err(|_| self.error(format!("Invalid number literal: {}", text)))?;
        self.finish_number(value)
    }

    fn finish_number(&mut self, value: f64) -> Result<Token, JsError> {
        // `3in x` or `1abc` are errors; an identifier may not follow a number directly
        if self.peek().map_or(false, is_id_start) {
            return Err(self.error("Identifier starts immediately after numeric literal"));
        }
        Ok(Token::Number(value))
    }

    fn scan_identifier(&mut self, first: char) -> Token {
        let mut name = String::new();
        name.push(first);
        while let Some(c) = self.peek() {
            if !is_id_continue(c) {
                break;
            }
            name.push(c);
            self.advance();
        }

        match Keyword::from_word(&name) {
            Some(keyword) => Token::Keyword(keyword),
            None => Token::Identifier(name),
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), JsError> {
        while let Some(c) = self.peek() {
            match c {
                '\n' | '\u{2028}' | '\u{2029}' => {
                    self.advance();
                }
                '\r' => {
                    self.advance();
                }
                c if c.is_whitespace() || c == '\u{FEFF}' => {
                    self.advance();
                }
                '/' if self.peek_next() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if is_line_terminator(c) {
                            break;
                        }
                        self.advance();
                    }
                }
                '/' if self.peek_next() == Some('*') => {
                    let start = self.current_position();
                    self.advance();
                    self.advance();
                    loop {
                        match self.advance() {
                            None => {
                                return Err(JsError::new(ErrorKind::SyntaxError, "Unterminated comment")
                                    .with_position(start))
                            }
                            Some('*') if self.peek() == Some('/') => {
                                self.advance();
                                break;
                            }
                            Some(_) => {}
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn advance(&mut self) -> Option<char> {
        let ch = *self.chars.get(self.position)?;
        self.position += 1;
        if ch == '\n' || ch == '\u{2028}' || ch == '\u{2029}' || (ch == '\r' && self.peek() != Some('\n')) {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn current_position(&self) -> SourcePosition {
        SourcePosition::new(self.line, self.column, self.position)
    }

    fn error(&self, message: impl Into<String>) -> JsError {
        JsError::new(ErrorKind::SyntaxError, message).with_position(self.current_position())
    }
}

/// ECMAScript line terminator
fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_id_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_id_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '\u{200C}' || c == '\u{200D}'
}

/// Source spelling of a punctuator, for error messages.
pub fn punctuator_str(p: Punctuator) -> &'static str {
    match p {
        Punctuator::LParen => "(",
        Punctuator::RParen => ")",
        Punctuator::LBrace => "{",
        Punctuator::RBrace => "}",
        Punctuator::LBracket => "[",
        Punctuator::RBracket => "]",
        Punctuator::Semicolon => ";",
        Punctuator::Comma => ",",
        Punctuator::Dot => ".",
        Punctuator::Spread => "...",
        Punctuator::OptionalChain => "?.",
        Punctuator::Colon => ":",
        Punctuator::Question => "?",
        Punctuator::Assign => "=",
        Punctuator::Arrow => "=>",
        Punctuator::Plus => "+",
        Punctuator::Minus => "-",
        Punctuator::Star => "*",
        Punctuator::Slash => "/",
        Punctuator::Percent => "%",
        Punctuator::StarStar => "**",
        Punctuator::EqEq => "==",
        Punctuator::EqEqEq => "===",
        Punctuator::NotEq => "!=",
        Punctuator::NotEqEq => "!==",
        Punctuator::Lt => "<",
        Punctuator::LtEq => "<=",
        Punctuator::Gt => ">",
        Punctuator::GtEq => ">=",
        Punctuator::AndAnd => "&&",
        Punctuator::OrOr => "||",
        Punctuator::NullishCoalesce => "??",
        Punctuator::Not => "!",
        Punctuator::And => "&",
        Punctuator::Or => "|",
        Punctuator::Xor => "^",
        Punctuator::Tilde => "~",
        Punctuator::LtLt => "<<",
        Punctuator::GtGt => ">>",
        Punctuator::GtGtGt => ">>>",
        Punctuator::PlusEq => "+=",
        Punctuator::MinusEq => "-=",
        Punctuator::StarEq => "*=",
        Punctuator::SlashEq => "/=",
        Punctuator::PercentEq => "%=",
        Punctuator::StarStarEq => "**=",
        Punctuator::AndEq => "&=",
        Punctuator::OrEq => "|=",
        Punctuator::XorEq => "^=",
        Punctuator::LtLtEq => "<<=",
        Punctuator::GtGtEq => ">>=",
        Punctuator::GtGtGtEq => ">>>=",
        Punctuator::AndAndEq => "&&=",
        Punctuator::OrOrEq => "||=",
        Punctuator::NullishCoalesceEq => "??=",
        Punctuator::PlusPlus => "++",
        Punctuator::MinusMinus => "--",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            if token == Token::EOF {
                break;
            }
            out.push(token);
        }
        out
    }

    #[test]
    fn test_require_call() {
        assert_eq!(
            tokens("require('index.js')"),
            vec![
                Token::Identifier("require".to_string()),
                Token::Punctuator(Punctuator::LParen),
                Token::String("index.js".to_string()),
                Token::Punctuator(Punctuator::RParen),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("42 3.5 .5 1e3 0xff 0b101 1_000"),
            vec![
                Token::Number(42.0),
                Token::Number(3.5),
                Token::Number(0.5),
                Token::Number(1000.0),
                Token::Number(255.0),
                Token::Number(5.0),
                Token::Number(1000.0),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            tokens(r#""a\nbA\x42\u{1F600}""#),
            vec![Token::String("a\nbAB\u{1F600}".to_string())]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = Lexer::new("'abc");
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError);
    }

    #[test]
    fn test_comments_and_line_terminators() {
        let mut lexer = Lexer::new("a // comment\n/* block */ b");
        assert_eq!(lexer.next_token().unwrap(), Token::Identifier("a".to_string()));
        assert_eq!(lexer.next_token().unwrap(), Token::Identifier("b".to_string()));
        assert!(lexer.line_terminator_before_token);
        assert_eq!(lexer.token_position.line, 2);
    }

    #[test]
    fn test_optional_chain_vs_conditional_decimal() {
        assert_eq!(
            tokens("a?.b"),
            vec![
                Token::Identifier("a".to_string()),
                Token::Punctuator(Punctuator::OptionalChain),
                Token::Identifier("b".to_string()),
            ]
        );
        assert_eq!(
            tokens("a?.5:1"),
            vec![
                Token::Identifier("a".to_string()),
                Token::Punctuator(Punctuator::Question),
                Token::Number(0.5),
                Token::Punctuator(Punctuator::Colon),
                Token::Number(1.0),
            ]
        );
    }

    #[test]
    fn test_template_head() {
        assert_eq!(
            tokens("`a${"),
            vec![Token::TemplateHead("a".to_string())]
        );
    }

    #[test]
    fn test_rescan_regexp() {
        let mut lexer = Lexer::new("/a[/]b/gi");
        assert_eq!(lexer.peek_token().unwrap(), &Token::Punctuator(Punctuator::Slash));
        assert_eq!(
            lexer.rescan_as_regexp().unwrap(),
            Token::RegExp("a[/]b".to_string(), "gi".to_string())
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            tokens("const x"),
            vec![Token::Keyword(Keyword::Const), Token::Identifier("x".to_string())]
        );
    }

    #[test]
    fn test_hashbang_skipped() {
        assert_eq!(tokens("#!/usr/bin/env node\n1"), vec![Token::Number(1.0)]);
    }
}
