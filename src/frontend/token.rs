// src/frontend/token.rs

/// All token types in the supported SystemVerilog subset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    // Literals
    IntLiteral,     // 42
    BasedLiteral,   // 4'b10x1, 'h3f, 8'd255
    UnbasedLiteral, // '0 '1 'x 'z
    RealLiteral,    // 3.14, 1e9
    StringLiteral,  // "text"
    Identifier,
    SystemName, // $display, $clog2

    // Keywords
    KwModule,
    KwEndModule,
    KwMacroModule,
    KwInterface,
    KwEndInterface,
    KwProgram,
    KwEndProgram,
    KwPackage,
    KwEndPackage,
    KwParameter,
    KwLocalParam,
    KwDefparam,
    KwTypedef,
    KwEnum,
    KwStruct,
    KwPacked,
    KwInput,
    KwOutput,
    KwInout,
    KwWire,
    KwAssign,
    KwInitial,
    KwAlways,
    KwAlwaysComb,
    KwAlwaysFF,
    KwAlwaysLatch,
    KwBegin,
    KwEnd,
    KwIf,
    KwElse,
    KwFor,
    KwCase,
    KwCaseZ,
    KwCaseX,
    KwEndCase,
    KwDefault,
    KwReturn,
    KwFunction,
    KwEndFunction,
    KwAutomatic,
    KwGenerate,
    KwEndGenerate,
    KwGenvar,
    KwImport,
    KwSigned,
    KwUnsigned,

    // Type keywords
    KwBit,
    KwLogic,
    KwReg,
    KwByte,
    KwShortInt,
    KwInt,
    KwLongInt,
    KwInteger,
    KwTime,
    KwReal,
    KwRealTime,
    KwShortReal,
    KwString,
    KwChandle,
    KwEvent,
    KwVoid,
    KwNull,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    StarStar, // **
    Amp,      // &
    Pipe,     // |
    Caret,    // ^
    TildeCaret, // ~^ and ^~
    TildeAmp,   // ~& (nand reduction)
    TildePipe,  // ~| (nor reduction)
    Tilde,      // ~
    Bang,       // !
    AmpAmp,     // &&
    PipePipe,   // ||
    EqEq,       // ==
    BangEq,     // !=
    EqEqEq,     // ===
    BangEqEq,   // !==
    EqEqQuest,  // ==?
    BangEqQuest, // !=?
    Lt,
    Gt,
    LtEq,
    GtEq,
    LtLt,       // <<
    GtGt,       // >>
    LtLtLt,     // <<<
    GtGtGt,     // >>>
    Eq,         // =
    LtEqArrow,  // <= in nonblocking-assignment position (same token as LtEq)
    PlusColon,  // +:
    MinusColon, // -:
    Question,
    Colon,
    ColonColon, // ::
    Semicolon,
    Comma,
    Dot,
    Hash,       // #
    At,         // @
    Apostrophe, // ' (assignment pattern '{ )
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Eof,
    Error,
}

impl TokenType {
    /// Human-readable token name for diagnostics
    pub fn as_str(self) -> &'static str {
        match self {
            TokenType::IntLiteral => "integer literal",
            TokenType::BasedLiteral => "based literal",
            TokenType::UnbasedLiteral => "unbased literal",
            TokenType::RealLiteral => "real literal",
            TokenType::StringLiteral => "string literal",
            TokenType::Identifier => "identifier",
            TokenType::SystemName => "system name",
            TokenType::KwModule => "module",
            TokenType::KwEndModule => "endmodule",
            TokenType::KwMacroModule => "macromodule",
            TokenType::KwInterface => "interface",
            TokenType::KwEndInterface => "endinterface",
            TokenType::KwProgram => "program",
            TokenType::KwEndProgram => "endprogram",
            TokenType::KwPackage => "package",
            TokenType::KwEndPackage => "endpackage",
            TokenType::KwParameter => "parameter",
            TokenType::KwLocalParam => "localparam",
            TokenType::KwDefparam => "defparam",
            TokenType::KwTypedef => "typedef",
            TokenType::KwEnum => "enum",
            TokenType::KwStruct => "struct",
            TokenType::KwPacked => "packed",
            TokenType::KwInput => "input",
            TokenType::KwOutput => "output",
            TokenType::KwInout => "inout",
            TokenType::KwWire => "wire",
            TokenType::KwAssign => "assign",
            TokenType::KwInitial => "initial",
            TokenType::KwAlways => "always",
            TokenType::KwAlwaysComb => "always_comb",
            TokenType::KwAlwaysFF => "always_ff",
            TokenType::KwAlwaysLatch => "always_latch",
            TokenType::KwBegin => "begin",
            TokenType::KwEnd => "end",
            TokenType::KwIf => "if",
            TokenType::KwElse => "else",
            TokenType::KwFor => "for",
            TokenType::KwCase => "case",
            TokenType::KwCaseZ => "casez",
            TokenType::KwCaseX => "casex",
            TokenType::KwEndCase => "endcase",
            TokenType::KwDefault => "default",
            TokenType::KwReturn => "return",
            TokenType::KwFunction => "function",
            TokenType::KwEndFunction => "endfunction",
            TokenType::KwAutomatic => "automatic",
            TokenType::KwGenerate => "generate",
            TokenType::KwEndGenerate => "endgenerate",
            TokenType::KwGenvar => "genvar",
            TokenType::KwImport => "import",
            TokenType::KwSigned => "signed",
            TokenType::KwUnsigned => "unsigned",
            TokenType::KwBit => "bit",
            TokenType::KwLogic => "logic",
            TokenType::KwReg => "reg",
            TokenType::KwByte => "byte",
            TokenType::KwShortInt => "shortint",
            TokenType::KwInt => "int",
            TokenType::KwLongInt => "longint",
            TokenType::KwInteger => "integer",
            TokenType::KwTime => "time",
            TokenType::KwReal => "real",
            TokenType::KwRealTime => "realtime",
            TokenType::KwShortReal => "shortreal",
            TokenType::KwString => "string",
            TokenType::KwChandle => "chandle",
            TokenType::KwEvent => "event",
            TokenType::KwVoid => "void",
            TokenType::KwNull => "null",
            TokenType::Plus => "+",
            TokenType::Minus => "-",
            TokenType::Star => "*",
            TokenType::Slash => "/",
            TokenType::Percent => "%",
            TokenType::StarStar => "**",
            TokenType::Amp => "&",
            TokenType::Pipe => "|",
            TokenType::Caret => "^",
            TokenType::TildeCaret => "~^",
            TokenType::TildeAmp => "~&",
            TokenType::TildePipe => "~|",
            TokenType::Tilde => "~",
            TokenType::Bang => "!",
            TokenType::AmpAmp => "&&",
            TokenType::PipePipe => "||",
            TokenType::EqEq => "==",
            TokenType::BangEq => "!=",
            TokenType::EqEqEq => "===",
            TokenType::BangEqEq => "!==",
            TokenType::EqEqQuest => "==?",
            TokenType::BangEqQuest => "!=?",
            TokenType::Lt => "<",
            TokenType::Gt => ">",
            TokenType::LtEq => "<=",
            TokenType::GtEq => ">=",
            TokenType::LtLt => "<<",
            TokenType::GtGt => ">>",
            TokenType::LtLtLt => "<<<",
            TokenType::GtGtGt => ">>>",
            TokenType::Eq => "=",
            TokenType::LtEqArrow => "<=",
            TokenType::PlusColon => "+:",
            TokenType::MinusColon => "-:",
            TokenType::Question => "?",
            TokenType::Colon => ":",
            TokenType::ColonColon => "::",
            TokenType::Semicolon => ";",
            TokenType::Comma => ",",
            TokenType::Dot => ".",
            TokenType::Hash => "#",
            TokenType::At => "@",
            TokenType::Apostrophe => "'",
            TokenType::LParen => "(",
            TokenType::RParen => ")",
            TokenType::LBrace => "{",
            TokenType::RBrace => "}",
            TokenType::LBracket => "[",
            TokenType::RBracket => "]",
            TokenType::Eof => "end of file",
            TokenType::Error => "error",
        }
    }

    /// Keyword lookup for identifiers
    pub fn keyword(text: &str) -> Option<TokenType> {
        Some(match text {
            "module" => TokenType::KwModule,
            "macromodule" => TokenType::KwMacroModule,
            "endmodule" => TokenType::KwEndModule,
            "interface" => TokenType::KwInterface,
            "endinterface" => TokenType::KwEndInterface,
            "program" => TokenType::KwProgram,
            "endprogram" => TokenType::KwEndProgram,
            "package" => TokenType::KwPackage,
            "endpackage" => TokenType::KwEndPackage,
            "parameter" => TokenType::KwParameter,
            "localparam" => TokenType::KwLocalParam,
            "defparam" => TokenType::KwDefparam,
            "typedef" => TokenType::KwTypedef,
            "enum" => TokenType::KwEnum,
            "struct" => TokenType::KwStruct,
            "packed" => TokenType::KwPacked,
            "input" => TokenType::KwInput,
            "output" => TokenType::KwOutput,
            "inout" => TokenType::KwInout,
            "wire" => TokenType::KwWire,
            "assign" => TokenType::KwAssign,
            "initial" => TokenType::KwInitial,
            "always" => TokenType::KwAlways,
            "always_comb" => TokenType::KwAlwaysComb,
            "always_ff" => TokenType::KwAlwaysFF,
            "always_latch" => TokenType::KwAlwaysLatch,
            "begin" => TokenType::KwBegin,
            "end" => TokenType::KwEnd,
            "if" => TokenType::KwIf,
            "else" => TokenType::KwElse,
            "for" => TokenType::KwFor,
            "case" => TokenType::KwCase,
            "casez" => TokenType::KwCaseZ,
            "casex" => TokenType::KwCaseX,
            "endcase" => TokenType::KwEndCase,
            "default" => TokenType::KwDefault,
            "return" => TokenType::KwReturn,
            "function" => TokenType::KwFunction,
            "endfunction" => TokenType::KwEndFunction,
            "automatic" => TokenType::KwAutomatic,
            "generate" => TokenType::KwGenerate,
            "endgenerate" => TokenType::KwEndGenerate,
            "genvar" => TokenType::KwGenvar,
            "import" => TokenType::KwImport,
            "signed" => TokenType::KwSigned,
            "unsigned" => TokenType::KwUnsigned,
            "bit" => TokenType::KwBit,
            "logic" => TokenType::KwLogic,
            "reg" => TokenType::KwReg,
            "byte" => TokenType::KwByte,
            "shortint" => TokenType::KwShortInt,
            "int" => TokenType::KwInt,
            "longint" => TokenType::KwLongInt,
            "integer" => TokenType::KwInteger,
            "time" => TokenType::KwTime,
            "real" => TokenType::KwReal,
            "realtime" => TokenType::KwRealTime,
            "shortreal" => TokenType::KwShortReal,
            "string" => TokenType::KwString,
            "chandle" => TokenType::KwChandle,
            "event" => TokenType::KwEvent,
            "void" => TokenType::KwVoid,
            "null" => TokenType::KwNull,
            _ => return None,
        })
    }
}

/// Source location span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize, // Byte offset
    pub end: usize,   // Byte offset (exclusive)
    pub line: u32,    // Start line (1-indexed)
    pub column: u32,  // Start column (1-indexed)
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start,
            end: other.end,
            line: self.line,
            column: self.column,
        }
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        // miette uses (offset, length)
        (span.start, span.end.saturating_sub(span.start)).into()
    }
}

/// A lexed token
#[derive(Debug, Clone)]
pub struct Token {
    pub ty: TokenType,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(ty: TokenType, lexeme: &str, span: Span) -> Self {
        Self {
            ty,
            lexeme: lexeme.to_string(),
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup() {
        assert_eq!(TokenType::keyword("module"), Some(TokenType::KwModule));
        assert_eq!(TokenType::keyword("logic"), Some(TokenType::KwLogic));
        assert_eq!(TokenType::keyword("notakeyword"), None);
    }

    #[test]
    fn span_merge_spans_both() {
        let a = Span::new(0, 4, 1, 1);
        let b = Span::new(8, 12, 1, 9);
        let m = a.merge(b);
        assert_eq!(m.start, 0);
        assert_eq!(m.end, 12);
        assert_eq!(m.line, 1);
    }
}
