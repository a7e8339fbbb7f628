//! Syntax kinds for the Rowan-based CST
//!
//! This enum defines all possible node and token kinds in the syntax tree of
//! an spx source file.

/// All syntax kinds (tokens and nodes) in spx
///
/// Tokens are leaf nodes (identifiers, keywords, punctuation).
/// Nodes are composite (declarations, statements, expressions, types).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub enum SyntaxKind {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    WHITESPACE = 0,
    NEWLINE,
    LINE_COMMENT,
    BLOCK_COMMENT,

    // =========================================================================
    // LITERALS
    // =========================================================================
    IDENT,      // identifier
    INT,        // 42, 0x2a
    FLOAT,      // 3.14, 1e3
    STRING,     // "hello" (possibly unterminated)
    RAW_STRING, // `hello`

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    L_BRACE,       // {
    R_BRACE,       // }
    L_BRACKET,     // [
    R_BRACKET,     // ]
    L_PAREN,       // (
    R_PAREN,       // )
    SEMICOLON,     // ;
    COLON,         // :
    COMMA,         // ,
    DOT,           // .
    ELLIPSIS,      // ...
    EQ,            // =
    COLON_EQ,      // :=
    FAT_ARROW,     // =>
    ARROW,         // <-
    PLUS,          // +
    MINUS,         // -
    STAR,          // *
    SLASH,         // /
    PERCENT,       // %
    AMP,           // &
    PIPE,          // |
    CARET,         // ^
    SHL,           // <<
    SHR,           // >>
    AMP_AMP,       // &&
    PIPE_PIPE,     // ||
    BANG,          // !
    EQ_EQ,         // ==
    BANG_EQ,       // !=
    LT,            // <
    LT_EQ,         // <=
    GT,            // >
    GT_EQ,         // >=
    PLUS_PLUS,     // ++
    MINUS_MINUS,   // --
    PLUS_EQ,       // +=
    MINUS_EQ,      // -=
    STAR_EQ,       // *=
    SLASH_EQ,      // /=
    PERCENT_EQ,    // %=

    // =========================================================================
    // KEYWORDS
    // =========================================================================
    BREAK_KW,
    CASE_KW,
    CHAN_KW,
    CONST_KW,
    CONTINUE_KW,
    DEFAULT_KW,
    ELSE_KW,
    FOR_KW,
    FUNC_KW,
    IF_KW,
    IMPORT_KW,
    INTERFACE_KW,
    MAP_KW,
    PACKAGE_KW,
    RANGE_KW,
    RETURN_KW,
    SELECT_KW,
    STRUCT_KW,
    SWITCH_KW,
    TYPE_KW,
    VAR_KW,

    // =========================================================================
    // NODES: file level
    // =========================================================================
    SOURCE_FILE,
    PACKAGE_CLAUSE,
    IMPORT_DECL,
    IMPORT_SPEC,
    VAR_DECL,
    VAR_SPEC,
    CONST_DECL,
    CONST_SPEC,
    TYPE_DECL,
    FUNC_DECL,
    RECEIVER,
    PARAM_LIST,
    PARAM,
    RESULT,
    NAME,

    // =========================================================================
    // NODES: types
    // =========================================================================
    TYPE_REF,
    POINTER_TYPE,
    SLICE_TYPE,
    MAP_TYPE,
    CHAN_TYPE,
    FUNC_TYPE,
    STRUCT_TYPE,
    FIELD_DECL,
    INTERFACE_TYPE,
    METHOD_SPEC,

    // =========================================================================
    // NODES: statements
    // =========================================================================
    BLOCK,
    EXPR_STMT,
    ASSIGN_STMT,
    DEFINE_STMT,
    INC_DEC_STMT,
    SEND_STMT,
    RETURN_STMT,
    IF_STMT,
    FOR_STMT,
    FOR_CLAUSE,
    RANGE_CLAUSE,
    SWITCH_STMT,
    CASE_CLAUSE,
    SELECT_STMT,
    COMM_CLAUSE,
    BRANCH_STMT,
    EXPR_LIST,

    // =========================================================================
    // NODES: expressions
    // =========================================================================
    NAME_REF,
    LITERAL,
    PAREN_EXPR,
    SELECTOR_EXPR,
    CALL_EXPR,
    COMMAND_CALL,
    ARG_LIST,
    INDEX_EXPR,
    COMPOSITE_LIT,
    LIT_BODY,
    KEYED_ELEMENT,
    UNARY_EXPR,
    BINARY_EXPR,
    FUNC_LIT,
    LAMBDA_EXPR,
    LAMBDA_PARAMS,
    LIST_LIT,
    MAP_LIT,

    // Special
    ERROR,

    #[doc(hidden)]
    __LAST,
}

impl SyntaxKind {
    /// Check if this is a trivia token (whitespace or comment)
    ///
    /// Newlines are trivia to the tree but the parser may treat them as
    /// statement terminators (see automatic semicolon insertion).
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            Self::WHITESPACE | Self::NEWLINE | Self::LINE_COMMENT | Self::BLOCK_COMMENT
        )
    }

    pub fn is_comment(self) -> bool {
        matches!(self, Self::LINE_COMMENT | Self::BLOCK_COMMENT)
    }

    /// Check if this is a keyword
    pub fn is_keyword(self) -> bool {
        (self as u16) >= (Self::BREAK_KW as u16) && (self as u16) <= (Self::VAR_KW as u16)
    }

    /// Check if this is a punctuation token
    pub fn is_punct(self) -> bool {
        (self as u16) >= (Self::L_BRACE as u16) && (self as u16) <= (Self::PERCENT_EQ as u16)
    }

    /// Check if this is a literal
    pub fn is_literal(self) -> bool {
        matches!(self, Self::INT | Self::FLOAT | Self::STRING | Self::RAW_STRING)
    }

    /// Whether a newline following this token terminates the statement.
    pub fn ends_statement(self) -> bool {
        matches!(
            self,
            Self::IDENT
                | Self::INT
                | Self::FLOAT
                | Self::STRING
                | Self::RAW_STRING
                | Self::BREAK_KW
                | Self::CONTINUE_KW
                | Self::RETURN_KW
                | Self::R_PAREN
                | Self::R_BRACKET
                | Self::R_BRACE
                | Self::PLUS_PLUS
                | Self::MINUS_MINUS
        )
    }

    /// Keyword kind for an identifier-shaped word, if it is reserved.
    pub fn from_keyword(text: &str) -> Option<SyntaxKind> {
        let kind = match text {
            "break" => Self::BREAK_KW,
            "case" => Self::CASE_KW,
            "chan" => Self::CHAN_KW,
            "const" => Self::CONST_KW,
            "continue" => Self::CONTINUE_KW,
            "default" => Self::DEFAULT_KW,
            "else" => Self::ELSE_KW,
            "for" => Self::FOR_KW,
            "func" => Self::FUNC_KW,
            "if" => Self::IF_KW,
            "import" => Self::IMPORT_KW,
            "interface" => Self::INTERFACE_KW,
            "map" => Self::MAP_KW,
            "package" => Self::PACKAGE_KW,
            "range" => Self::RANGE_KW,
            "return" => Self::RETURN_KW,
            "select" => Self::SELECT_KW,
            "struct" => Self::STRUCT_KW,
            "switch" => Self::SWITCH_KW,
            "type" => Self::TYPE_KW,
            "var" => Self::VAR_KW,
            _ => return None,
        };
        Some(kind)
    }
}

/// All reserved words, in alphabetical order.
pub const KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "else",
    "for",
    "func",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

impl From<rowan::SyntaxKind> for SyntaxKind {
    fn from(raw: rowan::SyntaxKind) -> Self {
        assert!(raw.0 < SyntaxKind::__LAST as u16);
        // Safety: we control all syntax kinds and check bounds above
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }
}

/// Language definition for Rowan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SpxLanguage {}

impl rowan::Language for SpxLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        raw.into()
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

/// Type aliases for convenience
pub type SyntaxNode = rowan::SyntaxNode<SpxLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<SpxLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<SpxLanguage>;
pub type SyntaxNodeChildren = rowan::SyntaxNodeChildren<SpxLanguage>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_table_matches_kinds() {
        for word in KEYWORDS {
            let kind = SyntaxKind::from_keyword(word).expect("keyword");
            assert!(kind.is_keyword(), "{word} -> {kind:?}");
        }
        assert_eq!(SyntaxKind::from_keyword("onStart"), None);
    }

    #[test]
    fn test_raw_round_trip() {
        let raw: rowan::SyntaxKind = SyntaxKind::CALL_EXPR.into();
        assert_eq!(SyntaxKind::from(raw), SyntaxKind::CALL_EXPR);
    }
}
