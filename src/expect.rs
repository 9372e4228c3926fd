use crate::ast::{ClauseKind, ClauseModifier, Join, TodoState};
use bitflags::bitflags;

bitflags! {
    /// Token classes the parser will accept next.
    ///
    /// Each class corresponds to a scope prefix produced by the grammar, so
    /// the set doubles as the completion hint stored in every
    /// [`TokenAnnotation`](crate::TokenAnnotation).
    pub struct Expected: u16 {
        const FORM = 1 << 0;
        const CLAUSE = 1 << 1;
        const MODIFIER = 1 << 2;
        const JOIN = 1 << 3;
        const NOT = 1 << 4;
        const TODO = 1 << 5;
        const TEXT = 1 << 6;
        const FUZZY = 1 << 7;
        const REGEX = 1 << 8;
        const REFERENCE = 1 << 9;
        const TAG = 1 << 10;
        const GROUP_OPEN = 1 << 11;
        const GROUP_CLOSE = 1 << 12;
        const SUBQUERY_OPEN = 1 << 13;
        const SUBQUERY_CLOSE = 1 << 14;

        /// Anything that can begin a clause.
        const CLAUSE_START = Self::CLAUSE.bits | Self::NOT.bits | Self::GROUP_OPEN.bits;
    }
}

/// `(class, scope prefix, label used in diagnostics)`
const CLASSES: [(Expected, &str, &str); 15] = [
    (Expected::FORM, "keyword.form", "a form"),
    (Expected::CLAUSE, "keyword.clause", "a clause"),
    (Expected::MODIFIER, "keyword.modifier", "all/any"),
    (Expected::JOIN, "keyword.operator.join", "and/or"),
    (Expected::NOT, "keyword.operator.not", "not"),
    (Expected::TODO, "constant.language.todo", "a todo state"),
    (Expected::TEXT, "punctuation.definition.text.begin", "\"text\""),
    (Expected::FUZZY, "punctuation.definition.fuzzy.begin", "'fuzzy text'"),
    (Expected::REGEX, "punctuation.definition.regex.begin", "/regex/"),
    (Expected::REFERENCE, "punctuation.definition.reference.begin", "[[reference]]"),
    (Expected::TAG, "punctuation.definition.tag", "#tag"),
    (Expected::GROUP_OPEN, "punctuation.section.group.begin", "("),
    (Expected::GROUP_CLOSE, "punctuation.section.group.end", ")"),
    (Expected::SUBQUERY_OPEN, "punctuation.section.subquery.begin", "{"),
    (Expected::SUBQUERY_CLOSE, "punctuation.section.subquery.end", "}"),
];

impl Expected {
    /// Value shapes a clause accepts once its kind and modifier are known.
    pub fn value_shapes(kind: ClauseKind, modifier: Option<ClauseModifier>) -> Self {
        match (kind, modifier) {
            (ClauseKind::Named, _) => Self::TEXT | Self::FUZZY | Self::REGEX,
            (ClauseKind::With, _) => {
                Self::TEXT | Self::FUZZY | Self::REGEX | Self::TAG | Self::TODO
            }
            (ClauseKind::In | ClauseKind::LinkedFrom, None) => {
                Self::REFERENCE | Self::SUBQUERY_OPEN
            }
            (ClauseKind::In | ClauseKind::LinkedFrom, Some(_)) => Self::REFERENCE,
        }
    }

    /// Value shapes plus, where a `{subquery}` fits, a bare form keyword so
    /// that it reaches the form handler and is reported as an implicit
    /// subquery.
    pub(crate) fn value_slot(kind: ClauseKind, modifier: Option<ClauseModifier>) -> Self {
        let shapes = Self::value_shapes(kind, modifier);
        if shapes.contains(Self::SUBQUERY_OPEN) {
            shapes | Self::FORM
        } else {
            shapes
        }
    }

    /// Whether any expected prefix matches one of `scopes`, most specific
    /// scope first.
    pub fn admits<S: AsRef<str>>(&self, scopes: &[S]) -> bool {
        scopes.iter().rev().any(|scope| {
            let scope = scope.as_ref();
            CLASSES
                .iter()
                .any(|(class, prefix, _)| self.contains(*class) && is_scope_prefix(prefix, scope))
        })
    }

    pub fn scope_prefixes(&self) -> Vec<String> {
        CLASSES
            .iter()
            .filter(|(class, ..)| self.contains(*class))
            .map(|(_, prefix, _)| prefix.to_string())
            .collect()
    }

    /// Human readable list for "unexpected token" diagnostics.
    pub fn describe(&self) -> String {
        let labels: Vec<&str> = CLASSES
            .iter()
            .filter(|(class, ..)| self.contains(*class))
            .map(|(.., label)| *label)
            .collect();
        match labels.as_slice() {
            [] => "end of query".to_string(),
            [only] => only.to_string(),
            [rest @ .., last] => format!("{} or {last}", rest.join(", ")),
        }
    }
}

/// Delimited value shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delimiter {
    Text,
    Fuzzy,
    Regex,
    Reference,
}

impl Delimiter {
    /// Scope prefix of the token that closes this value.
    pub(crate) fn close_prefix(self) -> &'static str {
        match self {
            Delimiter::Text => "punctuation.definition.text.end",
            Delimiter::Fuzzy => "punctuation.definition.fuzzy.end",
            Delimiter::Regex => "punctuation.definition.regex.end",
            Delimiter::Reference => "punctuation.definition.reference.end",
        }
    }
}

/// What a token means to the parser, derived from its most specific scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenClass {
    Form,
    Clause(ClauseKind),
    Modifier(ClauseModifier),
    Join(Join),
    Not,
    Todo(TodoState),
    Value(Delimiter),
    Tag,
    GroupOpen,
    GroupClose,
    SubqueryOpen,
    SubqueryClose,
}

const SCOPE_CLASSES: [(&str, TokenClass); 24] = [
    ("keyword.form", TokenClass::Form),
    ("keyword.clause.named", TokenClass::Clause(ClauseKind::Named)),
    ("keyword.clause.with", TokenClass::Clause(ClauseKind::With)),
    ("keyword.clause.in", TokenClass::Clause(ClauseKind::In)),
    ("keyword.clause.linkedfrom", TokenClass::Clause(ClauseKind::LinkedFrom)),
    ("keyword.modifier.all", TokenClass::Modifier(ClauseModifier::All)),
    ("keyword.modifier.any", TokenClass::Modifier(ClauseModifier::Any)),
    ("keyword.operator.join.and", TokenClass::Join(Join::And)),
    ("keyword.operator.join.or", TokenClass::Join(Join::Or)),
    ("keyword.operator.not", TokenClass::Not),
    ("constant.language.todo.any", TokenClass::Todo(TodoState::Any)),
    ("constant.language.todo.open", TokenClass::Todo(TodoState::Open)),
    ("constant.language.todo.complete", TokenClass::Todo(TodoState::Complete)),
    ("constant.language.todo.canceled", TokenClass::Todo(TodoState::Canceled)),
    ("constant.language.todo.closed", TokenClass::Todo(TodoState::Closed)),
    ("punctuation.definition.text.begin", TokenClass::Value(Delimiter::Text)),
    ("punctuation.definition.fuzzy.begin", TokenClass::Value(Delimiter::Fuzzy)),
    ("punctuation.definition.regex.begin", TokenClass::Value(Delimiter::Regex)),
    (
        "punctuation.definition.reference.begin",
        TokenClass::Value(Delimiter::Reference),
    ),
    ("punctuation.definition.tag", TokenClass::Tag),
    ("punctuation.section.group.begin", TokenClass::GroupOpen),
    ("punctuation.section.group.end", TokenClass::GroupClose),
    ("punctuation.section.subquery.begin", TokenClass::SubqueryOpen),
    ("punctuation.section.subquery.end", TokenClass::SubqueryClose),
];

impl TokenClass {
    pub(crate) fn of(scope: &str) -> Option<Self> {
        SCOPE_CLASSES
            .iter()
            .find(|(prefix, _)| is_scope_prefix(prefix, scope))
            .map(|(_, class)| *class)
    }
}

/// Scope prefixes match whole dotted segments: `keyword.clause.in` covers
/// `keyword.clause.in.notequery` but not `keyword.clause.index`.
fn is_scope_prefix(prefix: &str, scope: &str) -> bool {
    scope
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}
