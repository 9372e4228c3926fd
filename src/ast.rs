use bitflags::bitflags;
use regex::{Regex, RegexBuilder};
use serde::{Serialize, Serializer, ser::SerializeStruct};
use std::fmt;

/// A complete query: the forms it searches plus its top-level clause group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query {
    /// Capitalized form names such as `Notes` or `Folders`.
    pub forms: Vec<String>,
    #[serde(flatten)]
    pub group: ClauseGroup,
}

impl Query {
    pub fn join(&self) -> Join {
        self.group.join
    }

    pub fn children(&self) -> &[QueryNode] {
        &self.group.children
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty() && self.group.children.is_empty()
    }
}

/// An ordered run of clauses and nested groups combined with one join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClauseGroup {
    pub join: Join,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negation_modifier: Option<Negation>,
    pub children: Vec<QueryNode>,
}

impl ClauseGroup {
    pub fn is_negated(&self) -> bool {
        self.negation_modifier.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryNode {
    Clause(Clause),
    Group(ClauseGroup),
}

impl QueryNode {
    pub fn as_clause(&self) -> Option<&Clause> {
        match self {
            QueryNode::Clause(clause) => Some(clause),
            QueryNode::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&ClauseGroup> {
        match self {
            QueryNode::Group(group) => Some(group),
            QueryNode::Clause(_) => None,
        }
    }
}

/// A single predicate: `with "text"`, `in any [[Project]]`, `with #a/b`...
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clause {
    pub kind: ClauseKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifier: Option<ClauseModifier>,
    #[serde(flatten)]
    pub value: ClauseValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClauseKind {
    Named,
    With,
    In,
    LinkedFrom,
}

impl ClauseKind {
    /// Only containment and backlink clauses can be narrowed with `all`/`any`.
    pub fn accepts_modifier(self) -> bool {
        matches!(self, ClauseKind::In | ClauseKind::LinkedFrom)
    }
}

impl fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClauseKind::Named => "named",
            ClauseKind::With => "with",
            ClauseKind::In => "in",
            ClauseKind::LinkedFrom => "linked from",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClauseModifier {
    All,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Join {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Negation {
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TodoState {
    Any,
    Open,
    Complete,
    Canceled,
    Closed,
}

/// The literal a clause matches against. Serialized flattened into the
/// clause, e.g. `{"kind": "with", "text": "draft"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClauseValue {
    Text(String),
    Regex(QueryRegex),
    Reference(String),
    /// Tag path segments, outermost first.
    Tag(Vec<String>),
    Todo(TodoState),
    Subquery(Box<Query>),
}

bitflags! {
    /// Regular expression flags, spelled the way the query language writes
    /// them after the closing slash.
    pub struct RegexFlags: u8 {
        /// Report match indices.
        const D = 0b0000_0001;
        /// Find every match.
        const G = 0b0000_0010;
        const I = 0b0000_0100;
        const M = 0b0000_1000;
        const S = 0b0001_0000;
        const U = 0b0010_0000;
        /// Sticky, anchored at the last index.
        const Y = 0b0100_0000;
    }
}

const FLAG_LETTERS: [(char, RegexFlags); 7] = [
    ('d', RegexFlags::D),
    ('g', RegexFlags::G),
    ('i', RegexFlags::I),
    ('m', RegexFlags::M),
    ('s', RegexFlags::S),
    ('u', RegexFlags::U),
    ('y', RegexFlags::Y),
];

impl RegexFlags {
    pub fn from_letter(letter: char) -> Option<Self> {
        FLAG_LETTERS
            .iter()
            .find(|(l, _)| *l == letter)
            .map(|(_, flag)| *flag)
    }

    /// Parses a flag run such as `gi`. Returns the first unknown letter on
    /// failure.
    pub fn from_letters(letters: &str) -> Result<Self, char> {
        letters.chars().try_fold(Self::empty(), |flags, letter| {
            Self::from_letter(letter).map(|flag| flags | flag).ok_or(letter)
        })
    }

    /// Flag letters in canonical order.
    pub fn letters(&self) -> String {
        FLAG_LETTERS
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(letter, _)| *letter)
            .collect()
    }
}

impl fmt::Display for RegexFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.letters())
    }
}

/// A regular expression value together with the flags it was written with.
///
/// The pattern is compiled once at parse time. `i`, `m` and `s` change how it
/// matches; the remaining flags are carried for the evaluator.
#[derive(Clone)]
pub struct QueryRegex {
    source: String,
    flags: RegexFlags,
    regex: Regex,
}

impl QueryRegex {
    pub fn new(source: impl Into<String>, flags: RegexFlags) -> Result<Self, regex::Error> {
        let source = source.into();
        let regex = RegexBuilder::new(&source)
            .case_insensitive(flags.contains(RegexFlags::I))
            .multi_line(flags.contains(RegexFlags::M))
            .dot_matches_new_line(flags.contains(RegexFlags::S))
            .build()?;
        Ok(Self {
            source,
            flags,
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> RegexFlags {
        self.flags
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }
}

impl PartialEq for QueryRegex {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.flags == other.flags
    }
}

impl Eq for QueryRegex {}

impl fmt::Debug for QueryRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

impl Serialize for QueryRegex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("QueryRegex", 2)?;
        state.serialize_field("source", &self.source)?;
        state.serialize_field("flags", &self.flags.letters())?;
        state.end()
    }
}
