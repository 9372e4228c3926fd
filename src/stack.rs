//! Nesting state of a parse.
//!
//! The root query lives outside the frame stack so there is always a level to
//! append to. Every nested level (anonymous group, `not`, `{subquery}`) is one
//! [`Frame`] that owns its own children, its own negation state and, for
//! subqueries, its own pending clause context. A frame becomes a node of its
//! parent only when it is popped.

use crate::{
    Clause, ClauseGroup, ClauseKind, ClauseModifier, ClauseValue, Expected, Join, Negation, Query,
    QueryError, QueryNode,
};

/// Kind and modifier waiting for a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClauseContext {
    pub(crate) kind: ClauseKind,
    pub(crate) modifier: Option<ClauseModifier>,
}

impl ClauseContext {
    pub(crate) fn value_shapes(&self) -> Expected {
        Expected::value_slot(self.kind, self.modifier)
    }
}

/// UTF-16 range of the token that opened something.
type Span = (usize, usize);

#[derive(Debug, Default)]
struct Members {
    join: Option<Join>,
    children: Vec<QueryNode>,
}

impl Members {
    fn into_group(self, negation_modifier: Option<Negation>) -> ClauseGroup {
        ClauseGroup {
            join: self.join.unwrap_or(Join::And),
            negation_modifier,
            children: self.children,
        }
    }
}

/// A `not` does not know its extent until the next token: `not (` bounds it
/// by the parenthesis, anything else makes it an open negation that ends at
/// a disambiguating `and` or at the enclosing closer.
#[derive(Debug)]
enum NotState {
    Uninitialized,
    Open(Members),
    Grouped(Members),
}

#[derive(Debug)]
struct QueryLevel {
    forms: Vec<String>,
    members: Members,
    pending: Option<ClauseContext>,
    /// Clause keyword still waiting for its value.
    awaiting_value: Option<Span>,
}

impl QueryLevel {
    fn new() -> Self {
        Self {
            forms: Vec::new(),
            members: Members::default(),
            pending: None,
            awaiting_value: None,
        }
    }

    fn into_query(self) -> Query {
        Query {
            forms: self.forms,
            group: self.members.into_group(None),
        }
    }
}

#[derive(Debug)]
enum Frame {
    Group {
        members: Members,
        opened: Span,
    },
    Not {
        state: NotState,
        opened: Span,
    },
    Subquery {
        owner: ClauseContext,
        level: QueryLevel,
        opened: Span,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Closer {
    Group,
    Subquery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JoinOutcome {
    Recorded,
    /// `Notes and Folders`: the join only separates forms.
    BetweenForms,
}

pub(crate) const IMPLICIT_SUBQUERY: &str = "Implicit subquery not yet supported";
pub(crate) const IMPLICIT_GROUP_SEPARATION: &str =
    "Implicit group separation not yet supported, use parentheses to mix 'and' and 'or'";
pub(crate) const NO_OPEN_GROUP: &str = "There is no open group to close";
pub(crate) const MISMATCHED_CLOSER: &str = "Mismatched closing delimiter";
pub(crate) const EMPTY_GROUP: &str = "Empty group matches everything and is invalid";

pub(crate) struct QueryStack {
    root: QueryLevel,
    frames: Vec<Frame>,
}

impl QueryStack {
    pub(crate) fn new() -> Self {
        Self {
            root: QueryLevel::new(),
            frames: Vec::new(),
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    fn level(&self) -> &QueryLevel {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| match frame {
                Frame::Subquery { level, .. } => Some(level),
                _ => None,
            })
            .unwrap_or(&self.root)
    }

    fn level_mut(&mut self) -> &mut QueryLevel {
        let index = self
            .frames
            .iter()
            .rposition(|frame| matches!(frame, Frame::Subquery { .. }));
        match index.map(|index| &mut self.frames[index]) {
            Some(Frame::Subquery { level, .. }) => level,
            _ => &mut self.root,
        }
    }

    /// Members of the innermost level, `None` for an uninitialized `not`.
    fn top_members(&mut self) -> Option<&mut Members> {
        match self.frames.last_mut() {
            None => Some(&mut self.root.members),
            Some(Frame::Group { members, .. }) => Some(members),
            Some(Frame::Subquery { level, .. }) => Some(&mut level.members),
            Some(Frame::Not { state, .. }) => match state {
                NotState::Uninitialized => None,
                NotState::Open(members) | NotState::Grouped(members) => Some(members),
            },
        }
    }

    fn top_is_open_not(&self) -> bool {
        matches!(
            self.frames.last(),
            Some(Frame::Not {
                state: NotState::Open(_),
                ..
            })
        )
    }

    pub(crate) fn pending(&self) -> Option<ClauseContext> {
        self.level().pending
    }

    /// Shapes of the pending clause, if any.
    pub(crate) fn pending_shapes(&self) -> Expected {
        self.pending()
            .map_or(Expected::empty(), |context| context.value_shapes())
    }

    /// Closers that would currently match an open frame.
    pub(crate) fn closers(&self) -> Expected {
        let mut closers = Expected::empty();
        for frame in self.frames.iter().rev() {
            match frame {
                Frame::Group { .. }
                | Frame::Not {
                    state: NotState::Grouped(_),
                    ..
                } => {
                    closers |= Expected::GROUP_CLOSE;
                    break;
                }
                Frame::Not { .. } => {}
                Frame::Subquery { .. } => {
                    closers |= Expected::SUBQUERY_CLOSE;
                    break;
                }
            }
        }
        closers
    }

    pub(crate) fn add_form(&mut self, form: String) -> Result<(), &'static str> {
        match self.frames.last() {
            None | Some(Frame::Subquery { .. }) => {}
            Some(_) => return Err(IMPLICIT_SUBQUERY),
        }
        let level = self.level_mut();
        if !level.members.children.is_empty() || level.awaiting_value.is_some() {
            return Err(IMPLICIT_SUBQUERY);
        }
        level.forms.push(form);
        Ok(())
    }

    /// A clause keyword replaces whatever context this level had pending.
    pub(crate) fn begin_clause(&mut self, kind: ClauseKind, keyword: Span) {
        let level = self.level_mut();
        level.pending = Some(ClauseContext {
            kind,
            modifier: None,
        });
        level.awaiting_value = Some(keyword);
    }

    pub(crate) fn refine_clause(&mut self, modifier: ClauseModifier) -> Option<ClauseContext> {
        let context = self.level_mut().pending.as_mut()?;
        context.modifier = Some(modifier);
        Some(*context)
    }

    /// Appends `value` under the pending clause context.
    pub(crate) fn push_value(&mut self, value: ClauseValue) -> Result<(), &'static str> {
        let level = self.level_mut();
        let Some(context) = level.pending else {
            return Err("Value is not preceded by a clause keyword");
        };
        level.awaiting_value = None;
        self.push_node(QueryNode::Clause(Clause {
            kind: context.kind,
            modifier: context.modifier,
            value,
        }));
        Ok(())
    }

    /// The value was read but rejected; the clause stops waiting for one.
    pub(crate) fn reject_value(&mut self) {
        self.level_mut().awaiting_value = None;
    }

    fn push_node(&mut self, node: QueryNode) {
        if let Some(Frame::Not { state, .. }) = self.frames.last_mut() {
            if let NotState::Uninitialized = state {
                *state = NotState::Open(Members {
                    join: None,
                    children: vec![node],
                });
                return;
            }
        }
        if let Some(members) = self.top_members() {
            members.children.push(node);
        }
    }

    /// Records a join on the innermost level.
    ///
    /// With `close_open_negations` every open `not` on top is closed first,
    /// which makes `not A and B` read as `(not A) and B`.
    pub(crate) fn join(
        &mut self,
        join: Join,
        close_open_negations: bool,
    ) -> Result<JoinOutcome, &'static str> {
        if close_open_negations {
            while self.top_is_open_not() {
                self.pop_frame();
            }
        }

        let top_is_level = matches!(self.frames.last(), None | Some(Frame::Subquery { .. }));
        let level = self.level();
        if top_is_level && level.members.children.is_empty() && level.pending.is_none() {
            return Ok(JoinOutcome::BetweenForms);
        }

        let Some(members) = self.top_members() else {
            return Ok(JoinOutcome::Recorded);
        };
        match members.join {
            None => {
                members.join = Some(join);
                Ok(JoinOutcome::Recorded)
            }
            Some(existing) if existing == join => Ok(JoinOutcome::Recorded),
            Some(_) => Err(IMPLICIT_GROUP_SEPARATION),
        }
    }

    pub(crate) fn open_not(&mut self, keyword: Span) {
        self.frames.push(Frame::Not {
            state: NotState::Uninitialized,
            opened: keyword,
        });
    }

    /// `(` right after `not` bounds that negation instead of nesting a group.
    pub(crate) fn open_group(&mut self, paren: Span) {
        if let Some(Frame::Not { state, opened }) = self.frames.last_mut() {
            if let NotState::Uninitialized = state {
                *state = NotState::Grouped(Members::default());
                *opened = paren;
                return;
            }
        }
        self.frames.push(Frame::Group {
            members: Members::default(),
            opened: paren,
        });
    }

    pub(crate) fn open_subquery(&mut self, brace: Span) -> Result<(), &'static str> {
        let level = self.level_mut();
        let Some(owner) = level.pending else {
            return Err("Subquery is not preceded by a clause keyword");
        };
        level.awaiting_value = None;
        self.frames.push(Frame::Subquery {
            owner,
            level: QueryLevel::new(),
            opened: brace,
        });
        Ok(())
    }

    pub(crate) fn close(&mut self, closer: Closer) -> Result<(), &'static str> {
        while self.top_is_open_not() {
            self.pop_frame();
        }
        let matches = match self.frames.last() {
            None => return Err(NO_OPEN_GROUP),
            Some(Frame::Group { .. }) => closer == Closer::Group,
            Some(Frame::Not { state, .. }) => {
                closer == Closer::Group && matches!(state, NotState::Grouped(_))
            }
            Some(Frame::Subquery { .. }) => closer == Closer::Subquery,
        };
        if !matches {
            return Err(MISMATCHED_CLOSER);
        }
        let empty = match self.frames.last() {
            Some(Frame::Group { members, .. })
            | Some(Frame::Not {
                state: NotState::Grouped(members),
                ..
            }) => members.children.is_empty(),
            _ => false,
        };
        self.pop_frame();
        if empty { Err(EMPTY_GROUP) } else { Ok(()) }
    }

    /// Pops the innermost frame and attaches it to its parent.
    fn pop_frame(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let node = match frame {
            Frame::Group { members, .. } => QueryNode::Group(members.into_group(None)),
            Frame::Not { state, .. } => {
                let members = match state {
                    NotState::Uninitialized => Members::default(),
                    NotState::Open(members) | NotState::Grouped(members) => members,
                };
                QueryNode::Group(members.into_group(Some(Negation::Not)))
            }
            Frame::Subquery { owner, level, .. } => QueryNode::Clause(Clause {
                kind: owner.kind,
                modifier: owner.modifier,
                value: ClauseValue::Subquery(Box::new(level.into_query())),
            }),
        };
        self.push_node(node);
    }

    /// Unwinds everything still open. Unless the parse was aborted, frames
    /// that were never closed and clauses without a value are reported.
    pub(crate) fn finish(mut self, errors: &mut Vec<QueryError>, report: bool) -> Query {
        if report {
            let innermost = self.frames.len().saturating_sub(1);
            for (index, frame) in self.frames.iter().enumerate() {
                match frame {
                    // A frame above it becomes its operand once unwound.
                    Frame::Not {
                        state: NotState::Uninitialized,
                        opened,
                    } if index == innermost => {
                        errors.push(span_error(*opened, "Expected a clause after 'not'"))
                    }
                    Frame::Not {
                        state: NotState::Uninitialized,
                        ..
                    } => {}
                    Frame::Not {
                        state: NotState::Grouped(_),
                        opened,
                    }
                    | Frame::Group { opened, .. } => {
                        errors.push(span_error(*opened, "Group was not closed"))
                    }
                    Frame::Subquery { level, opened, .. } => {
                        if let Some(keyword) = level.awaiting_value {
                            errors.push(span_error(keyword, "Clause is missing a value"));
                        }
                        errors.push(span_error(*opened, "Subquery was not closed"));
                    }
                    Frame::Not {
                        state: NotState::Open(_),
                        ..
                    } => {}
                }
            }
            if let Some(keyword) = self.root.awaiting_value {
                errors.push(span_error(keyword, "Clause is missing a value"));
            }
        }

        while !self.frames.is_empty() {
            self.pop_frame();
        }
        self.root.into_query()
    }
}

fn span_error((start, end): Span, message: &str) -> QueryError {
    QueryError::new(start, end, message)
}
