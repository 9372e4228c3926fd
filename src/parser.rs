use crate::{
    ClauseValue, Expected, Join, ParseResult, Query, QueryError, TokenAnnotation,
    cursor::TokenCursor,
    expect::TokenClass,
    stack::{Closer, JoinOutcome, QueryStack},
    values,
};
use query_scanner::{Scanner, SourceText, Token};
use tracing::{debug, instrument, trace};

/// Parses query text with the grammar loaded into `scanner`.
///
/// Use [`crate::parse_query_text`] for the bundled grammar; this type exists
/// for callers that ship their own grammar file.
#[derive(Debug, Clone, Copy)]
pub struct QueryParser<'g> {
    scanner: &'g Scanner,
}

impl<'g> QueryParser<'g> {
    pub fn new(scanner: &'g Scanner) -> Self {
        Self { scanner }
    }

    #[instrument(level = "debug", skip_all, fields(len = text.len()))]
    pub fn parse(&self, text: &str) -> ParseResult {
        let source = SourceText::new(text);
        let tokens = self.scanner.tokenize_source(&source);
        let (query, errors, annotations) = {
            let mut driver = Driver::new(&tokens, &source);
            let completed = driver.run();
            driver.finish(completed)
        };
        debug!(
            tokens = tokens.len(),
            errors = errors.len(),
            "query parsed"
        );
        ParseResult::new(query, errors, tokens, annotations)
    }
}

/// Returned by a handler when the parse cannot continue.
struct Abort(QueryError);

struct Driver<'t, 's> {
    cursor: TokenCursor<'t, 's>,
    stack: QueryStack,
    expected: Expected,
    errors: Vec<QueryError>,
    annotations: Vec<TokenAnnotation>,
    /// Join that nothing has followed yet.
    dangling_join: Option<&'t Token>,
}

impl<'t, 's> Driver<'t, 's> {
    fn new(tokens: &'t [Token], source: &'t SourceText<'s>) -> Self {
        Self {
            cursor: TokenCursor::new(tokens, source),
            stack: QueryStack::new(),
            expected: Expected::FORM,
            errors: Vec::new(),
            annotations: Vec::with_capacity(tokens.len()),
            dangling_join: None,
        }
    }

    /// Feeds every token to its handler. Returns `false` when a fatal error
    /// stopped the walk.
    fn run(&mut self) -> bool {
        while let Some(token) = self.cursor.next() {
            self.annotations
                .push(TokenAnnotation::expecting(self.expected));
            let step = self.step(token);
            // Tokens a value reader swallowed carry no hint of their own.
            while self.annotations.len() < self.cursor.position() {
                self.annotations.push(TokenAnnotation::default());
            }
            if let Err(Abort(error)) = step {
                debug!(%error, "parse aborted");
                self.errors.push(error);
                return false;
            }
        }
        true
    }

    fn finish(
        mut self,
        completed: bool,
    ) -> (Query, Vec<QueryError>, Vec<TokenAnnotation>) {
        while self.annotations.len() < self.cursor.len() {
            self.annotations.push(TokenAnnotation::default());
        }
        let query = self.stack.finish(&mut self.errors, completed);
        if let Some(join) = self.dangling_join.filter(|_| completed) {
            let text = self.cursor.text_of(join).trim();
            self.errors.push(QueryError::at(
                join,
                format!("Expected a clause after '{text}'"),
            ));
        }
        (query, self.errors, self.annotations)
    }

    fn step(&mut self, token: &'t Token) -> Result<(), Abort> {
        let text = self.cursor.text_of(token);
        let class = TokenClass::of(token.scope()).filter(|_| self.expected.admits(&token.scopes));
        let Some(class) = class else {
            if !text.trim().is_empty() {
                self.errors.push(QueryError::at(
                    token,
                    format!(
                        "Unexpected \"{}\", expected {}",
                        text.trim(),
                        self.expected.describe()
                    ),
                ));
            }
            return Ok(());
        };
        trace!(?class, text, depth = self.stack.depth(), "dispatch");
        self.dangling_join = None;

        match class {
            TokenClass::Form => match self.stack.add_form(capitalize(text)) {
                Ok(()) => {
                    self.expected = Expected::FORM
                        | Expected::JOIN
                        | Expected::CLAUSE_START
                        | self.stack.closers()
                }
                Err(message) => self.errors.push(QueryError::at(token, message)),
            },
            TokenClass::Clause(kind) => {
                self.stack.begin_clause(kind, span(token));
                let modifier = if kind.accepts_modifier() {
                    Expected::MODIFIER
                } else {
                    Expected::empty()
                };
                self.expected = modifier
                    | Expected::value_slot(kind, None)
                    | Expected::GROUP_OPEN;
            }
            TokenClass::Modifier(modifier) => match self.stack.refine_clause(modifier) {
                Some(context) => self.expected = context.value_shapes() | Expected::GROUP_OPEN,
                None => self.errors.push(QueryError::at(
                    token,
                    "Modifier is not preceded by a clause keyword",
                )),
            },
            TokenClass::Value(delimiter) => {
                let value =
                    values::read_delimited(delimiter, token, &mut self.cursor, &mut self.errors)
                        .map_err(Abort)?;
                match value {
                    Some(value) => self.push_value(token, value),
                    None => self.stack.reject_value(),
                }
                self.expect_after_value();
            }
            TokenClass::Tag => {
                let value =
                    values::read_tag(token, &mut self.cursor, &mut self.errors).map_err(Abort)?;
                self.push_value(token, value);
                self.expect_after_value();
            }
            TokenClass::Todo(state) => {
                self.push_value(token, ClauseValue::Todo(state));
                self.expect_after_value();
            }
            TokenClass::Join(join) => {
                self.dangling_join = Some(token);
                let closes_negation = join == Join::And
                    && matches!(
                        self.cursor
                            .peek_significant()
                            .and_then(|next| TokenClass::of(next.scope())),
                        Some(TokenClass::Clause(_) | TokenClass::Not)
                    );
                self.expected = match self.stack.join(join, closes_negation) {
                    Ok(JoinOutcome::BetweenForms) => Expected::FORM | Expected::CLAUSE_START,
                    Ok(JoinOutcome::Recorded) => {
                        Expected::CLAUSE_START | self.stack.pending_shapes()
                    }
                    Err(message) => {
                        self.errors.push(QueryError::at(token, message));
                        Expected::CLAUSE_START | self.stack.pending_shapes()
                    }
                };
            }
            TokenClass::Not => {
                self.stack.open_not(span(token));
                self.expected = Expected::CLAUSE_START | self.stack.pending_shapes();
            }
            TokenClass::GroupOpen => {
                self.stack.open_group(span(token));
                self.expected =
                    Expected::CLAUSE_START | Expected::GROUP_CLOSE | self.stack.pending_shapes();
            }
            TokenClass::GroupClose | TokenClass::SubqueryClose => {
                let closer = if class == TokenClass::GroupClose {
                    Closer::Group
                } else {
                    Closer::Subquery
                };
                if let Err(message) = self.stack.close(closer) {
                    self.errors.push(QueryError::at(token, message));
                }
                self.expect_after_value();
            }
            TokenClass::SubqueryOpen => match self.stack.open_subquery(span(token)) {
                Ok(()) => self.expected = Expected::FORM,
                Err(message) => self.errors.push(QueryError::at(token, message)),
            },
        }
        Ok(())
    }

    fn push_value(&mut self, token: &Token, value: ClauseValue) {
        if let Err(message) = self.stack.push_value(value) {
            self.errors.push(QueryError::at(token, message));
        }
    }

    fn expect_after_value(&mut self) {
        self.expected = Expected::JOIN | Expected::CLAUSE_START | self.stack.closers();
    }
}

fn span(token: &Token) -> (usize, usize) {
    (token.start_offset, token.end_offset)
}

/// `NOTES` and `notes` both name the `Notes` form.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
