use crate::{
    Token,
    grammar::{Grammar, GrammarError, Rule},
    source::SourceText,
};
use regex::{Captures, Regex};
use tracing::trace;

/// Tokenizes text against a compiled [`Grammar`].
///
/// Lines are scanned one at a time (terminator included) the way TextMate
/// engines do, but the produced tokens share a single UTF-16 offset space.
/// Ranges opened by a `begin` rule stay open across line breaks until their
/// `end` pattern matches. Text no rule claims becomes a token carrying only
/// the scopes that are currently open, so the output always covers the
/// whole input without gaps.
#[derive(Debug, Clone)]
pub struct Scanner {
    grammar: Grammar,
}

#[derive(Clone, Copy)]
enum HitKind {
    End,
    Match(usize),
    Begin(usize),
}

struct Hit<'l> {
    kind: HitKind,
    captures: Captures<'l>,
}

impl<'l> Hit<'l> {
    fn start(&self) -> usize {
        self.captures.get(0).map_or(0, |m| m.start())
    }

    fn end(&self) -> usize {
        self.captures.get(0).map_or(0, |m| m.end())
    }
}

impl Scanner {
    pub fn new(grammar: Grammar) -> Self {
        Self { grammar }
    }

    pub fn from_json(json: &str) -> Result<Self, GrammarError> {
        Grammar::from_json(json).map(Self::new)
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        self.tokenize_source(&SourceText::new(text))
    }

    pub fn tokenize_source(&self, source: &SourceText<'_>) -> Vec<Token> {
        let mut emitter = Emitter {
            source,
            tokens: Vec::new(),
        };
        // Ids of the range rules currently open, innermost last.
        let mut open: Vec<usize> = Vec::new();
        let mut line_start = 0;
        for line in source.as_str().split_inclusive('\n') {
            self.scan_line(line, line_start, &mut open, &mut emitter);
            line_start += line.len();
        }
        trace!(
            tokens = emitter.tokens.len(),
            unclosed = open.len(),
            "tokenized"
        );
        emitter.tokens
    }

    fn scan_line(
        &self,
        line: &str,
        offset: usize,
        open: &mut Vec<usize>,
        out: &mut Emitter<'_, '_>,
    ) {
        let mut pos = 0;
        while pos < line.len() {
            let Some(hit) = self.next_hit(line, pos, open.last().copied()) else {
                out.push(offset + pos, offset + line.len(), self.scopes(open, true));
                break;
            };
            if hit.start() > pos {
                out.push(offset + pos, offset + hit.start(), self.scopes(open, true));
            }
            match hit.kind {
                HitKind::End => {
                    let scopes = self.scopes(open, false);
                    let captures = match open.last().map(|&id| &self.grammar.rules[id]) {
                        Some(Rule::Range { end_captures, .. }) => end_captures.as_slice(),
                        _ => &[],
                    };
                    out.push_captures(offset, &hit.captures, &scopes, captures);
                    open.pop();
                }
                HitKind::Match(id) => {
                    if let Rule::Match { name, captures, .. } = &self.grammar.rules[id] {
                        let mut scopes = self.scopes(open, true);
                        scopes.extend(name.clone());
                        out.push_captures(offset, &hit.captures, &scopes, captures);
                    }
                }
                HitKind::Begin(id) => {
                    if let Rule::Range {
                        name,
                        begin_captures,
                        ..
                    } = &self.grammar.rules[id]
                    {
                        let mut scopes = self.scopes(open, true);
                        scopes.extend(name.clone());
                        out.push_captures(offset, &hit.captures, &scopes, begin_captures);
                        open.push(id);
                    }
                }
            }
            pos = hit.end();
        }
    }

    /// Finds the leftmost non-empty match at or after `pos`. On ties the end
    /// pattern of the open range wins, then rules in declaration order.
    fn next_hit<'l>(&self, line: &'l str, pos: usize, top: Option<usize>) -> Option<Hit<'l>> {
        let mut best: Option<Hit<'l>> = None;
        let mut consider = |kind: HitKind, regex: &Regex| {
            let Some(captures) = regex.captures_at(line, pos) else {
                return;
            };
            let Some(whole) = captures.get(0) else {
                return;
            };
            if whole.is_empty() {
                return;
            }
            if best.as_ref().is_none_or(|b| whole.start() < b.start()) {
                best = Some(Hit { kind, captures });
            }
        };

        let candidates = match top.map(|id| &self.grammar.rules[id]) {
            Some(Rule::Range {
                end, candidates, ..
            }) => {
                consider(HitKind::End, end);
                candidates.as_slice()
            }
            _ => self.grammar.root.as_slice(),
        };
        for &id in candidates {
            match &self.grammar.rules[id] {
                Rule::Match { regex, .. } => consider(HitKind::Match(id), regex),
                Rule::Range { begin, .. } => consider(HitKind::Begin(id), begin),
                Rule::Patterns(_) => {}
            }
        }
        best
    }

    /// Scopes in effect inside the open ranges. `content` adds the innermost
    /// range's `contentName`, which its own begin/end delimiters do not get.
    fn scopes(&self, open: &[usize], content: bool) -> Vec<String> {
        let mut scopes = vec![self.grammar.scope_name.clone()];
        for (depth, &id) in open.iter().enumerate() {
            let Rule::Range {
                name, content_name, ..
            } = &self.grammar.rules[id]
            else {
                continue;
            };
            scopes.extend(name.clone());
            if content || depth + 1 < open.len() {
                scopes.extend(content_name.clone());
            }
        }
        scopes
    }
}

struct Emitter<'s, 't> {
    source: &'s SourceText<'t>,
    tokens: Vec<Token>,
}

impl Emitter<'_, '_> {
    fn push(&mut self, start: usize, end: usize, scopes: Vec<String>) {
        if start >= end {
            return;
        }
        self.tokens.push(Token {
            start_offset: self.source.utf16_offset(start),
            end_offset: self.source.utf16_offset(end),
            scopes,
        });
    }

    /// Splits a match into capture tokens; uncaptured stretches keep `base`.
    fn push_captures(
        &mut self,
        offset: usize,
        captures: &Captures<'_>,
        base: &[String],
        scopes: &[(usize, String)],
    ) {
        let Some(whole) = captures.get(0) else {
            return;
        };
        let mut cursor = whole.start();
        for (group, scope) in scopes {
            let Some(m) = captures.get(*group) else {
                continue;
            };
            if m.is_empty() || m.start() < cursor {
                continue;
            }
            self.push(offset + cursor, offset + m.start(), base.to_vec());
            let mut captured = base.to_vec();
            captured.push(scope.clone());
            self.push(offset + m.start(), offset + m.end(), captured);
            cursor = m.end();
        }
        self.push(offset + cursor, offset + whole.end(), base.to_vec());
    }
}
