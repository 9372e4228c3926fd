use regex::Regex;
use serde::Deserialize;
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
};
use tracing::debug;

/// Guards against `$self` includes recursing forever while candidate lists
/// are expanded.
const MAX_INCLUDE_DEPTH: usize = 16;

/// A compiled TextMate-style grammar.
///
/// Only the subset the scanner needs is supported: `match` rules, `begin`/`end`
/// ranges with `contentName`, capture scopes, nested `patterns` and `include`
/// of repository entries (`#name`) or the grammar itself (`$self`/`$base`).
#[derive(Debug, Clone)]
pub struct Grammar {
    pub(crate) scope_name: String,
    pub(crate) rules: Vec<Rule>,
    /// Flattened rule ids tried at the top level, in declaration order.
    pub(crate) root: Vec<usize>,
}

#[derive(Debug, Clone)]
pub(crate) enum Rule {
    Match {
        name: Option<String>,
        regex: Regex,
        captures: Vec<(usize, String)>,
    },
    Range {
        name: Option<String>,
        content_name: Option<String>,
        begin: Regex,
        begin_captures: Vec<(usize, String)>,
        end: Regex,
        end_captures: Vec<(usize, String)>,
        patterns: Vec<RuleRef>,
        /// Flattened `patterns`, in declaration order.
        candidates: Vec<usize>,
    },
    /// Pure container (`{"patterns": [...]}`), expanded away at compile time.
    Patterns(Vec<RuleRef>),
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum RuleRef {
    Rule(usize),
    Root,
}

impl Grammar {
    /// Deserializes and compiles a grammar from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, GrammarError> {
        let raw: RawGrammar = serde_json::from_str(json).map_err(GrammarError::Json)?;
        let grammar = Compiler::compile(raw)?;
        debug!(
            scope = %grammar.scope_name,
            rules = grammar.rules.len(),
            "grammar compiled"
        );
        Ok(grammar)
    }

    /// The root scope attached to every token.
    pub fn scope_name(&self) -> &str {
        &self.scope_name
    }
}

#[derive(Debug)]
pub enum GrammarError {
    Json(serde_json::Error),
    Regex {
        pattern: String,
        source: regex::Error,
    },
    UnknownInclude(String),
    InvalidCapture(String),
    MissingEnd(String),
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::Json(err) => write!(f, "malformed grammar file: {err}"),
            GrammarError::Regex { pattern, source } => {
                write!(f, "invalid grammar pattern {pattern:?}: {source}")
            }
            GrammarError::UnknownInclude(name) => write!(f, "unknown grammar include {name:?}"),
            GrammarError::InvalidCapture(key) => write!(f, "invalid capture index {key:?}"),
            GrammarError::MissingEnd(begin) => {
                write!(f, "rule beginning with {begin:?} has no end pattern")
            }
        }
    }
}

impl std::error::Error for GrammarError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GrammarError::Json(err) => Some(err),
            GrammarError::Regex { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGrammar {
    scope_name: String,
    #[serde(default)]
    patterns: Vec<RawRule>,
    #[serde(default)]
    repository: BTreeMap<String, RawRule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRule {
    include: Option<String>,
    name: Option<String>,
    content_name: Option<String>,
    #[serde(rename = "match")]
    pattern: Option<String>,
    begin: Option<String>,
    end: Option<String>,
    #[serde(default)]
    captures: BTreeMap<String, RawCapture>,
    #[serde(default)]
    begin_captures: BTreeMap<String, RawCapture>,
    #[serde(default)]
    end_captures: BTreeMap<String, RawCapture>,
    #[serde(default)]
    patterns: Vec<RawRule>,
}

#[derive(Debug, Deserialize)]
struct RawCapture {
    name: String,
}

struct Compiler {
    repository: HashMap<String, usize>,
    rules: Vec<Rule>,
}

impl Compiler {
    fn compile(raw: RawGrammar) -> Result<Grammar, GrammarError> {
        // Repository entries get the first ids so includes can refer to them
        // before they are compiled.
        let mut compiler = Compiler {
            repository: raw
                .repository
                .keys()
                .enumerate()
                .map(|(id, name)| (name.clone(), id))
                .collect(),
            rules: (0..raw.repository.len())
                .map(|_| Rule::Patterns(Vec::new()))
                .collect(),
        };

        for (id, rule) in raw.repository.values().enumerate() {
            compiler.rules[id] = match &rule.include {
                Some(include) => Rule::Patterns(vec![compiler.resolve(include)?]),
                None => compiler.compile_body(rule)?,
            };
        }
        let root_refs = compiler.compile_list(&raw.patterns)?;

        let mut rules = compiler.rules;
        let root = expand(&rules, &root_refs, &root_refs);
        for index in 0..rules.len() {
            let Rule::Range { patterns, .. } = &rules[index] else {
                continue;
            };
            let expanded = expand(&rules, patterns, &root_refs);
            if let Rule::Range { candidates, .. } = &mut rules[index] {
                *candidates = expanded;
            }
        }

        Ok(Grammar {
            scope_name: raw.scope_name,
            rules,
            root,
        })
    }

    fn compile_list(&mut self, list: &[RawRule]) -> Result<Vec<RuleRef>, GrammarError> {
        list.iter().map(|rule| self.compile_ref(rule)).collect()
    }

    fn compile_ref(&mut self, rule: &RawRule) -> Result<RuleRef, GrammarError> {
        if let Some(include) = &rule.include {
            return self.resolve(include);
        }
        let compiled = self.compile_body(rule)?;
        self.rules.push(compiled);
        Ok(RuleRef::Rule(self.rules.len() - 1))
    }

    fn resolve(&self, include: &str) -> Result<RuleRef, GrammarError> {
        match include {
            "$self" | "$base" => Ok(RuleRef::Root),
            _ => include
                .strip_prefix('#')
                .and_then(|name| self.repository.get(name))
                .map(|&id| RuleRef::Rule(id))
                .ok_or_else(|| GrammarError::UnknownInclude(include.to_string())),
        }
    }

    fn compile_body(&mut self, rule: &RawRule) -> Result<Rule, GrammarError> {
        if let Some(pattern) = &rule.pattern {
            return Ok(Rule::Match {
                name: rule.name.clone(),
                regex: compile_regex(pattern)?,
                captures: capture_scopes(&rule.captures)?,
            });
        }

        let Some(begin) = &rule.begin else {
            return Ok(Rule::Patterns(self.compile_list(&rule.patterns)?));
        };
        let end = rule
            .end
            .as_ref()
            .ok_or_else(|| GrammarError::MissingEnd(begin.clone()))?;
        // TextMate falls back to `captures` when the specific map is absent.
        let begin_captures = if rule.begin_captures.is_empty() {
            &rule.captures
        } else {
            &rule.begin_captures
        };
        let end_captures = if rule.end_captures.is_empty() {
            &rule.captures
        } else {
            &rule.end_captures
        };
        let patterns = self.compile_list(&rule.patterns)?;
        Ok(Rule::Range {
            name: rule.name.clone(),
            content_name: rule.content_name.clone(),
            begin: compile_regex(begin)?,
            begin_captures: capture_scopes(begin_captures)?,
            end: compile_regex(end)?,
            end_captures: capture_scopes(end_captures)?,
            patterns,
            // Filled in once every rule exists.
            candidates: Vec::new(),
        })
    }
}

fn compile_regex(pattern: &str) -> Result<Regex, GrammarError> {
    Regex::new(pattern).map_err(|source| GrammarError::Regex {
        pattern: pattern.to_string(),
        source,
    })
}

fn capture_scopes(
    captures: &BTreeMap<String, RawCapture>,
) -> Result<Vec<(usize, String)>, GrammarError> {
    let mut scopes = captures
        .iter()
        .map(|(key, capture)| {
            key.parse::<usize>()
                .map(|group| (group, capture.name.clone()))
                .map_err(|_| GrammarError::InvalidCapture(key.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    scopes.sort_by_key(|(group, _)| *group);
    Ok(scopes)
}

/// Flattens rule references into the ids of rules that actually match text,
/// keeping declaration order and dropping duplicates.
fn expand(rules: &[Rule], refs: &[RuleRef], root: &[RuleRef]) -> Vec<usize> {
    fn walk(
        rules: &[Rule],
        refs: &[RuleRef],
        root: &[RuleRef],
        depth: usize,
        seen: &mut HashSet<usize>,
        out: &mut Vec<usize>,
    ) {
        if depth > MAX_INCLUDE_DEPTH {
            return;
        }
        for rule_ref in refs {
            match *rule_ref {
                RuleRef::Root => walk(rules, root, root, depth + 1, seen, out),
                RuleRef::Rule(id) => match rules.get(id) {
                    Some(Rule::Patterns(inner)) => {
                        walk(rules, inner, root, depth + 1, seen, out)
                    }
                    Some(_) => {
                        if seen.insert(id) {
                            out.push(id);
                        }
                    }
                    None => {}
                },
            }
        }
    }

    let mut out = Vec::new();
    walk(rules, refs, root, 0, &mut HashSet::new(), &mut out);
    out
}
