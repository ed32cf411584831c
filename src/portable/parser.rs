//! Parser engine
//!
//! A backtracking PEG engine over the atom arena of a [`Grammar`]. Literal and
//! regex terminals are matched directly; [`Atom::External`] terminals are
//! delegated to an [`ExternalScanner`] together with the scanner state, which
//! the engine snapshots at every backtracking point.
//!
//! The engine never fails. The root of the grammar must be a node wrapping a
//! repetition; the driver feeds that repetition one top-level item at a time,
//! and when an item cannot be matched the offending byte becomes an `ERROR`
//! token. When a budget runs out the items committed so far are kept and the
//! rest of the input becomes a single `ERROR` token.

use std::sync::Arc;
use std::time::Instant;

use super::{
    error::ParseError,
    grammar::{Assoc, Atom, Grammar},
    incremental::{InputEdit, ReuseIndex},
    regex_cache,
    scanner::{Cursor, ExternalKind, ExternalScanner, ExternalSet, ScannerState},
    syntax_kind::SyntaxKind,
    tree::{BuilderMark, ReuseInfo, Tree, TreeBuilder},
};

/// Logging macros - no-op when logging feature is disabled
#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

/// Logging macros - use log crate when logging feature is enabled
#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

pub(crate) use log_debug;

/// Default maximum input size: 100 MB
pub const DEFAULT_MAX_INPUT_SIZE: usize = 100 * 1024 * 1024;

/// Default maximum node nesting
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 10_000;

/// Grow the stack when less than this remains
const STACK_RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment
const STACK_SEGMENT: usize = 1024 * 1024;

/// Default timeout in milliseconds (0 = no timeout)
pub const DEFAULT_TIMEOUT_MS: u64 = 0;

/// Check interval for timeout (number of parse operations between checks)
const TIMEOUT_CHECK_INTERVAL: usize = 1024;

/// Configuration options for the parser
///
/// Use [`ParserConfig::default()`] for sensible defaults, or customize
/// individual fields as needed.
///
/// # Example
///
/// ```rust
/// use shopware_twig::ParserConfig;
///
/// let config = ParserConfig::new()
///     .with_max_operations(1_000_000)
///     .with_max_byte_offset(64 * 1024);
/// assert_eq!(config.max_operations, Some(1_000_000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    /// Maximum allowed input size in bytes
    pub max_input_size: usize,

    /// Maximum allowed node nesting
    pub max_recursion_depth: usize,

    /// Timeout in milliseconds (0 = no timeout)
    pub timeout_ms: u64,

    /// Maximum number of rule invocations
    pub max_operations: Option<usize>,

    /// No rule is started past this byte offset
    pub max_byte_offset: Option<usize>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_input_size: DEFAULT_MAX_INPUT_SIZE,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_operations: None,
            max_byte_offset: None,
        }
    }
}

impl ParserConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum input size
    pub fn with_max_input_size(mut self, size: usize) -> Self {
        self.max_input_size = size;
        self
    }

    /// Set the maximum recursion depth
    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    /// Set the timeout in milliseconds
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Set the operation ceiling
    pub fn with_max_operations(mut self, operations: usize) -> Self {
        self.max_operations = Some(operations);
        self
    }

    /// Set the byte offset ceiling
    pub fn with_max_byte_offset(mut self, offset: usize) -> Self {
        self.max_byte_offset = Some(offset);
        self
    }
}

/// Counters collected during one parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Rule invocations
    pub operations: usize,
    /// Nodes taken over from the previous tree
    pub reused_nodes: usize,
    /// Bytes covered by reused nodes
    pub reused_bytes: usize,
}

/// Outcome of one atom: `Some(end)` on a match, `None` on no match.
/// `Err` aborts the whole parse.
type Step = Result<Option<usize>, ParseError>;

struct Checkpoint {
    tree: BuilderMark,
    state: Arc<ScannerState>,
}

/// The parser engine
pub struct Parser<'a> {
    grammar: &'a Grammar,
    scanner: &'a dyn ExternalScanner,
    input: &'a [u8],
    config: ParserConfig,
    builder: TreeBuilder,

    /// Shared with checkpoints; cloned on write
    state: Arc<ScannerState>,

    /// Furthest byte looked at (exclusive)
    examined: usize,

    /// Open nodes
    depth: usize,
    /// > 0: terminals do not skip whitespace
    immediate: u32,
    /// > 0: terminals emit no tokens
    silent: u32,

    start_time: Option<Instant>,
    stats: ParseStats,
    reuse: Option<ReuseIndex<'a>>,
}

impl<'a> Parser<'a> {
    /// Create a parser with default limits
    pub fn new(
        grammar: &'a Grammar,
        scanner: &'a dyn ExternalScanner,
        input: &'a [u8],
    ) -> Self {
        Self {
            grammar,
            scanner,
            input,
            config: ParserConfig::default(),
            builder: TreeBuilder::with_capacity(input.len()),
            state: Arc::new(ScannerState::new()),
            examined: 0,
            depth: 0,
            immediate: 0,
            silent: 0,
            start_time: None,
            stats: ParseStats::default(),
            reuse: None,
        }
    }

    /// Replace the limits
    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Reuse unaffected nodes of `old_tree`, which was parsed from the
    /// document before `edits` were applied
    pub fn with_previous_tree(mut self, old_tree: &'a Tree, edits: &[InputEdit]) -> Self {
        self.reuse = Some(ReuseIndex::build(old_tree, edits));
        self
    }

    /// Parse the whole input
    pub fn parse(self) -> Tree {
        self.parse_with_stats().0
    }

    /// Parse the whole input and report counters
    pub fn parse_with_stats(mut self) -> (Tree, ParseStats) {
        let len = self.input.len();
        log_debug!(
            "parse start: {} bytes, {} reusable nodes",
            len,
            self.reuse.as_ref().map_or(0, |r| r.len())
        );

        if len > self.config.max_input_size {
            let err = ParseError::InputTooLarge {
                input_size: len,
                max_size: self.config.max_input_size,
            };
            return self.abandon(SyntaxKind::Template, 0, err);
        }

        let (root_kind, item) = match self.root_shape() {
            Ok(shape) => shape,
            Err(err) => return self.abandon(SyntaxKind::Template, 0, err),
        };

        self.start_time = Some(Instant::now());
        let mut pos = 0;
        while pos < len {
            let start = self.skip_trivia(pos);
            if start >= len {
                self.emit_trivia(pos, start);
                break;
            }

            let cp = self.checkpoint();
            match self.try_atom(item, pos) {
                Ok(Some(end)) if end > pos => pos = end,
                Ok(_) => {
                    self.rollback(cp);
                    self.emit_trivia(pos, start);
                    self.builder.token(SyntaxKind::Error, start, start + 1);
                    pos = start + 1;
                }
                Err(err) => {
                    self.rollback(cp);
                    return self.abandon(root_kind, pos, err);
                }
            }
        }

        log_debug!(
            "parse done: {} operations, {} reused nodes",
            self.stats.operations,
            self.stats.reused_nodes
        );
        let stats = self.stats;
        let state = Arc::unwrap_or_clone(self.state);
        (self.builder.finish(root_kind, len, state, None), stats)
    }

    /// Stop at `pos`: the rest of the input becomes one error token
    fn abandon(mut self, root_kind: SyntaxKind, pos: usize, err: ParseError) -> (Tree, ParseStats) {
        log_debug!("parse stopped at {}: {}", pos, err);
        let len = self.input.len();
        self.builder.token(SyntaxKind::Error, pos, len);
        let stats = self.stats;
        let state = Arc::unwrap_or_clone(self.state);
        (self.builder.finish(root_kind, len, state, Some(err)), stats)
    }

    fn root_shape(&self) -> Result<(SyntaxKind, usize), ParseError> {
        if let Some(Atom::Node { kind, atom }) = self.grammar.root_atom() {
            if let Some(Atom::Repetition {
                atom: item,
                min: 0,
                max: None,
            }) = self.grammar.get_atom(*atom)
            {
                return Ok((*kind, *item));
            }
        }
        Err(ParseError::InvalidGrammar {
            reason: "root must be a node wrapping an unbounded repetition".to_string(),
        })
    }

    // ========================================================================
    // Bookkeeping
    // ========================================================================

    #[inline]
    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            tree: self.builder.mark(),
            state: Arc::clone(&self.state),
        }
    }

    #[inline]
    fn rollback(&mut self, cp: Checkpoint) {
        self.builder.restore(cp.tree);
        self.state = cp.state;
    }

    #[inline]
    fn mark_examined(&mut self, end: usize) {
        if end > self.examined {
            self.examined = end;
        }
    }

    /// Count one operation and enforce the budget
    fn tick(&mut self, pos: usize) -> Result<(), ParseError> {
        self.stats.operations += 1;
        let ops = self.stats.operations;

        if let Some(max) = self.config.max_operations {
            if ops > max {
                return Err(ParseError::OperationLimitExceeded {
                    operations: ops,
                    max_operations: max,
                });
            }
        }
        if let Some(max) = self.config.max_byte_offset {
            if pos > max {
                return Err(ParseError::ByteOffsetLimitExceeded {
                    offset: pos,
                    max_offset: max,
                });
            }
        }
        if self.config.timeout_ms > 0 && ops % TIMEOUT_CHECK_INTERVAL == 0 {
            if let Some(start) = self.start_time {
                let elapsed = start.elapsed().as_millis() as u64;
                if elapsed > self.config.timeout_ms {
                    return Err(ParseError::TimeoutExceeded {
                        elapsed_ms: elapsed,
                        timeout_ms: self.config.timeout_ms,
                    });
                }
            }
        }
        Ok(())
    }

    /// End of the whitespace run at `pos`, or `pos` inside immediate atoms
    fn skip_trivia(&mut self, pos: usize) -> usize {
        if self.immediate > 0 {
            return pos;
        }
        let end = pos
            + self.input[pos.min(self.input.len())..]
                .iter()
                .take_while(|b| b.is_ascii_whitespace())
                .count();
        self.mark_examined(end + 1);
        end
    }

    #[inline]
    fn emit_trivia(&mut self, from: usize, to: usize) {
        if self.silent == 0 {
            self.builder.token(SyntaxKind::Whitespace, from, to);
        }
    }

    #[inline]
    fn emit(&mut self, kind: SyntaxKind, start: usize, end: usize) {
        if self.silent == 0 {
            let kind = self.grammar.alias(kind);
            self.builder.token(kind, start, end);
        }
    }

    // ========================================================================
    // Atom dispatch
    // ========================================================================

    /// Try to match an atom at the given position
    fn try_atom(&mut self, atom_id: usize, pos: usize) -> Step {
        self.tick(pos)?;
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || {
            self.parse_atom(atom_id, pos)
        })
    }

    fn parse_atom(&mut self, atom_id: usize, pos: usize) -> Step {
        let grammar = self.grammar;
        match grammar.get_atom(atom_id) {
            Some(atom) => match atom {
                Atom::Str { pattern } => Ok(self.parse_str(pattern, pos, false)),
                Atom::Keyword { pattern } => Ok(self.parse_str(pattern, pos, true)),
                Atom::Re { pattern } => self.parse_re(pattern, pos),
                Atom::Sequence { atoms } => self.parse_sequence(atoms, pos),
                Atom::Alternative { atoms } => self.parse_alternative(atoms, pos),
                Atom::Repetition { atom, min, max } => {
                    self.parse_repetition(*atom, *min, *max, pos)
                }
                Atom::Entity { atom } | Atom::Precedence { atom, .. } => {
                    self.try_atom(*atom, pos)
                }
                Atom::Lookahead { atom, positive } => self.parse_lookahead(*atom, *positive, pos),
                Atom::Node { kind, atom } => self.parse_node(atom_id, *kind, *atom, pos),
                Atom::Leaf { kind, atom } => self.parse_leaf(*kind, *atom, pos),
                Atom::External { kind } => Ok(self.parse_external(*kind, pos)),
                Atom::Immediate { atom } => {
                    self.immediate += 1;
                    let result = self.try_atom(*atom, pos);
                    self.immediate -= 1;
                    result
                }
                Atom::Error => Ok(self.parse_error_byte(pos)),
            },
            None => Err(ParseError::Internal {
                message: format!("Invalid atom ID {}", atom_id),
            }),
        }
    }

    // ========================================================================
    // Terminals
    // ========================================================================

    /// Parse a literal string, optionally as a keyword
    fn parse_str(&mut self, pattern: &str, pos: usize, keyword: bool) -> Option<usize> {
        let start = self.skip_trivia(pos);
        let pattern_bytes = pattern.as_bytes();
        let end = start + pattern_bytes.len();

        if end > self.input.len() {
            self.mark_examined(self.input.len() + 1);
            return None;
        }
        self.mark_examined(end);
        if &self.input[start..end] != pattern_bytes {
            return None;
        }
        if keyword {
            self.mark_examined(end + 1);
            if matches!(self.input.get(end), Some(b) if b.is_ascii_alphanumeric() || *b == b'_')
            {
                return None;
            }
        }

        self.emit_trivia(pos, start);
        self.emit(SyntaxKind::from_literal(pattern), start, end);
        Some(end)
    }

    /// Parse a regular expression pattern
    ///
    /// The regex engine does not report how far it looked. A failed match is
    /// taken to have looked up to the first whitespace or angle bracket after
    /// the first byte; a successful one through the whitespace after its end.
    /// No pattern of the grammar backtracks across those bytes.
    fn parse_re(&mut self, pattern: &str, pos: usize) -> Step {
        let start = self.skip_trivia(pos);
        let regex = regex_cache::get_or_compile(pattern).ok_or_else(|| ParseError::Internal {
            message: format!("Invalid regex pattern: {}", pattern),
        })?;

        let rest = &self.input[start.min(self.input.len())..];
        match regex.find(rest).map(|m| m.end()).filter(|&n| n > 0) {
            Some(n) => {
                let end = start + n;
                let tail = self.input[end..]
                    .iter()
                    .take_while(|b| b.is_ascii_whitespace())
                    .count();
                self.mark_examined(end + tail + 1);
                self.emit_trivia(pos, start);
                self.emit(SyntaxKind::Anonymous, start, end);
                Ok(Some(end))
            }
            None => {
                let run = rest
                    .iter()
                    .skip(1)
                    .take_while(|b| !b.is_ascii_whitespace() && **b != b'<' && **b != b'>')
                    .count();
                self.mark_examined(start + run + 2);
                Ok(None)
            }
        }
    }

    /// Ask the scanner for an external token
    fn parse_external(&mut self, kind: ExternalKind, pos: usize) -> Option<usize> {
        let start = if kind.skips_trivia() {
            self.skip_trivia(pos)
        } else {
            pos
        };

        let saved = Arc::clone(&self.state);
        let mut cursor = Cursor::new(self.input, start);
        let scanned = self.scanner.scan(
            &mut cursor,
            ExternalSet::only(kind),
            Arc::make_mut(&mut self.state),
        );
        self.mark_examined(cursor.examined());

        match scanned {
            Some(token) if token.kind == kind && token.end >= start => {
                self.emit_trivia(pos, start);
                self.emit(kind.syntax_kind(), start, token.end);
                Some(token.end)
            }
            _ => {
                self.state = saved;
                None
            }
        }
    }

    /// One byte that nothing else accepted
    fn parse_error_byte(&mut self, pos: usize) -> Option<usize> {
        let start = self.skip_trivia(pos);
        if start >= self.input.len() {
            self.mark_examined(self.input.len() + 1);
            return None;
        }
        self.mark_examined(start + 1);
        self.emit_trivia(pos, start);
        if self.silent == 0 {
            self.builder.token(SyntaxKind::Error, start, start + 1);
        }
        Some(start + 1)
    }

    // ========================================================================
    // Combinators
    // ========================================================================

    /// Parse a sequence of atoms
    fn parse_sequence(&mut self, atoms: &[usize], pos: usize) -> Step {
        let cp = self.checkpoint();
        let mut current_pos = pos;
        for &atom_id in atoms {
            match self.try_atom(atom_id, current_pos)? {
                Some(end) => current_pos = end,
                None => {
                    self.rollback(cp);
                    return Ok(None);
                }
            }
        }
        Ok(Some(current_pos))
    }

    fn precedence_of(&self, atom_id: usize) -> (i32, Assoc) {
        match self.grammar.get_atom(atom_id) {
            Some(Atom::Precedence {
                priority, assoc, ..
            }) => (*priority, *assoc),
            _ => (0, Assoc::None),
        }
    }

    /// Parse alternatives (ordered choice)
    ///
    /// When the matching alternative belongs to a precedence level containing
    /// a right-associative member, every alternative of that level is tried
    /// and the longest match wins; ties go to the earlier one.
    fn parse_alternative(&mut self, atoms: &[usize], pos: usize) -> Step {
        for (i, &atom_id) in atoms.iter().enumerate() {
            let cp = self.checkpoint();
            let Some(end) = self.try_atom(atom_id, pos)? else {
                self.rollback(cp);
                continue;
            };

            let (priority, _) = self.precedence_of(atom_id);
            let level: Vec<usize> = atoms[i + 1..]
                .iter()
                .copied()
                .take_while(|&other| self.precedence_of(other).0 == priority)
                .collect();
            let longest_wins = std::iter::once(atom_id)
                .chain(level.iter().copied())
                .any(|a| self.precedence_of(a).1 == Assoc::Right);
            if !longest_wins || level.is_empty() {
                return Ok(Some(end));
            }

            let mut best = (end, atom_id);
            for &other in &level {
                self.rollback(Checkpoint {
                    tree: cp.tree,
                    state: Arc::clone(&cp.state),
                });
                if let Some(other_end) = self.try_atom(other, pos)? {
                    if other_end > best.0 {
                        best = (other_end, other);
                    }
                }
            }
            self.rollback(cp);
            return self.try_atom(best.1, pos);
        }
        Ok(None)
    }

    /// Parse repetition (greedy, with min/max)
    fn parse_repetition(
        &mut self,
        atom_id: usize,
        min: usize,
        max: Option<usize>,
        pos: usize,
    ) -> Step {
        let start_cp = self.checkpoint();
        let mut current_pos = pos;
        let mut count = 0;

        while max.map_or(true, |m| count < m) {
            let cp = self.checkpoint();
            match self.try_atom(atom_id, current_pos)? {
                Some(end) => {
                    count += 1;
                    let progressed = end > current_pos;
                    current_pos = end;
                    if !progressed {
                        break;
                    }
                }
                None => {
                    self.rollback(cp);
                    break;
                }
            }
        }

        if count < min {
            self.rollback(start_cp);
            return Ok(None);
        }
        Ok(Some(current_pos))
    }

    fn parse_lookahead(&mut self, atom_id: usize, positive: bool, pos: usize) -> Step {
        let cp = self.checkpoint();
        let matched = self.try_atom(atom_id, pos)?.is_some();
        self.rollback(cp);
        Ok((matched == positive).then_some(pos))
    }

    /// Collapse the inner match into one token
    fn parse_leaf(&mut self, kind: SyntaxKind, atom_id: usize, pos: usize) -> Step {
        let start = self.skip_trivia(pos);
        self.silent += 1;
        self.immediate += 1;
        let result = self.try_atom(atom_id, start);
        self.silent -= 1;
        self.immediate -= 1;

        match result? {
            Some(end) => {
                self.emit_trivia(pos, start);
                self.emit(kind, start, end);
                Ok(Some(end))
            }
            None => Ok(None),
        }
    }

    /// Wrap the inner match in a node, or take it over from the old tree
    fn parse_node(&mut self, node_atom: usize, kind: SyntaxKind, inner: usize, pos: usize) -> Step {
        if self.silent > 0 {
            return self.try_atom(inner, pos);
        }
        if self.immediate == 0 {
            if let Some(end) = self.try_reuse(node_atom, pos) {
                return Ok(Some(end));
            }
        }

        self.depth += 1;
        if self.depth > self.config.max_recursion_depth {
            let depth = self.depth;
            self.depth -= 1;
            return Err(ParseError::RecursionLimitExceeded {
                depth,
                max_depth: self.config.max_recursion_depth,
            });
        }

        let from = self.builder.stack_len();
        let state_before = Arc::clone(&self.state);
        let outer_examined = self.examined;
        self.examined = pos;

        let result = self.try_atom(inner, pos);
        self.depth -= 1;

        let node_examined = self.examined;
        self.examined = outer_examined.max(node_examined);

        let Some(end) = result? else {
            return Ok(None);
        };
        let reuse = (self.immediate == 0).then(|| ReuseInfo {
            atom: node_atom,
            parse_start: pos,
            parse_end: end,
            examined_end: node_examined,
            state_before,
            state_after: Arc::clone(&self.state),
        });
        self.builder.close_node(kind, from, reuse);
        Ok(Some(end))
    }

    fn try_reuse(&mut self, node_atom: usize, pos: usize) -> Option<usize> {
        let index = self.reuse.as_ref()?;
        let candidate = index.lookup(pos, node_atom, &self.state)?;
        if candidate.parse_end > self.input.len() {
            return None;
        }
        let old = index.old_tree();

        log_debug!(
            "reusing node at {}..{}",
            candidate.parse_start,
            candidate.parse_end
        );
        self.emit_trivia(pos, candidate.node_start);
        self.builder.graft(old, candidate.node, candidate.delta);
        self.emit_trivia(candidate.node_end, candidate.parse_end);

        self.state = candidate.state_after;
        self.mark_examined(candidate.examined_end);
        self.stats.reused_nodes += 1;
        self.stats.reused_bytes += candidate.parse_end - candidate.parse_start;
        Some(candidate.parse_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portable::parser_dsl::*;
    use crate::portable::scanner::ScannedToken;

    /// Scanner that recognizes `!` as a zero-width implicit end tag and
    /// nothing else
    struct BangScanner;

    impl ExternalScanner for BangScanner {
        fn scan(
            &self,
            cursor: &mut Cursor<'_>,
            valid: ExternalSet,
            state: &mut ScannerState,
        ) -> Option<ScannedToken> {
            if valid.contains(ExternalKind::ImplicitEndTag) && cursor.peek() == Some(b'!') {
                state.push(Arc::from("BANG"), cursor.pos());
                return Some(ScannedToken {
                    kind: ExternalKind::ImplicitEndTag,
                    end: cursor.pos(),
                });
            }
            None
        }

        fn description(&self) -> &str {
            "bang"
        }
    }

    fn words() -> Grammar {
        GrammarBuilder::new()
            .rule("doc", node(SyntaxKind::Template, ref_("item").many()))
            .rule(
                "item",
                oneof![
                    node(
                        SyntaxKind::Arguments,
                        all![str("("), leaf(SyntaxKind::Variable, re("[a-z]+")).many(), str(")")]
                    ),
                    leaf(SyntaxKind::Content, re("[a-z]+")),
                    prec(-1, error_byte()),
                ],
            )
            .build()
    }

    fn parse(grammar: &Grammar, input: &str) -> Tree {
        Parser::new(grammar, &BangScanner, input.as_bytes()).parse()
    }

    #[test]
    fn test_nodes_leaves_and_trivia() {
        let grammar = words();
        let tree = parse(&grammar, " (ab cd) ef ");
        assert_eq!(
            tree.to_sexp(),
            "(template (arguments (variable) (variable)) (content))"
        );
        let args = tree.root_node().child_node(SyntaxKind::Arguments).unwrap();
        assert_eq!(args.byte_range(), 1..8);
        assert_eq!(tree.tokens().len(), 9);
        assert!(!tree.is_partial());
    }

    #[test]
    fn test_error_bytes_keep_going() {
        let grammar = words();
        let tree = parse(&grammar, "ab ( 9 cd");
        assert_eq!(
            tree.to_sexp(),
            "(template (content) (ERROR) (ERROR) (content))"
        );
        let mut at = 0;
        for token in tree.tokens() {
            assert_eq!(token.start_byte(), at);
            at = token.end_byte();
        }
        assert_eq!(at, 9);
    }

    #[test]
    fn test_empty_input() {
        let grammar = words();
        let tree = parse(&grammar, "");
        assert_eq!(tree.to_sexp(), "(template)");
        assert_eq!(tree.root_node().byte_range(), 0..0);
    }

    #[test]
    fn test_keyword_boundary() {
        let grammar = GrammarBuilder::new()
            .rule(
                "doc",
                node(
                    SyntaxKind::Template,
                    oneof![
                        leaf(SyntaxKind::Conditional, keyword("if")),
                        leaf(SyntaxKind::Variable, re("[a-z]+")),
                        error_byte(),
                    ]
                    .many(),
                ),
            )
            .build();
        let tree = parse(&grammar, "if iffy");
        assert_eq!(tree.to_sexp(), "(template (conditional) (variable))");
    }

    #[test]
    fn test_right_assoc_prefers_longest() {
        let grammar = GrammarBuilder::new()
            .rule(
                "doc",
                node(
                    SyntaxKind::Template,
                    oneof![
                        prec_right(1, leaf(SyntaxKind::Tag, str("ab"))),
                        prec_right(1, leaf(SyntaxKind::Variable, re("[a-z]+"))),
                        error_byte(),
                    ]
                    .many(),
                ),
            )
            .build();
        let tree = parse(&grammar, "abc ab");
        assert_eq!(tree.to_sexp(), "(template (variable) (tag))");
    }

    #[test]
    fn test_scanner_state_rolls_back() {
        let grammar = GrammarBuilder::new()
            .rule(
                "doc",
                node(
                    SyntaxKind::Template,
                    oneof![
                        external(ExternalKind::ImplicitEndTag).then(str("?")),
                        error_byte(),
                    ]
                    .many(),
                ),
            )
            .build();

        let tree = parse(&grammar, "!");
        assert_eq!(tree.final_state().depth(), 0);
        assert_eq!(tree.to_sexp(), "(template (ERROR))");

        let tree = parse(&grammar, "?");
        assert_eq!(tree.final_state().depth(), 0);
    }

    #[test]
    fn test_operation_budget_yields_partial_tree() {
        let grammar = words();
        let input = "ab cd ef gh ij kl mn op";
        let tree = Parser::new(&grammar, &BangScanner, input.as_bytes())
            .with_config(ParserConfig::new().with_max_operations(12))
            .parse();

        assert!(tree.is_partial());
        assert!(matches!(
            tree.stop_reason(),
            Some(ParseError::OperationLimitExceeded { .. })
        ));
        let last = *tree.tokens().last().unwrap();
        assert_eq!(last.kind(), SyntaxKind::Error);
        assert_eq!(last.end_byte(), input.len());
        assert_eq!(tree.root_node().byte_range(), 0..input.len());
    }

    #[test]
    fn test_byte_offset_budget() {
        let grammar = words();
        let tree = Parser::new(&grammar, &BangScanner, b"ab cd ef")
            .with_config(ParserConfig::new().with_max_byte_offset(3))
            .parse();
        assert!(matches!(
            tree.stop_reason(),
            Some(ParseError::ByteOffsetLimitExceeded { .. })
        ));
        assert_eq!(tree.to_sexp(), "(template (content) (content) (ERROR))");
    }

    #[test]
    fn test_input_too_large() {
        let grammar = words();
        let tree = Parser::new(&grammar, &BangScanner, b"abcdef")
            .with_config(ParserConfig::new().with_max_input_size(4))
            .parse();
        assert!(matches!(
            tree.stop_reason(),
            Some(ParseError::InputTooLarge { .. })
        ));
        assert_eq!(tree.to_sexp(), "(template (ERROR))");
    }

    #[test]
    fn test_recursion_limit() {
        let grammar = GrammarBuilder::new()
            .rule("doc", node(SyntaxKind::Template, ref_("nest").many()))
            .rule(
                "nest",
                node(
                    SyntaxKind::Arguments,
                    all![str("("), ref_("nest").optional(), str(")")],
                ),
            )
            .build();
        let deep = "(".repeat(200) + &")".repeat(200);
        let tree = Parser::new(&grammar, &BangScanner, deep.as_bytes())
            .with_config(ParserConfig::new().with_max_recursion_depth(50))
            .parse();
        assert!(matches!(
            tree.stop_reason(),
            Some(ParseError::RecursionLimitExceeded { .. })
        ));

        let shallow = "((()))";
        let tree = parse(&grammar, shallow);
        assert_eq!(
            tree.to_sexp(),
            "(template (arguments (arguments (arguments))))"
        );
    }

    #[test]
    fn test_invalid_root() {
        let grammar = GrammarBuilder::new().rule("doc", str("x")).build();
        let tree = parse(&grammar, "x");
        assert!(matches!(
            tree.stop_reason(),
            Some(ParseError::InvalidGrammar { .. })
        ));
    }

    #[test]
    fn test_stats_count_operations() {
        let grammar = words();
        let (_, stats) = Parser::new(&grammar, &BangScanner, b"ab").parse_with_stats();
        assert!(stats.operations > 0);
        assert_eq!(stats.reused_nodes, 0);
    }
}
