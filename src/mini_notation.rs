//! Mini-notation parser.
//!
//! The grammar covers whitespace sequencing, `~` rests, `[x y]` bracketed
//! sub-sequences, `[a, b]` stacks, `x*n` replication, `x/n` slowing, `x!n`
//! repeats, `<x y>` cycle alternation, `(p, s, r)` inline Euclidean rhythms,
//! `x:n` sound indices and `x@n` weighted durations. Leaf construction is
//! delegated to an atom factory so every operator can decide what a bare
//! token means.

use crate::dsl::SourceLoc;
use crate::pattern::{Fraction, Pattern};
use std::sync::Arc;
use tracing::warn;

/// Builds a leaf pattern from an atom token and its source location.
pub type AtomFactory<T> = Arc<dyn Fn(&str, Option<&SourceLoc>) -> Pattern<T> + Send + Sync>;

/// Token types in mini-notation
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Symbol(String), // bd, sn, bd:3, c#4
    Number(f64),    // 1, 2.5, -1
    Rest,           // ~
    OpenBracket,    // [
    CloseBracket,   // ]
    OpenAngle,      // <
    CloseAngle,     // >
    OpenParen,      // (
    CloseParen,     // )
    Comma,          // ,
    Star,           // *
    Slash,          // /
    At,             // @
    Exclamation,    // !
}

struct Tokenizer {
    chars: Vec<char>,
    position: usize,
}

impl Tokenizer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            position: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    fn is_symbol_char(c: char) -> bool {
        c.is_alphanumeric() || matches!(c, '_' | '-' | '#' | '\'' | '.')
    }

    fn read_symbol(&mut self) -> String {
        let mut symbol = String::new();
        while let Some(c) = self.peek() {
            if Self::is_symbol_char(c) {
                symbol.push(c);
                self.advance();
            } else if c == ':' {
                // Sound index suffix stays part of the atom token
                symbol.push(c);
                self.advance();
            } else {
                break;
            }
        }
        symbol
    }

    fn read_number(&mut self) -> Option<f64> {
        let start = self.position;
        let mut text = String::new();
        if self.peek() == Some('-') {
            text.push('-');
            self.advance();
        }
        let mut has_dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.advance();
            } else if c == '.' && !has_dot {
                has_dot = true;
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        match text.parse() {
            Ok(n) => Some(n),
            Err(_) => {
                self.position = start;
                None
            }
        }
    }

    fn tokenize(&mut self) -> Vec<(Token, usize)> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let pos = self.position;
            let Some(ch) = self.peek() else { break };
            let token = match ch {
                '~' => {
                    self.advance();
                    Token::Rest
                }
                '[' => {
                    self.advance();
                    Token::OpenBracket
                }
                ']' => {
                    self.advance();
                    Token::CloseBracket
                }
                '<' => {
                    self.advance();
                    Token::OpenAngle
                }
                '>' => {
                    self.advance();
                    Token::CloseAngle
                }
                '(' => {
                    self.advance();
                    Token::OpenParen
                }
                ')' => {
                    self.advance();
                    Token::CloseParen
                }
                ',' => {
                    self.advance();
                    Token::Comma
                }
                '*' => {
                    self.advance();
                    Token::Star
                }
                '/' => {
                    self.advance();
                    Token::Slash
                }
                '@' => {
                    self.advance();
                    Token::At
                }
                '!' => {
                    self.advance();
                    Token::Exclamation
                }
                '-' | '0'..='9' => {
                    if let Some(n) = self.read_number() {
                        // A trailing symbol character means this was a name
                        // like 4hh, not a number
                        if matches!(self.peek(), Some(c) if Self::is_symbol_char(c) || c == ':') {
                            let rest = self.read_symbol();
                            Token::Symbol(format!("{}{}", n, rest))
                        } else {
                            Token::Number(n)
                        }
                    } else {
                        self.advance();
                        continue;
                    }
                }
                c if Self::is_symbol_char(c) => Token::Symbol(self.read_symbol()),
                _ => {
                    self.advance();
                    continue;
                }
            };
            tokens.push((token, pos));
        }
        tokens
    }
}

/// One slot of a sequence: the node plus its `@` weight and `!` replication.
#[derive(Debug, Clone)]
struct Entry {
    node: AstNode,
    weight: Fraction,
    repeat: usize,
}

#[derive(Debug, Clone)]
enum AstNode {
    Atom(String, usize),
    Rest,
    Seq(Vec<Entry>),
    Stack(Vec<AstNode>),
    Alt(Vec<AstNode>),
    Fast(Box<AstNode>, Box<AstNode>),
    Slow(Box<AstNode>, Box<AstNode>),
    Euclid {
        node: Box<AstNode>,
        pulses: Box<AstNode>,
        steps: Box<AstNode>,
        rotation: Option<Box<AstNode>>,
    },
}

struct MiniNotationParser {
    tokens: Vec<(Token, usize)>,
    position: usize,
}

impl MiniNotationParser {
    fn new(input: &str) -> Self {
        Self {
            tokens: Tokenizer::new(input).tokenize(),
            position: 0,
        }
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.position).map(|(t, _)| t);
        self.position += 1;
        token
    }

    fn parse(&mut self) -> AstNode {
        let first = self.parse_sequence();
        if matches!(self.current(), Some(Token::Comma)) {
            let mut layers = vec![first];
            while matches!(self.current(), Some(Token::Comma)) {
                self.advance();
                layers.push(self.parse_sequence());
            }
            AstNode::Stack(layers)
        } else {
            first
        }
    }

    fn parse_sequence(&mut self) -> AstNode {
        let mut entries = Vec::new();
        while let Some(token) = self.current() {
            match token {
                Token::CloseBracket | Token::CloseAngle | Token::CloseParen | Token::Comma => {
                    break
                }
                _ => {}
            }
            if let Some(entry) = self.parse_entry() {
                entries.push(entry);
            }
        }
        match entries.len() {
            0 => AstNode::Rest,
            1 if entries[0].weight == Fraction::ONE && entries[0].repeat == 1 => {
                entries.into_iter().next().unwrap().node
            }
            _ => AstNode::Seq(entries),
        }
    }

    fn parse_entry(&mut self) -> Option<Entry> {
        let node = self.parse_element()?;
        let mut entry = Entry {
            node,
            weight: Fraction::ONE,
            repeat: 1,
        };
        loop {
            match self.current() {
                Some(Token::At) => {
                    self.advance();
                    if let Some(Token::Number(n)) = self.current() {
                        entry.weight = Fraction::from_float(*n);
                        self.advance();
                    }
                }
                Some(Token::Exclamation) => {
                    self.advance();
                    if let Some(Token::Number(n)) = self.current() {
                        entry.repeat = (*n as i64).max(0) as usize;
                        self.advance();
                    } else {
                        entry.repeat = 2;
                    }
                }
                _ => break,
            }
        }
        Some(entry)
    }

    fn parse_element(&mut self) -> Option<AstNode> {
        let node = match self.current()? {
            Token::Symbol(s) => {
                let pos = self.tokens[self.position].1;
                let s = s.clone();
                self.advance();
                AstNode::Atom(s, pos)
            }
            Token::Number(n) => {
                let pos = self.tokens[self.position].1;
                let text = if n.fract() == 0.0 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                };
                self.advance();
                AstNode::Atom(text, pos)
            }
            Token::Rest => {
                self.advance();
                AstNode::Rest
            }
            Token::OpenBracket => {
                self.advance();
                let node = self.parse_group();
                if matches!(self.current(), Some(Token::CloseBracket)) {
                    self.advance();
                }
                node
            }
            Token::OpenAngle => {
                self.advance();
                let node = self.parse_alternation();
                if matches!(self.current(), Some(Token::CloseAngle)) {
                    self.advance();
                }
                node
            }
            _ => {
                self.advance();
                return None;
            }
        };
        Some(self.parse_operators(node))
    }

    /// Postfix operators following an element: `*`, `/` and `(p, s, r)`.
    fn parse_operators(&mut self, mut node: AstNode) -> AstNode {
        loop {
            match self.current() {
                Some(Token::Star) => {
                    self.advance();
                    let amount = self.parse_argument();
                    node = AstNode::Fast(Box::new(node), Box::new(amount));
                }
                Some(Token::Slash) => {
                    self.advance();
                    let amount = self.parse_argument();
                    node = AstNode::Slow(Box::new(node), Box::new(amount));
                }
                Some(Token::OpenParen) => {
                    self.advance();
                    let pulses = self.parse_sequence();
                    if !matches!(self.current(), Some(Token::Comma)) {
                        // Not a Euclid argument list; drop the group
                        while let Some(t) = self.current() {
                            if matches!(t, Token::CloseParen) {
                                self.advance();
                                break;
                            }
                            self.advance();
                        }
                        continue;
                    }
                    self.advance();
                    let steps = self.parse_sequence();
                    let rotation = if matches!(self.current(), Some(Token::Comma)) {
                        self.advance();
                        Some(Box::new(self.parse_sequence()))
                    } else {
                        None
                    };
                    if matches!(self.current(), Some(Token::CloseParen)) {
                        self.advance();
                    }
                    node = AstNode::Euclid {
                        node: Box::new(node),
                        pulses: Box::new(pulses),
                        steps: Box::new(steps),
                        rotation,
                    };
                }
                _ => break,
            }
        }
        node
    }

    fn parse_argument(&mut self) -> AstNode {
        match self.current() {
            Some(Token::Number(n)) => {
                let pos = self.tokens[self.position].1;
                let text = if n.fract() == 0.0 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                };
                self.advance();
                AstNode::Atom(text, pos)
            }
            Some(Token::OpenAngle) => {
                self.advance();
                let node = self.parse_alternation();
                if matches!(self.current(), Some(Token::CloseAngle)) {
                    self.advance();
                }
                node
            }
            Some(Token::Symbol(s)) => {
                let pos = self.tokens[self.position].1;
                let s = s.clone();
                self.advance();
                AstNode::Atom(s, pos)
            }
            _ => AstNode::Atom("1".to_string(), 0),
        }
    }

    /// `[a b c]` fast group, or `[a, b]` stack.
    fn parse_group(&mut self) -> AstNode {
        let first = self.parse_sequence();
        if matches!(self.current(), Some(Token::Comma)) {
            let mut layers = vec![first];
            while matches!(self.current(), Some(Token::Comma)) {
                self.advance();
                layers.push(self.parse_sequence());
            }
            AstNode::Stack(layers)
        } else {
            first
        }
    }

    /// `<a b c>`: one element per cycle.
    fn parse_alternation(&mut self) -> AstNode {
        let mut children = Vec::new();
        while let Some(token) = self.current() {
            if matches!(token, Token::CloseAngle) {
                break;
            }
            if let Some(child) = self.parse_element() {
                children.push(child);
            }
        }
        match children.len() {
            0 => AstNode::Rest,
            1 => children.into_iter().next().unwrap(),
            _ => AstNode::Alt(children),
        }
    }
}

fn atom_loc(base: Option<&SourceLoc>, offset: usize) -> Option<SourceLoc> {
    base.map(|loc| SourceLoc {
        label: loc.label.clone(),
        offset: loc.offset + offset,
    })
}

/// Lower an argument AST into a numeric control pattern.
fn lower_numeric(node: &AstNode, base: Option<&SourceLoc>) -> Pattern<f64> {
    match node {
        AstNode::Atom(s, pos) => match s.parse::<f64>() {
            Ok(n) => Pattern::pure(n),
            Err(_) => {
                warn!(
                    target: "tactus::mini",
                    token = s.as_str(),
                    offset = *pos,
                    "expected a numeric argument; yielding silence"
                );
                Pattern::silence()
            }
        },
        AstNode::Rest => Pattern::silence(),
        AstNode::Seq(entries) => {
            let mut weighted = Vec::new();
            for e in entries {
                let pat = lower_numeric(&e.node, base);
                for _ in 0..e.repeat {
                    weighted.push((e.weight, pat.clone()));
                }
            }
            Pattern::timecat(weighted)
        }
        AstNode::Stack(layers) => {
            Pattern::stack(layers.iter().map(|l| lower_numeric(l, base)).collect())
        }
        AstNode::Alt(children) => {
            Pattern::slowcat(children.iter().map(|c| lower_numeric(c, base)).collect())
        }
        AstNode::Fast(inner, amount) => fast_by(lower_numeric(inner, base), amount, base),
        AstNode::Slow(inner, amount) => slow_by(lower_numeric(inner, base), amount, base),
        AstNode::Euclid { node, .. } => lower_numeric(node, base),
    }
}

fn fast_by<T: Clone + Send + Sync + 'static>(
    pat: Pattern<T>,
    amount: &AstNode,
    base: Option<&SourceLoc>,
) -> Pattern<T> {
    if let AstNode::Atom(s, _) = amount {
        if let Ok(n) = s.parse::<f64>() {
            return pat.fast(Fraction::from_float(n));
        }
    }
    lower_numeric(amount, base)
        .fmap(move |k| pat.clone().fast(Fraction::from_float(*k)))
        .inner_join()
}

fn slow_by<T: Clone + Send + Sync + 'static>(
    pat: Pattern<T>,
    amount: &AstNode,
    base: Option<&SourceLoc>,
) -> Pattern<T> {
    if let AstNode::Atom(s, _) = amount {
        if let Ok(n) = s.parse::<f64>() {
            return pat.slow(Fraction::from_float(n));
        }
    }
    lower_numeric(amount, base)
        .fmap(move |k| pat.clone().slow(Fraction::from_float(*k)))
        .inner_join()
}

fn lower<T: Clone + Send + Sync + 'static>(
    node: &AstNode,
    base: Option<&SourceLoc>,
    factory: &AtomFactory<T>,
) -> Pattern<T> {
    match node {
        AstNode::Atom(s, pos) => {
            let loc = atom_loc(base, *pos);
            factory(s, loc.as_ref())
        }
        AstNode::Rest => Pattern::silence(),
        AstNode::Seq(entries) => {
            let mut weighted = Vec::new();
            for e in entries {
                let pat = lower(&e.node, base, factory);
                for _ in 0..e.repeat {
                    weighted.push((e.weight, pat.clone()));
                }
            }
            Pattern::timecat(weighted)
        }
        AstNode::Stack(layers) => {
            Pattern::stack(layers.iter().map(|l| lower(l, base, factory)).collect())
        }
        AstNode::Alt(children) => {
            Pattern::slowcat(children.iter().map(|c| lower(c, base, factory)).collect())
        }
        AstNode::Fast(inner, amount) => fast_by(lower(inner, base, factory), amount, base),
        AstNode::Slow(inner, amount) => slow_by(lower(inner, base, factory), amount, base),
        AstNode::Euclid {
            node,
            pulses,
            steps,
            rotation,
        } => {
            let rot = rotation
                .as_ref()
                .map(|r| lower_numeric(r, base))
                .unwrap_or_else(|| Pattern::pure(0.0));
            lower(node, base, factory).euclid_with(
                lower_numeric(pulses, base),
                lower_numeric(steps, base),
                rot,
            )
        }
    }
}

/// Parse mini-notation with a caller-supplied atom factory.
pub fn parse_mini_notation_with<T: Clone + Send + Sync + 'static>(
    input: &str,
    base_loc: Option<SourceLoc>,
    factory: AtomFactory<T>,
) -> Pattern<T> {
    let ast = MiniNotationParser::new(input).parse();
    lower(&ast, base_loc.as_ref(), &factory)
}

/// Parse mini-notation into a plain pattern of atom tokens.
pub fn parse_mini_notation(input: &str) -> Pattern<String> {
    parse_mini_notation_with(
        input,
        None,
        Arc::new(|token: &str, _loc: Option<&SourceLoc>| Pattern::pure(token.to_string())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{Fraction, TimeSpan};

    fn frac(n: i64, d: i64) -> Fraction {
        Fraction::new(n, d)
    }

    fn values(p: &Pattern<String>, cycle: i64) -> Vec<String> {
        p.query_span(Fraction::from_int(cycle), Fraction::from_int(cycle + 1))
            .into_iter()
            .map(|h| h.value)
            .collect()
    }

    #[test]
    fn test_simple_sequence() {
        let p = parse_mini_notation("bd sn hh cp");
        assert_eq!(values(&p, 0), vec!["bd", "sn", "hh", "cp"]);
        let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
        assert_eq!(haps[1].part, TimeSpan::new(frac(1, 4), frac(1, 2)));
        assert_eq!(p.num_steps(), Some(frac(4, 1)));
    }

    #[test]
    fn test_rests_occupy_time() {
        let p = parse_mini_notation("bd ~ sn ~");
        let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
        assert_eq!(haps.len(), 2);
        assert_eq!(haps[1].part.begin, frac(1, 2));
    }

    #[test]
    fn test_groups_subdivide() {
        let p = parse_mini_notation("bd [sn sn] hh");
        let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
        assert_eq!(haps.len(), 4);
        assert_eq!(haps[0].part.duration(), frac(1, 3));
        assert_eq!(haps[1].part.duration(), frac(1, 6));
        assert_eq!(haps[2].part.duration(), frac(1, 6));
    }

    #[test]
    fn test_bracket_stack() {
        let p = parse_mini_notation("[bd cp, hh hh hh]");
        let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
        assert_eq!(haps.len(), 5);
    }

    #[test]
    fn test_alternation_per_cycle() {
        let p = parse_mini_notation("<bd sn cp>");
        assert_eq!(values(&p, 0), vec!["bd"]);
        assert_eq!(values(&p, 1), vec!["sn"]);
        assert_eq!(values(&p, 2), vec!["cp"]);
        assert_eq!(values(&p, 3), vec!["bd"]);
    }

    #[test]
    fn test_replication() {
        let p = parse_mini_notation("bd!3 sn");
        assert_eq!(values(&p, 0), vec!["bd", "bd", "bd", "sn"]);
    }

    #[test]
    fn test_star_speeds_up() {
        let p = parse_mini_notation("bd*4");
        assert_eq!(values(&p, 0).len(), 4);
    }

    #[test]
    fn test_slash_slows_down() {
        let p = parse_mini_notation("bd/2");
        // The slowed event spans two cycles; only the first carries the onset
        let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
        assert_eq!(haps.len(), 1);
        assert!(haps[0].has_onset());
        let haps = p.query_span(Fraction::ONE, frac(2, 1));
        assert_eq!(haps.len(), 1);
        assert!(!haps[0].has_onset());
    }

    #[test]
    fn test_weighted_duration() {
        let p = parse_mini_notation("bd@3 sn");
        let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
        assert_eq!(haps[0].part, TimeSpan::new(frac(0, 1), frac(3, 4)));
        assert_eq!(haps[1].part, TimeSpan::new(frac(3, 4), frac(1, 1)));
    }

    #[test]
    fn test_sound_index_kept_in_token() {
        let p = parse_mini_notation("bd:3 sn:1");
        assert_eq!(values(&p, 0), vec!["bd:3", "sn:1"]);
    }

    #[test]
    fn test_inline_euclid() {
        let p = parse_mini_notation("bd(3,8)");
        let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
        let onsets: Vec<Fraction> = haps.iter().map(|h| h.part.begin).collect();
        assert_eq!(onsets, vec![frac(0, 1), frac(3, 8), frac(6, 8)]);
    }

    #[test]
    fn test_euclid_with_alternating_pulses() {
        let p = parse_mini_notation("bd(<3 4>,8)");
        assert_eq!(values(&p, 0).len(), 3);
        assert_eq!(values(&p, 1).len(), 4);
    }

    #[test]
    fn test_alternating_replication_amount() {
        let p = parse_mini_notation("bd*<2 3>");
        assert_eq!(values(&p, 0).len(), 2);
        assert_eq!(values(&p, 1).len(), 3);
    }

    #[test]
    fn test_negative_number_atom() {
        let p = parse_mini_notation("-1 0 1");
        assert_eq!(values(&p, 0), vec!["-1", "0", "1"]);
    }
}
