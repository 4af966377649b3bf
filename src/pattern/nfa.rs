//! Thompson-style automaton stored as an arena of states.
//!
//! States are addressed by [`StateId`] and own their outgoing transitions, so
//! the loop constructs (`*`, `+`) are plain back edges rather than shared
//! ownership cycles.

use std::collections::HashSet;

use super::lexer::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(u32);

impl StateId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Epsilon,
    Byte(u8),
    Any,
}

impl Edge {
    #[inline]
    pub fn accepts(&self, byte: u8) -> bool {
        match *self {
            Edge::Byte(b) => b == byte,
            Edge::Any => true,
            Edge::Epsilon => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transition {
    pub target: StateId,
    pub edge: Edge,
}

#[derive(Debug, Clone)]
pub struct Nfa {
    states: Vec<Vec<Transition>>,
    start: StateId,
    end: StateId,
}

impl Nfa {
    #[inline]
    pub fn start(&self) -> StateId {
        self.start
    }

    #[inline]
    pub fn end(&self) -> StateId {
        self.end
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state_ids(&self) -> impl Iterator<Item = StateId> + '_ {
        (0..self.states.len() as u32).map(StateId)
    }

    #[inline]
    pub fn transitions(&self, state: StateId) -> &[Transition] {
        &self.states[state.index()]
    }

    /// All states reachable from `state` through epsilon edges, `state`
    /// included. Loops are walked once.
    pub fn epsilon_closure(&self, state: StateId) -> Vec<StateId> {
        let mut visited = HashSet::new();
        let mut stack = vec![state];
        let mut closure = Vec::new();

        while let Some(s) = stack.pop() {
            if !visited.insert(s) {
                continue;
            }
            closure.push(s);
            for t in self.transitions(s) {
                if t.edge == Edge::Epsilon && !visited.contains(&t.target) {
                    stack.push(t.target);
                }
            }
        }

        closure
    }

    /// Byte-consuming transitions available from `state` once epsilon edges
    /// have been followed.
    pub fn flatten(&self, state: StateId) -> Vec<Transition> {
        let mut flat: Vec<Transition> = Vec::new();
        for s in self.epsilon_closure(state) {
            for t in self.transitions(s) {
                if t.edge != Edge::Epsilon && !flat.contains(t) {
                    flat.push(*t);
                }
            }
        }
        flat
    }

    pub fn is_accepting(&self, state: StateId) -> bool {
        self.epsilon_closure(state).contains(&self.end)
    }

    /// Whole-input acceptance test (anchored at both ends).
    pub fn accepts(&self, input: &[u8]) -> bool {
        let mut current: HashSet<StateId> = self.epsilon_closure(self.start).into_iter().collect();

        for &byte in input {
            let mut next = HashSet::new();
            for &s in &current {
                for t in self.transitions(s) {
                    if t.edge.accepts(byte) {
                        next.extend(self.epsilon_closure(t.target));
                    }
                }
            }
            if next.is_empty() {
                return false;
            }
            current = next;
        }

        current.contains(&self.end)
    }
}

#[derive(Debug, Clone, Copy)]
struct Fragment {
    start: StateId,
    end: StateId,
}

#[derive(Default)]
struct Builder {
    states: Vec<Vec<Transition>>,
}

impl Builder {
    fn new_state(&mut self) -> StateId {
        self.states.push(Vec::with_capacity(2));
        StateId((self.states.len() - 1) as u32)
    }

    fn connect(&mut self, from: StateId, to: StateId, edge: Edge) {
        self.states[from.index()].push(Transition { target: to, edge });
    }

    fn single(&mut self, edge: Edge) -> Fragment {
        let start = self.new_state();
        let end = self.new_state();
        self.connect(start, end, edge);
        Fragment { start, end }
    }

    fn concatenate(&mut self, lhs: Fragment, rhs: Fragment) -> Fragment {
        self.connect(lhs.end, rhs.start, Edge::Epsilon);
        Fragment {
            start: lhs.start,
            end: rhs.end,
        }
    }

    fn alternate(&mut self, a: Fragment, b: Fragment) -> Fragment {
        let start = self.new_state();
        let end = self.new_state();
        self.connect(start, a.start, Edge::Epsilon);
        self.connect(start, b.start, Edge::Epsilon);
        self.connect(a.end, end, Edge::Epsilon);
        self.connect(b.end, end, Edge::Epsilon);
        Fragment { start, end }
    }

    /// Wraps `f` in fresh entry and exit states so loop and skip edges stay
    /// local to the quantified operand.
    fn wrap(&mut self, f: Fragment) -> Fragment {
        let start = self.new_state();
        let end = self.new_state();
        self.connect(start, f.start, Edge::Epsilon);
        self.connect(f.end, end, Edge::Epsilon);
        Fragment { start, end }
    }

    fn zero_or_one(&mut self, f: Fragment) -> Fragment {
        let outer = self.wrap(f);
        self.connect(outer.start, outer.end, Edge::Epsilon);
        outer
    }

    fn zero_or_more(&mut self, f: Fragment) -> Fragment {
        let outer = self.wrap(f);
        self.connect(f.end, f.start, Edge::Epsilon);
        self.connect(outer.start, outer.end, Edge::Epsilon);
        outer
    }

    fn one_or_more(&mut self, f: Fragment) -> Fragment {
        let outer = self.wrap(f);
        self.connect(f.end, f.start, Edge::Epsilon);
        outer
    }
}

fn pop(stack: &mut Vec<Fragment>) -> Fragment {
    stack
        .pop()
        .expect("postfix stream underflowed the fragment stack")
}

/// Evaluates a postfix token stream into an automaton.
///
/// The stream must come from [`parse_to_postfix`](super::parse_to_postfix),
/// which rejects malformed patterns; a stream that does not reduce to exactly
/// one fragment is a bug and panics.
pub fn build(postfix: &[Token]) -> Nfa {
    let mut builder = Builder::default();
    let mut stack: Vec<Fragment> = Vec::new();

    for &token in postfix {
        let fragment = match token {
            Token::Literal(b) => builder.single(Edge::Byte(b)),
            Token::Wildcard => builder.single(Edge::Any),
            Token::ZeroOrOne => {
                let f = pop(&mut stack);
                builder.zero_or_one(f)
            }
            Token::ZeroOrMore => {
                let f = pop(&mut stack);
                builder.zero_or_more(f)
            }
            Token::OneOrMore => {
                let f = pop(&mut stack);
                builder.one_or_more(f)
            }
            Token::Concat => {
                let rhs = pop(&mut stack);
                let lhs = pop(&mut stack);
                builder.concatenate(lhs, rhs)
            }
            Token::Alternate => {
                let b = pop(&mut stack);
                let a = pop(&mut stack);
                builder.alternate(a, b)
            }
            Token::GroupOpen | Token::GroupClose => {
                unreachable!("group tokens never appear in postfix order")
            }
        };
        stack.push(fragment);
    }

    assert_eq!(
        stack.len(),
        1,
        "postfix stream left {} fragments on the stack",
        stack.len()
    );
    let whole = pop(&mut stack);

    Nfa {
        states: builder.states,
        start: whole.start,
        end: whole.end,
    }
}
