//! Datalog engine evaluating the token's caveats
use crate::error;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::convert::AsRef;
use std::time::{SystemTime, UNIX_EPOCH};

mod symbol;
pub use symbol::*;

pub type Symbol = u64;

#[derive(Debug, Clone, PartialEq, Hash, Eq)]
pub enum Term {
    Symbol(Symbol),
    Variable(u32),
    Integer(i64),
    Str(String),
    Date(u64),
    Bytes(Vec<u8>),
}

impl From<&Term> for Term {
    fn from(t: &Term) -> Self {
        t.clone()
    }
}

impl AsRef<Term> for Term {
    fn as_ref(&self) -> &Term {
        self
    }
}

#[derive(Debug, Clone, PartialEq, Hash, Eq)]
pub struct Predicate {
    pub name: Symbol,
    pub terms: Vec<Term>,
}

impl Predicate {
    pub fn new(name: Symbol, terms: &[Term]) -> Predicate {
        Predicate {
            name,
            terms: terms.to_vec(),
        }
    }
}

impl AsRef<Predicate> for Predicate {
    fn as_ref(&self) -> &Predicate {
        self
    }
}

#[derive(Debug, Clone, PartialEq, Hash, Eq)]
pub struct Fact {
    pub predicate: Predicate,
}

impl Fact {
    pub fn new(name: Symbol, terms: &[Term]) -> Fact {
        Fact {
            predicate: Predicate::new(name, terms),
        }
    }
}

/// deduplicated set of ground facts
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FactSet {
    facts: HashSet<Fact>,
}

impl FactSet {
    pub fn new() -> Self {
        FactSet::default()
    }

    /// returns false when the fact was already present
    pub fn insert(&mut self, fact: Fact) -> bool {
        self.facts.insert(fact)
    }

    pub fn contains(&self, fact: &Fact) -> bool {
        self.facts.contains(fact)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fact> {
        self.facts.iter()
    }
}

impl Extend<Fact> for FactSet {
    fn extend<T: IntoIterator<Item = Fact>>(&mut self, iter: T) {
        self.facts.extend(iter)
    }
}

impl std::iter::FromIterator<Fact> for FactSet {
    fn from_iter<T: IntoIterator<Item = Fact>>(iter: T) -> Self {
        FactSet {
            facts: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub head: Predicate,
    pub body: Vec<Predicate>,
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub id: u32,
    pub kind: ConstraintKind,
}

impl AsRef<Constraint> for Constraint {
    fn as_ref(&self) -> &Constraint {
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    Int(IntConstraint),
    Str(StrConstraint),
    Date(DateConstraint),
    Symbol(SymbolConstraint),
    Bytes(BytesConstraint),
}

#[derive(Debug, Clone, PartialEq)]
pub enum IntConstraint {
    Lower(i64),
    Larger(i64),
    LowerOrEqual(i64),
    LargerOrEqual(i64),
    Equal(i64),
    In(HashSet<i64>),
    NotIn(HashSet<i64>),
}

/// `Regex` is unanchored: the pattern may match anywhere in the string
#[derive(Debug, Clone, PartialEq)]
pub enum StrConstraint {
    Prefix(String),
    Suffix(String),
    Equal(String),
    In(HashSet<String>),
    NotIn(HashSet<String>),
    Regex(String),
}

/// strict bounds: a date equal to the limit matches neither variant
#[derive(Debug, Clone, PartialEq)]
pub enum DateConstraint {
    Before(u64),
    After(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolConstraint {
    In(HashSet<u64>),
    NotIn(HashSet<u64>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BytesConstraint {
    Equal(Vec<u8>),
    In(HashSet<Vec<u8>>),
    NotIn(HashSet<Vec<u8>>),
}

impl Constraint {
    /// checks a candidate binding; a type mismatch is a failed match, not
    /// an error
    pub fn check(&self, name: u32, term: &Term) -> bool {
        if name != self.id {
            return true;
        }

        match (term, &self.kind) {
            (Term::Integer(i), ConstraintKind::Int(c)) => match c {
                IntConstraint::Lower(j) => *i < *j,
                IntConstraint::Larger(j) => *i > *j,
                IntConstraint::LowerOrEqual(j) => *i <= *j,
                IntConstraint::LargerOrEqual(j) => *i >= *j,
                IntConstraint::Equal(j) => *i == *j,
                IntConstraint::In(h) => h.contains(i),
                IntConstraint::NotIn(h) => !h.contains(i),
            },
            (Term::Str(s), ConstraintKind::Str(c)) => match c {
                StrConstraint::Prefix(pref) => s.as_str().starts_with(pref.as_str()),
                StrConstraint::Suffix(suff) => s.as_str().ends_with(suff.as_str()),
                StrConstraint::Equal(s2) => s == s2,
                StrConstraint::Regex(r) => {
                    // an invalid regex will never match
                    Regex::new(r).map(|re| re.is_match(s)).unwrap_or(false)
                }
                StrConstraint::In(h) => h.contains(s),
                StrConstraint::NotIn(h) => !h.contains(s),
            },
            (Term::Date(d), ConstraintKind::Date(c)) => match c {
                DateConstraint::Before(b) => d < b,
                DateConstraint::After(b) => d > b,
            },
            (Term::Symbol(s), ConstraintKind::Symbol(c)) => match c {
                SymbolConstraint::In(h) => h.contains(s),
                SymbolConstraint::NotIn(h) => !h.contains(s),
            },
            (Term::Bytes(s), ConstraintKind::Bytes(c)) => match c {
                BytesConstraint::Equal(s2) => s == s2,
                BytesConstraint::In(h) => h.contains(s),
                BytesConstraint::NotIn(h) => !h.contains(s),
            },
            _ => false,
        }
    }
}

/// a disjunction of queries
#[derive(Debug, Clone, PartialEq)]
pub struct Caveat {
    pub queries: Vec<Rule>,
}

impl Rule {
    pub fn apply(&self, facts: &FactSet, new_facts: &mut Vec<Fact>) {
        let variables_set = self
            .body
            .iter()
            .flat_map(|pred| {
                pred.terms.iter().filter_map(|term| match term {
                    Term::Variable(i) => Some(*i),
                    _ => None,
                })
            })
            .collect::<HashSet<_>>();

        let variables = MatchedVariables::new(variables_set);

        for bindings in CombineIt::new(variables, &self.body, &self.constraints, facts) {
            let mut p = self.head.clone();
            let mut complete = true;

            for term in p.terms.iter_mut() {
                if let Term::Variable(i) = term {
                    match bindings.get(&*i) {
                        Some(value) => *term = value.clone(),
                        // head variables must be bound by the body
                        None => {
                            complete = false;
                            break;
                        }
                    }
                }
            }

            if complete {
                new_facts.push(Fact { predicate: p });
            }
        }
    }
}

/// recursive iterator for rule application
pub struct CombineIt<'a> {
    variables: MatchedVariables,
    predicates: &'a [Predicate],
    constraints: &'a [Constraint],
    all_facts: &'a FactSet,
    current_facts: Box<dyn Iterator<Item = &'a Fact> + 'a>,
    current_it: Option<Box<CombineIt<'a>>>,
}

impl<'a> CombineIt<'a> {
    pub fn new(
        variables: MatchedVariables,
        predicates: &'a [Predicate],
        constraints: &'a [Constraint],
        facts: &'a FactSet,
    ) -> Self {
        let current_facts: Box<dyn Iterator<Item = &'a Fact> + 'a> = match predicates.first() {
            Some(p) => {
                let p = p.clone();
                Box::new(facts.iter().filter(move |fact| match_preds(&fact.predicate, &p)))
            }
            None => Box::new(std::iter::empty()),
        };

        CombineIt {
            variables,
            predicates,
            constraints,
            all_facts: facts,
            current_facts,
            current_it: None,
        }
    }
}

impl<'a> Iterator for CombineIt<'a> {
    type Item = HashMap<u32, Term>;

    fn next(&mut self) -> Option<HashMap<u32, Term>> {
        // if we're the last iterator in the recursive chain, stop here
        if self.predicates.is_empty() {
            return self.variables.complete();
        }

        loop {
            if self.current_it.is_none() {
                // fix the first predicate
                let pred = &self.predicates[0];

                loop {
                    if let Some(current_fact) = self.current_facts.next() {
                        // create a new MatchedVariables in which we fix variables we could
                        // unify from the first predicate and the current fact
                        let mut vars = self.variables.clone();
                        let mut match_terms = true;

                        for (key, term) in pred.terms.iter().zip(&current_fact.predicate.terms) {
                            if let (Term::Variable(k), term) = (key, term) {
                                for c in self.constraints {
                                    if !c.check(*k, term) {
                                        match_terms = false;
                                        break;
                                    }
                                }
                                if !vars.insert(*k, term) {
                                    match_terms = false;
                                }

                                if !match_terms {
                                    break;
                                }
                            }
                        }

                        if !match_terms {
                            continue;
                        }

                        if self.predicates.len() == 1 {
                            if let Some(val) = vars.complete() {
                                return Some(val);
                            } else {
                                continue;
                            }
                        } else {
                            // create a new iterator with the matched variables, the rest of
                            // the predicates, and all of the facts
                            self.current_it = Some(Box::new(CombineIt::new(
                                vars,
                                &self.predicates[1..],
                                self.constraints,
                                self.all_facts,
                            )));
                        }
                        break;
                    } else {
                        return None;
                    }
                }
            }

            self.current_it.as_ref()?;

            if let Some(val) = self.current_it.as_mut().and_then(|it| it.next()) {
                break Some(val);
            } else {
                self.current_it = None;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchedVariables(pub HashMap<u32, Option<Term>>);

impl MatchedVariables {
    pub fn new(import: HashSet<u32>) -> Self {
        MatchedVariables(import.iter().map(|key| (*key, None)).collect())
    }

    pub fn insert(&mut self, key: u32, value: &Term) -> bool {
        match self.0.get(&key) {
            Some(None) => {
                self.0.insert(key, Some(value.clone()));
                true
            }
            Some(Some(v)) => value == v,
            None => false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.0.values().all(|v| v.is_some())
    }

    pub fn complete(&self) -> Option<HashMap<u32, Term>> {
        let mut result = HashMap::new();
        for (k, v) in self.0.iter() {
            match v {
                Some(value) => result.insert(*k, value.clone()),
                None => return None,
            };
        }
        Some(result)
    }
}

pub fn fact<T: AsRef<Term>>(name: Symbol, terms: &[T]) -> Fact {
    Fact {
        predicate: Predicate {
            name,
            terms: terms.iter().map(|t| t.as_ref().clone()).collect(),
        },
    }
}

pub fn pred<T: AsRef<Term>>(name: Symbol, terms: &[T]) -> Predicate {
    Predicate {
        name,
        terms: terms.iter().map(|t| t.as_ref().clone()).collect(),
    }
}

pub fn rule<T: AsRef<Term>, P: AsRef<Predicate>>(
    head_name: Symbol,
    head_terms: &[T],
    predicates: &[P],
) -> Rule {
    Rule {
        head: pred(head_name, head_terms),
        body: predicates.iter().map(|p| p.as_ref().clone()).collect(),
        constraints: Vec::new(),
    }
}

pub fn constrained_rule<T: AsRef<Term>, P: AsRef<Predicate>, C: AsRef<Constraint>>(
    head_name: Symbol,
    head_terms: &[T],
    predicates: &[P],
    constraints: &[C],
) -> Rule {
    Rule {
        head: pred(head_name, head_terms),
        body: predicates.iter().map(|p| p.as_ref().clone()).collect(),
        constraints: constraints.iter().map(|c| c.as_ref().clone()).collect(),
    }
}

pub fn int(i: i64) -> Term {
    Term::Integer(i)
}

pub fn string(s: &str) -> Term {
    Term::Str(s.to_string())
}

pub fn date(t: &SystemTime) -> Term {
    let dur = t.duration_since(UNIX_EPOCH).unwrap();
    Term::Date(dur.as_secs())
}

pub fn var(syms: &mut SymbolTable, name: &str) -> Term {
    let id = syms.insert(name);
    Term::Variable(id as u32)
}

pub fn sym(syms: &mut SymbolTable, name: &str) -> Term {
    let id = syms.insert(name);
    Term::Symbol(id)
}

pub fn match_preds(fact_pred: &Predicate, rule_pred: &Predicate) -> bool {
    fact_pred.name == rule_pred.name
        && fact_pred.terms.len() == rule_pred.terms.len()
        && fact_pred
            .terms
            .iter()
            .zip(&rule_pred.terms)
            .all(|(fid, pid)| match (fid, pid) {
                (_, Term::Variable(_)) => true,
                (Term::Variable(_), _) => true,
                (Term::Symbol(i), Term::Symbol(j)) => i == j,
                (Term::Integer(i), Term::Integer(j)) => i == j,
                (Term::Str(i), Term::Str(j)) => i == j,
                (Term::Date(i), Term::Date(j)) => i == j,
                (Term::Bytes(i), Term::Bytes(j)) => i == j,
                _ => false,
            })
}

/// budgets capping a saturation run; exceeding one is a deterministic
/// error, not a timeout
#[derive(Debug, Clone)]
pub struct RunLimits {
    pub max_facts: usize,
    pub max_iterations: usize,
}

impl Default for RunLimits {
    fn default() -> Self {
        RunLimits {
            max_facts: 1000,
            max_iterations: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct World {
    pub facts: FactSet,
    pub rules: Vec<Rule>,
}

impl World {
    pub fn new() -> Self {
        World::default()
    }

    pub fn add_fact(&mut self, fact: Fact) {
        self.facts.insert(fact);
    }

    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// applies rules until a full pass derives nothing new
    pub fn run(&mut self, limits: &RunLimits) -> Result<(), error::RunLimit> {
        let mut iterations = 0;
        loop {
            let mut new_facts: Vec<Fact> = Vec::new();
            for rule in self.rules.iter() {
                rule.apply(&self.facts, &mut new_facts);
            }

            let len = self.facts.len();
            self.facts.extend(new_facts.drain(..));
            if self.facts.len() == len {
                break;
            }

            if self.facts.len() > limits.max_facts {
                return Err(error::RunLimit::TooManyFacts);
            }

            iterations += 1;
            if iterations >= limits.max_iterations {
                return Err(error::RunLimit::TooManyIterations);
            }
        }

        Ok(())
    }

    pub fn query(&self, pred: Predicate) -> Vec<&Fact> {
        self.facts
            .iter()
            .filter(|f| {
                f.predicate.name == pred.name
                    && f.predicate
                        .terms
                        .iter()
                        .zip(&pred.terms)
                        .all(|(fid, pid)| match (fid, pid) {
                            (_, Term::Variable(_)) => true,
                            (Term::Symbol(i), Term::Symbol(j)) => i == j,
                            (Term::Integer(i), Term::Integer(j)) => i == j,
                            (Term::Str(i), Term::Str(j)) => i == j,
                            (Term::Date(i), Term::Date(j)) => i == j,
                            (Term::Bytes(i), Term::Bytes(j)) => i == j,
                            _ => false,
                        })
            })
            .collect::<Vec<_>>()
    }

    /// matches a rule against the current facts without registering it
    pub fn query_rule(&self, rule: Rule) -> FactSet {
        let mut new_facts: Vec<Fact> = Vec::new();
        rule.apply(&self.facts, &mut new_facts);
        new_facts.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family() {
        let mut w = World::new();
        let mut syms = SymbolTable::new();

        let a = syms.add("A");
        let b = syms.add("B");
        let c = syms.add("C");
        let d = syms.add("D");
        let e = syms.add("E");
        let parent = syms.insert("parent");
        let grandparent = syms.insert("grandparent");

        w.add_fact(fact(parent, &[&a, &b]));
        w.add_fact(fact(parent, &[&b, &c]));
        w.add_fact(fact(parent, &[&c, &d]));

        let r1 = rule(
            grandparent,
            &[
                var(&mut syms, "grandparent"),
                var(&mut syms, "grandchild"),
            ],
            &[
                pred(
                    parent,
                    &[var(&mut syms, "grandparent"), var(&mut syms, "parent")],
                ),
                pred(
                    parent,
                    &[var(&mut syms, "parent"), var(&mut syms, "grandchild")],
                ),
            ],
        );

        let query_rule_result = w.query_rule(r1.clone());
        assert_eq!(query_rule_result.len(), 2);

        w.add_rule(r1);
        w.run(&RunLimits::default()).unwrap();

        w.add_fact(fact(parent, &[&c, &e]));
        w.run(&RunLimits::default()).unwrap();

        let res = w.query(pred(
            grandparent,
            &[
                var(&mut syms, "grandparent"),
                var(&mut syms, "grandchild"),
            ],
        ));
        let res = res.into_iter().cloned().collect::<HashSet<_>>();
        let compared = vec![
            fact(grandparent, &[&a, &c]),
            fact(grandparent, &[&b, &d]),
            fact(grandparent, &[&b, &e]),
        ]
        .into_iter()
        .collect::<HashSet<_>>();
        assert_eq!(res, compared);
    }

    #[test]
    fn numbers() {
        let mut w = World::new();
        let mut syms = SymbolTable::new();

        let abc = syms.add("abc");
        let def = syms.add("def");
        let ghi = syms.add("ghi");
        let jkl = syms.add("jkl");
        let mno = syms.add("mno");
        let aaa = syms.add("AAA");
        let bbb = syms.add("BBB");
        let ccc = syms.add("CCC");
        let t1 = syms.insert("t1");
        let t2 = syms.insert("t2");
        let join = syms.insert("join");

        w.add_fact(fact(t1, &[&int(0), &abc]));
        w.add_fact(fact(t1, &[&int(1), &def]));
        w.add_fact(fact(t1, &[&int(2), &ghi]));
        w.add_fact(fact(t1, &[&int(3), &jkl]));
        w.add_fact(fact(t1, &[&int(4), &mno]));

        w.add_fact(fact(t2, &[&int(0), &aaa, &int(0)]));
        w.add_fact(fact(t2, &[&int(1), &bbb, &int(0)]));
        w.add_fact(fact(t2, &[&int(2), &ccc, &int(1)]));

        let res = w.query_rule(rule(
            join,
            &[var(&mut syms, "left"), var(&mut syms, "right")],
            &[
                pred(t1, &[var(&mut syms, "id"), var(&mut syms, "left")]),
                pred(
                    t2,
                    &[
                        var(&mut syms, "t2_id"),
                        var(&mut syms, "right"),
                        var(&mut syms, "id"),
                    ],
                ),
            ],
        ));

        let res2 = res.iter().cloned().collect::<HashSet<_>>();
        let compared = vec![
            fact(join, &[&abc, &aaa]),
            fact(join, &[&abc, &bbb]),
            fact(join, &[&def, &ccc]),
        ]
        .into_iter()
        .collect::<HashSet<_>>();
        assert_eq!(res2, compared);

        // with a constraint on the join variable
        let res = w.query_rule(constrained_rule(
            join,
            &[var(&mut syms, "left"), var(&mut syms, "right")],
            &[
                pred(t1, &[var(&mut syms, "id"), var(&mut syms, "left")]),
                pred(
                    t2,
                    &[
                        var(&mut syms, "t2_id"),
                        var(&mut syms, "right"),
                        var(&mut syms, "id"),
                    ],
                ),
            ],
            &[Constraint {
                id: syms.insert("id") as u32,
                kind: ConstraintKind::Int(IntConstraint::Lower(1)),
            }],
        ));

        let res2 = res.iter().cloned().collect::<HashSet<_>>();
        let compared = vec![fact(join, &[&abc, &aaa]), fact(join, &[&abc, &bbb])]
            .into_iter()
            .collect::<HashSet<_>>();
        assert_eq!(res2, compared);
    }

    #[test]
    fn string_constraints() {
        let mut w = World::new();
        let mut syms = SymbolTable::new();

        let app_0 = syms.add("app_0");
        let app_1 = syms.add("app_1");
        let app_2 = syms.add("app_2");
        let route = syms.insert("route");
        let suff = syms.insert("route suffix");

        w.add_fact(fact(route, &[&int(0), &app_0, &string("example.com")]));
        w.add_fact(fact(route, &[&int(1), &app_1, &string("test.com")]));
        w.add_fact(fact(route, &[&int(2), &app_2, &string("test.fr")]));
        w.add_fact(fact(route, &[&int(3), &app_0, &string("www.example.com")]));
        w.add_fact(fact(route, &[&int(4), &app_1, &string("mx.example.com")]));

        fn test_suffix(
            w: &World,
            syms: &mut SymbolTable,
            suff: Symbol,
            route: Symbol,
            suffix: &str,
        ) -> FactSet {
            w.query_rule(constrained_rule(
                suff,
                &[var(syms, "app_id"), var(syms, "domain_name")],
                &[pred(
                    route,
                    &[
                        var(syms, "route_id"),
                        var(syms, "app_id"),
                        var(syms, "domain_name"),
                    ],
                )],
                &[Constraint {
                    id: syms.insert("domain_name") as u32,
                    kind: ConstraintKind::Str(StrConstraint::Suffix(suffix.to_string())),
                }],
            ))
        }

        let res = test_suffix(&w, &mut syms, suff, route, ".fr");
        let res2 = res.iter().cloned().collect::<HashSet<_>>();
        let compared = vec![fact(suff, &[&app_2, &string("test.fr")])]
            .into_iter()
            .collect::<HashSet<_>>();
        assert_eq!(res2, compared);

        let res = test_suffix(&w, &mut syms, suff, route, "example.com");
        let res2 = res.iter().cloned().collect::<HashSet<_>>();
        let compared = vec![
            fact(suff, &[&app_0, &string("example.com")]),
            fact(suff, &[&app_0, &string("www.example.com")]),
            fact(suff, &[&app_1, &string("mx.example.com")]),
        ]
        .into_iter()
        .collect::<HashSet<_>>();
        assert_eq!(res2, compared);
    }

    #[test]
    fn regex_is_unanchored() {
        let c = Constraint {
            id: 0,
            kind: ConstraintKind::Str(StrConstraint::Regex("ab?c".to_string())),
        };

        assert!(c.check(0, &Term::Str("xxx abc yyy".to_string())));
        assert!(c.check(0, &Term::Str("ac".to_string())));
        assert!(!c.check(0, &Term::Str("adc".to_string())));
        // a constraint on a term of another type filters the binding out
        assert!(!c.check(0, &Term::Integer(42)));
    }

    #[test]
    fn date_constraints_are_strict() {
        let mut w = World::new();
        let mut syms = SymbolTable::new();

        let abc = syms.add("abc");
        let def = syms.add("def");
        let x = syms.insert("x");
        let before = syms.insert("before");
        let after = syms.insert("after");

        let t2_timestamp = 1_575_294_593u64;

        w.add_fact(fact(x, &[&Term::Date(t2_timestamp - 10), &abc]));
        w.add_fact(fact(x, &[&Term::Date(t2_timestamp + 30), &def]));

        let r1 = constrained_rule(
            before,
            &[var(&mut syms, "date"), var(&mut syms, "val")],
            &[pred(x, &[var(&mut syms, "date"), var(&mut syms, "val")])],
            &[
                Constraint {
                    id: syms.insert("date") as u32,
                    kind: ConstraintKind::Date(DateConstraint::Before(t2_timestamp)),
                },
                Constraint {
                    id: syms.insert("date") as u32,
                    kind: ConstraintKind::Date(DateConstraint::After(0)),
                },
            ],
        );

        let res = w.query_rule(r1);
        let res2 = res.iter().cloned().collect::<HashSet<_>>();
        let compared = vec![fact(before, &[&Term::Date(t2_timestamp - 10), &abc])]
            .into_iter()
            .collect::<HashSet<_>>();
        assert_eq!(res2, compared);

        let r2 = constrained_rule(
            after,
            &[var(&mut syms, "date"), var(&mut syms, "val")],
            &[pred(x, &[var(&mut syms, "date"), var(&mut syms, "val")])],
            &[Constraint {
                id: syms.insert("date") as u32,
                kind: ConstraintKind::Date(DateConstraint::After(t2_timestamp)),
            }],
        );

        let res = w.query_rule(r2);
        let res2 = res.iter().cloned().collect::<HashSet<_>>();
        let compared = vec![fact(after, &[&Term::Date(t2_timestamp + 30), &def])]
            .into_iter()
            .collect::<HashSet<_>>();
        assert_eq!(res2, compared);

        // equality satisfies neither bound
        let c = Constraint {
            id: 0,
            kind: ConstraintKind::Date(DateConstraint::Before(t2_timestamp)),
        };
        assert!(!c.check(0, &Term::Date(t2_timestamp)));
        let c = Constraint {
            id: 0,
            kind: ConstraintKind::Date(DateConstraint::After(t2_timestamp)),
        };
        assert!(!c.check(0, &Term::Date(t2_timestamp)));
    }

    #[test]
    fn set_constraints() {
        let mut w = World::new();
        let mut syms = SymbolTable::new();

        let abc = syms.add("abc");
        let def = syms.add("def");
        let x = syms.insert("x");
        let int_set = syms.insert("int_set");
        let symbol_set = syms.insert("symbol_set");
        let string_set = syms.insert("string_set");

        w.add_fact(fact(x, &[&abc, &int(0), &string("test")]));
        w.add_fact(fact(x, &[&def, &int(2), &string("hello")]));

        let res = w.query_rule(constrained_rule(
            int_set,
            &[var(&mut syms, "sym"), var(&mut syms, "str")],
            &[pred(
                x,
                &[
                    var(&mut syms, "sym"),
                    var(&mut syms, "int"),
                    var(&mut syms, "str"),
                ],
            )],
            &[Constraint {
                id: syms.insert("int") as u32,
                kind: ConstraintKind::Int(IntConstraint::In([0, 1].iter().cloned().collect())),
            }],
        ));

        let res2 = res.iter().cloned().collect::<HashSet<_>>();
        let compared = vec![fact(int_set, &[&abc, &string("test")])]
            .into_iter()
            .collect::<HashSet<_>>();
        assert_eq!(res2, compared);

        let abc_sym_id = syms.insert("abc");
        let ghi_sym_id = syms.insert("ghi");

        let res = w.query_rule(constrained_rule(
            symbol_set,
            &[
                var(&mut syms, "symbol"),
                var(&mut syms, "int"),
                var(&mut syms, "str"),
            ],
            &[pred(
                x,
                &[
                    var(&mut syms, "symbol"),
                    var(&mut syms, "int"),
                    var(&mut syms, "str"),
                ],
            )],
            &[Constraint {
                id: syms.insert("symbol") as u32,
                kind: ConstraintKind::Symbol(SymbolConstraint::NotIn(
                    [abc_sym_id, ghi_sym_id].iter().cloned().collect(),
                )),
            }],
        ));

        let res2 = res.iter().cloned().collect::<HashSet<_>>();
        let compared = vec![fact(symbol_set, &[&def, &int(2), &string("hello")])]
            .into_iter()
            .collect::<HashSet<_>>();
        assert_eq!(res2, compared);

        let res = w.query_rule(constrained_rule(
            string_set,
            &[
                var(&mut syms, "sym"),
                var(&mut syms, "int"),
                var(&mut syms, "str"),
            ],
            &[pred(
                x,
                &[
                    var(&mut syms, "sym"),
                    var(&mut syms, "int"),
                    var(&mut syms, "str"),
                ],
            )],
            &[Constraint {
                id: syms.insert("str") as u32,
                kind: ConstraintKind::Str(StrConstraint::In(
                    ["test".to_string(), "aaa".to_string()]
                        .iter()
                        .cloned()
                        .collect(),
                )),
            }],
        ));

        let res2 = res.iter().cloned().collect::<HashSet<_>>();
        let compared = vec![fact(string_set, &[&abc, &int(0), &string("test")])]
            .into_iter()
            .collect::<HashSet<_>>();
        assert_eq!(res2, compared);
    }

    #[test]
    fn saturation_is_a_fixed_point() {
        let mut w = World::new();
        let mut syms = SymbolTable::new();

        let edge = syms.insert("edge");
        let path = syms.insert("path");
        let a = syms.add("a");
        let b = syms.add("b");
        let c = syms.add("c");

        w.add_fact(fact(edge, &[&a, &b]));
        w.add_fact(fact(edge, &[&b, &c]));

        w.add_rule(rule(
            path,
            &[var(&mut syms, "from"), var(&mut syms, "to")],
            &[pred(edge, &[var(&mut syms, "from"), var(&mut syms, "to")])],
        ));
        w.add_rule(rule(
            path,
            &[var(&mut syms, "from"), var(&mut syms, "to")],
            &[
                pred(path, &[var(&mut syms, "from"), var(&mut syms, "mid")]),
                pred(edge, &[var(&mut syms, "mid"), var(&mut syms, "to")]),
            ],
        ));

        w.run(&RunLimits::default()).unwrap();
        let saturated = w.facts.clone();

        // a second run derives nothing new
        w.run(&RunLimits::default()).unwrap();
        assert_eq!(saturated, w.facts);

        // only ground facts were derived
        assert!(w.facts.iter().all(|f| f
            .predicate
            .terms
            .iter()
            .all(|t| !matches!(t, Term::Variable(_)))));
    }

    #[test]
    fn fact_budget() {
        let mut w = World::new();
        let mut syms = SymbolTable::new();

        let item = syms.insert("item");
        let pair = syms.insert("pair");

        for i in 0..50 {
            w.add_fact(fact(item, &[&int(i)]));
        }

        // quadratic blowup: 2500 derived pairs exceed the budget
        w.add_rule(rule(
            pair,
            &[var(&mut syms, "x"), var(&mut syms, "y")],
            &[
                pred(item, &[var(&mut syms, "x")]),
                pred(item, &[var(&mut syms, "y")]),
            ],
        ));

        let res = w.run(&RunLimits {
            max_facts: 1000,
            max_iterations: 100,
        });
        assert_eq!(res, Err(crate::error::RunLimit::TooManyFacts));
    }

    #[test]
    fn iteration_budget() {
        let mut w = World::new();
        let mut syms = SymbolTable::new();

        let counter = syms.insert("counter");
        let next = syms.insert("next");

        w.add_fact(fact(counter, &[&int(0)]));
        for i in 0..200 {
            w.add_fact(fact(next, &[&int(i), &int(i + 1)]));
        }

        // each pass only derives one new counter fact
        w.add_rule(rule(
            counter,
            &[var(&mut syms, "succ")],
            &[
                pred(counter, &[var(&mut syms, "n")]),
                pred(next, &[var(&mut syms, "n"), var(&mut syms, "succ")]),
            ],
        ));

        let res = w.run(&RunLimits {
            max_facts: 10_000,
            max_iterations: 100,
        });
        assert_eq!(res, Err(crate::error::RunLimit::TooManyIterations));
    }
}
