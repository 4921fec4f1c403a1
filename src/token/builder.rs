//! builders for tokens and blocks, with a string-named view of facts and
//! rules that is interned into the symbol table at build time
use super::{Block, Wafer};
use crate::crypto::KeyPair;
use crate::datalog::{self, FactSet, SymbolTable};
use crate::error;
use rand_core::{CryptoRng, RngCore};
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

/// a term carrying names instead of symbol table indexes
#[derive(Debug, Clone, PartialEq, Hash, Eq)]
pub enum Atom {
    Symbol(String),
    Variable(u32),
    Integer(i64),
    Str(String),
    Date(u64),
    Bytes(Vec<u8>),
}

impl Atom {
    pub fn convert(&self, symbols: &mut SymbolTable) -> datalog::Term {
        match self {
            Atom::Symbol(s) => datalog::Term::Symbol(symbols.insert(s)),
            Atom::Variable(i) => datalog::Term::Variable(*i),
            Atom::Integer(i) => datalog::Term::Integer(*i),
            Atom::Str(s) => datalog::Term::Str(s.clone()),
            Atom::Date(d) => datalog::Term::Date(*d),
            Atom::Bytes(b) => datalog::Term::Bytes(b.clone()),
        }
    }

    pub fn convert_from(term: &datalog::Term, symbols: &SymbolTable) -> Result<Self, error::Token> {
        match term {
            datalog::Term::Symbol(s) => symbols
                .str(*s)
                .map(|s| Atom::Symbol(s.to_string()))
                .ok_or(error::Token::UnknownSymbol(*s)),
            datalog::Term::Variable(i) => Ok(Atom::Variable(*i)),
            datalog::Term::Integer(i) => Ok(Atom::Integer(*i)),
            datalog::Term::Str(s) => Ok(Atom::Str(s.clone())),
            datalog::Term::Date(d) => Ok(Atom::Date(*d)),
            datalog::Term::Bytes(b) => Ok(Atom::Bytes(b.clone())),
        }
    }
}

impl From<&Atom> for Atom {
    fn from(a: &Atom) -> Self {
        a.clone()
    }
}

impl AsRef<Atom> for Atom {
    fn as_ref(&self) -> &Atom {
        self
    }
}

#[derive(Debug, Clone, PartialEq, Hash, Eq)]
pub struct Predicate {
    pub name: String,
    pub terms: Vec<Atom>,
}

impl Predicate {
    pub fn new(name: String, terms: &[Atom]) -> Predicate {
        Predicate {
            name,
            terms: terms.to_vec(),
        }
    }

    pub fn convert(&self, symbols: &mut SymbolTable) -> datalog::Predicate {
        let name = symbols.insert(&self.name);
        let mut terms = vec![];

        for term in self.terms.iter() {
            terms.push(term.convert(symbols));
        }

        datalog::Predicate { name, terms }
    }

    pub fn convert_from(
        p: &datalog::Predicate,
        symbols: &SymbolTable,
    ) -> Result<Self, error::Token> {
        let name = symbols
            .str(p.name)
            .map(|s| s.to_string())
            .ok_or(error::Token::UnknownSymbol(p.name))?;

        let mut terms = vec![];
        for term in p.terms.iter() {
            terms.push(Atom::convert_from(term, symbols)?);
        }

        Ok(Predicate { name, terms })
    }
}

impl AsRef<Predicate> for Predicate {
    fn as_ref(&self) -> &Predicate {
        self
    }
}

#[derive(Debug, Clone, PartialEq, Hash, Eq)]
pub struct Fact(pub Predicate);

impl Fact {
    pub fn new(name: String, terms: &[Atom]) -> Fact {
        Fact(Predicate::new(name, terms))
    }

    pub fn convert(&self, symbols: &mut SymbolTable) -> datalog::Fact {
        datalog::Fact {
            predicate: self.0.convert(symbols),
        }
    }

    pub fn convert_from(f: &datalog::Fact, symbols: &SymbolTable) -> Result<Self, error::Token> {
        Ok(Fact(Predicate::convert_from(&f.predicate, symbols)?))
    }
}

impl From<&Fact> for Fact {
    fn from(f: &Fact) -> Self {
        f.clone()
    }
}

/// constraints in their public form; dates are converted to seconds since
/// the epoch at build time
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub id: u32,
    pub kind: ConstraintKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    Integer(datalog::IntConstraint),
    String(datalog::StrConstraint),
    Date(DateConstraint),
    Symbol(SymbolConstraint),
    Bytes(datalog::BytesConstraint),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DateConstraint {
    Before(SystemTime),
    After(SystemTime),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolConstraint {
    In(HashSet<String>),
    NotIn(HashSet<String>),
}

impl Constraint {
    pub fn convert(&self, symbols: &mut SymbolTable) -> datalog::Constraint {
        let kind = match &self.kind {
            ConstraintKind::Integer(c) => datalog::ConstraintKind::Int(c.clone()),
            ConstraintKind::String(c) => datalog::ConstraintKind::Str(c.clone()),
            ConstraintKind::Date(DateConstraint::Before(t)) => {
                let dur = t.duration_since(UNIX_EPOCH).unwrap();
                datalog::ConstraintKind::Date(datalog::DateConstraint::Before(dur.as_secs()))
            }
            ConstraintKind::Date(DateConstraint::After(t)) => {
                let dur = t.duration_since(UNIX_EPOCH).unwrap();
                datalog::ConstraintKind::Date(datalog::DateConstraint::After(dur.as_secs()))
            }
            ConstraintKind::Symbol(SymbolConstraint::In(set)) => {
                datalog::ConstraintKind::Symbol(datalog::SymbolConstraint::In(
                    set.iter().map(|s| symbols.insert(s)).collect(),
                ))
            }
            ConstraintKind::Symbol(SymbolConstraint::NotIn(set)) => {
                datalog::ConstraintKind::Symbol(datalog::SymbolConstraint::NotIn(
                    set.iter().map(|s| symbols.insert(s)).collect(),
                ))
            }
            ConstraintKind::Bytes(c) => datalog::ConstraintKind::Bytes(c.clone()),
        };

        datalog::Constraint { id: self.id, kind }
    }
}

impl AsRef<Constraint> for Constraint {
    fn as_ref(&self) -> &Constraint {
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule(pub Predicate, pub Vec<Predicate>, pub Vec<Constraint>);

impl Rule {
    pub fn convert(&self, symbols: &mut SymbolTable) -> datalog::Rule {
        let head = self.0.convert(symbols);
        let mut body = vec![];
        let mut constraints = vec![];

        for p in self.1.iter() {
            body.push(p.convert(symbols));
        }

        for c in self.2.iter() {
            constraints.push(c.convert(symbols));
        }

        datalog::Rule {
            head,
            body,
            constraints,
        }
    }
}

impl From<&Rule> for Rule {
    fn from(r: &Rule) -> Self {
        r.clone()
    }
}

/// a disjunction of queries
#[derive(Debug, Clone, PartialEq)]
pub struct Caveat {
    pub queries: Vec<Rule>,
}

impl Caveat {
    pub fn convert(&self, symbols: &mut SymbolTable) -> datalog::Caveat {
        datalog::Caveat {
            queries: self.queries.iter().map(|q| q.convert(symbols)).collect(),
        }
    }
}

impl From<Rule> for Caveat {
    fn from(r: Rule) -> Self {
        Caveat { queries: vec![r] }
    }
}

impl From<&Rule> for Caveat {
    fn from(r: &Rule) -> Self {
        Caveat {
            queries: vec![r.clone()],
        }
    }
}

impl From<&Caveat> for Caveat {
    fn from(c: &Caveat) -> Self {
        c.clone()
    }
}

/// creates a new fact
pub fn fact<I: AsRef<Atom>>(name: &str, terms: &[I]) -> Fact {
    Fact(pred(name, terms))
}

/// creates a predicate
pub fn pred<I: AsRef<Atom>>(name: &str, terms: &[I]) -> Predicate {
    Predicate {
        name: name.to_string(),
        terms: terms.iter().map(|term| term.as_ref().clone()).collect(),
    }
}

/// creates a rule
pub fn rule<I: AsRef<Atom>, P: AsRef<Predicate>>(
    head_name: &str,
    head_terms: &[I],
    predicates: &[P],
) -> Rule {
    Rule(
        pred(head_name, head_terms),
        predicates.iter().map(|p| p.as_ref().clone()).collect(),
        Vec::new(),
    )
}

/// creates a rule with constraints
pub fn constrained_rule<I: AsRef<Atom>, P: AsRef<Predicate>, C: AsRef<Constraint>>(
    head_name: &str,
    head_terms: &[I],
    predicates: &[P],
    constraints: &[C],
) -> Rule {
    Rule(
        pred(head_name, head_terms),
        predicates.iter().map(|p| p.as_ref().clone()).collect(),
        constraints.iter().map(|c| c.as_ref().clone()).collect(),
    )
}

/// creates a caveat from a list of queries: it holds if any of them matches
pub fn caveat(queries: &[Rule]) -> Caveat {
    Caveat {
        queries: queries.to_vec(),
    }
}

/// creates an integer value
pub fn int(i: i64) -> Atom {
    Atom::Integer(i)
}

/// creates a string
pub fn string(s: &str) -> Atom {
    Atom::Str(s.to_string())
}

/// creates a symbol
///
/// once the block is generated, this symbol will be added to the symbol
/// table if needed
pub fn s(s: &str) -> Atom {
    Atom::Symbol(s.to_string())
}

/// creates a symbol
pub fn symbol(s: &str) -> Atom {
    Atom::Symbol(s.to_string())
}

/// creates a date
///
/// internally the date will be stored as seconds since UNIX_EPOCH
pub fn date(t: &SystemTime) -> Atom {
    let dur = t.duration_since(UNIX_EPOCH).unwrap();
    Atom::Date(dur.as_secs())
}

/// creates a byte sequence
pub fn bytes(b: &[u8]) -> Atom {
    Atom::Bytes(b.to_vec())
}

/// creates a variable for a rule
pub fn var(i: u32) -> Atom {
    Atom::Variable(i)
}

/// creates a variable for a rule
pub fn variable(i: u32) -> Atom {
    Atom::Variable(i)
}

/// builder for the authority block of a new token
///
/// facts and rule heads added here are tagged with the `#authority` symbol
pub struct WaferBuilder<'a, 'b, R: RngCore + CryptoRng> {
    rng: &'a mut R,
    root: &'b KeyPair,
    symbols_start: usize,
    symbols: SymbolTable,
    facts: FactSet,
    rules: Vec<datalog::Rule>,
    caveats: Vec<datalog::Caveat>,
    context: Option<String>,
}

impl<'a, 'b, R: RngCore + CryptoRng> WaferBuilder<'a, 'b, R> {
    pub fn new(
        rng: &'a mut R,
        root: &'b KeyPair,
        base_symbols: SymbolTable,
    ) -> WaferBuilder<'a, 'b, R> {
        WaferBuilder {
            rng,
            root,
            symbols_start: base_symbols.len(),
            symbols: base_symbols,
            facts: FactSet::new(),
            rules: vec![],
            caveats: vec![],
            context: None,
        }
    }

    /// adds a fact to the authority block, prepending the `#authority` tag
    /// if it is not already the first term
    ///
    /// adding the same fact twice fails with `DuplicateFact`
    pub fn add_authority_fact<F: Into<Fact>>(&mut self, fact: F) -> Result<(), error::Token> {
        let mut fact = fact.into();

        let authority_symbol = Atom::Symbol("authority".to_string());
        if fact.0.terms.is_empty() || fact.0.terms[0] != authority_symbol {
            fact.0.terms.insert(0, authority_symbol);
        }

        let f = fact.convert(&mut self.symbols);
        if !self.facts.insert(f.clone()) {
            return Err(error::Token::DuplicateFact(self.symbols.print_fact(&f)));
        }

        Ok(())
    }

    /// adds a rule to the authority block, prepending the `#authority` tag
    /// to its head if needed
    pub fn add_authority_rule<Ru: Into<Rule>>(&mut self, rule: Ru) {
        let mut rule = rule.into();

        let authority_symbol = Atom::Symbol("authority".to_string());
        if (rule.0).terms.is_empty() || (rule.0).terms[0] != authority_symbol {
            (rule.0).terms.insert(0, authority_symbol);
        }

        let r = rule.convert(&mut self.symbols);
        self.rules.push(r);
    }

    pub fn add_authority_caveat<C: Into<Caveat>>(&mut self, caveat: C) {
        let c = caveat.into().convert(&mut self.symbols);
        self.caveats.push(c);
    }

    /// shortcut to declare a right on a resource
    pub fn add_right(&mut self, resource: &str, right: &str) {
        let _ = self.add_authority_fact(fact(
            "right",
            &[s("authority"), string(resource), s(right)],
        ));
    }

    pub fn set_context(&mut self, context: String) {
        self.context = Some(context);
    }

    pub fn build(mut self) -> Result<Wafer, error::Token> {
        let delta = self.symbols.split_off(self.symbols_start);

        let authority_block = Block {
            index: 0,
            symbols: delta,
            facts: self.facts,
            rules: self.rules,
            caveats: self.caveats,
            context: self.context,
        };

        Wafer::new_with_rng(self.rng, self.root, self.symbols, authority_block)
    }
}

/// builder for attenuation blocks; facts and rules are not tagged
#[derive(Clone, Debug)]
pub struct BlockBuilder {
    pub index: u32,
    symbols_start: usize,
    pub symbols: SymbolTable,
    pub facts: FactSet,
    pub rules: Vec<datalog::Rule>,
    pub caveats: Vec<datalog::Caveat>,
    pub context: Option<String>,
}

impl BlockBuilder {
    pub fn new(index: u32, base_symbols: SymbolTable) -> BlockBuilder {
        BlockBuilder {
            index,
            symbols_start: base_symbols.len(),
            symbols: base_symbols,
            facts: FactSet::new(),
            rules: vec![],
            caveats: vec![],
            context: None,
        }
    }

    pub fn add_fact<F: Into<Fact>>(&mut self, fact: F) -> Result<(), error::Token> {
        let f = fact.into().convert(&mut self.symbols);
        if !self.facts.insert(f.clone()) {
            return Err(error::Token::DuplicateFact(self.symbols.print_fact(&f)));
        }

        Ok(())
    }

    pub fn add_rule<Ru: Into<Rule>>(&mut self, rule: Ru) {
        let r = rule.into().convert(&mut self.symbols);
        self.rules.push(r);
    }

    pub fn add_caveat<C: Into<Caveat>>(&mut self, caveat: C) {
        let c = caveat.into().convert(&mut self.symbols);
        self.caveats.push(c);
    }

    pub fn set_context(&mut self, context: String) {
        self.context = Some(context);
    }

    pub fn build(mut self) -> Block {
        let delta = self.symbols.split_off(self.symbols_start);

        Block {
            index: self.index,
            symbols: delta,
            facts: self.facts,
            rules: self.rules,
            caveats: self.caveats,
            context: self.context,
        }
    }

    pub fn check_right(&mut self, right: &str) {
        let caveat = rule(
            "check_right",
            &[s(right)],
            &[
                pred("resource", &[s("ambient"), Atom::Variable(0)]),
                pred("operation", &[s("ambient"), s(right)]),
                pred("right", &[s("authority"), Atom::Variable(0), s(right)]),
            ],
        );

        self.add_caveat(caveat);
    }

    pub fn check_resource(&mut self, resource: &str) {
        let caveat = rule(
            "resource_check",
            &[s("resource_check")],
            &[pred("resource", &[s("ambient"), string(resource)])],
        );

        self.add_caveat(caveat);
    }

    pub fn check_operation(&mut self, operation: &str) {
        let caveat = rule(
            "operation_check",
            &[s("operation_check")],
            &[pred("operation", &[s("ambient"), s(operation)])],
        );

        self.add_caveat(caveat);
    }

    pub fn resource_prefix(&mut self, prefix: &str) {
        let caveat = constrained_rule(
            "prefix",
            &[Atom::Variable(0)],
            &[pred("resource", &[s("ambient"), Atom::Variable(0)])],
            &[Constraint {
                id: 0,
                kind: ConstraintKind::String(datalog::StrConstraint::Prefix(prefix.to_string())),
            }],
        );

        self.add_caveat(caveat);
    }

    pub fn resource_suffix(&mut self, suffix: &str) {
        let caveat = constrained_rule(
            "suffix",
            &[Atom::Variable(0)],
            &[pred("resource", &[s("ambient"), Atom::Variable(0)])],
            &[Constraint {
                id: 0,
                kind: ConstraintKind::String(datalog::StrConstraint::Suffix(suffix.to_string())),
            }],
        );

        self.add_caveat(caveat);
    }

    /// caveat requiring the ambient time to be before the expiration date
    pub fn expiration_date(&mut self, date: SystemTime) {
        let caveat = constrained_rule(
            "expiration",
            &[Atom::Variable(0)],
            &[pred("time", &[s("ambient"), Atom::Variable(0)])],
            &[Constraint {
                id: 0,
                kind: ConstraintKind::Date(DateConstraint::Before(date)),
            }],
        );

        self.add_caveat(caveat);
    }

    /// adds a revocation identifier, so the token can be refused by
    /// verifiers holding a revocation list
    pub fn revocation_id(&mut self, id: i64) {
        let _ = self.add_fact(fact("revocation_id", &[int(id)]));
    }
}
