//! symbol interning and pretty printing
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::HashSet;

use super::{
    BytesConstraint, Caveat, Constraint, ConstraintKind, DateConstraint, Fact, IntConstraint,
    Predicate, Rule, StrConstraint, Symbol, SymbolConstraint, Term, World,
};

#[derive(Clone, Debug, PartialEq, Default)]
pub struct SymbolTable {
    pub symbols: Vec<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// interns the string and returns its id
    pub fn insert(&mut self, s: &str) -> Symbol {
        match self.symbols.iter().position(|sym| sym.as_str() == s) {
            Some(index) => index as u64,
            None => {
                self.symbols.push(s.to_string());
                (self.symbols.len() - 1) as u64
            }
        }
    }

    pub fn add(&mut self, s: &str) -> Term {
        let id = self.insert(s);
        Term::Symbol(id)
    }

    pub fn get(&self, s: &str) -> Option<Symbol> {
        self.symbols
            .iter()
            .position(|sym| sym.as_str() == s)
            .map(|i| i as u64)
    }

    pub fn str(&self, id: Symbol) -> Option<&str> {
        self.symbols.get(id as usize).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn extend(&mut self, other: &SymbolTable) {
        self.symbols.extend(other.symbols.iter().cloned())
    }

    /// splits the table at `n`, returning the suffix as a fresh table
    pub fn split_off(&mut self, n: usize) -> SymbolTable {
        SymbolTable {
            symbols: self.symbols.split_off(n),
        }
    }

    pub fn is_disjoint(&self, other: &SymbolTable) -> bool {
        let h1 = self.symbols.iter().collect::<HashSet<_>>();
        let h2 = other.symbols.iter().collect::<HashSet<_>>();

        h1.is_disjoint(&h2)
    }

    pub fn print_symbol(&self, s: Symbol) -> String {
        self.str(s)
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("<{}?>", s))
    }

    pub fn print_term(&self, term: &Term) -> String {
        match term {
            Term::Variable(i) => format!("${}", i),
            Term::Integer(i) => i.to_string(),
            Term::Str(s) => format!("\"{}\"", s),
            Term::Symbol(index) => format!("#{}", self.print_symbol(*index)),
            Term::Date(d) => {
                let date =
                    DateTime::<Utc>::from_utc(NaiveDateTime::from_timestamp(*d as i64, 0), Utc);
                date.to_rfc3339()
            }
            Term::Bytes(s) => format!("hex:{}", hex::encode(s)),
        }
    }

    pub fn print_fact(&self, f: &Fact) -> String {
        self.print_predicate(&f.predicate)
    }

    pub fn print_predicate(&self, p: &Predicate) -> String {
        let strings = p
            .terms
            .iter()
            .map(|term| self.print_term(term))
            .collect::<Vec<_>>();
        format!(
            "{}({})",
            self.str(p.name).unwrap_or("<?>"),
            strings.join(", ")
        )
    }

    pub fn print_constraint(&self, c: &Constraint) -> String {
        let var = c.id;
        match &c.kind {
            ConstraintKind::Int(IntConstraint::Lower(i)) => format!("${} < {}", var, i),
            ConstraintKind::Int(IntConstraint::Larger(i)) => format!("${} > {}", var, i),
            ConstraintKind::Int(IntConstraint::LowerOrEqual(i)) => format!("${} <= {}", var, i),
            ConstraintKind::Int(IntConstraint::LargerOrEqual(i)) => format!("${} >= {}", var, i),
            ConstraintKind::Int(IntConstraint::Equal(i)) => format!("${} == {}", var, i),
            ConstraintKind::Int(IntConstraint::In(i)) => format!("${} in {:?}", var, i),
            ConstraintKind::Int(IntConstraint::NotIn(i)) => format!("${} not in {:?}", var, i),
            ConstraintKind::Str(StrConstraint::Prefix(i)) => format!("${} matches {}*", var, i),
            ConstraintKind::Str(StrConstraint::Suffix(i)) => format!("${} matches *{}", var, i),
            ConstraintKind::Str(StrConstraint::Equal(i)) => format!("${} == \"{}\"", var, i),
            ConstraintKind::Str(StrConstraint::Regex(i)) => format!("${} matches /{}/", var, i),
            ConstraintKind::Str(StrConstraint::In(i)) => format!("${} in {:?}", var, i),
            ConstraintKind::Str(StrConstraint::NotIn(i)) => format!("${} not in {:?}", var, i),
            ConstraintKind::Date(DateConstraint::Before(i)) => {
                let date =
                    DateTime::<Utc>::from_utc(NaiveDateTime::from_timestamp(*i as i64, 0), Utc);
                format!("${} < {}", var, date.to_rfc3339())
            }
            ConstraintKind::Date(DateConstraint::After(i)) => {
                let date =
                    DateTime::<Utc>::from_utc(NaiveDateTime::from_timestamp(*i as i64, 0), Utc);
                format!("${} > {}", var, date.to_rfc3339())
            }
            ConstraintKind::Symbol(SymbolConstraint::In(i)) => {
                let symbols = i.iter().map(|s| self.print_symbol(*s)).collect::<Vec<_>>();
                format!("${} in {:?}", var, symbols)
            }
            ConstraintKind::Symbol(SymbolConstraint::NotIn(i)) => {
                let symbols = i.iter().map(|s| self.print_symbol(*s)).collect::<Vec<_>>();
                format!("${} not in {:?}", var, symbols)
            }
            ConstraintKind::Bytes(BytesConstraint::Equal(i)) => {
                format!("${} == hex:{}", var, hex::encode(i))
            }
            ConstraintKind::Bytes(BytesConstraint::In(i)) => format!(
                "${} in {:?}",
                var,
                i.iter()
                    .map(|s| format!("hex:{}", hex::encode(s)))
                    .collect::<HashSet<_>>()
            ),
            ConstraintKind::Bytes(BytesConstraint::NotIn(i)) => format!(
                "${} not in {:?}",
                var,
                i.iter()
                    .map(|s| format!("hex:{}", hex::encode(s)))
                    .collect::<HashSet<_>>()
            ),
        }
    }

    pub fn print_rule(&self, r: &Rule) -> String {
        let res = self.print_predicate(&r.head);
        let preds: Vec<_> = r.body.iter().map(|p| self.print_predicate(p)).collect();
        let constraints: Vec<_> = r
            .constraints
            .iter()
            .map(|c| self.print_constraint(c))
            .collect();

        let c = if constraints.is_empty() {
            String::new()
        } else {
            format!(" @ {}", constraints.join(", "))
        };

        format!("*{} <- {}{}", res, preds.join(", "), c)
    }

    pub fn print_caveat(&self, c: &Caveat) -> String {
        let queries = c
            .queries
            .iter()
            .map(|r| self.print_rule(r))
            .collect::<Vec<_>>();

        queries.join(" || ")
    }

    pub fn print_world(&self, w: &World) -> String {
        let facts = w
            .facts
            .iter()
            .map(|f| self.print_fact(f))
            .collect::<Vec<_>>();
        let rules = w
            .rules
            .iter()
            .map(|r| self.print_rule(r))
            .collect::<Vec<_>>();
        format!("World {{\n  facts: {:#?}\n  rules: {:#?}\n}}", facts, rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let mut syms = SymbolTable::new();
        let a = syms.insert("alpha");
        let b = syms.insert("beta");
        assert_eq!(syms.insert("alpha"), a);
        assert_eq!(syms.insert("beta"), b);
        assert_eq!(syms.len(), 2);
        assert_eq!(syms.str(a), Some("alpha"));
        assert_eq!(syms.str(42), None);
    }

    #[test]
    fn split_off_returns_the_delta() {
        let mut syms = SymbolTable::new();
        syms.insert("authority");
        syms.insert("ambient");
        let start = syms.len();
        syms.insert("right");
        syms.insert("file1");

        let delta = syms.split_off(start);
        assert_eq!(delta.symbols, vec!["right".to_string(), "file1".to_string()]);
        assert_eq!(syms.symbols, vec!["authority".to_string(), "ambient".to_string()]);
        assert!(syms.is_disjoint(&delta));
    }

    #[test]
    fn extend_appends_in_order() {
        let mut base = SymbolTable::new();
        base.insert("authority");
        let mut delta = SymbolTable::new();
        delta.insert("file1");
        delta.insert("read");

        base.extend(&delta);
        assert_eq!(base.get("file1"), Some(1));
        assert_eq!(base.get("read"), Some(2));
    }
}
