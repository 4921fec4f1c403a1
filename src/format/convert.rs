//! conversions between the in-memory structures and the Protobuf messages
use super::schema;
use crate::crypto::TokenSignature;
use crate::datalog::*;
use crate::error;
use crate::token::Block;
use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};

pub fn token_sig_to_proto_sig(input: &TokenSignature) -> schema::Signature {
    schema::Signature {
        parameters: input
            .parameters
            .iter()
            .map(|p| p.compress().to_bytes().to_vec())
            .collect(),
        z: input.z.as_bytes().to_vec(),
    }
}

pub fn proto_sig_to_token_sig(input: schema::Signature) -> Result<TokenSignature, error::Format> {
    let parameters = input
        .parameters
        .iter()
        .map(|data| decode_point(data))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TokenSignature {
        parameters,
        z: decode_scalar(&input.z)?,
    })
}

fn decode_point(data: &[u8]) -> Result<RistrettoPoint, error::Format> {
    if data.len() != 32 {
        return Err(error::Format::DeserializationError(format!(
            "invalid size for a signature point: {} bytes",
            data.len()
        )));
    }

    CompressedRistretto::from_slice(data)
        .decompress()
        .ok_or_else(|| {
            error::Format::DeserializationError("cannot decompress signature point".to_string())
        })
}

fn decode_scalar(data: &[u8]) -> Result<Scalar, error::Format> {
    if data.len() != 32 {
        return Err(error::Format::DeserializationError(format!(
            "invalid size for a signature scalar: {} bytes",
            data.len()
        )));
    }

    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(data);
    Scalar::from_canonical_bytes(bytes).ok_or_else(|| {
        error::Format::DeserializationError("non canonical signature scalar".to_string())
    })
}

pub fn token_block_to_proto_block(input: &Block) -> schema::Block {
    schema::Block {
        index: input.index,
        symbols: input.symbols.symbols.clone(),
        facts: input.facts.iter().map(token_fact_to_proto_fact).collect(),
        rules: input.rules.iter().map(token_rule_to_proto_rule).collect(),
        caveats: input
            .caveats
            .iter()
            .map(token_caveat_to_proto_caveat)
            .collect(),
        context: input.context.clone(),
    }
}

pub fn proto_block_to_token_block(input: &schema::Block) -> Result<Block, error::Format> {
    Ok(Block {
        index: input.index,
        symbols: SymbolTable {
            symbols: input.symbols.clone(),
        },
        facts: input
            .facts
            .iter()
            .map(proto_fact_to_token_fact)
            .collect::<Result<FactSet, _>>()?,
        rules: input
            .rules
            .iter()
            .map(proto_rule_to_token_rule)
            .collect::<Result<_, _>>()?,
        caveats: input
            .caveats
            .iter()
            .map(proto_caveat_to_token_caveat)
            .collect::<Result<_, _>>()?,
        context: input.context.clone(),
    })
}

pub fn token_fact_to_proto_fact(input: &Fact) -> schema::Fact {
    schema::Fact {
        predicate: token_predicate_to_proto_predicate(&input.predicate),
    }
}

pub fn proto_fact_to_token_fact(input: &schema::Fact) -> Result<Fact, error::Format> {
    Ok(Fact {
        predicate: proto_predicate_to_token_predicate(&input.predicate)?,
    })
}

pub fn token_caveat_to_proto_caveat(input: &Caveat) -> schema::Caveat {
    schema::Caveat {
        queries: input.queries.iter().map(token_rule_to_proto_rule).collect(),
    }
}

pub fn proto_caveat_to_token_caveat(input: &schema::Caveat) -> Result<Caveat, error::Format> {
    Ok(Caveat {
        queries: input
            .queries
            .iter()
            .map(proto_rule_to_token_rule)
            .collect::<Result<_, _>>()?,
    })
}

pub fn token_rule_to_proto_rule(input: &Rule) -> schema::Rule {
    schema::Rule {
        head: token_predicate_to_proto_predicate(&input.head),
        body: input
            .body
            .iter()
            .map(token_predicate_to_proto_predicate)
            .collect(),
        constraints: input
            .constraints
            .iter()
            .map(token_constraint_to_proto_constraint)
            .collect(),
    }
}

pub fn proto_rule_to_token_rule(input: &schema::Rule) -> Result<Rule, error::Format> {
    Ok(Rule {
        head: proto_predicate_to_token_predicate(&input.head)?,
        body: input
            .body
            .iter()
            .map(proto_predicate_to_token_predicate)
            .collect::<Result<_, _>>()?,
        constraints: input
            .constraints
            .iter()
            .map(proto_constraint_to_token_constraint)
            .collect::<Result<_, _>>()?,
    })
}

pub fn token_predicate_to_proto_predicate(input: &Predicate) -> schema::Predicate {
    schema::Predicate {
        name: input.name,
        terms: input.terms.iter().map(token_term_to_proto_term).collect(),
    }
}

pub fn proto_predicate_to_token_predicate(
    input: &schema::Predicate,
) -> Result<Predicate, error::Format> {
    Ok(Predicate {
        name: input.name,
        terms: input
            .terms
            .iter()
            .map(proto_term_to_token_term)
            .collect::<Result<_, _>>()?,
    })
}

pub fn token_term_to_proto_term(input: &Term) -> schema::Term {
    use schema::term::Content;

    let content = match input {
        Term::Symbol(s) => Content::Symbol(*s),
        Term::Variable(v) => Content::Variable(*v),
        Term::Integer(i) => Content::Integer(*i),
        Term::Str(s) => Content::Str(s.clone()),
        Term::Date(d) => Content::Date(*d),
        Term::Bytes(b) => Content::Bytes(b.clone()),
    };

    schema::Term {
        content: Some(content),
    }
}

pub fn proto_term_to_token_term(input: &schema::Term) -> Result<Term, error::Format> {
    use schema::term::Content;

    match &input.content {
        Some(Content::Symbol(s)) => Ok(Term::Symbol(*s)),
        Some(Content::Variable(v)) => Ok(Term::Variable(*v)),
        Some(Content::Integer(i)) => Ok(Term::Integer(*i)),
        Some(Content::Str(s)) => Ok(Term::Str(s.clone())),
        Some(Content::Date(d)) => Ok(Term::Date(*d)),
        Some(Content::Bytes(b)) => Ok(Term::Bytes(b.clone())),
        None => Err(error::Format::DeserializationError(
            "empty term".to_string(),
        )),
    }
}

pub fn token_constraint_to_proto_constraint(input: &Constraint) -> schema::Constraint {
    use schema::constraint::Kind;

    let kind = match &input.kind {
        ConstraintKind::Int(c) => Kind::Int(token_int_constraint(c)),
        ConstraintKind::Str(c) => Kind::Str(token_str_constraint(c)),
        ConstraintKind::Date(c) => Kind::Date(token_date_constraint(c)),
        ConstraintKind::Symbol(c) => Kind::Symbol(token_symbol_constraint(c)),
        ConstraintKind::Bytes(c) => Kind::Bytes(token_bytes_constraint(c)),
    };

    schema::Constraint {
        id: input.id,
        kind: Some(kind),
    }
}

pub fn proto_constraint_to_token_constraint(
    input: &schema::Constraint,
) -> Result<Constraint, error::Format> {
    use schema::constraint::Kind;

    let kind = match &input.kind {
        Some(Kind::Int(c)) => ConstraintKind::Int(proto_int_constraint(c)?),
        Some(Kind::Str(c)) => ConstraintKind::Str(proto_str_constraint(c)?),
        Some(Kind::Date(c)) => ConstraintKind::Date(proto_date_constraint(c)?),
        Some(Kind::Symbol(c)) => ConstraintKind::Symbol(proto_symbol_constraint(c)?),
        Some(Kind::Bytes(c)) => ConstraintKind::Bytes(proto_bytes_constraint(c)?),
        None => {
            return Err(error::Format::DeserializationError(
                "empty constraint".to_string(),
            ))
        }
    };

    Ok(Constraint {
        id: input.id,
        kind,
    })
}

fn token_int_constraint(input: &IntConstraint) -> schema::IntConstraint {
    use schema::int_constraint::Op;

    let op = match input {
        IntConstraint::Lower(i) => Op::Lower(*i),
        IntConstraint::Larger(i) => Op::Larger(*i),
        IntConstraint::LowerOrEqual(i) => Op::LowerOrEqual(*i),
        IntConstraint::LargerOrEqual(i) => Op::LargerOrEqual(*i),
        IntConstraint::Equal(i) => Op::Equal(*i),
        IntConstraint::In(s) => Op::InSet(schema::IntSet {
            set: s.iter().cloned().collect(),
        }),
        IntConstraint::NotIn(s) => Op::NotInSet(schema::IntSet {
            set: s.iter().cloned().collect(),
        }),
    };

    schema::IntConstraint { op: Some(op) }
}

fn proto_int_constraint(input: &schema::IntConstraint) -> Result<IntConstraint, error::Format> {
    use schema::int_constraint::Op;

    match &input.op {
        Some(Op::Lower(i)) => Ok(IntConstraint::Lower(*i)),
        Some(Op::Larger(i)) => Ok(IntConstraint::Larger(*i)),
        Some(Op::LowerOrEqual(i)) => Ok(IntConstraint::LowerOrEqual(*i)),
        Some(Op::LargerOrEqual(i)) => Ok(IntConstraint::LargerOrEqual(*i)),
        Some(Op::Equal(i)) => Ok(IntConstraint::Equal(*i)),
        Some(Op::InSet(s)) => Ok(IntConstraint::In(s.set.iter().cloned().collect())),
        Some(Op::NotInSet(s)) => Ok(IntConstraint::NotIn(s.set.iter().cloned().collect())),
        None => Err(error::Format::DeserializationError(
            "empty integer constraint".to_string(),
        )),
    }
}

fn token_str_constraint(input: &StrConstraint) -> schema::StringConstraint {
    use schema::string_constraint::Op;

    let op = match input {
        StrConstraint::Prefix(s) => Op::Prefix(s.clone()),
        StrConstraint::Suffix(s) => Op::Suffix(s.clone()),
        StrConstraint::Equal(s) => Op::Equal(s.clone()),
        StrConstraint::In(s) => Op::InSet(schema::StringSet {
            set: s.iter().cloned().collect(),
        }),
        StrConstraint::NotIn(s) => Op::NotInSet(schema::StringSet {
            set: s.iter().cloned().collect(),
        }),
        StrConstraint::Regex(s) => Op::Regex(s.clone()),
    };

    schema::StringConstraint { op: Some(op) }
}

fn proto_str_constraint(input: &schema::StringConstraint) -> Result<StrConstraint, error::Format> {
    use schema::string_constraint::Op;

    match &input.op {
        Some(Op::Prefix(s)) => Ok(StrConstraint::Prefix(s.clone())),
        Some(Op::Suffix(s)) => Ok(StrConstraint::Suffix(s.clone())),
        Some(Op::Equal(s)) => Ok(StrConstraint::Equal(s.clone())),
        Some(Op::InSet(s)) => Ok(StrConstraint::In(s.set.iter().cloned().collect())),
        Some(Op::NotInSet(s)) => Ok(StrConstraint::NotIn(s.set.iter().cloned().collect())),
        Some(Op::Regex(s)) => Ok(StrConstraint::Regex(s.clone())),
        None => Err(error::Format::DeserializationError(
            "empty string constraint".to_string(),
        )),
    }
}

fn token_date_constraint(input: &DateConstraint) -> schema::DateConstraint {
    use schema::date_constraint::Op;

    let op = match input {
        DateConstraint::Before(d) => Op::Before(*d),
        DateConstraint::After(d) => Op::After(*d),
    };

    schema::DateConstraint { op: Some(op) }
}

fn proto_date_constraint(input: &schema::DateConstraint) -> Result<DateConstraint, error::Format> {
    use schema::date_constraint::Op;

    match &input.op {
        Some(Op::Before(d)) => Ok(DateConstraint::Before(*d)),
        Some(Op::After(d)) => Ok(DateConstraint::After(*d)),
        None => Err(error::Format::DeserializationError(
            "empty date constraint".to_string(),
        )),
    }
}

fn token_symbol_constraint(input: &SymbolConstraint) -> schema::SymbolConstraint {
    use schema::symbol_constraint::Op;

    let op = match input {
        SymbolConstraint::In(s) => Op::InSet(schema::SymbolSet {
            set: s.iter().cloned().collect(),
        }),
        SymbolConstraint::NotIn(s) => Op::NotInSet(schema::SymbolSet {
            set: s.iter().cloned().collect(),
        }),
    };

    schema::SymbolConstraint { op: Some(op) }
}

fn proto_symbol_constraint(
    input: &schema::SymbolConstraint,
) -> Result<SymbolConstraint, error::Format> {
    use schema::symbol_constraint::Op;

    match &input.op {
        Some(Op::InSet(s)) => Ok(SymbolConstraint::In(s.set.iter().cloned().collect())),
        Some(Op::NotInSet(s)) => Ok(SymbolConstraint::NotIn(s.set.iter().cloned().collect())),
        None => Err(error::Format::DeserializationError(
            "empty symbol constraint".to_string(),
        )),
    }
}

fn token_bytes_constraint(input: &BytesConstraint) -> schema::BytesConstraint {
    use schema::bytes_constraint::Op;

    let op = match input {
        BytesConstraint::Equal(b) => Op::Equal(b.clone()),
        BytesConstraint::In(s) => Op::InSet(schema::BytesSet {
            set: s.iter().cloned().collect(),
        }),
        BytesConstraint::NotIn(s) => Op::NotInSet(schema::BytesSet {
            set: s.iter().cloned().collect(),
        }),
    };

    schema::BytesConstraint { op: Some(op) }
}

fn proto_bytes_constraint(
    input: &schema::BytesConstraint,
) -> Result<BytesConstraint, error::Format> {
    use schema::bytes_constraint::Op;

    match &input.op {
        Some(Op::Equal(b)) => Ok(BytesConstraint::Equal(b.clone())),
        Some(Op::InSet(s)) => Ok(BytesConstraint::In(s.set.iter().cloned().collect())),
        Some(Op::NotInSet(s)) => Ok(BytesConstraint::NotIn(s.set.iter().cloned().collect())),
        None => Err(error::Format::DeserializationError(
            "empty bytes constraint".to_string(),
        )),
    }
}
