//! token verification, mixing the token's program with ambient data
use super::builder::{
    self, constrained_rule, date, fact, pred, s, string, Atom, Constraint, ConstraintKind,
};
use super::Wafer;
use crate::datalog::{self, RunLimits, SymbolTable, World};
use crate::error;
use std::time::SystemTime;

/// checks a token's caveats against the request's context
///
/// the verifier seeds a world with the token's facts and rules, adds
/// ambient facts describing the request, then requires every caveat of
/// every block, along with its own caveats, to match at least one fact
pub struct Verifier<'a> {
    token: &'a Wafer,
    base_world: World,
    base_symbols: SymbolTable,
    world: World,
    symbols: SymbolTable,
    caveats: Vec<builder::Caveat>,
}

impl<'a> Verifier<'a> {
    pub(crate) fn new(token: &'a Wafer) -> Result<Self, error::Token> {
        let base_world = token.generate_world(&token.symbols)?;

        Ok(Verifier {
            token,
            world: base_world.clone(),
            base_world,
            symbols: token.symbols.clone(),
            base_symbols: token.symbols.clone(),
            caveats: vec![],
        })
    }

    pub fn add_fact<F: Into<builder::Fact>>(&mut self, fact: F) {
        let fact = fact.into();
        self.world.add_fact(fact.convert(&mut self.symbols));
    }

    pub fn add_rule<R: Into<builder::Rule>>(&mut self, rule: R) {
        let rule = rule.into();
        self.world.add_rule(rule.convert(&mut self.symbols));
    }

    /// adds a caveat checked along with the token's own caveats, in the
    /// order they were added
    pub fn add_caveat<C: Into<builder::Caveat>>(&mut self, caveat: C) {
        self.caveats.push(caveat.into());
    }

    /// declares the resource targeted by the request, as
    /// `resource(#ambient, resource)`
    pub fn add_resource(&mut self, resource: &str) {
        let fact = fact("resource", &[s("ambient"), string(resource)]);
        self.world.add_fact(fact.convert(&mut self.symbols));
    }

    /// declares the operation performed by the request, as
    /// `operation(#ambient, #operation)`
    pub fn add_operation(&mut self, operation: &str) {
        let fact = fact("operation", &[s("ambient"), s(operation)]);
        self.world.add_fact(fact.convert(&mut self.symbols));
    }

    /// declares the request time, as `time(#ambient, date)`
    pub fn set_time(&mut self, time: SystemTime) {
        let fact = fact("time", &[s("ambient"), date(&time)]);
        self.world.add_fact(fact.convert(&mut self.symbols));
    }

    /// caveat refusing tokens carrying a revoked identifier
    pub fn revocation_check(&mut self, ids: &[i64]) {
        let caveat = constrained_rule(
            "revocation_check",
            &[Atom::Variable(0)],
            &[pred("revocation_id", &[Atom::Variable(0)])],
            &[Constraint {
                id: 0,
                kind: ConstraintKind::Integer(datalog::IntConstraint::NotIn(
                    ids.iter().cloned().collect(),
                )),
            }],
        );
        self.add_caveat(caveat);
    }

    pub fn verify(&mut self) -> Result<(), error::Token> {
        self.verify_with_limits(RunLimits::default())
    }

    /// runs the world to its fixed point, then evaluates the verifier
    /// caveats and every block caveat, in order
    ///
    /// all failures are collected and reported in one error
    pub fn verify_with_limits(&mut self, limits: RunLimits) -> Result<(), error::Token> {
        if self.symbols.get("authority").is_none() || self.symbols.get("ambient").is_none() {
            return Err(error::Token::MissingSymbols);
        }

        self.world.run(&limits)?;

        let mut errors = vec![];

        for (i, caveat) in self.caveats.iter().enumerate() {
            let c = caveat.clone().convert(&mut self.symbols);
            let successful = c
                .queries
                .iter()
                .any(|query| !self.world.query_rule(query.clone()).is_empty());

            if !successful {
                errors.push(error::FailedCaveat::Verifier(error::FailedVerifierCaveat {
                    caveat_id: i as u32,
                    rule: self.symbols.print_caveat(&c),
                }));
            }
        }

        for (bi, block_caveats) in self.token.caveats().iter().enumerate() {
            for (ci, caveat) in block_caveats.iter().enumerate() {
                let successful = caveat
                    .queries
                    .iter()
                    .any(|query| !self.world.query_rule(query.clone()).is_empty());

                if !successful {
                    errors.push(error::FailedCaveat::Block(error::FailedBlockCaveat {
                        block_id: bi as u32,
                        caveat_id: ci as u32,
                        rule: self.symbols.print_caveat(caveat),
                    }));
                }
            }
        }

        if !errors.is_empty() {
            return Err(error::Token::FailedLogic(error::Logic::FailedCaveats(
                errors,
            )));
        }

        Ok(())
    }

    /// runs the world and returns the facts matching the rule, in their
    /// public form
    pub fn query<R: Into<builder::Rule>>(
        &mut self,
        rule: R,
    ) -> Result<Vec<builder::Fact>, error::Token> {
        self.query_with_limits(rule, RunLimits::default())
    }

    pub fn query_with_limits<R: Into<builder::Rule>>(
        &mut self,
        rule: R,
        limits: RunLimits,
    ) -> Result<Vec<builder::Fact>, error::Token> {
        let rule = rule.into();

        self.world.run(&limits)?;

        let res = self.world.query_rule(rule.convert(&mut self.symbols));

        let mut facts = vec![];
        for fact in res.iter() {
            facts.push(builder::Fact::convert_from(fact, &self.symbols)?);
        }

        Ok(facts)
    }

    /// returns the index of the first block holding a fact with this name,
    /// scanning the authority block first, then the attenuation blocks in
    /// order
    pub fn block_index_by_fact_name(&self, name: &str) -> Result<usize, error::Token> {
        for f in self.token.authority.facts.iter() {
            if self.symbols.str(f.predicate.name) == Some(name) {
                return Ok(0);
            }
        }

        for (i, b) in self.token.blocks.iter().enumerate() {
            for f in b.facts.iter() {
                if self.symbols.str(f.predicate.name) == Some(name) {
                    return Ok(i + 1);
                }
            }
        }

        Err(error::Token::FactNotFound(name.to_string()))
    }

    pub fn print_world(&self) -> String {
        self.symbols.print_world(&self.world)
    }

    /// restores the verifier to its state right after creation: the world
    /// and symbols are reset to the base snapshot and the verifier caveats
    /// are dropped
    pub fn reset(&mut self) {
        self.caveats.clear();
        self.world = self.base_world.clone();
        self.symbols = self.base_symbols.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::token::builder::{fact, int, pred, rule, s, string, var};
    use crate::token::Wafer;
    use rand::prelude::*;

    fn block_lookup_token(rng: &mut StdRng, root: &KeyPair) -> Wafer {
        let mut builder = Wafer::builder(rng, root);
        for i in 0..3 {
            builder
                .add_authority_fact(fact(&format!("authority_0_fact_{}", i), &[int(i)]))
                .unwrap();
        }
        let mut token = builder.build().unwrap();

        for i in 0..2i64 {
            let mut block = token.create_block();
            for j in 0..3i64 {
                block
                    .add_fact(fact(&format!("block_{}_fact_{}", i, j), &[int(i), int(j)]))
                    .unwrap();
            }
            let keypair = KeyPair::new(rng);
            token = token.append(rng, &keypair, block.build()).unwrap();
        }

        token
    }

    #[test]
    fn block_index_by_fact_name() {
        let mut rng: StdRng = SeedableRng::seed_from_u64(0);
        let root = KeyPair::new(&mut rng);
        let token = block_lookup_token(&mut rng, &root);

        let verifier = token.verify(root.public()).unwrap();

        assert_eq!(
            verifier.block_index_by_fact_name("authority_0_fact_0"),
            Ok(0)
        );
        assert_eq!(
            verifier.block_index_by_fact_name("authority_0_fact_2"),
            Ok(0)
        );
        assert_eq!(verifier.block_index_by_fact_name("block_0_fact_2"), Ok(1));
        assert_eq!(verifier.block_index_by_fact_name("block_1_fact_1"), Ok(2));

        assert_eq!(
            verifier.block_index_by_fact_name("block_1_fact_3"),
            Err(error::Token::FactNotFound("block_1_fact_3".to_string()))
        );
        assert_eq!(
            verifier.block_index_by_fact_name("block_2_fact_1"),
            Err(error::Token::FactNotFound("block_2_fact_1".to_string()))
        );
    }

    #[test]
    fn caveat_failures_accumulate_in_order() {
        let mut rng: StdRng = SeedableRng::seed_from_u64(0);
        let root = KeyPair::new(&mut rng);

        let mut builder = Wafer::builder(&mut rng, &root);
        builder.add_right("file1", "read");
        let token = builder.build().unwrap();

        let mut verifier = token.verify(root.public()).unwrap();
        verifier
            .add_caveat(rule(
                "first",
                &[s("first")],
                &[pred("resource", &[s("ambient"), string("file2")])],
            ));
        verifier
            .add_caveat(rule(
                "second",
                &[s("second")],
                &[pred("operation", &[s("ambient"), s("write")])],
            ));

        let res = verifier.verify();
        match res {
            Err(error::Token::FailedLogic(error::Logic::FailedCaveats(v))) => {
                assert_eq!(v.len(), 2);
                match (&v[0], &v[1]) {
                    (
                        error::FailedCaveat::Verifier(first),
                        error::FailedCaveat::Verifier(second),
                    ) => {
                        assert_eq!(first.caveat_id, 0);
                        assert!(first.rule.contains("first"));
                        assert_eq!(second.caveat_id, 1);
                        assert!(second.rule.contains("second"));
                    }
                    other => panic!("expected verifier caveats, got {:?}", other),
                }
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn verify_is_idempotent() {
        let mut rng: StdRng = SeedableRng::seed_from_u64(0);
        let root = KeyPair::new(&mut rng);

        let mut builder = Wafer::builder(&mut rng, &root);
        builder.add_right("file1", "read");
        let token = builder.build().unwrap();

        let mut verifier = token.verify(root.public()).unwrap();
        verifier.add_resource("file1");
        verifier.add_operation("read");
        verifier
            .add_caveat(rule(
                "check",
                &[s("check")],
                &[pred("right", &[s("authority"), string("file1"), s("read")])],
            ));

        let first = verifier.verify();
        let second = verifier.verify();
        assert_eq!(first, second);
        assert!(first.is_ok());
    }

    #[test]
    fn reset_restores_the_base_world() {
        let mut rng: StdRng = SeedableRng::seed_from_u64(0);
        let root = KeyPair::new(&mut rng);

        let mut builder = Wafer::builder(&mut rng, &root);
        builder.add_right("file1", "read");
        let token = builder.build().unwrap();

        let mut verifier = token.verify(root.public()).unwrap();
        let base_world = verifier.world.clone();
        let base_symbols = verifier.symbols.clone();

        verifier.add_resource("file2");
        verifier.add_operation("write");
        verifier
            .add_caveat(rule(
                "check",
                &[s("check")],
                &[pred("resource", &[s("ambient"), string("file1")])],
            ));
        assert!(verifier.verify().is_err());

        verifier.reset();
        assert_eq!(verifier.world, base_world);
        assert_eq!(verifier.symbols, base_symbols);
        assert!(verifier.caveats.is_empty());

        // a verifier reset after failure can validate the same token
        verifier.add_resource("file1");
        verifier.add_operation("read");
        verifier
            .add_caveat(rule(
                "check",
                &[s("check")],
                &[pred("resource", &[s("ambient"), string("file1")])],
            ));
        assert!(verifier.verify().is_ok());
    }

    #[test]
    fn query_returns_public_facts() {
        let mut rng: StdRng = SeedableRng::seed_from_u64(0);
        let root = KeyPair::new(&mut rng);

        let mut builder = Wafer::builder(&mut rng, &root);
        builder
            .add_authority_fact(fact("key", &[int(1234)]))
            .unwrap();
        let token = builder.build().unwrap();

        let mut verifier = token.verify(root.public()).unwrap();
        let res = verifier
            .query(rule(
                "key_verif",
                &[var(0)],
                &[pred("key", &[s("authority"), var(0)])],
            ))
            .unwrap();

        assert_eq!(res, vec![fact("key_verif", &[int(1234)])]);
    }

    #[test]
    fn expired_token() {
        let mut rng: StdRng = SeedableRng::seed_from_u64(0);
        let root = KeyPair::new(&mut rng);

        let mut builder = Wafer::builder(&mut rng, &root);
        builder.add_right("file1", "read");
        let token = builder.build().unwrap();

        let mut block = token.create_block();
        block.expiration_date(SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1000));
        let keypair = KeyPair::new(&mut rng);
        let token = token.append(&mut rng, &keypair, block.build()).unwrap();

        let mut verifier = token.verify(root.public()).unwrap();
        verifier.set_time(SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(500));
        assert!(verifier.verify().is_ok());

        verifier.reset();
        verifier.set_time(SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(2000));
        assert!(verifier.verify().is_err());

        // the expiration bound is strict
        verifier.reset();
        verifier.set_time(SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1000));
        assert!(verifier.verify().is_err());
    }
}
