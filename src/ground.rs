use std::collections::{BTreeMap, BTreeSet};
use fixed::types::I40F24;
use tracing::{debug, trace};
use crate::{Binding, Condition, CostEffect, Effect, EffectError, Literal, Predicate, TypedParameter, TypeIndex};
use crate::cartesian::cartesian_product;
use crate::effect::RawEffect;

/// One grounded conditional literal: `literal` is produced whenever every
/// literal of `condition` holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroundEffect {
    pub condition: Vec<Literal>,
    pub literal: Literal
}

/// The grounded effects of one branch of an action's top-level choice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroundOutcome {
    pub label: Option<String>,
    pub effects: Vec<GroundEffect>
}

/// Grounds effects against one problem instance.
pub struct Grounder<'a> {
    facts: &'a BTreeSet<Predicate>,
    numeric_facts: &'a BTreeMap<Predicate, I40F24>,
    fluents: &'a BTreeSet<String>,
    types: &'a TypeIndex
}

impl<'a> Grounder<'a> {
    pub fn new(facts: &'a BTreeSet<Predicate>, numeric_facts: &'a BTreeMap<Predicate, I40F24>,
               fluents: &'a BTreeSet<String>, types: &'a TypeIndex) -> Self {
        Grounder {facts, numeric_facts, fluents, types}
    }

    /// Appends the (condition, literal) pairs `effect` produces under
    /// `binding`.
    ///
    /// Raw effects are partially evaluated against the static facts, and a
    /// raw effect whose condition is statically false produces nothing.
    /// Every other shape is grounded by plain substitution, so a conditional
    /// guard keeps all of its conjuncts: static and `=` literals show up in
    /// the ground condition unevaluated. Choices must be split off first with
    /// [`Grounder::ground_outcomes`].
    pub fn ground(&self, effect: &Effect, binding: &Binding, result: &mut Vec<GroundEffect>) -> Result<(), EffectError> {
        match effect {
            Effect::Raw(raw) => self.ground_raw(raw, binding, result),
            Effect::Simple(lit) => {
                let mut literals = Vec::with_capacity(1);
                lit.instantiate(binding, self.facts, self.fluents, &mut literals)?;
                for literal in literals {
                    trace!(%literal, "ground effect");
                    result.push(GroundEffect {condition: vec![], literal});
                }
                Ok(())
            }
            Effect::Cost(_) => Ok(()),
            Effect::Conditional(c) => {
                let condition = c.condition.literals().into_iter()
                    .map(|l| l.ground(binding))
                    .collect::<Result<Vec<_>, _>>()?;
                let start = result.len();
                self.ground(&c.effect, binding, result)?;
                for pair in result[start..].iter_mut() {
                    let mut guard = condition.clone();
                    guard.append(&mut pair.condition);
                    pair.condition = guard;
                }
                Ok(())
            }
            Effect::Universal(u) => {
                let domains = u.parameters().iter()
                    .map(|p| self.types.objects_of(&p.type_name))
                    .collect();
                let mut extended = binding.clone();
                for objects in cartesian_product(domains) {
                    for (p, o) in u.parameters().iter().zip(objects) {
                        extended.insert(p.name.clone(), o.clone());
                    }
                    self.ground(u.effect(), &extended, result)?;
                }
                Ok(())
            }
            Effect::Conjunctive(c) => {
                for e in c.effects() {
                    self.ground(e, binding, result)?;
                }
                Ok(())
            }
            Effect::LabeledOutcome(o) => self.ground(o.effect(), binding, result),
            Effect::Oneof(_) | Effect::LabeledOneof(_) => Err(EffectError::ChoiceBelowTopLevel)
        }
    }

    fn ground_raw(&self, raw: &RawEffect, binding: &Binding, result: &mut Vec<GroundEffect>) -> Result<(), EffectError> {
        if raw.parameters.is_empty() {
            return self.ground_raw_leaf(raw, binding, result);
        }
        let domains = raw.parameters.iter()
            .map(|p| self.types.objects_of(&p.type_name))
            .collect();
        let mut extended = binding.clone();
        for objects in cartesian_product(domains) {
            for (p, o) in raw.parameters.iter().zip(objects) {
                extended.insert(p.name.clone(), o.clone());
            }
            self.ground_raw_leaf(raw, &extended, result)?;
        }
        Ok(())
    }

    fn ground_raw_leaf(&self, raw: &RawEffect, binding: &Binding, result: &mut Vec<GroundEffect>) -> Result<(), EffectError> {
        let mut condition = Vec::new();
        match raw.condition.instantiate(binding, self.facts, self.fluents, &mut condition) {
            Ok(()) => {},
            Err(EffectError::Impossible) => {
                debug!(literal = %raw.literal, "pruned effect with impossible condition");
                return Ok(());
            }
            Err(e) => return Err(e)
        }
        let mut effects = Vec::with_capacity(1);
        raw.literal.instantiate(binding, self.facts, self.fluents, &mut effects)?;
        if let Some(literal) = effects.pop() {
            trace!(%literal, conditions = condition.len(), "ground effect");
            result.push(GroundEffect {condition, literal});
        }
        Ok(())
    }

    /// Grounds each branch of the top-level choice of a canonical effect.
    /// Effects conjoined beside the choice belong to every branch. Without
    /// a choice there is exactly one outcome.
    pub fn ground_outcomes(&self, effect: &Effect, binding: &Binding) -> Result<Vec<GroundOutcome>, EffectError> {
        match effect {
            Effect::Oneof(o) => o.effects().iter()
                .map(|branch| self.outcome(branch.outcome_label().map(|l| l.to_string()), branch, binding))
                .collect(),
            Effect::LabeledOneof(l) => l.outcomes().iter()
                .map(|o| self.outcome(Some(o.outcome_label().to_string()), o.effect(), binding))
                .collect(),
            Effect::Conjunctive(c) => {
                let mut choices = c.effects().iter().filter(|e| e.is_choice());
                match (choices.next(), choices.next()) {
                    (None, _) => Ok(vec![self.outcome(c.outcome_label().map(|l| l.to_string()), effect, binding)?]),
                    (Some(choice), None) => {
                        let mut shared = Vec::new();
                        for e in c.effects().iter().filter(|e| !e.is_choice()) {
                            self.ground(e, binding, &mut shared)?;
                        }
                        let mut outcomes = self.ground_outcomes(choice, binding)?;
                        for outcome in outcomes.iter_mut() {
                            let mut effects = shared.clone();
                            effects.append(&mut outcome.effects);
                            outcome.effects = effects;
                        }
                        Ok(outcomes)
                    }
                    (Some(_), Some(_)) => Err(EffectError::ChoiceBelowTopLevel)
                }
            }
            other => Ok(vec![self.outcome(other.outcome_label().map(|l| l.to_string()), other, binding)?])
        }
    }

    fn outcome(&self, label: Option<String>, effect: &Effect, binding: &Binding) -> Result<GroundOutcome, EffectError> {
        let mut effects = Vec::new();
        self.ground(effect, binding, &mut effects)?;
        Ok(GroundOutcome {label, effects})
    }

    /// Every binding of an action's parameters to objects of their types.
    pub fn action_bindings<'b>(&'b self, parameters: &'b [TypedParameter]) -> impl Iterator<Item = Binding> + 'b {
        let domains: Vec<&'b [String]> = parameters.iter()
            .map(|p| self.types.objects_of(&p.type_name))
            .collect();
        cartesian_product(domains).map(move |objects| parameters.iter().zip(objects)
            .map(|(p, o)| (p.name.clone(), o.clone()))
            .collect())
    }

    /// The fluent part of `condition` under `binding`, or `None` when the
    /// static part already rules the binding out.
    pub fn precondition(&self, condition: &Condition, binding: &Binding) -> Result<Option<Vec<Literal>>, EffectError> {
        let mut fluent_part = Vec::new();
        match condition.instantiate(binding, self.facts, self.fluents, &mut fluent_part) {
            Ok(()) => Ok(Some(fluent_part)),
            Err(EffectError::Impossible) => Ok(None),
            Err(e) => Err(e)
        }
    }

    pub fn cost(&self, cost: &CostEffect, binding: &Binding) -> Result<I40F24, EffectError> {
        cost.evaluate(binding, self.numeric_facts)
    }
}
