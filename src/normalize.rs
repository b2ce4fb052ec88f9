//! Rewriting effects into canonical form.
//!
//! Canonical effects have at most one choice, at the top (possibly next to a
//! cost update), and every branch of that choice is a flat conjunction of
//! simple and guarded effects. Quantifiers are unfolded over the objects of
//! their types, guards are pushed down to the literals they protect, and
//! choices are distributed over the conjunctions that contain them.

use tracing::debug;
use crate::{label, Binding, Condition, CostEffect, Effect, EffectError, TypeIndex};
use crate::cartesian::cartesian_product;
use crate::cost::merge_cost;
use crate::effect::{push_outcome, ConjunctiveEffect, LabeledOneofEffect, LabeledOutcomeEffect, OneofEffect, UniversalEffect};

impl Effect {
    pub fn normalize(&self, types: &TypeIndex) -> Result<Effect, EffectError> {
        match self {
            Effect::Raw(raw) => raw.structured().normalize(types),
            Effect::Simple(_) | Effect::Cost(_) => Ok(self.clone()),
            Effect::Conditional(c) => guard(&c.condition, c.effect.normalize(types)?),
            Effect::Universal(u) => u.normalize(types),
            Effect::Conjunctive(c) => c.normalize(types),
            Effect::Oneof(o) => {
                let mut cost = None;
                let mut branches = Vec::with_capacity(o.effects.len());
                for effect in o.effects.iter() {
                    let normalized = match effect {
                        Effect::LabeledOutcome(outcome) =>
                            LabeledOneofEffect {label: None, outcomes: vec![outcome.clone()]}.normalize(types)?,
                        other => other.normalize(types)?
                    };
                    let (found, branch) = split_cost(normalized);
                    merge_cost(&mut cost, found)?;
                    branches.push(branch);
                }
                Ok(with_cost(cost, Effect::oneof(branches)))
            }
            Effect::LabeledOneof(l) => l.normalize(types),
            Effect::LabeledOutcome(o) => Ok(Effect::LabeledOutcome(o.normalize(types)?))
        }
    }
}

/// Pushes `condition` down onto an already normalized effect.
fn guard(condition: &Condition, effect: Effect) -> Result<Effect, EffectError> {
    if condition.is_truth() {
        return Ok(effect);
    }
    match effect {
        Effect::Cost(_) => Err(EffectError::CostBelowWrapper("conditional")),
        Effect::Conjunctive(c) => Ok(Effect::conjunction(c.effects.into_iter()
            .map(|e| guard(condition, e))
            .collect::<Result<Vec<_>, _>>()?)),
        // The guard is evaluated once, outside the quantifier.
        Effect::Universal(u) => Ok(Effect::universal(u.parameters, Effect::conditional(condition.clone(), *u.effect))),
        Effect::Oneof(o) => Ok(Effect::Oneof(OneofEffect {effects: o.effects.into_iter()
            .map(|e| guard(condition, e))
            .collect::<Result<Vec<_>, _>>()?})),
        Effect::LabeledOneof(l) => Ok(Effect::LabeledOneof(LabeledOneofEffect {
            label: l.label,
            outcomes: l.outcomes.into_iter()
                .map(|o| Ok(LabeledOutcomeEffect::composed(o.outcome_label, guard(condition, *o.effect)?)))
                .collect::<Result<Vec<_>, EffectError>>()?
        })),
        Effect::LabeledOutcome(o) => Ok(Effect::LabeledOutcome(
            LabeledOutcomeEffect::composed(o.outcome_label, guard(condition, *o.effect)?))),
        other => Ok(Effect::conditional(condition.clone(), other))
    }
}

impl UniversalEffect {
    /// Unfolds the quantifier into one conjunct per combination of objects.
    fn normalize(&self, types: &TypeIndex) -> Result<Effect, EffectError> {
        let body = self.effect.normalize(types)?;
        if body.contains_cost() {
            return Err(EffectError::CostBelowWrapper("universal"));
        }
        let domains = self.parameters.iter()
            .map(|p| types.objects_of(&p.type_name))
            .collect::<Vec<_>>();
        let combinations = cartesian_product(domains);
        debug!(parameters = self.parameters.len(), combinations = combinations.combinations(),
            "unfolding universal effect");
        let conjuncts = combinations.map(|objects| {
            let binding = self.parameters.iter().zip(objects)
                .map(|(p, o)| (p.name.clone(), o.clone()))
                .collect::<Binding>();
            body.substitute(&binding)
        }).collect();
        Effect::conjunction(conjuncts).normalize(types)
    }
}

impl ConjunctiveEffect {
    /// Distributes choices over the conjunction so that at most one choice
    /// remains, holding one conjunction per combination of branches.
    fn normalize(&self, types: &TypeIndex) -> Result<Effect, EffectError> {
        if self.effects.is_empty() {
            return Ok(Effect::Conjunctive(self.clone()));
        }
        let mut normalized = self.effects.iter()
            .map(|e| e.normalize(types))
            .collect::<Result<Vec<_>, _>>()?;
        if normalized.len() == 1 {
            return Ok(normalized.remove(0));
        }
        let normalized = ConjunctiveEffect::new(normalized).effects;
        let widest = normalized.iter().map(alternative_count).max().unwrap_or(0);
        if widest <= 1 {
            return Ok(Effect::conjunction(normalized));
        }

        let labeled = normalized.iter().any(|e| matches!(e, Effect::LabeledOneof(_)));
        let mut cost = None;
        let mut alternatives = Vec::with_capacity(normalized.len());
        for effect in normalized {
            match effect {
                Effect::Cost(c) => {
                    if cost.is_some() {
                        return Err(EffectError::MultipleCostEffects);
                    }
                    cost = Some(c);
                }
                Effect::Oneof(o) if labeled => alternatives.push(positionally_labeled(o.effects)),
                Effect::Oneof(o) => alternatives.push(o.effects),
                Effect::LabeledOneof(l) => alternatives.push(l.outcomes.into_iter().map(Effect::LabeledOutcome).collect()),
                other => alternatives.push(vec![other])
            }
        }

        let combinations = cartesian_product(alternatives.iter().map(|a| a.as_slice()).collect());
        debug!(outcomes = combinations.combinations(), labeled, has_cost = cost.is_some(),
            "distributing choice over conjunction");
        let choice = if labeled {
            let outcomes = combinations.map(|branches| {
                let outcome_label = label::conjoin(branches.iter().filter_map(|e| e.outcome_label()))
                    .unwrap_or_default();
                let body = conjoin(branches.into_iter().map(|e| match e {
                    Effect::LabeledOutcome(o) => o.effect().clone(),
                    other => other.clone()
                }).collect());
                LabeledOutcomeEffect::composed(outcome_label, body)
            }).collect();
            let (found, choice) = split_cost(LabeledOneofEffect {label: None, outcomes}.normalize(types)?);
            merge_cost(&mut cost, found)?;
            choice
        } else {
            Effect::oneof(combinations.map(|branches| conjoin(branches.into_iter().cloned().collect())).collect())
        };
        Ok(with_cost(cost, choice))
    }
}

impl LabeledOneofEffect {
    /// Composes every outcome label with this choice's label and splices
    /// nested choices up into a single level. The composed labels subsume
    /// this choice's own label, so the result carries none and normalizing
    /// it again leaves the labels alone. A cost set beside a nested choice
    /// moves out next to the whole choice.
    fn normalize(&self, types: &TypeIndex) -> Result<Effect, EffectError> {
        let mut cost = None;
        let mut outcomes = Vec::with_capacity(self.outcomes.len());
        for outcome in self.outcomes.iter() {
            let outcome_label = match &self.label {
                Some(parent) => label::nest(parent, &outcome.outcome_label),
                None => outcome.outcome_label.clone()
            };
            let (found, body) = split_cost(outcome.effect.normalize(types)?);
            merge_cost(&mut cost, found)?;
            push_outcome(&mut outcomes, outcome_label, body);
        }
        Ok(with_cost(cost, Effect::LabeledOneof(LabeledOneofEffect {label: None, outcomes})))
    }
}

impl LabeledOutcomeEffect {
    fn normalize(&self, types: &TypeIndex) -> Result<LabeledOutcomeEffect, EffectError> {
        Ok(LabeledOutcomeEffect::composed(self.outcome_label.clone(), self.effect.normalize(types)?))
    }
}

fn alternative_count(effect: &Effect) -> usize {
    match effect {
        Effect::Oneof(o) => o.effects.len(),
        Effect::LabeledOneof(l) => l.outcomes.len(),
        _ => 1
    }
}

/// Branches of an unlabeled choice that is distributed together with labeled
/// ones get their position as label, so combined labels stay distinct.
fn positionally_labeled(branches: Vec<Effect>) -> Vec<Effect> {
    branches.into_iter().enumerate().map(|(i, e)| match e {
        Effect::LabeledOutcome(o) => Effect::LabeledOutcome(o),
        other => Effect::LabeledOutcome(LabeledOutcomeEffect::composed(label::positional(i), other))
    }).collect()
}

/// Separates the `(and cost choice)` shape a normalized conjunction takes
/// when it distributed a choice.
fn split_cost(effect: Effect) -> (Option<CostEffect>, Effect) {
    if let Effect::Conjunctive(c) = &effect {
        if let [Effect::Cost(cost), choice] = c.effects.as_slice() {
            if choice.is_choice() {
                return (Some(cost.clone()), choice.clone());
            }
        }
    }
    (None, effect)
}

fn with_cost(cost: Option<CostEffect>, choice: Effect) -> Effect {
    match cost {
        Some(c) => Effect::conjunction(vec![Effect::Cost(c), choice]),
        None => choice
    }
}

fn conjoin(mut effects: Vec<Effect>) -> Effect {
    if effects.len() == 1 {
        effects.remove(0)
    } else {
        Effect::conjunction(effects)
    }
}
