use std::collections::BTreeMap;
use std::fmt;
use fixed::types::I40F24;
use crate::{Binding, Effect, EffectError, Literal, Predicate};
use crate::effect::{push_outcome, LabeledOneofEffect, LabeledOutcomeEffect};

pub const TOTAL_COST: &str = "total-cost";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CostAmount {
    Constant(I40F24),
    Term(Literal)
}

/// `(increase (total-cost) amount)`: the part of an action that feeds the
/// plan metric rather than the world state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CostEffect {
    fluent: Literal,
    amount: CostAmount
}

impl CostEffect {
    pub fn new(fluent: Literal, amount: CostAmount) -> Self {
        CostEffect {fluent, amount}
    }

    pub fn constant(amount: I40F24) -> Self {
        CostEffect::new(Literal::new(TOTAL_COST, &[]), CostAmount::Constant(amount))
    }

    pub fn term(term: Literal) -> Self {
        CostEffect::new(Literal::new(TOTAL_COST, &[]), CostAmount::Term(term))
    }

    pub fn fluent(&self) -> &Literal {
        &self.fluent
    }

    pub fn amount(&self) -> &CostAmount {
        &self.amount
    }

    pub fn substitute(&self, binding: &Binding) -> Self {
        CostEffect {
            fluent: self.fluent.clone(),
            amount: match &self.amount {
                CostAmount::Constant(c) => CostAmount::Constant(*c),
                CostAmount::Term(t) => CostAmount::Term(t.clone_and_instantiate(binding))
            }
        }
    }

    /// The increase this effect contributes under `binding`, looking function
    /// terms up among the problem's numeric init values.
    pub fn evaluate(&self, binding: &Binding, numeric_facts: &BTreeMap<Predicate, I40F24>) -> Result<I40F24, EffectError> {
        match &self.amount {
            CostAmount::Constant(c) => Ok(*c),
            CostAmount::Term(t) => {
                let ground = t.ground(binding)?;
                numeric_facts.get(&ground.atom())
                    .copied()
                    .ok_or_else(|| EffectError::UnknownNumericFluent(ground.to_string()))
            }
        }
    }
}

impl fmt::Display for CostEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.amount {
            CostAmount::Constant(c) => write!(f, "(increase {} {})", self.fluent, c),
            CostAmount::Term(t) => write!(f, "(increase {} {})", self.fluent, t)
        }
    }
}

impl Effect {
    /// Splits off the cost update. The residual is absent only when the
    /// cost update was all there was. A branch whose residual is itself a
    /// choice is spliced into the enclosing choice.
    ///
    /// Cost is expected as a direct conjunct; below a guard or a quantifier it
    /// is not looked for (normalization rejects that placement).
    pub fn extract_cost(&self) -> Result<(Option<CostEffect>, Option<Effect>), EffectError> {
        match self {
            Effect::Cost(cost) => Ok((Some(cost.clone()), None)),
            Effect::Conjunctive(c) => {
                let mut cost = None;
                let mut rest = Vec::with_capacity(c.effects.len());
                for effect in c.effects.iter() {
                    match effect {
                        Effect::Cost(found) => {
                            if cost.is_some() {
                                return Err(EffectError::MultipleCostEffects);
                            }
                            cost = Some(found.clone());
                        }
                        other => rest.push(other.clone())
                    }
                }
                let residual = match rest.len() {
                    0 => None,
                    1 => rest.pop(),
                    _ => Some(Effect::conjunction(rest))
                };
                Ok((cost, residual))
            }
            Effect::Oneof(o) => {
                let mut cost = None;
                let mut branches = Vec::with_capacity(o.effects.len());
                for effect in o.effects.iter() {
                    let (found, rest) = effect.extract_cost()?;
                    merge_cost(&mut cost, found)?;
                    branches.push(rest.unwrap_or_else(|| Effect::conjunction(vec![])));
                }
                Ok((cost, Some(Effect::oneof(branches))))
            }
            Effect::LabeledOneof(l) => {
                let mut cost = None;
                let mut outcomes = Vec::with_capacity(l.outcomes.len());
                for outcome in l.outcomes.iter() {
                    let (found, rest) = outcome.effect.extract_cost()?;
                    merge_cost(&mut cost, found)?;
                    push_outcome(&mut outcomes, outcome.outcome_label.clone(),
                                 rest.unwrap_or_else(|| Effect::conjunction(vec![])));
                }
                Ok((cost, Some(Effect::LabeledOneof(LabeledOneofEffect {label: l.label.clone(), outcomes}))))
            }
            Effect::LabeledOutcome(o) => {
                let (cost, rest) = o.extract_cost()?;
                Ok((cost, Some(Effect::LabeledOutcome(rest))))
            }
            Effect::Raw(_) | Effect::Simple(_) | Effect::Conditional(_) | Effect::Universal(_) =>
                Ok((None, Some(self.clone())))
        }
    }
}

impl LabeledOutcomeEffect {
    pub fn extract_cost(&self) -> Result<(Option<CostEffect>, LabeledOutcomeEffect), EffectError> {
        let (cost, rest) = self.effect.extract_cost()?;
        let rest = rest.unwrap_or_else(|| Effect::conjunction(vec![]));
        Ok((cost, LabeledOutcomeEffect::composed(self.outcome_label.clone(), rest)))
    }
}

pub(crate) fn merge_cost(cost: &mut Option<CostEffect>, found: Option<CostEffect>) -> Result<(), EffectError> {
    if found.is_some() {
        if cost.is_some() {
            return Err(EffectError::MultipleCostEffects);
        }
        *cost = found;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use super::*;

    fn simple(pred: &str) -> Effect {
        Effect::Simple(Literal::new(pred, &[]))
    }

    fn cost(n: i32) -> CostEffect {
        CostEffect::constant(I40F24::from_num(n))
    }

    #[test]
    fn splits_cost_from_conjunction() {
        let effect = Effect::conjunction(vec![simple("p"), Effect::Cost(cost(3))]);
        assert_eq!(effect.extract_cost(), Ok((Some(cost(3)), Some(simple("p")))));

        let wider = Effect::conjunction(vec![simple("p"), Effect::Cost(cost(3)), simple("q")]);
        assert_eq!(wider.extract_cost(), Ok((Some(cost(3)), Some(Effect::conjunction(vec![simple("p"), simple("q")])))));
    }

    #[test]
    fn cost_round_trip() {
        let effect = Effect::conjunction(vec![simple("p"), Effect::Cost(cost(3))]);
        let (found, rest) = effect.extract_cost().unwrap();
        let rebuilt = Effect::conjunction(vec![rest.unwrap(), Effect::Cost(found.unwrap())]);
        assert_eq!(rebuilt, effect);
    }

    #[test]
    fn cost_alone() {
        assert_eq!(Effect::Cost(cost(1)).extract_cost(), Ok((Some(cost(1)), None)));
        assert_eq!(simple("p").extract_cost(), Ok((None, Some(simple("p")))));
    }

    #[test]
    fn two_costs_are_rejected() {
        let effect = Effect::conjunction(vec![Effect::Cost(cost(1)), Effect::Cost(cost(2))]);
        assert_eq!(effect.extract_cost(), Err(EffectError::MultipleCostEffects));

        let choice = Effect::oneof(vec![
            Effect::conjunction(vec![simple("p"), Effect::Cost(cost(1))]),
            Effect::conjunction(vec![simple("q"), Effect::Cost(cost(1))])]);
        assert_eq!(choice.extract_cost(), Err(EffectError::MultipleCostEffects));
    }

    #[test]
    fn cost_inside_one_branch() {
        let choice = Effect::oneof(vec![
            Effect::conjunction(vec![simple("p"), Effect::Cost(cost(1))]),
            simple("q")]);
        assert_eq!(choice.extract_cost(), Ok((Some(cost(1)), Some(Effect::oneof(vec![simple("p"), simple("q")])))));
    }

    #[test]
    fn labeled_branches_keep_labels() {
        let choice = Effect::LabeledOneof(LabeledOneofEffect::new(Some("x"), vec![
            LabeledOutcomeEffect::new("a", Effect::conjunction(vec![simple("p"), Effect::Cost(cost(2))])).unwrap(),
            LabeledOutcomeEffect::new("b", simple("q")).unwrap()]).unwrap());
        let (found, rest) = choice.extract_cost().unwrap();
        assert_eq!(found, Some(cost(2)));
        match rest {
            Some(Effect::LabeledOneof(l)) => {
                assert_eq!(l.label(), Some("x"));
                let labels = l.outcomes().iter().map(|o| o.outcome_label()).collect::<Vec<_>>();
                assert_eq!(labels, vec!["a", "b"]);
                assert_eq!(l.outcomes()[0].effect(), &simple("p"));
            }
            other => panic!("expected a labeled choice, got {:?}", other)
        }
    }

    #[test]
    fn evaluates_terms_against_numeric_facts() {
        let road = CostEffect::term(Literal::new("road-length", &["?from", "?to"]));
        let mut numeric = BTreeMap::new();
        numeric.insert(Literal::new("road-length", &["a", "b"]).atom(), I40F24::from_num(7));
        let binding: Binding = [("?from", "a"), ("?to", "b")].iter()
            .map(|(k, v)| (k.to_string(), v.to_string())).collect();
        assert_eq!(road.evaluate(&binding, &numeric), Ok(I40F24::from_num(7)));
        assert_eq!(road.substitute(&binding).to_string(), "(increase (total-cost) (road-length a b))");

        let reversed: Binding = [("?from", "b"), ("?to", "a")].iter()
            .map(|(k, v)| (k.to_string(), v.to_string())).collect();
        assert_eq!(road.evaluate(&reversed, &numeric),
                   Err(EffectError::UnknownNumericFluent("(road-length b a)".to_string())));
        assert_eq!(cost(4).evaluate(&binding, &numeric), Ok(I40F24::from_num(4)));
    }
}
