mod error;
mod logic;
mod cost;
mod normalize;
mod ground;
mod domain;
mod problem;
pub mod cartesian;
pub mod label;
pub mod effect;

pub use error::EffectError;
pub use logic::{is_variable, Binding, Condition, Literal, TypedParameter, EQUALITY};
pub use effect::{ConditionalEffect, ConjunctiveEffect, Effect, LabeledOneofEffect, LabeledOutcomeEffect,
                 OneofEffect, RawEffect, UniversalEffect};
pub use cost::{CostAmount, CostEffect, TOTAL_COST};
pub use ground::{GroundEffect, GroundOutcome, Grounder};
pub use domain::{decode_effect, parse_typed_list, ActionSchema, PddlDomain, PredicateSpec};
pub use problem::{Metric, PddlProblem, Predicate, TypeIndex, ROOT_TYPE};

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use fixed::types::I40F24;
    use crate::{Binding, CostEffect, Effect, GroundEffect, GroundOutcome, Grounder, Literal, PddlDomain, PddlProblem, TypeIndex};

    const TIRES_DOMAIN: &str = "(define (domain tireworld)
  (:requirements :typing :strips :non-deterministic :action-costs)
  (:types location)
  (:predicates (vehicle-at ?loc - location)
               (spare-in ?loc - location)
               (road ?from - location ?to - location)
               (not-flattire))
  (:functions (total-cost))
  (:action move-car
    :parameters (?from - location ?to - location)
    :precondition (and (vehicle-at ?from) (road ?from ?to) (not-flattire))
    :effect (and (increase (total-cost) 1)
                 (oneof (and (vehicle-at ?to) (not (vehicle-at ?from)))
                        (and (vehicle-at ?to) (not (vehicle-at ?from)) (not (not-flattire))))))
  (:action changetire
    :parameters (?loc - location)
    :precondition (and (spare-in ?loc) (vehicle-at ?loc))
    :effect (and (not (spare-in ?loc)) (not-flattire))))";

    const TIRES_PROBLEM: &str = "(define (problem tires-1)
  (:domain tireworld)
  (:objects l1 l2 l3 - location)
  (:init (vehicle-at l1) (road l1 l2) (road l2 l3) (spare-in l2) (not-flattire))
  (:goal (vehicle-at l3)))";

    #[test]
    fn tireworld_end_to_end() {
        let domain = PddlDomain::parse(TIRES_DOMAIN).unwrap();
        let problem = PddlProblem::parse(TIRES_PROBLEM).unwrap();
        let types = TypeIndex::build(&domain, &problem);
        let fluents = domain.fluent_predicates();
        let grounder = Grounder::new(&problem.facts, &problem.numeric_facts, &fluents, &types);

        let move_car = &domain.actions["move-car"];
        let (cost, residual) = move_car.effect.normalize(&types).unwrap().extract_cost().unwrap();
        assert_eq!(cost, Some(CostEffect::constant(I40F24::from_num(1))));
        let residual = residual.unwrap();
        assert!(matches!(residual, Effect::Oneof(_)));

        let applicable = grounder.action_bindings(&move_car.parameters)
            .filter(|b| grounder.precondition(&move_car.precondition, b).unwrap().is_some())
            .collect::<Vec<Binding>>();
        assert_eq!(applicable.len(), 2);
        assert_eq!(applicable[0]["?from"], "l1");
        assert_eq!(applicable[0]["?to"], "l2");

        let outcomes = grounder.ground_outcomes(&residual, &applicable[0]).unwrap();
        let arrive = GroundEffect {condition: vec![], literal: Literal::new("vehicle-at", &["l2"])};
        let leave = GroundEffect {condition: vec![], literal: Literal::new("vehicle-at", &["l1"]).negate()};
        let flat = GroundEffect {condition: vec![], literal: Literal::new("not-flattire", &[]).negate()};
        assert_eq!(outcomes, vec![
            GroundOutcome {label: None, effects: vec![arrive.clone(), leave.clone()]},
            GroundOutcome {label: None, effects: vec![arrive, leave, flat]}]);
    }

    #[test]
    fn deterministic_action_grounds_to_one_outcome() {
        let domain = PddlDomain::parse(TIRES_DOMAIN).unwrap();
        let problem = PddlProblem::parse(TIRES_PROBLEM).unwrap();
        let types = TypeIndex::build(&domain, &problem);
        let fluents = domain.fluent_predicates();
        let grounder = Grounder::new(&problem.facts, &problem.numeric_facts, &fluents, &types);

        let change = &domain.actions["changetire"];
        let (cost, residual) = change.effect.normalize(&types).unwrap().extract_cost().unwrap();
        assert_eq!(cost, None);
        let binding = grounder.action_bindings(&change.parameters)
            .find(|b| grounder.precondition(&change.precondition, b).unwrap().is_some())
            .unwrap();
        let outcomes = grounder.ground_outcomes(&residual.unwrap(), &binding).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].effects.iter().map(|e| e.literal.to_string()).collect::<Vec<_>>(),
                   vec!["(not (spare-in l1))", "(not-flattire)"]);
    }
}
