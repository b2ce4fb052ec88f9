use std::collections::{BTreeMap, BTreeSet};
use std::io;
use fixed::types::I40F24;
use sexpr_parser::{errorize, Parser, SexprTree};
use sexpr_parser::SexprTree::{Sym, Sub};
use crate::{Condition, CostAmount, CostEffect, Effect, Literal, TypedParameter, EQUALITY, ROOT_TYPE, TOTAL_COST};
use crate::effect::{LabeledOneofEffect, LabeledOutcomeEffect};

#[derive(Clone, Debug)]
pub struct PredicateSpec {
    pub name: String,
    pub params: Vec<TypedParameter>
}

impl PredicateSpec {
    pub fn from_symbols(symbols: &[String]) -> io::Result<Self> {
        match symbols.split_first() {
            None => errorize(format!("Empty predicate declaration")),
            Some((name, params)) => Ok(PredicateSpec {name: name.clone(), params: parse_typed_list(params)?})
        }
    }
}

#[derive(Clone, Debug)]
pub struct ActionSchema {
    pub name: String,
    pub parameters: Vec<TypedParameter>,
    pub precondition: Condition,
    pub effect: Effect
}

impl ActionSchema {
    /// Predicates this action can change.
    pub fn fluent_predicates(&self) -> BTreeSet<String> {
        let mut fluents = BTreeSet::new();
        collect_effect_predicates(&self.effect, &mut fluents);
        fluents
    }
}

fn collect_effect_predicates(effect: &Effect, fluents: &mut BTreeSet<String>) {
    match effect {
        Effect::Raw(raw) => {fluents.insert(raw.literal.predicate().to_string());},
        Effect::Simple(lit) => {fluents.insert(lit.predicate().to_string());},
        Effect::Cost(_) => {},
        Effect::Conditional(c) => collect_effect_predicates(c.effect(), fluents),
        Effect::Universal(u) => collect_effect_predicates(u.effect(), fluents),
        Effect::Conjunctive(c) => c.effects().iter().for_each(|e| collect_effect_predicates(e, fluents)),
        Effect::Oneof(o) => o.effects().iter().for_each(|e| collect_effect_predicates(e, fluents)),
        Effect::LabeledOneof(l) => l.outcomes().iter().for_each(|o| collect_effect_predicates(o.effect(), fluents)),
        Effect::LabeledOutcome(o) => collect_effect_predicates(o.effect(), fluents)
    }
}

#[derive(Clone, Debug)]
pub struct PddlDomain {
    pub name: String,
    /// Each declared type with its parent.
    pub types: BTreeMap<String, String>,
    pub constants: Vec<TypedParameter>,
    pub predicates: BTreeMap<String, PredicateSpec>,
    pub functions: BTreeMap<String, PredicateSpec>,
    pub actions: BTreeMap<String, ActionSchema>
}

impl PddlDomain {
    pub fn new() -> Self {
        PddlDomain {name: String::new(), types: BTreeMap::new(), constants: Vec::new(),
            predicates: BTreeMap::new(), functions: BTreeMap::new(), actions: BTreeMap::new()}
    }

    pub fn parse(pddl: &str) -> io::Result<Self> {
        let mut domain = PddlDomain::new();
        domain.define(&Parser::build_parse_tree(pddl)?)?;
        Ok(domain)
    }

    /// Supertypes of `type_name`, nearest first, ending at the root type.
    pub fn ancestors(&self, type_name: &str) -> Vec<String> {
        let mut result = Vec::new();
        let mut current = type_name;
        while let Some(parent) = self.types.get(current) {
            if parent == current || result.contains(parent) {
                break;
            }
            result.push(parent.clone());
            current = parent.as_str();
        }
        if type_name != ROOT_TYPE && !result.iter().any(|t| t == ROOT_TYPE) {
            result.push(ROOT_TYPE.to_string());
        }
        result
    }

    pub fn fluent_predicates(&self) -> BTreeSet<String> {
        self.actions.values().flat_map(|a| a.fluent_predicates()).collect()
    }

    fn define(&mut self, tree: &SexprTree) -> io::Result<()> {
        match tree {
            Sub(syms) => {
                check(syms, 0, "define")?;
                for section in syms[1..].iter() {
                    match section {
                        Sym(s) => return errorize(format!("Unexpected symbol in domain: \"{}\"", s)),
                        Sub(v) => match tag(v) {
                            None => return errorize(format!("Untagged domain section")),
                            Some(tag) => match tag {
                                ":requirements" => {},
                                "domain" => self.name = symbol_at(v, 1)?,
                                ":types" => {
                                    for t in parse_typed_list(&flatten(&v[1..]))? {
                                        self.types.insert(t.name, t.type_name);
                                    }
                                }
                                ":constants" => self.constants = parse_typed_list(&flatten(&v[1..]))?,
                                ":predicates" => process_pred_list(&v[1..], &mut self.predicates)?,
                                ":functions" => process_pred_list(&v[1..], &mut self.functions)?,
                                ":action" => self.process_action(v)?,
                                _ => return errorize(format!("Unrecognized tag: \"{}\"", tag))
                            }
                        }
                    }
                }
                Ok(())
            }
            Sym(sym) => errorize(format!("\"{}\": No domain details defined.", sym))
        }
    }

    fn process_action(&mut self, v: &[SexprTree]) -> io::Result<()> {
        let name = symbol_at(v, 1)?;
        let mut parameters = Vec::new();
        let mut precondition = Condition::Truth;
        let mut effect = Effect::conjunction(vec![]);
        for i in (2..v.len()).step_by(2) {
            let value = match v.get(i + 1) {
                None => return errorize(format!("{}: no value for {:?}", name, v[i])),
                Some(value) => value
            };
            match &v[i] {
                Sub(_) => return errorize(format!("No tag: {:?}", v[i])),
                Sym(s) => match s.as_str() {
                    ":parameters" => parameters = parse_typed_list(&value.flatten())?,
                    ":precondition" => precondition = decode_condition(value)?,
                    ":effect" => effect = decode_effect(value)?,
                    _ => return errorize(format!("Unrecognized tag: {}", s))
                }
            }
        }
        let mut type_map = parameters.iter()
            .map(|p| (p.name.clone(), p.type_name.clone()))
            .collect::<BTreeMap<_, _>>();
        let effect = effect.uniquify_variables(&mut type_map, &BTreeMap::new());
        self.actions.insert(name.clone(), ActionSchema {name, parameters, precondition, effect});
        Ok(())
    }
}

/// Parses `a b - t1 c - t2 d`: names before a `- type` marker take that
/// type, trailing names without one belong to the root type.
pub fn parse_typed_list(symbols: &[String]) -> io::Result<Vec<TypedParameter>> {
    let mut result = Vec::new();
    let mut pending = Vec::new();
    let mut i = 0;
    while i < symbols.len() {
        if symbols[i] == "-" {
            match symbols.get(i + 1) {
                None => return errorize(format!("Error parsing typed list: \"-\" not followed by a type")),
                Some(type_name) => {
                    result.extend(pending.drain(..).map(|name: String| TypedParameter::new(&name, type_name)));
                    i += 2;
                }
            }
        } else {
            pending.push(symbols[i].clone());
            i += 1;
        }
    }
    result.extend(pending.into_iter().map(|name| TypedParameter::new(&name, ROOT_TYPE)));
    Ok(result)
}

pub fn decode_effect(tree: &SexprTree) -> io::Result<Effect> {
    let v = match tree {
        Sym(s) => return errorize(format!("{}: Not an effect", s)),
        Sub(v) => v
    };
    match tag(v) {
        None if v.is_empty() => Ok(Effect::conjunction(vec![])),
        None => errorize(format!("Effect starts with a list")),
        Some("and") => Ok(Effect::conjunction(v[1..].iter().map(decode_effect).collect::<io::Result<Vec<_>>>()?)),
        Some("forall") => {
            let parameters = parse_typed_list(&operand(v, 1, "forall")?.flatten())?;
            Ok(Effect::universal(parameters, decode_effect(operand(v, 2, "forall")?)?))
        }
        Some("when") => Ok(Effect::conditional(decode_condition(operand(v, 1, "when")?)?,
                                               decode_effect(operand(v, 2, "when")?)?)),
        Some("oneof") => Ok(Effect::oneof(v[1..].iter().map(decode_effect).collect::<io::Result<Vec<_>>>()?)),
        Some("labeled-oneof") => {
            let (label, outcomes) = match v.get(1) {
                Some(Sym(label)) => (Some(label.as_str()), &v[2..]),
                _ => (None, &v[1..])
            };
            let outcomes = outcomes.iter().map(decode_outcome).collect::<io::Result<Vec<_>>>()?;
            Ok(Effect::LabeledOneof(LabeledOneofEffect::new(label, outcomes)?))
        }
        Some("outcome") => Ok(Effect::LabeledOutcome(decode_outcome(tree)?)),
        Some("not") => Ok(Effect::Simple(decode_literal(operand(v, 1, "not")?)?.negate())),
        Some("increase") => {
            let fluent = decode_literal(operand(v, 1, "increase")?)?;
            if fluent.predicate() != TOTAL_COST {
                return errorize(format!("Unsupported numeric effect on {}", fluent));
            }
            let amount = match operand(v, 2, "increase")? {
                Sym(n) => match n.parse::<I40F24>() {
                    Ok(n) => CostAmount::Constant(n),
                    Err(e) => return errorize(format!("{:?}", e))
                },
                term => CostAmount::Term(decode_literal(term)?)
            };
            Ok(Effect::Cost(CostEffect::new(fluent, amount)))
        }
        Some(op @ ("decrease" | "assign" | "scale-up" | "scale-down")) => errorize(format!("Unsupported numeric effect: {}", op)),
        Some(_) => Ok(Effect::Simple(decode_literal(tree)?))
    }
}

fn decode_outcome(tree: &SexprTree) -> io::Result<LabeledOutcomeEffect> {
    match tree {
        Sub(v) if tag(v) == Some("outcome") => {
            let label = symbol_at(v, 1)?;
            Ok(LabeledOutcomeEffect::new(&label, decode_effect(operand(v, 2, "outcome")?)?)?)
        }
        _ => errorize(format!("Expected (outcome label effect), received {:?}", tree))
    }
}

pub fn decode_condition(tree: &SexprTree) -> io::Result<Condition> {
    let v = match tree {
        Sym(s) => return errorize(format!("{}: Not a Condition", s)),
        Sub(v) => v
    };
    match tag(v) {
        None if v.is_empty() => Ok(Condition::Truth),
        None => errorize(format!("Condition starts with a list")),
        Some("and") => Ok(Condition::conjunction(v[1..].iter().map(decode_condition).collect::<io::Result<Vec<_>>>()?)),
        Some("not") => match decode_condition(operand(v, 1, "not")?)? {
            Condition::Atom(lit) => Ok(Condition::Atom(lit.negate())),
            other => errorize(format!("Only literals may be negated: {:?}", other))
        },
        Some(op @ ("or" | "imply" | "exists" | "forall" | "<" | ">" | "<=" | ">=")) =>
            errorize(format!("Unsupported condition: {}", op)),
        Some(EQUALITY) => Ok(Condition::Atom(Literal::from_parts(EQUALITY.to_string(), flatten(&v[1..]), false))),
        Some(_) => Ok(Condition::Atom(decode_literal(tree)?))
    }
}

fn decode_literal(tree: &SexprTree) -> io::Result<Literal> {
    let symbols = tree.flatten();
    match symbols.split_first() {
        None => errorize(format!("Empty literal")),
        Some((predicate, args)) => Ok(Literal::from_parts(predicate.clone(), args.to_vec(), false))
    }
}

pub(crate) fn check(parsed: &[SexprTree], i: usize, target: &str) -> io::Result<()> {
    match parsed.get(i).unwrap_or(&SexprTree::sym("")) {
        Sub(_) => errorize(format!("Expected symbol \"{}\", received a list", target)),
        Sym(parsed) => {
            if parsed.as_str() == target {
                Ok(())
            } else {
                errorize(format!("Symbol \"{}\" does not match expected symbol \"{}\"", parsed, target))
            }
        }
    }
}

pub(crate) fn tag(v: &[SexprTree]) -> Option<&str> {
    match v.first() {
        Some(Sym(s)) => Some(s.as_str()),
        _ => None
    }
}

pub(crate) fn symbol_at(v: &[SexprTree], i: usize) -> io::Result<String> {
    match v.get(i) {
        Some(Sym(s)) => Ok(s.clone()),
        Some(Sub(_)) => errorize(format!("Expected a symbol at position {}, received a list", i)),
        None => errorize(format!("Missing symbol at position {}", i))
    }
}

pub(crate) fn flatten(trees: &[SexprTree]) -> Vec<String> {
    trees.iter().flat_map(|t| t.flatten()).collect()
}

fn operand<'a>(v: &'a [SexprTree], i: usize, tag: &str) -> io::Result<&'a SexprTree> {
    match v.get(i) {
        Some(t) => Ok(t),
        None => errorize(format!("{}: missing operand {}", tag, i))
    }
}

fn process_pred_list(symbols: &[SexprTree], storage: &mut BTreeMap<String, PredicateSpec>) -> io::Result<()> {
    for declaration in symbols {
        let pred_spec = PredicateSpec::from_symbols(&declaration.flatten())?;
        storage.insert(pred_spec.name.clone(), pred_spec);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use super::*;

    const TIRES: &str = "(define (domain tireworld)
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

    fn symbols(s: &str) -> Vec<String> {
        s.split_whitespace().map(|t| t.to_string()).collect()
    }

    #[test]
    fn typed_lists() {
        assert_eq!(parse_typed_list(&symbols("?a ?b - direction ?s - satellite ?x")).unwrap(), vec![
            TypedParameter::new("?a", "direction"), TypedParameter::new("?b", "direction"),
            TypedParameter::new("?s", "satellite"), TypedParameter::new("?x", ROOT_TYPE)]);
        assert!(parse_typed_list(&symbols("?a -")).is_err());
    }

    #[test]
    fn tireworld_domain() {
        let domain = PddlDomain::parse(TIRES).unwrap();
        assert_eq!(domain.name, "tireworld");
        assert_eq!(domain.types.get("location"), Some(&ROOT_TYPE.to_string()));
        assert_eq!(domain.predicates.len(), 4);
        let move_car = &domain.actions["move-car"];
        assert_eq!(move_car.parameters, vec![TypedParameter::new("?from", "location"), TypedParameter::new("?to", "location")]);
        assert_eq!(move_car.precondition.literals().len(), 3);
        match &move_car.effect {
            Effect::Conjunctive(c) => {
                assert_eq!(c.effects().len(), 2);
                assert_eq!(c.effects()[0], Effect::Cost(CostEffect::constant(I40F24::from_num(1))));
                assert!(c.effects()[1].is_choice());
            }
            other => panic!("expected a conjunction, got {:?}", other)
        }
        let fluents = domain.fluent_predicates().into_iter().collect::<Vec<_>>();
        assert_eq!(fluents, vec!["not-flattire", "spare-in", "vehicle-at"]);
    }

    #[test]
    fn nested_effect_forms() {
        let tree = Parser::build_parse_tree("(and (forall (?b - block) (when (and (on ?b ?x) (not (= ?b ?x))) (clear ?b)))
            (labeled-oneof drop (outcome ok (holding ?x)) (outcome slip (ontable ?x)))
            (increase (total-cost) (weight ?x)))").unwrap();
        let effect = decode_effect(&tree).unwrap();
        let Effect::Conjunctive(c) = &effect else { panic!("expected a conjunction, got {:?}", effect) };
        match &c.effects()[0] {
            Effect::Universal(u) => {
                assert_eq!(u.parameters(), &[TypedParameter::new("?b", "block")]);
                match u.effect() {
                    Effect::Conditional(w) => {
                        assert_eq!(w.condition().literals()[1], &Literal::new(EQUALITY, &["?b", "?x"]).negate());
                        assert_eq!(w.effect(), &Effect::Simple(Literal::new("clear", &["?b"])));
                    }
                    other => panic!("expected a conditional effect, got {:?}", other)
                }
            }
            other => panic!("expected a universal effect, got {:?}", other)
        }
        match &c.effects()[1] {
            Effect::LabeledOneof(l) => {
                assert_eq!(l.label(), Some("drop"));
                assert_eq!(l.outcomes().iter().map(|o| o.outcome_label()).collect::<Vec<_>>(), vec!["ok", "slip"]);
            }
            other => panic!("expected a labeled choice, got {:?}", other)
        }
        assert_eq!(c.effects()[2], Effect::Cost(CostEffect::term(Literal::new("weight", &["?x"]))));
    }

    #[test]
    fn rejects_reserved_labels_and_numeric_effects() {
        let reserved = Parser::build_parse_tree("(labeled-oneof (outcome a__b (p)))").unwrap();
        assert!(decode_effect(&reserved).is_err());
        let numeric = Parser::build_parse_tree("(decrease (fuel ?t) 1)").unwrap();
        assert!(decode_effect(&numeric).is_err());
    }

    #[test]
    fn quantified_variables_are_uniquified() {
        let domain = PddlDomain::parse("(define (domain clash)
  (:predicates (p ?x))
  (:action sweep
    :parameters (?x)
    :effect (forall (?x) (p ?x))))").unwrap();
        assert_eq!(domain.actions["sweep"].effect, Effect::universal(
            vec![TypedParameter::new("?x1", ROOT_TYPE)], Effect::Simple(Literal::new("p", &["?x1"]))));
    }

    #[test]
    fn type_ancestors() {
        let domain = PddlDomain::parse("(define (domain vehicles)
  (:types truck car - vehicle vehicle place)
  (:predicates (at ?v - vehicle ?p - place)))").unwrap();
        assert_eq!(domain.ancestors("truck"), vec!["vehicle".to_string(), ROOT_TYPE.to_string()]);
        assert_eq!(domain.ancestors("place"), vec![ROOT_TYPE.to_string()]);
        assert_eq!(domain.ancestors(ROOT_TYPE), Vec::<String>::new());
    }
}
