use std::collections::{BTreeMap, BTreeSet};
use std::io;
use fixed::types::I40F24;
use sexpr_parser::{errorize, Parser, SexprTree};
use sexpr_parser::SexprTree::{Sym, Sub};
use crate::{Condition, PddlDomain, TypedParameter};
use crate::domain::{check, decode_condition, flatten, parse_typed_list, symbol_at, tag};

pub const ROOT_TYPE: &str = "object";

/// A ground atom: the predicate name followed by its arguments.
#[derive(Clone, Debug, Ord, PartialOrd, PartialEq, Eq, Hash)]
pub struct Predicate {
    elements: Vec<String>
}

impl Predicate {
    pub fn new(tag: String) -> Self {
        Predicate { elements: vec![tag]}
    }

    pub fn add_arg(&mut self, arg: String) {
        self.elements.push(arg);
    }

    pub fn get_tag(&self) -> &str {
        self.elements[0].as_str()
    }

    pub fn num_args(&self) -> usize {
        self.elements.len() - 1
    }

    pub fn get_arg(&self, i: usize) -> &str {
        self.elements[i + 1].as_str()
    }

    fn from_symbols(symbols: &[String]) -> io::Result<Self> {
        match symbols.split_first() {
            None => errorize(format!("Empty atom")),
            Some((name, args)) => {
                let mut result = Predicate::new(name.clone());
                args.iter().for_each(|a| result.add_arg(a.clone()));
                Ok(result)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub enum Metric {
    Minimize(Predicate),
    Maximize(Predicate)
}

#[derive(Clone, Debug)]
pub struct PddlProblem {
    pub name: String,
    pub domain: String,
    pub objects: Vec<TypedParameter>,
    pub facts: BTreeSet<Predicate>,
    pub numeric_facts: BTreeMap<Predicate, I40F24>,
    pub goal: Condition,
    pub metric: Option<Metric>
}

impl PddlProblem {
    pub fn new() -> Self {
        PddlProblem {name: String::new(), domain: String::new(), objects: Vec::new(),
            facts: BTreeSet::new(), numeric_facts: BTreeMap::new(), goal: Condition::Truth, metric: None}
    }

    pub fn parse(pddl: &str) -> io::Result<Self> {
        let mut problem = PddlProblem::new();
        problem.define(&Parser::build_parse_tree(pddl)?)?;
        Ok(problem)
    }

    fn define(&mut self, tree: &SexprTree) -> io::Result<()> {
        match tree {
            Sub(syms) => {
                check(syms, 0, "define")?;
                for section in syms[1..].iter() {
                    match section {
                        Sym(s) => return errorize(format!("Unexpected symbol in problem: \"{}\"", s)),
                        Sub(v) => match tag(v) {
                            Some("problem") => self.name = symbol_at(v, 1)?,
                            Some(":domain") => self.domain = symbol_at(v, 1)?,
                            Some(":requirements") => {},
                            Some(":objects") => self.objects = parse_typed_list(&flatten(&v[1..]))?,
                            Some(":init") => self.init(&v[1..])?,
                            Some(":goal") => match v.get(1) {
                                None => return errorize(format!("Empty goal")),
                                Some(goal) => self.goal = decode_condition(goal)?
                            },
                            Some(":metric") => self.metric(v)?,
                            Some(other) => return errorize(format!("Unrecognized tag: \"{}\"", other)),
                            None => return errorize(format!("Untagged problem section"))
                        }
                    }
                }
                Ok(())
            }
            Sym(sym) => errorize(format!("\"{}\": No problem details defined.", sym))
        }
    }

    fn init(&mut self, entries: &[SexprTree]) -> io::Result<()> {
        for entry in entries {
            match entry {
                Sub(v) if tag(v) == Some("=") => {
                    let key = match v.get(1) {
                        Some(term) => Predicate::from_symbols(&term.flatten())?,
                        None => return errorize(format!("Numeric init without a function term"))
                    };
                    let value = match symbol_at(v, 2)?.parse::<I40F24>() {
                        Ok(value) => value,
                        Err(e) => return errorize(format!("{:?}", e))
                    };
                    self.numeric_facts.insert(key, value);
                }
                _ => {
                    self.facts.insert(Predicate::from_symbols(&entry.flatten())?);
                }
            }
        }
        Ok(())
    }

    fn metric(&mut self, v: &[SexprTree]) -> io::Result<()> {
        let direction = symbol_at(v, 1)?;
        let predicate = match v.get(2) {
            Some(term) => Predicate::from_symbols(&term.flatten())?,
            None => return errorize(format!("Metric without an expression"))
        };
        self.metric = Some(match direction.as_str() {
            "minimize" => Metric::Minimize(predicate),
            "maximize" => Metric::Maximize(predicate),
            _ => return errorize(format!("Unrecognized metric tag: {}", direction))
        });
        Ok(())
    }
}

/// Objects of each type, in declaration order. An object is listed under
/// its own type and under every supertype up to the root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TypeIndex {
    objects_by_type: BTreeMap<String, Vec<String>>
}

impl TypeIndex {
    pub fn new() -> Self {
        TypeIndex::default()
    }

    /// Domain constants first, then the problem's objects.
    pub fn build(domain: &PddlDomain, problem: &PddlProblem) -> Self {
        let mut index = TypeIndex::new();
        for object in domain.constants.iter().chain(problem.objects.iter()) {
            index.add_object(&object.name, &object.type_name);
            for ancestor in domain.ancestors(&object.type_name) {
                index.add_object(&object.name, &ancestor);
            }
        }
        index
    }

    /// Lists `object` under `type_name` and the root type.
    pub fn add_object(&mut self, object: &str, type_name: &str) {
        for t in [type_name, ROOT_TYPE] {
            let objects = self.objects_by_type.entry(t.to_string()).or_default();
            if !objects.iter().any(|o| o == object) {
                objects.push(object.to_string());
            }
        }
    }

    pub fn objects_of(&self, type_name: &str) -> &[String] {
        self.objects_by_type.get(type_name).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use crate::Literal;
    use super::*;

    const TIRES_PROBLEM: &str = "(define (problem tires-1)
  (:domain tireworld)
  (:objects l1 l2 l3 - location)
  (:init (vehicle-at l1) (road l1 l2) (road l2 l3) (spare-in l2) (not-flattire) (= (total-cost) 0))
  (:goal (vehicle-at l3))
  (:metric minimize (total-cost)))";

    #[test]
    fn tires_problem() {
        let problem = PddlProblem::parse(TIRES_PROBLEM).unwrap();
        assert_eq!(problem.name, "tires-1");
        assert_eq!(problem.domain, "tireworld");
        assert_eq!(problem.objects.len(), 3);
        assert_eq!(problem.facts.len(), 5);
        assert!(problem.facts.contains(&Literal::new("road", &["l1", "l2"]).atom()));
        assert_eq!(problem.numeric_facts.get(&Literal::new("total-cost", &[]).atom()), Some(&I40F24::from_num(0)));
        assert_eq!(problem.goal, Condition::Atom(Literal::new("vehicle-at", &["l3"])));
        assert_eq!(format!("{:?}", problem.metric), r#"Some(Minimize(Predicate { elements: ["total-cost"] }))"#);
    }

    #[test]
    fn blocks_untyped() {
        let pddl = "(define (problem BLOCKS-4-2)
(:domain BLOCKS)
(:objects B D C A )
(:INIT (CLEAR A) (CLEAR C) (CLEAR D) (ONTABLE A) (ONTABLE B) (ONTABLE D)
 (ON C B) (HANDEMPTY))
(:goal (AND (ON A B) (ON B C) (ON C D)))
)";
        let problem = PddlProblem::parse(pddl).unwrap();
        assert_eq!(problem.name, "blocks-4-2");
        assert_eq!(problem.objects, vec![TypedParameter::new("b", ROOT_TYPE), TypedParameter::new("d", ROOT_TYPE),
                                         TypedParameter::new("c", ROOT_TYPE), TypedParameter::new("a", ROOT_TYPE)]);
        assert_eq!(problem.facts.len(), 8);
        assert!(problem.facts.contains(&Literal::new("on", &["c", "b"]).atom()));
        assert!(problem.numeric_facts.is_empty());
        assert_eq!(problem.goal.literals().len(), 3);
        assert!(problem.metric.is_none());
    }

    #[test]
    fn satellite_numeric_init() {
        let pddl = "(define (problem strips-sat-x-1)
(:domain satellite)
(:objects
	satellite0 - satellite
	instrument0 - instrument
	Star0 GroundStation1 - direction
)
(:init
	(on_board instrument0 satellite0)
	(power_avail satellite0)
	(= (fuel satellite0) 112)
	(= (slew_time GroundStation1 Star0) 18.17)
	(= (fuel-used) 0)
)
(:goal (and (pointing satellite0 Star0)))
(:metric maximize (fuel-used)))";
        let problem = PddlProblem::parse(pddl).unwrap();
        assert_eq!(problem.objects[3], TypedParameter::new("groundstation1", "direction"));
        assert_eq!(problem.facts.len(), 2);
        assert_eq!(problem.numeric_facts.len(), 3);
        assert_eq!(problem.numeric_facts[&Literal::new("fuel", &["satellite0"]).atom()], I40F24::from_num(112));
        assert_eq!(problem.numeric_facts[&Literal::new("slew_time", &["groundstation1", "star0"]).atom()],
                   "18.17".parse::<I40F24>().unwrap());
        assert!(matches!(problem.metric, Some(Metric::Maximize(_))));
    }

    #[test]
    fn predicate_accessors() {
        let atom = Literal::new("road", &["l1", "l2"]).atom();
        assert_eq!(atom.get_tag(), "road");
        assert_eq!(atom.num_args(), 2);
        assert_eq!(atom.get_arg(1), "l2");
    }

    #[test]
    fn index_follows_type_hierarchy() {
        let domain = PddlDomain::parse("(define (domain vehicles)
  (:types truck car - vehicle vehicle place)
  (:constants depot - place))").unwrap();
        let problem = PddlProblem::parse("(define (problem fleet)
  (:domain vehicles)
  (:objects t1 t2 - truck c1 - car home - place))").unwrap();
        let index = TypeIndex::build(&domain, &problem);
        assert_eq!(index.objects_of("truck"), &["t1".to_string(), "t2".to_string()]);
        assert_eq!(index.objects_of("vehicle"), &["t1".to_string(), "t2".to_string(), "c1".to_string()]);
        assert_eq!(index.objects_of("place"), &["depot".to_string(), "home".to_string()]);
        assert_eq!(index.objects_of(ROOT_TYPE).len(), 5);
        assert!(index.objects_of("boat").is_empty());
    }
}
