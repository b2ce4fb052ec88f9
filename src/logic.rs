use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fmt::Write;
use tracing::trace;
use crate::{EffectError, Predicate};

/// Variable name to object name.
pub type Binding = BTreeMap<String, String>;

pub const EQUALITY: &str = "=";

pub fn is_variable(symbol: &str) -> bool {
    symbol.starts_with('?')
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypedParameter {
    pub name: String,
    pub type_name: String
}

impl TypedParameter {
    pub fn new(name: &str, type_name: &str) -> Self {
        TypedParameter {name: name.to_string(), type_name: type_name.to_string()}
    }

    /// Claims this parameter's name in `type_map`. A name that is already
    /// taken gets the smallest numeric suffix that is still free, and the
    /// renaming is recorded so the scope's body can follow it.
    pub fn uniquify_name(&self, type_map: &mut BTreeMap<String, String>,
                         renamings: &mut BTreeMap<String, String>) -> Self {
        if !type_map.contains_key(&self.name) {
            type_map.insert(self.name.clone(), self.type_name.clone());
            return self.clone();
        }
        let mut counter = 1;
        loop {
            let candidate = format!("{}{}", self.name, counter);
            if !type_map.contains_key(&candidate) {
                renamings.insert(self.name.clone(), candidate.clone());
                type_map.insert(candidate.clone(), self.type_name.clone());
                return TypedParameter {name: candidate, type_name: self.type_name.clone()};
            }
            counter += 1;
        }
    }
}

impl fmt::Display for TypedParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.name, self.type_name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Literal {
    predicate: String,
    args: Vec<String>,
    negated: bool
}

impl Literal {
    pub fn new(predicate: &str, args: &[&str]) -> Self {
        Literal {predicate: predicate.to_string(), args: args.iter().map(|a| a.to_string()).collect(), negated: false}
    }

    pub fn from_parts(predicate: String, args: Vec<String>, negated: bool) -> Self {
        Literal {predicate, args, negated}
    }

    pub fn negate(&self) -> Self {
        Literal {negated: !self.negated, ..self.clone()}
    }

    pub fn predicate(&self) -> &str {
        self.predicate.as_str()
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// The positive atom as it would appear among the problem's facts.
    pub fn atom(&self) -> Predicate {
        let mut atom = Predicate::new(self.predicate.clone());
        self.args.iter().for_each(|a| atom.add_arg(a.clone()));
        atom
    }

    pub fn rename_variables(&self, renamings: &BTreeMap<String, String>) -> Self {
        self.clone_and_instantiate(renamings)
    }

    /// Substitutes bound variables and leaves everything else untouched.
    pub fn clone_and_instantiate(&self, binding: &Binding) -> Self {
        Literal {
            predicate: self.predicate.clone(),
            args: self.args.iter().map(|a| binding.get(a).unwrap_or(a).clone()).collect(),
            negated: self.negated
        }
    }

    /// Substitutes every variable; a variable missing from `binding` is an error.
    pub fn ground(&self, binding: &Binding) -> Result<Self, EffectError> {
        let mut args = Vec::with_capacity(self.args.len());
        for arg in self.args.iter() {
            if is_variable(arg) {
                match binding.get(arg) {
                    Some(obj) => args.push(obj.clone()),
                    None => return Err(EffectError::UnresolvedVariable {
                        variable: arg.clone(), literal: self.to_string()})
                }
            } else {
                args.push(arg.clone());
            }
        }
        Ok(Literal {predicate: self.predicate.clone(), args, negated: self.negated})
    }

    /// Grounds an effect literal. Only fluent predicates can change during
    /// execution, so a literal over a static predicate is suppressed.
    pub fn instantiate(&self, binding: &Binding, facts: &BTreeSet<Predicate>,
                       fluents: &BTreeSet<String>, result: &mut Vec<Literal>) -> Result<(), EffectError> {
        let ground = self.ground(binding)?;
        if fluents.contains(&ground.predicate) {
            result.push(ground);
        } else {
            trace!(literal = %ground, already_holds = facts.contains(&ground.atom()) != ground.negated,
                "suppressed effect on static predicate");
        }
        Ok(())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "(not ")?;
        }
        write!(f, "({}", self.predicate)?;
        for arg in self.args.iter() {
            write!(f, " {}", arg)?;
        }
        write!(f, ")")?;
        if self.negated {
            write!(f, ")")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Condition {
    Truth,
    Atom(Literal),
    Conjunction(Vec<Condition>)
}

impl Condition {
    /// Conjoins `parts`, flattening nested conjunctions and dropping `Truth`.
    pub fn conjunction(parts: Vec<Condition>) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Condition::Truth => {},
                Condition::Conjunction(inner) => match Condition::conjunction(inner) {
                    Condition::Conjunction(inner) => flat.extend(inner),
                    Condition::Truth => {},
                    atom => flat.push(atom)
                },
                atom => flat.push(atom)
            }
        }
        match flat.len() {
            0 => Condition::Truth,
            1 => flat.remove(0),
            _ => Condition::Conjunction(flat)
        }
    }

    pub fn is_truth(&self) -> bool {
        matches!(self, Condition::Truth)
    }

    pub fn simplified(&self) -> Self {
        match self {
            Condition::Conjunction(parts) => Condition::conjunction(parts.iter().map(|p| p.simplified()).collect()),
            other => other.clone()
        }
    }

    /// Drops negative information.
    pub fn relaxed(&self) -> Self {
        match self {
            Condition::Truth => Condition::Truth,
            Condition::Atom(lit) => if lit.is_negated() {Condition::Truth} else {self.clone()},
            Condition::Conjunction(parts) => Condition::conjunction(parts.iter().map(|p| p.relaxed()).collect())
        }
    }

    pub fn literals(&self) -> Vec<&Literal> {
        match self {
            Condition::Truth => vec![],
            Condition::Atom(lit) => vec![lit],
            Condition::Conjunction(parts) => parts.iter().flat_map(|p| p.literals()).collect()
        }
    }

    /// Appends the ground conjuncts whose truth is not known yet. Static
    /// conjuncts are decided against `facts`; a false one makes the whole
    /// condition `Impossible`.
    pub fn instantiate(&self, binding: &Binding, facts: &BTreeSet<Predicate>,
                       fluents: &BTreeSet<String>, result: &mut Vec<Literal>) -> Result<(), EffectError> {
        match self {
            Condition::Truth => Ok(()),
            Condition::Conjunction(parts) => {
                for part in parts.iter() {
                    part.instantiate(binding, facts, fluents, result)?;
                }
                Ok(())
            }
            Condition::Atom(lit) => {
                let ground = lit.ground(binding)?;
                if ground.predicate() == EQUALITY && ground.args().len() == 2 {
                    let equal = ground.args()[0] == ground.args()[1];
                    if equal == ground.is_negated() {
                        return Err(EffectError::Impossible);
                    }
                } else if fluents.contains(ground.predicate()) {
                    result.push(ground);
                } else if facts.contains(&ground.atom()) == ground.is_negated() {
                    return Err(EffectError::Impossible);
                }
                Ok(())
            }
        }
    }

    pub fn clone_and_instantiate(&self, binding: &Binding) -> Self {
        match self {
            Condition::Truth => Condition::Truth,
            Condition::Atom(lit) => Condition::Atom(lit.clone_and_instantiate(binding)),
            Condition::Conjunction(parts) => Condition::Conjunction(parts.iter().map(|p| p.clone_and_instantiate(binding)).collect())
        }
    }

    pub fn rename_variables(&self, renamings: &BTreeMap<String, String>) -> Self {
        self.clone_and_instantiate(renamings)
    }

    /// Conditions here bind no variables of their own, so uniquifying only
    /// applies renamings made by enclosing scopes.
    pub fn uniquify_variables(&self, _type_map: &mut BTreeMap<String, String>,
                              renamings: &BTreeMap<String, String>) -> Self {
        self.rename_variables(renamings)
    }

    pub fn dump(&self, indent: &str) -> String {
        Dump {condition: self, indent}.to_string()
    }

    pub(crate) fn dump_into<W: Write>(&self, indent: &str, out: &mut W) -> fmt::Result {
        match self {
            Condition::Truth => writeln!(out, "{}truth", indent),
            Condition::Atom(lit) => writeln!(out, "{}{}", indent, lit),
            Condition::Conjunction(parts) => {
                writeln!(out, "{}and", indent)?;
                let deeper = format!("{}  ", indent);
                parts.iter().try_for_each(|p| p.dump_into(deeper.as_str(), out))
            }
        }
    }
}

struct Dump<'a> {
    condition: &'a Condition,
    indent: &'a str
}

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.condition.dump_into(self.indent, f)
    }
}
