//! The effect tree of an action.
//!
//! Every wrapper owns its children and nothing is mutated after construction.
//! The constructors keep the tree flat: chained guards fuse into one
//! condition, chained quantifiers share one parameter list, and neither a
//! conjunction nor a choice ever holds a child of its own kind.

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write;
use crate::{label, Binding, Condition, CostEffect, EffectError, Literal, TypedParameter};

/// Pre-normalization unit: for each binding of `parameters`, if `condition`
/// holds, `literal` is produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawEffect {
    pub parameters: Vec<TypedParameter>,
    pub condition: Condition,
    pub literal: Literal
}

impl RawEffect {
    pub fn new(parameters: Vec<TypedParameter>, condition: Condition, literal: Literal) -> Self {
        RawEffect {parameters, condition, literal}
    }

    pub fn uniquify_variables(&self, type_map: &mut BTreeMap<String, String>,
                              renamings: &BTreeMap<String, String>) -> Self {
        let mut renamings = renamings.clone();
        let parameters = self.parameters.iter()
            .map(|p| p.uniquify_name(type_map, &mut renamings))
            .collect();
        RawEffect {
            parameters,
            condition: self.condition.uniquify_variables(type_map, &renamings),
            literal: self.literal.rename_variables(&renamings)
        }
    }

    /// Delete effects carry no information in the relaxation.
    pub fn relaxed(&self) -> Option<Self> {
        if self.literal.is_negated() {
            None
        } else {
            Some(RawEffect {condition: self.condition.relaxed(), ..self.clone()})
        }
    }

    pub fn simplified(&self) -> Self {
        RawEffect {condition: self.condition.simplified(), ..self.clone()}
    }

    pub fn structured(&self) -> Effect {
        let mut effect = Effect::Simple(self.literal.clone());
        if !self.condition.is_truth() {
            effect = Effect::conditional(self.condition.clone(), effect);
        }
        if !self.parameters.is_empty() {
            effect = Effect::universal(self.parameters.clone(), effect);
        }
        effect
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConditionalEffect {
    pub(crate) condition: Condition,
    pub(crate) effect: Box<Effect>
}

impl ConditionalEffect {
    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn effect(&self) -> &Effect {
        &self.effect
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniversalEffect {
    pub(crate) parameters: Vec<TypedParameter>,
    pub(crate) effect: Box<Effect>
}

impl UniversalEffect {
    pub fn parameters(&self) -> &[TypedParameter] {
        &self.parameters
    }

    pub fn effect(&self) -> &Effect {
        &self.effect
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConjunctiveEffect {
    pub(crate) effects: Vec<Effect>,
    pub(crate) outcome_label: Option<String>
}

impl ConjunctiveEffect {
    /// Flattens conjunctions among `effects` and derives the composite label
    /// of the labeled children, in order.
    pub fn new(effects: Vec<Effect>) -> Self {
        let mut flat = Vec::with_capacity(effects.len());
        let mut labels = Vec::new();
        for effect in effects {
            if let Some(l) = effect.outcome_label() {
                labels.push(l.to_string());
            }
            match effect {
                Effect::Conjunctive(c) => flat.extend(c.effects),
                other => flat.push(other)
            }
        }
        ConjunctiveEffect {effects: flat, outcome_label: label::conjoin(labels.iter().map(|l| l.as_str()))}
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn outcome_label(&self) -> Option<&str> {
        self.outcome_label.as_deref()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OneofEffect {
    pub(crate) effects: Vec<Effect>
}

impl OneofEffect {
    /// Splices nested choices into one list of branches. The outcomes of a
    /// nested labeled choice keep their labels as branches here.
    pub fn new(effects: Vec<Effect>) -> Self {
        let mut flat = Vec::with_capacity(effects.len());
        for effect in effects {
            match effect {
                Effect::Oneof(o) => flat.extend(o.effects),
                Effect::LabeledOneof(l) => flat.extend(l.outcomes.into_iter().map(Effect::LabeledOutcome)),
                other => flat.push(other)
            }
        }
        OneofEffect {effects: flat}
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabeledOutcomeEffect {
    pub(crate) outcome_label: String,
    pub(crate) effect: Box<Effect>
}

impl LabeledOutcomeEffect {
    pub fn new(outcome_label: &str, effect: Effect) -> Result<Self, EffectError> {
        label::validate(outcome_label)?;
        Ok(LabeledOutcomeEffect::composed(outcome_label.to_string(), effect))
    }

    /// For labels assembled from already validated parts.
    pub(crate) fn composed(outcome_label: String, effect: Effect) -> Self {
        LabeledOutcomeEffect {outcome_label, effect: Box::new(effect)}
    }

    pub fn outcome_label(&self) -> &str {
        self.outcome_label.as_str()
    }

    pub fn effect(&self) -> &Effect {
        &self.effect
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabeledOneofEffect {
    pub(crate) label: Option<String>,
    pub(crate) outcomes: Vec<LabeledOutcomeEffect>
}

impl LabeledOneofEffect {
    pub fn new(label: Option<&str>, outcomes: Vec<LabeledOutcomeEffect>) -> Result<Self, EffectError> {
        if let Some(l) = label {
            label::validate(l)?;
        }
        Ok(LabeledOneofEffect {label: label.map(|l| l.to_string()), outcomes})
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn outcomes(&self) -> &[LabeledOutcomeEffect] {
        &self.outcomes
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Raw(RawEffect),
    Simple(Literal),
    Cost(CostEffect),
    Conditional(ConditionalEffect),
    Universal(UniversalEffect),
    Conjunctive(ConjunctiveEffect),
    Oneof(OneofEffect),
    LabeledOneof(LabeledOneofEffect),
    LabeledOutcome(LabeledOutcomeEffect)
}

impl Effect {
    /// Guards `effect` by `condition`; a guarded child has its guard fused in.
    pub fn conditional(condition: Condition, effect: Effect) -> Self {
        match effect {
            Effect::Conditional(inner) => Effect::Conditional(ConditionalEffect {
                condition: Condition::conjunction(vec![condition, inner.condition]),
                effect: inner.effect
            }),
            other => Effect::Conditional(ConditionalEffect {condition, effect: Box::new(other)})
        }
    }

    /// Quantifies `effect`; a quantified child contributes its parameters.
    pub fn universal(parameters: Vec<TypedParameter>, effect: Effect) -> Self {
        match effect {
            Effect::Universal(inner) => {
                let mut parameters = parameters;
                parameters.extend(inner.parameters);
                Effect::Universal(UniversalEffect {parameters, effect: inner.effect})
            }
            other => Effect::Universal(UniversalEffect {parameters, effect: Box::new(other)})
        }
    }

    pub fn conjunction(effects: Vec<Effect>) -> Self {
        Effect::Conjunctive(ConjunctiveEffect::new(effects))
    }

    pub fn oneof(effects: Vec<Effect>) -> Self {
        Effect::Oneof(OneofEffect::new(effects))
    }

    pub fn outcome_label(&self) -> Option<&str> {
        match self {
            Effect::LabeledOutcome(o) => Some(o.outcome_label()),
            Effect::Conjunctive(c) => c.outcome_label(),
            _ => None
        }
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, Effect::Oneof(_) | Effect::LabeledOneof(_))
    }

    pub fn contains_cost(&self) -> bool {
        match self {
            Effect::Cost(_) => true,
            Effect::Raw(_) | Effect::Simple(_) => false,
            Effect::Conditional(c) => c.effect.contains_cost(),
            Effect::Universal(u) => u.effect.contains_cost(),
            Effect::Conjunctive(c) => c.effects.iter().any(|e| e.contains_cost()),
            Effect::Oneof(o) => o.effects.iter().any(|e| e.contains_cost()),
            Effect::LabeledOneof(l) => l.outcomes.iter().any(|o| o.effect.contains_cost()),
            Effect::LabeledOutcome(o) => o.effect.contains_cost()
        }
    }

    /// Replaces bound variables everywhere, keeping the shape of the tree.
    /// Quantified parameters shadow outer bindings of the same name.
    pub fn substitute(&self, binding: &Binding) -> Self {
        match self {
            Effect::Raw(raw) => {
                let binding = shadowed(binding, &raw.parameters);
                Effect::Raw(RawEffect {
                    parameters: raw.parameters.clone(),
                    condition: raw.condition.clone_and_instantiate(&binding),
                    literal: raw.literal.clone_and_instantiate(&binding)
                })
            }
            Effect::Simple(lit) => Effect::Simple(lit.clone_and_instantiate(binding)),
            Effect::Cost(cost) => Effect::Cost(cost.substitute(binding)),
            Effect::Conditional(c) => Effect::Conditional(ConditionalEffect {
                condition: c.condition.clone_and_instantiate(binding),
                effect: Box::new(c.effect.substitute(binding))
            }),
            Effect::Universal(u) => Effect::Universal(UniversalEffect {
                parameters: u.parameters.clone(),
                effect: Box::new(u.effect.substitute(&shadowed(binding, &u.parameters)))
            }),
            Effect::Conjunctive(c) => Effect::conjunction(c.effects.iter().map(|e| e.substitute(binding)).collect()),
            Effect::Oneof(o) => Effect::Oneof(OneofEffect {effects: o.effects.iter().map(|e| e.substitute(binding)).collect()}),
            Effect::LabeledOneof(l) => Effect::LabeledOneof(LabeledOneofEffect {
                label: l.label.clone(),
                outcomes: l.outcomes.iter().map(|o| o.substitute(binding)).collect()
            }),
            Effect::LabeledOutcome(o) => Effect::LabeledOutcome(o.substitute(binding))
        }
    }

    /// Renames quantified variables that clash with names already in
    /// `type_map`, threading the renamings into the quantified bodies.
    pub fn uniquify_variables(&self, type_map: &mut BTreeMap<String, String>,
                              renamings: &BTreeMap<String, String>) -> Self {
        match self {
            Effect::Raw(raw) => Effect::Raw(raw.uniquify_variables(type_map, renamings)),
            Effect::Universal(u) => {
                let mut local = renamings.clone();
                let parameters = u.parameters.iter()
                    .map(|p| p.uniquify_name(type_map, &mut local))
                    .collect();
                Effect::Universal(UniversalEffect {
                    parameters,
                    effect: Box::new(u.effect.uniquify_variables(type_map, &local))
                })
            }
            Effect::Conditional(c) => Effect::Conditional(ConditionalEffect {
                condition: c.condition.uniquify_variables(type_map, renamings),
                effect: Box::new(c.effect.uniquify_variables(type_map, renamings))
            }),
            Effect::Conjunctive(c) => Effect::conjunction(
                c.effects.iter().map(|e| e.uniquify_variables(type_map, renamings)).collect()),
            Effect::Oneof(o) => Effect::Oneof(OneofEffect {
                effects: o.effects.iter().map(|e| e.uniquify_variables(type_map, renamings)).collect()}),
            Effect::LabeledOneof(l) => Effect::LabeledOneof(LabeledOneofEffect {
                label: l.label.clone(),
                outcomes: l.outcomes.iter().map(|o| LabeledOutcomeEffect::composed(
                    o.outcome_label.clone(), o.effect.uniquify_variables(type_map, renamings))).collect()
            }),
            Effect::LabeledOutcome(o) => Effect::LabeledOutcome(LabeledOutcomeEffect::composed(
                o.outcome_label.clone(), o.effect.uniquify_variables(type_map, renamings))),
            Effect::Simple(_) | Effect::Cost(_) => self.substitute(renamings)
        }
    }

    /// Indented rendering for diagnostics; not a stable format.
    pub fn dump(&self, indent: &str) -> String {
        Dump {effect: self, indent}.to_string()
    }

    fn dump_into<W: Write>(&self, indent: &str, out: &mut W) -> fmt::Result {
        let deeper = format!("{}  ", indent);
        match self {
            Effect::Raw(raw) => {
                let mut indent = indent.to_string();
                if !raw.parameters.is_empty() {
                    writeln!(out, "{}forall {}", indent, join_parameters(&raw.parameters))?;
                    indent.push_str("  ");
                }
                if !raw.condition.is_truth() {
                    writeln!(out, "{}if", indent)?;
                    raw.condition.dump_into(&format!("{}  ", indent), out)?;
                    writeln!(out, "{}then", indent)?;
                    indent.push_str("  ");
                }
                writeln!(out, "{}{}", indent, raw.literal)
            }
            Effect::Simple(lit) => writeln!(out, "{}{}", indent, lit),
            Effect::Cost(cost) => writeln!(out, "{}{}", indent, cost),
            Effect::Conditional(c) => {
                writeln!(out, "{}if", indent)?;
                c.condition.dump_into(&deeper, out)?;
                writeln!(out, "{}then", indent)?;
                c.effect.dump_into(&deeper, out)
            }
            Effect::Universal(u) => {
                writeln!(out, "{}forall {}", indent, join_parameters(&u.parameters))?;
                u.effect.dump_into(&deeper, out)
            }
            Effect::Conjunctive(c) => {
                writeln!(out, "{}and", indent)?;
                c.effects.iter().try_for_each(|e| e.dump_into(&deeper, out))
            }
            Effect::Oneof(o) => {
                writeln!(out, "{}oneof", indent)?;
                for (i, e) in o.effects.iter().enumerate() {
                    writeln!(out, " {}{}:", indent, i + 1)?;
                    e.dump_into(&deeper, out)?;
                }
                Ok(())
            }
            Effect::LabeledOneof(l) => {
                match &l.label {
                    Some(name) => writeln!(out, "{}labeled-oneof {}", indent, name)?,
                    None => writeln!(out, "{}labeled-oneof", indent)?
                }
                for (i, o) in l.outcomes.iter().enumerate() {
                    writeln!(out, " {}{}: [{}]", indent, i + 1, o.outcome_label)?;
                    o.effect.dump_into(&deeper, out)?;
                }
                Ok(())
            }
            Effect::LabeledOutcome(o) => {
                writeln!(out, "{}outcome = {}", indent, o.outcome_label)?;
                o.effect.dump_into(&deeper, out)
            }
        }
    }
}

struct Dump<'a> {
    effect: &'a Effect,
    indent: &'a str
}

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.effect.dump_into(self.indent, f)
    }
}

/// Appends `body` as the outcome `outcome_label`. A choice body is spliced
/// in as one outcome per branch, each labeled `outcome_label__branch`;
/// unlabeled branches are labeled by position.
pub(crate) fn push_outcome(outcomes: &mut Vec<LabeledOutcomeEffect>, outcome_label: String, body: Effect) {
    match body {
        Effect::LabeledOneof(inner) => {
            for nested in inner.outcomes {
                let nested_label = match &inner.label {
                    Some(parent) => label::nest(parent, &nested.outcome_label),
                    None => nested.outcome_label
                };
                push_outcome(outcomes, label::join(&outcome_label, &nested_label), *nested.effect);
            }
        }
        Effect::Oneof(inner) => {
            for (i, branch) in inner.effects.into_iter().enumerate() {
                match branch {
                    Effect::LabeledOutcome(nested) =>
                        push_outcome(outcomes, label::join(&outcome_label, &nested.outcome_label), *nested.effect),
                    other => push_outcome(outcomes, label::join(&outcome_label, &label::positional(i)), other)
                }
            }
        }
        other => outcomes.push(LabeledOutcomeEffect::composed(outcome_label, other))
    }
}

impl LabeledOutcomeEffect {
    fn substitute(&self, binding: &Binding) -> Self {
        LabeledOutcomeEffect::composed(self.outcome_label.clone(), self.effect.substitute(binding))
    }
}

fn shadowed(binding: &Binding, parameters: &[TypedParameter]) -> Binding {
    let mut binding = binding.clone();
    parameters.iter().for_each(|p| {binding.remove(&p.name);});
    binding
}

fn join_parameters(parameters: &[TypedParameter]) -> String {
    parameters.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ")
}
