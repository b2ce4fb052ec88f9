use std::fs::read_to_string;
use std::io;
use std::path::PathBuf;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use pddl_effects::{ActionSchema, Grounder, PddlDomain, PddlProblem, TypeIndex};

#[derive(Parser, Debug)]
#[command(about = "Normalize and ground the effects of a PDDL domain against a problem")]
struct Args {
    domain: PathBuf,
    problem: PathBuf,
    /// Only process this action.
    #[arg(long)]
    action: Option<String>,
    /// Print each normalized effect instead of grounding it.
    #[arg(long)]
    canonical: bool,
}

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let domain = PddlDomain::parse(&read_to_string(&args.domain)?)?;
    let problem = PddlProblem::parse(&read_to_string(&args.problem)?)?;
    let types = TypeIndex::build(&domain, &problem);
    let fluents = domain.fluent_predicates();
    let grounder = Grounder::new(&problem.facts, &problem.numeric_facts, &fluents, &types);
    info!(domain = %domain.name, problem = %problem.name, actions = domain.actions.len(), "loaded");

    for action in domain.actions.values() {
        if args.action.as_ref().map_or(false, |name| name != &action.name) {
            continue;
        }
        if args.canonical {
            println!("{}:\n{}", action.name, action.effect.normalize(&types)?.dump("  "));
        } else {
            ground_action(action, &grounder, &types)?;
        }
    }
    Ok(())
}

fn ground_action(action: &ActionSchema, grounder: &Grounder, types: &TypeIndex) -> io::Result<()> {
    let (cost, residual) = action.effect.normalize(types)?.extract_cost()?;
    let mut grounded = 0;
    for binding in grounder.action_bindings(&action.parameters) {
        let precondition = match grounder.precondition(&action.precondition, &binding)? {
            Some(literals) => literals,
            None => continue
        };
        grounded += 1;
        let args = action.parameters.iter().map(|p| binding[&p.name].as_str()).collect::<Vec<_>>();
        println!("({} {})", action.name, args.join(" "));
        for literal in precondition {
            println!("  pre {}", literal);
        }
        if let Some(cost) = &cost {
            println!("  cost {}", grounder.cost(cost, &binding)?);
        }
        let outcomes = match &residual {
            Some(effect) => grounder.ground_outcomes(effect, &binding)?,
            None => vec![]
        };
        for (i, outcome) in outcomes.iter().enumerate() {
            match &outcome.label {
                Some(label) => println!("  outcome {}", label),
                None => println!("  outcome {}", i + 1)
            }
            for effect in outcome.effects.iter() {
                if effect.condition.is_empty() {
                    println!("    {}", effect.literal);
                } else {
                    let condition = effect.condition.iter().map(|l| l.to_string()).collect::<Vec<_>>();
                    println!("    (when (and {}) {})", condition.join(" "), effect.literal);
                }
            }
        }
    }
    info!(action = %action.name, grounded, "grounded action");
    Ok(())
}
