//! Fix command - decide the suggestions for one issue signature.

use colored::Colorize;
use schemafix::FixDecision;

use super::{resolve_signature, CommandResult, Context};
use crate::cli::DecisionChoice;

pub fn run(
    ctx: &Context,
    session: String,
    signature: String,
    decision: DecisionChoice,
    value: Option<String>,
) -> CommandResult {
    let pipeline = ctx.resume(&session)?;
    let snapshot = pipeline.session(&session)?;
    let signature = resolve_signature(&snapshot, &signature)?;

    let fix = match decision {
        DecisionChoice::Accept => FixDecision::Accept { value },
        DecisionChoice::Promote => FixDecision::Promote { value },
        DecisionChoice::Reject => {
            if value.is_some() {
                return Err("--value cannot be combined with reject".into());
            }
            FixDecision::Reject
        }
    };

    let decided = pipeline.apply_fix(&session, &signature, fix)?;
    pipeline.checkpoint(&session)?;

    let verb = match decision {
        DecisionChoice::Accept => "Accepted".green(),
        DecisionChoice::Reject => "Rejected".red(),
        DecisionChoice::Promote => "Promoted".magenta(),
    };
    println!(
        "{} {} suggestion(s) for {}",
        verb.bold(),
        decided,
        signature.to_string().white()
    );
    if let DecisionChoice::Promote = decision {
        println!("Future uploads will reuse this fix.");
    }

    let stage = pipeline.stage(&session)?;
    println!("Session is {}", stage.to_string().yellow());
    Ok(())
}
