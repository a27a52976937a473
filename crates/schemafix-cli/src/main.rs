//! schemafix CLI - map, clean and fix tabular uploads.

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};
use commands::Context;

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let ctx = Context {
        state_dir: cli.state_dir,
        schema: cli.schema,
        config: cli.config,
    };

    let result = match cli.command {
        Commands::Schema => commands::schema::run(&ctx),

        Commands::Map {
            file,
            llm,
            model,
            json,
        } => commands::map::run(&ctx, file, llm, model, json),

        Commands::Run {
            file,
            resume,
            llm,
            model,
        } => commands::run::run(&ctx, file, resume, llm, model),

        Commands::MapEdit {
            session,
            source,
            canonical,
        } => commands::map_edit::run(&ctx, session, source, canonical),

        Commands::Fix {
            session,
            signature,
            decision,
            value,
        } => commands::fix::run(&ctx, session, signature, decision, value),

        Commands::Finalize { session, output } => commands::finalize::run(&ctx, session, output),

        Commands::Status { session, json } => commands::status::run(&ctx, session, json),

        Commands::Cleanup { max_age_hours } => commands::cleanup::run(&ctx, max_age_hours),

        Commands::Learned { json } => commands::learned::run(&ctx, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
