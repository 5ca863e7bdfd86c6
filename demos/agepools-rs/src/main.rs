pub mod disease;
pub mod output;
pub mod parameters;
pub mod population;
pub mod simulation;

use anyhow::{Context, Result};
use log::info;
use mixpool::RunContext;

use output::RunSummary;
use parameters::Parameters;
use population::AgeTable;
use simulation::Simulation;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut ctx = RunContext::<Parameters>::load().context("failed to read run input")?;
    let mut parameters = ctx.input.take().context("run input has no parameters")?;
    parameters.seed = ctx.seed;

    // Uniform ages when no age table is supplied
    let ages = match &parameters.age_data {
        Some(key) => AgeTable::from_path(ctx.file(key)?)?,
        None => AgeTable::uniform(0.0, 100.0),
    };

    let pool = parameters
        .pools
        .build(&ctx.files)
        .context("invalid mixing pool configuration")?;
    let disease = pool.disease();

    info!(
        "running {} agents for {} steps (replicate {})",
        parameters.n_agents,
        parameters.n_steps(),
        ctx.replicate
    );
    let output = Simulation::new(&parameters, &ages, pool)?.run()?;

    ctx.write_csv(
        "infections_by_group.csv",
        &["step", "time", "group", "infected"],
        &output.group_rows(),
    )?;
    ctx.write_csv(
        "sir_totals.csv",
        &["step", "time", "susceptible", "infected", "recovered", "new_infections"],
        &output.total_rows(),
    )?;

    let summary = RunSummary {
        seed: ctx.seed,
        replicate: ctx.replicate,
        input_digest: ctx.input_digest(),
        disease: disease.to_string(),
        n_agents: parameters.n_agents,
        steps: output.len(),
        cumulative_infections: output.new_infections.iter().sum(),
        peak_infected: output.totals.iter().map(|t| t.infected).max().unwrap_or(0),
    };
    ctx.write_json("run.json", &summary)?;
    Ok(())
}
