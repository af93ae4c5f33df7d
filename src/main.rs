use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;

use taskboard::cli::Cli;
use taskboard::config::Config;
use taskboard::interrupt::SIGINT_EXIT_CODE;
use taskboard::workload::{SimulatedTask, Tally};
use taskboard::{Display, Interrupt, finish_all, job_queue, logging};

fn run(display: &Display, config: &Config, interrupt: &Interrupt) -> anyhow::Result<String> {
    let started = Instant::now();
    display.status("Preparing workload...")?;
    let jobs = config.workload.jobs();
    display.set_limit(jobs.len())?;
    tracing::info!(
        "[run] {} task(s), concurrency {}",
        jobs.len(),
        config.concurrency
    );

    let tally = Arc::new(Tally::default());
    let mut queue = job_queue(config.concurrency, interrupt.clone())
        .context("failed to create job queue")?;

    for job in jobs {
        if job.index < config.workload.skip {
            display.item("")?;
            continue;
        }
        let item = display.item(&format!("+ {}", job.name))?;
        let task = SimulatedTask::new(job, item, Arc::clone(&tally), config.quiet);
        queue.add(Box::new(task))?;
    }
    finish_all(queue.as_mut(), interrupt)?;

    if tally.aborted() > 0 {
        tracing::warn!("[run] {} task(s) aborted", tally.aborted());
    }
    Ok(tally.summary(started.elapsed()))
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::try_from(cli)?;
    logging::init(config.verbose);

    if config.print_config {
        let serialized = serde_json::to_string_pretty(&config)?;
        println!("{}", serialized);
        return Ok(ExitCode::SUCCESS);
    }

    let interrupt = Interrupt::new();
    interrupt
        .install_sigint_handler()
        .context("failed to install Ctrl-C handler")?;

    let display = Display::stdout(config.display.clone());
    let outcome = display.scope(|display| {
        let summary = run(display, &config, &interrupt)?;
        display.finish(&summary)?;
        Ok(())
    })?;

    match outcome {
        Some(()) => Ok(ExitCode::SUCCESS),
        None => Ok(ExitCode::from(SIGINT_EXIT_CODE as u8)),
    }
}
