use clap::{ArgAction, Parser};

#[derive(Parser, Debug, serde::Serialize)]
#[command(
    name = "taskboard",
    version,
    about = "Run a simulated workload on a live multi-line progress display",
    long_about = "Each task gets one line that is updated in place as the task reports \
                  progress, while a progress bar at the bottom tracks how many tasks \
                  have been started. Tasks run on a bounded worker pool."
)]
pub struct Cli {
    /// Number of tasks to run at once (0 = one per logical CPU, 1 = sequential)
    #[arg(short = 'c', long = "concurrency", value_name = "N", default_value_t = 4)]
    pub concurrency: usize,

    /// Number of simulated tasks
    #[arg(short = 'n', long = "items", value_name = "N", default_value_t = 24)]
    pub items: usize,

    /// Count the first N tasks as done without running or showing them
    #[arg(long = "skip", value_name = "N", default_value_t = 0)]
    pub skip: usize,

    /// Make every Nth task fail (0 disables failures)
    #[arg(long = "fail-every", value_name = "N", default_value_t = 7)]
    pub fail_every: usize,

    /// Shortest simulated task duration in milliseconds
    #[arg(long = "min-ms", value_name = "MS", default_value_t = 150)]
    pub min_ms: u64,

    /// Longest simulated task duration in milliseconds
    #[arg(long = "max-ms", value_name = "MS", default_value_t = 1200)]
    pub max_ms: u64,

    /// Width of the progress bar in characters
    #[arg(long = "bar-width", value_name = "N", default_value_t = 20)]
    pub bar_width: usize,

    /// Hide tasks that finished with nothing to report
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Print the resolved configuration as JSON and exit
    #[arg(long = "print-config")]
    pub print_config: bool,
}
