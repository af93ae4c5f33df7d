use serde::{Deserialize, Serialize};

use crate::{
    bar::BarStyle,
    cli::Cli,
    display::DisplayOptions,
    workload::WorkloadSettings,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub concurrency: usize,
    pub workload: WorkloadSettings,
    pub display: DisplayOptions,
    pub quiet: bool,
    pub verbose: u8,
    pub print_config: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: 4,
            workload: WorkloadSettings::default(),
            display: DisplayOptions::default(),
            quiet: false,
            verbose: 0,
            print_config: false,
        }
    }
}

impl Config {
    fn validate_concurrency(&self) -> anyhow::Result<()> {
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be resolved to at least 1");
        }

        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_concurrency()?;
        self.display.bar.validate()?;
        self.workload.validate()?;
        Ok(())
    }
}

fn resolve_concurrency(requested: usize) -> usize {
    if requested == 0 {
        num_cpus::get().max(1)
    } else {
        requested
    }
}

impl TryFrom<Cli> for Config {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let config = Self {
            concurrency: resolve_concurrency(cli.concurrency),
            workload: WorkloadSettings {
                items: cli.items,
                skip: cli.skip,
                fail_every: cli.fail_every,
                min_ms: cli.min_ms,
                max_ms: cli.max_ms,
            },
            display: DisplayOptions {
                bar: BarStyle {
                    width: cli.bar_width,
                    ..BarStyle::default()
                },
                ..DisplayOptions::default()
            },
            quiet: cli.quiet,
            verbose: cli.verbose,
            print_config: cli.print_config,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["taskboard"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::try_from(cli(&[])).unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.workload.items, 24);
        assert_eq!(config.display.bar.width, 20);
        assert_eq!(config.display.indent, "    ");
    }

    #[test]
    fn zero_concurrency_uses_cpu_count() {
        let config = Config::try_from(cli(&["-c", "0"])).unwrap();
        assert!(config.concurrency >= 1);
    }

    #[test]
    fn errors_when_bar_width_is_zero() {
        let result = Config::try_from(cli(&["--bar-width", "0"]));
        assert!(result.is_err());
    }

    #[test]
    fn errors_when_min_duration_exceeds_max() {
        let result = Config::try_from(cli(&["--min-ms", "500", "--max-ms", "100"]));
        assert!(result.is_err());
    }

    #[test]
    fn counts_verbosity_flags() {
        let config = Config::try_from(cli(&["-vv", "-q"])).unwrap();
        assert_eq!(config.verbose, 2);
        assert!(config.quiet);
    }

    #[test]
    fn serializes_to_json() {
        let config = Config::default();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["display"]["bar"]["fill"], "#");
        assert_eq!(json["workload"]["items"], 24);
    }
}
