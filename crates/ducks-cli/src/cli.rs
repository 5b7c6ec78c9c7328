use clap::{ArgAction, Parser, Subcommand, ValueHint};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Provide custom config file
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<String>,

    /// Override the upstream repository URL
    #[arg(short, long, global = true, value_hint = ValueHint::Url)]
    pub upstream: Option<String>,

    /// Set user agent
    #[arg(required = false, long, short = 'A', global = true)]
    pub user_agent: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve metadata for one or more coordinates
    #[command(arg_required_else_help = true)]
    #[clap(name = "resolve", visible_alias = "r")]
    Resolve {
        /// Coordinates as group:artifact or group:artifact:version
        #[arg(required = true)]
        coordinates: Vec<String>,
    },

    /// Print the effective configuration
    #[clap(name = "config")]
    Config,

    /// Generate default config
    #[clap(name = "defconfig")]
    DefConfig,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_resolve() {
        let args = Args::parse_from([
            "ducks",
            "-vv",
            "--json",
            "resolve",
            "org.example:widget",
            "org.example:widget:1.0-SNAPSHOT",
        ]);

        assert_eq!(args.verbose, 2);
        assert!(args.json);
        match args.command {
            Commands::Resolve { coordinates } => {
                assert_eq!(
                    coordinates,
                    vec!["org.example:widget", "org.example:widget:1.0-SNAPSHOT"]
                );
            }
            _ => panic!("expected resolve"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from(["ducks", "config", "-c", "/tmp/ducks.toml", "-q"]);
        assert!(args.quiet);
        assert_eq!(args.config.as_deref(), Some("/tmp/ducks.toml"));
        assert!(matches!(args.command, Commands::Config));
    }
}
