use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use promptwright::cli::{self, benchmark::BenchmarkArgs, build::BuildArgs, Workspace};

#[derive(Parser)]
#[command(name = "promptwright", version)]
#[command(about = "Analyze, compare, customize and benchmark prompt templates", long_about = None)]
struct Cli {
    /// Path to config file (defaults to ./promptwright.toml or ~/.config/promptwright/config.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Corpus root directory (overrides the config)
    #[arg(long, global = true)]
    corpus: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List templates in the corpus
    List {
        /// Only show one provider
        #[arg(long)]
        provider: Option<String>,
    },

    /// Extract capabilities, safety measures and pattern from a template
    Analyze {
        /// Template as provider/model
        identity: Option<String>,

        /// Read the template from a file instead of the corpus
        #[arg(long)]
        file: Option<String>,

        /// Compare line by line against this file
        #[arg(long)]
        baseline: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Show the role, capability, constraint and tone regions of a template
    Regions {
        identity: Option<String>,

        #[arg(long)]
        file: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Compare templates (all of the corpus when none are given)
    Compare {
        identities: Vec<String>,

        /// Report format: markdown or json
        #[arg(long, default_value = "markdown")]
        format: String,

        #[arg(short = 'o', long)]
        output: Option<String>,
    },

    /// Rank templates that cover the required capabilities
    Suggest {
        /// Required capability tag (repeatable or comma-separated)
        #[arg(short = 'c', long = "capability", required = true)]
        capabilities: Vec<String>,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Suggest base templates for a free-text use case
    SuggestTemplate {
        use_case: String,

        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Customize a base template while preserving its structure
    Build(BuildArgs),

    /// Export a template as raw text or a provider request shape
    Install {
        identity: Option<String>,

        #[arg(long)]
        file: Option<String>,

        /// raw, json, openai or anthropic
        #[arg(long, default_value = "raw")]
        format: String,

        #[arg(short = 'o', long)]
        output: Option<String>,

        /// Write <provider>_<model>.<ext> into this directory
        #[arg(long, conflicts_with = "output")]
        dir: Option<String>,
    },

    /// Measure rejection rates across abstraction levels
    Benchmark(BenchmarkArgs),

    /// Check template files for prohibited terms and missing metadata
    Validate {
        /// Single file to validate
        #[arg(short = 'f', long)]
        file: Option<String>,

        /// Directory to validate recursively (default: the corpus root)
        #[arg(short = 'd', long, conflicts_with = "file")]
        directory: Option<String>,

        /// Write the markdown report here instead of stdout
        #[arg(short = 'o', long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let workspace = Workspace::open(cli.config, cli.corpus)?;

    match cli.command {
        Commands::List { provider } => cli::list::run(&workspace, provider)?,
        Commands::Analyze {
            identity,
            file,
            baseline,
            json,
        } => cli::analyze::run(&workspace, identity, file, baseline, json)?,
        Commands::Regions {
            identity,
            file,
            json,
        } => cli::regions::run(&workspace, identity, file, json)?,
        Commands::Compare {
            identities,
            format,
            output,
        } => cli::compare::run(&workspace, identities, format, output)?,
        Commands::Suggest {
            capabilities,
            limit,
        } => cli::suggest::run(&workspace, capabilities, limit)?,
        Commands::SuggestTemplate { use_case, limit } => {
            cli::suggest::run_for_use_case(&workspace, use_case, limit)?
        }
        Commands::Build(args) => cli::build::run(&workspace, args)?,
        Commands::Install {
            identity,
            file,
            format,
            output,
            dir,
        } => cli::install::run(&workspace, identity, file, format, output, dir)?,
        Commands::Benchmark(args) => cli::benchmark::run(workspace, args).await?,
        Commands::Validate {
            file,
            directory,
            output,
        } => cli::validate::run(&workspace, file, directory, output)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_list_with_globals() {
        let cli = Cli::try_parse_from([
            "promptwright",
            "list",
            "--corpus",
            "/tmp/corpus",
            "--config",
            "pw.toml",
        ])
        .unwrap();
        assert_eq!(cli.corpus.as_deref(), Some("/tmp/corpus"));
        assert_eq!(cli.config.as_deref(), Some("pw.toml"));
        assert!(matches!(cli.command, Commands::List { provider: None }));
    }

    #[test]
    fn test_parse_compare_defaults() {
        let cli = Cli::try_parse_from(["promptwright", "compare", "openai/gpt-4", "anthropic/claude"])
            .unwrap();
        match cli.command {
            Commands::Compare {
                identities,
                format,
                output,
            } => {
                assert_eq!(identities, vec!["openai/gpt-4", "anthropic/claude"]);
                assert_eq!(format, "markdown");
                assert!(output.is_none());
            }
            _ => panic!("expected compare"),
        }
    }

    #[test]
    fn test_parse_suggest_requires_capability() {
        assert!(Cli::try_parse_from(["promptwright", "suggest"]).is_err());
        let cli = Cli::try_parse_from(["promptwright", "suggest", "-c", "code", "-c", "math"])
            .unwrap();
        match cli.command {
            Commands::Suggest {
                capabilities,
                limit,
            } => {
                assert_eq!(capabilities, vec!["code", "math"]);
                assert_eq!(limit, 10);
            }
            _ => panic!("expected suggest"),
        }
    }

    #[test]
    fn test_parse_build_with_repeated_flags() {
        let cli = Cli::try_parse_from([
            "promptwright",
            "build",
            "--base",
            "openai/gpt-4o",
            "--tone",
            "friendly",
            "--constraint",
            "Be brief",
            "--constraint",
            "Cite sources",
            "--preview",
        ])
        .unwrap();
        match cli.command {
            Commands::Build(args) => {
                assert_eq!(args.base.as_deref(), Some("openai/gpt-4o"));
                assert_eq!(args.constraints.len(), 2);
                assert!(args.preview);
                assert!(args.output.is_none());
            }
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn test_parse_install_output_conflicts_with_dir() {
        assert!(Cli::try_parse_from([
            "promptwright",
            "install",
            "openai/gpt-4o",
            "-o",
            "a.json",
            "--dir",
            "out",
        ])
        .is_err());
    }

    #[test]
    fn test_parse_benchmark() {
        let cli = Cli::try_parse_from([
            "promptwright",
            "benchmark",
            "openai/gpt-4o",
            "--phrase",
            "Explain tides",
            "--levels",
            "3",
            "--policy",
            "cascade",
            "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Commands::Benchmark(args) => {
                assert_eq!(args.identity.as_deref(), Some("openai/gpt-4o"));
                assert_eq!(args.phrases, vec!["Explain tides"]);
                assert_eq!(args.levels, Some(3));
                assert_eq!(args.policy.as_deref(), Some("cascade"));
                assert_eq!(args.format, "markdown");
                assert!(args.dry_run);
            }
            _ => panic!("expected benchmark"),
        }
    }

    #[test]
    fn test_parse_suggest_template() {
        let cli =
            Cli::try_parse_from(["promptwright", "suggest-template", "coding tutor"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::SuggestTemplate { ref use_case, limit: 5 } if use_case == "coding tutor"
        ));
    }

    #[test]
    fn test_parse_validate() {
        let cli = Cli::try_parse_from(["promptwright", "validate", "-d", "collections", "-o", "r.md"])
            .unwrap();
        match cli.command {
            Commands::Validate {
                file,
                directory,
                output,
            } => {
                assert!(file.is_none());
                assert_eq!(directory.as_deref(), Some("collections"));
                assert_eq!(output.as_deref(), Some("r.md"));
            }
            _ => panic!("expected validate"),
        }
        assert!(
            Cli::try_parse_from(["promptwright", "validate", "-f", "a.md", "-d", "dir"]).is_err()
        );
    }
}
