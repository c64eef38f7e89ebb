use clap::{Parser as ClapParser, Subcommand};
use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
};
use stroomql::{
    ExpressionContext,
    cli::{self, CheckOptions, CheckResult, CliError},
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(ClapParser)]
#[command(name = "stroomql")]
#[command(about = "stroomql - typed expressions with mergeable aggregates over rows of values")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and evaluate an expression
    Check {
        /// The expression to evaluate
        expression: String,

        /// Field names in slot order, comma separated
        #[arg(short, long, value_delimiter = ',')]
        fields: Vec<String>,

        /// JSON array of rows (reads from stdin if not provided)
        #[arg(short, long)]
        rows: Option<String>,

        /// Spread the rows over this many partial generators, then merge them
        #[arg(short, long, default_value_t = 1)]
        partitions: usize,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,

        /// Only validate syntax, don't evaluate
        #[arg(long)]
        syntax_only: bool,

        /// JSON file with time zone, date format and list limit settings
        #[arg(long)]
        context: Option<PathBuf>,
    },

    /// List documentation categories
    Docs,

    /// Show documentation for a specific category
    Doc {
        /// Category name (use 'stroomql docs' to list categories)
        category: String,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            expression,
            fields,
            rows,
            partitions,
            pretty,
            syntax_only,
            context,
        } => load_context(context).and_then(|context| {
            let options = CheckOptions {
                expression,
                fields,
                rows,
                partitions,
                syntax_only,
                context,
            };
            run_check(options, pretty)
        }),
        Commands::Docs => {
            print!("{}", cli::get_docs_overview());
            Ok(())
        }
        Commands::Doc { category } => cli::get_doc_category(&category).map(|content| print!("{}", content)),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn load_context(path: Option<PathBuf>) -> Result<ExpressionContext, CliError> {
    match path {
        Some(path) => Ok(serde_json::from_str(&fs::read_to_string(path)?)?),
        None => Ok(ExpressionContext::default()),
    }
}

fn run_check(mut options: CheckOptions, pretty: bool) -> Result<(), CliError> {
    if options.rows.is_none() && !options.syntax_only && !atty::is(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        if !buffer.trim().is_empty() {
            options.rows = Some(buffer);
        }
    }

    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid(canonical) => println!("Syntax is valid: {}", canonical),
        CheckResult::Success(output) => {
            let json = if pretty {
                serde_json::to_string_pretty(&output)
            } else {
                serde_json::to_string(&output)
            }?;
            println!("{}", json);
        }
    }
    Ok(())
}
