use clap::Parser;
use miette::Result;
use metrology::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Install miette's fancy error handler for beautiful diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let global = &cli.global;
    match cli.command {
        Commands::Flatness(args) => metrology::cli::commands::flatness::run(args, global),
        Commands::AbsHeight(args) => metrology::cli::commands::abs_height::run(args, global),
        Commands::Delta(args) => metrology::cli::commands::delta::run(args, global),
        Commands::Report(args) => metrology::cli::commands::report::run(args, global),
        Commands::Completions(args) => metrology::cli::commands::completions::run(args, global),
    }
}

/// Logs go to stderr; `RUST_LOG` wins over `-v`
fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
