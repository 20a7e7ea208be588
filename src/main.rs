use clap::Parser;
use miette::Result;
use tracing_subscriber::EnvFilter;
use wkshop::cli::commands::{
    backup, check, completions, config, init, item, material, report, task,
};
use wkshop::cli::{Cli, Commands, GlobalOpts};

fn main() -> Result<()> {
    // Terminate silently on a closed pipe (`wkshop item list | head`)
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
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
    let global = cli.global;
    init_logging(&global);

    match cli.command {
        Commands::Init(args) => init::run(args),
        Commands::Item(cmd) => item::run(cmd, &global),
        Commands::Mat(cmd) => material::run_mat(cmd, &global),
        Commands::Wmat(cmd) => material::run_wmat(cmd, &global),
        Commands::Step(cmd) => material::run_step(cmd, &global),
        Commands::Task(cmd) => task::run(cmd, &global),
        Commands::Backup(cmd) => backup::run(cmd, &global),
        Commands::Check(args) => check::run_check(args, &global),
        Commands::Renumber(args) => check::run_renumber(args, &global),
        Commands::Report(cmd) => report::run(cmd, &global),
        Commands::Config(cmd) => config::run(cmd, &global),
        Commands::Completions(args) => completions::run(args),
    }
}

/// Diagnostics go to stderr; `WKSHOP_LOG` overrides the level picked from -v/-q
fn init_logging(global: &GlobalOpts) {
    let level = if global.verbose {
        "debug"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_env("WKSHOP_LOG").unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
