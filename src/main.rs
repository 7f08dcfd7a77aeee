use clap::Parser;
use snapkeep::cli::{Cli, Command};
use snapkeep::config::Config;
use snapkeep::report::{self, json, table};
use snapkeep::service::BackupService;
use snapkeep::BackupError;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("SNAPKEEP_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn fail(err: &BackupError, json_output: bool) -> ! {
    if json_output {
        println!("{}", json::render_error(err));
    } else {
        eprintln!("error: {err}");
    }
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::from_cli(&cli).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });

    let service = BackupService::open(&config).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });

    match cli.command {
        Command::Create(args) => match service.create() {
            Ok(record) => report::print(&record, args.json, table::render_created),
            Err(e) => fail(&e, args.json),
        },
        Command::Restore(args) => match service.restore(&args.id) {
            Ok(outcome) => report::print(&outcome, args.output.json, table::render_restore),
            Err(e) => fail(&e, args.output.json),
        },
        Command::Cleanup(args) => {
            let result = match args.days {
                Some(days) => service.cleanup(days),
                None => service.cleanup_older_than(config.retention_cutoff(chrono::Utc::now())),
            };
            match result {
                Ok(cleanup) => report::print(&cleanup, args.output.json, table::render_cleanup),
                Err(e) => fail(&e, args.output.json),
            }
        }
        Command::List(args) => match service.list() {
            Ok(records) => report::print(&records, args.json, |r| table::render_records(r)),
            Err(e) => fail(&e, args.json),
        },
        Command::Verify(args) => match service.verify() {
            Ok(verify) => report::print(&verify, args.json, table::render_verify),
            Err(e) => fail(&e, args.json),
        },
        Command::Sync(args) => match service.sync() {
            Ok(sync) => report::print(&sync, args.json, table::render_sync),
            Err(e) => fail(&e, args.json),
        },
        Command::Forget(args) => match service.forget(&args.id) {
            Ok(outcome) => report::print(&outcome, args.output.json, table::render_forget),
            Err(e) => fail(&e, args.output.json),
        },
    }
}
