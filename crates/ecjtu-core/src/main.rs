use std::io;
use std::process::ExitCode;

use ecjtu_core::boundary::{install_panic_hook, run_guarded};
use ecjtu_core::cli::{self, Context};
use ecjtu_core::config::Config;
use ecjtu_core::session::LogSession;
use ecjtu_core::signals::InterruptFlag;
use ecjtu_storage::StorageResolver;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{}", cli::USAGE);
        return ExitCode::SUCCESS;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("ecjtu {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let command = match cli::parse_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("hint: run `ecjtu --help` for usage");
            return ExitCode::from(2);
        }
    };

    let resolver = match StorageResolver::from_env() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let config = Config::load_or_default(&resolver);

    let session = match LogSession::init_process(&resolver, &config.logging) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: failed to open log: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Everything below reports unhandled failures through the log first.
    install_panic_hook(session);

    let interrupt = match InterruptFlag::register() {
        Ok(flag) => flag,
        Err(e) => {
            eprintln!("warning: failed to install signal handlers: {e}");
            InterruptFlag::new()
        }
    };

    let ctx = Context {
        resolver: &resolver,
        session,
        interrupt: &interrupt,
    };

    run_guarded(session, || {
        cli::execute(&command, &ctx, io::stdin().lock(), io::stdout().lock())
    })
}
