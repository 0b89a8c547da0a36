use appbundler::cli::CliArgs;
use appbundler::pipeline::{ActionKind, Orchestrator, Platform, SelectionPolicy};
use appbundler::util::logging::{init_logging, LoggingConfig};
use appbundler::{BuildContext, BundleProfile, ConfigError, ToolConfig, Toolbox, VERSION};

use clap::Parser;
use std::process;
use tracing::{debug, error, info, warn};

const EXIT_FAILURE: i32 = 1;
const EXIT_CONFIG: i32 = 2;

fn main() {
    let args = CliArgs::parse();
    init_logging(LoggingConfig::resolve(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));

    debug!("appbundler v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    process::exit(run(&args));
}

fn load_profile(args: &CliArgs) -> Result<BundleProfile, ConfigError> {
    match &args.profile {
        Some(path) => BundleProfile::from_file(path),
        None => BundleProfile::builtin(),
    }
}

fn print_plan(orchestrator: &Orchestrator, args: &CliArgs) {
    let selection = SelectionPolicy::new(args.skip.clone(), args.only.clone());
    let plan = orchestrator.plan_with(
        !args.codesign.trim().is_empty(),
        args.seeded_config.is_some(),
    );
    for action in plan {
        if selection.should_run(action.name()) {
            println!("{}", action);
        } else {
            println!("{} (skipped)", action);
        }
    }
}

fn run(args: &CliArgs) -> i32 {
    let profile = match load_profile(args) {
        Ok(profile) => profile,
        Err(e) => {
            error!("{}", e);
            return EXIT_CONFIG;
        }
    };

    let platform = Platform::current();
    let orchestrator = Orchestrator::new(platform, Toolbox::system(ToolConfig::default()));

    if args.list_actions {
        print_plan(&orchestrator, args);
        return 0;
    }

    let build = match BuildContext::from_args(args) {
        Ok(build) => build,
        Err(e) => {
            error!("{}", e);
            return EXIT_CONFIG;
        }
    };

    let known = ActionKind::names();
    for name in build.selection.unknown_names(&known) {
        warn!(action = name, "Unknown action name in --skip/--do, it will have no effect");
    }

    info!(
        platform = %platform,
        product = %profile.product.name,
        repositories = profile.repositories.len(),
        "Building bundle"
    );

    match orchestrator.execute(build, profile) {
        Ok(outcome) => {
            match outcome.artifact {
                Some(artifact) => println!("{}", artifact.display()),
                None => info!("Packaging was not selected, no artifact produced"),
            }
            0
        }
        Err(e) => {
            match e.action() {
                Some(action) => error!(action, "Build failed: {}", e),
                None => error!("Build failed: {}", e),
            }
            EXIT_FAILURE
        }
    }
}
