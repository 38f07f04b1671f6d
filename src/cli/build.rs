//! Build command implementations (build, dev)

use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_SUCCESS};
use crate::build::{BuildContext, BuildPipeline, BuildResult};
use crate::server::{start_dev_server, LiveReload};

/// Run the build command
///
/// Compile failures are reported but do not change the exit code; only
/// fatal errors exit non-zero.
pub fn run_build(context: BuildContext) -> ExitCode {
    println!("Building ({})...", context.mode());
    let pipeline = BuildPipeline::new(context);

    match pipeline.full_build() {
        Ok(result) => {
            report(&result);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Build error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Run the dev command: full build, dev server, then watch until killed.
pub fn run_dev(context: BuildContext) -> ExitCode {
    println!("Building ({})...", context.mode());
    let pipeline = BuildPipeline::new(context);

    match pipeline.full_build() {
        Ok(result) => report(&result),
        Err(e) => {
            eprintln!("Build error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let ctx = pipeline.context();
    let reload = LiveReload::new();
    let bind_addr = ctx.config().server.bind_addr();

    let server = match runtime.block_on(start_dev_server(ctx.out_dir(), &bind_addr, reload.clone()))
    {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    println!("Serving {} at {}", ctx.out_dir().display(), ctx.config().server.dev_base_url());
    println!("Press Ctrl+C to stop");
    println!();

    // Server tasks run on the runtime's worker threads; this thread watches.
    let code = match crate::watch::watch(&pipeline, &reload) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Watch error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    };

    server.handle.abort();
    code
}

fn report(result: &BuildResult) {
    if result.is_success() {
        println!("{}", result.summary());
    } else {
        eprintln!("{}", result.summary());
    }
}
