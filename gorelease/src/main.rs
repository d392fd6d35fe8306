use std::io::Write;
use std::panic;
use std::sync::Mutex;

use axoasset::LocalAsset;
use clap::Parser;
use cli::{BuildArgs, Cli, Commands, GcsArgs, HostCommands, ManifestSchemaArgs, OutputFormat};
use console::Term;
use gorelease::{
    config::{Config, FailurePolicy, SourceFilePolicy},
    host::GcsUploader,
    Toolchain,
};
use gorelease_schema::ReleaseReport;
use lazy_static::lazy_static;
use miette::{Diagnostic, IntoDiagnostic};
use thiserror::Error;
use tracing::error;

mod cli;

type ReportErrorFunc = dyn Fn(&miette::Report) + Send + Sync + 'static;

lazy_static! {
    static ref REPORT_ERROR: Mutex<Option<Box<ReportErrorFunc>>> = Mutex::new(None);
}

fn set_report_errors_as_json() {
    *REPORT_ERROR.lock().unwrap() = Some(Box::new(move |error| {
        // Manually invoke JSONReportHandler to format the error as a report
        // to out_.
        let mut report = String::new();
        miette::JSONReportHandler::new()
            .render_report(&mut report, error.as_ref())
            .unwrap();
        writeln!(&mut Term::stdout(), r#"{{"error": {report}}}"#).unwrap();
    }));
}

fn report_error(error: &miette::Report) {
    {
        let guard = REPORT_ERROR.lock().unwrap();
        if let Some(do_report) = &*guard {
            do_report(error);
            return;
        }
    }
    error!("{:?}", error);
}

fn main() {
    let cli = Cli::parse();
    // Init the logger
    tracing_subscriber::fmt::fmt()
        .with_max_level(cli.verbose)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .with_ansi(console::colors_enabled_stderr())
        .init();

    // Control how errors are formatted by setting the miette hook. This will
    // only be used for errors presented to humans, when formatting an error as
    // JSON, it will be handled by a custom `report_error` override, bypassing
    // the hook.
    miette::set_hook(Box::new(move |_| {
        let graphical_theme = if console::colors_enabled_stderr() {
            miette::GraphicalTheme::unicode()
        } else {
            miette::GraphicalTheme::unicode_nocolor()
        };
        Box::new(
            miette::MietteHandlerOpts::new()
                .graphical_theme(graphical_theme)
                .build(),
        )
    }))
    .expect("failed to initialize error handler");

    // Now that miette is set up, use it to format panics.
    panic::set_hook(Box::new(move |panic_info| {
        let payload = panic_info.payload();
        let message = if let Some(msg) = payload.downcast_ref::<&str>() {
            msg
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            &msg[..]
        } else {
            "something went wrong"
        };

        #[derive(Debug, Error, Diagnostic)]
        #[error("{message}")]
        pub struct PanicError {
            pub message: String,
            #[help]
            pub help: Option<String>,
        }

        report_error(
            &miette::Report::from(PanicError {
                message: message.to_owned(),
                help: panic_info
                    .location()
                    .map(|loc| format!("at {}:{}:{}", loc.file(), loc.line(), loc.column())),
            })
            .wrap_err("gorelease panicked"),
        );
    }));

    // If we're outputting JSON, replace the error report method such that it
    // writes errors out to the normal output stream as JSON.
    if cli.output_format == OutputFormat::Json {
        set_report_errors_as_json();
    }

    let main_result = real_main(&cli);

    let _ = main_result.map_err(|e| {
        report_error(&e);
        std::process::exit(-1);
    });
}

fn real_main(cli: &Cli) -> Result<(), miette::Report> {
    match &cli.command {
        Commands::Build(args) => cmd_build(cli, args),
        Commands::Plan(args) => cmd_plan(cli, args),
        Commands::Release(args) => match &args.host {
            HostCommands::Gcs(args) => cmd_release_gcs(cli, args),
        },
        Commands::ManifestSchema(args) => cmd_manifest_schema(args),
    }
}

fn config_for(args: &BuildArgs) -> Config {
    Config {
        config_path: args.config.clone(),
        toolchain: Toolchain::new(&args.toolchain),
        jobs: args.jobs,
        failure_policy: if args.keep_going {
            FailurePolicy::KeepGoing
        } else {
            FailurePolicy::FailFast
        },
        file_policy: if args.inherit_file {
            SourceFilePolicy::Inherit
        } else {
            SourceFilePolicy::Require
        },
        handle_interrupts: true,
    }
}

fn print(cli: &Cli, report: &ReleaseReport) -> Result<(), miette::Report> {
    let mut out = Term::stdout();
    match cli.output_format {
        OutputFormat::Human => print_human(&mut out, report).into_diagnostic()?,
        OutputFormat::Json => print_json(&mut out, report).into_diagnostic()?,
    }
    Ok(())
}

fn print_human(out: &mut Term, report: &ReleaseReport) -> Result<(), std::io::Error> {
    write!(out, "{}", gorelease::render_human(report))?;
    Ok(())
}

fn print_json(out: &mut Term, report: &ReleaseReport) -> Result<(), std::io::Error> {
    let string = serde_json::to_string_pretty(report).unwrap();
    writeln!(out, "{string}")?;
    Ok(())
}

fn cmd_build(cli: &Cli, args: &BuildArgs) -> Result<(), miette::Report> {
    let report = gorelease::do_build(&config_for(args))?;
    print(cli, &report)
}

fn cmd_plan(cli: &Cli, args: &BuildArgs) -> Result<(), miette::Report> {
    let report = gorelease::do_plan(&config_for(args))?;
    print(cli, &report)
}

fn cmd_release_gcs(cli: &Cli, args: &GcsArgs) -> Result<(), miette::Report> {
    let uploader = GcsUploader::new(&args.bucket);
    let report = gorelease::do_release(&config_for(&args.build), &uploader)?;
    print(cli, &report)
}

fn cmd_manifest_schema(args: &ManifestSchemaArgs) -> Result<(), miette::Report> {
    let schema = ReleaseReport::json_schema();
    let json_schema = serde_json::to_string_pretty(&schema).expect("failed to stringify schema!?");

    if let Some(destination) = args.output.to_owned() {
        let contents = json_schema + "\n";
        LocalAsset::write_new_all(&contents, destination)?;
    } else {
        println!("{json_schema}");
    }
    Ok(())
}
