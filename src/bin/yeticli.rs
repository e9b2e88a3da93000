//! Yeti CLI binary.
//!
//! A command-line interface for uploading, fetching and analyzing data in Yeti.

use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use yetiapi::cli::{collect_paths, confirm_upload, parse_tags, Cli, Command};
use yetiapi::output::{upload_summary, PrettyPrint};
use yetiapi::{
    CancellationToken, FileInfo, NewObservable, ObservableApi, PollOptions, YetiApi, YetiError,
};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let api = match cli.client_config().and_then(YetiApi::with_config) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Hint: Set YETI_URL and YETI_API_KEY environment variables");
            return ExitCode::FAILURE;
        }
    };

    match run(&api, cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when the command ended without doing its job but
/// nothing went wrong (nothing to upload, user declined, hash not found).
async fn run(api: &YetiApi, cli: Cli) -> yetiapi::Result<bool> {
    match cli.command {
        Command::Addfiles {
            path,
            tags,
            recurse,
            yes,
        } => handle_addfiles(api, Path::new(&path), tags.as_deref(), recurse, yes, cli.json).await,
        Command::Getfile { hash, save } => handle_getfile(api, &hash, save.as_deref(), cli.json).await,
        Command::Match { values } => {
            let values: Vec<&str> = values.iter().map(String::as_str).collect();
            let matched = api.analysis_match(&values).await?;
            output_single(&matched, cli.json)?;
            Ok(true)
        }
        Command::Oneshot {
            analytic,
            value,
            timeout,
        } => handle_oneshot(api, &analytic, &value, timeout, cli.json).await,
    }
}

async fn handle_addfiles(
    api: &YetiApi,
    path: &Path,
    tags: Option<&str>,
    recurse: bool,
    yes: bool,
    json: bool,
) -> yetiapi::Result<bool> {
    let plan = collect_paths(path, recurse)?;
    for dir in &plan.skipped {
        eprintln!("{} is a directory. Skipping", dir.display());
    }
    if plan.files.is_empty() {
        eprintln!("Please provide a file to upload.");
        return Ok(false);
    }
    if !yes && !confirm_upload(&plan, io::stdin().lock(), io::stderr())? {
        eprintln!("Bailing.");
        return Ok(false);
    }

    let tags = parse_tags(tags);
    let context = serde_json::Map::new();
    let mut results: Vec<FileInfo> = Vec::new();
    for (i, file) in plan.files.iter().enumerate() {
        eprintln!("Uploading files [{}/{}] {}", i + 1, plan.files.len(), file.display());
        results.extend(api.observable_file_add(file, &tags, &context).await?);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        println!("{}", upload_summary(&results));
    }
    Ok(true)
}

async fn handle_getfile(
    api: &YetiApi,
    hash: &str,
    save: Option<&str>,
    json: bool,
) -> yetiapi::Result<bool> {
    let results = api.search_files_by_hash(hash).await?;
    let Some(fileinfo) = results.first() else {
        eprintln!("{hash} was not found in the database.");
        return Ok(false);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        println!("{}", fileinfo.pretty_print());
    }

    if let Some(save) = save {
        let content = api.observable_file_download(&fileinfo.id).await?;
        tokio::fs::write(save, content).await?;
        eprintln!("\nDumped file to {save}");
    }
    Ok(true)
}

async fn handle_oneshot(
    api: &YetiApi,
    analytic: &str,
    value: &str,
    timeout: u64,
    json: bool,
) -> yetiapi::Result<bool> {
    let job = api.get_analytic_oneshot(analytic).await?.ok_or_else(|| {
        YetiError::InvalidArgument(format!("no oneshot analytic named '{analytic}'"))
    })?;
    let observable = api.add_observable(&NewObservable::new(value)).await?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let options = PollOptions::default().with_timeout(Duration::from_secs(timeout));
    let results = api
        .analytics_oneshot_run_with(&job, &observable, &options, &cancel)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        println!("{}", observable.pretty_print());
        println!("\n{} results:", job.name);
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(true)
}

fn output_single<T: Serialize + PrettyPrint>(item: &T, json: bool) -> yetiapi::Result<()> {
    let mut stdout = io::stdout().lock();
    if json {
        writeln!(stdout, "{}", serde_json::to_string_pretty(item)?)?;
    } else {
        writeln!(stdout, "{}", item.pretty_print())?;
    }
    Ok(())
}
