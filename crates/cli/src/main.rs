mod cli;
mod output;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use qrun_athena::{
    account_id, load_aws_config, with_deadline, AthenaClient, BatchRunner, ExecutorConfig,
    QueryExecutor,
};
use qrun_core::config::load_dotenv;
use qrun_core::{env_vars, render_queries, PathContext, RunConfig, TemplateRenderer};
use qrun_storage::{BlobStore, S3Backend};

use crate::cli::{deadline_after, CliArgs};
use crate::output::{OutputTarget, ResultSink};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries query results.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    // Env first, then flags
    load_dotenv();
    let mut config = RunConfig::from_env().context("failed to load configuration")?;
    args.apply(&mut config);
    config.log_summary();

    let deadline = deadline_after(config.timeout)?;

    // First Ctrl-C abandons the run like a deadline does, a second one exits
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received");
            on_signal.cancel();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    let input = with_deadline(deadline, &cancel, read_input(args.file.as_deref())).await??;
    let queries = render_queries(&input, &env_vars()).context("could not read queries")?;
    info!(count = queries.len(), "queries loaded");

    if args.dry {
        debug!(config = %serde_json::to_string(&config)?, "dry run");
        for query in &queries {
            println!("execute query: {query}");
        }
        return Ok(());
    }

    let target = OutputTarget::parse(&args.out).context("invalid --out")?;

    // Resolve the result location and make sure its bucket exists
    let sdk_config = with_deadline(deadline, &cancel, load_aws_config(&config.region))
        .await
        .context("could not load aws config")?;
    let renderer = TemplateRenderer::new();
    let account = if renderer.references(&config.temp_path_template, "account")? {
        let account = with_deadline(deadline, &cancel, account_id(&sdk_config))
            .await?
            .context("could not initialize aws client")?;
        Some(account)
    } else {
        None
    };
    let temp_path = renderer
        .render_path(
            &config.temp_path_template,
            &PathContext::now(account, config.region.clone()),
        )
        .context("could not render temp path")?;
    info!(temp_path = %temp_path, "using result location");

    let store = BlobStore::new(S3Backend::from_sdk_config(&sdk_config));
    with_deadline(deadline, &cancel, store.ensure_namespace(&temp_path))
        .await?
        .with_context(|| format!("could not prepare result location {temp_path}"))?;

    let client = AthenaClient::new(&sdk_config)
        .with_database(config.database.clone())
        .with_workgroup(config.workgroup.clone());
    let executor = QueryExecutor::new(
        client,
        store,
        ExecutorConfig::from_run_config(&config, temp_path).with_fetch_result(target.fetches()),
    );

    let mut sink = ResultSink::new(target, std::io::stdout());
    let done = BatchRunner::new(&executor)
        .run(&queries, deadline, &cancel, |_, data| sink.accept(data))
        .await
        .context("could not execute athena query")?;

    let written = with_deadline(deadline, &cancel, sink.finish(executor.accessor()))
        .await
        .and_then(|written| written)
        .context("could not write result")?;
    if let Some(bytes) = written {
        info!(bytes, "result written");
    }

    info!(queries = done, "all queries finished");
    Ok(())
}

/// Read the whole query input from `file`, or stdin when none is given.
async fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("could not open input file {}", path.display())),
        None => {
            let mut input = String::new();
            tokio::io::stdin()
                .read_to_string(&mut input)
                .await
                .context("could not read input")?;
            Ok(input)
        }
    }
}
