//! ts-transformer: TypeScript transformer for Metro with composed source maps.

mod cli;

use clap::Parser;
use cli::{Args, LogFormat, OutputFormat};
use metro_runner::MetroTransformer;
use miette::{miette, IntoDiagnostic, Result, WrapErr};
use node_runner::{NodeError, NodeRunner};
use ts_transformer::{Pipeline, TransformArgs};
use tsc_runner::NodeTranspiler;
use tsconfig::TsConfigResolver;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const FALLBACK_FILTER: &str =
    "ts_transformer=info,tsconfig=warn,tsc_runner=info,metro_runner=info,node_runner=warn";

fn initialize_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| FALLBACK_FILTER.into());

    match format {
        LogFormat::Json => {
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true);
            tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .init();
        }
        LogFormat::Text => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    initialize_tracing(args.log_format);

    let project_root = args
        .project_root
        .canonicalize_utf8()
        .into_diagnostic()
        .wrap_err_with(|| format!("invalid project root: {}", args.project_root))?;

    let mut resolver = TsConfigResolver::from_env(project_root.clone());
    if let Some(path) = &args.tsconfig {
        resolver = resolver.with_override(path.clone());
    }
    let config = resolver.resolve().into_diagnostic()?;
    tracing::debug!(path = %config.path, "resolved tsconfig");

    let node = NodeRunner::find_node(Some(&project_root))
        .ok_or(NodeError::NotFound)
        .into_diagnostic()?;
    match NodeRunner::get_node_version(&node).await {
        Ok(version) => tracing::debug!(%node, %version, "using node"),
        Err(e) => tracing::warn!(%node, "could not read node version: {e}"),
    }
    let transpiler = NodeTranspiler::spawn(&node, &project_root)
        .await
        .into_diagnostic()?;
    let transformer = MetroTransformer::spawn(&node, &project_root)
        .await
        .into_diagnostic()?;
    let pipeline = Pipeline::new(config.compiler_options.clone(), transpiler, transformer);

    if args.print_cache_key {
        println!("{}", pipeline.cache_key(&config));
        return Ok(());
    }

    let file = args
        .file
        .as_ref()
        .ok_or_else(|| miette!("no input file"))?;
    let src = std::fs::read_to_string(file)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {file}"))?;
    let options = args
        .transform_options()
        .into_diagnostic()
        .wrap_err("--options must be a JSON object")?;

    let result = pipeline
        .transform(TransformArgs::new(src, file.as_str(), options))
        .await
        .into_diagnostic()?;

    match args.output {
        OutputFormat::Code => {
            let code = result
                .code()
                .ok_or_else(|| miette!("the upstream transformer returned no code"))?;
            print!("{code}");
        }
        OutputFormat::Map => {
            let map = result
                .map
                .as_ref()
                .ok_or_else(|| miette!("no separate source map: positions live in the ast"))?;
            println!("{}", serde_json::to_string_pretty(map).into_diagnostic()?);
        }
        OutputFormat::Json => {
            let value = result.into_value().into_diagnostic()?;
            println!("{}", serde_json::to_string_pretty(&value).into_diagnostic()?);
        }
    }

    Ok(())
}
