use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bundle_assets::inject::inject_file;
use bundle_assets::{BundleResolver, ResolverConfig};

#[derive(Parser)]
#[command(name = "bundle-assets", version, about = "Resolve and publish declarative asset bundles")]
struct Cli {
  #[command(flatten)]
  options: ResolverOptions,

  #[command(subcommand)]
  command: Command,
}

#[derive(Args)]
struct ResolverOptions {
  /// Configuration file; defaults to bundle_assets.config.json in the working directory.
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Environment used to select descriptor overrides.
  #[arg(long, global = true)]
  env: Option<String>,

  /// Extra alias as NAME=VALUE, applied after the configured ones.
  #[arg(long = "alias", value_name = "NAME=VALUE", global = true)]
  aliases: Vec<String>,
}

#[derive(Subcommand)]
enum Command {
  /// Print head and body markup for one or more bundles.
  Resolve {
    /// Bundle identifiers, e.g. @app/bundles/site.
    #[arg(required = true)]
    bundles: Vec<String>,

    /// Print every resolved bundle as JSON instead of merged markup.
    #[arg(long)]
    json: bool,
  },
  /// Insert bundle markup into an HTML page in place.
  Inject {
    /// HTML file to rewrite.
    page: PathBuf,

    /// Bundle identifiers.
    #[arg(required = true)]
    bundles: Vec<String>,
  },
  /// Resolve a bundle and print where it was published.
  Publish {
    /// Bundle identifier.
    bundle: String,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let mut resolver = build_resolver(&cli.options)?;

  match cli.command {
    Command::Resolve { bundles, json } => {
      if json {
        let mut resolved = serde_json::Map::new();
        for bundle in &bundles {
          let result = resolver
            .resolve(bundle)
            .with_context(|| format!("failed to resolve {bundle}"))?;
          resolved.insert(bundle.clone(), serde_json::to_value(&*result)?);
        }
        println!("{}", serde_json::to_string_pretty(&resolved)?);
      } else {
        let page = resolver
          .resolve_page(&bundles)
          .context("failed to resolve bundles")?;
        println!("{}", page.head);
        println!("{}", page.body);
      }
    }
    Command::Inject { page, bundles } => {
      let markup = resolver
        .resolve_page(&bundles)
        .context("failed to resolve bundles")?;
      inject_file(&page, &markup)
        .with_context(|| format!("failed to inject markup into {}", page.display()))?;
    }
    Command::Publish { bundle } => {
      resolver
        .resolve(&bundle)
        .with_context(|| format!("failed to resolve {bundle}"))?;
      if !resolver.is_published(&bundle) {
        println!("{bundle} is not published: it declares no sourcePath");
        return Ok(());
      }
      let location = resolver
        .location(&bundle)
        .ok_or_else(|| anyhow!("no location recorded for {bundle}"))?;
      println!("{}\t{}", location.base_path, location.base_url);
    }
  }

  Ok(())
}

fn build_resolver(options: &ResolverOptions) -> Result<BundleResolver> {
  let mut config = match &options.config {
    Some(path) => ResolverConfig::from_path(path)
      .with_context(|| format!("failed to load configuration from {}", path.display()))?,
    None => {
      let cwd = std::env::current_dir().context("failed to read working directory")?;
      ResolverConfig::discover(&cwd)
    }
  };

  for alias in &options.aliases {
    let (name, value) = alias
      .split_once('=')
      .ok_or_else(|| anyhow!("alias `{alias}` must look like NAME=VALUE"))?;
    config.aliases.insert(name.to_string(), value.to_string());
  }

  if let Some(env) = &options.env {
    config.environment = Some(env.clone());
  }

  BundleResolver::from_config(config).context("invalid alias configuration")
}
