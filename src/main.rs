use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, warn};

use rtimg::config::{
    DEFAULT_MAX_IMPORT_DEPTH, DEFAULT_QUERY_PARAMETER, DEFAULT_TEMPLATE, ErrorPolicy,
    GeneratorConfig, ResourceLayout,
};
use rtimg::core::generator::sanitize_params;
use rtimg::element::placeholder::DEFAULT_MAX_PASSES;
use rtimg::{Generator, RenderOutcome};

#[derive(Parser, Debug)]
#[command(name = "rtimg", about = "Real-time templated image generator")]
struct Args {
    /// Template directory (`<name>.conf` files)
    #[arg(long, default_value = "templates", global = true)]
    templates: PathBuf,

    /// Resource directory (`fonts/<template>/`, `images/<template>/`)
    #[arg(long, default_value = "resources", global = true)]
    resources: PathBuf,

    /// Template used when the request names none
    #[arg(long, default_value = DEFAULT_TEMPLATE, global = true)]
    default_template: String,

    /// Query parameter selecting the template
    #[arg(long, default_value = DEFAULT_QUERY_PARAMETER, global = true)]
    query_parameter: String,

    /// Maximum nesting of template imports
    #[arg(long, default_value_t = DEFAULT_MAX_IMPORT_DEPTH, global = true)]
    max_import_depth: usize,

    /// Maximum placeholder substitution passes
    #[arg(long, default_value_t = DEFAULT_MAX_PASSES, global = true)]
    max_substitution_passes: usize,

    /// Default IANA timezone for dates
    #[arg(long, default_value = "UTC", global = true)]
    timezone: String,

    /// Element errors: report (no image) or render (partial image)
    #[arg(long, default_value = "report", global = true)]
    error_policy: String,

    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve renders over HTTP
    Serve {
        /// Listen address
        #[arg(long, default_value = "127.0.0.1:8080")]
        listen: SocketAddr,
    },
    /// Render one template to a file
    Render {
        /// Template name
        template: String,

        /// Output file, `-` for stdout (default: <template>.<format>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Placeholder value, `key=value`
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got \"{s}\""))
}

impl Args {
    fn generator_config(&self) -> Result<GeneratorConfig> {
        let default_timezone = self
            .timezone
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid timezone {}: {}", self.timezone, e))?;
        let error_policy: ErrorPolicy = self
            .error_policy
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;

        Ok(GeneratorConfig {
            template_dir: self.templates.clone(),
            resources: ResourceLayout::new(&self.resources),
            listen: match self.command {
                Command::Serve { listen } => listen,
                Command::Render { .. } => GeneratorConfig::default().listen,
            },
            default_template: self.default_template.clone(),
            query_parameter: self.query_parameter.clone(),
            max_import_depth: self.max_import_depth,
            max_substitution_passes: self.max_substitution_passes,
            default_timezone,
            error_policy,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.parse().unwrap_or_default()),
        )
        .init();

    let config = args.generator_config()?;
    info!(
        "rtimg v{} (templates: {}, resources: {})",
        env!("CARGO_PKG_VERSION"),
        config.template_dir.display(),
        config.resources.root().display()
    );

    match args.command {
        Command::Serve { listen } => {
            rtimg::server::serve(Generator::new(config), listen)
                .await
                .with_context(|| format!("HTTP server on {listen}"))?;
        }
        Command::Render {
            template,
            output,
            params,
        } => {
            let generator = Generator::new(config);
            let placeholders: HashMap<String, String> = sanitize_params(params);
            let outcome = tokio::task::spawn_blocking(move || {
                generator.render(&template, &placeholders).map(|o| (template, o))
            })
            .await
            .context("Render task failed")?;
            let (template, outcome) = outcome.context("Render failed")?;
            write_outcome(&template, outcome, output)?;
        }
    }

    info!("rtimg shutdown");
    Ok(())
}

fn write_outcome(template: &str, outcome: RenderOutcome, output: Option<PathBuf>) -> Result<()> {
    let (image, warnings) = match outcome {
        RenderOutcome::Image { image, warnings } => (image, warnings),
        RenderOutcome::Rejected { errors } => {
            for error in &errors {
                eprintln!("{error}");
            }
            anyhow::bail!("Template {} has {} element error(s)", template, errors.len());
        }
    };
    for warning in &warnings {
        warn!("{}", warning);
    }

    let extension = image.content_type.rsplit('/').next().unwrap_or("img");
    let path = output.unwrap_or_else(|| PathBuf::from(format!("{template}.{extension}")));
    if path.as_os_str() == "-" {
        std::io::stdout()
            .write_all(&image.bytes)
            .context("Failed to write image to stdout")?;
    } else {
        std::fs::write(&path, &image.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {} ({} bytes)", path.display(), image.bytes.len());
    }
    Ok(())
}
