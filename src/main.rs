use anyhow::Result;
use clap::Parser;
use scaffold::platform::Platform;
use scaffold::provider::RepoId;
use scaffold::scaffold::{DEFAULT_INSTALL_COMMAND, DEFAULT_TEMPLATE_REPO, ScaffoldOptions, run};

/// scaffold - create a project from a release template
///
/// Downloads the latest source template and the matching pre-built binary
/// bundle, lays them out in a new directory and installs dependencies.
///
/// If the GITHUB_TOKEN environment variable is set, it will be used for authentication.
/// This is useful for accessing private repositories or avoiding rate limits.
///
/// Examples:
///   scaffold my-app                   # Create ./my-app
///   scaffold my-app --skip-install    # Create ./my-app without installing dependencies
#[derive(Parser, Debug)]
#[command(author, version = env!("SCAFFOLD_VERSION"), about)]
struct Cli {
    /// Name of the project directory to create (prompted for when omitted)
    #[arg(value_name = "NAME")]
    name: Option<String>,

    /// Repository holding the source template
    #[arg(
        long = "template",
        value_name = "OWNER/REPO",
        env = "SCAFFOLD_TEMPLATE_REPO",
        default_value = DEFAULT_TEMPLATE_REPO
    )]
    template: RepoId,

    /// Repository publishing the binary bundle (defaults to the template repository)
    #[arg(long = "bundle", value_name = "OWNER/REPO", env = "SCAFFOLD_BUNDLE_REPO")]
    bundle: Option<RepoId>,

    /// Bundle asset name (defaults to bin-{os}-{arch}.zip for this platform)
    #[arg(long = "asset", value_name = "NAME", env = "SCAFFOLD_ASSET")]
    asset: Option<String>,

    /// GitHub API URL (defaults to https://api.github.com)
    #[arg(long = "api-url", value_name = "URL", env = "SCAFFOLD_API_URL")]
    api_url: Option<String>,

    /// Command run inside the new project to install dependencies
    #[arg(long = "install-command", value_name = "CMD", default_value = DEFAULT_INSTALL_COMMAND)]
    install_command: String,

    /// Do not run the install command
    #[arg(long = "skip-install")]
    skip_install: bool,
}

impl Cli {
    fn into_options(self) -> (ScaffoldOptions, Option<String>) {
        let bundle = self.bundle.unwrap_or_else(|| self.template.clone());
        let asset = self
            .asset
            .unwrap_or_else(|| Platform::detect().bundle_asset_name());
        let install_command = (!self.skip_install).then_some(self.install_command);

        let options = ScaffoldOptions {
            name: self.name,
            template: self.template,
            bundle,
            asset,
            install_command,
        };
        (options, self.api_url)
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if let Err(e) = execute(cli).await {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let (options, api_url) = cli.into_options();
    run(scaffold::runtime::RealRuntime, options, api_url).await?;
    Ok(())
}
