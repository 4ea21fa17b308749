//! Project creation: resolve releases, download, lay out the project
//! directory and install its dependencies.

use anyhow::{Context, Result, bail};
use futures_util::future::try_join;
use log::info;
use std::path::{Component, Path, PathBuf};

use crate::{
    archive::{ArchiveExtractor, ArchiveExtractorImpl},
    config::Config,
    download::download_file,
    error::ScaffoldError,
    http::HttpClient,
    provider::{GitHubProvider, Provider, RepoId},
    resolver::ReleaseResolver,
    runtime::Runtime,
};

pub const DEFAULT_TEMPLATE_REPO: &str = "scaffold-rs/template";
pub const DEFAULT_INSTALL_COMMAND: &str = "npm install";

/// Mode applied to every regular file unpacked under `bin/`.
const EXECUTABLE_MODE: u32 = 0o755;
const SOURCE_ARCHIVE_NAME: &str = "source.tar.gz";
const BIN_DIR_NAME: &str = "bin";

#[derive(Debug, Clone)]
pub struct ScaffoldOptions {
    /// Project directory name. Prompted for when `None`.
    pub name: Option<String>,
    pub template: RepoId,
    pub bundle: RepoId,
    pub asset: String,
    /// Dependency install command; `None` skips the step.
    pub install_command: Option<String>,
}

pub struct Scaffolder<R: Runtime, P: Provider, E: ArchiveExtractor> {
    runtime: R,
    resolver: ReleaseResolver<P>,
    http_client: HttpClient,
    extractor: E,
}

impl<R: Runtime + 'static> Scaffolder<R, GitHubProvider, ArchiveExtractorImpl> {
    pub fn from_config(config: Config<R, GitHubProvider, ArchiveExtractorImpl>) -> Self {
        Self::new(
            config.runtime,
            config.provider,
            config.http_client,
            config.extractor,
        )
    }
}

impl<R: Runtime + 'static, P: Provider, E: ArchiveExtractor> Scaffolder<R, P, E> {
    pub fn new(runtime: R, provider: P, http_client: HttpClient, extractor: E) -> Self {
        Self {
            runtime,
            resolver: ReleaseResolver::new(provider),
            http_client,
            extractor,
        }
    }

    /// Create the project under the current directory and return its path.
    ///
    /// Both archives are downloaded into `scratch_dir` before the project
    /// directory is created, so a failed download leaves nothing behind.
    #[tracing::instrument(skip(self, options))]
    pub async fn scaffold(&self, options: &ScaffoldOptions, scratch_dir: &Path) -> Result<PathBuf> {
        let name = self.project_name(options.name.as_deref())?;
        let target = self.runtime.current_dir()?.join(&name);
        if self.runtime.exists(&target) {
            return Err(ScaffoldError::DirectoryExists(target).into());
        }

        let source_archive = scratch_dir.join(SOURCE_ARCHIVE_NAME);
        let bundle_archive = scratch_dir.join(bundle_file_name(&options.asset));
        if !self.extractor.can_handle(&bundle_archive) {
            bail!("Unsupported archive format for asset '{}'", options.asset);
        }

        println!("   resolving {}", options.template);
        let tag = self.resolver.get_latest_tag(&options.template).await?;
        println!("   resolving {} ({})", options.bundle, options.asset);
        let bundle = self
            .resolver
            .latest_release_with_asset(&options.bundle, &options.asset)
            .await?;
        let bundle_tag = bundle.release.tag.as_deref().unwrap_or("untagged");
        info!(
            "Using {} {} with bundle {} {}",
            options.template, tag, options.bundle, bundle_tag
        );

        let source_url = self.resolver.provider().tarball_url(&options.template, &tag);
        println!(" downloading {} {}", options.template, tag);
        println!(" downloading {} {}", options.asset, bundle_tag);
        try_join(
            download_file(&self.runtime, &source_url, &source_archive, &self.http_client),
            download_file(
                &self.runtime,
                &bundle.asset_url,
                &bundle_archive,
                &self.http_client,
            ),
        )
        .await?;

        self.create_target(&target)?;
        println!("  extracting into {}", target.display());
        self.extractor
            .extract(&self.runtime, &source_archive, &target, true)
            .context("Failed to extract the source template")?;

        let bin_dir = target.join(BIN_DIR_NAME);
        self.runtime.create_dir_all(&bin_dir)?;
        self.extractor
            .extract(&self.runtime, &bundle_archive, &bin_dir, false)
            .context("Failed to extract the binary bundle")?;

        let count = make_executable(&self.runtime, &bin_dir)?;
        info!("Marked {} files under {:?} executable", count, bin_dir);

        if let Some(command) = &options.install_command {
            println!("  installing dependencies ({})", command);
            self.run_install(command, &target).await?;
        }

        print_success(&name, &target, &options.template, &tag, bundle_tag);
        Ok(target)
    }

    fn project_name(&self, name: Option<&str>) -> Result<String> {
        let name = match name {
            Some(name) => name.trim().to_string(),
            None => self.runtime.prompt("Project name:")?,
        };
        if name.is_empty() {
            bail!("Project name must not be empty");
        }
        // Exactly one plain component, so the project lands in the current directory
        let mut components = Path::new(&name).components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            bail!(
                "Invalid project name '{}': expected a single directory name",
                name
            );
        }
        Ok(name)
    }

    fn create_target(&self, target: &Path) -> Result<()> {
        self.runtime.create_dir(target).map_err(|e| {
            if self.runtime.exists(target) {
                ScaffoldError::DirectoryExists(target.to_path_buf()).into()
            } else {
                e.context(format!("Failed to create project directory {:?}", target))
            }
        })
    }

    async fn run_install(&self, command: &str, cwd: &Path) -> Result<()> {
        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            bail!("Install command is empty");
        };
        let args: Vec<String> = parts.map(str::to_string).collect();

        match self.runtime.run_command(program, &args, cwd).await? {
            Some(0) => Ok(()),
            exit_code => Err(ScaffoldError::Subprocess { exit_code }.into()),
        }
    }
}

/// Scratch file name for the bundle, keeping the asset's extension so the
/// extractor can recognise it.
fn bundle_file_name(asset: &str) -> String {
    let name = Path::new(asset)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("bundle-{}", name)
}

/// Set [`EXECUTABLE_MODE`] on every regular file below `dir`.
#[cfg(unix)]
fn make_executable<R: Runtime>(runtime: &R, dir: &Path) -> Result<usize> {
    let mut count = 0;
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        for path in runtime.read_dir(&current)? {
            if runtime.is_symlink(&path) {
                continue;
            }
            if runtime.is_dir(&path) {
                pending.push(path);
            } else {
                runtime
                    .set_permissions(&path, EXECUTABLE_MODE)
                    .with_context(|| format!("Failed to make {:?} executable", path))?;
                count += 1;
            }
        }
    }

    Ok(count)
}

#[cfg(not(unix))]
fn make_executable<R: Runtime>(_runtime: &R, _dir: &Path) -> Result<usize> {
    Ok(0)
}

fn print_success(name: &str, target: &Path, template: &RepoId, tag: &str, bundle_tag: &str) {
    println!();
    println!("Created {} at {}", name, target.display());
    println!("  template: {} {}", template, tag);
    println!("  binaries: {}/ ({})", BIN_DIR_NAME, bundle_tag);
    println!();
    println!("Next steps:");
    println!("  cd {}", name);
}

/// Build the collaborators, run the pipeline in a fresh scratch directory
/// and drop that directory afterwards.
pub async fn run<R: Runtime + 'static>(
    runtime: R,
    options: ScaffoldOptions,
    api_url: Option<String>,
) -> Result<PathBuf> {
    let config = Config::new(runtime, api_url)?;
    let scratch = tempfile::Builder::new()
        .prefix("scaffold-")
        .tempdir()
        .context("Failed to create a temporary directory")?;

    Scaffolder::from_config(config)
        .scaffold(&options, scratch.path())
        .await
}
