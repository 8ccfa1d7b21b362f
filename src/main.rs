mod cli;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use tokio_util::sync::CancellationToken;

use sb_av::{ToolRegistry, TranscodeProfile};
use sb_core::catalog::{number_entries, sort_entries};
use sb_core::config::Config;
use sb_core::{credentials, Credentials, SortKey, SortOrder};
use sb_media::ScanOptions;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "streambox=debug,sb_core=debug,sb_av=debug,sb_media=debug,sb_server=debug,tower_http=debug"
                .to_string()
        } else {
            "streambox=info,sb_core=info,sb_av=info,sb_media=info,sb_server=info,tower_http=info"
                .to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Serve {
            dir,
            recursive,
            port,
            host,
            public_host,
            auth,
            sort,
            order,
            probe,
        } => {
            let mut config = Config::load_or_default(cli.config.as_deref())?;
            if let Some(dir) = dir {
                config.catalog.root = Some(expand(&dir));
            }
            config.catalog.recursive |= recursive;
            config.catalog.probe_durations |= probe;
            config.auth.enabled |= auth;
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            if public_host.is_some() {
                config.server.public_host = public_host;
            }
            if let Some(sort) = sort.as_deref() {
                config.catalog.sort = SortKey::parse_lenient(sort);
            }
            if let Some(order) = order.as_deref() {
                config.catalog.order = SortOrder::parse_lenient(order);
            }

            tracing::info!(
                "Starting streambox on {}:{}",
                config.server.host,
                config.server.port
            );
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(sb_server::start(config))?;
            Ok(())
        }
        Commands::Scan {
            dir,
            recursive,
            sort,
            order,
            probe,
            json,
        } => {
            let config = Config::load_or_default(cli.config.as_deref())?;
            let sort = sort
                .as_deref()
                .map(SortKey::parse_lenient)
                .unwrap_or(config.catalog.sort);
            let order = order
                .as_deref()
                .map(SortOrder::parse_lenient)
                .unwrap_or(config.catalog.order);
            let options = ScanOptions {
                recursive,
                probe_durations: probe,
            };
            scan_dir(&config, &expand(&dir), options, sort, order, json)
        }
        Commands::Transcode { dir, output } => {
            let config = Config::load_or_default(cli.config.as_deref())?;
            transcode_dir(&config, &expand(&dir), &expand(&output))
        }
        Commands::BasicAuth { username, password } => {
            let config = Config::load_or_default(cli.config.as_deref())?;
            store_credentials(&config, username, password)
        }
        Commands::CheckTools => {
            let config = Config::load_or_default(cli.config.as_deref())?;
            check_tools(&config)
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("streambox {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn expand(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}

fn scan_dir(
    config: &Config,
    dir: &Path,
    options: ScanOptions,
    sort: SortKey,
    order: SortOrder,
    json: bool,
) -> Result<()> {
    let tools = ToolRegistry::discover(&config.tools);
    let rt = tokio::runtime::Runtime::new()?;
    let mut entries = rt.block_on(sb_media::scan(
        dir,
        options,
        &tools,
        &CancellationToken::new(),
    ))?;
    sort_entries(&mut entries, sort, order);
    let items = number_entries(&entries);

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    for item in &items {
        match item.duration {
            Some(secs) => println!("{:>4}  {:>12}  {:>8.1}s  {}", item.id, item.size, secs, item.path),
            None => println!("{:>4}  {:>12}  {:>9}  {}", item.id, item.size, "-", item.path),
        }
    }
    println!("\n{} video(s) in {}", items.len(), dir.display());
    Ok(())
}

fn transcode_dir(config: &Config, input: &Path, output: &Path) -> Result<()> {
    let tools = ToolRegistry::discover(&config.tools);
    let profile = TranscodeProfile::from_config(&config.transcode);
    let rt = tokio::runtime::Runtime::new()?;

    let report = rt.block_on(async {
        let entries = sb_media::scan(
            input,
            ScanOptions::recursive(true),
            &tools,
            &CancellationToken::new(),
        )
        .await?;
        let sources: Vec<String> = entries.into_iter().map(|e| e.path).collect();
        println!("Transcoding {} file(s) into {}", sources.len(), output.display());
        sb_av::transcode_batch(&tools, &profile, input, &sources, output).await
    })?;

    for path in &report.succeeded {
        println!("✓ {path}");
    }
    for (path, reason) in &report.failed {
        println!("✗ {path}: {reason}");
    }

    if !report.is_success() {
        anyhow::bail!(
            "{} of {} file(s) failed to transcode",
            report.failed.len(),
            report.failed.len() + report.succeeded.len()
        );
    }
    Ok(())
}

fn store_credentials(config: &Config, username: String, password: String) -> Result<()> {
    let creds = Credentials::new(username, password)?;
    let path = config
        .auth
        .credentials_path
        .clone()
        .unwrap_or_else(credentials::default_path);
    credentials::save(&path, &creds)
        .with_context(|| format!("Failed to write credentials to {}", path.display()))?;
    println!("Credentials saved to {}", path.display());
    println!("Start the server with `streambox serve --auth` to require them.");
    Ok(())
}

fn check_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.tools);
    let rt = tokio::runtime::Runtime::new()?;
    let infos = rt.block_on(tools.check_all());
    let mut all_ok = true;

    for info in &infos {
        let status = if info.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, info.tool);

        if let Some(ref version) = info.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = info.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All tools are available!");
    } else {
        println!("Some tools are missing. Duration probing and transcoding need ffprobe and ffmpeg.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            Config::load(p)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!(
        "  Catalog root: {}",
        config
            .catalog
            .root
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".into())
    );
    println!("  Auth enabled: {}", config.auth.enabled);
    println!("  Playlist cache TTL: {}s", config.cache.playlist_ttl_secs);
    for warning in config.validate() {
        println!("  ⚠ {warning}");
    }

    Ok(())
}
