use anyhow::{Context, Result, bail};
use clap::Parser;
use sqlcontainers::admin::HttpAdminService;
use sqlcontainers::cli::{AppConfig, Args, Commands, ConfigDiscovery};
use sqlcontainers::engine::ContainerEngine;
use sqlcontainers::executor::HostExecutor;
use sqlcontainers::password::{generate_password, validate_sa_password};
use sqlcontainers::{App, ContainerField, SessionState, SqlContainer, VolumeCleanup};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.verbose {
        "sqlcontainers=debug"
    } else {
        "sqlcontainers=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let Some(command) = args.command else {
        return Ok(());
    };

    match command {
        Commands::ShowConfig => {
            ConfigDiscovery::show_discovery_info();
            Ok(())
        }
        Commands::InitConfig => {
            let path = ConfigDiscovery::create_default_user_config()?;
            println!("📝 Configuration file: {}", path.display());
            Ok(())
        }
        Commands::Password { check } => run_password(check),
        Commands::Images => {
            let config = ConfigDiscovery::load(args.config.as_deref())?;
            for image in &config.engine.image_choices {
                println!("{}", image);
            }
            Ok(())
        }
        command => {
            let config = ConfigDiscovery::load(args.config.as_deref())?;
            let mut app = build_app(&config).await?;
            let result = run_command(&mut app, &config, command).await;
            app.shutdown().await;
            result
        }
    }
}

fn run_password(check: Option<String>) -> Result<()> {
    match check {
        Some(password) => match validate_sa_password(&password) {
            Ok(()) => {
                println!("✅ Password meets the SQL Server policy");
                Ok(())
            }
            Err(e) => bail!("❌ {}", e),
        },
        None => {
            println!("{}", generate_password());
            Ok(())
        }
    }
}

#[cfg(feature = "containers")]
async fn connect_engine(config: &AppConfig) -> Result<Arc<dyn ContainerEngine>> {
    let engine = sqlcontainers::engine::DockerEngine::connect(config.docker_config())
        .await
        .context("Failed to connect to the container engine")?;
    Ok(Arc::new(engine))
}

#[cfg(not(feature = "containers"))]
async fn connect_engine(_config: &AppConfig) -> Result<Arc<dyn ContainerEngine>> {
    bail!("sqlc was built without the `containers` feature")
}

async fn build_app(config: &AppConfig) -> Result<App> {
    info!("Initializing orchestrator...");

    let engine = connect_engine(config).await?;
    let admin = Arc::new(
        HttpAdminService::new(&config.admin).context("Failed to set up the administration client")?,
    );

    let mut shell =
        HostExecutor::new().with_timeout(Duration::from_secs(config.scripts.timeout_secs));
    if let Some(dir) = config.scripts_dir() {
        info!("Using helper scripts from: {:?}", dir);
        shell = shell.with_scripts_dir(dir);
    }

    let mut app = App::new(engine, admin, Arc::new(shell), config.app_options());
    app.refresh_containers()
        .await
        .context("Failed to list containers")?;
    Ok(app)
}

fn resolve(app: &App, key: &str) -> Result<String> {
    app.find_container(key)
        .map(|c| c.id.clone())
        .with_context(|| format!("No SQL container matches {:?}", key))
}

async fn run_command(app: &mut App, config: &AppConfig, command: Commands) -> Result<()> {
    match command {
        Commands::List { databases, json } => {
            if databases {
                let running: Vec<String> = app
                    .containers()
                    .iter()
                    .filter(|c| c.is_running())
                    .map(|c| c.id.clone())
                    .collect();
                for id in running {
                    if let Err(e) = app.refresh_databases(&id).await {
                        warn!("Failed to list databases of {}: {}", id, e);
                    }
                }
            }

            if json {
                println!("{}", serde_json::to_string_pretty(app.containers())?);
            } else {
                print_containers(app.containers(), databases);
            }
        }
        Commands::Create {
            name,
            port,
            image,
            password,
        } => {
            app.validate_port(&port)?;

            app.edit_draft(ContainerField::Image, image);
            app.edit_draft(ContainerField::ContainerName, name);
            app.edit_draft(ContainerField::Port, port);
            match password {
                Some(password) => {
                    validate_sa_password(&password)?;
                    app.edit_draft(ContainerField::SaPassword, password);
                }
                None => {
                    let password = app.generate_password();
                    println!("🔑 Generated sa password: {}", password);
                }
            }

            let created = app.create_container().await?;
            println!("✅ Created container {}", created.container_id);
            if let Some(container) = app.container(&created.container_id) {
                println!("   {}", container.connection_string(true));
            }
        }
        Commands::Start { container } => {
            let id = resolve(app, &container)?;
            app.start_container(&id).await?;
            println!("▶️  Started {}", container);
        }
        Commands::Stop { container } => {
            let id = resolve(app, &container)?;
            app.stop_container(&id).await?;
            println!("⏹️  Stopped {}", container);
        }
        Commands::Delete {
            container,
            with_data,
        } => {
            let id = resolve(app, &container)?;
            let report = app.delete_container(&id, with_data).await?;
            println!("🗑️  Deleted {}", container);
            match report.volume_cleanup {
                VolumeCleanup::Skipped if !report.volume_path.is_empty() => {
                    println!("   Data kept in {}", report.volume_path)
                }
                VolumeCleanup::Skipped => {}
                VolumeCleanup::Removed => println!("   Removed data folder {}", report.volume_path),
                VolumeCleanup::Failed(e) => println!("⚠️  Data folder not removed: {}", e),
            }
        }
        Commands::Databases { container } => {
            let id = resolve(app, &container)?;
            for database in app.refresh_databases(&id).await? {
                println!("{:>5}  {}", database.id, database.name);
            }
        }
        Commands::CreateDatabase { container, name } => {
            let id = resolve(app, &container)?;
            let databases = app.create_database(&id, &name).await?;
            println!("✅ Created database {}", name);
            for database in databases {
                println!("{:>5}  {}", database.id, database.name);
            }
        }
        Commands::Connect {
            container,
            database,
        } => {
            let id = resolve(app, &container)?;
            app.open_session(&id, &database).await?;
            println!("⏳ Waiting for the sqlcmd session on {}...", database);

            match app.wait_for_session(&id).await {
                SessionState::Ready => {
                    println!("✅ Session ready: {}", config.admin.terminal_url);
                    println!("   Press Ctrl-C to close it");
                    tokio::signal::ctrl_c().await?;
                    app.close_session(&id).await?;
                    println!("Session closed");
                }
                state => {
                    app.close_session(&id).await?;
                    bail!("❌ Session {}: the terminal never became ready", state);
                }
            }
        }
        Commands::Password { .. }
        | Commands::Images
        | Commands::ShowConfig
        | Commands::InitConfig => {}
    }

    Ok(())
}

fn print_containers(containers: &[SqlContainer], with_databases: bool) {
    if containers.is_empty() {
        println!("No SQL containers");
        return;
    }

    println!(
        "{:<8} {:<20} {:<22} {:<12} {:>5}",
        "STATUS", "NAME", "IMAGE", "ID", "PORT"
    );
    for container in containers {
        println!(
            "{:<8} {:<20} {:<22} {:<12} {:>5}",
            container.status.to_string(),
            container.name,
            container.display_image(),
            container.display_id(),
            container.port
        );
        if with_databases {
            for database in &container.databases {
                println!("         📋 {} ({})", database.name, database.id);
            }
        }
    }
}
