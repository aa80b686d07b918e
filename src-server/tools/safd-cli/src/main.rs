use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use safd::api::{ApiRequest, ApiResponse};
use safd::utils::AppConfig;
use safd::Engine;

const CLI_CALLER: &str = "cli";

#[derive(Parser, Debug)]
#[command(name = "safd-cli", about = "Administration des jeux de données SAFD")]
struct Cli {
    /// Dossier des données. Par défaut : configuration (SAFD_CONFIG / .env).
    #[arg(long, env = "SAFD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Affiche un jeu de données : <type>
    Load { dataset: String },

    /// Remplace un jeu de données par le contenu d'un fichier JSON : <type> <fichier>
    Save { dataset: String, file: PathBuf },

    /// Statistiques par type
    Stats,

    /// Liste les sauvegardes (plus récentes d'abord)
    ListBackups,

    /// Crée un bundle complet
    CreateBackup,

    /// Restaure un bundle : <nom de fichier>
    Restore { filename: String },

    /// Vide un jeu de données (copie de sauvegarde préalable) : <type>
    Clear { dataset: String },

    /// Vide tous les jeux de données (bundle préalable)
    ClearAll {
        /// Confirmation obligatoire
        #[arg(long)]
        yes: bool,
    },
}

fn build_request(cmd: Cmd) -> Result<ApiRequest> {
    let req = match cmd {
        Cmd::Load { dataset } => ApiRequest::new("GET", "load").with_dataset(dataset),
        Cmd::Save { dataset, file } => {
            let body = std::fs::read(&file)
                .with_context(|| format!("Lecture de {} impossible", file.display()))?;
            ApiRequest::new("POST", "save")
                .with_dataset(dataset)
                .with_body(body)
        }
        Cmd::Stats => ApiRequest::new("GET", "stats"),
        Cmd::ListBackups => ApiRequest::new("GET", "list_backups"),
        Cmd::CreateBackup => ApiRequest::new("POST", "create_backup").with_body("{}"),
        Cmd::Restore { filename } => ApiRequest::new("PUT", "restore_backup")
            .with_json(&serde_json::json!({ "filename": filename })),
        Cmd::Clear { dataset } => ApiRequest::new("DELETE", "clear").with_dataset(dataset),
        Cmd::ClearAll { yes } => {
            if !yes {
                bail!("clear-all supprime toutes les données : relancer avec --yes");
            }
            ApiRequest::new("DELETE", "clear_all")
        }
    };
    Ok(req.with_caller(CLI_CALLER))
}

fn build_config(data_dir: Option<PathBuf>) -> Result<AppConfig> {
    let mut config = AppConfig::load().context("Configuration SAFD invalide")?;
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<ApiResponse> {
    let config = build_config(cli.data_dir)?;
    let request = build_request(cli.cmd)?;
    let engine = Engine::open(&config)
        .await
        .with_context(|| format!("Ouverture de {} impossible", config.data_dir.display()))?;
    Ok(engine.handle(&request).await)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(resp) => {
            match serde_json::to_string_pretty(&resp.body) {
                Ok(out) => println!("{out}"),
                Err(e) => eprintln!("❌ {e}"),
            }
            if resp.is_success() {
                ExitCode::SUCCESS
            } else {
                tracing::debug!(status = resp.status, "Réponse en échec");
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("❌ {e:#}");
            ExitCode::FAILURE
        }
    }
}
