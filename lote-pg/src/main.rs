//! Ponto de entrada CLI para lote-pg

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// Carregar .env na inicialização
fn load_env() {
    // Procurar .env no diretório corrente ou no do binário
    if dotenvy::dotenv().is_err() {
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

use lote_pg::cli::{self, Commands};

/// Gerar e remover lotes urbanos em PostGIS a partir de linhas de corte
#[derive(Parser)]
#[command(name = "lote-pg")]
#[command(author, version)]
#[command(about = "Gerar e remover lotes urbanos em PostGIS a partir de linhas de corte")]
#[command(
    long_about = "Corta quadras urbanas pelas linhas de corte, valida os lotes resultantes e grava no PostGIS.\n\nUse 'poligonizar' para gerar lotes e 'remover' para limpá-los."
)]
struct Cli {
    /// Aumentar a verbosidade (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Modo silencioso
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Carregar .env antes de tudo
    load_env();

    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Poligonizar {
            quadras,
            usuario,
            nome,
            config,
            relatorio,
            quadras_geojson,
            linhas_geojson,
            banco,
        } => {
            info!(quadras = quadras.len(), usuario = %usuario, "Geração de lotes");
            cli::cmd_poligonizar(
                &quadras,
                &usuario,
                &nome,
                &config,
                &relatorio,
                &quadras_geojson,
                &linhas_geojson,
                &banco,
            )
            .await?;
        }
        Commands::Remover {
            quadras,
            config,
            relatorio,
            banco,
        } => {
            info!(quadras = quadras.len(), "Remoção de lotes");
            cli::cmd_remover(&quadras, &config, &relatorio, &banco).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
