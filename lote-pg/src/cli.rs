//! Definição e implementação dos comandos CLI
//!
//! Dois comandos:
//! - `poligonizar`: corta quadras por linhas de corte e grava os lotes
//! - `remover`: remove os lotes das quadras indicadas
//!
//! Com `--quadras-geojson` e `--linhas-geojson` a geração roda em
//! memória, sem tocar o banco (modo de simulação).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use geoproc::Processor;
use tracing::info;

use crate::batch;
use crate::config::Config;
use crate::display::ConsoleDisplay;
use crate::io;
use crate::notify::FilaAvisos;
use crate::pipeline::{data_atual_iso, Operador};
use crate::report::BatchReport;
use crate::storage::memory::MemoryStorage;
use crate::storage::pool::{exige_tls, verificar_postgis, ConexaoBanco};
use crate::storage::postgres::PostgresStorage;
use crate::storage::LoteStorage;

/// Opções de conexão PostgreSQL compartilhadas pelos comandos
#[derive(Args, Debug)]
pub struct BancoArgs {
    /// PostgreSQL host (padrão: env PGHOST / localhost)
    #[arg(long)]
    pub host: Option<String>,

    /// PostgreSQL database (padrão: env PGDATABASE / cadastro)
    #[arg(long)]
    pub database: Option<String>,

    /// PostgreSQL user (padrão: env PGUSER / postgres)
    #[arg(long)]
    pub user: Option<String>,

    /// PostgreSQL password (padrão: env PGPASSWORD)
    #[arg(long)]
    pub password: Option<String>,

    /// PostgreSQL port (padrão: env PGPORT / 5432)
    #[arg(long)]
    pub port: Option<u16>,

    /// SSL mode: disable, prefer, require (padrão: env PGSSLMODE / disable)
    #[arg(long)]
    pub ssl: Option<String>,
}

impl BancoArgs {
    /// Ambiente como base, opções da linha de comando por cima
    pub fn resolver(&self) -> ConexaoBanco {
        self.sobrepor(ConexaoBanco::do_ambiente())
    }

    fn sobrepor(&self, mut conexao: ConexaoBanco) -> ConexaoBanco {
        if let Some(host) = &self.host {
            conexao.host = host.clone();
        }
        if let Some(database) = &self.database {
            conexao.banco = database.clone();
        }
        if let Some(user) = &self.user {
            conexao.usuario = user.clone();
        }
        if let Some(password) = &self.password {
            conexao.senha = Some(password.clone());
        }
        if let Some(port) = self.port {
            conexao.porta = port;
        }
        if let Some(ssl) = &self.ssl {
            conexao.tls = exige_tls(ssl);
        }
        conexao
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Gera lotes cortando as quadras pelas linhas de corte
    Poligonizar {
        /// Ids das quadras selecionadas (separados por vírgula)
        #[arg(short, long, value_delimiter = ',', required = true)]
        quadras: Vec<i64>,

        /// Conta do operador (gravada no campo usuario)
        #[arg(long)]
        usuario: String,

        /// Nome do operador (gravado no campo usuario)
        #[arg(long)]
        nome: String,

        /// Caminho para uma configuração JSON (padrão: embutida)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Grava o relatório em JSON no caminho indicado
        #[arg(long)]
        relatorio: Option<PathBuf>,

        /// Camada de quadras em GeoJSON (ativa o modo de simulação)
        #[arg(long, requires = "linhas_geojson")]
        quadras_geojson: Option<PathBuf>,

        /// Camada de linhas de corte em GeoJSON
        #[arg(long, requires = "quadras_geojson")]
        linhas_geojson: Option<PathBuf>,

        #[command(flatten)]
        banco: BancoArgs,
    },

    /// Remove os lotes das quadras indicadas
    Remover {
        /// Ids das quadras (separados por vírgula)
        #[arg(short, long, value_delimiter = ',', required = true)]
        quadras: Vec<i64>,

        /// Caminho para uma configuração JSON (padrão: embutida)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Grava o relatório em JSON no caminho indicado
        #[arg(long)]
        relatorio: Option<PathBuf>,

        #[command(flatten)]
        banco: BancoArgs,
    },
}

fn carregar_config(path: &Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::padrao(),
    }
}

/// Exibe o relatório, drena os avisos e grava o JSON quando pedido
async fn concluir(
    report: &BatchReport,
    avisos: &mut FilaAvisos,
    relatorio: &Option<PathBuf>,
) -> Result<()> {
    report.exibir();
    avisos.drenar(&mut ConsoleDisplay).await;
    if let Some(path) = relatorio {
        report.save_to_file(path)?;
    }
    Ok(())
}

async fn gerar_com<S: LoteStorage>(
    storage: &S,
    config: &Config,
    operador: &Operador,
    quadras: &[i64],
    relatorio: &Option<PathBuf>,
) -> Result<()> {
    let mut avisos = FilaAvisos::new();
    let report = batch::gerar_lotes(
        storage,
        &Processor,
        config,
        operador,
        &data_atual_iso(),
        quadras,
        &mut avisos,
    )
    .await?;
    concluir(&report, &mut avisos, relatorio).await
}

/// Executa o comando poligonizar
#[allow(clippy::too_many_arguments)]
pub async fn cmd_poligonizar(
    quadras: &[i64],
    usuario: &str,
    nome: &str,
    config_path: &Option<PathBuf>,
    relatorio: &Option<PathBuf>,
    quadras_geojson: &Option<PathBuf>,
    linhas_geojson: &Option<PathBuf>,
    banco: &BancoArgs,
) -> Result<()> {
    let config = carregar_config(config_path)?;
    let operador = Operador {
        conta: usuario.to_string(),
        nome: nome.to_string(),
    };

    match (quadras_geojson, linhas_geojson) {
        (Some(quadras_path), Some(linhas_path)) => {
            info!("Modo de simulação: camadas GeoJSON, sem banco");
            let storage = storage_geojson(quadras_path, linhas_path, &config)?;
            gerar_com(&storage, &config, &operador, quadras, relatorio).await
        }
        _ => {
            let storage = storage_postgres(banco, &config).await?;
            gerar_com(&storage, &config, &operador, quadras, relatorio).await
        }
    }
}

/// Executa o comando remover
pub async fn cmd_remover(
    quadras: &[i64],
    config_path: &Option<PathBuf>,
    relatorio: &Option<PathBuf>,
    banco: &BancoArgs,
) -> Result<()> {
    let config = carregar_config(config_path)?;
    let storage = storage_postgres(banco, &config).await?;

    let mut avisos = FilaAvisos::new();
    let report = batch::remover_lotes(&storage, quadras, &mut avisos).await?;
    concluir(&report, &mut avisos, relatorio).await
}

fn storage_geojson(
    quadras_path: &Path,
    linhas_path: &Path,
    config: &Config,
) -> Result<MemoryStorage> {
    let epsg = Some(config.srid);
    let quadras = io::carregar_camada_geojson(quadras_path, epsg)
        .context("Failed to load quadras layer")?;
    let linhas = io::carregar_camada_geojson(linhas_path, epsg)
        .context("Failed to load cut lines layer")?;
    Ok(MemoryStorage::new(quadras, linhas))
}

async fn storage_postgres(banco: &BancoArgs, config: &Config) -> Result<PostgresStorage> {
    let conexao = banco.resolver();
    let pool = conexao.criar_pool()?;
    verificar_postgis(&pool).await?;
    info!(
        host = %conexao.host,
        database = %conexao.banco,
        "Conectado ao PostgreSQL"
    );
    Ok(PostgresStorage::new(
        pool,
        config.banco.clone(),
        config.srid,
    ))
}
