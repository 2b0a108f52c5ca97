//! Conexão com o banco cadastral
//!
//! Os parâmetros vêm do ambiente (`PG*`) com sobreposição pela linha de
//! comando. Antes de tocar nas tabelas o fluxo confirma que o PostGIS
//! está instalado no banco apontado, já que toda leitura e escrita de
//! geometria passa por funções dele.

use std::time::Duration;

use anyhow::{Context, Result};
use deadpool_postgres::{Pool, PoolConfig, Runtime, Timeouts};
use tokio_postgres::NoTls;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::debug;

/// O fluxo processa quadra a quadra; poucas conexões bastam
const MAX_CONEXOES: usize = 4;

/// Parâmetros de conexão com o banco cadastral
#[derive(Debug, Clone)]
pub struct ConexaoBanco {
    pub host: String,
    pub porta: u16,
    pub banco: String,
    pub usuario: String,
    pub senha: Option<String>,
    /// TLS via rustls quando verdadeiro; conexão aberta caso contrário
    pub tls: bool,
}

impl Default for ConexaoBanco {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            porta: 5432,
            banco: "cadastro".into(),
            usuario: "postgres".into(),
            senha: None,
            tls: false,
        }
    }
}

impl ConexaoBanco {
    /// Lê `PGHOST`, `PGPORT`, `PGDATABASE`, `PGUSER`, `PGPASSWORD` e
    /// `PGSSLMODE`, caindo nos padrões usuais quando ausentes
    pub fn do_ambiente() -> Self {
        let padrao = Self::default();
        Self {
            host: std::env::var("PGHOST").unwrap_or(padrao.host),
            porta: std::env::var("PGPORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(padrao.porta),
            banco: std::env::var("PGDATABASE").unwrap_or(padrao.banco),
            usuario: std::env::var("PGUSER").unwrap_or(padrao.usuario),
            senha: std::env::var("PGPASSWORD").ok(),
            tls: std::env::var("PGSSLMODE")
                .map(|modo| exige_tls(&modo))
                .unwrap_or(false),
        }
    }

    /// Monta o pool de conexões
    pub fn criar_pool(&self) -> Result<Pool> {
        let mut cfg = deadpool_postgres::Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.porta);
        cfg.dbname = Some(self.banco.clone());
        cfg.user = Some(self.usuario.clone());
        cfg.password = self.senha.clone();
        cfg.pool = Some(PoolConfig {
            max_size: MAX_CONEXOES,
            timeouts: Timeouts {
                wait: Some(Duration::from_secs(30)),
                ..Timeouts::default()
            },
            ..PoolConfig::default()
        });

        if self.tls {
            let raizes = rustls::RootCertStore::from_iter(
                webpki_roots::TLS_SERVER_ROOTS.iter().cloned(),
            );
            let tls_config = rustls::ClientConfig::builder()
                .with_root_certificates(raizes)
                .with_no_client_auth();
            cfg.create_pool(Some(Runtime::Tokio1), MakeRustlsConnect::new(tls_config))
                .context("Failed to create database pool with TLS")
        } else {
            cfg.create_pool(Some(Runtime::Tokio1), NoTls)
                .context("Failed to create database pool")
        }
    }
}

/// Interpreta um modo SSL (`PGSSLMODE` ou `--ssl`): os modos que exigem
/// criptografia ligam o TLS; `prefer` cai na conexão aberta, já que a
/// negociação oportunista não é suportada
pub fn exige_tls(modo: &str) -> bool {
    matches!(
        modo.to_ascii_lowercase().as_str(),
        "require" | "verify-ca" | "verify-full" | "on" | "true" | "yes" | "1"
    )
}

/// Confirma a conexão e a presença do PostGIS
pub async fn verificar_postgis(pool: &Pool) -> Result<()> {
    let client = pool
        .get()
        .await
        .context("Failed to get connection from pool")?;
    let row = client
        .query_one("SELECT PostGIS_Version()", &[])
        .await
        .context("PostGIS is not available on this database")?;
    let versao: String = row.get(0);
    debug!(versao = %versao, "PostGIS disponível");
    Ok(())
}
