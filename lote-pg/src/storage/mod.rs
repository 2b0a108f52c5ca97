//! Persistência de quadras, linhas de corte e lotes
//!
//! O trait [`LoteStorage`] isola os fluxos em lote do meio de
//! armazenamento: PostGIS em produção, memória nos testes e no modo
//! de simulação.

pub mod memory;
pub mod pool;
pub mod postgres;

use anyhow::Result;
use geo::Geometry;
use geoproc::Layer;

/// Lote pronto para inserção, com o esquema final de campos
#[derive(Debug, Clone)]
pub struct LoteNovo {
    pub geometria: Geometry<f64>,
    pub id_localidade: Option<i64>,
    pub id_setor: Option<i64>,
    pub id_bairro: Option<i64>,
    pub id_quadra: Option<i64>,
    pub ins_quadra: Option<i64>,
    pub sit_imovel: String,
    pub usuario: String,
    /// Data ISO (YYYY-MM-DD)
    pub data_atual: String,
}

/// Contagem da remoção de lotes de uma quadra
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemocaoQuadra {
    /// Lotes cadastrados na quadra antes da remoção
    pub encontrados: u64,
    /// Lotes que permaneceram após a remoção
    pub restantes: u64,
}

/// Acesso ao armazenamento de quadras e lotes
pub trait LoteStorage {
    /// Carrega as quadras pedidas, já marcadas como selecionadas
    fn carregar_quadras(&self, ids: &[i64]) -> impl std::future::Future<Output = Result<Layer>> + Send;

    /// Carrega todas as linhas de corte
    fn carregar_linhas_corte(&self) -> impl std::future::Future<Output = Result<Layer>> + Send;

    /// Insere os lotes e devolve quantos entraram
    fn inserir_lotes(
        &self,
        lotes: &[LoteNovo],
    ) -> impl std::future::Future<Output = Result<u64>> + Send;

    /// Remove os lotes de uma quadra, limpando antes as tabelas
    /// dependentes, e devolve as contagens
    fn remover_lotes(
        &self,
        id_quadra: i64,
    ) -> impl std::future::Future<Output = Result<RemocaoQuadra>> + Send;
}
