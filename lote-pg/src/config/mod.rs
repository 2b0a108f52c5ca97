//! Configuração do sistema

use serde::{Deserialize, Serialize};
use std::path::Path;

use anyhow::{Context, Result};

/// Configuração principal
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// SRID de trabalho (SIRGAS 2000 / UTM 24S)
    pub srid: u32,

    /// Fração máxima da área da quadra que um lote válido pode ocupar
    pub fracao_area_maxima: f64,

    /// Situação atribuída aos lotes recém-gerados
    pub situacao_imovel: String,

    pub camadas: CamadasConfig,
    pub banco: BancoConfig,
    pub tolerancias: Tolerancias,
}

/// Nomes das camadas de entrada
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CamadasConfig {
    pub quadra: String,
    pub linhas_corte: String,
}

/// Esquema e tabelas no PostGIS
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BancoConfig {
    pub schema: String,

    /// Tabela de destino dos lotes
    pub tabela_lote: String,

    pub tabela_quadra: String,
    pub tabela_linha_corte: String,

    #[serde(default = "coluna_geometria_padrao")]
    pub coluna_geometria: String,

    /// Tabelas que referenciam lotes por `id_lote` e precisam ser
    /// limpas antes da remoção
    pub dependentes: Vec<String>,
}

/// Tolerâncias geométricas do fluxo de corte
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Tolerancias {
    /// Distância de extensão das pontas das linhas de corte (metros)
    pub extensao_linha: f64,

    /// Tolerância da simplificação Douglas-Peucker
    pub simplificacao: f64,

    /// Tolerância da remoção de vértices duplicados
    pub vertices_duplicados: f64,

    /// Tolerância do ajuste fino de geometrias
    pub ajuste: f64,
}

fn coluna_geometria_padrao() -> String {
    "geom".to_string()
}

impl Config {
    /// Carrega uma configuração a partir de um arquivo JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Configuração padrão embutida
    pub fn padrao() -> Result<Self> {
        serde_json::from_str(include_str!("presets/padrao.json"))
            .context("Failed to parse embedded config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_padrao() {
        let config = Config::padrao().unwrap();
        assert_eq!(config.srid, 31984);
        assert_eq!(config.fracao_area_maxima, 0.95);
        assert_eq!(config.situacao_imovel, "Habitado");
        assert_eq!(config.banco.schema, "comercial_umc");
        assert_eq!(config.banco.tabela_lote, "v_lote");
        assert_eq!(
            config.banco.dependentes,
            vec!["slote".to_string(), "v_calcular_testada".to_string()]
        );
        assert_eq!(config.tolerancias.extensao_linha, 0.3);
        assert_eq!(config.tolerancias.vertices_duplicados, 1e-6);
    }

    #[test]
    fn test_coluna_geometria_default() {
        let json = r#"{
            "srid": 31984,
            "fracao_area_maxima": 0.95,
            "situacao_imovel": "Habitado",
            "camadas": {"quadra": "Quadra", "linhas_corte": "Linhas_corte"},
            "banco": {
                "schema": "s", "tabela_lote": "l",
                "tabela_quadra": "q", "tabela_linha_corte": "c",
                "dependentes": []
            },
            "tolerancias": {
                "extensao_linha": 0.3, "simplificacao": 0.001,
                "vertices_duplicados": 1e-6, "ajuste": 1e-4
            }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.banco.coluna_geometria, "geom");
    }
}
