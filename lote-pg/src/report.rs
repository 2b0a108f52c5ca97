//! Relatórios de execução em lote
//!
//! Acumula o resultado por quadra durante a geração ou remoção de lotes
//! e produz o texto final exibido ao operador, além de uma forma JSON
//! para arquivamento.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

/// Tipo de operação em lote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BatchKind {
    Geracao,
    Remocao,
}

/// Categoria final do lote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BatchCategory {
    /// Todas as quadras processadas
    Sucesso,
    /// Processadas e ignoradas misturadas
    Parcial,
    /// Nenhuma quadra processada
    Aviso,
}

/// Quadra processada com sucesso
#[derive(Debug, Clone, Serialize)]
pub struct QuadraProcessada {
    pub inscricao: String,
    pub id: i64,
    /// Lotes gerados ou removidos, conforme a operação
    pub lotes: u64,
}

/// Quadra ignorada e o motivo
#[derive(Debug, Clone, Serialize)]
pub struct QuadraIgnorada {
    pub inscricao: String,
    pub id: i64,
    pub motivo: String,
}

/// Relatório de uma execução em lote
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub kind: BatchKind,
    pub category: BatchCategory,
    pub processadas: Vec<QuadraProcessada>,
    pub ignoradas: Vec<QuadraIgnorada>,
    pub total_lotes: u64,
    pub duration_secs: f64,
}

/// Construtor incremental do relatório
#[derive(Debug)]
pub struct BatchReportBuilder {
    kind: BatchKind,
    processadas: Vec<QuadraProcessada>,
    ignoradas: Vec<QuadraIgnorada>,
    inicio: Instant,
}

impl BatchReportBuilder {
    pub fn new(kind: BatchKind) -> Self {
        Self {
            kind,
            processadas: Vec::new(),
            ignoradas: Vec::new(),
            inicio: Instant::now(),
        }
    }

    pub fn record_processada(&mut self, inscricao: String, id: i64, lotes: u64) {
        self.processadas.push(QuadraProcessada {
            inscricao,
            id,
            lotes,
        });
    }

    pub fn record_ignorada(&mut self, inscricao: String, id: i64, motivo: String) {
        self.ignoradas.push(QuadraIgnorada {
            inscricao,
            id,
            motivo,
        });
    }

    pub fn finish(self) -> BatchReport {
        let category = if self.processadas.is_empty() {
            BatchCategory::Aviso
        } else if self.ignoradas.is_empty() {
            BatchCategory::Sucesso
        } else {
            BatchCategory::Parcial
        };

        let total_lotes = self.processadas.iter().map(|q| q.lotes).sum();

        BatchReport {
            kind: self.kind,
            category,
            processadas: self.processadas,
            ignoradas: self.ignoradas,
            total_lotes,
            duration_secs: self.inicio.elapsed().as_secs_f64(),
        }
    }
}

impl BatchReport {
    /// Texto completo do relatório
    pub fn render(&self) -> String {
        match self.kind {
            BatchKind::Geracao => self.render_geracao(),
            BatchKind::Remocao => self.render_remocao(),
        }
    }

    fn render_geracao(&self) -> String {
        let mut linhas: Vec<String> = Vec::new();

        if !self.processadas.is_empty() {
            linhas.push(format!(
                "{} QUADRA(S) PROCESSADA(S):",
                self.processadas.len()
            ));
            for quadra in &self.processadas {
                linhas.push(format!(
                    "• Insc: {} → {} lote(s)",
                    quadra.inscricao, quadra.lotes
                ));
            }
            linhas.push(format!("TOTAL: {} lotes gerados", self.total_lotes));
        }

        if !self.ignoradas.is_empty() {
            if !linhas.is_empty() {
                linhas.push(String::new());
            }
            linhas.push(format!("{} QUADRA(S) IGNORADA(S):", self.ignoradas.len()));
            for quadra in &self.ignoradas {
                linhas.push(format!("• Insc: {}", quadra.inscricao));
                linhas.push(format!("  Motivo: {}", quadra.motivo));
            }
        }

        linhas.join("\n")
    }

    fn render_remocao(&self) -> String {
        let mut linhas: Vec<String> = vec![
            "RELATÓRIO DE REMOÇÃO DE LOTES".to_string(),
            "=".repeat(50),
        ];

        if !self.processadas.is_empty() {
            linhas.push(format!(
                "{} QUADRA(S) COM LOTES REMOVIDOS:",
                self.processadas.len()
            ));
            for quadra in &self.processadas {
                linhas.push(format!(
                    "• Quadra: {} teve {} lote(s) removido(s)",
                    quadra.inscricao, quadra.lotes
                ));
            }
            linhas.push(format!("TOTAL: {} lotes removidos", self.total_lotes));
        }

        if !self.ignoradas.is_empty() {
            linhas.push(String::new());
            linhas.push(format!("{} QUADRA(S) SEM REMOÇÃO:", self.ignoradas.len()));
            for quadra in &self.ignoradas {
                linhas.push(format!("• Quadra: {}", quadra.inscricao));
                linhas.push(format!("  Motivo: {}", quadra.motivo));
            }
        }

        linhas.push(String::new());
        linhas.push(format!(
            "Total de quadras processadas: {}",
            self.processadas.len() + self.ignoradas.len()
        ));

        linhas.join("\n")
    }

    /// Linha única para notificações e logs
    pub fn resumo(&self) -> String {
        match self.kind {
            BatchKind::Geracao => format!(
                "{} quadra(s) processada(s), {} ignorada(s), {} lote(s) gerado(s)",
                self.processadas.len(),
                self.ignoradas.len(),
                self.total_lotes
            ),
            BatchKind::Remocao => format!(
                "{} quadra(s) com remoção, {} sem remoção, {} lote(s) removido(s)",
                self.processadas.len(),
                self.ignoradas.len(),
                self.total_lotes
            ),
        }
    }

    /// Imprime o relatório na saída padrão
    pub fn exibir(&self) {
        println!();
        println!("{}", self.render());
        println!();
        info!(
            duracao_s = format!("{:.2}", self.duration_secs),
            "{}",
            self.resumo()
        );
    }

    /// Grava o relatório em JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        std::fs::write(path, json)
            .context(format!("Failed to write report to {}", path.display()))?;
        info!("Relatório salvo em {}", path.display());
        Ok(())
    }
}
