//! Armazenamento em memória
//!
//! Usado nos testes e no modo de simulação da linha de comando: os
//! fluxos em lote rodam completos sem tocar o banco.

use std::collections::BTreeSet;
use std::sync::Mutex;

use anyhow::Result;
use geoproc::Layer;

use crate::storage::{LoteNovo, LoteStorage, RemocaoQuadra};

/// Lote já cadastrado, para os cenários de remoção
#[derive(Debug, Clone, Copy)]
struct LoteExistente {
    id: i64,
    id_quadra: i64,
}

/// Armazenamento em memória com camadas fixas
#[derive(Debug, Default)]
pub struct MemoryStorage {
    quadras: Layer,
    linhas: Layer,
    lotes: Mutex<Vec<LoteExistente>>,
    /// Lotes que recusam remoção, para simular remoções parciais
    reter: BTreeSet<i64>,
    inseridos: Mutex<Vec<LoteNovo>>,
    proximo_id: Mutex<i64>,
}

impl MemoryStorage {
    pub fn new(quadras: Layer, linhas: Layer) -> Self {
        Self {
            quadras,
            linhas,
            lotes: Mutex::new(Vec::new()),
            reter: BTreeSet::new(),
            inseridos: Mutex::new(Vec::new()),
            proximo_id: Mutex::new(1),
        }
    }

    /// Cadastra `quantidade` lotes na quadra e devolve os ids criados
    pub fn com_lotes_existentes(self, id_quadra: i64, quantidade: u64) -> Self {
        {
            let mut lotes = self.lotes.lock().unwrap_or_else(|e| e.into_inner());
            let mut proximo = self.proximo_id.lock().unwrap_or_else(|e| e.into_inner());
            for _ in 0..quantidade {
                lotes.push(LoteExistente {
                    id: *proximo,
                    id_quadra,
                });
                *proximo += 1;
            }
        }
        self
    }

    /// Marca um lote como não removível
    pub fn reter_lote(mut self, id: i64) -> Self {
        self.reter.insert(id);
        self
    }

    /// Lotes inseridos até o momento
    pub fn lotes_inseridos(&self) -> Vec<LoteNovo> {
        self.inseridos
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl LoteStorage for MemoryStorage {
    async fn carregar_quadras(&self, ids: &[i64]) -> Result<Layer> {
        let mut layer = Layer::new(self.quadras.epsg);
        for feature in &self.quadras.features {
            let id = feature
                .attribute("id")
                .and_then(|v| v.as_i64())
                .unwrap_or_default();
            if ids.contains(&id) {
                let indice = layer.len();
                layer.push(feature.clone());
                layer.selected.insert(indice);
            }
        }
        Ok(layer)
    }

    async fn carregar_linhas_corte(&self) -> Result<Layer> {
        Ok(self.linhas.clone())
    }

    async fn inserir_lotes(&self, lotes: &[LoteNovo]) -> Result<u64> {
        let mut existentes = self.lotes.lock().unwrap_or_else(|e| e.into_inner());
        let mut proximo = self.proximo_id.lock().unwrap_or_else(|e| e.into_inner());
        for lote in lotes {
            existentes.push(LoteExistente {
                id: *proximo,
                id_quadra: lote.id_quadra.unwrap_or_default(),
            });
            *proximo += 1;
        }
        self.inseridos
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(lotes.iter().cloned());
        Ok(lotes.len() as u64)
    }

    async fn remover_lotes(&self, id_quadra: i64) -> Result<RemocaoQuadra> {
        let mut lotes = self.lotes.lock().unwrap_or_else(|e| e.into_inner());
        let encontrados = lotes
            .iter()
            .filter(|l| l.id_quadra == id_quadra)
            .count() as u64;
        if encontrados == 0 {
            return Ok(RemocaoQuadra {
                encontrados: 0,
                restantes: 0,
            });
        }

        lotes.retain(|l| l.id_quadra != id_quadra || self.reter.contains(&l.id));
        let restantes = lotes
            .iter()
            .filter(|l| l.id_quadra == id_quadra)
            .count() as u64;

        Ok(RemocaoQuadra {
            encontrados,
            restantes,
        })
    }
}
