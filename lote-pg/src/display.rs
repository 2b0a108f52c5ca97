//! Saída ao operador
//!
//! Abstrações de exibição usadas pelos fluxos em lote e pela ferramenta
//! de seleção, com uma implementação de console.

use tracing::{info, warn};

use crate::notify::{Nivel, Notificacao};

/// Barra de status
pub trait StatusDisplay {
    /// Atualiza o texto; vazio limpa a barra
    fn atualizar(&mut self, texto: &str);
}

/// Destino das notificações já liberadas pelo agendador
pub trait NotificationSink {
    fn notificar(&mut self, notificacao: &Notificacao);
}

/// Exibição em console, via log estruturado
#[derive(Debug, Default)]
pub struct ConsoleDisplay;

impl StatusDisplay for ConsoleDisplay {
    fn atualizar(&mut self, texto: &str) {
        if !texto.is_empty() {
            info!(status = texto, "Status");
        }
    }
}

impl NotificationSink for ConsoleDisplay {
    fn notificar(&mut self, notificacao: &Notificacao) {
        match notificacao.nivel {
            Nivel::Aviso | Nivel::Erro => warn!(
                titulo = %notificacao.titulo,
                "{}",
                notificacao.mensagem
            ),
            Nivel::Sucesso | Nivel::Info => info!(
                titulo = %notificacao.titulo,
                "{}",
                notificacao.mensagem
            ),
        }
    }
}

/// Coletor de notificações para testes e execuções silenciosas
#[derive(Debug, Default)]
pub struct MemoryDisplay {
    pub status: Vec<String>,
    pub notificacoes: Vec<Notificacao>,
}

impl StatusDisplay for MemoryDisplay {
    fn atualizar(&mut self, texto: &str) {
        self.status.push(texto.to_string());
    }
}

impl NotificationSink for MemoryDisplay {
    fn notificar(&mut self, notificacao: &Notificacao) {
        self.notificacoes.push(notificacao.clone());
    }
}
