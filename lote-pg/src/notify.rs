//! Agendador de notificações
//!
//! Serializa avisos ao operador com espaçamento mínimo entre exibições,
//! fila limitada, prioridades e coalescência (debounce) de avisos
//! repetidos. Uma notificação pode ainda pedir retenção (`delay_ms`)
//! antes de ficar elegível para exibição. O núcleo é determinístico:
//! o relógio entra como parâmetro em milissegundos, o que permite
//! testar o agendamento sem temporizadores reais.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use crate::display::NotificationSink;

/// Espaçamento mínimo entre notificações exibidas
pub const INTERVALO_MINIMO_MS: u64 = 300;

/// Tamanho máximo da fila antes do descarte
pub const MAX_FILA: usize = 30;

/// Prioridade de exibição; alta passa à frente do que já espera na fila
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Prioridade {
    Alta,
    #[default]
    Normal,
    Baixa,
}

/// Opções de entrega de uma notificação
#[derive(Debug, Clone, Copy, Default)]
pub struct Entrega {
    /// Coalescência por chave: nova solicitação de mesma chave dentro
    /// do prazo substitui a retida e reinicia a contagem
    pub debounce_ms: u64,
    /// Retenção antes da exibição, independente da coalescência
    pub delay_ms: u64,
    pub prioridade: Prioridade,
}

/// Severidade da notificação
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Nivel {
    Sucesso,
    Erro,
    Aviso,
    Info,
}

impl fmt::Display for Nivel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nivel::Sucesso => write!(f, "sucesso"),
            Nivel::Erro => write!(f, "erro"),
            Nivel::Aviso => write!(f, "aviso"),
            Nivel::Info => write!(f, "info"),
        }
    }
}

/// Uma notificação pendente ou exibida
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notificacao {
    pub titulo: String,
    pub mensagem: String,
    pub nivel: Nivel,
    pub duracao_ms: u64,
}

impl Notificacao {
    pub fn new(
        titulo: impl Into<String>,
        mensagem: impl Into<String>,
        nivel: Nivel,
        duracao_ms: u64,
    ) -> Self {
        Self {
            titulo: titulo.into(),
            mensagem: mensagem.into(),
            nivel,
            duracao_ms,
        }
    }

    /// Chave de coalescência: notificações de mesmo título e nível
    /// substituem a pendente
    fn chave(&self) -> String {
        format!("{}_{}", self.titulo, self.nivel)
    }
}

/// Entrada da fila aguardando exibição
#[derive(Debug)]
struct Pendente {
    /// Instante a partir do qual pode ser exibida
    liberacao_ms: u64,
    prioridade: Prioridade,
    /// Desempate: mesma prioridade sai na ordem de chegada
    seq: u64,
    notificacao: Notificacao,
}

/// Agendador com fila limitada, prioridades, espaçamento mínimo e
/// debounce por chave
#[derive(Debug, Default)]
pub struct NotificationScheduler {
    fila: Vec<Pendente>,
    /// Pendentes de debounce: chave -> (prazo de liberação, entrega, notificação)
    debounce: BTreeMap<String, (u64, Entrega, Notificacao)>,
    ultima_ms: Option<u64>,
    seq: u64,
}

impl NotificationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Solicita a exibição com prioridade normal e sem retenção.
    ///
    /// Com `debounce_ms > 0` a notificação fica retida até o prazo; uma
    /// nova solicitação de mesma chave dentro do prazo substitui a retida
    /// e reinicia a contagem (a última vence).
    pub fn solicitar(&mut self, agora_ms: u64, notificacao: Notificacao, debounce_ms: u64) {
        self.solicitar_com(
            agora_ms,
            notificacao,
            Entrega {
                debounce_ms,
                ..Entrega::default()
            },
        );
    }

    /// Solicita a exibição com as opções de entrega completas
    pub fn solicitar_com(&mut self, agora_ms: u64, notificacao: Notificacao, entrega: Entrega) {
        if entrega.debounce_ms > 0 {
            let chave = notificacao.chave();
            self.debounce
                .insert(chave, (agora_ms + entrega.debounce_ms, entrega, notificacao));
        } else {
            self.enfileirar(agora_ms, notificacao, entrega);
        }
    }

    /// Avança o agendador: libera debounces vencidos e exibe no máximo
    /// uma notificação por chamada, respeitando o espaçamento mínimo.
    /// Entre as elegíveis sai primeiro a de maior prioridade; empates
    /// saem na ordem de chegada.
    pub fn poll(&mut self, agora_ms: u64) -> Option<Notificacao> {
        let vencidas: Vec<String> = self
            .debounce
            .iter()
            .filter(|(_, (prazo, _, _))| *prazo <= agora_ms)
            .map(|(chave, _)| chave.clone())
            .collect();
        for chave in vencidas {
            if let Some((prazo, entrega, notificacao)) = self.debounce.remove(&chave) {
                // a retenção conta a partir da liberação do debounce
                self.enfileirar(prazo, notificacao, entrega);
            }
        }

        if let Some(ultima) = self.ultima_ms {
            if agora_ms.saturating_sub(ultima) < INTERVALO_MINIMO_MS {
                return None;
            }
        }

        let indice = self
            .fila
            .iter()
            .enumerate()
            .filter(|(_, p)| p.liberacao_ms <= agora_ms)
            .min_by_key(|(_, p)| (p.prioridade, p.seq))
            .map(|(i, _)| i)?;
        let pendente = self.fila.remove(indice);
        self.ultima_ms = Some(agora_ms);
        Some(pendente.notificacao)
    }

    /// Cancela tudo: fila e debounces pendentes
    pub fn cancel_all(&mut self) {
        self.fila.clear();
        self.debounce.clear();
    }

    /// Cancela um debounce pendente por título e nível
    pub fn cancel_by_key(&mut self, titulo: &str, nivel: Nivel) {
        self.debounce.remove(&format!("{titulo}_{nivel}"));
    }

    /// Notificações aguardando exibição (fila mais debounces)
    pub fn pendentes(&self) -> usize {
        self.fila.len() + self.debounce.len()
    }

    fn enfileirar(&mut self, agora_ms: u64, notificacao: Notificacao, entrega: Entrega) {
        if self.fila.len() >= MAX_FILA {
            // estouro: descarta o acumulado e avisa, mantendo o pedido
            // que causou o estouro
            self.fila.clear();
            self.seq += 1;
            self.fila.push(Pendente {
                liberacao_ms: agora_ms,
                prioridade: Prioridade::Alta,
                seq: self.seq,
                notificacao: Notificacao::new(
                    "Muitas Notificações",
                    format!("Fila cheia ({MAX_FILA}+). Algumas descartadas."),
                    Nivel::Aviso,
                    2000,
                ),
            });
        }
        self.seq += 1;
        self.fila.push(Pendente {
            liberacao_ms: agora_ms + entrega.delay_ms,
            prioridade: entrega.prioridade,
            seq: self.seq,
            notificacao,
        });
    }
}

/// Agendador acoplado ao relógio real, para os fluxos de linha de comando
#[derive(Debug)]
pub struct FilaAvisos {
    sched: NotificationScheduler,
    origem: Instant,
}

impl Default for FilaAvisos {
    fn default() -> Self {
        Self::new()
    }
}

impl FilaAvisos {
    pub fn new() -> Self {
        Self {
            sched: NotificationScheduler::new(),
            origem: Instant::now(),
        }
    }

    fn agora_ms(&self) -> u64 {
        self.origem.elapsed().as_millis() as u64
    }

    pub fn solicitar(&mut self, notificacao: Notificacao, debounce_ms: u64) {
        let agora = self.agora_ms();
        self.sched.solicitar(agora, notificacao, debounce_ms);
    }

    pub fn solicitar_com(&mut self, notificacao: Notificacao, entrega: Entrega) {
        let agora = self.agora_ms();
        self.sched.solicitar_com(agora, notificacao, entrega);
    }

    pub fn cancel_all(&mut self) {
        self.sched.cancel_all();
    }

    /// Exibe tudo o que estiver pendente, respeitando o espaçamento
    pub async fn drenar(&mut self, sink: &mut dyn NotificationSink) {
        while self.sched.pendentes() > 0 {
            if let Some(notificacao) = self.sched.poll(self.agora_ms()) {
                sink.notificar(&notificacao);
            } else {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    }
}
