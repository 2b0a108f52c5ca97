//! Ferramenta de seleção de quadras
//!
//! Máquina de estados pura que traduz eventos de entrada (cliques, teclas)
//! em efeitos observáveis: mudanças de seleção, prévia do polígono de
//! busca, textos de status e pedidos de notificação. Nenhum acesso a
//! banco ou tela acontece aqui; a consulta espacial entra pelo trait
//! [`FonteGeometrias`].

use std::collections::BTreeSet;

use geo::Coord;

use crate::notify::Nivel;

/// Botão do dispositivo apontador
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Botao {
    Esquerdo,
    Direito,
}

/// Teclas reconhecidas pela ferramenta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tecla {
    Escape,
    Enter,
}

/// Evento de entrada entregue à ferramenta
#[derive(Debug, Clone)]
pub enum EventoEntrada {
    CliquePressionado {
        pos: Coord<f64>,
        botao: Botao,
        ctrl: bool,
    },
    MovimentoCursor {
        pos: Coord<f64>,
    },
    TeclaPressionada(Tecla),
    /// A ferramenta deixou de ser a ativa
    Desativado,
}

/// Efeito produzido pela ferramenta, a ser aplicado pelo chamador
#[derive(Debug, Clone, PartialEq)]
pub enum Efeito {
    /// Conjunto corrente de quadras selecionadas mudou
    SelecaoAlterada(Vec<i64>),
    /// Texto da barra de status (vazio limpa a barra)
    StatusAtualizado(String),
    /// Vértices da prévia do polígono de busca (vazio apaga a prévia)
    PreviaAtualizada(Vec<Coord<f64>>),
    NotificacaoSolicitada {
        titulo: String,
        mensagem: String,
        nivel: Nivel,
        duracao_ms: u64,
        debounce_ms: u64,
    },
    /// Descarta notificações pendentes
    CancelarNotificacoes,
    /// Seleção confirmada pelo operador
    SelecaoConfirmada(Vec<i64>),
}

/// Consulta espacial usada pela ferramenta
pub trait FonteGeometrias {
    /// Quadra sob o ponto, se houver
    fn quadra_no_ponto(&self, pos: Coord<f64>) -> Option<i64>;

    /// Quadras que intersectam o polígono desenhado
    fn quadras_no_poligono(&self, vertices: &[Coord<f64>]) -> Vec<i64>;
}

/// Estado da ferramenta de seleção
#[derive(Debug, Default)]
pub struct FerramentaSelecao {
    pontos: Vec<Coord<f64>>,
    selecionadas: BTreeSet<i64>,
    primeira_selecao_ctrl: bool,
}

impl FerramentaSelecao {
    pub fn new() -> Self {
        Self {
            pontos: Vec::new(),
            selecionadas: BTreeSet::new(),
            primeira_selecao_ctrl: true,
        }
    }

    pub fn selecionadas(&self) -> Vec<i64> {
        self.selecionadas.iter().copied().collect()
    }

    /// Processa um evento e devolve os efeitos na ordem de aplicação
    pub fn handle(&mut self, evento: EventoEntrada, fonte: &dyn FonteGeometrias) -> Vec<Efeito> {
        match evento {
            EventoEntrada::CliquePressionado {
                pos,
                botao: Botao::Esquerdo,
                ctrl: false,
            } => self.adicionar_vertice(pos),
            EventoEntrada::CliquePressionado {
                pos,
                botao: Botao::Esquerdo,
                ctrl: true,
            } => self.alternar_quadra(pos, fonte),
            EventoEntrada::CliquePressionado {
                botao: Botao::Direito,
                ..
            } => self.finalizar_poligono(fonte),
            EventoEntrada::MovimentoCursor { pos } => self.previa_cursor(pos),
            EventoEntrada::TeclaPressionada(Tecla::Escape) => self.cancelar(),
            EventoEntrada::TeclaPressionada(Tecla::Enter) => self.confirmar(),
            EventoEntrada::Desativado => self.desativar(),
        }
    }

    fn adicionar_vertice(&mut self, pos: Coord<f64>) -> Vec<Efeito> {
        self.pontos.push(pos);
        let mut efeitos = vec![Efeito::PreviaAtualizada(self.pontos.clone())];

        if self.pontos.len() == 1 {
            efeitos.push(notificar(
                "Desenhando",
                "Continue clicando. Botão DIREITO finaliza.",
                Nivel::Info,
                2000,
                0,
            ));
        }

        efeitos.push(Efeito::StatusAtualizado(format!(
            "{} pontos | Botão DIREITO=finalizar | ENTER=confirmar",
            self.pontos.len()
        )));
        efeitos
    }

    fn alternar_quadra(&mut self, pos: Coord<f64>, fonte: &dyn FonteGeometrias) -> Vec<Efeito> {
        let Some(id) = fonte.quadra_no_ponto(pos) else {
            return vec![
                Efeito::CancelarNotificacoes,
                notificar(
                    "Nenhuma Quadra",
                    "Nenhuma quadra neste ponto",
                    Nivel::Aviso,
                    1500,
                    0,
                ),
            ];
        };

        let adicionada = self.selecionadas.insert(id);
        if !adicionada {
            self.selecionadas.remove(&id);
        }

        let mut efeitos = vec![Efeito::SelecaoAlterada(self.selecionadas())];

        if self.primeira_selecao_ctrl {
            self.primeira_selecao_ctrl = false;
            efeitos.push(notificar(
                "Seleção Individual",
                "CTRL+Clique adiciona/remove. ENTER finaliza.",
                Nivel::Info,
                2500,
                0,
            ));
        } else {
            let acao = if adicionada { "adicionada" } else { "removida" };
            efeitos.push(notificar(
                "Seleção Atualizada",
                format!("Quadra {}. Total: {}", acao, self.selecionadas.len()),
                Nivel::Info,
                1200,
                500,
            ));
        }

        efeitos.push(self.status_selecao());
        efeitos
    }

    fn finalizar_poligono(&mut self, fonte: &dyn FonteGeometrias) -> Vec<Efeito> {
        if self.pontos.len() < 3 {
            if self.pontos.is_empty() {
                return Vec::new();
            }
            self.pontos.clear();
            return vec![
                notificar(
                    "Polígono Inválido",
                    "Mínimo 3 pontos necessários.",
                    Nivel::Aviso,
                    2000,
                    0,
                ),
                Efeito::PreviaAtualizada(Vec::new()),
            ];
        }

        let encontradas = fonte.quadras_no_poligono(&self.pontos);
        let quantidade = encontradas.len();
        self.selecionadas.extend(encontradas);
        self.pontos.clear();

        let mut efeitos = vec![Efeito::SelecaoAlterada(self.selecionadas())];
        if quantidade > 0 {
            // conta as quadras alcançadas pelo polígono, já selecionadas
            // ou não
            efeitos.push(notificar(
                "Seleção Concluída",
                format!("{quantidade} quadra(s) selecionadas. ENTER confirma."),
                Nivel::Info,
                5000,
                0,
            ));
        }
        efeitos.push(self.status_selecao());
        efeitos.push(Efeito::PreviaAtualizada(Vec::new()));
        efeitos
    }

    fn previa_cursor(&self, pos: Coord<f64>) -> Vec<Efeito> {
        if self.pontos.is_empty() {
            return Vec::new();
        }
        let mut vertices = self.pontos.clone();
        vertices.push(pos);
        vec![Efeito::PreviaAtualizada(vertices)]
    }

    fn cancelar(&mut self) -> Vec<Efeito> {
        self.pontos.clear();
        self.selecionadas.clear();
        vec![
            Efeito::PreviaAtualizada(Vec::new()),
            Efeito::SelecaoAlterada(Vec::new()),
            notificar("Cancelado", "Polígono e seleção limpos", Nivel::Info, 1200, 1000),
            self.status_selecao(),
        ]
    }

    fn confirmar(&mut self) -> Vec<Efeito> {
        self.pontos.clear();
        let ids = self.selecionadas();

        let aviso = if ids.is_empty() {
            notificar("Aviso", "Nenhuma quadra selecionada", Nivel::Aviso, 2000, 0)
        } else {
            notificar(
                "Seleção Confirmada",
                format!("{} quadra(s) selecionada(s)", ids.len()),
                Nivel::Sucesso,
                3000,
                0,
            )
        };

        vec![
            Efeito::CancelarNotificacoes,
            Efeito::PreviaAtualizada(Vec::new()),
            Efeito::SelecaoConfirmada(ids),
            aviso,
        ]
    }

    fn desativar(&mut self) -> Vec<Efeito> {
        self.pontos.clear();
        vec![
            Efeito::CancelarNotificacoes,
            Efeito::PreviaAtualizada(Vec::new()),
            Efeito::StatusAtualizado(String::new()),
        ]
    }

    fn status_selecao(&self) -> Efeito {
        if self.selecionadas.is_empty() {
            return Efeito::StatusAtualizado("Nenhuma quadra selecionada".to_string());
        }
        Efeito::StatusAtualizado(format!(
            "{} selecionada(s) | Clique=polígono | CTRL+Clique=individual | ENTER=confirmar",
            self.selecionadas.len()
        ))
    }
}

fn notificar(
    titulo: &str,
    mensagem: impl Into<String>,
    nivel: Nivel,
    duracao_ms: u64,
    debounce_ms: u64,
) -> Efeito {
    Efeito::NotificacaoSolicitada {
        titulo: titulo.to_string(),
        mensagem: mensagem.into(),
        nivel,
        duracao_ms,
        debounce_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Duas quadras fixas: id 1 cobre x < 10, id 2 cobre x >= 10
    struct FonteFixa;

    impl FonteGeometrias for FonteFixa {
        fn quadra_no_ponto(&self, pos: Coord<f64>) -> Option<i64> {
            if pos.y < 0.0 {
                None
            } else if pos.x < 10.0 {
                Some(1)
            } else {
                Some(2)
            }
        }

        fn quadras_no_poligono(&self, vertices: &[Coord<f64>]) -> Vec<i64> {
            let mut ids = Vec::new();
            if vertices.iter().any(|c| c.x < 10.0) {
                ids.push(1);
            }
            if vertices.iter().any(|c| c.x >= 10.0) {
                ids.push(2);
            }
            ids
        }
    }

    fn clique(x: f64, y: f64) -> EventoEntrada {
        EventoEntrada::CliquePressionado {
            pos: Coord { x, y },
            botao: Botao::Esquerdo,
            ctrl: false,
        }
    }

    fn ctrl_clique(x: f64, y: f64) -> EventoEntrada {
        EventoEntrada::CliquePressionado {
            pos: Coord { x, y },
            botao: Botao::Esquerdo,
            ctrl: true,
        }
    }

    fn direito() -> EventoEntrada {
        EventoEntrada::CliquePressionado {
            pos: Coord { x: 0.0, y: 0.0 },
            botao: Botao::Direito,
            ctrl: false,
        }
    }

    fn titulos(efeitos: &[Efeito]) -> Vec<&str> {
        efeitos
            .iter()
            .filter_map(|e| match e {
                Efeito::NotificacaoSolicitada { titulo, .. } => Some(titulo.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_primeiro_vertice_orienta_desenho() {
        let mut tool = FerramentaSelecao::new();
        let efeitos = tool.handle(clique(1.0, 1.0), &FonteFixa);
        assert_eq!(titulos(&efeitos), vec!["Desenhando"]);
        assert!(efeitos
            .iter()
            .any(|e| matches!(e, Efeito::StatusAtualizado(s) if s.starts_with("1 pontos"))));
    }

    #[test]
    fn test_finalizar_com_dois_pontos_rejeita() {
        let mut tool = FerramentaSelecao::new();
        tool.handle(clique(1.0, 1.0), &FonteFixa);
        tool.handle(clique(2.0, 1.0), &FonteFixa);
        let efeitos = tool.handle(direito(), &FonteFixa);

        assert_eq!(titulos(&efeitos), vec!["Polígono Inválido"]);
        // prévia apagada, seleção intocada
        assert!(efeitos.contains(&Efeito::PreviaAtualizada(Vec::new())));
        assert!(!efeitos.iter().any(|e| matches!(e, Efeito::SelecaoAlterada(_))));
        assert!(tool.selecionadas().is_empty());
    }

    #[test]
    fn test_finalizar_sem_pontos_nao_faz_nada() {
        let mut tool = FerramentaSelecao::new();
        assert!(tool.handle(direito(), &FonteFixa).is_empty());
    }

    #[test]
    fn test_poligono_acrescenta_a_selecao() {
        let mut tool = FerramentaSelecao::new();
        tool.handle(ctrl_clique(15.0, 1.0), &FonteFixa);

        tool.handle(clique(1.0, 1.0), &FonteFixa);
        tool.handle(clique(2.0, 1.0), &FonteFixa);
        tool.handle(clique(2.0, 2.0), &FonteFixa);
        let efeitos = tool.handle(direito(), &FonteFixa);

        // a quadra 2 já selecionada permanece, a 1 entra
        assert_eq!(tool.selecionadas(), vec![1, 2]);
        assert!(titulos(&efeitos).contains(&"Seleção Concluída"));
    }

    #[test]
    fn test_ctrl_clique_alterna() {
        let mut tool = FerramentaSelecao::new();

        let efeitos = tool.handle(ctrl_clique(1.0, 1.0), &FonteFixa);
        assert_eq!(tool.selecionadas(), vec![1]);
        assert_eq!(titulos(&efeitos), vec!["Seleção Individual"]);

        let efeitos = tool.handle(ctrl_clique(1.0, 1.0), &FonteFixa);
        assert!(tool.selecionadas().is_empty());
        assert_eq!(titulos(&efeitos), vec!["Seleção Atualizada"]);
        assert!(efeitos.iter().any(|e| matches!(
            e,
            Efeito::NotificacaoSolicitada { mensagem, debounce_ms: 500, .. }
                if mensagem == "Quadra removida. Total: 0"
        )));
    }

    #[test]
    fn test_ctrl_clique_fora_avisa() {
        let mut tool = FerramentaSelecao::new();
        let efeitos = tool.handle(ctrl_clique(1.0, -5.0), &FonteFixa);
        assert_eq!(efeitos[0], Efeito::CancelarNotificacoes);
        assert_eq!(titulos(&efeitos), vec!["Nenhuma Quadra"]);
        assert!(tool.selecionadas().is_empty());
    }

    #[test]
    fn test_escape_limpa_tudo() {
        let mut tool = FerramentaSelecao::new();
        tool.handle(ctrl_clique(1.0, 1.0), &FonteFixa);
        tool.handle(clique(5.0, 5.0), &FonteFixa);

        let efeitos = tool.handle(EventoEntrada::TeclaPressionada(Tecla::Escape), &FonteFixa);
        assert!(tool.selecionadas().is_empty());
        assert!(efeitos.contains(&Efeito::PreviaAtualizada(Vec::new())));
        assert!(efeitos.contains(&Efeito::SelecaoAlterada(Vec::new())));
        assert_eq!(titulos(&efeitos), vec!["Cancelado"]);
    }

    #[test]
    fn test_escape_apos_poligono_informa_selecao_vazia() {
        let mut tool = FerramentaSelecao::new();
        tool.handle(clique(1.0, 1.0), &FonteFixa);
        tool.handle(clique(12.0, 1.0), &FonteFixa);
        tool.handle(clique(12.0, 5.0), &FonteFixa);
        tool.handle(direito(), &FonteFixa);
        assert_eq!(tool.selecionadas(), vec![1, 2]);

        let efeitos = tool.handle(EventoEntrada::TeclaPressionada(Tecla::Escape), &FonteFixa);
        assert!(tool.selecionadas().is_empty());
        assert!(efeitos.contains(&Efeito::StatusAtualizado(
            "Nenhuma quadra selecionada".to_string()
        )));
    }

    #[test]
    fn test_enter_confirma_selecao() {
        let mut tool = FerramentaSelecao::new();
        tool.handle(ctrl_clique(1.0, 1.0), &FonteFixa);

        let efeitos = tool.handle(EventoEntrada::TeclaPressionada(Tecla::Enter), &FonteFixa);
        assert_eq!(efeitos[0], Efeito::CancelarNotificacoes);
        assert!(efeitos.contains(&Efeito::SelecaoConfirmada(vec![1])));
        assert_eq!(titulos(&efeitos), vec!["Seleção Confirmada"]);
    }

    #[test]
    fn test_enter_sem_selecao_avisa() {
        let mut tool = FerramentaSelecao::new();
        let efeitos = tool.handle(EventoEntrada::TeclaPressionada(Tecla::Enter), &FonteFixa);
        assert!(efeitos.contains(&Efeito::SelecaoConfirmada(Vec::new())));
        assert_eq!(titulos(&efeitos), vec!["Aviso"]);
    }

    #[test]
    fn test_desativar_limpa_status() {
        let mut tool = FerramentaSelecao::new();
        tool.handle(clique(1.0, 1.0), &FonteFixa);
        let efeitos = tool.handle(EventoEntrada::Desativado, &FonteFixa);
        assert!(efeitos.contains(&Efeito::StatusAtualizado(String::new())));
        assert!(efeitos.contains(&Efeito::PreviaAtualizada(Vec::new())));
    }

    #[test]
    fn test_movimento_segue_cursor() {
        let mut tool = FerramentaSelecao::new();
        assert!(tool
            .handle(EventoEntrada::MovimentoCursor { pos: Coord { x: 1.0, y: 1.0 } }, &FonteFixa)
            .is_empty());

        tool.handle(clique(0.0, 0.0), &FonteFixa);
        let efeitos = tool.handle(
            EventoEntrada::MovimentoCursor { pos: Coord { x: 3.0, y: 4.0 } },
            &FonteFixa,
        );
        assert_eq!(
            efeitos,
            vec![Efeito::PreviaAtualizada(vec![
                Coord { x: 0.0, y: 0.0 },
                Coord { x: 3.0, y: 4.0 },
            ])]
        );
    }
}
