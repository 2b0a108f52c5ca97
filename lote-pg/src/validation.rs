//! Classificação dos resultados por quadra
//!
//! Regras que decidem se uma quadra conta como processada ou ignorada,
//! tanto na geração quanto na remoção de lotes.

/// Quadra sem nenhuma linha de corte intersectante
pub const MOTIVO_SEM_LINHAS: &str = "Sem linhas de corte";

/// Linhas presentes, mas nenhum lote válido resultou do corte
pub const MOTIVO_SEM_BORDA: &str = "Linhas não alcançam a borda";

/// Remoção pedida para quadra sem lotes cadastrados
pub const MOTIVO_SEM_LOTES: &str = "Nenhum lote encontrado";

/// Resultado da geração para uma quadra
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultadoGeracao {
    /// Lotes válidos gerados
    Gerada { lotes: usize },
    /// Nenhum lote; o motivo vai ao relatório
    Ignorada { motivo: String },
}

/// Resultado da remoção para uma quadra
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultadoRemocao {
    /// Todos os lotes encontrados foram removidos
    Removida { lotes: u64 },
    /// A quadra não tinha lotes
    SemLotes,
    /// Parte dos lotes permaneceu após a remoção
    Parcial { removidos: u64, restantes: u64 },
}

/// Classifica uma quadra após a execução do pipeline de corte
pub fn classificar_geracao(linhas_corte: usize, lotes_gerados: usize) -> ResultadoGeracao {
    if linhas_corte == 0 {
        ResultadoGeracao::Ignorada {
            motivo: MOTIVO_SEM_LINHAS.to_string(),
        }
    } else if lotes_gerados == 0 {
        ResultadoGeracao::Ignorada {
            motivo: MOTIVO_SEM_BORDA.to_string(),
        }
    } else {
        ResultadoGeracao::Gerada {
            lotes: lotes_gerados,
        }
    }
}

/// Classifica uma quadra após a remoção de lotes
pub fn classificar_remocao(encontrados: u64, restantes: u64) -> ResultadoRemocao {
    if encontrados == 0 {
        ResultadoRemocao::SemLotes
    } else if restantes == 0 {
        ResultadoRemocao::Removida { lotes: encontrados }
    } else {
        ResultadoRemocao::Parcial {
            removidos: encontrados.saturating_sub(restantes),
            restantes,
        }
    }
}

/// Motivo de ignorar por falha: prefixo fixo mais os primeiros 50
/// caracteres da mensagem de erro
pub fn motivo_erro(erro: &anyhow::Error) -> String {
    let texto = erro.to_string();
    let corte: String = texto.chars().take(50).collect();
    format!("Erro: {corte}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geracao_sem_linhas() {
        assert_eq!(
            classificar_geracao(0, 0),
            ResultadoGeracao::Ignorada {
                motivo: MOTIVO_SEM_LINHAS.to_string()
            }
        );
    }

    #[test]
    fn test_geracao_linhas_sem_lotes() {
        assert_eq!(
            classificar_geracao(2, 0),
            ResultadoGeracao::Ignorada {
                motivo: MOTIVO_SEM_BORDA.to_string()
            }
        );
    }

    #[test]
    fn test_geracao_com_lotes() {
        assert_eq!(
            classificar_geracao(1, 4),
            ResultadoGeracao::Gerada { lotes: 4 }
        );
    }

    #[test]
    fn test_remocao_completa() {
        assert_eq!(
            classificar_remocao(3, 0),
            ResultadoRemocao::Removida { lotes: 3 }
        );
    }

    #[test]
    fn test_remocao_sem_lotes() {
        assert_eq!(classificar_remocao(0, 0), ResultadoRemocao::SemLotes);
    }

    #[test]
    fn test_remocao_parcial() {
        assert_eq!(
            classificar_remocao(5, 2),
            ResultadoRemocao::Parcial {
                removidos: 3,
                restantes: 2
            }
        );
    }

    #[test]
    fn test_motivo_erro_truncado_em_50() {
        let longo = "x".repeat(80);
        let erro = anyhow::anyhow!(longo);
        let motivo = motivo_erro(&erro);
        assert_eq!(motivo, format!("Erro: {}", "x".repeat(50)));
    }

    #[test]
    fn test_motivo_erro_curto_integral() {
        let erro = anyhow::anyhow!("conexão recusada");
        assert_eq!(motivo_erro(&erro), "Erro: conexão recusada");
    }
}
