//! Fluxos em lote: geração e remoção de lotes
//!
//! Orquestra o pipeline de corte e o armazenamento quadra a quadra,
//! acumulando o relatório e pedindo notificações ao operador.

use anyhow::Result;
use geoproc::{Feature, GeometryOps, Layer};
use tracing::{info, warn};

use crate::config::Config;
use crate::notify::{FilaAvisos, Nivel, Notificacao};
use crate::pipeline::{CutPipeline, Operador};
use crate::report::{BatchKind, BatchReport, BatchReportBuilder};
use crate::storage::{LoteNovo, LoteStorage};
use crate::validation::{self, ResultadoGeracao, ResultadoRemocao};

/// Inscrição exibida nos relatórios: atributo `ins_quadra` ou o id
fn inscricao_da_quadra(quadra: &Feature, id: i64) -> String {
    match quadra.attribute("ins_quadra") {
        Some(valor) if !valor.is_null() => valor
            .as_i64()
            .map(|v| v.to_string())
            .or_else(|| valor.as_text().map(str::to_string))
            .unwrap_or_else(|| format!("ID {id}")),
        _ => format!("ID {id}"),
    }
}

fn id_da_quadra(quadra: &Feature) -> i64 {
    quadra
        .attribute("id")
        .and_then(|v| v.as_i64())
        .unwrap_or_default()
}

/// Converte a camada final do pipeline em lotes para inserção
fn lotes_da_camada(camada: &Layer) -> Vec<LoteNovo> {
    camada
        .features
        .iter()
        .map(|feature| {
            let inteiro = |nome: &str| feature.attribute(nome).and_then(|v| v.as_i64());
            let texto = |nome: &str| {
                feature
                    .attribute(nome)
                    .and_then(|v| v.as_text())
                    .unwrap_or_default()
                    .to_string()
            };
            LoteNovo {
                geometria: feature.geometry.clone(),
                id_localidade: inteiro("id_localidade"),
                id_setor: inteiro("id_setor"),
                id_bairro: inteiro("id_bairro"),
                id_quadra: inteiro("id_quadra"),
                ins_quadra: inteiro("ins_quadra"),
                sit_imovel: texto("sit_imovel"),
                usuario: texto("usuario"),
                data_atual: texto("data_atual"),
            }
        })
        .collect()
}

fn avisar_selecao_vazia(avisos: &mut FilaAvisos) {
    avisos.solicitar(
        Notificacao::new(
            "Aviso",
            "Selecione ao menos uma quadra!",
            Nivel::Aviso,
            2000,
        ),
        0,
    );
}

/// Gera lotes para as quadras selecionadas
pub async fn gerar_lotes<S, G>(
    storage: &S,
    ops: &G,
    config: &Config,
    operador: &Operador,
    data_atual: &str,
    ids: &[i64],
    avisos: &mut FilaAvisos,
) -> Result<BatchReport>
where
    S: LoteStorage,
    G: GeometryOps,
{
    let mut builder = BatchReportBuilder::new(BatchKind::Geracao);

    if ids.is_empty() {
        avisar_selecao_vazia(avisos);
        return Ok(builder.finish());
    }

    let pipeline = CutPipeline::new(config.clone());
    let quadras = storage.carregar_quadras(ids).await?;
    if quadras.is_empty() {
        warn!(camada = %config.camadas.quadra, "Camada de quadras sem feições para os ids pedidos");
        avisos.solicitar(
            Notificacao::new(
                "Aviso",
                format!("Camada '{}' não encontrada", config.camadas.quadra),
                Nivel::Aviso,
                2000,
            ),
            0,
        );
        return Ok(builder.finish());
    }

    let linhas = storage.carregar_linhas_corte().await?;
    if linhas.is_empty() {
        warn!(camada = %config.camadas.linhas_corte, "Camada de linhas de corte vazia");
        avisos.solicitar(
            Notificacao::new(
                "Erro",
                format!("Camada '{}' não encontrada!", config.camadas.linhas_corte),
                Nivel::Erro,
                2000,
            ),
            0,
        );
        return Ok(builder.finish());
    }

    info!(
        quadras = quadras.len(),
        linhas = linhas.len(),
        "Iniciando geração de lotes"
    );

    for quadra in &quadras.features {
        let id = id_da_quadra(quadra);
        let inscricao = inscricao_da_quadra(quadra, id);

        let mut camada_quadra = Layer::new(quadras.epsg);
        camada_quadra.push(quadra.clone());
        camada_quadra.selected.insert(0);

        let resultado: Result<(usize, u64)> = async {
            let corte = pipeline.executar(ops, &camada_quadra, &linhas, operador, data_atual)?;
            let lotes = lotes_da_camada(&corte.lotes);
            let inseridos = if lotes.is_empty() {
                0
            } else {
                storage.inserir_lotes(&lotes).await?
            };
            Ok((corte.linhas_corte, inseridos))
        }
        .await;

        match resultado {
            Ok((linhas_corte, inseridos)) => {
                match validation::classificar_geracao(linhas_corte, inseridos as usize) {
                    ResultadoGeracao::Gerada { lotes } => {
                        info!(quadra = %inscricao, lotes, "Quadra processada");
                        builder.record_processada(inscricao, id, lotes as u64);
                    }
                    ResultadoGeracao::Ignorada { motivo } => {
                        warn!(quadra = %inscricao, motivo = %motivo, "Quadra ignorada");
                        builder.record_ignorada(inscricao, id, motivo);
                    }
                }
            }
            Err(erro) => {
                let motivo = validation::motivo_erro(&erro);
                warn!(quadra = %inscricao, motivo = %motivo, "Falha ao processar quadra");
                builder.record_ignorada(inscricao, id, motivo);
            }
        }
    }

    let report = builder.finish();
    if report.total_lotes > 0 {
        avisos.solicitar(
            Notificacao::new("Concluído", report.resumo(), Nivel::Sucesso, 5000),
            0,
        );
    }
    Ok(report)
}

/// Remove os lotes das quadras selecionadas
pub async fn remover_lotes<S>(
    storage: &S,
    ids: &[i64],
    avisos: &mut FilaAvisos,
) -> Result<BatchReport>
where
    S: LoteStorage,
{
    let mut builder = BatchReportBuilder::new(BatchKind::Remocao);

    if ids.is_empty() {
        avisar_selecao_vazia(avisos);
        return Ok(builder.finish());
    }

    let quadras = storage.carregar_quadras(ids).await?;
    info!(quadras = ids.len(), "Iniciando remoção de lotes");

    for id in ids {
        let inscricao = quadras
            .features
            .iter()
            .find(|q| id_da_quadra(q) == *id)
            .map(|q| inscricao_da_quadra(q, *id))
            .unwrap_or_else(|| format!("ID {id}"));

        match storage.remover_lotes(*id).await {
            Ok(contagem) => {
                match validation::classificar_remocao(contagem.encontrados, contagem.restantes) {
                    ResultadoRemocao::Removida { lotes } => {
                        info!(quadra = %inscricao, lotes, "Lotes removidos");
                        builder.record_processada(inscricao, *id, lotes);
                    }
                    ResultadoRemocao::SemLotes => {
                        builder.record_ignorada(
                            inscricao,
                            *id,
                            validation::MOTIVO_SEM_LOTES.to_string(),
                        );
                    }
                    ResultadoRemocao::Parcial {
                        removidos,
                        restantes,
                    } => {
                        // a remoção parcial conta nas duas listas
                        warn!(quadra = %inscricao, removidos, restantes, "Remoção parcial");
                        if removidos > 0 {
                            builder.record_processada(inscricao.clone(), *id, removidos);
                        }
                        builder.record_ignorada(
                            inscricao,
                            *id,
                            format!("Remoção parcial: {restantes} lote(s) permaneceram"),
                        );
                    }
                }
            }
            Err(erro) => {
                let motivo = validation::motivo_erro(&erro);
                warn!(quadra = %inscricao, motivo = %motivo, "Falha ao remover lotes");
                builder.record_ignorada(inscricao, *id, motivo);
            }
        }
    }

    let report = builder.finish();
    if report.total_lotes > 0 {
        avisos.solicitar(
            Notificacao::new("Concluído", report.resumo(), Nivel::Sucesso, 5000),
            0,
        );
    }
    Ok(report)
}
