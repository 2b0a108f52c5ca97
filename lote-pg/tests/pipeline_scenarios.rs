//! Cenários ponta a ponta da geração e remoção de lotes
//!
//! Três quadras lado a lado: uma cortada ao meio por uma linha, uma sem
//! linha alguma e uma com linha interna que não alcança a borda.

use std::sync::Mutex;

use geo::{Geometry, LineString, Polygon};
use geoproc::{
    Feature, GeoProcError, GeometryOps, Layer, OpOutput, Params, Processor, Value,
};
use lote_pg::config::Config;
use lote_pg::display::MemoryDisplay;
use lote_pg::notify::FilaAvisos;
use lote_pg::pipeline::Operador;
use lote_pg::report::BatchCategory;
use lote_pg::storage::memory::MemoryStorage;
use lote_pg::validation::{MOTIVO_SEM_BORDA, MOTIVO_SEM_LINHAS, MOTIVO_SEM_LOTES};
use lote_pg::{gerar_lotes, remover_lotes};

fn quadra(id: i64, ins: i64, x0: f64) -> Feature {
    let contorno = Polygon::new(
        LineString::from(vec![
            (x0, 0.0),
            (x0 + 100.0, 0.0),
            (x0 + 100.0, 100.0),
            (x0, 100.0),
            (x0, 0.0),
        ]),
        vec![],
    );
    Feature::new(Geometry::Polygon(contorno))
        .with_attribute("id", Value::Int(id))
        .with_attribute("ins_quadra", Value::Int(ins))
        .with_attribute("id_localidade", Value::Int(2))
        .with_attribute("id_setor", Value::Int(3))
        .with_attribute("id_bairro", Value::Int(4))
}

fn linha(x0: f64, x1: f64, y: f64) -> Feature {
    Feature::new(Geometry::LineString(LineString::from(vec![
        (x0, y),
        (x1, y),
    ])))
}

/// Quadra 1 em [0,100], quadra 2 em [200,300], quadra 3 em [400,500].
/// A linha da quadra 1 quase toca as bordas (a extensão de 0.3 fecha o
/// corte); a da quadra 3 fica no interior e não corta nada.
fn storage_cenario() -> MemoryStorage {
    let mut quadras = Layer::new(Some(31984));
    quadras.push(quadra(1, 101, 0.0));
    quadras.push(quadra(2, 102, 200.0));
    quadras.push(quadra(3, 103, 400.0));

    let mut linhas = Layer::new(Some(31984));
    linhas.push(linha(0.1, 99.9, 50.0));
    linhas.push(linha(420.0, 480.0, 50.0));

    MemoryStorage::new(quadras, linhas)
}

fn operador() -> Operador {
    Operador {
        conta: "jsilva".into(),
        nome: "João Silva".into(),
    }
}

#[tokio::test]
async fn test_geracao_classifica_as_tres_quadras() {
    let storage = storage_cenario();
    let config = Config::padrao().unwrap();
    let mut avisos = FilaAvisos::new();

    let report = gerar_lotes(
        &storage,
        &Processor,
        &config,
        &operador(),
        "2026-08-24",
        &[1, 2, 3],
        &mut avisos,
    )
    .await
    .unwrap();

    assert_eq!(report.category, BatchCategory::Parcial);
    assert_eq!(report.total_lotes, 2);

    assert_eq!(report.processadas.len(), 1);
    assert_eq!(report.processadas[0].inscricao, "101");
    assert_eq!(report.processadas[0].lotes, 2);

    assert_eq!(report.ignoradas.len(), 2);
    assert_eq!(report.ignoradas[0].inscricao, "102");
    assert_eq!(report.ignoradas[0].motivo, MOTIVO_SEM_LINHAS);
    assert_eq!(report.ignoradas[1].inscricao, "103");
    assert_eq!(report.ignoradas[1].motivo, MOTIVO_SEM_BORDA);

    let texto = report.render();
    assert!(texto.contains("1 QUADRA(S) PROCESSADA(S):"));
    assert!(texto.contains("TOTAL: 2 lotes gerados"));
    assert!(texto.contains("2 QUADRA(S) IGNORADA(S):"));
}

#[tokio::test]
async fn test_lotes_inseridos_herdam_atributos_da_quadra() {
    let storage = storage_cenario();
    let config = Config::padrao().unwrap();
    let mut avisos = FilaAvisos::new();

    gerar_lotes(
        &storage,
        &Processor,
        &config,
        &operador(),
        "2026-08-24",
        &[1],
        &mut avisos,
    )
    .await
    .unwrap();

    let inseridos = storage.lotes_inseridos();
    assert_eq!(inseridos.len(), 2);
    for lote in &inseridos {
        assert_eq!(lote.id_quadra, Some(1));
        assert_eq!(lote.ins_quadra, Some(101));
        assert_eq!(lote.id_localidade, Some(2));
        assert_eq!(lote.id_setor, Some(3));
        assert_eq!(lote.id_bairro, Some(4));
        assert_eq!(lote.sit_imovel, "Habitado");
        assert_eq!(lote.usuario, "jsilva - João Silva");
        assert_eq!(lote.data_atual, "2026-08-24");
    }
}

/// Registra as operações executadas, na ordem
struct ContadorOps {
    chamadas: Mutex<Vec<String>>,
}

impl ContadorOps {
    fn new() -> Self {
        Self {
            chamadas: Mutex::new(Vec::new()),
        }
    }
}

impl GeometryOps for ContadorOps {
    fn run(&self, operation: &str, params: Params) -> Result<OpOutput, GeoProcError> {
        self.chamadas
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(operation.to_string());
        Processor.run(operation, params)
    }
}

#[tokio::test]
async fn test_quadra_sem_linhas_interrompe_o_pipeline() {
    let storage = storage_cenario();
    let config = Config::padrao().unwrap();
    let ops = ContadorOps::new();
    let mut avisos = FilaAvisos::new();

    gerar_lotes(
        &storage,
        &ops,
        &config,
        &operador(),
        "2026-08-24",
        &[2],
        &mut avisos,
    )
    .await
    .unwrap();

    let chamadas = ops.chamadas.lock().unwrap_or_else(|e| e.into_inner());
    assert_eq!(
        *chamadas,
        vec![
            "native:saveselectedfeatures".to_string(),
            "native:extractbylocation".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_selecao_vazia_gera_aviso() {
    let storage = storage_cenario();
    let config = Config::padrao().unwrap();
    let mut avisos = FilaAvisos::new();

    let report = gerar_lotes(
        &storage,
        &Processor,
        &config,
        &operador(),
        "2026-08-24",
        &[],
        &mut avisos,
    )
    .await
    .unwrap();

    assert_eq!(report.category, BatchCategory::Aviso);

    let mut display = MemoryDisplay::default();
    avisos.drenar(&mut display).await;
    assert!(display
        .notificacoes
        .iter()
        .any(|n| n.mensagem == "Selecione ao menos uma quadra!"));
}

#[tokio::test]
async fn test_camada_de_linhas_vazia_aborta_a_geracao() {
    let mut quadras = Layer::new(Some(31984));
    quadras.push(quadra(1, 101, 0.0));
    let storage = MemoryStorage::new(quadras, Layer::new(Some(31984)));
    let config = Config::padrao().unwrap();
    let mut avisos = FilaAvisos::new();

    let report = gerar_lotes(
        &storage,
        &Processor,
        &config,
        &operador(),
        "2026-08-24",
        &[1],
        &mut avisos,
    )
    .await
    .unwrap();

    assert!(report.processadas.is_empty());
    assert!(report.ignoradas.is_empty());

    let mut display = MemoryDisplay::default();
    avisos.drenar(&mut display).await;
    assert!(display
        .notificacoes
        .iter()
        .any(|n| n.mensagem == "Camada 'Linhas_corte' não encontrada!"));
}

#[tokio::test]
async fn test_ids_sem_quadra_avisam_a_camada_configurada() {
    let storage = MemoryStorage::default();
    let config = Config::padrao().unwrap();
    let mut avisos = FilaAvisos::new();

    let report = gerar_lotes(
        &storage,
        &Processor,
        &config,
        &operador(),
        "2026-08-24",
        &[99],
        &mut avisos,
    )
    .await
    .unwrap();

    assert_eq!(report.category, BatchCategory::Aviso);

    let mut display = MemoryDisplay::default();
    avisos.drenar(&mut display).await;
    assert!(display
        .notificacoes
        .iter()
        .any(|n| n.mensagem == "Camada 'Quadra' não encontrada"));
}

#[tokio::test]
async fn test_remocao_limpa_parcial_e_vazia() {
    // quadra 1 com 3 lotes (ids 1..3), quadra 5 com 4 lotes (ids 4..7)
    let storage = MemoryStorage::default()
        .com_lotes_existentes(1, 3)
        .com_lotes_existentes(5, 4)
        .reter_lote(4);
    let mut avisos = FilaAvisos::new();

    let report = remover_lotes(&storage, &[1, 2, 5], &mut avisos).await.unwrap();

    // remoção completa da quadra 1
    assert_eq!(report.processadas[0].inscricao, "ID 1");
    assert_eq!(report.processadas[0].lotes, 3);

    // quadra 2 não tinha lotes
    assert_eq!(report.ignoradas[0].motivo, MOTIVO_SEM_LOTES);

    // a remoção parcial da quadra 5 conta nas duas listas
    assert_eq!(report.processadas[1].lotes, 3);
    assert_eq!(
        report.ignoradas[1].motivo,
        "Remoção parcial: 1 lote(s) permaneceram"
    );

    assert_eq!(report.total_lotes, 6);
    let texto = report.render();
    assert!(texto.starts_with("RELATÓRIO DE REMOÇÃO DE LOTES"));
    assert!(texto.contains("TOTAL: 6 lotes removidos"));
    assert!(texto.contains("Total de quadras processadas: 4"));
}
