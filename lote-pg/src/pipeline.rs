//! Pipeline de corte de quadras
//!
//! Cadeia fixa de 16 operações de geoprocessamento, expressa como uma lista
//! de estágios nomeados. Cada estágio referencia as saídas anteriores pelo
//! nome, o que permite validar o encadeamento antes de executar qualquer
//! geometria.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use geoproc::{
    FieldMapping, FieldType, GeoProcError, GeometryOps, Layer, MappingExpr, ParamValue, Params,
};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

/// Estágio cuja saída vazia interrompe o pipeline (quadra sem linhas de corte)
pub const ESTAGIO_CORTE: &str = "linhas_dentro_quadra";

/// Estágio final, cuja saída são os lotes prontos para inserção
pub const ESTAGIO_FINAL: &str = "editar_campos";

/// Identificação do operador que executa o corte
#[derive(Debug, Clone)]
pub struct Operador {
    pub conta: String,
    pub nome: String,
}

impl Operador {
    /// Forma gravada no campo `usuario` dos lotes: `conta - nome`
    pub fn identificacao(&self) -> String {
        format!("{} - {}", self.conta, self.nome)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Estágio '{estagio}' referencia saída desconhecida '{referencia}'")]
    ReferenciaDesconhecida {
        estagio: &'static str,
        referencia: &'static str,
    },

    #[error("Nome de estágio duplicado: '{0}'")]
    EstagioDuplicado(&'static str),

    #[error(transparent)]
    Operacao(#[from] GeoProcError),
}

/// Referência de camada usada como entrada de um estágio
#[derive(Debug, Clone, Copy)]
pub enum RefCamada {
    /// Camada de quadras fornecida ao pipeline
    Quadra,
    /// Camada de linhas de corte fornecida ao pipeline
    LinhasCorte,
    /// Saída de um estágio anterior
    Estagio(&'static str),
}

/// Parâmetro escalar de um estágio
#[derive(Debug, Clone)]
pub enum ParametroEstagio {
    Numero(f64),
    Texto(String),
    Logico(bool),
    Textos(Vec<String>),
    /// `FIELDS_MAPPING` do estágio final, montado na execução com a camada
    /// de quadras selecionadas e a identidade do operador
    MapeamentoFinal,
}

/// Um estágio do pipeline
#[derive(Debug, Clone)]
pub struct Estagio {
    pub nome: &'static str,
    pub operacao: &'static str,
    /// Entradas de camada: chave de parâmetro e referências (lista quando
    /// a operação recebe várias camadas, como `LAYERS`)
    pub camadas: Vec<(&'static str, Vec<RefCamada>)>,
    pub parametros: Vec<(&'static str, ParametroEstagio)>,
}

/// Resultado da execução para uma quadra
#[derive(Debug)]
pub struct CutRun {
    /// Linhas de corte que intersectam a quadra
    pub linhas_corte: usize,
    /// Lotes válidos com o esquema final de campos
    pub lotes: Layer,
}

/// Pipeline de corte parametrizado pela configuração
#[derive(Debug, Clone)]
pub struct CutPipeline {
    config: Config,
}

impl CutPipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Os 16 estágios, na ordem de execução
    pub fn plano(&self) -> Vec<Estagio> {
        let t = &self.config.tolerancias;
        let filtro_area = format!(
            "\"area_lote\" < (\"area_quadra\" * {})",
            self.config.fracao_area_maxima
        );

        vec![
            Estagio {
                nome: "extrair_feicoes",
                operacao: "native:saveselectedfeatures",
                camadas: vec![("INPUT", vec![RefCamada::Quadra])],
                parametros: vec![],
            },
            Estagio {
                nome: ESTAGIO_CORTE,
                operacao: "native:extractbylocation",
                camadas: vec![
                    ("INPUT", vec![RefCamada::LinhasCorte]),
                    ("INTERSECT", vec![RefCamada::Estagio("extrair_feicoes")]),
                ],
                parametros: vec![("PREDICATE", ParametroEstagio::Numero(0.0))],
            },
            Estagio {
                nome: "estender_linhas",
                operacao: "native:extendlines",
                camadas: vec![("INPUT", vec![RefCamada::Estagio(ESTAGIO_CORTE)])],
                parametros: vec![
                    ("START_DISTANCE", ParametroEstagio::Numero(t.extensao_linha)),
                    ("END_DISTANCE", ParametroEstagio::Numero(t.extensao_linha)),
                ],
            },
            Estagio {
                nome: "poligonos_para_linhas",
                operacao: "native:polygonstolines",
                camadas: vec![("INPUT", vec![RefCamada::Estagio("extrair_feicoes")])],
                parametros: vec![],
            },
            Estagio {
                nome: "mesclar_camadas",
                operacao: "native:mergevectorlayers",
                camadas: vec![(
                    "LAYERS",
                    vec![
                        RefCamada::Estagio("estender_linhas"),
                        RefCamada::Estagio("poligonos_para_linhas"),
                    ],
                )],
                parametros: vec![],
            },
            Estagio {
                nome: "simplificar",
                operacao: "native:simplifygeometries",
                camadas: vec![("INPUT", vec![RefCamada::Estagio("mesclar_camadas")])],
                parametros: vec![
                    ("METHOD", ParametroEstagio::Numero(0.0)),
                    ("TOLERANCE", ParametroEstagio::Numero(t.simplificacao)),
                ],
            },
            Estagio {
                nome: "poligonizar",
                operacao: "native:polygonize",
                camadas: vec![("INPUT", vec![RefCamada::Estagio("simplificar")])],
                parametros: vec![("KEEP_FIELDS", ParametroEstagio::Logico(false))],
            },
            Estagio {
                nome: "remover_duplicados_1",
                operacao: "native:removeduplicatevertices",
                camadas: vec![("INPUT", vec![RefCamada::Estagio("poligonizar")])],
                parametros: vec![
                    ("TOLERANCE", ParametroEstagio::Numero(t.vertices_duplicados)),
                    ("USE_Z_VALUE", ParametroEstagio::Logico(false)),
                ],
            },
            Estagio {
                nome: "remover_duplicados_2",
                operacao: "native:removeduplicatevertices",
                camadas: vec![("INPUT", vec![RefCamada::Estagio("remover_duplicados_1")])],
                parametros: vec![
                    ("TOLERANCE", ParametroEstagio::Numero(t.vertices_duplicados)),
                    ("USE_Z_VALUE", ParametroEstagio::Logico(false)),
                ],
            },
            Estagio {
                nome: "ajustar_geometrias",
                operacao: "native:snapgeometries",
                camadas: vec![
                    ("INPUT", vec![RefCamada::Estagio("remover_duplicados_2")]),
                    (
                        "REFERENCE_LAYER",
                        vec![RefCamada::Estagio("remover_duplicados_2")],
                    ),
                ],
                parametros: vec![
                    ("TOLERANCE", ParametroEstagio::Numero(t.ajuste)),
                    ("BEHAVIOR", ParametroEstagio::Numero(0.0)),
                ],
            },
            Estagio {
                nome: "calcular_area_lote",
                operacao: "qgis:fieldcalculator",
                camadas: vec![("INPUT", vec![RefCamada::Estagio("ajustar_geometrias")])],
                parametros: vec![
                    ("FIELD_NAME", ParametroEstagio::Texto("area_lote".into())),
                    ("FIELD_TYPE", ParametroEstagio::Numero(0.0)),
                    ("FIELD_LENGTH", ParametroEstagio::Numero(20.0)),
                    ("FIELD_PRECISION", ParametroEstagio::Numero(2.0)),
                    ("FORMULA", ParametroEstagio::Texto("$area".into())),
                ],
            },
            Estagio {
                nome: "calcular_area_quadra",
                operacao: "qgis:fieldcalculator",
                camadas: vec![("INPUT", vec![RefCamada::Estagio("extrair_feicoes")])],
                parametros: vec![
                    ("FIELD_NAME", ParametroEstagio::Texto("area_quadra".into())),
                    ("FIELD_TYPE", ParametroEstagio::Numero(0.0)),
                    ("FIELD_LENGTH", ParametroEstagio::Numero(20.0)),
                    ("FIELD_PRECISION", ParametroEstagio::Numero(2.0)),
                    ("FORMULA", ParametroEstagio::Texto("$area".into())),
                ],
            },
            Estagio {
                nome: "join_areas",
                operacao: "native:joinattributesbylocation",
                camadas: vec![
                    ("INPUT", vec![RefCamada::Estagio("calcular_area_lote")]),
                    ("JOIN", vec![RefCamada::Estagio("calcular_area_quadra")]),
                ],
                parametros: vec![
                    ("PREDICATE", ParametroEstagio::Numero(0.0)),
                    (
                        "JOIN_FIELDS",
                        ParametroEstagio::Textos(vec!["area_quadra".into()]),
                    ),
                    ("METHOD", ParametroEstagio::Numero(0.0)),
                    ("DISCARD_NONMATCHING", ParametroEstagio::Logico(false)),
                    ("PREFIX", ParametroEstagio::Texto(String::new())),
                ],
            },
            Estagio {
                nome: "filtrar_lotes_validos",
                operacao: "native:extractbyexpression",
                camadas: vec![("INPUT", vec![RefCamada::Estagio("join_areas")])],
                parametros: vec![("EXPRESSION", ParametroEstagio::Texto(filtro_area))],
            },
            Estagio {
                nome: "remover_campos_aux",
                operacao: "qgis:deletecolumn",
                camadas: vec![("INPUT", vec![RefCamada::Estagio("filtrar_lotes_validos")])],
                parametros: vec![(
                    "COLUMN",
                    ParametroEstagio::Textos(vec!["area_lote".into(), "area_quadra".into()]),
                )],
            },
            Estagio {
                nome: ESTAGIO_FINAL,
                operacao: "native:refactorfields",
                camadas: vec![("INPUT", vec![RefCamada::Estagio("remover_campos_aux")])],
                parametros: vec![("FIELDS_MAPPING", ParametroEstagio::MapeamentoFinal)],
            },
        ]
    }

    /// Verifica o encadeamento do plano: nomes únicos e toda referência
    /// apontando para um estágio anterior
    pub fn validar(plano: &[Estagio]) -> Result<(), PipelineError> {
        let mut conhecidos: Vec<&'static str> = Vec::with_capacity(plano.len());
        for estagio in plano {
            if conhecidos.contains(&estagio.nome) {
                return Err(PipelineError::EstagioDuplicado(estagio.nome));
            }
            for (_, refs) in &estagio.camadas {
                for referencia in refs {
                    if let RefCamada::Estagio(nome) = referencia {
                        if !conhecidos.contains(nome) {
                            return Err(PipelineError::ReferenciaDesconhecida {
                                estagio: estagio.nome,
                                referencia: nome,
                            });
                        }
                    }
                }
            }
            conhecidos.push(estagio.nome);
        }
        Ok(())
    }

    /// Executa o pipeline para uma quadra selecionada.
    ///
    /// Interrompe após o filtro de linhas de corte quando nenhuma linha
    /// intersecta a quadra; nenhum estágio geométrico posterior roda.
    pub fn executar(
        &self,
        ops: &dyn GeometryOps,
        quadras: &Layer,
        linhas: &Layer,
        operador: &Operador,
        data_atual: &str,
    ) -> Result<CutRun, PipelineError> {
        let plano = self.plano();
        Self::validar(&plano)?;

        let mut saidas: BTreeMap<&'static str, Layer> = BTreeMap::new();
        let mut linhas_corte = 0usize;

        for estagio in &plano {
            let mut params = Params::new();

            for (chave, refs) in &estagio.camadas {
                let valor = if refs.len() == 1 {
                    ParamValue::Layer(self.resolver(&refs[0], quadras, linhas, &saidas))
                } else {
                    ParamValue::List(
                        refs.iter()
                            .map(|r| {
                                ParamValue::Layer(self.resolver(r, quadras, linhas, &saidas))
                            })
                            .collect(),
                    )
                };
                params.insert(chave, valor);
            }

            for (chave, parametro) in &estagio.parametros {
                let valor = match parametro {
                    ParametroEstagio::Numero(v) => ParamValue::Number(*v),
                    ParametroEstagio::Texto(s) => ParamValue::Text(s.clone()),
                    ParametroEstagio::Logico(v) => ParamValue::Bool(*v),
                    ParametroEstagio::Textos(itens) => ParamValue::List(
                        itens.iter().map(|s| ParamValue::Text(s.clone())).collect(),
                    ),
                    ParametroEstagio::MapeamentoFinal => {
                        let quadra_sel = saidas
                            .get("extrair_feicoes")
                            .cloned()
                            .unwrap_or_else(|| Layer::new(quadras.epsg));
                        ParamValue::FieldMappings(mapeamentos_finais(
                            &quadra_sel,
                            operador,
                            data_atual,
                            &self.config.situacao_imovel,
                        ))
                    }
                };
                params.insert(chave, valor);
            }

            let saida = ops.run(estagio.operacao, params)?;
            debug!(
                estagio = estagio.nome,
                operacao = estagio.operacao,
                feicoes = saida.feature_count,
                "Estágio concluído"
            );

            if estagio.nome == ESTAGIO_CORTE {
                linhas_corte = saida.feature_count;
                if linhas_corte == 0 {
                    return Ok(CutRun {
                        linhas_corte: 0,
                        lotes: Layer::new(quadras.epsg),
                    });
                }
            }

            saidas.insert(estagio.nome, saida.layer);
        }

        let lotes = saidas
            .remove(ESTAGIO_FINAL)
            .unwrap_or_else(|| Layer::new(quadras.epsg));

        Ok(CutRun {
            linhas_corte,
            lotes,
        })
    }

    fn resolver(
        &self,
        referencia: &RefCamada,
        quadras: &Layer,
        linhas: &Layer,
        saidas: &BTreeMap<&'static str, Layer>,
    ) -> Layer {
        match referencia {
            RefCamada::Quadra => quadras.clone(),
            RefCamada::LinhasCorte => linhas.clone(),
            RefCamada::Estagio(nome) => saidas
                .get(nome)
                .cloned()
                .unwrap_or_else(|| Layer::new(quadras.epsg)),
        }
    }
}

/// Esquema final dos lotes: atributos herdados da quadra por agregação
/// espacial mais os campos de auditoria
fn mapeamentos_finais(
    quadra: &Layer,
    operador: &Operador,
    data_atual: &str,
    situacao: &str,
) -> Vec<FieldMapping> {
    let herdados = [
        ("id_localidade", "id_localidade"),
        ("id_setor", "id_setor"),
        ("id_bairro", "id_bairro"),
        ("id", "id_quadra"),
        ("ins_quadra", "ins_quadra"),
    ];

    let mut mapeamentos: Vec<FieldMapping> = herdados
        .iter()
        .map(|(campo, nome)| FieldMapping {
            name: nome.to_string(),
            expression: MappingExpr::AggregateMax {
                layer: quadra.clone(),
                field: campo.to_string(),
            },
            field_type: FieldType::Integer,
        })
        .collect();

    mapeamentos.push(FieldMapping {
        name: "sit_imovel".to_string(),
        expression: MappingExpr::Literal(situacao.to_string()),
        field_type: FieldType::Text,
    });
    mapeamentos.push(FieldMapping {
        name: "usuario".to_string(),
        expression: MappingExpr::Literal(operador.identificacao()),
        field_type: FieldType::Text,
    });
    mapeamentos.push(FieldMapping {
        name: "data_atual".to_string(),
        expression: MappingExpr::Literal(data_atual.to_string()),
        field_type: FieldType::Date,
    });

    mapeamentos
}

/// Data corrente em formato ISO (YYYY-MM-DD), sem dependência de fuso
pub fn data_atual_iso() -> String {
    let segundos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let (ano, mes, dia) = civil_de_dias((segundos / 86_400) as i64);
    format!("{ano:04}-{mes:02}-{dia:02}")
}

/// Conversão dias-desde-epoch para data civil (calendário gregoriano)
fn civil_de_dias(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let ano = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let dia = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let mes = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (ano + i64::from(mes <= 2), mes, dia)
}
