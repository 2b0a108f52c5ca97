//! # geoproc
//!
//! Núcleo de geoprocessamento vetorial em memória.
//!
//! ## Features
//!
//! - Camadas vetoriais com atributos tipados ([`Layer`], [`Feature`], [`Value`])
//! - Catálogo de operações nomeadas compatível com o contrato QGIS
//!   (`native:polygonize`, `native:extendlines`, ...)
//! - Poligonização por extração de anéis mínimos em grafo planar
//! - Junção espacial, cálculo de área e refatoração de esquema
//!
//! ## Usage
//!
//! ```no_run
//! use geoproc::{GeometryOps, Processor, Params, ParamValue, Layer};
//!
//! let processor = Processor;
//! let params = Params::new()
//!     .with("INPUT", ParamValue::Layer(Layer::new(Some(31984))))
//!     .with("KEEP_FIELDS", ParamValue::Bool(false));
//! let lotes = processor.run("native:polygonize", params)?;
//! # Ok::<(), geoproc::GeoProcError>(())
//! ```

pub mod error;
pub mod ops;
pub mod types;

pub use error::GeoProcError;
pub use types::{
    Feature, FieldMapping, FieldType, Layer, MappingExpr, OpOutput, ParamValue, Params, Value,
};

/// Execução de operações nomeadas.
///
/// Ponto de costura entre o orquestrador e o núcleo geométrico: o fluxo de
/// corte só conhece nomes de operação e dicionários de parâmetros, nunca as
/// funções concretas.
pub trait GeometryOps {
    fn run(&self, operation: &str, params: Params) -> Result<OpOutput, GeoProcError>;
}

/// Implementação padrão do catálogo de operações
#[derive(Debug, Clone, Copy, Default)]
pub struct Processor;

impl GeometryOps for Processor {
    fn run(&self, operation: &str, params: Params) -> Result<OpOutput, GeoProcError> {
        match operation {
            "native:saveselectedfeatures" => ops::select::save_selected_features(&params),
            "native:extractbylocation" => ops::select::extract_by_location(&params),
            "native:extractbyexpression" => ops::select::extract_by_expression(&params),
            "native:extendlines" => ops::lines::extend_lines(&params),
            "native:polygonstolines" => ops::lines::polygons_to_lines(&params),
            "native:mergevectorlayers" => ops::lines::merge_vector_layers(&params),
            "native:simplifygeometries" => ops::lines::simplify_geometries(&params),
            "native:removeduplicatevertices" => ops::lines::remove_duplicate_vertices(&params),
            "native:snapgeometries" => ops::lines::snap_geometries(&params),
            "native:polygonize" => ops::polygonize::polygonize(&params),
            "qgis:fieldcalculator" => ops::fields::field_calculator(&params),
            "native:joinattributesbylocation" => ops::fields::join_attributes_by_location(&params),
            "qgis:deletecolumn" => ops::fields::delete_column(&params),
            "native:refactorfields" => ops::fields::refactor_fields(&params),
            other => Err(GeoProcError::UnknownOperation(other.to_string())),
        }
    }
}
