//! Tipos de dados: camadas, feições, atributos e parâmetros de operação

use std::collections::{BTreeMap, BTreeSet};

use geo::Geometry;

use crate::GeoProcError;

/// Valor de atributo de uma feição
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    /// Data em formato ISO (YYYY-MM-DD)
    Date(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Valor numérico, se houver (Int e Float são intercambiáveis)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Date(s) => Some(s),
            _ => None,
        }
    }

    /// Compara dois valores para fins de agregação `max`.
    /// Números comparam numericamente; o resto compara como texto.
    pub fn aggregate_max(self, other: Value) -> Value {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => {
                if b > a {
                    other
                } else {
                    self
                }
            }
            _ => match (self.as_text(), other.as_text()) {
                (Some(a), Some(b)) => {
                    if b > a {
                        other
                    } else {
                        self
                    }
                }
                (None, Some(_)) => other,
                _ => self,
            },
        }
    }
}

/// Feição vetorial: geometria + atributos ordenados
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: Geometry<f64>,
    pub attributes: BTreeMap<String, Value>,
}

impl Feature {
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: Value) -> Self {
        self.attributes.insert(name.to_string(), value);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// Camada vetorial em memória.
///
/// O CRS (`epsg`) é herdado das entradas pelas operações, nunca reatribuído.
/// `selected` guarda índices de feições selecionadas (usado por
/// `native:saveselectedfeatures`).
#[derive(Debug, Clone, Default)]
pub struct Layer {
    pub features: Vec<Feature>,
    pub epsg: Option<u32>,
    pub selected: BTreeSet<usize>,
}

impl Layer {
    pub fn new(epsg: Option<u32>) -> Self {
        Self {
            features: Vec::new(),
            epsg,
            selected: BTreeSet::new(),
        }
    }

    pub fn from_features(features: Vec<Feature>, epsg: Option<u32>) -> Self {
        Self {
            features,
            epsg,
            selected: BTreeSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    /// Verifica compatibilidade de CRS entre duas camadas
    pub fn ensure_same_crs(&self, other: &Layer) -> Result<(), GeoProcError> {
        match (self.epsg, other.epsg) {
            (Some(a), Some(b)) if a != b => Err(GeoProcError::CrsMismatch { left: a, right: b }),
            _ => Ok(()),
        }
    }
}

/// Tipo de campo de saída de `native:refactorfields`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Float,
    Text,
    Date,
}

/// Expressão de um mapeamento de campo.
///
/// Forma tipada das expressões de mapeamento:
/// `aggregate(layer, 'max', field, intersects($geometry, @parent))`
/// vira [`MappingExpr::AggregateMax`], literais viram [`MappingExpr::Literal`].
#[derive(Debug, Clone)]
pub enum MappingExpr {
    /// Máximo de `field` entre as feições de `layer` que intersectam a feição corrente
    AggregateMax { layer: Layer, field: String },
    /// Valor literal fixo
    Literal(String),
}

/// Mapeamento de um campo de saída
#[derive(Debug, Clone)]
pub struct FieldMapping {
    pub name: String,
    pub expression: MappingExpr,
    pub field_type: FieldType,
}

/// Valor de parâmetro de operação
#[derive(Debug, Clone)]
pub enum ParamValue {
    Layer(Layer),
    Number(f64),
    Text(String),
    Bool(bool),
    List(Vec<ParamValue>),
    FieldMappings(Vec<FieldMapping>),
    Null,
}

/// Dicionário de parâmetros de uma operação.
///
/// As chaves seguem o contrato de interoperabilidade com a biblioteca de
/// geoprocessamento (`INPUT`, `INTERSECT`, `TOLERANCE`, ...).
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: BTreeMap<String, ParamValue>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: ParamValue) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    pub fn insert(&mut self, key: &str, value: ParamValue) {
        self.values.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn layer(&self, operation: &'static str, key: &'static str) -> Result<&Layer, GeoProcError> {
        match self.values.get(key) {
            Some(ParamValue::Layer(layer)) => Ok(layer),
            Some(_) => Err(GeoProcError::InvalidParameter {
                operation,
                parameter: key,
                expected: "layer",
            }),
            None => Err(GeoProcError::MissingParameter {
                operation,
                parameter: key,
            }),
        }
    }

    pub fn number(&self, operation: &'static str, key: &'static str) -> Result<f64, GeoProcError> {
        match self.values.get(key) {
            Some(ParamValue::Number(v)) => Ok(*v),
            Some(_) => Err(GeoProcError::InvalidParameter {
                operation,
                parameter: key,
                expected: "number",
            }),
            None => Err(GeoProcError::MissingParameter {
                operation,
                parameter: key,
            }),
        }
    }

    pub fn number_or(&self, key: &str, default: f64) -> f64 {
        match self.values.get(key) {
            Some(ParamValue::Number(v)) => *v,
            _ => default,
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        match self.values.get(key) {
            Some(ParamValue::Bool(v)) => *v,
            _ => default,
        }
    }

    pub fn text(&self, operation: &'static str, key: &'static str) -> Result<&str, GeoProcError> {
        match self.values.get(key) {
            Some(ParamValue::Text(s)) => Ok(s),
            Some(_) => Err(GeoProcError::InvalidParameter {
                operation,
                parameter: key,
                expected: "text",
            }),
            None => Err(GeoProcError::MissingParameter {
                operation,
                parameter: key,
            }),
        }
    }

    /// Lista de camadas (ex.: `LAYERS` de mergevectorlayers)
    pub fn layers(
        &self,
        operation: &'static str,
        key: &'static str,
    ) -> Result<Vec<&Layer>, GeoProcError> {
        match self.values.get(key) {
            Some(ParamValue::List(items)) => items
                .iter()
                .map(|item| match item {
                    ParamValue::Layer(layer) => Ok(layer),
                    _ => Err(GeoProcError::InvalidParameter {
                        operation,
                        parameter: key,
                        expected: "list of layers",
                    }),
                })
                .collect(),
            Some(_) => Err(GeoProcError::InvalidParameter {
                operation,
                parameter: key,
                expected: "list of layers",
            }),
            None => Err(GeoProcError::MissingParameter {
                operation,
                parameter: key,
            }),
        }
    }

    /// Lista de textos (ex.: `COLUMN`, `JOIN_FIELDS`)
    pub fn texts(
        &self,
        operation: &'static str,
        key: &'static str,
    ) -> Result<Vec<&str>, GeoProcError> {
        match self.values.get(key) {
            Some(ParamValue::List(items)) => items
                .iter()
                .map(|item| match item {
                    ParamValue::Text(s) => Ok(s.as_str()),
                    _ => Err(GeoProcError::InvalidParameter {
                        operation,
                        parameter: key,
                        expected: "list of text",
                    }),
                })
                .collect(),
            Some(_) => Err(GeoProcError::InvalidParameter {
                operation,
                parameter: key,
                expected: "list of text",
            }),
            None => Err(GeoProcError::MissingParameter {
                operation,
                parameter: key,
            }),
        }
    }

    pub fn field_mappings(
        &self,
        operation: &'static str,
        key: &'static str,
    ) -> Result<&[FieldMapping], GeoProcError> {
        match self.values.get(key) {
            Some(ParamValue::FieldMappings(m)) => Ok(m),
            Some(_) => Err(GeoProcError::InvalidParameter {
                operation,
                parameter: key,
                expected: "field mappings",
            }),
            None => Err(GeoProcError::MissingParameter {
                operation,
                parameter: key,
            }),
        }
    }
}

/// Resultado de uma operação
#[derive(Debug, Clone)]
pub struct OpOutput {
    pub layer: Layer,
    pub feature_count: usize,
}

impl OpOutput {
    pub fn from_layer(layer: Layer) -> Self {
        let feature_count = layer.len();
        Self {
            layer,
            feature_count,
        }
    }
}
