//! Operações de atributos: cálculo de campos, junção espacial e refatoração

use geo::{Area, Intersects};

use crate::types::{Feature, FieldType, Layer, MappingExpr, OpOutput, Params, Value};
use crate::GeoProcError;

/// `qgis:fieldcalculator` — adiciona um campo calculado.
///
/// O avaliador cobre o subconjunto usado pelo fluxo de corte: a variável
/// `$area` (área plana da feição).
pub fn field_calculator(params: &Params) -> Result<OpOutput, GeoProcError> {
    const OP: &str = "qgis:fieldcalculator";
    let input = params.layer(OP, "INPUT")?;
    let field_name = params.text(OP, "FIELD_NAME")?;
    let formula = params.text(OP, "FORMULA")?;

    if formula.trim() != "$area" {
        return Err(GeoProcError::UnsupportedExpression(formula.to_string()));
    }

    let mut output = Layer::new(input.epsg);
    for feature in &input.features {
        let area = feature.geometry.unsigned_area();
        let mut out = feature.clone();
        out.attributes
            .insert(field_name.to_string(), Value::Float(area));
        output.push(out);
    }

    Ok(OpOutput::from_layer(output))
}

/// `native:joinattributesbylocation` — junção espacial por interseção.
///
/// `METHOD = 1` usa apenas a primeira feição correspondente; qualquer outro
/// valor emite uma feição de saída por correspondência. Com
/// `DISCARD_NONMATCHING = false`, feições sem correspondência são mantidas
/// com os campos de junção nulos.
pub fn join_attributes_by_location(params: &Params) -> Result<OpOutput, GeoProcError> {
    const OP: &str = "native:joinattributesbylocation";
    let input = params.layer(OP, "INPUT")?;
    let join = params.layer(OP, "JOIN")?;
    let join_fields = params.texts(OP, "JOIN_FIELDS")?;
    let method = params.number_or("METHOD", 0.0) as i64;
    let discard_nonmatching = params.bool_or("DISCARD_NONMATCHING", false);
    let prefix = match params.get("PREFIX") {
        Some(crate::types::ParamValue::Text(p)) => p.as_str(),
        _ => "",
    };

    input.ensure_same_crs(join)?;

    let mut output = Layer::new(input.epsg);
    for feature in &input.features {
        let matches: Vec<&Feature> = join
            .features
            .iter()
            .filter(|j| feature.geometry.intersects(&j.geometry))
            .collect();

        if matches.is_empty() {
            if !discard_nonmatching {
                let mut out = feature.clone();
                for field in &join_fields {
                    out.attributes
                        .insert(format!("{prefix}{field}"), Value::Null);
                }
                output.push(out);
            }
            continue;
        }

        let take = if method == 1 { 1 } else { matches.len() };
        for joined in matches.into_iter().take(take) {
            let mut out = feature.clone();
            for field in &join_fields {
                let value = joined.attribute(field).cloned().unwrap_or(Value::Null);
                out.attributes.insert(format!("{prefix}{field}"), value);
            }
            output.push(out);
        }
    }

    Ok(OpOutput::from_layer(output))
}

/// `qgis:deletecolumn` — remove os campos listados em `COLUMN`
pub fn delete_column(params: &Params) -> Result<OpOutput, GeoProcError> {
    const OP: &str = "qgis:deletecolumn";
    let input = params.layer(OP, "INPUT")?;
    let columns = params.texts(OP, "COLUMN")?;

    let mut output = Layer::new(input.epsg);
    for feature in &input.features {
        let mut out = feature.clone();
        for column in &columns {
            out.attributes.remove(*column);
        }
        output.push(out);
    }

    Ok(OpOutput::from_layer(output))
}

/// `native:refactorfields` — reconstrói o esquema de atributos a partir de
/// `FIELDS_MAPPING`, descartando os campos não mapeados
pub fn refactor_fields(params: &Params) -> Result<OpOutput, GeoProcError> {
    const OP: &str = "native:refactorfields";
    let input = params.layer(OP, "INPUT")?;
    let mappings = params.field_mappings(OP, "FIELDS_MAPPING")?;

    let mut output = Layer::new(input.epsg);
    for feature in &input.features {
        let mut out = Feature::new(feature.geometry.clone());
        for mapping in mappings {
            let raw = match &mapping.expression {
                MappingExpr::AggregateMax { layer, field } => layer
                    .features
                    .iter()
                    .filter(|other| feature.geometry.intersects(&other.geometry))
                    .filter_map(|other| other.attribute(field).cloned())
                    .fold(Value::Null, Value::aggregate_max),
                MappingExpr::Literal(text) => Value::Text(text.clone()),
            };
            out.attributes
                .insert(mapping.name.clone(), cast(raw, mapping.field_type));
        }
        output.push(out);
    }

    Ok(OpOutput::from_layer(output))
}

/// Converte um valor para o tipo de campo declarado; falha vira `Null`
fn cast(value: Value, field_type: FieldType) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    match field_type {
        FieldType::Integer => match &value {
            Value::Int(_) => value,
            Value::Float(v) => Value::Int(*v as i64),
            Value::Text(s) => s.trim().parse::<i64>().map(Value::Int).unwrap_or(Value::Null),
            _ => Value::Null,
        },
        FieldType::Float => match &value {
            Value::Float(_) => value,
            Value::Int(v) => Value::Float(*v as f64),
            Value::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .unwrap_or(Value::Null),
            _ => Value::Null,
        },
        FieldType::Text => match &value {
            Value::Text(_) => value,
            Value::Int(v) => Value::Text(v.to_string()),
            Value::Float(v) => Value::Text(v.to_string()),
            Value::Bool(v) => Value::Text(v.to_string()),
            Value::Date(s) => Value::Text(s.clone()),
            Value::Null => Value::Null,
        },
        FieldType::Date => match value {
            Value::Date(_) => value,
            Value::Text(s) => Value::Date(s),
            _ => Value::Null,
        },
    }
}
