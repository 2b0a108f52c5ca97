//! Leitura de camadas GeoJSON
//!
//! Entrada alternativa ao banco para simulações e testes: as camadas de
//! quadras e linhas de corte podem vir de arquivos GeoJSON.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use geo::Geometry;
use geoproc::{Feature, Layer, Value};

/// Converte uma propriedade GeoJSON em valor de atributo
fn valor_de_json(valor: &serde_json::Value) -> Value {
    match valor {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => Value::Text(s.clone()),
        outro => Value::Text(outro.to_string()),
    }
}

/// Monta uma camada a partir de um documento GeoJSON
pub fn camada_de_geojson(texto: &str, epsg: Option<u32>) -> Result<Layer> {
    let geojson: geojson::GeoJson = texto.parse().context("Failed to parse GeoJSON")?;
    let colecao = match geojson {
        geojson::GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("Expected a GeoJSON FeatureCollection")),
    };

    let mut layer = Layer::new(epsg);
    for feature in colecao.features {
        let geometry = feature
            .geometry
            .ok_or_else(|| anyhow!("Feature without geometry"))?;
        let geometry = Geometry::try_from(geometry)
            .map_err(|e| anyhow!("Unsupported geometry: {e}"))?;

        let mut item = Feature::new(geometry);
        if let Some(propriedades) = feature.properties {
            for (nome, valor) in propriedades {
                item.attributes.insert(nome, valor_de_json(&valor));
            }
        }
        layer.push(item);
    }

    Ok(layer)
}

/// Carrega uma camada de um arquivo GeoJSON
pub fn carregar_camada_geojson(path: &Path, epsg: Option<u32>) -> Result<Layer> {
    let texto = std::fs::read_to_string(path)
        .context(format!("Failed to read GeoJSON file: {}", path.display()))?;
    camada_de_geojson(&texto, epsg)
}
