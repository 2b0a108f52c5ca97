//! `native:polygonize` — reconstrução de polígonos a partir de uma rede de linhas

mod noding;
mod ring;

use geo::{Contains, Geometry, LineString, Point, Polygon};
use tracing::debug;

use crate::types::{Feature, Layer, OpOutput, Params};
use crate::GeoProcError;

/// Poligoniza a rede de linhas de entrada.
///
/// Os atributos de origem são descartados (sem sentido após a
/// reconstrução); `KEEP_FIELDS` é aceito apenas como `false`.
pub fn polygonize(params: &Params) -> Result<OpOutput, GeoProcError> {
    const OP: &str = "native:polygonize";
    let input = params.layer(OP, "INPUT")?;
    if params.bool_or("KEEP_FIELDS", false) {
        return Err(GeoProcError::UnsupportedExpression(
            "polygonize KEEP_FIELDS=true".to_string(),
        ));
    }

    let mut lines: Vec<LineString<f64>> = Vec::new();
    for feature in &input.features {
        collect_lines(&feature.geometry, &mut lines);
    }

    let mut edges = noding::node_lines(&lines);
    let raw_edges = edges.len();
    noding::remove_dead_ends(&mut edges);
    debug!(
        segments = raw_edges,
        after_pruning = edges.len(),
        "Polygonize: noded network"
    );

    let rings = ring::extract_rings(&edges);
    let polygons = assemble_polygons(rings);

    let mut output = Layer::new(input.epsg);
    for polygon in polygons {
        output.push(Feature::new(Geometry::Polygon(polygon)));
    }

    Ok(OpOutput::from_layer(output))
}

fn collect_lines(geometry: &Geometry<f64>, out: &mut Vec<LineString<f64>>) {
    match geometry {
        Geometry::LineString(ls) => out.push(ls.clone()),
        Geometry::MultiLineString(mls) => out.extend(mls.0.iter().cloned()),
        Geometry::Line(l) => out.push(LineString::new(vec![l.start, l.end])),
        Geometry::Polygon(poly) => {
            out.push(poly.exterior().clone());
            out.extend(poly.interiors().iter().cloned());
        }
        Geometry::MultiPolygon(mp) => {
            for poly in &mp.0 {
                out.push(poly.exterior().clone());
                out.extend(poly.interiors().iter().cloned());
            }
        }
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                collect_lines(g, out);
            }
        }
        _ => {}
    }
}

/// Monta os polígonos finais: todo anel vira casca; anéis de componentes
/// desconexos aninhados viram também buracos do menor anel que os contém.
fn assemble_polygons(rings: Vec<LineString<f64>>) -> Vec<Polygon<f64>> {
    let mut order: Vec<usize> = (0..rings.len()).collect();
    let areas: Vec<f64> = rings.iter().map(|r| ring::signed_area(&r.0)).collect();
    order.sort_by(|&a, &b| {
        areas[b]
            .partial_cmp(&areas[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let shells: Vec<Polygon<f64>> = rings
        .iter()
        .map(|r| Polygon::new(r.clone(), vec![]))
        .collect();

    let mut holes: Vec<Vec<LineString<f64>>> = vec![Vec::new(); rings.len()];
    for &inner in &order {
        let Some(probe) = rings[inner].0.first() else {
            continue;
        };
        let probe = Point::new(probe.x, probe.y);

        // Menor anel que contém estritamente o anel interno
        let parent = order
            .iter()
            .filter(|&&outer| outer != inner && areas[outer] > areas[inner])
            .filter(|&&outer| shells[outer].contains(&probe))
            .min_by(|&&a, &&b| {
                areas[a]
                    .partial_cmp(&areas[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

        if let Some(&parent) = parent {
            holes[parent].push(rings[inner].clone());
        }
    }

    rings
        .iter()
        .enumerate()
        .map(|(idx, ring)| Polygon::new(ring.clone(), holes[idx].clone()))
        .collect()
}
