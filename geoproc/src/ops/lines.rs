//! Operações sobre linhas: extensão, conversão, mesclagem, simplificação,
//! limpeza de vértices e ajuste (snap)

use geo::{Coord, Geometry, LineString, MapCoords, MultiLineString, Simplify};

use crate::types::{Feature, Layer, OpOutput, Params};
use crate::GeoProcError;

/// `native:extendlines` — prolonga cada linha nas duas extremidades.
///
/// Linhas fechadas (primeiro ponto == último) não têm extremidade e passam
/// inalteradas.
pub fn extend_lines(params: &Params) -> Result<OpOutput, GeoProcError> {
    const OP: &str = "native:extendlines";
    let input = params.layer(OP, "INPUT")?;
    let start = params.number(OP, "START_DISTANCE")?;
    let end = params.number(OP, "END_DISTANCE")?;

    let mut output = Layer::new(input.epsg);
    for feature in &input.features {
        let geometry = match &feature.geometry {
            Geometry::LineString(ls) => Geometry::LineString(extend_linestring(ls, start, end)),
            Geometry::MultiLineString(mls) => Geometry::MultiLineString(MultiLineString::new(
                mls.0
                    .iter()
                    .map(|ls| extend_linestring(ls, start, end))
                    .collect(),
            )),
            other => {
                return Err(GeoProcError::InvalidGeometry(format!(
                    "extendlines expects lines, got {:?}",
                    geometry_kind(other)
                )))
            }
        };
        output.push(Feature {
            geometry,
            attributes: feature.attributes.clone(),
        });
    }

    Ok(OpOutput::from_layer(output))
}

fn extend_linestring(line: &LineString<f64>, start: f64, end: f64) -> LineString<f64> {
    let n = line.0.len();
    if n < 2 {
        return line.clone();
    }
    if line.is_closed() {
        return line.clone();
    }

    let mut coords = line.0.clone();

    if let Some(dir) = unit_direction(coords[1], coords[0]) {
        coords[0] = Coord {
            x: coords[0].x + dir.x * start,
            y: coords[0].y + dir.y * start,
        };
    }
    if let Some(dir) = unit_direction(coords[n - 2], coords[n - 1]) {
        coords[n - 1] = Coord {
            x: coords[n - 1].x + dir.x * end,
            y: coords[n - 1].y + dir.y * end,
        };
    }

    LineString::new(coords)
}

/// Direção unitária de `from` para `to`; `None` se coincidentes
fn unit_direction(from: Coord<f64>, to: Coord<f64>) -> Option<Coord<f64>> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return None;
    }
    Some(Coord {
        x: dx / len,
        y: dy / len,
    })
}

/// `native:polygonstolines` — contorno dos polígonos como linhas
pub fn polygons_to_lines(params: &Params) -> Result<OpOutput, GeoProcError> {
    const OP: &str = "native:polygonstolines";
    let input = params.layer(OP, "INPUT")?;

    let mut output = Layer::new(input.epsg);
    for feature in &input.features {
        let mut rings: Vec<LineString<f64>> = Vec::new();
        match &feature.geometry {
            Geometry::Polygon(poly) => {
                rings.push(poly.exterior().clone());
                rings.extend(poly.interiors().iter().cloned());
            }
            Geometry::MultiPolygon(mp) => {
                for poly in &mp.0 {
                    rings.push(poly.exterior().clone());
                    rings.extend(poly.interiors().iter().cloned());
                }
            }
            other => {
                return Err(GeoProcError::InvalidGeometry(format!(
                    "polygonstolines expects polygons, got {:?}",
                    geometry_kind(other)
                )))
            }
        }
        output.push(Feature {
            geometry: Geometry::MultiLineString(MultiLineString::new(rings)),
            attributes: feature.attributes.clone(),
        });
    }

    Ok(OpOutput::from_layer(output))
}

/// `native:mergevectorlayers` — concatena camadas.
///
/// `CRS` nulo significa herdar o CRS das entradas, que devem ser compatíveis.
pub fn merge_vector_layers(params: &Params) -> Result<OpOutput, GeoProcError> {
    const OP: &str = "native:mergevectorlayers";
    let layers = params.layers(OP, "LAYERS")?;

    let mut epsg = None;
    for layer in &layers {
        match (epsg, layer.epsg) {
            (None, found) => epsg = found,
            (Some(a), Some(b)) if a != b => {
                return Err(GeoProcError::CrsMismatch { left: a, right: b })
            }
            _ => {}
        }
    }

    let mut output = Layer::new(epsg);
    for layer in layers {
        output.features.extend(layer.features.iter().cloned());
    }

    Ok(OpOutput::from_layer(output))
}

/// `native:simplifygeometries` — Douglas-Peucker (METHOD 0)
pub fn simplify_geometries(params: &Params) -> Result<OpOutput, GeoProcError> {
    const OP: &str = "native:simplifygeometries";
    let input = params.layer(OP, "INPUT")?;
    let tolerance = params.number(OP, "TOLERANCE")?;
    let method = params.number_or("METHOD", 0.0);
    if method != 0.0 {
        return Err(GeoProcError::UnsupportedExpression(format!(
            "simplifygeometries METHOD {}",
            method
        )));
    }

    let mut output = Layer::new(input.epsg);
    for feature in &input.features {
        let geometry = match &feature.geometry {
            Geometry::LineString(ls) => Geometry::LineString(ls.simplify(&tolerance)),
            Geometry::MultiLineString(mls) => Geometry::MultiLineString(mls.simplify(&tolerance)),
            Geometry::Polygon(poly) => Geometry::Polygon(poly.simplify(&tolerance)),
            Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(mp.simplify(&tolerance)),
            other => other.clone(),
        };
        output.push(Feature {
            geometry,
            attributes: feature.attributes.clone(),
        });
    }

    Ok(OpOutput::from_layer(output))
}

/// `native:removeduplicatevertices` — remove vértices consecutivos dentro da
/// tolerância. Planar (USE_Z_VALUE é ignorado: as camadas são 2D).
pub fn remove_duplicate_vertices(params: &Params) -> Result<OpOutput, GeoProcError> {
    const OP: &str = "native:removeduplicatevertices";
    let input = params.layer(OP, "INPUT")?;
    let tolerance = params.number(OP, "TOLERANCE")?;

    let mut output = Layer::new(input.epsg);
    for feature in &input.features {
        let geometry = match &feature.geometry {
            Geometry::LineString(ls) => Geometry::LineString(dedup_line(ls, tolerance, false)),
            Geometry::MultiLineString(mls) => Geometry::MultiLineString(MultiLineString::new(
                mls.0.iter().map(|ls| dedup_line(ls, tolerance, false)).collect(),
            )),
            Geometry::Polygon(poly) => Geometry::Polygon(dedup_polygon(poly, tolerance)),
            Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(geo::MultiPolygon::new(
                mp.0.iter().map(|p| dedup_polygon(p, tolerance)).collect(),
            )),
            other => other.clone(),
        };
        output.push(Feature {
            geometry,
            attributes: feature.attributes.clone(),
        });
    }

    Ok(OpOutput::from_layer(output))
}

fn dedup_polygon(poly: &geo::Polygon<f64>, tolerance: f64) -> geo::Polygon<f64> {
    geo::Polygon::new(
        dedup_line(poly.exterior(), tolerance, true),
        poly.interiors()
            .iter()
            .map(|r| dedup_line(r, tolerance, true))
            .collect(),
    )
}

fn dedup_line(line: &LineString<f64>, tolerance: f64, ring: bool) -> LineString<f64> {
    if line.0.len() < 2 {
        return line.clone();
    }

    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(line.0.len());
    for &c in &line.0 {
        match coords.last() {
            Some(&last) if within(last, c, tolerance) => {}
            _ => coords.push(c),
        }
    }

    if ring {
        // Fechamento: o último vértice pode ter colapsado no primeiro
        if let (Some(&first), Some(&last)) = (coords.first(), coords.last()) {
            if within(first, last, tolerance) && coords.len() > 1 {
                coords.pop();
            }
        }
        if let Some(&first) = coords.first() {
            coords.push(first);
        }
    }

    LineString::new(coords)
}

fn within(a: Coord<f64>, b: Coord<f64>, tolerance: f64) -> bool {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt() <= tolerance
}

/// `native:snapgeometries` — BEHAVIOR 0: alinha vértices aos vértices da
/// camada de referência dentro da tolerância. Com REFERENCE_LAYER igual ao
/// INPUT, o efeito é colapsar agrupamentos de vértices quase coincidentes em
/// um vértice canônico, fechando microfrestas entre bordas.
pub fn snap_geometries(params: &Params) -> Result<OpOutput, GeoProcError> {
    const OP: &str = "native:snapgeometries";
    let input = params.layer(OP, "INPUT")?;
    let reference = params.layer(OP, "REFERENCE_LAYER")?;
    let tolerance = params.number(OP, "TOLERANCE")?;
    input.ensure_same_crs(reference)?;

    // Vértices canônicos: primeiro representante de cada agrupamento
    let mut canonical: Vec<Coord<f64>> = Vec::new();
    for feature in &reference.features {
        collect_coords(&feature.geometry, &mut |c| {
            if !canonical.iter().any(|&k| within(k, c, tolerance)) {
                canonical.push(c);
            }
        });
    }

    let mut output = Layer::new(input.epsg);
    for feature in &input.features {
        let geometry = feature.geometry.map_coords(|c| {
            canonical
                .iter()
                .find(|&&k| within(k, c, tolerance))
                .copied()
                .unwrap_or(c)
        });
        output.push(Feature {
            geometry,
            attributes: feature.attributes.clone(),
        });
    }

    Ok(OpOutput::from_layer(output))
}

fn collect_coords(geometry: &Geometry<f64>, visit: &mut impl FnMut(Coord<f64>)) {
    match geometry {
        Geometry::Point(p) => visit(p.0),
        Geometry::Line(l) => {
            visit(l.start);
            visit(l.end);
        }
        Geometry::LineString(ls) => ls.0.iter().copied().for_each(visit),
        Geometry::MultiLineString(mls) => {
            for ls in &mls.0 {
                ls.0.iter().copied().for_each(&mut *visit);
            }
        }
        Geometry::Polygon(poly) => {
            poly.exterior().0.iter().copied().for_each(&mut *visit);
            for ring in poly.interiors() {
                ring.0.iter().copied().for_each(&mut *visit);
            }
        }
        Geometry::MultiPolygon(mp) => {
            for poly in &mp.0 {
                collect_coords(&Geometry::Polygon(poly.clone()), visit);
            }
        }
        Geometry::MultiPoint(mp) => mp.0.iter().for_each(|p| visit(p.0)),
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                collect_coords(g, visit);
            }
        }
        _ => {}
    }
}

fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParamValue;
    use geo::polygon;

    fn line_layer(coords: Vec<Vec<(f64, f64)>>) -> Layer {
        let mut layer = Layer::new(Some(31984));
        for line in coords {
            layer.push(Feature::new(Geometry::LineString(LineString::from(line))));
        }
        layer
    }

    #[test]
    fn test_extend_open_line() {
        let layer = line_layer(vec![vec![(0.0, 0.0), (10.0, 0.0)]]);
        let params = Params::new()
            .with("INPUT", ParamValue::Layer(layer))
            .with("START_DISTANCE", ParamValue::Number(0.3))
            .with("END_DISTANCE", ParamValue::Number(0.3));
        let out = extend_lines(&params).unwrap();

        let Geometry::LineString(ls) = &out.layer.features[0].geometry else {
            panic!("expected LineString");
        };
        assert!((ls.0[0].x - (-0.3)).abs() < 1e-12);
        assert!((ls.0[1].x - 10.3).abs() < 1e-12);
    }

    #[test]
    fn test_extend_closed_line_unchanged() {
        let layer = line_layer(vec![vec![
            (0.0, 0.0),
            (1.0, 0.0),
            (1.0, 1.0),
            (0.0, 0.0),
        ]]);
        let params = Params::new()
            .with("INPUT", ParamValue::Layer(layer.clone()))
            .with("START_DISTANCE", ParamValue::Number(0.3))
            .with("END_DISTANCE", ParamValue::Number(0.3));
        let out = extend_lines(&params).unwrap();

        let Geometry::LineString(ls) = &out.layer.features[0].geometry else {
            panic!("expected LineString");
        };
        assert_eq!(ls.0[0], Coord { x: 0.0, y: 0.0 });
    }

    #[test]
    fn test_polygons_to_lines() {
        let mut layer = Layer::new(Some(31984));
        layer.push(Feature::new(Geometry::Polygon(geo::polygon![
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 4.0, y: 4.0),
            (x: 0.0, y: 4.0),
            (x: 0.0, y: 0.0),
        ])));

        let params = Params::new().with("INPUT", ParamValue::Layer(layer));
        let out = polygons_to_lines(&params).unwrap();
        let Geometry::MultiLineString(mls) = &out.layer.features[0].geometry else {
            panic!("expected MultiLineString");
        };
        assert_eq!(mls.0.len(), 1);
        assert_eq!(mls.0[0].0.len(), 5);
    }

    #[test]
    fn test_merge_keeps_crs() {
        let a = line_layer(vec![vec![(0.0, 0.0), (1.0, 0.0)]]);
        let b = line_layer(vec![vec![(2.0, 0.0), (3.0, 0.0)]]);
        let params = Params::new()
            .with(
                "LAYERS",
                ParamValue::List(vec![ParamValue::Layer(a), ParamValue::Layer(b)]),
            )
            .with("CRS", ParamValue::Null);
        let out = merge_vector_layers(&params).unwrap();
        assert_eq!(out.feature_count, 2);
        assert_eq!(out.layer.epsg, Some(31984));
    }

    #[test]
    fn test_merge_rejects_crs_mismatch() {
        let a = line_layer(vec![vec![(0.0, 0.0), (1.0, 0.0)]]);
        let mut b = line_layer(vec![vec![(2.0, 0.0), (3.0, 0.0)]]);
        b.epsg = Some(4326);
        let params = Params::new().with(
            "LAYERS",
            ParamValue::List(vec![ParamValue::Layer(a), ParamValue::Layer(b)]),
        );
        assert!(merge_vector_layers(&params).is_err());
    }

    #[test]
    fn test_dedup_idempotent() {
        let layer = line_layer(vec![vec![
            (0.0, 0.0),
            (0.0000001, 0.0),
            (5.0, 0.0),
            (5.0, 0.0000003),
            (10.0, 0.0),
        ]]);
        let params = Params::new()
            .with("INPUT", ParamValue::Layer(layer))
            .with("TOLERANCE", ParamValue::Number(1e-6))
            .with("USE_Z_VALUE", ParamValue::Bool(false));
        let first = remove_duplicate_vertices(&params).unwrap();

        let Geometry::LineString(ls) = &first.layer.features[0].geometry else {
            panic!("expected LineString");
        };
        assert_eq!(ls.0.len(), 3);

        let params = Params::new()
            .with("INPUT", ParamValue::Layer(first.layer.clone()))
            .with("TOLERANCE", ParamValue::Number(1e-6))
            .with("USE_Z_VALUE", ParamValue::Bool(false));
        let second = remove_duplicate_vertices(&params).unwrap();
        let Geometry::LineString(ls2) = &second.layer.features[0].geometry else {
            panic!("expected LineString");
        };
        assert_eq!(ls2.0, ls.0);
    }

    #[test]
    fn test_dedup_ring_stays_closed() {
        let mut layer = Layer::new(Some(31984));
        layer.push(Feature::new(Geometry::Polygon(geo::polygon![
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 4.0, y: 0.0000001),
            (x: 4.0, y: 4.0),
            (x: 0.0, y: 4.0),
            (x: 0.0, y: 0.0),
        ])));
        let params = Params::new()
            .with("INPUT", ParamValue::Layer(layer))
            .with("TOLERANCE", ParamValue::Number(1e-6))
            .with("USE_Z_VALUE", ParamValue::Bool(false));
        let out = remove_duplicate_vertices(&params).unwrap();
        let Geometry::Polygon(poly) = &out.layer.features[0].geometry else {
            panic!("expected Polygon");
        };
        assert!(poly.exterior().is_closed());
        assert_eq!(poly.exterior().0.len(), 5);
    }

    #[test]
    fn test_snap_collapses_microgap() {
        let layer = line_layer(vec![
            vec![(0.0, 0.0), (5.0, 0.0)],
            vec![(5.00005, 0.00002), (10.0, 0.0)],
        ]);
        let params = Params::new()
            .with("INPUT", ParamValue::Layer(layer.clone()))
            .with("REFERENCE_LAYER", ParamValue::Layer(layer))
            .with("TOLERANCE", ParamValue::Number(0.0001))
            .with("BEHAVIOR", ParamValue::Number(0.0));
        let out = snap_geometries(&params).unwrap();

        let Geometry::LineString(a) = &out.layer.features[0].geometry else {
            panic!();
        };
        let Geometry::LineString(b) = &out.layer.features[1].geometry else {
            panic!();
        };
        assert_eq!(a.0[1], b.0[0]);
    }
}
