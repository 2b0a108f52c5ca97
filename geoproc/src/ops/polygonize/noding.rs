//! Fragmentação da rede de linhas em arestas nodadas
//!
//! Cada segmento é dividido em todos os pontos onde cruza ou toca outro
//! segmento, e as arestas duplicadas são descartadas. O resultado é um grafo
//! planar próprio, pré-requisito da extração de faces.

use std::collections::BTreeSet;

use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{Coord, Line, LineString};

/// Escala de quantização para identidade de vértices (1e-7 unidades de mapa)
const KEY_SCALE: f64 = 1e7;

pub type VertexKey = (i64, i64);

pub fn vertex_key(c: Coord<f64>) -> VertexKey {
    ((c.x * KEY_SCALE).round() as i64, (c.y * KEY_SCALE).round() as i64)
}

/// Aresta não direcionada entre dois vértices quantizados
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub a: Coord<f64>,
    pub b: Coord<f64>,
}

/// Divide as linhas de entrada em arestas nodadas e sem duplicatas
pub fn node_lines(lines: &[LineString<f64>]) -> Vec<Edge> {
    let segments: Vec<Line<f64>> = lines
        .iter()
        .flat_map(|ls| ls.lines())
        .filter(|l| vertex_key(l.start) != vertex_key(l.end))
        .collect();

    let mut edges: Vec<Edge> = Vec::new();
    let mut seen: BTreeSet<(VertexKey, VertexKey)> = BTreeSet::new();

    for (i, seg) in segments.iter().enumerate() {
        // Parâmetros t ao longo do segmento onde ele deve ser cortado
        let mut cuts: Vec<f64> = vec![0.0, 1.0];

        for (j, other) in segments.iter().enumerate() {
            if i == j {
                continue;
            }
            match line_intersection(*seg, *other) {
                Some(LineIntersection::SinglePoint { intersection, .. }) => {
                    cuts.push(parameter_on(seg, intersection));
                }
                Some(LineIntersection::Collinear { intersection }) => {
                    cuts.push(parameter_on(seg, intersection.start));
                    cuts.push(parameter_on(seg, intersection.end));
                }
                None => {}
            }
        }

        cuts.retain(|t| (0.0..=1.0).contains(t));
        cuts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let dx = seg.end.x - seg.start.x;
        let dy = seg.end.y - seg.start.y;

        for window in cuts.windows(2) {
            let (t0, t1) = (window[0], window[1]);
            let a = Coord {
                x: seg.start.x + dx * t0,
                y: seg.start.y + dy * t0,
            };
            let b = Coord {
                x: seg.start.x + dx * t1,
                y: seg.start.y + dy * t1,
            };
            let (ka, kb) = (vertex_key(a), vertex_key(b));
            if ka == kb {
                continue;
            }
            let id = if ka < kb { (ka, kb) } else { (kb, ka) };
            if seen.insert(id) {
                edges.push(Edge { a, b });
            }
        }
    }

    edges
}

/// Parâmetro t de um ponto sobre um segmento (projeção no eixo dominante)
fn parameter_on(seg: &Line<f64>, point: Coord<f64>) -> f64 {
    let dx = seg.end.x - seg.start.x;
    let dy = seg.end.y - seg.start.y;
    if dx.abs() >= dy.abs() {
        if dx == 0.0 {
            0.0
        } else {
            (point.x - seg.start.x) / dx
        }
    } else {
        (point.y - seg.start.y) / dy
    }
}

/// Remove iterativamente arestas com extremidade de grau 1 (culs-de-sac).
/// Pontas de linhas estendidas que não participam de nenhum anel somem aqui.
pub fn remove_dead_ends(edges: &mut Vec<Edge>) {
    loop {
        let initial = edges.len();

        let mut degree: std::collections::BTreeMap<VertexKey, usize> =
            std::collections::BTreeMap::new();
        for edge in edges.iter() {
            *degree.entry(vertex_key(edge.a)).or_insert(0) += 1;
            *degree.entry(vertex_key(edge.b)).or_insert(0) += 1;
        }

        edges.retain(|edge| {
            degree.get(&vertex_key(edge.a)).copied().unwrap_or(0) >= 2
                && degree.get(&vertex_key(edge.b)).copied().unwrap_or(0) >= 2
        });

        if edges.len() == initial {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ls(coords: Vec<(f64, f64)>) -> LineString<f64> {
        LineString::from(coords)
    }

    #[test]
    fn test_node_crossing_lines() {
        let lines = vec![
            ls(vec![(0.0, 5.0), (10.0, 5.0)]),
            ls(vec![(5.0, 0.0), (5.0, 10.0)]),
        ];
        let edges = node_lines(&lines);
        // Cada linha é cortada em 2 no cruzamento
        assert_eq!(edges.len(), 4);
    }

    #[test]
    fn test_node_dedups_overlapping() {
        let lines = vec![
            ls(vec![(0.0, 0.0), (10.0, 0.0)]),
            ls(vec![(0.0, 0.0), (10.0, 0.0)]),
        ];
        let edges = node_lines(&lines);
        assert_eq!(edges.len(), 1);
    }

    #[test]
    fn test_node_collinear_partial_overlap() {
        let lines = vec![
            ls(vec![(0.0, 0.0), (10.0, 0.0)]),
            ls(vec![(5.0, 0.0), (15.0, 0.0)]),
        ];
        let edges = node_lines(&lines);
        // 0-5, 5-10, 10-15
        assert_eq!(edges.len(), 3);
    }

    #[test]
    fn test_remove_dead_ends() {
        let lines = vec![
            // Quadrado fechado
            ls(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)]),
            // Ponta solta tocando o quadrado
            ls(vec![(4.0, 2.0), (8.0, 2.0)]),
        ];
        let mut edges = node_lines(&lines);
        remove_dead_ends(&mut edges);
        // Restam o quadrado (4 lados, sendo o lado direito cortado em 2)
        assert_eq!(edges.len(), 5);
    }
}
