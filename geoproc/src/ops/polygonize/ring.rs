//! Extração de anéis mínimos do grafo planar nodado
//!
//! Meias-arestas ordenadas por ângulo em cada nó; o percurso que toma sempre
//! a aresta predecessora da gêmea (giro mais fechado) enumera cada face do
//! arranjo exatamente uma vez. Faces com área orientada positiva são as
//! células limitadas.

use std::collections::BTreeMap;

use geo::{Coord, LineString};

use super::noding::{vertex_key, Edge, VertexKey};

#[derive(Debug, Clone, Copy)]
struct HalfEdge {
    from: usize,
    to: usize,
    twin: usize,
}

/// Enumera os anéis fechados (células limitadas) do conjunto de arestas
pub fn extract_rings(edges: &[Edge]) -> Vec<LineString<f64>> {
    if edges.is_empty() {
        return Vec::new();
    }

    // Nós canônicos
    let mut node_index: BTreeMap<VertexKey, usize> = BTreeMap::new();
    let mut nodes: Vec<Coord<f64>> = Vec::new();
    let mut node_of = |c: Coord<f64>, nodes: &mut Vec<Coord<f64>>| -> usize {
        let key = vertex_key(c);
        *node_index.entry(key).or_insert_with(|| {
            nodes.push(c);
            nodes.len() - 1
        })
    };

    // Meias-arestas (duas por aresta, gêmeas adjacentes)
    let mut half_edges: Vec<HalfEdge> = Vec::with_capacity(edges.len() * 2);
    for edge in edges {
        let a = node_of(edge.a, &mut nodes);
        let b = node_of(edge.b, &mut nodes);
        if a == b {
            continue;
        }
        let forward = half_edges.len();
        half_edges.push(HalfEdge {
            from: a,
            to: b,
            twin: forward + 1,
        });
        half_edges.push(HalfEdge {
            from: b,
            to: a,
            twin: forward,
        });
    }

    // Saídas de cada nó ordenadas por ângulo crescente
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (id, he) in half_edges.iter().enumerate() {
        outgoing[he.from].push(id);
    }
    for (node, out) in outgoing.iter_mut().enumerate() {
        let origin = nodes[node];
        out.sort_by(|&l, &r| {
            let al = angle_of(origin, nodes[half_edges[l].to]);
            let ar = angle_of(origin, nodes[half_edges[r].to]);
            al.partial_cmp(&ar).unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    // Posição de cada meia-aresta na ordenação do seu nó de origem
    let mut position: Vec<usize> = vec![0; half_edges.len()];
    for out in &outgoing {
        for (pos, &id) in out.iter().enumerate() {
            position[id] = pos;
        }
    }

    // next(e) = predecessora da gêmea na ordem angular do nó de chegada
    let next = |e: usize| -> usize {
        let twin = half_edges[e].twin;
        let at = half_edges[twin].from;
        let out = &outgoing[at];
        let pos = position[twin];
        out[(pos + out.len() - 1) % out.len()]
    };

    let mut visited = vec![false; half_edges.len()];
    let mut rings = Vec::new();

    for start in 0..half_edges.len() {
        if visited[start] {
            continue;
        }

        let mut coords: Vec<Coord<f64>> = Vec::new();
        let mut current = start;
        loop {
            visited[current] = true;
            coords.push(nodes[half_edges[current].from]);
            current = next(current);
            if current == start {
                break;
            }
        }

        if coords.len() < 3 {
            continue;
        }
        coords.push(coords[0]);

        if signed_area(&coords) > 1e-12 {
            rings.push(LineString::new(coords));
        }
    }

    rings
}

fn angle_of(from: Coord<f64>, to: Coord<f64>) -> f64 {
    (to.y - from.y).atan2(to.x - from.x)
}

/// Área orientada (shoelace); positiva para anéis anti-horários
pub fn signed_area(coords: &[Coord<f64>]) -> f64 {
    let mut sum = 0.0;
    for window in coords.windows(2) {
        sum += window[0].x * window[1].y - window[1].x * window[0].y;
    }
    sum / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::polygonize::noding::node_lines;

    #[test]
    fn test_single_square_one_ring() {
        let lines = vec![LineString::from(vec![
            (0.0, 0.0),
            (4.0, 0.0),
            (4.0, 4.0),
            (0.0, 4.0),
            (0.0, 0.0),
        ])];
        let edges = node_lines(&lines);
        let rings = extract_rings(&edges);
        assert_eq!(rings.len(), 1);
        assert!((signed_area(&rings[0].0) - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_square_split_in_two() {
        let lines = vec![
            LineString::from(vec![
                (0.0, 0.0),
                (4.0, 0.0),
                (4.0, 4.0),
                (0.0, 4.0),
                (0.0, 0.0),
            ]),
            LineString::from(vec![(2.0, 0.0), (2.0, 4.0)]),
        ];
        let edges = node_lines(&lines);
        let rings = extract_rings(&edges);
        assert_eq!(rings.len(), 2);
        let total: f64 = rings.iter().map(|r| signed_area(&r.0)).sum();
        assert!((total - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_cross_split_in_four() {
        let lines = vec![
            LineString::from(vec![
                (0.0, 0.0),
                (4.0, 0.0),
                (4.0, 4.0),
                (0.0, 4.0),
                (0.0, 0.0),
            ]),
            LineString::from(vec![(2.0, -1.0), (2.0, 5.0)]),
            LineString::from(vec![(-1.0, 2.0), (5.0, 2.0)]),
        ];
        let mut edges = node_lines(&lines);
        super::super::noding::remove_dead_ends(&mut edges);
        let rings = extract_rings(&edges);
        assert_eq!(rings.len(), 4);
        for ring in &rings {
            assert!((signed_area(&ring.0) - 4.0).abs() < 1e-9);
        }
    }
}
