//! Parallel-edge layout.
//!
//! Several logical links between the same two nodes are fanned out so each
//! one stays visible: at most one is drawn straight, the rest bow out on
//! alternating sides with increasing offsets. Everything here is a pure
//! function of the ordered edge list and node positions.

use serde::Serialize;

use crate::models::{GraphDocument, GraphEdge, Position};

/// Offset step for near-vertical chords
pub const VERTICAL_BASE_OFFSET: f64 = 60.0;
/// Offset step for near-horizontal chords
pub const HORIZONTAL_BASE_OFFSET: f64 = 40.0;
/// Offset step for everything else
pub const DIAGONAL_BASE_OFFSET: f64 = 50.0;

/// A chord is near-vertical when |dx| <= ratio * |dy| (and vice versa)
const AXIS_RATIO: f64 = 0.25;

/// Port labels sit this far along the chord from either end
const LABEL_FRACTION: f64 = 0.2;
/// Share of the curve offset applied to label displacement
const LABEL_OFFSET_FRACTION: f64 = 0.25;

/// Rendering descriptor for a single edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathDescriptor {
    /// 0 is straight; sign picks the side, magnitude the distance rank
    pub path_type: i32,
    /// Signed perpendicular offset of the curve's control point
    pub offset: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Vertical,
    Horizontal,
    Diagonal,
}

impl Orientation {
    /// Classify the chord between two positions
    pub fn of(source: Position, target: Position) -> Self {
        let dx = (target.x - source.x).abs();
        let dy = (target.y - source.y).abs();
        if dx <= AXIS_RATIO * dy {
            Orientation::Vertical
        } else if dy <= AXIS_RATIO * dx {
            Orientation::Horizontal
        } else {
            Orientation::Diagonal
        }
    }

    pub fn base_offset(self) -> f64 {
        match self {
            Orientation::Vertical => VERTICAL_BASE_OFFSET,
            Orientation::Horizontal => HORIZONTAL_BASE_OFFSET,
            Orientation::Diagonal => DIAGONAL_BASE_OFFSET,
        }
    }
}

/// Path type of `edge` among `all_edges`.
///
/// A forced path type on the edge wins. Otherwise the pair's orientation is
/// taken from the first edge between the two nodes, so every edge of the pair
/// agrees on which direction is "A to B".
pub fn path_type(edge: &GraphEdge, all_edges: &[GraphEdge]) -> i32 {
    if let Some(forced) = edge.data.force_path_type {
        return forced;
    }

    let (a, b) = all_edges
        .iter()
        .find(|e| connects(e, &edge.source, &edge.target))
        .map(|e| (e.source.as_str(), e.target.as_str()))
        .unwrap_or((edge.source.as_str(), edge.target.as_str()));

    let forward: Vec<&GraphEdge> = all_edges
        .iter()
        .filter(|e| e.source == a && e.target == b)
        .collect();
    let backward: Vec<&GraphEdge> = if a == b {
        Vec::new()
    } else {
        all_edges
            .iter()
            .filter(|e| e.source == b && e.target == a)
            .collect()
    };

    let is_forward = edge.source == a;
    let (own, other) = if is_forward {
        (&forward, &backward)
    } else {
        (&backward, &forward)
    };

    // An edge not yet in the list lays out as if appended to its direction
    let index = own.iter().position(|e| e.id == edge.id).unwrap_or(own.len());
    let own_count = own.len().max(index + 1);
    let other_count = other.len();

    if other_count == 0 {
        return single_direction(index, own_count);
    }

    let (forward_count, backward_count) = if is_forward {
        (own_count, other_count)
    } else {
        (other_count, own_count)
    };
    let total = forward_count + backward_count;

    // Direction that owns the positive odd slots (and the straight one, if any)
    let forward_leads = total % 2 == 0 || forward_count >= backward_count;
    let leads = is_forward == forward_leads;
    let i = index as i32;

    if !leads {
        -(2 * i + 2)
    } else if total % 2 == 1 && index == 0 {
        0
    } else {
        2 * i + 1
    }
}

fn single_direction(index: usize, count: usize) -> i32 {
    let odd = count % 2 == 1;
    if odd && index == 0 {
        return 0;
    }
    let curve_index = index as i32 + if odd { 1 } else { 0 };
    if curve_index % 2 == 0 {
        curve_index + 1
    } else {
        -(curve_index + 1)
    }
}

fn connects(e: &GraphEdge, x: &str, y: &str) -> bool {
    (e.source == x && e.target == y) || (e.source == y && e.target == x)
}

/// Signed offset for a path type: `ceil(|p| / 2) * base`, sign of `p`
pub fn offset_for(path_type: i32, base_offset: f64) -> f64 {
    if path_type == 0 {
        return 0.0;
    }
    let steps = (path_type.unsigned_abs() + 1) / 2;
    f64::from(steps) * base_offset * f64::from(path_type.signum())
}

/// Lay out one edge. Missing positions fall back to the diagonal step.
pub fn layout(
    edge: &GraphEdge,
    all_edges: &[GraphEdge],
    source: Option<Position>,
    target: Option<Position>,
) -> PathDescriptor {
    let path_type = path_type(edge, all_edges);
    let base = match (source, target) {
        (Some(s), Some(t)) => Orientation::of(s, t).base_offset(),
        _ => DIAGONAL_BASE_OFFSET,
    };
    PathDescriptor {
        path_type,
        offset: offset_for(path_type, base),
    }
}

/// Unit normal of the chord, or zero for coincident endpoints
fn perpendicular(source: Position, target: Position) -> (f64, f64) {
    let dx = target.x - source.x;
    let dy = target.y - source.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        (0.0, 0.0)
    } else {
        (-dy / len, dx / len)
    }
}

/// SVG path for an edge: a line when `offset` is zero, otherwise a quadratic
/// curve whose control point is the chord midpoint pushed out by `offset`.
pub fn edge_path(source: Position, target: Position, offset: f64) -> String {
    if offset == 0.0 {
        return format!("M {} {} L {} {}", source.x, source.y, target.x, target.y);
    }
    let (nx, ny) = perpendicular(source, target);
    let cx = (source.x + target.x) / 2.0 + nx * offset;
    let cy = (source.y + target.y) / 2.0 + ny * offset;
    format!(
        "M {} {} Q {} {}, {} {}",
        source.x, source.y, cx, cy, target.x, target.y
    )
}

/// Source-side and target-side port label anchors
pub fn label_positions(source: Position, target: Position, offset: f64) -> (Position, Position) {
    let (nx, ny) = perpendicular(source, target);
    let shift = offset * LABEL_OFFSET_FRACTION;
    let at = |t: f64| Position {
        x: source.x + (target.x - source.x) * t + nx * shift,
        y: source.y + (target.y - source.y) * t + ny * shift,
    };
    (at(LABEL_FRACTION), at(1.0 - LABEL_FRACTION))
}

/// Full rendering hints for one edge of a document
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeLayout {
    pub edge_id: String,
    #[serde(flatten)]
    pub descriptor: PathDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_label: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_label: Option<Position>,
}

/// Lay out every edge of a graph document, in edge order
pub fn layout_document(doc: &GraphDocument) -> Vec<EdgeLayout> {
    doc.edges
        .iter()
        .map(|edge| {
            let source = doc.position_of(&edge.source);
            let target = doc.position_of(&edge.target);
            let descriptor = layout(edge, &doc.edges, source, target);
            let (path, labels) = match (source, target) {
                (Some(s), Some(t)) => (
                    Some(edge_path(s, t, descriptor.offset)),
                    Some(label_positions(s, t, descriptor.offset)),
                ),
                _ => (None, None),
            };
            EdgeLayout {
                edge_id: edge.id.clone(),
                descriptor,
                path,
                source_label: labels.map(|(s, _)| s),
                target_label: labels.map(|(_, t)| t),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;

    fn edge(source: &str, target: &str, n: u32) -> GraphEdge {
        GraphEdge::new(source, &format!("p{}", n), target, &format!("q{}", n))
    }

    fn types(edges: &[GraphEdge]) -> Vec<i32> {
        edges.iter().map(|e| path_type(e, edges)).collect()
    }

    #[test]
    fn test_single_edge_is_straight() {
        assert_eq!(types(&[edge("a", "b", 1)]), vec![0]);
    }

    #[test]
    fn test_one_direction_even_count() {
        let edges = vec![edge("a", "b", 1), edge("a", "b", 2), edge("a", "b", 3), edge("a", "b", 4)];
        assert_eq!(types(&edges), vec![1, -2, 3, -4]);
    }

    #[test]
    fn test_one_direction_odd_count() {
        let edges = vec![edge("a", "b", 1), edge("a", "b", 2), edge("a", "b", 3)];
        assert_eq!(types(&edges), vec![0, 3, -4]);
    }

    #[test]
    fn test_bidirectional_odd_total() {
        let edges = vec![edge("a", "b", 1), edge("a", "b", 2), edge("b", "a", 3)];
        assert_eq!(types(&edges), vec![0, 3, -2]);
    }

    #[test]
    fn test_bidirectional_odd_total_reverse_leads() {
        // Pair orientation comes from the first edge, but the larger direction owns the straight slot
        let edges = vec![edge("a", "b", 1), edge("b", "a", 2), edge("b", "a", 3)];
        assert_eq!(types(&edges), vec![-2, 0, 3]);
    }

    #[test]
    fn test_bidirectional_even_total() {
        let edges = vec![edge("a", "b", 1), edge("b", "a", 2), edge("a", "b", 3), edge("b", "a", 4)];
        assert_eq!(types(&edges), vec![1, -2, 3, -4]);
    }

    #[test]
    fn test_unrelated_pairs_do_not_interact() {
        let edges = vec![edge("a", "b", 1), edge("a", "c", 2), edge("a", "b", 3)];
        assert_eq!(types(&edges), vec![1, 0, -2]);
    }

    #[test]
    fn test_forced_path_type_is_verbatim() {
        let mut forced = edge("a", "b", 2);
        forced.data.force_path_type = Some(7);
        let edges = vec![edge("a", "b", 1), forced];
        assert_eq!(types(&edges), vec![1, 7]);
    }

    #[test]
    fn test_edge_not_in_list_lays_out_as_appended() {
        let edges = vec![edge("a", "b", 1)];
        assert_eq!(path_type(&edge("a", "b", 2), &edges), -2);
    }

    #[test]
    fn test_layout_is_deterministic() {
        let edges = vec![edge("a", "b", 1), edge("b", "a", 2), edge("a", "b", 3)];
        let first: Vec<_> = edges.iter().map(|e| layout(e, &edges, None, None)).collect();
        let second: Vec<_> = edges.iter().map(|e| layout(e, &edges, None, None)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_offset_for() {
        assert_eq!(offset_for(0, 50.0), 0.0);
        assert_eq!(offset_for(1, 50.0), 50.0);
        assert_eq!(offset_for(-2, 50.0), -50.0);
        assert_eq!(offset_for(3, 40.0), 80.0);
        assert_eq!(offset_for(-4, 60.0), -120.0);
    }

    #[test]
    fn test_orientation_base_offsets() {
        let origin = Position { x: 0.0, y: 0.0 };
        assert_eq!(Orientation::of(origin, Position { x: 10.0, y: 100.0 }), Orientation::Vertical);
        assert_eq!(Orientation::of(origin, Position { x: 100.0, y: 20.0 }), Orientation::Horizontal);
        assert_eq!(Orientation::of(origin, Position { x: 100.0, y: 100.0 }), Orientation::Diagonal);

        let edges = vec![edge("a", "b", 1), edge("a", "b", 2)];
        let d = layout(&edges[0], &edges, Some(origin), Some(Position { x: 0.0, y: 200.0 }));
        assert_eq!(d.offset, 60.0);
        let d = layout(&edges[1], &edges, None, None);
        assert_eq!(d.offset, -50.0);
    }

    #[test]
    fn test_edge_path() {
        let s = Position { x: 0.0, y: 0.0 };
        let t = Position { x: 100.0, y: 0.0 };
        assert_eq!(edge_path(s, t, 0.0), "M 0 0 L 100 0");
        assert_eq!(edge_path(s, t, 40.0), "M 0 0 Q 50 40, 100 0");
    }

    #[test]
    fn test_label_positions() {
        let s = Position { x: 0.0, y: 0.0 };
        let t = Position { x: 100.0, y: 0.0 };
        let (a, b) = label_positions(s, t, 40.0);
        assert!((a.x - 20.0).abs() < 1e-9 && (a.y - 10.0).abs() < 1e-9);
        assert!((b.x - 80.0).abs() < 1e-9 && (b.y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_layout_document() {
        let doc = GraphDocument {
            nodes: vec![
                fixtures::node("n1", 1, "r1", 0.0, 0.0),
                fixtures::node("n2", 2, "r2", 100.0, 0.0),
            ],
            edges: vec![edge("n1", "n2", 1), edge("n2", "n1", 2)],
            viewport: None,
        };
        let layouts = layout_document(&doc);
        assert_eq!(layouts.len(), 2);
        assert_eq!(layouts[0].descriptor, PathDescriptor { path_type: 1, offset: 40.0 });
        assert_eq!(layouts[1].descriptor, PathDescriptor { path_type: -2, offset: -40.0 });
        assert_eq!(layouts[0].path.as_deref(), Some("M 0 0 Q 50 40, 100 0"));

        let json = serde_json::to_value(&layouts[1]).unwrap();
        assert_eq!(json["pathType"], -2);
        assert_eq!(json["edgeId"], doc.edges[1].id);
    }
}
