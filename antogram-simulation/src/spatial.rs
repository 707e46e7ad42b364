use antogram_core::{Canvas, Point};
use smallvec::SmallVec;
use std::collections::HashMap;

// --- Spatial Partitioning ---

/// Uniform grid over agent positions, rebuilt once per tick.
///
/// Entries are indices into the slice passed to [`SpatialGrid::rebuild`].
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    columns: i32,
    rows: i32,
    cells: HashMap<(i32, i32), SmallVec<[usize; 8]>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32, canvas: Canvas) -> Self {
        let cell_size = cell_size.max(1.0);
        Self {
            cell_size,
            columns: ((canvas.width / cell_size).ceil() as i32).max(1),
            rows: ((canvas.height / cell_size).ceil() as i32).max(1),
            cells: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Cell coordinates for a position, clamped to the grid.
    fn cell_of(&self, position: Point) -> (i32, i32) {
        let x = (position.x / self.cell_size).floor() as i32;
        let y = (position.y / self.cell_size).floor() as i32;
        (x.clamp(0, self.columns - 1), y.clamp(0, self.rows - 1))
    }

    pub fn rebuild(&mut self, positions: &[Point]) {
        self.cells.clear();
        for (index, &position) in positions.iter().enumerate() {
            let cell = self.cell_of(position);
            self.cells.entry(cell).or_default().push(index);
        }
    }

    /// Candidates within `radius` of `center`; callers still check the exact
    /// distance.
    pub fn query_radius(&self, center: Point, radius: f32) -> SmallVec<[usize; 16]> {
        let mut result = SmallVec::new();
        let reach = (radius / self.cell_size).ceil() as i32;
        let (cx, cy) = self.cell_of(center);

        for dx in -reach..=reach {
            for dy in -reach..=reach {
                if let Some(entries) = self.cells.get(&(cx + dx, cy + dy)) {
                    result.extend_from_slice(entries);
                }
            }
        }
        result
    }
}

/// Repulsion from every other position within `radius` of `positions[index]`,
/// each weighted by inverse distance, averaged, then scaled to `magnitude`.
pub fn separation_force(
    grid: &SpatialGrid,
    positions: &[Point],
    index: usize,
    radius: f32,
    magnitude: f32,
) -> Point {
    let position = positions[index];
    let mut sum = Point::ZERO;
    let mut count = 0usize;

    for other in grid.query_radius(position, radius) {
        if other == index {
            continue;
        }
        let offset = position - positions[other];
        let distance = offset.length();
        // Coincident agents have no defined direction
        if distance < radius && distance > f32::EPSILON {
            sum += offset / distance / distance;
            count += 1;
        }
    }

    if count == 0 {
        return Point::ZERO;
    }
    (sum / count as f32).normalize_or_zero() * magnitude
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_finds_nearby_entries_only() {
        let mut grid = SpatialGrid::new(10.0, Canvas::new(100.0, 100.0));
        let positions = [
            Point::new(5.0, 5.0),
            Point::new(12.0, 5.0),
            Point::new(90.0, 90.0),
        ];
        grid.rebuild(&positions);

        let found = grid.query_radius(Point::new(6.0, 6.0), 10.0);
        assert!(found.contains(&0));
        assert!(found.contains(&1));
        assert!(!found.contains(&2));
    }

    #[test]
    fn out_of_bounds_positions_are_clamped_into_edge_cells() {
        let mut grid = SpatialGrid::new(10.0, Canvas::new(50.0, 50.0));
        grid.rebuild(&[Point::new(-20.0, 400.0)]);
        assert_eq!(grid.query_radius(Point::new(0.0, 49.0), 1.0).as_slice(), &[0]);
    }

    #[test]
    fn separation_pushes_away_from_neighbours() {
        let positions = [
            Point::new(50.0, 50.0),
            Point::new(60.0, 50.0),
            Point::new(50.0, 50.0),
            Point::new(200.0, 200.0),
        ];
        let mut grid = SpatialGrid::new(48.0, Canvas::new(300.0, 300.0));
        grid.rebuild(&positions);

        let force = separation_force(&grid, &positions, 0, 48.0, 1.5);
        assert!(force.x < 0.0);
        assert!(force.y.abs() < 1e-5);
        assert!((force.length() - 1.5).abs() < 1e-4);

        assert_eq!(separation_force(&grid, &positions, 3, 48.0, 1.5), Point::ZERO);
    }
}
