use cgmath::Vector3;

/// Integer coordinate of a cell on the ground-plane pathfinding grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCell {
    pub x: i32,
    pub z: i32,
}

/// Offsets of the 8-connected neighbourhood, orthogonal steps first.
pub const NEIGHBOUR_OFFSETS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

impl GridCell {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Convert world position to grid cell.
    ///
    /// # Arguments
    ///
    /// * `world_pos` - The world position; the vertical component is ignored.
    /// * `cell_size` - Edge length of one cell.
    ///
    /// # Returns
    ///
    /// The cell containing the position.
    pub fn from_world(world_pos: Vector3<f32>, cell_size: f32) -> Self {
        Self {
            x: (world_pos.x / cell_size).round() as i32,
            z: (world_pos.z / cell_size).round() as i32,
        }
    }

    /// Convert grid cell to the world position of its centre, on the ground.
    pub fn to_world(self, cell_size: f32) -> Vector3<f32> {
        Vector3::new(self.x as f32 * cell_size, 0.0, self.z as f32 * cell_size)
    }

    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.z + dz)
    }

    /// Calculate Manhattan distance between two cells.
    pub fn manhattan_distance(self, other: GridCell) -> i32 {
        (self.x - other.x).abs() + (self.z - other.z).abs()
    }

    /// Calculate Chebyshev distance between two cells.
    pub fn chebyshev_distance(self, other: GridCell) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }

    /// Whether `other` is this cell or one of its 8 neighbours.
    pub fn is_adjacent_or_same(self, other: GridCell) -> bool {
        self.chebyshev_distance(other) <= 1
    }

    /// All 8 neighbours, orthogonal first.
    pub fn neighbours(self) -> impl Iterator<Item = GridCell> {
        NEIGHBOUR_OFFSETS
            .into_iter()
            .map(move |(dx, dz)| self.offset(dx, dz))
    }

    /// Cells on the square ring at Chebyshev distance `radius`.
    pub fn ring(self, radius: i32) -> Vec<GridCell> {
        if radius <= 0 {
            return vec![self];
        }
        let mut cells = Vec::with_capacity((radius * 8) as usize);
        for dx in -radius..=radius {
            cells.push(self.offset(dx, -radius));
            cells.push(self.offset(dx, radius));
        }
        for dz in (-radius + 1)..radius {
            cells.push(self.offset(-radius, dz));
            cells.push(self.offset(radius, dz));
        }
        cells
    }
}
