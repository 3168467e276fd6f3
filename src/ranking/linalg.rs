// Dense linear solver for the ranking systems
//
// Gaussian elimination with partial pivoting. Ranking systems are at most a
// few hundred teams, so an O(n^3) dense solve is fine.

const SINGULAR_EPSILON: f64 = 1e-10;

/// Square coefficient matrix, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    size: usize,
    cells: Vec<f64>,
}

impl Matrix {
    pub fn zeros(size: usize) -> Self {
        Matrix {
            size,
            cells: vec![0.0; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.size + col]
    }

    pub fn add(&mut self, row: usize, col: usize, amount: f64) {
        self.cells[row * self.size + col] += amount;
    }

    /// Add `amount` to every coefficient
    pub fn add_all(&mut self, amount: f64) {
        for cell in &mut self.cells {
            *cell += amount;
        }
    }

    /// Solve `self * x = rhs`; `None` when the matrix is singular
    pub fn solve(mut self, rhs: &[f64]) -> Option<Vec<f64>> {
        let n = self.size;
        if rhs.len() != n {
            return None;
        }
        let mut b = rhs.to_vec();

        for col in 0..n {
            let pivot = (col..n).max_by(|&a, &c| {
                self.get(a, col).abs().total_cmp(&self.get(c, col).abs())
            })?;
            if self.get(pivot, col).abs() < SINGULAR_EPSILON {
                return None;
            }
            if pivot != col {
                for k in 0..n {
                    self.cells.swap(pivot * n + k, col * n + k);
                }
                b.swap(pivot, col);
            }

            for row in (col + 1)..n {
                let factor = self.get(row, col) / self.get(col, col);
                if factor == 0.0 {
                    continue;
                }
                for k in col..n {
                    let delta = factor * self.get(col, k);
                    self.add(row, k, -delta);
                }
                b[row] -= factor * b[col];
            }
        }

        let mut x = vec![0.0; n];
        for row in (0..n).rev() {
            let tail: f64 = ((row + 1)..n).map(|k| self.get(row, k) * x[k]).sum();
            x[row] = (b[row] - tail) / self.get(row, row);
        }
        Some(x)
    }
}
