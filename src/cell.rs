use nalgebra::{Matrix3, Vector3};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CellError {
    #[error("Cell matrix is not invertible")]
    NotInvertible,
}

/// Simulation cell. Columns of `h` are the lattice vectors a, b, c.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    h: Matrix3<f64>,
    h_inv: Matrix3<f64>,
    pbc: Vector3<bool>,
}

impl Cell {
    pub fn new(h: Matrix3<f64>, pbc: Vector3<bool>) -> Result<Self, CellError> {
        let h_inv = h.try_inverse().ok_or(CellError::NotInvertible)?;
        Ok(Self { h, h_inv, pbc })
    }

    /// Builds a cell from lattice vectors given as rows, the layout used by
    /// structure files.
    pub fn from_rows(rows: [[f64; 3]; 3], pbc: [bool; 3]) -> Result<Self, CellError> {
        // Transpose row-major lattice vectors to internal column-major
        let h = Matrix3::new(
            rows[0][0], rows[1][0], rows[2][0], rows[0][1], rows[1][1], rows[2][1], rows[0][2],
            rows[1][2], rows[2][2],
        );
        Self::new(h, Vector3::new(pbc[0], pbc[1], pbc[2]))
    }

    pub fn to_fractional(&self, cart: &Vector3<f64>) -> Vector3<f64> {
        self.h_inv * cart
    }

    pub fn to_cartesian(&self, frac: &Vector3<f64>) -> Vector3<f64> {
        self.h * frac
    }

    pub fn h(&self) -> &Matrix3<f64> {
        &self.h
    }

    pub fn h_inv(&self) -> &Matrix3<f64> {
        &self.h_inv
    }

    pub fn pbc(&self) -> &Vector3<bool> {
        &self.pbc
    }

    pub fn is_periodic(&self) -> bool {
        self.pbc.iter().any(|&p| p)
    }

    /// Returns the perpendicular widths of the cell (distances between parallel faces).
    /// d_i = 1 / |h_inv.row(i)|
    pub fn perpendicular_widths(&self) -> Vector3<f64> {
        Vector3::new(
            1.0 / self.h_inv.row(0).norm(),
            1.0 / self.h_inv.row(1).norm(),
            1.0 / self.h_inv.row(2).norm(),
        )
    }

    /// Lengths of the lattice vectors a, b, c.
    pub fn lattice_widths(&self) -> Vector3<f64> {
        Vector3::new(
            self.h.column(0).norm(),
            self.h.column(1).norm(),
            self.h.column(2).norm(),
        )
    }

    /// Integer translation that moves `cart` into the home cell along the
    /// periodic axes.
    pub fn wrap_shift(&self, cart: &Vector3<f64>) -> Vector3<i32> {
        let frac = self.to_fractional(cart);
        Vector3::new(
            if self.pbc.x { -frac.x.floor() as i32 } else { 0 },
            if self.pbc.y { -frac.y.floor() as i32 } else { 0 },
            if self.pbc.z { -frac.z.floor() as i32 } else { 0 },
        )
    }

    /// Cartesian translation for an integer image.
    pub fn image_translation(&self, image: &Vector3<i32>) -> Vector3<f64> {
        self.h * image.cast::<f64>()
    }

    pub fn wrap(&self, cart: &Vector3<f64>) -> Vector3<f64> {
        let frac = self.to_fractional(cart);
        let wrapped_frac = Vector3::new(
            if self.pbc.x {
                frac.x - frac.x.floor()
            } else {
                frac.x
            },
            if self.pbc.y {
                frac.y - frac.y.floor()
            } else {
                frac.y
            },
            if self.pbc.z {
                frac.z - frac.z.floor()
            } else {
                frac.z
            },
        );
        self.to_cartesian(&wrapped_frac)
    }

    pub fn get_shift_and_displacement(
        &self,
        r_i: &Vector3<f64>,
        r_j: &Vector3<f64>,
    ) -> (Vector3<i32>, Vector3<f64>) {
        let d_frac = self.to_fractional(&(r_j - r_i));
        let shift_frac = Vector3::new(
            if self.pbc.x { -d_frac.x.round() } else { 0.0 },
            if self.pbc.y { -d_frac.y.round() } else { 0.0 },
            if self.pbc.z { -d_frac.z.round() } else { 0.0 },
        );
        let shift = Vector3::new(
            shift_frac.x as i32,
            shift_frac.y as i32,
            shift_frac.z as i32,
        );
        let r_j_img = r_j + self.h * shift_frac;
        let disp = r_j_img - r_i;
        (shift, disp)
    }

    /// Axis-aligned box enclosing `positions` with `margin` on every side,
    /// non-periodic. Returns the cell and the origin it is anchored at.
    pub fn bounding_box(
        positions: &[Vector3<f64>],
        margin: f64,
    ) -> Result<(Self, Vector3<f64>), CellError> {
        let mut min_bound = Vector3::repeat(f64::INFINITY);
        let mut max_bound = Vector3::repeat(f64::NEG_INFINITY);
        for p in positions {
            min_bound = min_bound.inf(p);
            max_bound = max_bound.sup(p);
        }
        if positions.is_empty() {
            min_bound = Vector3::zeros();
            max_bound = Vector3::zeros();
        }
        let span = max_bound - min_bound;
        let h = Matrix3::from_diagonal(&(span + Vector3::repeat(2.0 * margin)));
        let origin = min_bound - Vector3::repeat(margin);
        let cell = Cell::new(h, Vector3::new(false, false, false))?;
        Ok((cell, origin))
    }
}
