//! The `SimulationBox` type represents the region of space containing a
//! configuration, together with its periodic boundary conditions.
use std::f64::consts::PI;

use log::{info, warn};

use crate::{Error, Matrix3, Vector3D};

/// The type of a box determines which algorithm is used to apply periodic
/// boundary conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
pub enum BoxType {
    /// Finite region of space without periodic boundary conditions
    NonPeriodic,
    /// Cubic box, all lengths are equal and all angles are 90°
    Cubic,
    /// Orthorhombic box, with a cuboid shape
    Orthorhombic,
    /// Monoclinic box, where α (the angle between `b` and `c`) is not 90°
    Monoclinic,
    /// Triclinic box, with arbitrary parallelepiped shape
    Triclinic,
}

impl std::fmt::Display for BoxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BoxType::NonPeriodic => "Non-Periodic",
            BoxType::Cubic => "Cubic",
            BoxType::Orthorhombic => "Orthorhombic",
            BoxType::Monoclinic => "Monoclinic",
            BoxType::Triclinic => "Triclinic",
        };
        f.write_str(name)
    }
}

/// Data used by the minimum image convention, specific to each type of box.
/// Boxes with non-diagonal axes only need the inverse axes, which are stored
/// in `SimulationBox` directly.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Periodicity {
    NonPeriodic,
    Cubic {
        length: f64,
        reciprocal_length: f64,
    },
    Orthorhombic {
        lengths: Vector3D,
        reciprocal_lengths: Vector3D,
    },
    Monoclinic,
    Triclinic,
}

/// A `SimulationBox` defines the physical boundaries of a configuration.
///
/// The box axes are stored as the rows of a matrix. All derived quantities
/// (inverse, volume, reciprocal axes, inscribed sphere radius, ...) are
/// computed once at construction, and updated together when the box is
/// rescaled.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationBox {
    /// Box type and type-specific data
    periodicity: Periodicity,
    /// Box axes, stored as rows
    matrix: Matrix3,
    /// Transpose of the box matrix, the axes are the columns
    transpose: Matrix3,
    /// Inverse of the transpose, converting Cartesian to fractional coordinates
    inverse: Matrix3,
    /// Reciprocal axes, stored as rows and including the 2π factor
    reciprocal: Matrix3,
    /// Lengths of the three axes
    lengths: Vector3D,
    /// Angles α, β and γ, in degrees
    angles: Vector3D,
    volume: f64,
    reciprocal_volume: f64,
    inscribed_sphere_radius: f64,
}

/// Get the nearest integer to `value`, rounding half away from zero.
///
/// This truncates `value ± 0.5`, which is faster than `f64::round` and gives
/// the same result for all values used for periodic boundary conditions.
/// `value` must fit in an `i32`, i.e. positions can not be more than 2³¹ box
/// lengths apart.
#[inline]
fn nearest_integer(value: f64) -> f64 {
    debug_assert!(
        value.abs() < i32::MAX as f64,
        "displacement of {} box lengths is too large for periodic boundary conditions", value
    );
    let shifted = if value < 0.0 { value - 0.5 } else { value + 0.5 };
    return shifted as i32 as f64;
}

/// Fold a single coordinate inside `[0, length)`
#[inline]
fn fold_coordinate(x: f64, length: f64, reciprocal_length: f64) -> f64 {
    let folded = x - f64::floor(x * reciprocal_length) * length;
    // rounding can give exactly `length` for tiny negative values
    if folded >= length { folded - length } else { folded }
}

/// Get the angle between the vectors `u` and `v`, in radians
fn angle(u: Vector3D, v: Vector3D) -> f64 {
    let cos = u.normalized() * v.normalized();
    f64::acos(f64::clamp(cos, -1.0, 1.0))
}

fn check_lengths(a: f64, b: f64, c: f64) -> Result<(), Error> {
    if !(a > 0.0 && b > 0.0 && c > 0.0) {
        return Err(Error::InvalidParameter(format!(
            "box lengths must be positive, got a={}, b={}, c={}", a, b, c
        )));
    }
    Ok(())
}

fn check_angle(name: &str, value: f64) -> Result<(), Error> {
    if !(value > 0.0 && value < 180.0) {
        return Err(Error::InvalidParameter(format!(
            "box angle {} must be between 0 and 180 degrees, got {}", name, value
        )));
    }
    Ok(())
}

impl SimulationBox {
    /// Create a cubic box with side length `length`.
    pub fn cubic(length: f64) -> Result<SimulationBox, Error> {
        check_lengths(length, length, length)?;
        let matrix = Matrix3::new([
            [length, 0.0, 0.0],
            [0.0, length, 0.0],
            [0.0, 0.0, length],
        ]);
        return SimulationBox::build(BoxType::Cubic, matrix);
    }

    /// Create an orthorhombic box with side lengths `a, b, c`.
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Result<SimulationBox, Error> {
        check_lengths(a, b, c)?;
        let matrix = Matrix3::new([
            [a, 0.0, 0.0],
            [0.0, b, 0.0],
            [0.0, 0.0, c],
        ]);
        return SimulationBox::build(BoxType::Orthorhombic, matrix);
    }

    /// Create a monoclinic box with side lengths `a, b, c` and angle `alpha`
    /// (in degrees) between the `b` and `c` axes. The two other angles are
    /// 90°.
    pub fn monoclinic(a: f64, b: f64, c: f64, alpha: f64) -> Result<SimulationBox, Error> {
        check_lengths(a, b, c)?;
        check_angle("alpha", alpha)?;
        let matrix = triclinic_matrix(a, b, c, alpha, 90.0, 90.0)?;
        return SimulationBox::build(BoxType::Monoclinic, matrix);
    }

    /// Create a triclinic box with side lengths `a, b, c` and angles
    /// `alpha, beta, gamma` in degrees. The `a` axis is aligned with x, and
    /// the `b` axis is in the xy plane.
    pub fn triclinic(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Result<SimulationBox, Error> {
        check_lengths(a, b, c)?;
        check_angle("alpha", alpha)?;
        check_angle("beta", beta)?;
        check_angle("gamma", gamma)?;
        let matrix = triclinic_matrix(a, b, c, alpha, beta, gamma)?;
        return SimulationBox::build(BoxType::Triclinic, matrix);
    }

    /// Create a non-periodic box, i.e. a cuboid region of space with side
    /// lengths `a, b, c` and no periodic boundary conditions. The region is
    /// only used to build cell arrays and generate random coordinates.
    pub fn non_periodic(a: f64, b: f64, c: f64) -> Result<SimulationBox, Error> {
        check_lengths(a, b, c)?;
        let matrix = Matrix3::new([
            [a, 0.0, 0.0],
            [0.0, b, 0.0],
            [0.0, 0.0, c],
        ]);
        return SimulationBox::build(BoxType::NonPeriodic, matrix);
    }

    /// Create a periodic box from its lengths and angles (in degrees), using
    /// the most specific box type matching these parameters.
    pub fn from_lengths_and_angles(lengths: [f64; 3], angles: [f64; 3]) -> Result<SimulationBox, Error> {
        let is_right = |angle: f64| f64::abs(angle - 90.0) < 1e-6;
        let [a, b, c] = lengths;
        let [alpha, beta, gamma] = angles;

        if is_right(alpha) && is_right(beta) && is_right(gamma) {
            let same_lengths = f64::abs(a - b) < 1e-6 * a && f64::abs(a - c) < 1e-6 * a;
            if same_lengths {
                return SimulationBox::cubic(a);
            }
            return SimulationBox::orthorhombic(a, b, c);
        } else if is_right(beta) && is_right(gamma) {
            return SimulationBox::monoclinic(a, b, c, alpha);
        }

        return SimulationBox::triclinic(a, b, c, alpha, beta, gamma);
    }

    /// Compute all derived quantities for a box with the given type and
    /// axes matrix.
    fn build(box_type: BoxType, matrix: Matrix3) -> Result<SimulationBox, Error> {
        let volume = matrix.determinant();
        if !(volume > 1e-6) {
            return Err(Error::InvalidParameter(format!(
                "box axes do not define a right-handed box with non-zero volume (volume = {})", volume
            )));
        }

        let axes = [Vector3D::from(matrix[0]), Vector3D::from(matrix[1]), Vector3D::from(matrix[2])];
        let lengths = Vector3D::new(axes[0].norm(), axes[1].norm(), axes[2].norm());
        let angles = match box_type {
            BoxType::NonPeriodic | BoxType::Cubic | BoxType::Orthorhombic => Vector3D::new(90.0, 90.0, 90.0),
            BoxType::Monoclinic | BoxType::Triclinic => Vector3D::new(
                angle(axes[1], axes[2]).to_degrees(),
                angle(axes[0], axes[2]).to_degrees(),
                angle(axes[0], axes[1]).to_degrees(),
            ),
        };

        let factor = 2.0 * PI / volume;
        let reciprocal_axes = [
            (axes[1] ^ axes[2]) * factor,
            (axes[2] ^ axes[0]) * factor,
            (axes[0] ^ axes[1]) * factor,
        ];
        let reciprocal_volume = reciprocal_axes[0] * (reciprocal_axes[1] ^ reciprocal_axes[2]);

        // the diameter of the largest inscribed sphere is the smallest
        // distance between opposite faces of the box
        let mut diameter = f64::INFINITY;
        for n in 0..3 {
            let normal = (axes[(n + 1) % 3] ^ axes[(n + 2) % 3]).normalized();
            diameter = f64::min(diameter, f64::abs(normal * axes[n]));
        }

        let periodicity = match box_type {
            BoxType::NonPeriodic => Periodicity::NonPeriodic,
            BoxType::Cubic => Periodicity::Cubic {
                length: lengths[0],
                reciprocal_length: 1.0 / lengths[0],
            },
            BoxType::Orthorhombic => Periodicity::Orthorhombic {
                lengths: lengths,
                reciprocal_lengths: lengths.map(|length| 1.0 / length),
            },
            BoxType::Monoclinic => Periodicity::Monoclinic,
            BoxType::Triclinic => Periodicity::Triclinic,
        };

        let transpose = matrix.transposed();
        return Ok(SimulationBox {
            periodicity: periodicity,
            matrix: matrix,
            transpose: transpose,
            inverse: transpose.inverse(),
            reciprocal: Matrix3::new([
                *reciprocal_axes[0].as_array(),
                *reciprocal_axes[1].as_array(),
                *reciprocal_axes[2].as_array(),
            ]),
            lengths: lengths,
            angles: angles,
            volume: volume,
            reciprocal_volume: reciprocal_volume,
            inscribed_sphere_radius: 0.5 * diameter,
        });
    }

    /// Check that an interaction `cutoff` can safely be used with this box.
    ///
    /// For periodic boxes the cutoff must not exceed the radius of the
    /// inscribed sphere, otherwise an atom could interact with more than one
    /// image of another atom. Non-periodic boxes must have a volume of at
    /// least `(3 * cutoff)^3`.
    pub fn validate_cutoff(&self, cutoff: f64) -> Result<(), Error> {
        if !(cutoff > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "interaction cutoff must be positive, got {}", cutoff
            )));
        }

        if self.is_periodic() {
            if cutoff > self.inscribed_sphere_radius {
                return Err(Error::InvalidParameter(format!(
                    "interaction cutoff ({}) is larger than the radius of the \
                    sphere inscribed in the box ({})", cutoff, self.inscribed_sphere_radius
                )));
            }
        } else {
            let minimal_volume = (3.0 * cutoff).powi(3);
            if self.volume < minimal_volume {
                return Err(Error::InvalidParameter(format!(
                    "non-periodic box volume ({}) is smaller than the minimal \
                    volume for a cutoff of {} ({})", self.volume, cutoff, minimal_volume
                )));
            }

            if self.volume < 1.1 * minimal_volume {
                warn!(
                    "non-periodic box volume ({:.3}) is very close to the minimal volume for this cutoff",
                    self.volume
                );
            }
        }

        Ok(())
    }

    /// Get the type of this box
    pub fn box_type(&self) -> BoxType {
        match self.periodicity {
            Periodicity::NonPeriodic => BoxType::NonPeriodic,
            Periodicity::Cubic { .. } => BoxType::Cubic,
            Periodicity::Orthorhombic { .. } => BoxType::Orthorhombic,
            Periodicity::Monoclinic => BoxType::Monoclinic,
            Periodicity::Triclinic => BoxType::Triclinic,
        }
    }

    /// Check if this box uses periodic boundary conditions
    pub fn is_periodic(&self) -> bool {
        self.periodicity != Periodicity::NonPeriodic
    }

    /// Get the matrix of the box axes, with one axis per row
    pub fn axes(&self) -> Matrix3 {
        self.matrix
    }

    /// Get the matrix converting Cartesian coordinates to fractional ones
    pub fn inverse_axes(&self) -> Matrix3 {
        self.inverse
    }

    /// Get the reciprocal axes (including the 2π factor), one per row
    pub fn reciprocal_axes(&self) -> Matrix3 {
        self.reciprocal
    }

    /// Get the box axis `n`
    pub fn axis(&self, n: usize) -> Vector3D {
        self.matrix[n].into()
    }

    /// Get the lengths of the three axes
    pub fn lengths(&self) -> Vector3D {
        self.lengths
    }

    /// Get the angles α, β and γ in degrees
    pub fn angles(&self) -> Vector3D {
        self.angles
    }

    /// Get the lengths of the reciprocal axes
    pub fn reciprocal_lengths(&self) -> Vector3D {
        Vector3D::new(
            Vector3D::from(self.reciprocal[0]).norm(),
            Vector3D::from(self.reciprocal[1]).norm(),
            Vector3D::from(self.reciprocal[2]).norm(),
        )
    }

    /// Get the volume of the box
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Get the volume of the reciprocal box
    pub fn reciprocal_volume(&self) -> f64 {
        self.reciprocal_volume
    }

    /// Get the radius of the largest sphere fitting inside the box
    pub fn inscribed_sphere_radius(&self) -> f64 {
        self.inscribed_sphere_radius
    }

    /// Get the distances between opposite faces of the box
    pub fn distances_between_faces(&self) -> Vector3D {
        let mut distances = Vector3D::zero();
        for n in 0..3 {
            let normal = (self.axis((n + 1) % 3) ^ self.axis((n + 2) % 3)).normalized();
            distances[n] = f64::abs(normal * self.axis(n));
        }
        return distances;
    }

    /// Scale the box axes by the given `factors`, updating all derived
    /// quantities. A cubic box scaled anisotropically becomes orthorhombic.
    pub fn scale(&mut self, factors: Vector3D) -> Result<(), Error> {
        if !(factors[0] > 0.0 && factors[1] > 0.0 && factors[2] > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "box scaling factors must be positive, got {:?}", factors
            )));
        }

        let mut matrix = self.matrix;
        for n in 0..3 {
            for k in 0..3 {
                matrix[n][k] *= factors[n];
            }
        }

        let isotropic = factors[0] == factors[1] && factors[1] == factors[2];
        let box_type = match self.box_type() {
            BoxType::Cubic if !isotropic => BoxType::Orthorhombic,
            other => other,
        };

        *self = SimulationBox::build(box_type, matrix)?;
        return Ok(());
    }

    /// Isotropically scale the box to reach the given `volume`
    pub fn set_volume(&mut self, volume: f64) -> Result<(), Error> {
        if !(volume > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "box volume must be positive, got {}", volume
            )));
        }

        let factor = f64::cbrt(volume / self.volume);
        info!("scaling {} box from {:.3} Å^3 to {:.3} Å^3 (factor = {:.6})", self.box_type(), self.volume, volume, factor);
        return self.scale(Vector3D::new(factor, factor, factor));
    }
}

/// Geometric operations using periodic boundary conditions
impl SimulationBox {
    /// Apply the minimum image convention to the displacement `vector`.
    #[inline]
    fn minimum_image(&self, vector: &mut Vector3D) {
        match self.periodicity {
            Periodicity::NonPeriodic => (),
            Periodicity::Cubic { length, reciprocal_length } => {
                vector[0] -= nearest_integer(vector[0] * reciprocal_length) * length;
                vector[1] -= nearest_integer(vector[1] * reciprocal_length) * length;
                vector[2] -= nearest_integer(vector[2] * reciprocal_length) * length;
            }
            Periodicity::Orthorhombic { lengths, reciprocal_lengths } => {
                vector[0] -= nearest_integer(vector[0] * reciprocal_lengths[0]) * lengths[0];
                vector[1] -= nearest_integer(vector[1] * reciprocal_lengths[1]) * lengths[1];
                vector[2] -= nearest_integer(vector[2] * reciprocal_lengths[2]) * lengths[2];
            }
            Periodicity::Monoclinic | Periodicity::Triclinic => {
                let mut fractional = self.inverse * *vector;
                fractional[0] -= nearest_integer(fractional[0]);
                fractional[1] -= nearest_integer(fractional[1]);
                fractional[2] -= nearest_integer(fractional[2]);
                *vector = self.transpose * fractional;
            }
        }
    }

    /// Get the minimum image vector going from `i` to `j`
    #[inline]
    pub fn minimum_vector(&self, i: Vector3D, j: Vector3D) -> Vector3D {
        let mut vector = j - i;
        self.minimum_image(&mut vector);
        return vector;
    }

    /// Get the minimum image distance between `i` and `j`
    #[inline]
    pub fn minimum_distance(&self, i: Vector3D, j: Vector3D) -> f64 {
        self.minimum_vector(i, j).norm()
    }

    /// Get the squared minimum image distance between `i` and `j`
    #[inline]
    pub fn minimum_distance_squared(&self, i: Vector3D, j: Vector3D) -> f64 {
        self.minimum_vector(i, j).norm2()
    }

    /// Get the angle `i-j-k` in degrees, using minimum image vectors
    pub fn angle_in_degrees(&self, i: Vector3D, j: Vector3D, k: Vector3D) -> f64 {
        let ji = self.minimum_vector(j, i);
        let jk = self.minimum_vector(j, k);
        return angle(ji, jk).to_degrees();
    }

    /// Fold the real-space `position` inside the box. For a cubic box of side
    /// `L`, all the components of the result are in `[0, L)`. Positions are
    /// left untouched in non-periodic boxes.
    pub fn fold(&self, position: Vector3D) -> Vector3D {
        match self.periodicity {
            Periodicity::NonPeriodic => position,
            Periodicity::Cubic { length, reciprocal_length } => {
                position.map(|x| fold_coordinate(x, length, reciprocal_length))
            }
            Periodicity::Orthorhombic { lengths, reciprocal_lengths } => Vector3D::new(
                fold_coordinate(position[0], lengths[0], reciprocal_lengths[0]),
                fold_coordinate(position[1], lengths[1], reciprocal_lengths[1]),
                fold_coordinate(position[2], lengths[2], reciprocal_lengths[2]),
            ),
            Periodicity::Monoclinic | Periodicity::Triclinic => {
                self.frac_to_real(self.fold_frac(position))
            }
        }
    }

    /// Get the fractional coordinates of the real-space `position`, folded
    /// inside the box: all components are in `[0, 1)`. In non-periodic boxes,
    /// this is the fractional position without any folding.
    pub fn fold_frac(&self, position: Vector3D) -> Vector3D {
        let fractional = self.real_to_frac(position);
        if !self.is_periodic() {
            return fractional;
        }

        let mut folded = fractional.map(|x| x - f64::floor(x));
        // floor can give exactly 1.0 for tiny negative values
        for n in 0..3 {
            if folded[n] >= 1.0 {
                folded[n] = 0.0;
            }
        }
        return folded;
    }

    /// Convert fractional coordinates to real space
    #[inline]
    pub fn frac_to_real(&self, fractional: Vector3D) -> Vector3D {
        self.transpose * fractional
    }

    /// Convert real space coordinates to fractional ones
    #[inline]
    pub fn real_to_frac(&self, position: Vector3D) -> Vector3D {
        self.inverse * position
    }

    /// Generate a random position inside the box
    pub fn random_coordinate<R: rand::Rng>(&self, rng: &mut R) -> Vector3D {
        let fractional = Vector3D::new(rng.gen(), rng.gen(), rng.gen());
        return self.frac_to_real(fractional);
    }
}

/// Build the axes matrix of a triclinic box from its lengths and angles
fn triclinic_matrix(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Result<Matrix3, Error> {
    let cos_alpha = alpha.to_radians().cos();
    let cos_beta = beta.to_radians().cos();
    let (sin_gamma, cos_gamma) = gamma.to_radians().sin_cos();

    let b_x = b * cos_gamma;
    let b_y = b * sin_gamma;

    let c_x = c * cos_beta;
    let c_y = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
    let c_z_squared = c * c - c_y * c_y - c_x * c_x;
    if !(c_z_squared > 0.0) {
        return Err(Error::InvalidParameter(format!(
            "box angles alpha={}, beta={}, gamma={} do not define a valid box", alpha, beta, gamma
        )));
    }

    return Ok(Matrix3::new([
        [a,   0.0, 0.0],
        [b_x, b_y, 0.0],
        [c_x, c_y, f64::sqrt(c_z_squared)],
    ]));
}
