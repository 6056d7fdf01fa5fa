use log::debug;
use ndarray::{Array1, ArrayView1};

use crate::Error;
use crate::configuration::AtomType;
use crate::math::{ThreePointInterpolator, derivative_table, linear_interpolation};

use super::{ShortRangeForm, ShortRangeTruncation, CoulombTruncation, COULOMB_CONVERSION};

fn default_range() -> f64 { 15.0 }
fn default_delta() -> f64 { 0.005 }
fn default_short_range_truncation() -> ShortRangeTruncation { ShortRangeTruncation::Shifted }
fn default_coulomb_truncation() -> CoulombTruncation { CoulombTruncation::Shifted }
fn default_include_charges() -> bool { true }

/// Parameters controlling the tabulation of pair potentials
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PairPotentialParameters {
    /// Maximal distance of the potentials, in Å
    #[serde(default = "default_range")]
    pub range: f64,
    /// Spacing between tabulated points, in Å
    #[serde(default = "default_delta")]
    pub delta: f64,
    /// Truncation scheme for the short-range part of the potentials
    #[serde(default = "default_short_range_truncation")]
    pub short_range_truncation: ShortRangeTruncation,
    /// Truncation scheme for the Coulomb part of the potentials
    #[serde(default = "default_coulomb_truncation")]
    pub coulomb_truncation: CoulombTruncation,
    /// Should the Coulomb interaction between atom type charges be included
    /// in the tabulated potentials? If `false`, Coulomb interactions are
    /// computed analytically from the charges of each atom.
    #[serde(default = "default_include_charges")]
    pub include_atom_type_charges: bool,
}

impl Default for PairPotentialParameters {
    fn default() -> Self {
        PairPotentialParameters {
            range: default_range(),
            delta: default_delta(),
            short_range_truncation: default_short_range_truncation(),
            coulomb_truncation: default_coulomb_truncation(),
            include_atom_type_charges: default_include_charges(),
        }
    }
}

impl PairPotentialParameters {
    /// Parse parameters from a JSON string, and validate them
    pub fn from_json(json: &str) -> Result<PairPotentialParameters, Error> {
        let parameters: PairPotentialParameters = serde_json::from_str(json)?;
        parameters.validate()?;
        return Ok(parameters);
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(self.range > 0.0 && self.range.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "expected positive range for pair potentials, got {}", self.range
            )));
        }

        if !(self.delta > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "expected positive delta for pair potentials, got {}", self.delta
            )));
        }

        if f64::floor(self.range / self.delta) < 4.0 {
            return Err(Error::InvalidParameter(format!(
                "delta ({}) is too large for the range ({}), we need at least 4 tabulated points",
                self.delta, self.range
            )));
        }

        self.short_range_truncation.validate(self.range)?;

        return Ok(());
    }

    /// Get the number of tabulated points
    pub fn n_points(&self) -> usize {
        f64::floor(self.range / self.delta) as usize
    }
}

/// An interpolated table and the interpolated table of its derivative
#[derive(Debug, Clone)]
struct Interpolated {
    derivative: Array1<f64>,
    value: ThreePointInterpolator,
    gradient: ThreePointInterpolator,
}

impl Interpolated {
    fn new(values: ArrayView1<'_, f64>, delta: f64) -> Interpolated {
        let derivative = derivative_table(values, delta);
        Interpolated {
            value: ThreePointInterpolator::new(values, delta),
            gradient: ThreePointInterpolator::new(derivative.view(), delta),
            derivative: derivative,
        }
    }
}

/// Tabulated interaction between two atom types.
///
/// The potential is made of three channels tabulated on a regular grid
/// `r = n * delta`: the reference short-range potential computed from the
/// atom types parameters, an additional short-range potential which can be
/// modified freely (for example by refinement against experimental data), and
/// the Coulomb potential between the atom types charges. Energies and forces
/// are interpolated from these tables.
///
/// All forces are derivatives of the energy with respect to the distance,
/// `dU/dr`.
#[derive(Debug, Clone)]
pub struct PairPotential {
    names: (String, String),
    /// Combined short-range parameters
    form: ShortRangeForm,
    /// Charges of the two atom types, zero if they are not included
    charges: (f64, f64),
    range: f64,
    delta: f64,
    short_range_truncation: ShortRangeTruncation,
    coulomb_truncation: CoulombTruncation,
    /// Untruncated short-range energy and force at the range, used for the
    /// shifted truncation
    short_range_energy_at_cutoff: f64,
    short_range_force_at_cutoff: f64,
    reference_short_range: Array1<f64>,
    additional_short_range: Array1<f64>,
    coulomb: Array1<f64>,
    total_short_range: Array1<f64>,
    total: Array1<f64>,
    short_range_interpolation: Interpolated,
    coulomb_interpolation: Interpolated,
    total_interpolation: Interpolated,
}

impl PairPotential {
    /// Create and tabulate the pair potential between the atom types `first`
    /// and `second`.
    #[time_graph::instrument(name = "PairPotential::new")]
    pub fn new(first: &AtomType, second: &AtomType, parameters: &PairPotentialParameters) -> Result<PairPotential, Error> {
        parameters.validate()?;
        first.short_range.validate()?;
        second.short_range.validate()?;

        let form = first.short_range.combine(&second.short_range).map_err(|e| Error::InvalidParameter(format!(
            "can not create pair potential between '{}' and '{}': {}", first.name, second.name, e
        )))?;

        let charges = if parameters.include_atom_type_charges {
            (first.charge, second.charge)
        } else {
            (0.0, 0.0)
        };

        let n_points = parameters.n_points();
        let range = parameters.range;
        let mut potential = PairPotential {
            names: (first.name.clone(), second.name.clone()),
            form: form,
            charges: charges,
            range: range,
            delta: parameters.delta,
            short_range_truncation: parameters.short_range_truncation,
            coulomb_truncation: parameters.coulomb_truncation,
            short_range_energy_at_cutoff: form.energy(range),
            short_range_force_at_cutoff: form.derivative(range),
            reference_short_range: Array1::zeros(n_points),
            additional_short_range: Array1::zeros(n_points),
            coulomb: Array1::zeros(n_points),
            total_short_range: Array1::zeros(n_points),
            total: Array1::zeros(n_points),
            short_range_interpolation: Interpolated::new(Array1::zeros(n_points).view(), parameters.delta),
            coulomb_interpolation: Interpolated::new(Array1::zeros(n_points).view(), parameters.delta),
            total_interpolation: Interpolated::new(Array1::zeros(n_points).view(), parameters.delta),
        };

        let charge_product = charges.0 * charges.1;
        for n in 1..n_points {
            let r = n as f64 * potential.delta;
            potential.reference_short_range[n] = potential.analytic_short_range_energy(r, potential.short_range_truncation);
            potential.coulomb[n] = potential.analytic_coulomb_energy(charge_product, r, potential.coulomb_truncation);
        }

        // the energy at r=0 is usually infinite, use a large value instead
        potential.reference_short_range[0] = 10.0 * potential.reference_short_range[1];
        potential.coulomb[0] = 10.0 * potential.coulomb[1];

        potential.coulomb_interpolation = Interpolated::new(potential.coulomb.view(), potential.delta);
        potential.update_totals();

        debug!(
            "tabulated {}-{} pair potential with {} points up to {} Å ({:?}, charges {} and {})",
            potential.names.0, potential.names.1, n_points, range, form, charges.0, charges.1
        );

        return Ok(potential);
    }

    /// Recompute the total tables and all interpolations depending on them,
    /// after a change in one of the short-range channels
    fn update_totals(&mut self) {
        self.total_short_range = &self.reference_short_range + &self.additional_short_range;
        self.total = &self.total_short_range + &self.coulomb;

        self.short_range_interpolation = Interpolated::new(self.total_short_range.view(), self.delta);
        self.total_interpolation = Interpolated::new(self.total.view(), self.delta);
    }

    fn check_table_size(&self, values: &ArrayView1<'_, f64>) -> Result<(), Error> {
        if values.len() != self.n_points() {
            return Err(Error::InvalidParameter(format!(
                "expected {} values for the {}-{} pair potential, got {}",
                self.n_points(), self.names.0, self.names.1, values.len()
            )));
        }
        return Ok(());
    }
}

/// Analytic evaluation
impl PairPotential {
    /// Get the short-range energy at distance `r` computed analytically with
    /// the given truncation
    pub fn analytic_short_range_energy(&self, r: f64, truncation: ShortRangeTruncation) -> f64 {
        let energy = self.form.energy(r);
        match truncation {
            ShortRangeTruncation::None => energy,
            ShortRangeTruncation::Shifted => {
                energy - (r - self.range) * self.short_range_force_at_cutoff - self.short_range_energy_at_cutoff
            }
            ShortRangeTruncation::Cosine { width } => {
                let (switch, _) = ShortRangeTruncation::cosine_switch(width, self.range, r);
                energy * switch
            }
        }
    }

    /// Get the derivative of the short-range energy at distance `r` computed
    /// analytically with the given truncation
    pub fn analytic_short_range_force(&self, r: f64, truncation: ShortRangeTruncation) -> f64 {
        let force = self.form.derivative(r);
        match truncation {
            ShortRangeTruncation::None => force,
            ShortRangeTruncation::Shifted => force - self.short_range_force_at_cutoff,
            ShortRangeTruncation::Cosine { width } => {
                let (switch, switch_derivative) = ShortRangeTruncation::cosine_switch(width, self.range, r);
                force * switch + self.form.energy(r) * switch_derivative
            }
        }
    }

    /// Get the Coulomb energy between charges with product `charge_product`
    /// at distance `r`
    pub fn analytic_coulomb_energy(&self, charge_product: f64, r: f64, truncation: CoulombTruncation) -> f64 {
        match truncation {
            CoulombTruncation::None => COULOMB_CONVERSION * charge_product / r,
            CoulombTruncation::Shifted => {
                COULOMB_CONVERSION * charge_product * (1.0 / r + r / (self.range * self.range) - 2.0 / self.range)
            }
        }
    }

    /// Get the derivative of the Coulomb energy between charges with product
    /// `charge_product` at distance `r`
    pub fn analytic_coulomb_force(&self, charge_product: f64, r: f64, truncation: CoulombTruncation) -> f64 {
        match truncation {
            CoulombTruncation::None => -COULOMB_CONVERSION * charge_product / (r * r),
            CoulombTruncation::Shifted => {
                -COULOMB_CONVERSION * charge_product * (1.0 / (r * r) - 1.0 / (self.range * self.range))
            }
        }
    }

    /// Get the full energy at distance `r`, computed analytically from the
    /// atom types charges, scaling the Coulomb part by `elec_scale` and the
    /// short-range part by `vdw_scale`. This is zero beyond the range.
    pub fn analytic_energy(&self, r: f64, elec_scale: f64, vdw_scale: f64) -> f64 {
        let charge_product = self.charges.0 * self.charges.1;
        return self.analytic_energy_for_charges(charge_product, r, elec_scale, vdw_scale, self.coulomb_truncation);
    }

    /// Get the full energy at distance `r`, for charges with product
    /// `charge_product` and the given Coulomb `truncation`
    pub fn analytic_energy_for_charges(
        &self,
        charge_product: f64,
        r: f64,
        elec_scale: f64,
        vdw_scale: f64,
        truncation: CoulombTruncation,
    ) -> f64 {
        if r > self.range {
            return 0.0;
        }

        let short_range = self.analytic_short_range_energy(r, self.short_range_truncation);
        let coulomb = self.analytic_coulomb_energy(charge_product, r, truncation);
        return vdw_scale * short_range + elec_scale * coulomb;
    }

    /// Get the derivative of the full energy at distance `r`, computed
    /// analytically from the atom types charges
    pub fn analytic_force(&self, r: f64, elec_scale: f64, vdw_scale: f64) -> f64 {
        let charge_product = self.charges.0 * self.charges.1;
        return self.analytic_force_for_charges(charge_product, r, elec_scale, vdw_scale, self.coulomb_truncation);
    }

    /// Get the derivative of the full energy at distance `r`, for charges
    /// with product `charge_product` and the given Coulomb `truncation`
    pub fn analytic_force_for_charges(
        &self,
        charge_product: f64,
        r: f64,
        elec_scale: f64,
        vdw_scale: f64,
        truncation: CoulombTruncation,
    ) -> f64 {
        if r > self.range {
            return 0.0;
        }

        let short_range = self.analytic_short_range_force(r, self.short_range_truncation);
        let coulomb = self.analytic_coulomb_force(charge_product, r, truncation);
        return vdw_scale * short_range + elec_scale * coulomb;
    }
}

/// Interpolated evaluation. The distance must be positive and smaller than
/// the range, which is only checked in debug mode.
impl PairPotential {
    /// Get the total energy at distance `r`
    #[inline]
    pub fn energy(&self, r: f64) -> f64 {
        debug_assert!(r >= 0.0 && r <= self.range, "invalid distance {} for pair potential", r);
        self.total_interpolation.value.value(r)
    }

    /// Get the total energy at distance `r`, scaling the Coulomb part by
    /// `elec_scale` and the short-range part by `vdw_scale`
    #[inline]
    pub fn energy_scaled(&self, r: f64, elec_scale: f64, vdw_scale: f64) -> f64 {
        debug_assert!(r >= 0.0 && r <= self.range, "invalid distance {} for pair potential", r);
        vdw_scale * self.short_range_interpolation.value.value(r) + elec_scale * self.coulomb_interpolation.value.value(r)
    }

    /// Get the derivative of the total energy at distance `r`
    #[inline]
    pub fn force(&self, r: f64) -> f64 {
        debug_assert!(r >= 0.0 && r <= self.range, "invalid distance {} for pair potential", r);
        self.total_interpolation.gradient.value(r)
    }

    /// Get the derivative of the total energy at distance `r`, scaling the
    /// Coulomb part by `elec_scale` and the short-range part by `vdw_scale`
    #[inline]
    pub fn force_scaled(&self, r: f64, elec_scale: f64, vdw_scale: f64) -> f64 {
        debug_assert!(r >= 0.0 && r <= self.range, "invalid distance {} for pair potential", r);
        vdw_scale * self.short_range_interpolation.gradient.value(r) + elec_scale * self.coulomb_interpolation.gradient.value(r)
    }

    /// Get the total short-range (reference and additional) energy at
    /// distance `r`
    #[inline]
    pub fn short_range_energy(&self, r: f64) -> f64 {
        self.short_range_interpolation.value.value(r)
    }

    /// Get the tabulated Coulomb energy at distance `r`
    #[inline]
    pub fn coulomb_energy(&self, r: f64) -> f64 {
        self.coulomb_interpolation.value.value(r)
    }
}

/// Modification of the short-range channels
impl PairPotential {
    /// Add `values` to the reference short-range potential
    pub fn add_to_reference_short_range_potential(&mut self, values: ArrayView1<'_, f64>) -> Result<(), Error> {
        self.check_table_size(&values)?;
        self.reference_short_range += &values;
        self.update_totals();
        return Ok(());
    }

    /// Replace the additional short-range potential with `values`
    pub fn set_additional_potential(&mut self, values: ArrayView1<'_, f64>) -> Result<(), Error> {
        self.check_table_size(&values)?;
        self.additional_short_range.assign(&values);
        self.update_totals();
        return Ok(());
    }

    /// Set the additional short-range potential to zero
    pub fn reset_additional_potential(&mut self) {
        self.additional_short_range.fill(0.0);
        self.update_totals();
    }

    /// Interpolate the data `(r, u)` on the tabulation grid, and add it to
    /// the additional potential after multiplication by `factor`. Grid points
    /// outside of the data range use the closest data point.
    pub fn adjust_additional_potential(&mut self, r: &[f64], u: &[f64], factor: f64) -> Result<(), Error> {
        if r.len() != u.len() || r.is_empty() {
            return Err(Error::InvalidParameter(format!(
                "invalid data to adjust the {}-{} pair potential: got {} distances and {} values",
                self.names.0, self.names.1, r.len(), u.len()
            )));
        }

        if r.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(Error::InvalidParameter(
                "distances used to adjust pair potentials must be sorted".into()
            ));
        }

        for (n, value) in self.additional_short_range.iter_mut().enumerate() {
            let distance = n as f64 * self.delta;
            *value += factor * linear_interpolation(r, u, distance);
        }

        self.update_totals();
        return Ok(());
    }
}

/// Tables and parameters
impl PairPotential {
    /// Get the names of the two atom types
    pub fn names(&self) -> (&str, &str) {
        (&self.names.0, &self.names.1)
    }

    /// Get the combined short-range parameters
    pub fn form(&self) -> ShortRangeForm {
        self.form
    }

    /// Get the charges of the two atom types included in the tables
    pub fn charges(&self) -> (f64, f64) {
        self.charges
    }

    pub fn range(&self) -> f64 {
        self.range
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn n_points(&self) -> usize {
        self.total.len()
    }

    pub fn short_range_truncation(&self) -> ShortRangeTruncation {
        self.short_range_truncation
    }

    pub fn coulomb_truncation(&self) -> CoulombTruncation {
        self.coulomb_truncation
    }

    pub fn reference_short_range(&self) -> ArrayView1<'_, f64> {
        self.reference_short_range.view()
    }

    pub fn additional_short_range(&self) -> ArrayView1<'_, f64> {
        self.additional_short_range.view()
    }

    pub fn coulomb(&self) -> ArrayView1<'_, f64> {
        self.coulomb.view()
    }

    pub fn total_short_range(&self) -> ArrayView1<'_, f64> {
        self.total_short_range.view()
    }

    pub fn total(&self) -> ArrayView1<'_, f64> {
        self.total.view()
    }

    /// Get the tabulated derivative of the total short-range energy
    pub fn total_short_range_derivative(&self) -> ArrayView1<'_, f64> {
        self.short_range_interpolation.derivative.view()
    }

    /// Get the tabulated derivative of the Coulomb energy
    pub fn coulomb_derivative(&self) -> ArrayView1<'_, f64> {
        self.coulomb_interpolation.derivative.view()
    }

    /// Get the tabulated derivative of the total energy
    pub fn total_derivative(&self) -> ArrayView1<'_, f64> {
        self.total_interpolation.derivative.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn atom_type(name: &str, charge: f64, epsilon: f64, sigma: f64) -> AtomType {
        AtomType {
            name: name.into(),
            charge: charge,
            short_range: ShortRangeForm::LennardJones { epsilon, sigma },
        }
    }

    fn parameters(range: f64, delta: f64) -> PairPotentialParameters {
        PairPotentialParameters {
            range: range,
            delta: delta,
            ..Default::default()
        }
    }

    #[test]
    fn json_parameters() {
        let parameters = PairPotentialParameters::from_json("{}").unwrap();
        assert_eq!(parameters, PairPotentialParameters::default());
        assert_eq!(parameters.n_points(), 3000);

        let parameters = PairPotentialParameters::from_json(r#"{
            "range": 10.0,
            "short_range_truncation": {"type": "Cosine", "width": 2.0},
            "coulomb_truncation": "None",
            "include_atom_type_charges": false
        }"#).unwrap();
        assert_eq!(parameters.range, 10.0);
        assert_eq!(parameters.delta, 0.005);
        assert_eq!(parameters.short_range_truncation, ShortRangeTruncation::Cosine { width: 2.0 });
        assert_eq!(parameters.coulomb_truncation, CoulombTruncation::None);
        assert!(!parameters.include_atom_type_charges);

        assert!(PairPotentialParameters::from_json(r#"{"range": -3.0}"#).is_err());
        assert!(PairPotentialParameters::from_json(r#"{"range": 1.0, "delta": 0.5}"#).is_err());
        assert!(PairPotentialParameters::from_json(r#"{"cutoff": 3.0}"#).is_err());
    }

    #[test]
    fn tabulation() {
        let first = atom_type("A", 0.5, 0.5, 3.0);
        let second = atom_type("B", -1.0, 2.0, 4.0);
        let potential = PairPotential::new(&first, &second, &parameters(10.0, 0.01)).unwrap();

        assert_eq!(potential.names(), ("A", "B"));
        assert_eq!(potential.form(), ShortRangeForm::LennardJones { epsilon: 1.0, sigma: 3.5 });
        assert_eq!(potential.n_points(), 1000);

        let reference = potential.reference_short_range();
        assert_eq!(reference[0], 10.0 * reference[1]);

        for n in [1, 350, 999] {
            let r = n as f64 * 0.01;
            assert_relative_eq!(potential.total()[n], potential.total_short_range()[n] + potential.coulomb()[n]);
            assert_relative_eq!(potential.total()[n], potential.analytic_energy(r, 1.0, 1.0), max_relative = 1e-12);
        }
    }

    #[test]
    fn missing_short_range() {
        let first = AtomType { name: "A".into(), charge: 1.0, short_range: ShortRangeForm::None };
        let second = atom_type("B", -1.0, 2.0, 4.0);
        assert!(PairPotential::new(&first, &second, &parameters(10.0, 0.01)).is_err());
        assert!(PairPotential::new(&first, &first, &parameters(10.0, 0.01)).is_ok());
    }

    #[test]
    fn interpolated_values() {
        let first = atom_type("A", 0.5, 0.5, 3.0);
        let second = atom_type("B", -1.0, 2.0, 4.0);
        let potential = PairPotential::new(&first, &second, &parameters(10.0, 0.005)).unwrap();

        for &r in &[3.2, 4.0123, 6.5, 9.9] {
            assert_relative_eq!(potential.energy(r), potential.analytic_energy(r, 1.0, 1.0), epsilon = 1e-4, max_relative = 1e-5);
            assert_relative_eq!(potential.force(r), potential.analytic_force(r, 1.0, 1.0), epsilon = 1e-3, max_relative = 1e-4);
            assert_relative_eq!(
                potential.energy_scaled(r, 0.5, 0.25),
                potential.analytic_energy(r, 0.5, 0.25),
                epsilon = 1e-4, max_relative = 1e-5
            );
            assert_relative_eq!(
                potential.force_scaled(r, 0.5, 0.25),
                potential.analytic_force(r, 0.5, 0.25),
                epsilon = 1e-3, max_relative = 1e-4
            );
        }

        assert_eq!(potential.analytic_energy(10.5, 1.0, 1.0), 0.0);
        assert_eq!(potential.analytic_force(10.5, 1.0, 1.0), 0.0);
    }

    #[test]
    fn truncation_schemes() {
        let first = atom_type("A", 1.0, 1.0, 3.0);
        let potential = PairPotential::new(&first, &first, &parameters(12.0, 0.01)).unwrap();

        assert_eq!(potential.analytic_short_range_energy(12.0, ShortRangeTruncation::Shifted), 0.0);
        assert_eq!(potential.analytic_short_range_force(12.0, ShortRangeTruncation::Shifted), 0.0);
        assert_ne!(potential.analytic_short_range_energy(12.0, ShortRangeTruncation::None), 0.0);

        let cosine = ShortRangeTruncation::Cosine { width: 2.0 };
        assert_relative_eq!(potential.analytic_short_range_energy(12.0, cosine), 0.0, epsilon = 1e-15);
        assert_relative_eq!(potential.analytic_short_range_force(12.0, cosine), 0.0, epsilon = 1e-15);
        assert_eq!(
            potential.analytic_short_range_energy(9.0, cosine),
            potential.analytic_short_range_energy(9.0, ShortRangeTruncation::None),
        );

        // derivative of the cosine-truncated energy inside the switching region
        let delta = 1e-6;
        let numerical = (
            potential.analytic_short_range_energy(11.0 + delta, cosine) - potential.analytic_short_range_energy(11.0 - delta, cosine)
        ) / (2.0 * delta);
        assert_relative_eq!(potential.analytic_short_range_force(11.0, cosine), numerical, max_relative = 1e-5);

        assert_relative_eq!(potential.analytic_coulomb_energy(1.0, 12.0, CoulombTruncation::Shifted), 0.0, epsilon = 1e-12);
        assert_relative_eq!(potential.analytic_coulomb_force(1.0, 12.0, CoulombTruncation::Shifted), 0.0, epsilon = 1e-12);
        assert_relative_eq!(potential.analytic_coulomb_energy(-0.5, 2.0, CoulombTruncation::None), -0.25 * COULOMB_CONVERSION);
    }

    #[test]
    fn additional_potential() {
        let first = atom_type("A", 0.0, 1.0, 3.0);
        let mut potential = PairPotential::new(&first, &first, &parameters(10.0, 0.01)).unwrap();
        let energy = potential.energy(5.0);
        let force = potential.force(5.0);

        let additional = Array1::from_elem(potential.n_points(), 0.5);
        potential.set_additional_potential(additional.view()).unwrap();
        assert_relative_eq!(potential.energy(5.0), energy + 0.5, max_relative = 1e-12);
        assert_relative_eq!(potential.force(5.0), force, epsilon = 1e-9);
        assert_relative_eq!(potential.reference_short_range()[500], potential.total_short_range()[500] - 0.5, epsilon = 1e-12);

        assert!(potential.set_additional_potential(Array1::zeros(3).view()).is_err());

        potential.reset_additional_potential();
        assert_relative_eq!(potential.energy(5.0), energy, max_relative = 1e-12);

        // linear ramp going from 1 at r=2 to 0 at r=4
        potential.adjust_additional_potential(&[2.0, 4.0], &[1.0, 0.0], 2.0).unwrap();
        assert_relative_eq!(potential.additional_short_range()[100], 2.0);
        assert_relative_eq!(potential.additional_short_range()[300], 1.0, epsilon = 1e-12);
        assert_relative_eq!(potential.additional_short_range()[700], 0.0);
        assert_relative_eq!(potential.energy(3.0), potential.analytic_energy(3.0, 1.0, 1.0) + 1.0, max_relative = 1e-4);

        assert!(potential.adjust_additional_potential(&[2.0, 1.0], &[1.0, 0.0], 1.0).is_err());
        assert!(potential.adjust_additional_potential(&[2.0], &[1.0, 0.0], 1.0).is_err());

        let reference = Array1::from_elem(potential.n_points(), -1.0);
        potential.add_to_reference_short_range_potential(reference.view()).unwrap();
        assert_relative_eq!(potential.reference_short_range()[700], potential.analytic_short_range_energy(7.0, ShortRangeTruncation::Shifted) - 1.0, max_relative = 1e-12);
    }
}
