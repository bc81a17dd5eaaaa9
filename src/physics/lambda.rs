//! Cosmological constant.
//!
//! A stateless component: constant energy density `rho_L` with pressure
//! `p = -rho_L`, so the stress trace is `S = 3p = -3 rho_L`. No momentum,
//! no trace-free stress, nothing to evolve.

use crate::bssn::{BssnFields, SourceSlots};
use crate::physics::MatterComponent;
use crate::solver::FrwRef;

#[derive(Debug, Clone, Copy)]
pub struct Lambda {
    rho_l: f64,
}

impl Lambda {
    pub fn new(rho_l: f64) -> Self {
        Self { rho_l }
    }

    pub fn density(&self) -> f64 {
        self.rho_l
    }
}

impl MatterComponent for Lambda {
    fn name(&self) -> &'static str {
        "lambda"
    }

    fn add_bssn_source(&mut self, _fields: &BssnFields, src: &mut SourceSlots, _frw: &FrwRef) {
        let rho_l = self.rho_l;
        src.r.view_mut().par_map_inplace(|v| *v += rho_l);
        src.s.view_mut().par_map_inplace(|v| *v -= 3.0 * rho_l);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bssn::{Bssn, BssnOptions};
    use crate::physics::Dust;

    #[test]
    fn constant_density_and_negative_pressure_trace() {
        let mut bssn = Bssn::new(4, 4, 4, 0.1, BssnOptions::synchronous(1.0));
        let mut lambda = Lambda::new(0.02);
        let (fields, src) = bssn.split_sources_mut();
        lambda.add_bssn_source(fields, src, &FrwRef::default());
        assert!((src.r.get(2, 1, 0) - 0.02).abs() < 1e-15);
        assert!((src.s.get(2, 1, 0) + 0.06).abs() < 1e-15);
        assert_eq!(src.stf[0].max_abs(), 0.0);
    }

    #[test]
    fn aggregation_is_order_independent() {
        let mut a = Bssn::new(4, 4, 4, 0.1, BssnOptions::synchronous(1.0));
        let mut b = Bssn::new(4, 4, 4, 0.1, BssnOptions::synchronous(1.0));
        let mut dust = Dust::new(4, 4, 4);
        dust.density_mut().set(1, 1, 1, 0.4);
        let mut lambda = Lambda::new(0.01);
        let frw = FrwRef::default();

        {
            let (fields, src) = a.split_sources_mut();
            dust.add_bssn_source(fields, src, &frw);
            lambda.add_bssn_source(fields, src, &frw);
        }
        {
            let (fields, src) = b.split_sources_mut();
            lambda.add_bssn_source(fields, src, &frw);
            dust.add_bssn_source(fields, src, &frw);
        }
        for i in 0..4 {
            for j in 0..4 {
                for k in 0..4 {
                    assert_eq!(a.sources().r.get(i, j, k), b.sources().r.get(i, j, k));
                    assert_eq!(a.sources().s.get(i, j, k), b.sources().s.get(i, j, k));
                }
            }
        }
    }
}
