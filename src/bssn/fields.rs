//! The evolved BSSN field set as a compile-time list.
//!
//! Every loop over "all BSSN fields" must enumerate the same set in the
//! same order; diagnostics additionally need lookup by name. Both contracts
//! hang off [`FieldId`]: the enum discriminant is the stable index into the
//! register bank, [`FieldId::ALL`] is the canonical order, and
//! [`FieldId::name`]/[`FieldId::from_name`] give the string mapping.
//!
//! Each field stores the *deviation* from the reference background: the
//! conformal metric fields are offsets from flat (`gamma_ij - delta_ij`),
//! `phi`/`K`/`alpha` are offsets from the FRW values (`alpha_FRW = 1`).

/// Identifier of one evolved scalar lattice field.
///
/// `Gamma11..Gamma33` are the six symmetric conformal-metric deviations;
/// `A11..A33` the trace-free extrinsic curvature; `Gamma1..Gamma3` the
/// conformal connection vector; `Beta*/B*` the shift and its Gamma-driver
/// auxiliary; `Theta` the Z4c damping scalar. Gauge and Z4c registers are
/// always allocated and stay identically zero when their sector is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum FieldId {
    Phi,
    Gamma11,
    Gamma12,
    Gamma13,
    Gamma22,
    Gamma23,
    Gamma33,
    K,
    A11,
    A12,
    A13,
    A22,
    A23,
    A33,
    Gamma1,
    Gamma2,
    Gamma3,
    Alpha,
    Beta1,
    Beta2,
    Beta3,
    B1,
    B2,
    B3,
    Theta,
}

/// Total number of evolved BSSN fields.
pub const N_FIELDS: usize = 25;

impl FieldId {
    /// Canonical enumeration order.
    pub const ALL: [FieldId; N_FIELDS] = [
        FieldId::Phi,
        FieldId::Gamma11,
        FieldId::Gamma12,
        FieldId::Gamma13,
        FieldId::Gamma22,
        FieldId::Gamma23,
        FieldId::Gamma33,
        FieldId::K,
        FieldId::A11,
        FieldId::A12,
        FieldId::A13,
        FieldId::A22,
        FieldId::A23,
        FieldId::A33,
        FieldId::Gamma1,
        FieldId::Gamma2,
        FieldId::Gamma3,
        FieldId::Alpha,
        FieldId::Beta1,
        FieldId::Beta2,
        FieldId::Beta3,
        FieldId::B1,
        FieldId::B2,
        FieldId::B3,
        FieldId::Theta,
    ];

    /// Conformal metric components in symmetric-pair order
    /// (11, 12, 13, 22, 23, 33).
    pub const GAMMA_IJ: [FieldId; 6] = [
        FieldId::Gamma11,
        FieldId::Gamma12,
        FieldId::Gamma13,
        FieldId::Gamma22,
        FieldId::Gamma23,
        FieldId::Gamma33,
    ];

    /// Trace-free extrinsic curvature components, same pair order.
    pub const A_IJ: [FieldId; 6] = [
        FieldId::A11,
        FieldId::A12,
        FieldId::A13,
        FieldId::A22,
        FieldId::A23,
        FieldId::A33,
    ];

    /// Conformal connection vector components.
    pub const GAMMA_I: [FieldId; 3] = [FieldId::Gamma1, FieldId::Gamma2, FieldId::Gamma3];

    /// Shift components.
    pub const BETA_I: [FieldId; 3] = [FieldId::Beta1, FieldId::Beta2, FieldId::Beta3];

    /// Gamma-driver auxiliary components.
    pub const B_I: [FieldId; 3] = [FieldId::B1, FieldId::B2, FieldId::B3];

    /// Stable index into the register bank.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Diagnostic identifier; also the dataset/file-name stem in output.
    pub fn name(self) -> &'static str {
        match self {
            FieldId::Phi => "phi",
            FieldId::Gamma11 => "gamma11",
            FieldId::Gamma12 => "gamma12",
            FieldId::Gamma13 => "gamma13",
            FieldId::Gamma22 => "gamma22",
            FieldId::Gamma23 => "gamma23",
            FieldId::Gamma33 => "gamma33",
            FieldId::K => "K",
            FieldId::A11 => "A11",
            FieldId::A12 => "A12",
            FieldId::A13 => "A13",
            FieldId::A22 => "A22",
            FieldId::A23 => "A23",
            FieldId::A33 => "A33",
            FieldId::Gamma1 => "Gamma1",
            FieldId::Gamma2 => "Gamma2",
            FieldId::Gamma3 => "Gamma3",
            FieldId::Alpha => "alpha",
            FieldId::Beta1 => "beta1",
            FieldId::Beta2 => "beta2",
            FieldId::Beta3 => "beta3",
            FieldId::B1 => "B1",
            FieldId::B2 => "B2",
            FieldId::B3 => "B3",
            FieldId::Theta => "theta",
        }
    }

    /// Lookup by diagnostic name.
    pub fn from_name(name: &str) -> Option<FieldId> {
        FieldId::ALL.iter().copied().find(|f| f.name() == name)
    }
}

// =============================================================================
// Symmetric-pair index helpers
// =============================================================================

/// The six independent index pairs of a symmetric 3x3 tensor, in the same
/// order as the component field lists above.
pub const SYM_PAIRS: [(usize, usize); 6] = [(0, 0), (0, 1), (0, 2), (1, 1), (1, 2), (2, 2)];

/// Multiplicity of each pair when contracting over both free indices.
pub const SYM_WEIGHT: [f64; 6] = [1.0, 2.0, 2.0, 1.0, 2.0, 1.0];

/// Components of the flat metric in pair order.
pub const FLAT_METRIC: [f64; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 1.0];

/// Pair index for an arbitrary `(i, j)`.
#[inline]
pub fn sym(i: usize, j: usize) -> usize {
    const MAP: [[usize; 3]; 3] = [[0, 1, 2], [1, 3, 4], [2, 4, 5]];
    MAP[i][j]
}
