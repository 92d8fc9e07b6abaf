// src/model/normal.rs

/// Standard normal distribution helpers used by the safety-stock solver.
///
/// Only the density, the cumulative distribution and the unit normal loss
/// function are needed, so they are computed directly instead of pulling in a
/// statistics crate.

const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

/// Probability density function φ(z) of the standard normal distribution.
pub fn pdf(z: f64) -> f64 {
    INV_SQRT_2PI * (-0.5 * z * z).exp()
}

/// Cumulative distribution function Φ(z) of the standard normal distribution.
///
/// Computed as `erfc(-z / √2) / 2`.
pub fn cdf(z: f64) -> f64 {
    0.5 * erfc(-z / std::f64::consts::SQRT_2)
}

/// Complementary error function.
///
/// Chebyshev fit from Numerical Recipes (`erfcc`).
/// The fractional error is below 1.2e-7 everywhere.
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);

    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87
                                    + t * (-0.822_152_23 + t * 0.170_872_77))))))));

    let ans = t * poly.exp();

    if x >= 0.0 {
        ans
    } else {
        2.0 - ans
    }
}

/// Unit normal loss function L(z) = φ(z) - z·(1 - Φ(z)).
///
/// Expected shortfall beyond `z` standard deviations; the backorder relation
/// of a cycle is `BKG = σ·L(SS/σ)`.
pub fn loss(z: f64) -> f64 {
    pdf(z) - z * cdf(-z)
}
