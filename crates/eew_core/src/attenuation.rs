//! Ground-motion toy model: intensity, arrival times, display readouts.
//!
//! Every function here is pure. Randomness enters only through the `jitter`
//! argument, which callers draw from the engine RNG (or pass as zero).

use rand::Rng;

use crate::{Constants, IntensityClass, Terrain, WaveType};

/// Hypocentral distances below this are floored before taking the log.
pub const MIN_DISTANCE_KM: f64 = 5.0;
pub const MAX_INTENSITY: f64 = 12.0;
/// Full width of the symmetric intensity jitter.
pub const JITTER_SPAN: f64 = 0.15;

/// `I = m·M − l·log10(max(R, 5)) − k·R + c`
#[derive(Debug, Clone, Copy)]
struct Coefficients {
    magnitude: f64,
    log_distance: f64,
    linear: f64,
    offset: f64,
}

const P_WAVE: Coefficients = Coefficients {
    magnitude: 1.5,
    log_distance: 4.4,
    linear: 0.003,
    offset: -0.8,
};

const S_WAVE: Coefficients = Coefficients {
    magnitude: 1.62,
    log_distance: 4.1,
    linear: 0.0015,
    offset: 0.2,
};

const fn coefficients(wave: WaveType) -> Coefficients {
    match wave {
        WaveType::P => P_WAVE,
        WaveType::S => S_WAVE,
    }
}

impl Terrain {
    /// Site amplification offset added to the attenuated intensity.
    pub const fn site_amplification(self) -> f64 {
        match self {
            Terrain::Basin => 0.9,
            Terrain::Plain => 0.3,
            Terrain::Valley => 0.0,
            Terrain::Mountain => -0.5,
            Terrain::Offshore => -0.8,
        }
    }

    /// Multiplier on the base wave velocity: hard rock is faster.
    pub const fn velocity_factor(self) -> f64 {
        match self {
            Terrain::Mountain => 1.1,
            Terrain::Plain | Terrain::Valley => 1.0,
            Terrain::Offshore => 0.95,
            Terrain::Basin => 0.9,
        }
    }
}

pub fn hypocentral_distance(distance_km: f64, depth_km: f64) -> f64 {
    (distance_km * distance_km + depth_km * depth_km).sqrt()
}

/// Continuous MMI-like intensity in `[0, 12]`.
pub fn intensity(
    magnitude: f64,
    distance_km: f64,
    depth_km: f64,
    terrain: Terrain,
    wave: WaveType,
    jitter: f64,
) -> f64 {
    let c = coefficients(wave);
    let r = hypocentral_distance(distance_km, depth_km);
    let base = c.magnitude * magnitude - c.log_distance * r.max(MIN_DISTANCE_KM).log10()
        - c.linear * r
        + c.offset;
    (base + terrain.site_amplification() + jitter).clamp(0.0, MAX_INTENSITY)
}

/// One symmetric jitter sample, or zero in deterministic mode.
pub fn jitter_sample(rng: &mut impl Rng, deterministic: bool) -> f64 {
    if deterministic {
        0.0
    } else {
        (rng.gen::<f64>() - 0.5) * JITTER_SPAN
    }
}

/// Solve the S-wave formula for magnitude, ignoring site amplification.
pub fn invert_magnitude(observed_intensity: f64, distance_km: f64, depth_km: f64) -> f64 {
    let c = S_WAVE;
    let r = hypocentral_distance(distance_km, depth_km);
    (observed_intensity + c.log_distance * r.max(MIN_DISTANCE_KM).log10() + c.linear * r
        - c.offset)
        / c.magnitude
}

/// `(p_time, s_time)` in seconds after rupture.
pub fn arrival_times(
    distance_km: f64,
    depth_km: f64,
    terrain: Terrain,
    constants: &Constants,
) -> (f64, f64) {
    let r = hypocentral_distance(distance_km, depth_km);
    let factor = terrain.velocity_factor();
    (
        r / (constants.p_wave_speed_km_s * factor),
        r / (constants.s_wave_speed_km_s * factor),
    )
}

impl IntensityClass {
    pub const ALL: [IntensityClass; 9] = [
        IntensityClass::One,
        IntensityClass::Two,
        IntensityClass::Three,
        IntensityClass::Four,
        IntensityClass::FiveLower,
        IntensityClass::FiveUpper,
        IntensityClass::SixLower,
        IntensityClass::SixUpper,
        IntensityClass::Seven,
    ];

    pub fn from_intensity(intensity: f64) -> Self {
        // Upper cut points of bins One..SixUpper.
        const CUTS: [f64; 8] = [1.5, 2.5, 3.5, 4.5, 5.5, 6.5, 7.5, 8.5];
        let bin = CUTS.iter().take_while(|cut| intensity >= **cut).count();
        Self::ALL[bin]
    }

    pub const fn label(self) -> &'static str {
        match self {
            IntensityClass::One => "1",
            IntensityClass::Two => "2",
            IntensityClass::Three => "3",
            IntensityClass::Four => "4",
            IntensityClass::FiveLower => "5-",
            IntensityClass::FiveUpper => "5+",
            IntensityClass::SixLower => "6-",
            IntensityClass::SixUpper => "6+",
            IntensityClass::Seven => "7",
        }
    }
}

impl std::fmt::Display for IntensityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

pub fn to_discrete_scale(intensity: f64) -> IntensityClass {
    IntensityClass::from_intensity(intensity)
}

/// Peak ground acceleration in gal.
pub fn estimate_peak_acceleration(intensity: f64) -> f64 {
    10f64.powf(intensity * 0.53 - 0.6)
}

/// Peak ground velocity in cm/s.
pub fn estimate_peak_velocity(intensity: f64) -> f64 {
    estimate_peak_acceleration(intensity) / 17.5
}

/// Toy wave height in metres at a gauge `distance_km` from the source.
pub fn tsunami_height(magnitude: f64, distance_km: f64, depth_km: f64) -> f64 {
    let source = 10f64.powf(0.5 * (magnitude - 6.5));
    let depth_factor = (1.0 - depth_km / 70.0).max(0.2);
    (source * depth_factor * (-distance_km / 300.0).exp()).clamp(0.0, 30.0)
}

/// Loudest audio gear.
pub const MAX_GEAR: u8 = 7;

/// Audio gear 1..=N+1 for N ascending thresholds, capped at [`MAX_GEAR`].
#[allow(clippy::cast_possible_truncation)]
pub fn intensity_gear(max_intensity: f64, thresholds: &[f64]) -> u8 {
    let passed = thresholds.iter().take_while(|t| max_intensity >= **t).count();
    (passed + 1).min(usize::from(MAX_GEAR)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::base_constants;

    const TERRAINS: [Terrain; 5] = [
        Terrain::Basin,
        Terrain::Plain,
        Terrain::Mountain,
        Terrain::Valley,
        Terrain::Offshore,
    ];

    #[test]
    fn intensity_non_increasing_with_distance() {
        for terrain in TERRAINS {
            for wave in [WaveType::P, WaveType::S] {
                for magnitude in [3.0, 5.5, 7.6, 9.0] {
                    let mut previous = f64::INFINITY;
                    for step in 0..400 {
                        let d = f64::from(step) * 2.5;
                        let i = intensity(magnitude, d, 10.0, terrain, wave, 0.0);
                        assert!(i <= previous + 1e-12, "{terrain:?} {wave:?} M{magnitude} d={d}");
                        previous = i;
                    }
                }
            }
        }
    }

    #[test]
    fn intensity_always_in_range() {
        for terrain in TERRAINS {
            for magnitude in [-2.0, 0.0, 4.0, 9.5, 12.0] {
                for d in [0.0, 1.0, 50.0, 3000.0] {
                    for jitter in [-0.075, 0.0, 0.075] {
                        let i = intensity(magnitude, d, 0.0, terrain, WaveType::S, jitter);
                        assert!((0.0..=MAX_INTENSITY).contains(&i), "got {i}");
                    }
                }
            }
        }
    }

    #[test]
    fn p_wave_reads_two_to_three_units_below_s_wave() {
        for d in [20.0, 50.0, 100.0] {
            let p = intensity(7.0, d, 10.0, Terrain::Plain, WaveType::P, 0.0);
            let s = intensity(7.0, d, 10.0, Terrain::Plain, WaveType::S, 0.0);
            let gap = s - p;
            assert!((2.0..=3.0).contains(&gap), "d={d} gap={gap}");
        }
    }

    #[test]
    fn near_field_distance_is_floored() {
        let at_zero = intensity(6.0, 0.0, 0.0, Terrain::Plain, WaveType::S, 0.0);
        let at_floor = intensity(6.0, 0.0, MIN_DISTANCE_KM, Terrain::Plain, WaveType::S, 0.0);
        assert!(at_zero.is_finite());
        // Only the small linear term differs inside the floor.
        assert!((at_zero - at_floor).abs() < 0.01);
    }

    #[test]
    fn basin_amplifies_relative_to_mountain() {
        let basin = intensity(6.5, 40.0, 10.0, Terrain::Basin, WaveType::S, 0.0);
        let rock = intensity(6.5, 40.0, 10.0, Terrain::Mountain, WaveType::S, 0.0);
        assert!((basin - rock - 1.4).abs() < 1e-9);
    }

    #[test]
    fn inversion_recovers_magnitude() {
        for (magnitude, d, depth) in [(6.0, 30.0, 10.0), (7.6, 80.0, 8.0), (5.2, 3.0, 1.0)] {
            let observed = intensity(magnitude, d, depth, Terrain::Valley, WaveType::S, 0.0);
            let recovered = invert_magnitude(observed, d, depth);
            assert!((recovered - magnitude).abs() < 1e-9, "M{magnitude}: {recovered}");
        }
    }

    #[test]
    fn p_arrives_before_s_for_every_terrain() {
        let constants = base_constants();
        for terrain in TERRAINS {
            for d in [0.5, 10.0, 250.0] {
                let (p, s) = arrival_times(d, 0.0, terrain, &constants);
                assert!(p < s, "{terrain:?} d={d}");
            }
        }
    }

    #[test]
    fn hard_rock_carries_waves_faster() {
        let constants = base_constants();
        let (p_rock, _) = arrival_times(100.0, 10.0, Terrain::Mountain, &constants);
        let (p_basin, _) = arrival_times(100.0, 10.0, Terrain::Basin, &constants);
        assert!(p_rock < p_basin);
    }

    #[test]
    fn discrete_scale_bins() {
        assert_eq!(to_discrete_scale(0.0), IntensityClass::One);
        assert_eq!(to_discrete_scale(1.49), IntensityClass::One);
        assert_eq!(to_discrete_scale(1.5), IntensityClass::Two);
        assert_eq!(to_discrete_scale(4.6), IntensityClass::FiveLower);
        assert_eq!(to_discrete_scale(6.5), IntensityClass::SixLower);
        assert_eq!(to_discrete_scale(8.49), IntensityClass::SixUpper);
        assert_eq!(to_discrete_scale(12.0), IntensityClass::Seven);
        assert_eq!(IntensityClass::FiveUpper.label(), "5+");
    }

    #[test]
    fn readouts_are_monotonic() {
        let mut previous = (0.0, 0.0);
        for step in 0..=120 {
            let i = f64::from(step) * 0.1;
            let pga = estimate_peak_acceleration(i);
            let pgv = estimate_peak_velocity(i);
            assert!(pga > previous.0 && pgv > previous.1);
            previous = (pga, pgv);
        }
    }

    #[test]
    fn tsunami_height_falls_off_with_distance() {
        let near = tsunami_height(8.2, 50.0, 10.0);
        let far = tsunami_height(8.2, 600.0, 10.0);
        assert!(near > far && far > 0.0);
        assert!(tsunami_height(8.2, 50.0, 60.0) < near);
    }

    #[test]
    fn gear_counts_passed_thresholds() {
        let thresholds = [1.5, 2.5, 3.5, 4.5, 6.0, 7.5];
        assert_eq!(intensity_gear(0.0, &thresholds), 1);
        assert_eq!(intensity_gear(2.5, &thresholds), 3);
        assert_eq!(intensity_gear(5.9, &thresholds), 5);
        assert_eq!(intensity_gear(11.0, &thresholds), 7);
    }

    #[test]
    fn gear_never_exceeds_the_loudest() {
        let thresholds: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_eq!(intensity_gear(12.0, &thresholds), MAX_GEAR);
    }

    #[test]
    fn deterministic_jitter_is_zero() {
        let mut rng = crate::test_fixtures::make_rng();
        assert!(jitter_sample(&mut rng, true).abs() < f64::EPSILON);
        for _ in 0..100 {
            let j = jitter_sample(&mut rng, false);
            assert!(j.abs() <= JITTER_SPAN / 2.0);
        }
    }
}
