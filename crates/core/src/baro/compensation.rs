//! MS5611 temperature and pressure compensation
//!
//! Implements the datasheet first-order calculation plus the second-order
//! correction for temperatures below 20 °C (and the additional term below
//! -15 °C). All arithmetic is 64-bit integer; divisions truncate toward zero.

/// Compensated reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Compensated {
    /// Temperature in 0.01 °C
    pub temperature: i32,
    /// Pressure in Pa
    pub pressure: i32,
}

/// Index into the six PROM coefficients (C1..C6 stored as `prom[0]..prom[5]`)
const C1: usize = 0;
const C2: usize = 1;
const C3: usize = 2;
const C4: usize = 3;
const C5: usize = 4;
const C6: usize = 5;

/// Reference temperature for the second-order correction (0.01 °C)
const TEMP_REF: i64 = 2000;

/// Temperature below which the extra low-temperature term applies (0.01 °C)
const TEMP_LOW: i64 = -1500;

/// Compute compensated temperature and pressure
///
/// `prom` holds C1..C6; `d1` is the raw pressure and `d2` the raw
/// temperature ADC value.
pub fn compensate(prom: &[u16; 6], d1: u32, d2: u32) -> Compensated {
    let c = |i: usize| prom[i] as i64;
    let d1 = d1 as i64;
    let d2 = d2 as i64;

    let dt = d2 - (c(C5) << 8);
    let mut temp = TEMP_REF + dt * c(C6) / (1 << 23);
    let mut off = (c(C2) << 16) + c(C4) * dt / (1 << 7);
    let mut sens = (c(C1) << 15) + c(C3) * dt / (1 << 8);

    if temp < TEMP_REF {
        let t2 = dt * dt / (1_i64 << 31);
        let below = (temp - TEMP_REF) * (temp - TEMP_REF);
        let mut off2 = 5 * below / 2;
        let mut sens2 = 5 * below / 4;

        if temp < TEMP_LOW {
            let very_low = (temp - TEMP_LOW) * (temp - TEMP_LOW);
            off2 += 7 * very_low;
            sens2 += 11 * very_low / 2;
        }

        temp -= t2;
        off -= off2;
        sens -= sens2;
    }

    let pressure = (d1 * sens / (1 << 21) - off) / (1 << 15);

    Compensated {
        temperature: temp as i32,
        pressure: pressure as i32,
    }
}

/// Barometric altitude in metres relative to reference pressure `p0`
///
/// `h = 44330 * (1 - (p / p0)^(1 / 5.255))`. Returns 0 when `p0` is not
/// positive.
pub fn altitude_m(pressure_pa: i32, p0_pa: i32) -> f32 {
    if p0_pa <= 0 {
        return 0.0;
    }
    let ratio = pressure_pa as f32 / p0_pa as f32;
    44_330.0 * (1.0 - libm::powf(ratio, 1.0 / 5.255))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROM: [u16; 6] = [40127, 36924, 23317, 23282, 33464, 28312];

    #[test]
    fn test_datasheet_example() {
        let result = compensate(&PROM, 9_085_466, 8_569_150);
        assert_eq!(result.temperature, 2007);
        assert_eq!(result.pressure, 100_009);
    }

    #[test]
    fn test_second_order_below_20c() {
        let result = compensate(&PROM, 9_085_466, 8_000_000);
        assert_eq!(result.temperature, -61);
        assert_eq!(result.pressure, 95_989);
    }

    #[test]
    fn test_second_order_below_minus_15c() {
        let result = compensate(&PROM, 9_085_466, 7_000_000);
        assert_eq!(result.temperature, -4430);
        assert_eq!(result.pressure, 85_696);
    }

    #[test]
    fn test_altitude_at_reference_is_zero() {
        assert!(altitude_m(101_325, 101_325).abs() < 1e-3);
    }

    #[test]
    fn test_altitude_below_reference_pressure() {
        let h = altitude_m(99_000, 101_325);
        assert!((h - 195.39).abs() < 0.1);
    }

    #[test]
    fn test_altitude_without_reference() {
        assert_eq!(altitude_m(99_000, 0), 0.0);
    }
}
