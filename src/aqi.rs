//! Air-quality index classification.
//!
//! Each pollutant is bucketed against its own breakpoint table into a
//! sub-index from 1 (Good) to 5 (Very Poor). The overall index is the worst
//! sub-index: one bad pollutant is enough to make the air bad.

use serde::Serialize;

/// Index assigned to a concentration that falls in none of a table's bands.
///
/// Every table's last band is unbounded, so only negative or NaN readings
/// ever land here.
pub const BEYOND_TABLE: u8 = 6;

/// Lower bounds of the five bands of one pollutant.
///
/// Band `i` covers `[lower_bounds[i], lower_bounds[i + 1])`; the last band has
/// no upper bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakpointTable {
    pub lower_bounds: [f64; 5],
}

impl BreakpointTable {
    pub const fn new(lower_bounds: [f64; 5]) -> Self {
        Self { lower_bounds }
    }

    /// The half-open `[low, high)` bands in increasing order.
    pub fn bands(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.lower_bounds.iter().enumerate().map(|(i, &low)| {
            let high = self
                .lower_bounds
                .get(i + 1)
                .copied()
                .unwrap_or(f64::INFINITY);
            (low, high)
        })
    }
}

pub const SO2: BreakpointTable = BreakpointTable::new([0.0, 20.0, 80.0, 250.0, 350.0]);
pub const NO2: BreakpointTable = BreakpointTable::new([0.0, 40.0, 70.0, 150.0, 200.0]);
pub const PM10: BreakpointTable = BreakpointTable::new([0.0, 20.0, 50.0, 100.0, 200.0]);
pub const PM2_5: BreakpointTable = BreakpointTable::new([0.0, 10.0, 25.0, 50.0, 75.0]);
pub const O3: BreakpointTable = BreakpointTable::new([0.0, 60.0, 100.0, 140.0, 180.0]);
pub const CO: BreakpointTable = BreakpointTable::new([0.0, 4400.0, 9400.0, 12400.0, 15400.0]);

/// Pollutant concentrations in µg/m³, as reported by the upstream
/// air-pollution snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PollutantReading {
    pub so2: f64,
    pub no2: f64,
    pub pm10: f64,
    pub pm2_5: f64,
    pub o3: f64,
    pub co: f64,
}

/// Per-pollutant sub-indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubIndices {
    pub so2: u8,
    pub no2: u8,
    pub pm10: u8,
    pub pm2_5: u8,
    pub o3: u8,
    pub co: u8,
}

impl SubIndices {
    fn worst(&self) -> u8 {
        [self.so2, self.no2, self.pm10, self.pm2_5, self.o3, self.co]
            .into_iter()
            .max()
            .unwrap_or(BEYOND_TABLE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AqiLevel {
    Good,
    Fair,
    Moderate,
    Poor,
    VeryPoor,
}

impl AqiLevel {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(AqiLevel::Good),
            2 => Some(AqiLevel::Fair),
            3 => Some(AqiLevel::Moderate),
            4 => Some(AqiLevel::Poor),
            5 => Some(AqiLevel::VeryPoor),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AqiLevel::Good => "Good",
            AqiLevel::Fair => "Fair",
            AqiLevel::Moderate => "Moderate",
            AqiLevel::Poor => "Poor",
            AqiLevel::VeryPoor => "Very Poor",
        }
    }
}

/// Label for an overall index; "Unknown" outside 1..=5.
pub fn qualitative_name(index: u8) -> &'static str {
    AqiLevel::from_index(index).map_or("Unknown", AqiLevel::name)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AqiResult {
    #[serde(flatten)]
    pub reading: PollutantReading,
    pub sub_indices: SubIndices,
    pub overall_index: u8,
    pub qualitative_name: &'static str,
}

/// 1-based position of the first band of `table` containing `concentration`,
/// or [`BEYOND_TABLE`] if none does.
pub fn sub_index(concentration: f64, table: &BreakpointTable) -> u8 {
    table
        .bands()
        .position(|(low, high)| concentration >= low && concentration < high)
        .map_or(BEYOND_TABLE, |i| i as u8 + 1)
}

pub fn classify(reading: &PollutantReading) -> AqiResult {
    let sub_indices = SubIndices {
        so2: sub_index(reading.so2, &SO2),
        no2: sub_index(reading.no2, &NO2),
        pm10: sub_index(reading.pm10, &PM10),
        pm2_5: sub_index(reading.pm2_5, &PM2_5),
        o3: sub_index(reading.o3, &O3),
        co: sub_index(reading.co, &CO),
    };
    let overall_index = sub_indices.worst();

    AqiResult {
        reading: *reading,
        sub_indices,
        overall_index,
        qualitative_name: qualitative_name(overall_index),
    }
}
