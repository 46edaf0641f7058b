use serde::Serialize;

/// Weighted breakdown of one class score. Lower is better.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreDetails {
    pub total: f32,

    // Weighted components
    pub parity: f32,
    pub academic: f32,
    pub profile: f32,
    pub grouping: f32,

    // Raw counters
    pub size: usize,
    pub female: usize,
    pub male: usize,
    pub heads: usize,
    pub lows: usize,
    pub averages: [f32; 4],
}
