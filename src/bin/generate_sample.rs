use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};

/// SplitMix64: enough randomness for a reproducible demo file.
struct SampleRng(u64);

impl SampleRng {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`.
    fn unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Normal noise via Box-Muller.
    fn gauss(&mut self, std_dev: f64) -> f64 {
        let radius = (-2.0 * self.unit().max(1e-15).ln()).sqrt();
        radius * (std::f64::consts::TAU * self.unit()).cos() * std_dev
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }
}

/// Rough US-EPA style index from a PM2.5 concentration.
fn aqi_from_pm25(pm25: f64) -> f64 {
    const BREAKPOINTS: [(f64, f64, f64, f64); 6] = [
        (0.0, 12.0, 0.0, 50.0),
        (12.1, 35.4, 51.0, 100.0),
        (35.5, 55.4, 101.0, 150.0),
        (55.5, 150.4, 151.0, 200.0),
        (150.5, 250.4, 201.0, 300.0),
        (250.5, 500.4, 301.0, 500.0),
    ];
    let c = pm25.clamp(0.0, 500.4);
    BREAKPOINTS
        .iter()
        .find(|&&(_, hi, _, _)| c <= hi)
        .map(|&(lo, hi, ilo, ihi)| ilo + (ihi - ilo) * (c - lo).max(0.0) / (hi - lo))
        .unwrap_or(500.0)
}

/// Occasionally replace a value with something the cleaner has to handle.
fn dirty(rng: &mut SampleRng, value: String) -> String {
    const JUNK: [&str; 4] = ["", "NA", "--", "n/a"];
    if rng.unit() < 0.05 {
        JUNK[rng.below(JUNK.len())].to_string()
    } else {
        value
    }
}

fn main() -> Result<()> {
    let mut rng = SampleRng(42);

    let start = NaiveDate::from_ymd_opt(2023, 1, 1).context("start date")?;
    let days = 425;
    let stations = ["Anand Vihar", "Punjabi Bagh", "RK Puram"];

    let mut rows: Vec<[String; 5]> = Vec::with_capacity(days);
    for i in 0..days {
        let date = start + Duration::days(i as i64);

        // Winter peak, summer trough.
        let season = (2.0 * std::f64::consts::PI * i as f64 / 365.0).cos();
        let pm25 = (70.0 + 45.0 * season + rng.gauss(15.0)).max(3.0);
        let pm10 = (pm25 * 1.7 + rng.gauss(20.0)).max(pm25);
        let aqi = aqi_from_pm25(pm25);

        let date_text = if rng.unit() < 0.01 {
            "not recorded".to_string()
        } else {
            date.format("%Y-%m-%d").to_string()
        };

        rows.push([
            date_text,
            dirty(&mut rng, format!("{pm25:.1}")),
            dirty(&mut rng, format!("{pm10:.1}")),
            dirty(&mut rng, format!("{aqi:.0}")),
            stations[rng.below(stations.len())].to_string(),
        ]);
    }

    // Fisher-Yates so the cleaner has something to sort.
    for i in (1..rows.len()).rev() {
        let j = rng.below(i + 1);
        rows.swap(i, j);
    }

    let output_path = "sample_pollution.csv";
    let mut writer = csv::Writer::from_path(output_path)
        .with_context(|| format!("creating {output_path}"))?;
    writer.write_record(["Date", "PM2.5 (ug/m3)", "PM10 (ug/m3)", "AQI", "Station"])?;
    for row in &rows {
        writer.write_record(row)?;
    }
    writer.flush()?;

    println!("Wrote {} daily readings to {output_path}", rows.len());
    Ok(())
}
