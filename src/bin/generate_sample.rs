//! Writes `sample_ipc.csv`, a synthetic CPI table laid out like the published
//! `;`-separated snapshots, for working without network access.

use anyhow::{Context, Result};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Monthly index path starting at 100 with drift `trend` per month.
fn index_path(months: usize, trend: f64, rng: &mut SimpleRng) -> Vec<f64> {
    let mut level = 100.0;
    (0..months)
        .map(|_| {
            level *= 1.0 + rng.gauss(trend, 0.004);
            (level * 1000.0).round() / 1000.0
        })
        .collect()
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let provinces = ["Madrid", "Barcelona", "Soria", "Teruel", "Sevilla"];
    let subgroups = [
        ("011 Alimentos", 0.004),
        ("041 Alquiler de vivienda", 0.003),
        ("072 Carburantes y lubricantes", 0.002),
        ("111 Restauración", 0.0035),
    ];
    let years = 2019..=2024;

    let periods: Vec<String> = years
        .flat_map(|y| (1..=12).map(move |m| format!("{y}M{m:02}")))
        .collect();

    let output_path = "sample_ipc.csv";
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(output_path)
        .with_context(|| format!("creating {output_path}"))?;

    writer.write_record(["Provincias", "Subgrupos", "Tipo de dato", "Periodo", "Total"])?;

    let mut rows = 0usize;
    for province in &provinces {
        for &(subgroup, trend) in &subgroups {
            let path = index_path(periods.len(), trend, &mut rng);

            // published snapshots list the newest period first
            for (i, period) in periods.iter().enumerate().rev() {
                let index = path[i];
                let index_text = format!("{index:.3}");
                writer.write_record([*province, subgroup, "Índice", period.as_str(), index_text.as_str()])?;

                let monthly = if i == 0 {
                    String::new()
                } else {
                    format!("{:.1}", (index / path[i - 1] - 1.0) * 100.0)
                };
                writer.write_record([
                    *province,
                    subgroup,
                    "Variación mensual",
                    period.as_str(),
                    monthly.as_str(),
                ])?;
                rows += 2;
            }
        }
    }
    writer.flush()?;

    println!(
        "Wrote {rows} rows ({} periods) to {output_path}",
        periods.len()
    );
    Ok(())
}
