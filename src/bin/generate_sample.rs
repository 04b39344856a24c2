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

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }
}

/// Approximate district centroids (lat, lon) for the generated points.
const DISTRICTS: &[(&str, f64, f64)] = &[
    ("KITSILANO", 49.2684, -123.1560),
    ("DUNBAR-SOUTHLANDS", 49.2390, -123.1850),
    ("MOUNT PLEASANT", 49.2642, -123.0995),
    ("SUNSET", 49.2191, -123.0918),
    ("WEST END", 49.2850, -123.1340),
];

const SPECIES: &[(&str, &str)] = &[
    ("KWANZAN FLOWERING CHERRY", "Prunus serrulata"),
    ("NORWAY MAPLE", "Acer platanoides"),
    ("PISSARD PLUM", "Prunus cerasifera"),
    ("RED MAPLE", "Acer rubrum"),
    ("EUROPEAN HORNBEAM", "Carpinus betulus"),
    ("LITTLELEAF LINDEN", "Tilia cordata"),
    ("PIN OAK", "Quercus palustris"),
    ("DOUGLAS FIR", "Pseudotsuga menziesii"),
];

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let output_path = "data/public-trees.csv";
    std::fs::create_dir_all("data").context("creating data directory")?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(output_path)
        .context("creating output file")?;

    writer.write_record([
        "NEIGHBOURHOOD_NAME",
        "COMMON_NAME",
        "SPECIES_NAME",
        "HEIGHT_RANGE_ID",
        "DIAMETER",
        "DATE_PLANTED",
        "GEO_POINT_2D",
    ])?;

    let trees_per_district = 150;
    let mut rows = 0usize;

    for &(district, lat, lon) in DISTRICTS {
        for _ in 0..trees_per_district {
            let &(common, latin) = rng.pick(SPECIES);

            // Scatter within roughly a kilometre of the centroid.
            let tree_lat = lat + (rng.next_f64() - 0.5) * 0.02;
            let tree_lon = lon + (rng.next_f64() - 0.5) * 0.03;

            // Measurements are missing for a realistic share of trees.
            let height = if rng.next_f64() < 0.9 {
                format!("{}", (rng.next_f64() * 9.0) as u32 + 1)
            } else {
                String::new()
            };
            let diameter = if rng.next_f64() < 0.95 {
                format!("{:.1}", rng.next_f64() * 30.0 + 2.0)
            } else {
                String::new()
            };
            let planted = if rng.next_f64() < 0.7 {
                let year = 1960 + (rng.next_f64() * 60.0) as u32;
                let month = (rng.next_f64() * 12.0) as u32 + 1;
                let day = (rng.next_f64() * 28.0) as u32 + 1;
                format!("{year}-{month:02}-{day:02}")
            } else {
                String::new()
            };

            let geo_point = format!("{tree_lat:.6}, {tree_lon:.6}");
            writer.write_record([
                district,
                common,
                latin,
                height.as_str(),
                diameter.as_str(),
                planted.as_str(),
                geo_point.as_str(),
            ])?;
            rows += 1;
        }
    }

    writer.flush().context("flushing output file")?;
    println!("Wrote {rows} trees across {} districts to {output_path}", DISTRICTS.len());
    Ok(())
}
