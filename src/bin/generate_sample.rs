use std::path::Path;

use anyhow::{Context, Result};

/// Per-genre centre of the audio features.
struct GenreProfile {
    genre: &'static str,
    danceability: f64,
    energy: f64,
    valence: f64,
    acousticness: f64,
    instrumentalness: f64,
    tempo: f64,
    popularity: f64,
}

const PROFILES: &[GenreProfile] = &[
    GenreProfile { genre: "acoustic", danceability: 0.55, energy: 0.40, valence: 0.45, acousticness: 0.75, instrumentalness: 0.02, tempo: 112.0, popularity: 42.0 },
    GenreProfile { genre: "ambient", danceability: 0.35, energy: 0.20, valence: 0.20, acousticness: 0.80, instrumentalness: 0.75, tempo: 95.0, popularity: 30.0 },
    GenreProfile { genre: "dance", danceability: 0.75, energy: 0.80, valence: 0.55, acousticness: 0.08, instrumentalness: 0.05, tempo: 124.0, popularity: 55.0 },
    GenreProfile { genre: "hip-hop", danceability: 0.78, energy: 0.65, valence: 0.50, acousticness: 0.15, instrumentalness: 0.01, tempo: 98.0, popularity: 50.0 },
    GenreProfile { genre: "jazz", danceability: 0.55, energy: 0.35, valence: 0.50, acousticness: 0.70, instrumentalness: 0.35, tempo: 110.0, popularity: 28.0 },
    GenreProfile { genre: "metal", danceability: 0.40, energy: 0.92, valence: 0.30, acousticness: 0.02, instrumentalness: 0.20, tempo: 135.0, popularity: 35.0 },
    GenreProfile { genre: "pop", danceability: 0.68, energy: 0.70, valence: 0.60, acousticness: 0.18, instrumentalness: 0.01, tempo: 118.0, popularity: 62.0 },
    GenreProfile { genre: "rock", danceability: 0.50, energy: 0.78, valence: 0.48, acousticness: 0.10, instrumentalness: 0.05, tempo: 128.0, popularity: 45.0 },
];

const TRACKS_PER_GENRE: usize = 120;
const OUTPUT_PATH: &str = "data/spotify_tracks.csv";

const HEADER: &[&str] = &[
    "", "track_id", "artists", "album_name", "track_name", "popularity", "duration_ms",
    "explicit", "danceability", "energy", "key", "loudness", "mode", "speechiness",
    "acousticness", "instrumentalness", "liveness", "valence", "tempo", "time_signature",
    "track_genre",
];

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
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
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

    fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// Normal sample clamped to the unit interval.
    fn unit(&mut self, mean: f64, std_dev: f64) -> f64 {
        self.gauss(mean, std_dev).clamp(0.0, 1.0)
    }
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    if let Some(dir) = Path::new(OUTPUT_PATH).parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let mut writer = csv::Writer::from_path(OUTPUT_PATH)
        .with_context(|| format!("creating {OUTPUT_PATH}"))?;
    writer.write_record(HEADER)?;

    let mut row_id = 0usize;
    for profile in PROFILES {
        for n in 0..TRACKS_PER_GENRE {
            let energy = rng.unit(profile.energy, 0.12);
            let popularity = rng.gauss(profile.popularity, 18.0).round().clamp(0.0, 100.0) as i64;
            let loudness = (-4.0 - 14.0 * (1.0 - energy) + rng.gauss(0.0, 1.5)).min(0.0);
            let duration_ms = rng.gauss(215_000.0, 45_000.0).max(30_000.0) as i64;
            // roughly one in forty tracks lacks a valence estimate
            let valence = if rng.below(40) == 0 {
                String::new()
            } else {
                format!("{:.3}", rng.unit(profile.valence, 0.18))
            };

            writer.write_record([
                row_id.to_string(),
                format!("{:016x}", rng.next_u64()),
                format!("Artist {}", rng.below(60)),
                format!("{} Album {}", profile.genre, n / 10),
                format!("{} Track {n}", profile.genre),
                popularity.to_string(),
                duration_ms.to_string(),
                if rng.below(10) == 0 { "True" } else { "False" }.to_string(),
                format!("{:.3}", rng.unit(profile.danceability, 0.1)),
                format!("{energy:.3}"),
                rng.below(12).to_string(),
                format!("{loudness:.3}"),
                rng.below(2).to_string(),
                format!("{:.4}", rng.unit(0.06, 0.04)),
                format!("{:.4}", rng.unit(profile.acousticness, 0.15)),
                format!("{:.4}", rng.unit(profile.instrumentalness, 0.1)),
                format!("{:.4}", rng.unit(0.18, 0.1)),
                valence,
                format!("{:.3}", rng.gauss(profile.tempo, 12.0).max(40.0)),
                (3 + rng.below(3) / 2).to_string(),
                profile.genre.to_string(),
            ])?;
            row_id += 1;
        }
    }
    writer.flush().context("flushing CSV writer")?;

    println!(
        "Wrote {row_id} tracks across {} genres to {OUTPUT_PATH}",
        PROFILES.len()
    );
    Ok(())
}
