use std::sync::Arc;

use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

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

fn main() {
    let mut rng = SimpleRng::new(42);

    let metabolites = [
        "citrate",
        "lactate",
        "alanine",
        "glucose",
        "glutamine",
        "succinate",
        "valine",
        "taurine",
    ];

    // Baseline concentration and measurement noise per metabolite.
    let baselines = [4.2, 7.5, 2.1, 9.8, 3.3, 1.4, 2.8, 5.6];
    let noise = 0.25;

    // Additive per-group shifts so the groups separate in component space.
    let groups: Vec<(&str, Vec<f64>)> = vec![
        ("control", vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        ("treated", vec![1.8, -1.2, 0.9, -2.1, 0.6, 1.1, -0.4, 0.8]),
        ("qc", vec![0.9, -0.6, 0.45, -1.05, 0.3, 0.55, -0.2, 0.4]),
    ];
    let samples_per_group = 12;

    let mut all_groups: Vec<String> = Vec::new();
    let mut all_values: Vec<Vec<f64>> = vec![Vec::new(); metabolites.len()];

    for (group, shifts) in &groups {
        for _ in 0..samples_per_group {
            all_groups.push(group.to_string());
            for (j, (&baseline, &shift)) in baselines.iter().zip(shifts.iter()).enumerate() {
                all_values[j].push(rng.gauss(baseline + shift, noise));
            }
        }
    }

    // ---- CSV ----
    let csv_path = "metabolites.csv";
    let mut writer = csv::Writer::from_path(csv_path).expect("Failed to create CSV file");
    let mut header = vec!["group"];
    header.extend_from_slice(&metabolites);
    writer.write_record(&header).expect("Failed to write header");
    for i in 0..all_groups.len() {
        let mut record = vec![all_groups[i].clone()];
        for column in &all_values {
            record.push(format!("{:.4}", column[i]));
        }
        writer.write_record(&record).expect("Failed to write row");
    }
    writer.flush().expect("Failed to flush CSV");

    // ---- Parquet ----
    let mut fields = vec![Field::new("group", DataType::Utf8, false)];
    let mut columns: Vec<Arc<dyn arrow::array::Array>> = vec![Arc::new(StringArray::from(
        all_groups.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
    ))];
    for (name, column) in metabolites.iter().zip(all_values) {
        fields.push(Field::new(*name, DataType::Float64, false));
        columns.push(Arc::new(Float64Array::from(column)));
    }
    let schema = Arc::new(Schema::new(fields));

    let batch =
        RecordBatch::try_new(schema.clone(), columns).expect("Failed to create RecordBatch");

    let parquet_path = "metabolites.parquet";
    let file = std::fs::File::create(parquet_path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    println!(
        "Wrote {} samples × {} metabolites to {csv_path} and {parquet_path}",
        all_groups.len(),
        metabolites.len()
    );
}
