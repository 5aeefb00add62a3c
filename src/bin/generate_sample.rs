//! Writes synthetic property and plot tables for trying the dashboards:
//! `property_sample.csv`, `plot_sample.csv` and `plot_sample.parquet`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use chrono::{Duration, NaiveDate};
use parquet::arrow::ArrowWriter;

use realty_lens::schema::{LISTING_DATE, PLOT_COLUMNS, PROPERTY_COLUMNS};

/// Locality, latitude, longitude, base price per cent.
const LOCALITIES: [(&str, f64, f64, f64); 8] = [
    ("Kowdiar", 8.5241, 76.9613, 1_400_000.0),
    ("Vazhuthacaud", 8.5005, 76.9618, 1_250_000.0),
    ("Kazhakkoottam", 8.5686, 76.8731, 650_000.0),
    ("Technopark", 8.5581, 76.8816, 800_000.0),
    ("Peroorkada", 8.5428, 76.9697, 700_000.0),
    ("Vattiyoorkavu", 8.5310, 76.9898, 450_000.0),
    ("Kovalam", 8.3988, 76.9820, 550_000.0),
    ("Nedumangad", 8.6033, 77.0020, 250_000.0),
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

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    fn index(&mut self, len: usize) -> usize {
        (self.next_u64() % len as u64) as usize
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn round_to(v: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (v * f).round() / f
}

// ---------------------------------------------------------------------------
// Property listings
// ---------------------------------------------------------------------------

fn write_properties(path: &Path, rng: &mut SimpleRng, n: usize) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut header: Vec<&str> = PROPERTY_COLUMNS.to_vec();
    header.push(LISTING_DATE);
    wtr.write_record(&header)?;

    let first_day = NaiveDate::from_ymd_opt(2024, 1, 1).context("invalid start date")?;
    for i in 0..n {
        let (location, _, _, per_cent) = LOCALITIES[rng.index(LOCALITIES.len())];
        let beds = 1 + rng.index(5) as i64;
        let cents = round_to(rng.range(2.0, 15.0), 1);
        let build_area = round_to(400.0 + beds as f64 * rng.range(250.0, 450.0), 0);
        let price = ((per_cent * cents * 0.6 + build_area * rng.gauss(3500.0, 400.0)) / 1000.0)
            .round() as i64
            * 1000;
        let total_area = round_to(cents * 435.6, 1);
        let listed = first_day + Duration::days(rng.index(300) as i64);

        let record = [
            format!("https://listings.example/property/{i}"),
            price.to_string(),
            beds.to_string(),
            format!("{build_area:?}"),
            format!("{cents} cents"),
            format!("{beds} BHK house in {location}"),
            format!("{cents:?}"),
            format!("{:?}", round_to(price as f64 / build_area, 2)),
            format!("{:?}", round_to(price as f64 / cents, 2)),
            format!("{total_area:?}"),
            format!("{:?}", round_to(build_area / total_area, 3)),
            location.to_string(),
            listed.format("%Y-%m-%d").to_string(),
        ];
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Plot listings
// ---------------------------------------------------------------------------

/// Columns of the plot table, held column-wise for Arrow.
#[derive(Default)]
struct PlotColumns {
    url: Vec<String>,
    price: Vec<i64>,
    area: Vec<f64>,
    price_per_cent: Vec<f64>,
    location: Vec<String>,
    latitude: Vec<f64>,
    longitude: Vec<f64>,
    distances: [Vec<f64>; 5],
    density: Vec<String>,
    ratio: Vec<f64>,
    beach: Vec<String>,
    lake: Vec<String>,
}

fn generate_plots(rng: &mut SimpleRng, n: usize) -> PlotColumns {
    let mut cols = PlotColumns::default();
    for i in 0..n {
        let (location, lat, lon, per_cent) = LOCALITIES[rng.index(LOCALITIES.len())];
        let area = round_to(rng.range(3.0, 40.0), 1);
        let ppc = round_to(per_cent * rng.range(0.7, 1.3), 0);
        let price = (ppc * area / 1000.0).round() as i64 * 1000;
        let beach_km = round_to(rng.range(0.5, 25.0), 2);
        let lake_km = round_to(rng.range(0.5, 20.0), 2);

        cols.url.push(format!("https://listings.example/plot/{i}"));
        cols.price.push(price);
        cols.area.push(area);
        cols.price_per_cent.push(ppc);
        cols.location.push(location.to_string());
        cols.latitude.push(round_to(lat + rng.gauss(0.0, 0.006), 5));
        cols.longitude.push(round_to(lon + rng.gauss(0.0, 0.006), 5));
        cols.distances[0].push(round_to(rng.range(1.0, 30.0), 2));
        cols.distances[1].push(round_to(rng.range(20.0, 60.0), 2));
        cols.distances[2].push(round_to(rng.range(25.0, 55.0), 2));
        cols.distances[3].push(beach_km);
        cols.distances[4].push(lake_km);
        cols.density
            .push(["Low", "Medium", "High"][rng.index(3)].to_string());
        cols.ratio.push(round_to(price as f64 / ppc, 2));
        cols.beach
            .push(if beach_km < 5.0 { "Near" } else { "Far" }.to_string());
        cols.lake
            .push(if lake_km < 3.0 { "Near" } else { "Far" }.to_string());
    }
    cols
}

fn plot_batch(cols: &PlotColumns) -> Result<RecordBatch> {
    fn text(v: &[String]) -> ArrayRef {
        Arc::new(StringArray::from_iter_values(v.iter()))
    }
    fn float(v: &[f64]) -> ArrayRef {
        Arc::new(Float64Array::from(v.to_vec()))
    }

    let arrays: Vec<ArrayRef> = vec![
        text(&cols.url),
        Arc::new(Int64Array::from(cols.price.clone())),
        float(&cols.area),
        float(&cols.price_per_cent),
        text(&cols.location),
        float(&cols.latitude),
        float(&cols.longitude),
        float(&cols.distances[0]),
        float(&cols.distances[1]),
        float(&cols.distances[2]),
        float(&cols.distances[3]),
        float(&cols.distances[4]),
        text(&cols.density),
        float(&cols.ratio),
        text(&cols.beach),
        text(&cols.lake),
    ];
    let fields: Vec<Field> = PLOT_COLUMNS
        .iter()
        .zip(&arrays)
        .map(|(name, array)| Field::new(*name, array.data_type().clone(), false))
        .collect();

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

fn write_plot_csv(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut wtr = arrow::csv::WriterBuilder::new().with_header(true).build(file);
    wtr.write(batch)?;
    Ok(())
}

fn write_plot_parquet(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let property_path = Path::new("property_sample.csv");
    write_properties(property_path, &mut rng, 400)?;
    println!("Wrote 400 property listings to {}", property_path.display());

    let plots = generate_plots(&mut rng, 600);
    let batch = plot_batch(&plots)?;
    write_plot_csv(Path::new("plot_sample.csv"), &batch)?;
    write_plot_parquet(Path::new("plot_sample.parquet"), &batch)?;
    println!(
        "Wrote {} plots to plot_sample.csv and plot_sample.parquet",
        batch.num_rows()
    );
    println!("{}", pretty_format_batches(&[batch.slice(0, 5)])?);
    Ok(())
}
