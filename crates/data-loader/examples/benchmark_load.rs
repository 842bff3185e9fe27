use data_loader::DataIndex;
use std::path::Path;
use std::time::Instant;

fn main() {
    let data_dir = Path::new("data/sample");

    println!("Loading fixtures from {}...\n", data_dir.display());

    let start = Instant::now();
    let index = DataIndex::load_from_files(data_dir)
        .expect("Failed to load fixtures");
    let elapsed = start.elapsed();

    let (profiles, shows, ratings) = index.counts();

    println!("=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Profiles: {}", profiles);
    println!("Shows: {}", shows);
    println!("Ratings: {}", ratings);
    println!("\nPerformance: {:.0} ratings/second",
             ratings as f64 / elapsed.as_secs_f64());
}
